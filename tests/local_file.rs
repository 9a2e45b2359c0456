use mp4edit::{AccessMode, BoxTree, EditConfig, Error, LocalFile};
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

fn temp_with(bytes: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}

fn hundred() -> Vec<u8> {
    (0..100u8).collect()
}

fn open(tmp: &NamedTempFile, buffer_size: usize) -> LocalFile {
    LocalFile::open(tmp.path(), &EditConfig::with_buffer_size(buffer_size).unwrap()).unwrap()
}

#[test]
fn insert_ten_bytes_in_the_middle() {
    let original = hundred();
    let tmp = temp_with(&original);
    let inserted = [0xEEu8; 10];
    {
        let mut f = open(&tmp, 4096);
        f.insert_or_replace(Some(&inserted[..]), 10, 50, 0).unwrap();
        assert_eq!(f.len(), 110);
    }
    let out = std::fs::read(tmp.path()).unwrap();
    assert_eq!(out.len(), 110);
    assert_eq!(out[..50], original[..50]);
    assert_eq!(out[50..60], inserted);
    assert_eq!(out[60..], original[50..]);
}

#[test]
fn pure_removal() {
    let original = hundred();
    let tmp = temp_with(&original);
    {
        let mut f = open(&tmp, 4096);
        f.insert_or_replace(None, 0, 50, 20).unwrap();
        assert_eq!(f.len(), 80);
    }
    let out = std::fs::read(tmp.path()).unwrap();
    let expected = [&original[..50], &original[70..]].concat();
    assert_eq!(out, expected);
}

#[test]
fn tiny_buffer_matches_large_buffer() {
    let original: Vec<u8> = (1..=7).collect();
    let data = [0xA0, 0xA1, 0xA2, 0xA3, 0xA4];
    let mut results = Vec::new();
    for buffer_size in [1, 4096] {
        let tmp = temp_with(&original);
        {
            let mut f = open(&tmp, buffer_size);
            f.insert(&data, 3).unwrap();
        }
        results.push(std::fs::read(tmp.path()).unwrap());
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], [1, 2, 3, 0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 4, 5, 6, 7]);
}

#[test]
fn grow_with_long_tail_and_small_blocks() {
    let original: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
    let tmp = temp_with(&original);
    let data = vec![0x55u8; 300];
    {
        let mut f = open(&tmp, 64);
        f.insert_or_replace(Some(&data[..]), 300, 1000, 100).unwrap();
    }
    let out = std::fs::read(tmp.path()).unwrap();
    let expected = [&original[..1000], &data[..], &original[1100..]].concat();
    assert_eq!(out, expected);
}

#[test]
fn shrink_replace() {
    let original = hundred();
    let tmp = temp_with(&original);
    {
        let mut f = open(&tmp, 7);
        f.insert_or_replace(Some(&[1, 2, 3][..]), 3, 10, 30).unwrap();
    }
    let out = std::fs::read(tmp.path()).unwrap();
    let expected = [&original[..10], &[1, 2, 3][..], &original[40..]].concat();
    assert_eq!(out, expected);
}

#[test]
fn same_size_overwrite() {
    let original = hundred();
    let tmp = temp_with(&original);
    {
        let mut f = open(&tmp, 16);
        f.insert_or_replace(Some(&[9; 5][..]), 5, 0, 5).unwrap();
        f.insert_or_replace(None, 5, 20, 5).unwrap();
    }
    let out = std::fs::read(tmp.path()).unwrap();
    assert_eq!(out[..5], [9; 5]);
    assert_eq!(out[5..], original[5..]);
}

#[test]
fn reserve_space_at_end() {
    let tmp = temp_with(&[1, 2, 3]);
    {
        let mut f = open(&tmp, 16);
        f.insert_or_replace(None, 4, 3, 0).unwrap();
        assert_eq!(f.len(), 7);
    }
    assert_eq!(std::fs::metadata(tmp.path()).unwrap().len(), 7);
}

#[test]
fn remove_zero_is_a_no_op() {
    let original = hundred();
    let tmp = temp_with(&original);
    let mut f = open(&tmp, 16);
    f.remove(10, 0).unwrap();
    assert_eq!(f.mode(), AccessMode::Closed);
    drop(f);
    assert_eq!(std::fs::read(tmp.path()).unwrap(), original);
}

#[test]
fn out_of_range_edits_are_rejected() {
    let tmp = temp_with(&hundred());
    let mut f = open(&tmp, 16);
    assert!(matches!(f.remove(90, 20), Err(Error::InvalidArgument(_))));
    assert!(matches!(
        f.insert_or_replace(Some(&[1, 2][..]), 3, 0, 0),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        f.insert_or_replace(None, 1, 95, 10),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn mode_rules() {
    let tmp = temp_with(&hundred());
    let mut f = open(&tmp, 16);
    assert_eq!(f.mode(), AccessMode::Closed);
    assert!(matches!(f.seek_to(10), Err(Error::NotSupported(_))));

    let block = f.read_block(10).unwrap();
    assert_eq!(block, (0..10).collect::<Vec<u8>>());
    assert_eq!(f.mode(), AccessMode::Read);
    assert!(matches!(f.truncate(10), Err(Error::NotSupported(_))));
    assert!(matches!(f.seek_to(-1), Err(Error::InvalidArgument(_))));

    f.seek_to(95).unwrap();
    assert_eq!(f.read_block(10).unwrap().len(), 5);
    assert_eq!(f.position(), 100);

    f.seek_to(0).unwrap();
    f.write_block(&[0xFF]).unwrap();
    assert_eq!(f.mode(), AccessMode::Write);
    f.truncate(50).unwrap();
    assert_eq!(f.len(), 50);
    f.close().unwrap();
    assert_eq!(f.mode(), AccessMode::Closed);

    let out = std::fs::read(tmp.path()).unwrap();
    assert_eq!(out.len(), 50);
    assert_eq!(out[0], 0xFF);
}

#[test]
fn std_io_traits() {
    let tmp = temp_with(&hundred());
    let mut f = open(&tmp, 16);
    let mut buf = [0u8; 4];
    f.read_exact(&mut buf).unwrap();
    assert_eq!(buf, [0, 1, 2, 3]);
    assert_eq!(f.seek(SeekFrom::End(-2)).unwrap(), 98);
    f.read_exact(&mut buf[..2]).unwrap();
    assert_eq!(buf[..2], [98, 99]);
    assert!(f.seek(SeekFrom::Current(-200)).is_err());
}

#[test]
fn seek_on_a_closed_file_opens_it_for_reading() {
    let tmp = temp_with(&hundred());
    let mut f = open(&tmp, 16);
    assert_eq!(f.seek(SeekFrom::Start(40)).unwrap(), 40);
    assert_eq!(f.mode(), AccessMode::Read);
    let mut buf = [0u8; 2];
    f.read_exact(&mut buf).unwrap();
    assert_eq!(buf, [40, 41]);
}

#[test]
fn box_tree_reads_straight_from_a_local_file() {
    let bytes = [b"\0\0\0\x0cfree".as_slice(), &[1, 2, 3, 4]].concat();
    let tmp = temp_with(&bytes);
    let mut f = open(&tmp, 16);
    let len = f.len();
    let tree = BoxTree::read(&mut f, len).unwrap();
    assert_eq!(tree.roots().len(), 1);
    assert_eq!(tree.size(tree.roots()[0]), 12);
}
