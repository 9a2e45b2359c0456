use std::fmt::Write as _;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Largest buffer reserved up front for a read whose length comes from the file.
const MAX_PREALLOC: u64 = 1 << 20;

/// Exactly `len` bytes at `offset`. The buffer grows as bytes arrive, so a
/// bogus length fails at end of file instead of allocating it all.
pub fn read_slice<R: Read + Seek + ?Sized>(r: &mut R, offset: u64, len: u64) -> io::Result<Vec<u8>> {
    let v = read_up_to(r, offset, len)?;
    if (v.len() as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("wanted {len} bytes at {offset}, got {}", v.len()),
        ));
    }
    Ok(v)
}

/// Like [`read_slice`] but returns fewer bytes instead of failing at EOF.
pub fn read_up_to<R: Read + Seek + ?Sized>(r: &mut R, offset: u64, len: u64) -> io::Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut v = Vec::with_capacity(len.min(MAX_PREALLOC) as usize);
    r.take(len).read_to_end(&mut v)?;
    Ok(v)
}

/// Stream `len` bytes at `offset` into `out` without buffering them first.
pub fn copy_range<R: Read + Seek + ?Sized, W: Write + ?Sized>(
    r: &mut R,
    offset: u64,
    len: u64,
    out: &mut W,
) -> io::Result<()> {
    r.seek(SeekFrom::Start(offset))?;
    let copied = io::copy(&mut r.take(len), out)?;
    if copied < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("wanted {len} bytes at {offset}, got {copied}"),
        ));
    }
    Ok(())
}

/// Classic 16-bytes-per-line dump: offset, hex bytes, printable ASCII.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(16) * 78);
    for (line, chunk) in (start_offset..).step_by(16).zip(bytes.chunks(16)) {
        let _ = write!(out, "{line:08x}  ");
        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, "{b:02x} ");
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("  |");
        out.extend(chunk.iter().map(|&c| if c.is_ascii_graphic() || c == b' ' { c as char } else { '.' }));
        out.push_str("|\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn huge_declared_length_fails_at_eof() {
        let mut c = Cursor::new(vec![7u8; 10]);
        let err = read_slice(&mut c, 2, u64::MAX / 2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(read_slice(&mut c, 2, 8).unwrap(), [7; 8]);
    }

    #[test]
    fn copy_range_streams_exactly() {
        let mut c = Cursor::new((0..32u8).collect::<Vec<_>>());
        let mut out = vec![0xFF];
        copy_range(&mut c, 4, 3, &mut out).unwrap();
        assert_eq!(out, [0xFF, 4, 5, 6]);
        assert!(copy_range(&mut c, 30, 3, &mut out).is_err());
    }

    #[test]
    fn hex_dump_pads_short_lines() {
        let s = hex_dump(b"AB\x00", 0x10);
        assert_eq!(s, format!("00000010  41 42 00 {}  |AB.|\n", " ".repeat(39)));
    }
}
