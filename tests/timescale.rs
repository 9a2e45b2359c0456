mod common;

use common::*;
use mp4edit::known_boxes::{CTTS, ELST, MDHD, MVHD, STTS, TKHD};
use mp4edit::payload::BoxData;
use mp4edit::{BoxTree, Error};
use std::io::Cursor;

fn parse(bytes: &[u8]) -> BoxTree {
    BoxTree::read(&mut Cursor::new(bytes), bytes.len() as u64).unwrap()
}

fn mvhd_fields(tree: &BoxTree) -> (u32, u64) {
    match tree.payload(tree.first(MVHD).unwrap()) {
        BoxData::MovieHeader(m) => (m.timescale, m.duration),
        other => panic!("mvhd decoded as {other:?}"),
    }
}

fn mdhd_fields(tree: &BoxTree) -> (u32, u64) {
    match tree.payload(tree.first(MDHD).unwrap()) {
        BoxData::MediaHeader(m) => (m.timescale, m.duration),
        other => panic!("mdhd decoded as {other:?}"),
    }
}

fn tkhd_duration(tree: &BoxTree) -> u64 {
    match tree.payload(tree.first(TKHD).unwrap()) {
        BoxData::TrackHeader(t) => t.duration,
        other => panic!("tkhd decoded as {other:?}"),
    }
}

fn elst_entry(tree: &BoxTree) -> (u64, i64) {
    match tree.payload(tree.first(ELST).unwrap()) {
        BoxData::EditList(e) => (e.entries[0].segment_duration, e.entries[0].media_time),
        other => panic!("elst decoded as {other:?}"),
    }
}

fn stts_delta(tree: &BoxTree) -> u32 {
    match tree.payload(tree.first(STTS).unwrap()) {
        BoxData::TimeToSample(s) => s.entries[0].sample_delta,
        other => panic!("stts decoded as {other:?}"),
    }
}

fn ctts_offset(tree: &BoxTree) -> i64 {
    match tree.payload(tree.first(CTTS).unwrap()) {
        BoxData::CompositionOffset(c) => c.entries[0].sample_offset,
        other => panic!("ctts decoded as {other:?}"),
    }
}

#[test]
fn movie_timescale_round_trip() {
    let bytes = sample_file();
    let mut tree = parse(&bytes);
    assert_eq!(tree.movie_timescale(), Some(600));

    tree.set_movie_timescale(90_000).unwrap();
    assert_eq!(mvhd_fields(&tree), (90_000, 900_000));
    assert_eq!(tkhd_duration(&tree), 900_000);
    assert_eq!(elst_entry(&tree), (900_000, 1024));
    // media-scope values are untouched
    assert_eq!(stts_delta(&tree), 1024);
    assert_eq!(mdhd_fields(&tree), (44_100, 441_000));

    tree.set_movie_timescale(600).unwrap();
    assert_eq!(mvhd_fields(&tree), (600, 6000));
    assert_eq!(tkhd_duration(&tree), 6000);
    assert_eq!(elst_entry(&tree), (6000, 1024));

    // same sizes, so rendering gives the original file back
    let mut out = Vec::new();
    for &id in tree.roots() {
        tree.render(id, &mut Cursor::new(&bytes), &mut out).unwrap();
    }
    assert_eq!(out, bytes);
}

#[test]
fn media_timescale_round_trip() {
    let bytes = sample_file();
    let mut tree = parse(&bytes);
    let mdhd = tree.media_header_for_track(1).unwrap();
    assert_eq!(tree.media_timescale(mdhd), Some(44_100));

    tree.set_media_timescale(mdhd, 48_000).unwrap();
    assert_eq!(mdhd_fields(&tree), (48_000, 480_000));
    // 1024 * 48000 / 44100 = 1114.56
    assert_eq!(stts_delta(&tree), 1115);
    assert_eq!(ctts_offset(&tree), 2229);
    assert_eq!(elst_entry(&tree), (6000, 1115));
    assert_eq!(tkhd_duration(&tree), 6000);

    tree.set_media_timescale(mdhd, 44_100).unwrap();
    assert_eq!(mdhd_fields(&tree), (44_100, 441_000));
    assert_eq!(stts_delta(&tree), 1024);
    assert_eq!(ctts_offset(&tree), 2048);
    assert_eq!(elst_entry(&tree), (6000, 1024));
}

#[test]
fn empty_edit_keeps_its_marker() {
    let edts = container(b"edts", &[elst(100, -1)]);
    let mdia = container(b"mdia", &[mdhd(1000, 100)]);
    let bytes = container(b"moov", &[container(b"trak", &[tkhd(1, 100), edts, mdia])]);
    let mut tree = parse(&bytes);
    let mdhd = tree.first(MDHD).unwrap();
    tree.set_media_timescale(mdhd, 90_000).unwrap();
    assert_eq!(elst_entry(&tree), (100, -1));
}

#[test]
fn zero_timescale_is_rejected() {
    let bytes = sample_file();
    let mut tree = parse(&bytes);
    assert!(matches!(tree.set_movie_timescale(0), Err(Error::InvalidArgument(_))));
    let mdhd = tree.first(MDHD).unwrap();
    assert!(matches!(tree.set_media_timescale(mdhd, 0), Err(Error::InvalidArgument(_))));
    assert_eq!(mvhd_fields(&tree), (600, 6000));
}

#[test]
fn media_timescale_needs_an_mdhd() {
    let bytes = sample_file();
    let mut tree = parse(&bytes);
    let mvhd = tree.first(MVHD).unwrap();
    assert!(matches!(tree.set_media_timescale(mvhd, 1000), Err(Error::InvalidArgument(_))));
}

#[test]
fn movie_timescale_needs_a_movie_header() {
    let bytes = ftyp();
    let mut tree = parse(&bytes);
    assert!(matches!(tree.set_movie_timescale(1000), Err(Error::NotSupported(_))));
}

#[test]
fn media_timescale_leaves_other_tracks_alone() {
    let track = |id, ts| {
        let stbl = container(b"stbl", &[stts(&[(4, 1000)])]);
        let mdia = container(
            b"mdia",
            &[mdhd(ts, 4000), hdlr(b"vide", "VideoHandler"), container(b"minf", &[stbl])],
        );
        container(b"trak", &[tkhd(id, 100), mdia])
    };
    let bytes = container(b"moov", &[mvhd(600, 100), track(1, 24_000), track(2, 24_000)]);
    let mut tree = parse(&bytes);

    let first = tree.media_header_for_track(1).unwrap();
    tree.set_media_timescale(first, 48_000).unwrap();

    let deltas: Vec<u32> = tree
        .find_all(STTS)
        .into_iter()
        .map(|id| match tree.payload(id) {
            BoxData::TimeToSample(s) => s.entries[0].sample_delta,
            other => panic!("stts decoded as {other:?}"),
        })
        .collect();
    assert_eq!(deltas, [2000, 1000]);
    let second = tree.media_header_for_track(2).unwrap();
    assert_eq!(tree.media_timescale(second), Some(24_000));
}
