mod common;

use mp4edit::descriptor::{
    Descriptor, DescriptorBody, DescriptorHeader, decode_length, encode_length,
    minimal_length_bytes,
};
use std::io::Cursor;

#[test]
fn varint_lengths_use_minimal_width() {
    for (length, width) in [(0u32, 1u8), (127, 1), (128, 2), (16383, 2), (16384, 3)] {
        let mut out = Vec::new();
        encode_length(&mut out, length, 1).unwrap();
        assert_eq!(out.len(), width as usize, "length {length}");
        assert_eq!(minimal_length_bytes(length), width);

        let (decoded, size_of_length) = decode_length(&mut Cursor::new(&out)).unwrap();
        assert_eq!(decoded, length);
        assert_eq!(size_of_length, width);
    }
}

#[test]
fn padded_length_keeps_its_width() {
    let bytes = [0x80, 0x80, 0x80, 0x05];
    let (length, width) = decode_length(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!((length, width), (5, 4));

    let mut out = Vec::new();
    encode_length(&mut out, length, width).unwrap();
    assert_eq!(out, bytes);
}

#[test]
fn five_byte_length_is_corrupt() {
    let bytes = [0x80, 0x80, 0x80, 0x80, 0x01];
    assert!(decode_length(&mut Cursor::new(&bytes)).unwrap_err().is_corrupt());
}

#[test]
fn header_reports_size() {
    let bytes = [0x05, 0x81, 0x00];
    let h = DescriptorHeader::read(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!(h.tag, 0x05);
    assert_eq!(h.length, 128);
    assert_eq!(h.size_of_length, 2);
    assert_eq!(h.size(), 1 + 2 + 128);
}

#[test]
fn es_descriptor_round_trips() {
    for wide in [false, true] {
        let bytes = common::es_descriptor(wide);
        let d = Descriptor::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(d.size(), bytes.len() as u64);

        let DescriptorBody::ElementaryStream(es) = &d.body else {
            panic!("expected an ES descriptor, got {:?}", d.body);
        };
        assert_eq!(es.es_id, 1);
        assert_eq!(es.descriptors.len(), 2);
        let dc = es.decoder_config().unwrap();
        assert_eq!(dc.object_type_indication, 0x40);
        assert_eq!(dc.stream_type, 5);
        assert!(dc.reserved);
        assert_eq!(dc.buffer_size_db, 0x1800);
        assert_eq!(dc.avg_bitrate, 128_000);
        assert_eq!(dc.specific_info_bytes(), Some(&[0x12, 0x10][..]));
        assert!(dc.residual.is_empty());

        let mut out = Vec::new();
        d.write(&mut out).unwrap();
        assert_eq!(out, bytes);
    }
}

#[test]
fn decoder_config_keeps_trailing_bytes() {
    let mut payload = vec![0x40, 0x15, 0, 0, 0];
    payload.extend_from_slice(&[0u8; 8]);
    payload.extend_from_slice(&[0xde, 0xad, 0xbe]);
    let mut bytes = vec![0x04, payload.len() as u8];
    bytes.extend_from_slice(&payload);

    let d = Descriptor::read(&mut Cursor::new(&bytes)).unwrap();
    let DescriptorBody::DecoderConfig(dc) = &d.body else {
        panic!("expected a decoder config");
    };
    assert_eq!(dc.residual, [0xde, 0xad, 0xbe]);

    let mut out = Vec::new();
    d.write(&mut out).unwrap();
    assert_eq!(out, bytes);
}

#[test]
fn unknown_tags_stay_opaque() {
    let bytes = [0x42, 0x03, 1, 2, 3];
    let d = Descriptor::read(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!(d.tag(), 0x42);
    assert!(matches!(&d.body, DescriptorBody::Unknown { payload, .. } if payload == &[1, 2, 3]));
}

#[test]
fn fresh_descriptors_use_four_byte_lengths() {
    let d = Descriptor::new(DescriptorBody::DecoderSpecificInfo(vec![0x11, 0x90]));
    let mut out = Vec::new();
    d.write(&mut out).unwrap();
    assert_eq!(out, [0x05, 0x80, 0x80, 0x80, 0x02, 0x11, 0x90]);
    assert_eq!(d.size(), 7);
}

#[test]
fn declared_length_past_end_is_corrupt() {
    let bytes = [0x05, 0x10, 1, 2];
    assert!(Descriptor::read(&mut Cursor::new(&bytes)).unwrap_err().is_corrupt());
}
