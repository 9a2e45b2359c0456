#![allow(dead_code)]

//! Byte-level builders for synthetic MP4 files.

pub fn bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

pub fn full(typ: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut p = Vec::new();
    p.push(version);
    p.extend_from_slice(&flags.to_be_bytes()[1..]);
    p.extend_from_slice(payload);
    bx(typ, &p)
}

pub fn container(typ: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    bx(typ, &children.concat())
}

fn be32(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

const MATRIX: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

pub fn ftyp() -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(b"isom");
    p.extend_from_slice(&be32(512));
    p.extend_from_slice(b"isom");
    p.extend_from_slice(b"mp41");
    bx(b"ftyp", &p)
}

pub fn mvhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&be32(0)); // creation
    p.extend_from_slice(&be32(0)); // modification
    p.extend_from_slice(&be32(timescale));
    p.extend_from_slice(&be32(duration));
    p.extend_from_slice(&be32(0x0001_0000)); // rate
    p.extend_from_slice(&0x0100u16.to_be_bytes()); // volume
    p.extend_from_slice(&[0u8; 10]);
    for m in MATRIX {
        p.extend_from_slice(&be32(m));
    }
    p.extend_from_slice(&[0u8; 24]);
    p.extend_from_slice(&be32(2)); // next track id
    full(b"mvhd", 0, 0, &p)
}

pub fn tkhd(track_id: u32, duration: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&be32(0));
    p.extend_from_slice(&be32(0));
    p.extend_from_slice(&be32(track_id));
    p.extend_from_slice(&be32(0));
    p.extend_from_slice(&be32(duration));
    p.extend_from_slice(&[0u8; 8]);
    p.extend_from_slice(&[0, 0, 0, 0]); // layer, alternate group
    p.extend_from_slice(&0x0100u16.to_be_bytes()); // volume
    p.extend_from_slice(&[0, 0]);
    for m in MATRIX {
        p.extend_from_slice(&be32(m));
    }
    p.extend_from_slice(&be32(0));
    p.extend_from_slice(&be32(0));
    full(b"tkhd", 0, 7, &p)
}

pub fn elst(segment_duration: u32, media_time: i32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&be32(1));
    p.extend_from_slice(&be32(segment_duration));
    p.extend_from_slice(&media_time.to_be_bytes());
    p.extend_from_slice(&1i16.to_be_bytes());
    p.extend_from_slice(&0i16.to_be_bytes());
    full(b"elst", 0, 0, &p)
}

pub fn mdhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&be32(0));
    p.extend_from_slice(&be32(0));
    p.extend_from_slice(&be32(timescale));
    p.extend_from_slice(&be32(duration));
    p.extend_from_slice(&0x55C4u16.to_be_bytes()); // "und"
    p.extend_from_slice(&[0, 0]);
    full(b"mdhd", 0, 0, &p)
}

pub fn hdlr(handler: &[u8; 4], name: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&be32(0));
    p.extend_from_slice(handler);
    p.extend_from_slice(&[0u8; 12]);
    p.extend_from_slice(name.as_bytes());
    p.push(0);
    full(b"hdlr", 0, 0, &p)
}

/// ES descriptor for AAC-LC, stereo 44.1 kHz. `wide` uses four byte length
/// fields everywhere, as many muxers do.
pub fn es_descriptor(wide: bool) -> Vec<u8> {
    fn len(out: &mut Vec<u8>, n: u8, wide: bool) {
        if wide {
            out.extend_from_slice(&[0x80, 0x80, 0x80]);
        }
        out.push(n);
    }
    let mut dsi = vec![0x05];
    len(&mut dsi, 2, wide);
    dsi.extend_from_slice(&[0x12, 0x10]);

    let mut dc_payload = vec![0x40, 0x15, 0x00, 0x18, 0x00];
    dc_payload.extend_from_slice(&be32(128_000));
    dc_payload.extend_from_slice(&be32(128_000));
    dc_payload.extend_from_slice(&dsi);
    let mut dc = vec![0x04];
    len(&mut dc, dc_payload.len() as u8, wide);
    dc.extend_from_slice(&dc_payload);

    let mut sl = vec![0x06];
    len(&mut sl, 1, wide);
    sl.push(0x02);

    let mut es_payload = vec![0x00, 0x01, 0x00];
    es_payload.extend_from_slice(&dc);
    es_payload.extend_from_slice(&sl);
    let mut es = vec![0x03];
    len(&mut es, es_payload.len() as u8, wide);
    es.extend_from_slice(&es_payload);
    es
}

pub fn mp4a() -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 6]);
    p.extend_from_slice(&1u16.to_be_bytes()); // data reference index
    p.extend_from_slice(&[0u8; 8]); // version, revision, vendor
    p.extend_from_slice(&2u16.to_be_bytes());
    p.extend_from_slice(&16u16.to_be_bytes());
    p.extend_from_slice(&[0u8; 4]);
    p.extend_from_slice(&be32(44_100 << 16));
    p.extend_from_slice(&full(b"esds", 0, 0, &es_descriptor(true)));
    bx(b"mp4a", &p)
}

pub fn stsd(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut p = be32(entries.len() as u32).to_vec();
    p.extend_from_slice(&entries.concat());
    full(b"stsd", 0, 0, &p)
}

pub fn stts(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut p = be32(entries.len() as u32).to_vec();
    for (c, d) in entries {
        p.extend_from_slice(&be32(*c));
        p.extend_from_slice(&be32(*d));
    }
    full(b"stts", 0, 0, &p)
}

pub fn ctts(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut p = be32(entries.len() as u32).to_vec();
    for (c, o) in entries {
        p.extend_from_slice(&be32(*c));
        p.extend_from_slice(&be32(*o));
    }
    full(b"ctts", 0, 0, &p)
}

pub fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut p = be32(offsets.len() as u32).to_vec();
    for o in offsets {
        p.extend_from_slice(&be32(*o));
    }
    full(b"stco", 0, 0, &p)
}

pub const MDAT_PAYLOAD_LEN: usize = 64;

pub fn mdat_payload() -> Vec<u8> {
    (0..MDAT_PAYLOAD_LEN as u8).collect()
}

fn moov(chunk_offsets: &[u32]) -> Vec<u8> {
    let stbl = container(
        b"stbl",
        &[
            stsd(&[mp4a()]),
            stts(&[(10, 1024)]),
            ctts(&[(10, 2048)]),
            stco(chunk_offsets),
        ],
    );
    let minf = container(b"minf", &[stbl]);
    let mdia = container(
        b"mdia",
        &[mdhd(44_100, 441_000), hdlr(b"soun", "SoundHandler"), minf],
    );
    let edts = container(b"edts", &[elst(6000, 1024)]);
    let trak = container(b"trak", &[tkhd(1, 6000), edts, mdia]);
    container(b"moov", &[mvhd(600, 6000), trak])
}

/// ftyp + moov (one AAC track) + mdat. The two chunk offsets point at bytes
/// 0 and 32 of the mdat payload.
pub fn sample_file() -> Vec<u8> {
    let head = ftyp().len() + moov(&[0, 0]).len();
    let mdat_data = (head + 8) as u32;
    let mut v = ftyp();
    v.extend(moov(&[mdat_data, mdat_data + 32]));
    v.extend(bx(b"mdat", &mdat_payload()));
    v
}

/// Offset of the mdat payload in [`sample_file`].
pub fn sample_mdat_data_offset() -> u64 {
    (ftyp().len() + moov(&[0, 0]).len() + 8) as u64
}
