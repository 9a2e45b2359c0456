use super::{Payload, read_versioned, versioned_size, write_versioned};
use crate::boxes::BoxType;
use crate::error::{Error, Result};
use crate::timescale::{TimeScalable, TimescaleScope, rescale_ticks};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Read;

const IDENTITY_MATRIX: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

fn read_matrix(r: &mut dyn Read) -> Result<[u32; 9]> {
    let mut m = [0u32; 9];
    for v in m.iter_mut() {
        *v = r.read_u32::<BigEndian>()?;
    }
    Ok(m)
}

fn write_matrix(out: &mut Vec<u8>, m: &[u32; 9]) -> Result<()> {
    for v in m {
        out.write_u32::<BigEndian>(*v)?;
    }
    Ok(())
}

/// All-ones durations mean "unknown" and are never rescaled.
fn is_unknown_duration(duration: u64, version: u8) -> bool {
    duration == u64::MAX || (version == 0 && duration == u32::MAX as u64)
}

// ---------- ftyp ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeBox {
    pub major_brand: BoxType,
    pub minor_version: u32,
    pub compatible_brands: Vec<BoxType>,
    /// Bytes after the last whole brand.
    pub trailing: Vec<u8>,
}

impl Default for FileTypeBox {
    fn default() -> Self {
        Self {
            major_brand: BoxType(*b"isom"),
            minor_version: 0,
            compatible_brands: Vec::new(),
            trailing: Vec::new(),
        }
    }
}

impl Payload for FileTypeBox {
    fn read_payload(&mut self, r: &mut dyn Read, _version: u8) -> Result<()> {
        let mut major = [0u8; 4];
        r.read_exact(&mut major)?;
        self.major_brand = BoxType(major);
        self.minor_version = r.read_u32::<BigEndian>()?;
        let mut rest = Vec::new();
        r.read_to_end(&mut rest)?;
        let mut chunks = rest.chunks_exact(4);
        self.compatible_brands = chunks
            .by_ref()
            .map(|c| BoxType([c[0], c[1], c[2], c[3]]))
            .collect();
        self.trailing = chunks.remainder().to_vec();
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, _version: u8) -> Result<()> {
        out.extend_from_slice(&self.major_brand.0);
        out.write_u32::<BigEndian>(self.minor_version)?;
        for b in &self.compatible_brands {
            out.extend_from_slice(&b.0);
        }
        out.extend_from_slice(&self.trailing);
        Ok(())
    }

    fn payload_size(&self, _version: u8) -> u64 {
        8 + 4 * self.compatible_brands.len() as u64 + self.trailing.len() as u64
    }
}

// ---------- mvhd ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieHeaderBox {
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// 16.16 fixed point.
    pub rate: u32,
    /// 8.8 fixed point.
    pub volume: u16,
    pub reserved: [u8; 10],
    pub matrix: [u32; 9],
    pub pre_defined: [u8; 24],
    pub next_track_id: u32,
}

impl Default for MovieHeaderBox {
    fn default() -> Self {
        Self {
            creation_time: 0,
            modification_time: 0,
            timescale: 1000,
            duration: 0,
            rate: 0x0001_0000,
            volume: 0x0100,
            reserved: [0; 10],
            matrix: IDENTITY_MATRIX,
            pre_defined: [0; 24],
            next_track_id: 1,
        }
    }
}

impl MovieHeaderBox {
    /// Rescale this header's own duration for a timescale change.
    pub(crate) fn rescale_own_duration(&mut self, version: u8, old: u32, new: u32) {
        if !is_unknown_duration(self.duration, version) {
            self.duration = rescale_ticks(self.duration, old, new);
        }
    }
}

impl Payload for MovieHeaderBox {
    fn read_payload(&mut self, r: &mut dyn Read, version: u8) -> Result<()> {
        self.creation_time = read_versioned(r, version)?;
        self.modification_time = read_versioned(r, version)?;
        self.timescale = r.read_u32::<BigEndian>()?;
        self.duration = read_versioned(r, version)?;
        self.rate = r.read_u32::<BigEndian>()?;
        self.volume = r.read_u16::<BigEndian>()?;
        r.read_exact(&mut self.reserved)?;
        self.matrix = read_matrix(r)?;
        r.read_exact(&mut self.pre_defined)?;
        self.next_track_id = r.read_u32::<BigEndian>()?;
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, version: u8) -> Result<()> {
        write_versioned(out, self.creation_time, version, "mvhd creation_time")?;
        write_versioned(out, self.modification_time, version, "mvhd modification_time")?;
        out.write_u32::<BigEndian>(self.timescale)?;
        write_versioned(out, self.duration, version, "mvhd duration")?;
        out.write_u32::<BigEndian>(self.rate)?;
        out.write_u16::<BigEndian>(self.volume)?;
        out.extend_from_slice(&self.reserved);
        write_matrix(out, &self.matrix)?;
        out.extend_from_slice(&self.pre_defined);
        out.write_u32::<BigEndian>(self.next_track_id)?;
        Ok(())
    }

    fn payload_size(&self, version: u8) -> u64 {
        3 * versioned_size(version) + 4 + 80
    }
}

// ---------- tkhd ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHeaderBox {
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    pub reserved1: u32,
    /// In movie timescale units.
    pub duration: u64,
    pub reserved2: [u8; 8],
    pub layer: i16,
    pub alternate_group: i16,
    pub volume: i16,
    pub reserved3: u16,
    pub matrix: [u32; 9],
    /// 16.16 fixed point.
    pub width: u32,
    pub height: u32,
    /// Version the box was read with; tells a 32-bit "unknown" duration apart.
    version: u8,
}

impl Default for TrackHeaderBox {
    fn default() -> Self {
        Self {
            creation_time: 0,
            modification_time: 0,
            track_id: 1,
            reserved1: 0,
            duration: 0,
            reserved2: [0; 8],
            layer: 0,
            alternate_group: 0,
            volume: 0,
            reserved3: 0,
            matrix: IDENTITY_MATRIX,
            width: 0,
            height: 0,
            version: 0,
        }
    }
}

impl Payload for TrackHeaderBox {
    fn read_payload(&mut self, r: &mut dyn Read, version: u8) -> Result<()> {
        self.version = version;
        self.creation_time = read_versioned(r, version)?;
        self.modification_time = read_versioned(r, version)?;
        self.track_id = r.read_u32::<BigEndian>()?;
        self.reserved1 = r.read_u32::<BigEndian>()?;
        self.duration = read_versioned(r, version)?;
        r.read_exact(&mut self.reserved2)?;
        self.layer = r.read_i16::<BigEndian>()?;
        self.alternate_group = r.read_i16::<BigEndian>()?;
        self.volume = r.read_i16::<BigEndian>()?;
        self.reserved3 = r.read_u16::<BigEndian>()?;
        self.matrix = read_matrix(r)?;
        self.width = r.read_u32::<BigEndian>()?;
        self.height = r.read_u32::<BigEndian>()?;
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, version: u8) -> Result<()> {
        write_versioned(out, self.creation_time, version, "tkhd creation_time")?;
        write_versioned(out, self.modification_time, version, "tkhd modification_time")?;
        out.write_u32::<BigEndian>(self.track_id)?;
        out.write_u32::<BigEndian>(self.reserved1)?;
        write_versioned(out, self.duration, version, "tkhd duration")?;
        out.extend_from_slice(&self.reserved2);
        out.write_i16::<BigEndian>(self.layer)?;
        out.write_i16::<BigEndian>(self.alternate_group)?;
        out.write_i16::<BigEndian>(self.volume)?;
        out.write_u16::<BigEndian>(self.reserved3)?;
        write_matrix(out, &self.matrix)?;
        out.write_u32::<BigEndian>(self.width)?;
        out.write_u32::<BigEndian>(self.height)?;
        Ok(())
    }

    fn payload_size(&self, version: u8) -> u64 {
        3 * versioned_size(version) + 8 + 60
    }
}

impl TimeScalable for TrackHeaderBox {
    fn rescale(&mut self, scope: TimescaleScope, old: u32, new: u32) {
        if scope == TimescaleScope::Movie && !is_unknown_duration(self.duration, self.version) {
            self.duration = rescale_ticks(self.duration, old, new);
        }
    }
}

// ---------- mdhd ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHeaderBox {
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// Packed ISO-639-2/T code, five bits per letter.
    pub language: u16,
    pub pre_defined: u16,
}

impl Default for MediaHeaderBox {
    fn default() -> Self {
        Self {
            creation_time: 0,
            modification_time: 0,
            timescale: 1000,
            duration: 0,
            language: 0x55C4, // "und"
            pre_defined: 0,
        }
    }
}

impl MediaHeaderBox {
    pub fn language(&self) -> String {
        let code = self.language;
        if code == 0 {
            return "und".to_string();
        }
        let c1 = ((code >> 10) & 0x1F) as u8 + 0x60;
        let c2 = ((code >> 5) & 0x1F) as u8 + 0x60;
        let c3 = (code & 0x1F) as u8 + 0x60;
        format!("{}{}{}", c1 as char, c2 as char, c3 as char)
    }

    pub fn set_language(&mut self, lang: &str) -> Result<()> {
        let b = lang.as_bytes();
        if b.len() != 3 || !b.iter().all(|c| c.is_ascii_lowercase()) {
            return Err(Error::invalid_argument(format!("{lang:?} is not a three letter language code")));
        }
        self.language = b
            .iter()
            .fold(0u16, |acc, c| (acc << 5) | (c - 0x60) as u16);
        Ok(())
    }

    pub(crate) fn rescale_own_duration(&mut self, version: u8, old: u32, new: u32) {
        if !is_unknown_duration(self.duration, version) {
            self.duration = rescale_ticks(self.duration, old, new);
        }
    }
}

impl Payload for MediaHeaderBox {
    fn read_payload(&mut self, r: &mut dyn Read, version: u8) -> Result<()> {
        self.creation_time = read_versioned(r, version)?;
        self.modification_time = read_versioned(r, version)?;
        self.timescale = r.read_u32::<BigEndian>()?;
        self.duration = read_versioned(r, version)?;
        self.language = r.read_u16::<BigEndian>()?;
        self.pre_defined = r.read_u16::<BigEndian>()?;
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, version: u8) -> Result<()> {
        write_versioned(out, self.creation_time, version, "mdhd creation_time")?;
        write_versioned(out, self.modification_time, version, "mdhd modification_time")?;
        out.write_u32::<BigEndian>(self.timescale)?;
        write_versioned(out, self.duration, version, "mdhd duration")?;
        out.write_u16::<BigEndian>(self.language)?;
        out.write_u16::<BigEndian>(self.pre_defined)?;
        Ok(())
    }

    fn payload_size(&self, version: u8) -> u64 {
        3 * versioned_size(version) + 4 + 4
    }
}

// ---------- hdlr ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerBox {
    pub pre_defined: u32,
    pub handler_type: BoxType,
    pub reserved: [u8; 12],
    /// Raw name bytes, terminator included when the file has one.
    pub name: Vec<u8>,
}

impl Default for HandlerBox {
    fn default() -> Self {
        Self {
            pre_defined: 0,
            handler_type: BoxType(*b"null"),
            reserved: [0; 12],
            name: vec![0],
        }
    }
}

impl HandlerBox {
    pub fn name(&self) -> String {
        let mut bytes = self.name.as_slice();
        while let [rest @ .., 0] = bytes {
            bytes = rest;
        }
        String::from_utf8_lossy(bytes).to_string()
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.as_bytes().to_vec();
        self.name.push(0);
    }
}

impl Payload for HandlerBox {
    fn read_payload(&mut self, r: &mut dyn Read, _version: u8) -> Result<()> {
        self.pre_defined = r.read_u32::<BigEndian>()?;
        let mut handler_type = [0u8; 4];
        r.read_exact(&mut handler_type)?;
        self.handler_type = BoxType(handler_type);
        r.read_exact(&mut self.reserved)?;
        self.name.clear();
        r.read_to_end(&mut self.name)?;
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, _version: u8) -> Result<()> {
        out.write_u32::<BigEndian>(self.pre_defined)?;
        out.extend_from_slice(&self.handler_type.0);
        out.extend_from_slice(&self.reserved);
        out.extend_from_slice(&self.name);
        Ok(())
    }

    fn payload_size(&self, _version: u8) -> u64 {
        20 + self.name.len() as u64
    }
}

// ---------- mehd ----------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieExtendsHeaderBox {
    /// In movie timescale units.
    pub fragment_duration: u64,
}

impl Payload for MovieExtendsHeaderBox {
    fn read_payload(&mut self, r: &mut dyn Read, version: u8) -> Result<()> {
        self.fragment_duration = read_versioned(r, version)?;
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, version: u8) -> Result<()> {
        write_versioned(out, self.fragment_duration, version, "mehd fragment_duration")
    }

    fn payload_size(&self, version: u8) -> u64 {
        versioned_size(version)
    }
}

impl TimeScalable for MovieExtendsHeaderBox {
    fn rescale(&mut self, scope: TimescaleScope, old: u32, new: u32) {
        if scope == TimescaleScope::Movie {
            self.fragment_duration = rescale_ticks(self.fragment_duration, old, new);
        }
    }
}
