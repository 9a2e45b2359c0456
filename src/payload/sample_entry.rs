use super::Payload;
use crate::error::Result;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Read;

/// The eight bytes every sample entry starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEntryBase {
    pub reserved: [u8; 6],
    pub data_reference_index: u16,
}

impl Default for SampleEntryBase {
    fn default() -> Self {
        Self {
            reserved: [0; 6],
            data_reference_index: 1,
        }
    }
}

impl Payload for SampleEntryBase {
    fn read_payload(&mut self, r: &mut dyn Read, _version: u8) -> Result<()> {
        r.read_exact(&mut self.reserved)?;
        self.data_reference_index = r.read_u16::<BigEndian>()?;
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, _version: u8) -> Result<()> {
        out.extend_from_slice(&self.reserved);
        out.write_u16::<BigEndian>(self.data_reference_index)?;
        Ok(())
    }

    fn payload_size(&self, _version: u8) -> u64 {
        8
    }
}

/// Sound sample entry (`mp4a` and friends). Child boxes such as `esds`
/// follow the fixed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSampleEntry {
    pub base: SampleEntryBase,
    /// Sound description version: 0, or 1/2 for the QuickTime layouts.
    pub version: u16,
    pub revision: u16,
    pub vendor: u32,
    pub channel_count: u16,
    pub sample_size: u16,
    pub compression_id: u16,
    pub packet_size: u16,
    /// 16.16 fixed point.
    pub sample_rate: u32,
    /// Version 1 adds 16 bytes, version 2 adds 36.
    pub extension: Vec<u8>,
}

impl Default for AudioSampleEntry {
    fn default() -> Self {
        Self {
            base: SampleEntryBase::default(),
            version: 0,
            revision: 0,
            vendor: 0,
            channel_count: 2,
            sample_size: 16,
            compression_id: 0,
            packet_size: 0,
            sample_rate: 44100 << 16,
            extension: Vec::new(),
        }
    }
}

impl AudioSampleEntry {
    fn extension_len(version: u16) -> usize {
        match version {
            1 => 16,
            2 => 36,
            _ => 0,
        }
    }
}

impl Payload for AudioSampleEntry {
    fn read_payload(&mut self, r: &mut dyn Read, version: u8) -> Result<()> {
        self.base.read_payload(r, version)?;
        self.version = r.read_u16::<BigEndian>()?;
        self.revision = r.read_u16::<BigEndian>()?;
        self.vendor = r.read_u32::<BigEndian>()?;
        self.channel_count = r.read_u16::<BigEndian>()?;
        self.sample_size = r.read_u16::<BigEndian>()?;
        self.compression_id = r.read_u16::<BigEndian>()?;
        self.packet_size = r.read_u16::<BigEndian>()?;
        self.sample_rate = r.read_u32::<BigEndian>()?;
        self.extension = vec![0u8; Self::extension_len(self.version)];
        r.read_exact(&mut self.extension)?;
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, version: u8) -> Result<()> {
        self.base.write_payload(out, version)?;
        out.write_u16::<BigEndian>(self.version)?;
        out.write_u16::<BigEndian>(self.revision)?;
        out.write_u32::<BigEndian>(self.vendor)?;
        out.write_u16::<BigEndian>(self.channel_count)?;
        out.write_u16::<BigEndian>(self.sample_size)?;
        out.write_u16::<BigEndian>(self.compression_id)?;
        out.write_u16::<BigEndian>(self.packet_size)?;
        out.write_u32::<BigEndian>(self.sample_rate)?;
        out.extend_from_slice(&self.extension);
        Ok(())
    }

    fn payload_size(&self, _version: u8) -> u64 {
        28 + self.extension.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualSampleEntry {
    pub base: SampleEntryBase,
    pub pre_defined1: u16,
    pub reserved1: u16,
    pub pre_defined2: [u32; 3],
    pub width: u16,
    pub height: u16,
    /// 16.16 fixed point, 72 dpi by default.
    pub horiz_resolution: u32,
    pub vert_resolution: u32,
    pub reserved2: u32,
    pub frame_count: u16,
    /// Pascal string padded to 32 bytes.
    pub compressor_name: [u8; 32],
    pub depth: u16,
    pub pre_defined3: i16,
}

impl Default for VisualSampleEntry {
    fn default() -> Self {
        Self {
            base: SampleEntryBase::default(),
            pre_defined1: 0,
            reserved1: 0,
            pre_defined2: [0; 3],
            width: 0,
            height: 0,
            horiz_resolution: 0x0048_0000,
            vert_resolution: 0x0048_0000,
            reserved2: 0,
            frame_count: 1,
            compressor_name: [0; 32],
            depth: 0x0018,
            pre_defined3: -1,
        }
    }
}

impl VisualSampleEntry {
    pub fn compressor_name(&self) -> String {
        let len = (self.compressor_name[0] as usize).min(31);
        String::from_utf8_lossy(&self.compressor_name[1..1 + len]).to_string()
    }
}

impl Payload for VisualSampleEntry {
    fn read_payload(&mut self, r: &mut dyn Read, version: u8) -> Result<()> {
        self.base.read_payload(r, version)?;
        self.pre_defined1 = r.read_u16::<BigEndian>()?;
        self.reserved1 = r.read_u16::<BigEndian>()?;
        for v in self.pre_defined2.iter_mut() {
            *v = r.read_u32::<BigEndian>()?;
        }
        self.width = r.read_u16::<BigEndian>()?;
        self.height = r.read_u16::<BigEndian>()?;
        self.horiz_resolution = r.read_u32::<BigEndian>()?;
        self.vert_resolution = r.read_u32::<BigEndian>()?;
        self.reserved2 = r.read_u32::<BigEndian>()?;
        self.frame_count = r.read_u16::<BigEndian>()?;
        r.read_exact(&mut self.compressor_name)?;
        self.depth = r.read_u16::<BigEndian>()?;
        self.pre_defined3 = r.read_i16::<BigEndian>()?;
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, version: u8) -> Result<()> {
        self.base.write_payload(out, version)?;
        out.write_u16::<BigEndian>(self.pre_defined1)?;
        out.write_u16::<BigEndian>(self.reserved1)?;
        for v in &self.pre_defined2 {
            out.write_u32::<BigEndian>(*v)?;
        }
        out.write_u16::<BigEndian>(self.width)?;
        out.write_u16::<BigEndian>(self.height)?;
        out.write_u32::<BigEndian>(self.horiz_resolution)?;
        out.write_u32::<BigEndian>(self.vert_resolution)?;
        out.write_u32::<BigEndian>(self.reserved2)?;
        out.write_u16::<BigEndian>(self.frame_count)?;
        out.extend_from_slice(&self.compressor_name);
        out.write_u16::<BigEndian>(self.depth)?;
        out.write_i16::<BigEndian>(self.pre_defined3)?;
        Ok(())
    }

    fn payload_size(&self, _version: u8) -> u64 {
        78
    }
}
