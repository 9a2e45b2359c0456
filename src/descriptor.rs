//! ISO/IEC 14496-1 descriptors, as carried inside the `esds` box.
//!
//! Every descriptor is a tag byte, a 1 to 4 byte length with seven value bits
//! per byte, and a payload. Descriptors nest: the elementary stream descriptor
//! holds a decoder configuration, which in turn may hold decoder specific info
//! and profile/level indications.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

pub const ES_DESCRIPTOR_TAG: u8 = 0x03;
pub const DECODER_CONFIG_TAG: u8 = 0x04;
pub const DECODER_SPECIFIC_INFO_TAG: u8 = 0x05;
pub const SL_CONFIG_TAG: u8 = 0x06;
pub const PROFILE_LEVEL_INDICATION_INDEX_TAG: u8 = 0x14;

pub const MAX_LENGTH_BYTES: u8 = 4;
pub const MAX_LENGTH: u32 = (1 << 28) - 1;

/// Length width for descriptors built in memory (`80 80 80 xx`).
pub const DEFAULT_LENGTH_BYTES: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeader {
    pub tag: u8,
    pub length: u32,
    /// Number of bytes the length field took.
    pub size_of_length: u8,
}

impl DescriptorHeader {
    pub fn read<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let tag = r.read_u8().map_err(Error::truncated)?;
        let (length, size_of_length) = decode_length(r)?;
        Ok(Self {
            tag,
            length,
            size_of_length,
        })
    }

    pub fn size(&self) -> u64 {
        1 + self.size_of_length as u64 + self.length as u64
    }
}

/// Decode a descriptor length, returning the value and the bytes consumed.
pub fn decode_length<R: Read + ?Sized>(r: &mut R) -> Result<(u32, u8)> {
    let mut length = 0u32;
    let mut count = 0u8;
    loop {
        let b = r.read_u8().map_err(Error::truncated)?;
        count += 1;
        length = (length << 7) | (b & 0x7F) as u32;
        if b & 0x80 == 0 {
            return Ok((length, count));
        }
        if count == MAX_LENGTH_BYTES {
            return Err(Error::corrupt("descriptor length runs past four bytes"));
        }
    }
}

/// Fewest 7-bit groups that can hold `length`.
pub fn minimal_length_bytes(length: u32) -> u8 {
    let mut n = 1;
    let mut rest = length >> 7;
    while rest > 0 {
        n += 1;
        rest >>= 7;
    }
    n
}

/// Write `length` using `width` bytes, widened if `width` cannot hold it.
pub fn encode_length(out: &mut Vec<u8>, length: u32, width: u8) -> Result<()> {
    if length > MAX_LENGTH {
        return Err(Error::invalid_argument(format!(
            "descriptor length {length} does not fit in four bytes"
        )));
    }
    let width = effective_width(length, width);
    for i in (0..width).rev() {
        let mut b = ((length >> (7 * i as u32)) & 0x7F) as u8;
        if i != 0 {
            b |= 0x80;
        }
        out.push(b);
    }
    Ok(())
}

fn effective_width(length: u32, requested: u8) -> u8 {
    requested.clamp(minimal_length_bytes(length.min(MAX_LENGTH)), MAX_LENGTH_BYTES)
}

fn payload_length(size: u64) -> Result<u32> {
    u32::try_from(size)
        .ok()
        .filter(|l| *l <= MAX_LENGTH)
        .ok_or_else(|| Error::invalid_argument(format!("descriptor payload of {size} bytes is too large")))
}

/// One tag-length-value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Width of the length field; kept from decode so re-encoding is byte exact.
    pub size_of_length: u8,
    pub body: DescriptorBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorBody {
    ElementaryStream(EsDescriptor),
    DecoderConfig(DecoderConfigDescriptor),
    DecoderSpecificInfo(Vec<u8>),
    SlConfig(Vec<u8>),
    ProfileLevelIndicationIndex(u8),
    Unknown { tag: u8, payload: Vec<u8> },
}

impl Descriptor {
    pub fn new(body: DescriptorBody) -> Self {
        Self {
            size_of_length: DEFAULT_LENGTH_BYTES,
            body,
        }
    }

    pub fn tag(&self) -> u8 {
        match &self.body {
            DescriptorBody::ElementaryStream(_) => ES_DESCRIPTOR_TAG,
            DescriptorBody::DecoderConfig(_) => DECODER_CONFIG_TAG,
            DescriptorBody::DecoderSpecificInfo(_) => DECODER_SPECIFIC_INFO_TAG,
            DescriptorBody::SlConfig(_) => SL_CONFIG_TAG,
            DescriptorBody::ProfileLevelIndicationIndex(_) => PROFILE_LEVEL_INDICATION_INDEX_TAG,
            DescriptorBody::Unknown { tag, .. } => *tag,
        }
    }

    pub fn read<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let header = DescriptorHeader::read(r)?;
        let mut payload = Vec::new();
        r.take(header.length as u64).read_to_end(&mut payload)?;
        if payload.len() as u64 != header.length as u64 {
            return Err(Error::corrupt(format!(
                "descriptor 0x{:02x} declares {} bytes, {} available",
                header.tag,
                header.length,
                payload.len()
            )));
        }
        Ok(Self {
            size_of_length: header.size_of_length,
            body: DescriptorBody::decode(header.tag, &payload)?,
        })
    }

    pub fn payload_size(&self) -> u64 {
        match &self.body {
            DescriptorBody::ElementaryStream(es) => es.payload_size(),
            DescriptorBody::DecoderConfig(dc) => dc.payload_size(),
            DescriptorBody::DecoderSpecificInfo(b) | DescriptorBody::SlConfig(b) => b.len() as u64,
            DescriptorBody::ProfileLevelIndicationIndex(_) => 1,
            DescriptorBody::Unknown { payload, .. } => payload.len() as u64,
        }
    }

    /// Encoded size including tag and length field.
    pub fn size(&self) -> u64 {
        let payload = self.payload_size();
        let width = effective_width(payload.min(MAX_LENGTH as u64) as u32, self.size_of_length);
        1 + width as u64 + payload
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(self.tag());
        encode_length(out, payload_length(self.payload_size())?, self.size_of_length)?;
        match &self.body {
            DescriptorBody::ElementaryStream(es) => es.write(out),
            DescriptorBody::DecoderConfig(dc) => dc.write(out),
            DescriptorBody::DecoderSpecificInfo(b) | DescriptorBody::SlConfig(b) => {
                out.extend_from_slice(b);
                Ok(())
            }
            DescriptorBody::ProfileLevelIndicationIndex(i) => {
                out.push(*i);
                Ok(())
            }
            DescriptorBody::Unknown { payload, .. } => {
                out.extend_from_slice(payload);
                Ok(())
            }
        }
    }
}

impl DescriptorBody {
    pub fn decode(tag: u8, payload: &[u8]) -> Result<Self> {
        Ok(match tag {
            ES_DESCRIPTOR_TAG => Self::ElementaryStream(EsDescriptor::decode(payload)?),
            DECODER_CONFIG_TAG => Self::DecoderConfig(DecoderConfigDescriptor::decode(payload)?),
            DECODER_SPECIFIC_INFO_TAG => Self::DecoderSpecificInfo(payload.to_vec()),
            SL_CONFIG_TAG => Self::SlConfig(payload.to_vec()),
            PROFILE_LEVEL_INDICATION_INDEX_TAG if payload.len() == 1 => {
                Self::ProfileLevelIndicationIndex(payload[0])
            }
            _ => Self::Unknown {
                tag,
                payload: payload.to_vec(),
            },
        })
    }
}

/// Read descriptors until `payload` is used up. Whatever cannot be parsed as
/// a descriptor is returned as residual bytes.
fn read_nested(cur: &mut Cursor<&[u8]>) -> Result<(Vec<Descriptor>, Vec<u8>)> {
    let payload = *cur.get_ref();
    let mut found = Vec::new();
    while (cur.position() as usize) < payload.len() {
        let start = cur.position() as usize;
        match Descriptor::read(cur) {
            Ok(d) => found.push(d),
            Err(e) if e.is_corrupt() => {
                tracing::debug!("keeping {} trailing descriptor bytes as residual", payload.len() - start);
                return Ok((found, payload[start..].to_vec()));
            }
            Err(e) => return Err(e),
        }
    }
    Ok((found, Vec::new()))
}

fn rest(cur: &Cursor<&[u8]>) -> Vec<u8> {
    let payload = *cur.get_ref();
    payload[(cur.position() as usize).min(payload.len())..].to_vec()
}

/// ES_Descriptor (tag 0x03).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EsDescriptor {
    pub es_id: u16,
    pub stream_priority: u8,
    pub depends_on_es_id: Option<u16>,
    pub url: Option<Vec<u8>>,
    pub ocr_es_id: Option<u16>,
    /// Decoder config, SL config and anything else that follows.
    pub descriptors: Vec<Descriptor>,
    pub residual: Vec<u8>,
}

impl EsDescriptor {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(payload);
        let es_id = cur.read_u16::<BigEndian>().map_err(Error::truncated)?;
        let flags = cur.read_u8().map_err(Error::truncated)?;

        let depends_on_es_id = if flags & 0x80 != 0 {
            Some(cur.read_u16::<BigEndian>().map_err(Error::truncated)?)
        } else {
            None
        };
        let url = if flags & 0x40 != 0 {
            let len = cur.read_u8().map_err(Error::truncated)?;
            let mut s = vec![0u8; len as usize];
            cur.read_exact(&mut s).map_err(Error::truncated)?;
            Some(s)
        } else {
            None
        };
        let ocr_es_id = if flags & 0x20 != 0 {
            Some(cur.read_u16::<BigEndian>().map_err(Error::truncated)?)
        } else {
            None
        };

        let (descriptors, residual) = read_nested(&mut cur)?;
        Ok(Self {
            es_id,
            stream_priority: flags & 0x1F,
            depends_on_es_id,
            url,
            ocr_es_id,
            descriptors,
            residual,
        })
    }

    pub fn decoder_config(&self) -> Option<&DecoderConfigDescriptor> {
        self.descriptors.iter().find_map(|d| match &d.body {
            DescriptorBody::DecoderConfig(dc) => Some(dc),
            _ => None,
        })
    }

    pub fn payload_size(&self) -> u64 {
        let mut size = 3;
        if self.depends_on_es_id.is_some() {
            size += 2;
        }
        if let Some(url) = &self.url {
            size += 1 + url.len() as u64;
        }
        if self.ocr_es_id.is_some() {
            size += 2;
        }
        size + self.descriptors.iter().map(Descriptor::size).sum::<u64>() + self.residual.len() as u64
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u16::<BigEndian>(self.es_id)?;
        let mut flags = self.stream_priority & 0x1F;
        if self.depends_on_es_id.is_some() {
            flags |= 0x80;
        }
        if self.url.is_some() {
            flags |= 0x40;
        }
        if self.ocr_es_id.is_some() {
            flags |= 0x20;
        }
        out.push(flags);
        if let Some(id) = self.depends_on_es_id {
            out.write_u16::<BigEndian>(id)?;
        }
        if let Some(url) = &self.url {
            let len = u8::try_from(url.len())
                .map_err(|_| Error::invalid_argument("ES descriptor URL longer than 255 bytes"))?;
            out.push(len);
            out.extend_from_slice(url);
        }
        if let Some(id) = self.ocr_es_id {
            out.write_u16::<BigEndian>(id)?;
        }
        for d in &self.descriptors {
            d.write(out)?;
        }
        out.extend_from_slice(&self.residual);
        Ok(())
    }
}

/// DecoderConfigDescriptor (tag 0x04).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderConfigDescriptor {
    pub object_type_indication: u8,
    /// Six bits.
    pub stream_type: u8,
    pub up_stream: bool,
    /// The reserved bit, kept as found (it should be 1).
    pub reserved: bool,
    /// Twenty-four bits.
    pub buffer_size_db: u32,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
    pub specific_info: Option<Box<Descriptor>>,
    pub profile_level_indications: Vec<Descriptor>,
    pub residual: Vec<u8>,
}

impl DecoderConfigDescriptor {
    const FIXED_SIZE: u64 = 13;

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(payload);
        let object_type_indication = cur.read_u8().map_err(Error::truncated)?;
        let b = cur.read_u8().map_err(Error::truncated)?;
        let buffer_size_db = cur.read_u24::<BigEndian>().map_err(Error::truncated)?;
        let max_bitrate = cur.read_u32::<BigEndian>().map_err(Error::truncated)?;
        let avg_bitrate = cur.read_u32::<BigEndian>().map_err(Error::truncated)?;

        let mut dc = Self {
            object_type_indication,
            stream_type: b >> 2,
            up_stream: b & 0x02 != 0,
            reserved: b & 0x01 != 0,
            buffer_size_db,
            max_bitrate,
            avg_bitrate,
            ..Default::default()
        };

        let end = payload.len() as u64;
        if cur.position() < end && payload[cur.position() as usize] == DECODER_SPECIFIC_INFO_TAG {
            let start = cur.position();
            match Descriptor::read(&mut cur) {
                Ok(d) => dc.specific_info = Some(Box::new(d)),
                Err(e) if e.is_corrupt() => {
                    cur.set_position(start);
                    dc.residual = rest(&cur);
                    return Ok(dc);
                }
                Err(e) => return Err(e),
            }
        }

        while cur.position() < end {
            let start = cur.position();
            if payload[start as usize] != PROFILE_LEVEL_INDICATION_INDEX_TAG {
                break;
            }
            match Descriptor::read(&mut cur) {
                Ok(d) => dc.profile_level_indications.push(d),
                Err(e) if e.is_corrupt() => {
                    cur.set_position(start);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        dc.residual = rest(&cur);
        Ok(dc)
    }

    /// Payload of the decoder specific info, e.g. an AudioSpecificConfig.
    pub fn specific_info_bytes(&self) -> Option<&[u8]> {
        match self.specific_info.as_deref().map(|d| &d.body) {
            Some(DescriptorBody::DecoderSpecificInfo(b)) => Some(b),
            _ => None,
        }
    }

    pub fn payload_size(&self) -> u64 {
        Self::FIXED_SIZE
            + self.specific_info.as_ref().map_or(0, |d| d.size())
            + self
                .profile_level_indications
                .iter()
                .map(Descriptor::size)
                .sum::<u64>()
            + self.residual.len() as u64
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(self.object_type_indication);
        let mut b = (self.stream_type & 0x3F) << 2;
        if self.up_stream {
            b |= 0x02;
        }
        if self.reserved {
            b |= 0x01;
        }
        out.push(b);
        out.write_u24::<BigEndian>(self.buffer_size_db & 0x00FF_FFFF)?;
        out.write_u32::<BigEndian>(self.max_bitrate)?;
        out.write_u32::<BigEndian>(self.avg_bitrate)?;
        if let Some(d) = &self.specific_info {
            d.write(out)?;
        }
        for d in &self.profile_level_indications {
            d.write(out)?;
        }
        out.extend_from_slice(&self.residual);
        Ok(())
    }
}
