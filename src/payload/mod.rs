//! Typed box payloads.
//!
//! A [`BoxData`] is created blank by the factory and then initialized from the
//! payload bytes. Boxes with children only hold their fixed prefix here; the
//! children themselves live in the tree.

mod esds;
mod headers;
mod sample_entry;
mod tables;

pub use esds::EsdsBox;
pub use headers::{
    FileTypeBox, HandlerBox, MediaHeaderBox, MovieExtendsHeaderBox, MovieHeaderBox, TrackHeaderBox,
};
pub use sample_entry::{AudioSampleEntry, SampleEntryBase, VisualSampleEntry};
pub use tables::{
    ChunkOffsetBox, CompositionOffsetBox, CompositionOffsetEntry, EditListBox, EditListEntry,
    EntryTableBox, TimeToSampleBox, TimeToSampleEntry,
};

use crate::boxes::BoxType;
use crate::error::{Error, Result};
use crate::timescale::TimeScalable;
use crate::util::{copy_range, read_slice};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{Read, Seek};

/// Decode/encode contract shared by every structured payload.
///
/// `version` is the FullBox version, or 0 for plain boxes.
pub trait Payload {
    fn read_payload(&mut self, r: &mut dyn Read, version: u8) -> Result<()>;
    fn write_payload(&self, out: &mut Vec<u8>, version: u8) -> Result<()>;
    fn payload_size(&self, version: u8) -> u64;
}

/// Opaque payload. Bytes stay in the file until someone asks for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataBox {
    source: Option<(u64, u64)>,
    bytes: Option<Vec<u8>>,
}

impl DataBox {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            source: None,
            bytes: Some(bytes),
        }
    }

    pub fn on_disk(offset: u64, len: u64) -> Self {
        Self {
            source: Some((offset, len)),
            bytes: None,
        }
    }

    pub fn len(&self) -> u64 {
        match (&self.bytes, self.source) {
            (Some(b), _) => b.len() as u64,
            (None, Some((_, len))) => len,
            (None, None) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loaded(&self) -> bool {
        self.bytes.is_some() || self.source.is_none()
    }

    /// True once the payload was replaced in memory.
    pub fn is_modified(&self) -> bool {
        self.bytes.is_some()
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    pub fn set(&mut self, bytes: Vec<u8>) {
        self.bytes = Some(bytes);
    }

    /// Payload bytes, reading them from `src` on first use.
    pub fn load<R: Read + Seek + ?Sized>(&mut self, src: &mut R) -> Result<&[u8]> {
        if self.bytes.is_none() {
            let v = match self.source {
                Some((offset, len)) => read_slice(src, offset, len).map_err(Error::truncated)?,
                None => Vec::new(),
            };
            self.bytes = Some(v);
        }
        Ok(self.bytes.as_deref().unwrap_or_default())
    }

    pub fn write_to<R: Read + Seek + ?Sized>(&self, src: &mut R, out: &mut Vec<u8>) -> Result<()> {
        match (&self.bytes, self.source) {
            (Some(b), _) => out.extend_from_slice(b),
            (None, Some((offset, len))) => copy_range(src, offset, len, out).map_err(Error::truncated)?,
            (None, None) => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxShape {
    Data,
    Full,
    Container,
    FullContainer,
    Hybrid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoxData {
    Data(DataBox),
    Container,
    FullContainer,
    FileType(FileTypeBox),
    MovieHeader(MovieHeaderBox),
    TrackHeader(TrackHeaderBox),
    MediaHeader(MediaHeaderBox),
    Handler(HandlerBox),
    MovieExtendsHeader(MovieExtendsHeaderBox),
    EditList(EditListBox),
    TimeToSample(TimeToSampleBox),
    CompositionOffset(CompositionOffsetBox),
    ChunkOffset(ChunkOffsetBox),
    EntryTable(EntryTableBox),
    AudioSampleEntry(AudioSampleEntry),
    VisualSampleEntry(VisualSampleEntry),
    SampleEntry(SampleEntryBase),
    ElementaryStream(EsdsBox),
}

impl BoxData {
    /// Does the payload start with version + flags?
    pub fn is_full(&self) -> bool {
        matches!(
            self,
            BoxData::FullContainer
                | BoxData::MovieHeader(_)
                | BoxData::TrackHeader(_)
                | BoxData::MediaHeader(_)
                | BoxData::Handler(_)
                | BoxData::MovieExtendsHeader(_)
                | BoxData::EditList(_)
                | BoxData::TimeToSample(_)
                | BoxData::CompositionOffset(_)
                | BoxData::ChunkOffset(_)
                | BoxData::EntryTable(_)
                | BoxData::ElementaryStream(_)
        )
    }

    pub fn has_children(&self) -> bool {
        matches!(
            self,
            BoxData::Container
                | BoxData::FullContainer
                | BoxData::EntryTable(_)
                | BoxData::AudioSampleEntry(_)
                | BoxData::VisualSampleEntry(_)
        )
    }

    pub fn shape(&self) -> BoxShape {
        match (self.is_full(), self.has_children()) {
            (false, false) => BoxShape::Data,
            (true, false) => BoxShape::Full,
            (true, true) if self.payload_size(0) > 0 => BoxShape::Hybrid,
            (true, true) => BoxShape::FullContainer,
            (false, true) if self.payload_size(0) > 0 => BoxShape::Hybrid,
            (false, true) => BoxShape::Container,
        }
    }

    fn as_payload(&self) -> Option<&dyn Payload> {
        let p: &dyn Payload = match self {
            BoxData::Data(_) | BoxData::Container | BoxData::FullContainer => return None,
            BoxData::FileType(b) => b,
            BoxData::MovieHeader(b) => b,
            BoxData::TrackHeader(b) => b,
            BoxData::MediaHeader(b) => b,
            BoxData::Handler(b) => b,
            BoxData::MovieExtendsHeader(b) => b,
            BoxData::EditList(b) => b,
            BoxData::TimeToSample(b) => b,
            BoxData::CompositionOffset(b) => b,
            BoxData::ChunkOffset(b) => b,
            BoxData::EntryTable(b) => b,
            BoxData::AudioSampleEntry(b) => b,
            BoxData::VisualSampleEntry(b) => b,
            BoxData::SampleEntry(b) => b,
            BoxData::ElementaryStream(b) => b,
        };
        Some(p)
    }

    fn as_payload_mut(&mut self) -> Option<&mut dyn Payload> {
        let p: &mut dyn Payload = match self {
            BoxData::Data(_) | BoxData::Container | BoxData::FullContainer => return None,
            BoxData::FileType(b) => b,
            BoxData::MovieHeader(b) => b,
            BoxData::TrackHeader(b) => b,
            BoxData::MediaHeader(b) => b,
            BoxData::Handler(b) => b,
            BoxData::MovieExtendsHeader(b) => b,
            BoxData::EditList(b) => b,
            BoxData::TimeToSample(b) => b,
            BoxData::CompositionOffset(b) => b,
            BoxData::ChunkOffset(b) => b,
            BoxData::EntryTable(b) => b,
            BoxData::AudioSampleEntry(b) => b,
            BoxData::VisualSampleEntry(b) => b,
            BoxData::SampleEntry(b) => b,
            BoxData::ElementaryStream(b) => b,
        };
        Some(p)
    }

    /// Initialize a blank payload from `r`. Data boxes are not read here.
    pub fn read_payload(&mut self, r: &mut dyn Read, version: u8) -> Result<()> {
        match self.as_payload_mut() {
            Some(p) => p.read_payload(r, version).map_err(|e| match e {
                Error::Io(io) => Error::truncated(io),
                other => other,
            }),
            None => Ok(()),
        }
    }

    /// Encode the structured part. Data boxes are written by the tree, which
    /// owns access to the backing file.
    pub fn write_payload(&self, out: &mut Vec<u8>, version: u8) -> Result<()> {
        match self.as_payload() {
            Some(p) => p.write_payload(out, version),
            None => Ok(()),
        }
    }

    /// Size of the structured part (children excluded).
    pub fn payload_size(&self, version: u8) -> u64 {
        match self {
            BoxData::Data(d) => d.len(),
            _ => self.as_payload().map_or(0, |p| p.payload_size(version)),
        }
    }

    pub fn as_time_scalable_mut(&mut self) -> Option<&mut dyn TimeScalable> {
        match self {
            BoxData::TrackHeader(b) => Some(b as &mut dyn TimeScalable),
            BoxData::MovieExtendsHeader(b) => Some(b as &mut dyn TimeScalable),
            BoxData::EditList(b) => Some(b as &mut dyn TimeScalable),
            BoxData::TimeToSample(b) => Some(b as &mut dyn TimeScalable),
            BoxData::CompositionOffset(b) => Some(b as &mut dyn TimeScalable),
            _ => None,
        }
    }

    pub fn handler_type(&self) -> Option<BoxType> {
        match self {
            BoxData::Handler(h) => Some(h.handler_type),
            _ => None,
        }
    }

    /// One-line description for dumps.
    pub fn summary(&self) -> Option<String> {
        match self {
            BoxData::Data(_) | BoxData::Container | BoxData::FullContainer => None,
            BoxData::FileType(b) => Some(format!(
                "major={} minor={} compatible={:?}",
                b.major_brand, b.minor_version, b.compatible_brands
            )),
            BoxData::MovieHeader(b) => Some(format!(
                "timescale={} duration={} next_track_id={}",
                b.timescale, b.duration, b.next_track_id
            )),
            BoxData::TrackHeader(b) => Some(format!(
                "track_id={} duration={} width={:.2} height={:.2}",
                b.track_id,
                b.duration,
                b.width as f32 / 65536.0,
                b.height as f32 / 65536.0
            )),
            BoxData::MediaHeader(b) => Some(format!(
                "timescale={} duration={} language={}",
                b.timescale,
                b.duration,
                b.language()
            )),
            BoxData::Handler(b) => Some(format!("handler={} name={}", b.handler_type, b.name())),
            BoxData::MovieExtendsHeader(b) => Some(format!("fragment_duration={}", b.fragment_duration)),
            BoxData::EditList(b) => Some(format!("entries={}", b.entries.len())),
            BoxData::TimeToSample(b) => Some(format!(
                "entries={} samples={}",
                b.entries.len(),
                b.sample_count()
            )),
            BoxData::CompositionOffset(b) => Some(format!("entries={}", b.entries.len())),
            BoxData::ChunkOffset(b) => Some(format!("chunks={}", b.offsets.len())),
            BoxData::EntryTable(b) => Some(format!("entry_count={}", b.entry_count)),
            BoxData::AudioSampleEntry(b) => Some(format!(
                "channels={} sample_size={} sample_rate={}",
                b.channel_count,
                b.sample_size,
                b.sample_rate >> 16
            )),
            BoxData::VisualSampleEntry(b) => Some(format!("width={} height={}", b.width, b.height)),
            BoxData::SampleEntry(b) => Some(format!("data_reference_index={}", b.data_reference_index)),
            BoxData::ElementaryStream(b) => b.summary(),
        }
    }
}

/// Creation/modification times and durations are 32-bit in version 0 and
/// 64-bit in version 1.
pub(crate) fn read_versioned(r: &mut dyn Read, version: u8) -> Result<u64> {
    Ok(if version == 1 {
        r.read_u64::<BigEndian>()?
    } else {
        r.read_u32::<BigEndian>()? as u64
    })
}

pub(crate) fn write_versioned(out: &mut Vec<u8>, value: u64, version: u8, field: &str) -> Result<()> {
    if version == 1 {
        out.write_u64::<BigEndian>(value)?;
    } else {
        let v = u32::try_from(value).map_err(|_| {
            Error::invalid_argument(format!("{field}={value} needs a version 1 box"))
        })?;
        out.write_u32::<BigEndian>(v)?;
    }
    Ok(())
}

pub(crate) fn versioned_size(version: u8) -> u64 {
    if version == 1 { 8 } else { 4 }
}

/// Capacity hint for tables whose count comes straight from the file.
pub(crate) fn bounded_capacity(count: u32) -> usize {
    (count as usize).min(4096)
}
