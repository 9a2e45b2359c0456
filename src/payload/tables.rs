use super::{Payload, bounded_capacity, read_versioned, versioned_size, write_versioned};
use crate::error::{Error, Result};
use crate::timescale::{TimeScalable, TimescaleScope, rescale_signed, rescale_ticks};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Read;

// ---------- elst ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditListEntry {
    /// Movie timescale.
    pub segment_duration: u64,
    /// Media timescale; -1 marks an empty edit.
    pub media_time: i64,
    pub media_rate_integer: i16,
    pub media_rate_fraction: i16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditListBox {
    pub entries: Vec<EditListEntry>,
}

impl Payload for EditListBox {
    fn read_payload(&mut self, r: &mut dyn Read, version: u8) -> Result<()> {
        let count = r.read_u32::<BigEndian>()?;
        self.entries = Vec::with_capacity(bounded_capacity(count));
        for _ in 0..count {
            let segment_duration = read_versioned(r, version)?;
            let media_time = if version == 1 {
                r.read_i64::<BigEndian>()?
            } else {
                r.read_i32::<BigEndian>()? as i64
            };
            self.entries.push(EditListEntry {
                segment_duration,
                media_time,
                media_rate_integer: r.read_i16::<BigEndian>()?,
                media_rate_fraction: r.read_i16::<BigEndian>()?,
            });
        }
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, version: u8) -> Result<()> {
        out.write_u32::<BigEndian>(self.entries.len() as u32)?;
        for e in &self.entries {
            write_versioned(out, e.segment_duration, version, "elst segment_duration")?;
            if version == 1 {
                out.write_i64::<BigEndian>(e.media_time)?;
            } else {
                let t = i32::try_from(e.media_time).map_err(|_| {
                    Error::invalid_argument(format!("elst media_time={} needs a version 1 box", e.media_time))
                })?;
                out.write_i32::<BigEndian>(t)?;
            }
            out.write_i16::<BigEndian>(e.media_rate_integer)?;
            out.write_i16::<BigEndian>(e.media_rate_fraction)?;
        }
        Ok(())
    }

    fn payload_size(&self, version: u8) -> u64 {
        4 + self.entries.len() as u64 * (2 * versioned_size(version) + 4)
    }
}

impl TimeScalable for EditListBox {
    fn rescale(&mut self, scope: TimescaleScope, old: u32, new: u32) {
        for e in &mut self.entries {
            match scope {
                TimescaleScope::Movie => {
                    e.segment_duration = rescale_ticks(e.segment_duration, old, new);
                }
                TimescaleScope::Media if e.media_time >= 0 => {
                    e.media_time = rescale_signed(e.media_time, old, new);
                }
                TimescaleScope::Media => {}
            }
        }
    }
}

// ---------- stts ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeToSampleEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeToSampleBox {
    pub entries: Vec<TimeToSampleEntry>,
}

impl TimeToSampleBox {
    pub fn sample_count(&self) -> u64 {
        self.entries.iter().map(|e| e.sample_count as u64).sum()
    }

    /// Media duration covered by the table.
    pub fn duration(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| e.sample_count as u64 * e.sample_delta as u64)
            .sum()
    }
}

impl Payload for TimeToSampleBox {
    fn read_payload(&mut self, r: &mut dyn Read, _version: u8) -> Result<()> {
        let count = r.read_u32::<BigEndian>()?;
        self.entries = Vec::with_capacity(bounded_capacity(count));
        for _ in 0..count {
            self.entries.push(TimeToSampleEntry {
                sample_count: r.read_u32::<BigEndian>()?,
                sample_delta: r.read_u32::<BigEndian>()?,
            });
        }
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, _version: u8) -> Result<()> {
        out.write_u32::<BigEndian>(self.entries.len() as u32)?;
        for e in &self.entries {
            out.write_u32::<BigEndian>(e.sample_count)?;
            out.write_u32::<BigEndian>(e.sample_delta)?;
        }
        Ok(())
    }

    fn payload_size(&self, _version: u8) -> u64 {
        4 + 8 * self.entries.len() as u64
    }
}

impl TimeScalable for TimeToSampleBox {
    fn rescale(&mut self, scope: TimescaleScope, old: u32, new: u32) {
        if scope != TimescaleScope::Media {
            return;
        }
        for e in &mut self.entries {
            let d = rescale_ticks(e.sample_delta as u64, old, new);
            e.sample_delta = d.min(u32::MAX as u64) as u32;
        }
    }
}

// ---------- ctts ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionOffsetEntry {
    pub sample_count: u32,
    /// Unsigned in version 0, signed in version 1.
    pub sample_offset: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionOffsetBox {
    pub entries: Vec<CompositionOffsetEntry>,
}

impl Payload for CompositionOffsetBox {
    fn read_payload(&mut self, r: &mut dyn Read, version: u8) -> Result<()> {
        let count = r.read_u32::<BigEndian>()?;
        self.entries = Vec::with_capacity(bounded_capacity(count));
        for _ in 0..count {
            let sample_count = r.read_u32::<BigEndian>()?;
            let sample_offset = if version == 0 {
                r.read_u32::<BigEndian>()? as i64
            } else {
                r.read_i32::<BigEndian>()? as i64
            };
            self.entries.push(CompositionOffsetEntry {
                sample_count,
                sample_offset,
            });
        }
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, version: u8) -> Result<()> {
        out.write_u32::<BigEndian>(self.entries.len() as u32)?;
        for e in &self.entries {
            out.write_u32::<BigEndian>(e.sample_count)?;
            if version == 0 {
                let v = u32::try_from(e.sample_offset).map_err(|_| {
                    Error::invalid_argument(format!("ctts offset {} does not fit version 0", e.sample_offset))
                })?;
                out.write_u32::<BigEndian>(v)?;
            } else {
                let v = i32::try_from(e.sample_offset).map_err(|_| {
                    Error::invalid_argument(format!("ctts offset {} does not fit 32 bits", e.sample_offset))
                })?;
                out.write_i32::<BigEndian>(v)?;
            }
        }
        Ok(())
    }

    fn payload_size(&self, _version: u8) -> u64 {
        4 + 8 * self.entries.len() as u64
    }
}

impl TimeScalable for CompositionOffsetBox {
    fn rescale(&mut self, scope: TimescaleScope, old: u32, new: u32) {
        if scope != TimescaleScope::Media {
            return;
        }
        for e in &mut self.entries {
            e.sample_offset = rescale_signed(e.sample_offset, old, new);
        }
    }
}

// ---------- stco / co64 ----------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkOffsetBox {
    /// `co64` when set, `stco` otherwise.
    pub large: bool,
    pub offsets: Vec<u64>,
}

impl ChunkOffsetBox {
    pub fn new_large() -> Self {
        Self {
            large: true,
            offsets: Vec::new(),
        }
    }

    /// Add `delta` to every offset at or after `from`.
    pub fn shift_offsets(&mut self, from: u64, delta: i64) -> Result<usize> {
        let mut shifted = 0;
        for o in self.offsets.iter_mut().filter(|o| **o >= from) {
            let moved = o.checked_add_signed(delta).ok_or_else(|| {
                Error::invalid_argument(format!("chunk offset {o} cannot move by {delta}"))
            })?;
            if !self.large && moved > u32::MAX as u64 {
                return Err(Error::not_supported(format!(
                    "chunk offset {moved} needs a co64 table"
                )));
            }
            *o = moved;
            shifted += 1;
        }
        Ok(shifted)
    }
}

impl Payload for ChunkOffsetBox {
    fn read_payload(&mut self, r: &mut dyn Read, _version: u8) -> Result<()> {
        let count = r.read_u32::<BigEndian>()?;
        self.offsets = Vec::with_capacity(bounded_capacity(count));
        for _ in 0..count {
            let o = if self.large {
                r.read_u64::<BigEndian>()?
            } else {
                r.read_u32::<BigEndian>()? as u64
            };
            self.offsets.push(o);
        }
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, _version: u8) -> Result<()> {
        out.write_u32::<BigEndian>(self.offsets.len() as u32)?;
        for &o in &self.offsets {
            if self.large {
                out.write_u64::<BigEndian>(o)?;
            } else {
                let v = u32::try_from(o)
                    .map_err(|_| Error::invalid_argument(format!("stco offset {o} needs co64")))?;
                out.write_u32::<BigEndian>(v)?;
            }
        }
        Ok(())
    }

    fn payload_size(&self, _version: u8) -> u64 {
        let width = if self.large { 8 } else { 4 };
        4 + width * self.offsets.len() as u64
    }
}

// ---------- stsd / dref ----------

/// Full box whose payload is an entry count followed by the entries as children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryTableBox {
    pub entry_count: u32,
}

impl Payload for EntryTableBox {
    fn read_payload(&mut self, r: &mut dyn Read, _version: u8) -> Result<()> {
        self.entry_count = r.read_u32::<BigEndian>()?;
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, _version: u8) -> Result<()> {
        out.write_u32::<BigEndian>(self.entry_count)?;
        Ok(())
    }

    fn payload_size(&self, _version: u8) -> u64 {
        4
    }
}
