use crate::boxes::BoxType;
use crate::error::{Error, Result};
use crate::known_boxes::UUID;
use crate::util::read_up_to;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Seek};

/// size32 + type + largesize + extended type.
pub const MAX_HEADER_SIZE: u64 = 32;

/// The prefix of one box occurrence.
///
/// `data_size` excludes the header. `position` is `None` for boxes built in
/// memory that have not been written to a file yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHeader {
    pub box_type: BoxType,
    pub extended_type: Option<[u8; 16]>,
    pub data_size: u64,
    pub position: Option<u64>,
    large_size: bool,
    to_end: bool,
}

impl BoxHeader {
    /// Header for a box built in memory. `uuid` boxes need [`BoxHeader::new_extended`].
    pub fn new(box_type: BoxType) -> Result<Self> {
        if box_type == UUID {
            return Err(Error::invalid_argument(
                "uuid boxes carry an extended type; use BoxHeader::new_extended",
            ));
        }
        Ok(Self::unpositioned(box_type, None))
    }

    /// Header for a `uuid` box. The extended type may be filled in later; until
    /// then sixteen reserved bytes are rendered in its place.
    pub fn new_extended(box_type: BoxType, extended_type: Option<[u8; 16]>) -> Result<Self> {
        if box_type != UUID {
            return Err(Error::invalid_argument(format!(
                "extended types are only valid on uuid boxes, not {box_type}"
            )));
        }
        Ok(Self::unpositioned(box_type, extended_type))
    }

    fn unpositioned(box_type: BoxType, extended_type: Option<[u8; 16]>) -> Self {
        Self {
            box_type,
            extended_type,
            data_size: 0,
            position: None,
            large_size: false,
            to_end: false,
        }
    }

    /// Parse the header at `position`. `limit` is the first offset the box may
    /// not cover: the end of the file, or the end of the enclosing box.
    pub fn read<R: Read + Seek + ?Sized>(r: &mut R, position: u64, limit: u64) -> Result<Self> {
        if position >= limit {
            return Err(Error::corrupt(format!("no room for a box header at {position}")));
        }
        let remaining = limit - position;
        let buf = read_up_to(r, position, remaining.min(MAX_HEADER_SIZE))?;
        let mut cur = Cursor::new(&buf[..]);
        let truncated = |what: &str| Error::corrupt(format!("{what} truncated at offset {position}"));

        let size32 = cur.read_u32::<BigEndian>().map_err(|_| truncated("box size"))?;
        let mut typ = [0u8; 4];
        cur.read_exact(&mut typ).map_err(|_| truncated("box type"))?;
        let box_type = BoxType(typ);

        let declared = if size32 == 1 {
            cur.read_u64::<BigEndian>().map_err(|_| truncated("64-bit box size"))?
        } else {
            size32 as u64
        };

        let extended_type = if box_type == UUID {
            let mut u = [0u8; 16];
            cur.read_exact(&mut u).map_err(|_| truncated("extended type"))?;
            Some(u)
        } else {
            None
        };

        let header_size = cur.position();
        let total = if size32 == 0 { remaining } else { declared };

        if total < header_size {
            return Err(Error::corrupt(format!(
                "{box_type} at {position} declares {total} bytes, less than its {header_size} byte header"
            )));
        }
        if total > remaining {
            return Err(Error::corrupt(format!(
                "{box_type} at {position} declares {total} bytes but only {remaining} remain"
            )));
        }

        Ok(Self {
            box_type,
            extended_type,
            data_size: total - header_size,
            position: Some(position),
            large_size: size32 == 1,
            to_end: size32 == 0,
        })
    }

    /// True when the box was stored with size 0 ("extends to the end").
    pub fn declares_zero_size(&self) -> bool {
        self.to_end
    }

    pub fn uses_large_size(&self) -> bool {
        self.large_size
    }

    /// Store size 0 ("extends to the end") instead of the real size. Only valid
    /// for the last top-level box of a file.
    pub fn set_zero_size(&mut self, to_end: bool) {
        self.to_end = to_end;
    }

    /// Force (or stop forcing) the 64-bit size form.
    pub fn set_large_size(&mut self, large: bool) {
        self.large_size = large;
    }

    pub fn is_extended(&self) -> bool {
        self.box_type == UUID
    }

    pub fn header_size(&self) -> u64 {
        self.header_size_for(self.data_size)
    }

    /// Header size needed to describe a payload of `data_size` bytes.
    pub fn header_size_for(&self, data_size: u64) -> u64 {
        let compact = if self.is_extended() { 24 } else { 8 };
        if self.to_end && !self.large_size {
            // size 0 says nothing about the length, so the compact form always fits
            compact
        } else if self.large_size || compact + data_size > u32::MAX as u64 {
            compact + 8
        } else {
            compact
        }
    }

    pub fn total_box_size(&self) -> u64 {
        self.header_size() + self.data_size
    }

    /// Offset of the first payload byte, if the box lives in a file.
    pub fn data_position(&self) -> Option<u64> {
        self.position.map(|p| p + self.header_size())
    }

    pub fn with_data_size(&self, data_size: u64) -> Self {
        Self {
            data_size,
            ..self.clone()
        }
    }

    pub fn render(&self, out: &mut Vec<u8>) -> Result<()> {
        let header_size = self.header_size();
        let total = header_size + self.data_size;
        let compact = if self.is_extended() { 24 } else { 8 };

        if header_size > compact {
            out.write_u32::<BigEndian>(1)?;
            out.extend_from_slice(&self.box_type.0);
            out.write_u64::<BigEndian>(total)?;
        } else {
            out.write_u32::<BigEndian>(if self.to_end { 0 } else { total as u32 })?;
            out.extend_from_slice(&self.box_type.0);
        }

        if self.is_extended() {
            match &self.extended_type {
                Some(u) => out.extend_from_slice(u),
                // reserved; the caller patches the identifier in later
                None => out.resize(out.len() + 16, 0),
            }
        }
        Ok(())
    }
}
