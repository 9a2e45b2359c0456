use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Byte used to left-pad three-character codes ("nam" becomes "©nam").
pub const PADDING_BYTE: u8 = 0xA9;

/// A four character box code.
///
/// The value is its identity: two `BoxType`s built from the same bytes are the
/// same type everywhere in the process, so no interning table is needed to
/// compare or hash them.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BoxType(pub [u8; 4]);

impl BoxType {
    /// Validate and canonicalize a 3 or 4 byte code.
    pub fn new(code: &[u8]) -> Result<Self> {
        let bytes = match code.len() {
            4 => [code[0], code[1], code[2], code[3]],
            3 => [PADDING_BYTE, code[0], code[1], code[2]],
            n => {
                return Err(Error::invalid_argument(format!(
                    "box type must be 3 or 4 bytes, got {n}"
                )));
            }
        };
        if let Some(bad) = bytes.iter().find(|b| !Self::is_valid_byte(**b)) {
            return Err(Error::invalid_argument(format!(
                "byte 0x{bad:02x} is not allowed in a box type"
            )));
        }
        Ok(BoxType(bytes))
    }

    /// Printable ASCII plus the copyright mark used by iTunes-style tags.
    pub fn is_valid_byte(b: u8) -> bool {
        (0x20..=0x7E).contains(&b) || b == PADDING_BYTE
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| match c {
                32..=126 => c as char,
                PADDING_BYTE => '©',
                _ => '.',
            })
            .collect()
    }
}

impl FromStr for BoxType {
    type Err = Error;

    /// Accepts "moov", "url " or "©nam"; every char must fit in one byte.
    fn from_str(s: &str) -> Result<Self> {
        let bytes = s
            .chars()
            .map(|c| u8::try_from(u32::from(c)))
            .collect::<std::result::Result<Vec<u8>, _>>()
            .map_err(|_| Error::invalid_argument(format!("{s:?} is not a box type")))?;
        BoxType::new(&bytes)
    }
}

impl fmt::Debug for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl serde::Serialize for BoxType {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

/// Version and flags that prefix the payload of a FullBox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullHeader {
    pub version: u8,
    pub flags: u32,
}

impl FullHeader {
    pub const SIZE: u64 = 4;

    pub fn new(version: u8, flags: u32) -> Self {
        Self { version, flags: flags & 0x00FF_FFFF }
    }
}
