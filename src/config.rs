use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Settings for in-place file edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditConfig {
    /// I/O block size in bytes. Shift buffers are rounded up to a multiple of it.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl EditConfig {
    pub fn with_buffer_size(buffer_size: usize) -> Result<Self> {
        let c = Self { buffer_size };
        c.validate()?;
        Ok(c)
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(s: &str) -> Result<Self> {
        let c: EditConfig = serde_json::from_str(s)?;
        c.validate()?;
        Ok(c)
    }

    /// Load configuration from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::invalid_argument("buffer_size must be at least 1"));
        }
        Ok(())
    }
}
