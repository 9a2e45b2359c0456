pub mod boxes;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod file;
pub mod header;
pub mod json_api;
pub mod known_boxes;
pub mod mp4file;
pub mod parser;
pub mod payload;
pub mod registry;
pub mod timescale;
pub mod tree;
pub mod util;

pub use boxes::{BoxType, FullHeader};
pub use config::EditConfig;
pub use error::{Error, Result};
pub use file::{AccessMode, LocalFile};
pub use header::BoxHeader;
pub use json_api::{JsonBox, analyze_file, hex_range};
pub use mp4file::Mp4File;
pub use payload::{BoxData, BoxShape, DataBox};
pub use registry::{FactoryKey, Registry, default_registry};
pub use timescale::{TimeScalable, TimescaleScope};
pub use tree::{BoxId, BoxNode, BoxTree};
