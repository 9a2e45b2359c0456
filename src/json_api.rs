use crate::{
    error::Result,
    known_boxes::full_name,
    mp4file::Mp4File,
    payload::BoxShape,
    tree::{BoxId, BoxTree},
    util::{hex_dump, read_up_to},
};
use serde::Serialize;
use std::io::{Read, Seek};

/// A JSON-serializable representation of a single box.
///
/// Used for `mp4dump --json` and by anything that wants the tree without
/// linking against the arena types.
#[derive(Debug, Serialize)]
pub struct JsonBox {
    pub offset: Option<u64>,
    pub size: u64,
    pub actual_size: u64,
    pub header_size: u64,
    pub payload_offset: Option<u64>,
    pub payload_size: u64,

    pub typ: String,
    pub uuid: Option<String>,
    pub version: Option<u8>,
    pub flags: Option<u32>,
    pub kind: BoxShape,
    pub full_name: String,
    pub handler: Option<String>,
    pub decoded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual: Option<usize>,
    pub children: Option<Vec<JsonBox>>,
}

/// JSON view of every top-level box of `tree`.
pub fn tree_to_json(tree: &BoxTree, decode: bool) -> Vec<JsonBox> {
    tree.roots()
        .iter()
        .map(|&id| build_json_for_box(tree, id, decode))
        .collect()
}

/// Open `path`, parse it and return its JSON view.
pub fn analyze_file(path: impl AsRef<std::path::Path>, decode: bool) -> Result<Vec<JsonBox>> {
    let f = Mp4File::open(path, &Default::default())?;
    Ok(tree_to_json(f.tree(), decode))
}

pub fn build_json_for_box(tree: &BoxTree, id: BoxId, decode: bool) -> JsonBox {
    let n = tree.node(id);
    let hdr = &n.header;
    let kind = n.data.shape();

    let children = if n.data.has_children() {
        Some(
            tree.children(id)
                .iter()
                .map(|&c| build_json_for_box(tree, c, decode))
                .collect(),
        )
    } else {
        None
    };

    let full = if n.full.is_some() { 4 } else { 0 };
    JsonBox {
        offset: hdr.position,
        size: n.size(),
        actual_size: tree.actual_size(id),
        header_size: hdr.header_size(),
        payload_offset: tree.data_position(id),
        payload_size: hdr.data_size.saturating_sub(full),

        typ: hdr.box_type.to_string(),
        uuid: hdr.extended_type.map(hex::encode),
        version: n.full.map(|f| f.version),
        flags: n.full.map(|f| f.flags),
        kind,
        full_name: full_name(hdr.box_type).to_string(),
        handler: tree.handler_type(id).map(|h| h.to_string()),
        decoded: if decode { n.data.summary() } else { None },
        residual: (!n.residual.is_empty()).then_some(n.residual.len()),
        children,
    }
}

#[derive(Debug, Serialize)]
pub struct HexDump {
    pub offset: u64,
    pub length: u64,
    pub hex: String,
}

/// Hex-dump up to `max_len` bytes at `offset`. Never reads past the end of
/// `src`; `length` is what was actually read.
pub fn hex_range<R: Read + Seek + ?Sized>(src: &mut R, offset: u64, max_len: u64) -> Result<HexDump> {
    let data = read_up_to(src, offset, max_len)?;
    Ok(HexDump {
        offset,
        length: data.len() as u64,
        hex: hex_dump(&data, offset),
    })
}
