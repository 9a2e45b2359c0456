//! Builds a [`BoxTree`] from a byte source.

use crate::boxes::{BoxType, FullHeader};
use crate::error::{Error, Result};
use crate::header::BoxHeader;
use crate::known_boxes::STSD;
use crate::payload::{BoxData, DataBox};
use crate::registry::{Placement, Registry};
use crate::tree::{BoxId, BoxNode, BoxTree};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

/// Deeper nesting than this is treated as corrupt.
pub const MAX_DEPTH: usize = 64;

/// What a box inherits from where it is being loaded.
#[derive(Debug, Clone, Copy)]
struct LoadContext {
    parent: Option<BoxId>,
    parent_type: Option<BoxType>,
    handler: Option<BoxId>,
    handler_type: Option<BoxType>,
    /// Declared entry count when the parent is `stsd`.
    entry_count: Option<u32>,
    index: usize,
    depth: usize,
}

impl LoadContext {
    fn top_level(index: usize) -> Self {
        Self {
            parent: None,
            parent_type: None,
            handler: None,
            handler_type: None,
            entry_count: None,
            index,
            depth: 0,
        }
    }

    fn placement(&self) -> Placement {
        Placement {
            parent: self.parent_type,
            handler: self.handler_type,
            sample_entry: self.parent_type == Some(STSD)
                && self.entry_count.is_some_and(|n| (self.index as u64) < n as u64),
        }
    }
}

impl BoxTree {
    /// Parse every top-level box in the first `len` bytes of `src` using the
    /// shared registry.
    pub fn read<R: Read + Seek + ?Sized>(src: &mut R, len: u64) -> Result<Self> {
        Self::read_with(src, len, Registry::shared())
    }

    pub fn read_with<R: Read + Seek + ?Sized>(src: &mut R, len: u64, registry: &Registry) -> Result<Self> {
        let mut tree = BoxTree::new();
        let mut pos = 0;
        let mut index = 0;
        while pos < len {
            let header = match BoxHeader::read(src, pos, len) {
                Ok(h) => h,
                Err(e) if e.is_corrupt() => {
                    tracing::warn!("stopping at offset {pos}: {e}");
                    tree.possibly_corrupt = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            let id = tree.load_box(src, header, LoadContext::top_level(index), registry)?;
            tree.roots.push(id);
            pos += tree.size(id);
            index += 1;
        }
        tracing::debug!("parsed {} top-level boxes ({} total)", tree.roots.len(), tree.nodes.len());
        Ok(tree)
    }

    fn push(&mut self, node: BoxNode) -> BoxId {
        let id = BoxId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn load_box<R: Read + Seek + ?Sized>(
        &mut self,
        src: &mut R,
        header: BoxHeader,
        ctx: LoadContext,
        registry: &Registry,
    ) -> Result<BoxId> {
        let box_type = header.box_type;
        let (name, data) = registry.construct(box_type, ctx.placement());
        tracing::debug!(
            "{box_type} at {:?}: {} bytes as {name}",
            header.position,
            header.total_box_size()
        );

        let data_pos = header.data_position().unwrap_or_default();
        let data_size = header.data_size;
        let mut node = BoxNode::new(header, data);
        node.parent = ctx.parent;
        node.handler = ctx.handler;

        if matches!(node.data, BoxData::Data(_)) {
            node.data = BoxData::Data(DataBox::on_disk(data_pos, data_size));
            return Ok(self.push(node));
        }

        if ctx.depth >= MAX_DEPTH {
            tracing::warn!("{box_type} at {data_pos} is nested too deep; keeping it opaque");
            self.possibly_corrupt = true;
            return Ok(self.push(opaque(node, data_pos, data_size)));
        }

        src.seek(SeekFrom::Start(data_pos))?;
        let mut limited = (&mut *src).take(data_size);
        let decoded = decode_prefix(&mut node, &mut limited);
        let consumed = data_size - limited.limit();
        if let Err(e) = decoded {
            if !e.is_corrupt() {
                return Err(e);
            }
            tracing::warn!("{box_type} at {data_pos}: {e}; keeping it opaque");
            self.possibly_corrupt = true;
            return Ok(self.push(opaque(node, data_pos, data_size)));
        }

        let end = data_pos + data_size;
        let mut rest_from = data_pos + consumed;
        let has_children = node.data.has_children();
        let entry_count = match &node.data {
            BoxData::EntryTable(t) if box_type == STSD => Some(t.entry_count),
            _ => None,
        };
        let id = self.push(node);

        if has_children {
            let child_ctx = LoadContext {
                parent: Some(id),
                parent_type: Some(box_type),
                handler: ctx.handler,
                handler_type: ctx.handler_type,
                entry_count,
                index: 0,
                depth: ctx.depth + 1,
            };
            rest_from = self.load_children(src, id, rest_from, end, child_ctx, registry)?;
        }

        if rest_from < end {
            let residual = crate::util::read_slice(src, rest_from, end - rest_from).map_err(Error::truncated)?;
            if !has_children {
                tracing::debug!("{box_type}: {} trailing bytes kept as residual", residual.len());
            }
            self.node_mut(id).residual = residual;
        }
        Ok(id)
    }

    /// Load children of `id` from `start` up to `end`. Returns where loading
    /// stopped.
    fn load_children<R: Read + Seek + ?Sized>(
        &mut self,
        src: &mut R,
        id: BoxId,
        start: u64,
        end: u64,
        mut ctx: LoadContext,
        registry: &Registry,
    ) -> Result<u64> {
        let mut pos = start;
        while pos < end {
            let header = match BoxHeader::read(src, pos, end) {
                Ok(h) => h,
                Err(e) if e.is_corrupt() => {
                    tracing::warn!("inside {}: {e}", self.box_type(id));
                    self.possibly_corrupt = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            if header.declares_zero_size() {
                tracing::warn!(
                    "zero-size {} at {pos} inside {}; not loading further children",
                    header.box_type,
                    self.box_type(id)
                );
                self.possibly_corrupt = true;
                break;
            }

            let child = self.load_box(src, header, ctx, registry)?;
            self.node_mut(id).children.push(child);
            if let Some(h) = self.payload(child).handler_type() {
                ctx.handler = Some(child);
                ctx.handler_type = Some(h);
            }
            pos += self.size(child);
            ctx.index += 1;
        }
        Ok(pos)
    }
}

/// Read version/flags (for full boxes) and the structured payload.
fn decode_prefix(node: &mut BoxNode, r: &mut dyn Read) -> Result<()> {
    let version = if node.full.is_some() {
        let vf = r.read_u32::<BigEndian>().map_err(Error::truncated)?;
        let full = FullHeader::new((vf >> 24) as u8, vf);
        node.full = Some(full);
        full.version
    } else {
        0
    };
    node.data.read_payload(r, version)
}

fn opaque(mut node: BoxNode, data_pos: u64, data_size: u64) -> BoxNode {
    node.data = BoxData::Data(DataBox::on_disk(data_pos, data_size));
    node.full = None;
    node.residual.clear();
    node
}
