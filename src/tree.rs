//! In-memory box hierarchy.
//!
//! Boxes live in an arena owned by [`BoxTree`] and refer to each other by
//! [`BoxId`]. A container owns the ids in its `children` list; `parent` and
//! `handler` are plain back-references.

use crate::boxes::{BoxType, FullHeader};
use crate::error::{Error, Result};
use crate::header::BoxHeader;
use crate::known_boxes::{CO64, STCO};
use crate::payload::{BoxData, DataBox};
use std::io::{Read, Seek};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId(pub(crate) usize);

impl BoxId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct BoxNode {
    pub header: BoxHeader,
    /// Present exactly when the payload is a FullBox.
    pub full: Option<FullHeader>,
    pub data: BoxData,
    /// Bytes after the decoded payload (or after the last loaded child) that
    /// nothing claimed. Rendered back verbatim.
    pub residual: Vec<u8>,
    pub(crate) parent: Option<BoxId>,
    /// The `hdlr` box in effect where this box sits.
    pub(crate) handler: Option<BoxId>,
    pub(crate) children: Vec<BoxId>,
}

impl BoxNode {
    pub(crate) fn new(header: BoxHeader, data: BoxData) -> Self {
        let full = data.is_full().then(FullHeader::default);
        Self {
            header,
            full,
            data,
            residual: Vec::new(),
            parent: None,
            handler: None,
            children: Vec::new(),
        }
    }

    pub fn box_type(&self) -> BoxType {
        self.header.box_type
    }

    pub fn version(&self) -> u8 {
        self.full.map_or(0, |f| f.version)
    }

    /// Size recorded in the header: what the file said at parse time, or the
    /// last value set by [`BoxTree::refresh_sizes`].
    pub fn size(&self) -> u64 {
        self.header.total_box_size()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoxTree {
    pub(crate) nodes: Vec<BoxNode>,
    pub(crate) roots: Vec<BoxId>,
    pub(crate) possibly_corrupt: bool,
}

impl BoxTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &[BoxId] {
        &self.roots
    }

    pub fn node(&self, id: BoxId) -> &BoxNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: BoxId) -> &mut BoxNode {
        &mut self.nodes[id.0]
    }

    pub fn box_type(&self, id: BoxId) -> BoxType {
        self.node(id).box_type()
    }

    pub fn payload(&self, id: BoxId) -> &BoxData {
        &self.node(id).data
    }

    pub fn payload_mut(&mut self, id: BoxId) -> &mut BoxData {
        &mut self.node_mut(id).data
    }

    pub fn children(&self, id: BoxId) -> &[BoxId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: BoxId) -> Option<BoxId> {
        self.node(id).parent
    }

    /// The `hdlr` box governing `id`, if any.
    pub fn handler(&self, id: BoxId) -> Option<BoxId> {
        self.node(id).handler
    }

    pub fn handler_type(&self, id: BoxId) -> Option<BoxType> {
        self.handler(id).and_then(|h| self.node(h).data.handler_type())
    }

    /// Set when the loader hit bytes it could not make sense of.
    pub fn is_possibly_corrupt(&self) -> bool {
        self.possibly_corrupt
    }

    // ---------- lookup ----------

    /// All reachable boxes, depth first, parents before children.
    pub fn iter(&self) -> Vec<BoxId> {
        let mut out = Vec::new();
        for &r in &self.roots {
            out.push(r);
            self.collect_descendants(r, &mut out);
        }
        out
    }

    /// Boxes below `id`, depth first, `id` itself excluded.
    pub fn descendants(&self, id: BoxId) -> Vec<BoxId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: BoxId, out: &mut Vec<BoxId>) {
        for &c in self.children(id) {
            out.push(c);
            self.collect_descendants(c, out);
        }
    }

    pub fn find_all(&self, box_type: BoxType) -> Vec<BoxId> {
        self.iter()
            .into_iter()
            .filter(|&id| self.box_type(id) == box_type)
            .collect()
    }

    pub fn first(&self, box_type: BoxType) -> Option<BoxId> {
        self.find_all(box_type).into_iter().next()
    }

    pub fn child(&self, id: BoxId, box_type: BoxType) -> Option<BoxId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.box_type(c) == box_type)
    }

    /// First box matching a slash separated path from the top level, e.g.
    /// `"moov/trak/mdia"`.
    pub fn find_path(&self, path: &str) -> Result<Option<BoxId>> {
        let steps = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::parse::<BoxType>)
            .collect::<Result<Vec<_>>>()?;
        let Some((first, rest)) = steps.split_first() else {
            return Ok(None);
        };
        let mut frontier: Vec<BoxId> = self
            .roots
            .iter()
            .copied()
            .filter(|&r| self.box_type(r) == *first)
            .collect();
        for step in rest {
            frontier = frontier
                .iter()
                .flat_map(|&id| self.children(id).iter().copied())
                .filter(|&c| self.box_type(c) == *step)
                .collect();
        }
        Ok(frontier.into_iter().next())
    }

    /// Nearest ancestor (or `id` itself) of the given type.
    pub fn ancestor(&self, id: BoxId, box_type: BoxType) -> Option<BoxId> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if self.box_type(c) == box_type {
                return Some(c);
            }
            cur = self.parent(c);
        }
        None
    }

    // ---------- sizes and positions ----------

    pub fn size(&self, id: BoxId) -> u64 {
        self.node(id).size()
    }

    /// Size computed from what is in memory now.
    pub fn actual_size(&self, id: BoxId) -> u64 {
        let data_size = self.actual_data_size(id);
        self.node(id).header.header_size_for(data_size) + data_size
    }

    /// Header size `id` would be rendered with now.
    pub fn actual_header_size(&self, id: BoxId) -> u64 {
        self.node(id).header.header_size_for(self.actual_data_size(id))
    }

    fn actual_data_size(&self, id: BoxId) -> u64 {
        let n = self.node(id);
        let full = if n.full.is_some() { FullHeader::SIZE } else { 0 };
        full + n.data.payload_size(n.version()) + self.children_size(id) + n.residual.len() as u64
    }

    pub fn children_size(&self, id: BoxId) -> u64 {
        self.children(id).iter().map(|&c| self.actual_size(c)).sum()
    }

    /// File offset of the payload, after the version and flags of a FullBox.
    pub fn data_position(&self, id: BoxId) -> Option<u64> {
        let n = self.node(id);
        let full = if n.full.is_some() { FullHeader::SIZE } else { 0 };
        n.header.data_position().map(|p| p + full)
    }

    pub fn children_position(&self, id: BoxId) -> Option<u64> {
        let n = self.node(id);
        self.data_position(id)
            .map(|p| p + n.data.payload_size(n.version()))
    }

    /// Write the header's data size from the in-memory state, bottom up.
    pub fn refresh_sizes(&mut self) {
        for r in self.roots.clone() {
            self.refresh_sizes_from(r);
        }
    }

    fn refresh_sizes_from(&mut self, id: BoxId) -> u64 {
        for c in self.node(id).children.clone() {
            self.refresh_sizes_from(c);
        }
        let data_size = self.actual_data_size(id);
        let header = &mut self.node_mut(id).header;
        header.data_size = data_size;
        header.total_box_size()
    }

    // ---------- rendering ----------

    /// Serialize `id` and everything under it. Unmodified data payloads are
    /// copied from `src`.
    pub fn render<R: Read + Seek + ?Sized>(&self, id: BoxId, src: &mut R, out: &mut Vec<u8>) -> Result<()> {
        let n = self.node(id);
        self.render_header(id, out)?;
        if let Some(f) = n.full {
            out.push(f.version);
            out.extend_from_slice(&f.flags.to_be_bytes()[1..]);
        }
        match &n.data {
            BoxData::Data(d) => d.write_to(src, out)?,
            other => other.write_payload(out, n.version())?,
        }
        for &c in &n.children {
            self.render(c, src, out)?;
        }
        out.extend_from_slice(&n.residual);
        Ok(())
    }

    /// Just the header of `id`, sized for what is in memory now.
    pub fn render_header(&self, id: BoxId, out: &mut Vec<u8>) -> Result<()> {
        let header = self.node(id).header.with_data_size(self.actual_data_size(id));
        header.render(out)
    }

    /// Can `id` be rendered without reading the backing file?
    pub fn is_in_memory(&self, id: BoxId) -> bool {
        let n = self.node(id);
        let own = match &n.data {
            BoxData::Data(d) => d.is_loaded(),
            _ => true,
        };
        own && n.children.iter().all(|&c| self.is_in_memory(c))
    }

    /// Has anything in or under `id` been replaced in memory?
    pub fn is_modified(&self, id: BoxId) -> bool {
        let n = self.node(id);
        let own = match &n.data {
            BoxData::Data(d) => d.is_modified(),
            _ => true,
        };
        own || n.children.iter().any(|&c| self.is_modified(c))
    }

    // ---------- editing ----------

    /// Append a freshly built box as the last child of `parent`, or as the last
    /// top-level box when `parent` is `None`.
    pub fn append_child(&mut self, parent: Option<BoxId>, header: BoxHeader, data: BoxData) -> Result<BoxId> {
        let mut node = BoxNode::new(header, data);
        if let Some(p) = parent {
            let pn = self.node(p);
            if !pn.data.has_children() {
                return Err(Error::not_supported(format!(
                    "{} cannot hold child boxes",
                    pn.box_type()
                )));
            }
            node.parent = Some(p);
            node.handler = pn
                .children
                .iter()
                .rev()
                .copied()
                .find(|&c| self.node(c).data.handler_type().is_some())
                .or(pn.handler);
        }
        let id = BoxId(self.nodes.len());
        self.nodes.push(node);
        match parent {
            Some(p) => self.node_mut(p).children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Unlink `id` from its parent (or from the top level). The node stays in
    /// the arena but is no longer rendered or found.
    pub fn detach(&mut self, id: BoxId) -> Result<()> {
        let list = match self.parent(id) {
            Some(p) => &mut self.nodes[p.0].children,
            None => &mut self.roots,
        };
        let Some(pos) = list.iter().position(|&c| c == id) else {
            return Err(Error::invalid_argument(format!("box {} is not attached", id.0)));
        };
        list.remove(pos);
        self.node_mut(id).parent = None;
        Ok(())
    }

    /// Payload of a data box, loading it from `src` on first use.
    pub fn data<R: Read + Seek + ?Sized>(&mut self, id: BoxId, src: &mut R) -> Result<&[u8]> {
        let box_type = self.box_type(id);
        match &mut self.node_mut(id).data {
            BoxData::Data(d) => d.load(src),
            _ => Err(Error::not_supported(format!("{box_type} has a structured payload"))),
        }
    }

    pub fn set_data(&mut self, id: BoxId, bytes: Vec<u8>) -> Result<()> {
        let box_type = self.box_type(id);
        match &mut self.node_mut(id).data {
            BoxData::Data(d) => {
                d.set(bytes);
                Ok(())
            }
            _ => Err(Error::not_supported(format!("{box_type} has a structured payload"))),
        }
    }

    /// Replace the payload of `id` with opaque bytes, dropping any structure.
    pub fn replace_with_data(&mut self, id: BoxId, bytes: Vec<u8>) {
        let n = self.node_mut(id);
        n.data = BoxData::Data(DataBox::new(bytes));
        n.full = None;
        n.residual.clear();
        n.children.clear();
    }

    /// Add `delta` to every `stco`/`co64` entry at or past `from`.
    pub fn shift_chunk_offsets(&mut self, from: u64, delta: i64) -> Result<usize> {
        let mut total = 0;
        for id in self.iter() {
            let t = self.box_type(id);
            if t != STCO && t != CO64 {
                continue;
            }
            if let BoxData::ChunkOffset(co) = self.payload_mut(id) {
                total += co.shift_offsets(from, delta)?;
            }
        }
        Ok(total)
    }
}
