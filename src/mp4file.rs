//! A parsed file plus the means to write edits back into it.

use crate::config::EditConfig;
use crate::error::{Error, Result};
use crate::file::{AccessMode, LocalFile};
use crate::tree::{BoxId, BoxTree};
use std::path::Path;

/// What a splice writes over its original range.
#[derive(Debug, Clone, Copy)]
enum Rewrite {
    Remove,
    Whole(BoxId),
    /// Only the header changes; the payload stays where it is.
    Header(BoxId),
}

/// One top-level change, in original file coordinates.
#[derive(Debug)]
struct Splice {
    start: u64,
    old_size: u64,
    rewrite: Rewrite,
    bytes: Vec<u8>,
}

impl Splice {
    fn delta(&self) -> i64 {
        self.bytes.len() as i64 - self.old_size as i64
    }
}

#[derive(Debug)]
pub struct Mp4File {
    file: LocalFile,
    tree: BoxTree,
    /// Top-level boxes as found on disk: (id, position, size).
    on_disk: Vec<(BoxId, u64, u64)>,
}

impl Mp4File {
    pub fn open<P: AsRef<Path>>(path: P, config: &EditConfig) -> Result<Self> {
        let file = LocalFile::open(path, config)?;
        let mut f = Self {
            file,
            tree: BoxTree::new(),
            on_disk: Vec::new(),
        };
        f.reload()?;
        Ok(f)
    }

    /// Re-read the box tree from disk, dropping unsaved changes.
    pub fn reload(&mut self) -> Result<()> {
        self.file.set_mode(AccessMode::Read)?;
        let len = self.file.len();
        self.tree = BoxTree::read(&mut self.file, len)?;
        self.on_disk = self
            .tree
            .roots()
            .iter()
            .filter_map(|&id| {
                let n = self.tree.node(id);
                n.header.position.map(|p| (id, p, n.size()))
            })
            .collect();
        if self.tree.is_possibly_corrupt() {
            tracing::warn!("{} may be corrupt; saving is disabled", self.file.path().display());
        }
        self.file.close()
    }

    pub fn tree(&self) -> &BoxTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut BoxTree {
        &mut self.tree
    }

    pub fn file(&self) -> &LocalFile {
        &self.file
    }

    pub fn is_possibly_corrupt(&self) -> bool {
        self.tree.is_possibly_corrupt()
    }

    /// Bytes of `id` as they would be written now.
    pub fn render_box(&mut self, id: BoxId) -> Result<Vec<u8>> {
        if self.file.mode() == AccessMode::Closed {
            self.file.set_mode(AccessMode::Read)?;
        }
        let mut out = Vec::with_capacity(self.tree.actual_size(id).min(1 << 20) as usize);
        self.tree.render(id, &mut self.file, &mut out)?;
        Ok(out)
    }

    /// Payload of a data box, read from disk on first use.
    pub fn data(&mut self, id: BoxId) -> Result<Vec<u8>> {
        if self.file.mode() == AccessMode::Closed {
            self.file.set_mode(AccessMode::Read)?;
        }
        Ok(self.tree.data(id, &mut self.file)?.to_vec())
    }

    /// Write every changed top-level box back into the file and re-read it.
    /// Returns the number of ranges rewritten.
    pub fn save(&mut self) -> Result<usize> {
        if self.tree.is_possibly_corrupt() {
            return Err(Error::not_supported("refusing to save a possibly corrupt file"));
        }
        let file_len = self.file.len();
        let fresh: Vec<BoxId> = self
            .tree
            .roots()
            .iter()
            .copied()
            .filter(|&id| self.tree.node(id).header.position.is_none())
            .collect();

        let unpinned = self.unpin_zero_size_roots(&fresh);

        let mut splices = Vec::new();
        for &(id, start, old_size) in &self.on_disk {
            let rewrite = if !self.tree.roots().contains(&id) {
                Rewrite::Remove
            } else if self.tree.is_modified(id) {
                Rewrite::Whole(id)
            } else if let Some(&(_, old_header)) = unpinned.iter().find(|(u, _)| *u == id) {
                splices.push(Splice {
                    start,
                    old_size: old_header,
                    rewrite: Rewrite::Header(id),
                    bytes: Vec::new(),
                });
                continue;
            } else {
                continue;
            };
            splices.push(Splice {
                start,
                old_size,
                rewrite,
                bytes: Vec::new(),
            });
        }

        // offsets past a changed range move by its delta; go last to first so
        // earlier comparisons still see original offsets
        for s in splices.iter().rev() {
            let new_size = match s.rewrite {
                Rewrite::Remove => 0,
                Rewrite::Whole(id) => self.tree.actual_size(id),
                Rewrite::Header(id) => self.tree.actual_header_size(id),
            };
            let delta = new_size as i64 - s.old_size as i64;
            if delta != 0 {
                let from = s.start + s.old_size;
                let moved = self.tree.shift_chunk_offsets(from, delta)?;
                tracing::debug!("shifted {moved} chunk offsets past {from} by {delta}");
            }
        }

        for s in splices.iter_mut() {
            match s.rewrite {
                Rewrite::Remove => {}
                Rewrite::Whole(id) => s.bytes = self.render_box(id)?,
                Rewrite::Header(id) => self.tree.render_header(id, &mut s.bytes)?,
            }
        }
        let mut appended = Vec::new();
        for id in fresh {
            appended.extend(self.render_box(id)?);
        }
        if !appended.is_empty() {
            splices.push(Splice {
                start: file_len,
                old_size: 0,
                rewrite: Rewrite::Remove,
                bytes: appended,
            });
        }

        splices.sort_by_key(|s| s.start);
        for s in splices.iter().rev() {
            tracing::debug!(
                "writing {} bytes over {} at {} (delta {})",
                s.bytes.len(),
                s.old_size,
                s.start,
                s.delta()
            );
            self.file
                .insert_or_replace(Some(&s.bytes), s.bytes.len() as u64, s.start, s.old_size)?;
        }
        let written = splices.len();
        self.file.close()?;
        self.reload()?;
        tracing::info!("saved {} ({written} ranges rewritten)", self.file.path().display());
        Ok(written)
    }

    /// A size-0 header means "up to the end of the file", which only holds for
    /// the box written last. Give every other size-0 root an explicit size.
    /// Returns the on-disk header size of each root changed this way.
    fn unpin_zero_size_roots(&mut self, fresh: &[BoxId]) -> Vec<(BoxId, u64)> {
        let layout: Vec<BoxId> = self
            .on_disk
            .iter()
            .map(|&(id, _, _)| id)
            .filter(|id| self.tree.roots().contains(id))
            .chain(fresh.iter().copied())
            .collect();
        let Some((_, rest)) = layout.split_last() else {
            return Vec::new();
        };

        let mut unpinned = Vec::new();
        for &id in rest {
            let header = &mut self.tree.node_mut(id).header;
            if header.declares_zero_size() {
                let old_header = header.header_size();
                header.set_zero_size(false);
                tracing::debug!("{} at {:?} gets an explicit size", header.box_type, header.position);
                unpinned.push((id, old_header));
            }
        }
        unpinned
    }
}
