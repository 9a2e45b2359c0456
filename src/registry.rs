//! Box factory: picks the payload type for a box from where it sits.
//!
//! Keys are `(type, parent, handler)`; any part may be a wildcard. Lookups
//! walk a fixed cascade from the most to the least specific key and fall
//! back to an opaque data box.

use crate::boxes::BoxType;
use crate::known_boxes::*;
use crate::payload::{
    AudioSampleEntry, BoxData, ChunkOffsetBox, CompositionOffsetBox, EditListBox, EntryTableBox,
    EsdsBox, FileTypeBox, HandlerBox, MediaHeaderBox, MovieExtendsHeaderBox, MovieHeaderBox,
    SampleEntryBase, TimeToSampleBox, TrackHeaderBox, VisualSampleEntry,
};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactoryKey {
    pub box_type: Option<BoxType>,
    pub parent: Option<BoxType>,
    pub handler: Option<BoxType>,
}

impl FactoryKey {
    pub fn new(box_type: Option<BoxType>, parent: Option<BoxType>, handler: Option<BoxType>) -> Self {
        Self {
            box_type,
            parent,
            handler,
        }
    }

    pub fn of_type(box_type: BoxType) -> Self {
        Self::new(Some(box_type), None, None)
    }
}

/// Builds a blank payload; the loader fills it in from the file.
pub type Constructor = fn() -> BoxData;

#[derive(Clone, Copy)]
pub struct FactoryEntry {
    pub name: &'static str,
    pub construct: Constructor,
}

impl std::fmt::Debug for FactoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryEntry").field("name", &self.name).finish()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    map: HashMap<FactoryKey, FactoryEntry>,
}

/// Where a box is being created.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub parent: Option<BoxType>,
    pub handler: Option<BoxType>,
    /// The box is one of the first `entry_count` children of `stsd`.
    pub sample_entry: bool,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Return a new registry with `construct` registered under `key`.
    /// A later registration for the same key replaces the earlier one.
    pub fn with_constructor(mut self, key: FactoryKey, name: &'static str, construct: Constructor) -> Self {
        self.map.insert(key, FactoryEntry { name, construct });
        self
    }

    /// The registry every parse uses unless told otherwise.
    pub fn shared() -> &'static Registry {
        static SHARED: OnceLock<Registry> = OnceLock::new();
        SHARED.get_or_init(default_registry)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// General cascade: (t,p,h), (t,p,-), (t,-,h), (t,-,-).
    pub fn resolve(&self, t: BoxType, parent: Option<BoxType>, handler: Option<BoxType>) -> Option<&FactoryEntry> {
        let t = Some(t);
        let candidates = [
            FactoryKey::new(t, parent, handler),
            FactoryKey::new(t, parent, None),
            FactoryKey::new(t, None, handler),
            FactoryKey::new(t, None, None),
        ];
        self.first_match(&candidates)
    }

    /// Sample entry cascade: (t,p,h), (t,p,-), (-,p,h), (-,p,-).
    pub fn resolve_sample_entry(
        &self,
        t: BoxType,
        parent: Option<BoxType>,
        handler: Option<BoxType>,
    ) -> Option<&FactoryEntry> {
        let candidates = [
            FactoryKey::new(Some(t), parent, handler),
            FactoryKey::new(Some(t), parent, None),
            FactoryKey::new(None, parent, handler),
            FactoryKey::new(None, parent, None),
        ];
        self.first_match(&candidates)
    }

    fn first_match(&self, candidates: &[FactoryKey]) -> Option<&FactoryEntry> {
        // wildcard parts of a key can make two candidates equal; that is harmless
        candidates.iter().find_map(|k| self.map.get(k))
    }

    /// Blank payload for a box of type `t` at `at`, plus the constructor name.
    pub fn construct(&self, t: BoxType, at: Placement) -> (&'static str, BoxData) {
        let entry = if at.sample_entry {
            self.resolve_sample_entry(t, at.parent, at.handler)
        } else {
            self.resolve(t, at.parent, at.handler)
        };
        match entry {
            Some(e) => (e.name, (e.construct)()),
            None => ("data", BoxData::Data(Default::default())),
        }
    }
}

/// Built-in constructors.
pub fn default_registry() -> Registry {
    let containers = [
        MOOV, TRAK, MDIA, MINF, STBL, DINF, EDTS, UDTA, MVEX, MOOF, TRAF, MFRA, SINF, SCHI,
    ];
    let mut reg = Registry::new();
    for t in containers {
        reg = reg.with_constructor(FactoryKey::of_type(t), "container", || BoxData::Container);
    }

    reg.with_constructor(FactoryKey::of_type(META), "full container", || BoxData::FullContainer)
        .with_constructor(FactoryKey::of_type(STSD), "stsd", || {
            BoxData::EntryTable(EntryTableBox::default())
        })
        .with_constructor(FactoryKey::of_type(DREF), "dref", || {
            BoxData::EntryTable(EntryTableBox::default())
        })
        .with_constructor(FactoryKey::of_type(FTYP), "ftyp", || {
            BoxData::FileType(FileTypeBox::default())
        })
        .with_constructor(FactoryKey::of_type(MVHD), "mvhd", || {
            BoxData::MovieHeader(MovieHeaderBox::default())
        })
        .with_constructor(FactoryKey::of_type(TKHD), "tkhd", || {
            BoxData::TrackHeader(TrackHeaderBox::default())
        })
        .with_constructor(FactoryKey::of_type(MDHD), "mdhd", || {
            BoxData::MediaHeader(MediaHeaderBox::default())
        })
        .with_constructor(FactoryKey::of_type(HDLR), "hdlr", || {
            BoxData::Handler(HandlerBox::default())
        })
        .with_constructor(FactoryKey::of_type(MEHD), "mehd", || {
            BoxData::MovieExtendsHeader(MovieExtendsHeaderBox::default())
        })
        .with_constructor(FactoryKey::of_type(ELST), "elst", || {
            BoxData::EditList(EditListBox::default())
        })
        .with_constructor(FactoryKey::of_type(STTS), "stts", || {
            BoxData::TimeToSample(TimeToSampleBox::default())
        })
        .with_constructor(FactoryKey::of_type(CTTS), "ctts", || {
            BoxData::CompositionOffset(CompositionOffsetBox::default())
        })
        .with_constructor(FactoryKey::of_type(STCO), "stco", || {
            BoxData::ChunkOffset(ChunkOffsetBox::default())
        })
        .with_constructor(FactoryKey::of_type(CO64), "co64", || {
            BoxData::ChunkOffset(ChunkOffsetBox::new_large())
        })
        .with_constructor(FactoryKey::of_type(ESDS), "esds", || {
            BoxData::ElementaryStream(EsdsBox::default())
        })
        .with_constructor(
            FactoryKey::new(None, Some(STSD), Some(HANDLER_SOUND)),
            "audio sample entry",
            || BoxData::AudioSampleEntry(AudioSampleEntry::default()),
        )
        .with_constructor(
            FactoryKey::new(None, Some(STSD), Some(HANDLER_VIDEO)),
            "visual sample entry",
            || BoxData::VisualSampleEntry(VisualSampleEntry::default()),
        )
        .with_constructor(
            FactoryKey::new(None, Some(STSD), None),
            "sample entry",
            || BoxData::SampleEntry(SampleEntryBase::default()),
        )
}
