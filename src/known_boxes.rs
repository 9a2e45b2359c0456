//! Box types the crate knows by name.
//!
//! Anything not listed here is still a valid [`BoxType`]; it is simply
//! reported as an unknown box.

use crate::boxes::BoxType;

// File-level
pub const FTYP: BoxType = BoxType(*b"ftyp");
pub const MOOV: BoxType = BoxType(*b"moov");
pub const MDAT: BoxType = BoxType(*b"mdat");
pub const FREE: BoxType = BoxType(*b"free");
pub const SKIP: BoxType = BoxType(*b"skip");
pub const WIDE: BoxType = BoxType(*b"wide");
pub const META: BoxType = BoxType(*b"meta");
pub const MOOF: BoxType = BoxType(*b"moof");
pub const MFRA: BoxType = BoxType(*b"mfra");
pub const UUID: BoxType = BoxType(*b"uuid");

// moov / trak
pub const MVHD: BoxType = BoxType(*b"mvhd");
pub const TRAK: BoxType = BoxType(*b"trak");
pub const TKHD: BoxType = BoxType(*b"tkhd");
pub const EDTS: BoxType = BoxType(*b"edts");
pub const ELST: BoxType = BoxType(*b"elst");
pub const UDTA: BoxType = BoxType(*b"udta");
pub const MVEX: BoxType = BoxType(*b"mvex");
pub const MEHD: BoxType = BoxType(*b"mehd");
pub const TRAF: BoxType = BoxType(*b"traf");

// mdia / minf
pub const MDIA: BoxType = BoxType(*b"mdia");
pub const MDHD: BoxType = BoxType(*b"mdhd");
pub const HDLR: BoxType = BoxType(*b"hdlr");
pub const MINF: BoxType = BoxType(*b"minf");
pub const DINF: BoxType = BoxType(*b"dinf");
pub const DREF: BoxType = BoxType(*b"dref");

// stbl
pub const STBL: BoxType = BoxType(*b"stbl");
pub const STSD: BoxType = BoxType(*b"stsd");
pub const STTS: BoxType = BoxType(*b"stts");
pub const CTTS: BoxType = BoxType(*b"ctts");
pub const STSC: BoxType = BoxType(*b"stsc");
pub const STSZ: BoxType = BoxType(*b"stsz");
pub const STCO: BoxType = BoxType(*b"stco");
pub const CO64: BoxType = BoxType(*b"co64");
pub const STSS: BoxType = BoxType(*b"stss");

// protection
pub const SINF: BoxType = BoxType(*b"sinf");
pub const SCHI: BoxType = BoxType(*b"schi");

// sample entry children
pub const ESDS: BoxType = BoxType(*b"esds");

// handler types
pub const HANDLER_SOUND: BoxType = BoxType(*b"soun");
pub const HANDLER_VIDEO: BoxType = BoxType(*b"vide");

/// Human-readable name for a box type.
pub fn full_name(t: BoxType) -> &'static str {
    match &t.0 {
        b"ftyp" => "File Type Box",
        b"moov" => "Movie Box",
        b"mdat" => "Media Data Box",
        b"free" => "Free Space Box",
        b"skip" => "Free Space Box",
        b"wide" => "Wide Placeholder Box",
        b"meta" => "Meta Box",
        b"moof" => "Movie Fragment Box",
        b"mfra" => "Movie Fragment Random Access Box",
        b"uuid" => "User Extension Box",
        b"mvhd" => "Movie Header Box",
        b"trak" => "Track Box",
        b"tkhd" => "Track Header Box",
        b"edts" => "Edit Box",
        b"elst" => "Edit List Box",
        b"udta" => "User Data Box",
        b"mvex" => "Movie Extends Box",
        b"mehd" => "Movie Extends Header Box",
        b"traf" => "Track Fragment Box",
        b"mdia" => "Media Box",
        b"mdhd" => "Media Header Box",
        b"hdlr" => "Handler Reference Box",
        b"minf" => "Media Information Box",
        b"dinf" => "Data Information Box",
        b"dref" => "Data Reference Box",
        b"stbl" => "Sample Table Box",
        b"stsd" => "Sample Description Box",
        b"stts" => "Decoding Time to Sample Box",
        b"ctts" => "Composition Time to Sample Box",
        b"stsc" => "Sample To Chunk Box",
        b"stsz" => "Sample Size Box",
        b"stco" => "Chunk Offset Box",
        b"co64" => "64-bit Chunk Offset Box",
        b"stss" => "Sync Sample Box",
        b"sinf" => "Protection Scheme Information Box",
        b"schi" => "Scheme Information Box",
        b"esds" => "Elementary Stream Descriptor Box",
        b"mp4a" => "MPEG-4 Audio Sample Entry",
        b"avc1" | b"avc3" => "AVC Sample Entry",
        b"hvc1" | b"hev1" => "HEVC Sample Entry",
        b"vmhd" => "Video Media Header Box",
        b"smhd" => "Sound Media Header Box",
        b"url " => "Data Entry URL Box",
        _ => "Unknown Box",
    }
}
