//! Timescale changes and the rescaling of every duration that depends on them.
//!
//! Movie-scope values (`tkhd`, `mehd`, the segment durations of `elst`) are
//! counted in the `mvhd` timescale. Media-scope values (`stts`, `ctts`, the
//! media times of `elst`) are counted in the timescale of the track's `mdhd`.

use crate::error::{Error, Result};
use crate::known_boxes::{MDHD, MVHD, TRAK};
use crate::payload::BoxData;
use crate::tree::{BoxId, BoxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimescaleScope {
    Movie,
    Media,
}

/// A payload holding values measured in some timescale.
pub trait TimeScalable {
    /// Convert the values belonging to `scope` from `old` to `new` ticks per second.
    fn rescale(&mut self, scope: TimescaleScope, old: u32, new: u32);
}

/// `value * new / old`, rounded to the nearest tick and saturating at `u64::MAX`.
pub fn rescale_ticks(value: u64, old: u32, new: u32) -> u64 {
    if old == new || old == 0 {
        return value;
    }
    let old = old as u128;
    let scaled = (value as u128 * new as u128 + old / 2) / old;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Signed variant of [`rescale_ticks`]; rounds half away from zero.
pub fn rescale_signed(value: i64, old: u32, new: u32) -> i64 {
    let magnitude = rescale_ticks(value.unsigned_abs(), old, new);
    let clamped = magnitude.min(i64::MAX as u64) as i64;
    if value < 0 { -clamped } else { clamped }
}

fn check_timescale(timescale: u32) -> Result<()> {
    if timescale == 0 {
        return Err(Error::invalid_argument("timescale must be positive"));
    }
    Ok(())
}

impl BoxTree {
    pub fn movie_header(&self) -> Option<BoxId> {
        self.find_path("moov/mvhd").ok().flatten()
    }

    pub fn movie_timescale(&self) -> Option<u32> {
        match self.payload(self.movie_header()?) {
            BoxData::MovieHeader(m) => Some(m.timescale),
            _ => None,
        }
    }

    /// Timescale of the media header `mdhd`.
    pub fn media_timescale(&self, mdhd: BoxId) -> Option<u32> {
        match self.payload(mdhd) {
            BoxData::MediaHeader(m) => Some(m.timescale),
            _ => None,
        }
    }

    /// `mdhd` of the given track, looked up by `tkhd` track id.
    pub fn media_header_for_track(&self, track_id: u32) -> Option<BoxId> {
        self.find_all(TRAK).into_iter().find_map(|trak| {
            let tkhd = self.child(trak, crate::known_boxes::TKHD)?;
            match self.payload(tkhd) {
                BoxData::TrackHeader(t) if t.track_id == track_id => {
                    let mdia = self.child(trak, crate::known_boxes::MDIA)?;
                    self.child(mdia, MDHD)
                }
                _ => None,
            }
        })
    }

    /// Change the `mvhd` timescale and rescale every movie-scope duration.
    pub fn set_movie_timescale(&mut self, timescale: u32) -> Result<()> {
        check_timescale(timescale)?;
        let mvhd = self
            .movie_header()
            .ok_or_else(|| Error::not_supported("no moov/mvhd box to retime"))?;
        let version = self.node(mvhd).version();
        let old = match self.payload_mut(mvhd) {
            BoxData::MovieHeader(m) => {
                let old = m.timescale;
                if old == 0 {
                    return Err(Error::corrupt("mvhd declares a zero timescale"));
                }
                m.rescale_own_duration(version, old, timescale);
                old
            }
            _ => return Err(Error::not_supported("mvhd could not be decoded")),
        };

        let roots = self.roots().to_vec();
        for r in roots {
            self.rescale_from(r, TimescaleScope::Movie, old, timescale);
        }

        if let BoxData::MovieHeader(m) = self.payload_mut(mvhd) {
            m.timescale = timescale;
        }
        tracing::debug!("movie timescale {old} -> {timescale}");
        Ok(())
    }

    /// Change the timescale of `mdhd` and rescale the media-scope values of
    /// the track that owns it.
    pub fn set_media_timescale(&mut self, mdhd: BoxId, timescale: u32) -> Result<()> {
        check_timescale(timescale)?;
        if self.box_type(mdhd) != MDHD {
            return Err(Error::invalid_argument(format!(
                "{} is not a media header",
                self.box_type(mdhd)
            )));
        }
        let version = self.node(mdhd).version();
        let old = match self.payload_mut(mdhd) {
            BoxData::MediaHeader(m) => {
                let old = m.timescale;
                if old == 0 {
                    return Err(Error::corrupt("mdhd declares a zero timescale"));
                }
                m.rescale_own_duration(version, old, timescale);
                old
            }
            _ => return Err(Error::not_supported("mdhd could not be decoded")),
        };

        // the walk starts at the owning track; an mdhd outside a trak only
        // covers its own subtree
        let scope_root = self.ancestor(mdhd, TRAK).or(self.parent(mdhd)).unwrap_or(mdhd);
        self.rescale_from(scope_root, TimescaleScope::Media, old, timescale);

        if let BoxData::MediaHeader(m) = self.payload_mut(mdhd) {
            m.timescale = timescale;
        }
        tracing::debug!("media timescale of {} {old} -> {timescale}", mdhd.index());
        Ok(())
    }

    fn rescale_from(&mut self, id: BoxId, scope: TimescaleScope, old: u32, new: u32) {
        if let Some(t) = self.payload_mut(id).as_time_scalable_mut() {
            t.rescale(scope, old, new);
        }
        for c in self.children(id).to_vec() {
            self.rescale_from(c, scope, old, new);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(rescale_ticks(1001, 30000, 1000), 33);
        assert_eq!(rescale_ticks(15, 10, 1), 2);
        assert_eq!(rescale_ticks(14, 10, 1), 1);
        assert_eq!(rescale_ticks(600, 600, 90000), 90000);
    }

    #[test]
    fn signed_keeps_sign() {
        assert_eq!(rescale_signed(-600, 600, 90000), -90000);
        assert_eq!(rescale_signed(300, 600, 90000), 45000);
    }

    #[test]
    fn saturates() {
        assert_eq!(rescale_ticks(u64::MAX, 1, 2), u64::MAX);
    }
}
