use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AnimError, AnimResult};

/// How long a frame stays on screen, in centiseconds (100ths of a second).
///
/// Centiseconds are the canonical timing unit of the pipeline; each encoder
/// back end converts them to its own representation:
/// - animated WebP wants cumulative milliseconds,
/// - AVIF sequences want per-frame deltas against a 100 units/second
///   timescale (centiseconds pass through unchanged),
/// - GIF wants cumulative fractional seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct HoldTime(u32);

impl TryFrom<u32> for HoldTime {
    type Error = AnimError;

    fn try_from(centis: u32) -> AnimResult<Self> {
        Self::from_centis(centis)
    }
}

impl From<HoldTime> for u32 {
    fn from(hold: HoldTime) -> u32 {
        hold.0
    }
}

impl HoldTime {
    /// Create a hold-time from centiseconds. A zero hold-time is a
    /// configuration defect and is rejected here, at ingestion, so the
    /// timing translation below never sees a non-positive duration.
    pub fn from_centis(centis: u32) -> AnimResult<Self> {
        if centis == 0 {
            return Err(AnimError::InvalidArgument(
                "frame hold-time must be positive".into(),
            ));
        }
        Ok(Self(centis))
    }

    /// The hold-time in centiseconds.
    pub fn as_centis(&self) -> u32 {
        self.0
    }

    /// The hold-time in milliseconds.
    pub fn as_millis(&self) -> i32 {
        (self.0 * 10) as i32
    }

    /// The hold-time in fractional seconds.
    pub fn as_seconds(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Merge another hold-time into this one (used when a duplicate frame
    /// is folded into its predecessor).
    pub fn merge(&mut self, other: HoldTime) {
        self.0 += other.0;
    }
}

impl fmt::Display for HoldTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0 * 10)
    }
}

/// Cumulative position on the animation timeline, advanced one frame at a
/// time. Backends that want absolute presentation timestamps read the
/// position *before* advancing past the frame being submitted, so the first
/// frame is always at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timeline {
    elapsed_centis: u64,
}

impl Timeline {
    /// A timeline at position zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position in centiseconds.
    pub fn centis(&self) -> u64 {
        self.elapsed_centis
    }

    /// Current position in milliseconds (animated WebP timestamps).
    pub fn millis(&self) -> i32 {
        (self.elapsed_centis * 10) as i32
    }

    /// Current position in fractional seconds (GIF presentation offsets).
    pub fn seconds(&self) -> f64 {
        self.elapsed_centis as f64 / 100.0
    }

    /// Advance past a frame's hold-time.
    pub fn advance(&mut self, hold: HoldTime) {
        self.elapsed_centis += u64::from(hold.as_centis());
    }
}
