use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::bbox::{BBox, Ltwh};

/// Stable vehicle identity, assigned once and never reused within a tracker.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const VIOLATION_MARKER: &str = "illegal";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackLabel {
    /// Zone the vehicle was first seen entering from, empty until claimed.
    Origin(String),
    /// Terminal: the vehicle crossed into a prohibited zone.
    Violated,
}

impl TrackLabel {
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            TrackLabel::Origin(label) => label,
            TrackLabel::Violated => VIOLATION_MARKER,
        }
    }

    #[inline]
    pub fn is_violated(&self) -> bool {
        matches!(self, TrackLabel::Violated)
    }
}

impl Default for TrackLabel {
    fn default() -> Self {
        TrackLabel::Origin(String::new())
    }
}

#[derive(Debug, Clone)]
pub struct VehicleTrack {
    pub track_id: TrackId,
    pub bbox: BBox<Ltwh>,
    pub label: TrackLabel,
    pub ttl: i32,
}
