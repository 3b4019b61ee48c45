use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltwh};
use crate::track::TrackId;

/// Raw detection as handed over by the upstream detector and tracker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub bbox: BBox<Ltwh>,
    #[serde(default, rename = "p")]
    pub confidence: f32,
    /// Upstream tracker id, only stable while the upstream tracker keeps the object.
    #[serde(default, rename = "id")]
    pub short_lived_id: Option<u32>,
}

impl Detection {
    pub fn new(label: impl Into<String>, bbox: BBox<Ltwh>, short_lived_id: Option<u32>) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence: 1.0,
            short_lived_id,
        }
    }

    #[inline]
    pub fn is_one_of(&self, classes: &[String]) -> bool {
        classes.iter().any(|c| *c == self.label)
    }
}

/// Detection after identity resolution, written back onto the frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VehicleDetection {
    pub label: String,
    pub bbox: BBox<Ltwh>,
    pub track_id: TrackId,
    pub origin: String,
}
