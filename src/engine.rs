use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::bbox::{BBox, Ltwh};
use crate::track::{TrackId, TrackLabel};
use crate::tracker::VehicleTracker;
use crate::zone::ZoneDefinition;

/// Tracks that have committed a violation. Only ever grows.
#[derive(Debug, Default)]
pub struct ViolationRegistry {
    violators: BTreeSet<TrackId>,
}

impl ViolationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new registry size when `track_id` was not yet recorded.
    pub fn record(&mut self, track_id: TrackId) -> Option<usize> {
        if self.violators.insert(track_id) {
            Some(self.violators.len())
        } else {
            None
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.violators.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.violators.is_empty()
    }
}

/// First zone, in list order, whose tested side the box is not on.
#[inline]
pub fn claim_entry<'z>(zones: &'z [ZoneDefinition], bbox: &BBox<Ltwh>) -> Option<&'z ZoneDefinition> {
    zones.iter().find(|z| !z.covers(bbox))
}

/// First zone, in list order, that prohibits `label` and whose tested side the box is on.
#[inline]
pub fn find_crossing<'z>(
    zones: &'z [ZoneDefinition],
    label: &str,
    bbox: &BBox<Ltwh>,
) -> Option<&'z ZoneDefinition> {
    zones.iter().find(|z| z.prohibits(label) && z.covers(bbox))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Already flagged earlier; nothing about the track changes this frame.
    Frozen,
    /// Moved into a zone that prohibits its origin.
    Violation {
        from: String,
        to: String,
        /// Registry size after recording, `None` if the track was already counted.
        count: Option<usize>,
    },
    /// No rule fired; the box was refreshed and the track credited.
    Clear,
}

#[derive(Debug, Default)]
pub struct ViolationEngine {
    registry: ViolationRegistry,
}

impl ViolationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn registry(&self) -> &ViolationRegistry {
        &self.registry
    }

    #[inline]
    pub fn violation_count(&self) -> usize {
        self.registry.len()
    }

    /// Counts `track_id` once, however often it trips a prohibited zone.
    pub fn illegal_turn(&mut self, track_id: TrackId, from: &str, to: &str) -> Option<usize> {
        let count = self.registry.record(track_id);
        match count {
            Some(count) => info!(%track_id, from, to, count, "illegal turn"),
            None => debug!(%track_id, from, to, "illegal turn already counted"),
        }
        count
    }

    /// Starts a track for an unmatched detection if some zone claims it as its origin.
    pub fn claim(
        &self,
        tracker: &mut VehicleTracker,
        zones: &[ZoneDefinition],
        id: u32,
        bbox: &BBox<Ltwh>,
    ) -> Option<TrackId> {
        let zone = claim_entry(zones, bbox)?;

        let track_id = tracker.create_track(*bbox);
        if let Some(track) = tracker.get_mut(track_id) {
            track.label = TrackLabel::Origin(zone.label.clone());
        }
        tracker.bind(id, track_id);

        debug!(id, %track_id, origin = %zone.label, "entry claimed");

        Some(track_id)
    }

    /// Crossing pass for one resolved track against the detection seen this frame.
    pub fn evaluate(
        &mut self,
        tracker: &mut VehicleTracker,
        zones: &[ZoneDefinition],
        track_id: TrackId,
        bbox: &BBox<Ltwh>,
    ) -> Verdict {
        let from = match tracker.get(track_id) {
            Some(track) if track.label.is_violated() => return Verdict::Frozen,
            Some(track) => track.label.as_str().to_string(),
            // evicted between resolve and evaluate
            None => return Verdict::Frozen,
        };

        if let Some(zone) = find_crossing(zones, &from, bbox) {
            let to = zone.label.clone();
            let count = self.illegal_turn(track_id, &from, &to);
            if let Some(track) = tracker.get_mut(track_id) {
                track.label = TrackLabel::Violated;
            }
            return Verdict::Violation { from, to, count };
        }

        if let Some(track) = tracker.get_mut(track_id) {
            track.bbox = *bbox;
        }
        tracker.touch(track_id);

        Verdict::Clear
    }
}
