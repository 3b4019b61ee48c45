use std::collections::HashMap;

use tracing::{debug, trace};

use crate::bbox::{BBox, Ltwh};
use crate::geometry;
use crate::track::{TrackId, TrackLabel, VehicleTrack};

pub const INITIAL_TTL: i32 = 10;
pub const OVERLAP_IOU_THRESHOLD: f32 = 0.5;

/// Outcome of [`VehicleTracker::resolve`] for one short-lived id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The short-lived id was already bound to this track.
    Known(TrackId),
    /// The id was new but its box overlaps this track; the id is now bound to it.
    Reidentified(TrackId),
    /// Nothing matched, the caller decides whether to start a track.
    Unmatched,
}

impl Resolution {
    #[inline]
    pub fn track_id(&self) -> Option<TrackId> {
        match self {
            Resolution::Known(id) | Resolution::Reidentified(id) => Some(*id),
            Resolution::Unmatched => None,
        }
    }
}

/// Arena of live vehicle tracks plus the short-lived id index into it.
///
/// Tracks are kept in creation order, which is also ascending `TrackId` order,
/// so lookups by id are a binary search and overlap scans prefer older tracks.
#[derive(Debug)]
pub struct VehicleTracker {
    tracks: Vec<VehicleTrack>,
    id_map: HashMap<u32, TrackId>,
    next_track_id: u32,
    initial_ttl: i32,
    iou_threshold: f32,
}

impl VehicleTracker {
    pub fn new() -> Self {
        Self::with_params(INITIAL_TTL, OVERLAP_IOU_THRESHOLD)
    }

    pub fn with_params(initial_ttl: i32, iou_threshold: f32) -> Self {
        Self {
            tracks: Vec::with_capacity(64),
            id_map: HashMap::new(),
            next_track_id: 1,
            initial_ttl,
            iou_threshold,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn index_of(&self, track_id: TrackId) -> Option<usize> {
        self.tracks
            .binary_search_by_key(&track_id, |t| t.track_id)
            .ok()
    }

    #[inline]
    pub fn get(&self, track_id: TrackId) -> Option<&VehicleTrack> {
        self.index_of(track_id).map(|i| &self.tracks[i])
    }

    #[inline]
    pub fn get_mut(&mut self, track_id: TrackId) -> Option<&mut VehicleTrack> {
        let idx = self.index_of(track_id)?;
        self.tracks.get_mut(idx)
    }

    pub fn find_by_id(&self, id: u32) -> Option<TrackId> {
        let track_id = *self.id_map.get(&id)?;

        // the map is pruned on eviction, a dangling entry is still a miss
        self.index_of(track_id).map(|_| track_id)
    }

    /// First track, oldest first, that mutually contains `bbox` or overlaps it
    /// above the IoU threshold.
    ///
    /// This is first-match, not best-match: when a box overlaps several tracks
    /// the earliest created one wins.
    pub fn find_by_overlap(&self, bbox: &BBox<Ltwh>) -> Option<TrackId> {
        self.tracks
            .iter()
            .find(|t| {
                geometry::contains_mutually(&t.bbox, bbox)
                    || geometry::iou(&t.bbox, bbox) > self.iou_threshold
            })
            .map(|t| t.track_id)
    }

    pub fn create_track(&mut self, bbox: BBox<Ltwh>) -> TrackId {
        let track_id = TrackId(self.next_track_id);
        self.next_track_id += 1;

        self.tracks.push(VehicleTrack {
            track_id,
            bbox,
            label: TrackLabel::default(),
            ttl: self.initial_ttl,
        });

        debug!(%track_id, "track created");

        track_id
    }

    #[inline]
    pub fn bind(&mut self, id: u32, track_id: TrackId) {
        self.id_map.insert(id, track_id);
    }

    /// Credits one frame of liveness, offsetting the next [`gc`](Self::gc).
    pub fn touch(&mut self, track_id: TrackId) -> bool {
        match self.get_mut(track_id) {
            Some(track) => {
                track.ttl += 1;
                true
            }
            None => false,
        }
    }

    /// Ages every track by one frame and drops those whose credit ran out,
    /// together with every short-lived id bound to them.
    pub fn gc(&mut self) -> Vec<TrackId> {
        let mut evicted = Vec::new();

        self.tracks.retain_mut(|t| {
            t.ttl -= 1;
            if t.ttl < 0 {
                evicted.push(t.track_id);
                false
            } else {
                true
            }
        });

        if !evicted.is_empty() {
            self.id_map.retain(|_, track_id| !evicted.contains(track_id));
            debug!(?evicted, remaining = self.tracks.len(), "tracks evicted");
        }

        evicted
    }

    /// Maps a short-lived id to a live track, rebinding by overlap when the
    /// upstream tracker changed the id of what is geometrically the same vehicle.
    pub fn resolve(&mut self, id: u32, bbox: &BBox<Ltwh>) -> Resolution {
        if let Some(track_id) = self.find_by_id(id) {
            trace!(id, %track_id, "resolved by id");
            return Resolution::Known(track_id);
        }

        if let Some(track_id) = self.find_by_overlap(bbox) {
            trace!(id, %track_id, "resolved by overlap");
            self.bind(id, track_id);
            return Resolution::Reidentified(track_id);
        }

        trace!(id, "unmatched");
        Resolution::Unmatched
    }
}

impl Default for VehicleTracker {
    fn default() -> Self {
        Self::new()
    }
}
