use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::ZoneConfig;
use crate::detection::{Detection, VehicleDetection};
use crate::engine::{Verdict, ViolationEngine};
use crate::frame::{Aggregate, Frame};
use crate::sink::{Event, EventSink, NullSink};
use crate::tracker::{VehicleTracker, INITIAL_TTL, OVERLAP_IOU_THRESHOLD};

pub const VIOLATION_COUNT: &str = "violation-count";

#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Detector classes treated as vehicles; everything else is dropped.
    pub vehicle_classes: Vec<String>,
    /// Label written on every resolved detection.
    pub output_label: String,
    pub initial_ttl: i32,
    pub iou_threshold: f32,
    pub count_aggregate: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            vehicle_classes: ["car", "bus", "truck", "train", "boat"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_label: "vehicle".to_string(),
            initial_ttl: INITIAL_TTL,
            iou_threshold: OVERLAP_IOU_THRESHOLD,
            count_aggregate: VIOLATION_COUNT.to_string(),
        }
    }
}

struct FilterState {
    tracker: VehicleTracker,
    engine: ViolationEngine,
}

/// Per-frame stage turning short-lived detections into durable vehicles and
/// counting prohibited crossings.
///
/// All tracker and registry state sits behind one lock, so concurrent callers
/// are serialized frame by frame.
pub struct TurnFilter {
    config: FilterConfig,
    zones: Arc<ZoneConfig>,
    sink: Arc<dyn EventSink>,
    state: Mutex<FilterState>,
}

impl TurnFilter {
    pub fn new(config: FilterConfig, zones: Arc<ZoneConfig>, sink: Arc<dyn EventSink>) -> Self {
        let tracker = VehicleTracker::with_params(config.initial_ttl, config.iou_threshold);

        Self {
            config,
            zones,
            sink,
            state: Mutex::new(FilterState {
                tracker,
                engine: ViolationEngine::new(),
            }),
        }
    }

    pub fn with_zones(zones: Arc<ZoneConfig>) -> Self {
        Self::new(FilterConfig::default(), zones, Arc::new(NullSink))
    }

    #[inline]
    pub fn zones(&self) -> &Arc<ZoneConfig> {
        &self.zones
    }

    pub fn violation_count(&self) -> usize {
        self.state.lock().engine.violation_count()
    }

    pub fn live_tracks(&self) -> usize {
        self.state.lock().tracker.len()
    }

    /// Vehicle-class detections that carry an upstream id, one per id.
    /// A later detection with the same id replaces an earlier one.
    fn candidates(&self, detections: Vec<Detection>) -> BTreeMap<u32, Detection> {
        let mut candidates = BTreeMap::new();

        for det in detections {
            if !det.is_one_of(&self.config.vehicle_classes) {
                continue;
            }

            match det.short_lived_id {
                Some(id) => {
                    candidates.insert(id, det);
                }
                None => trace!(label = %det.label, "detection without upstream id skipped"),
            }
        }

        candidates
    }

    /// Replaces the frame's detections with resolved vehicles and appends the
    /// running violation count.
    pub fn process(&self, frame: &mut Frame) {
        let zones = self.zones.snapshot();
        let candidates = self.candidates(std::mem::take(&mut frame.detections));
        let mut events = Vec::new();

        let mut state = self.state.lock();
        let FilterState { tracker, engine } = &mut *state;

        for (id, det) in candidates {
            let track_id = match tracker.resolve(id, &det.bbox).track_id() {
                Some(track_id) => track_id,
                None => match engine.claim(tracker, &zones, id, &det.bbox) {
                    Some(track_id) => track_id,
                    None => {
                        trace!(id, "no zone claims detection");
                        continue;
                    }
                },
            };

            match engine.evaluate(tracker, &zones, track_id, &det.bbox) {
                Verdict::Frozen => {}
                Verdict::Violation { from, to, .. } => {
                    events.push(Event::Crossing {
                        vehicle_id: track_id,
                        side: from,
                        origin: to,
                        legal: false,
                    });
                }
                Verdict::Clear => {
                    let origin = tracker
                        .get(track_id)
                        .map(|t| t.label.as_str().to_string())
                        .unwrap_or_default();

                    events.push(Event::Detection {
                        vehicle_id: track_id,
                        side: origin.clone(),
                    });

                    frame.vehicles.push(VehicleDetection {
                        label: self.config.output_label.clone(),
                        bbox: det.bbox,
                        track_id,
                        origin,
                    });
                }
            }
        }

        frame.aggregates.push(Aggregate {
            name: self.config.count_aggregate.clone(),
            value: engine.violation_count() as i64,
        });

        tracker.gc();

        debug!(
            frame = frame.index,
            vehicles = frame.vehicles.len(),
            tracks = tracker.len(),
            violations = engine.violation_count(),
            "frame processed"
        );

        drop(state);

        for event in events {
            self.sink.emit(event);
        }
    }
}
