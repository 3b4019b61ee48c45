use serde_derive::{Deserialize, Serialize};

use crate::detection::{Detection, VehicleDetection};

/// Named scalar attached to a frame's output, e.g. the running violation count.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub name: String,
    pub value: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Frame {
    #[serde(default)]
    pub index: u64,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub vehicles: Vec<VehicleDetection>,
    #[serde(default)]
    pub aggregates: Vec<Aggregate>,
}

impl Frame {
    pub fn new(index: u64, detections: Vec<Detection>) -> Self {
        Self {
            index,
            detections,
            ..Default::default()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn aggregate(&self, name: &str) -> Option<i64> {
        self.aggregates
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value)
    }
}
