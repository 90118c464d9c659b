// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Events module - rule outcomes and their stores

mod memory;
mod sqlite;

pub use memory::MemoryEventStore;
pub use sqlite::{SqliteEventStore, StoreStats};

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::inference::{BoundingBox, Detection};
use crate::ingestion::CameraId;

/// Current wall-clock time as float seconds since the Unix epoch
pub fn epoch_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Rule that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Intrusion,
    Loitering,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Intrusion => "intrusion",
            RuleKind::Loitering => "loitering",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "intrusion" => Ok(RuleKind::Intrusion),
            "loitering" => Ok(RuleKind::Loitering),
            other => Err(Error::Config(format!("unknown rule '{}'", other))),
        }
    }
}

/// Immutable rule outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub camera_id: CameraId,
    pub rule: RuleKind,
    pub zone: String,
    pub object_type: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub duration_sec: Option<f64>,
    pub snapshot_path: Option<String>,
}

impl Event {
    pub fn intrusion(camera_id: CameraId, zone: &str, detection: &Detection, now: f64) -> Self {
        Self::from_detection(camera_id, RuleKind::Intrusion, zone, detection, now, None)
    }

    pub fn loitering(
        camera_id: CameraId,
        zone: &str,
        detection: &Detection,
        now: f64,
        duration_sec: f64,
    ) -> Self {
        Self::from_detection(camera_id, RuleKind::Loitering, zone, detection, now, Some(duration_sec))
    }

    fn from_detection(
        camera_id: CameraId,
        rule: RuleKind,
        zone: &str,
        detection: &Detection,
        timestamp: f64,
        duration_sec: Option<f64>,
    ) -> Self {
        Self {
            camera_id,
            rule,
            zone: zone.to_string(),
            object_type: detection.class.clone(),
            confidence: detection.confidence,
            bbox: detection.bbox,
            timestamp,
            duration_sec,
            snapshot_path: None,
        }
    }
}

/// Event as persisted, with its store-assigned id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: i64,
    #[serde(flatten)]
    pub event: Event,
}

/// Query filter; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub camera_id: Option<CameraId>,
    pub rule: Option<RuleKind>,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn camera(camera_id: CameraId) -> Self {
        Self {
            camera_id: Some(camera_id),
            ..Self::default()
        }
    }

    pub fn with_rule(mut self, rule: RuleKind) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.camera_id.map_or(true, |id| event.camera_id == id)
            && self.rule.map_or(true, |rule| event.rule == rule)
    }
}

/// Durable event sink shared by every stream loop
///
/// Implementations must accept concurrent inserts from several cameras.
/// `query` returns events in ascending id order.
pub trait EventStore: Send + Sync {
    /// Persist an event and return its id
    fn insert(&self, event: &Event) -> Result<i64>;

    /// Events matching `filter`, oldest first
    fn query(&self, filter: &EventFilter) -> Result<Vec<StoredEvent>>;

    /// Point lookup; `Error::NotFound` when absent
    fn get(&self, id: i64) -> Result<StoredEvent>;

    /// Number of stored events
    fn count(&self) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_round_trip() {
        for rule in [RuleKind::Intrusion, RuleKind::Loitering] {
            assert_eq!(rule.as_str().parse::<RuleKind>().unwrap(), rule);
        }
        assert!("tailgating".parse::<RuleKind>().is_err());
    }

    #[test]
    fn test_stored_event_json_is_flat() {
        let det = Detection::new("person", 0.9, BoundingBox::new(1, 2, 3, 4));
        let stored = StoredEvent {
            id: 3,
            event: Event::loitering(7, "Dock", &det, 1.5, 10.0),
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["rule"], "loitering");
        assert_eq!(json["duration_sec"], 10.0);
        assert!(json["snapshot_path"].is_null());
    }

    #[test]
    fn test_filter_matches() {
        let det = Detection::new("person", 0.9, BoundingBox::new(1, 2, 3, 4));
        let event = Event::intrusion(7, "Dock", &det, 0.0);

        assert!(EventFilter::default().matches(&event));
        assert!(EventFilter::camera(7).matches(&event));
        assert!(!EventFilter::camera(8).matches(&event));
        assert!(!EventFilter::camera(7).with_rule(RuleKind::Loitering).matches(&event));
    }
}
