// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Per-(camera, zone) dwell-time state

use std::collections::HashMap;

use super::ZoneId;
use crate::ingestion::CameraId;

/// Composite key for occupancy entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OccupancyKey {
    pub camera_id: CameraId,
    pub zone_id: ZoneId,
}

impl OccupancyKey {
    pub fn new(camera_id: CameraId, zone_id: ZoneId) -> Self {
        Self { camera_id, zone_id }
    }
}

/// Result of one observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OccupancyTransition {
    /// Zone went from empty to occupied
    Entered { since: f64 },
    /// Zone still occupied since `since`
    Continued { since: f64, duration: f64 },
    /// Zone empty; any entry was removed
    Cleared,
}

impl OccupancyTransition {
    pub fn entered(&self) -> bool {
        matches!(self, Self::Entered { .. })
    }

    pub fn since(&self) -> Option<f64> {
        match self {
            Self::Entered { since } | Self::Continued { since, .. } => Some(*since),
            Self::Cleared => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OccupancyEntry {
    since: f64,
    loitering_reported: bool,
}

/// Dwell-time tracker
///
/// A key is present exactly while its zone has been non-empty on every
/// observed cycle since `since`. One empty observation removes it.
#[derive(Debug, Default)]
pub struct ZoneOccupancyTracker {
    entries: HashMap<OccupancyKey, OccupancyEntry>,
}

impl ZoneOccupancyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, key: OccupancyKey, occupied: bool, now: f64) -> OccupancyTransition {
        if !occupied {
            self.entries.remove(&key);
            return OccupancyTransition::Cleared;
        }

        match self.entries.get(&key) {
            Some(entry) => OccupancyTransition::Continued {
                since: entry.since,
                duration: (now - entry.since).max(0.0),
            },
            None => {
                self.entries.insert(
                    key,
                    OccupancyEntry {
                        since: now,
                        loitering_reported: false,
                    },
                );
                OccupancyTransition::Entered { since: now }
            }
        }
    }

    /// Entry time of the current dwell episode
    pub fn since(&self, key: &OccupancyKey) -> Option<f64> {
        self.entries.get(key).map(|e| e.since)
    }

    /// Flag the current episode as having reported loitering.
    /// Returns true the first time per episode.
    pub fn mark_loitering_reported(&mut self, key: &OccupancyKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if !entry.loitering_reported => {
                entry.loitering_reported = true;
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all in-flight dwell timers
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
