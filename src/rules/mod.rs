// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Rules module - zone presence and dwell-time rules

mod occupancy;
mod zone;

pub use occupancy::{OccupancyKey, OccupancyTransition, ZoneOccupancyTracker};
pub use zone::{Shape, Zone, ZoneId};

use tracing::debug;

use crate::config::{LoiteringMode, RulesConfig};
use crate::events::Event;
use crate::inference::Detection;
use crate::ingestion::CameraId;

/// Evaluates detections against zones once per cycle
///
/// A zone is occupied on a cycle when at least one detection of a target
/// class has its center inside it. Entering an empty zone raises an
/// intrusion; staying at least `loitering_threshold_sec` raises loitering.
/// Leaving raises nothing.
pub struct RulesEngine {
    loitering_threshold_sec: f64,
    target_classes: Vec<String>,
    loitering_mode: LoiteringMode,
    tracker: ZoneOccupancyTracker,
}

impl RulesEngine {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            loitering_threshold_sec: config.loitering_threshold_sec,
            target_classes: config.target_classes.clone(),
            loitering_mode: config.loitering_mode,
            tracker: ZoneOccupancyTracker::new(),
        }
    }

    pub fn loitering_threshold_sec(&self) -> f64 {
        self.loitering_threshold_sec
    }

    pub fn tracker(&self) -> &ZoneOccupancyTracker {
        &self.tracker
    }

    fn qualifies(&self, detection: &Detection) -> bool {
        self.target_classes.iter().any(|c| c == &detection.class)
    }

    pub fn evaluate(
        &mut self,
        camera_id: CameraId,
        detections: &[Detection],
        zones: &[Zone],
        now: f64,
    ) -> Vec<Event> {
        let mut events = Vec::new();

        for zone in zones {
            let key = OccupancyKey::new(camera_id, zone.id());

            // Detector output order decides which detection speaks for the zone
            let first = detections
                .iter()
                .find(|d| self.qualifies(d) && zone.contains(&d.bbox));

            let Some(first) = first else {
                self.tracker.observe(key, false, now);
                continue;
            };

            let transition = self.tracker.observe(key, true, now);
            let since = match transition {
                OccupancyTransition::Entered { since } => {
                    debug!(camera_id, zone = %zone.name(), "Zone entered");
                    events.push(Event::intrusion(camera_id, zone.name(), first, now));
                    since
                }
                OccupancyTransition::Continued { since, .. } => since,
                OccupancyTransition::Cleared => continue,
            };

            let duration = now - since;
            if duration < self.loitering_threshold_sec {
                continue;
            }

            let report = match self.loitering_mode {
                LoiteringMode::EveryCycle => true,
                LoiteringMode::OncePerEpisode => self.tracker.mark_loitering_reported(&key),
            };
            if report {
                events.push(Event::loitering(camera_id, zone.name(), first, now, round_tenths(duration)));
            }
        }

        events
    }

    /// Forget every dwell timer
    pub fn reset(&mut self) {
        self.tracker.clear();
    }
}

/// Tenths, ties to even
fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RuleKind;
    use crate::inference::BoundingBox;

    fn engine(threshold: f64) -> RulesEngine {
        RulesEngine::new(&RulesConfig {
            loitering_threshold_sec: threshold,
            ..RulesConfig::default()
        })
    }

    fn zones() -> Vec<Zone> {
        vec![Zone::rectangle(1, "Restricted Area", 200, 200, 600, 600).unwrap()]
    }

    fn person_at(cx: i32, cy: i32, confidence: f64) -> Detection {
        Detection::new("person", confidence, BoundingBox::new(cx - 10, cy - 10, cx + 10, cy + 10))
    }

    #[test]
    fn test_intrusion_then_loitering_every_cycle() {
        let mut rules = engine(10.0);
        let zones = zones();
        let dets = vec![person_at(400, 400, 0.9)];

        let mut log = Vec::new();
        for t in 0..=12 {
            for event in rules.evaluate(1, &dets, &zones, t as f64) {
                log.push((t, event.rule, event.duration_sec));
            }
        }

        assert_eq!(
            log,
            vec![
                (0, RuleKind::Intrusion, None),
                (10, RuleKind::Loitering, Some(10.0)),
                (11, RuleKind::Loitering, Some(11.0)),
                (12, RuleKind::Loitering, Some(12.0)),
            ]
        );
    }

    #[test]
    fn test_once_per_episode_mode() {
        let mut rules = RulesEngine::new(&RulesConfig {
            loitering_threshold_sec: 5.0,
            loitering_mode: LoiteringMode::OncePerEpisode,
            ..RulesConfig::default()
        });
        let zones = zones();
        let dets = vec![person_at(400, 400, 0.9)];

        let loiters = |rules: &mut RulesEngine, range: std::ops::Range<i32>| {
            range
                .flat_map(|t| rules.evaluate(1, &dets, &zones, t as f64))
                .filter(|e| e.rule == RuleKind::Loitering)
                .count()
        };

        assert_eq!(loiters(&mut rules, 0..20), 1);
        rules.evaluate(1, &[], &zones, 20.0);
        assert_eq!(loiters(&mut rules, 21..30), 1);
    }

    #[test]
    fn test_gap_resets_dwell_and_retriggers_intrusion() {
        let mut rules = engine(10.0);
        let zones = zones();
        let dets = vec![person_at(400, 400, 0.9)];

        assert_eq!(rules.evaluate(1, &dets, &zones, 0.0).len(), 1);
        assert!(rules.evaluate(1, &dets, &zones, 8.0).is_empty());

        // Empty cycle: entry cleared, nothing emitted for departure
        assert!(rules.evaluate(1, &[], &zones, 9.0).is_empty());
        assert!(rules.tracker().is_empty());

        let reentry = rules.evaluate(1, &dets, &zones, 12.0);
        assert_eq!(reentry.len(), 1);
        assert_eq!(reentry[0].rule, RuleKind::Intrusion);

        // Dwell counts from 12, not 0
        assert!(rules.evaluate(1, &dets, &zones, 21.0).is_empty());
        let late = rules.evaluate(1, &dets, &zones, 22.0);
        assert_eq!(late[0].duration_sec, Some(10.0));
    }

    #[test]
    fn test_first_detection_in_output_order_wins() {
        let mut rules = engine(10.0);
        let dets = vec![
            person_at(50, 50, 0.99),
            person_at(300, 300, 0.61),
            person_at(400, 400, 0.95),
        ];

        let events = rules.evaluate(1, &dets, &zones(), 0.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].confidence, 0.61);
        assert_eq!(events[0].bbox, BoundingBox::new(290, 290, 310, 310));
        assert_eq!(events[0].object_type, "person");
    }

    #[test]
    fn test_non_target_classes_ignored() {
        let mut rules = engine(10.0);
        let car = Detection::new("car", 0.99, BoundingBox::new(390, 390, 410, 410));

        assert!(rules.evaluate(1, &[car.clone()], &zones(), 0.0).is_empty());
        assert!(rules.tracker().is_empty());

        let mut multi = RulesEngine::new(&RulesConfig {
            target_classes: vec!["person".into(), "car".into()],
            ..RulesConfig::default()
        });
        let events = multi.evaluate(1, &[car], &zones(), 0.0);
        assert_eq!(events[0].object_type, "car");
    }

    #[test]
    fn test_zones_tracked_independently() {
        let mut rules = engine(10.0);
        let zones = vec![
            Zone::rectangle(1, "Left", 0, 0, 100, 100).unwrap(),
            Zone::rectangle(2, "Right", 200, 0, 300, 100).unwrap(),
        ];

        let left = vec![person_at(50, 50, 0.8)];
        let both = vec![person_at(50, 50, 0.8), person_at(250, 50, 0.7)];

        let first = rules.evaluate(1, &left, &zones, 0.0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].zone, "Left");

        let second = rules.evaluate(1, &both, &zones, 1.0);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].zone, "Right");
        assert_eq!(rules.tracker().len(), 2);
    }

    #[test]
    fn test_cameras_do_not_share_occupancy() {
        let mut rules = engine(10.0);
        let dets = vec![person_at(400, 400, 0.9)];

        assert_eq!(rules.evaluate(1, &dets, &zones(), 0.0).len(), 1);
        assert_eq!(rules.evaluate(2, &dets, &zones(), 0.0).len(), 1);
        assert!(rules.evaluate(1, &dets, &zones(), 1.0).is_empty());
    }

    #[test]
    fn test_duration_rounded_to_tenths() {
        let mut rules = engine(10.0);
        let dets = vec![person_at(400, 400, 0.9)];

        rules.evaluate(1, &dets, &zones(), 100.0);
        let events = rules.evaluate(1, &dets, &zones(), 110.46);
        assert_eq!(events[0].duration_sec, Some(10.5));
        assert_eq!(events[0].timestamp, 110.46);
    }

    #[test]
    fn test_duration_ties_round_to_even() {
        assert_eq!(round_tenths(10.25), 10.2);
        assert_eq!(round_tenths(10.75), 10.8);
        assert_eq!(round_tenths(12.0), 12.0);

        let mut rules = engine(10.0);
        let dets = vec![person_at(400, 400, 0.9)];
        rules.evaluate(1, &dets, &zones(), 100.0);
        let events = rules.evaluate(1, &dets, &zones(), 110.25);
        assert_eq!(events[0].duration_sec, Some(10.2));
    }
}
