// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! In-process event store, used when the database is disabled

use parking_lot::RwLock;

use super::{Event, EventFilter, EventStore, StoredEvent};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<StoredEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for MemoryEventStore {
    fn insert(&self, event: &Event) -> Result<i64> {
        let mut events = self.events.write();
        let id = events.len() as i64 + 1;
        events.push(StoredEvent {
            id,
            event: event.clone(),
        });
        Ok(id)
    }

    fn query(&self, filter: &EventFilter) -> Result<Vec<StoredEvent>> {
        let events = self.events.read();
        Ok(events
            .iter()
            .filter(|e| filter.matches(&e.event))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn get(&self, id: i64) -> Result<StoredEvent> {
        let events = self.events.read();
        events
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("event {}", id)))
    }

    fn count(&self) -> Result<usize> {
        Ok(self.events.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RuleKind;
    use crate::inference::{BoundingBox, Detection};
    use std::sync::Arc;

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(MemoryEventStore::new());
        let det = Detection::new("person", 0.8, BoundingBox::new(0, 0, 10, 10));

        let handles: Vec<_> = (1..=4)
            .map(|camera_id| {
                let store = store.clone();
                let det = det.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store.insert(&Event::intrusion(camera_id, "Gate", &det, i as f64)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.count().unwrap(), 100);
        assert_eq!(store.query(&EventFilter::camera(3)).unwrap().len(), 25);

        let mut ids: Vec<i64> = store.query(&EventFilter::default()).unwrap().iter().map(|e| e.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_lookup_miss() {
        let store = MemoryEventStore::new();
        assert!(store.get(1).unwrap_err().is_not_found());
        assert!(store
            .query(&EventFilter::default().with_rule(RuleKind::Loitering))
            .unwrap()
            .is_empty());
    }
}
