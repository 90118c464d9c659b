// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Event bus for in-process observers

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use crate::events::{Event, StoredEvent};
use crate::ingestion::CameraSnapshot;

/// Fan-out of persisted events and camera status changes
///
/// Publishing never blocks a stream loop: with no subscribers the message is
/// dropped, and slow subscribers see `Lagged`.
pub struct EventBus {
    event_tx: broadcast::Sender<StoredEvent>,
    status_tx: broadcast::Sender<CameraSnapshot>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        let (status_tx, _) = broadcast::channel(capacity);

        Self {
            event_tx,
            status_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    /// Announce an event the store has accepted under `id`
    pub fn publish_event(&self, id: i64, event: Event) {
        self.event_counter.fetch_add(1, Ordering::Relaxed);
        let _ = self.event_tx.send(StoredEvent { id, event });
    }

    pub fn publish_status(&self, snapshot: CameraSnapshot) {
        let _ = self.status_tx.send(snapshot);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoredEvent> {
        self.event_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<CameraSnapshot> {
        self.status_tx.subscribe()
    }

    /// Events published since start
    pub fn published_events(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
