// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Zonewatch - Camera Zone Intrusion & Loitering Monitor
//!
//! Watches a set of network cameras, runs an object detector on a subset of
//! frames, and records an event whenever a target object enters a configured
//! zone or stays inside it past a loitering threshold.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Zonewatch Engine                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐  ┌──────────┐  ┌───────────┐  ┌────────────┐  │
//! │  │  Video  │→ │ Detector │→ │   Rules   │→ │   Event    │  │
//! │  │ Source  │  │ (every N)│  │  Engine   │  │   Store    │  │
//! │  └─────────┘  └──────────┘  └───────────┘  └────────────┘  │
//! │       └────── one Stream Supervisor per camera ──────┘      │
//! │       ↓                                        ↓            │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │                      Event Bus                       │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │       ↓                                                     │
//! │  ┌─────────────────┐                                        │
//! │  │ Camera Registry │  (status projection, read only)       │
//! │  └─────────────────┘                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod inference;
pub mod ingestion;
pub mod registry;
pub mod rules;

// Re-exports for convenience
pub use config::Config;
pub use core::{Engine, EventBus, SystemState};
pub use error::{Error, Result};
pub use events::{Event, EventFilter, EventStore, MemoryEventStore, RuleKind, SqliteEventStore, StoredEvent};
pub use inference::{BoundingBox, Detection, Detector};
pub use ingestion::{Camera, CameraId, CameraStatus, StreamSupervisor, VideoSource};
pub use registry::CameraRegistry;
pub use rules::{RulesEngine, Zone};

/// Zonewatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Zonewatch name
pub const NAME: &str = "Zonewatch";
