//! Core engine module - runs every camera loop and fans out what they produce

mod engine;
mod event_bus;

pub use engine::Engine;
pub use event_bus::EventBus;

use serde::{Deserialize, Serialize};

/// System-wide state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemState {
    pub running: bool,
    pub cameras_total: usize,
    pub cameras_online: usize,
    pub uptime_seconds: u64,
    pub events_published: u64,
}
