// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Ingestion module - stream sources and per-camera supervision

mod camera;
mod debug;
mod simulator;
mod source;
mod supervisor;

pub use camera::{Camera, CameraId, CameraSnapshot, CameraState, CameraStatus};
pub use debug::{DebugSink, TraceOverlay};
pub use simulator::SimulatedSource;
pub use source::{Capture, Frame, VideoSource};
pub use supervisor::{StreamSupervisor, SupervisorStats};
