// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Camera identity and live stream state

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Camera identifier, assigned by the registry starting at 1
pub type CameraId = i64;

/// Static camera identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    pub id: CameraId,
    pub name: String,
    pub location: String,
    /// Source address handed to the video source (e.g. an RTSP URL)
    pub address: String,
}

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    Online,
    Offline,
}

impl fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraStatus::Online => f.write_str("online"),
            CameraStatus::Offline => f.write_str("offline"),
        }
    }
}

/// Read-only projection of a camera's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSnapshot {
    pub camera_id: CameraId,
    pub name: String,
    pub location: String,
    pub address: String,
    pub status: CameraStatus,
    pub fps: f64,
    pub last_frame_time: Option<DateTime<Utc>>,
}

/// Connection, health and throughput state for one stream
///
/// Owned by exactly one supervisor. Going offline keeps `fps` and
/// `last_frame_time` for diagnostics.
#[derive(Debug, Clone)]
pub struct CameraState {
    camera: Camera,
    status: CameraStatus,
    fps: f64,
    last_frame_time: Option<DateTime<Utc>>,
}

impl CameraState {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            status: CameraStatus::Offline,
            fps: 0.0,
            last_frame_time: None,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn id(&self) -> CameraId {
        self.camera.id
    }

    pub fn name(&self) -> &str {
        &self.camera.name
    }

    pub fn status(&self) -> CameraStatus {
        self.status
    }

    pub fn is_online(&self) -> bool {
        self.status == CameraStatus::Online
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn last_frame_time(&self) -> Option<DateTime<Utc>> {
        self.last_frame_time
    }

    pub fn mark_online(&mut self) {
        self.status = CameraStatus::Online;
        self.last_frame_time = Some(Utc::now());
    }

    pub fn mark_offline(&mut self) {
        self.status = CameraStatus::Offline;
    }

    /// Store a window-averaged fps, truncated to 2 decimals
    pub fn update_fps(&mut self, fps: f64) {
        self.fps = (fps * 100.0).trunc() / 100.0;
    }

    /// Stamp a successfully read frame
    pub fn record_frame(&mut self) {
        self.last_frame_time = Some(Utc::now());
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            camera_id: self.camera.id,
            name: self.camera.name.clone(),
            location: self.camera.location.clone(),
            address: self.camera.address.clone(),
            status: self.status,
            fps: self.fps,
            last_frame_time: self.last_frame_time,
        }
    }
}
