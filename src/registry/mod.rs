// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Camera registry - administrative view of configured cameras
//!
//! Passed by handle to whoever needs it; there is no global instance. Live
//! status comes from each supervisor's watch channel, so the registry only
//! ever reads camera state.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::error::{Error, Result};
use crate::ingestion::{Camera, CameraId, CameraSnapshot, CameraStatus};

/// Fields supplied when registering a camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCamera {
    pub name: String,
    pub location: String,
    pub address: String,
}

/// Camera as listed by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    pub id: CameraId,
    pub name: String,
    pub location: String,
    pub address: String,
    pub status: CameraStatus,
    pub fps: f64,
}

struct Entry {
    camera: Camera,
    status: Option<watch::Receiver<CameraSnapshot>>,
}

impl Entry {
    fn record(&self) -> CameraRecord {
        let (status, fps) = match &self.status {
            Some(rx) => {
                let snapshot = rx.borrow();
                (snapshot.status, snapshot.fps)
            }
            None => (CameraStatus::Offline, 0.0),
        };

        CameraRecord {
            id: self.camera.id,
            name: self.camera.name.clone(),
            location: self.camera.location.clone(),
            address: self.camera.address.clone(),
            status,
            fps,
        }
    }
}

#[derive(Default)]
pub struct CameraRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a camera; ids count up from 1
    pub fn create(&self, camera: NewCamera) -> Camera {
        let mut entries = self.entries.write();
        let id = entries.last().map_or(1, |e| e.camera.id + 1);

        let camera = Camera {
            id,
            name: camera.name,
            location: camera.location,
            address: camera.address,
        };
        entries.push(Entry {
            camera: camera.clone(),
            status: None,
        });

        info!(id, name = %camera.name, "Registered camera");
        camera
    }

    pub fn list(&self) -> Vec<CameraRecord> {
        self.entries.read().iter().map(Entry::record).collect()
    }

    pub fn get(&self, id: CameraId) -> Result<CameraRecord> {
        self.entries
            .read()
            .iter()
            .find(|e| e.camera.id == id)
            .map(Entry::record)
            .ok_or_else(|| Error::NotFound(format!("camera {}", id)))
    }

    /// Attach the status feed of the supervisor that owns camera `id`
    pub fn attach_status(&self, id: CameraId, status: watch::Receiver<CameraSnapshot>) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.camera.id == id)
            .ok_or_else(|| Error::NotFound(format!("camera {}", id)))?;
        entry.status = Some(status);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn online_count(&self) -> usize {
        self.list()
            .iter()
            .filter(|c| c.status == CameraStatus::Online)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::CameraState;

    fn new_camera(name: &str) -> NewCamera {
        NewCamera {
            name: name.to_string(),
            location: "Lot B".to_string(),
            address: format!("rtsp://{}/live", name),
        }
    }

    #[test]
    fn test_ids_start_at_one() {
        let registry = CameraRegistry::new();
        assert!(registry.is_empty());

        assert_eq!(registry.create(new_camera("gate")).id, 1);
        assert_eq!(registry.create(new_camera("dock")).id, 2);

        let listed = registry.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].name, "dock");
        assert_eq!(listed[1].status, CameraStatus::Offline);
    }

    #[test]
    fn test_get_missing() {
        let registry = CameraRegistry::new();
        assert!(registry.get(1).unwrap_err().is_not_found());
        let (_tx, rx) = watch::channel(CameraState::new(registry.create(new_camera("x"))).snapshot());
        assert!(registry.attach_status(5, rx).is_err());
    }

    #[test]
    fn test_status_projection_follows_owner() {
        let registry = CameraRegistry::new();
        let camera = registry.create(new_camera("gate"));

        let mut state = CameraState::new(camera.clone());
        let (tx, rx) = watch::channel(state.snapshot());
        registry.attach_status(camera.id, rx).unwrap();
        assert_eq!(registry.online_count(), 0);

        state.mark_online();
        state.update_fps(14.96);
        tx.send_replace(state.snapshot());

        let record = registry.get(camera.id).unwrap();
        assert_eq!(record.status, CameraStatus::Online);
        assert_eq!(record.fps, 14.96);
        assert_eq!(registry.online_count(), 1);
    }
}
