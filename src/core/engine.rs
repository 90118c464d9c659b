// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Engine - one supervisor task per camera, shared shutdown

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{EventBus, SystemState};
use crate::config::{CameraConfig, Config};
use crate::events::EventStore;
use crate::inference::{ConfidenceGate, Detector};
use crate::ingestion::{CameraId, StreamSupervisor, SupervisorStats, TraceOverlay, VideoSource};
use crate::registry::{CameraRegistry, NewCamera};
use crate::rules::RulesEngine;

/// Owns every camera loop in the process
pub struct Engine {
    pub config: Arc<Config>,
    store: Arc<dyn EventStore>,
    registry: Arc<CameraRegistry>,
    bus: Arc<EventBus>,
    shutdown_tx: broadcast::Sender<()>,
    idle: Vec<(CameraId, StreamSupervisor)>,
    tasks: Vec<(CameraId, JoinHandle<SupervisorStats>)>,
    state: Arc<RwLock<SystemState>>,
    start_time: Option<Instant>,
}

impl Engine {
    pub fn new(
        config: Config,
        store: Arc<dyn EventStore>,
        registry: Arc<CameraRegistry>,
        bus: Arc<EventBus>,
    ) -> Result<Self> {
        config.validate()?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config: Arc::new(config),
            store,
            registry,
            bus,
            shutdown_tx,
            idle: Vec::new(),
            tasks: Vec::new(),
            state: Arc::new(RwLock::new(SystemState::default())),
            start_time: None,
        })
    }

    /// Register `camera` and build its supervisor
    ///
    /// The stream is opened by [`Engine::start`]; cameras added while the
    /// engine is already running start immediately.
    pub async fn add_camera<D>(
        &mut self,
        camera: &CameraConfig,
        source: Box<dyn VideoSource>,
        detector: D,
    ) -> Result<CameraId>
    where
        D: Detector + 'static,
    {
        // Zones are validated before anything is registered or spawned
        let zones = camera.zones()?;

        let registered = self.registry.create(NewCamera {
            name: camera.name.clone(),
            location: camera.location.clone(),
            address: camera.address.clone(),
        });
        let id = registered.id;

        let detector = ConfidenceGate::new(detector, self.config.detector.confidence_threshold);
        let mut supervisor = StreamSupervisor::new(
            registered,
            self.config.stream.clone(),
            source,
            Box::new(detector),
            self.store.clone(),
        )?
        .with_zones(zones)
        .with_rules(RulesEngine::new(&self.config.rules))
        .with_event_bus(self.bus.clone());

        if self.config.stream.debug_overlay {
            supervisor = supervisor.with_debug_sink(Box::new(TraceOverlay::new()));
        }

        self.registry.attach_status(id, supervisor.subscribe_status())?;

        let running = {
            let mut state = self.state.write().await;
            state.cameras_total += 1;
            state.running
        };
        if running {
            self.spawn(id, supervisor);
        } else {
            self.idle.push((id, supervisor));
        }

        Ok(id)
    }

    fn spawn(&mut self, id: CameraId, mut supervisor: StreamSupervisor) {
        let shutdown = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            if let Err(e) = supervisor.run(shutdown).await {
                error!(camera = id, error = %e, "Stream supervisor exited with error");
            }
            supervisor.stats().clone()
        });
        self.tasks.push((id, handle));
    }

    /// Spawn one task per added camera
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Zonewatch engine...");
        self.start_time = Some(Instant::now());

        for (id, supervisor) in std::mem::take(&mut self.idle) {
            self.spawn(id, supervisor);
        }

        {
            let mut state = self.state.write().await;
            state.running = true;
        }

        info!(cameras = self.tasks.len(), "Zonewatch engine started");
        Ok(())
    }

    /// Signal every loop and wait for each to finish its cleanup
    pub async fn stop(&mut self) -> Result<Vec<(CameraId, SupervisorStats)>> {
        info!("Stopping Zonewatch engine...");
        let _ = self.shutdown_tx.send(());

        self.idle.clear();

        let mut finished = Vec::with_capacity(self.tasks.len());
        for (id, handle) in self.tasks.drain(..) {
            match handle.await {
                Ok(stats) => finished.push((id, stats)),
                Err(e) => warn!(camera = id, error = %e, "Stream task did not finish cleanly"),
            }
        }

        {
            let mut state = self.state.write().await;
            state.running = false;
        }

        info!("Zonewatch engine stopped");
        Ok(finished)
    }

    pub async fn state(&self) -> SystemState {
        let mut state = self.state.read().await.clone();
        state.cameras_online = self.registry.online_count();
        state.events_published = self.bus.published_events();
        state.uptime_seconds = self.uptime();
        state
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    pub fn registry(&self) -> &Arc<CameraRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }
}
