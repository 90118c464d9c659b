// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Stream supervisor - the read → detect → rules → persist loop for one camera
//!
//! ```text
//!            open fails: mark offline, sleep reconnect delay
//!              ┌──────────┐
//!              ▼          │
//!  ┌──────────────┐  open ok   ┌───────────┐
//!  │ Disconnected │ ─────────► │ Connected │ ── frame ──► detect (every Nth)
//!  └──────────────┘            └───────────┘              → rules → store
//!          ▲   read error / end of stream / timeout │
//!          └────────── release, short backoff ──────┘
//! ```
//!
//! Shutdown is checked at every suspension point. The capture handle and the
//! debug sink are released exactly once on every exit path.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, watch};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use super::{Camera, CameraSnapshot, CameraState, Capture, DebugSink, Frame, VideoSource};
use crate::config::{RulesConfig, StreamConfig};
use crate::core::EventBus;
use crate::events::{epoch_seconds, Event, EventStore};
use crate::inference::{Detection, Detector};
use crate::rules::{RulesEngine, Zone};

/// Counters for one supervisor's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub frames: u64,
    pub detector_calls: u64,
    pub detector_failures: u64,
    pub events_emitted: u64,
    pub events_stored: u64,
    pub store_failures: u64,
    pub events_dropped: u64,
    pub read_failures: u64,
    pub reconnect_delays: u64,
    pub online_transitions: u64,
}

/// How a loop iteration asked to continue
enum Step {
    Continue,
    Shutdown,
}

enum Connect {
    Connected,
    Failed,
    Shutdown,
}

/// Frames counted over one throughput window
struct FpsWindow {
    started: Instant,
    frames: u64,
}

impl FpsWindow {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            frames: 0,
        }
    }

    /// Count a frame; returns the window average once `window` has elapsed
    fn tick(&mut self, window: Duration) -> Option<f64> {
        self.frames += 1;
        let elapsed = self.started.elapsed();
        if elapsed < window {
            return None;
        }
        let fps = self.frames as f64 / elapsed.as_secs_f64();
        self.frames = 0;
        self.started = Instant::now();
        Some(fps)
    }
}

/// Owns one camera's stream for the life of the process
pub struct StreamSupervisor {
    camera: CameraState,
    settings: StreamConfig,
    source: Box<dyn VideoSource>,
    capture: Option<Box<dyn Capture>>,
    detector: Box<dyn Detector>,
    rules: RulesEngine,
    zones: Vec<Zone>,
    store: Arc<dyn EventStore>,
    bus: Option<Arc<EventBus>>,
    debug_sink: Option<Box<dyn DebugSink>>,
    status_tx: watch::Sender<CameraSnapshot>,

    frame_count: u64,
    last_detections: Vec<Detection>,
    pending: VecDeque<Event>,
    stats: SupervisorStats,
    cleaned_up: bool,
}

impl StreamSupervisor {
    pub fn new(
        camera: Camera,
        settings: StreamConfig,
        source: Box<dyn VideoSource>,
        detector: Box<dyn Detector>,
        store: Arc<dyn EventStore>,
    ) -> crate::error::Result<Self> {
        settings.validate()?;

        let camera = CameraState::new(camera);
        let (status_tx, _) = watch::channel(camera.snapshot());

        Ok(Self {
            camera,
            settings,
            source,
            capture: None,
            detector,
            rules: RulesEngine::new(&RulesConfig::default()),
            zones: Vec::new(),
            store,
            bus: None,
            debug_sink: None,
            status_tx,
            frame_count: 0,
            last_detections: Vec::new(),
            pending: VecDeque::new(),
            stats: SupervisorStats::default(),
            cleaned_up: false,
        })
    }

    pub fn with_zones(mut self, zones: Vec<Zone>) -> Self {
        self.zones = zones;
        self
    }

    pub fn with_rules(mut self, rules: RulesEngine) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_debug_sink(mut self, sink: Box<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn stats(&self) -> &SupervisorStats {
        &self.stats
    }

    /// Events the rules engine emitted that the store has not accepted yet
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Live status projection for registries and dashboards
    pub fn subscribe_status(&self) -> watch::Receiver<CameraSnapshot> {
        self.status_tx.subscribe()
    }

    /// Run until `shutdown` fires. Cleanup always runs before returning.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(camera = %self.camera.name(), zones = self.zones.len(), "Starting stream supervisor");

        let result = self.run_loop(&mut shutdown).await;
        self.stop().await;
        result
    }

    async fn run_loop(&mut self, shutdown: &mut broadcast::Receiver<()>) -> Result<()> {
        let mut reconnect_delay = self.settings.reconnect_delay();
        let mut fps_window = FpsWindow::new();

        loop {
            if self.capture.is_none() {
                match self.connect(shutdown).await {
                    Connect::Connected => {
                        reconnect_delay = self.settings.reconnect_delay();
                        fps_window = FpsWindow::new();
                    }
                    Connect::Failed => {
                        self.stats.reconnect_delays += 1;
                        if let Step::Shutdown = wait_or_shutdown(reconnect_delay, shutdown).await {
                            break;
                        }
                        reconnect_delay = self.settings.next_reconnect_delay(reconnect_delay);
                        continue;
                    }
                    Connect::Shutdown => break,
                }
            }

            let Some(capture) = self.capture.as_mut() else {
                continue;
            };

            let read = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                read = timeout(self.settings.read_timeout(), capture.read()) => read,
            };

            let frame = match read {
                Ok(Ok(Some(frame))) => frame,
                Ok(Ok(None)) => {
                    warn!(camera = %self.camera.name(), "End of stream. Reconnecting...");
                    if let Step::Shutdown = self.on_read_failure(shutdown).await {
                        break;
                    }
                    continue;
                }
                Ok(Err(e)) => {
                    warn!(camera = %self.camera.name(), error = %e, "Frame read failed. Reconnecting...");
                    if let Step::Shutdown = self.on_read_failure(shutdown).await {
                        break;
                    }
                    continue;
                }
                Err(_) => {
                    warn!(
                        camera = %self.camera.name(),
                        timeout_ms = self.settings.read_timeout_ms,
                        "Frame read timed out. Reconnecting..."
                    );
                    if let Step::Shutdown = self.on_read_failure(shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            self.process_frame(frame).await;

            if let Some(fps) = fps_window.tick(self.settings.fps_window()) {
                self.camera.update_fps(fps);
                self.publish_status();
                info!(
                    camera = %self.camera.name(),
                    status = %self.camera.status(),
                    fps = self.camera.fps(),
                    detections = self.last_detections.len(),
                    "Stream status"
                );
            }
        }

        Ok(())
    }

    async fn connect(&mut self, shutdown: &mut broadcast::Receiver<()>) -> Connect {
        info!(camera = %self.camera.name(), address = %self.camera.camera().address, "Connecting to camera");

        let address = self.camera.camera().address.clone();
        let opened = tokio::select! {
            biased;
            _ = shutdown.recv() => return Connect::Shutdown,
            opened = timeout(self.settings.connect_timeout(), self.source.open(&address)) => opened,
        };

        let error = match opened {
            Ok(Ok(capture)) => {
                self.capture = Some(capture);
                self.camera.mark_online();
                self.stats.online_transitions += 1;
                self.publish_status();
                info!(camera = %self.camera.name(), "Camera connected");
                return Connect::Connected;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {} ms", self.settings.connect_timeout_ms),
        };

        error!(camera = %self.camera.name(), error = %error, "Failed to connect to stream");
        self.camera.mark_offline();
        self.publish_status();
        Connect::Failed
    }

    async fn on_read_failure(&mut self, shutdown: &mut broadcast::Receiver<()>) -> Step {
        self.stats.read_failures += 1;
        self.release_capture().await;
        self.camera.mark_offline();
        self.publish_status();

        let backoff = self.settings.read_failure_backoff();
        if backoff.is_zero() {
            return Step::Continue;
        }
        wait_or_shutdown(backoff, shutdown).await
    }

    async fn process_frame(&mut self, frame: Frame) {
        self.frame_count += 1;
        self.stats.frames += 1;
        self.camera.record_frame();

        if self.frame_count % self.settings.detect_every_n_frames == 0 {
            self.stats.detector_calls += 1;
            match self.detector.detect(&frame).await {
                Ok(detections) => self.last_detections = detections,
                Err(e) => {
                    // Keep the previous detections for this cycle
                    self.stats.detector_failures += 1;
                    warn!(
                        camera = %self.camera.name(),
                        detector = %self.detector.name(),
                        frame = self.frame_count,
                        error = %e,
                        "Detector failed"
                    );
                }
            }
        }

        if let Some(sink) = self.debug_sink.as_mut() {
            sink.on_frame(&self.camera, &frame, &self.last_detections, &self.zones);
        }

        let events = self
            .rules
            .evaluate(self.camera.id(), &self.last_detections, &self.zones, epoch_seconds());
        self.stats.events_emitted += events.len() as u64;
        self.queue_events(events);

        self.flush_events();
    }

    /// Queue events for the store, evicting the oldest once the retry queue is full
    fn queue_events(&mut self, events: Vec<Event>) {
        for event in events {
            if self.pending.len() >= self.settings.max_pending_events {
                if let Some(dropped) = self.pending.pop_front() {
                    self.stats.events_dropped += 1;
                    error!(
                        camera = %self.camera.name(),
                        rule = %dropped.rule,
                        zone = %dropped.zone,
                        timestamp = dropped.timestamp,
                        dropped_total = self.stats.events_dropped,
                        "Event retry queue full, dropping oldest event"
                    );
                }
            }
            self.pending.push_back(event);
        }
    }

    /// Hand queued events to the store in order. A failed insert leaves it
    /// and everything behind it queued for the next cycle.
    fn flush_events(&mut self) {
        while let Some(event) = self.pending.front() {
            match self.store.insert(event) {
                Ok(id) => {
                    self.stats.events_stored += 1;
                    info!(
                        id,
                        camera = %self.camera.name(),
                        rule = %event.rule,
                        zone = %event.zone,
                        duration_sec = ?event.duration_sec,
                        "Event recorded"
                    );
                    if let Some(bus) = &self.bus {
                        bus.publish_event(id, event.clone());
                    }
                    self.pending.pop_front();
                }
                Err(e) => {
                    self.stats.store_failures += 1;
                    error!(
                        camera = %self.camera.name(),
                        pending = self.pending.len(),
                        error = %e,
                        "Event store insert failed, will retry"
                    );
                    break;
                }
            }
        }
    }

    fn publish_status(&self) {
        let snapshot = self.camera.snapshot();
        if let Some(bus) = &self.bus {
            bus.publish_status(snapshot.clone());
        }
        self.status_tx.send_replace(snapshot);
    }

    async fn release_capture(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.release().await;
            debug!(camera = %self.camera.name(), "Capture released");
        }
    }

    /// Release every resource. Safe to call more than once.
    pub async fn stop(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        info!(camera = %self.camera.name(), "Stopping stream");
        self.release_capture().await;
        if let Some(sink) = self.debug_sink.as_mut() {
            sink.close();
        }

        self.flush_events();
        if !self.pending.is_empty() {
            error!(
                camera = %self.camera.name(),
                undelivered = self.pending.len(),
                "Stream stopped with events the store never accepted"
            );
        }

        self.camera.mark_offline();
        self.publish_status();
    }
}

async fn wait_or_shutdown(delay: Duration, shutdown: &mut broadcast::Receiver<()>) -> Step {
    tokio::select! {
        biased;
        _ = shutdown.recv() => Step::Shutdown,
        _ = sleep(delay) => Step::Continue,
    }
}
