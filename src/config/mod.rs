// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Configuration module

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;
use crate::rules::{Zone, ZoneId};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Enable demo mode (simulated cameras and detector)
    pub demo_mode: bool,

    /// Stream supervision
    pub stream: StreamConfig,

    /// Zone rules
    pub rules: RulesConfig,

    /// Detector settings
    pub detector: DetectorConfig,

    /// Demo simulator settings
    pub simulator: SimulatorConfig,

    /// Event database
    pub database: DatabaseConfig,

    /// Cameras to supervise
    pub cameras: Vec<CameraConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Zonewatch".to_string(),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            demo_mode: true,
            stream: StreamConfig::default(),
            rules: RulesConfig::default(),
            detector: DetectorConfig::default(),
            simulator: SimulatorConfig::default(),
            database: DatabaseConfig::default(),
            cameras: vec![CameraConfig::default()],
        }
    }
}

impl Config {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("zonewatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Reject malformed settings before any stream loop starts
    pub fn validate(&self) -> std::result::Result<(), Error> {
        self.stream.validate()?;
        self.rules.validate()?;
        self.detector.validate()?;
        self.simulator.validate()?;

        for camera in &self.cameras {
            camera.zones()?;
        }
        Ok(())
    }
}

/// Stream supervision configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Run the detector on every Nth frame
    pub detect_every_n_frames: u64,

    /// Delay between failed connect attempts, in seconds
    pub reconnect_delay_secs: f64,

    /// Growth factor per consecutive failed connect (1.0 keeps the delay constant)
    pub backoff_multiplier: f64,

    /// Upper bound for the grown delay, in seconds
    pub max_reconnect_delay_secs: f64,

    /// Longest wait for a connect attempt, in milliseconds
    pub connect_timeout_ms: u64,

    /// Pause after a failed frame read before reconnecting, in milliseconds
    pub read_failure_backoff_ms: u64,

    /// Longest wait for a single frame, in milliseconds
    pub read_timeout_ms: u64,

    /// Throughput averaging window, in milliseconds
    pub fps_window_ms: u64,

    /// Events held for retry while the store is failing; the oldest go first
    pub max_pending_events: usize,

    /// Attach the trace overlay sink
    pub debug_overlay: bool,
}

/// Upper bound for any configured reconnect delay
const MAX_DELAY_SECS: f64 = 86_400.0;

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            detect_every_n_frames: 5,
            reconnect_delay_secs: 5.0,
            backoff_multiplier: 1.0,
            max_reconnect_delay_secs: 60.0,
            connect_timeout_ms: 10_000,
            read_failure_backoff_ms: 250,
            read_timeout_ms: 10_000,
            fps_window_ms: 1000,
            max_pending_events: 1000,
            debug_overlay: false,
        }
    }
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        secs_to_delay(self.reconnect_delay_secs)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        secs_to_delay(self.max_reconnect_delay_secs.max(self.reconnect_delay_secs))
    }

    /// Delay to use after `delay` failed again
    pub fn next_reconnect_delay(&self, delay: Duration) -> Duration {
        let max = self.max_reconnect_delay();
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff_multiplier)
            .map_or(max, |next| next.min(max))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_failure_backoff(&self) -> Duration {
        Duration::from_millis(self.read_failure_backoff_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn fps_window(&self) -> Duration {
        Duration::from_millis(self.fps_window_ms)
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), Error> {
        if self.detect_every_n_frames == 0 {
            return Err(Error::Config("stream.detect_every_n_frames must be at least 1".into()));
        }
        for (name, value) in [
            ("stream.reconnect_delay_secs", self.reconnect_delay_secs),
            ("stream.max_reconnect_delay_secs", self.max_reconnect_delay_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!("{} must be a non-negative number", name)));
            }
            if value > MAX_DELAY_SECS {
                return Err(Error::Config(format!(
                    "{} must be at most {} seconds",
                    name, MAX_DELAY_SECS
                )));
            }
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::Config("stream.backoff_multiplier must be >= 1.0".into()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::Config("stream.connect_timeout_ms must be positive".into()));
        }
        if self.max_pending_events == 0 {
            return Err(Error::Config("stream.max_pending_events must be at least 1".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(Error::Config("stream.read_timeout_ms must be positive".into()));
        }
        if self.fps_window_ms == 0 {
            return Err(Error::Config("stream.fps_window_ms must be positive".into()));
        }
        Ok(())
    }
}

/// Seconds to a `Duration`, saturating instead of panicking on values
/// `validate` would reject
fn secs_to_delay(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS)).unwrap_or(Duration::ZERO)
}

/// How often a long dwell is reported
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoiteringMode {
    /// Report on every evaluated cycle past the threshold
    EveryCycle,
    /// Report once per continuous dwell episode
    OncePerEpisode,
}

/// Rules engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Continuous occupancy after which loitering is reported
    pub loitering_threshold_sec: f64,

    /// Object classes that occupy a zone
    pub target_classes: Vec<String>,

    /// Loitering reporting policy
    pub loitering_mode: LoiteringMode,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            loitering_threshold_sec: 10.0,
            target_classes: vec!["person".to_string()],
            loitering_mode: LoiteringMode::EveryCycle,
        }
    }
}

impl RulesConfig {
    fn validate(&self) -> std::result::Result<(), Error> {
        if !self.loitering_threshold_sec.is_finite() || self.loitering_threshold_sec < 0.0 {
            return Err(Error::Config("rules.loitering_threshold_sec must be non-negative".into()));
        }
        if self.target_classes.is_empty() {
            return Err(Error::Config("rules.target_classes must not be empty".into()));
        }
        Ok(())
    }
}

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detections below this confidence are dropped
    pub confidence_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> std::result::Result<(), Error> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config("detector.confidence_threshold must be within [0, 1]".into()));
        }
        Ok(())
    }
}

/// Demo simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Simulated stream frame rate
    pub fps: f64,

    pub frame_width: u32,

    pub frame_height: u32,

    /// Chance a connect attempt fails
    pub connect_failure_probability: f64,

    /// Chance per frame that an open stream drops
    pub stream_drop_probability: f64,

    /// Chance per detector call that a person walks in
    pub person_enter_probability: f64,

    /// Chance per detector call that the person walks out
    pub person_leave_probability: f64,

    /// Standard deviation of the per-call walk step, in pixels
    pub person_step_px: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            fps: 15.0,
            frame_width: 1280,
            frame_height: 720,
            connect_failure_probability: 0.1,
            stream_drop_probability: 0.001,
            person_enter_probability: 0.05,
            person_leave_probability: 0.02,
            person_step_px: 15.0,
        }
    }
}

impl SimulatorConfig {
    fn validate(&self) -> std::result::Result<(), Error> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(Error::Config("simulator.fps must be positive".into()));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(Error::Config("simulator frame size must be non-zero".into()));
        }
        for (name, p) in [
            ("connect_failure_probability", self.connect_failure_probability),
            ("stream_drop_probability", self.stream_drop_probability),
            ("person_enter_probability", self.person_enter_probability),
            ("person_leave_probability", self.person_leave_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::Config(format!("simulator.{} must be within [0, 1]", name)));
            }
        }
        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Persist events to SQLite; otherwise keep them in memory
    pub enabled: bool,

    /// Database path
    pub path: PathBuf,

    /// Retention period in days, 0 keeps everything
    pub retention_days: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("./data/events.db"),
            retention_days: 30,
        }
    }
}

/// One camera and its zones
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub name: String,

    #[serde(default)]
    pub location: String,

    /// Stream address handed to the video source
    pub address: String,

    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            name: "Test Camera".to_string(),
            location: "Local".to_string(),
            address: "rtsp://127.0.0.1:8554/stream".to_string(),
            zones: vec![ZoneConfig {
                id: 1,
                name: "Restricted Area".to_string(),
                rect: Some([200, 200, 600, 600]),
                polygon: None,
            }],
        }
    }
}

impl CameraConfig {
    /// Build validated zones; ids must be unique per camera
    pub fn zones(&self) -> std::result::Result<Vec<Zone>, Error> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("camera name must not be empty".into()));
        }

        let mut seen = HashSet::new();
        let mut zones = Vec::with_capacity(self.zones.len());
        for zone in &self.zones {
            if !seen.insert(zone.id) {
                return Err(Error::Config(format!(
                    "camera '{}' has duplicate zone id {}",
                    self.name, zone.id
                )));
            }
            zones.push(zone.build()?);
        }
        Ok(zones)
    }
}

/// Zone definition: exactly one of `rect` or `polygon`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: ZoneId,

    pub name: String,

    /// `[x1, y1, x2, y2]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<[i32; 4]>,

    /// `[[x, y], ...]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<[i32; 2]>>,
}

impl ZoneConfig {
    pub fn build(&self) -> std::result::Result<Zone, Error> {
        match (&self.rect, &self.polygon) {
            (Some([x1, y1, x2, y2]), None) => Zone::rectangle(self.id, &self.name, *x1, *y1, *x2, *y2),
            (None, Some(points)) => Zone::polygon(self.id, &self.name, points.clone()),
            _ => Err(Error::invalid_zone(&self.name, "exactly one of rect or polygon is required")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        config.validate().unwrap();

        let zones = config.cameras[0].zones().unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name(), "Restricted Area");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();

        assert_eq!(parsed.stream.detect_every_n_frames, 5);
        assert_eq!(parsed.rules.loitering_mode, LoiteringMode::EveryCycle);
        assert_eq!(parsed.cameras[0].zones[0].rect, Some([200, 200, 600, 600]));
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let parsed = Config::from_toml_str(
            r#"
            demo_mode = false

            [rules]
            loitering_mode = "once_per_episode"

            [[cameras]]
            name = "Dock"
            address = "rtsp://10.0.0.5/live"

            [[cameras.zones]]
            id = 3
            name = "Ramp"
            polygon = [[0, 0], [100, 0], [50, 80]]
            "#,
        )
        .unwrap();

        assert!(!parsed.demo_mode);
        assert_eq!(parsed.rules.loitering_mode, LoiteringMode::OncePerEpisode);
        assert_eq!(parsed.rules.loitering_threshold_sec, 10.0);
        assert_eq!(parsed.cameras.len(), 1);
        assert_eq!(parsed.cameras[0].zones().unwrap()[0].id(), 3);
    }

    #[test]
    fn test_inverted_zone_rejected() {
        let err = Config::from_toml_str(
            r#"
            [[cameras]]
            name = "Dock"
            address = "rtsp://10.0.0.5/live"

            [[cameras.zones]]
            id = 1
            name = "Backwards"
            rect = [600, 200, 200, 600]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Backwards"));
    }

    #[test]
    fn test_zone_needs_exactly_one_shape() {
        let zone = ZoneConfig {
            id: 1,
            name: "Both".into(),
            rect: Some([0, 0, 1, 1]),
            polygon: Some(vec![[0, 0], [1, 0], [0, 1]]),
        };
        assert!(zone.build().is_err());
    }

    #[test]
    fn test_duplicate_zone_ids_rejected() {
        let mut camera = CameraConfig::default();
        camera.zones.push(camera.zones[0].clone());
        assert!(camera.zones().is_err());
    }

    #[test]
    fn test_stream_bounds() {
        let mut config = Config::default();
        config.stream.detect_every_n_frames = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stream.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stream.max_pending_events = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stream.connect_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_delays_rejected() {
        let mut config = Config::default();
        config.stream.max_reconnect_delay_secs = 1e20;
        config.stream.backoff_multiplier = 2.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stream.reconnect_delay_secs = f64::INFINITY;
        assert!(config.validate().is_err());

        // Growth past the cap saturates instead of overflowing
        let stream = StreamConfig {
            backoff_multiplier: 1e300,
            max_reconnect_delay_secs: MAX_DELAY_SECS,
            ..StreamConfig::default()
        };
        stream.validate().unwrap();
        let grown = stream.next_reconnect_delay(stream.reconnect_delay());
        assert_eq!(grown, Duration::from_secs(86_400));
        assert_eq!(stream.next_reconnect_delay(grown), Duration::from_secs(86_400));
    }

    #[test]
    fn test_backoff_growth_is_capped() {
        let stream = StreamConfig {
            reconnect_delay_secs: 2.0,
            backoff_multiplier: 2.0,
            max_reconnect_delay_secs: 5.0,
            ..StreamConfig::default()
        };
        let d1 = stream.next_reconnect_delay(stream.reconnect_delay());
        assert_eq!(d1, Duration::from_secs(4));
        assert_eq!(stream.next_reconnect_delay(d1), Duration::from_secs(5));

        let constant = StreamConfig::default();
        assert_eq!(constant.next_reconnect_delay(constant.reconnect_delay()), Duration::from_secs(5));
    }
}
