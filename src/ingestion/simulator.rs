// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Simulated video source for demo/testing

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use rand::prelude::*;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

use super::{Capture, Frame, VideoSource};
use crate::config::SimulatorConfig;

/// Simulates an unreliable network camera: connects fail now and then,
/// open streams drop out at random
pub struct SimulatedSource {
    config: SimulatorConfig,
    rng: StdRng,
}

impl SimulatedSource {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait]
impl VideoSource for SimulatedSource {
    async fn open(&mut self, address: &str) -> Result<Box<dyn Capture>> {
        if self.rng.gen::<f64>() < self.config.connect_failure_probability {
            bail!("simulated connect failure for {}", address);
        }

        let mut ticker = interval(Duration::from_secs_f64(1.0 / self.config.fps.max(0.1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(address, fps = self.config.fps, "Simulated capture opened");
        Ok(Box::new(SimulatedCapture {
            width: self.config.frame_width,
            height: self.config.frame_height,
            drop_probability: self.config.stream_drop_probability,
            sequence: 0,
            rng: StdRng::from_rng(&mut self.rng)?,
            ticker,
            released: false,
        }))
    }
}

struct SimulatedCapture {
    width: u32,
    height: u32,
    drop_probability: f64,
    sequence: u64,
    rng: StdRng,
    ticker: Interval,
    released: bool,
}

#[async_trait]
impl Capture for SimulatedCapture {
    async fn read(&mut self) -> Result<Option<Frame>> {
        if self.released {
            bail!("capture already released");
        }

        self.ticker.tick().await;

        if self.rng.gen::<f64>() < self.drop_probability {
            return Ok(None);
        }

        self.sequence += 1;
        Ok(Some(Frame::new(self.sequence, self.width, self.height, Vec::new())))
    }

    async fn release(&mut self) {
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_frames_are_sequenced() {
        let config = SimulatorConfig {
            connect_failure_probability: 0.0,
            stream_drop_probability: 0.0,
            ..SimulatorConfig::default()
        };
        let mut source = SimulatedSource::with_seed(config, 1);
        let mut capture = source.open("sim://cam").await.unwrap();

        for expected in 1..=5 {
            let frame = capture.read().await.unwrap().unwrap();
            assert_eq!(frame.sequence, expected);
        }

        capture.release().await;
        capture.release().await;
        assert!(capture.read().await.is_err());
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let config = SimulatorConfig {
            connect_failure_probability: 1.0,
            ..SimulatorConfig::default()
        };
        let mut source = SimulatedSource::with_seed(config, 1);
        assert!(source.open("sim://cam").await.is_err());
    }
}
