// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Simulated person detector for demo/testing

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::prelude::*;
use rand_distr::{Normal, Uniform};

use super::{BoundingBox, Detection, Detector};
use crate::config::SimulatorConfig;
use crate::ingestion::Frame;

const PERSON_WIDTH: f64 = 80.0;
const PERSON_HEIGHT: f64 = 160.0;

/// Produces a wandering person (and the odd parked car) so zones get
/// entered, occupied and left without a real model
pub struct PersonSimulator {
    rng: StdRng,
    width: f64,
    height: f64,

    // Simulation state
    present: bool,
    position: (f64, f64),
    enter_probability: f64,
    leave_probability: f64,
    step: Normal<f64>,
    confidence: Uniform<f64>,
}

impl PersonSimulator {
    pub fn new(config: &SimulatorConfig) -> Result<Self> {
        let step = Normal::new(0.0, config.person_step_px)
            .map_err(|e| anyhow!("invalid person step {}: {}", config.person_step_px, e))?;

        Ok(Self {
            rng: StdRng::from_entropy(),
            width: config.frame_width as f64,
            height: config.frame_height as f64,
            present: false,
            position: (config.frame_width as f64 / 2.0, config.frame_height as f64 / 2.0),
            enter_probability: config.person_enter_probability,
            leave_probability: config.person_leave_probability,
            step,
            confidence: Uniform::new(0.35, 0.98),
        })
    }

    /// Deterministic variant for reproducible runs
    pub fn with_seed(config: &SimulatorConfig, seed: u64) -> Result<Self> {
        let mut sim = Self::new(config)?;
        sim.rng = StdRng::seed_from_u64(seed);
        Ok(sim)
    }

    fn advance(&mut self) {
        if self.present {
            if self.rng.gen::<f64>() < self.leave_probability {
                self.present = false;
                return;
            }
            let dx = self.rng.sample(&self.step);
            let dy = self.rng.sample(&self.step);
            self.position.0 = (self.position.0 + dx).clamp(0.0, self.width);
            self.position.1 = (self.position.1 + dy).clamp(0.0, self.height);
        } else if self.rng.gen::<f64>() < self.enter_probability {
            self.present = true;
            self.position = (
                self.rng.gen_range(0.0..self.width),
                self.rng.gen_range(0.0..self.height),
            );
        }
    }

    fn person_box(&self) -> BoundingBox {
        let (cx, cy) = self.position;
        BoundingBox::new(
            (cx - PERSON_WIDTH / 2.0).max(0.0) as i32,
            (cy - PERSON_HEIGHT / 2.0).max(0.0) as i32,
            (cx + PERSON_WIDTH / 2.0).min(self.width) as i32,
            (cy + PERSON_HEIGHT / 2.0).min(self.height) as i32,
        )
    }
}

#[async_trait]
impl Detector for PersonSimulator {
    fn name(&self) -> &str {
        "person-simulator"
    }

    async fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        self.advance();

        let mut detections = Vec::new();
        if self.present {
            let confidence = self.rng.sample(&self.confidence);
            detections.push(Detection::new("person", confidence, self.person_box()));
        }

        // Background clutter the class filter has to ignore
        if self.rng.gen::<f64>() < 0.1 {
            let confidence = self.rng.sample(&self.confidence);
            detections.push(Detection::new("car", confidence, BoundingBox::new(0, 0, 120, 60)));
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_boxes_stay_in_frame() {
        let config = SimulatorConfig {
            person_enter_probability: 1.0,
            person_leave_probability: 0.0,
            ..SimulatorConfig::default()
        };
        let mut sim = PersonSimulator::with_seed(&config, 7).unwrap();

        for i in 0..200 {
            let detections = sim.detect(&Frame::empty(i)).await.unwrap();
            let person = detections.iter().find(|d| d.class == "person").unwrap();
            assert!(person.bbox.x1 >= 0 && person.bbox.y1 >= 0);
            assert!(person.bbox.x2 <= config.frame_width as i32);
            assert!(person.bbox.y2 <= config.frame_height as i32);
            assert!((0.0..=1.0).contains(&person.confidence));
        }
    }

    #[test]
    fn test_rejects_negative_step() {
        let config = SimulatorConfig {
            person_step_px: -1.0,
            ..SimulatorConfig::default()
        };
        assert!(PersonSimulator::new(&config).is_err());
    }
}
