// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Inference module - detector contract and detection types
//!
//! The object detector is an external collaborator: anything that turns a
//! frame into classified boxes can sit behind [`Detector`].

mod simulator;

pub use simulator::PersonSimulator;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ingestion::Frame;

/// Axis-aligned box in frame pixel coordinates, serialized as `[x1, y1, x2, y2]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Integer center point, floor-divided
    pub fn center(&self) -> (i64, i64) {
        let cx = (self.x1 as i64 + self.x2 as i64).div_euclid(2);
        let cy = (self.y1 as i64 + self.y2 as i64).div_euclid(2);
        (cx, cy)
    }

    /// Text form used by the event store
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Parse the text form written by [`BoundingBox::to_text`]
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str::<[i32; 4]>(text).ok().map(Self::from)
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// A single classified box from one detector call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class: &str, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            class: class.to_string(),
            confidence,
            bbox,
        }
    }
}

/// Object detector collaborator
///
/// Called sequentially from one stream loop; implementations that do heavy
/// blocking inference should move it off the async worker themselves.
#[async_trait]
pub trait Detector: Send {
    /// Detector name for logs
    fn name(&self) -> &str;

    /// Run inference on one frame
    async fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

/// Drops detections under a confidence threshold and rounds the rest to 2 decimals
pub struct ConfidenceGate<D> {
    inner: D,
    threshold: f64,
}

impl<D: Detector> ConfidenceGate<D> {
    pub fn new(inner: D, threshold: f64) -> Self {
        Self { inner, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[async_trait]
impl<D: Detector> Detector for ConfidenceGate<D> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let raw = self.inner.detect(frame).await?;
        Ok(raw
            .into_iter()
            .filter(|d| d.confidence >= self.threshold)
            .map(|mut d| {
                d.confidence = (d.confidence * 100.0).round() / 100.0;
                d
            })
            .collect())
    }
}
