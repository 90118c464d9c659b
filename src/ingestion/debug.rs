// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Optional per-frame observers (overlays, previews)

use tracing::trace;

use super::{CameraState, Frame};
use crate::inference::Detection;
use crate::rules::{Shape, Zone};

/// Observer the supervisor calls once per processed frame, if configured
pub trait DebugSink: Send {
    fn on_frame(&mut self, camera: &CameraState, frame: &Frame, detections: &[Detection], zones: &[Zone]);

    /// Release display resources. Called once when the stream loop exits.
    fn close(&mut self) {}
}

/// Writes the overlay a preview window would draw as trace logs
#[derive(Debug, Default)]
pub struct TraceOverlay {
    frames: u64,
}

impl TraceOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl DebugSink for TraceOverlay {
    fn on_frame(&mut self, camera: &CameraState, frame: &Frame, detections: &[Detection], zones: &[Zone]) {
        self.frames += 1;

        for det in detections {
            trace!(
                camera = %camera.name(),
                frame = frame.sequence,
                label = %format!("{} {:.2}", det.class, det.confidence),
                bbox = %det.bbox,
                "detection box"
            );
        }

        for zone in zones {
            let outline = match zone.shape() {
                Shape::Rectangle { x1, y1, x2, y2 } => format!("[{}, {}, {}, {}]", x1, y1, x2, y2),
                Shape::Polygon { points } => format!("{:?}", points),
            };
            trace!(camera = %camera.name(), zone = %zone.name(), outline = %outline, "zone outline");
        }
    }

    fn close(&mut self) {
        trace!(frames = self.frames, "overlay closed");
    }
}
