// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Video source contract

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One decoded frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
    /// Raw pixel payload, layout defined by the source
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(sequence: u64, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            sequence,
            width,
            height,
            captured_at: Utc::now(),
            data,
        }
    }

    /// Frame without a pixel payload
    pub fn empty(sequence: u64) -> Self {
        Self::new(sequence, 0, 0, Vec::new())
    }
}

/// Something that can open a stream address
#[async_trait]
pub trait VideoSource: Send {
    /// Open a capture on `address`
    async fn open(&mut self, address: &str) -> Result<Box<dyn Capture>>;
}

/// An open stream handle
#[async_trait]
pub trait Capture: Send {
    /// Next frame; `Ok(None)` means end of stream
    async fn read(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying handle. Must tolerate repeated calls.
    async fn release(&mut self);
}
