// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Error types for Zonewatch

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Domain errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Zone geometry rejected at construction time
    #[error("Invalid zone '{name}': {reason}")]
    InvalidZone { name: String, reason: String },

    /// Configuration rejected before any stream loop starts
    #[error("Config error: {0}")]
    Config(String),

    /// Lookup miss (event id, camera id)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored record that no longer decodes
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_zone(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidZone {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
