// src/error.rs

//! Unified error handling for the notifier.

use std::fmt;

use thiserror::Error;

/// Result type alias for notifier operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// The provider has no area with this name
    #[error("Community '{0}' does not exist")]
    CommunityNotFound(String),

    /// The area exists but carries no boundary
    #[error("Community '{0}' does not have GeoJSON data")]
    MissingBoundary(String),

    /// The boundary could not be turned into a polygon
    #[error("Invalid boundary geometry: {0}")]
    Geometry(String),

    /// The provider answered with a non-success status
    #[error("Provider returned {status} for {url}")]
    Provider { status: u16, url: String },

    /// Stored checkpoint could not be read back
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Publish command failed
    #[error("Publish failed: {0}")]
    Publish(String),

    /// An element referenced by a change event could not be resolved
    #[error("Failed to resolve {element_id}: {message}")]
    Resolution { element_id: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a geometry error.
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry(message.into())
    }

    /// Create a checkpoint error.
    pub fn checkpoint(message: impl fmt::Display) -> Self {
        Self::Checkpoint(message.to_string())
    }

    /// Create a publish error.
    pub fn publish(message: impl fmt::Display) -> Self {
        Self::Publish(message.to_string())
    }

    /// Create a resolution error for an element.
    pub fn resolution(element_id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Resolution {
            element_id: element_id.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error comes from bad input rather than a flaky collaborator.
    ///
    /// These abort the run before any delivery and are never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::CommunityNotFound(_)
                | Self::MissingBoundary(_)
                | Self::Geometry(_)
                | Self::Config(_)
                | Self::Validation(_)
                | Self::Toml(_)
        )
    }
}
