// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Lifedesk chat engine router.

use thiserror::Error;

use crate::types::{Engine, Mode};

/// The primary error type used across all Lifedesk adapter traits and core operations.
#[derive(Debug, Error)]
pub enum LifedeskError {
    /// Configuration errors (invalid TOML, missing required fields, bad endpoints).
    #[error("configuration error: {0}")]
    Config(String),

    /// Usage/persistence service errors (unreachable backend, bad payload).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An engine invocation failed (network error, backend error, bad response).
    #[error("{engine} engine error: {message}")]
    Engine {
        engine: Mode,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A non-default engine has no quota left.
    #[error("{message}")]
    QuotaExceeded { engine: Engine, message: String },

    /// A non-default engine is not enabled for the current principal.
    #[error("{engine} is not available")]
    PermissionDenied { engine: Engine },

    /// The backend rejected the request for lack of credentials.
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LifedeskError {
    /// Shorthand for an engine failure without an underlying source error.
    pub fn engine(engine: Mode, message: impl Into<String>) -> Self {
        Self::Engine {
            engine,
            message: message.into(),
            source: None,
        }
    }

    /// Whether a failure of a non-default engine may be answered by the default engine instead.
    ///
    /// Authentication failures are excluded: the default engine would be
    /// rejected the same way.
    pub fn is_fallback_eligible(&self) -> bool {
        !matches!(self, Self::AuthenticationRequired(_))
    }
}
