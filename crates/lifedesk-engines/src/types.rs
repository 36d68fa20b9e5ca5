// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the engine and usage service HTTP APIs.

use chrono::{DateTime, Utc};
use lifedesk_core::{Engine, Mode, ThreadId};
use serde::{Deserialize, Serialize};

/// Engine answer. `source` is optional on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineResponse {
    pub content: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// Error envelope returned by engines and the usage service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncrementRequest {
    pub engine: Engine,
    pub amount: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncrementResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadModeResponse {
    pub active_mode: Mode,
}

/// Upsert body for a thread's mode.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadModeRecord {
    pub thread_id: ThreadId,
    pub active_mode: Mode,
    pub updated_at: DateTime<Utc>,
}
