// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage and persistence service trait: entitlements, quota counters and thread modes.

use async_trait::async_trait;

use crate::error::LifedeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Engine, Entitlements, Mode, Quota, ThreadId};

/// Source of truth for permissions, usage counters and per-thread modes.
///
/// The state machine keeps a local copy of counters for the current session
/// and treats this service as eventually consistent.
#[async_trait]
pub trait UsageService: PluginAdapter {
    /// Fetches feature flags and usage for the authenticated principal.
    async fn entitlements(&self) -> Result<Entitlements, LifedeskError>;

    /// Fetches the quota of a single engine.
    async fn quota(&self, engine: Engine) -> Result<Quota, LifedeskError>;

    /// Adds `amount` uses to `engine`.
    ///
    /// Returns `Ok(false)` when the service refused because the quota is
    /// already exhausted on its side.
    async fn increment_usage(&self, engine: Engine, amount: u32) -> Result<bool, LifedeskError>;

    /// Reads the last-used mode of a thread, `None` if never stored.
    async fn thread_mode(&self, thread_id: &ThreadId) -> Result<Option<Mode>, LifedeskError>;

    /// Upserts the last-used mode of a thread.
    async fn set_thread_mode(&self, thread_id: &ThreadId, mode: Mode)
        -> Result<(), LifedeskError>;
}
