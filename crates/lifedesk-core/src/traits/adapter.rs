// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all remote collaborators implement.

use async_trait::async_trait;

use crate::error::LifedeskError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for engine and usage adapters.
///
/// Provides identity and a health check so the CLI can report which
/// backends are reachable.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the kind of collaborator this adapter provides.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, LifedeskError>;
}
