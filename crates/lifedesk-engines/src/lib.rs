// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote collaborator adapters for the Lifedesk router.
//!
//! - [`HttpEngine`]: JSON-over-HTTP engines, one endpoint per mode.
//! - [`HttpUsageService`]: entitlements, usage counters and thread modes over HTTP.
//! - [`InMemoryUsageStore`]: process-local usage service for offline use.

pub mod engine;
pub mod memory;
pub mod types;
pub mod usage;

use std::sync::Arc;

use lifedesk_config::LifedeskConfig;
use lifedesk_core::{LifedeskError, UsageService};
use tracing::info;

pub use engine::HttpEngine;
pub use memory::InMemoryUsageStore;
pub use usage::HttpUsageService;

/// Pick the usage backend: HTTP when `[usage].endpoint` is set, in-memory otherwise.
pub fn usage_service_from_config(
    config: &LifedeskConfig,
) -> Result<Arc<dyn UsageService>, LifedeskError> {
    match &config.usage.endpoint {
        Some(endpoint) => {
            info!(endpoint = endpoint.as_str(), "using remote usage service");
            Ok(Arc::new(HttpUsageService::from_config(&config.usage)?))
        }
        None => {
            info!("no usage endpoint configured, keeping usage in memory");
            Ok(Arc::new(InMemoryUsageStore::from_config(config)))
        }
    }
}
