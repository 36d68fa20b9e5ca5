// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Lifedesk chat engine router.
//!
//! Every section denies unknown fields, so a misspelled key fails the load
//! instead of silently falling back to its default.

use lifedesk_core::{Mode, PermissionSet, Quota, QuotaSet};
use serde::{Deserialize, Serialize};

/// Top-level Lifedesk configuration.
///
/// Every section may be omitted; an empty file yields a working offline setup
/// apart from the engine endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LifedeskConfig {
    /// Application identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// Preset per-engine quota limits, used until the usage service reports real ones.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Default feature flags for the non-default engines.
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Engine endpoints.
    #[serde(default)]
    pub engines: EnginesConfig,

    /// Usage/persistence service settings.
    #[serde(default)]
    pub usage: UsageConfig,
}

/// Application identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name used in the shell prompt and logs.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "lifedesk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Preset quota limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Queries per period for the web-search engine.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    /// Queries per period for the secondary model.
    #[serde(default = "default_secondary_limit")]
    pub secondary_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            secondary_limit: default_secondary_limit(),
        }
    }
}

impl QuotaConfig {
    /// Zero-usage quotas at the configured limits.
    pub fn to_quotas(&self) -> QuotaSet {
        QuotaSet {
            search: Quota::new(0, self.search_limit),
            secondary: Quota::new(0, self.secondary_limit),
        }
    }
}

fn default_search_limit() -> u32 {
    10
}

fn default_secondary_limit() -> u32 {
    20
}

/// Default feature flags, applied before the usage service answers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionsConfig {
    #[serde(default = "default_true")]
    pub search: bool,

    #[serde(default = "default_true")]
    pub secondary: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            search: true,
            secondary: true,
        }
    }
}

impl PermissionsConfig {
    pub fn to_permissions(&self) -> PermissionSet {
        PermissionSet {
            search: self.search,
            secondary: self.secondary,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Endpoints for every engine.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnginesConfig {
    /// Default engine, also the fallback target.
    #[serde(default)]
    pub general: EngineEndpointConfig,

    /// Web-search augmented engine.
    #[serde(default)]
    pub search: EngineEndpointConfig,

    /// Secondary LLM.
    #[serde(default)]
    pub secondary: EngineEndpointConfig,
}

impl EnginesConfig {
    pub fn for_mode(&self, mode: Mode) -> &EngineEndpointConfig {
        match mode {
            Mode::General => &self.general,
            Mode::Search => &self.search,
            Mode::Secondary => &self.secondary,
        }
    }
}

/// A single engine endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineEndpointConfig {
    /// Invocation URL. `None` leaves the engine unconfigured.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent when the request context carries none.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Source label reported when the engine response omits one.
    /// Defaults to the mode name.
    #[serde(default)]
    pub source: Option<String>,

    /// HTTP timeout in seconds.
    #[serde(default = "default_engine_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EngineEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            source: None,
            timeout_secs: default_engine_timeout_secs(),
        }
    }
}

fn default_engine_timeout_secs() -> u64 {
    120
}

/// Usage/persistence service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UsageConfig {
    /// Base URL of the usage service. `None` keeps counters and thread modes in memory.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token for the usage service.
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP timeout in seconds.
    #[serde(default = "default_usage_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_usage_timeout_secs(),
        }
    }
}

fn default_usage_timeout_secs() -> u64 {
    10
}
