// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checks that serde cannot express: positive quota limits, a known log
//! level and http(s) endpoints.

use lifedesk_core::Mode;

use crate::diagnostic::ConfigError;
use crate::model::LifedeskConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Runs every check and reports all failures together.
pub fn validate_config(config: &LifedeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.app.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "app.name must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.app.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "app.log_level `{}` is not one of {}",
                config.app.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    // Quota limits must be positive
    if config.quota.search_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "quota.search_limit must be at least 1".to_string(),
        });
    }
    if config.quota.secondary_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "quota.secondary_limit must be at least 1".to_string(),
        });
    }

    for mode in Mode::ALL {
        let engine = config.engines.for_mode(mode);
        if let Some(endpoint) = &engine.endpoint
            && !is_http_url(endpoint)
        {
            errors.push(ConfigError::Validation {
                message: format!(
                    "engines.{mode}.endpoint `{endpoint}` must start with http:// or https://"
                ),
            });
        }
        if engine.timeout_secs == 0 {
            errors.push(ConfigError::Validation {
                message: format!("engines.{mode}.timeout_secs must be at least 1"),
            });
        }
    }

    if let Some(endpoint) = &config.usage.endpoint
        && !is_http_url(endpoint)
    {
        errors.push(ConfigError::Validation {
            message: format!("usage.endpoint `{endpoint}` must start with http:// or https://"),
        });
    }

    if config.usage.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "usage.timeout_secs must be at least 1".to_string(),
        });
    }

    if config.engines.general.endpoint.is_none() {
        tracing::debug!("engines.general.endpoint is not set; chat requests cannot be answered");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("http://") || url.starts_with("https://")
}
