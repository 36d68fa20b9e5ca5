// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP engine adapter: one JSON endpoint per mode.
//!
//! Request body is the serialized [`EngineRequest`] (`{message, context}`).
//! The bearer token comes from the request context, falling back to the
//! engine's configured `api_key`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use lifedesk_config::model::{EngineEndpointConfig, EnginesConfig};
use lifedesk_core::{
    AdapterType, EngineInvoker, EngineReply, EngineRequest, HealthStatus, LifedeskError, Mode,
    PluginAdapter,
};
use tracing::debug;

use crate::types::{ApiErrorResponse, EngineResponse};

/// Invocation target for one mode.
#[derive(Debug, Clone)]
struct EngineTarget {
    url: String,
    api_key: Option<String>,
    source: String,
    timeout: Duration,
}

impl EngineTarget {
    fn from_config(mode: Mode, config: &EngineEndpointConfig) -> Option<Self> {
        let url = config.endpoint.clone()?;
        Some(Self {
            url,
            api_key: config.api_key.clone(),
            source: config.source.clone().unwrap_or_else(|| mode.to_string()),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

/// [`EngineInvoker`] over plain JSON HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: reqwest::Client,
    targets: HashMap<Mode, EngineTarget>,
}

impl HttpEngine {
    /// Build the adapter from the `[engines.*]` config sections.
    ///
    /// Modes without an `endpoint` stay unconfigured; invoking them fails with
    /// an engine error, which the router treats like any other engine failure.
    pub fn from_config(config: &EnginesConfig) -> Result<Self, LifedeskError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LifedeskError::Engine {
                engine: Mode::General,
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let targets = Mode::ALL
            .into_iter()
            .filter_map(|mode| {
                EngineTarget::from_config(mode, config.for_mode(mode)).map(|t| (mode, t))
            })
            .collect();

        Ok(Self { client, targets })
    }

    /// Whether an endpoint is configured for `mode`.
    pub fn is_configured(&self, mode: Mode) -> bool {
        self.targets.contains_key(&mode)
    }
}

#[async_trait]
impl PluginAdapter for HttpEngine {
    fn name(&self) -> &str {
        "http-engine"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Engine
    }

    async fn health_check(&self) -> Result<HealthStatus, LifedeskError> {
        if !self.is_configured(Mode::General) {
            return Ok(HealthStatus::Unhealthy(
                "no endpoint configured for the general engine".into(),
            ));
        }
        let missing: Vec<String> = [Mode::Search, Mode::Secondary]
            .into_iter()
            .filter(|m| !self.is_configured(*m))
            .map(|m| m.to_string())
            .collect();
        if missing.is_empty() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(format!(
                "no endpoint configured for: {}",
                missing.join(", ")
            )))
        }
    }
}

#[async_trait]
impl EngineInvoker for HttpEngine {
    async fn invoke(
        &self,
        mode: Mode,
        request: EngineRequest,
    ) -> Result<EngineReply, LifedeskError> {
        let target = self
            .targets
            .get(&mode)
            .ok_or_else(|| LifedeskError::engine(mode, "no endpoint configured"))?;

        let mut builder = self
            .client
            .post(&target.url)
            .timeout(target.timeout)
            .json(&request);
        if let Some(token) = request
            .context
            .authorization
            .as_deref()
            .or(target.api_key.as_deref())
        {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LifedeskError::Timeout {
                    duration: target.timeout,
                }
            } else {
                LifedeskError::Engine {
                    engine: mode,
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        let status = response.status();
        debug!(%mode, status = %status, "engine response received");

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LifedeskError::AuthenticationRequired(format!(
                "{} engine returned {status}",
                mode
            )));
        }

        let body = response.text().await.map_err(|e| LifedeskError::Engine {
            engine: mode,
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("engine returned {status}: {}", api_err.error),
                Err(_) => format!("engine returned {status}: {body}"),
            };
            return Err(LifedeskError::engine(mode, message));
        }

        let parsed: EngineResponse =
            serde_json::from_str(&body).map_err(|e| LifedeskError::Engine {
                engine: mode,
                message: format!("failed to parse engine response: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(EngineReply {
            content: parsed.content,
            source: parsed.source.unwrap_or_else(|| target.source.clone()),
        })
    }
}
