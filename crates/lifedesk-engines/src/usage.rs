// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the usage/persistence service.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Operation          | Request                      | Notes                       |
//! |--------------------|------------------------------|-----------------------------|
//! | entitlements       | `GET /entitlements`          |                             |
//! | quota              | `GET /usage/{engine}`        |                             |
//! | increment usage    | `POST /usage/increment`      | 429 means already exhausted |
//! | read thread mode   | `GET /threads/{id}/mode`     | 404 means never stored      |
//! | write thread mode  | `PUT /threads/{id}/mode`     | upsert                      |

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lifedesk_config::model::UsageConfig;
use lifedesk_core::types::UsageCounter;
use lifedesk_core::{
    AdapterType, Engine, Entitlements, HealthStatus, LifedeskError, Mode, PluginAdapter, Quota,
    ThreadId, UsageService,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{
    ApiErrorResponse, IncrementRequest, IncrementResponse, ThreadModeRecord, ThreadModeResponse,
};

/// [`UsageService`] backed by the remote usage API.
#[derive(Debug, Clone)]
pub struct HttpUsageService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpUsageService {
    /// Creates a client for the service at `base_url`.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, LifedeskError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LifedeskError::Config(format!("invalid usage endpoint `{base_url}`: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(LifedeskError::Config(format!(
                "usage endpoint `{base_url}` cannot carry a path"
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                LifedeskError::Config(format!("invalid usage API key header value: {e}"))
            })?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(storage_error)?;

        Ok(Self { client, base_url })
    }

    /// Build from the `[usage]` config section. Fails if no endpoint is set.
    pub fn from_config(config: &UsageConfig) -> Result<Self, LifedeskError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| LifedeskError::Config("usage.endpoint is not set".into()))?;
        Self::new(
            endpoint,
            config.api_key.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// `{base}/threads/{id}/mode`, with the id percent-encoded as one path segment.
    fn thread_mode_url(&self, thread_id: &ThreadId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["threads", thread_id.0.as_str(), "mode"]);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, LifedeskError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(storage_error)?;
        let response = check_status(response).await?;
        response.json::<T>().await.map_err(storage_error)
    }
}

#[async_trait]
impl PluginAdapter for HttpUsageService {
    fn name(&self) -> &str {
        "http-usage"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Usage
    }

    async fn health_check(&self) -> Result<HealthStatus, LifedeskError> {
        match self.entitlements().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl UsageService for HttpUsageService {
    async fn entitlements(&self) -> Result<Entitlements, LifedeskError> {
        self.get_json("/entitlements").await
    }

    async fn quota(&self, engine: Engine) -> Result<Quota, LifedeskError> {
        let counter: UsageCounter = self.get_json(&format!("/usage/{engine}")).await?;
        Ok(Quota::new(counter.used, counter.limit))
    }

    async fn increment_usage(&self, engine: Engine, amount: u32) -> Result<bool, LifedeskError> {
        let response = self
            .client
            .post(self.url("/usage/increment"))
            .json(&IncrementRequest { engine, amount })
            .send()
            .await
            .map_err(storage_error)?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            debug!(%engine, "usage service reports quota exhausted");
            return Ok(false);
        }
        let response = check_status(response).await?;
        let body: IncrementResponse = response.json().await.map_err(storage_error)?;
        Ok(body.success)
    }

    async fn thread_mode(&self, thread_id: &ThreadId) -> Result<Option<Mode>, LifedeskError> {
        let response = self
            .client
            .get(self.thread_mode_url(thread_id))
            .send()
            .await
            .map_err(storage_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let body: ThreadModeResponse = response.json().await.map_err(storage_error)?;
        Ok(Some(body.active_mode))
    }

    async fn set_thread_mode(&self, thread_id: &ThreadId, mode: Mode) -> Result<(), LifedeskError> {
        let record = ThreadModeRecord {
            thread_id: thread_id.clone(),
            active_mode: mode,
            updated_at: Utc::now(),
        };
        let response = self
            .client
            .put(self.thread_mode_url(thread_id))
            .json(&record)
            .send()
            .await
            .map_err(storage_error)?;
        check_status(response).await?;
        Ok(())
    }
}

fn storage_error(e: reqwest::Error) -> LifedeskError {
    LifedeskError::Storage {
        source: Box::new(e),
    }
}

/// Pass successful responses through; map auth failures and other error statuses.
async fn check_status(response: Response) -> Result<Response, LifedeskError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(LifedeskError::AuthenticationRequired(format!(
            "usage service returned {status}"
        )));
    }
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_err) => format!("usage service returned {status}: {}", api_err.error),
        Err(_) => format!("usage service returned {status}: {body}"),
    };
    Err(LifedeskError::Storage {
        source: message.into(),
    })
}
