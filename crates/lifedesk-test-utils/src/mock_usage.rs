// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock usage service with queued entitlement responses and recorded writes.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lifedesk_core::{
    AdapterType, Engine, Entitlements, HealthStatus, LifedeskError, Mode, PluginAdapter, Quota,
    ThreadId, UsageService,
};
use tokio::sync::Mutex;

/// A queued answer to `entitlements()`, delivered after `delay`.
struct Pending {
    delay: Duration,
    result: Result<Entitlements, String>,
}

/// A usage service double.
///
/// `entitlements()` pops queued responses in call order (each with its own
/// latency, so out-of-order completion can be staged) and returns an empty
/// payload once the queue is drained.
#[derive(Default)]
pub struct MockUsageService {
    entitlements: Mutex<VecDeque<Pending>>,
    thread_modes: Mutex<HashMap<ThreadId, Mode>>,
    thread_read_delay: Mutex<Duration>,
    increments: Mutex<Vec<(Engine, u32)>>,
    mode_writes: Mutex<Vec<(ThreadId, Mode)>>,
    fail_writes: AtomicBool,
    fail_thread_reads: AtomicBool,
}

impl MockUsageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_entitlements(&self, entitlements: Entitlements) {
        self.push_entitlements_after(Duration::ZERO, entitlements)
            .await;
    }

    /// Queue a response that resolves after `delay`.
    pub async fn push_entitlements_after(&self, delay: Duration, entitlements: Entitlements) {
        self.entitlements.lock().await.push_back(Pending {
            delay,
            result: Ok(entitlements),
        });
    }

    /// Queue a failed fetch.
    pub async fn push_entitlements_error(&self, message: impl Into<String>) {
        self.entitlements.lock().await.push_back(Pending {
            delay: Duration::ZERO,
            result: Err(message.into()),
        });
    }

    /// Store a thread mode as if a previous session had persisted it.
    pub async fn seed_thread_mode(&self, thread_id: impl Into<ThreadId>, mode: Mode) {
        self.thread_modes
            .lock()
            .await
            .insert(thread_id.into(), mode);
    }

    pub async fn set_thread_read_delay(&self, delay: Duration) {
        *self.thread_read_delay.lock().await = delay;
    }

    /// Make every write (usage increments and thread-mode upserts) fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_thread_reads(&self, fail: bool) {
        self.fail_thread_reads.store(fail, Ordering::SeqCst);
    }

    /// Increments received so far, including failed ones.
    pub async fn increments(&self) -> Vec<(Engine, u32)> {
        self.increments.lock().await.clone()
    }

    /// Thread-mode writes that succeeded, in order.
    pub async fn mode_writes(&self) -> Vec<(ThreadId, Mode)> {
        self.mode_writes.lock().await.clone()
    }

    pub async fn stored_thread_mode(&self, thread_id: &ThreadId) -> Option<Mode> {
        self.thread_modes.lock().await.get(thread_id).copied()
    }

    fn write_error() -> LifedeskError {
        LifedeskError::Storage {
            source: "mock usage store rejected the write".into(),
        }
    }
}

#[async_trait]
impl PluginAdapter for MockUsageService {
    fn name(&self) -> &str {
        "mock-usage"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Usage
    }

    async fn health_check(&self) -> Result<HealthStatus, LifedeskError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl UsageService for MockUsageService {
    async fn entitlements(&self) -> Result<Entitlements, LifedeskError> {
        let pending = self.entitlements.lock().await.pop_front();
        let Some(pending) = pending else {
            return Ok(Entitlements::default());
        };
        tokio::time::sleep(pending.delay).await;
        pending.result.map_err(|message| LifedeskError::Storage {
            source: message.into(),
        })
    }

    async fn quota(&self, _engine: Engine) -> Result<Quota, LifedeskError> {
        Err(LifedeskError::Internal(
            "mock usage service does not serve single quotas".into(),
        ))
    }

    async fn increment_usage(&self, engine: Engine, amount: u32) -> Result<bool, LifedeskError> {
        self.increments.lock().await.push((engine, amount));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        Ok(true)
    }

    async fn thread_mode(&self, thread_id: &ThreadId) -> Result<Option<Mode>, LifedeskError> {
        let delay = *self.thread_read_delay.lock().await;
        tokio::time::sleep(delay).await;
        if self.fail_thread_reads.load(Ordering::SeqCst) {
            return Err(LifedeskError::Storage {
                source: "mock thread store unavailable".into(),
            });
        }
        Ok(self.thread_modes.lock().await.get(thread_id).copied())
    }

    async fn set_thread_mode(&self, thread_id: &ThreadId, mode: Mode) -> Result<(), LifedeskError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        self.thread_modes
            .lock()
            .await
            .insert(thread_id.clone(), mode);
        self.mode_writes.lock().await.push((thread_id.clone(), mode));
        Ok(())
    }
}
