// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local usage service, used when no `[usage]` endpoint is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use lifedesk_config::LifedeskConfig;
use lifedesk_core::types::{FeatureFlag, UsageCounter};
use lifedesk_core::{
    AdapterType, Engine, Entitlements, HealthStatus, LifedeskError, Mode, PermissionSet,
    PluginAdapter, Quota, QuotaSet, ThreadId, UsageService,
};
use tokio::sync::Mutex;

#[derive(Debug)]
struct Store {
    allowed: PermissionSet,
    quotas: QuotaSet,
    thread_modes: HashMap<ThreadId, Mode>,
}

/// Keeps entitlements, counters and thread modes in memory. Nothing survives the process.
#[derive(Debug)]
pub struct InMemoryUsageStore {
    inner: Mutex<Store>,
}

impl InMemoryUsageStore {
    pub fn new(allowed: PermissionSet, quotas: QuotaSet) -> Self {
        Self {
            inner: Mutex::new(Store {
                allowed,
                quotas,
                thread_modes: HashMap::new(),
            }),
        }
    }

    /// Seed permissions and limits from the `[permissions]` and `[quota]` sections.
    pub fn from_config(config: &LifedeskConfig) -> Self {
        Self::new(
            config.permissions.to_permissions(),
            config.quota.to_quotas(),
        )
    }

    /// Enable or disable an engine. Takes effect on the next entitlement refresh.
    pub async fn set_allowed(&self, engine: Engine, allowed: bool) {
        *self.inner.lock().await.allowed.get_mut(engine) = allowed;
    }
}

#[async_trait]
impl PluginAdapter for InMemoryUsageStore {
    fn name(&self) -> &str {
        "in-memory-usage"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Usage
    }

    async fn health_check(&self) -> Result<HealthStatus, LifedeskError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl UsageService for InMemoryUsageStore {
    async fn entitlements(&self) -> Result<Entitlements, LifedeskError> {
        let store = self.inner.lock().await;
        let mut entitlements = Entitlements::default();
        for engine in Engine::ALL {
            let quota = store.quotas.get(engine);
            entitlements.features.insert(
                engine.to_string(),
                FeatureFlag {
                    enabled: *store.allowed.get(engine),
                    max_qph: Some(quota.limit),
                },
            );
            entitlements.usage.insert(
                engine.to_string(),
                UsageCounter {
                    used: quota.used,
                    limit: quota.limit,
                },
            );
        }
        Ok(entitlements)
    }

    async fn quota(&self, engine: Engine) -> Result<Quota, LifedeskError> {
        Ok(*self.inner.lock().await.quotas.get(engine))
    }

    async fn increment_usage(&self, engine: Engine, amount: u32) -> Result<bool, LifedeskError> {
        let mut store = self.inner.lock().await;
        let quota = store.quotas.get_mut(engine);
        if !quota.is_available() {
            return Ok(false);
        }
        quota.record(amount);
        Ok(true)
    }

    async fn thread_mode(&self, thread_id: &ThreadId) -> Result<Option<Mode>, LifedeskError> {
        Ok(self.inner.lock().await.thread_modes.get(thread_id).copied())
    }

    async fn set_thread_mode(&self, thread_id: &ThreadId, mode: Mode) -> Result<(), LifedeskError> {
        self.inner
            .lock()
            .await
            .thread_modes
            .insert(thread_id.clone(), mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryUsageStore {
        InMemoryUsageStore::new(
            PermissionSet::all_allowed(),
            QuotaSet::from_fn(|_| Quota::new(0, 2)),
        )
    }

    #[tokio::test]
    async fn increment_refuses_once_exhausted() {
        let store = store();
        assert!(store.increment_usage(Engine::Search, 1).await.unwrap());
        assert!(store.increment_usage(Engine::Search, 1).await.unwrap());
        assert!(!store.increment_usage(Engine::Search, 1).await.unwrap());
        assert_eq!(store.quota(Engine::Search).await.unwrap(), Quota::new(2, 2));
        assert_eq!(store.quota(Engine::Secondary).await.unwrap(), Quota::new(0, 2));
    }

    #[tokio::test]
    async fn entitlements_round_trip_through_resolve() {
        let store = store();
        store.set_allowed(Engine::Secondary, false).await;
        store.increment_usage(Engine::Search, 1).await.unwrap();

        let (allowed, quotas) = store
            .entitlements()
            .await
            .unwrap()
            .resolve(&QuotaSet::default());
        assert!(allowed.search);
        assert!(!allowed.secondary);
        assert_eq!(quotas.search, Quota::new(1, 2));
    }

    #[tokio::test]
    async fn thread_modes_upsert() {
        let store = store();
        let id = ThreadId::from("t-1");
        assert_eq!(store.thread_mode(&id).await.unwrap(), None);
        store.set_thread_mode(&id, Mode::Search).await.unwrap();
        store.set_thread_mode(&id, Mode::Secondary).await.unwrap();
        assert_eq!(store.thread_mode(&id).await.unwrap(), Some(Mode::Secondary));
    }
}
