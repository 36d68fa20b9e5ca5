// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mode controller: owns the [`RouterState`] of one conversation and wires
//! its transitions to the usage service and the user-facing notifier.
//!
//! Transitions are applied under a single async mutex that is never held
//! across an await, so they are serialized per controller. Remote calls
//! (entitlement fetch, thread-mode read/write, usage increment) happen
//! outside the lock and their failures are logged, not surfaced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lifedesk_config::LifedeskConfig;
use lifedesk_core::{
    Engine, LifedeskError, Mode, Notification, Notifier, PermissionSet, QuotaSet, ThreadId,
    UsageService,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::router::{EngineGate, UsageRecorder};
use crate::state::{Action, RouterState};

/// Single source of truth for which engine is active in a conversation.
pub struct ModeController {
    state: Mutex<RouterState>,
    usage: Arc<dyn UsageService>,
    notifier: Arc<dyn Notifier>,
    thread_id: Option<ThreadId>,
    /// Preset limits, used for engines the usage service says nothing about.
    default_quotas: QuotaSet,
    /// Bumped when an entitlement refresh starts. Older responses are dropped.
    refresh_epoch: AtomicU64,
    /// Bumped on every mode change. A thread-mode restore that raced one is dropped.
    /// Read and written only while `state` is locked.
    mode_epoch: AtomicU64,
}

impl ModeController {
    /// Create a controller in the default mode with the given preset permissions and quotas.
    pub fn new(
        usage: Arc<dyn UsageService>,
        notifier: Arc<dyn Notifier>,
        allowed: PermissionSet,
        quotas: QuotaSet,
    ) -> Self {
        Self {
            state: Mutex::new(RouterState::new(allowed, quotas)),
            usage,
            notifier,
            thread_id: None,
            default_quotas: quotas,
            refresh_epoch: AtomicU64::new(0),
            mode_epoch: AtomicU64::new(0),
        }
    }

    /// Create a controller from the `[permissions]` and `[quota]` config sections.
    pub fn from_config(
        config: &LifedeskConfig,
        usage: Arc<dyn UsageService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(
            usage,
            notifier,
            config.permissions.to_permissions(),
            config.quota.to_quotas(),
        )
    }

    /// Bind the controller to a persisted thread. Mode changes are written to it.
    pub fn with_thread(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.thread_id.as_ref()
    }

    /// Fetch entitlements and the persisted thread mode concurrently.
    ///
    /// Either fetch may fail independently; the controller stays usable with
    /// its presets.
    pub async fn initialize(&self) {
        let (entitlements, restored) =
            tokio::join!(self.refresh_entitlements(), self.restore_thread_mode());
        if let Err(e) = entitlements {
            warn!(error = %e, "failed to load engine entitlements, keeping presets");
        }
        if let Err(e) = restored {
            warn!(error = %e, "failed to load persisted thread mode");
        }
    }

    /// Re-fetch permissions and quotas from the usage service.
    ///
    /// Returns `Ok(false)` when a newer refresh started while this one was in
    /// flight; its result is discarded.
    pub async fn refresh_entitlements(&self) -> Result<bool, LifedeskError> {
        let epoch = self.refresh_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let entitlements = self.usage.entitlements().await?;
        if self.refresh_epoch.load(Ordering::SeqCst) != epoch {
            debug!(epoch, "discarding stale entitlement response");
            return Ok(false);
        }
        let (allowed, quotas) = entitlements.resolve(&self.default_quotas);
        self.update_quotas(quotas).await;
        self.update_permissions(allowed).await;
        Ok(true)
    }

    /// Restore the bound thread's persisted mode, if any.
    ///
    /// The restore is dropped when the mode changed while the read was in
    /// flight, or when the stored mode is not currently permitted.
    pub async fn restore_thread_mode(&self) -> Result<Option<Mode>, LifedeskError> {
        let Some(thread_id) = &self.thread_id else {
            return Ok(None);
        };
        let epoch = {
            let _state = self.state.lock().await;
            self.mode_epoch.load(Ordering::SeqCst)
        };
        let Some(mode) = self.usage.thread_mode(thread_id).await? else {
            return Ok(None);
        };
        {
            let mut state = self.state.lock().await;
            if self.mode_epoch.load(Ordering::SeqCst) != epoch {
                debug!(thread_id = %thread_id, %mode, "mode changed during restore, keeping current");
                return Ok(None);
            }
            if !state.allowed.allows(mode) {
                debug!(thread_id = %thread_id, %mode, "persisted mode not permitted, not restoring");
                return Ok(None);
            }
            state.apply(Action::SetMode(mode));
            self.mode_epoch.fetch_add(1, Ordering::SeqCst);
        }
        debug!(thread_id = %thread_id, %mode, "restored thread mode");
        Ok(Some(mode))
    }

    /// Current state snapshot.
    pub async fn state(&self) -> RouterState {
        self.state.lock().await.clone()
    }

    pub async fn active_mode(&self) -> Mode {
        self.state.lock().await.active_mode
    }

    /// Apply a transition. Mode changes are persisted to the bound thread.
    pub async fn dispatch(&self, action: Action) -> RouterState {
        let (before, after) = {
            let mut state = self.state.lock().await;
            let before = state.active_mode;
            state.apply(action);
            if state.active_mode != before {
                self.mode_epoch.fetch_add(1, Ordering::SeqCst);
            }
            (before, state.clone())
        };
        if after.active_mode != before {
            self.persist_mode(after.active_mode).await;
        }
        after
    }

    /// Select a mode; selecting the active non-default mode again turns it off.
    ///
    /// A refused selection leaves the mode unchanged and records the reason
    /// in `last_error`.
    pub async fn toggle_mode(&self, mode: Mode) -> Mode {
        let state = self.dispatch(Action::Select(mode)).await;
        if let Some(reason) = &state.last_error {
            debug!(%mode, reason = reason.as_str(), "mode selection refused");
        }
        state.active_mode
    }

    /// Set the mode directly.
    pub async fn set_mode(&self, mode: Mode) {
        self.dispatch(Action::SetMode(mode)).await;
    }

    /// Whether `engine` has quota left.
    ///
    /// When it does not, the controller falls back to the default mode and
    /// notifies the user. Counters are never modified here.
    pub async fn check_quota(&self, engine: Engine) -> bool {
        self.exhausted(engine).await.is_none()
    }

    /// Whether `engine` is permitted.
    ///
    /// When it is not (for instance after a direct [`set_mode`](Self::set_mode)
    /// to a disallowed engine), the controller falls back to the default mode
    /// and notifies the user.
    pub async fn check_permission(&self, engine: Engine) -> bool {
        if *self.state.lock().await.allowed.get(engine) {
            return true;
        }
        let message = format!("{} is not available", engine.label());
        info!(%engine, "engine not permitted, reverting to default mode");
        self.dispatch(Action::PermissionRevoked(message.clone()))
            .await;
        self.notifier.notify(Notification::warning(message));
        false
    }

    /// Applies the quota fallback when `engine` is exhausted and returns the
    /// message shown to the user.
    async fn exhausted(&self, engine: Engine) -> Option<String> {
        let quota = self.state.lock().await.quota(engine);
        if quota.is_available() {
            return None;
        }
        let message = format!(
            "{} limit reached ({quota}), switched to {}",
            engine.label(),
            Mode::General.label()
        );
        warn!(%engine, used = quota.used, limit = quota.limit, "engine quota exhausted");
        self.dispatch(Action::QuotaExceeded {
            engine,
            message: message.clone(),
        })
        .await;
        self.notifier.notify(Notification::warning(message.clone()));
        Some(message)
    }

    /// Count one use of `engine` locally and report it to the usage service.
    ///
    /// The local counter is authoritative for this session; a failed report
    /// is logged and otherwise ignored.
    pub async fn increment_usage(&self, engine: Engine) {
        let quota = {
            let mut state = self.state.lock().await;
            let quota = state.quotas.get_mut(engine);
            quota.record(1);
            *quota
        };
        debug!(%engine, used = quota.used, remaining = quota.remaining(), "usage recorded locally");

        match self.usage.increment_usage(engine, 1).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(%engine, "usage service reports quota already exhausted");
            }
            Err(e) => {
                warn!(%engine, error = %e, "failed to persist usage increment");
            }
        }
    }

    /// Fall back to the default mode after an engine failure and tell the user why.
    pub async fn handle_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.dispatch(Action::EngineError(message.clone())).await;
        self.notifier.notify(Notification::error(message));
    }

    pub async fn set_busy(&self, busy: bool) {
        self.state.lock().await.apply(Action::SetBusy(busy));
    }

    pub async fn update_quotas(&self, quotas: QuotaSet) {
        self.state.lock().await.apply(Action::UpdateQuotas(quotas));
    }

    /// Replace permissions. If the active engine lost its permission, revert
    /// to the default mode and notify the user.
    pub async fn update_permissions(&self, allowed: PermissionSet) {
        let revoked = {
            let mut state = self.state.lock().await;
            state.apply(Action::UpdatePermissions(allowed));
            let active = state.active_mode;
            (!allowed.allows(active)).then_some(active)
        };
        if let Some(mode) = revoked {
            let message = format!("{} is no longer available", mode.label());
            info!(%mode, "active engine permission revoked");
            self.dispatch(Action::PermissionRevoked(message.clone()))
                .await;
            self.notifier.notify(Notification::warning(message));
        }
    }

    /// Best-effort write of the thread's mode.
    async fn persist_mode(&self, mode: Mode) {
        let Some(thread_id) = &self.thread_id else {
            return;
        };
        if let Err(e) = self.usage.set_thread_mode(thread_id, mode).await {
            debug!(thread_id = %thread_id, %mode, error = %e, "failed to persist thread mode");
        }
    }
}

#[async_trait]
impl EngineGate for ModeController {
    async fn admit(&self, engine: Engine) -> Result<(), LifedeskError> {
        if !self.check_permission(engine).await {
            return Err(LifedeskError::PermissionDenied { engine });
        }
        match self.exhausted(engine).await {
            None => Ok(()),
            Some(message) => Err(LifedeskError::QuotaExceeded { engine, message }),
        }
    }
}

#[async_trait]
impl UsageRecorder for ModeController {
    async fn record_usage(&self, engine: Engine) -> Result<(), LifedeskError> {
        self.increment_usage(engine).await;
        Ok(())
    }
}
