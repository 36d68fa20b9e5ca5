// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end routing tests.
//!
//! `TestHarness` assembles a mode controller, message router and chat
//! session over mock collaborators and exposes `send()` to drive the whole
//! pipeline (engine gate -> engine -> fallback -> usage -> notifications).

use std::sync::Arc;

use lifedesk_config::LifedeskConfig;
use lifedesk_core::{LifedeskError, Mode, PermissionSet, RoutedReply, ThreadId};
use lifedesk_router::{ChatSession, ModeController, RouterState};

use crate::mock_engine::{MockEngine, MockOutcome};
use crate::mock_usage::MockUsageService;
use crate::notifier::RecordingNotifier;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: LifedeskConfig,
    thread_id: Option<ThreadId>,
    outcomes: Vec<(Mode, MockOutcome)>,
    initialize: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: LifedeskConfig::default(),
            thread_id: None,
            outcomes: Vec::new(),
            initialize: true,
        }
    }

    /// Preset quota limits.
    pub fn with_limits(mut self, search: u32, secondary: u32) -> Self {
        self.config.quota.search_limit = search;
        self.config.quota.secondary_limit = secondary;
        self
    }

    /// Preset permissions.
    pub fn with_permissions(mut self, allowed: PermissionSet) -> Self {
        self.config.permissions.search = allowed.search;
        self.config.permissions.secondary = allowed.secondary;
        self
    }

    /// Bind the session to a persisted thread.
    pub fn with_thread(mut self, thread_id: impl Into<ThreadId>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Make the mock engine answer every call to `mode` with `outcome`.
    pub fn with_engine_outcome(mut self, mode: Mode, outcome: MockOutcome) -> Self {
        self.outcomes.push((mode, outcome));
        self
    }

    /// Skip the initial entitlement/thread-mode fetch.
    pub fn without_initialize(mut self) -> Self {
        self.initialize = false;
        self
    }

    /// Build the harness with a fresh mock usage service.
    pub async fn build(self) -> TestHarness {
        self.build_with_usage(Arc::new(MockUsageService::new()))
            .await
    }

    /// Build the harness over a pre-scripted usage service.
    pub async fn build_with_usage(self, usage: Arc<MockUsageService>) -> TestHarness {
        let engine = Arc::new(MockEngine::new());
        for (mode, outcome) in self.outcomes {
            engine.always(mode, outcome).await;
        }
        let notifier = Arc::new(RecordingNotifier::new());

        let mut controller = ModeController::from_config(&self.config, usage.clone(), notifier.clone());
        if let Some(thread_id) = self.thread_id {
            controller = controller.with_thread(thread_id);
        }
        let controller = Arc::new(controller);
        if self.initialize {
            controller.initialize().await;
        }

        let session = ChatSession::new(controller.clone(), engine.clone());

        TestHarness {
            engine,
            usage,
            notifier,
            controller,
            session,
            config: self.config,
        }
    }
}

/// A wired chat session over mock collaborators.
pub struct TestHarness {
    /// The mock engine invoker.
    pub engine: Arc<MockEngine>,
    /// The mock usage service.
    pub usage: Arc<MockUsageService>,
    /// Every notification raised by the controller.
    pub notifier: Arc<RecordingNotifier>,
    /// The mode controller behind the session.
    pub controller: Arc<ModeController>,
    /// The session under test.
    pub session: ChatSession,
    /// Configuration the controller was built from.
    pub config: LifedeskConfig,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Send a message through the session.
    pub async fn send(&mut self, text: &str) -> Result<RoutedReply, LifedeskError> {
        self.session.send(text).await
    }

    /// Select a mode the way the mode picker does.
    pub async fn toggle(&self, mode: Mode) -> Mode {
        self.controller.toggle_mode(mode).await
    }

    pub async fn state(&self) -> RouterState {
        self.controller.state().await
    }
}
