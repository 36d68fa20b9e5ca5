// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Lifedesk integration tests.
//!
//! Provides mock collaborators and a harness that wires them into a
//! [`ChatSession`](lifedesk_router::ChatSession), so routing behaviour can be
//! exercised without any network.
//!
//! # Components
//!
//! - [`MockEngine`] - Engine invoker with scripted per-mode outcomes
//! - [`MockUsageService`] - Usage service with queued entitlements and recorded writes
//! - [`RecordingNotifier`] - Notifier that keeps every notification
//! - [`TestHarness`] - Builder for a fully wired session

pub mod harness;
pub mod mock_engine;
pub mod mock_usage;
pub mod notifier;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_engine::{MockEngine, MockOutcome};
pub use mock_usage::MockUsageService;
pub use notifier::RecordingNotifier;
