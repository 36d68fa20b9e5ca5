// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Lifedesk chat engine router.
//!
//! This crate provides the error type, the shared data model (modes, engines,
//! quotas, permissions, replies) and the collaborator traits the mode state
//! machine and message router consume. Engine and usage adapters implement
//! traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LifedeskError;
pub use types::{
    AdapterType, ChatContext, ContextMessage, Engine, EngineMap, EngineReply, EngineRequest,
    Entitlements, FallbackCause, HealthStatus, Mode, Notification, PermissionSet, Quota, QuotaSet,
    Role, RoutedReply, Severity, ThreadId, HISTORY_WINDOW,
};

pub use traits::{EngineInvoker, Notifier, PluginAdapter, UsageService};
