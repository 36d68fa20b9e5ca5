// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the chat engine router.
//!
//! Remote collaborators extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod engine;
pub mod notifier;
pub mod usage;

pub use adapter::PluginAdapter;
pub use engine::EngineInvoker;
pub use notifier::Notifier;
pub use usage::UsageService;
