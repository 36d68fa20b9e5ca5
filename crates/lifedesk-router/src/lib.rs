// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat engine selection and routing.
//!
//! - [`state`]: the mode state machine (pure transitions over [`RouterState`]).
//! - [`controller`]: [`ModeController`], which owns a state and talks to the usage service.
//! - [`router`]: [`MessageRouter`], quota-gated routing with fallback to the default engine.
//! - [`session`]: [`ChatSession`], which ties the two together for one conversation.

pub mod controller;
pub mod router;
pub mod session;
pub mod state;

pub use controller::ModeController;
pub use router::{EngineGate, FallbackNotice, MessageRouter, UsageRecorder};
pub use session::ChatSession;
pub use state::{Action, RouterState, reduce};
