// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine invocation trait for the AI backends reachable through the router.

use async_trait::async_trait;

use crate::error::LifedeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EngineReply, EngineRequest, Mode};

/// Invokes the engine behind a [`Mode`].
///
/// One invocation target per mode. The `Mode::General` target doubles as the
/// fallback for every other engine.
#[async_trait]
pub trait EngineInvoker: PluginAdapter {
    /// Sends `request` to the engine behind `mode` and returns its answer.
    async fn invoke(&self, mode: Mode, request: EngineRequest)
        -> Result<EngineReply, LifedeskError>;
}
