// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session: one conversation bound to a mode controller and a message router.

use std::sync::Arc;

use lifedesk_core::{
    ChatContext, EngineInvoker, FallbackCause, LifedeskError, Role, RoutedReply, ThreadId,
};
use tracing::{debug, info};

use crate::controller::ModeController;
use crate::router::MessageRouter;

/// Sends user messages through the router using the controller's active mode.
///
/// The controller is both the router's engine gate and its usage recorder, so
/// permission checks, quota exhaustion and usage counting flow through the
/// mode state machine.
pub struct ChatSession {
    controller: Arc<ModeController>,
    router: MessageRouter,
    context: ChatContext,
}

impl ChatSession {
    pub fn new(controller: Arc<ModeController>, invoker: Arc<dyn EngineInvoker>) -> Self {
        let router = MessageRouter::new(invoker)
            .with_gate(controller.clone())
            .with_usage_recorder(controller.clone());
        let mut context = ChatContext::default();
        if let Some(thread_id) = controller.thread_id() {
            context = context.with_thread(thread_id.clone());
        }
        Self {
            controller,
            router,
            context,
        }
    }

    /// Attach a bearer credential forwarded to engines with every request.
    pub fn with_authorization(mut self, token: impl Into<String>) -> Self {
        self.context = self.context.with_authorization(token);
        self
    }

    pub fn controller(&self) -> &Arc<ModeController> {
        &self.controller
    }

    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.context.thread_id.as_ref()
    }

    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    /// Send one message and record the exchange in the session history.
    ///
    /// Engine-failure fallbacks are reported through the controller's error
    /// path. Permission and quota fallbacks were already reported by the gate.
    /// `busy` is cleared on every exit path.
    pub async fn send(&mut self, text: &str) -> Result<RoutedReply, LifedeskError> {
        self.controller.set_busy(true).await;
        let mode = self.controller.active_mode().await;
        debug!(%mode, "sending message");

        let result = self.router.route(mode, text, &self.context).await;

        match &result {
            Ok(reply) => {
                if reply.fallback_cause == Some(FallbackCause::EngineFailed) {
                    if let Some(reason) = &reply.fallback_reason {
                        self.controller.handle_error(reason.clone()).await;
                    }
                }
                if reply.fell_back_to_general {
                    info!(requested = %mode, "answered by default engine");
                }
                self.context.push(Role::User, text);
                self.context.push(Role::Assistant, reply.content.clone());
            }
            Err(LifedeskError::AuthenticationRequired(_)) => {}
            Err(e) => {
                self.controller.handle_error(e.to_string()).await;
            }
        }

        self.controller.set_busy(false).await;
        result
    }
}
