// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock engine invoker for deterministic routing tests.
//!
//! Each mode has a FIFO queue of scripted outcomes and a sticky default
//! used once the queue is empty. Without either, the engine answers
//! `"<mode> response"` with the mode name as source.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use lifedesk_core::{
    AdapterType, EngineInvoker, EngineReply, EngineRequest, HealthStatus, LifedeskError, Mode,
    PluginAdapter,
};
use tokio::sync::Mutex;

/// What the mock engine does for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    Reply(String),
    /// Fail with an engine error carrying this message.
    Fail(String),
    /// Fail with `AuthenticationRequired`.
    Unauthorized,
}

#[derive(Default)]
struct Script {
    queued: HashMap<Mode, VecDeque<MockOutcome>>,
    sticky: HashMap<Mode, MockOutcome>,
    calls: Vec<(Mode, EngineRequest)>,
}

/// An engine invoker that returns scripted outcomes and records every call.
#[derive(Default)]
pub struct MockEngine {
    script: Mutex<Script>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot outcome for `mode`.
    pub async fn push(&self, mode: Mode, outcome: MockOutcome) {
        self.script
            .lock()
            .await
            .queued
            .entry(mode)
            .or_default()
            .push_back(outcome);
    }

    /// Use `outcome` for every call to `mode` once its queue is empty.
    pub async fn always(&self, mode: Mode, outcome: MockOutcome) {
        self.script.lock().await.sticky.insert(mode, outcome);
    }

    /// Modes invoked so far, in order.
    pub async fn calls(&self) -> Vec<Mode> {
        self.script
            .lock()
            .await
            .calls
            .iter()
            .map(|(mode, _)| *mode)
            .collect()
    }

    /// Requests received so far, in order.
    pub async fn requests(&self) -> Vec<(Mode, EngineRequest)> {
        self.script.lock().await.calls.clone()
    }

    pub async fn call_count(&self, mode: Mode) -> usize {
        self.script
            .lock()
            .await
            .calls
            .iter()
            .filter(|(m, _)| *m == mode)
            .count()
    }
}

#[async_trait]
impl PluginAdapter for MockEngine {
    fn name(&self) -> &str {
        "mock-engine"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Engine
    }

    async fn health_check(&self) -> Result<HealthStatus, LifedeskError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EngineInvoker for MockEngine {
    async fn invoke(
        &self,
        mode: Mode,
        request: EngineRequest,
    ) -> Result<EngineReply, LifedeskError> {
        let outcome = {
            let mut script = self.script.lock().await;
            script.calls.push((mode, request));
            let queued = script.queued.get_mut(&mode).and_then(VecDeque::pop_front);
            queued.or_else(|| script.sticky.get(&mode).cloned())
        };

        match outcome {
            None => Ok(EngineReply {
                content: format!("{mode} response"),
                source: mode.to_string(),
            }),
            Some(MockOutcome::Reply(content)) => Ok(EngineReply {
                content,
                source: mode.to_string(),
            }),
            Some(MockOutcome::Fail(message)) => Err(LifedeskError::engine(mode, message)),
            Some(MockOutcome::Unauthorized) => Err(LifedeskError::AuthenticationRequired(
                "mock session expired".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use lifedesk_core::ChatContext;

    use super::*;

    fn request(text: &str) -> EngineRequest {
        EngineRequest {
            message: text.into(),
            context: ChatContext::default(),
        }
    }

    #[tokio::test]
    async fn default_reply_names_the_mode() {
        let engine = MockEngine::new();
        let reply = engine.invoke(Mode::Search, request("q")).await.unwrap();
        assert_eq!(reply.content, "search response");
        assert_eq!(reply.source, "search");
    }

    #[tokio::test]
    async fn queued_outcomes_take_precedence_over_sticky() {
        let engine = MockEngine::new();
        engine
            .always(Mode::General, MockOutcome::Fail("down".into()))
            .await;
        engine
            .push(Mode::General, MockOutcome::Reply("first".into()))
            .await;

        let first = engine.invoke(Mode::General, request("a")).await.unwrap();
        assert_eq!(first.content, "first");
        assert!(engine.invoke(Mode::General, request("b")).await.is_err());
        assert!(engine.invoke(Mode::General, request("c")).await.is_err());
        assert_eq!(engine.call_count(Mode::General).await, 3);
    }
}
