// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message routing with permission and quota gating and single-step fallback
//! to the default engine.
//!
//! A non-default engine is never chained to another non-default engine: one
//! routed message costs at most two remote calls.

use std::sync::Arc;

use async_trait::async_trait;
use lifedesk_core::{
    ChatContext, Engine, EngineInvoker, EngineReply, EngineRequest, FallbackCause, LifedeskError,
    Mode, RoutedReply,
};
use tracing::{debug, info, warn};

/// Decides whether a non-default engine may answer the next message.
#[async_trait]
pub trait EngineGate: Send + Sync {
    /// `Err(PermissionDenied)` or `Err(QuotaExceeded)` skips the engine and
    /// answers with the default one. Any other error aborts the request.
    async fn admit(&self, engine: Engine) -> Result<(), LifedeskError>;
}

/// Counts one successful use of a quota-limited engine.
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record_usage(&self, engine: Engine) -> Result<(), LifedeskError>;
}

/// Emitted once for every message the default engine answered in place of the requested one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackNotice {
    pub requested: Mode,
    pub cause: FallbackCause,
    pub reason: String,
}

type FallbackObserver = Box<dyn Fn(&FallbackNotice) + Send + Sync>;

/// Routes a message to the engine for a mode, substituting the default engine
/// when the requested one is disallowed, over quota, or fails.
pub struct MessageRouter {
    invoker: Arc<dyn EngineInvoker>,
    gate: Option<Arc<dyn EngineGate>>,
    usage: Option<Arc<dyn UsageRecorder>>,
    observer: Option<FallbackObserver>,
}

impl MessageRouter {
    pub fn new(invoker: Arc<dyn EngineInvoker>) -> Self {
        Self {
            invoker,
            gate: None,
            usage: None,
            observer: None,
        }
    }

    /// Consult `gate` before invoking a non-default engine.
    pub fn with_gate(mut self, gate: Arc<dyn EngineGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Record usage after each successful answer from a quota-limited engine.
    pub fn with_usage_recorder(mut self, usage: Arc<dyn UsageRecorder>) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_fallback_observer(
        mut self,
        observer: impl Fn(&FallbackNotice) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Route `text` to the engine for `mode`.
    ///
    /// - `General`: invoke the default engine; its errors propagate unchanged.
    /// - Other modes: if the gate refuses (not permitted or over quota),
    ///   answer with the default engine without invoking the requested one. Otherwise invoke the
    ///   requested engine and record usage on success. On a failure eligible
    ///   for fallback, retry once against the default engine.
    ///
    /// Authentication failures always propagate.
    pub async fn route(
        &self,
        mode: Mode,
        text: &str,
        context: &ChatContext,
    ) -> Result<RoutedReply, LifedeskError> {
        let Some(engine) = mode.engine() else {
            let reply = self.invoke(Mode::General, text, context).await?;
            return Ok(answered(reply, Mode::General));
        };

        if let Some(gate) = &self.gate
            && let Err(refusal) = gate.admit(engine).await
        {
            let (cause, reason) = match refusal {
                LifedeskError::PermissionDenied { .. } => (
                    FallbackCause::NotAllowed,
                    format!("{} is not available — using default mode", engine.label()),
                ),
                LifedeskError::QuotaExceeded { .. } => (
                    FallbackCause::QuotaExceeded,
                    format!("{} quota exceeded — using default mode", engine.label()),
                ),
                other => return Err(other),
            };
            info!(%mode, %cause, "engine refused by gate, routing to default engine");
            return self.fall_back(mode, cause, reason, text, context).await;
        }

        match self.invoke(mode, text, context).await {
            Ok(reply) => {
                if let Some(usage) = &self.usage {
                    if let Err(e) = usage.record_usage(engine).await {
                        warn!(%engine, error = %e, "failed to record engine usage");
                    }
                }
                Ok(answered(reply, mode))
            }
            Err(e) if !e.is_fallback_eligible() => Err(e),
            Err(e) => {
                warn!(%mode, error = %e, "engine failed, retrying with default engine");
                let reason = format!("{} failed — using default mode", engine.label());
                self.fall_back(mode, FallbackCause::EngineFailed, reason, text, context)
                    .await
            }
        }
    }

    async fn fall_back(
        &self,
        requested: Mode,
        cause: FallbackCause,
        reason: String,
        text: &str,
        context: &ChatContext,
    ) -> Result<RoutedReply, LifedeskError> {
        let notice = FallbackNotice {
            requested,
            cause,
            reason,
        };
        if let Some(observer) = &self.observer {
            observer(&notice);
        }
        let reply = self.invoke(Mode::General, text, context).await?;
        Ok(RoutedReply {
            content: reply.content,
            source: reply.source,
            answered_by: Mode::General,
            fell_back_to_general: true,
            fallback_reason: Some(notice.reason),
            fallback_cause: Some(notice.cause),
        })
    }

    async fn invoke(
        &self,
        mode: Mode,
        text: &str,
        context: &ChatContext,
    ) -> Result<EngineReply, LifedeskError> {
        debug!(%mode, history = context.history.len(), "invoking engine");
        self.invoker
            .invoke(
                mode,
                EngineRequest {
                    message: text.to_string(),
                    context: context.clone(),
                },
            )
            .await
    }
}

fn answered(reply: EngineReply, mode: Mode) -> RoutedReply {
    RoutedReply {
        content: reply.content,
        source: reply.source,
        answered_by: mode,
        fell_back_to_general: false,
        fallback_reason: None,
        fallback_cause: None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use lifedesk_core::{AdapterType, HealthStatus, PluginAdapter};

    use super::*;

    enum Outcome {
        Reply(&'static str),
        Fail,
        Unauthorized,
    }

    /// Engine double with a fixed outcome per mode.
    struct ScriptedEngine {
        outcomes: HashMap<Mode, Outcome>,
        calls: StdMutex<Vec<Mode>>,
    }

    impl ScriptedEngine {
        fn new(outcomes: impl IntoIterator<Item = (Mode, Outcome)>) -> Self {
            Self {
                outcomes: outcomes.into_iter().collect(),
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Mode> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PluginAdapter for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Engine
        }

        async fn health_check(&self) -> Result<HealthStatus, LifedeskError> {
            Ok(HealthStatus::Healthy)
        }
    }

    #[async_trait]
    impl EngineInvoker for ScriptedEngine {
        async fn invoke(
            &self,
            mode: Mode,
            _request: EngineRequest,
        ) -> Result<EngineReply, LifedeskError> {
            self.calls.lock().unwrap().push(mode);
            match self.outcomes.get(&mode) {
                Some(Outcome::Reply(text)) => Ok(EngineReply {
                    content: (*text).to_string(),
                    source: mode.to_string(),
                }),
                Some(Outcome::Unauthorized) => {
                    Err(LifedeskError::AuthenticationRequired("session expired".into()))
                }
                Some(Outcome::Fail) | None => Err(LifedeskError::engine(mode, "upstream 503")),
            }
        }
    }

    /// Gate with a fixed verdict for every engine.
    enum Gate {
        Open,
        OverQuota,
        Denied,
        Broken,
    }

    #[async_trait]
    impl EngineGate for Gate {
        async fn admit(&self, engine: Engine) -> Result<(), LifedeskError> {
            match self {
                Gate::Open => Ok(()),
                Gate::OverQuota => Err(LifedeskError::QuotaExceeded {
                    engine,
                    message: "limit reached".into(),
                }),
                Gate::Denied => Err(LifedeskError::PermissionDenied { engine }),
                Gate::Broken => Err(LifedeskError::Internal("state unavailable".into())),
            }
        }
    }

    #[derive(Default)]
    struct Counter {
        count: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl UsageRecorder for Counter {
        async fn record_usage(&self, _engine: Engine) -> Result<(), LifedeskError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LifedeskError::Internal("usage store offline".into()));
            }
            Ok(())
        }
    }

    fn notices() -> (Arc<StdMutex<Vec<FallbackNotice>>>, impl Fn(&FallbackNotice) + Send + Sync) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |n: &FallbackNotice| sink.lock().unwrap().push(n.clone()))
    }

    #[tokio::test]
    async fn general_mode_uses_default_engine() {
        let engine = Arc::new(ScriptedEngine::new([(Mode::General, Outcome::Reply("hi"))]));
        let router = MessageRouter::new(engine.clone());
        let reply = router
            .route(Mode::General, "hello", &ChatContext::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "hi");
        assert_eq!(reply.answered_by, Mode::General);
        assert!(!reply.fell_back_to_general);
        assert_eq!(engine.calls(), vec![Mode::General]);
    }

    #[tokio::test]
    async fn general_mode_failure_propagates() {
        let engine = Arc::new(ScriptedEngine::new([(Mode::General, Outcome::Fail)]));
        let usage = Arc::new(Counter::default());
        let router = MessageRouter::new(engine.clone()).with_usage_recorder(usage.clone());
        let err = router
            .route(Mode::General, "hello", &ChatContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LifedeskError::Engine { engine: Mode::General, .. }));
        assert_eq!(engine.calls(), vec![Mode::General]);
        assert_eq!(usage.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_engine_records_usage_once() {
        let engine = Arc::new(ScriptedEngine::new([(Mode::Search, Outcome::Reply("found"))]));
        let usage = Arc::new(Counter::default());
        let (seen, observer) = notices();
        let router = MessageRouter::new(engine.clone())
            .with_gate(Arc::new(Gate::Open))
            .with_usage_recorder(usage.clone())
            .with_fallback_observer(observer);

        let reply = router
            .route(Mode::Search, "news", &ChatContext::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "found");
        assert_eq!(reply.source, "search");
        assert_eq!(reply.answered_by, Mode::Search);
        assert!(!reply.fell_back_to_general);
        assert!(reply.fallback_reason.is_none());
        assert_eq!(usage.count.load(Ordering::SeqCst), 1);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn over_quota_engine_is_never_invoked() {
        let engine = Arc::new(ScriptedEngine::new([
            (Mode::Search, Outcome::Reply("found")),
            (Mode::General, Outcome::Reply("general answer")),
        ]));
        let usage = Arc::new(Counter::default());
        let (seen, observer) = notices();
        let router = MessageRouter::new(engine.clone())
            .with_gate(Arc::new(Gate::OverQuota))
            .with_usage_recorder(usage.clone())
            .with_fallback_observer(observer);

        let reply = router
            .route(Mode::Search, "news", &ChatContext::default())
            .await
            .unwrap();
        assert_eq!(engine.calls(), vec![Mode::General]);
        assert_eq!(reply.content, "general answer");
        assert!(reply.fell_back_to_general);
        assert_eq!(reply.fallback_cause, Some(FallbackCause::QuotaExceeded));
        assert_eq!(
            reply.fallback_reason.as_deref(),
            Some("Web search quota exceeded — using default mode")
        );
        assert_eq!(usage.count.load(Ordering::SeqCst), 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].requested, Mode::Search);
    }

    #[tokio::test]
    async fn disallowed_engine_is_never_invoked() {
        let engine = Arc::new(ScriptedEngine::new([
            (Mode::Secondary, Outcome::Reply("secondary answer")),
            (Mode::General, Outcome::Reply("general answer")),
        ]));
        let usage = Arc::new(Counter::default());
        let (seen, observer) = notices();
        let router = MessageRouter::new(engine.clone())
            .with_gate(Arc::new(Gate::Denied))
            .with_usage_recorder(usage.clone())
            .with_fallback_observer(observer);

        let reply = router
            .route(Mode::Secondary, "q", &ChatContext::default())
            .await
            .unwrap();
        assert_eq!(engine.calls(), vec![Mode::General]);
        assert_eq!(reply.content, "general answer");
        assert!(reply.fell_back_to_general);
        assert_eq!(reply.fallback_cause, Some(FallbackCause::NotAllowed));
        assert_eq!(
            reply.fallback_reason.as_deref(),
            Some("Secondary model is not available — using default mode")
        );
        assert_eq!(usage.count.load(Ordering::SeqCst), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unexpected_gate_error_aborts_without_invoking() {
        let engine = Arc::new(ScriptedEngine::new([(Mode::General, Outcome::Reply("hi"))]));
        let router = MessageRouter::new(engine.clone()).with_gate(Arc::new(Gate::Broken));
        let err = router
            .route(Mode::Search, "q", &ChatContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LifedeskError::Internal(_)));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_engine_falls_back_to_default() {
        let engine = Arc::new(ScriptedEngine::new([
            (Mode::Secondary, Outcome::Fail),
            (Mode::General, Outcome::Reply("general answer")),
        ]));
        let usage = Arc::new(Counter::default());
        let (seen, observer) = notices();
        let router = MessageRouter::new(engine.clone())
            .with_usage_recorder(usage.clone())
            .with_fallback_observer(observer);

        let reply = router
            .route(Mode::Secondary, "q", &ChatContext::default())
            .await
            .unwrap();
        assert_eq!(engine.calls(), vec![Mode::Secondary, Mode::General]);
        assert_eq!(reply.content, "general answer");
        assert_eq!(reply.answered_by, Mode::General);
        assert!(reply.fell_back_to_general);
        assert_eq!(
            reply.fallback_reason.as_deref(),
            Some("Secondary model failed — using default mode")
        );
        assert_eq!(reply.fallback_cause, Some(FallbackCause::EngineFailed));
        assert_eq!(usage.count.load(Ordering::SeqCst), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn both_engines_failing_returns_default_error() {
        let engine = Arc::new(ScriptedEngine::new([
            (Mode::Search, Outcome::Fail),
            (Mode::General, Outcome::Fail),
        ]));
        let router = MessageRouter::new(engine.clone());
        let err = router
            .route(Mode::Search, "q", &ChatContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LifedeskError::Engine { engine: Mode::General, .. }));
        assert_eq!(engine.calls(), vec![Mode::Search, Mode::General]);
    }

    #[tokio::test]
    async fn authentication_failure_does_not_fall_back() {
        let engine = Arc::new(ScriptedEngine::new([
            (Mode::Search, Outcome::Unauthorized),
            (Mode::General, Outcome::Reply("general answer")),
        ]));
        let (seen, observer) = notices();
        let router = MessageRouter::new(engine.clone()).with_fallback_observer(observer);
        let err = router
            .route(Mode::Search, "q", &ChatContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LifedeskError::AuthenticationRequired(_)));
        assert_eq!(engine.calls(), vec![Mode::Search]);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn usage_recording_failure_does_not_fail_reply() {
        let engine = Arc::new(ScriptedEngine::new([(Mode::Search, Outcome::Reply("ok"))]));
        let usage = Arc::new(Counter {
            fail: true,
            ..Default::default()
        });
        let router = MessageRouter::new(engine).with_usage_recorder(usage.clone());
        let reply = router
            .route(Mode::Search, "q", &ChatContext::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "ok");
        assert_eq!(usage.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn engine_failure_is_logged() {
        let engine = Arc::new(ScriptedEngine::new([
            (Mode::Secondary, Outcome::Fail),
            (Mode::General, Outcome::Reply("fine")),
        ]));
        let router = MessageRouter::new(engine);
        router
            .route(Mode::Secondary, "q", &ChatContext::default())
            .await
            .unwrap();
        assert!(logs_contain("engine failed, retrying with default engine"));
    }
}
