// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the mode state machine, the router and the adapters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator an adapter provides.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Engine,
    Usage,
}

/// Chat engine selection for a conversation.
///
/// Exactly one mode is active per thread. `General` is the default engine and
/// the universal fallback target.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// General assistant.
    #[default]
    General,
    /// Web-search augmented assistant.
    Search,
    /// Secondary LLM.
    Secondary,
}

impl Mode {
    /// Every mode, default first.
    pub const ALL: [Mode; 3] = [Mode::General, Mode::Search, Mode::Secondary];

    /// The quota-limited engine behind this mode, or `None` for the default engine.
    pub fn engine(self) -> Option<Engine> {
        match self {
            Mode::General => None,
            Mode::Search => Some(Engine::Search),
            Mode::Secondary => Some(Engine::Secondary),
        }
    }

    /// Whether this is the default engine.
    pub fn is_default(self) -> bool {
        self == Mode::General
    }

    /// Human-readable name used in notifications.
    pub fn label(self) -> &'static str {
        match self.engine() {
            Some(engine) => engine.label(),
            None => "General assistant",
        }
    }
}

/// A non-default engine. These are the engines that carry permissions and quotas.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    Search,
    Secondary,
}

impl Engine {
    pub const ALL: [Engine; 2] = [Engine::Search, Engine::Secondary];

    /// Human-readable name used in notifications.
    pub fn label(self) -> &'static str {
        match self {
            Engine::Search => "Web search",
            Engine::Secondary => "Secondary model",
        }
    }
}

impl From<Engine> for Mode {
    fn from(engine: Engine) -> Self {
        match engine {
            Engine::Search => Mode::Search,
            Engine::Secondary => Mode::Secondary,
        }
    }
}

/// One value per non-default engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMap<T> {
    pub search: T,
    pub secondary: T,
}

impl<T> EngineMap<T> {
    /// Build a map by evaluating `f` for every engine.
    pub fn from_fn(mut f: impl FnMut(Engine) -> T) -> Self {
        Self {
            search: f(Engine::Search),
            secondary: f(Engine::Secondary),
        }
    }

    pub fn get(&self, engine: Engine) -> &T {
        match engine {
            Engine::Search => &self.search,
            Engine::Secondary => &self.secondary,
        }
    }

    pub fn get_mut(&mut self, engine: Engine) -> &mut T {
        match engine {
            Engine::Search => &mut self.search,
            Engine::Secondary => &mut self.secondary,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Engine, &T)> {
        Engine::ALL.into_iter().map(move |e| (e, self.get(e)))
    }
}

/// Which non-default engines the current principal may select.
pub type PermissionSet = EngineMap<bool>;

impl PermissionSet {
    /// Every engine allowed.
    pub fn all_allowed() -> Self {
        Self::from_fn(|_| true)
    }

    /// Whether `mode` may be selected. The default engine is always allowed.
    pub fn allows(&self, mode: Mode) -> bool {
        mode.engine().is_none_or(|engine| *self.get(engine))
    }
}

/// Usage counter for one engine over the current quota period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub used: u32,
    pub limit: u32,
}

impl Quota {
    pub fn new(used: u32, limit: u32) -> Self {
        Self { used, limit }
    }

    /// An engine is usable while `used < limit`.
    pub fn is_available(&self) -> bool {
        self.used < self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    /// Add `amount` uses. Saturates instead of wrapping.
    pub fn record(&mut self, amount: u32) {
        self.used = self.used.saturating_add(amount);
    }
}

impl std::fmt::Display for Quota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.used, self.limit)
    }
}

/// Per-engine quotas.
pub type QuotaSet = EngineMap<Quota>;

/// Identifier of a persisted conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Author of a message in the conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single prior message passed to the engine as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: Role,
    pub content: String,
}

/// Most recent messages kept in [`ChatContext::history`]; older ones are dropped.
pub const HISTORY_WINDOW: usize = 20;

/// Conversation context accompanying a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatContext {
    /// Thread the message belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    /// Recent conversation history, oldest first, at most [`HISTORY_WINDOW`] entries.
    #[serde(default)]
    pub history: Vec<ContextMessage>,
    /// Bearer credential of the signed-in principal. Never serialized into request bodies.
    #[serde(skip)]
    pub authorization: Option<String>,
}

impl ChatContext {
    pub fn with_thread(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    pub fn with_authorization(mut self, token: impl Into<String>) -> Self {
        self.authorization = Some(token.into());
        self
    }

    /// Append a message, evicting the oldest beyond [`HISTORY_WINDOW`].
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(ContextMessage {
            role,
            content: content.into(),
        });
        if self.history.len() > HISTORY_WINDOW {
            let excess = self.history.len() - HISTORY_WINDOW;
            self.history.drain(..excess);
        }
    }
}

/// Request sent to an engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineRequest {
    pub message: String,
    pub context: ChatContext,
}

/// An engine's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineReply {
    pub content: String,
    /// Label of the engine (or upstream service) that produced the answer.
    pub source: String,
}

/// Why the default engine answered in place of the requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FallbackCause {
    /// The requested engine is not permitted and was never invoked.
    NotAllowed,
    /// The requested engine was over quota and never invoked.
    QuotaExceeded,
    /// The requested engine was invoked and failed.
    EngineFailed,
}

/// The outcome of routing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedReply {
    pub content: String,
    pub source: String,
    /// Mode whose engine actually answered.
    pub answered_by: Mode,
    /// Whether the default engine answered in place of the requested one.
    pub fell_back_to_general: bool,
    /// Why the substitution happened, when it did.
    pub fallback_reason: Option<String>,
    pub fallback_cause: Option<FallbackCause>,
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A user-facing notification (toast, inline banner, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

// --- Usage service wire types ---

/// Feature flag for one engine as reported by the usage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub enabled: bool,
    /// Maximum queries per period, used as the limit when no usage entry exists.
    #[serde(default)]
    pub max_qph: Option<u32>,
}

/// Usage counter for one engine as reported by the usage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub used: u32,
    pub limit: u32,
}

/// Permissions and usage for the authenticated principal.
///
/// Keys are engine names (`search`, `secondary`). Unknown keys are ignored and
/// missing engines are treated as enabled with the default limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlements {
    #[serde(default)]
    pub features: BTreeMap<String, FeatureFlag>,
    #[serde(default)]
    pub usage: BTreeMap<String, UsageCounter>,
}

impl Entitlements {
    /// Resolve the wire payload into permissions and quotas.
    ///
    /// Limit precedence: usage entry, then the feature's `max_qph`, then `defaults`.
    pub fn resolve(&self, defaults: &QuotaSet) -> (PermissionSet, QuotaSet) {
        let allowed = PermissionSet::from_fn(|engine| {
            self.features
                .get(&engine.to_string())
                .is_none_or(|f| f.enabled)
        });
        let quotas = QuotaSet::from_fn(|engine| {
            let key = engine.to_string();
            match self.usage.get(&key) {
                Some(counter) => Quota::new(counter.used, counter.limit),
                None => {
                    let limit = self
                        .features
                        .get(&key)
                        .and_then(|f| f.max_qph)
                        .unwrap_or(defaults.get(engine).limit);
                    Quota::new(0, limit)
                }
            }
        });
        (allowed, quotas)
    }
}
