// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mode state machine: router state and its transition function.
//!
//! [`RouterState`] is mutated only by applying an [`Action`]. Every action is
//! defined for every state, and applying one never blocks or fails.

use lifedesk_core::{Engine, Mode, PermissionSet, Quota, QuotaSet};

/// Snapshot of the chat engine selection for one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterState {
    /// Engine that answers the next message.
    pub active_mode: Mode,
    /// Which non-default engines may be selected.
    pub allowed: PermissionSet,
    /// Local usage counters, synced from the usage service.
    pub quotas: QuotaSet,
    /// A request is in flight. Advisory only.
    pub busy: bool,
    /// Reason for the most recent refused selection or automatic mode change.
    pub last_error: Option<String>,
}

impl RouterState {
    /// Fresh state in the default mode.
    pub fn new(allowed: PermissionSet, quotas: QuotaSet) -> Self {
        Self {
            active_mode: Mode::General,
            allowed,
            quotas,
            busy: false,
            last_error: None,
        }
    }

    pub fn quota(&self, engine: Engine) -> Quota {
        *self.quotas.get(engine)
    }

    /// Apply a transition in place.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Select(Mode::General) => {
                self.active_mode = Mode::General;
                self.last_error = None;
            }
            Action::Select(mode) => {
                if self.allowed.allows(mode) {
                    self.active_mode = if self.active_mode == mode {
                        Mode::General
                    } else {
                        mode
                    };
                    self.last_error = None;
                } else {
                    self.last_error = Some(format!("{} is not available", mode.label()));
                }
            }
            Action::SetMode(mode) => {
                self.active_mode = mode;
                self.last_error = None;
            }
            Action::EngineError(message)
            | Action::QuotaExceeded { message, .. }
            | Action::PermissionRevoked(message) => {
                self.active_mode = Mode::General;
                self.last_error = Some(message);
            }
            Action::UpdateQuotas(quotas) => self.quotas = quotas,
            Action::UpdatePermissions(allowed) => self.allowed = allowed,
            Action::SetBusy(busy) => self.busy = busy,
        }
    }
}

/// A transition of the mode state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// User picked a mode. Picking the active non-default mode again toggles it off.
    Select(Mode),
    /// Direct set, used when restoring a thread's persisted mode.
    SetMode(Mode),
    /// The active engine failed; fall back to the default mode.
    EngineError(String),
    /// An engine ran out of quota; fall back to the default mode.
    QuotaExceeded { engine: Engine, message: String },
    /// The active engine is no longer permitted; fall back to the default mode.
    PermissionRevoked(String),
    UpdateQuotas(QuotaSet),
    UpdatePermissions(PermissionSet),
    SetBusy(bool),
}

/// Pure form of [`RouterState::apply`].
pub fn reduce(mut state: RouterState, action: Action) -> RouterState {
    state.apply(action);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fresh() -> RouterState {
        RouterState::new(
            PermissionSet::all_allowed(),
            QuotaSet::from_fn(|_| Quota::new(0, 10)),
        )
    }

    fn denied(engine: Engine) -> RouterState {
        let mut allowed = PermissionSet::all_allowed();
        *allowed.get_mut(engine) = false;
        RouterState::new(allowed, QuotaSet::from_fn(|_| Quota::new(0, 10)))
    }

    #[test]
    fn starts_in_default_mode() {
        let state = fresh();
        assert_eq!(state.active_mode, Mode::General);
        assert!(!state.busy);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn select_engine_then_again_toggles_off() {
        let state = reduce(fresh(), Action::Select(Mode::Search));
        assert_eq!(state.active_mode, Mode::Search);
        let state = reduce(state, Action::Select(Mode::Search));
        assert_eq!(state.active_mode, Mode::General);
    }

    #[test]
    fn select_other_engine_switches_directly() {
        let state = reduce(fresh(), Action::Select(Mode::Search));
        let state = reduce(state, Action::Select(Mode::Secondary));
        assert_eq!(state.active_mode, Mode::Secondary);
    }

    #[test]
    fn select_default_clears_error() {
        let mut state = denied(Engine::Search);
        state.apply(Action::Select(Mode::Search));
        assert!(state.last_error.is_some());
        state.apply(Action::Select(Mode::General));
        assert_eq!(state.active_mode, Mode::General);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn select_default_is_idempotent() {
        let state = reduce(fresh(), Action::Select(Mode::General));
        let state = reduce(state, Action::Select(Mode::General));
        assert_eq!(state.active_mode, Mode::General);
    }

    #[test]
    fn disallowed_select_keeps_mode_and_sets_error() {
        let mut state = denied(Engine::Secondary);
        state.apply(Action::Select(Mode::Search));
        state.apply(Action::Select(Mode::Secondary));
        assert_eq!(state.active_mode, Mode::Search);
        assert_eq!(
            state.last_error.as_deref(),
            Some("Secondary model is not available")
        );
    }

    #[test]
    fn set_mode_bypasses_toggle() {
        let state = reduce(fresh(), Action::SetMode(Mode::Search));
        let state = reduce(state, Action::SetMode(Mode::Search));
        assert_eq!(state.active_mode, Mode::Search);
    }

    #[test]
    fn failures_return_to_default_with_message() {
        for action in [
            Action::EngineError("search failed".into()),
            Action::QuotaExceeded {
                engine: Engine::Search,
                message: "search quota".into(),
            },
            Action::PermissionRevoked("revoked".into()),
        ] {
            let state = reduce(reduce(fresh(), Action::Select(Mode::Search)), action);
            assert_eq!(state.active_mode, Mode::General);
            assert!(state.last_error.is_some());
        }
    }

    #[test]
    fn updates_do_not_touch_mode() {
        let mut state = reduce(fresh(), Action::Select(Mode::Secondary));
        state.apply(Action::UpdateQuotas(QuotaSet::from_fn(|_| Quota::new(3, 4))));
        state.apply(Action::UpdatePermissions(PermissionSet::from_fn(|_| false)));
        state.apply(Action::SetBusy(true));
        assert_eq!(state.active_mode, Mode::Secondary);
        assert_eq!(state.quota(Engine::Search), Quota::new(3, 4));
        assert!(!state.allowed.secondary);
        assert!(state.busy);
    }

    fn any_mode() -> impl Strategy<Value = Mode> {
        prop_oneof![
            Just(Mode::General),
            Just(Mode::Search),
            Just(Mode::Secondary)
        ]
    }

    fn any_engine() -> impl Strategy<Value = Engine> {
        prop_oneof![Just(Engine::Search), Just(Engine::Secondary)]
    }

    fn any_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            any_mode().prop_map(Action::Select),
            any_mode().prop_map(Action::SetMode),
            "[a-z]{1,8}".prop_map(Action::EngineError),
            (any_engine(), "[a-z]{1,8}")
                .prop_map(|(engine, message)| Action::QuotaExceeded { engine, message }),
            "[a-z]{1,8}".prop_map(Action::PermissionRevoked),
            (any::<bool>(), any::<bool>())
                .prop_map(|(search, secondary)| Action::UpdatePermissions(PermissionSet {
                    search,
                    secondary
                })),
            any::<bool>().prop_map(Action::SetBusy),
        ]
    }

    proptest! {
        #[test]
        fn double_toggle_is_identity_when_allowed(
            history in proptest::collection::vec(any_action(), 0..20),
            engine in any_engine(),
        ) {
            let mut state = fresh();
            for action in history {
                state.apply(action);
            }
            state.apply(Action::UpdatePermissions(PermissionSet::all_allowed()));
            let before = state.active_mode;
            let mode = Mode::from(engine);
            state.apply(Action::Select(mode));
            state.apply(Action::Select(mode));
            if before == mode || before == Mode::General {
                prop_assert_eq!(state.active_mode, before);
            } else {
                // Switched to `mode`, then toggled off.
                prop_assert_eq!(state.active_mode, Mode::General);
            }
        }

        #[test]
        fn disallowed_select_never_changes_mode(
            history in proptest::collection::vec(any_action(), 0..20),
            engine in any_engine(),
        ) {
            let mut state = fresh();
            for action in history {
                state.apply(action);
            }
            let mut allowed = state.allowed;
            *allowed.get_mut(engine) = false;
            state.apply(Action::UpdatePermissions(allowed));
            let before = state.active_mode;
            state.apply(Action::Select(Mode::from(engine)));
            prop_assert_eq!(state.active_mode, before);
            prop_assert!(state.last_error.as_deref().is_some_and(|e| !e.is_empty()));
        }
    }
}
