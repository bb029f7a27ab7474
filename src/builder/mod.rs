//! Builder API for declarative statechart definitions.
//!
//! Definitions are plain data: build them fluently with
//! [`StateNodeConfig`] and [`TransitionConfig`], or parse the equivalent
//! JSON shape. Compiling a definition into the immutable
//! [`Definition`](crate::definition::Definition) happens in
//! [`Machine::new`](crate::Machine::new).

pub mod node;
mod serde_util;
pub mod transition;

pub use node::{InvokeConfig, StateNodeConfig};
pub use transition::{TransitionConfig, TransitionsConfig};

use crate::core::{ActionObject, GuardRef};

/// A transition to `target` guarded by a registry guard.
///
/// # Example
///
/// ```
/// use harel::builder::{guarded_transition, StateNodeConfig};
///
/// let config = StateNodeConfig::new().on("SUBMIT", guarded_transition("sent", "isValid"));
/// assert_eq!(config.on[0].1 .0[0].target, vec!["sent"]);
/// ```
pub fn guarded_transition(target: impl Into<String>, guard: impl Into<String>) -> TransitionConfig {
    let guard: String = guard.into();
    TransitionConfig::to(target).guard(GuardRef::Named(guard))
}

/// A targetless transition that only runs `action`.
///
/// # Example
///
/// ```
/// use harel::builder::{action_transition, StateNodeConfig};
///
/// let config = StateNodeConfig::new().on("PING", action_transition("pong"));
/// assert!(config.on[0].1 .0[0].target.is_empty());
/// ```
pub fn action_transition(action: impl Into<String>) -> TransitionConfig {
    let action: String = action.into();
    TransitionConfig::new().action(ActionObject::Named(action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_transition_names_its_guard() {
        let transition = guarded_transition("b", "ready");

        assert_eq!(transition.target, vec!["b"]);
        assert_eq!(transition.guard, Some(GuardRef::Named("ready".to_string())));
    }

    #[test]
    fn action_transition_is_targetless() {
        let transition = action_transition("log");

        assert!(transition.target.is_empty());
        assert_eq!(transition.actions, vec![ActionObject::named("log")]);
    }
}
