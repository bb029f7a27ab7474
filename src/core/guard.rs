//! Guard predicates for controlling state transitions.
//!
//! Guards are pure boolean functions over the machine context and the event
//! being processed. A transition only qualifies when its guard passes.

use super::event::Event;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Pure predicate that determines if a transition can fire.
///
/// Guards are evaluated while selecting transitions, so they must be
/// deterministic and free of side effects.
///
/// # Example
///
/// ```rust
/// use harel::core::{Event, Guard};
/// use serde_json::json;
///
/// let has_funds = Guard::new(|context, _event| context["balance"].as_i64() > Some(0));
///
/// assert!(has_funds.check(&json!({ "balance": 10 }), &Event::new("WITHDRAW")));
/// assert!(!has_funds.check(&json!({ "balance": 0 }), &Event::new("WITHDRAW")));
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Arc<dyn Fn(&Value, &Event) -> bool + Send + Sync>,
}

impl Guard {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be pure (deterministic, no side effects) and
    /// thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Value, &Event) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Check if the guard allows the transition for this context and event.
    pub fn check(&self, context: &Value, event: &Event) -> bool {
        (self.predicate)(context, event)
    }

    pub(crate) fn same_as(&self, other: &Guard) -> bool {
        Arc::ptr_eq(&self.predicate, &other.predicate)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(<fn>)")
    }
}

/// A guard as written in a definition: either a name resolved through the
/// machine's guard registry, or an inline predicate.
#[derive(Clone, Debug)]
pub enum GuardRef {
    Named(String),
    Inline(Guard),
}

impl GuardRef {
    /// Display name used in logs and errors.
    pub fn name(&self) -> &str {
        match self {
            GuardRef::Named(name) => name,
            GuardRef::Inline(_) => "inline",
        }
    }
}

impl PartialEq for GuardRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (GuardRef::Named(a), GuardRef::Named(b)) => a == b,
            (GuardRef::Inline(a), GuardRef::Inline(b)) => a.same_as(b),
            _ => false,
        }
    }
}

impl From<&str> for GuardRef {
    fn from(name: &str) -> Self {
        GuardRef::Named(name.to_string())
    }
}

impl From<Guard> for GuardRef {
    fn from(guard: Guard) -> Self {
        GuardRef::Inline(guard)
    }
}

/// Declarative definitions only name guards: `"isValid"` or `{"type": "isValid"}`.
impl<'de> Deserialize<'de> for GuardRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Object {
                #[serde(rename = "type")]
                kind: String,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Name(name) => GuardRef::Named(name),
            Raw::Object { kind } => GuardRef::Named(kind),
        })
    }
}
