//! Nested state values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default separator for composite state keys and relative target paths.
pub const DEFAULT_DELIMITER: &str = ".";

/// Nested, serializable view of a configuration.
///
/// An atomic leaf under a compound parent is a bare key; a compound child is
/// a single-entry map; a parallel node maps every region key to its value.
/// Serializes to the plain JSON shapes `"a"`, `{"a":"b"}` and
/// `{"X":"x1","Y":"y1"}`.
///
/// # Example
///
/// ```rust
/// use harel::core::StateValue;
///
/// let value = StateValue::from_path("player.playing", ".");
/// assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"player":"playing"}"#);
/// assert!(value.matches(&StateValue::from("player")));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Atomic(String),
    Compound(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Build a value from a delimited path: `"a.b.c"` becomes `{a: {b: "c"}}`.
    pub fn from_path(path: &str, delimiter: &str) -> Self {
        let mut keys: Vec<&str> = path.split(delimiter).collect();
        let Some(last) = keys.pop() else {
            return StateValue::Atomic(String::new());
        };
        keys.into_iter()
            .rev()
            .fold(StateValue::Atomic(last.to_string()), |value, key| {
                StateValue::Compound(BTreeMap::from([(key.to_string(), value)]))
            })
    }

    /// Check whether this (full) value lies within `parent`.
    ///
    /// `"a"` matches `{a: "b"}`, `{a: "b"}` matches itself, and a parallel
    /// pattern matches when every region it names matches.
    pub fn matches(&self, parent: &StateValue) -> bool {
        match (parent, self) {
            (StateValue::Atomic(expected), StateValue::Atomic(actual)) => expected == actual,
            (StateValue::Atomic(expected), StateValue::Compound(children)) => {
                children.contains_key(expected)
            }
            (StateValue::Compound(_), StateValue::Atomic(_)) => false,
            (StateValue::Compound(expected), StateValue::Compound(children)) => {
                expected.iter().all(|(key, pattern)| {
                    children
                        .get(key)
                        .is_some_and(|child| child.matches(pattern))
                })
            }
        }
    }

    /// Delimited paths of every leaf, in key order.
    pub fn leaf_paths(&self, delimiter: &str) -> Vec<String> {
        match self {
            StateValue::Atomic(key) => vec![key.clone()],
            StateValue::Compound(children) => children
                .iter()
                .flat_map(|(key, child)| {
                    let nested = child.leaf_paths(delimiter);
                    if nested.is_empty() {
                        vec![key.clone()]
                    } else {
                        nested
                            .into_iter()
                            .map(|rest| format!("{key}{delimiter}{rest}"))
                            .collect()
                    }
                })
                .collect(),
        }
    }
}

impl From<&str> for StateValue {
    fn from(path: &str) -> Self {
        StateValue::from_path(path, DEFAULT_DELIMITER)
    }
}

impl From<String> for StateValue {
    fn from(path: String) -> Self {
        StateValue::from(path.as_str())
    }
}

impl From<BTreeMap<String, StateValue>> for StateValue {
    fn from(children: BTreeMap<String, StateValue>) -> Self {
        StateValue::Compound(children)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}
