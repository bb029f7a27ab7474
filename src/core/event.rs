//! The canonical event envelope.
//!
//! Callers may hand the machine a bare event name or a structured JSON event;
//! both are normalized once, at the boundary, into an [`Event`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Matcher name that matches any event. Never dispatchable as an event.
pub const WILDCARD: &str = "*";

/// Reserved name of the eventless ("always") pseudo-event.
pub const NULL_EVENT: &str = "";

/// Name of the event attached to initial states.
pub const INIT_EVENT: &str = "xstate.init";

const BUILTIN_PREFIXES: [&str; 3] = ["xstate.", "done.", "error."];

/// Where an event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrigin {
    /// Supplied by the caller of `transition`.
    External,
    /// Raised by the machine itself (raise actions, done events).
    Internal,
}

/// Normalized event: a name, an opaque payload and its origin.
///
/// # Example
///
/// ```rust
/// use harel::core::{Event, EventOrigin};
/// use serde_json::json;
///
/// let event = Event::from(json!({ "type": "SUBMIT", "amount": 3 }));
/// assert_eq!(event.name, "SUBMIT");
/// assert_eq!(event.payload, json!({ "amount": 3 }));
/// assert_eq!(event.origin, EventOrigin::External);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub payload: Value,
    pub origin: EventOrigin,
}

impl Event {
    /// Create an external event with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Value::Null,
            origin: EventOrigin::External,
        }
    }

    /// Create an event raised by the machine itself.
    pub fn internal(name: impl Into<String>) -> Self {
        Self {
            origin: EventOrigin::Internal,
            ..Self::new(name)
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Built-in control events are always accepted, even in strict mode.
    pub fn is_builtin(&self) -> bool {
        is_builtin_event(&self.name)
    }

    /// The wildcard and eventless names can never be dispatched.
    pub fn is_reserved(&self) -> bool {
        self.name == WILDCARD || self.name == NULL_EVENT
    }
}

/// Check whether a name belongs to the built-in control namespace.
pub fn is_builtin_event(name: &str) -> bool {
    BUILTIN_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Event::new(name)
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        Event::new(name)
    }
}

impl From<&Event> for Event {
    fn from(event: &Event) -> Self {
        event.clone()
    }
}

/// Structured events carry their name under `"type"`; the remaining keys
/// become the payload. A JSON string is treated as a bare name.
impl From<Value> for Event {
    fn from(value: Value) -> Self {
        match value {
            Value::String(name) => Event::new(name),
            Value::Object(mut fields) => {
                let name = match fields.remove("type") {
                    Some(Value::String(name)) => name,
                    _ => String::new(),
                };
                let payload = if fields.is_empty() {
                    Value::Null
                } else {
                    Value::Object(fields)
                };
                Event::new(name).with_payload(payload)
            }
            _ => Event::new(NULL_EVENT),
        }
    }
}
