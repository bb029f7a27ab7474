//! Action descriptors.
//!
//! The engine never executes side effects. Entry, exit and transition actions
//! are emitted as inert [`ActionObject`]s, in order, for an external
//! interpreter to resolve against its [`MachineOptions`](crate::MachineOptions)
//! and run. Only `assign` and `raise` are interpreted by the engine itself,
//! because they feed back into the same macrostep.

use super::event::Event;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Side-effecting action implementation, run by the interpreter.
pub type ActionFn = Arc<dyn Fn(&Value, &Event) + Send + Sync>;

/// Pure context updater: produces the next context from the current one.
pub type AssignFn = Arc<dyn Fn(&Value, &Event) -> Value + Send + Sync>;

/// Delay of a scheduled event: literal milliseconds, or a name resolved
/// through the `delays` option registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Delay {
    Millis(u64),
    Named(String),
}

impl Delay {
    /// Interpret a delay key from a definition: numeric keys are milliseconds.
    pub fn parse(key: &str) -> Self {
        key.parse::<u64>()
            .map(Delay::Millis)
            .unwrap_or_else(|_| Delay::Named(key.to_string()))
    }

    /// The key as written in a definition.
    pub fn key(&self) -> String {
        match self {
            Delay::Millis(ms) => ms.to_string(),
            Delay::Named(name) => name.clone(),
        }
    }

    /// Literal delays resolve without any registry.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Delay::Millis(ms) => Some(Duration::from_millis(*ms)),
            Delay::Named(_) => None,
        }
    }
}

impl From<u64> for Delay {
    fn from(ms: u64) -> Self {
        Delay::Millis(ms)
    }
}

impl From<&str> for Delay {
    fn from(key: &str) -> Self {
        Delay::parse(key)
    }
}

/// Long-running side effects started on entry and stopped on exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Activity,
    Service,
}

/// What to start or stop: an activity or an invoked service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDef {
    /// Instance id; services report completion as `done.invoke.<id>`.
    pub id: String,
    /// Implementation name in the `activities` or `services` registry.
    pub src: String,
    pub kind: ActivityKind,
}

/// One action descriptor.
#[derive(Clone)]
pub enum ActionObject {
    /// Resolved by name through the `actions` registry at execution time.
    Named(String),
    /// Carries its own implementation.
    Inline { name: String, exec: ActionFn },
    /// Context update, applied by the engine during the microstep.
    Assign(AssignFn),
    /// Queue an internal event processed within the same macrostep.
    Raise { event: String },
    /// Ask the interpreter to deliver `event`, optionally after `delay`.
    Send {
        event: String,
        delay: Option<Delay>,
        id: String,
    },
    /// Cancel a pending delayed send.
    Cancel { send_id: String },
    Start(ActivityDef),
    Stop(ActivityDef),
}

impl ActionObject {
    pub fn named(name: impl Into<String>) -> Self {
        ActionObject::Named(name.into())
    }

    pub fn inline<F>(name: impl Into<String>, exec: F) -> Self
    where
        F: Fn(&Value, &Event) + Send + Sync + 'static,
    {
        ActionObject::Inline {
            name: name.into(),
            exec: Arc::new(exec),
        }
    }

    pub fn assign<F>(updater: F) -> Self
    where
        F: Fn(&Value, &Event) -> Value + Send + Sync + 'static,
    {
        ActionObject::Assign(Arc::new(updater))
    }

    pub fn raise(event: impl Into<String>) -> Self {
        ActionObject::Raise {
            event: event.into(),
        }
    }

    /// Deliver `event` back to the machine through the interpreter.
    pub fn send(event: impl Into<String>) -> Self {
        let event = event.into();
        ActionObject::Send {
            id: event.clone(),
            event,
            delay: None,
        }
    }

    /// Deliver `event` after `delay`; the send id is the event name.
    pub fn send_after(event: impl Into<String>, delay: impl Into<Delay>) -> Self {
        let event = event.into();
        ActionObject::Send {
            id: event.clone(),
            event,
            delay: Some(delay.into()),
        }
    }

    pub fn cancel(send_id: impl Into<String>) -> Self {
        ActionObject::Cancel {
            send_id: send_id.into(),
        }
    }

    /// Action type, as an interpreter dispatches on it.
    pub fn kind(&self) -> &str {
        match self {
            ActionObject::Named(name) => name,
            ActionObject::Inline { name, .. } => name,
            ActionObject::Assign(_) => "xstate.assign",
            ActionObject::Raise { .. } => "xstate.raise",
            ActionObject::Send { .. } => "xstate.send",
            ActionObject::Cancel { .. } => "xstate.cancel",
            ActionObject::Start(_) => "xstate.start",
            ActionObject::Stop(_) => "xstate.stop",
        }
    }
}

impl fmt::Debug for ActionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionObject::Named(name) => f.debug_tuple("Named").field(name).finish(),
            ActionObject::Inline { name, .. } => {
                f.debug_struct("Inline").field("name", name).finish_non_exhaustive()
            }
            ActionObject::Assign(_) => f.write_str("Assign(<fn>)"),
            ActionObject::Raise { event } => f.debug_struct("Raise").field("event", event).finish(),
            ActionObject::Send { event, delay, id } => f
                .debug_struct("Send")
                .field("event", event)
                .field("delay", delay)
                .field("id", id)
                .finish(),
            ActionObject::Cancel { send_id } => {
                f.debug_struct("Cancel").field("send_id", send_id).finish()
            }
            ActionObject::Start(activity) => f.debug_tuple("Start").field(activity).finish(),
            ActionObject::Stop(activity) => f.debug_tuple("Stop").field(activity).finish(),
        }
    }
}

impl PartialEq for ActionObject {
    fn eq(&self, other: &Self) -> bool {
        use ActionObject::*;
        match (self, other) {
            (Named(a), Named(b)) => a == b,
            (Inline { name: a, exec: x }, Inline { name: b, exec: y }) => {
                a == b && Arc::ptr_eq(x, y)
            }
            (Assign(x), Assign(y)) => Arc::ptr_eq(x, y),
            (Raise { event: a }, Raise { event: b }) => a == b,
            (
                Send {
                    event: a,
                    delay: d1,
                    id: i1,
                },
                Send {
                    event: b,
                    delay: d2,
                    id: i2,
                },
            ) => a == b && d1 == d2 && i1 == i2,
            (Cancel { send_id: a }, Cancel { send_id: b }) => a == b,
            (Start(a), Start(b)) | (Stop(a), Stop(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for ActionObject {
    fn from(name: &str) -> Self {
        ActionObject::named(name)
    }
}

impl From<String> for ActionObject {
    fn from(name: String) -> Self {
        ActionObject::Named(name)
    }
}

/// Declarative definitions reference actions by name: `"log"` or `{"type": "log"}`.
impl<'de> Deserialize<'de> for ActionObject {
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
            Raw::Name(name) | Raw::Object { kind: name } => ActionObject::Named(name),
        })
    }
}
