//! Machine states returned by the facade.

use super::action::ActionObject;
use super::configuration::Configuration;
use super::event::Event;
use super::history::HistoryRecord;
use super::value::StateValue;
use serde_json::Value;
use std::collections::BTreeSet;

/// Snapshot of a machine after one macrostep.
///
/// Every call to `initial_state` or `transition` returns a new, independent
/// instance. Nothing in the engine mutates a `MachineState` after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct MachineState {
    /// Nested view of the active configuration.
    pub value: StateValue,
    /// Caller-defined extended state, replaced wholesale by transitions.
    pub context: Value,
    /// The event that produced this state.
    pub event: Event,
    /// Descriptors to execute, in order: exits, transition actions, entries.
    pub actions: Vec<ActionObject>,
    /// Every active node, ancestors included.
    pub configuration: Configuration,
    /// Event names some active node has a transition for.
    pub next_events: BTreeSet<String>,
    /// Recorded history for history pseudo-states.
    pub history: HistoryRecord,
    /// The root has reached a final state.
    pub done: bool,
    /// Configuration, context or emitted actions differ from a no-op.
    pub changed: bool,
}

impl MachineState {
    /// Check whether the state lies within a parent state value.
    ///
    /// Strings are split on the default delimiter, so `"a.b"` matches a state
    /// whose value is `{a: "b"}` or `{a: {b: ...}}`.
    pub fn matches(&self, parent: impl Into<StateValue>) -> bool {
        self.value.matches(&parent.into())
    }

    /// Whether some active node declares a transition for `event`.
    ///
    /// Guards are not evaluated.
    pub fn can(&self, event: &str) -> bool {
        self.next_events.contains(event)
    }

    /// Action types in emission order.
    pub fn action_kinds(&self) -> Vec<&str> {
        self.actions.iter().map(ActionObject::kind).collect()
    }
}

/// What `transition` accepts as its starting point: a full state carrying
/// context and history forward, or a bare value promoted with the machine's
/// default context.
#[derive(Clone, Debug, PartialEq)]
pub enum StateInput {
    State(MachineState),
    Value(StateValue),
}

impl From<MachineState> for StateInput {
    fn from(state: MachineState) -> Self {
        StateInput::State(state)
    }
}

impl From<&MachineState> for StateInput {
    fn from(state: &MachineState) -> Self {
        StateInput::State(state.clone())
    }
}

impl From<StateValue> for StateInput {
    fn from(value: StateValue) -> Self {
        StateInput::Value(value)
    }
}

impl From<&str> for StateInput {
    fn from(path: &str) -> Self {
        StateInput::Value(StateValue::from(path))
    }
}
