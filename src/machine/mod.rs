//! The machine facade.
//!
//! A [`Machine`] pairs an immutable, shared [`Definition`] with an options
//! registry and a default context. Every operation is a pure function of
//! its inputs: `transition` returns a fresh [`MachineState`] and never
//! touches the state it was given.

mod options;

pub use options::{ActivityFn, DelayFn, MachineOptions, ServiceFn};

use crate::builder::StateNodeConfig;
use crate::core::{Event, MachineState, StateInput, StateValue, INIT_EVENT};
use crate::definition::{Definition, StateNode};
use crate::engine::configuration::{check_legal, is_in_final, resolve_value, value_of};
use crate::engine::{Engine, Settled, Snapshot};
use crate::error::{ConfigurationError, StatechartError, StatechartResult};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// A compiled statechart plus its implementation options.
///
/// Cheap to clone: clones share the definition.
///
/// # Example
///
/// ```rust
/// use harel::builder::StateNodeConfig;
/// use harel::Machine;
///
/// let machine = Machine::new(
///     StateNodeConfig::machine("light")
///         .initial("green")
///         .state("green", StateNodeConfig::new().on("TIMER", "yellow"))
///         .state("yellow", StateNodeConfig::new().on("TIMER", "red"))
///         .state("red", StateNodeConfig::new().on("TIMER", "green")),
/// )
/// .unwrap();
///
/// let green = machine.initial_state().unwrap();
/// let yellow = machine.transition(&green, "TIMER").unwrap();
///
/// assert!(yellow.matches("yellow"));
/// assert!(green.matches("green"));
/// ```
#[derive(Clone, Debug)]
pub struct Machine {
    definition: Arc<Definition>,
    options: MachineOptions,
    context: Value,
}

impl Machine {
    /// Compile a definition with empty options.
    pub fn new(config: StateNodeConfig) -> Result<Self, ConfigurationError> {
        Self::with_options(config, MachineOptions::default())
    }

    pub fn with_options(config: StateNodeConfig, options: MachineOptions) -> Result<Self, ConfigurationError> {
        let definition = Definition::build(config)?;
        debug!(
            machine = %definition.id(),
            nodes = definition.nodes().len(),
            events = definition.events().len(),
            strict = definition.is_strict(),
            "statechart_built"
        );

        Ok(Self {
            context: definition.context().clone(),
            definition: Arc::new(definition),
            options,
        })
    }

    /// Compile a definition from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        Self::new(StateNodeConfig::from_json(json)?)
    }

    pub fn id(&self) -> &str {
        self.definition.id()
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn options(&self) -> &MachineOptions {
        &self.options
    }

    /// Default context given to initial states and promoted values.
    pub fn context(&self) -> &Value {
        &self.context
    }

    /// A machine with `options` merged over the current ones.
    ///
    /// The definition is shared, not rebuilt.
    pub fn with_config(&self, options: MachineOptions) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
            options: self.options.clone().merge(options),
            context: self.context.clone(),
        }
    }

    /// A machine with a different default context.
    ///
    /// When both contexts are objects the top-level keys are merged, the new
    /// ones winning; otherwise the new context replaces the old one.
    pub fn with_context(&self, context: Value) -> Self {
        let context = match (&self.context, context) {
            (Value::Object(current), Value::Object(overrides)) => {
                let mut merged = current.clone();
                merged.extend(overrides);
                Value::Object(merged)
            }
            (_, replacement) => replacement,
        };

        Self {
            definition: Arc::clone(&self.definition),
            options: self.options.clone(),
            context,
        }
    }

    /// The settled default configuration.
    ///
    /// Its actions are the entry actions of every initially active node,
    /// root first, followed by whatever eventless settlement produced.
    pub fn initial_state(&self) -> StatechartResult<MachineState> {
        let root = self.definition.root();
        if root.is_leaf() {
            return Err(ConfigurationError::AtomicRoot {
                id: root.id.clone(),
            }
            .into());
        }

        let event = Event::internal(INIT_EVENT);
        let settled = self.engine().initial_macrostep(self.context.clone(), &event)?;
        Ok(self.state_from(settled, event, None))
    }

    /// Compute the state that `event` leads to from `state`.
    ///
    /// `state` may be a full [`MachineState`] or a bare [`StateValue`], which
    /// is promoted with the machine's default context. Unmatched events on a
    /// non-strict machine are no-ops.
    ///
    /// # Errors
    ///
    /// - [`StatechartError::IllegalEvent`] for the wildcard or eventless name
    /// - [`StatechartError::RejectedEvent`] for an undeclared event on a strict machine
    /// - [`StatechartError::InfiniteMicrostep`] when eventless transitions never settle
    /// - [`StatechartError::Configuration`] for unknown state values or guards,
    ///   and for states whose configuration this machine could not have produced
    pub fn transition(
        &self,
        state: impl Into<StateInput>,
        event: impl Into<Event>,
    ) -> StatechartResult<MachineState> {
        let event: Event = event.into();
        if event.is_reserved() {
            return Err(StatechartError::IllegalEvent { name: event.name });
        }
        if self.definition.is_strict() && !self.definition.accepts(&event) {
            warn!(machine = %self.id(), event = %event.name, "statechart_event_rejected");
            return Err(StatechartError::RejectedEvent {
                machine: self.id().to_string(),
                event: event.name,
            });
        }

        let state = match state.into() {
            StateInput::State(state) => {
                check_legal(&self.definition, &state.configuration)?;
                state
            }
            StateInput::Value(value) => self.resolve_state(value)?,
        };
        if state.done {
            debug!(machine = %self.id(), event = %event.name, "statechart_done_ignores_event");
            return Ok(unchanged(state, event));
        }

        let snapshot = Snapshot {
            configuration: state.configuration.clone(),
            context: state.context.clone(),
            history: state.history.clone(),
        };
        let settled = self.engine().macrostep(snapshot, &event)?;
        debug!(
            machine = %self.id(),
            event = %event.name,
            microsteps = settled.microsteps,
            actions = settled.actions.len(),
            "statechart_transition"
        );

        Ok(self.state_from(settled, event, Some(&state)))
    }

    /// Look up a node by its absolute id.
    pub fn get_state_node_by_id(&self, id: &str) -> Result<&StateNode, ConfigurationError> {
        self.definition
            .get_by_id(id)
            .ok_or_else(|| ConfigurationError::UnknownStateId { id: id.to_string() })
    }

    /// Promote a (possibly partial) state value to a full state with the
    /// default context, without dispatching anything.
    pub fn resolve_state(&self, value: impl Into<StateValue>) -> Result<MachineState, ConfigurationError> {
        let configuration = resolve_value(&self.definition, &value.into())?;
        let snapshot = Snapshot {
            configuration,
            context: self.context.clone(),
            history: Default::default(),
        };
        let settled = Settled {
            snapshot,
            actions: Vec::new(),
            microsteps: 0,
        };
        Ok(self.state_from(settled, Event::internal(INIT_EVENT), None))
    }

    /// Ids of the active nodes of `state`, in document order.
    pub fn active_ids(&self, state: &MachineState) -> Vec<String> {
        self.definition.node_ids(&state.configuration)
    }

    fn engine(&self) -> Engine<'_> {
        Engine::new(&self.definition, &self.options)
    }

    pub(crate) fn state_from(&self, settled: Settled, event: Event, previous: Option<&MachineState>) -> MachineState {
        let definition = &*self.definition;
        let Settled {
            snapshot, actions, ..
        } = settled;

        let next_events: BTreeSet<String> = snapshot
            .configuration
            .iter()
            .flat_map(|index| definition.node(index).events())
            .map(str::to_string)
            .collect();
        let changed = previous.is_some_and(|previous| {
            previous.configuration != snapshot.configuration
                || previous.context != snapshot.context
                || !actions.is_empty()
        });

        MachineState {
            value: value_of(definition, &snapshot.configuration),
            done: is_in_final(definition, &snapshot.configuration, definition.root().index),
            context: snapshot.context,
            event,
            actions,
            configuration: snapshot.configuration,
            next_events,
            history: snapshot.history,
            changed,
        }
    }
}

fn unchanged(state: MachineState, event: Event) -> MachineState {
    MachineState {
        event,
        actions: Vec::new(),
        changed: false,
        ..state
    }
}
