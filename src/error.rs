//! Error taxonomy for definition building and transition resolution.

use thiserror::Error;

/// Result type alias for statechart operations.
pub type StatechartResult<T> = Result<T, StatechartError>;

/// A malformed static definition.
///
/// These are fatal: they surface when a machine is constructed, when its
/// initial state is requested, or when a value names states the definition
/// does not contain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("compound state '{node}' has no initial state. Set `initial` to one of its children")]
    MissingInitialState { node: String },

    #[error("initial state '{initial}' of '{node}' is not one of its children")]
    UnknownInitialState { node: String, initial: String },

    #[error("transition target '{target}' declared on '{state}' does not resolve to any state")]
    UnresolvedTarget { state: String, target: String },

    #[error("state id '{id}' is used by more than one state")]
    DuplicateId { id: String },

    #[error("state '{node}' is invalid: {reason}")]
    InvalidNode { node: String, reason: String },

    #[error("machine '{id}' is a single atomic state and has no initial state to resolve")]
    AtomicRoot { id: String },

    #[error("no state has the id '{id}'")]
    UnknownStateId { id: String },

    #[error("state value {value} does not describe states of this machine")]
    UnknownStateValue { value: String },

    #[error("guard '{name}' is not registered in the machine options")]
    UnknownGuard { name: String },

    #[error("definition could not be parsed: {0}")]
    InvalidDefinition(String),

    #[error("{} definition problems: {}", .0.len(), join_messages(.0))]
    Multiple(Vec<ConfigurationError>),
}

impl ConfigurationError {
    /// Collapse accumulated violations into one error.
    pub(crate) fn from_violations(mut violations: Vec<ConfigurationError>) -> Self {
        if violations.len() == 1 {
            violations.remove(0)
        } else {
            ConfigurationError::Multiple(violations)
        }
    }

    /// Flatten into the individual violations.
    pub fn violations(&self) -> Vec<&ConfigurationError> {
        match self {
            ConfigurationError::Multiple(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }
}

fn join_messages(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while computing a transition.
///
/// `transition` either returns one complete new state or one of these; it
/// never returns a partially applied result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatechartError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("an event cannot be dispatched with the reserved name '{name}'")]
    IllegalEvent { name: String },

    #[error("machine '{machine}' does not accept event '{event}'")]
    RejectedEvent { machine: String, event: String },

    #[error("eventless transitions of machine '{machine}' did not settle after {steps} microsteps (revisited {configuration:?})")]
    InfiniteMicrostep {
        machine: String,
        steps: usize,
        configuration: Vec<String>,
    },
}
