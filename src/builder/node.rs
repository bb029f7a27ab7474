//! Declarative state nodes.

use crate::builder::serde_util::{one_or_many, ordered_map};
use crate::builder::transition::{TransitionConfig, TransitionsConfig};
use crate::core::{ActionObject, Delay};
use crate::definition::{HistoryKind, NodeKind};
use crate::error::ConfigurationError;
use serde::Deserialize;
use serde_json::Value;

/// An invoked service: started on entry, stopped on exit.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeConfig {
    /// Implementation name in the `services` registry.
    pub src: String,

    #[serde(default)]
    pub id: Option<String>,

    /// Taken on `done.invoke.<id>`.
    #[serde(default)]
    pub on_done: Option<TransitionsConfig>,

    /// Taken on `error.platform.<id>`.
    #[serde(default)]
    pub on_error: Option<TransitionsConfig>,
}

impl InvokeConfig {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn on_done(mut self, transitions: impl Into<TransitionsConfig>) -> Self {
        self.on_done = Some(transitions.into());
        self
    }

    pub fn on_error(mut self, transitions: impl Into<TransitionsConfig>) -> Self {
        self.on_error = Some(transitions.into());
        self
    }
}

/// Declarative definition of a state node and, at the root, of the machine.
///
/// Build one fluently or parse it from JSON. Key order in `states`, `on`
/// and `after` is declaration order, which becomes document order.
///
/// # Example
///
/// ```rust
/// use harel::builder::{StateNodeConfig, TransitionConfig};
///
/// let light = StateNodeConfig::machine("light")
///     .initial("green")
///     .state("green", StateNodeConfig::new().on("TIMER", "yellow"))
///     .state("yellow", StateNodeConfig::new().on("TIMER", "red"))
///     .state(
///         "red",
///         StateNodeConfig::new().on("TIMER", TransitionConfig::to("green").action("log")),
///     );
///
/// let parsed = StateNodeConfig::from_json(r#"{
///     "id": "light",
///     "initial": "green",
///     "states": {
///         "green": { "on": { "TIMER": "yellow" } },
///         "yellow": { "on": { "TIMER": "red" } },
///         "red": { "on": { "TIMER": { "target": "green", "actions": "log" } } }
///     }
/// }"#).unwrap();
///
/// assert_eq!(light.states.len(), parsed.states.len());
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StateNodeConfig {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub initial: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<NodeKind>,

    #[serde(default, deserialize_with = "ordered_map")]
    pub states: Vec<(String, StateNodeConfig)>,

    #[serde(default, deserialize_with = "ordered_map")]
    pub on: Vec<(String, TransitionsConfig)>,

    #[serde(default)]
    pub always: Option<TransitionsConfig>,

    #[serde(default, deserialize_with = "ordered_map")]
    pub after: Vec<(String, TransitionsConfig)>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub entry: Vec<ActionObject>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub exit: Vec<ActionObject>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub invoke: Vec<InvokeConfig>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub activities: Vec<String>,

    /// Shallow or deep, for history nodes.
    #[serde(default)]
    pub history: Option<HistoryKind>,

    /// Default target of a history node.
    #[serde(default)]
    pub target: Option<String>,

    /// Default context (root only).
    #[serde(default)]
    pub context: Option<Value>,

    /// Reject undeclared events (root only).
    #[serde(default)]
    pub strict: bool,

    /// Path delimiter (root only), `"."` by default.
    #[serde(default)]
    pub delimiter: Option<String>,

    #[serde(default)]
    pub version: Option<String>,
}

impl StateNodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A machine root with the given id.
    pub fn machine(id: impl Into<String>) -> Self {
        Self::new().id(id)
    }

    /// Parse the declarative JSON shape.
    ///
    /// Parse from text rather than from a `serde_json::Value`: without
    /// order-preserving maps a `Value` has already lost declaration order.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json)
            .map_err(|e| ConfigurationError::InvalidDefinition(e.to_string()))
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn initial(mut self, initial: impl Into<String>) -> Self {
        self.initial = Some(initial.into());
        self
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn parallel(self) -> Self {
        self.kind(NodeKind::Parallel)
    }

    pub fn final_state(self) -> Self {
        self.kind(NodeKind::Final)
    }

    /// Make this a history node.
    pub fn history(mut self, history: HistoryKind) -> Self {
        self.kind = Some(NodeKind::History);
        self.history = Some(history);
        self
    }

    /// Default target of a history node.
    pub fn history_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Add a child state.
    pub fn state(mut self, key: impl Into<String>, child: StateNodeConfig) -> Self {
        self.states.push((key.into(), child));
        self
    }

    /// Add candidates for `event`, after any already declared for it.
    pub fn on(mut self, event: impl Into<String>, transitions: impl Into<TransitionsConfig>) -> Self {
        push_candidates(&mut self.on, event.into(), transitions.into());
        self
    }

    /// Forbid `event`: it is consumed here and never reaches ancestors.
    pub fn forbid(self, event: impl Into<String>) -> Self {
        self.on(event, TransitionConfig::new())
    }

    /// Add eventless candidates.
    pub fn always(mut self, transitions: impl Into<TransitionsConfig>) -> Self {
        let TransitionsConfig(mut candidates) = transitions.into();
        match self.always.as_mut() {
            Some(existing) => existing.0.append(&mut candidates),
            None => self.always = Some(TransitionsConfig(candidates)),
        }
        self
    }

    /// Add a delayed transition.
    pub fn after(mut self, delay: impl Into<Delay>, transitions: impl Into<TransitionsConfig>) -> Self {
        push_candidates(&mut self.after, delay.into().key(), transitions.into());
        self
    }

    pub fn entry(mut self, action: impl Into<ActionObject>) -> Self {
        self.entry.push(action.into());
        self
    }

    pub fn exit(mut self, action: impl Into<ActionObject>) -> Self {
        self.exit.push(action.into());
        self
    }

    pub fn invoke(mut self, invoke: InvokeConfig) -> Self {
        self.invoke.push(invoke);
        self
    }

    pub fn activity(mut self, name: impl Into<String>) -> Self {
        self.activities.push(name.into());
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

fn push_candidates(
    table: &mut Vec<(String, TransitionsConfig)>,
    event: String,
    TransitionsConfig(mut candidates): TransitionsConfig,
) {
    match table.iter_mut().find(|(name, _)| *name == event) {
        Some((_, existing)) => existing.0.append(&mut candidates),
        None => table.push((event, TransitionsConfig(candidates))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GuardRef;
    use serde_json::json;

    #[test]
    fn parses_the_full_declarative_shape() {
        let config = StateNodeConfig::from_json(
            r##"{
                "id": "fetch",
                "initial": "idle",
                "strict": true,
                "delimiter": "/",
                "version": "2",
                "context": { "retries": 0 },
                "states": {
                    "idle": { "on": { "FETCH": "loading" }, "entry": "reset" },
                    "loading": {
                        "invoke": { "src": "fetchData", "id": "fetcher", "onDone": "done", "onError": "#fetch.failed" },
                        "after": { "5000": "failed" },
                        "activities": ["spinner"],
                        "exit": ["stopSpinner", { "type": "log" }]
                    },
                    "failed": { "always": { "target": "idle", "cond": "canRetry" } },
                    "hist": { "type": "history", "history": "deep", "target": "idle" },
                    "done": { "type": "final" }
                }
            }"##,
        )
        .unwrap();

        assert_eq!(config.id.as_deref(), Some("fetch"));
        assert!(config.strict);
        assert_eq!(config.delimiter.as_deref(), Some("/"));
        assert_eq!(config.version.as_deref(), Some("2"));
        assert_eq!(config.context, Some(json!({ "retries": 0 })));

        let keys: Vec<&str> = config.states.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["idle", "loading", "failed", "hist", "done"]);

        let idle = &config.states[0].1;
        assert_eq!(idle.entry, vec![ActionObject::named("reset")]);

        let loading = &config.states[1].1;
        assert_eq!(loading.invoke[0].src, "fetchData");
        assert_eq!(loading.invoke[0].on_done, Some(TransitionsConfig::from("done")));
        assert_eq!(loading.after[0].0, "5000");
        assert_eq!(loading.activities, vec!["spinner"]);
        assert_eq!(
            loading.exit,
            vec![ActionObject::named("stopSpinner"), ActionObject::named("log")]
        );

        let failed = &config.states[2].1;
        let always = failed.always.as_ref().unwrap();
        assert_eq!(always.0[0].guard, Some(GuardRef::Named("canRetry".to_string())));

        let hist = &config.states[3].1;
        assert_eq!(hist.kind, Some(NodeKind::History));
        assert_eq!(hist.history, Some(HistoryKind::Deep));

        assert_eq!(config.states[4].1.kind, Some(NodeKind::Final));
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let result = StateNodeConfig::from_json(r#"{ "states": 3 }"#);
        assert!(matches!(result, Err(ConfigurationError::InvalidDefinition(_))));
    }

    #[test]
    fn repeated_events_extend_the_candidate_list() {
        let config = StateNodeConfig::new()
            .on("GO", TransitionConfig::to("a").guard("first"))
            .on("STOP", "c")
            .on("GO", "b");

        assert_eq!(config.on.len(), 2);
        assert_eq!(config.on[0].1 .0.len(), 2);
        assert_eq!(config.on[0].1 .0[1], TransitionConfig::to("b"));
    }

    #[test]
    fn after_keys_are_delay_keys() {
        let config = StateNodeConfig::new().after(1000u64, "b").after("LONG", "c");
        let keys: Vec<&str> = config.after.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["1000", "LONG"]);
    }

    #[test]
    fn history_builder_sets_kind() {
        let config = StateNodeConfig::new()
            .history(HistoryKind::Shallow)
            .history_target("a");
        assert_eq!(config.kind, Some(NodeKind::History));
        assert_eq!(config.target.as_deref(), Some("a"));
    }

    #[test]
    fn always_accumulates_candidates() {
        let config = StateNodeConfig::new()
            .always(TransitionConfig::to("a").guard("x"))
            .always("b");
        assert_eq!(config.always.unwrap().0.len(), 2);
    }
}
