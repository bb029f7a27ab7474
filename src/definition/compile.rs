//! Compiles a [`StateNodeConfig`] tree into a [`Definition`].
//!
//! Compilation runs in two passes. The first allocates every node in
//! document order and derives ids, paths and lineage. The second resolves
//! initial states and transition targets, and expands delayed transitions,
//! invocations and activities into their implicit actions and transitions.
//! Violations from the second pass are accumulated with `Validation`, so a
//! broken definition reports every problem at once.

use crate::builder::{StateNodeConfig, TransitionsConfig};
use crate::core::{
    ActionObject, ActivityDef, ActivityKind, Delay, NodeIndex, DEFAULT_DELIMITER, NULL_EVENT,
    WILDCARD,
};
use crate::definition::node::{EventMatcher, NodeKind, StateNode, TransitionDef};
use crate::definition::tree::Definition;
use crate::error::ConfigurationError;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigurationError>>;

/// Root key and id used when a definition names neither.
pub(crate) const ANONYMOUS_MACHINE: &str = "(machine)";

/// Event a delayed transition listens for.
pub(crate) fn after_event(delay_key: &str, node_id: &str) -> String {
    format!("xstate.after({delay_key})#{node_id}")
}

pub(crate) fn done_invoke_event(invoke_id: &str) -> String {
    format!("done.invoke.{invoke_id}")
}

pub(crate) fn error_invoke_event(invoke_id: &str) -> String {
    format!("error.platform.{invoke_id}")
}

pub(crate) fn compile(config: StateNodeConfig) -> Result<Definition, ConfigurationError> {
    let delimiter = config
        .delimiter
        .clone()
        .unwrap_or_else(|| DEFAULT_DELIMITER.to_string());
    if delimiter.is_empty() {
        return Err(ConfigurationError::InvalidDefinition(
            "the path delimiter must not be empty".to_string(),
        ));
    }

    let machine_key = config
        .key
        .clone()
        .or_else(|| config.id.clone())
        .unwrap_or_else(|| ANONYMOUS_MACHINE.to_string());

    let naming = Naming {
        machine_key: &machine_key,
        delimiter: &delimiter,
    };
    let mut nodes = Vec::new();
    let mut sources = Vec::new();
    naming.allocate(
        &config,
        machine_key.clone(),
        Vec::new(),
        Vec::new(),
        &mut nodes,
        &mut sources,
    );

    let mut checks: Vec<Check> = Vec::new();
    let mut ids = HashMap::with_capacity(nodes.len());
    for node in &nodes {
        if ids.insert(node.id.clone(), node.index).is_some() {
            checks.push(Validation::fail(ConfigurationError::DuplicateId {
                id: node.id.clone(),
            }));
        }
    }

    let mut definition = Definition {
        id: nodes[0].id.clone(),
        nodes,
        ids,
        events: BTreeSet::new(),
        strict: config.strict,
        delimiter: delimiter.clone(),
        version: config.version.clone(),
        context: config.context.clone().unwrap_or(Value::Null),
    };

    let mut order = 0;
    let compiled: Vec<Compiled> = {
        let resolver = Resolver {
            definition: &definition,
        };
        sources
            .iter()
            .enumerate()
            .map(|(position, source)| {
                resolver.compile_node(NodeIndex(position), source, &mut order, &mut checks)
            })
            .collect()
    };

    for (node, parts) in definition.nodes.iter_mut().zip(compiled) {
        node.initial = parts.initial;
        node.history_target = parts.history_target;
        node.transitions = parts.transitions;
        node.entry = parts.entry;
        node.exit = parts.exit;
    }
    definition.events = definition
        .nodes
        .iter()
        .flat_map(StateNode::events)
        .map(str::to_string)
        .collect();

    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(definition),
        Validation::Failure(errors) => Err(ConfigurationError::from_violations(
            errors.iter().cloned().collect(),
        )),
    }
}

struct Naming<'a> {
    machine_key: &'a str,
    delimiter: &'a str,
}

impl Naming<'_> {
    /// Pre-order allocation: a node's index is its document position.
    fn allocate<'c>(
        &self,
        config: &'c StateNodeConfig,
        key: String,
        path: Vec<String>,
        lineage: Vec<NodeIndex>,
        nodes: &mut Vec<StateNode>,
        sources: &mut Vec<&'c StateNodeConfig>,
    ) -> NodeIndex {
        let index = NodeIndex(nodes.len());
        let id = config.id.clone().unwrap_or_else(|| self.default_id(&path));
        let kind = config.kind.unwrap_or_else(|| infer_kind(config));
        let history = match kind {
            NodeKind::History => Some(config.history.unwrap_or_default()),
            _ => None,
        };

        nodes.push(StateNode {
            index,
            id,
            key,
            path: path.clone(),
            kind,
            parent: lineage.last().copied(),
            lineage: lineage.clone(),
            children: Vec::new(),
            initial: None,
            history,
            history_target: None,
            transitions: Vec::new(),
            entry: Vec::new(),
            exit: Vec::new(),
        });
        sources.push(config);

        let mut child_lineage = lineage;
        child_lineage.push(index);
        let children = config
            .states
            .iter()
            .map(|(child_key, child)| {
                let mut child_path = path.clone();
                child_path.push(child_key.clone());
                self.allocate(
                    child,
                    child_key.clone(),
                    child_path,
                    child_lineage.clone(),
                    nodes,
                    sources,
                )
            })
            .collect();
        nodes[index.0].children = children;

        index
    }

    fn default_id(&self, path: &[String]) -> String {
        std::iter::once(self.machine_key)
            .chain(path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(self.delimiter)
    }
}

fn infer_kind(config: &StateNodeConfig) -> NodeKind {
    if !config.states.is_empty() {
        NodeKind::Compound
    } else if config.history.is_some() {
        NodeKind::History
    } else {
        NodeKind::Atomic
    }
}

#[derive(Default)]
struct Compiled {
    initial: Option<NodeIndex>,
    history_target: Option<NodeIndex>,
    transitions: Vec<TransitionDef>,
    entry: Vec<ActionObject>,
    exit: Vec<ActionObject>,
}

struct Resolver<'d> {
    definition: &'d Definition,
}

impl Resolver<'_> {
    fn compile_node(
        &self,
        index: NodeIndex,
        config: &StateNodeConfig,
        order: &mut usize,
        checks: &mut Vec<Check>,
    ) -> Compiled {
        let node = self.definition.node(index);
        let mut compiled = Compiled::default();

        if let Some(violation) = self.structure_violation(node) {
            checks.push(Validation::fail(violation));
        }

        match node.kind {
            NodeKind::Compound => compiled.initial = self.resolve_initial(node, config, checks),
            NodeKind::History => {
                compiled.history_target = config
                    .target
                    .as_deref()
                    .and_then(|target| record(self.resolve_target(node, target), checks));
            }
            _ => {}
        }

        let mut emit = |matcher: EventMatcher, candidates: &TransitionsConfig| {
            for candidate in &candidates.0 {
                let targets = candidate
                    .target
                    .iter()
                    .filter_map(|target| record(self.resolve_target(node, target), checks))
                    .collect();
                let internal = candidate.internal.unwrap_or_else(|| {
                    candidate
                        .target
                        .iter()
                        .all(|target| target.starts_with(self.definition.delimiter.as_str()))
                });

                compiled.transitions.push(TransitionDef {
                    source: index,
                    matcher: matcher.clone(),
                    guard: candidate.guard.clone(),
                    targets,
                    internal,
                    actions: candidate.actions.clone(),
                    order: *order,
                });
                *order += 1;
            }
        };

        for (event, candidates) in &config.on {
            let matcher = match event.as_str() {
                WILDCARD => EventMatcher::Wildcard,
                NULL_EVENT => EventMatcher::Eventless,
                name => EventMatcher::Named(name.to_string()),
            };
            emit(matcher, candidates);
        }
        for (delay_key, candidates) in &config.after {
            emit(
                EventMatcher::Named(after_event(delay_key, &node.id)),
                candidates,
            );
        }
        let invocations: Vec<ActivityDef> = config
            .invoke
            .iter()
            .enumerate()
            .map(|(position, invoke)| ActivityDef {
                id: invoke
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{}:invocation[{}]", node.id, position)),
                src: invoke.src.clone(),
                kind: ActivityKind::Service,
            })
            .collect();
        for (invoke, service) in config.invoke.iter().zip(&invocations) {
            if let Some(on_done) = &invoke.on_done {
                emit(EventMatcher::Named(done_invoke_event(&service.id)), on_done);
            }
            if let Some(on_error) = &invoke.on_error {
                emit(EventMatcher::Named(error_invoke_event(&service.id)), on_error);
            }
        }
        if let Some(always) = &config.always {
            emit(EventMatcher::Eventless, always);
        }

        let activities = config.activities.iter().map(|name| ActivityDef {
            id: name.clone(),
            src: name.clone(),
            kind: ActivityKind::Activity,
        });
        let started: Vec<ActivityDef> = activities.chain(invocations).collect();

        compiled.entry = config.entry.clone();
        compiled.exit = config.exit.clone();
        for activity in started {
            compiled.entry.push(ActionObject::Start(activity.clone()));
            compiled.exit.push(ActionObject::Stop(activity));
        }
        for (delay_key, _) in &config.after {
            let event = after_event(delay_key, &node.id);
            compiled
                .entry
                .push(ActionObject::send_after(event.clone(), Delay::parse(delay_key)));
            compiled.exit.push(ActionObject::cancel(event));
        }

        compiled
    }

    fn structure_violation(&self, node: &StateNode) -> Option<ConfigurationError> {
        let invalid = |reason: &str| {
            Some(ConfigurationError::InvalidNode {
                node: node.id.clone(),
                reason: reason.to_string(),
            })
        };
        let has_regions = self.definition.regions(node.index).next().is_some();

        match node.kind {
            NodeKind::Compound if !has_regions => invalid("compound states need at least one child state"),
            NodeKind::Parallel if !has_regions => invalid("parallel states need at least one region"),
            NodeKind::Atomic | NodeKind::Final | NodeKind::History if !node.children.is_empty() => {
                invalid("only compound and parallel states can have child states")
            }
            NodeKind::History if node.parent.is_none() => invalid("a history state needs a parent"),
            _ => None,
        }
    }

    fn resolve_initial(
        &self,
        node: &StateNode,
        config: &StateNodeConfig,
        checks: &mut Vec<Check>,
    ) -> Option<NodeIndex> {
        // Without `initial` the node is only entered through explicit
        // targets; default completion reports it if it is ever needed.
        let initial = config.initial.as_deref()?;

        let resolved = self
            .definition
            .child_by_key(node.index, initial)
            .filter(|child| self.definition.node(*child).kind != NodeKind::History);
        if resolved.is_none() {
            checks.push(Validation::fail(ConfigurationError::UnknownInitialState {
                node: node.id.clone(),
                initial: initial.to_string(),
            }));
        }
        resolved
    }

    /// Resolve a target string as written on `source`.
    ///
    /// `#id` (optionally followed by a path) is absolute, a leading
    /// delimiter addresses the source's own children, and anything else is
    /// a path from the source's parent.
    fn resolve_target(&self, source: &StateNode, target: &str) -> Result<NodeIndex, ConfigurationError> {
        let definition = self.definition;
        let delimiter = definition.delimiter.as_str();

        let resolved = if let Some(reference) = target.strip_prefix('#') {
            self.resolve_reference(reference)
        } else if let Some(relative) = target.strip_prefix(delimiter) {
            definition.node_by_path(source.index, relative.split(delimiter))
        } else {
            let base = source.parent.unwrap_or(source.index);
            definition.node_by_path(base, target.split(delimiter))
        };

        resolved.ok_or_else(|| ConfigurationError::UnresolvedTarget {
            state: source.id.clone(),
            target: target.to_string(),
        })
    }

    /// `#id` or `#id.path.below`; the longest matching id wins.
    fn resolve_reference(&self, reference: &str) -> Option<NodeIndex> {
        let definition = self.definition;
        if let Some(index) = definition.ids.get(reference) {
            return Some(*index);
        }

        let delimiter = definition.delimiter.as_str();
        let segments: Vec<&str> = reference.split(delimiter).collect();
        (1..segments.len()).rev().find_map(|split| {
            let id = segments[..split].join(delimiter);
            definition
                .ids
                .get(&id)
                .and_then(|base| definition.node_by_path(*base, segments[split..].iter().copied()))
        })
    }
}

fn record<T>(result: Result<T, ConfigurationError>, checks: &mut Vec<Check>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(violation) => {
            checks.push(Validation::fail(violation));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{InvokeConfig, TransitionConfig};
    use crate::definition::HistoryKind;

    fn build(json: &str) -> Result<Definition, ConfigurationError> {
        Definition::build(StateNodeConfig::from_json(json).unwrap())
    }

    fn targets_of(definition: &Definition, id: &str) -> Vec<Vec<String>> {
        definition
            .get_by_id(id)
            .unwrap()
            .transitions
            .iter()
            .map(|t| {
                t.targets
                    .iter()
                    .map(|target| definition.node(*target).id.clone())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn ids_default_to_joined_paths() {
        let definition = build(
            r#"{ "id": "m", "initial": "a", "states": { "a": { "id": "custom" }, "b": {} } }"#,
        )
        .unwrap();

        assert_eq!(definition.id(), "m");
        assert!(definition.get_by_id("custom").is_some());
        assert!(definition.get_by_id("m.b").is_some());
    }

    #[test]
    fn anonymous_machines_get_a_placeholder_id() {
        let definition = build(r#"{ "initial": "a", "states": { "a": {} } }"#).unwrap();
        assert_eq!(definition.id(), ANONYMOUS_MACHINE);
    }

    #[test]
    fn custom_delimiters_shape_ids_and_targets() {
        let definition = build(
            r#"{
                "id": "m", "delimiter": "/", "initial": "a",
                "states": {
                    "a": { "on": { "GO": "b/b2" } },
                    "b": { "initial": "b1", "states": { "b1": {}, "b2": {} } }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(targets_of(&definition, "m/a"), vec![vec!["m/b/b2"]]);
    }

    #[test]
    fn targets_resolve_by_sibling_child_and_id() {
        let definition = build(
            r##"{
                "id": "m", "initial": "a",
                "states": {
                    "a": {
                        "initial": "a1",
                        "on": { "IN": ".a2", "OUT": "b", "DEEP": "#other.b1", "ID": "#m.b" },
                        "states": { "a1": {}, "a2": {} }
                    },
                    "b": { "id": "other", "initial": "b1", "states": { "b1": {} } }
                }
            }"##,
        )
        .unwrap();

        assert_eq!(
            targets_of(&definition, "m.a"),
            vec![vec!["m.a.a2"], vec!["other"], vec!["m.b.b1"], vec!["other"]]
        );
    }

    #[test]
    fn internal_defaults_follow_target_shape() {
        let definition = build(
            r#"{
                "id": "m", "initial": "a",
                "states": {
                    "a": {
                        "initial": "a1",
                        "on": {
                            "CHILD": ".a2",
                            "SIBLING": "b",
                            "NONE": { "actions": "log" },
                            "FORCED": { "target": ".a2", "internal": false }
                        },
                        "states": { "a1": {}, "a2": {} }
                    },
                    "b": {}
                }
            }"#,
        )
        .unwrap();

        let internal: Vec<bool> = definition
            .get_by_id("m.a")
            .unwrap()
            .transitions
            .iter()
            .map(|t| t.internal)
            .collect();
        assert_eq!(internal, vec![true, false, true, false]);
    }

    #[test]
    fn transition_order_is_global_document_order() {
        let definition = build(
            r#"{
                "id": "m", "initial": "a", "on": { "ROOT": "a" },
                "states": {
                    "a": { "on": { "X": "b", "Y": "b" }, "always": { "target": "b", "cond": "never" } },
                    "b": { "on": { "X": "a" } }
                }
            }"#,
        )
        .unwrap();

        let orders: Vec<(String, usize)> = definition
            .nodes()
            .iter()
            .flat_map(|n| n.transitions.iter().map(move |t| (n.id.clone(), t.order)))
            .collect();
        assert_eq!(
            orders,
            vec![
                ("m".to_string(), 0),
                ("m.a".to_string(), 1),
                ("m.a".to_string(), 2),
                ("m.a".to_string(), 3),
                ("m.b".to_string(), 4),
            ]
        );
        assert_eq!(
            definition.get_by_id("m.a").unwrap().transitions[2].matcher,
            EventMatcher::Eventless
        );
    }

    #[test]
    fn wildcard_and_empty_keys_compile_to_matchers() {
        let definition = build(
            r#"{ "id": "m", "initial": "a", "states": { "a": { "on": { "*": "b", "": "b" } }, "b": {} } }"#,
        )
        .unwrap();

        let matchers: Vec<EventMatcher> = definition
            .get_by_id("m.a")
            .unwrap()
            .transitions
            .iter()
            .map(|t| t.matcher.clone())
            .collect();
        assert_eq!(matchers, vec![EventMatcher::Wildcard, EventMatcher::Eventless]);
        assert!(definition.events().is_empty());
    }

    #[test]
    fn delayed_transitions_expand_into_send_and_cancel() {
        let config = StateNodeConfig::machine("m")
            .initial("a")
            .state("a", StateNodeConfig::new().after(1000u64, "b"))
            .state("b", StateNodeConfig::new());
        let definition = Definition::build(config).unwrap();
        let a = definition.get_by_id("m.a").unwrap();

        let event = "xstate.after(1000)#m.a";
        assert_eq!(a.entry, vec![ActionObject::send_after(event, 1000u64)]);
        assert_eq!(a.exit, vec![ActionObject::cancel(event)]);
        assert_eq!(a.transitions[0].matcher, EventMatcher::Named(event.to_string()));
        assert!(definition.events().contains(event));
    }

    #[test]
    fn invocations_expand_into_start_stop_and_completion_transitions() {
        let config = StateNodeConfig::machine("m")
            .initial("loading")
            .state(
                "loading",
                StateNodeConfig::new()
                    .entry("show")
                    .activity("spinner")
                    .invoke(InvokeConfig::new("fetch").on_done("done").on_error("failed")),
            )
            .state("done", StateNodeConfig::new())
            .state("failed", StateNodeConfig::new());
        let definition = Definition::build(config).unwrap();
        let loading = definition.get_by_id("m.loading").unwrap();

        let service = ActivityDef {
            id: "m.loading:invocation[0]".to_string(),
            src: "fetch".to_string(),
            kind: ActivityKind::Service,
        };
        let spinner = ActivityDef {
            id: "spinner".to_string(),
            src: "spinner".to_string(),
            kind: ActivityKind::Activity,
        };
        assert_eq!(
            loading.entry,
            vec![
                ActionObject::named("show"),
                ActionObject::Start(spinner.clone()),
                ActionObject::Start(service.clone()),
            ]
        );
        assert_eq!(
            loading.exit,
            vec![ActionObject::Stop(spinner), ActionObject::Stop(service)]
        );

        let events: Vec<&str> = loading.events().collect();
        assert_eq!(
            events,
            vec![
                "done.invoke.m.loading:invocation[0]",
                "error.platform.m.loading:invocation[0]"
            ]
        );
    }

    #[test]
    fn history_nodes_resolve_their_default_target() {
        let definition = build(
            r#"{
                "id": "m", "initial": "a",
                "states": {
                    "a": { "initial": "a1", "states": { "a1": {}, "a2": {}, "hist": { "history": "deep", "target": "a2" } } }
                }
            }"#,
        )
        .unwrap();

        let hist = definition.get_by_id("m.a.hist").unwrap();
        assert_eq!(hist.kind, NodeKind::History);
        assert_eq!(hist.history, Some(HistoryKind::Deep));
        assert_eq!(hist.history_target.map(|t| definition.node(t).id.clone()), Some("m.a.a2".to_string()));
    }

    #[test]
    fn every_violation_is_reported() {
        let error = build(
            r#"{
                "id": "m", "initial": "a",
                "states": {
                    "a": { "on": { "GO": "nowhere" } },
                    "c": { "initial": "zz", "states": { "c1": {} } },
                    "p": { "type": "parallel" }
                }
            }"#,
        )
        .unwrap_err();

        let violations = error.violations();
        assert_eq!(violations.len(), 3);
        assert!(violations
            .iter()
            .any(|e| matches!(e, ConfigurationError::UnresolvedTarget { target, .. } if target == "nowhere")));
        assert!(violations
            .iter()
            .any(|e| matches!(e, ConfigurationError::UnknownInitialState { initial, .. } if initial == "zz")));
        assert!(violations
            .iter()
            .any(|e| matches!(e, ConfigurationError::InvalidNode { node, .. } if node == "m.p")));
    }

    #[test]
    fn compounds_may_omit_their_initial_state() {
        let definition = build(r#"{ "strict": true, "states": { "a": { "on": { "GO": "b" } }, "b": {} } }"#).unwrap();

        assert_eq!(definition.id(), ANONYMOUS_MACHINE);
        assert_eq!(definition.root().kind, NodeKind::Compound);
        assert_eq!(definition.root().initial, None);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let error = build(
            r#"{ "id": "m", "initial": "a", "states": { "a": { "id": "x" }, "b": { "id": "x" } } }"#,
        )
        .unwrap_err();

        assert_eq!(error, ConfigurationError::DuplicateId { id: "x".to_string() });
    }

    #[test]
    fn leaf_kinds_cannot_have_children() {
        let config = StateNodeConfig::machine("m").initial("a").state(
            "a",
            StateNodeConfig::new()
                .final_state()
                .state("inner", StateNodeConfig::new()),
        );

        assert!(matches!(
            Definition::build(config),
            Err(ConfigurationError::InvalidNode { node, .. }) if node == "m.a"
        ));
    }

    #[test]
    fn empty_delimiter_is_rejected() {
        let config = StateNodeConfig::machine("m").delimiter("");
        assert!(matches!(
            Definition::build(config),
            Err(ConfigurationError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn atomic_roots_compile() {
        let config = StateNodeConfig::machine("m").on("PING", TransitionConfig::new().action("pong"));
        let definition = Definition::build(config).unwrap();

        assert_eq!(definition.root().kind, NodeKind::Atomic);
        assert!(definition.accepts(&crate::core::Event::new("PING")));
    }
}
