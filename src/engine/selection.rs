//! Transition selection.
//!
//! Selection walks every active atomic node's ancestor chain innermost
//! first and takes the first enabled candidate on that chain. Chains in
//! different parallel regions each contribute one transition; conflicts
//! between the contributions are then removed by comparing exit sets.

use crate::core::{Configuration, Event, GuardRef, NodeIndex};
use crate::definition::{EventMatcher, NodeKind, TransitionDef};
use crate::engine::Engine;
use crate::error::ConfigurationError;
use serde_json::Value;
use std::iter;
use tracing::trace;

impl<'m> Engine<'m> {
    /// Enabled, conflict-free transitions in document order.
    ///
    /// With `eventless` set only eventless candidates are considered; guards
    /// still see `event`, the event that started the macrostep.
    pub(crate) fn select(
        &self,
        configuration: &Configuration,
        context: &Value,
        event: &Event,
        eventless: bool,
    ) -> Result<Vec<&'m TransitionDef>, ConfigurationError> {
        let definition = self.definition;
        let mut enabled: Vec<&'m TransitionDef> = Vec::new();

        let atomic = configuration
            .iter()
            .filter(|index| definition.node(*index).is_leaf());
        for leaf in atomic {
            for index in iter::once(leaf).chain(definition.ancestors(leaf)) {
                if let Some(transition) = self.first_enabled(index, context, event, eventless)? {
                    if !enabled.iter().any(|t| t.order == transition.order) {
                        enabled.push(transition);
                    }
                    break;
                }
            }
        }

        enabled.sort_by_key(|transition| transition.order);
        Ok(self.remove_conflicts(configuration, enabled))
    }

    fn first_enabled(
        &self,
        index: NodeIndex,
        context: &Value,
        event: &Event,
        eventless: bool,
    ) -> Result<Option<&'m TransitionDef>, ConfigurationError> {
        let definition = self.definition;
        let transitions = &definition.node(index).transitions;
        let candidates: Vec<&'m TransitionDef> = if eventless {
            transitions
                .iter()
                .filter(|t| t.matcher == EventMatcher::Eventless)
                .collect()
        } else {
            let exact = transitions
                .iter()
                .filter(|t| t.matcher.event_name() == Some(event.name.as_str()));
            let wildcard = transitions
                .iter()
                .filter(|t| t.matcher == EventMatcher::Wildcard);
            exact.chain(wildcard).collect()
        };

        for candidate in candidates {
            if self.guard_passes(candidate, context, event)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    fn guard_passes(
        &self,
        transition: &TransitionDef,
        context: &Value,
        event: &Event,
    ) -> Result<bool, ConfigurationError> {
        let Some(guard) = &transition.guard else {
            return Ok(true);
        };
        let passed = match guard {
            GuardRef::Inline(predicate) => predicate.check(context, event),
            GuardRef::Named(name) => self
                .options
                .guards
                .get(name)
                .ok_or_else(|| ConfigurationError::UnknownGuard {
                    name: guard.name().to_string(),
                })?
                .check(context, event),
        };
        trace!(guard = guard.name(), event = %event.name, passed, "statechart_guard_evaluated");
        Ok(passed)
    }

    /// Transition domain: the node whose active descendants are exited.
    ///
    /// `None` means the transition leaves the whole configuration (a target
    /// outside every proper ancestor of the source, such as the root).
    pub(crate) fn domain(&self, transition: &TransitionDef) -> Option<NodeIndex> {
        let definition = self.definition;
        let source = transition.source;
        let within = |ancestor: NodeIndex| {
            transition
                .targets
                .iter()
                .all(|target| definition.is_descendant(*target, ancestor))
        };

        let container = matches!(
            definition.node(source).kind,
            NodeKind::Compound | NodeKind::Parallel
        );
        if transition.internal && container && within(source) {
            return Some(source);
        }
        definition.ancestors(source).find(|ancestor| within(*ancestor))
    }

    /// Active nodes a transition exits, in document order.
    pub(crate) fn exit_set(&self, configuration: &Configuration, transition: &TransitionDef) -> Vec<NodeIndex> {
        if transition.is_targetless() {
            return Vec::new();
        }
        let definition = self.definition;
        let Some(domain) = self.domain(transition) else {
            return configuration.iter().collect();
        };

        let inside = |node: NodeIndex, ancestor: NodeIndex| {
            node == ancestor || definition.is_descendant(node, ancestor)
        };
        let scope: Vec<NodeIndex> = if definition.node(domain).kind == NodeKind::Parallel {
            definition
                .regions(domain)
                .filter(|region| {
                    iter::once(&transition.source)
                        .chain(&transition.targets)
                        .any(|node| inside(*node, *region))
                })
                .collect()
        } else {
            vec![domain]
        };

        configuration
            .iter()
            .filter(|node| {
                definition.is_descendant(*node, domain)
                    && scope.iter().any(|root| inside(*node, *root))
            })
            .collect()
    }

    /// Drop transitions whose exit sets intersect an already kept one.
    ///
    /// A transition from a descendant of the other's source preempts it;
    /// otherwise the earlier transition in document order wins.
    fn remove_conflicts(
        &self,
        configuration: &Configuration,
        enabled: Vec<&'m TransitionDef>,
    ) -> Vec<&'m TransitionDef> {
        let mut kept: Vec<(&'m TransitionDef, Vec<NodeIndex>)> = Vec::new();

        for transition in enabled {
            let exits = self.exit_set(configuration, transition);
            let mut preempted = Vec::new();
            let mut blocked = false;

            for (position, (other, other_exits)) in kept.iter().enumerate() {
                if !exits.iter().any(|node| other_exits.contains(node)) {
                    continue;
                }
                if self.definition.is_descendant(transition.source, other.source) {
                    preempted.push(position);
                } else {
                    blocked = true;
                    break;
                }
            }

            if !blocked {
                for position in preempted.into_iter().rev() {
                    kept.remove(position);
                }
                kept.push((transition, exits));
            }
        }

        kept.into_iter().map(|(transition, _)| transition).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::StateNodeConfig;
    use crate::core::{Configuration, Event, Guard};
    use crate::definition::Definition;
    use crate::engine::configuration::resolve_value;
    use crate::engine::Engine;
    use crate::error::ConfigurationError;
    use crate::machine::MachineOptions;
    use serde_json::{json, Value};

    fn definition(json: &str) -> Definition {
        Definition::build(StateNodeConfig::from_json(json).unwrap()).unwrap()
    }

    fn at(definition: &Definition, value: Value) -> Configuration {
        resolve_value(definition, &serde_json::from_value(value).unwrap()).unwrap()
    }

    fn selected_sources(
        definition: &Definition,
        options: &MachineOptions,
        configuration: &Configuration,
        event: &str,
    ) -> Vec<String> {
        let engine = Engine::new(definition, options);
        engine
            .select(configuration, &Value::Null, &Event::new(event), false)
            .unwrap()
            .into_iter()
            .map(|t| definition.node(t.source).id.clone())
            .collect()
    }

    #[test]
    fn innermost_handler_wins_on_a_chain() {
        let definition = definition(
            r#"{
                "id": "m", "initial": "a", "on": { "GO": "b" },
                "states": {
                    "a": { "initial": "a1", "on": { "GO": "b" }, "states": { "a1": { "on": { "GO": "a2" } }, "a2": {} } },
                    "b": {}
                }
            }"#,
        );
        let options = MachineOptions::default();
        let configuration = at(&definition, json!({ "a": "a1" }));

        assert_eq!(
            selected_sources(&definition, &options, &configuration, "GO"),
            vec!["m.a.a1"]
        );
    }

    #[test]
    fn exact_names_beat_wildcards_on_the_same_node() {
        let definition = definition(
            r#"{ "id": "m", "initial": "a", "states": { "a": { "on": { "*": "c", "GO": "b" } }, "b": {}, "c": {} } }"#,
        );
        let options = MachineOptions::default();
        let configuration = at(&definition, json!("a"));
        let engine = Engine::new(&definition, &options);

        let go = engine
            .select(&configuration, &Value::Null, &Event::new("GO"), false)
            .unwrap();
        assert_eq!(definition.node(go[0].targets[0]).key, "b");

        let other = engine
            .select(&configuration, &Value::Null, &Event::new("OTHER"), false)
            .unwrap();
        assert_eq!(definition.node(other[0].targets[0]).key, "c");
    }

    #[test]
    fn parallel_regions_each_contribute() {
        let definition = definition(
            r#"{
                "id": "m", "type": "parallel",
                "states": {
                    "X": { "initial": "x1", "states": { "x1": { "on": { "GO": "x2" } }, "x2": {} } },
                    "Y": { "initial": "y1", "states": { "y1": { "on": { "GO": "y2" } }, "y2": {} } }
                }
            }"#,
        );
        let options = MachineOptions::default();
        let configuration = at(&definition, json!({}));

        assert_eq!(
            selected_sources(&definition, &options, &configuration, "GO"),
            vec!["m.X.x1", "m.Y.y1"]
        );
    }

    #[test]
    fn conflicting_transitions_keep_the_earlier_one() {
        let definition = definition(
            r##"{
                "id": "m", "initial": "p",
                "states": {
                    "p": {
                        "type": "parallel",
                        "states": {
                            "X": { "initial": "x1", "states": { "x1": { "on": { "GO": "#m.done" } } } },
                            "Y": { "initial": "y1", "states": { "y1": { "on": { "GO": "#m.other" } } } }
                        }
                    },
                    "done": {},
                    "other": {}
                }
            }"##,
        );
        let options = MachineOptions::default();
        let configuration = at(&definition, json!({ "p": {} }));

        assert_eq!(
            selected_sources(&definition, &options, &configuration, "GO"),
            vec!["m.p.X.x1"]
        );
    }

    #[test]
    fn named_guards_resolve_through_options() {
        let definition = definition(
            r#"{
                "id": "m", "initial": "a",
                "states": { "a": { "on": { "GO": [{ "target": "b", "cond": "never" }, { "target": "c" }] } }, "b": {}, "c": {} }
            }"#,
        );
        let configuration = at(&definition, json!("a"));

        let options = MachineOptions::new().guard("never", |_, _| false);
        let engine = Engine::new(&definition, &options);
        let selected = engine
            .select(&configuration, &Value::Null, &Event::new("GO"), false)
            .unwrap();
        assert_eq!(definition.node(selected[0].targets[0]).key, "c");

        let missing = MachineOptions::default();
        let engine = Engine::new(&definition, &missing);
        assert_eq!(
            engine
                .select(&configuration, &Value::Null, &Event::new("GO"), false)
                .unwrap_err(),
            ConfigurationError::UnknownGuard {
                name: "never".to_string()
            }
        );
    }

    #[test]
    fn inline_guards_see_context_and_event() {
        let config = StateNodeConfig::machine("m")
            .initial("a")
            .state(
                "a",
                StateNodeConfig::new().on(
                    "GO",
                    crate::builder::TransitionConfig::to("b")
                        .guard(Guard::new(|context, event| context["ok"] == json!(true) && event.payload.is_null())),
                ),
            )
            .state("b", StateNodeConfig::new());
        let definition = Definition::build(config).unwrap();
        let options = MachineOptions::default();
        let engine = Engine::new(&definition, &options);
        let configuration = at(&definition, json!("a"));

        let pass = engine
            .select(&configuration, &json!({ "ok": true }), &Event::new("GO"), false)
            .unwrap();
        let fail = engine
            .select(&configuration, &json!({ "ok": false }), &Event::new("GO"), false)
            .unwrap();
        assert_eq!(pass.len(), 1);
        assert!(fail.is_empty());
    }

    #[test]
    fn exit_sets_are_bounded_by_the_domain() {
        let definition = definition(
            r#"{
                "id": "m", "initial": "a",
                "states": {
                    "a": {
                        "initial": "a1",
                        "on": { "INNER": ".a2", "OUTER": "b" },
                        "states": { "a1": { "on": { "SIB": "a2" } }, "a2": {} }
                    },
                    "b": {}
                }
            }"#,
        );
        let options = MachineOptions::default();
        let engine = Engine::new(&definition, &options);
        let configuration = at(&definition, json!({ "a": "a1" }));
        let exits = |source: &str, event: &str| {
            let node = definition.get_by_id(source).unwrap();
            let transition = node
                .transitions
                .iter()
                .find(|t| t.matcher.event_name() == Some(event))
                .unwrap();
            let exited: Configuration = engine.exit_set(&configuration, transition).into_iter().collect();
            definition.node_ids(&exited)
        };

        assert_eq!(exits("m.a", "INNER"), vec!["m.a.a1"]);
        assert_eq!(exits("m.a", "OUTER"), vec!["m.a", "m.a.a1"]);
        assert_eq!(exits("m.a.a1", "SIB"), vec!["m.a.a1"]);
    }

    #[test]
    fn parallel_domains_only_exit_touched_regions() {
        let definition = definition(
            r##"{
                "id": "m", "type": "parallel",
                "states": {
                    "X": { "initial": "x1", "states": { "x1": { "on": { "GO": "#m.Y.y2" } }, "x2": {} } },
                    "Y": { "initial": "y1", "states": { "y1": {}, "y2": {} } },
                    "Z": { "initial": "z1", "states": { "z1": {} } }
                }
            }"##,
        );
        let options = MachineOptions::default();
        let engine = Engine::new(&definition, &options);
        let configuration = at(&definition, json!({}));
        let x1 = definition.get_by_id("m.X.x1").unwrap();

        let exits: Configuration = engine
            .exit_set(&configuration, &x1.transitions[0])
            .into_iter()
            .collect();
        assert_eq!(
            definition.node_ids(&exits),
            vec!["m.X", "m.X.x1", "m.Y", "m.Y.y1"]
        );
    }
}
