//! One microstep: exit, transition actions, entry.

use crate::core::{ActionObject, Configuration, Event, HistoryRecord, NodeIndex};
use crate::definition::{HistoryKind, NodeKind, TransitionDef};
use crate::engine::configuration::{complete, is_in_final};
use crate::engine::Engine;
use crate::error::ConfigurationError;
use serde_json::Value;
use std::collections::BTreeSet;

/// The parts of a machine state a microstep reads and produces.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Snapshot {
    pub(crate) configuration: Configuration,
    pub(crate) context: Value,
    pub(crate) history: HistoryRecord,
}

/// Result of a microstep.
#[derive(Clone, Debug)]
pub(crate) struct Step {
    pub(crate) snapshot: Snapshot,
    /// Emitted descriptors: exits, transition actions, entries.
    pub(crate) actions: Vec<ActionObject>,
    /// Internal events queued by `raise` and by entered final states.
    pub(crate) raised: Vec<Event>,
}

impl Engine<'_> {
    /// Apply a conflict-free transition set to `from`.
    ///
    /// An empty set yields `from` unchanged with no actions. Entering a
    /// compound node that has no `initial` and no explicit target child fails.
    pub(crate) fn microstep(
        &self,
        from: &Snapshot,
        transitions: &[&TransitionDef],
        event: &Event,
    ) -> Result<Step, ConfigurationError> {
        let definition = self.definition;
        let exits: BTreeSet<NodeIndex> = transitions
            .iter()
            .flat_map(|transition| self.exit_set(&from.configuration, transition))
            .collect();

        let history = exits
            .iter()
            .filter(|node| definition.has_history_children(**node))
            .fold(from.history.clone(), |history, node| {
                let descendants = from
                    .configuration
                    .iter()
                    .filter(|active| definition.is_descendant(*active, *node))
                    .collect();
                history.record(*node, descendants)
            });

        let remaining = from.configuration.iter().filter(|node| !exits.contains(node));
        let targets: Vec<NodeIndex> = transitions
            .iter()
            .flat_map(|transition| transition.targets.iter())
            .flat_map(|target| self.entry_targets(*target, &history))
            .collect();
        let configuration = complete(definition, remaining.chain(targets))?;

        let entered: Vec<NodeIndex> = configuration
            .iter()
            .filter(|node| !from.configuration.contains(*node) || exits.contains(node))
            .collect();

        let descriptors = exits
            .iter()
            .rev()
            .flat_map(|node| definition.node(*node).exit.iter())
            .chain(transitions.iter().flat_map(|transition| transition.actions.iter()))
            .chain(entered.iter().flat_map(|node| definition.node(*node).entry.iter()));
        let (context, actions, mut raised) = execute(descriptors, from.context.clone(), event);
        raised.extend(self.done_events(&entered, &configuration));

        Ok(Step {
            snapshot: Snapshot {
                configuration,
                context,
                history,
            },
            actions,
            raised,
        })
    }

    /// Enter the default configuration from nothing.
    pub(crate) fn enter_initial(&self, context: Value, event: &Event) -> Result<Step, ConfigurationError> {
        let definition = self.definition;
        let configuration = complete(definition, [definition.root().index])?;
        let entered: Vec<NodeIndex> = configuration.iter().collect();

        let descriptors = entered
            .iter()
            .flat_map(|node| definition.node(*node).entry.iter());
        let (context, actions, mut raised) = execute(descriptors, context, event);
        raised.extend(self.done_events(&entered, &configuration));

        Ok(Step {
            snapshot: Snapshot {
                configuration,
                context,
                history: HistoryRecord::new(),
            },
            actions,
            raised,
        })
    }

    /// Real nodes to enter for a target; history nodes are expanded from the
    /// record, their default target, or their parent's defaults.
    fn entry_targets(&self, target: NodeIndex, history: &HistoryRecord) -> Vec<NodeIndex> {
        let definition = self.definition;
        let node = definition.node(target);
        let Some(parent) = node.parent.filter(|_| node.kind == NodeKind::History) else {
            return vec![target];
        };

        match history.get(parent) {
            Some(recorded) => recorded
                .iter()
                .copied()
                .filter(|active| match node.history.unwrap_or_default() {
                    HistoryKind::Shallow => definition.node(*active).parent == Some(parent),
                    HistoryKind::Deep => definition.node(*active).is_leaf(),
                })
                .collect(),
            None => match node.history_target {
                Some(default) if definition.node(default).kind != NodeKind::History => vec![default],
                _ => vec![parent],
            },
        }
    }

    /// `done.state.<id>` for the parent of each entered final node, and for
    /// parallel grandparents whose regions are now all final.
    fn done_events(&self, entered: &[NodeIndex], configuration: &Configuration) -> Vec<Event> {
        let definition = self.definition;
        let mut raised: Vec<Event> = Vec::new();
        let mut raise = |node: NodeIndex| {
            let name = format!("done.state.{}", definition.node(node).id);
            if !raised.iter().any(|event| event.name == name) {
                raised.push(Event::internal(name));
            }
        };

        for node in entered.iter().filter(|node| definition.node(**node).is_final()) {
            let Some(parent) = definition.node(*node).parent else {
                continue;
            };
            raise(parent);
            if let Some(grandparent) = definition.node(parent).parent {
                if definition.node(grandparent).kind == NodeKind::Parallel
                    && is_in_final(definition, configuration, grandparent)
                {
                    raise(grandparent);
                }
            }
        }
        raised
    }
}

/// Run descriptors in order: assigns fold into the context, raises queue
/// internal events, and everything else is emitted.
fn execute<'a>(
    descriptors: impl Iterator<Item = &'a ActionObject>,
    mut context: Value,
    event: &Event,
) -> (Value, Vec<ActionObject>, Vec<Event>) {
    let mut actions = Vec::new();
    let mut raised = Vec::new();

    for descriptor in descriptors {
        match descriptor {
            ActionObject::Assign(update) => context = update(&context, event),
            ActionObject::Raise { event: name } => raised.push(Event::internal(name.clone())),
            other => actions.push(other.clone()),
        }
    }
    (context, actions, raised)
}
