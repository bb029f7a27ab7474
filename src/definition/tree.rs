//! The immutable definition arena and its derived index.

use crate::builder::StateNodeConfig;
use crate::core::{Configuration, Event, NodeIndex};
use crate::definition::compile;
use crate::definition::node::{NodeKind, StateNode};
use crate::error::ConfigurationError;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Compiled, immutable statechart definition.
///
/// Nodes are stored in document order, so a [`NodeIndex`] doubles as the
/// pre-order position. The id table and the accepted-event set are derived
/// once at construction; nothing here changes afterwards, which makes a
/// `Definition` freely shareable across threads.
#[derive(Clone, Debug)]
pub struct Definition {
    pub(crate) id: String,
    pub(crate) nodes: Vec<StateNode>,
    pub(crate) ids: HashMap<String, NodeIndex>,
    pub(crate) events: BTreeSet<String>,
    pub(crate) strict: bool,
    pub(crate) delimiter: String,
    pub(crate) version: Option<String>,
    pub(crate) context: Value,
}

impl Definition {
    /// Compile a declarative definition.
    pub fn build(config: StateNodeConfig) -> Result<Self, ConfigurationError> {
        compile::compile(config)
    }

    /// Machine id (the root node's id).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Default context declared by the definition.
    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn root(&self) -> &StateNode {
        &self.nodes[0]
    }

    pub fn node(&self, index: NodeIndex) -> &StateNode {
        &self.nodes[index.0]
    }

    /// All nodes in document order.
    pub fn nodes(&self) -> &[StateNode] {
        &self.nodes
    }

    pub fn get_by_id(&self, id: &str) -> Option<&StateNode> {
        self.ids.get(id).map(|index| self.node(*index))
    }

    /// Every event name some node declares a transition for.
    pub fn events(&self) -> &BTreeSet<String> {
        &self.events
    }

    /// Whether a strict machine accepts `event`: some node declares it, or
    /// it is a built-in control event.
    pub fn accepts(&self, event: &Event) -> bool {
        event.is_builtin() || self.events.contains(&event.name)
    }

    /// Proper ancestors of `node`, innermost first.
    pub fn ancestors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.node(node).lineage.iter().rev().copied()
    }

    /// Whether `node` is a proper descendant of `ancestor`.
    pub fn is_descendant(&self, node: NodeIndex, ancestor: NodeIndex) -> bool {
        let depth = self.node(ancestor).depth();
        self.node(node).lineage.get(depth) == Some(&ancestor)
    }

    pub fn child_by_key(&self, parent: NodeIndex, key: &str) -> Option<NodeIndex> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|child| self.node(*child).key == key)
    }

    /// Walk `keys` down from `from`.
    pub fn node_by_path<'k>(
        &self,
        from: NodeIndex,
        keys: impl IntoIterator<Item = &'k str>,
    ) -> Option<NodeIndex> {
        keys.into_iter()
            .try_fold(from, |node, key| self.child_by_key(node, key))
    }

    /// Children that take part in configurations (history nodes excluded).
    pub fn regions(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.node(node)
            .children
            .iter()
            .copied()
            .filter(|child| self.node(*child).kind != NodeKind::History)
    }

    pub fn has_history_children(&self, node: NodeIndex) -> bool {
        self.node(node)
            .children
            .iter()
            .any(|child| self.node(*child).kind == NodeKind::History)
    }

    /// Ids of the nodes in a configuration, in document order.
    pub fn node_ids(&self, configuration: &Configuration) -> Vec<String> {
        configuration
            .iter()
            .map(|index| self.node(index).id.clone())
            .collect()
    }
}
