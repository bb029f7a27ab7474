//! Compiled state nodes and transitions.

use crate::core::{ActionObject, GuardRef, NodeIndex};
use serde::{Deserialize, Serialize};

/// Kind of a state node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Atomic,
    Compound,
    Parallel,
    History,
    Final,
}

/// How much of a parent's configuration a history node restores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    /// The direct child that was active, re-entered through its defaults.
    #[default]
    Shallow,
    /// Every atomic descendant that was active.
    Deep,
}

/// What a transition listens for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventMatcher {
    Named(String),
    Wildcard,
    Eventless,
}

impl EventMatcher {
    pub fn event_name(&self) -> Option<&str> {
        match self {
            EventMatcher::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// A compiled transition.
#[derive(Clone, Debug)]
pub struct TransitionDef {
    pub source: NodeIndex,
    pub matcher: EventMatcher,
    pub guard: Option<GuardRef>,
    /// Resolved targets; empty for targetless transitions.
    pub targets: Vec<NodeIndex>,
    /// Internal transitions do not exit their source when every target is a
    /// descendant of it. Targetless transitions are always internal.
    pub internal: bool,
    pub actions: Vec<ActionObject>,
    /// Machine-wide document order of the transition.
    pub order: usize,
}

impl TransitionDef {
    pub fn is_targetless(&self) -> bool {
        self.targets.is_empty()
    }
}

/// A node of the compiled definition arena.
#[derive(Clone, Debug)]
pub struct StateNode {
    /// Document-order position; also the arena index.
    pub index: NodeIndex,
    pub id: String,
    pub key: String,
    /// Keys from the root (exclusive) down to this node.
    pub path: Vec<String>,
    pub kind: NodeKind,
    pub parent: Option<NodeIndex>,
    /// Ancestor indices, root first. Ancestor walks read this array.
    pub lineage: Vec<NodeIndex>,
    pub children: Vec<NodeIndex>,
    pub initial: Option<NodeIndex>,
    pub history: Option<HistoryKind>,
    /// Default target of a history node.
    pub history_target: Option<NodeIndex>,
    pub transitions: Vec<TransitionDef>,
    pub entry: Vec<ActionObject>,
    pub exit: Vec<ActionObject>,
}

impl StateNode {
    pub fn depth(&self) -> usize {
        self.lineage.len()
    }

    /// Atomic and final nodes are leaves of a configuration.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Atomic | NodeKind::Final)
    }

    pub fn is_final(&self) -> bool {
        self.kind == NodeKind::Final
    }

    /// Event names this node declares transitions for.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.transitions
            .iter()
            .filter_map(|transition| transition.matcher.event_name())
    }
}
