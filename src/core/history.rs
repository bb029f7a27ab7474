//! Recorded history for history pseudo-states.
//!
//! When a node that owns history children is exited, the active descendants
//! it had at that moment are recorded. Re-entering one of its history nodes
//! restores from this record instead of the default initial chain.

use super::configuration::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable map from a parent node to the descendants active when it was
/// last exited.
///
/// Like every other part of a machine state, the record is never mutated in
/// place: [`HistoryRecord::record`] returns a new value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    entries: BTreeMap<NodeIndex, Vec<NodeIndex>>,
}

impl HistoryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the active descendants of `parent`, returning a new record.
    pub fn record(&self, parent: NodeIndex, descendants: Vec<NodeIndex>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(parent, descendants);
        Self { entries }
    }

    /// Descendants of `parent` active at its last exit, in document order.
    pub fn get(&self, parent: NodeIndex) -> Option<&[NodeIndex]> {
        self.entries.get(&parent).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All recorded entries, ordered by parent.
    pub fn entries(&self) -> impl Iterator<Item = (NodeIndex, &[NodeIndex])> {
        self.entries
            .iter()
            .map(|(parent, nodes)| (*parent, nodes.as_slice()))
    }
}

impl FromIterator<(NodeIndex, Vec<NodeIndex>)> for HistoryRecord {
    fn from_iter<I: IntoIterator<Item = (NodeIndex, Vec<NodeIndex>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
