//! Sets of active state nodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Arena index of a state node. Equal to the node's document-order position,
/// so sorting indices sorts nodes in pre-order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    /// Document-order position of the node.
    pub fn get(self) -> usize {
        self.0
    }
}

/// The set of currently active nodes.
///
/// Configurations produced by the engine are closed under ancestors and
/// complete across parallel regions. Iteration is in document order, which
/// puts parents before their children.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(BTreeSet<NodeIndex>);

impl Configuration {
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.0.contains(&node)
    }

    /// Active nodes in document order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NodeIndex> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, node: NodeIndex) -> bool {
        self.0.insert(node)
    }
}

impl FromIterator<NodeIndex> for Configuration {
    fn from_iter<I: IntoIterator<Item = NodeIndex>>(iter: I) -> Self {
        Configuration(iter.into_iter().collect())
    }
}
