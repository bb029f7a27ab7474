//! Compiled statechart definitions.
//!
//! A [`Definition`] is the immutable, arena-backed form of a
//! [`StateNodeConfig`](crate::builder::StateNodeConfig): nodes live in a
//! flat vector in document order and refer to each other by
//! [`NodeIndex`](crate::core::NodeIndex). Every id, target and initial state
//! is resolved once, when the definition is built.

mod compile;
mod node;
mod tree;

pub use node::{EventMatcher, HistoryKind, NodeKind, StateNode, TransitionDef};
pub use tree::Definition;
