//! Configurations and state values.
//!
//! A configuration is the flat set of active nodes; a [`StateValue`] is the
//! nested view of the same fact. Both directions go through this module, as
//! does default completion: closing a node set under ancestors and filling
//! compound and parallel nodes from their defaults.

use crate::core::{Configuration, NodeIndex, StateValue};
use crate::definition::{Definition, NodeKind};
use crate::error::ConfigurationError;
use std::collections::BTreeMap;
use std::iter;

/// Close `nodes` under ancestors, then fill defaults: a compound node with no
/// active child gets its initial child, a parallel node gets every region.
///
/// History nodes must already be resolved to real targets. A compound node
/// that needs its default but declares no `initial` is a
/// [`ConfigurationError::MissingInitialState`].
pub(crate) fn complete(
    definition: &Definition,
    nodes: impl IntoIterator<Item = NodeIndex>,
) -> Result<Configuration, ConfigurationError> {
    let mut configuration = Configuration::default();
    for node in nodes {
        configuration.insert(node);
        for ancestor in definition.ancestors(node) {
            if !configuration.insert(ancestor) {
                break;
            }
        }
    }

    let mut pending: Vec<NodeIndex> = configuration.iter().collect();
    while let Some(index) = pending.pop() {
        let node = definition.node(index);
        match node.kind {
            NodeKind::Compound => {
                let has_active_child = node
                    .children
                    .iter()
                    .any(|child| configuration.contains(*child));
                if has_active_child {
                    continue;
                }
                let initial = node.initial.ok_or_else(|| ConfigurationError::MissingInitialState {
                    node: node.id.clone(),
                })?;
                configuration.insert(initial);
                pending.push(initial);
            }
            NodeKind::Parallel => {
                for region in definition.regions(index) {
                    if configuration.insert(region) {
                        pending.push(region);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(configuration)
}

/// Check a configuration that came from outside the engine.
///
/// Every index must belong to `definition`, the set must be closed under
/// ancestors, hold no history node, hold exactly one child of each active
/// compound node and every region of each active parallel node.
pub(crate) fn check_legal(definition: &Definition, configuration: &Configuration) -> Result<(), ConfigurationError> {
    let illegal = || ConfigurationError::UnknownStateValue {
        value: describe(definition, configuration),
    };
    if configuration.is_empty() || configuration.iter().any(|index| index.get() >= definition.nodes().len()) {
        return Err(illegal());
    }

    let legal = configuration.iter().all(|index| {
        let node = definition.node(index);
        let parent_active = node.parent.map_or(true, |parent| configuration.contains(parent));
        let active_children = node
            .children
            .iter()
            .filter(|child| configuration.contains(**child))
            .count();
        let children_legal = match node.kind {
            NodeKind::Compound => active_children == 1,
            NodeKind::Parallel => definition.regions(index).all(|region| configuration.contains(region)),
            NodeKind::History => false,
            NodeKind::Atomic | NodeKind::Final => true,
        };
        parent_active && children_legal
    });
    if legal {
        Ok(())
    } else {
        Err(illegal())
    }
}

/// Ids where they exist, raw indices otherwise.
fn describe(definition: &Definition, configuration: &Configuration) -> String {
    let parts: Vec<String> = configuration
        .iter()
        .map(|index| match definition.nodes().get(index.get()) {
            Some(node) => node.id.clone(),
            None => format!("#{}", index.get()),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

/// Resolve a (possibly partial) state value into a legal configuration.
///
/// Keys may be delimited paths (`"a.b"`); anything the value leaves out is
/// filled from defaults.
pub(crate) fn resolve_value(
    definition: &Definition,
    value: &StateValue,
) -> Result<Configuration, ConfigurationError> {
    let mut named = Vec::new();
    collect(definition, definition.root().index, value, value, &mut named)?;

    let configuration = complete(definition, iter::once(definition.root().index).chain(named))?;
    check_legal(definition, &configuration).map_err(|_| unknown_value(value))?;

    Ok(configuration)
}

fn collect(
    definition: &Definition,
    parent: NodeIndex,
    value: &StateValue,
    whole: &StateValue,
    named: &mut Vec<NodeIndex>,
) -> Result<(), ConfigurationError> {
    let lookup = |key: &str| {
        definition
            .node_by_path(parent, key.split(definition.delimiter()))
            .filter(|index| definition.node(*index).kind != NodeKind::History)
            .ok_or_else(|| unknown_value(whole))
    };

    match value {
        StateValue::Atomic(key) => named.push(lookup(key)?),
        StateValue::Compound(children) => {
            for (key, child_value) in children {
                let child = lookup(key)?;
                named.push(child);
                collect(definition, child, child_value, whole, named)?;
            }
        }
    }
    Ok(())
}

fn unknown_value(value: &StateValue) -> ConfigurationError {
    ConfigurationError::UnknownStateValue {
        value: value.to_string(),
    }
}

/// Nested state value of a configuration.
pub(crate) fn value_of(definition: &Definition, configuration: &Configuration) -> StateValue {
    value_below(definition, configuration, definition.root().index)
}

fn value_below(definition: &Definition, configuration: &Configuration, index: NodeIndex) -> StateValue {
    let node = definition.node(index);
    let mut active = definition
        .regions(index)
        .filter(|child| configuration.contains(*child));

    match node.kind {
        NodeKind::Compound => match active.next() {
            Some(child) if definition.node(child).is_leaf() => {
                StateValue::Atomic(definition.node(child).key.clone())
            }
            Some(child) => StateValue::Compound(BTreeMap::from([(
                definition.node(child).key.clone(),
                value_below(definition, configuration, child),
            )])),
            None => StateValue::Compound(BTreeMap::new()),
        },
        NodeKind::Parallel => StateValue::Compound(
            active
                .map(|region| {
                    (
                        definition.node(region).key.clone(),
                        value_below(definition, configuration, region),
                    )
                })
                .collect(),
        ),
        _ => StateValue::Compound(BTreeMap::new()),
    }
}

/// Whether `index` has reached a final state: a compound node's active child
/// is final, or every region of a parallel node is in a final state.
pub(crate) fn is_in_final(definition: &Definition, configuration: &Configuration, index: NodeIndex) -> bool {
    let node = definition.node(index);
    match node.kind {
        NodeKind::Compound => definition
            .regions(index)
            .any(|child| configuration.contains(child) && definition.node(child).is_final()),
        NodeKind::Parallel => definition
            .regions(index)
            .all(|region| is_in_final(definition, configuration, region)),
        NodeKind::Final => true,
        _ => false,
    }
}
