//! The transition-resolution engine.
//!
//! Everything here is a pure function of a [`Definition`], the guard
//! registry and an input snapshot. The facade in [`crate::machine`] wraps
//! these pieces into `initial_state` and `transition`.
//!
//! - [`configuration`]: value/configuration conversion and default completion
//! - [`selection`]: enabled transitions, conflict removal, exit sets
//! - [`microstep`]: applying one set of transitions
//! - [`settle`]: chaining eventless and raised microsteps to a stable state

pub(crate) mod configuration;
pub(crate) mod microstep;
pub(crate) mod selection;
pub(crate) mod settle;

use crate::definition::Definition;
use crate::machine::MachineOptions;

pub(crate) use microstep::Snapshot;
pub(crate) use settle::Settled;

/// Borrowed view of everything a macrostep reads.
#[derive(Clone, Copy)]
pub(crate) struct Engine<'m> {
    pub(crate) definition: &'m Definition,
    pub(crate) options: &'m MachineOptions,
}

impl<'m> Engine<'m> {
    pub(crate) fn new(definition: &'m Definition, options: &'m MachineOptions) -> Self {
        Self {
            definition,
            options,
        }
    }
}
