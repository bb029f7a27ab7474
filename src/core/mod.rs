//! Core statechart types.
//!
//! This module contains the plain data the engine computes with:
//! - State values and configurations (two views of the same fact)
//! - The canonical event envelope
//! - Guard predicates and action descriptors
//! - Immutable history records and machine states
//!
//! Nothing in this module performs side effects, following
//! the "pure core, imperative shell" philosophy.

mod action;
mod configuration;
mod event;
mod guard;
mod history;
mod state;
mod value;

pub use action::{ActionFn, ActionObject, ActivityDef, ActivityKind, AssignFn, Delay};
pub use configuration::{Configuration, NodeIndex};
pub use event::{is_builtin_event, Event, EventOrigin, INIT_EVENT, NULL_EVENT, WILDCARD};
pub use guard::{Guard, GuardRef};
pub use history::HistoryRecord;
pub use state::{MachineState, StateInput};
pub use value::{StateValue, DEFAULT_DELIMITER};
