//! Harel: a pure statechart interpretation engine
//!
//! Harel follows the "pure core, imperative shell" philosophy. Given a
//! declarative definition of a hierarchical, parallel state machine and an
//! event, it computes the next state: the active configuration, the
//! context, and the ordered list of action descriptors to execute. It never
//! runs those actions, schedules timers, or performs I/O; that is left to
//! whatever shell drives the machine.
//!
//! # Core Concepts
//!
//! - **Definition**: an immutable, document-ordered arena compiled once from
//!   a [`StateNodeConfig`](builder::StateNodeConfig) or its JSON form
//! - **Configuration**: the set of active nodes, always closed under
//!   ancestors and complete across parallel regions
//! - **Macrostep**: one external event, then eventless and internally raised
//!   transitions until the machine settles
//! - **Actions**: inert [`ActionObject`] descriptors resolved through
//!   [`MachineOptions`] by the caller
//!
//! # Example
//!
//! ```rust
//! use harel::{Machine, StateValue};
//! use serde_json::json;
//!
//! let machine = Machine::from_json(r#"{
//!     "id": "editor",
//!     "type": "parallel",
//!     "states": {
//!         "bold": { "initial": "off", "states": {
//!             "on": { "on": { "TOGGLE_BOLD": "off" } },
//!             "off": { "on": { "TOGGLE_BOLD": "on" } }
//!         } },
//!         "italics": { "initial": "off", "states": {
//!             "on": { "on": { "TOGGLE_ITALICS": "off" } },
//!             "off": { "on": { "TOGGLE_ITALICS": "on" } }
//!         } }
//!     }
//! }"#).unwrap();
//!
//! let state = machine.initial_state().unwrap();
//! let state = machine.transition(&state, "TOGGLE_BOLD").unwrap();
//!
//! let expected: StateValue = serde_json::from_value(json!({ "bold": "on", "italics": "off" })).unwrap();
//! assert_eq!(state.value, expected);
//! assert!(state.can("TOGGLE_ITALICS"));
//! ```

pub mod builder;
pub mod checkpoint;
pub mod core;
pub mod definition;
pub(crate) mod engine;
pub mod error;
pub mod machine;

// Re-export commonly used types
pub use builder::{StateNodeConfig, TransitionConfig};
pub use checkpoint::{Checkpoint, CheckpointError};
pub use crate::core::{ActionObject, Event, Guard, MachineState, StateValue};
pub use error::{ConfigurationError, StatechartError, StatechartResult};
pub use machine::{Machine, MachineOptions};
