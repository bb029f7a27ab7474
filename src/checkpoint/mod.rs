//! Checkpoint and resume functionality for machine states.
//!
//! The engine never persists anything itself. A [`Checkpoint`] is a plain,
//! versioned value capturing one [`MachineState`] so a long-running
//! interpreter can survive process restarts: encode it as JSON for
//! readability or with bincode for compactness, store it however you like,
//! and hand it back to [`Machine::restore`] later.
//!
//! States are captured by node id rather than by arena index, so a
//! checkpoint stays meaningful as long as the ids it names exist.

use crate::core::{Configuration, Event, HistoryRecord, MachineState, NodeIndex};
use crate::engine::configuration::{check_legal, complete};
use crate::engine::{Settled, Snapshot};
use crate::machine::Machine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable checkpoint of a machine state.
///
/// Action descriptors are not captured: they describe work that belonged to
/// the step that produced the state. Context and event are stored as JSON
/// text so the binary encoding never has to describe arbitrary JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    /// Id of the machine the state belongs to
    pub machine_id: String,

    /// Definition version, if the machine declares one
    pub machine_version: Option<String>,

    /// Active node ids in document order
    pub configuration: Vec<String>,

    /// Context as JSON text
    pub context: String,

    /// Event that produced the state, as JSON text
    pub event: String,

    /// Recorded history: parent id and the descendant ids active at its last exit
    pub history: Vec<(String, Vec<String>)>,

    /// Whether the machine had reached a final state
    pub done: bool,
}

impl Checkpoint {
    /// Capture `state` of `machine`.
    pub fn capture(machine: &Machine, state: &MachineState) -> Result<Self, CheckpointError> {
        let definition = machine.definition();
        let ids = |nodes: &[NodeIndex]| -> Vec<String> {
            nodes
                .iter()
                .map(|index| definition.node(*index).id.clone())
                .collect()
        };

        let context = serde_json::to_string(&state.context)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;
        let event = serde_json::to_string(&state.event)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;

        Ok(Self {
            version: CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            machine_id: machine.id().to_string(),
            machine_version: definition.version().map(str::to_string),
            configuration: definition.node_ids(&state.configuration),
            context,
            event,
            history: state
                .history
                .entries()
                .map(|(parent, nodes)| (definition.node(parent).id.clone(), ids(nodes)))
                .collect(),
            done: state.done,
        })
    }

    /// Serialize checkpoint to JSON format
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    /// Deserialize checkpoint from JSON format
    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        checkpoint.check_version()
    }

    /// Serialize checkpoint to binary format
    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    /// Deserialize checkpoint from binary format
    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        checkpoint.check_version()
    }

    fn check_version(self) -> Result<Self, CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        Ok(self)
    }
}

impl Machine {
    /// Capture `state` as a [`Checkpoint`].
    pub fn checkpoint(&self, state: &MachineState) -> Result<Checkpoint, CheckpointError> {
        Checkpoint::capture(self, state)
    }

    /// Rebuild a state from a checkpoint of this machine.
    ///
    /// The configuration is re-completed and the value re-derived, so a
    /// checkpoint that lists only leaf ids restores the same state. Ids that
    /// complete to something the machine cannot be in (two siblings of a
    /// compound state, a history pseudo-state) are rejected.
    pub fn restore(&self, checkpoint: &Checkpoint) -> Result<MachineState, CheckpointError> {
        if checkpoint.machine_id != self.id() {
            return Err(CheckpointError::MachineMismatch {
                expected: self.id().to_string(),
                found: checkpoint.machine_id.clone(),
            });
        }
        if let (Some(expected), Some(found)) = (self.definition().version(), &checkpoint.machine_version) {
            if expected != found.as_str() {
                return Err(CheckpointError::VersionMismatch {
                    expected: expected.to_string(),
                    found: found.clone(),
                });
            }
        }

        let definition = self.definition();
        let index_of = |id: &String| -> Result<NodeIndex, CheckpointError> {
            definition
                .get_by_id(id)
                .map(|node| node.index)
                .ok_or_else(|| CheckpointError::UnknownState { id: id.clone() })
        };

        let nodes = checkpoint
            .configuration
            .iter()
            .map(index_of)
            .collect::<Result<Vec<_>, _>>()?;
        let configuration: Configuration = complete(definition, nodes)?;
        check_legal(definition, &configuration)?;

        let history = checkpoint
            .history
            .iter()
            .map(|(parent, descendants)| -> Result<_, CheckpointError> {
                let descendants = descendants.iter().map(index_of).collect::<Result<Vec<_>, _>>()?;
                Ok((index_of(parent)?, descendants))
            })
            .collect::<Result<HistoryRecord, CheckpointError>>()?;

        let context: Value = serde_json::from_str(&checkpoint.context)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        let event: Event = serde_json::from_str(&checkpoint.event)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;

        debug!(
            machine = %self.id(),
            checkpoint = %checkpoint.id,
            nodes = configuration.len(),
            "statechart_restored"
        );

        let settled = Settled {
            snapshot: Snapshot {
                configuration,
                context,
                history,
            },
            actions: Vec::new(),
            microsteps: 0,
        };
        Ok(self.state_from(settled, event, None))
    }
}
