//! Checkpoint error types.

use crate::error::ConfigurationError;
use thiserror::Error;

/// Failures while capturing, encoding, decoding or restoring a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("could not encode checkpoint: {0}")]
    SerializationFailed(String),

    #[error("could not decode checkpoint: {0}")]
    DeserializationFailed(String),

    /// Written by a newer or older format than this build reads.
    #[error("checkpoint format {found} is not supported (expected {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("checkpoint was captured from machine '{found}', not '{expected}'")]
    MachineMismatch { expected: String, found: String },

    /// Both sides declare a definition version and they differ.
    #[error("checkpoint was captured from machine version '{found}', not '{expected}'")]
    VersionMismatch { expected: String, found: String },

    /// The checkpoint names a node id the machine does not define.
    #[error("checkpoint references unknown state '{id}'")]
    UnknownState { id: String },

    /// The listed ids do not form a configuration the machine can be in.
    #[error("checkpoint configuration is not legal: {0}")]
    IllegalConfiguration(#[from] ConfigurationError),
}
