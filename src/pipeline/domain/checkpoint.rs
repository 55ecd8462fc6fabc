//! Immutable snapshots of pipeline state taken at transition boundaries.

use super::{PipelineState, RunId, Stage};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Where in the run a checkpoint was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointPhase {
    /// Initial state at submission.
    Submitted,
    /// Immediately before a stage runs.
    BeforeStage,
    /// Immediately after a stage result was merged.
    AfterStage,
    /// After an approval decision was applied.
    Decision,
}

impl CheckpointPhase {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::BeforeStage => "before_stage",
            Self::AfterStage => "after_stage",
            Self::Decision => "decision",
        }
    }
}

/// Errors raised while capturing or restoring snapshots.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// The state could not be encoded.
    #[error("failed to encode pipeline state: {0}")]
    Encode(String),

    /// The snapshot could not be decoded into a state.
    #[error("failed to decode checkpoint {sequence} of run {run_id}: {reason}")]
    Decode {
        /// Run identifier.
        run_id: RunId,
        /// Checkpoint sequence.
        sequence: u64,
        /// Decoder diagnostic.
        reason: String,
    },

    /// The stored digest does not match the snapshot.
    #[error("checkpoint {sequence} of run {run_id} failed integrity check")]
    DigestMismatch {
        /// Run identifier.
        run_id: RunId,
        /// Checkpoint sequence.
        sequence: u64,
    },
}

/// Snapshot keyed by (run, sequence).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    run_id: RunId,
    stage: Option<Stage>,
    phase: CheckpointPhase,
    sequence: u64,
    snapshot: Value,
    digest: String,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedCheckpointData {
    /// Persisted run identifier.
    pub run_id: RunId,
    /// Persisted stage name.
    pub stage: Option<Stage>,
    /// Persisted phase.
    pub phase: CheckpointPhase,
    /// Persisted sequence.
    pub sequence: u64,
    /// Persisted snapshot.
    pub snapshot: Value,
    /// Persisted SHA-256 digest.
    pub digest: String,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshots `state`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Encode`] when the state cannot be serialized.
    pub fn capture(
        state: &PipelineState,
        stage: Option<Stage>,
        phase: CheckpointPhase,
        sequence: u64,
        clock: &impl Clock,
    ) -> Result<Self, SnapshotError> {
        let snapshot =
            serde_json::to_value(state).map_err(|err| SnapshotError::Encode(err.to_string()))?;
        let digest = digest_of(&snapshot)?;
        Ok(Self {
            run_id: state.run_id(),
            stage,
            phase,
            sequence,
            snapshot,
            digest,
            created_at: clock.utc(),
        })
    }

    /// Reconstructs a checkpoint from persisted storage without verifying it.
    #[must_use]
    pub fn from_persisted(data: PersistedCheckpointData) -> Self {
        Self {
            run_id: data.run_id,
            stage: data.stage,
            phase: data.phase,
            sequence: data.sequence,
            snapshot: data.snapshot,
            digest: data.digest,
            created_at: data.created_at,
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Returns the stage the checkpoint belongs to.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        self.stage
    }

    /// Returns the phase.
    #[must_use]
    pub const fn phase(&self) -> CheckpointPhase {
        self.phase
    }

    /// Returns the sequence number within the run.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the raw snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &Value {
        &self.snapshot
    }

    /// Returns the hex-encoded SHA-256 digest of the snapshot.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Checks the snapshot against its digest.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::DigestMismatch`] when the snapshot changed.
    pub fn verify(&self) -> Result<(), SnapshotError> {
        if digest_of(&self.snapshot)? != self.digest {
            return Err(SnapshotError::DigestMismatch {
                run_id: self.run_id,
                sequence: self.sequence,
            });
        }
        Ok(())
    }

    /// Verifies and decodes the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::DigestMismatch`] or [`SnapshotError::Decode`].
    pub fn restore(&self) -> Result<PipelineState, SnapshotError> {
        self.verify()?;
        serde_json::from_value(self.snapshot.clone()).map_err(|err| SnapshotError::Decode {
            run_id: self.run_id,
            sequence: self.sequence,
            reason: err.to_string(),
        })
    }
}

fn digest_of(snapshot: &Value) -> Result<String, SnapshotError> {
    let bytes =
        serde_json::to_vec(snapshot).map_err(|err| SnapshotError::Encode(err.to_string()))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
