//! Binary snapshots of a whole simulation.
//!
//! Encoded with `bitcode` behind a versioned header so a save slot from an
//! incompatible build is rejected before its payload is trusted.

use crate::economy::EconomyState;
use crate::factory::Factory;
use crate::farm::Farm;
use crate::fixed::{Millis, Timestamp};
use crate::id::MissionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a homestead snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x4853_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("snapshot belongs to mission {}, expected {}", .found.0, .expected.0)]
    MissionMismatch { expected: MissionId, found: MissionId },
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    pub mission_id: MissionId,
    /// Wall-clock time the snapshot was taken.
    pub taken_at: Timestamp,
}

impl SnapshotHeader {
    pub fn new(mission_id: MissionId, taken_at: Timestamp) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            mission_id,
            taken_at,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Everything needed to resume a simulation, minus the injected clock,
/// random source, store and catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub header: SnapshotHeader,
    pub farm: Farm,
    pub factory: Factory,
    pub economy: EconomyState,
    pub last_step: Option<Timestamp>,
    /// Time accumulated towards the next day.
    pub day_elapsed: Millis,
}

impl SimulationSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>, SerializeError> {
        bitcode::serialize(self).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode and validate the header.
    pub fn decode(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: SimulationSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        Ok(snapshot)
    }
}
