//! Versioned binary snapshots of a [`Population`].
//!
//! Layout: 4-byte magic `GEPA`, little-endian `u32` format version, then
//! the bincode-encoded body. Bumping [`SNAPSHOT_VERSION`] invalidates old
//! files: loading them fails with
//! [`PopulationError::UnsupportedVersion`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::candidate::Candidate;
use super::store::{Population, PopulationStats};
use crate::error::PopulationError;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

const MAGIC: &[u8; 4] = b"GEPA";
const HEADER_LEN: usize = 8;

#[derive(Serialize, Deserialize)]
struct SnapshotBody {
    capacity: usize,
    generation: u64,
    /// Candidates in insertion order.
    candidates: Vec<Candidate>,
    stats: PopulationStats,
}

impl Population {
    /// Encodes the population into snapshot bytes.
    pub fn to_snapshot_bytes(&self) -> Result<Vec<u8>, PopulationError> {
        let body = SnapshotBody {
            capacity: self.capacity,
            generation: self.generation,
            candidates: self.get_all().into_iter().cloned().collect(),
            stats: self.stats.clone(),
        };
        let encoded = bincode::serialize(&body).map_err(io::Error::other)?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + encoded.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&encoded);
        Ok(bytes)
    }

    /// Decodes a population from snapshot bytes.
    pub fn from_snapshot_bytes(bytes: &[u8]) -> Result<Self, PopulationError> {
        if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
            return Err(PopulationError::DeserializationFailed {
                reason: "missing snapshot header".into(),
            });
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != SNAPSHOT_VERSION {
            return Err(PopulationError::UnsupportedVersion {
                found: version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let body: SnapshotBody = bincode::deserialize(&bytes[HEADER_LEN..]).map_err(|e| {
            PopulationError::DeserializationFailed {
                reason: e.to_string(),
            }
        })?;

        if body.capacity == 0 || body.candidates.len() > body.capacity {
            return Err(PopulationError::DeserializationFailed {
                reason: format!(
                    "{} candidates exceed capacity {}",
                    body.candidates.len(),
                    body.capacity
                ),
            });
        }
        let mut seen = HashSet::with_capacity(body.candidates.len());
        if !body.candidates.iter().all(|c| seen.insert(c.id.clone())) {
            return Err(PopulationError::DeserializationFailed {
                reason: "duplicate candidate ids".into(),
            });
        }

        let order = body.candidates.iter().map(|c| c.id.clone()).collect();
        let candidates: HashMap<_, _> = body
            .candidates
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let mut population = Population {
            capacity: body.capacity,
            candidates,
            order,
            generation: body.generation,
            stats: body.stats,
        };
        population.refresh_stats();
        Ok(population)
    }

    /// Writes a snapshot to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PopulationError> {
        let path = path.as_ref();
        fs::write(path, self.to_snapshot_bytes()?)?;
        debug!(path = %path.display(), size = self.len(), "population snapshot saved");
        Ok(())
    }

    /// Reads a snapshot from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PopulationError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PopulationError::FileNotFound(path.to_path_buf()),
            _ => PopulationError::Io(e),
        })?;
        Self::from_snapshot_bytes(&bytes)
    }
}
