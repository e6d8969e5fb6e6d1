//! Backend selection and tuning configuration.

use serde::{Deserialize, Serialize};

/// Default segment rotation threshold: 4 MiB.
const DEFAULT_SEGMENT_SIZE: u64 = 4 * 1024 * 1024;

/// Selects and configures a storage backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// In-memory reference backend. No durability, no location.
    #[default]
    InMemory,
    /// Log-structured stratum backend at an on-disk location.
    Stratum(StratumConfig),
}

/// Configuration for the stratum backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratumConfig {
    /// Directory holding the marker file and segment logs.
    pub path: String,

    /// Rotate to a new segment once the active one reaches this many bytes.
    #[serde(default = "default_segment_size")]
    pub segment_size: u64,

    /// Fsync after every write instead of on close/rotation. Slower,
    /// stronger durability.
    #[serde(default)]
    pub sync_writes: bool,
}

impl StratumConfig {
    /// Configuration with default tuning for the given location.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            segment_size: DEFAULT_SEGMENT_SIZE,
            sync_writes: false,
        }
    }
}

fn default_segment_size() -> u64 {
    DEFAULT_SEGMENT_SIZE
}
