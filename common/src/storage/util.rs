//! Storage housekeeping helpers.
//!
//! Used by tests and benchmarks to remove a backend's data after the
//! backend has been closed.

use super::config::StorageConfig;
use super::stratum;
use crate::error::Result;

/// Deletes all data belonging to the given storage configuration.
///
/// For the stratum backend this destroys the on-disk location (stratum
/// files only; foreign files in the same directory survive). For the
/// in-memory backend it is a no-op — memory is released when the backend
/// is dropped. Call this after the backend has been closed.
pub async fn delete(config: &StorageConfig) -> Result<()> {
    match config {
        StorageConfig::InMemory => Ok(()),
        StorageConfig::Stratum(stratum_config) => stratum::destroy(&stratum_config.path).await,
    }
}
