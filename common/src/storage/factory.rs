//! Backend factory: configuration to backend instance.

use std::sync::Arc;

use super::config::StorageConfig;
use super::in_memory::InMemoryBackend;
use super::stratum::StratumBackend;
use super::Backend;
use crate::error::Result;

/// Creates an (unopened) backend for the given configuration.
///
/// The caller still drives the open/close lifecycle; creation never
/// touches storage.
pub fn create_backend(config: &StorageConfig) -> Result<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = match config {
        StorageConfig::InMemory => Arc::new(InMemoryBackend::new()),
        StorageConfig::Stratum(stratum_config) => {
            Arc::new(StratumBackend::new(stratum_config.clone()))
        }
    };
    Ok(backend)
}
