//! Shared storage contract: error taxonomy, range resolution, backend
//! primitive traits, and the provided backends (in-memory reference and the
//! stratum log-structured engine skeleton).

pub mod bytes;
pub mod error;
pub mod range;
pub mod storage;

pub use bytes::BytesRange;
pub use error::{Error, Result};
pub use range::{RangeOptions, ResolvedRange, UNLIMITED};
pub use storage::config::{StorageConfig, StratumConfig};
pub use storage::{
    Backend, BackendCursor, BatchOp, EngineExt, OpenOptions, Record, SnapshotSemantics,
};
