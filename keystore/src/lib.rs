//! Validated, codec-aware key/value store facade over pluggable backends.
//!
//! [`Store`] is the entry point: construct one over any
//! [`Backend`](common::Backend) (or from a [`StorageConfig`]), open it, and
//! use point operations, atomic batches, range cursors and engine
//! extensions. The facade owns everything backends must agree on — the
//! lifecycle state machine, key validation, codec serialization, range
//! resolution and the not-found error — so a backend only implements
//! storage primitives.

pub mod batch;
pub mod codec;
pub mod cursor;
pub mod status;
pub mod store;

pub use batch::Batch;
pub use codec::{IdentityCodec, KeyCodec, PrefixCodec};
pub use cursor::Cursor;
pub use status::Status;
pub use store::Store;

pub use common::{
    Backend, BackendCursor, BatchOp, Error, OpenOptions, RangeOptions, Record, Result,
    SnapshotSemantics, StorageConfig, StratumConfig,
};
