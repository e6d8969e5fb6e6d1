//! The public store facade.
//!
//! A [`Store`] wraps any [`Backend`] with the behavior every backend must
//! share: the open/close status state machine, key validation, codec
//! serialization, range-option resolution, and the distinguished not-found
//! error for `get`. Backends receive fully resolved arguments — serialized
//! keys/values and [`ResolvedRange`]s — and never see invalid input.

use std::sync::{Arc, RwLock};

use bytes::Bytes;
use common::storage::factory::create_backend;
use common::{
    Backend, BatchOp, Error, OpenOptions, RangeOptions, Result, SnapshotSemantics, StorageConfig,
};

use crate::batch::Batch;
use crate::codec::{IdentityCodec, KeyCodec};
use crate::cursor::Cursor;
use crate::status::Status;

/// State shared between a store and the cursors/batches it hands out.
///
/// Cursors and batches hold an `Arc` of this — a non-owning back-reference:
/// it keeps the backend allocation alive but grants no lifecycle authority,
/// and every data-path use re-checks the status so operations against a
/// since-closed store fail with a reportable error.
pub(crate) struct Shared {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) codec: Arc<dyn KeyCodec>,
    status: RwLock<Status>,
}

impl Shared {
    pub(crate) fn status(&self) -> Status {
        self.status.read().map(|status| *status).unwrap_or(Status::Closed)
    }

    fn set_status(&self, status: Status) {
        if let Ok(mut slot) = self.status.write() {
            *slot = status;
        }
    }

    /// Checks the current status and moves to `to` under a single lock
    /// acquisition, so two racing callers can never both pass the check.
    fn transition(
        &self,
        allowed: impl Fn(Status) -> bool,
        to: Status,
        verb: &str,
    ) -> Result<()> {
        let mut slot = self
            .status
            .write()
            .map_err(|_| Error::engine("store status lock poisoned"))?;
        if !allowed(*slot) {
            return Err(Error::usage(format!("cannot {verb} store while {}", *slot)));
        }
        *slot = to;
        Ok(())
    }

    /// Fails with a usage error unless the store is open.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        let status = self.status();
        if status == Status::Open {
            Ok(())
        } else {
            Err(Error::usage(format!("store is not open (status: {status})")))
        }
    }
}

/// Validates a key on its pre-serialization input.
///
/// Runs before the codec so a custom codec can neither bypass validation
/// nor rescue an empty key by serializing it to something non-empty.
pub(crate) fn validate_key(key: &Bytes) -> Result<()> {
    if key.is_empty() {
        Err(Error::validation("key cannot be an empty byte sequence"))
    } else {
        Ok(())
    }
}

/// A validated, codec-aware key/value store over a pluggable backend.
///
/// Cheap to clone; clones share the same backend and status.
///
/// # Example
///
/// ```ignore
/// use keystore::Store;
/// use common::StorageConfig;
///
/// let store = Store::from_config(&StorageConfig::InMemory)?;
/// store.open().await?;
/// store.put("user:1", "alice").await?;
/// assert_eq!(store.get("user:1").await?, "alice");
/// store.close().await?;
/// ```
#[derive(Clone)]
pub struct Store {
    shared: Arc<Shared>,
}

impl Store {
    /// Creates a store over `backend` with the identity codec.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_codec(backend, Arc::new(IdentityCodec))
    }

    /// Creates a store over `backend` with a custom codec.
    pub fn with_codec(backend: Arc<dyn Backend>, codec: Arc<dyn KeyCodec>) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                codec,
                status: RwLock::new(Status::New),
            }),
        }
    }

    /// Creates a store for the given backend configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Ok(Self::new(create_backend(config)?))
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        self.shared.status()
    }

    /// The cursor isolation the backend declares.
    pub fn semantics(&self) -> SnapshotSemantics {
        self.shared.backend.semantics()
    }

    /// Opens the store with default options.
    pub async fn open(&self) -> Result<()> {
        self.open_with(OpenOptions::default()).await
    }

    /// Opens the store, driving `New|Closed → Opening → Open`. On failure
    /// the status falls back to `New` and the error is returned verbatim.
    pub async fn open_with(&self, options: OpenOptions) -> Result<()> {
        self.shared
            .transition(Status::can_open, Status::Opening, "open")?;

        match self.shared.backend.open(options).await {
            Ok(()) => {
                self.shared.set_status(Status::Open);
                Ok(())
            }
            Err(err) => {
                self.shared.set_status(Status::New);
                Err(err)
            }
        }
    }

    /// Closes the store, driving `Open → Closing → Closed`. On failure the
    /// status falls back to `Open`.
    pub async fn close(&self) -> Result<()> {
        self.shared
            .transition(|status| status == Status::Open, Status::Closing, "close")?;

        match self.shared.backend.close().await {
            Ok(()) => {
                self.shared.set_status(Status::Closed);
                Ok(())
            }
            Err(err) => {
                self.shared.set_status(Status::Open);
                Err(err)
            }
        }
    }

    /// Gets the value for `key`.
    ///
    /// An absent key is reported as [`Error::NotFound`], distinguishable
    /// via [`Error::is_not_found`] — callers that treat absence as "no
    /// value" can branch on the kind instead of matching message text.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn get(&self, key: impl Into<Bytes>) -> Result<Bytes> {
        self.shared.ensure_open()?;
        let key = key.into();
        validate_key(&key)?;
        let stored_key = self.shared.codec.serialize_key(&key);
        match self.shared.backend.get(stored_key).await? {
            Some(value) => Ok(value),
            None => Err(Error::NotFound),
        }
    }

    /// Inserts or overwrites one key. Empty values are legal and round-trip
    /// as the empty byte sequence.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn put(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<()> {
        self.shared.ensure_open()?;
        let key = key.into();
        validate_key(&key)?;
        let value = value.into();
        let stored_key = self.shared.codec.serialize_key(&key);
        let stored_value = self.shared.codec.serialize_value(&value);
        self.shared.backend.put(stored_key, stored_value).await
    }

    /// Deletes one key. Deleting an absent key succeeds silently.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn delete(&self, key: impl Into<Bytes>) -> Result<()> {
        self.shared.ensure_open()?;
        let key = key.into();
        validate_key(&key)?;
        let stored_key = self.shared.codec.serialize_key(&key);
        self.shared.backend.delete(stored_key).await
    }

    /// Applies an ordered list of operations as one indivisible unit.
    ///
    /// Every entry is validated before any is applied: a batch with one
    /// invalid entry leaves the store completely unchanged. The caller's
    /// operations are never mutated; serialization builds a fresh list. An
    /// empty list succeeds without touching the backend.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn write_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        self.shared.ensure_open()?;

        let mut stored_ops = Vec::with_capacity(ops.len());
        for op in &ops {
            validate_key(op.key())?;
            stored_ops.push(match op {
                BatchOp::Put { key, value } => BatchOp::Put {
                    key: self.shared.codec.serialize_key(key),
                    value: self.shared.codec.serialize_value(value),
                },
                BatchOp::Delete { key } => BatchOp::Delete {
                    key: self.shared.codec.serialize_key(key),
                },
            });
        }

        if stored_ops.is_empty() {
            return Ok(());
        }
        self.shared.backend.apply(stored_ops).await
    }

    /// Starts a chained batch. Operations accumulate in the builder and hit
    /// the backend only on [`Batch::write`].
    pub fn batch(&self) -> Result<Batch> {
        self.shared.ensure_open()?;
        Ok(Batch::new(self.shared.clone()))
    }

    /// Creates a cursor over the resolved range.
    ///
    /// A synchronous factory: creation resolves options and captures the
    /// backend view but performs no completions. Calling it on a store that
    /// is not open is an immediate usage error.
    pub fn cursor(&self, options: RangeOptions) -> Result<Cursor> {
        self.shared.ensure_open()?;
        let resolved = options.resolve();
        let limit = resolved.limit;
        let stored_range = common::ResolvedRange {
            range: self.shared.codec.serialize_range(resolved.range),
            reverse: resolved.reverse,
            limit: resolved.limit,
        };
        let inner = self.shared.backend.cursor(stored_range)?;
        Ok(Cursor::new(self.shared.clone(), inner, limit))
    }

    /// Removes every entry in the resolved range; returns how many were
    /// removed. Default options clear the whole store; `limit` bounds the
    /// removals in traversal order. Identical in composition to iterating
    /// the same range and deleting each yielded key.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn clear(&self, options: RangeOptions) -> Result<u64> {
        self.shared.ensure_open()?;
        let resolved = options.resolve();
        let stored_range = common::ResolvedRange {
            range: self.shared.codec.serialize_range(resolved.range),
            reverse: resolved.reverse,
            limit: resolved.limit,
        };
        self.shared.backend.clear(stored_range).await
    }

    /// Estimated on-engine byte footprint of `[start, end)`.
    ///
    /// Engine-class backends only; bounds are validated and serialized
    /// exactly like point-operation keys.
    pub async fn approximate_size(
        &self,
        start: impl Into<Bytes>,
        end: impl Into<Bytes>,
    ) -> Result<u64> {
        let (start, end) = self.engine_bounds(start, end)?;
        self.engine()?.approximate_size(start, end).await
    }

    /// Forces compaction of `[start, end)` on an engine-class backend.
    pub async fn compact_range(
        &self,
        start: impl Into<Bytes>,
        end: impl Into<Bytes>,
    ) -> Result<()> {
        let (start, end) = self.engine_bounds(start, end)?;
        self.engine()?.compact_range(start, end).await
    }

    /// Engine statistics as text. Unknown property names yield `""`.
    pub fn property(&self, name: &str) -> Result<String> {
        self.shared.ensure_open()?;
        Ok(self.engine()?.property(name))
    }

    fn engine(&self) -> Result<&dyn common::EngineExt> {
        self.shared
            .backend
            .as_engine()
            .ok_or_else(|| Error::usage("backend does not support engine extensions"))
    }

    fn engine_bounds(
        &self,
        start: impl Into<Bytes>,
        end: impl Into<Bytes>,
    ) -> Result<(Bytes, Bytes)> {
        self.shared.ensure_open()?;
        let start = start.into();
        let end = end.into();
        validate_key(&start)?;
        validate_key(&end)?;
        Ok((
            self.shared.codec.serialize_key(&start),
            self.shared.codec.serialize_key(&end),
        ))
    }
}
