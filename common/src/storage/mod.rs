pub mod config;
pub mod factory;
pub mod in_memory;
pub mod snapshot;
pub mod stratum;
pub mod util;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::range::ResolvedRange;

/// A key together with its value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }

    /// A record whose value is the empty byte sequence. Empty values are
    /// legal and round-trip unchanged.
    pub fn empty(key: Bytes) -> Self {
        Self::new(key, Bytes::new())
    }
}

/// One entry of an atomic batch.
///
/// The operation kind is part of the type, so a batch can never carry an
/// entry of unknown kind; key validation is the facade's job and happens
/// before any entry reaches [`Backend::apply`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Bytes, value: Bytes },
    Delete { key: Bytes },
}

impl BatchOp {
    pub fn put(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        BatchOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Bytes>) -> Self {
        BatchOp::Delete { key: key.into() }
    }

    /// The key this entry targets.
    pub fn key(&self) -> &Bytes {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

/// Options accepted by [`Backend::open`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenOptions {
    /// Create the location if it does not exist yet. Default: true.
    pub create_if_missing: bool,
    /// Fail if the location already exists. Default: false.
    pub error_if_exists: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
        }
    }
}

/// The isolation a backend's cursors provide against concurrent mutation.
///
/// Both semantics are legitimate; a backend declares which one it offers so
/// callers (and the contract test suite) can select matching expectations
/// instead of guessing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotSemantics {
    /// A cursor observes the store state as of cursor creation, regardless
    /// of subsequent puts and deletes.
    Snapshot,
    /// A cursor observes the state at first read; deletions become
    /// invisible but additions may or may not appear.
    NonSnapshot,
}

/// The cursor primitive a backend supplies.
///
/// A backend cursor owns its view of the data and its position; lifecycle
/// policing (ended-state errors, entry limits, seek-target validation) is
/// layered on top by the facade and is not this trait's concern.
#[async_trait]
pub trait BackendCursor: Send {
    /// Yields the next record in traversal order, or `None` once the range
    /// is exhausted. Exhaustion is not an error.
    async fn next(&mut self) -> Result<Option<Record>>;

    /// Repositions to the first key at-or-past `target` in traversal order
    /// (at-or-before when reversed). A target outside the resolved range
    /// window clamps to exhaustion; it never escapes the range.
    fn seek(&mut self, target: &[u8]);

    /// Releases engine-level resources. Dropping an un-ended cursor must
    /// release them too.
    async fn end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The minimal primitive capability set a concrete backend supplies.
///
/// The public store facade performs validation, defaulting, and option
/// normalization, then delegates here with fully resolved arguments:
/// serialized keys and values, and [`ResolvedRange`] for anything
/// range-shaped. Methods with provided bodies ([`clear`](Backend::clear),
/// [`as_engine`](Backend::as_engine)) are composed fallbacks a backend only
/// overrides when it can do better natively.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Opens the backend's location. Called exactly once per facade
    /// `open`; honors [`OpenOptions`].
    async fn open(&self, options: OpenOptions) -> Result<()>;

    /// Closes the backend, releasing engine resources. A closed backend
    /// may be re-opened.
    async fn close(&self) -> Result<()>;

    /// Point lookup. `None` means the key is absent; the facade converts
    /// that into the distinguished not-found error.
    async fn get(&self, key: Bytes) -> Result<Option<Bytes>>;

    /// Inserts or overwrites one key.
    async fn put(&self, key: Bytes, value: Bytes) -> Result<()>;

    /// Removes one key. Absent keys are not an error.
    async fn delete(&self, key: Bytes) -> Result<()>;

    /// Applies an ordered list of operations as one indivisible unit.
    /// Entries are pre-validated; an empty list never reaches this method.
    async fn apply(&self, ops: Vec<BatchOp>) -> Result<()>;

    /// Creates a cursor over `range`. Synchronous: cursor creation resolves
    /// options and captures a view but performs no I/O completions.
    fn cursor(&self, range: ResolvedRange) -> Result<Box<dyn BackendCursor>>;

    /// The isolation this backend's cursors provide.
    fn semantics(&self) -> SnapshotSemantics;

    /// Removes every entry in `range`, honoring its direction and limit.
    /// Returns the number of entries removed.
    ///
    /// The default composes the cursor and delete primitives, which by
    /// construction removes exactly the entries a cursor over the same
    /// range would yield. Backends override this when they can clear a
    /// range natively.
    async fn clear(&self, range: ResolvedRange) -> Result<u64> {
        if range.yields_nothing() {
            return Ok(0);
        }

        // Backend cursors yield the whole range; the entry limit is this
        // composition's responsibility.
        let mut remaining = range.limit;
        let mut cursor = self.cursor(range)?;
        let mut removed = 0u64;
        while remaining != 0 {
            let Some(record) = cursor.next().await? else {
                break;
            };
            self.delete(record.key).await?;
            removed += 1;
            if remaining > 0 {
                remaining -= 1;
            }
        }
        cursor.end().await?;
        Ok(removed)
    }

    /// Engine-class extension surface, if this backend has one.
    fn as_engine(&self) -> Option<&dyn EngineExt> {
        None
    }
}

/// Extended operations an engine-class (LevelDB-style) backend layers on
/// top of the primitive set.
#[async_trait]
pub trait EngineExt: Send + Sync {
    /// Estimates the on-engine byte footprint of the key range
    /// `[start, end)`, counting live records, stale versions, and
    /// tombstones still present in the engine's files.
    async fn approximate_size(&self, start: Bytes, end: Bytes) -> Result<u64>;

    /// Forces reclamation of space held by overwritten and tombstoned
    /// entries in `[start, end)`. After compacting a range with many
    /// deletions, the footprint for equivalent logical content is strictly
    /// smaller.
    async fn compact_range(&self, start: Bytes, end: Bytes) -> Result<()>;

    /// Engine statistics as text. Unknown property names return an empty
    /// string rather than erroring.
    fn property(&self, name: &str) -> String;
}

pub(crate) fn lock_poisoned<T>(_: T) -> Error {
    Error::engine("storage lock poisoned")
}
