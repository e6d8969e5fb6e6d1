//! In-memory reference backend.
//!
//! Stores everything in a `BTreeMap` behind an `RwLock`. This is the
//! reference implementation of the [`Backend`] contract: every behavioral
//! rule the facade depends on can be exercised against it without touching
//! disk, and concurrent `get`s proceed under the shared read lock without
//! blocking each other.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::snapshot::SnapshotCursor;
use super::{lock_poisoned, Backend, BackendCursor, BatchOp, OpenOptions, Record};
use super::{EngineExt, SnapshotSemantics};
use crate::error::Result;
use crate::range::ResolvedRange;

/// In-memory implementation of the [`Backend`] trait.
///
/// Data survives a close/re-open cycle on the same instance, matching the
/// behavior of an engine whose "location" is the instance itself.
/// `OpenOptions` location checks are meaningless here and are ignored.
#[derive(Default)]
pub struct InMemoryBackend {
    data: RwLock<BTreeMap<Bytes, Bytes>>,
}

impl InMemoryBackend {
    /// Creates a new, empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries. Test and introspection helper.
    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Captures the records of `range` in traversal order.
    fn capture(&self, range: &ResolvedRange) -> Result<Vec<Record>> {
        let data = self.data.read().map_err(lock_poisoned)?;
        let iter = data
            .range((range.range.start.clone(), range.range.end.clone()))
            .map(|(k, v)| Record::new(k.clone(), v.clone()));

        let records = if range.reverse {
            iter.rev().collect()
        } else {
            iter.collect()
        };
        Ok(records)
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn open(&self, _options: OpenOptions) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> Result<Option<Bytes>> {
        let data = self.data.read().map_err(lock_poisoned)?;
        Ok(data.get(&key).cloned())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn put(&self, key: Bytes, value: Bytes) -> Result<()> {
        let mut data = self.data.write().map_err(lock_poisoned)?;
        data.insert(key, value);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn delete(&self, key: Bytes) -> Result<()> {
        let mut data = self.data.write().map_err(lock_poisoned)?;
        data.remove(&key);
        Ok(())
    }

    /// Applies all operations under a single write-lock acquisition, so
    /// another task never observes a partially applied batch.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn apply(&self, ops: Vec<BatchOp>) -> Result<()> {
        let mut data = self.data.write().map_err(lock_poisoned)?;
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn cursor(&self, range: ResolvedRange) -> Result<Box<dyn BackendCursor>> {
        if range.yields_nothing() {
            return Ok(Box::new(SnapshotCursor::exhausted()));
        }
        let records = self.capture(&range)?;
        Ok(Box::new(SnapshotCursor::new(
            records,
            range.range,
            range.reverse,
        )))
    }

    fn semantics(&self) -> SnapshotSemantics {
        SnapshotSemantics::Snapshot
    }

    /// Native clear: collects the doomed keys and removes them in one
    /// write-lock acquisition instead of a delete per entry.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn clear(&self, range: ResolvedRange) -> Result<u64> {
        if range.yields_nothing() {
            return Ok(0);
        }

        let doomed: Vec<Bytes> = {
            let captured = self.capture(&range)?;
            let take = if range.limit < 0 {
                captured.len()
            } else {
                captured.len().min(range.limit as usize)
            };
            captured
                .into_iter()
                .take(take)
                .map(|record| record.key)
                .collect()
        };

        let mut data = self.data.write().map_err(lock_poisoned)?;
        let mut removed = 0u64;
        for key in doomed {
            if data.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn as_engine(&self) -> Option<&dyn EngineExt> {
        None
    }
}
