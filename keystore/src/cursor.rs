//! Cursor lifecycle over a backend cursor.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use common::{BackendCursor, Error, Record, Result};

use crate::store::Shared;

/// How many records a cursor yields before ceding the executor once.
const YIELD_EVERY: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CursorState {
    Ready,
    Ended,
}

/// A one-way traversal over a resolved key range.
///
/// Created by [`Store::cursor`](crate::Store::cursor). [`next`](Cursor::next)
/// yields records until the range, the entry limit, or the data runs out,
/// then returns `Ok(None)` forever. [`end`](Cursor::end) releases backend
/// resources early and must be called at most once; any call after it is a
/// usage error. The `&mut self` receivers make overlapping calls on one
/// cursor unrepresentable.
pub struct Cursor {
    shared: Arc<Shared>,
    inner: Box<dyn BackendCursor>,
    state: CursorState,
    /// Entries still allowed: negative means unlimited.
    remaining: i64,
    since_yield: usize,
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("state", &self.state)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl Cursor {
    pub(crate) fn new(shared: Arc<Shared>, inner: Box<dyn BackendCursor>, limit: i64) -> Self {
        Self {
            shared,
            inner,
            state: CursorState::Ready,
            remaining: limit,
            since_yield: 0,
        }
    }

    /// Yields the next record, or `Ok(None)` once exhausted.
    ///
    /// Exhaustion is terminal and idempotent unless a later
    /// [`seek`](Cursor::seek) repositions within the range. Long unbroken
    /// read loops periodically yield to the executor so a full-store scan
    /// cannot starve other tasks.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn next(&mut self) -> Result<Option<Record>> {
        if self.state == CursorState::Ended {
            return Err(Error::usage("cannot call next() after end()"));
        }
        self.shared.ensure_open()?;

        if self.remaining == 0 {
            return Ok(None);
        }

        self.since_yield += 1;
        if self.since_yield >= YIELD_EVERY {
            self.since_yield = 0;
            tokio::task::yield_now().await;
        }

        let record = self.inner.next().await?;
        if record.is_some() && self.remaining > 0 {
            self.remaining -= 1;
        }
        Ok(record)
    }

    /// Repositions the cursor to the first entry at-or-past `target` in
    /// traversal order (at-or-before when reversed). A target outside the
    /// cursor's range exhausts the cursor rather than escaping it. Does not
    /// reset the entry limit: entries skipped over are not refunded.
    pub fn seek(&mut self, target: impl Into<Bytes>) -> Result<()> {
        if self.state == CursorState::Ended {
            return Err(Error::usage("cannot call seek() after end()"));
        }
        self.shared.ensure_open()?;
        let target = target.into();
        if target.is_empty() {
            return Err(Error::validation("seek target cannot be an empty byte sequence"));
        }
        let stored_target = self.shared.codec.serialize_key(&target);
        self.inner.seek(&stored_target);
        Ok(())
    }

    /// Releases the cursor's backend resources.
    ///
    /// Valid regardless of store status so cursors can always be cleaned
    /// up, but at most once.
    pub async fn end(&mut self) -> Result<()> {
        if self.state == CursorState::Ended {
            return Err(Error::usage("end() already called on cursor"));
        }
        self.state = CursorState::Ended;
        self.inner.end().await
    }
}
