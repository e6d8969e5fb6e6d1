//! A reusable snapshot-view cursor for backends with eager range capture.

use async_trait::async_trait;

use super::{BackendCursor, Record};
use crate::bytes::BytesRange;
use crate::error::Result;

/// Cursor over a materialized, consistent view of a key range.
///
/// Backends that capture their range contents at cursor-creation time (the
/// [`SnapshotSemantics::Snapshot`](super::SnapshotSemantics::Snapshot)
/// family) hand the captured records to this cursor in traversal order and
/// get position tracking and clamping seeks for free.
///
/// `records` must hold the **entire** resolved range, not a limit-truncated
/// prefix: entry limits are enforced by the facade and interact with
/// `seek`, which may jump past entries that were never yielded.
pub struct SnapshotCursor {
    records: Vec<Record>,
    range: BytesRange,
    reverse: bool,
    index: usize,
}

impl SnapshotCursor {
    /// Creates a cursor over `records`, which are already filtered to
    /// `range` and sorted in traversal order (descending when `reverse`).
    pub fn new(records: Vec<Record>, range: BytesRange, reverse: bool) -> Self {
        Self {
            records,
            range,
            reverse,
            index: 0,
        }
    }

    /// A cursor that yields nothing.
    pub fn exhausted() -> Self {
        Self::new(Vec::new(), BytesRange::unbounded(), false)
    }
}

#[async_trait]
impl BackendCursor for SnapshotCursor {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn next(&mut self) -> Result<Option<Record>> {
        if self.index >= self.records.len() {
            Ok(None)
        } else {
            let record = self.records[self.index].clone();
            self.index += 1;
            Ok(Some(record))
        }
    }

    fn seek(&mut self, target: &[u8]) {
        // A target outside the range window clamps to exhaustion rather
        // than escaping the range.
        if !self.range.contains(target) {
            self.index = self.records.len();
            return;
        }

        self.index = if self.reverse {
            self.records
                .partition_point(|record| record.key.as_ref() > target)
        } else {
            self.records
                .partition_point(|record| record.key.as_ref() < target)
        };
    }
}
