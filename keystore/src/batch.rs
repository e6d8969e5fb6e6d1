//! Chained batch builder.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use common::{BatchOp, Error, Result};

use crate::store::{validate_key, Shared};

/// An accumulating batch bound to the store that created it.
///
/// Operations queue up through [`put`](Batch::put), [`delete`](Batch::delete)
/// and [`clear`](Batch::clear), none of which touch the backend; the whole
/// batch is applied atomically by a single [`write`](Batch::write). A batch
/// can be written at most once, and every method fails with a usage error
/// after `write` has been called, whatever its outcome was.
pub struct Batch {
    shared: Arc<Shared>,
    ops: Vec<BatchOp>,
    written: bool,
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("ops", &self.ops.len())
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

impl Batch {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            ops: Vec::new(),
            written: false,
        }
    }

    fn ensure_unwritten(&self) -> Result<()> {
        if self.written {
            Err(Error::usage("write() already called on this batch"))
        } else {
            Ok(())
        }
    }

    /// Queues an insert-or-overwrite.
    pub fn put(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<&mut Self> {
        self.ensure_unwritten()?;
        self.ops.push(BatchOp::put(key, value));
        Ok(self)
    }

    /// Queues a delete.
    pub fn delete(&mut self, key: impl Into<Bytes>) -> Result<&mut Self> {
        self.ensure_unwritten()?;
        self.ops.push(BatchOp::delete(key));
        Ok(self)
    }

    /// Discards every queued operation, leaving the batch reusable.
    pub fn clear(&mut self) -> Result<&mut Self> {
        self.ensure_unwritten()?;
        self.ops.clear();
        Ok(self)
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies the queued operations as one indivisible unit.
    ///
    /// Every queued key is validated before any operation is applied; a
    /// single invalid key fails the whole batch and changes nothing. The
    /// batch is consumed whether or not the write succeeds. Writing an
    /// empty batch succeeds without touching the backend.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn write(&mut self) -> Result<()> {
        self.ensure_unwritten()?;
        self.written = true;

        self.shared.ensure_open()?;
        let ops = std::mem::take(&mut self.ops);
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
}
