//! Store lifecycle status.

use std::fmt;

/// Lifecycle status of a [`Store`](crate::Store).
///
/// `open()` drives `New → Opening → Open` (back to `New` on failure);
/// `close()` drives `Open → Closing → Closed` (back to `Open` on failure);
/// a closed store may be opened again. Data-path operations are only valid
/// while `Open` and fail immediately in any other state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    New,
    Opening,
    Open,
    Closing,
    Closed,
}

impl Status {
    /// True if `open()` may be called from this state.
    pub fn can_open(self) -> bool {
        matches!(self, Status::New | Status::Closed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::New => "new",
            Status::Opening => "opening",
            Status::Open => "open",
            Status::Closing => "closing",
            Status::Closed => "closed",
        };
        f.write_str(name)
    }
}
