//!
//! Structured error types for cursor traversal.

use thiserror::Error;

/// Errors raised by [`Cursor`](super::Cursor) operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CursorError {
    /// Advancing past the global end, or retreating before the global
    /// beginning.
    #[error("cursor moved out of range")]
    OutOfRange,

    /// The two cursors were obtained from different nodes; their positions
    /// are not comparable.
    #[error("cursors from different nodes are not comparable")]
    Incomparable,

    /// The given node is not an ancestor of the node a cursor was requested
    /// for.
    #[error("node is not an ancestor of the cursor's node")]
    NotAnAncestor,
}

impl CursorError {
    /// Check if this error is an out-of-range traversal.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, CursorError::OutOfRange)
    }
}

// Conversion from CursorError to the main Error type
impl From<CursorError> for crate::Error {
    fn from(err: CursorError) -> Self {
        crate::Error::Cursor(err)
    }
}
