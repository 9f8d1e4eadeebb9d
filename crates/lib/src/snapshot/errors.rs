//!
//! Structured error types for subtree snapshots.

use thiserror::Error;

/// Errors raised while writing or reading [`SubtreeSnapshot`](super::SubtreeSnapshot)s.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A recorded fork position points outside the caller's slot list.
    #[error("fork position {index} exceeds the {len} caller slots")]
    SlotOutOfRange {
        /// The recorded slot index.
        index: usize,
        /// How many slots the caller supplied.
        len: usize,
    },

    /// The snapshot's fork position list does not match its children.
    #[error("snapshot records {got} fork positions for {expected} children")]
    ForkPositionCount {
        /// Number of children in document order.
        expected: usize,
        /// Number of recorded fork positions.
        got: usize,
    },
}

impl SnapshotError {
    /// Check if this error indicates a malformed snapshot document.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            SnapshotError::SlotOutOfRange { .. } | SnapshotError::ForkPositionCount { .. }
        )
    }
}

// Conversion from SnapshotError to the main Error type
impl From<SnapshotError> for crate::Error {
    fn from(err: SnapshotError) -> Self {
        crate::Error::Snapshot(err)
    }
}
