//!
//! Structured error types for tree-surgery operations.
//!
//! Every variant except [`TreeError::StaleHandle`] represents a caller
//! contract violation. The embedding application decides whether to abort
//! or propagate; nothing here is a transient condition with a retry path.

use thiserror::Error;

/// Errors raised by [`TimelineTree`](super::TimelineTree) operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TreeError {
    /// The handle refers to an arena slot that has been freed or reused.
    #[error("stale node handle {index}v{generation}")]
    StaleHandle {
        /// Slot index of the offending handle.
        index: u32,
        /// Generation the handle was minted with.
        generation: u32,
    },

    /// The node is not a current child of the claimed parent.
    #[error("node is not a child of the claimed parent")]
    NotAChild,

    /// The operation requires a root node.
    #[error("operation requires a root node")]
    NotARoot,

    /// The operation requires a non-root node.
    #[error("node is already a root")]
    AlreadyRoot,

    /// Forks cannot be deleted before the node's own fork time.
    #[error("cannot delete forks at {time}, before the node's own fork time {fork_time}")]
    ForkBeforeOrigin {
        /// The requested cutoff time.
        time: String,
        /// The node's own fork time.
        fork_time: String,
    },

    /// Direct children were found forked before the given time.
    #[error("{count} forks found before {time}")]
    ForksBeforeTime {
        /// How many children are forked too early.
        count: usize,
        /// The time they had to fork at or after.
        time: String,
    },

    /// The subtree to attach has no entries of its own.
    #[error("subtree to attach has an empty timeline")]
    EmptyTimeline,

    /// Attaching the subtree would make a node its own ancestor.
    #[error("attaching the subtree would create a cycle")]
    WouldCycle,

    /// A timeline position does not denote an entry of the node.
    #[error("position {index} is out of range for a timeline of {len} entries")]
    PositionOutOfRange {
        /// The offending index.
        index: usize,
        /// The timeline length.
        len: usize,
    },

    /// The first entry cannot be removed while a child forks at it.
    #[error("a child still forks at the entry being removed")]
    ChildAtRemovedEntry,
}

impl TreeError {
    /// Check if this error is a stale-handle error.
    pub fn is_stale_handle(&self) -> bool {
        matches!(self, TreeError::StaleHandle { .. })
    }

    /// Check if this error is a caller contract violation.
    pub fn is_contract_violation(&self) -> bool {
        !self.is_stale_handle()
    }
}

// Conversion from TreeError to the main Error type
impl From<TreeError> for crate::Error {
    fn from(err: TreeError) -> Self {
        crate::Error::Tree(err)
    }
}
