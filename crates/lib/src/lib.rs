//!
//! Chronotree: branching timeline trees.
//!
//! A timeline is an append-only sequence of entries ordered by a time key.
//! A [`TimelineTree`] lets a timeline be forked at any of its entries into
//! an independent child timeline, which may itself be forked, forming a
//! tree rooted at the original sequence. Each node logically inherits all
//! ancestor history up to its fork point; cursors traverse that logical
//! sequence seamlessly across fork boundaries.
//!
//! ## Core Concepts
//!
//! * **Entries ([`entry::TimelineEntry`])**: the element contract — an
//!   opaque payload with a totally ordered time key. [`Event`] is a
//!   ready-made `(time, payload)` implementation.
//! * **Nodes ([`tree::NodeId`])**: stable, generation-checked handles into
//!   the tree's arena. The tree owns all nodes; handles never manage
//!   lifetime, and using a handle to a deleted node is a detectable error
//!   rather than undefined behavior.
//! * **Tree surgery ([`tree::TimelineTree`])**: fork, delete, attach and
//!   detach with a copied begin, trimming, and size queries.
//! * **Cursors ([`cursor::Cursor`])**: read-only traversal over a node's
//!   logical (ancestor-inclusive) sequence, with exact and lower-bound
//!   search.
//! * **Snapshots ([`snapshot::SubtreeSnapshot`])**: recursive subtree
//!   serialization that preserves caller-held node identities across a
//!   save/restore cycle.
//!
//! The tree orders, stores, and branches entries; it never interprets
//! payloads. It provides no internal synchronization: callers sharing a
//! tree across threads must serialize access externally.

pub mod cursor;
pub mod entry;
pub mod snapshot;
pub mod timeline;
pub mod tree;

pub use cursor::Cursor;
pub use entry::{Event, TimelineEntry};
pub use snapshot::{Litter, SubtreeSnapshot};
pub use timeline::{Position, Timeline};
pub use tree::{NodeId, TimelineTree};

/// Result type used throughout the chronotree library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the chronotree library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured ordering errors from the timeline module
    #[error(transparent)]
    Timeline(timeline::TimelineError),

    /// Structured tree-surgery errors from the tree module
    #[error(transparent)]
    Tree(tree::TreeError),

    /// Structured traversal errors from the cursor module
    #[error(transparent)]
    Cursor(cursor::CursorError),

    /// Structured serialization errors from the snapshot module
    #[error(transparent)]
    Snapshot(snapshot::SnapshotError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Serialize(_) => "serialize",
            Error::Timeline(_) => "timeline",
            Error::Tree(_) => "tree",
            Error::Cursor(_) => "cursor",
            Error::Snapshot(_) => "snapshot",
        }
    }

    /// Check if this error indicates a stale node handle.
    pub fn is_stale_handle(&self) -> bool {
        match self {
            Error::Tree(tree_err) => tree_err.is_stale_handle(),
            _ => false,
        }
    }

    /// Check if this error indicates a cursor moved out of range.
    pub fn is_cursor_out_of_range(&self) -> bool {
        match self {
            Error::Cursor(cursor_err) => cursor_err.is_out_of_range(),
            _ => false,
        }
    }

    /// Check if this error is a caller contract violation (the conditions
    /// the original design treated as fatal assertions).
    pub fn is_contract_violation(&self) -> bool {
        match self {
            Error::Tree(tree_err) => tree_err.is_contract_violation(),
            Error::Cursor(_) => true,
            Error::Timeline(_) => true,
            _ => false,
        }
    }

    /// Check if this error is serialization-related.
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::Serialize(_) | Error::Snapshot(_))
    }
}
