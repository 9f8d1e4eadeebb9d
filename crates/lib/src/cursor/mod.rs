//!
//! Cursors: traversal over a node's logical, ancestor-inclusive sequence.
//!
//! The logical sequence of a node is the concatenation of all ancestor
//! timelines truncated at their respective fork points, followed by the
//! node's own timeline. A [`Cursor`] walks that sequence, crossing fork
//! boundaries transparently in both directions.
//!
//! A cursor retains the chain of ancestors between the node it was obtained
//! from and the node whose timeline currently contains its position. The
//! chain holds plain [`NodeId`] handles: structural mutation of any node on
//! the chain invalidates the cursor, which is detected at the next use as
//! [`TreeError::StaleHandle`](crate::tree::TreeError::StaleHandle) at node
//! granularity. Appending to an ancestor's timeline shifts no indices and
//! keeps cursors valid; removing entries (`pop_front`, `forget_before`)
//! does not, and is a documented caller discipline.
//!
//! End cursors are kept canonical by a single normalization rule: whenever
//! the position reaches the end of the innermost retained timeline with
//! more than one ancestor retained, the cursor collapses to its origin node
//! alone, positioned at that node's own end. Two end cursors for the same
//! node therefore always compare equal.

mod errors;

use std::collections::VecDeque;

pub use errors::CursorError;

use crate::{
    Result,
    entry::TimelineEntry,
    timeline::Position,
    tree::{NodeId, TimelineTree, TreeError},
};

/// A read-only traversal handle over the logical sequence of a node.
///
/// Obtained from [`TimelineTree::begin`], [`TimelineTree::end`],
/// [`TimelineTree::find`] or [`TimelineTree::lower_bound`]. All operations
/// take the tree explicitly and validate handle liveness.
#[derive(Debug, Clone)]
pub struct Cursor {
    /// Retained ancestor chain. The front is the node whose timeline
    /// contains `position`; the back is the origin node the cursor was
    /// obtained from.
    ancestry: VecDeque<NodeId>,
    /// Position within the front node's own timeline.
    position: Position,
}

impl Cursor {
    fn new(ancestry: VecDeque<NodeId>, position: Position) -> Self {
        debug_assert!(!ancestry.is_empty());
        Self { ancestry, position }
    }

    /// The node this cursor was obtained from.
    pub fn node(&self) -> NodeId {
        *self
            .ancestry
            .back()
            .expect("a cursor always retains at least its origin node")
    }

    /// Whether the cursor is at the end of its logical sequence.
    pub fn is_end(&self) -> bool {
        self.position.is_end()
    }

    fn front(&self) -> NodeId {
        *self
            .ancestry
            .front()
            .expect("a cursor always retains at least its origin node")
    }

    /// Collapses an at-end cursor to its canonical representation: the
    /// origin node alone, positioned at its own timeline end.
    fn normalize_if_end(&mut self) {
        if self.position.is_end() && self.ancestry.len() > 1 {
            let origin = self.node();
            self.ancestry.clear();
            self.ancestry.push_back(origin);
        }
    }

    fn debug_assert_normalized(&self) {
        debug_assert!(
            self.ancestry.len() == 1 || !self.position.is_end(),
            "cursor left unnormalized at an inner timeline end"
        );
    }

    /// The entry under the cursor, or `None` at the end.
    pub fn entry<'t, E: TimelineEntry>(&self, tree: &'t TimelineTree<E>) -> Result<Option<&'t E>> {
        let node = tree.node(self.front())?;
        Ok(match self.position {
            Position::At(index) => node.timeline.get(index),
            Position::End => None,
        })
    }

    /// The time of the entry under the cursor, or `None` at the end.
    pub fn time<E: TimelineEntry>(&self, tree: &TimelineTree<E>) -> Result<Option<E::Time>> {
        Ok(self.entry(tree)?.map(|e| e.time()))
    }

    /// Whether two cursors denote the same position.
    ///
    /// Cursors may be compared only if they were obtained from the same
    /// node; otherwise this fails with [`CursorError::Incomparable`]. The
    /// chain lengths are compared before the positions, so cursors on
    /// different fork branches of the same node compare unequal cheaply.
    pub fn same_position(&self, other: &Cursor) -> Result<bool> {
        if self.node() != other.node() {
            return Err(CursorError::Incomparable.into());
        }
        Ok(self.ancestry.len() == other.ancestry.len()
            && self.position == other.position
            && self.ancestry == other.ancestry)
    }

    /// Moves to the next entry of the logical sequence.
    ///
    /// When the current entry is the fork point of the next node down the
    /// retained chain, the cursor descends into that node's timeline,
    /// skipping through any further chain nodes forked at the same instant.
    /// Fails with [`CursorError::OutOfRange`] at the global end.
    pub fn advance<E: TimelineEntry>(&mut self, tree: &TimelineTree<E>) -> Result<()> {
        let front = tree.node(self.front())?;
        let index = match self.position {
            Position::At(index) => index,
            Position::End => return Err(CursorError::OutOfRange.into()),
        };
        let current_time = front
            .timeline
            .get(index)
            .ok_or(CursorError::OutOfRange)?
            .time();

        if self.ancestry.len() > 1 {
            // See if we reached the fork time of the next node down the
            // chain.
            let child_fork_time = tree
                .fork_time(self.ancestry[1])?
                .ok_or(CursorError::OutOfRange)?;
            if current_time == child_fork_time {
                // There may be several forks at this instant; descend
                // through all of them.
                loop {
                    let child = tree.node(self.ancestry[1])?;
                    self.position = if child.timeline.is_empty() {
                        Position::End
                    } else {
                        Position::At(0)
                    };
                    self.ancestry.pop_front();
                    if self.ancestry.len() < 2 {
                        break;
                    }
                    match tree.fork_time(self.ancestry[1])? {
                        Some(time) if time == current_time => {}
                        _ => break,
                    }
                }
                self.debug_assert_normalized();
                return Ok(());
            }
        }

        // Business as usual, keep moving along the same timeline.
        self.position = if index + 1 < front.timeline.len() {
            Position::At(index + 1)
        } else {
            Position::End
        };
        self.debug_assert_normalized();
        Ok(())
    }

    /// Moves to the previous entry of the logical sequence.
    ///
    /// At the start of the innermost timeline the cursor ascends to the
    /// parent's fork point, walking through empty ancestor timelines until
    /// a non-empty one or the root is reached. Fails with
    /// [`CursorError::OutOfRange`] at the global beginning.
    pub fn retreat<E: TimelineEntry>(&mut self, tree: &TimelineTree<E>) -> Result<()> {
        let front_id = self.front();
        let front = tree.node(front_id)?;
        let at_begin = match self.position {
            Position::At(0) => true,
            Position::At(_) => false,
            Position::End => front.timeline.is_empty(),
        };

        if at_begin {
            let mut ancestor = front_id;
            loop {
                let node = tree.node(ancestor)?;
                let parent = match node.parent {
                    Some(parent) => parent,
                    None => return Err(CursorError::OutOfRange.into()),
                };
                self.position = node.fork_position;
                ancestor = parent;
                self.ancestry.push_front(parent);
                let parent_node = tree.node(parent)?;
                if !self.position.is_end() || parent_node.parent.is_none() {
                    return Ok(());
                }
            }
        }

        self.position = match self.position {
            Position::At(index) => Position::At(index - 1),
            Position::End => Position::At(front.timeline.len() - 1),
        };
        Ok(())
    }
}

impl<E: TimelineEntry> TimelineTree<E> {
    /// A cursor at the logical start of `id`'s sequence: the first entry of
    /// the ultimate root's own timeline, since every node's logical
    /// sequence includes all ancestor history.
    pub fn begin(&self, id: NodeId) -> Result<Cursor> {
        let root = self.root_of(id)?;
        let position = if self.node(root)?.timeline.is_empty() {
            Position::End
        } else {
            Position::At(0)
        };
        self.wrap(id, root, position)
    }

    /// The canonical end cursor of `id`: a chain of length one at the
    /// node's own timeline end.
    pub fn end(&self, id: NodeId) -> Result<Cursor> {
        self.node(id)?;
        Ok(Cursor::new(VecDeque::from([id]), Position::End))
    }

    /// The cursor at the entry of `id`'s logical sequence recorded exactly
    /// at `time`, or the end cursor if there is none.
    ///
    /// Walks the ancestor chain outward from `id` until a timeline whose
    /// first time is at or before `time` is found, then searches within it.
    pub fn find(&self, id: NodeId, time: E::Time) -> Result<Cursor> {
        let mut ancestry = VecDeque::new();
        let mut position = Position::End;
        let mut ancestor = Some(id);
        while let Some(current) = ancestor {
            ancestry.push_front(current);
            let node = self.node(current)?;
            if let Some(first) = node.timeline.first() {
                if first.time() <= time {
                    position = node.timeline.find(time); // May be at end.
                    break;
                }
            }
            position = Position::End;
            ancestor = node.parent;
        }
        let mut cursor = Cursor::new(ancestry, position);
        cursor.normalize_if_end();
        Ok(cursor)
    }

    /// The cursor at the first entry of `id`'s logical sequence with time
    /// at or after `time`, or the end cursor if every entry is earlier.
    ///
    /// When the bound falls past a fork point, the cursor descends to the
    /// first non-empty timeline down the retained chain that is not forked
    /// at its parent's end sentinel. A bound landing exactly on a fork time
    /// stays in the ancestor's timeline, on the branch closest to `id`;
    /// among several same-instant forks only the one on `id`'s own ancestor
    /// chain is ever considered.
    pub fn lower_bound(&self, id: NodeId, time: E::Time) -> Result<Cursor> {
        let mut ancestry: VecDeque<NodeId> = VecDeque::new();
        // Parallel to `ancestry`: the fork position of the next deeper
        // chain node within this node's own timeline; `None` for the
        // innermost node.
        let mut fork_points: VecDeque<Option<Position>> = VecDeque::new();
        fork_points.push_front(None);
        let mut position = Position::End;
        let mut ancestor = Some(id);

        while let Some(current) = ancestor {
            ancestry.push_front(current);
            let node = self.node(current)?;
            let covers = node.timeline.first().is_some_and(|e| e.time() <= time);
            if covers {
                position = node.timeline.lower_bound(time); // May be at end.

                // The raw lower bound is only usable if it falls within
                // this node's portion of the logical sequence, i.e. not
                // past the fork point we came up through.
                let fork_point = *fork_points
                    .front()
                    .expect("fork point stack parallels the ancestry");
                let overshoot = match (position, fork_point) {
                    (Position::End, _) => true,
                    (Position::At(found), Some(Position::At(fork))) => fork < found,
                    _ => false,
                };
                if overshoot {
                    position = Position::End;
                    // Walk back down the chain to the first non-empty
                    // timeline not forked at its parent's end sentinel; its
                    // beginning is the first entry past the bound.
                    let mut cut = None;
                    for level in 1..ancestry.len() {
                        let candidate = self.node(ancestry[level])?;
                        if !candidate.timeline.is_empty()
                            && fork_points[level] != Some(Position::End)
                        {
                            cut = Some(level);
                            break;
                        }
                    }
                    if let Some(level) = cut {
                        ancestry.drain(..level);
                        position = Position::At(0);
                    }
                    // Otherwise the chain holds nothing past the bound and
                    // normalization will produce a proper end cursor.
                }
                break;
            }
            fork_points.push_front(Some(node.fork_position));
            // If no timeline covers the bound, everything is after it and
            // the cursor lands at the outermost timeline's beginning.
            position = if node.timeline.is_empty() {
                Position::End
            } else {
                Position::At(0)
            };
            ancestor = node.parent;
        }

        let mut cursor = Cursor::new(ancestry, position);
        cursor.normalize_if_end();
        Ok(cursor)
    }

    /// The cursor at `id`'s fork point in its parent's logical sequence,
    /// with the end sentinel resolved through empty ancestors.
    ///
    /// Fails with [`TreeError::AlreadyRoot`] for a root node.
    pub fn fork_point(&self, id: NodeId) -> Result<Cursor> {
        let (ancestor, position) = self
            .resolved_fork_point(id)?
            .ok_or(TreeError::AlreadyRoot)?;
        self.wrap(id, ancestor, position)
    }

    /// The first entry of `id`'s logical sequence, or `None` when empty.
    pub fn first(&self, id: NodeId) -> Result<Option<&E>> {
        self.begin(id)?.entry(self)
    }

    /// The last entry of `id`'s logical sequence, or `None` when empty.
    pub fn last(&self, id: NodeId) -> Result<Option<&E>> {
        let mut cursor = self.end(id)?;
        match cursor.retreat(self) {
            Ok(()) => cursor.entry(self),
            Err(err) if err.is_cursor_out_of_range() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Iterates over `id`'s logical sequence in time order.
    pub fn iter(&self, id: NodeId) -> Result<LogicalIter<'_, E>> {
        Ok(LogicalIter {
            tree: self,
            cursor: self.begin(id)?,
            done: false,
        })
    }

    /// Builds a cursor for `id` positioned at `position` within the
    /// timeline of `ancestor`, retaining the chain between the two.
    fn wrap(&self, id: NodeId, ancestor: NodeId, position: Position) -> Result<Cursor> {
        let mut ancestry = VecDeque::new();
        let mut current = id;
        loop {
            ancestry.push_front(current);
            if current == ancestor {
                let cursor = Cursor::new(ancestry, position);
                cursor.debug_assert_normalized();
                return Ok(cursor);
            }
            current = match self.node(current)?.parent {
                Some(parent) => parent,
                None => return Err(CursorError::NotAnAncestor.into()),
            };
        }
    }
}

/// Iterator over a node's logical sequence. Borrowing the tree for the
/// whole iteration rules out structural mutation underneath it.
pub struct LogicalIter<'t, E: TimelineEntry> {
    tree: &'t TimelineTree<E>,
    cursor: Cursor,
    done: bool,
}

impl<'t, E: TimelineEntry> Iterator for LogicalIter<'t, E> {
    type Item = &'t E;

    fn next(&mut self) -> Option<&'t E> {
        if self.done {
            return None;
        }
        let entry = self.cursor.entry(self.tree).ok().flatten()?;
        if self.cursor.advance(self.tree).is_err() {
            self.done = true;
        }
        Some(entry)
    }
}
