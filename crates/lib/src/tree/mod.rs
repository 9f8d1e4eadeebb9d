//!
//! The branching timeline tree.
//!
//! A [`TimelineTree`] owns every node in an arena addressed by stable
//! [`NodeId`] handles. The parent → child direction is the owning one;
//! child → parent back-references are plain handles that never manage
//! lifetime. Handles carry a generation counter, so resolving a handle
//! whose node has been deleted yields [`TreeError::StaleHandle`] instead of
//! undefined behavior.
//!
//! Each node owns its own [`Timeline`] plus a collection of children keyed
//! by fork time. The key is non-unique: several children may fork at the
//! same instant, and their insertion order is preserved (it matters for
//! serialization). The *logical* sequence of a node is the concatenation of
//! all ancestor timelines truncated at their respective fork points,
//! followed by the node's own timeline; cursors over that sequence live in
//! [`crate::cursor`].

mod errors;

use std::fmt;

pub use errors::TreeError;

use crate::{
    Result,
    entry::TimelineEntry,
    timeline::{Position, Timeline, TimelineError},
};

/// Stable handle to a node of a [`TimelineTree`].
///
/// Handles are plain copyable values. A handle outliving its node does not
/// keep anything alive; using it simply fails with
/// [`TreeError::StaleHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// One node: its own timeline, its owner, and its forked children.
#[derive(Debug, Clone)]
pub(crate) struct Node<E: TimelineEntry> {
    pub(crate) timeline: Timeline<E>,
    /// Owning node, `None` for a root.
    pub(crate) parent: Option<NodeId>,
    /// Position in the parent's timeline from which this node branches.
    /// `Position::End` is the sentinel for "forked after the last
    /// currently-known entry of the parent". Meaningless for a root.
    pub(crate) fork_position: Position,
    /// Children ordered by fork time, insertion order preserved within
    /// equal times.
    pub(crate) children: Vec<(E::Time, NodeId)>,
    /// Index of this node's entry in the parent's `children`.
    /// Meaningless for a root.
    pub(crate) position_in_parent_children: usize,
}

impl<E: TimelineEntry> Node<E> {
    fn new() -> Self {
        Self {
            timeline: Timeline::new(),
            parent: None,
            fork_position: Position::End,
            children: Vec::new(),
            position_in_parent_children: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<E: TimelineEntry> {
    generation: u32,
    node: Option<Node<E>>,
}

/// A branching timeline tree.
///
/// The tree starts as a single root with an empty timeline. Entries are
/// appended in time order; forking at any entry creates an independent
/// child timeline that logically inherits all history up to its fork point.
///
/// # Example
///
/// ```
/// use chronotree::{Event, Position, TimelineTree};
///
/// let mut tree: TimelineTree<Event<i64, &str>> = TimelineTree::new();
/// let root = tree.root();
/// for t in [0, 1, 2, 3] {
///     tree.append(root, Event::new(t, "history"))?;
/// }
///
/// // Fork at t = 1 and extend the branch independently.
/// let branch = tree.fork(root, Position::At(1))?;
/// tree.append(branch, Event::new(10, "what if"))?;
///
/// // The branch logically contains [0, 1, 10].
/// assert_eq!(tree.size(branch)?, 3);
/// let times: Vec<i64> = tree.iter(branch)?.map(|e| e.time).collect();
/// assert_eq!(times, [0, 1, 10]);
/// # Ok::<(), chronotree::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TimelineTree<E: TimelineEntry> {
    slots: Vec<Slot<E>>,
    free: Vec<u32>,
    root: NodeId,
}

impl<E: TimelineEntry> TimelineTree<E> {
    /// Creates a tree holding a single empty root.
    pub fn new() -> Self {
        let root = NodeId {
            index: 0,
            generation: 0,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::new()),
            }],
            free: Vec::new(),
            root,
        }
    }

    /// The root the tree was created with.
    ///
    /// Detached subtrees live in the same arena as freestanding roots; this
    /// accessor always returns the original one.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node<E>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or_else(|| {
                TreeError::StaleHandle {
                    index: id.index,
                    generation: id.generation,
                }
                .into()
            })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<E>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or_else(|| {
                TreeError::StaleHandle {
                    index: id.index,
                    generation: id.generation,
                }
                .into()
            })
    }

    fn allocate(&mut self, node: Node<E>) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    /// Frees a slot. The generation bump invalidates every outstanding
    /// handle to it.
    fn release(&mut self, id: NodeId) -> Option<Node<E>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        slot.node.take()
    }

    fn release_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.release(id) {
            for (_, child) in node.children {
                self.release_subtree(child);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// Whether `id` is a root (has no parent).
    pub fn is_root(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.parent.is_none())
    }

    /// The owning parent of `id`, or `None` for a root.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// The root of the chain `id` belongs to.
    pub fn root_of(&self, id: NodeId) -> Result<NodeId> {
        let mut current = id;
        while let Some(parent) = self.node(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// The direct children of `id`, in fork-time order (insertion order
    /// within equal fork times).
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.node(id)?.children.iter().map(|(_, c)| *c).collect())
    }

    /// The instant at which `id` forked from its parent, or `None` for a
    /// root. This is the node's key in the parent's children collection.
    pub fn fork_time(&self, id: NodeId) -> Result<Option<E::Time>> {
        let node = self.node(id)?;
        match node.parent {
            None => Ok(None),
            Some(parent) => {
                let entry = self
                    .node(parent)?
                    .children
                    .get(node.position_in_parent_children)
                    .copied()
                    .ok_or(TreeError::NotAChild)?;
                Ok(Some(entry.0))
            }
        }
    }

    /// The node's own timeline (ancestor history not included).
    pub fn timeline(&self, id: NodeId) -> Result<&Timeline<E>> {
        Ok(&self.node(id)?.timeline)
    }

    /// Number of entries in the logical sequence of `id`: its own timeline
    /// plus, for each ancestor, the entries up to and including the
    /// descendant's fork position. Additive walk up the chain, not a
    /// traversal.
    pub fn size(&self, id: NodeId) -> Result<usize> {
        let mut node = self.node(id)?;
        let mut size = node.timeline.len();
        while let Some(parent_id) = node.parent {
            let parent = self.node(parent_id)?;
            if !parent.timeline.is_empty() {
                size += match node.fork_position {
                    Position::At(index) => index + 1,
                    Position::End => parent.timeline.len(),
                };
            }
            node = parent;
        }
        Ok(size)
    }

    /// Whether the logical sequence of `id` is empty. A non-root node is
    /// never empty: it always inherits at least its fork point.
    pub fn is_empty(&self, id: NodeId) -> Result<bool> {
        let node = self.node(id)?;
        Ok(node.parent.is_none() && node.timeline.is_empty())
    }

    /// The node's fork point with the end sentinel resolved: walks up
    /// through ancestors forked "past the end" until a real position is
    /// found. `None` for a root, or when the sentinel persists all the way
    /// to the root.
    pub(crate) fn resolved_fork_point(&self, id: NodeId) -> Result<Option<(NodeId, Position)>> {
        let node = self.node(id)?;
        let mut parent = match node.parent {
            None => return Ok(None),
            Some(parent) => parent,
        };
        let mut position = node.fork_position;
        loop {
            let parent_node = self.node(parent)?;
            if !position.is_end() || parent_node.parent.is_none() {
                break;
            }
            position = parent_node.fork_position;
            parent = match parent_node.parent {
                Some(grandparent) => grandparent,
                None => break,
            };
        }
        Ok(Some((parent, position)))
    }

    fn resolved_fork_time(&self, id: NodeId) -> Result<Option<E::Time>> {
        match self.resolved_fork_point(id)? {
            Some((ancestor, Position::At(index))) => {
                Ok(self.node(ancestor)?.timeline.get(index).map(|e| e.time()))
            }
            _ => Ok(None),
        }
    }

    // ---------------------------------------------------------------------
    // Timeline mutation
    // ---------------------------------------------------------------------

    /// Appends an entry to the node's own timeline.
    ///
    /// The entry must come strictly after the node's last own entry; the
    /// first entry of a non-root node must not precede its fork time.
    pub fn append(&mut self, id: NodeId, entry: E) -> Result<()> {
        let fork_time = self.fork_time(id)?;
        let node = self.node_mut(id)?;
        if node.timeline.is_empty() {
            if let Some(fork_time) = fork_time {
                if entry.time() < fork_time {
                    return Err(TimelineError::NotAfter {
                        bound: format!("{fork_time:?}"),
                        time: format!("{:?}", entry.time()),
                    }
                    .into());
                }
            }
        }
        node.timeline.push(entry)?;
        Ok(())
    }

    /// Inserts an entry before the node's first own entry, shifting the
    /// fork references of its children accordingly.
    ///
    /// This is the first half of the copied-begin maneuver: before
    /// [`detach_with_copied_begin`](Self::detach_with_copied_begin), the
    /// caller copies the fork-point entry to the head of the timeline so
    /// the detached root starts with a known point.
    pub fn prepend(&mut self, id: NodeId, entry: E) -> Result<()> {
        let node = self.node_mut(id)?;
        node.timeline.push_front(entry)?;
        let children: Vec<NodeId> = node.children.iter().map(|(_, c)| *c).collect();
        for child in children {
            let child_node = self.node_mut(child)?;
            if let Position::At(index) = child_node.fork_position {
                child_node.fork_position = Position::At(index + 1);
            }
        }
        Ok(())
    }

    /// Removes and returns the node's first own entry, shifting the fork
    /// references of its children accordingly.
    ///
    /// This is the second half of the copied-begin maneuver: after
    /// [`attach_with_copied_begin`](Self::attach_with_copied_begin), the
    /// duplicated first entry of the grafted node is absorbed into the
    /// parent. Fails with [`TreeError::ChildAtRemovedEntry`] if a child
    /// still forks at the entry being removed.
    pub fn pop_front(&mut self, id: NodeId) -> Result<Option<E>> {
        let node = self.node(id)?;
        if node.timeline.is_empty() {
            return Ok(None);
        }
        let children: Vec<NodeId> = node.children.iter().map(|(_, c)| *c).collect();
        for child in &children {
            if self.node(*child)?.fork_position == Position::At(0) {
                return Err(TreeError::ChildAtRemovedEntry.into());
            }
        }
        for child in children {
            let child_node = self.node_mut(child)?;
            if let Position::At(index) = child_node.fork_position {
                child_node.fork_position = Position::At(index - 1);
            }
        }
        Ok(self.node_mut(id)?.timeline.pop_front())
    }

    /// Forgets everything strictly after `time`: children forked after it
    /// and the node's own later entries. Children and entries at exactly
    /// `time` survive.
    pub fn forget_after(&mut self, id: NodeId, time: E::Time) -> Result<()> {
        self.delete_forks_after(id, time)?;
        self.node_mut(id)?.timeline.truncate_after(time);
        tracing::debug!(node = %id, time = ?time, "forgot entries after");
        Ok(())
    }

    /// Forgets every own entry strictly before `time`. Root only; fails
    /// with [`TreeError::ForksBeforeTime`] if a child forks before `time`
    /// (a child forked exactly at `time` is acceptable).
    pub fn forget_before(&mut self, id: NodeId, time: E::Time) -> Result<()> {
        self.check_no_forks_before(id, time)?;
        let node = self.node_mut(id)?;
        let removed = node.timeline.truncate_before(time);
        if removed > 0 {
            let children: Vec<NodeId> = node.children.iter().map(|(_, c)| *c).collect();
            for child in children {
                let child_node = self.node_mut(child)?;
                if let Position::At(index) = child_node.fork_position {
                    child_node.fork_position = Position::At(index - removed);
                }
            }
        }
        tracing::debug!(node = %id, time = ?time, removed, "forgot entries before");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Tree surgery
    // ---------------------------------------------------------------------

    /// Creates a new child of `id`, forked at `position`.
    ///
    /// The fork time is the time of the entry at `position`, or, for
    /// `Position::End`, the node's own fork time — forking "at the end" of
    /// a node with no further data inherits the node's own fork point, so
    /// it requires a non-root node ([`TreeError::AlreadyRoot`]).
    ///
    /// The child starts with an empty timeline; it is owned by `id` and
    /// returned as a handle.
    pub fn fork(&mut self, id: NodeId, position: Position) -> Result<NodeId> {
        let time = match position {
            Position::At(index) => {
                let timeline = &self.node(id)?.timeline;
                timeline
                    .get(index)
                    .map(|e| e.time())
                    .ok_or(TreeError::PositionOutOfRange {
                        index,
                        len: timeline.len(),
                    })?
            }
            Position::End => self.fork_time(id)?.ok_or(TreeError::AlreadyRoot)?,
        };
        self.new_fork(id, position, time)
    }

    pub(crate) fn new_fork(
        &mut self,
        parent: NodeId,
        position: Position,
        time: E::Time,
    ) -> Result<NodeId> {
        self.node(parent)?;
        let child = self.allocate(Node::new());
        self.insert_child(parent, time, child, position)?;
        tracing::trace!(parent = %parent, child = %child, time = ?time, "forked");
        Ok(child)
    }

    /// Inserts `child` into `parent`'s children keyed at `time`, after any
    /// existing children with the same key, and wires up the back
    /// references.
    fn insert_child(
        &mut self,
        parent: NodeId,
        time: E::Time,
        child: NodeId,
        fork_position: Position,
    ) -> Result<()> {
        let index = {
            let parent_node = self.node_mut(parent)?;
            let index = parent_node.children.partition_point(|(t, _)| *t <= time);
            parent_node.children.insert(index, (time, child));
            index
        };
        self.refresh_child_positions(parent, index)?;
        let child_node = self.node_mut(child)?;
        child_node.parent = Some(parent);
        child_node.fork_position = fork_position;
        Ok(())
    }

    /// Re-derives `position_in_parent_children` for the children of
    /// `parent` starting at `from`, after an insertion or removal shifted
    /// them.
    fn refresh_child_positions(&mut self, parent: NodeId, from: usize) -> Result<()> {
        let shifted: Vec<(usize, NodeId)> = self.node(parent)?.children[from..]
            .iter()
            .enumerate()
            .map(|(offset, (_, child))| (from + offset, *child))
            .collect();
        for (position, child) in shifted {
            self.node_mut(child)?.position_in_parent_children = position;
        }
        Ok(())
    }

    /// Removes and destroys `child` and its entire subtree.
    ///
    /// Fails with [`TreeError::NotAChild`] if `child` is not a current
    /// child of `parent`. Every handle into the deleted subtree becomes
    /// stale.
    pub fn delete_fork(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        let position = {
            let child_node = self.node(child)?;
            if child_node.parent != Some(parent) {
                return Err(TreeError::NotAChild.into());
            }
            child_node.position_in_parent_children
        };
        tracing::debug!(parent = %parent, child = %child, "deleting fork");
        self.node_mut(parent)?.children.remove(position);
        self.refresh_child_positions(parent, position)?;
        self.release_subtree(child);
        Ok(())
    }

    /// Grafts a freestanding root under `id`.
    ///
    /// `subtree_root`'s own timeline must begin with a copy of an entry
    /// already present one position earlier in `id`'s timeline; the graft
    /// is keyed at that first entry's time, and the caller is expected to
    /// absorb the duplicate afterwards with [`pop_front`](Self::pop_front).
    /// Children of `subtree_root` forked at that first entry are rewritten
    /// to the end sentinel, since the shared entry is about to leave the
    /// subtree's own timeline.
    ///
    /// Fails with [`TreeError::NotARoot`] if `subtree_root` has a parent,
    /// [`TreeError::EmptyTimeline`] if it has no entries, and
    /// [`TreeError::WouldCycle`] if it is the root of `id`'s own chain.
    pub fn attach_with_copied_begin(&mut self, id: NodeId, subtree_root: NodeId) -> Result<()> {
        let (first_time, grandchildren) = {
            let subtree = self.node(subtree_root)?;
            if subtree.parent.is_some() {
                return Err(TreeError::NotARoot.into());
            }
            let first_time = match subtree.timeline.first() {
                Some(first) => first.time(),
                None => return Err(TreeError::EmptyTimeline.into()),
            };
            let grandchildren: Vec<NodeId> = subtree.children.iter().map(|(_, c)| *c).collect();
            (first_time, grandchildren)
        };
        if self.root_of(id)? == subtree_root {
            return Err(TreeError::WouldCycle.into());
        }

        // The entry the grandchildren forked at is about to be absorbed into
        // `id`'s timeline; only the end sentinel can express that.
        for grandchild in grandchildren {
            let node = self.node_mut(grandchild)?;
            if node.fork_position == Position::At(0) {
                node.fork_position = Position::End;
            }
        }

        // The graft forks at the entry preceding the copied begin, which is
        // the last entry of `id`'s timeline, or past the end when there is
        // none yet.
        let fork_position = match self.node(id)?.timeline.len() {
            0 => Position::End,
            len => Position::At(len - 1),
        };
        self.insert_child(id, first_time, subtree_root, fork_position)?;
        tracing::debug!(node = %id, subtree = %subtree_root, time = ?first_time, "attached subtree");
        Ok(())
    }

    /// Detaches `id` from its parent, leaving it in the arena as a
    /// freestanding root owned by the caller through its handle.
    ///
    /// The caller must first ensure the timeline starts with a copy of the
    /// fork-point entry (see [`prepend`](Self::prepend)): children that
    /// carried the end sentinel — forked at a point that was not in this
    /// node's own timeline — are rewritten to the now-existing first entry.
    ///
    /// Fails with [`TreeError::AlreadyRoot`] if `id` has no parent.
    pub fn detach_with_copied_begin(&mut self, id: NodeId) -> Result<NodeId> {
        let (parent, position, has_entries, children) = {
            let node = self.node(id)?;
            let parent = match node.parent {
                Some(parent) => parent,
                None => return Err(TreeError::AlreadyRoot.into()),
            };
            let children: Vec<NodeId> = node.children.iter().map(|(_, c)| *c).collect();
            (
                parent,
                node.position_in_parent_children,
                !node.timeline.is_empty(),
                children,
            )
        };

        // Children forked past the end now have a real starting point.
        if has_entries {
            for child in children {
                let node = self.node_mut(child)?;
                if node.fork_position == Position::End {
                    node.fork_position = Position::At(0);
                }
            }
        }

        self.node_mut(parent)?.children.remove(position);
        self.refresh_child_positions(parent, position)?;

        let node = self.node_mut(id)?;
        node.parent = None;
        node.fork_position = Position::End;
        node.position_in_parent_children = 0;
        tracing::debug!(node = %id, parent = %parent, "detached subtree");
        Ok(id)
    }

    /// Removes every child forked strictly after `time`, destroying their
    /// subtrees. Children forked exactly at `time` survive.
    ///
    /// Fails with [`TreeError::ForkBeforeOrigin`] if `time` precedes the
    /// node's own fork time: forks cannot be deleted before the point where
    /// the node itself began.
    pub fn delete_forks_after(&mut self, id: NodeId, time: E::Time) -> Result<()> {
        if let Some(fork_time) = self.resolved_fork_time(id)? {
            if time < fork_time {
                return Err(TreeError::ForkBeforeOrigin {
                    time: format!("{time:?}"),
                    fork_time: format!("{fork_time:?}"),
                }
                .into());
            }
        }
        let removed: Vec<NodeId> = {
            let node = self.node_mut(id)?;
            let cut = node.children.partition_point(|(t, _)| *t <= time);
            node.children
                .split_off(cut)
                .into_iter()
                .map(|(_, c)| c)
                .collect()
        };
        if !removed.is_empty() {
            tracing::debug!(node = %id, time = ?time, count = removed.len(), "deleting forks after");
        }
        for child in removed {
            self.release_subtree(child);
        }
        Ok(())
    }

    /// Root-only invariant assertion: fails with
    /// [`TreeError::ForksBeforeTime`] if any direct child is forked
    /// strictly before `time`. A child forked exactly at `time` is
    /// acceptable.
    pub fn check_no_forks_before(&self, id: NodeId, time: E::Time) -> Result<()> {
        let node = self.node(id)?;
        if node.parent.is_some() {
            return Err(TreeError::NotARoot.into());
        }
        let count = node.children.partition_point(|(t, _)| *t < time);
        if count > 0 {
            return Err(TreeError::ForksBeforeTime {
                count,
                time: format!("{time:?}"),
            }
            .into());
        }
        Ok(())
    }
}

impl<E: TimelineEntry> Default for TimelineTree<E> {
    fn default() -> Self {
        Self::new()
    }
}
