//!
//! Subtree serialization: tree-shaped snapshots of a node and its forks.
//!
//! A [`SubtreeSnapshot`] records one node's own timeline plus its children
//! grouped into [`Litter`]s, one per distinct fork time, in fork-time order
//! with insertion order preserved inside each litter. Snapshots nest
//! recursively, mirroring the tree topology.
//!
//! External identity references survive a save/restore cycle through the
//! *nodes of interest* protocol: on write, the caller passes a list of
//! handles; each child matching a slot has that slot's index recorded in
//! the snapshot (and the slot cleared, so a handle matches at most once).
//! On read, every recorded index receives the freshly created handle for
//! the corresponding reconstructed node, letting the caller recover direct
//! references without re-walking the tree. Documents written by older
//! schemas carry no fork positions and deserialize with all slots left
//! unset.

mod errors;

pub use errors::SnapshotError;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Result,
    entry::TimelineEntry,
    tree::{NodeId, TimelineTree},
};

/// Serialized form of one node: its own timeline and its children grouped
/// by fork time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "E: Serialize, E::Time: Serialize",
    deserialize = "E: Deserialize<'de>, E::Time: Deserialize<'de>"
))]
pub struct SubtreeSnapshot<E: TimelineEntry> {
    /// The node's own entries, in time order.
    pub timeline: Vec<E>,
    /// Children grouped by fork time, in fork-time order.
    pub litters: Vec<Litter<E>>,
    /// For each child in document order, the caller slot it was requested
    /// under, if any. Absent in documents written by older schemas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_positions: Option<Vec<Option<u32>>>,
}

/// All children forked at one instant, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "E: Serialize, E::Time: Serialize",
    deserialize = "E: Deserialize<'de>, E::Time: Deserialize<'de>"
))]
pub struct Litter<E: TimelineEntry> {
    /// The shared fork time.
    pub fork_time: E::Time,
    /// The subtrees forked at that time.
    pub members: Vec<SubtreeSnapshot<E>>,
}

impl<E: TimelineEntry> SubtreeSnapshot<E> {
    /// Number of children recorded, across all litters, in document order.
    pub fn child_count(&self) -> usize {
        self.litters.iter().map(|l| l.members.len()).sum()
    }

    /// Serializes the snapshot to JSON.
    pub fn to_json(&self) -> Result<String>
    where
        E: Serialize,
        E::Time: Serialize,
    {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self>
    where
        E: DeserializeOwned,
        E::Time: DeserializeOwned,
    {
        Ok(serde_json::from_str(json)?)
    }
}

impl<E: TimelineEntry + Clone> TimelineTree<E> {
    /// Serializes `id`'s own timeline and its entire subtree.
    ///
    /// Each child found in `nodes_of_interest` has the slot's index
    /// recorded in the snapshot and the slot cleared, preventing duplicate
    /// matches. Pass an empty slice when no identities need recovering.
    pub fn write_subtree(
        &self,
        id: NodeId,
        nodes_of_interest: &mut [Option<NodeId>],
    ) -> Result<SubtreeSnapshot<E>> {
        let node = self.node(id)?;
        let mut litters: Vec<Litter<E>> = Vec::new();
        let mut fork_positions: Vec<Option<u32>> = Vec::with_capacity(node.children.len());
        for &(fork_time, child) in &node.children {
            let slot = nodes_of_interest
                .iter()
                .position(|slot| *slot == Some(child));
            if let Some(index) = slot {
                nodes_of_interest[index] = None;
            }
            fork_positions.push(slot.map(|index| index as u32));

            let start_new_litter = litters.last().is_none_or(|l| l.fork_time != fork_time);
            if start_new_litter {
                litters.push(Litter {
                    fork_time,
                    members: Vec::new(),
                });
            }
            let member = self.write_subtree(child, nodes_of_interest)?;
            litters
                .last_mut()
                .expect("a litter was just pushed")
                .members
                .push(member);
        }
        tracing::trace!(node = %id, children = fork_positions.len(), "wrote subtree");
        Ok(SubtreeSnapshot {
            timeline: node.timeline.entries().to_vec(),
            litters,
            fork_positions: Some(fork_positions),
        })
    }

    /// Reconstructs a subtree from `snapshot` under `id`, which is expected
    /// to be a freshly created node with an empty timeline.
    ///
    /// Every recorded fork position writes the freshly created child's
    /// handle into the matching entry of `slots`. Snapshots without fork
    /// positions (older schemas) leave all slots unset.
    pub fn read_subtree(
        &mut self,
        id: NodeId,
        snapshot: &SubtreeSnapshot<E>,
        slots: &mut [Option<NodeId>],
    ) -> Result<()> {
        let child_count = snapshot.child_count();
        if let Some(fork_positions) = &snapshot.fork_positions {
            if fork_positions.len() != child_count {
                return Err(SnapshotError::ForkPositionCount {
                    expected: child_count,
                    got: fork_positions.len(),
                }
                .into());
            }
            for recorded in fork_positions.iter().flatten() {
                if *recorded as usize >= slots.len() {
                    return Err(SnapshotError::SlotOutOfRange {
                        index: *recorded as usize,
                        len: slots.len(),
                    }
                    .into());
                }
            }
        }

        for entry in &snapshot.timeline {
            self.append(id, entry.clone())?;
        }

        let mut document_index = 0;
        for litter in &snapshot.litters {
            let position = self.node(id)?.timeline.find(litter.fork_time);
            for member in &litter.members {
                let child = self.new_fork(id, position, litter.fork_time)?;
                self.read_subtree(child, member, slots)?;
                if let Some(fork_positions) = &snapshot.fork_positions {
                    if let Some(slot) = fork_positions[document_index] {
                        slots[slot as usize] = Some(child);
                    }
                }
                document_index += 1;
            }
        }
        tracing::trace!(node = %id, children = child_count, "read subtree");
        Ok(())
    }
}
