//! Shared helpers for the integration tests.

use chronotree::{Event, NodeId, TimelineTree};

/// The entry type used throughout the integration tests: an integer time
/// key with a human-readable payload.
pub type Entry = Event<i64, String>;
pub type Tree = TimelineTree<Entry>;

/// Creates an entry at `time` with a payload derived from it.
pub fn entry(time: i64) -> Entry {
    Event::new(time, format!("event@{time}"))
}

/// Creates a tree whose root timeline holds the given times.
pub fn tree_with_times(times: &[i64]) -> Tree {
    let mut tree = Tree::new();
    let root = tree.root();
    for &t in times {
        tree.append(root, entry(t)).unwrap();
    }
    tree
}

/// Forks `parent` at the entry recorded exactly at `time` and appends the
/// given times to the new branch.
pub fn fork_at(tree: &mut Tree, parent: NodeId, time: i64, own_times: &[i64]) -> NodeId {
    let position = tree
        .timeline(parent)
        .unwrap()
        .find(time);
    assert!(
        !position.is_end(),
        "fork time {time} not present in the parent's own timeline"
    );
    let child = tree.fork(parent, position).unwrap();
    for &t in own_times {
        tree.append(child, entry(t)).unwrap();
    }
    child
}

/// The logical sequence of `id` as a vector of times.
pub fn times(tree: &Tree, id: NodeId) -> Vec<i64> {
    tree.iter(id).unwrap().map(|e| e.time).collect()
}

/// The logical sequence of `id` collected by retreating from the end, for
/// checking that both traversal directions agree.
pub fn times_backward(tree: &Tree, id: NodeId) -> Vec<i64> {
    let mut cursor = tree.end(id).unwrap();
    let mut collected = Vec::new();
    while cursor.retreat(tree).is_ok() {
        collected.push(cursor.time(tree).unwrap().unwrap());
    }
    collected.reverse();
    collected
}

/// Asserts the structural invariants every tree operation must preserve for
/// `id`: size agrees with traversal, both traversal directions agree, and
/// times are strictly increasing.
pub fn assert_consistent(tree: &Tree, id: NodeId) {
    let forward = times(tree, id);
    assert_eq!(forward.len(), tree.size(id).unwrap());
    assert_eq!(forward, times_backward(tree, id));
    assert!(forward.windows(2).all(|w| w[0] < w[1]));
}
