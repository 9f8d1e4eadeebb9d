//! Subtree serialization and identity recovery.

use chronotree::SubtreeSnapshot;

use crate::helpers::{Entry, Tree, assert_consistent, fork_at, times, tree_with_times};

/// A history with two tracked branches hanging off it, the way a long-lived
/// timeline accumulates working forks: a main continuation and a prediction
/// forked further down.
fn history() -> (Tree, chronotree::NodeId, chronotree::NodeId) {
    let mut tree = tree_with_times(&[0, 10, 20, 30]);
    let root = tree.root();
    let continuation = fork_at(&mut tree, root, 30, &[40, 50]);
    let prediction = fork_at(&mut tree, continuation, 40, &[41, 42]);
    (tree, continuation, prediction)
}

#[test]
fn save_restore_cycle_recovers_tracked_identities() {
    let (tree, continuation, prediction) = history();
    let root = tree.root();

    let mut interest = [Some(continuation), Some(prediction)];
    let snapshot = tree.write_subtree(root, &mut interest).unwrap();
    assert_eq!(interest, [None, None]);

    let mut restored = Tree::new();
    let mut recovered = [None, None];
    restored
        .read_subtree(restored.root(), &snapshot, &mut recovered)
        .unwrap();

    let continuation2 = recovered[0].expect("the continuation handle is recovered");
    let prediction2 = recovered[1].expect("the prediction handle is recovered");
    assert_eq!(times(&restored, continuation2), times(&tree, continuation));
    assert_eq!(times(&restored, prediction2), times(&tree, prediction));
    assert_consistent(&restored, continuation2);
    assert_consistent(&restored, prediction2);

    // Payloads survive, not just times.
    let original: Vec<&str> = tree
        .iter(prediction)
        .unwrap()
        .map(|e| e.payload.as_str())
        .collect();
    let roundtripped: Vec<&str> = restored
        .iter(prediction2)
        .unwrap()
        .map(|e| e.payload.as_str())
        .collect();
    assert_eq!(original, roundtripped);
}

#[test]
fn restored_trees_serialize_to_the_identical_document() {
    let (tree, _, _) = history();
    let snapshot = tree.write_subtree(tree.root(), &mut []).unwrap();

    let mut restored = Tree::new();
    restored
        .read_subtree(restored.root(), &snapshot, &mut [])
        .unwrap();
    let again = restored.write_subtree(restored.root(), &mut []).unwrap();
    assert_eq!(again, snapshot);
}

#[test]
fn documents_survive_a_json_round_trip() {
    let (tree, continuation, _) = history();
    let mut interest = [Some(continuation)];
    let snapshot = tree.write_subtree(tree.root(), &mut interest).unwrap();

    let json = snapshot.to_json().unwrap();
    let parsed: SubtreeSnapshot<Entry> = SubtreeSnapshot::from_json(&json).unwrap();
    assert_eq!(parsed, snapshot);

    let mut restored = Tree::new();
    let mut recovered = [None];
    restored
        .read_subtree(restored.root(), &parsed, &mut recovered)
        .unwrap();
    assert!(recovered[0].is_some());
}

#[test]
fn subtree_of_a_branch_can_be_saved_alone() {
    let (tree, continuation, prediction) = history();

    // Saving from the branch down: its own entries plus the nested fork,
    // ancestor history excluded.
    let snapshot = tree.write_subtree(continuation, &mut []).unwrap();
    assert_eq!(snapshot.timeline.len(), 2); // [40, 50]
    assert_eq!(snapshot.child_count(), 1);

    let mut restored = Tree::new();
    restored
        .read_subtree(restored.root(), &snapshot, &mut [])
        .unwrap();
    assert_eq!(times(&restored, restored.root()), [40, 50]);
    let nested = restored.children(restored.root()).unwrap()[0];
    assert_eq!(times(&restored, nested), [40, 41, 42]);
    assert_eq!(
        restored.fork_time(nested).unwrap(),
        tree.fork_time(prediction).unwrap()
    );
}

#[test]
fn malformed_documents_are_rejected_without_identity_recovery() {
    let (tree, continuation, _) = history();
    let mut interest = [Some(continuation)];
    let snapshot = tree.write_subtree(tree.root(), &mut interest).unwrap();

    // Fewer slots than the document references.
    let mut restored = Tree::new();
    let err = restored
        .read_subtree(restored.root(), &snapshot, &mut [])
        .unwrap_err();
    assert!(err.is_serialization_error());
}
