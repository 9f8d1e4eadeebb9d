//! Fork topology, tree surgery, and trimming.

use chronotree::Position;

use crate::helpers::{assert_consistent, entry, fork_at, times, tree_with_times};

#[test]
fn branching_preserves_shared_history_and_diverges() {
    let mut tree = tree_with_times(&[0, 10, 20, 30]);
    let root = tree.root();
    let branch = fork_at(&mut tree, root, 10, &[14, 16]);

    // The branch inherits history up to its fork point and nothing after.
    assert_eq!(times(&tree, branch), [0, 10, 14, 16]);
    assert_eq!(times(&tree, root), [0, 10, 20, 30]);
    assert_consistent(&tree, root);
    assert_consistent(&tree, branch);

    // Shared entries are the same data, not copies: the payload written at
    // the root is visible through the branch.
    let through_branch = tree.find(branch, 10).unwrap();
    let through_root = tree.find(root, 10).unwrap();
    assert_eq!(
        through_branch.entry(&tree).unwrap().unwrap().payload,
        through_root.entry(&tree).unwrap().unwrap().payload
    );

    // After the fork the two evolve independently.
    assert!(tree.lower_bound(branch, 20).unwrap().is_end());
    assert_eq!(
        tree.lower_bound(root, 20).unwrap().time(&tree).unwrap(),
        Some(20)
    );
}

#[test]
fn deep_fork_chains_stay_consistent() {
    let mut tree = tree_with_times(&[0, 1]);
    let mut node = tree.root();
    let mut last_time = 1;
    for _ in 0..10 {
        node = fork_at(&mut tree, node, last_time, &[last_time + 1, last_time + 2]);
        last_time += 2;
        assert_consistent(&tree, node);
    }
    // Each level inherits everything before its fork point and adds two
    // entries of its own.
    assert_eq!(tree.size(node).unwrap(), 22);
    assert_eq!(times(&tree, node), (0..=21).collect::<Vec<_>>());
}

#[test]
fn deleting_a_fork_restores_the_parent_exactly() {
    let mut tree = tree_with_times(&[0, 10, 20]);
    let root = tree.root();
    let keeper = fork_at(&mut tree, root, 10, &[15]);
    let before_children = tree.children(root).unwrap();
    let before_times = times(&tree, root);

    let doomed = fork_at(&mut tree, root, 20, &[25, 26]);
    let doomed_child = fork_at(&mut tree, doomed, 25, &[]);
    tree.delete_fork(root, doomed).unwrap();

    assert_eq!(tree.children(root).unwrap(), before_children);
    assert_eq!(times(&tree, root), before_times);
    assert_consistent(&tree, keeper);
    assert!(!tree.contains(doomed));
    assert!(!tree.contains(doomed_child));
}

#[test]
fn trimming_drops_later_entries_and_forks_together() {
    let mut tree = tree_with_times(&[0, 10, 20, 30, 40]);
    let root = tree.root();
    let early = fork_at(&mut tree, root, 20, &[22]);
    let late = fork_at(&mut tree, root, 40, &[44]);

    tree.forget_after(root, 30).unwrap();
    assert_eq!(times(&tree, root), [0, 10, 20, 30]);
    assert!(tree.contains(early));
    assert!(!tree.contains(late));
    assert_consistent(&tree, early);

    // Trimming from the front respects surviving forks.
    assert!(tree.forget_before(root, 30).is_err());
    tree.forget_before(root, 20).unwrap();
    assert_eq!(times(&tree, root), [20, 30]);
    assert_eq!(times(&tree, early), [20, 22]);
    assert_consistent(&tree, early);
}

#[test]
fn detach_and_reattach_round_trips_through_the_copied_begin() {
    let mut tree = tree_with_times(&[0, 10, 20]);
    let root = tree.root();
    let branch = fork_at(&mut tree, root, 20, &[25, 30]);
    let nested = fork_at(&mut tree, branch, 25, &[27]);
    let expected_branch = times(&tree, branch);
    let expected_nested = times(&tree, nested);

    // Detach: copy the fork-point entry to the branch's head first, so the
    // freestanding root carries its own starting point.
    tree.prepend(branch, entry(20)).unwrap();
    tree.detach_with_copied_begin(branch).unwrap();
    assert!(tree.is_root(branch).unwrap());
    assert_eq!(times(&tree, branch), [20, 25, 30]);
    assert_eq!(times(&tree, nested), [20, 25, 27]);
    assert_consistent(&tree, branch);
    assert_consistent(&tree, nested);

    // Reattach and absorb the duplicated begin.
    tree.attach_with_copied_begin(root, branch).unwrap();
    tree.pop_front(branch).unwrap();

    assert_eq!(times(&tree, branch), expected_branch);
    assert_eq!(times(&tree, nested), expected_nested);
    assert_eq!(tree.fork_time(branch).unwrap(), Some(20));
    assert_consistent(&tree, branch);
    assert_consistent(&tree, nested);
}

#[test]
fn same_instant_siblings_keep_insertion_order() {
    let mut tree = tree_with_times(&[0, 10]);
    let root = tree.root();
    let first = tree.fork(root, Position::At(1)).unwrap();
    let second = tree.fork(root, Position::At(1)).unwrap();
    let third = tree.fork(root, Position::At(0)).unwrap();

    // Ordered by fork time, insertion order within equal times.
    assert_eq!(tree.children(root).unwrap(), vec![third, first, second]);
    assert_eq!(tree.fork_time(first).unwrap(), Some(10));
    assert_eq!(tree.fork_time(second).unwrap(), Some(10));
}

#[test]
fn handles_stay_valid_across_unrelated_mutations() {
    let mut tree = tree_with_times(&[0, 10, 20]);
    let root = tree.root();
    let a = fork_at(&mut tree, root, 10, &[11]);
    let b = fork_at(&mut tree, root, 20, &[21]);

    tree.delete_fork(root, b).unwrap();
    tree.append(root, entry(30)).unwrap();
    let c = fork_at(&mut tree, root, 30, &[33]);

    // `a` was never touched; its handle and contents are intact.
    assert_eq!(times(&tree, a), [0, 10, 11]);
    assert_consistent(&tree, a);
    assert_consistent(&tree, c);
    assert!(!tree.contains(b));
}
