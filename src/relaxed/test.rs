use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::compare::IndexLess;
use crate::metric::ManhattanDistance;
use crate::node::{Arena, KdNode, NodeId};
use crate::relaxed::{BalancingPolicy, LooseBalancing, RelaxedKDTree, TightBalancing};
use crate::tree::check::assert_tree_valid;

fn depth<N: KdNode>(arena: &Arena<N>) -> usize {
    fn recurse<N: KdNode>(arena: &Arena<N>, node: NodeId) -> usize {
        if node.is_nil() {
            return 0;
        }
        1 + recurse(arena, arena.left(node)).max(recurse(arena, arena.right(node)))
    }
    let root = arena.root();
    if root.is_header() {
        0
    } else {
        recurse(arena, root)
    }
}

/// The policy predicate must hold at every node after every operation.
fn assert_policy_holds<K, C, R, P>(tree: &RelaxedKDTree<K, C, R, P>)
where
    C: crate::compare::KeyCompare<K>,
    R: crate::rank::Rank,
    P: BalancingPolicy,
{
    let arena = &tree.core().arena;
    let root = arena.root();
    if root.is_header() {
        return;
    }
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let heavier = arena
            .weight_of(arena.left(node))
            .max(arena.weight_of(arena.right(node)));
        assert!(
            !tree.policy().imbalanced(arena.node(node).weight(), heavier),
            "policy holds at every node"
        );
        let left = arena.left(node);
        if !left.is_nil() {
            stack.push(left);
        }
        let right = arena.right(node);
        if !right.is_nil() {
            stack.push(right);
        }
    }
}

fn sorted(mut keys: Vec<[i32; 2]>) -> Vec<[i32; 2]> {
    keys.sort();
    keys
}

#[test]
fn ascending_inserts_stay_shallow() {
    let mut tree =
        RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::default()).unwrap();
    for x in 1..=1024 {
        tree.insert([x, 0]).unwrap();
    }
    assert_eq!(tree.len(), 1024);
    let arena = &tree.core().arena;
    assert_eq!(arena.weight_of(arena.root()), 1024);
    // Sorted input would build a depth-1024 chain without balancing.
    assert!(depth(arena) <= 20, "depth is bounded by the policy");
    assert_tree_valid(tree.core());
    assert_policy_holds(&tree);
}

#[test]
fn tight_policy_bounds_depth_too() {
    let mut tree =
        RelaxedKDTree::with_dimension(2, IndexLess, TightBalancing::default()).unwrap();
    for x in 1..=256 {
        tree.insert([0, x]).unwrap();
    }
    assert_eq!(tree.len(), 256);
    assert!(depth(&tree.core().arena) <= 18);
    assert_tree_valid(tree.core());
    assert_policy_holds(&tree);
}

#[test]
fn len_is_the_root_weight() {
    let mut tree =
        RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::default()).unwrap();
    for x in 0..50 {
        tree.insert([x % 7, x % 11]).unwrap();
    }
    let arena = &tree.core().arena;
    assert_eq!(tree.len() as u32, arena.weight_of(arena.root()));
}

#[test]
fn erase_reports_the_preorder_successor() {
    // Small enough that the loose policy never rotates, so the layout is
    // the plain insertion layout.
    let mut tree =
        RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::default()).unwrap();
    tree.insert([5, 5]).unwrap();
    let left = tree.insert([2, 3]).unwrap();
    let right = tree.insert([8, 1]).unwrap();

    let (key, successor) = tree.erase(left).unwrap();
    assert_eq!(key, [2, 3]);
    assert_eq!(successor, right);
    assert_eq!(tree.get(successor), Some(&[8, 1]));

    // Erasing the last element in pre-order reports the end handle.
    let (_, successor) = tree.erase(right).unwrap();
    assert_eq!(successor, tree.end());
}

#[test]
fn duplicates_survive_rotations() {
    let mut tree =
        RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::new(2).unwrap()).unwrap();
    for _ in 0..20 {
        tree.insert([4, 4]).unwrap();
    }
    for x in 0..20 {
        tree.insert([x, 20 - x]).unwrap();
    }
    assert_tree_valid(tree.core());
    assert_policy_holds(&tree);
    assert_eq!(tree.equal_range([4, 4]).count(), 20);
}

#[test]
fn queries_work_after_heavy_rebalancing() {
    let mut rng = StdRng::seed_from_u64(13);
    let mut tree =
        RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::default()).unwrap();
    let mut reference = Vec::new();
    for _ in 0..300 {
        let point = [rng.gen_range(0..30), rng.gen_range(0..30)];
        tree.insert(point).unwrap();
        reference.push(point);
    }

    let emitted: Vec<[i32; 2]> = tree.mapping_iter(0).unwrap().copied().collect();
    for pair in emitted.windows(2) {
        assert!(pair[0][0] <= pair[1][0]);
    }
    assert_eq!(sorted(emitted), sorted(reference.clone()));

    let distances: Vec<i32> = tree
        .neighbors([15, 15], ManhattanDistance)
        .map(|(d, _)| d)
        .collect();
    assert_eq!(distances.len(), reference.len());
    for pair in distances.windows(2) {
        assert!(pair[0] <= pair[1]);
    }

    let lower = [5, 5];
    let upper = [20, 20];
    let got: Vec<[i32; 2]> = tree.range(lower, upper).copied().collect();
    let expected: Vec<[i32; 2]> = reference
        .iter()
        .copied()
        .filter(|p| (0..2).all(|d| lower[d] <= p[d] && p[d] < upper[d]))
        .collect();
    assert_eq!(sorted(got), sorted(expected));
}

#[test]
fn randomized_operations_keep_policy_and_invariants() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut tree =
        RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::default()).unwrap();
    let mut model: Vec<[i32; 2]> = Vec::new();
    for _ in 0..400 {
        if model.is_empty() || rng.gen_bool(0.65) {
            let point = [rng.gen_range(0..10), rng.gen_range(0..10)];
            tree.insert(point).unwrap();
            model.push(point);
        } else {
            let index = rng.gen_range(0..model.len());
            let target = model.swap_remove(index);
            let id = tree.find(&target).expect("model key is in the tree");
            let (key, _) = tree.erase(id).unwrap();
            assert_eq!(key, target);
        }
        assert_eq!(tree.len(), model.len());
        assert_tree_valid(tree.core());
        assert_policy_holds(&tree);
    }
    assert_eq!(sorted(tree.iter().copied().collect()), sorted(model));
}

#[test]
fn erase_range_and_clear() {
    let mut tree =
        RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::default()).unwrap();
    for x in 0..32 {
        tree.insert([x, x % 5]).unwrap();
    }
    let removed = tree.erase_range(tree.begin(), tree.end()).unwrap();
    assert_eq!(removed, 32);
    assert!(tree.is_empty());

    for x in 0..8 {
        tree.insert([x, 0]).unwrap();
    }
    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.begin(), tree.end());
}

#[test]
fn swap_exchanges_contents() {
    let mut a = RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::default()).unwrap();
    let mut b = RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::default()).unwrap();
    a.insert([1, 1]).unwrap();
    b.insert([2, 2]).unwrap();
    b.insert([3, 3]).unwrap();
    a.swap(&mut b);
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 1);
    assert_tree_valid(a.core());
    assert_tree_valid(b.core());
}

#[test]
fn equal_range_finds_duplicates_spread_by_rotation() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut tree =
        RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::default()).unwrap();
    let mut dupes = 0;
    for _ in 0..200 {
        let point = [rng.gen_range(0..6), rng.gen_range(0..6)];
        if point == [3, 3] {
            dupes += 1;
        }
        tree.insert(point).unwrap();
    }
    for _ in 0..10 {
        tree.insert([3, 3]).unwrap();
        dupes += 1;
    }
    assert_eq!(tree.equal_range([3, 3]).count(), dupes);
}
