extern crate std;

use std::{ops::Range, prelude::v1::*, rc::Rc};

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

type RemoveFn = fn(&mut AvlTree<TestNode>, &u32) -> Option<Box<TestNode>>;

fn remove_recursive(tree: &mut AvlTree<TestNode>, key: &u32) -> Option<Box<TestNode>> {
    tree.remove(key)
}

fn remove_iterative(tree: &mut AvlTree<TestNode>, key: &u32) -> Option<Box<TestNode>> {
    tree.remove_iterative(key)
}

const REMOVE_STRATEGIES: [(&str, RemoveFn); 2] = [
    ("recursive", remove_recursive),
    ("iterative", remove_iterative),
];

// Calls `f` with every permutation of `keys` (Heap's algorithm).
fn for_each_permutation(keys: &mut [u32], k: usize, f: &mut impl FnMut(&[u32])) {
    if k <= 1 {
        f(keys);
        return;
    }

    for i in 0..k {
        for_each_permutation(keys, k - 1, f);

        if k % 2 == 0 {
            keys.swap(i, k - 1);
        } else {
            keys.swap(0, k - 1);
        }
    }
}

fn insert_find_all(keys: &[u32]) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_none());
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn up_to_seven_elems_find() {
    for n in 4..=7 {
        let mut keys: Vec<u32> = (0..n).collect();
        for_each_permutation(&mut keys, n as usize, &mut |perm| insert_find_all(perm));
    }
}

fn insert_remove_all(keys: &[u32], remove: RemoveFn) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys {
        let node = remove(&mut tree, key).expect("item not found");
        assert_eq!(node.key, *key);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let node = remove(&mut tree, key).expect("item not found");
        assert_eq!(node.key, *key);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.height(), -1);
}

#[test]
fn remove_one() {
    for (_, remove) in REMOVE_STRATEGIES {
        insert_remove_all(&[0], remove);
    }
}

#[test]
fn remove_two() {
    for (_, remove) in REMOVE_STRATEGIES {
        insert_remove_all(&[0, 1], remove);
        insert_remove_all(&[1, 0], remove);
    }
}

#[test]
fn remove_three() {
    for (_, remove) in REMOVE_STRATEGIES {
        insert_remove_all(&[0, 1, 2], remove);
        insert_remove_all(&[0, 2, 1], remove);
        insert_remove_all(&[1, 0, 2], remove);
        insert_remove_all(&[1, 2, 0], remove);
        insert_remove_all(&[2, 0, 1], remove);
        insert_remove_all(&[2, 1, 0], remove);
    }
}

#[test]
fn remove_up_to_seven() {
    for (_, remove) in REMOVE_STRATEGIES {
        for n in 4..=7 {
            let mut keys: Vec<u32> = (0..n).collect();
            for_each_permutation(&mut keys, n as usize, &mut |perm| {
                insert_remove_all(perm, remove);
            });
        }
    }
}

#[test]
fn remove_missing_key_is_noop() {
    for (_, remove) in REMOVE_STRATEGIES {
        let mut tree: AvlTree<TestNode> = AvlTree::new();
        assert!(remove(&mut tree, &3).is_none());

        tree.insert(TestNode::new(3));
        assert!(remove(&mut tree, &4).is_none());
        assert_eq!(tree.len(), 1);

        for key in [1, 5, 7] {
            tree.insert(TestNode::new(key));
        }
        assert!(remove(&mut tree, &6).is_none());
        assert_eq!(tree.len(), 4);
        tree.assert_invariants();
    }
}

#[test]
fn tree_insert_replaces_equal_node() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for key in [4, 2, 6, 1, 3] {
        assert!(tree.insert(TestNode::new(key)).is_none());
    }

    let old = tree.insert(TestNode::new(2)).expect("key 2 was present");
    assert_eq!(old.key, 2);
    assert_eq!(tree.len(), 5);
    tree.assert_invariants();
}

#[test]
fn entry_vacant_then_occupied() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    match tree.entry(&5) {
        Entry::Vacant(vacant) => {
            let node = unsafe { vacant.insert(TestNode::new(5)) };
            assert_eq!(node.key, 5);
        }
        Entry::Occupied(_) => panic!("empty tree has no occupied entries"),
    }

    tree.insert(TestNode::new(8));

    match tree.entry(&5) {
        Entry::Occupied(occupied) => {
            assert_eq!(occupied.get().key, 5);
            assert_eq!(occupied.remove().key, 5);
        }
        Entry::Vacant(_) => panic!("key 5 was inserted"),
    }

    assert_eq!(tree.len(), 1);
    tree.assert_invariants();
}

#[test]
fn occupied_replace_keeps_shape() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [4, 2, 6] {
        tree.insert(TestNode::new(key));
    }

    let Entry::Occupied(mut occupied) = tree.entry(&2) else {
        panic!("key 2 was inserted");
    };
    let old = unsafe { occupied.replace(TestNode::new(2)) };
    assert_eq!(old.key, 2);
    assert!(old.links.parent().is_none());

    assert_eq!(tree.len(), 3);
    tree.assert_invariants();
    assert!(tree.iter().map(|node| node.key).eq([2, 4, 6]));
}

#[test]
fn bulk_build_then_remove_all() {
    for (name, remove) in REMOVE_STRATEGIES {
        let nodes = (0..10).map(TestNode::new);
        let mut tree = AvlTree::try_from_sorted(nodes).unwrap();

        tree.assert_invariants();
        assert_eq!(tree.len(), 10);
        assert_eq!(tree.height(), 3, "{name}");

        for key in [4, 0, 5, 7, 8, 9, 1, 3, 6, 2] {
            let node = remove(&mut tree, &key).expect("item not found");
            assert_eq!(node.key, key);
            tree.assert_invariants();
        }

        assert_eq!(tree.len(), 0);
        assert!(tree.root.is_none());
    }
}

#[test]
fn map_bulk_scenario() {
    let mut recursive = AvlMap::from_sorted((0..10).map(|k| (k, k + 1))).unwrap();
    let mut iterative = AvlMap::from_sorted((0..10).map(|k| (k, k + 1))).unwrap();

    assert_eq!(recursive.height(), 3);

    for key in [4, 0, 5, 7, 8, 9, 1, 3, 6, 2] {
        assert_eq!(recursive.remove(&key), Some(key + 1));
        assert_eq!(iterative.remove_iterative(&key), Some(key + 1));

        recursive.assert_invariants();
        iterative.assert_invariants();
        assert!(recursive.iter().eq(iterative.iter()));
    }

    assert_eq!(recursive.len(), 0);
    assert_eq!(iterative.len(), 0);
}

#[test]
fn rotation_scenario() {
    let mut map = AvlMap::new();

    assert_eq!(map.put(10, 10), None);
    assert_eq!(map.put(2, 2), None);
    assert_eq!(map.put(2, 3), Some(2));
    assert_eq!(map.put(5, 2), None);
    assert_eq!(map.put(12, 13), None);

    assert_eq!(map.len(), 4);
    map.assert_invariants();

    let node = map.tree.get_raw(&2).expect("key 2 was inserted");
    let parent = unsafe { map.tree.links(node).parent() }.expect("2 is not the root");
    assert_eq!(unsafe { parent.as_ref() }.key, 5);

    assert_eq!(
        map.pre_order().map(|(&k, &v)| (k, v)).collect::<Vec<_>>(),
        vec![(5, 2), (2, 3), (10, 10), (12, 13)],
    );
}

#[test]
fn overwrite_keeps_len() {
    let mut map = AvlMap::new();
    map.put("k", 1);
    let len = map.len();

    assert_eq!(map.put("k", 2), Some(1));
    assert_eq!(map.len(), len);
    assert_eq!(map.get("k"), Some(&2));
}

#[test]
fn empty_map_boundaries() {
    let mut map: AvlMap<u32, u32> = AvlMap::new();

    assert!(map.is_empty());
    assert_eq!(map.get(&1), None);
    assert_eq!(map.remove(&1), None);
    assert_eq!(map.remove_iterative(&1), None);
    assert_eq!(map.pop_first(), None);
    assert_eq!(map.pop_last(), None);
    assert_eq!(map.first_key_value(), None);
    assert_eq!(map.height(), -1);
    assert_eq!(map.iter().next(), None);
    map.assert_invariants();
}

#[test]
fn single_entry_removal() {
    let mut map = AvlMap::new();
    map.put(7, "seven");

    assert_eq!(map.remove(&8), None);
    assert_eq!(map.len(), 1);

    assert_eq!(map.remove(&7), Some("seven"));
    assert!(map.is_empty());
    assert!(map.tree.root.is_none());
    map.assert_invariants();
}

#[test]
fn removing_full_root_promotes_successor() {
    let pairs = [(1, "a"), (2, "b"), (3, "c")];

    let mut recursive = AvlMap::from_sorted(pairs).unwrap();
    assert_eq!(recursive.remove(&2), Some("b"));
    assert_eq!(recursive.pre_order().next(), Some((&3, &"c")));
    recursive.assert_invariants();

    let mut iterative = AvlMap::from_sorted(pairs).unwrap();
    assert_eq!(iterative.remove_iterative(&2), Some("b"));
    assert_eq!(iterative.pre_order().next(), Some((&3, &"c")));
    iterative.assert_invariants();
}

fn keys<K: Ord + Copy, V>(iter: map::Iter<'_, K, V>) -> Vec<K> {
    iter.map(|(&k, _)| k).collect()
}

#[test]
fn iterative_removal_lifts_deep_successor() {
    let mut map = AvlMap::from_sorted((1..=7).map(|k| (k, ()))).unwrap();

    // 5 is the leftmost node under 6, not the root's right child.
    assert_eq!(map.remove_iterative(&4), Some(()));
    map.assert_invariants();
    assert_eq!(keys(map.pre_order()), vec![5, 2, 1, 3, 6, 7]);

    // 6 is now the root's right child and its own successor.
    assert_eq!(map.remove_iterative(&5), Some(()));
    map.assert_invariants();
    assert_eq!(keys(map.pre_order()), vec![6, 2, 1, 3, 7]);
}

#[test]
fn long_mixed_sequences_match_btree() {
    use std::collections::BTreeMap;

    // xorshift32, so every run replays the same sequences.
    let mut state = 0x9e37_79b9_u32;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };

    for _ in 0..20 {
        let mut avl = AvlMap::new();
        let mut btree = BTreeMap::new();

        for step in 0..2000u32 {
            let key = next() % 256;

            match next() % 5 {
                0 | 1 => assert_eq!(avl.put(key, step), btree.insert(key, step)),
                2 => assert_eq!(avl.remove(&key), btree.remove(&key)),
                3 => assert_eq!(avl.remove_iterative(&key), btree.remove(&key)),
                _ if step % 2 == 0 => assert_eq!(avl.pop_first(), btree.pop_first()),
                _ => assert_eq!(avl.pop_last(), btree.pop_last()),
            }

            avl.assert_invariants();
            assert_eq!(avl.len(), btree.len());
        }

        assert!(avl.iter().eq(btree.iter()));
    }
}

#[test]
fn traversal_orders() {
    let map = AvlMap::from_sorted((1..=7).map(|k| (k, ()))).unwrap();

    assert_eq!(keys(map.pre_order()), vec![4, 2, 1, 3, 6, 5, 7]);
    assert_eq!(keys(map.iter()), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(keys(map.post_order()), vec![1, 3, 2, 5, 7, 6, 4]);
}

#[test]
fn traversal_is_restartable() {
    let map: AvlMap<u32, u32> = (0..20).map(|k| (k * 7 % 20, k)).collect();

    for order in [Order::PreOrder, Order::InOrder, Order::PostOrder] {
        let mut iter = map.traversal(order);
        assert_eq!(iter.len(), 20);

        iter.next();
        iter.next();

        let rest: Vec<_> = iter.clone().collect();
        assert_eq!(rest.len(), 18);
        assert_eq!(iter.len(), 18);
        assert!(iter.eq(rest.into_iter()));

        assert_eq!(map.traversal(order).count(), 20);
    }
}

#[test]
fn write_traversals() {
    let map = AvlMap::from_sorted((1..=7).map(|k| (k, ()))).unwrap();

    let mut out = String::new();
    map.write_traversal(Order::PreOrder, &mut out).unwrap();
    assert_eq!(out, "Preorder traversal: 4, 2, 1, 3, 6, 5, 7");

    let mut out = String::new();
    map.write_traversal(Order::PostOrder, &mut out).unwrap();
    assert_eq!(out, "Postorder traversal: 1, 3, 2, 5, 7, 6, 4");
}

#[test]
fn draw_sideways() {
    let mut map = AvlMap::new();
    for key in [10, 2, 5, 12] {
        map.put(key, ());
    }

    assert_eq!(map.draw(), "    ┌── 12\n┌── 10\n5\n└── 2\n");

    let map = AvlMap::from_sorted((1..=7).map(|k| (k, ()))).unwrap();
    assert_eq!(
        map.draw(),
        "    ┌── 7\n┌── 6\n│   └── 5\n4\n│   ┌── 3\n└── 2\n    └── 1\n",
    );

    assert_eq!(AvlMap::<u32, ()>::new().draw(), "");
}

#[test]
fn dotgraph_labels_heights() {
    let map = AvlMap::from_sorted([(1, ()), (2, ())]).unwrap();

    let mut out = String::new();
    map.dotgraph("t", &mut out).unwrap();

    assert!(out.starts_with("digraph \"graph-t\""));
    assert!(out.contains("[label=\"1:1\"]"));
    assert!(out.contains("[label=\"2:0\"]"));
    assert!(out.contains("\"grapht-1\" -> \"grapht-2\";"));
}

#[test]
fn search_costs() {
    let map = AvlMap::from_sorted([(1, ()), (2, ()), (3, ())]).unwrap();
    let costs = map.search_costs();

    assert!((costs.successful - 5.0 / 3.0).abs() < 1e-9);
    assert!((costs.unsuccessful - 2.0).abs() < 1e-9);

    assert_eq!(AvlMap::<u32, ()>::new().search_costs(), SearchCosts::default());
}

#[test]
fn from_sorted_rejects_bad_input() {
    let marker = Rc::new(());

    let err = AvlMap::from_sorted([(1, marker.clone()), (3, marker.clone()), (2, marker.clone())])
        .unwrap_err();
    assert_eq!(err, BuildError::Unsorted { index: 2 });
    assert_eq!(
        err.to_string(),
        "input is not sorted: item 2 is less than the item before it"
    );
    assert_eq!(Rc::strong_count(&marker), 1);

    let err = AvlMap::from_sorted([(1, ()), (1, ())]).unwrap_err();
    assert_eq!(err, BuildError::DuplicateKey { index: 1 });
}

#[test]
fn nodes_are_dropped() {
    let marker = Rc::new(());

    let mut map = AvlMap::new();
    for key in 0..100 {
        map.put(key, marker.clone());
    }
    assert_eq!(Rc::strong_count(&marker), 101);

    map.remove(&10);
    map.remove_iterative(&20);
    map.put(30, marker.clone());
    map.pop_first();
    assert_eq!(Rc::strong_count(&marker), 98);

    map.clear();
    assert!(map.is_empty());
    assert_eq!(Rc::strong_count(&marker), 1);

    let map = AvlMap::from_sorted((0..50).map(|k| (k, marker.clone()))).unwrap();
    drop(map);
    assert_eq!(Rc::strong_count(&marker), 1);
}

#[test]
fn pop_drains_in_order() {
    let mut map: AvlMap<u32, u32> = [5, 3, 8, 1, 4, 7, 9].iter().map(|&k| (k, k)).collect();

    assert_eq!(map.first_key_value(), Some((&1, &1)));
    assert_eq!(map.last_key_value(), Some((&9, &9)));

    assert_eq!(map.pop_first(), Some((1, 1)));
    assert_eq!(map.pop_last(), Some((9, 9)));
    map.assert_invariants();

    let rest: Vec<u32> = std::iter::from_fn(|| map.pop_first().map(|(k, _)| k)).collect();
    assert_eq!(rest, vec![3, 4, 5, 7, 8]);
}

#[test]
fn sequential_inserts_stay_shallow() {
    let map: AvlMap<u32, ()> = (0..1000).map(|k| (k, ())).collect();

    map.assert_invariants();
    // An AVL tree of n nodes is at most ~1.44 log2(n + 2) tall.
    assert!(map.height() <= 14, "height {}", map.height());
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn construction_equivalence(
        pairs in proptest::collection::vec((0u32..500, any::<u32>()), FUZZ_RANGE),
    ) {
        model::run_construction_equivalence(pairs);
    }
}
