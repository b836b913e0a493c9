//! Property tests for the ordered trees: in-order traversal is sorted,
//! structure stays balanced, and insert-then-remove restores the key set.

use proptest::prelude::*;

use arbor_tree::{BPlusTree, BTree};

#[derive(Debug, Clone)]
enum Op {
    Insert(u16),
    Remove(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u16>().prop_map(|k| Op::Insert(k % 512)),
        2 => any::<u16>().prop_map(|k| Op::Remove(k % 512)),
    ]
}

proptest! {
    #[test]
    fn btree_traversal_is_sorted(keys in proptest::collection::vec(any::<i32>(), 0..400), degree in 2usize..7) {
        let mut tree = BTree::new(degree).unwrap();
        for &key in &keys {
            tree.insert(key);
        }
        let mut expected = keys.clone();
        expected.sort();
        let actual: Vec<i32> = tree.keys().into_iter().copied().collect();
        prop_assert_eq!(actual, expected);
        prop_assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn bplus_traversal_is_sorted(keys in proptest::collection::vec(any::<i32>(), 0..400), degree in 2usize..7) {
        let mut tree = BPlusTree::new(degree).unwrap();
        for &key in &keys {
            tree.insert(key);
        }
        let mut expected = keys.clone();
        expected.sort();
        let actual: Vec<i32> = tree.iter().copied().collect();
        prop_assert_eq!(actual, expected);
        prop_assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn btree_mixed_ops_stay_balanced(ops in proptest::collection::vec(op(), 0..600), degree in 2usize..6) {
        let mut tree = BTree::new(degree).unwrap();
        let mut model: Vec<u16> = Vec::new();
        for op in ops {
            match op {
                Op::Insert(k) => {
                    tree.insert(k);
                    model.push(k);
                }
                Op::Remove(k) => {
                    let stored = model.iter().position(|&m| m == k);
                    prop_assert_eq!(tree.remove(&k).is_ok(), stored.is_some());
                    if let Some(i) = stored {
                        model.swap_remove(i);
                    }
                }
            }
        }
        model.sort();
        let actual: Vec<u16> = tree.keys().into_iter().copied().collect();
        prop_assert_eq!(actual, model);
        prop_assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn bplus_mixed_ops_stay_balanced(ops in proptest::collection::vec(op(), 0..600), degree in 2usize..6) {
        let mut tree = BPlusTree::new(degree).unwrap();
        let mut model: Vec<u16> = Vec::new();
        for op in ops {
            match op {
                Op::Insert(k) => {
                    tree.insert(k);
                    model.push(k);
                }
                Op::Remove(k) => {
                    let stored = model.iter().position(|&m| m == k);
                    prop_assert_eq!(tree.remove(&k).is_ok(), stored.is_some());
                    if let Some(i) = stored {
                        model.swap_remove(i);
                    }
                }
            }
        }
        model.sort();
        let actual: Vec<u16> = tree.iter().copied().collect();
        prop_assert_eq!(actual, model);
        prop_assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn insert_then_remove_restores_keys(
        base in proptest::collection::vec(0u32..1000, 0..200),
        extra in 1000u32..2000,
        degree in 2usize..6,
    ) {
        let mut btree = BTree::new(degree).unwrap();
        let mut bplus = BPlusTree::new(degree).unwrap();
        for &key in &base {
            btree.insert(key);
            bplus.insert(key);
        }
        let btree_before: Vec<u32> = btree.keys().into_iter().copied().collect();
        let bplus_before: Vec<u32> = bplus.iter().copied().collect();

        btree.insert(extra);
        bplus.insert(extra);
        prop_assert_eq!(btree.remove(&extra).unwrap(), extra);
        prop_assert_eq!(bplus.remove(&extra).unwrap(), extra);

        let btree_after: Vec<u32> = btree.keys().into_iter().copied().collect();
        let bplus_after: Vec<u32> = bplus.iter().copied().collect();
        prop_assert_eq!(btree_after, btree_before);
        prop_assert_eq!(bplus_after, bplus_before);
        prop_assert!(btree.check_invariants().is_ok());
        prop_assert!(bplus.check_invariants().is_ok());
    }
}
