use arbitrary::{unstructured::Unstructured, Arbitrary};
use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{collections::BTreeMap, ops::Bound, sync::Arc, thread};

use super::*;
use crate::{comparator, Error};

#[derive(Clone, Debug, Arbitrary)]
enum Op<K, V> {
    Set(K, V),
    SetIfAbsent(K, V),
    Remove(K),
    Get(K),
    Left,
    Right,
    IterAscFrom(K, bool),
    IterDescFrom(K, bool),
}

#[test]
fn test_btree_display() {
    let tree: BTree<String, String> = BTree::new(3, comparator::string(), true);
    assert_eq!(tree.to_string(), "");
    assert_eq!(tree.height(), 0);

    for i in 0..6 {
        tree.set(format!("key{}", i), format!("val{}", i));
    }
    let refs = concat!(
        "    key0\n",
        "key1\n",
        "    key2\n",
        "key3\n",
        "    key4\n",
        "    key5\n",
    );
    assert_eq!(tree.to_string(), refs);
    assert_eq!(tree.height(), 2);
    tree.validate().unwrap();

    let refs: Vec<(String, String)> = (0..6)
        .map(|i| (format!("key{}", i), format!("val{}", i)))
        .collect();
    assert_eq!(tree.entries(), refs);
    let other = BTree::with_entries(3, comparator::string(), tree.entries(), true);
    assert_eq!(other.entries(), refs);
}

#[test]
#[should_panic(expected = "invalid b-tree order")]
fn test_btree_invalid_order() {
    let _tree: BTree<u32, u32> = BTree::new(2, comparator::natural(), true);
}

#[test]
fn test_btree_ops() {
    let seed: u64 = random();
    println!("test_btree_ops seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    for order in [3, 4, 5, 8, 33].iter() {
        let safe = rng.gen::<bool>();
        let tree: BTree<u16, u64> = BTree::new(*order, comparator::natural(), safe);
        let mut btmap: BTreeMap<u16, u64> = BTreeMap::new();
        do_btree_ops(&mut rng, &tree, &mut btmap, 10_000);
        println!(
            "test_btree_ops order:{} len:{} height:{}",
            order,
            tree.len(),
            tree.height()
        );
    }
}

fn do_btree_ops(
    rng: &mut SmallRng,
    tree: &BTree<u16, u64>,
    btmap: &mut BTreeMap<u16, u64>,
    n_ops: usize,
) {
    let mut counts = [0_usize; 8];

    for _i in 0..n_ops {
        let bytes = rng.gen::<[u8; 32]>();
        let mut uns = Unstructured::new(&bytes);

        let op: Op<u16, u64> = uns.arbitrary().unwrap();
        match op {
            Op::Set(key, val) => {
                let key = key % 1024;
                assert_eq!(tree.set(key, val), btmap.insert(key, val));
                counts[0] += 1;
            }
            Op::SetIfAbsent(key, val) => {
                let key = key % 1024;
                let absent = !btmap.contains_key(&key);
                if absent {
                    btmap.insert(key, val);
                }
                assert_eq!(tree.set_if_absent(key, val), absent);
                counts[1] += 1;
            }
            Op::Remove(key) => {
                let key = key % 1024;
                assert_eq!(tree.remove(&key), btmap.remove(&key));
                counts[2] += 1;
            }
            Op::Get(key) => {
                let key = key % 1024;
                assert_eq!(tree.get(&key), btmap.get(&key).cloned());
                counts[3] += 1;
            }
            Op::Left => {
                let refs = btmap.iter().next().map(|(k, v)| (*k, *v));
                assert_eq!(tree.left(), refs);
                counts[4] += 1;
            }
            Op::Right => {
                let refs = btmap.iter().next_back().map(|(k, v)| (*k, *v));
                assert_eq!(tree.right(), refs);
                counts[5] += 1;
            }
            Op::IterAscFrom(key, incl) => {
                let key = key % 1024;
                let mut items = vec![];
                tree.iterate_asc_from(&key, incl, |k, v| {
                    items.push((*k, *v));
                    items.len() < 16
                });
                let low = if incl {
                    Bound::Included(key)
                } else {
                    Bound::Excluded(key)
                };
                let refs: Vec<(u16, u64)> = btmap
                    .range((low, Bound::Unbounded))
                    .take(16)
                    .map(|(k, v)| (*k, *v))
                    .collect();
                assert_eq!(items, refs);
                counts[6] += 1;
            }
            Op::IterDescFrom(key, incl) => {
                let key = key % 1024;
                let mut items = vec![];
                tree.iterate_desc_from(&key, incl, |k, v| {
                    items.push((*k, *v));
                    items.len() < 16
                });
                let high = if incl {
                    Bound::Included(key)
                } else {
                    Bound::Excluded(key)
                };
                let refs: Vec<(u16, u64)> = btmap
                    .range((Bound::Unbounded, high))
                    .rev()
                    .take(16)
                    .map(|(k, v)| (*k, *v))
                    .collect();
                assert_eq!(items, refs);
                counts[7] += 1;
            }
        }
        tree.validate().unwrap();
    }
    println!("do_btree_ops counts:{:?}", counts);

    assert_eq!(tree.len(), btmap.len());
    let refs: Vec<(u16, u64)> = btmap.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(tree.entries(), refs);
    let mut desc = vec![];
    tree.iterate_desc(|k, v| {
        desc.push((*k, *v));
        true
    });
    assert_eq!(desc, refs.into_iter().rev().collect::<Vec<(u16, u64)>>());
}

#[test]
fn test_btree_shrink() {
    let tree: BTree<u32, u32> = BTree::new(4, comparator::natural(), true);
    for key in 0..1000 {
        tree.set(key, key);
    }
    let height = tree.height();
    assert!(height > 1);

    for key in 0..1000 {
        assert_eq!(tree.remove(&key), Some(key));
        tree.validate().unwrap();
        assert!(tree.height() <= height);
        if key % 100 == 0 {
            // every nil path has the same length.
            let depths = tree.to_stats().unwrap().depths.unwrap();
            assert_eq!(depths.to_shortest(), tree.height(), "{}", depths);
            assert_eq!(depths.to_longest(), tree.height(), "{}", depths);
        }
    }
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 0);
    assert_eq!(tree.remove(&10), None);
}

#[test]
fn test_btree_remove_absent() {
    let tree = BTree::with_entries(3, comparator::natural(), (0..50_u32).map(|k| (k * 2, k)), true);
    let before = tree.to_string();
    assert_eq!(tree.remove(&7), None);
    assert_eq!(tree.remove(&1000), None);
    assert_eq!(tree.to_string(), before);
    assert_eq!(tree.len(), 50);
}

#[test]
fn test_btree_set_comparator() {
    let tree = BTree::with_entries(5, comparator::natural(), (0..100_u32).map(|k| (k, k)), true);
    tree.set_comparator(comparator::reverse(comparator::natural()));
    tree.validate().unwrap();

    let refs: Vec<u32> = (0..100).rev().collect();
    assert_eq!(tree.keys(), refs);
    assert_eq!(tree.left(), Some((99, 99)));
    assert_eq!(tree.right(), Some((0, 0)));
}

#[test]
fn test_btree_set_comparator_panic() {
    use std::{
        panic,
        sync::atomic::{AtomicUsize, Ordering::SeqCst},
    };

    let tree = BTree::with_entries(4, comparator::natural(), (0..200_u32).map(|k| (k, k)), true);
    let calls = Arc::new(AtomicUsize::new(0));
    let cmp = {
        let calls = Arc::clone(&calls);
        comparator::from_fn(move |a: &u32, b: &u32| {
            if calls.fetch_add(1, SeqCst) > 300 {
                panic!("comparator gave up");
            }
            b.cmp(a)
        })
    };
    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| tree.set_comparator(cmp)));
    assert!(res.is_err());

    tree.validate().unwrap();
    assert_eq!(tree.len(), 200);
    assert_eq!(tree.keys(), (0..200).collect::<Vec<u32>>());
    assert_eq!(tree.left(), Some((0, 0)));

    // rebuilt tree keeps its shape invariants, equal keys collapse.
    for order in 3..8 {
        let tree = BTree::with_entries(order, comparator::natural(), (0..500_u32).map(|k| (k, k)), true);
        tree.set_comparator(comparator::by_key(|k: &u32| k / 2));
        tree.validate().unwrap();
        assert_eq!(tree.len(), 250);
        assert_eq!(tree.get(&10), Some(11));
        let depths = tree.to_stats().unwrap().depths.unwrap();
        assert!(depths.is_within(1), "{}", depths);
    }
}

#[test]
fn test_btree_json() {
    let tree = BTree::with_entries(3, comparator::natural(), (0..10_u32).map(|k| (k, k * k)), true);
    let text = tree.to_json().unwrap();
    assert_eq!(&text[..18], r#"{"0":0,"1":1,"2":4"#);

    let other: BTree<u32, u32> = BTree::from_json(4, comparator::natural(), &text, true).unwrap();
    assert_eq!(other.entries(), tree.entries());
    assert_eq!(other.to_order(), 4);

    let other: BTree<u32, u32> = serde_json::from_str(&text).unwrap();
    assert_eq!(other.entries(), tree.entries());

    let other: BTree<u32, u32> = BTree::new(3, comparator::natural(), true);
    other.set(100, 100);
    other.load_json(&text).unwrap();
    assert_eq!(other.len(), 11);

    match other.load_json("[1, 2, 3]") {
        Err(Error::FailJson(_, _)) => (),
        res => panic!("unexpected {:?}", res),
    }
    assert_eq!(other.len(), 11);
}

#[test]
fn test_btree_deep_copy() {
    let tree: BTree<u32, Arc<String>> = BTree::new(3, comparator::natural(), true);
    for key in 0..20 {
        tree.set(key, Arc::new(key.to_string()));
    }

    let shallow = tree.clone();
    let deep = tree.deep_copy();
    for key in 0..20 {
        let (a, b, c) = (
            tree.get(&key).unwrap(),
            shallow.get(&key).unwrap(),
            deep.get(&key).unwrap(),
        );
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a, c);
    }

    deep.clear();
    assert!(deep.is_empty());
    assert_eq!(tree.len(), 20);
    deep.validate().unwrap();
}

#[test]
fn test_btree_concurrent() {
    let tree: Arc<BTree<u64, u64>> = Arc::new(BTree::new(6, comparator::natural(), true));

    let n_threads = 8;
    let mut handles = vec![];
    for id in 0..n_threads {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            for i in 0..1000 {
                let key = i * n_threads + id;
                tree.set(key, key);
                if i % 3 == 0 {
                    assert_eq!(tree.remove(&key), Some(key));
                }
            }
        }));
    }
    for handle in handles.into_iter() {
        handle.join().unwrap();
    }

    tree.validate().unwrap();
    // keys with i % 3 == 0 are removed, 334 of every 1000.
    assert_eq!(tree.len(), (n_threads * 666) as usize);
    let stats = tree.to_stats().unwrap();
    assert_eq!(stats.n_count, tree.len());
    assert!(stats.blacks.is_none());
}

#[test]
#[should_panic(expected = "comparator is missing")]
fn test_btree_missing_comparator() {
    let tree: BTree<u32, u32> = BTree::default();
    tree.set(1, 1);
}
