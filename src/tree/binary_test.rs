use arbitrary::{unstructured::Unstructured, Arbitrary};
use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{collections::BTreeMap, ops::Bound, sync::Arc, thread};

use super::*;
use crate::{
    tree::{Avl, AvlTree, BTree, RedBlack, RedBlackTree},
    Error,
};

#[derive(Clone, Debug, Arbitrary)]
enum Op<K, V> {
    Set(K, V),
    SetIfAbsent(K, V),
    GetOrSet(K, V),
    Remove(K),
    RemoveAbsent(K),
    Get(K),
    Contains(K),
    Floor(K),
    Ceiling(K),
    Left,
    Right,
    IterAscFrom(K, bool),
    IterDescFrom(K, bool),
}

const KEY_MAX: u16 = 1024;

#[test]
fn test_binary_ops() {
    let seed: u64 = random();
    // let seed: u64 = 8516362150389473186;
    println!("test_binary_ops seed:{}", seed);

    do_ops::<Avl>("test_binary_ops_avl", seed, 20_000);
    do_ops::<RedBlack>("test_binary_ops_rb", seed + 100, 20_000);
}

fn do_ops<B: Balance>(prefix: &str, seed: u64, n_ops: usize) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let safe = rng.gen::<bool>();
    let tree: BinaryTree<u16, u64, B> = BinaryTree::new(comparator::natural(), safe);
    let mut btmap: BTreeMap<u16, u64> = BTreeMap::new();
    let mut counts = [0_usize; 13];

    for _i in 0..n_ops {
        let bytes = rng.gen::<[u8; 32]>();
        let mut uns = Unstructured::new(&bytes);

        let op: Op<u16, u64> = uns.arbitrary().unwrap();
        // println!("{} op -- {:?}", prefix, op);
        match op {
            Op::Set(key, val) => {
                let key = key % KEY_MAX;
                assert_eq!(tree.set(key, val), btmap.insert(key, val));
                counts[0] += 1;
            }
            Op::SetIfAbsent(key, val) => {
                let key = key % KEY_MAX;
                let absent = !btmap.contains_key(&key);
                if absent {
                    btmap.insert(key, val);
                }
                assert_eq!(tree.set_if_absent(key, val), absent);
                counts[1] += 1;
            }
            Op::GetOrSet(key, val) => {
                let key = key % KEY_MAX;
                let refv = *btmap.entry(key).or_insert(val);
                assert_eq!(tree.get_or_set_with(key, || val), refv);
                counts[2] += 1;
            }
            Op::Remove(key) => {
                let key = key % KEY_MAX;
                assert_eq!(tree.remove(&key), btmap.remove(&key));
                counts[3] += 1;
            }
            Op::RemoveAbsent(key) => {
                // keys beyond KEY_MAX are never set.
                let key = KEY_MAX + (key % KEY_MAX);
                let before = tree.to_string();
                assert_eq!(tree.remove(&key), None);
                assert_eq!(tree.to_string(), before);
                counts[4] += 1;
            }
            Op::Get(key) => {
                let key = key % KEY_MAX;
                assert_eq!(tree.get(&key), btmap.get(&key).cloned());
                assert_eq!(tree.search(&key), btmap.get(&key).cloned());
                counts[5] += 1;
            }
            Op::Contains(key) => {
                let key = key % KEY_MAX;
                assert_eq!(tree.contains(&key), btmap.contains_key(&key));
                counts[6] += 1;
            }
            Op::Floor(key) => {
                let key = key % KEY_MAX;
                let refs = btmap.range(..=key).next_back().map(|(k, v)| (*k, *v));
                assert_eq!(tree.floor(&key), refs);
                counts[7] += 1;
            }
            Op::Ceiling(key) => {
                let key = key % KEY_MAX;
                let refs = btmap.range(key..).next().map(|(k, v)| (*k, *v));
                assert_eq!(tree.ceiling(&key), refs);
                counts[8] += 1;
            }
            Op::Left => {
                let refs = btmap.iter().next().map(|(k, v)| (*k, *v));
                assert_eq!(tree.left(), refs);
                counts[9] += 1;
            }
            Op::Right => {
                let refs = btmap.iter().next_back().map(|(k, v)| (*k, *v));
                assert_eq!(tree.right(), refs);
                counts[10] += 1;
            }
            Op::IterAscFrom(key, incl) => {
                let key = key % KEY_MAX;
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
                counts[11] += 1;
            }
            Op::IterDescFrom(key, incl) => {
                let key = key % KEY_MAX;
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
                counts[12] += 1;
            }
        }
        tree.validate().unwrap();
    }
    println!("{} counts:{:?}", prefix, counts);

    let mut n = 0;
    tree.iterate(|_, _| {
        n += 1;
        true
    });
    assert_eq!(n, tree.len());
    assert_eq!(tree.len(), btmap.len());

    let refs: Vec<(u16, u64)> = btmap.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(tree.entries(), refs);
    let keys: Vec<u16> = btmap.keys().cloned().collect();
    assert_eq!(tree.keys(), keys);
    let values: Vec<u64> = btmap.values().cloned().collect();
    assert_eq!(tree.values(), values);
}

#[test]
fn test_binary_iterate_stop() {
    let tree: AvlTree<u32, u32> = (0..100).map(|k| (k, k)).collect();
    let mut keys = vec![];
    tree.iterate_desc(|k, _| {
        keys.push(*k);
        keys.len() < 5
    });
    assert_eq!(keys, vec![99, 98, 97, 96, 95]);

    let mut keys = vec![];
    tree.iterate_asc_from(&50, false, |k, _| {
        keys.push(*k);
        keys.len() < 3
    });
    assert_eq!(keys, vec![51, 52, 53]);

    let mut keys = vec![];
    tree.iterate_desc_from(&1000, true, |k, _| {
        keys.push(*k);
        keys.len() < 2
    });
    assert_eq!(keys, vec![99, 98]);
}

#[test]
fn test_binary_batch() {
    let tree: RedBlackTree<u32, String> = RedBlackTree::new(comparator::natural(), true);
    tree.set_entries((0..10).map(|k| (k, k.to_string())));
    assert_eq!(tree.len(), 10);

    assert_eq!(tree.removes(&[1, 3, 5, 100]), 3);
    assert_eq!(tree.keys(), vec![0, 2, 4, 6, 7, 8, 9]);

    assert!(!tree.set_if_absent(2, "two".to_string()));
    assert_eq!(tree.get_or_set(2, "two".to_string()), "2".to_string());
    assert_eq!(tree.get_or_set(3, "three".to_string()), "three".to_string());
    assert_eq!(tree.get_with(&3, |v| v.len()), Some(5));

    tree.replace(vec![(100, "x".to_string()), (50, "y".to_string())]);
    assert_eq!(tree.entries(), vec![(50, "y".to_string()), (100, "x".to_string())]);
    tree.validate().unwrap();

    let mut other = tree.clone();
    other.extend((0..5).map(|k| (k, k.to_string())));
    assert_eq!(other.len(), 7);
    assert_eq!(tree.len(), 2);

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.left(), None);
    assert_eq!(tree.right(), None);
    assert_eq!(tree.floor(&10), None);
    assert_eq!(tree.ceiling(&10), None);
}

#[test]
fn test_binary_set_comparator() {
    let tree: AvlTree<u32, u32> = AvlTree::with_entries(
        comparator::natural(),
        (0..500).map(|k| (k, k * 2)),
        true,
    );
    tree.set_comparator(comparator::reverse(comparator::natural()));
    tree.validate().unwrap();

    let refs: Vec<u32> = (0..500).rev().collect();
    assert_eq!(tree.keys(), refs);
    assert_eq!(tree.get(&10), Some(20));
    // floor and ceiling follow the comparator order.
    assert_eq!(tree.floor(&10), Some((10, 20)));
    assert_eq!(tree.left(), Some((499, 998)));
}

#[test]
fn test_binary_set_comparator_panic() {
    use std::{
        panic,
        sync::atomic::{AtomicUsize, Ordering::SeqCst},
    };

    for safe in [true, false].iter() {
        let tree: RedBlackTree<u32, u32> =
            RedBlackTree::with_entries(comparator::natural(), (0..200).map(|k| (k, k)), *safe);

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

        // old comparator and every entry are still in place.
        tree.validate().unwrap();
        assert_eq!(tree.len(), 200);
        assert_eq!(tree.keys(), (0..200).collect::<Vec<u32>>());
        assert_eq!(tree.get(&150), Some(150));
        tree.set(200, 200);
        assert_eq!(tree.right(), Some((200, 200)));
    }
}

#[test]
fn test_binary_set_comparator_collapse() {
    let tree: AvlTree<u32, u32> =
        AvlTree::with_entries(comparator::natural(), (0..100).map(|k| (k, k)), true);
    // keys equal modulo 10 collapse, the last in the old order stays.
    tree.set_comparator(comparator::by_key(|k: &u32| k % 10));
    tree.validate().unwrap();

    assert_eq!(tree.len(), 10);
    let refs: Vec<(u32, u32)> = (90..100).map(|k| (k, k)).collect();
    assert_eq!(tree.entries(), refs);
    assert_eq!(tree.get(&3), Some(93));
}

#[test]
fn test_binary_json() {
    let tree: RedBlackTree<String, u64> = RedBlackTree::new(comparator::string(), true);
    for (i, key) in ["b", "a", "d", "c"].iter().enumerate() {
        tree.set(key.to_string(), i as u64);
    }
    let text = tree.to_json().unwrap();
    assert_eq!(text, r#"{"a":1,"b":0,"c":3,"d":2}"#);

    let other: RedBlackTree<String, u64> =
        RedBlackTree::from_json(comparator::string(), &text, false).unwrap();
    assert_eq!(other.entries(), tree.entries());
    assert!(!other.is_safe());

    let other: AvlTree<String, u64> = serde_json::from_str(&text).unwrap();
    assert_eq!(other.keys(), tree.keys());
    assert!(other.is_safe());

    let other: AvlTree<String, u64> = AvlTree::new(comparator::string(), true);
    other.set("z".to_string(), 100);
    other.load_json(&text).unwrap();
    assert_eq!(other.len(), 5);

    for text in ["[1, 2]", "10", r#"{"a": "x"}"#, "{"].iter() {
        match other.load_json(text) {
            Err(Error::FailJson(_, _)) => (),
            res => panic!("unexpected {:?} for {}", res, text),
        }
    }
    match AvlTree::<String, u64>::from_json(comparator::string(), "[]", true) {
        Err(Error::FailJson(_, _)) => (),
        Err(err) => panic!("unexpected {}", err),
        Ok(_) => panic!("unexpected ok"),
    }
    assert_eq!(other.len(), 5);
}

#[test]
fn test_binary_deep_copy() {
    let tree: AvlTree<u32, Arc<Vec<u8>>> = AvlTree::new(comparator::natural(), true);
    for key in 0..32 {
        tree.set(key, Arc::new(vec![key as u8; 4]));
    }

    let shallow = tree.clone();
    let deep = tree.deep_copy();
    assert_eq!(deep.to_string(), tree.to_string());
    for key in 0..32 {
        let (a, b, c) = (
            tree.get(&key).unwrap(),
            shallow.get(&key).unwrap(),
            deep.get(&key).unwrap(),
        );
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a, c);
    }

    deep.remove(&0);
    assert_eq!(tree.len(), 32);
    deep.validate().unwrap();
    shallow.validate().unwrap();
}

#[test]
fn test_binary_concurrent() {
    let tree: Arc<RedBlackTree<u64, u64>> =
        Arc::new(RedBlackTree::new(comparator::natural(), true));

    let n_threads = 8_u64;
    let mut handles = vec![];
    for id in 0..n_threads {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            for i in 0..2000 {
                let key = i * n_threads + id;
                assert_eq!(tree.set(key, key), None);
                assert_eq!(tree.get(&key), Some(key));
                if i % 2 == 1 {
                    assert_eq!(tree.remove(&key), Some(key));
                }
            }
        }));
    }
    for handle in handles.into_iter() {
        handle.join().unwrap();
    }

    tree.validate().unwrap();
    assert_eq!(tree.len(), (n_threads * 1000) as usize);
    assert!(tree.keys().iter().all(|k| (k / n_threads) % 2 == 0));
}

#[test]
#[should_panic(expected = "concurrent access on unsafe container")]
fn test_binary_unsafe_overlap() {
    let tree: AvlTree<u32, u32> = AvlTree::new(comparator::natural(), false);
    tree.set(1, 1);
    tree.iterate(|k, v| {
        tree.set(k + 1, *v);
        true
    });
}

#[test]
#[should_panic(expected = "comparator is missing")]
fn test_binary_missing_comparator() {
    let tree: RedBlackTree<u32, u32> = RedBlackTree::default();
    tree.set(1, 1);
    tree.set(2, 2);
}

#[test]
fn test_binary_config() {
    let mut config = Config::new("sessions");
    config.set_safe(false).set_spin(false);
    let tree: AvlTree<u32, u32> = AvlTree::with_config(comparator::natural(), &config);
    assert_eq!(tree.to_name(), "sessions");
    assert!(!tree.is_safe());

    let stats = tree.to_stats().unwrap();
    assert_eq!(stats.name, "sessions");
    assert!(!stats.safe);
    assert!(!stats.spin);
    assert_eq!(stats.n_count, 0);
    assert_eq!(stats.height, 0);
}

#[test]
fn test_ordered_map() {
    let avl: AvlTree<u32, String> = AvlTree::new(comparator::natural(), true);
    check_ordered_map(&avl);
    let rb: RedBlackTree<u32, String> = RedBlackTree::new(comparator::natural(), true);
    check_ordered_map(&rb);
    let btree: BTree<u32, String> = BTree::new(3, comparator::natural(), true);
    check_ordered_map(&btree);
}

fn check_ordered_map<M>(map: &M)
where
    M: OrderedMap<u32, String>,
{
    assert!(map.is_empty());
    for key in (0..100).rev() {
        assert_eq!(map.set(key, key.to_string()), None);
    }
    assert_eq!(map.set(10, "ten".to_string()), Some("10".to_string()));
    assert_eq!(map.len(), 100);
    assert_eq!(map.get(&10), Some("ten".to_string()));
    assert!(map.contains(&99));
    assert!(!map.contains(&100));

    assert_eq!(map.remove(&99), Some("99".to_string()));
    assert_eq!(map.remove(&99), None);
    assert_eq!(map.keys(), (0..99).collect::<Vec<u32>>());
    assert_eq!(map.values().len(), 99);
    assert_eq!(map.entries()[0], (0, "0".to_string()));

    let mut keys = vec![];
    map.iterate_desc(|k, _| {
        keys.push(*k);
        *k > 95
    });
    assert_eq!(keys, vec![98, 97, 96, 95]);

    map.clear();
    assert_eq!(map.len(), 0);
}
