//! Model check of the skip list against `BTreeMap`.

use std::collections::BTreeMap;

use proptest::prelude::*;
use vellum_index::{ConcurrentSkipList, FnComparer, SortedList};

#[derive(Debug, Clone)]
enum Op {
    Add(u16, u32),
    Update(u16, u32),
    Remove(u16),
    Get(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Small key space so operations collide.
    let key = 0u16..64;
    prop_oneof![
        (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Add(k, v)),
        (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Update(k, v)),
        key.clone().prop_map(Op::Remove),
        key.prop_map(Op::Get),
    ]
}

fn apply<L: SortedList<u16, u32>>(list: &L, model: &mut BTreeMap<u16, u32>, op: &Op) {
    match *op {
        Op::Add(k, v) => {
            let expected = !model.contains_key(&k);
            if expected {
                model.insert(k, v);
            }
            assert_eq!(list.try_add(k, v), expected);
        }
        Op::Update(k, v) => match model.get_mut(&k) {
            Some(slot) => {
                *slot = v;
                assert!(list.update(&k, v).is_ok());
            }
            None => assert!(list.update(&k, v).is_err()),
        },
        Op::Remove(k) => {
            assert_eq!(list.try_remove(&k), model.remove(&k).is_some());
        }
        Op::Get(k) => {
            assert_eq!(list.try_get_value(&k), model.get(&k).copied());
            assert_eq!(list.contains(&k), model.contains_key(&k));
        }
    }
}

proptest! {
    #[test]
    fn prop_matches_btreemap(ops in prop::collection::vec(op_strategy(), 1..400)) {
        let list = ConcurrentSkipList::new();
        let mut model = BTreeMap::new();
        for op in &ops {
            apply(&list, &mut model, op);
        }
        let entries: Vec<_> = list.iter().collect();
        let expected: Vec<_> = model.into_iter().collect();
        prop_assert_eq!(entries, expected);
    }

    #[test]
    fn prop_custom_order(keys in prop::collection::btree_set(any::<i64>(), 0..200)) {
        let list = ConcurrentSkipList::with_comparer(FnComparer(|a: &i64, b: &i64| b.cmp(a)));
        for k in &keys {
            prop_assert!(list.try_add(*k, ()));
        }
        let listed: Vec<i64> = list.keys();
        let expected: Vec<i64> = keys.into_iter().rev().collect();
        prop_assert_eq!(listed, expected);
    }
}
