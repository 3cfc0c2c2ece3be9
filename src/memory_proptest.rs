#![cfg(test)]

// Property tests for MemoryHash kept inside the crate so they can check the
// engine's structural invariants after every step.

use crate::config::MemoryConfig;
use crate::iter::{GetAll, Keys};
use crate::memory::{hash_bytes, MemoryHash};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations: indices shrink to earlier keys and values, the
// pools shrink in length, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Put(usize, usize),
    DeleteKey(usize),
    DeleteKeyValue(usize, usize),
    Exists(usize),
    ExistsPair(usize, usize),
    GetOne(usize),
    GetAllFor(usize),
    GetAll,
    Keys,
}

type Model = HashMap<Vec<u8>, Vec<Vec<u8>>>;

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<String>, Vec<Op>)> {
    (
        proptest::collection::vec("[a-z]{0,5}", 1..=8),
        proptest::collection::vec("[a-c]{0,2}", 1..=4),
    )
        .prop_flat_map(|(keys, values)| {
            let k = 0..keys.len();
            let v = 0..values.len();
            let op = prop_oneof![
                4 => (k.clone(), v.clone()).prop_map(|(i, j)| Op::Put(i, j)),
                1 => k.clone().prop_map(Op::DeleteKey),
                2 => (k.clone(), v.clone()).prop_map(|(i, j)| Op::DeleteKeyValue(i, j)),
                1 => k.clone().prop_map(Op::Exists),
                1 => (k.clone(), v.clone()).prop_map(|(i, j)| Op::ExistsPair(i, j)),
                1 => k.clone().prop_map(Op::GetOne),
                1 => k.clone().prop_map(Op::GetAllFor),
                1 => Just(Op::GetAll),
                1 => Just(Op::Keys),
            ];
            proptest::collection::vec(op, 1..80)
                .prop_map(move |ops| (keys.clone(), values.clone(), ops))
        })
}

fn pairs_of(model: &Model) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut pairs: Vec<_> = model
        .iter()
        .flat_map(|(k, vs)| vs.iter().map(move |v| (k.clone(), v.clone())))
        .collect();
    pairs.sort();
    pairs
}

// Apply `ops` to both the engine and the model, comparing after every step.
// Invariants exercised:
// - `put` prepends: values of a key come back newest first.
// - `delete_key_value` removes exactly the most recent equal value; removing
//   the last value removes the key.
// - `exists`/`get_one` parity with the model.
// - `get_all(None)` yields the model's multiset of pairs regardless of how
//   many resizes happened; `keys` yields each distinct key once.
// - Counters and bucket occupancy stay consistent after each op.
fn run(
    mut sut: MemoryHash,
    key_of: impl Fn(usize) -> Vec<u8>,
    values: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: Model = HashMap::new();
    let value_of = |j: usize| values[j].as_bytes().to_vec();

    for op in ops {
        match op {
            Op::Put(i, j) => {
                let (k, v) = (key_of(i), value_of(j));
                sut.put(&k, &v).map_err(|e| TestCaseError::fail(e.to_string()))?;
                model.entry(k).or_default().insert(0, v);
                prop_assert!(sut.capacity().is_power_of_two());
            }
            Op::DeleteKey(i) => {
                let k = key_of(i);
                prop_assert_eq!(sut.delete_key(&k), model.remove(&k).is_some());
            }
            Op::DeleteKeyValue(i, j) => {
                let (k, v) = (key_of(i), value_of(j));
                let in_model = match model.get_mut(&k) {
                    Some(vs) => match vs.iter().position(|x| *x == v) {
                        Some(pos) => {
                            vs.remove(pos);
                            if vs.is_empty() {
                                model.remove(&k);
                            }
                            true
                        }
                        None => false,
                    },
                    None => false,
                };
                prop_assert_eq!(sut.delete_key_value(&k, &v), in_model);
            }
            Op::Exists(i) => {
                let k = key_of(i);
                prop_assert_eq!(sut.exists(&k, None), model.contains_key(&k));
            }
            Op::ExistsPair(i, j) => {
                let (k, v) = (key_of(i), value_of(j));
                let in_model = model.get(&k).is_some_and(|vs| vs.contains(&v));
                prop_assert_eq!(sut.exists(&k, Some(v.as_slice())), in_model);
            }
            Op::GetOne(i) => {
                let k = key_of(i);
                let got = GetAll::over(&sut, Some(k.as_slice()), true)
                    .unwrap()
                    .next()
                    .map(|e| e.unwrap().value.unwrap().into_vec());
                prop_assert_eq!(got.as_ref(), model.get(&k).and_then(|vs| vs.first()));
            }
            Op::GetAllFor(i) => {
                let k = key_of(i);
                let got: Vec<Vec<u8>> = GetAll::over(&sut, Some(k.as_slice()), true)
                    .unwrap()
                    .map(|e| e.unwrap().value.unwrap().into_vec())
                    .collect();
                let expected = model.get(&k).cloned().unwrap_or_default();
                prop_assert_eq!(got, expected);
            }
            Op::GetAll => {
                let mut got: Vec<(Vec<u8>, Vec<u8>)> = GetAll::over(&sut, None, true)
                    .unwrap()
                    .map(|e| {
                        let e = e.unwrap();
                        (e.key.into_vec(), e.value.unwrap().into_vec())
                    })
                    .collect();
                got.sort();
                prop_assert_eq!(got, pairs_of(&model));
            }
            Op::Keys => {
                let got: Vec<Vec<u8>> = Keys::over(&sut)
                    .unwrap()
                    .map(|k| k.unwrap().into_vec())
                    .collect();
                let distinct: BTreeSet<_> = got.iter().cloned().collect();
                prop_assert_eq!(distinct.len(), got.len(), "keys must not repeat");
                prop_assert_eq!(distinct, model.keys().cloned().collect::<BTreeSet<_>>());
            }
        }

        sut.check_invariants();
        prop_assert_eq!(sut.keys_count(), model.len());
        prop_assert_eq!(sut.values_count(), model.values().map(Vec::len).sum::<usize>());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((keys, values, ops) in arb_scenario()) {
        let key_of = |i: usize| keys[i].as_bytes().to_vec();
        run(MemoryHash::new(), key_of, &values, ops)?;
    }
}

// Every pool key gets the same 24-byte suffix. Each byte is shifted three
// bits further per following byte, so the distinct prefixes are shifted out
// of the 64-bit hash entirely and all keys land in one chain.
const COLLIDING_SUFFIX: &[u8] = b"~~~~~~~~~~~~~~~~~~~~~~~~";

// Same invariants as above with every key sharing one hash, on a table that
// starts at a single bucket and tolerates nearly full occupancy.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((keys, values, ops) in arb_scenario()) {
        let key_of = |i: usize| {
            let mut k = keys[i].as_bytes().to_vec();
            k.extend_from_slice(COLLIDING_SUFFIX);
            k
        };
        let hashes: BTreeSet<u64> = (0..keys.len()).map(|i| hash_bytes(&key_of(i))).collect();
        prop_assert_eq!(hashes.len(), 1);

        let config = MemoryConfig::default()
            .with_initial_capacity(1)
            .with_load_factor(999);
        run(MemoryHash::with_config(config).unwrap(), key_of, &values, ops)?;
    }
}
