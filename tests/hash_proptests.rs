// Hash property tests over the public API (consolidated).
//
// Property 1: multimap equivalence with a model.
//  - Model: HashMap<key, Vec<value>> with the newest value first.
//  - Operations: put, delete_all, delete(key, value), exists.
//  - Invariant: after the whole sequence, get_all(None) yields the model's
//    multiset of pairs, get_all(Some(k)) yields the model's list for k in
//    order, and keys() yields the model's key set without repeats.
//
// Property 2: clone equivalence.
//  - Invariant: try_clone produces the same per-key value lists as the
//    source, and later puts into the clone are invisible to the source.
use proptest::prelude::*;
use rdf_hash::{Factory, Hash, MemoryConfig, MemoryFactory};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

type Model = HashMap<Vec<u8>, Vec<Vec<u8>>>;

fn new_hash(config: MemoryConfig) -> Hash {
    let factory = Rc::new(Factory::new("memory", MemoryFactory::new(config).unwrap()));
    let mut h = Hash::new(factory).unwrap();
    h.open("prop", 0o644, true, true, None).unwrap();
    h
}

fn key(k: u8) -> Vec<u8> {
    format!("k{}", k).into_bytes()
}

fn value(v: u8) -> Vec<u8> {
    vec![v]
}

fn values_of(h: &Hash, k: &[u8]) -> Vec<Vec<u8>> {
    h.get_all(Some(k), true)
        .unwrap()
        .map(|e| e.unwrap().value.unwrap().into_vec())
        .collect()
}

fn apply(h: &mut Hash, model: &mut Model, ops: &[(u8, u8, u8)]) -> Result<(), TestCaseError> {
    for &(op, k, v) in ops {
        let (k, v) = (key(k), value(v));
        match op {
            0 | 1 => {
                h.put(&k, &v).unwrap();
                model.entry(k).or_default().insert(0, v);
            }
            2 => {
                prop_assert_eq!(h.delete_all(&k).unwrap(), model.remove(&k).is_some());
            }
            3 => {
                let removed = match model.get_mut(&k) {
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
                prop_assert_eq!(h.delete(&k, &v).unwrap(), removed);
            }
            _ => {
                prop_assert_eq!(h.exists(&k, None).unwrap(), model.contains_key(&k));
                let pair = model.get(&k).is_some_and(|vs| vs.contains(&v));
                prop_assert_eq!(h.exists(&k, Some(v.as_slice())).unwrap(), pair);
            }
        }
    }
    Ok(())
}

fn check_against_model(h: &Hash, model: &Model) -> Result<(), TestCaseError> {
    let mut got: Vec<(Vec<u8>, Vec<u8>)> = h
        .get_all(None, true)
        .unwrap()
        .map(|e| {
            let e = e.unwrap();
            (e.key.into_vec(), e.value.unwrap().into_vec())
        })
        .collect();
    got.sort();
    let mut want: Vec<(Vec<u8>, Vec<u8>)> = model
        .iter()
        .flat_map(|(k, vs)| vs.iter().map(move |v| (k.clone(), v.clone())))
        .collect();
    want.sort();
    prop_assert_eq!(got, want);

    for (k, vs) in model {
        prop_assert_eq!(&values_of(h, k), vs);
    }

    let keys: Vec<Vec<u8>> = h.keys().unwrap().map(|k| k.unwrap().into_vec()).collect();
    let distinct: BTreeSet<_> = keys.iter().cloned().collect();
    prop_assert_eq!(distinct.len(), keys.len());
    prop_assert_eq!(distinct, model.keys().cloned().collect::<BTreeSet<_>>());
    prop_assert_eq!(h.values_count(), Some(model.values().map(Vec::len).sum::<usize>()));
    Ok(())
}

fn arb_ops() -> impl Strategy<Value = Vec<(u8, u8, u8)>> {
    proptest::collection::vec((0u8..=4, 0u8..24, 0u8..4), 1..200)
}

fn arb_config() -> impl Strategy<Value = MemoryConfig> {
    (0u32..=4, prop_oneof![Just(250u32), Just(750), Just(999)]).prop_map(|(shift, lf)| {
        MemoryConfig::default()
            .with_initial_capacity(1 << shift)
            .with_load_factor(lf)
    })
}

// Property 1: multimap equivalence with a model.
proptest! {
    #[test]
    fn prop_multimap_matches_model(config in arb_config(), ops in arb_ops()) {
        let mut h = new_hash(config);
        let mut model = Model::new();
        apply(&mut h, &mut model, &ops)?;
        check_against_model(&h, &model)?;
    }
}

// Property 2: clone equivalence.
proptest! {
    #[test]
    fn prop_clone_matches_source(ops in arb_ops(), extra in 0u8..24) {
        let mut h = new_hash(MemoryConfig::default());
        let mut model = Model::new();
        apply(&mut h, &mut model, &ops)?;

        let mut c = h.try_clone("copy").unwrap();
        check_against_model(&c, &model)?;

        c.put(&key(extra), b"only-in-clone").unwrap();
        check_against_model(&h, &model)?;
        prop_assert!(c.exists(&key(extra), Some(b"only-in-clone".as_slice())).unwrap());
    }
}
