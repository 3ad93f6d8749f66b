//! Property and concurrency tests for the in-memory collaborators.

use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use wonka::{Entity, SigningKey};
use wonka_directory::{EntityStore, GroupDirectory, MemoryEntityStore, MemoryGroupDirectory};

fn flip_case(name: &str, mask: &[bool]) -> String {
    name.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    #[test]
    fn any_casing_finds_the_entity(
        name in "[a-z][a-z0-9-]{0,15}",
        mask in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let store = MemoryEntityStore::with_defaults();
        let key = SigningKey::generate().verifying_key();
        store.put(Entity::new(name.clone(), &key)).unwrap();

        let found = store.get(&flip_case(&name, &mask)).unwrap();
        prop_assert_eq!(found.verifying_key().unwrap(), key);
    }

    #[test]
    fn only_sample_names_rekey(name in "[a-z]{1,10}") {
        let store = MemoryEntityStore::with_defaults();
        let sample = format!("sample-{name}");
        for n in [&name, &sample] {
            store.put(Entity::new(n.clone(), &SigningKey::generate().verifying_key())).unwrap();
        }

        let rekey = |n: &str| store.put(Entity::new(n, &SigningKey::generate().verifying_key()));
        prop_assert!(rekey(&sample).is_ok());
        prop_assert_eq!(rekey(&name).is_err(), !name.starts_with("sample"));
    }

    #[test]
    fn group_membership_is_exact(
        person in "[a-z]{1,8}",
        group in "[a-z]{1,8}",
        other in "[a-z]{1,8}",
    ) {
        prop_assume!(group != other);
        let directory = MemoryGroupDirectory::new().with_member(&person, &group);
        let full = format!("{person}@uber.com");

        prop_assert!(directory.is_member_of(&full, &group).unwrap());
        prop_assert!(!directory.is_member_of(&full, &other).unwrap());
    }
}

#[test]
fn concurrent_readers_and_writers() {
    let store = Arc::new(MemoryEntityStore::with_defaults());

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = SigningKey::generate().verifying_key();
                    store.put(Entity::new(format!("svc-{w}-{i}"), &key)).unwrap();
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..50 {
                    let _ = store.get(&format!("svc-0-{i}"));
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
    assert_eq!(store.len(), 200);
}
