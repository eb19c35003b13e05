mod common;

use common::{OpaqueSource, delegating};
use proptest::prelude::*;
use rotary_core::KeyDirectory;
use rotary_scheduler::{RotationPolicy, StandardRotationPolicy};
use rotary_session::DelegatingSessionFactory;
use std::sync::Arc;

fn targets(n: usize) -> Vec<KeyDirectory> {
    (0..n)
        .map(|i| KeyDirectory::new(format!("k{i}"), format!("/dir/{i}")).unwrap())
        .collect()
}

/// Drive one poll per entry of `results`, returning the target index each poll used.
fn drive(
    policy: &StandardRotationPolicy,
    factory: &DelegatingSessionFactory,
    results: &[bool],
) -> Vec<usize> {
    let mut visited = Vec::with_capacity(results.len());
    for &received in results {
        policy.before_receive(&OpaqueSource).unwrap();
        let current = policy.current().unwrap();
        assert_eq!(factory.thread_key().as_ref(), Some(current.key()));
        let index = policy
            .targets()
            .iter()
            .position(|t| t == current)
            .unwrap();
        visited.push(index);

        policy.after_receive(received, &OpaqueSource).unwrap();
        assert!(factory.thread_key().is_none());
    }
    visited
}

fn setup(n: usize, fair: bool) -> (StandardRotationPolicy, Arc<DelegatingSessionFactory>) {
    let factory = delegating(&[]);
    let policy = StandardRotationPolicy::new(factory.clone(), targets(n), fair).unwrap();
    (policy, factory)
}

proptest! {
    #[test]
    fn fair_rotation_is_cyclic(
        n in 1usize..8,
        results in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let (policy, factory) = setup(n, true);
        let visited = drive(&policy, &factory, &results);
        let expected: Vec<_> = (0..results.len()).map(|i| i % n).collect();
        prop_assert_eq!(visited, expected);
    }

    #[test]
    fn unfair_empty_polls_are_cyclic(n in 1usize..8, polls in 0usize..40) {
        let (policy, factory) = setup(n, false);
        let visited = drive(&policy, &factory, &vec![false; polls]);
        let expected: Vec<_> = (0..polls).map(|i| i % n).collect();
        prop_assert_eq!(visited, expected);
    }

    #[test]
    fn unfair_productive_polls_never_move(n in 1usize..8, polls in 1usize..40) {
        let (policy, factory) = setup(n, false);
        let visited = drive(&policy, &factory, &vec![true; polls]);
        prop_assert!(visited.iter().all(|&i| i == 0));
    }

    #[test]
    fn unfair_moves_only_after_empty_polls(
        n in 1usize..8,
        results in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let (policy, factory) = setup(n, false);
        let visited = drive(&policy, &factory, &results);

        let mut index = 0;
        let mut expected = Vec::with_capacity(results.len());
        for &received in &results {
            expected.push(index);
            if !received {
                index = (index + 1) % n;
            }
        }
        prop_assert_eq!(visited, expected);
    }
}
