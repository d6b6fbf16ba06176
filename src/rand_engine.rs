//! A thread-local, seeded-once fast PRNG: non-cryptographic, cheap, good
//! enough for rollout policy and tie-breaking. Each OS thread gets its own
//! generator.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;

thread_local! {
    static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

pub fn with_rng<R>(f: impl FnOnce(&mut SmallRng) -> R) -> R {
    RNG.with(|rng| f(&mut rng.borrow_mut()))
}

/// Picks one item uniformly at random from `items` without collecting it
/// first: classic reservoir sampling of size one, where the k-th item
/// replaces the held choice with probability `1/k`. Useful when the legal
/// action count isn't known ahead of time.
pub fn reservoir_pick<T>(mut items: impl Iterator<Item = T>) -> Option<T> {
    with_rng(|rng| {
        let mut chosen = items.next()?;
        let mut seen = 1u64;
        for item in items {
            seen += 1;
            if rng.random_range(0..seen) == 0 {
                chosen = item;
            }
        }
        Some(chosen)
    })
}

/// Uniformly samples one index among those for which `weight(i) == max_weight`,
/// without materializing the tied set twice. Used for tie-breaking among
/// equally-visited root children when picking the best action.
pub fn reservoir_pick_indices(indices: impl Iterator<Item = usize>) -> Option<usize> {
    reservoir_pick(indices)
}
