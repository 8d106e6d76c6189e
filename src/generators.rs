//! Parametric nets for demos, tests and benchmarks.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::net::{Net, NetBuilder};

/// `p0 -> p1 -> ... -> p{n-1}` with a token on `p0`.
///
/// `n` reachable markings; the last one is a deadlock.
pub fn chain(n: usize) -> Net {
    let mut builder = NetBuilder::new();
    let places = (0..n)
        .map(|i| builder.add_place(format!("p{}", i), i == 0))
        .collect::<Vec<_>>();
    for (i, w) in places.windows(2).enumerate() {
        builder.add_transition(format!("t{}", i), [w[0]], [w[1]]);
    }
    builder.build()
}

/// A single token circulating over `n` places. No deadlock.
pub fn ring(n: usize) -> Net {
    let mut builder = NetBuilder::new();
    let places = (0..n)
        .map(|i| builder.add_place(format!("p{}", i), i == 0))
        .collect::<Vec<_>>();
    for i in 0..n {
        builder.add_transition(format!("t{}", i), [places[i]], [places[(i + 1) % n]]);
    }
    builder.build()
}

/// `n` processes competing for one lock. `n + 1` reachable markings, no deadlock.
pub fn mutex(n: usize) -> Net {
    let mut builder = NetBuilder::new();
    let lock = builder.add_place("lock", true);
    for i in 0..n {
        let idle = builder.add_place(format!("idle{}", i), true);
        let critical = builder.add_place(format!("critical{}", i), false);
        builder.add_transition(format!("enter{}", i), [idle, lock], [critical]);
        builder.add_transition(format!("leave{}", i), [critical], [idle, lock]);
    }
    builder.build()
}

/// Dining philosophers; deadlocks when everybody holds their left fork.
pub fn philosophers(n: usize) -> Net {
    let mut builder = NetBuilder::new();
    let forks = (0..n)
        .map(|i| builder.add_place(format!("fork{}", i), true))
        .collect::<Vec<_>>();
    for i in 0..n {
        let left = forks[i];
        let right = forks[(i + 1) % n];
        let thinking = builder.add_place(format!("thinking{}", i), true);
        let holding = builder.add_place(format!("holding{}", i), false);
        let eating = builder.add_place(format!("eating{}", i), false);
        builder.add_transition(format!("take_left{}", i), [thinking, left], [holding]);
        builder.add_transition(format!("take_right{}", i), [holding, right], [eating]);
        builder.add_transition(format!("release{}", i), [eating], [thinking, left, right]);
    }
    builder.build()
}

/// Random net in the style of a stress test: every place starts marked with
/// probability 0.2 and every transition has one or two distinct inputs and
/// one or two distinct outputs.
pub fn random(num_places: usize, num_transitions: usize, seed: u64) -> Net {
    assert!(num_places > 0, "Random nets need at least one place");

    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = NetBuilder::new();
    let places = (0..num_places)
        .map(|i| builder.add_place(format!("p{}", i), rng.random_bool(0.2)))
        .collect::<Vec<_>>();
    for i in 0..num_transitions {
        let num_inputs = rng.random_range(1..=2usize).min(num_places);
        let inputs = index::sample(&mut rng, num_places, num_inputs)
            .into_iter()
            .map(|p| places[p])
            .collect::<Vec<_>>();
        let num_outputs = rng.random_range(1..=2usize).min(num_places);
        let outputs = index::sample(&mut rng, num_places, num_outputs)
            .into_iter()
            .map(|p| places[p])
            .collect::<Vec<_>>();
        builder.add_transition(format!("t{}", i), inputs, outputs);
    }
    builder.build()
}
