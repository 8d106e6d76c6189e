//! Explicit-state reachability.
//!
//! Markings are packed into a `u64` (place `i` is bit `i`), so firing is a
//! handful of bitwise operations. The visited set doubles as the BFS queue:
//! markings are appended in discovery order and the search walks the set by
//! index until it catches up with the end.

use std::time::Instant;

use indexmap::IndexSet;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::marking::Marking;
use crate::net::{Net, PlaceId};
use crate::search::{saturate, Weights};

/// Largest net the explicit engine accepts.
pub const MAX_PLACES: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct MaskedTransition {
    /// Every input place.
    pre: u64,
    /// Every output place.
    post: u64,
    /// Outputs that are not inputs; these must be empty to fire.
    post_only: u64,
}

impl MaskedTransition {
    #[inline]
    fn is_enabled(&self, m: u64) -> bool {
        m & self.pre == self.pre && m & self.post_only == 0
    }

    #[inline]
    fn fire(&self, m: u64) -> u64 {
        (m & !self.pre) | self.post
    }
}

/// A net compiled to per-transition bitmasks.
#[derive(Debug, Clone)]
pub struct MaskedNet {
    num_places: usize,
    transitions: Vec<MaskedTransition>,
    initial: u64,
}

impl MaskedNet {
    pub fn new(net: &Net) -> Result<Self> {
        if net.num_places() > MAX_PLACES {
            return Err(Error::TooManyPlaces {
                places: net.num_places(),
                max: MAX_PLACES,
            });
        }

        let transitions = net
            .transitions()
            .iter()
            .map(|t| MaskedTransition {
                pre: to_mask(t.inputs().iter().copied()),
                post: to_mask(t.outputs().iter().copied()),
                post_only: to_mask(t.pure_outputs()),
            })
            .collect();
        // The initial marking of a net with at most 64 places always fits.
        let initial = net.initial_marking().to_mask().unwrap_or(0);

        Ok(Self {
            num_places: net.num_places(),
            transitions,
            initial,
        })
    }

    pub fn num_places(&self) -> usize {
        self.num_places
    }

    pub fn initial(&self) -> u64 {
        self.initial
    }

    pub fn is_enabled(&self, transition: usize, m: u64) -> bool {
        self.transitions[transition].is_enabled(m)
    }

    pub fn is_dead(&self, m: u64) -> bool {
        !self.transitions.iter().any(|t| t.is_enabled(m))
    }

    /// Successors of `m`, one per enabled transition (possibly repeated).
    pub fn successors(&self, m: u64) -> impl Iterator<Item = u64> + '_ {
        self.transitions
            .iter()
            .filter(move |t| t.is_enabled(m))
            .map(move |t| t.fire(m))
    }
}

fn to_mask(places: impl Iterator<Item = PlaceId>) -> u64 {
    places.fold(0, |acc, p| acc | (1u64 << p.index()))
}

/// Markings found by breadth-first search, in discovery order.
#[derive(Debug, Clone)]
pub struct ReachableSet {
    num_places: usize,
    markings: IndexSet<u64>,
}

impl ReachableSet {
    pub fn len(&self) -> usize {
        self.markings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markings.is_empty()
    }

    pub fn num_places(&self) -> usize {
        self.num_places
    }

    pub fn contains_mask(&self, mask: u64) -> bool {
        self.markings.contains(&mask)
    }

    pub fn contains(&self, marking: &Marking) -> bool {
        marking.len() == self.num_places && marking.to_mask().is_some_and(|m| self.contains_mask(m))
    }

    /// Discovery index of a marking; the initial marking is 0.
    pub fn discovery_index(&self, marking: &Marking) -> Option<usize> {
        if marking.len() != self.num_places {
            return None;
        }
        marking.to_mask().and_then(|m| self.markings.get_index_of(&m))
    }

    pub fn masks(&self) -> impl Iterator<Item = u64> + '_ {
        self.markings.iter().copied()
    }

    pub fn markings(&self) -> impl Iterator<Item = Marking> + '_ {
        self.masks().map(|m| Marking::from_mask(m, self.num_places))
    }

    /// Reachable markings without an enabled transition, in discovery order.
    pub fn dead_markings(&self, net: &MaskedNet) -> Vec<Marking> {
        self.masks()
            .filter(|&m| net.is_dead(m))
            .map(|m| Marking::from_mask(m, self.num_places))
            .collect()
    }

    /// Best reachable marking under `weights`, by exhaustive scan.
    ///
    /// Ties go to the lexicographically smallest marking, place 0 first.
    pub fn best_by_weight(&self, weights: &Weights) -> Option<(Marking, i64)> {
        let score = |m: u64| weights.total((0..self.num_places).filter(|&i| (m >> i) & 1 == 1));
        self.masks()
            // Reversing the bits makes place 0 the most significant one.
            .max_by_key(|&m| (score(m), std::cmp::Reverse(m.reverse_bits())))
            .map(|m| (Marking::from_mask(m, self.num_places), saturate(score(m))))
    }
}

/// Unbounded breadth-first exploration.
pub fn explore(net: &Net) -> Result<ReachableSet> {
    explore_masked(&MaskedNet::new(net)?, None)
}

/// Breadth-first exploration that gives up once more than `limit` markings are
/// known. The initial marking counts, so a `limit` of zero always fails.
pub fn explore_bounded(net: &Net, limit: usize) -> Result<ReachableSet> {
    explore_masked(&MaskedNet::new(net)?, Some(limit))
}

pub fn explore_masked(net: &MaskedNet, limit: Option<usize>) -> Result<ReachableSet> {
    let start = Instant::now();

    let mut visited = IndexSet::new();
    visited.insert(net.initial());
    check_limit(visited.len(), limit)?;

    let mut head = 0;
    while let Some(&m) = visited.get_index(head) {
        head += 1;
        for next in net.successors(m) {
            if visited.insert(next) {
                check_limit(visited.len(), limit)?;
            }
        }
        if head % 100_000 == 0 {
            debug!("explored {} of {} markings", head, visited.len());
        }
    }

    info!(
        "Explicit search found {} reachable markings in {:.3} s",
        visited.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(ReachableSet {
        num_places: net.num_places(),
        markings: visited,
    })
}

fn check_limit(known: usize, limit: Option<usize>) -> Result<()> {
    match limit {
        Some(limit) if known > limit => {
            info!("Explicit search stopped after {} markings", limit);
            Err(Error::StateSpaceTooLarge { limit })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::net::NetBuilder;

    fn three_places() -> Net {
        let mut builder = NetBuilder::new();
        let p1 = builder.add_place("p1", true);
        let p2 = builder.add_place("p2", false);
        builder.add_place("p3", false);
        builder.add_transition("t", [p1], [p2]);
        builder.build()
    }

    #[test]
    fn test_three_places() {
        let net = three_places();
        let reachable = explore(&net).unwrap();
        assert_eq!(reachable.len(), 2);
        assert_eq!(reachable.masks().collect::<Vec<_>>(), vec![0b001, 0b010]);
        assert!(reachable.contains(&Marking::from_mask(0b010, 3)));
        assert!(!reachable.contains(&Marking::from_mask(0b100, 3)));
        assert_eq!(reachable.discovery_index(&Marking::from_mask(0b010, 3)), Some(1));

        let masked = MaskedNet::new(&net).unwrap();
        assert_eq!(reachable.dead_markings(&masked), vec![Marking::from_mask(0b010, 3)]);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut builder = NetBuilder::new();
        let a = builder.add_place("a", true);
        let b = builder.add_place("b", false);
        builder.add_transition("ab", [a], [b]);
        builder.add_transition("ba", [b], [a]);
        let reachable = explore(&builder.build()).unwrap();
        assert_eq!(reachable.len(), 2);
    }

    #[test]
    fn test_concurrency_interleavings() {
        // Two independent one-shot transitions give 4 markings.
        let mut builder = NetBuilder::new();
        let a = builder.add_place("a", true);
        let b = builder.add_place("b", false);
        let c = builder.add_place("c", true);
        let d = builder.add_place("d", false);
        builder.add_transition("t1", [a], [b]);
        builder.add_transition("t2", [c], [d]);
        let reachable = explore(&builder.build()).unwrap();
        assert_eq!(reachable.len(), 4);
    }

    #[test]
    fn test_bound() {
        let mut builder = NetBuilder::new();
        let places = (0..4).map(|i| builder.add_place(format!("p{}", i), true)).collect::<Vec<_>>();
        let sinks = (0..4).map(|i| builder.add_place(format!("q{}", i), false)).collect::<Vec<_>>();
        for i in 0..4 {
            builder.add_transition(format!("t{}", i), [places[i]], [sinks[i]]);
        }
        let net = builder.build();

        assert_eq!(explore(&net).unwrap().len(), 16);
        assert_eq!(explore_bounded(&net, 16).unwrap().len(), 16);
        assert_eq!(
            explore_bounded(&net, 10).unwrap_err(),
            Error::StateSpaceTooLarge { limit: 10 }
        );
    }

    #[test]
    fn test_initial_marking_counts_against_bound() {
        let net = three_places();
        assert_eq!(
            explore_bounded(&net, 0).unwrap_err(),
            Error::StateSpaceTooLarge { limit: 0 }
        );
        assert_eq!(
            explore_bounded(&net, 1).unwrap_err(),
            Error::StateSpaceTooLarge { limit: 1 }
        );
        assert_eq!(explore_bounded(&net, 2).unwrap().len(), 2);

        // A net without transitions has exactly its initial marking.
        let mut builder = NetBuilder::new();
        builder.add_place("p", true);
        let net = builder.build();
        assert_eq!(explore_bounded(&net, 0).unwrap_err(), Error::StateSpaceTooLarge { limit: 0 });
        assert_eq!(explore_bounded(&net, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_too_many_places() {
        let mut builder = NetBuilder::new();
        for i in 0..65 {
            builder.add_place(format!("p{}", i), false);
        }
        assert_eq!(
            explore(&builder.build()).unwrap_err(),
            Error::TooManyPlaces { places: 65, max: 64 }
        );
    }

    #[test]
    fn test_read_arc_masks() {
        let mut builder = NetBuilder::new();
        let r = builder.add_place("r", true);
        let a = builder.add_place("a", true);
        let b = builder.add_place("b", false);
        builder.add_transition("t", [r, a], [r, b]);
        let reachable = explore(&builder.build()).unwrap();
        assert_eq!(reachable.masks().collect::<Vec<_>>(), vec![0b011, 0b101]);
    }

    #[test]
    fn test_best_by_weight() {
        let mut builder = NetBuilder::new();
        let a = builder.add_place("a", true);
        let b = builder.add_place("b", false);
        let c = builder.add_place("c", false);
        builder.add_transition("ab", [a], [b]);
        builder.add_transition("ac", [a], [c]);
        let reachable = explore(&builder.build()).unwrap();

        let (best, score) = reachable.best_by_weight(&Weights::new(vec![1, 5, 2])).unwrap();
        assert_eq!(best, Marking::from_mask(0b010, 3));
        assert_eq!(score, 5);

        // {b} and {c} tie; the smaller one has b unmarked.
        let (best, score) = reachable.best_by_weight(&Weights::new(vec![0, 3, 3])).unwrap();
        assert_eq!(best, Marking::from_mask(0b100, 3));
        assert_eq!(score, 3);
    }
}
