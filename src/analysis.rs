//! End-to-end analysis of a net.
//!
//! Explicit search runs first (when the net is small enough) and serves as
//! ground truth for the symbolic fixpoint. The reachable-set BDD is then
//! shared by the deadlock search and the optional optimization.

use std::fmt;

use log::{info, warn};
use num_bigint::BigUint;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::explicit::{explore_masked, MaskedNet, ReachableSet};
use crate::net::Net;
use crate::reference::Ref;
use crate::search::{find_deadlock_with, optimize_with, DeadlockSearch, Optimization, Weights};
use crate::symbolic::{build_with, ReachableFunction};

#[derive(Debug, Clone)]
pub struct Report {
    pub places: usize,
    pub transitions: usize,
    /// `None` when explicit search was skipped or gave up.
    pub explicit_count: Option<usize>,
    pub symbolic_count: BigUint,
    pub fixpoint_iterations: usize,
    pub bdd_nodes: usize,
    /// Reachable markings without an enabled transition, counted symbolically.
    pub dead_count: BigUint,
    pub deadlock: DeadlockSearch,
    pub optimization: Option<Optimization>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "places:             {}", self.places)?;
        writeln!(f, "transitions:        {}", self.transitions)?;
        match self.explicit_count {
            Some(count) => writeln!(f, "explicit markings:  {}", count)?,
            None => writeln!(f, "explicit markings:  skipped")?,
        }
        writeln!(f, "symbolic markings:  {}", self.symbolic_count)?;
        writeln!(f, "fixpoint:           {} iterations, {} nodes", self.fixpoint_iterations, self.bdd_nodes)?;
        writeln!(f, "dead markings:      {}", self.dead_count)?;
        write!(f, "deadlock search:    {}", self.deadlock)?;
        if let Some(optimization) = &self.optimization {
            write!(f, "\noptimization:       {}", optimization)?;
        }
        Ok(())
    }
}

pub struct Analyzer<'a> {
    net: &'a Net,
    config: AnalysisConfig,
    weights: Option<Weights>,
}

impl<'a> Analyzer<'a> {
    pub fn new(net: &'a Net, config: AnalysisConfig) -> Self {
        Self {
            net,
            config,
            weights: None,
        }
    }

    /// Also maximize `weights` over the reachable markings.
    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Explicit reachable set, or `None` if the net is out of reach for it.
    pub fn explicit(&self) -> Result<Option<(MaskedNet, ReachableSet)>> {
        let explored = MaskedNet::new(self.net).and_then(|masked| {
            let reachable = explore_masked(&masked, self.config.explicit_limit)?;
            Ok((masked, reachable))
        });
        match explored {
            Ok(pair) => Ok(Some(pair)),
            Err(e) if e.is_explicit_limit() => {
                warn!("Skipping explicit search: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn run(&self) -> Result<Report> {
        let explicit = self.explicit()?;
        let reachable = build_with(self.net, self.config.bdd);

        if let Some((masked, explicit)) = &explicit {
            if self.config.cross_validate {
                self.cross_validate(masked, explicit, &reachable)?;
            }
        }

        let deadlock = find_deadlock_with(self.net, &reachable, self.config.max_attempts);
        let dead = reachable.dead_states();
        let dead_count = reachable.symbolic().count(dead);
        check_deadlock_verdict(&reachable, dead, &deadlock)?;

        let optimization = self
            .weights
            .as_ref()
            .map(|weights| optimize_with(self.net, &reachable, weights, self.config.max_attempts));

        let report = Report {
            places: self.net.num_places(),
            transitions: self.net.num_transitions(),
            explicit_count: explicit.as_ref().map(|(_, set)| set.len()),
            symbolic_count: reachable.count().clone(),
            fixpoint_iterations: reachable.iterations().len(),
            bdd_nodes: reachable.size(),
            dead_count,
            deadlock,
            optimization,
        };
        info!("Analysis finished: {} reachable markings", report.symbolic_count);
        Ok(report)
    }

    fn cross_validate(&self, masked: &MaskedNet, explicit: &ReachableSet, reachable: &ReachableFunction) -> Result<()> {
        let explicit_count = BigUint::from(explicit.len());
        if &explicit_count != reachable.count() {
            return Err(Error::OracleMismatch {
                details: format!(
                    "explicit search found {} markings, symbolic fixpoint {}",
                    explicit_count,
                    reachable.count()
                ),
            });
        }

        if self.config.check_set_equality {
            let symbolic = reachable.symbolic();
            let encoded = symbolic.encode_markings(explicit.markings());
            if encoded != reachable.root() {
                let bdd = reachable.bdd();
                let missing = symbolic.markings(bdd.apply_diff(encoded, reachable.root()));
                let extra = symbolic.markings(bdd.apply_diff(reachable.root(), encoded));
                return Err(Error::OracleMismatch {
                    details: format!(
                        "{} markings only found explicitly (first: {:?}), {} only symbolically (first: {:?})",
                        missing.len(),
                        missing.first().map(|m| m.to_string()),
                        extra.len(),
                        extra.first().map(|m| m.to_string()),
                    ),
                });
            }

            let dead_explicit = explicit.dead_markings(masked);
            let dead_symbolic = symbolic.encode_markings(dead_explicit);
            if dead_symbolic != reachable.dead_states() {
                return Err(Error::OracleMismatch {
                    details: "explicit and symbolic dead markings differ".to_string(),
                });
            }
        }

        info!("Explicit and symbolic reachable sets agree ({} markings)", explicit_count);
        Ok(())
    }
}

/// The cutting-plane verdict must agree with the symbolic dead set.
fn check_deadlock_verdict(reachable: &ReachableFunction, dead: Ref, verdict: &DeadlockSearch) -> Result<()> {
    let symbolic = reachable.symbolic();
    match verdict {
        DeadlockSearch::Found { marking, .. } if !symbolic.contains(dead, marking) => Err(Error::OracleMismatch {
            details: format!("reported deadlock {} is not a reachable dead marking", marking),
        }),
        DeadlockSearch::Absent { .. } if dead != Ref::ZERO => Err(Error::OracleMismatch {
            details: format!("no deadlock reported, but {} dead markings are reachable", symbolic.count(dead)),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::explicit::explore;
    use crate::generators::{chain, mutex, philosophers, ring};
    use crate::marking::Marking;
    use crate::net::NetBuilder;
    use crate::symbolic::build;

    fn explored(net: &Net) -> (MaskedNet, ReachableSet) {
        (MaskedNet::new(net).unwrap(), explore(net).unwrap())
    }

    /// Three places, `a -> c` from `{a, b}`: reaches `{a, b}` and `{b, c}`.
    fn keep_b() -> Net {
        let mut builder = NetBuilder::new();
        let a = builder.add_place("a", true);
        builder.add_place("b", true);
        let c = builder.add_place("c", false);
        builder.add_transition("ac", [a], [c]);
        builder.build()
    }

    #[test]
    fn test_chain_report() {
        let net = chain(4);
        let report = Analyzer::new(&net, AnalysisConfig::default())
            .with_weights(Weights::new(vec![1, 2, 3, 0]))
            .run()
            .unwrap();

        assert_eq!(report.explicit_count, Some(4));
        assert_eq!(report.symbolic_count, BigUint::from(4u8));
        assert_eq!(report.dead_count, BigUint::from(1u8));
        assert_eq!(report.deadlock.marking(), Some(&Marking::from_mask(0b1000, 4)));
        let Some(Optimization::Optimal { marking, score, .. }) = report.optimization else {
            panic!("expected an optimum");
        };
        assert_eq!(marking, Marking::from_mask(0b0100, 4));
        assert_eq!(score, 3);
    }

    #[test]
    fn test_mutex_has_no_deadlock() {
        let net = mutex(3);
        let report = Analyzer::new(&net, AnalysisConfig::default()).run().unwrap();
        assert!(matches!(report.deadlock, DeadlockSearch::Absent { .. }));
        assert_eq!(report.dead_count, BigUint::ZERO);
        assert!(report.optimization.is_none());
        assert!(report.to_string().contains("no deadlock"));
    }

    #[test]
    fn test_count_mismatch_is_fatal() {
        let net = chain(4);
        let analyzer = Analyzer::new(&net, AnalysisConfig::default());
        let (masked, explicit) = explored(&chain(3));
        let result = analyzer.cross_validate(&masked, &explicit, &build(&net));
        assert!(matches!(result, Err(Error::OracleMismatch { .. })), "{:?}", result);
    }

    #[test]
    fn test_set_mismatch_is_fatal() {
        // Both nets have two reachable markings over three places, but different ones.
        let mut builder = NetBuilder::new();
        let p1 = builder.add_place("p1", true);
        let p2 = builder.add_place("p2", false);
        builder.add_place("p3", false);
        builder.add_transition("t", [p1], [p2]);
        let three_places = builder.build();
        let reachable = build(&three_places);
        let (masked, explicit) = explored(&keep_b());
        assert_eq!(explicit.len(), 2);

        let analyzer = Analyzer::new(&three_places, AnalysisConfig::default());
        let result = analyzer.cross_validate(&masked, &explicit, &reachable);
        let Err(Error::OracleMismatch { details }) = result else {
            panic!("expected a mismatch, got {:?}", result);
        };
        assert!(details.contains("only found explicitly"), "{}", details);

        // Counting alone does not notice.
        let config = AnalysisConfig::default().with_check_set_equality(false);
        let analyzer = Analyzer::new(&three_places, config);
        assert_eq!(analyzer.cross_validate(&masked, &explicit, &reachable), Ok(()));
    }

    #[test]
    fn test_dead_set_mismatch_is_fatal() {
        // Same reachable markings; the chain ends in a deadlock, the ring does not.
        let net = chain(3);
        let (masked, explicit) = explored(&ring(3));
        let analyzer = Analyzer::new(&net, AnalysisConfig::default());
        let result = analyzer.cross_validate(&masked, &explicit, &build(&net));
        let Err(Error::OracleMismatch { details }) = result else {
            panic!("expected a mismatch, got {:?}", result);
        };
        assert!(details.contains("dead markings differ"), "{}", details);

        let (masked, explicit) = explored(&net);
        assert_eq!(analyzer.cross_validate(&masked, &explicit, &build(&net)), Ok(()));
    }

    #[test]
    fn test_deadlock_verdict_is_checked() {
        let net = chain(3);
        let reachable = build(&net);
        let dead = reachable.dead_states();

        let absent = DeadlockSearch::Absent { attempts: 0 };
        let result = check_deadlock_verdict(&reachable, dead, &absent);
        assert!(matches!(result, Err(Error::OracleMismatch { .. })), "{:?}", result);

        let live = DeadlockSearch::Found {
            marking: net.initial_marking().clone(),
            attempts: 1,
        };
        let result = check_deadlock_verdict(&reachable, dead, &live);
        assert!(matches!(result, Err(Error::OracleMismatch { .. })), "{:?}", result);

        let found = DeadlockSearch::Found {
            marking: Marking::from_mask(0b100, 3),
            attempts: 1,
        };
        assert_eq!(check_deadlock_verdict(&reachable, dead, &found), Ok(()));
        let exhausted = DeadlockSearch::Exhausted { attempts: 7 };
        assert_eq!(check_deadlock_verdict(&reachable, dead, &exhausted), Ok(()));
    }

    #[test]
    fn test_symbolic_only_when_bound_is_hit() {
        let net = philosophers(3);
        let config = AnalysisConfig::default().with_explicit_limit(Some(2));
        let report = Analyzer::new(&net, config).run().unwrap();
        assert_eq!(report.explicit_count, None);
        assert!(report.to_string().contains("skipped"));
        assert!(report.deadlock.marking().is_some());
    }
}
