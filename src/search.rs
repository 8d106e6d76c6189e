//! Cutting-plane search over reachable markings.
//!
//! A 0-1 relaxation with one variable per place proposes candidate markings.
//! Candidates satisfy the state equation `M = M0 + C·σ` for some firing-count
//! vector `σ`, the place invariants, and "nothing enabled" for deadlocks. The
//! firing counts are bounded by the depth of the symbolic fixpoint, since every
//! reachable marking has a firing sequence at most that long.
//!
//! The reachable-set BDD then accepts or rejects each candidate. A rejected
//! candidate is provably unreachable, so it is cut off by
//!
//! ```text
//! sum(x[p] : p marked) - sum(x[p] : p unmarked) <= |marked| - 1
//! ```
//!
//! which excludes exactly that bit pattern. The cut joins the running search,
//! which resumes right after the rejected candidate.

use std::fmt;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::ilp::{BinaryProgram, Candidate, LazySolve, LinearConstraint};
use crate::invariants::place_invariants;
use crate::marking::Marking;
use crate::net::{Net, PlaceId};
use crate::symbolic::ReachableFunction;

/// Default cap on candidates checked against the reachable set per search.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

/// One weight per place; places without an entry weigh zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Weights(Vec<i64>);

impl Weights {
    pub fn new(weights: Vec<i64>) -> Self {
        Self(weights)
    }

    pub fn uniform(num_places: usize, weight: i64) -> Self {
        Self(vec![weight; num_places])
    }

    pub fn get(&self, place: usize) -> i64 {
        self.0.get(place).copied().unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Exact weight of the given places.
    pub fn total(&self, places: impl IntoIterator<Item = usize>) -> i128 {
        places.into_iter().map(|p| self.get(p) as i128).sum()
    }

    /// Weight of `marking`, saturating at the `i64` range.
    pub fn score(&self, marking: &Marking) -> i64 {
        saturate(self.total(marking.marked_places().map(|p| p.index())))
    }
}

pub(crate) fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

impl From<Vec<i64>> for Weights {
    fn from(weights: Vec<i64>) -> Self {
        Self(weights)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadlockSearch {
    /// A reachable marking with no enabled transition.
    Found { marking: Marking, attempts: usize },
    /// The relaxation ran out of candidates: no deadlock is reachable.
    Absent { attempts: usize },
    /// The attempt cap was hit before a verdict.
    Exhausted { attempts: usize },
}

impl DeadlockSearch {
    pub fn attempts(&self) -> usize {
        match self {
            DeadlockSearch::Found { attempts, .. }
            | DeadlockSearch::Absent { attempts }
            | DeadlockSearch::Exhausted { attempts } => *attempts,
        }
    }

    pub fn marking(&self) -> Option<&Marking> {
        match self {
            DeadlockSearch::Found { marking, .. } => Some(marking),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Marking> {
        match self {
            DeadlockSearch::Found { marking, .. } => Ok(marking),
            DeadlockSearch::Absent { attempts } => Err(Error::RelaxationInfeasible { attempts }),
            DeadlockSearch::Exhausted { attempts } => Err(Error::SearchBudgetExhausted { attempts }),
        }
    }
}

impl fmt::Display for DeadlockSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlockSearch::Found { marking, attempts } => {
                write!(f, "deadlock {} (after {} attempts)", marking, attempts)
            }
            DeadlockSearch::Absent { attempts } => write!(f, "no deadlock (after {} attempts)", attempts),
            DeadlockSearch::Exhausted { attempts } => {
                write!(f, "search budget exhausted after {} attempts", attempts)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Optimization {
    Optimal {
        marking: Marking,
        score: i64,
        attempts: usize,
    },
    Infeasible {
        attempts: usize,
    },
    Exhausted {
        attempts: usize,
    },
}

impl Optimization {
    pub fn attempts(&self) -> usize {
        match self {
            Optimization::Optimal { attempts, .. }
            | Optimization::Infeasible { attempts }
            | Optimization::Exhausted { attempts } => *attempts,
        }
    }

    pub fn into_result(self) -> Result<(Marking, i64)> {
        match self {
            Optimization::Optimal { marking, score, .. } => Ok((marking, score)),
            Optimization::Infeasible { attempts } => Err(Error::RelaxationInfeasible { attempts }),
            Optimization::Exhausted { attempts } => Err(Error::SearchBudgetExhausted { attempts }),
        }
    }
}

impl fmt::Display for Optimization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Optimization::Optimal {
                marking,
                score,
                attempts,
            } => write!(f, "optimum {} with score {} (after {} attempts)", marking, score, attempts),
            Optimization::Infeasible { attempts } => write!(f, "infeasible (after {} attempts)", attempts),
            Optimization::Exhausted { attempts } => {
                write!(f, "search budget exhausted after {} attempts", attempts)
            }
        }
    }
}

/// Place variables `0..P`, constrained by the place invariants and by the
/// state equation with at most `max_firings` firings in total.
///
/// Every marking reachable within `max_firings` steps is a solution.
pub fn relaxation(net: &Net, max_firings: usize) -> BinaryProgram {
    let mut program = BinaryProgram::new(net.num_places());
    for invariant in place_invariants(net) {
        let terms = invariant.coefficients.iter().copied().enumerate();
        program.add_constraint(LinearConstraint::equals(terms, invariant.token_sum));
    }

    let incidence = net.incidence();
    let bound = (max_firings as u64).min((1 << 62) - 1);
    // Transitions that change no place have no effect on the equation.
    let firings = (0..net.num_transitions())
        .map(|t| incidence.iter().any(|row| row[t] != 0).then(|| program.add_integer(bound)))
        .collect::<Vec<_>>();

    let total = firings.iter().flatten().flat_map(|sigma| sigma.terms(1)).collect::<Vec<_>>();
    if !total.is_empty() {
        program.add_constraint(LinearConstraint::le(total, bound as i64));
    }

    // x[p] - sum(C[p][t] * sigma[t]) = M0[p]
    for (p, row) in incidence.iter().enumerate() {
        let effect = firings
            .iter()
            .zip(row)
            .filter_map(|(sigma, &c)| sigma.as_ref().map(|sigma| sigma.terms(-c)))
            .flatten();
        let m0 = net.initial_marking().is_marked(PlaceId::from_index(p)) as i64;
        program.add_constraint(LinearConstraint::equals([(p, 1)].into_iter().chain(effect), m0));
    }
    program
}

/// Add "no transition is enabled" to `program`.
///
/// Returns `false` if some transition is always enabled, so no marking qualifies.
fn add_deadlock_constraints(net: &Net, program: &mut BinaryProgram) -> bool {
    for t in net.transitions() {
        let inputs = t.inputs().iter().map(|p| p.index()).collect::<Vec<_>>();
        let outputs = t.pure_outputs().map(|p| p.index()).collect::<Vec<_>>();
        let n = inputs.len() as i64;

        match (inputs.is_empty(), outputs.is_empty()) {
            (true, true) => {
                debug!("transition {} has no precondition", t.name);
                return false;
            }
            // Some input is empty.
            (false, true) => {
                program.add_constraint(LinearConstraint::le(inputs.iter().map(|&i| (i, 1)), n - 1));
            }
            // Some pure output is marked.
            (true, false) => {
                program.add_constraint(LinearConstraint::ge(outputs.iter().map(|&o| (o, 1)), 1));
            }
            // Either; z selects which one holds.
            (false, false) => {
                let z = program.add_var();
                program.add_constraint(LinearConstraint::le(
                    inputs.iter().map(|&i| (i, 1)).chain([(z, -n)]),
                    n - 1,
                ));
                program.add_constraint(LinearConstraint::ge(
                    outputs.iter().map(|&o| (o, 1)).chain([(z, -1)]),
                    0,
                ));
            }
        }
    }
    true
}

/// The constraint violated by `marking` and by nothing else.
pub fn exclusion_cut(marking: &Marking) -> LinearConstraint {
    let ones = marking.count_tokens() as i64;
    let terms = marking
        .bits()
        .enumerate()
        .map(|(i, bit)| (i, if bit { 1 } else { -1 }));
    LinearConstraint::le(terms, ones - 1)
}

enum Verdict {
    Accepted(Marking, usize),
    Infeasible(usize),
    Exhausted(usize),
}

/// One solver run; every candidate is checked against `reachable`, and
/// `attempts` counts the candidates checked.
fn refine(program: &mut BinaryProgram, num_places: usize, reachable: &ReachableFunction, max_attempts: usize) -> Verdict {
    let mut attempts = 0;
    let outcome = program.solve_lazy(num_places, |values| {
        if attempts >= max_attempts {
            return Candidate::Stop;
        }
        attempts += 1;

        let candidate = Marking::from_bits(values[..num_places].iter().copied());
        if reachable.contains(&candidate) {
            debug!("attempt {}: candidate {} is reachable", attempts, candidate);
            Candidate::Accept
        } else {
            debug!("attempt {}: candidate {} is unreachable, cutting it off", attempts, candidate);
            Candidate::Reject(exclusion_cut(&candidate))
        }
    });

    match outcome {
        LazySolve::Finished(Some(solution)) => {
            let marking = Marking::from_bits(solution.values[..num_places].iter().copied());
            info!("Accepted {} after {} attempts", marking, attempts);
            Verdict::Accepted(marking, attempts)
        }
        LazySolve::Finished(None) => {
            info!("Relaxation infeasible after {} attempts", attempts);
            Verdict::Infeasible(attempts)
        }
        LazySolve::Stopped(_) => {
            info!("Giving up after {} attempts", attempts);
            Verdict::Exhausted(attempts)
        }
    }
}

pub fn find_deadlock(net: &Net, reachable: &ReachableFunction) -> DeadlockSearch {
    find_deadlock_with(net, reachable, DEFAULT_MAX_ATTEMPTS)
}

pub fn find_deadlock_with(net: &Net, reachable: &ReachableFunction, max_attempts: usize) -> DeadlockSearch {
    let mut program = relaxation(net, reachable.depth());
    if !add_deadlock_constraints(net, &mut program) {
        return DeadlockSearch::Absent { attempts: 0 };
    }
    info!(
        "Deadlock relaxation: {} variables, {} constraints",
        program.num_vars(),
        program.num_constraints()
    );

    match refine(&mut program, net.num_places(), reachable, max_attempts) {
        Verdict::Accepted(marking, attempts) => {
            debug_assert!(net.is_deadlock(&marking));
            DeadlockSearch::Found { marking, attempts }
        }
        Verdict::Infeasible(attempts) => DeadlockSearch::Absent { attempts },
        Verdict::Exhausted(attempts) => DeadlockSearch::Exhausted { attempts },
    }
}

pub fn optimize(net: &Net, reachable: &ReachableFunction, weights: &Weights) -> Optimization {
    optimize_with(net, reachable, weights, DEFAULT_MAX_ATTEMPTS)
}

pub fn optimize_with(net: &Net, reachable: &ReachableFunction, weights: &Weights, max_attempts: usize) -> Optimization {
    let mut program = relaxation(net, reachable.depth());
    program.set_objective((0..net.num_places()).map(|p| weights.get(p)).collect());
    info!(
        "Optimization relaxation: {} variables, {} constraints",
        program.num_vars(),
        program.num_constraints()
    );

    match refine(&mut program, net.num_places(), reachable, max_attempts) {
        Verdict::Accepted(marking, attempts) => Optimization::Optimal {
            score: weights.score(&marking),
            marking,
            attempts,
        },
        Verdict::Infeasible(attempts) => Optimization::Infeasible { attempts },
        Verdict::Exhausted(attempts) => Optimization::Exhausted { attempts },
    }
}
