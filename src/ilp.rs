//! Pure 0-1 integer programs.
//!
//! A [`BinaryProgram`] has boolean variables, linear constraints with integer
//! coefficients and an optional linear objective to maximize. [`BinaryProgram::solve`]
//! runs a depth-first branch and bound:
//!
//! - variables are branched in index order, `false` before `true`;
//! - each constraint keeps the range `[min, max]` of its activity over all
//!   completions of the current partial assignment, which detects conflicts
//!   and forces variables whose other value would cause one;
//! - a subtree is pruned when the sum of the objective so far and all
//!   remaining positive weights cannot beat the incumbent.
//!
//! Only strict improvements replace the incumbent, so the returned solution is
//! the lexicographically smallest optimal one.
//!
//! [`BinaryProgram::solve_lazy`] runs the same search but hands every solution
//! to a callback that may reject it with a new constraint. Bounded integers are
//! encoded in binary with [`BinaryProgram::add_integer`].

use std::fmt;

use log::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for Cmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cmp::Le => "<=",
            Cmp::Ge => ">=",
            Cmp::Eq => "=",
        })
    }
}

/// `sum(coef * x[var]) cmp rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    /// Sorted by variable, one term per variable, no zero coefficients.
    terms: Vec<(usize, i64)>,
    cmp: Cmp,
    rhs: i64,
}

impl LinearConstraint {
    pub fn new(terms: impl IntoIterator<Item = (usize, i64)>, cmp: Cmp, rhs: i64) -> Self {
        let mut terms = terms.into_iter().collect::<Vec<_>>();
        terms.sort_unstable_by_key(|&(var, _)| var);
        let mut merged: Vec<(usize, i64)> = Vec::with_capacity(terms.len());
        for (var, coef) in terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == var => *acc += coef,
                _ => merged.push((var, coef)),
            }
        }
        merged.retain(|&(_, coef)| coef != 0);
        Self {
            terms: merged,
            cmp,
            rhs,
        }
    }

    pub fn le(terms: impl IntoIterator<Item = (usize, i64)>, rhs: i64) -> Self {
        Self::new(terms, Cmp::Le, rhs)
    }

    pub fn ge(terms: impl IntoIterator<Item = (usize, i64)>, rhs: i64) -> Self {
        Self::new(terms, Cmp::Ge, rhs)
    }

    pub fn equals(terms: impl IntoIterator<Item = (usize, i64)>, rhs: i64) -> Self {
        Self::new(terms, Cmp::Eq, rhs)
    }

    pub fn terms(&self) -> &[(usize, i64)] {
        &self.terms
    }

    pub fn cmp(&self) -> Cmp {
        self.cmp
    }

    pub fn rhs(&self) -> i64 {
        self.rhs
    }

    pub fn activity(&self, values: &[bool]) -> i128 {
        self.terms
            .iter()
            .filter(|&&(var, _)| values[var])
            .map(|&(_, coef)| coef as i128)
            .sum()
    }

    pub fn is_satisfied(&self, values: &[bool]) -> bool {
        let lhs = self.activity(values);
        let rhs = self.rhs as i128;
        match self.cmp {
            Cmp::Le => lhs <= rhs,
            Cmp::Ge => lhs >= rhs,
            Cmp::Eq => lhs == rhs,
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            write!(f, "0")?;
        }
        for (i, &(var, coef)) in self.terms.iter().enumerate() {
            match (i, coef < 0) {
                (0, false) => write!(f, "{}*x{}", coef, var)?,
                (0, true) => write!(f, "-{}*x{}", coef.unsigned_abs(), var)?,
                (_, false) => write!(f, " + {}*x{}", coef, var)?,
                (_, true) => write!(f, " - {}*x{}", coef.unsigned_abs(), var)?,
            }
        }
        write!(f, " {} {}", self.cmp, self.rhs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub values: Vec<bool>,
    pub objective: i64,
}

#[derive(Debug, Clone, Default)]
pub struct BinaryProgram {
    num_vars: usize,
    constraints: Vec<LinearConstraint>,
    /// Maximized; missing entries are zero.
    objective: Vec<i64>,
}

impl BinaryProgram {
    pub fn new(num_vars: usize) -> Self {
        Self {
            num_vars,
            constraints: Vec::new(),
            objective: Vec::new(),
        }
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Append a fresh variable and return its index.
    pub fn add_var(&mut self) -> usize {
        self.num_vars += 1;
        self.num_vars - 1
    }

    /// # Panics
    ///
    /// Panics if the constraint mentions an unknown variable.
    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        if let Some(&(var, _)) = constraint.terms.last() {
            assert!(var < self.num_vars, "Variable x{} is out of bounds", var);
        }
        self.constraints.push(constraint);
    }

    /// Maximize `sum(weights[i] * x[i])`.
    pub fn set_objective(&mut self, weights: Vec<i64>) {
        assert!(weights.len() <= self.num_vars, "Objective mentions unknown variables");
        self.objective = weights;
    }

    fn weight(&self, var: usize) -> i64 {
        self.objective.get(var).copied().unwrap_or(0)
    }

    pub fn objective_value(&self, values: &[bool]) -> i64 {
        (0..self.num_vars)
            .filter(|&var| values[var])
            .fold(0i64, |acc, var| acc.saturating_add(self.weight(var)))
    }

    pub fn is_feasible(&self, values: &[bool]) -> bool {
        values.len() == self.num_vars && self.constraints.iter().all(|c| c.is_satisfied(values))
    }

    /// Append a non-negative integer variable bounded by `upper`, in binary.
    ///
    /// # Panics
    ///
    /// Panics if `upper` does not fit in 62 bits.
    pub fn add_integer(&mut self, upper: u64) -> IntegerVar {
        assert!(upper < 1 << 62, "Integer bound {} is too large", upper);
        let width = (u64::BITS - upper.leading_zeros()) as usize;
        let first = self.num_vars;
        self.num_vars += width;
        // Most significant bit gets the lowest index, so small values are tried first.
        let bits = (0..width).map(|k| first + width - 1 - k).collect();
        let var = IntegerVar { bits, upper };
        if (1u64 << width) - 1 > upper {
            self.add_constraint(LinearConstraint::le(var.terms(1), upper as i64));
        }
        var
    }

    /// Lexicographically smallest optimal solution, or `None` if infeasible.
    pub fn solve(&self) -> Option<Solution> {
        let mut search = Search::new(self.num_vars, self.constraints.clone(), &self.objective, self.num_vars);
        let result = search.run(&mut |_: &[bool]| Candidate::Accept);
        debug!(
            "solved 0-1 program with {} vars, {} constraints: {} nodes, {}",
            self.num_vars,
            self.constraints.len(),
            search.nodes,
            if result.is_some() { "feasible" } else { "infeasible" }
        );
        result
    }

    /// Branch and bound where every solution must also pass `check`.
    ///
    /// The first `prefix` variables are branched on as usual. Once they are all
    /// assigned and the rest can be completed, the full assignment goes to
    /// `check`. A rejected candidate's constraint is added to the program and
    /// the search goes on from where it was, so no work is repeated. The
    /// objective may only weigh prefix variables.
    ///
    /// Returns the lexicographically smallest optimal accepted solution, or the
    /// best one accepted so far if `check` stopped the search.
    pub fn solve_lazy(&mut self, prefix: usize, mut check: impl FnMut(&[bool]) -> Candidate) -> LazySolve {
        assert!(prefix <= self.num_vars, "Prefix is longer than the program");
        assert!(
            self.objective.iter().skip(prefix).all(|&w| w == 0),
            "Objective mentions variables outside the prefix"
        );

        let constraints = std::mem::take(&mut self.constraints);
        let initial = constraints.len();
        let mut search = Search::new(self.num_vars, constraints, &self.objective, prefix);
        let result = search.run(&mut check);
        debug!(
            "lazy 0-1 search over {} vars: {} nodes, {} cuts added, {}",
            self.num_vars,
            search.nodes,
            search.constraints.len() - initial,
            if search.stopped { "stopped" } else { "finished" }
        );
        let stopped = search.stopped;
        self.constraints = search.constraints;

        if stopped {
            LazySolve::Stopped(result)
        } else {
            LazySolve::Finished(result)
        }
    }
}

/// A non-negative integer encoded as `sum(2^k * x[bits[k]])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerVar {
    bits: Vec<usize>,
    upper: u64,
}

impl IntegerVar {
    /// Variable of each bit, least significant first.
    pub fn bits(&self) -> &[usize] {
        &self.bits
    }

    pub fn upper(&self) -> u64 {
        self.upper
    }

    /// Terms of `coef * self`.
    pub fn terms(&self, coef: i64) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.bits.iter().enumerate().map(move |(k, &var)| (var, coef * (1i64 << k)))
    }

    pub fn value(&self, values: &[bool]) -> u64 {
        self.bits
            .iter()
            .enumerate()
            .filter(|&(_, &var)| values[var])
            .map(|(k, _)| 1u64 << k)
            .sum()
    }
}

/// Verdict of the caller on a candidate solution of [`BinaryProgram::solve_lazy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Accept,
    /// Discard the candidate and add this constraint, which it must violate.
    Reject(LinearConstraint),
    /// Abandon the search.
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LazySolve {
    /// The search space was exhausted; the result is final.
    Finished(Option<Solution>),
    Stopped(Option<Solution>),
}

type Check<'c> = &'c mut dyn FnMut(&[bool]) -> Candidate;

struct Search<'a> {
    constraints: Vec<LinearConstraint>,
    objective: &'a [i64],
    /// Variables below this index are branched on before a candidate is checked.
    prefix: usize,
    /// For each variable, the constraints it occurs in.
    occurs: Vec<Vec<(usize, i64)>>,
    values: Vec<Option<bool>>,
    min: Vec<i128>,
    max: Vec<i128>,
    trail: Vec<usize>,
    /// Objective of the variables assigned `true`.
    fixed: i128,
    /// Sum of the positive weights of unassigned variables.
    optimistic: i128,
    feasibility_only: bool,
    best: Option<(Vec<bool>, i128)>,
    stopped: bool,
    nodes: usize,
}

impl<'a> Search<'a> {
    fn new(num_vars: usize, constraints: Vec<LinearConstraint>, objective: &'a [i64], prefix: usize) -> Self {
        let mut search = Self {
            constraints: Vec::with_capacity(constraints.len()),
            objective,
            prefix,
            occurs: vec![Vec::new(); num_vars],
            values: vec![None; num_vars],
            min: Vec::with_capacity(constraints.len()),
            max: Vec::with_capacity(constraints.len()),
            trail: Vec::with_capacity(num_vars),
            fixed: 0,
            optimistic: objective.iter().map(|&w| w.max(0) as i128).sum(),
            feasibility_only: objective.iter().all(|&w| w == 0),
            best: None,
            stopped: false,
            nodes: 0,
        };
        for constraint in constraints {
            search.add_constraint(constraint);
        }
        search
    }

    fn weight(&self, var: usize) -> i64 {
        self.objective.get(var).copied().unwrap_or(0)
    }

    /// Register `constraint`, with its activity range taken from the current assignment.
    fn add_constraint(&mut self, constraint: LinearConstraint) {
        let c = self.constraints.len();
        let mut lo = 0i128;
        let mut hi = 0i128;
        for &(var, coef) in &constraint.terms {
            assert!(var < self.values.len(), "Variable x{} is out of bounds", var);
            self.occurs[var].push((c, coef));
            let coef = coef as i128;
            match self.values[var] {
                Some(true) => {
                    lo += coef;
                    hi += coef;
                }
                Some(false) => {}
                None => {
                    lo += coef.min(0);
                    hi += coef.max(0);
                }
            }
        }
        self.min.push(lo);
        self.max.push(hi);
        self.constraints.push(constraint);
    }

    fn run(&mut self, check: Check<'_>) -> Option<Solution> {
        let all_consistent = (0..self.constraints.len()).all(|c| self.propagate_constraint(c));
        if all_consistent && self.propagate(0) {
            self.branch(check);
        }

        let (values, objective) = self.best.take()?;
        debug_assert!(self.constraints.iter().all(|c| c.is_satisfied(&values)));
        Some(Solution {
            objective: clamp(objective),
            values,
        })
    }

    fn assign(&mut self, var: usize, value: bool) {
        debug_assert!(self.values[var].is_none());
        self.values[var] = Some(value);
        self.trail.push(var);
        for &(c, coef) in &self.occurs[var] {
            let coef = coef as i128;
            if value {
                self.min[c] += coef.max(0);
                self.max[c] += coef.min(0);
            } else {
                self.min[c] -= coef.min(0);
                self.max[c] -= coef.max(0);
            }
        }
        let weight = self.weight(var) as i128;
        self.optimistic -= weight.max(0);
        if value {
            self.fixed += weight;
        }
    }

    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let Some(var) = self.trail.pop() else { break };
            let Some(value) = self.values[var].take() else {
                continue;
            };
            for &(c, coef) in &self.occurs[var] {
                let coef = coef as i128;
                if value {
                    self.min[c] -= coef.max(0);
                    self.max[c] -= coef.min(0);
                } else {
                    self.min[c] += coef.min(0);
                    self.max[c] += coef.max(0);
                }
            }
            let weight = self.weight(var) as i128;
            self.optimistic += weight.max(0);
            if value {
                self.fixed -= weight;
            }
        }
    }

    /// Check constraint `c` and assign every variable it forces.
    ///
    /// Returns `false` on conflict.
    fn propagate_constraint(&mut self, c: usize) -> bool {
        let rhs = self.constraints[c].rhs as i128;
        let (upper, lower) = match self.constraints[c].cmp {
            Cmp::Le => (true, false),
            Cmp::Ge => (false, true),
            Cmp::Eq => (true, true),
        };
        if (upper && self.min[c] > rhs) || (lower && self.max[c] < rhs) {
            return false;
        }

        for k in 0..self.constraints[c].terms.len() {
            let (var, coef) = self.constraints[c].terms[k];
            if self.values[var].is_some() {
                continue;
            }
            let coef = coef as i128;
            // Activity range change if the variable were fixed to true / false.
            let true_breaks = (upper && self.min[c] + coef.max(0) > rhs) || (lower && self.max[c] + coef.min(0) < rhs);
            let false_breaks =
                (upper && self.min[c] - coef.min(0) > rhs) || (lower && self.max[c] - coef.max(0) < rhs);
            match (true_breaks, false_breaks) {
                (true, true) => return false,
                (true, false) => self.assign(var, false),
                (false, true) => self.assign(var, true),
                (false, false) => {}
            }
        }
        true
    }

    /// Re-check the constraints of every variable assigned since `head`.
    fn propagate(&mut self, mut head: usize) -> bool {
        while head < self.trail.len() {
            let var = self.trail[head];
            head += 1;
            for k in 0..self.occurs[var].len() {
                let (c, _) = self.occurs[var][k];
                if !self.propagate_constraint(c) {
                    return false;
                }
            }
        }
        true
    }

    /// Returns `true` once the search can stop.
    fn branch(&mut self, check: Check<'_>) -> bool {
        self.nodes += 1;

        if let Some((_, best)) = &self.best {
            if self.fixed + self.optimistic <= *best {
                return false;
            }
        }

        let Some(var) = self.values[..self.prefix].iter().position(|v| v.is_none()) else {
            return self.leaf(check);
        };

        for value in [false, true] {
            let mark = self.trail.len();
            self.assign(var, value);
            let stop = self.propagate(mark) && self.branch(&mut *check);
            self.undo(mark);
            if stop {
                return true;
            }
        }
        false
    }

    /// All prefix variables are assigned: complete the rest and ask `check`.
    fn leaf(&mut self, check: Check<'_>) -> bool {
        let mark = self.trail.len();
        let candidate = self
            .complete()
            .then(|| self.values.iter().map(|v| v.unwrap_or(false)).collect::<Vec<_>>());
        let objective = self.fixed;
        self.undo(mark);
        let Some(values) = candidate else {
            return false;
        };

        match check(&values) {
            Candidate::Accept => {
                self.best = Some((values, objective));
                self.feasibility_only
            }
            Candidate::Reject(cut) => {
                debug_assert!(!cut.is_satisfied(&values), "Cut {} keeps the candidate", cut);
                self.add_constraint(cut);
                false
            }
            Candidate::Stop => {
                self.stopped = true;
                true
            }
        }
    }

    /// Any assignment of the remaining variables, left on the trail.
    fn complete(&mut self) -> bool {
        self.nodes += 1;
        let Some(var) = self.values.iter().position(|v| v.is_none()) else {
            return true;
        };
        for value in [false, true] {
            let mark = self.trail.len();
            self.assign(var, value);
            if self.propagate(mark) && self.complete() {
                return true;
            }
            self.undo(mark);
        }
        false
    }
}

fn clamp(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_constraint_normalization() {
        let c = LinearConstraint::le([(2, 1), (0, 3), (2, -1), (1, -2), (0, 1)], 5);
        assert_eq!(c.terms(), &[(0, 4), (1, -2)]);
        assert_eq!(c.to_string(), "4*x0 - 2*x1 <= 5");
        assert!(c.is_satisfied(&[true, false, true]));
        assert!(!LinearConstraint::ge([(0, 1)], 1).is_satisfied(&[false]));
    }

    #[test]
    fn test_feasibility_is_lexicographically_smallest() {
        let mut program = BinaryProgram::new(3);
        program.add_constraint(LinearConstraint::ge([(0, 1), (1, 1), (2, 1)], 2));
        let solution = program.solve().unwrap();
        assert_eq!(solution.values, vec![false, true, true]);
        assert_eq!(solution.objective, 0);
    }

    #[test]
    fn test_infeasible() {
        let mut program = BinaryProgram::new(2);
        program.add_constraint(LinearConstraint::equals([(0, 1), (1, 1)], 1));
        program.add_constraint(LinearConstraint::ge([(0, 1), (1, 1)], 2));
        assert_eq!(program.solve(), None);

        let mut program = BinaryProgram::new(1);
        program.add_constraint(LinearConstraint::le([], -1));
        assert_eq!(program.solve(), None);
    }

    #[test]
    fn test_empty_program() {
        let program = BinaryProgram::new(0);
        let solution = program.solve().unwrap();
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_knapsack() {
        // max 5a + 4b + 3c  s.t.  2a + 3b + c <= 4
        let mut program = BinaryProgram::new(3);
        program.add_constraint(LinearConstraint::le([(0, 2), (1, 3), (2, 1)], 4));
        program.set_objective(vec![5, 4, 3]);
        let solution = program.solve().unwrap();
        assert_eq!(solution.values, vec![true, false, true]);
        assert_eq!(solution.objective, 8);
    }

    #[test]
    fn test_optimum_tie_break() {
        // Exactly one of three, all equally good: pick the last-place choice.
        let mut program = BinaryProgram::new(3);
        program.add_constraint(LinearConstraint::equals([(0, 1), (1, 1), (2, 1)], 1));
        program.set_objective(vec![1, 1, 1]);
        let solution = program.solve().unwrap();
        assert_eq!(solution.values, vec![false, false, true]);
    }

    #[test]
    fn test_negative_weights() {
        let mut program = BinaryProgram::new(2);
        program.add_constraint(LinearConstraint::ge([(0, 1), (1, 1)], 1));
        program.set_objective(vec![-3, -1]);
        let solution = program.solve().unwrap();
        assert_eq!(solution.values, vec![false, true]);
        assert_eq!(solution.objective, -1);
    }

    #[test]
    fn test_exclusion_cuts() {
        // Enumerate all 2-of-3 subsets by cutting each one off in turn.
        let mut program = BinaryProgram::new(3);
        program.add_constraint(LinearConstraint::equals([(0, 1), (1, 1), (2, 1)], 2));
        let mut seen = Vec::new();
        while let Some(solution) = program.solve() {
            let ones = solution.values.iter().filter(|&&b| b).count() as i64;
            let terms = solution
                .values
                .iter()
                .enumerate()
                .map(|(i, &b)| (i, if b { 1 } else { -1 }));
            program.add_constraint(LinearConstraint::le(terms, ones - 1));
            seen.push(solution.values);
        }
        assert_eq!(
            seen,
            vec![
                vec![false, true, true],
                vec![true, false, true],
                vec![true, true, false]
            ]
        );
    }

    #[test]
    fn test_add_var() {
        let mut program = BinaryProgram::new(2);
        let z = program.add_var();
        assert_eq!(z, 2);
        program.add_constraint(LinearConstraint::ge([(0, 1), (z, -1)], 0));
        program.add_constraint(LinearConstraint::ge([(z, 1)], 1));
        let solution = program.solve().unwrap();
        assert_eq!(solution.values, vec![true, false, true]);
    }

    #[test]
    fn test_integer_var() {
        let mut program = BinaryProgram::new(0);
        let y = program.add_integer(5);
        assert_eq!(y.bits(), &[2, 1, 0]);
        assert_eq!(program.num_constraints(), 1);
        program.set_objective(vec![4, 2, 1]);
        let solution = program.solve().unwrap();
        assert_eq!(y.value(&solution.values), 5);
        assert_eq!(solution.objective, 5);

        // Powers of two minus one need no bound; zero needs no bits.
        assert_eq!(program.add_integer(7).bits().len(), 3);
        assert!(program.add_integer(0).bits().is_empty());
        assert_eq!(program.num_constraints(), 1);
        assert_eq!(program.num_vars(), 6);
    }

    fn exclude(values: &[bool], prefix: usize) -> LinearConstraint {
        let ones = values[..prefix].iter().filter(|&&b| b).count() as i64;
        let terms = (0..prefix).map(|i| (i, if values[i] { 1 } else { -1 }));
        LinearConstraint::le(terms, ones - 1)
    }

    #[test]
    fn test_lazy_rejection_resumes() {
        let mut program = BinaryProgram::new(3);
        program.add_constraint(LinearConstraint::equals([(0, 1), (1, 1), (2, 1)], 2));
        let mut seen = Vec::new();
        let result = program.solve_lazy(3, |values| {
            seen.push(values.to_vec());
            if seen.len() < 3 {
                Candidate::Reject(exclude(values, 3))
            } else {
                Candidate::Accept
            }
        });

        assert_eq!(
            seen,
            vec![
                vec![false, true, true],
                vec![true, false, true],
                vec![true, true, false]
            ]
        );
        let LazySolve::Finished(Some(solution)) = result else {
            panic!("expected a solution, got {:?}", result);
        };
        assert_eq!(solution.values, vec![true, true, false]);
        // Both cuts stay in the program.
        assert_eq!(program.num_constraints(), 3);
        assert_eq!(program.solve().unwrap().values, vec![true, true, false]);
    }

    #[test]
    fn test_lazy_stop() {
        let mut program = BinaryProgram::new(2);
        let mut calls = 0;
        let result = program.solve_lazy(2, |values| {
            calls += 1;
            if calls == 1 {
                Candidate::Reject(exclude(values, 2))
            } else {
                Candidate::Stop
            }
        });
        assert_eq!(result, LazySolve::Stopped(None));
        assert_eq!(calls, 2);
        assert_eq!(program.num_constraints(), 1);
    }

    #[test]
    fn test_lazy_optimization_skips_rejected_optimum() {
        let mut program = BinaryProgram::new(3);
        program.add_constraint(LinearConstraint::le([(0, 2), (1, 3), (2, 1)], 4));
        program.set_objective(vec![5, 4, 3]);
        let result = program.solve_lazy(3, |values| {
            if values == [true, false, true] {
                Candidate::Reject(exclude(values, 3))
            } else {
                Candidate::Accept
            }
        });
        let expected = Solution {
            values: vec![false, true, true],
            objective: 7,
        };
        assert_eq!(result, LazySolve::Finished(Some(expected)));
    }

    #[test]
    fn test_lazy_completes_non_prefix_variables() {
        // x0 + x1 = y with y in 0..=2; y is never branched on by itself.
        let mut program = BinaryProgram::new(2);
        let y = program.add_integer(2);
        program.add_constraint(LinearConstraint::equals(
            [(0, 1), (1, 1)].into_iter().chain(y.terms(-1)),
            0,
        ));
        let mut counts = Vec::new();
        let result = program.solve_lazy(2, |values| {
            counts.push(y.value(values));
            Candidate::Reject(exclude(values, 2))
        });
        assert_eq!(result, LazySolve::Finished(None));
        assert_eq!(counts, vec![0, 1, 1, 2]);
    }

    #[test]
    #[should_panic(expected = "outside the prefix")]
    fn test_lazy_objective_outside_prefix() {
        let mut program = BinaryProgram::new(2);
        program.set_objective(vec![0, 1]);
        program.solve_lazy(1, |_| Candidate::Accept);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_unknown_variable() {
        let mut program = BinaryProgram::new(1);
        program.add_constraint(LinearConstraint::le([(3, 1)], 0));
    }
}
