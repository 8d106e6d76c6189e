use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;
use crate::types::{Lit, Var};

impl Bdd {
    /// Returns one satisfying path of `node`, if any exists.
    ///
    /// Only variables on the path are mentioned; the remaining ones are free.
    /// The high branch is preferred whenever it is satisfiable.
    pub fn one_sat(&self, node: Ref) -> Option<Vec<Lit>> {
        if self.is_zero(node) {
            return None;
        }

        let mut path = Vec::new();
        let mut current = node;

        while !self.is_one(current) {
            let var = Var::new(self.variable(current));
            let high = self.high_node(current);
            if !self.is_zero(high) {
                path.push(var.pos());
                current = high;
            } else {
                path.push(var.neg());
                current = self.low_node(current);
            }
        }

        Some(path)
    }

    /// Number of satisfying assignments of `node` over the variables `1..=num_vars`.
    ///
    /// Every variable in the support of `node` must be among those counted.
    pub fn sat_count(&self, node: Ref, num_vars: usize) -> BigUint {
        let max = BigUint::from(1u8) << num_vars;
        let mut cache = HashMap::new();
        self.sat_count_rec(node, &max, &mut cache)
    }

    /// Number of satisfying assignments of `node` over exactly the variables `vars`.
    ///
    /// `node` must not depend on any variable outside `vars`.
    pub fn sat_count_over(&self, node: Ref, vars: &[Var]) -> BigUint {
        let mut ids = vars.iter().map(|v| v.id()).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        // Counting over the first `n` variables and then dividing out the
        // variables that were not asked for keeps the halving exact.
        let top = ids.last().copied().unwrap_or(0) as usize;
        let total = self.sat_count(node, top);
        total >> (top - ids.len())
    }

    fn sat_count_rec(&self, node: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return max.clone();
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        // Count the regular node, then complement if needed.
        let regular = node.regular();
        let count_low = self.sat_count_rec(self.low_node(regular), max, cache);
        let count_high = self.sat_count_rec(self.high_node(regular), max, cache);
        let count: BigUint = (count_low + count_high) >> 1;
        let count = if node.is_negated() { max - count } else { count };

        cache.insert(node, count.clone());
        count
    }

    /// All satisfying assignments of `node` over `vars`, as value vectors.
    ///
    /// Assignments list values in ascending variable order and are produced in
    /// lexicographic order (`false` before `true`). `node` must only depend on `vars`.
    pub fn models(&self, node: Ref, vars: &[Var]) -> Vec<Vec<bool>> {
        let mut ids = vars.iter().map(|v| v.id()).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();

        let mut models = Vec::new();
        let mut current = Vec::with_capacity(ids.len());
        self.models_rec(node, &ids, &mut current, &mut models);
        models
    }

    fn models_rec(&self, node: Ref, vars: &[u32], current: &mut Vec<bool>, models: &mut Vec<Vec<bool>>) {
        if self.is_zero(node) {
            return;
        }
        let Some((&v, rest)) = vars.split_first() else {
            assert!(self.is_one(node), "Function depends on a variable outside of the enumerated set");
            models.push(current.clone());
            return;
        };

        let (low, high) = self.top_cofactors(node, v);
        current.push(false);
        self.models_rec(low, rest, current, models);
        current.pop();
        current.push(true);
        self.models_rec(high, rest, current, models);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn cube(bdd: &Bdd, values: &[i32]) -> Ref {
        bdd.cube(values.iter().copied().map(Lit::from_dimacs))
    }

    #[test]
    fn test_one_sat() {
        let bdd = Bdd::default();

        let f = cube(&bdd, &[1, -2, -3]);
        let model = bdd.one_sat(f);
        let expected: Vec<Lit> = [1, -2, -3].into_iter().map(Lit::from_dimacs).collect();
        assert_eq!(model, Some(expected.clone()));

        let g = bdd.apply_and(f, -bdd.cube(expected));
        assert_eq!(bdd.one_sat(g), None);
    }

    #[test]
    fn test_one_sat_all_cubes() {
        let bdd = Bdd::default();

        for s1 in [1, -1] {
            for s2 in [1, -1] {
                for s3 in [1, -1] {
                    let values = [s1, 2 * s2, 3 * s3];
                    let f = cube(&bdd, &values);
                    let expected: Vec<Lit> = values.into_iter().map(Lit::from_dimacs).collect();
                    assert_eq!(bdd.one_sat(f), Some(expected));
                }
            }
        }
    }

    #[test]
    fn test_sat_count_terminal() {
        let bdd = Bdd::default();

        assert_eq!(bdd.sat_count(bdd.zero(), 3), BigUint::ZERO);
        assert_eq!(bdd.sat_count(bdd.one(), 0), BigUint::from(1u8));
        assert_eq!(bdd.sat_count(bdd.one(), 3), BigUint::from(8u8));
    }

    #[test]
    fn test_sat_count_formulas() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(Var::new(1));
        let x2 = bdd.mk_var(Var::new(2));
        let x3 = bdd.mk_var(Var::new(3));

        assert_eq!(bdd.sat_count(x1, 3), BigUint::from(4u8));
        assert_eq!(bdd.sat_count(-x1, 3), BigUint::from(4u8));
        assert_eq!(bdd.sat_count(bdd.apply_or(x1, x2), 2), BigUint::from(3u8));
        assert_eq!(bdd.sat_count(bdd.apply_xor(x1, x3), 3), BigUint::from(4u8));
        assert_eq!(bdd.sat_count(-bdd.apply_and_many([x1, x2, x3]), 3), BigUint::from(7u8));
    }

    #[test]
    fn test_sat_count_over_sparse_vars() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(Var::new(1));
        let x3 = bdd.mk_var(Var::new(3));
        let f = bdd.apply_or(x1, x3);
        let vars = [Var::new(1), Var::new(3)];

        assert_eq!(bdd.sat_count_over(f, &vars), BigUint::from(3u8));
        assert_eq!(bdd.sat_count_over(bdd.one(), &vars), BigUint::from(4u8));
        assert_eq!(bdd.sat_count_over(bdd.one(), &[]), BigUint::from(1u8));
    }

    #[test]
    fn test_models() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(Var::new(1));
        let x3 = bdd.mk_var(Var::new(3));
        let f = bdd.apply_xor(x1, x3);

        let models = bdd.models(f, &[Var::new(3), Var::new(1)]);
        assert_eq!(models, vec![vec![false, true], vec![true, false]]);
        assert!(bdd.models(bdd.zero(), &[Var::new(1)]).is_empty());
        assert_eq!(bdd.models(bdd.one(), &[Var::new(1)]).len(), 2);
    }
}
