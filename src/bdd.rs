//! The BDD manager.
//!
//! All boolean functions live inside a single [`Bdd`] manager and are referred to
//! by lightweight [`Ref`] handles. Nodes are hash-consed through the unique table,
//! so two handles are equal iff they denote the same boolean function. The
//! symbolic fixpoint relies on this: convergence is detected by comparing handles.
//!
//! Complement edges are used throughout: negation is free (`-f`), and the high
//! child of a stored node is never complemented, which keeps the form canonical.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::debug;

use crate::cache::{Cache, OpKey};
use crate::reference::Ref;
use crate::table::NodeTable;
use crate::types::{Lit, Var};

/// Sizing knobs of a [`Bdd`] manager.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BddConfig {
    /// Number of node slots reserved up front.
    pub initial_capacity: usize,
    /// The computed table holds `2^cache_bits` entries.
    pub cache_bits: usize,
    /// Collect unreachable nodes once this many are live. `None` never collects.
    pub gc_threshold: Option<usize>,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1 << 16,
            cache_bits: 16,
            gc_threshold: Some(1 << 20),
        }
    }
}

impl BddConfig {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_cache_bits(mut self, cache_bits: usize) -> Self {
        self.cache_bits = cache_bits;
        self
    }

    pub fn with_gc_threshold(mut self, gc_threshold: Option<usize>) -> Self {
        self.gc_threshold = gc_threshold;
        self
    }
}

pub struct Bdd {
    table: RefCell<NodeTable>,
    cache: RefCell<Cache<OpKey, Ref>>,
    gc_threshold: Option<usize>,
}

impl Bdd {
    pub fn new(config: BddConfig) -> Self {
        assert!(config.cache_bits <= 31, "Cache bits should be in the range 0..=31");
        Self {
            table: RefCell::new(NodeTable::with_capacity(config.initial_capacity)),
            cache: RefCell::new(Cache::new(config.cache_bits)),
            gc_threshold: config.gc_threshold,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(BddConfig::default())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.borrow();
        f.debug_struct("Bdd")
            .field("nodes", &self.num_nodes())
            .field("cache_size", &cache.len())
            .field("cache_hits", &cache.hits())
            .field("cache_misses", &cache.misses())
            .finish()
    }
}

impl Bdd {
    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }
    pub fn one(&self) -> Ref {
        Ref::ONE
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.is_terminal()
    }

    /// Number of live nodes, including the terminal.
    pub fn num_nodes(&self) -> usize {
        self.table.borrow().len()
    }

    /// Whether enough nodes are live that [`Bdd::collect_garbage`] is due.
    pub fn needs_gc(&self) -> bool {
        self.gc_threshold.is_some_and(|threshold| self.num_nodes() > threshold)
    }

    pub fn cache_hits(&self) -> usize {
        self.cache.borrow().hits()
    }

    pub fn cache_misses(&self) -> usize {
        self.cache.borrow().misses()
    }

    /// Variable labelling the root of `node`, or `0` for terminals.
    pub fn variable(&self, node: Ref) -> u32 {
        self.table.borrow().node(node.index()).variable
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.table.borrow().node(node.index()).low;
        if node.is_negated() {
            -low
        } else {
            low
        }
    }

    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.table.borrow().node(node.index()).high;
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        // The high edge of a stored node is always regular.
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        if low == high {
            return low;
        }

        let index = self.table.borrow_mut().find_or_insert(v, low, high);
        debug!("mk(v = {}, low = {}, high = {}) -> @{}", v, low, high, index);
        Ref::positive(index)
    }

    pub fn mk_var(&self, var: Var) -> Ref {
        self.mk_node(var.id(), Ref::ZERO, Ref::ONE)
    }

    pub fn mk_lit(&self, lit: Lit) -> Ref {
        let x = self.mk_var(lit.var());
        if lit.is_positive() {
            x
        } else {
            -x
        }
    }

    /// Conjunction of the given literals.
    ///
    /// Contradictory literals yield `0`; repeated literals are merged.
    pub fn cube(&self, literals: impl IntoIterator<Item = Lit>) -> Ref {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|lit| std::cmp::Reverse(lit.var()));

        let mut current = Ref::ONE;
        let mut last: Option<Lit> = None;
        for lit in literals {
            if let Some(prev) = last {
                if prev.var() == lit.var() {
                    if prev.is_positive() != lit.is_positive() {
                        return Ref::ZERO;
                    }
                    continue;
                }
            }
            let v = lit.var().id();
            current = if lit.is_positive() {
                self.mk_node(v, Ref::ZERO, current)
            } else {
                self.mk_node(v, current, Ref::ZERO)
            };
            last = Some(lit);
        }
        current
    }

    /// Cofactors of `node` with respect to variable `v`, which must not lie below the root.
    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        if self.is_terminal(node) || v < self.variable(node) {
            return (node, node);
        }
        assert_eq!(v, self.variable(node));
        (self.low_node(node), self.high_node(node))
    }

    /// If-then-else: `(f ∧ g) ∨ (¬f ∧ h)`.
    ///
    /// ```
    /// use petri_reach::bdd::Bdd;
    /// use petri_reach::types::Var;
    ///
    /// let bdd = Bdd::default();
    /// let x = bdd.mk_var(Var::new(1));
    /// let y = bdd.mk_var(Var::new(2));
    /// let z = bdd.mk_var(Var::new(3));
    /// let f = bdd.apply_ite(x, y, z);
    /// assert_eq!(f, bdd.apply_or(bdd.apply_and(x, y), bdd.apply_and(-x, z)));
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        debug!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // Simplify the branches with respect to the condition:
        //   ite(F,F,H) => ite(F,1,H)    ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,F) => ite(F,G,0)    ite(F,G,~F) => ite(F,G,1)
        let g = if g == f {
            Ref::ONE
        } else if g == -f {
            Ref::ZERO
        } else {
            g
        };
        let h = if h == f {
            Ref::ZERO
        } else if h == -f {
            Ref::ONE
        } else {
            h
        };

        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // ite(~F,G,H) => ite(F,H,G)
        let (f, g, h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };
        // ite(F,~G,H) => ~ite(F,G,~H)
        let (g, h, negate) = if g.is_negated() {
            (-g, -h, true)
        } else {
            (g, h, false)
        };

        let key = OpKey::Ite(f, g, h);
        let cached = self.cache.borrow_mut().get(&key);
        if let Some(res) = cached {
            debug!("cache: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
            return if negate { -res } else { res };
        }

        let m = [f, g, h]
            .into_iter()
            .filter(|node| !node.is_terminal())
            .map(|node| self.variable(node))
            .min()
            .unwrap_or(0);
        assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);
        let res = self.mk_node(m, e, t);
        self.cache.borrow_mut().insert(key, res);

        if negate {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ZERO)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, Ref::ONE, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ONE)
    }

    /// Set difference: `u ∧ ¬v`.
    pub fn apply_diff(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(v, Ref::ZERO, u)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ONE;
        for node in nodes {
            res = self.apply_and(res, node);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ZERO;
        for node in nodes {
            res = self.apply_or(res, node);
            if self.is_one(res) {
                break;
            }
        }
        res
    }

    /// `f|var<-value`
    pub fn restrict(&self, f: Ref, var: Var, value: bool) -> Ref {
        let mut cache = HashMap::new();
        self.restrict_rec(f, var.id(), value, &mut cache)
    }

    fn restrict_rec(&self, f: Ref, v: u32, value: bool, cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }

        let i = self.variable(f);
        if v < i {
            // `f` does not depend on `v`
            return f;
        }
        if v == i {
            return if value {
                self.high_node(f)
            } else {
                self.low_node(f)
            };
        }

        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let low = self.restrict_rec(self.low_node(f), v, value, cache);
        let high = self.restrict_rec(self.high_node(f), v, value, cache);
        let res = self.mk_node(i, low, high);
        cache.insert(f, res);
        res
    }

    /// Existential quantification `∃vars. f`.
    pub fn exists(&self, f: Ref, vars: &[Var]) -> Ref {
        let vars = sorted_ids(vars);
        let mut cache = HashMap::new();
        self.exists_rec(f, &vars, &mut cache)
    }

    fn exists_rec(&self, f: Ref, vars: &[u32], cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }

        let v = self.variable(f);
        match vars.last() {
            Some(&last) if last >= v => {}
            _ => return f,
        }

        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let low = self.exists_rec(self.low_node(f), vars, cache);
        let res = if vars.binary_search(&v).is_ok() {
            if self.is_one(low) {
                Ref::ONE
            } else {
                let high = self.exists_rec(self.high_node(f), vars, cache);
                self.apply_or(low, high)
            }
        } else {
            let high = self.exists_rec(self.high_node(f), vars, cache);
            self.mk_node(v, low, high)
        };
        cache.insert(f, res);
        res
    }

    /// Relational product `∃vars. f ∧ g`, computed without building `f ∧ g` first.
    pub fn rel_product(&self, f: Ref, g: Ref, vars: &[Var]) -> Ref {
        debug!("rel_product(f = {}, g = {}, |vars| = {})", f, g, vars.len());
        let vars = sorted_ids(vars);
        let mut cache = HashMap::new();
        let mut exists_cache = HashMap::new();
        self.rel_product_rec(f, g, &vars, &mut cache, &mut exists_cache)
    }

    fn rel_product_rec(
        &self,
        f: Ref,
        g: Ref,
        vars: &[u32],
        cache: &mut HashMap<(Ref, Ref), Ref>,
        exists_cache: &mut HashMap<Ref, Ref>,
    ) -> Ref {
        if self.is_zero(f) || self.is_zero(g) || f == -g {
            return Ref::ZERO;
        }
        if self.is_one(f) || f == g {
            return self.exists_rec(g, vars, exists_cache);
        }
        if self.is_one(g) {
            return self.exists_rec(f, vars, exists_cache);
        }

        let (f, g) = if f <= g { (f, g) } else { (g, f) };
        if let Some(&res) = cache.get(&(f, g)) {
            return res;
        }

        let m = self.variable(f).min(self.variable(g));
        let res = match vars.last() {
            Some(&last) if last >= m => {
                let (f0, f1) = self.top_cofactors(f, m);
                let (g0, g1) = self.top_cofactors(g, m);
                let r0 = self.rel_product_rec(f0, g0, vars, cache, exists_cache);
                if vars.binary_search(&m).is_ok() {
                    if self.is_one(r0) {
                        Ref::ONE
                    } else {
                        let r1 = self.rel_product_rec(f1, g1, vars, cache, exists_cache);
                        self.apply_or(r0, r1)
                    }
                } else {
                    let r1 = self.rel_product_rec(f1, g1, vars, cache, exists_cache);
                    self.mk_node(m, r0, r1)
                }
            }
            // Nothing left to quantify below this point.
            _ => self.apply_and(f, g),
        };
        cache.insert((f, g), res);
        res
    }

    /// Simultaneous variable substitution `f[v := map(v)]`.
    ///
    /// Variables absent from `map` are kept. The map does not need to preserve
    /// the variable order; order-preserving maps cost one node per node.
    pub fn rename_vars(&self, f: Ref, map: &HashMap<Var, Var>) -> Ref {
        let map = map
            .iter()
            .map(|(from, to)| (from.id(), to.id()))
            .collect::<HashMap<_, _>>();
        let mut cache = HashMap::new();
        self.rename_rec(f, &map, &mut cache)
    }

    fn rename_rec(&self, f: Ref, map: &HashMap<u32, u32>, cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }
        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let v = self.variable(f);
        let low = self.rename_rec(self.low_node(f), map, cache);
        let high = self.rename_rec(self.high_node(f), map, cache);
        let target = map.get(&v).copied().unwrap_or(v);
        let res = self.apply_ite(self.mk_var(Var::new(target)), high, low);
        cache.insert(f, res);
        res
    }

    /// Evaluate `f` under a total assignment.
    pub fn eval(&self, f: Ref, assignment: impl Fn(Var) -> bool) -> bool {
        let mut node = f;
        while !self.is_terminal(node) {
            let v = Var::new(self.variable(node));
            node = if assignment(v) {
                self.high_node(node)
            } else {
                self.low_node(node)
            };
        }
        self.is_one(node)
    }

    /// Indices of all nodes reachable from `nodes`, terminal included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        visited.insert(Ref::ONE.index());
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            let i = node.index();
            if visited.insert(i) {
                let regular = node.regular();
                queue.push_back(self.low_node(regular));
                queue.push_back(self.high_node(regular));
            }
        }

        visited
    }

    /// Free every node not reachable from `roots` and flush the computed table.
    ///
    /// Any handle outside the graphs of `roots` is invalidated. Returns the number of freed nodes.
    pub fn collect_garbage(&self, roots: &[Ref]) -> usize {
        self.cache.borrow_mut().clear();

        let alive = self.descendants(roots.iter().copied());
        let freed = self.table.borrow_mut().collect_garbage(&alive);
        debug!("gc: kept {} nodes, freed {}", alive.len(), freed);
        freed
    }

    /// Number of nodes in the graph rooted at `f`, terminal included.
    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        } else if self.is_one(node) {
            return "(1)".to_string();
        }

        let v = self.variable(node);
        let low = self.low_node(node);
        let high = self.high_node(node);

        format!(
            "{}:(x{}, {}, {})",
            node,
            v,
            self.to_bracket_string(high),
            self.to_bracket_string(low)
        )
    }
}

fn sorted_ids(vars: &[Var]) -> Vec<u32> {
    let mut ids = vars.iter().map(|v| v.id()).collect::<Vec<_>>();
    ids.sort_unstable();
    ids.dedup();
    ids
}
