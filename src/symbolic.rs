//! Symbolic reachability over BDDs.
//!
//! Every place `p` gets two interleaved BDD variables: the present-state
//! variable `2p + 1` and the next-state variable `2p + 2`. A set of markings is
//! a function over present-state variables; the transition relation relates
//! present and next state.
//!
//! The reachable set is the least fixpoint of `R = init ∨ image(R)`, where
//! `image(S) = (∃x. S(x) ∧ T(x, y))[y := x]`. Canonicity of the manager makes
//! the convergence test a handle comparison.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, info};
use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::bdd::{Bdd, BddConfig};
use crate::marking::Marking;
use crate::net::{Net, PlaceId, Transition};
use crate::reference::Ref;
use crate::types::{Lit, Var};

/// Present-state variable of `place`.
pub fn present_var(place: PlaceId) -> Var {
    Var::new(2 * place.raw() + 1)
}

/// Next-state variable of `place`.
pub fn next_var(place: PlaceId) -> Var {
    Var::new(2 * place.raw() + 2)
}

/// Place whose present- or next-state variable is `var`.
pub fn place_of(var: Var) -> PlaceId {
    PlaceId::new((var.id() - 1) / 2)
}

/// A net encoded into a BDD manager.
pub struct SymbolicNet {
    bdd: Rc<Bdd>,
    num_places: usize,
    present: Vec<Var>,
    next_to_present: HashMap<Var, Var>,
    relations: Vec<Ref>,
    relation: Ref,
    enabled: Ref,
    initial: Ref,
}

impl SymbolicNet {
    pub fn new(net: &Net, bdd: Rc<Bdd>) -> Self {
        let present = net.place_ids().map(present_var).collect::<Vec<_>>();
        let next_to_present = net.place_ids().map(|p| (next_var(p), present_var(p))).collect();

        let relations = net
            .transitions()
            .iter()
            .map(|t| transition_relation(&bdd, net, t))
            .collect::<Vec<_>>();
        let relation = bdd.apply_or_many(relations.iter().copied());
        let enabled = bdd.apply_or_many(net.transitions().iter().map(|t| guard(&bdd, t)));

        let mut this = Self {
            bdd,
            num_places: net.num_places(),
            present,
            next_to_present,
            relations,
            relation,
            enabled,
            initial: Ref::ZERO,
        };
        this.initial = this.encode_marking(net.initial_marking());

        debug!(
            "encoded {} transitions, relation has {} nodes",
            this.relations.len(),
            this.bdd.size(this.relation)
        );
        this
    }

    pub fn bdd(&self) -> &Rc<Bdd> {
        &self.bdd
    }

    pub fn num_places(&self) -> usize {
        self.num_places
    }

    pub fn present_vars(&self) -> &[Var] {
        &self.present
    }

    /// Disjunction of all per-transition relations.
    pub fn relation(&self) -> Ref {
        self.relation
    }

    pub fn transition_relation(&self, index: usize) -> Option<Ref> {
        self.relations.get(index).copied()
    }

    /// Markings in which at least one transition is enabled.
    pub fn enabled_any(&self) -> Ref {
        self.enabled
    }

    pub fn initial(&self) -> Ref {
        self.initial
    }

    /// Handles owned by the encoding, which garbage collection must keep.
    pub fn roots(&self) -> Vec<Ref> {
        let mut roots = self.relations.clone();
        roots.extend([self.relation, self.enabled, self.initial]);
        roots
    }

    /// Characteristic function of a single marking.
    ///
    /// # Panics
    ///
    /// Panics if the marking does not have one bit per place.
    pub fn encode_marking(&self, marking: &Marking) -> Ref {
        assert_eq!(marking.len(), self.num_places, "Marking size does not match the net");
        self.bdd.cube(
            marking
                .bits()
                .enumerate()
                .map(|(i, bit)| Lit::new(present_var(PlaceId::from_index(i)), bit)),
        )
    }

    /// Characteristic function of a set of markings.
    pub fn encode_markings(&self, markings: impl IntoIterator<Item = Marking>) -> Ref {
        self.bdd
            .apply_or_many(markings.into_iter().map(|m| self.encode_marking(&m)))
    }

    /// Markings reachable in exactly one step from `states`.
    pub fn image(&self, states: Ref) -> Ref {
        let next = self.bdd.rel_product(states, self.relation, &self.present);
        self.bdd.rename_vars(next, &self.next_to_present)
    }

    /// Markings of `states` in which no transition is enabled.
    pub fn dead_states(&self, states: Ref) -> Ref {
        self.bdd.apply_diff(states, self.enabled)
    }

    /// Number of markings in `states`.
    pub fn count(&self, states: Ref) -> BigUint {
        self.bdd.sat_count_over(states, &self.present)
    }

    pub fn contains(&self, states: Ref, marking: &Marking) -> bool {
        marking.len() == self.num_places && self.bdd.eval(states, |v| marking.is_marked(place_of(v)))
    }

    /// All markings in `states`, in lexicographic order with place 0 first.
    pub fn markings(&self, states: Ref) -> Vec<Marking> {
        self.bdd
            .models(states, &self.present)
            .into_iter()
            .map(Marking::from_bits)
            .collect()
    }
}

impl fmt::Debug for SymbolicNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolicNet")
            .field("num_places", &self.num_places)
            .field("num_transitions", &self.relations.len())
            .field("relation", &self.relation)
            .finish()
    }
}

/// Enabling condition over present-state variables.
fn guard(bdd: &Bdd, t: &Transition) -> Ref {
    let marked = t.inputs().iter().map(|&p| present_var(p).pos());
    let empty = t.pure_outputs().map(|p| present_var(p).neg());
    bdd.cube(marked.chain(empty))
}

fn transition_relation(bdd: &Bdd, net: &Net, t: &Transition) -> Ref {
    let mut effect = Ref::ONE;
    // Bottom-up, so every conjunction only adds nodes on top.
    for p in net.place_ids().rev() {
        let y = bdd.mk_var(next_var(p));
        let step = if t.outputs().binary_search(&p).is_ok() {
            y
        } else if t.inputs().binary_search(&p).is_ok() {
            -y
        } else {
            bdd.apply_eq(bdd.mk_var(present_var(p)), y)
        };
        effect = bdd.apply_and(step, effect);
    }
    bdd.apply_and(guard(bdd, t), effect)
}

/// Progress of one fixpoint iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationStats {
    pub iteration: usize,
    /// Nodes in the accumulated reachable set.
    pub nodes: usize,
    /// Nodes in the frontier that was expanded.
    pub frontier_nodes: usize,
    pub states: BigUint,
}

/// Result of the symbolic fixpoint.
#[derive(Debug)]
pub struct ReachableFunction {
    net: SymbolicNet,
    root: Ref,
    count: BigUint,
    iterations: Vec<IterationStats>,
}

impl ReachableFunction {
    pub fn root(&self) -> Ref {
        self.root
    }

    pub fn bdd(&self) -> &Rc<Bdd> {
        self.net.bdd()
    }

    pub fn symbolic(&self) -> &SymbolicNet {
        &self.net
    }

    pub fn num_places(&self) -> usize {
        self.net.num_places()
    }

    /// Number of reachable markings.
    pub fn count(&self) -> &BigUint {
        &self.count
    }

    pub fn count_u64(&self) -> Option<u64> {
        self.count.to_u64()
    }

    pub fn iterations(&self) -> &[IterationStats] {
        &self.iterations
    }

    /// Breadth-first depth of the reachable set: every reachable marking is
    /// reached by a firing sequence of at most this many steps.
    pub fn depth(&self) -> usize {
        self.iterations.len().saturating_sub(1)
    }

    /// Nodes in the reachable-set BDD.
    pub fn size(&self) -> usize {
        self.bdd().size(self.root)
    }

    pub fn contains(&self, marking: &Marking) -> bool {
        self.net.contains(self.root, marking)
    }

    pub fn markings(&self) -> Vec<Marking> {
        self.net.markings(self.root)
    }

    /// Reachable markings without an enabled transition.
    pub fn dead_states(&self) -> Ref {
        self.net.dead_states(self.root)
    }
}

/// Reachable set of `net` in a fresh manager with default sizing.
pub fn build(net: &Net) -> ReachableFunction {
    build_with(net, BddConfig::default())
}

pub fn build_with(net: &Net, config: BddConfig) -> ReachableFunction {
    let bdd = Rc::new(Bdd::new(config));
    reachable(SymbolicNet::new(net, bdd))
}

/// Run the fixpoint on an already encoded net.
///
/// When the manager's GC threshold is exceeded between iterations, every node
/// outside [`SymbolicNet::roots`] and the current sets is freed, so handles the
/// caller built in the same manager beforehand do not survive.
pub fn reachable(net: SymbolicNet) -> ReachableFunction {
    let start = Instant::now();
    let bdd = Rc::clone(net.bdd());

    let mut reached = net.initial();
    let mut frontier = reached;
    let mut iterations = Vec::new();

    loop {
        let image = net.image(frontier);
        let next = bdd.apply_or(reached, image);

        let stats = IterationStats {
            iteration: iterations.len() + 1,
            nodes: bdd.size(next),
            frontier_nodes: bdd.size(frontier),
            states: net.count(next),
        };
        info!(
            "Iteration {}: {} reachable markings, {} nodes (frontier {} nodes)",
            stats.iteration, stats.states, stats.nodes, stats.frontier_nodes
        );
        iterations.push(stats);

        if next == reached {
            break;
        }
        frontier = bdd.apply_diff(image, reached);
        reached = next;

        if bdd.needs_gc() {
            let mut roots = net.roots();
            roots.extend([reached, frontier]);
            bdd.collect_garbage(&roots);
        }
    }

    let count = net.count(reached);
    info!(
        "Symbolic fixpoint reached after {} iterations in {:.3} s: {} markings, {} nodes",
        iterations.len(),
        start.elapsed().as_secs_f64(),
        count,
        bdd.size(reached)
    );
    debug!("{:?}", bdd);

    ReachableFunction {
        net,
        root: reached,
        count,
        iterations,
    }
}
