//! Structure of a 1-safe Petri net.
//!
//! Places and transitions are addressed by dense typed indices; the place
//! order fixed here is the variable order used by every engine. A net is
//! immutable once built.
//!
//! Firing rule: a transition is enabled iff every input place is marked and
//! every *pure* output place (an output that is not also an input) is empty.
//! Firing clears the consumed inputs and marks the outputs. A place that is
//! both input and output acts as a read arc: it must be marked and stays marked.

use std::fmt;

use crate::error::{Error, Result};
use crate::marking::Marking;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub fn from_index(index: usize) -> Self {
                assert!(index <= u32::MAX as usize, "Index does not fit into u32");
                Self(index as u32)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, stringify!($name))?;
                f.debug_tuple("").field(&self.0).finish()
            }
        }
    };
}

define_id!(PlaceId);
define_id!(TransitionId);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub name: String,
    /// Sorted, without duplicates.
    inputs: Vec<PlaceId>,
    /// Sorted, without duplicates.
    outputs: Vec<PlaceId>,
}

impl Transition {
    pub fn inputs(&self) -> &[PlaceId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PlaceId] {
        &self.outputs
    }

    /// Inputs that lose their token on firing.
    pub fn consumed(&self) -> impl Iterator<Item = PlaceId> + '_ {
        self.inputs.iter().copied().filter(|p| self.outputs.binary_search(p).is_err())
    }

    /// Outputs that must be empty before firing.
    pub fn pure_outputs(&self) -> impl Iterator<Item = PlaceId> + '_ {
        self.outputs.iter().copied().filter(|p| self.inputs.binary_search(p).is_err())
    }

    pub fn is_enabled(&self, marking: &Marking) -> bool {
        self.inputs.iter().all(|&p| marking.is_marked(p)) && self.pure_outputs().all(|p| !marking.is_marked(p))
    }

    /// Successor marking; the caller guarantees the transition is enabled.
    fn fire_unchecked(&self, marking: &Marking) -> Marking {
        let cleared = self.consumed().fold(marking.clone(), |m, p| m.with(p, false));
        self.outputs.iter().fold(cleared, |m, &p| m.with(p, true))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Net {
    places: Vec<Place>,
    transitions: Vec<Transition>,
    initial: Marking,
}

impl Net {
    pub fn num_places(&self) -> usize {
        self.places.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn place_ids(&self) -> impl DoubleEndedIterator<Item = PlaceId> + ExactSizeIterator {
        (0..self.places.len()).map(PlaceId::from_index)
    }

    pub fn transition_ids(&self) -> impl DoubleEndedIterator<Item = TransitionId> + ExactSizeIterator {
        (0..self.transitions.len()).map(TransitionId::from_index)
    }

    pub fn place(&self, id: PlaceId) -> Option<&Place> {
        self.places.get(id.index())
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(id.index())
    }

    pub fn place_by_name(&self, name: &str) -> Option<PlaceId> {
        self.places.iter().position(|p| p.name == name).map(PlaceId::from_index)
    }

    pub fn transition_by_name(&self, name: &str) -> Option<TransitionId> {
        self.transitions
            .iter()
            .position(|t| t.name == name)
            .map(TransitionId::from_index)
    }

    pub fn initial_marking(&self) -> &Marking {
        &self.initial
    }

    /// Incidence matrix `C[p][t] = post(p, t) - pre(p, t)`.
    pub fn incidence(&self) -> Vec<Vec<i64>> {
        let mut matrix = vec![vec![0; self.transitions.len()]; self.places.len()];
        for (t, transition) in self.transitions.iter().enumerate() {
            for p in transition.consumed() {
                matrix[p.index()][t] -= 1;
            }
            for p in transition.pure_outputs() {
                matrix[p.index()][t] += 1;
            }
        }
        matrix
    }

    pub fn is_enabled(&self, transition: TransitionId, marking: &Marking) -> bool {
        self.transition(transition).is_some_and(|t| t.is_enabled(marking))
    }

    pub fn enabled_transitions<'a>(&'a self, marking: &'a Marking) -> impl Iterator<Item = TransitionId> + 'a {
        self.transition_ids().filter(move |&t| self.is_enabled(t, marking))
    }

    pub fn is_deadlock(&self, marking: &Marking) -> bool {
        self.enabled_transitions(marking).next().is_none()
    }

    pub fn fire(&self, transition: TransitionId, marking: &Marking) -> Result<Marking> {
        if marking.len() != self.num_places() {
            return Err(Error::MarkingSize {
                expected: self.num_places(),
                actual: marking.len(),
            });
        }
        let t = self.transition(transition).ok_or(Error::UnknownTransition(transition))?;
        if !t.is_enabled(marking) {
            return Err(Error::NotEnabled(transition));
        }
        Ok(t.fire_unchecked(marking))
    }

    /// Names of the marked places, in place order.
    pub fn marked_names<'a>(&'a self, marking: &'a Marking) -> impl Iterator<Item = &'a str> + 'a {
        marking.marked_places().map(move |p| self.places[p.index()].name.as_str())
    }
}

impl fmt::Display for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "net with {} places, {} transitions", self.num_places(), self.num_transitions())?;
        for t in &self.transitions {
            let names = |ids: &[PlaceId]| {
                ids.iter()
                    .map(|p| self.places[p.index()].name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            writeln!(f, "  {}: [{}] -> [{}]", t.name, names(&t.inputs), names(&t.outputs))?;
        }
        write!(f, "  initial: {{{}}}", self.marked_names(&self.initial).collect::<Vec<_>>().join(", "))
    }
}

/// Incremental construction of a [`Net`].
#[derive(Debug, Default, Clone)]
pub struct NetBuilder {
    places: Vec<Place>,
    initial: Vec<bool>,
    transitions: Vec<Transition>,
}

impl NetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_place(&mut self, name: impl Into<String>, marked: bool) -> PlaceId {
        let id = PlaceId::from_index(self.places.len());
        self.places.push(Place { name: name.into() });
        self.initial.push(marked);
        id
    }

    /// # Panics
    ///
    /// Panics if an arc refers to a place that was not added to this builder.
    pub fn add_transition(
        &mut self,
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = PlaceId>,
        outputs: impl IntoIterator<Item = PlaceId>,
    ) -> TransitionId {
        let id = TransitionId::from_index(self.transitions.len());
        let inputs = self.arc_list(inputs);
        let outputs = self.arc_list(outputs);
        self.transitions.push(Transition {
            name: name.into(),
            inputs,
            outputs,
        });
        id
    }

    fn arc_list(&self, places: impl IntoIterator<Item = PlaceId>) -> Vec<PlaceId> {
        let mut places = places.into_iter().collect::<Vec<_>>();
        for p in &places {
            assert!(p.index() < self.places.len(), "Place {:?} is out of bounds", p);
        }
        places.sort_unstable();
        places.dedup();
        places
    }

    pub fn build(self) -> Net {
        Net {
            places: self.places,
            transitions: self.transitions,
            initial: Marking::from_bits(self.initial),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// p1 -> t -> p2, with an unrelated p3.
    fn three_places() -> (Net, [PlaceId; 3], TransitionId) {
        let mut builder = NetBuilder::new();
        let p1 = builder.add_place("p1", true);
        let p2 = builder.add_place("p2", false);
        let p3 = builder.add_place("p3", false);
        let t = builder.add_transition("t", [p1], [p2]);
        (builder.build(), [p1, p2, p3], t)
    }

    #[test]
    fn test_fire() {
        let (net, [p1, p2, p3], t) = three_places();
        let m0 = net.initial_marking().clone();
        assert!(net.is_enabled(t, &m0));

        let m1 = net.fire(t, &m0).unwrap();
        assert!(!m1.is_marked(p1));
        assert!(m1.is_marked(p2));
        assert!(!m1.is_marked(p3));
        assert_eq!(net.fire(t, &m0).unwrap(), m1);

        assert_eq!(net.fire(t, &m1), Err(Error::NotEnabled(t)));
        assert!(net.is_deadlock(&m1));
        assert_eq!(net.marked_names(&m1).collect::<Vec<_>>(), vec!["p2"]);
    }

    #[test]
    fn test_fire_errors() {
        let (net, _, _) = three_places();
        let m0 = net.initial_marking();
        let bogus = TransitionId::new(7);
        assert_eq!(net.fire(bogus, m0), Err(Error::UnknownTransition(bogus)));
        assert!(!net.is_enabled(bogus, m0));
        assert_eq!(
            net.fire(TransitionId::new(0), &Marking::empty(2)),
            Err(Error::MarkingSize { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn test_marked_output_blocks_firing() {
        let mut builder = NetBuilder::new();
        let a = builder.add_place("a", true);
        let b = builder.add_place("b", true);
        let t = builder.add_transition("t", [a], [b]);
        let net = builder.build();
        assert!(!net.is_enabled(t, net.initial_marking()));
        assert!(net.is_deadlock(net.initial_marking()));
    }

    #[test]
    fn test_read_arc() {
        let mut builder = NetBuilder::new();
        let r = builder.add_place("r", true);
        let a = builder.add_place("a", true);
        let b = builder.add_place("b", false);
        let t = builder.add_transition("t", [r, a, a], [b, r]);
        let net = builder.build();

        let tr = net.transition(t).unwrap();
        assert_eq!(tr.inputs(), &[r, a]);
        assert_eq!(tr.consumed().collect::<Vec<_>>(), vec![a]);
        assert_eq!(tr.pure_outputs().collect::<Vec<_>>(), vec![b]);

        let m1 = net.fire(t, net.initial_marking()).unwrap();
        assert_eq!(m1.marked_places().collect::<Vec<_>>(), vec![r, b]);

        assert_eq!(net.incidence(), vec![vec![0], vec![-1], vec![1]]);
    }

    #[test]
    fn test_lookup_by_name() {
        let (net, [_, p2, _], t) = three_places();
        assert_eq!(net.place_by_name("p2"), Some(p2));
        assert_eq!(net.place_by_name("nope"), None);
        assert_eq!(net.transition_by_name("t"), Some(t));
        assert_eq!(format!("{:?}", p2), "PlaceId(1)");
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_foreign_place_panics() {
        let mut builder = NetBuilder::new();
        builder.add_transition("t", [PlaceId::new(0)], []);
    }
}
