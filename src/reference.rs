//! Handles to BDD nodes.
//!
//! A [`Ref`] is a signed index into the node arena of a [`Bdd`][crate::bdd::Bdd] manager.
//! The sign encodes a complement edge: `-f` denotes the negation of `f` without
//! allocating a new node. Index `0` is never a valid node; index `1` is the terminal.

use std::fmt::{Display, Formatter};
use std::ops::Neg;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(i32);

impl Ref {
    /// The `1` terminal.
    pub const ONE: Ref = Ref(1);
    /// The `0` terminal, i.e. the complemented `1`.
    pub const ZERO: Ref = Ref(-1);

    pub const fn positive(index: u32) -> Self {
        Self(index as i32)
    }

    pub const fn is_negated(self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// Drop the complement bit.
    pub const fn regular(self) -> Self {
        Self(self.0.abs())
    }

    /// Index of the node in the arena.
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Raw signed representation.
    pub const fn get(self) -> i32 {
        self.0
    }

    pub const fn is_terminal(self) -> bool {
        self.0 == 1 || self.0 == -1
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}
