//! Variable and literal newtypes used by the BDD manager.
//!
//! Variables are 1-indexed (0 is reserved for terminals) and the variable
//! ordering of the manager is the numeric order of the ids.

use std::fmt;
use std::ops::Neg;

/// A BDD variable identifier (1-indexed).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// # Panics
    ///
    /// Panics if `id == 0`.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Variable IDs must be >= 1");
        Var(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }

    pub fn pos(self) -> Lit {
        Lit::new(self, true)
    }

    pub fn neg(self) -> Lit {
        Lit::new(self, false)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

/// A variable together with a polarity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit {
    var: Var,
    positive: bool,
}

impl Lit {
    pub fn new(var: Var, positive: bool) -> Self {
        Self { var, positive }
    }

    /// Build a literal from a signed DIMACS-style integer.
    pub fn from_dimacs(value: i32) -> Self {
        Self::new(Var::new(value.unsigned_abs()), value > 0)
    }

    pub fn var(self) -> Var {
        self.var
    }

    pub fn is_positive(self) -> bool {
        self.positive
    }

    pub fn to_dimacs(self) -> i32 {
        let id = self.var.id() as i32;
        if self.positive {
            id
        } else {
            -id
        }
    }
}

impl Neg for Lit {
    type Output = Lit;

    fn neg(self) -> Self::Output {
        Lit::new(self.var, !self.positive)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.positive {
            write!(f, "{}", self.var)
        } else {
            write!(f, "~{}", self.var)
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var_creation() {
        let v1 = Var::new(1);
        let v2 = Var::new(2);
        assert_eq!(v1.id(), 1);
        assert!(v1 < v2);
    }

    #[test]
    #[should_panic(expected = "Variable IDs must be >= 1")]
    fn test_var_zero_panics() {
        Var::new(0);
    }

    #[test]
    fn test_lit_dimacs() {
        let lit = Lit::from_dimacs(-3);
        assert_eq!(lit.var(), Var::new(3));
        assert!(!lit.is_positive());
        assert_eq!(lit.to_dimacs(), -3);
        assert_eq!((-lit).to_dimacs(), 3);
    }
}
