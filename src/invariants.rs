//! Place invariants.
//!
//! A place invariant is an integer vector `y` with `y · C = 0`, where `C` is
//! the incidence matrix. Firing never changes `y · M`, so every reachable
//! marking satisfies `y · M = y · M0`. The basis is computed exactly over the
//! rationals and scaled back to coprime integers.

use log::{debug, warn};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::marking::Marking;
use crate::net::{Net, PlaceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invariant {
    /// One coefficient per place.
    pub coefficients: Vec<i64>,
    /// Weighted token sum `y · M0` preserved by every firing.
    pub token_sum: i64,
}

impl Invariant {
    /// Weighted token sum of `marking`, or `None` if it leaves the `i64` range.
    pub fn weigh(&self, marking: &Marking) -> Option<i64> {
        weighted_sum(&self.coefficients, marking)
    }

    pub fn holds(&self, marking: &Marking) -> bool {
        self.weigh(marking) == Some(self.token_sum)
    }

    /// Places with a non-zero coefficient.
    pub fn support(&self) -> impl Iterator<Item = PlaceId> + '_ {
        self.coefficients
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(|(i, _)| PlaceId::from_index(i))
    }
}

/// A basis of the place invariants of `net`.
///
/// Basis vectors whose coefficients or initial token sum do not fit into `i64` are dropped.
pub fn place_invariants(net: &Net) -> Vec<Invariant> {
    let incidence = net.incidence();
    // Rows of C^T: one equation per transition, one unknown per place.
    let equations = (0..net.num_transitions())
        .map(|t| incidence.iter().map(|row| BigInt::from(row[t])).collect())
        .collect::<Vec<Vec<BigInt>>>();

    let mut invariants = Vec::new();
    for vector in nullspace(&equations, net.num_places()) {
        let coefficients = vector.iter().map(|c| c.to_i64()).collect::<Option<Vec<_>>>();
        let Some(coefficients) = coefficients else {
            warn!("Dropping a place invariant with coefficients outside of the i64 range");
            continue;
        };
        let Some(token_sum) = weighted_sum(&coefficients, net.initial_marking()) else {
            warn!("Dropping a place invariant whose token sum is outside of the i64 range");
            continue;
        };
        invariants.push(Invariant {
            coefficients,
            token_sum,
        });
    }

    debug!("found {} place invariants", invariants.len());
    invariants
}

fn weighted_sum(coefficients: &[i64], marking: &Marking) -> Option<i64> {
    let total: i128 = marking.marked_places().map(|p| coefficients[p.index()] as i128).sum();
    i64::try_from(total).ok()
}

/// Integer basis of `{ y | A y = 0 }` for `A` with `cols` columns.
fn nullspace(matrix: &[Vec<BigInt>], cols: usize) -> Vec<Vec<BigInt>> {
    let mut rows = matrix
        .iter()
        .map(|row| row.iter().cloned().map(BigRational::from_integer).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    // Reduced row echelon form.
    let mut pivots = Vec::new();
    for col in 0..cols {
        let rank = pivots.len();
        let Some(found) = (rank..rows.len()).find(|&r| !rows[r][col].is_zero()) else {
            continue;
        };
        rows.swap(rank, found);

        let pivot = rows[rank][col].clone();
        for value in rows[rank].iter_mut() {
            *value /= pivot.clone();
        }
        for r in 0..rows.len() {
            if r == rank || rows[r][col].is_zero() {
                continue;
            }
            let factor = rows[r][col].clone();
            for c in col..cols {
                let delta = rows[rank][c].clone() * factor.clone();
                rows[r][c] -= delta;
            }
        }
        pivots.push(col);
    }

    let mut is_pivot = vec![false; cols];
    for &col in &pivots {
        is_pivot[col] = true;
    }

    (0..cols)
        .filter(|&free| !is_pivot[free])
        .map(|free| {
            let mut vector = vec![BigRational::zero(); cols];
            vector[free] = BigRational::one();
            for (row, &col) in pivots.iter().enumerate() {
                vector[col] = -rows[row][free].clone();
            }
            to_primitive_integers(&vector)
        })
        .collect()
}

/// Scale a rational vector to coprime integers whose first non-zero entry is positive.
fn to_primitive_integers(vector: &[BigRational]) -> Vec<BigInt> {
    let lcm = vector.iter().fold(BigInt::one(), |acc, v| acc.lcm(v.denom()));
    let mut ints = vector
        .iter()
        .map(|v| v.numer() * (&lcm / v.denom()))
        .collect::<Vec<_>>();

    let gcd = ints
        .iter()
        .filter(|v| !v.is_zero())
        .fold(BigInt::zero(), |acc, v| acc.gcd(v));
    let leading_negative = ints.iter().find(|v| !v.is_zero()).is_some_and(|v| v.is_negative());
    if !gcd.is_zero() {
        for v in &mut ints {
            *v /= &gcd;
            if leading_negative {
                *v = -std::mem::take(v);
            }
        }
    }
    ints
}
