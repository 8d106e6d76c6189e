use thiserror::Error;

use crate::net::TransitionId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The explicit engine packs a marking into one machine word.
    #[error("net has {places} places, explicit search supports at most {max}")]
    TooManyPlaces { places: usize, max: usize },

    #[error("explicit search exceeded the bound of {limit} markings")]
    StateSpaceTooLarge { limit: usize },

    #[error("integer relaxation is infeasible after {attempts} candidate(s)")]
    RelaxationInfeasible { attempts: usize },

    #[error("symbolic and explicit engines disagree: {details}")]
    OracleMismatch { details: String },

    #[error("cutting-plane search gave up after {attempts} candidate(s)")]
    SearchBudgetExhausted { attempts: usize },

    #[error("transition {0:?} is out of bounds")]
    UnknownTransition(TransitionId),

    #[error("transition {0:?} is not enabled under the supplied marking")]
    NotEnabled(TransitionId),

    #[error("marking has {actual} places, net has {expected}")]
    MarkingSize { expected: usize, actual: usize },
}

impl Error {
    /// Whether the analysis may continue with the symbolic engine alone.
    pub fn is_explicit_limit(&self) -> bool {
        matches!(self, Error::TooManyPlaces { .. } | Error::StateSpaceTooLarge { .. })
    }
}
