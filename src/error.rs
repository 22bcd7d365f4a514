//! Error types shared across the crate.

use crate::cp::SolverStatus;
use crate::restriction::{Iri, Restriction};
use thiserror::Error;

/// Errors raised by the restriction algebra, bound arithmetic and matching.
///
/// `NoSolutionFound` is an expected outcome when probing whether a pool
/// supports a model; [`ResourceMatcher::is_supporting`] maps it to
/// `Ok(false)`.
///
/// [`ResourceMatcher::is_supporting`]: crate::matching::ResourceMatcher::is_supporting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// Merge or join attempted on restrictions that do not overlap.
    #[error("incompatible restrictions: {left} / {right}")]
    IncompatibleRestrictions {
        left: Box<Restriction>,
        right: Box<Restriction>,
    },

    /// Overlapping restrictions whose bounds cannot hold together.
    #[error("inconsistent cardinality: {left} / {right}")]
    InconsistentCardinality {
        left: Box<Restriction>,
        right: Box<Restriction>,
    },

    /// A cardinality no longer fits in `u32`.
    #[error("cardinality overflow for {restriction}")]
    CardinalityOverflow { restriction: Box<Restriction> },

    /// A bound with `min > max`, or one that went negative.
    #[error("invalid bound for {model}: min {min} > max {max}")]
    InvalidBound { model: Iri, min: i64, max: i64 },

    /// Bound arithmetic on two different models.
    #[error("model mismatch: {left} vs {right}")]
    ModelMismatch { left: Iri, right: Iri },

    /// The assignment problem has no feasible solution.
    #[error("no solution found")]
    NoSolutionFound,

    /// Search stopped before it could prove or refute feasibility.
    #[error("search aborted with status {status:?}")]
    SearchAborted { status: SolverStatus },

    /// The CP model references unknown variables or has malformed domains.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MatchError {
    pub(crate) fn incompatible(left: &Restriction, right: &Restriction) -> Self {
        MatchError::IncompatibleRestrictions {
            left: Box::new(left.clone()),
            right: Box::new(right.clone()),
        }
    }

    pub(crate) fn inconsistent(left: &Restriction, right: &Restriction) -> Self {
        MatchError::InconsistentCardinality {
            left: Box::new(left.clone()),
            right: Box::new(right.clone()),
        }
    }

    /// Whether this error only means "not satisfiable" rather than a
    /// malformed input.
    pub fn is_no_solution(&self) -> bool {
        matches!(self, MatchError::NoSolutionFound)
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
