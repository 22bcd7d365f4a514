//! Matcher configuration.

use crate::cp::SolverConfig;
use crate::error::Result;
use crate::restriction::{Iri, JoinOp};

/// Configuration for [`ResourceMatcher`](super::ResourceMatcher).
///
/// # Examples
///
/// ```
/// use u_resmatch::cp::{SearchPolicy, SolverConfig};
/// use u_resmatch::matching::MatchConfig;
/// use u_resmatch::restriction::JoinOp;
///
/// let config = MatchConfig::default()
///     .with_property("has")
///     .with_join_op(JoinOp::Sum)
///     .with_solver(SolverConfig::default().with_policy(SearchPolicy::Optimal));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Search settings handed to the CP solver.
    pub solver: SolverConfig,

    /// Only restrictions on this property are requested from producers.
    /// `None` = all properties.
    pub property: Option<Iri>,

    /// How restriction lists are compacted before matching.
    ///
    /// Pool members are always summed as intervals, see
    /// [`ResourceMatcher::pool_restrictions`](super::ResourceMatcher::pool_restrictions).
    pub join_op: JoinOp,

    /// Whether to check candidates in parallel using rayon.
    ///
    /// Only effective with the `parallel` feature; otherwise candidates are
    /// checked sequentially.
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            property: None,
            join_op: JoinOp::Sum,
            parallel: false,
        }
    }
}

impl MatchConfig {
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_property(mut self, property: impl Into<Iri>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn with_join_op(mut self, op: JoinOp) -> Self {
        self.join_op = op;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.solver.validate()
    }
}
