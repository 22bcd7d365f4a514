//! Constraint Programming (CP) layer.
//!
//! Provides a solver-agnostic model of integer decision variables, linear
//! sum constraints and an optional objective, plus a [`CpSolver`] trait
//! that external solvers can implement.
//!
//! # Key Components
//!
//! - **Variables**: [`IntVar`]: bounded integer decision variables
//! - **Constraints**: [`Constraint`]: domain bounds and linear sums
//! - **Model**: [`CpModel`]: container for variables, constraints, objective
//! - **Solver**: [`CpSolver`] trait and the bundled [`DfsSolver`]
//!
//! # Search policy
//!
//! [`SolverConfig::policy`] makes the stopping rule explicit:
//! [`SearchPolicy::FirstFeasible`] returns the first assignment found,
//! [`SearchPolicy::Optimal`] keeps searching under the objective.
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod model;
mod solver;
mod variables;

pub use model::{Constraint, CpModel, Objective, Relation};
pub use solver::{
    CpSolution, CpSolver, DfsSolver, SearchPolicy, SolverConfig, SolverStatus, ValueOrder,
    VarOrder,
};
pub use variables::IntVar;
