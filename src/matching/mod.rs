//! Resource matching.
//!
//! Decides whether a set of available resources can satisfy a set of
//! requirements, and which resources get committed to which requirement.
//!
//! # Pipeline
//!
//! 1. Restriction lists are compacted ([`compact`](crate::restriction::compact)).
//! 2. Compacted lists become [`ModelBound`](crate::bound::ModelBound)s.
//! 3. [`ResourceMatch::formulate`] builds an assignment-matrix CP model:
//!    one variable per (requirement, resource) cell, row sums at least the
//!    required minimum, column sums at most the available maximum.
//! 4. A [`CpSolver`](crate::cp::CpSolver) searches it and
//!    [`Assignment`] reads the committed quantities back.
//!
//! [`ResourceMatcher`] wires these steps together and adds the derived
//! queries used for capability reasoning over pools of models.
//!
//! # Type hierarchy
//!
//! A resource of type `B` can fill a requirement for type `A` if the two
//! are equal or [`SubsumptionOracle::is_subclass_of`] says `B` ⊑ `A`.
//! [`ModelCatalog`] is an in-memory oracle and restriction store.

mod config;
mod formulator;
mod matcher;
mod oracle;

pub use config::MatchConfig;
pub use formulator::{Assignment, AssignmentCell, ResourceMatch};
pub use matcher::{ModelPool, ResourceMatcher};
pub use oracle::{ModelCatalog, RestrictionProvider, SubsumptionOracle};
