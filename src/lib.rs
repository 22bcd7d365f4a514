//! Cardinality-restriction algebra and CSP-based resource matching.
//!
//! Models declare what they need and what they provide as qualified
//! cardinality restrictions ("has at least 2 `Camera`", "has exactly 4
//! `Wheel`"). This crate combines such restrictions and decides whether a
//! pool of providers can cover a set of requirements:
//!
//! - **Restriction algebra** ([`restriction`]): overlap, intersection,
//!   join, scaling and compaction of restriction lists.
//! - **Model bounds** ([`bound`]): resolved `[min, max]` quantities per
//!   model, with interval arithmetic for committing and releasing units.
//! - **CP layer** ([`cp`]): a small integer model with linear sum
//!   constraints and a bundled depth-first bounds-propagation solver.
//! - **Matching** ([`matching`]): the assignment-matrix formulation,
//!   solution extraction, and queries such as "which of these models can
//!   this pool support".
//!
//! # Architecture
//!
//! The type hierarchy is supplied by the caller through
//! [`matching::SubsumptionOracle`]; restrictions of named models through
//! [`matching::RestrictionProvider`]. The crate itself holds no ontology.

pub mod bound;
pub mod cp;
pub mod error;
pub mod matching;
pub mod restriction;

pub use error::{MatchError, Result};
