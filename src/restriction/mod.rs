//! Cardinality restrictions and their algebra.
//!
//! A [`Restriction`] states that a property relates a model to at least,
//! at most, or exactly *n* instances of a qualification type. The algebra
//! combines such statements:
//!
//! - [`intersection`] / [`intersection_lists`]: tighten restrictions that
//!   apply to the same individual.
//! - [`join`] / [`join_lists`]: aggregate restrictions from independent
//!   sources with a [`JoinOp`].
//! - [`scale`]: multiply cardinalities (counted inheritance).
//! - [`compact`]: fold a list so no two restrictions of the same kind
//!   overlap.
//!
//! All functions are pure and never mutate their inputs.

mod algebra;
mod types;

pub use algebra::{
    compact, intersect_compact, intersection, intersection_lists, is_overlapping, join,
    join_lists, scale,
};
pub use types::{CardinalityKind, Iri, JoinOp, Merge, Restriction, RestrictionDomain};
