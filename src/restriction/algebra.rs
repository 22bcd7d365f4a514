//! Pure operations over cardinality restrictions.
//!
//! Two kinds of combination are provided:
//!
//! - **intersection**: both restrictions constrain the same individual, so
//!   the result is the tightest restriction implied by both.
//! - **join**: the restrictions come from independent sources (e.g. several
//!   ancestor classes, several robots in a team) and are aggregated with a
//!   [`JoinOp`].
//!
//! List variants reduce pairwise with first-match semantics. Inputs are
//! expected to be compact already; with duplicates on one side the result
//! depends on list order.

use super::types::{CardinalityKind, JoinOp, Merge, Restriction};
use crate::error::{MatchError, Result};
use tracing::trace;

/// Whether `a` and `b` restrict the same property with the same
/// qualification in the same domain.
///
/// Qualifications are compared for equality; subsumption between
/// qualifications is not taken into account here.
pub fn is_overlapping(a: &Restriction, b: &Restriction) -> bool {
    a.domain == b.domain && a.property == b.property && a.qualification == b.qualification
}

/// Intersects two overlapping restrictions.
///
/// # Errors
///
/// - [`MatchError::IncompatibleRestrictions`] if `a` and `b` do not overlap.
/// - [`MatchError::InconsistentCardinality`] if both cannot hold at once.
///
/// # Examples
///
/// ```
/// use u_resmatch::restriction::{intersection, Merge, Restriction};
///
/// let merged = intersection(
///     &Restriction::min("has", "Camera", 2),
///     &Restriction::max("has", "Camera", 2),
/// ).unwrap();
/// assert_eq!(merged, Merge::Merged(Restriction::exact("has", "Camera", 2)));
/// ```
pub fn intersection(a: &Restriction, b: &Restriction) -> Result<Merge> {
    use CardinalityKind::{Exact, Max, Min};

    if !is_overlapping(a, b) {
        return Err(MatchError::incompatible(a, b));
    }

    let merged = match (a.kind, b.kind) {
        (Min, Min) => a.with(Min, a.cardinality.max(b.cardinality)),
        (Max, Max) => a.with(Max, a.cardinality.min(b.cardinality)),
        (Exact, Exact) => {
            if a.cardinality != b.cardinality {
                return Err(MatchError::inconsistent(a, b));
            }
            a.clone()
        }
        (Min, Max) | (Max, Min) => {
            let (lower, upper) = if a.kind == Min { (a, b) } else { (b, a) };
            if lower.cardinality > upper.cardinality {
                return Err(MatchError::inconsistent(a, b));
            }
            if lower.cardinality < upper.cardinality {
                return Ok(Merge::Unmergeable);
            }
            a.with(Exact, lower.cardinality)
        }
        (Exact, other) | (other, Exact) => {
            let (exact, bound) = if a.kind == Exact { (a, b) } else { (b, a) };
            let violated = match other {
                Min => exact.cardinality < bound.cardinality,
                Max => exact.cardinality > bound.cardinality,
                Exact => unreachable!("exact/exact handled above"),
            };
            if violated {
                return Err(MatchError::inconsistent(a, b));
            }
            exact.clone()
        }
    };

    Ok(Merge::Merged(merged))
}

/// Joins two overlapping restrictions of equal kind.
///
/// Overlapping restrictions of different kinds are reported as
/// [`Merge::Unmergeable`].
///
/// # Errors
///
/// - [`MatchError::IncompatibleRestrictions`] if `a` and `b` do not overlap.
/// - [`MatchError::CardinalityOverflow`] if a `Sum` exceeds `u32::MAX`.
pub fn join(a: &Restriction, b: &Restriction, op: JoinOp) -> Result<Merge> {
    if !is_overlapping(a, b) {
        return Err(MatchError::incompatible(a, b));
    }
    if a.kind != b.kind {
        return Ok(Merge::Unmergeable);
    }
    let cardinality = op
        .apply(a.cardinality, b.cardinality)
        .ok_or_else(|| MatchError::CardinalityOverflow {
            restriction: Box::new(a.clone()),
        })?;
    Ok(Merge::Merged(a.with(a.kind, cardinality)))
}

/// Pairwise intersection of two restriction lists.
///
/// For each element of `a` the first overlapping, not yet consumed element
/// of `b` is combined with it. Elements without a partner, and pairs that
/// are [`Merge::Unmergeable`], are kept as they are. Unconsumed elements of
/// `b` are appended in their original order.
pub fn intersection_lists(a: &[Restriction], b: &[Restriction]) -> Result<Vec<Restriction>> {
    reduce_lists(a, b, intersection)
}

/// Pairwise join of two restriction lists, see [`intersection_lists`] for
/// the reduction order.
pub fn join_lists(a: &[Restriction], b: &[Restriction], op: JoinOp) -> Result<Vec<Restriction>> {
    reduce_lists(a, b, |x, y| join(x, y, op))
}

/// Multiplies every cardinality by `factor`.
///
/// Used when requirements are inherited through a counted relation: a team
/// of 2 robots each having 3 cameras has 6 cameras.
///
/// # Errors
///
/// [`MatchError::CardinalityOverflow`] if a product exceeds `u32::MAX`.
pub fn scale(list: &[Restriction], factor: u32) -> Result<Vec<Restriction>> {
    list.iter()
        .map(|r| -> Result<Restriction> {
            let cardinality =
                r.cardinality
                    .checked_mul(factor)
                    .ok_or_else(|| MatchError::CardinalityOverflow {
                        restriction: Box::new(r.clone()),
                    })?;
            Ok(r.with(r.kind, cardinality))
        })
        .collect()
}

/// Folds `list` into itself with [`join`] until no two restrictions of the
/// same kind overlap.
///
/// # Examples
///
/// ```
/// use u_resmatch::restriction::{compact, JoinOp, Restriction};
///
/// let list = vec![
///     Restriction::min("has", "Camera", 1),
///     Restriction::min("has", "Gripper", 1),
///     Restriction::min("has", "Camera", 2),
/// ];
/// let compacted = compact(&list, JoinOp::Sum).unwrap();
/// assert_eq!(compacted, vec![
///     Restriction::min("has", "Camera", 3),
///     Restriction::min("has", "Gripper", 1),
/// ]);
/// ```
pub fn compact(list: &[Restriction], op: JoinOp) -> Result<Vec<Restriction>> {
    let mut acc: Vec<Restriction> = Vec::with_capacity(list.len());
    for r in list {
        acc = join_lists(&acc, std::slice::from_ref(r), op)?;
    }
    trace!(input = list.len(), output = acc.len(), ?op, "compacted restrictions");
    Ok(acc)
}

/// Folds `list` into itself with [`intersection`], yielding the tightest
/// restriction per qualification and kind combination.
///
/// `min` and `max` restrictions on the same qualification stay side by side
/// unless they collapse to an exact bound.
pub fn intersect_compact(list: &[Restriction]) -> Result<Vec<Restriction>> {
    let mut acc: Vec<Restriction> = Vec::with_capacity(list.len());
    for r in list {
        acc = intersection_lists(&acc, std::slice::from_ref(r))?;
    }
    Ok(acc)
}

/// First-match pairwise reduction with an explicit consumed mask.
fn reduce_lists<F>(a: &[Restriction], b: &[Restriction], combine: F) -> Result<Vec<Restriction>>
where
    F: Fn(&Restriction, &Restriction) -> Result<Merge>,
{
    let mut consumed = vec![false; b.len()];
    let mut out = Vec::with_capacity(a.len() + b.len());

    for left in a {
        let partner = b
            .iter()
            .enumerate()
            .find(|(j, right)| !consumed[*j] && is_overlapping(left, right));

        match partner {
            Some((j, right)) => match combine(left, right)? {
                Merge::Merged(merged) => {
                    consumed[j] = true;
                    out.push(merged);
                }
                Merge::Unmergeable => out.push(left.clone()),
            },
            None => out.push(left.clone()),
        }
    }

    out.extend(
        b.iter()
            .zip(&consumed)
            .filter(|(_, used)| !**used)
            .map(|(r, _)| r.clone()),
    );
    Ok(out)
}
