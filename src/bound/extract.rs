//! Lowering compacted restrictions into model bounds.

use super::types::{ModelBound, MAX_THRESHOLD};
use crate::error::{MatchError, Result};
use crate::restriction::{CardinalityKind, Iri, Restriction};
use tracing::trace;

/// Interval under construction; `upper == None` means unbounded.
struct Pending {
    model: Iri,
    lower: u32,
    upper: Option<u32>,
}

/// Resolves a compacted restriction list into one [`ModelBound`] per
/// distinct qualification, in first-seen order.
///
/// - `min n` raises the lower bound to `n`.
/// - `max n` lowers the upper bound to `n`.
/// - `exactly n` pins both bounds to `n`.
///
/// Unqualified restrictions are skipped. Upper bounds are capped at
/// [`MAX_THRESHOLD`].
///
/// # Errors
///
/// [`MatchError::InvalidBound`] if a qualification ends up with
/// `min > max`, e.g. from an uncompacted `min 5` / `max 3` pair.
///
/// # Examples
///
/// ```
/// use u_resmatch::bound::{to_model_bounds, MAX_THRESHOLD};
/// use u_resmatch::restriction::Restriction;
///
/// let bounds = to_model_bounds(&[
///     Restriction::min("has", "Camera", 2),
///     Restriction::max("has", "Camera", 4),
///     Restriction::min("has", "Gripper", 1),
/// ]).unwrap();
/// assert_eq!((bounds[0].min, bounds[0].max), (2, 4));
/// assert_eq!((bounds[1].min, bounds[1].max), (1, MAX_THRESHOLD));
/// ```
pub fn to_model_bounds(restrictions: &[Restriction]) -> Result<Vec<ModelBound>> {
    let mut pending: Vec<Pending> = Vec::new();

    for r in restrictions {
        let Some(model) = &r.qualification else {
            trace!(restriction = %r, "skipping unqualified restriction");
            continue;
        };

        let idx = match pending.iter().position(|p| &p.model == model) {
            Some(i) => i,
            None => {
                pending.push(Pending {
                    model: model.clone(),
                    lower: 0,
                    upper: None,
                });
                pending.len() - 1
            }
        };
        let entry = &mut pending[idx];

        match r.kind {
            CardinalityKind::Max => {
                entry.upper = Some(match entry.upper {
                    Some(u) => u.min(r.cardinality),
                    None => r.cardinality,
                });
            }
            CardinalityKind::Min => {
                entry.lower = entry.lower.max(r.cardinality);
            }
            CardinalityKind::Exact => {
                entry.lower = r.cardinality;
                entry.upper = Some(r.cardinality);
            }
        }
    }

    pending
        .into_iter()
        .map(|p| {
            let max = p.upper.unwrap_or(u32::MAX).min(MAX_THRESHOLD);
            if p.lower > max {
                return Err(MatchError::InvalidBound {
                    model: p.model,
                    min: p.lower as i64,
                    max: max as i64,
                });
            }
            Ok(ModelBound {
                model: p.model,
                min: p.lower,
                max,
            })
        })
        .collect()
}
