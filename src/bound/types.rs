//! Resolved per-model cardinality intervals.

use crate::error::{MatchError, Result};
use crate::restriction::{Iri, Restriction};
use std::fmt;
use tracing::debug;

/// Upper cap applied to every extracted `max`.
///
/// Keeps integer domains handed to the solver small; a `min` restriction
/// without a matching `max` would otherwise yield `u32::MAX`.
pub const MAX_THRESHOLD: u32 = 1_000_000;

/// A resolved `[min, max]` quantity interval for one model.
///
/// Produced from compacted restrictions by
/// [`to_model_bounds`](super::to_model_bounds) and, with `min == max`, by
/// solution extraction.
///
/// # Examples
///
/// ```
/// use u_resmatch::bound::ModelBound;
///
/// let available = ModelBound::new("Camera", 2, 5).unwrap();
/// let committed = ModelBound::exact("Camera", 2);
/// let rest = available.subtract(&committed).unwrap();
/// assert_eq!((rest.min, rest.max), (0, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelBound {
    /// Model the bound counts.
    pub model: Iri,
    /// Lower bound.
    pub min: u32,
    /// Upper bound.
    pub max: u32,
}

impl ModelBound {
    /// Creates a bound, capping `max` at [`MAX_THRESHOLD`].
    ///
    /// # Errors
    ///
    /// [`MatchError::InvalidBound`] if `min > max` after capping.
    pub fn new(model: impl Into<Iri>, min: u32, max: u32) -> Result<Self> {
        let model = model.into();
        let max = max.min(MAX_THRESHOLD);
        if min > max {
            return Err(MatchError::InvalidBound {
                model,
                min: min as i64,
                max: max as i64,
            });
        }
        Ok(Self { model, min, max })
    }

    /// A bound with `min == max == count`.
    pub fn exact(model: impl Into<Iri>, count: u32) -> Self {
        Self {
            model: model.into(),
            min: count,
            max: count,
        }
    }

    /// At least `count`, at most [`MAX_THRESHOLD`].
    ///
    /// `count` itself is clamped to the threshold, so the result is always
    /// a valid bound.
    pub fn at_least(model: impl Into<Iri>, count: u32) -> Self {
        Self {
            model: model.into(),
            min: count.min(MAX_THRESHOLD),
            max: MAX_THRESHOLD,
        }
    }

    /// Between zero and `count`.
    pub fn at_most(model: impl Into<Iri>, count: u32) -> Self {
        Self {
            model: model.into(),
            min: 0,
            max: count.min(MAX_THRESHOLD),
        }
    }

    /// Whether the bound admits a single quantity.
    pub fn is_exact(&self) -> bool {
        self.min == self.max
    }

    /// Whether `count` lies within the bound.
    pub fn contains(&self, count: u32) -> bool {
        self.min <= count && count <= self.max
    }

    /// Interval intersection.
    ///
    /// # Errors
    ///
    /// - [`MatchError::ModelMismatch`] for bounds on different models.
    /// - [`MatchError::InvalidBound`] if the intervals are disjoint.
    pub fn intersection(&self, other: &ModelBound) -> Result<ModelBound> {
        self.check_model(other)?;
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min > max {
            return Err(MatchError::InvalidBound {
                model: self.model.clone(),
                min: min as i64,
                max: max as i64,
            });
        }
        Ok(ModelBound {
            model: self.model.clone(),
            min,
            max,
        })
    }

    /// Interval sum, `max` capped at [`MAX_THRESHOLD`].
    pub fn add(&self, other: &ModelBound) -> Result<ModelBound> {
        self.check_model(other)?;
        let min = self.min.saturating_add(other.min);
        let max = self.max.saturating_add(other.max);
        ModelBound::new(self.model.clone(), min, max)
    }

    /// Removes `other` from this bound: the upper bound drops by
    /// `other.max`, the lower bound by `other.min` (not below zero).
    ///
    /// # Errors
    ///
    /// [`MatchError::InvalidBound`] if more would be removed than the upper
    /// bound allows, or the result has `min > max`.
    pub fn subtract(&self, other: &ModelBound) -> Result<ModelBound> {
        self.check_model(other)?;
        let min = (self.min as i64 - other.min as i64).max(0);
        let max = self.max as i64 - other.max as i64;
        if max < 0 || min > max {
            return Err(MatchError::InvalidBound {
                model: self.model.clone(),
                min,
                max,
            });
        }
        Ok(ModelBound {
            model: self.model.clone(),
            min: min as u32,
            max: max as u32,
        })
    }

    fn check_model(&self, other: &ModelBound) -> Result<()> {
        if self.model != other.model {
            return Err(MatchError::ModelMismatch {
                left: self.model.clone(),
                right: other.model.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ModelBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {}]", self.model, self.min, self.max)
    }
}

/// How [`subtract_lists`] treats elements that would become inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtractMode {
    /// Fail on the first inconsistent element.
    #[default]
    Strict,
    /// Best effort: drop inconsistent elements and keep going.
    RemoveNegative,
}

/// Subtracts `b` from `a` per model.
///
/// Entries of `b` are aggregated per model first. Models only present in
/// `a` are kept unchanged; models only present in `b` are an error in
/// [`SubtractMode::Strict`] and ignored otherwise.
pub fn subtract_lists(
    a: &[ModelBound],
    b: &[ModelBound],
    mode: SubtractMode,
) -> Result<Vec<ModelBound>> {
    let b = aggregate(b)?;
    let mut out = Vec::with_capacity(a.len());

    for x in a {
        let Some(y) = b.iter().find(|y| y.model == x.model) else {
            out.push(x.clone());
            continue;
        };
        match (x.subtract(y), mode) {
            (Ok(rest), _) => out.push(rest),
            (Err(e), SubtractMode::Strict) => return Err(e),
            (Err(e), SubtractMode::RemoveNegative) => {
                debug!(model = %x.model, error = %e, "dropping inconsistent bound");
            }
        }
    }

    if mode == SubtractMode::Strict {
        if let Some(y) = b.iter().find(|y| a.iter().all(|x| x.model != y.model)) {
            return Err(MatchError::InvalidBound {
                model: y.model.clone(),
                min: -(y.min as i64),
                max: -(y.max as i64),
            });
        }
    }

    Ok(out)
}

/// Sums bounds per model, keeping first-seen order.
pub fn aggregate(list: &[ModelBound]) -> Result<Vec<ModelBound>> {
    let mut out: Vec<ModelBound> = Vec::with_capacity(list.len());
    for b in list {
        match out.iter_mut().find(|x| x.model == b.model) {
            Some(x) => *x = x.add(b)?,
            None => out.push(b.clone()),
        }
    }
    Ok(out)
}

/// Largest `max` in the list, `0` when empty.
pub fn max_of(list: &[ModelBound]) -> u32 {
    list.iter().map(|b| b.max).max().unwrap_or(0)
}

/// Lowers bounds back into object restrictions on `property`.
///
/// Exact bounds become `exactly`; otherwise a `min` restriction is emitted
/// when `min > 0` and a `max` restriction when `max` is below
/// [`MAX_THRESHOLD`]. Unconstrained bounds produce nothing.
pub fn to_restrictions(list: &[ModelBound], property: &Iri) -> Vec<Restriction> {
    let mut out = Vec::new();
    for b in list {
        if b.is_exact() {
            out.push(Restriction::exact(property.clone(), b.model.clone(), b.min));
            continue;
        }
        if b.min > 0 {
            out.push(Restriction::min(property.clone(), b.model.clone(), b.min));
        }
        if b.max < MAX_THRESHOLD {
            out.push(Restriction::max(property.clone(), b.model.clone(), b.max));
        }
    }
    out
}
