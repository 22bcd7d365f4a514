//! Integer decision variables.

/// A bounded integer decision variable.
///
/// In a resource match every variable is one assignment cell: the number
/// of units of an available model committed to one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntVar {
    /// Unique within a [`CpModel`](super::CpModel).
    pub name: String,
    pub min: i64,
    pub max: i64,
    /// Pinned value. Overrides `min`/`max` when set.
    pub fixed: Option<i64>,
}

impl IntVar {
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            fixed: None,
        }
    }

    /// A variable pinned to `value`.
    pub fn fixed(name: impl Into<String>, value: i64) -> Self {
        Self {
            fixed: Some(value),
            ..Self::new(name, value, value)
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }

    /// Number of values in the domain; `0` if `min > max`.
    pub fn domain_size(&self) -> i64 {
        let (lo, hi) = self.bounds();
        (hi - lo + 1).max(0)
    }

    /// Effective `(min, max)`.
    pub fn bounds(&self) -> (i64, i64) {
        self.fixed.map_or((self.min, self.max), |v| (v, v))
    }
}
