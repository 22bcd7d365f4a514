//! Restriction data model.

use std::fmt;

/// Identifier of a model, resource type or property.
///
/// Opaque apart from ordering and equality; in practice an IRI such as
/// `http://example.org/robots#Camera`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iri(String);

impl Iri {
    /// Creates an identifier from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after the last `#` or `/`, for compact log output.
    pub fn short_name(&self) -> &str {
        self.0
            .rsplit(['#', '/'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(self.0.as_str())
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Iri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of cardinality bound a restriction expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CardinalityKind {
    /// At least `cardinality` instances.
    Min,
    /// At most `cardinality` instances.
    Max,
    /// Exactly `cardinality` instances.
    Exact,
}

impl fmt::Display for CardinalityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CardinalityKind::Min => "min",
            CardinalityKind::Max => "max",
            CardinalityKind::Exact => "exactly",
        };
        f.write_str(s)
    }
}

/// Whether a restriction ranges over related individuals or literal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RestrictionDomain {
    Object,
    Data,
}

/// Operation used by [`join`](super::join) to aggregate two restrictions
/// of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JoinOp {
    /// Add cardinalities (independent sources accumulate).
    #[default]
    Sum,
    /// Keep the smaller cardinality.
    Min,
    /// Keep the larger cardinality.
    Max,
}

impl JoinOp {
    /// Applies the operation, `None` on overflow.
    pub fn apply(self, a: u32, b: u32) -> Option<u32> {
        match self {
            JoinOp::Sum => a.checked_add(b),
            JoinOp::Min => Some(a.min(b)),
            JoinOp::Max => Some(a.max(b)),
        }
    }
}

/// A qualified cardinality restriction.
///
/// Reads as "`property` relates to `kind` `cardinality` instances of
/// `qualification`", e.g. *has min 2 Camera*. A missing qualification means
/// the restriction is unqualified; such restrictions take part in the
/// algebra but are ignored when bounds are extracted for matching.
///
/// # Examples
///
/// ```
/// use u_resmatch::restriction::{CardinalityKind, Restriction};
///
/// let r = Restriction::min("has", "Camera", 2);
/// assert_eq!(r.kind, CardinalityKind::Min);
/// assert_eq!(r.cardinality, 2);
/// assert_eq!(r.to_string(), "has min 2 Camera");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Restriction {
    /// Restricted property.
    pub property: Iri,
    /// Type the restriction counts; `None` when unqualified.
    pub qualification: Option<Iri>,
    /// Bound kind.
    pub kind: CardinalityKind,
    /// Bound value.
    pub cardinality: u32,
    /// Object or data restriction.
    pub domain: RestrictionDomain,
}

impl Restriction {
    /// Creates a qualified object restriction.
    pub fn object(
        property: impl Into<Iri>,
        qualification: impl Into<Iri>,
        kind: CardinalityKind,
        cardinality: u32,
    ) -> Self {
        Self {
            property: property.into(),
            qualification: Some(qualification.into()),
            kind,
            cardinality,
            domain: RestrictionDomain::Object,
        }
    }

    /// Creates a qualified data restriction.
    pub fn data(
        property: impl Into<Iri>,
        qualification: impl Into<Iri>,
        kind: CardinalityKind,
        cardinality: u32,
    ) -> Self {
        Self {
            domain: RestrictionDomain::Data,
            ..Self::object(property, qualification, kind, cardinality)
        }
    }

    /// Creates an unqualified object restriction.
    pub fn unqualified(property: impl Into<Iri>, kind: CardinalityKind, cardinality: u32) -> Self {
        Self {
            property: property.into(),
            qualification: None,
            kind,
            cardinality,
            domain: RestrictionDomain::Object,
        }
    }

    /// Shorthand for a `Min` object restriction.
    pub fn min(property: impl Into<Iri>, qualification: impl Into<Iri>, cardinality: u32) -> Self {
        Self::object(property, qualification, CardinalityKind::Min, cardinality)
    }

    /// Shorthand for a `Max` object restriction.
    pub fn max(property: impl Into<Iri>, qualification: impl Into<Iri>, cardinality: u32) -> Self {
        Self::object(property, qualification, CardinalityKind::Max, cardinality)
    }

    /// Shorthand for an `Exact` object restriction.
    pub fn exact(property: impl Into<Iri>, qualification: impl Into<Iri>, cardinality: u32) -> Self {
        Self::object(property, qualification, CardinalityKind::Exact, cardinality)
    }

    /// Returns a copy with another kind and cardinality.
    pub fn with(&self, kind: CardinalityKind, cardinality: u32) -> Self {
        Self {
            kind,
            cardinality,
            ..self.clone()
        }
    }

    /// Whether the restriction names a qualification type.
    pub fn is_qualified(&self) -> bool {
        self.qualification.is_some()
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.property, self.kind, self.cardinality)?;
        if let Some(q) = &self.qualification {
            write!(f, " {q}")?;
        }
        Ok(())
    }
}

/// Outcome of combining two overlapping restrictions.
///
/// Contradictions are reported through `Err`, so together with `Result`
/// a combination is merged, left side by side, or invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merge {
    /// Both restrictions are replaced by this one.
    Merged(Restriction),
    /// The restrictions are consistent but cannot be expressed as one
    /// (e.g. `min 2` and `max 5`); callers keep both.
    Unmergeable,
}

impl Merge {
    /// The merged restriction, if any.
    pub fn into_merged(self) -> Option<Restriction> {
        match self {
            Merge::Merged(r) => Some(r),
            Merge::Unmergeable => None,
        }
    }
}
