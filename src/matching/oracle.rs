//! Interfaces to the type hierarchy and to restriction producers.

use crate::error::Result;
use crate::restriction::{compact, Iri, JoinOp, Restriction};
use std::collections::{HashMap, HashSet, VecDeque};

/// Answers "is `candidate` a subtype of (or equal to) `target`".
///
/// Any `Fn(&Iri, &Iri) -> bool + Sync` closure implements this trait.
/// The matcher treats equal identifiers as compatible itself, so an
/// implementation does not have to be reflexive.
///
/// # Examples
///
/// ```
/// use u_resmatch::matching::SubsumptionOracle;
/// use u_resmatch::restriction::Iri;
///
/// let oracle = |sub: &Iri, sup: &Iri| sub.as_str() == "Stereo" && sup.as_str() == "Camera";
/// assert!(oracle.is_subclass_of(&Iri::new("Stereo"), &Iri::new("Camera")));
/// assert!(!oracle.is_subclass_of(&Iri::new("Camera"), &Iri::new("Stereo")));
/// ```
pub trait SubsumptionOracle: Sync {
    /// Whether `candidate` is subsumed by `target`.
    fn is_subclass_of(&self, candidate: &Iri, target: &Iri) -> bool;
}

impl<F> SubsumptionOracle for F
where
    F: Fn(&Iri, &Iri) -> bool + Sync,
{
    fn is_subclass_of(&self, candidate: &Iri, target: &Iri) -> bool {
        self(candidate, target)
    }
}

/// Source of the cardinality restrictions declared for a model.
///
/// Returned lists need not be compact.
pub trait RestrictionProvider: Sync {
    /// Restrictions declared for `model`, optionally only those on
    /// `property`.
    fn cardinality_restrictions(&self, model: &Iri, property: Option<&Iri>) -> Vec<Restriction>;
}

/// In-memory model hierarchy and restriction store.
///
/// Implements both [`SubsumptionOracle`] (reflexive, transitive over the
/// declared superclass edges) and [`RestrictionProvider`] (declared
/// restrictions only, no inheritance).
///
/// # Examples
///
/// ```
/// use u_resmatch::matching::{ModelCatalog, RestrictionProvider, SubsumptionOracle};
/// use u_resmatch::restriction::{Iri, Restriction};
///
/// let mut catalog = ModelCatalog::new();
/// catalog
///     .add_subclass("StereoCamera", "Camera")
///     .add_restriction("Rover", Restriction::exact("has", "StereoCamera", 2));
///
/// assert!(catalog.is_subclass_of(&Iri::new("StereoCamera"), &Iri::new("Camera")));
/// assert_eq!(catalog.cardinality_restrictions(&Iri::new("Rover"), None).len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    superclasses: HashMap<Iri, Vec<Iri>>,
    restrictions: HashMap<Iri, Vec<Restriction>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `sub` as a direct subclass of `sup`.
    pub fn add_subclass(&mut self, sub: impl Into<Iri>, sup: impl Into<Iri>) -> &mut Self {
        let supers = self.superclasses.entry(sub.into()).or_default();
        let sup = sup.into();
        if !supers.contains(&sup) {
            supers.push(sup);
        }
        self
    }

    /// Declares a restriction on `model`.
    pub fn add_restriction(&mut self, model: impl Into<Iri>, restriction: Restriction) -> &mut Self {
        self.restrictions
            .entry(model.into())
            .or_default()
            .push(restriction);
        self
    }

    /// All strict ancestors of `model`, breadth first, without duplicates.
    pub fn ancestors(&self, model: &Iri) -> Vec<Iri> {
        let mut seen: HashSet<&Iri> = HashSet::new();
        let mut queue: VecDeque<&Iri> = VecDeque::new();
        let mut out = Vec::new();
        seen.insert(model);
        queue.push_back(model);

        while let Some(current) = queue.pop_front() {
            for sup in self.superclasses.get(current).into_iter().flatten() {
                if seen.insert(sup) {
                    out.push(sup.clone());
                    queue.push_back(sup);
                }
            }
        }
        out
    }

    /// Restrictions of `model` and all its ancestors, compacted with `op`.
    ///
    /// `JoinOp::Sum` accumulates requirements of unrelated ancestors; a
    /// restriction restated along a single chain is then counted once per
    /// restatement, so chains that refine rather than add should use
    /// `JoinOp::Max`.
    pub fn inherited_restrictions(
        &self,
        model: &Iri,
        property: Option<&Iri>,
        op: JoinOp,
    ) -> Result<Vec<Restriction>> {
        let mut all = self.cardinality_restrictions(model, property);
        for ancestor in self.ancestors(model) {
            all.extend(self.cardinality_restrictions(&ancestor, property));
        }
        compact(&all, op)
    }
}

impl SubsumptionOracle for ModelCatalog {
    fn is_subclass_of(&self, candidate: &Iri, target: &Iri) -> bool {
        candidate == target || self.ancestors(candidate).contains(target)
    }
}

impl RestrictionProvider for ModelCatalog {
    fn cardinality_restrictions(&self, model: &Iri, property: Option<&Iri>) -> Vec<Restriction> {
        self.restrictions
            .get(model)
            .map(|list| {
                list.iter()
                    .filter(|r| property.is_none_or(|p| &r.property == p))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
