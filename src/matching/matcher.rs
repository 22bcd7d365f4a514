//! Restriction-level matching queries.

use super::config::MatchConfig;
use super::formulator::{Assignment, ResourceMatch};
use super::oracle::{RestrictionProvider, SubsumptionOracle};
use crate::bound::{aggregate, to_model_bounds, to_restrictions, ModelBound};
use crate::cp::{CpSolver, DfsSolver};
use crate::error::{MatchError, Result};
use crate::restriction::{compact, scale, Iri, Restriction};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, warn};

/// A combination of provider models with multiplicities, e.g. two rovers
/// and one drone.
///
/// Keeps insertion order; adding a model twice adds up its count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelPool {
    members: Vec<(Iri, u32)>,
}

impl ModelPool {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` instances of `model`.
    pub fn add(&mut self, model: impl Into<Iri>, count: u32) -> &mut Self {
        let model = model.into();
        match self.members.iter_mut().find(|(m, _)| *m == model) {
            Some((_, c)) => *c = c.saturating_add(count),
            None => self.members.push((model, count)),
        }
        self
    }

    /// Builder form of [`ModelPool::add`].
    pub fn with(mut self, model: impl Into<Iri>, count: u32) -> Self {
        self.add(model, count);
        self
    }

    /// Members with their counts.
    pub fn iter(&self) -> impl Iterator<Item = (&Iri, u32)> {
        self.members.iter().map(|(m, c)| (m, *c))
    }

    /// Number of distinct models.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the pool has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total number of instances.
    pub fn total(&self) -> u64 {
        self.members.iter().map(|(_, c)| *c as u64).sum()
    }
}

impl<M: Into<Iri>> FromIterator<(M, u32)> for ModelPool {
    fn from_iter<T: IntoIterator<Item = (M, u32)>>(iter: T) -> Self {
        let mut pool = ModelPool::new();
        for (model, count) in iter {
            pool.add(model, count);
        }
        pool
    }
}

/// Decides whether available restrictions cover required ones.
///
/// Restriction lists are compacted with [`MatchConfig::join_op`], lowered
/// to [`ModelBound`]s and matched through [`ResourceMatch`].
///
/// # Examples
///
/// ```
/// use u_resmatch::matching::{ModelCatalog, ModelPool, ResourceMatcher};
/// use u_resmatch::restriction::{Iri, Restriction};
///
/// let mut catalog = ModelCatalog::new();
/// catalog
///     .add_subclass("StereoCamera", "Camera")
///     .add_restriction("Rover", Restriction::exact("has", "StereoCamera", 1))
///     .add_restriction("Mapping", Restriction::min("has", "Camera", 2));
///
/// let matcher = ResourceMatcher::new(&catalog);
/// let one = ModelPool::new().with("Rover", 1);
/// let two = ModelPool::new().with("Rover", 2);
/// let candidates = [Iri::new("Mapping")];
///
/// assert!(matcher.filter_supported_models(&one, &candidates, &catalog).is_empty());
/// assert_eq!(matcher.filter_supported_models(&two, &candidates, &catalog), candidates);
/// ```
pub struct ResourceMatcher<'a, O: ?Sized, S = DfsSolver> {
    oracle: &'a O,
    solver: S,
    config: MatchConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, O> ResourceMatcher<'a, O, DfsSolver>
where
    O: SubsumptionOracle + ?Sized,
{
    /// Creates a matcher using the bundled [`DfsSolver`].
    pub fn new(oracle: &'a O) -> Self {
        Self {
            oracle,
            solver: DfsSolver::new(),
            config: MatchConfig::default(),
            cancel: None,
        }
    }
}

impl<'a, O, S> ResourceMatcher<'a, O, S>
where
    O: SubsumptionOracle + ?Sized,
    S: CpSolver,
{
    /// Replaces the solver.
    pub fn with_solver<T: CpSolver>(self, solver: T) -> ResourceMatcher<'a, O, T> {
        ResourceMatcher {
            oracle: self.oracle,
            solver,
            config: self.config,
            cancel: self.cancel,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Every search started by this matcher stops once `cancel` is set.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Solves `required` against `available` and returns one exact bound
    /// per committed (requirement, resource) pair.
    ///
    /// # Errors
    ///
    /// - [`MatchError::NoSolutionFound`] if the resources are insufficient.
    /// - Algebra and bound errors for contradictory inputs.
    /// - [`MatchError::SearchAborted`] if the search was stopped.
    pub fn solve(
        &self,
        required: &[Restriction],
        available: &[Restriction],
    ) -> Result<Vec<ModelBound>> {
        self.assign(required, available)
            .map(|assignment| assignment.solution_bounds())
    }

    /// Like [`ResourceMatcher::solve`], returning the full assignment.
    pub fn assign(&self, required: &[Restriction], available: &[Restriction]) -> Result<Assignment> {
        self.config.validate()?;
        let required = to_model_bounds(&compact(required, self.config.join_op)?)?;
        let available = to_model_bounds(&compact(available, self.config.join_op)?)?;

        ResourceMatch::formulate(&required, &available, self.oracle).solve(
            &self.solver,
            &self.config.solver,
            self.cancel.clone(),
        )
    }

    /// Whether `provider` restrictions cover the `service` requirements.
    ///
    /// Infeasibility is `Ok(false)`; contradictory inputs and aborted
    /// searches are errors.
    pub fn is_supporting(&self, provider: &[Restriction], service: &[Restriction]) -> Result<bool> {
        match self.assign(service, provider) {
            Ok(_) => Ok(true),
            Err(MatchError::NoSolutionFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Combined restrictions of every model in `pool`.
    ///
    /// Each member's restrictions are scaled by its count, compacted with
    /// [`MatchConfig::join_op`] and lowered to [`ModelBound`]s per property.
    /// Members are then summed as intervals, so `exactly 4 Wheel` plus
    /// `max 2 Wheel` supplies `[4, 6]` wheels. The result is compact: per
    /// property and model either one `exactly`, or a `min` and/or a `max`.
    ///
    /// Unqualified restrictions carry no supply and are left out.
    pub fn pool_restrictions<P>(&self, pool: &ModelPool, producer: &P) -> Result<Vec<Restriction>>
    where
        P: RestrictionProvider + ?Sized,
    {
        let property = self.config.property.as_ref();
        let op = self.config.join_op;
        let mut totals: Vec<(Iri, Vec<ModelBound>)> = Vec::new();

        for (model, count) in pool.iter().filter(|(_, count)| *count > 0) {
            let own = producer.cardinality_restrictions(model, property);
            let scaled = compact(&scale(&own, count)?, op)?;
            for (prop, list) in by_property(scaled) {
                let bounds = to_model_bounds(&list)?;
                match totals.iter_mut().find(|(p, _)| *p == prop) {
                    Some((_, acc)) => {
                        acc.extend(bounds);
                        let summed = aggregate(acc.as_slice())?;
                        *acc = summed;
                    }
                    None => totals.push((prop, bounds)),
                }
            }
        }

        debug!(members = pool.len(), properties = totals.len(), "combined pool");
        Ok(totals
            .iter()
            .flat_map(|(prop, bounds)| to_restrictions(bounds, prop))
            .collect())
    }

    /// Candidates whose requirements `pool` supports.
    ///
    /// Unsupported candidates are left out. Candidates whose check fails
    /// with an error (contradictory restrictions, aborted search) are
    /// logged and left out as well.
    pub fn filter_supported_models<P>(
        &self,
        pool: &ModelPool,
        candidates: &[Iri],
        producer: &P,
    ) -> Vec<Iri>
    where
        P: RestrictionProvider + ?Sized,
    {
        let provided = match self.pool_restrictions(pool, producer) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "cannot combine pool restrictions");
                return Vec::new();
            }
        };
        let property = self.config.property.as_ref();

        let check = |candidate: &Iri| -> bool {
            let service = producer.cardinality_restrictions(candidate, property);
            match self.is_supporting(&provided, &service) {
                Ok(supported) => {
                    debug!(candidate = %candidate.short_name(), supported, "checked candidate");
                    supported
                }
                Err(e) => {
                    warn!(candidate = %candidate, error = %e, "candidate check failed");
                    false
                }
            }
        };

        if self.config.parallel {
            return par_filter(candidates, check);
        }
        candidates.iter().filter(|c| check(c)).cloned().collect()
    }
}

/// Splits `list` by property, keeping first-seen order.
fn by_property(list: Vec<Restriction>) -> Vec<(Iri, Vec<Restriction>)> {
    let mut groups: Vec<(Iri, Vec<Restriction>)> = Vec::new();
    for r in list {
        match groups.iter_mut().find(|(p, _)| *p == r.property) {
            Some((_, group)) => group.push(r),
            None => groups.push((r.property.clone(), vec![r])),
        }
    }
    groups
}

#[cfg(feature = "parallel")]
fn par_filter<F>(candidates: &[Iri], check: F) -> Vec<Iri>
where
    F: Fn(&Iri) -> bool + Sync,
{
    use rayon::prelude::*;
    candidates
        .par_iter()
        .filter(|c| check(c))
        .cloned()
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn par_filter<F>(candidates: &[Iri], check: F) -> Vec<Iri>
where
    F: Fn(&Iri) -> bool,
{
    candidates.iter().filter(|c| check(c)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{CpModel, CpSolution, SolverConfig, SolverStatus};
    use crate::matching::ModelCatalog;
    use crate::restriction::JoinOp;
    use std::sync::atomic::Ordering;

    fn catalog() -> ModelCatalog {
        let mut c = ModelCatalog::new();
        c.add_subclass("StereoCamera", "Camera")
            .add_subclass("Lidar", "Sensor")
            .add_subclass("Camera", "Sensor")
            .add_restriction("Rover", Restriction::exact("has", "StereoCamera", 2))
            .add_restriction("Rover", Restriction::exact("has", "Wheel", 4))
            .add_restriction("Drone", Restriction::exact("has", "Lidar", 1))
            .add_restriction("Drone", Restriction::max("uses", "Battery", 1))
            .add_restriction("Survey", Restriction::min("has", "Sensor", 3))
            .add_restriction("Photo", Restriction::min("has", "Camera", 1))
            .add_restriction("Drive", Restriction::exact("has", "Wheel", 4))
            .add_restriction("Convoy", Restriction::min("has", "Wheel", 8))
            .add_restriction("Broken", Restriction::exact("has", "Wheel", 1))
            .add_restriction("Broken", Restriction::exact("has", "Wheel", 1))
            .add_restriction("Broken", Restriction::max("has", "Wheel", 1));
        c
    }

    #[test]
    fn test_model_pool() {
        let mut pool = ModelPool::new();
        pool.add("Rover", 1).add("Drone", 1).add("Rover", 2);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.total(), 4);
        assert_eq!(pool.iter().next(), Some((&Iri::new("Rover"), 3)));

        let collected: ModelPool = [("Rover", 3), ("Drone", 1)].into_iter().collect();
        assert_eq!(collected, pool);
        assert!(ModelPool::new().is_empty());
    }

    #[test]
    fn test_pool_restrictions_scale_and_join() {
        let c = catalog();
        let matcher = ResourceMatcher::new(&c);
        let pool = ModelPool::new().with("Rover", 2).with("Drone", 1);
        let combined = matcher.pool_restrictions(&pool, &c).unwrap();
        assert_eq!(
            combined,
            vec![
                Restriction::exact("has", "StereoCamera", 4),
                Restriction::exact("has", "Wheel", 8),
                Restriction::exact("has", "Lidar", 1),
                Restriction::max("uses", "Battery", 1),
            ]
        );

        let has_only = ResourceMatcher::new(&c).with_config(MatchConfig::default().with_property("has"));
        let combined = has_only.pool_restrictions(&pool, &c).unwrap();
        assert_eq!(combined.len(), 3);
    }

    #[test]
    fn test_pool_members_sum_as_intervals() {
        let mut c = ModelCatalog::new();
        c.add_restriction("Rover", Restriction::exact("has", "Wheel", 4))
            .add_restriction("Drone", Restriction::max("has", "Wheel", 2))
            .add_restriction("Drone", Restriction::min("has", "Rotor", 4))
            .add_restriction("Drive", Restriction::min("has", "Wheel", 4));
        let matcher = ResourceMatcher::new(&c);
        let rover = ModelPool::new().with("Rover", 1);
        let team = rover.clone().with("Drone", 1);

        let combined = matcher.pool_restrictions(&team, &c).unwrap();
        assert_eq!(
            combined,
            vec![
                Restriction::min("has", "Wheel", 4),
                Restriction::max("has", "Wheel", 6),
                Restriction::min("has", "Rotor", 4),
            ]
        );
        assert_eq!(compact(&combined, JoinOp::Sum).unwrap(), combined);

        let drive = [Iri::new("Drive")];
        assert_eq!(matcher.filter_supported_models(&rover, &drive, &c), drive);
        assert_eq!(matcher.filter_supported_models(&team, &drive, &c), drive);
    }

    #[test]
    fn test_zero_count_member_supplies_nothing() {
        let c = catalog();
        let matcher = ResourceMatcher::new(&c);
        let pool = ModelPool::new().with("Drone", 0);
        assert!(matcher.pool_restrictions(&pool, &c).unwrap().is_empty());
    }

    #[test]
    fn test_filter_supported_models() {
        let c = catalog();
        let matcher = ResourceMatcher::new(&c);
        let candidates: Vec<Iri> = ["Survey", "Photo", "Drive", "Convoy", "Broken", "Unknown"]
            .into_iter()
            .map(Iri::new)
            .collect();

        let rover = ModelPool::new().with("Rover", 1);
        let supported = matcher.filter_supported_models(&rover, &candidates, &c);
        assert_eq!(
            supported,
            vec![Iri::new("Photo"), Iri::new("Drive"), Iri::new("Unknown")]
        );

        let team = ModelPool::new().with("Rover", 2).with("Drone", 1);
        let supported = matcher.filter_supported_models(&team, &candidates, &c);
        assert_eq!(
            supported,
            vec![
                Iri::new("Survey"),
                Iri::new("Photo"),
                Iri::new("Drive"),
                Iri::new("Convoy"),
                Iri::new("Unknown"),
            ]
        );
    }

    #[test]
    fn test_is_supporting_reports_contradiction() {
        let c = catalog();
        let matcher = ResourceMatcher::new(&c);
        let provider = vec![Restriction::exact("has", "Wheel", 4)];
        let service = vec![
            Restriction::min("has", "Wheel", 5),
            Restriction::max("has", "Wheel", 3),
        ];
        assert!(matches!(
            matcher.is_supporting(&provider, &service),
            Err(MatchError::InvalidBound { .. })
        ));
    }

    #[test]
    fn test_join_op_controls_compaction() {
        let c = catalog();
        let required = vec![
            Restriction::min("has", "Wheel", 2),
            Restriction::min("has", "Wheel", 2),
        ];
        let available = vec![Restriction::exact("has", "Wheel", 3)];

        let summing = ResourceMatcher::new(&c);
        assert!(!summing.is_supporting(&available, &required).unwrap());

        let maxing =
            ResourceMatcher::new(&c).with_config(MatchConfig::default().with_join_op(JoinOp::Max));
        assert!(maxing.is_supporting(&available, &required).unwrap());
    }

    #[test]
    fn test_cancel_token() {
        let c = catalog();
        let cancel = Arc::new(AtomicBool::new(false));
        let matcher = ResourceMatcher::new(&c).with_cancel(cancel.clone());
        let required = vec![Restriction::min("has", "Camera", 1)];
        let available = vec![Restriction::exact("has", "StereoCamera", 2)];
        assert!(matcher.solve(&required, &available).is_ok());

        cancel.store(true, Ordering::Relaxed);
        assert!(matches!(
            matcher.solve(&required, &available),
            Err(MatchError::SearchAborted {
                status: SolverStatus::Cancelled
            })
        ));
    }

    struct AlwaysInfeasible;

    impl CpSolver for AlwaysInfeasible {
        fn solve_with_cancel(
            &self,
            _model: &CpModel,
            _config: &SolverConfig,
            _cancel: Option<Arc<AtomicBool>>,
        ) -> CpSolution {
            CpSolution::empty(SolverStatus::Infeasible)
        }
    }

    #[test]
    fn test_custom_solver() {
        let c = catalog();
        let matcher = ResourceMatcher::new(&c).with_solver(AlwaysInfeasible);
        let required = vec![Restriction::min("has", "Camera", 1)];
        let available = vec![Restriction::exact("has", "StereoCamera", 2)];
        assert!(!matcher.is_supporting(&available, &required).unwrap());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let c = catalog();
        let config =
            MatchConfig::default().with_solver(SolverConfig::default().with_time_limit_ms(0));
        let matcher = ResourceMatcher::new(&c).with_config(config);
        assert!(matches!(
            matcher.solve(&[], &[]),
            Err(MatchError::InvalidConfig(_))
        ));
    }
}
