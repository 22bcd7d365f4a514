//! End-to-end matching scenarios.
//!
//! Run with `RUST_LOG=u_resmatch=trace` to see the solver trace.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use u_resmatch::bound::{subtract_lists, to_model_bounds, ModelBound, SubtractMode};
use u_resmatch::cp::{SearchPolicy, SolverConfig, SolverStatus, ValueOrder};
use u_resmatch::matching::{MatchConfig, ModelCatalog, ModelPool, ResourceMatcher};
use u_resmatch::restriction::{compact, join, Iri, JoinOp, Restriction};
use u_resmatch::MatchError;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn derived_is_base(sub: &Iri, sup: &Iri) -> bool {
    sub.as_str() == "Derived" && sup.as_str() == "Base"
}

// =============================================================================
// Basic scenarios
// =============================================================================

#[test]
fn subtype_covers_requirement() {
    init_tracing();
    let matcher = ResourceMatcher::new(&derived_is_base);
    let required = vec![Restriction::exact("has", "Base", 2)];
    let available = vec![Restriction::exact("has", "Derived", 3)];

    let bounds = matcher.solve(&required, &available).unwrap();
    assert_eq!(bounds, vec![ModelBound::exact("Derived", 2)]);
}

#[test]
fn insufficient_quantity_has_no_solution() {
    init_tracing();
    let matcher = ResourceMatcher::new(&derived_is_base);
    let required = vec![Restriction::exact("has", "Base", 2)];
    let available = vec![Restriction::exact("has", "Base", 1)];

    assert_eq!(
        matcher.solve(&required, &available),
        Err(MatchError::NoSolutionFound)
    );
    assert!(!matcher.is_supporting(&available, &required).unwrap());
}

#[test]
fn unrelated_type_has_no_solution() {
    init_tracing();
    let matcher = ResourceMatcher::new(&derived_is_base);
    let required = vec![Restriction::exact("has", "Sibling", 2)];
    let available = vec![
        Restriction::exact("has", "Base", 5),
        Restriction::exact("has", "Derived", 5),
    ];

    assert!(matches!(
        matcher.solve(&required, &available),
        Err(MatchError::NoSolutionFound)
    ));
}

#[test]
fn supertype_does_not_cover_subtype_requirement() {
    let matcher = ResourceMatcher::new(&derived_is_base);
    let required = vec![Restriction::min("has", "Derived", 1)];
    let available = vec![Restriction::exact("has", "Base", 4)];

    assert!(!matcher.is_supporting(&available, &required).unwrap());
}

#[test]
fn requirements_from_unrelated_parents_accumulate() {
    let from_mapper = Restriction::min("has", "Camera", 1);
    let from_photographer = Restriction::min("has", "Camera", 1);

    let joined = join(&from_mapper, &from_photographer, JoinOp::Sum)
        .unwrap()
        .into_merged()
        .unwrap();
    assert_eq!(joined, Restriction::min("has", "Camera", 2));

    let compacted = compact(&[from_mapper, from_photographer], JoinOp::Sum).unwrap();
    assert_eq!(compacted, vec![Restriction::min("has", "Camera", 2)]);
}

// =============================================================================
// Multi-row assignments
// =============================================================================

#[test]
fn resources_are_not_double_counted() {
    let mut catalog = ModelCatalog::new();
    catalog.add_subclass("StereoCamera", "Camera");
    let matcher = ResourceMatcher::new(&catalog);

    let required = vec![
        Restriction::min("has", "Camera", 1),
        Restriction::min("has", "StereoCamera", 2),
    ];
    let enough = vec![Restriction::exact("has", "StereoCamera", 3)];
    let short = vec![Restriction::exact("has", "StereoCamera", 2)];

    let assignment = matcher.assign(&required, &enough).unwrap();
    assert_eq!(assignment.committed_to(0), 1);
    assert_eq!(assignment.committed_to(1), 2);
    assert_eq!(assignment.aggregated(), vec![ModelBound::exact("StereoCamera", 3)]);

    assert!(!matcher.is_supporting(&short, &required).unwrap());
}

#[test]
fn committed_units_can_be_released_from_the_pool() {
    let matcher = ResourceMatcher::new(&derived_is_base);
    let required = vec![Restriction::exact("has", "Base", 2)];
    let available = vec![Restriction::exact("has", "Derived", 3)];

    let committed = matcher.assign(&required, &available).unwrap().aggregated();
    let pool = to_model_bounds(&available).unwrap();
    let remaining = subtract_lists(&pool, &committed, SubtractMode::Strict).unwrap();
    assert_eq!(remaining, vec![ModelBound::exact("Derived", 1)]);

    // A second identical request no longer fits.
    let over = subtract_lists(&remaining, &committed, SubtractMode::Strict);
    assert!(matches!(over, Err(MatchError::InvalidBound { .. })));
    let best_effort = subtract_lists(&remaining, &committed, SubtractMode::RemoveNegative).unwrap();
    assert!(best_effort.is_empty());
}

#[test]
fn optimal_policy_commits_the_minimum() {
    let mut catalog = ModelCatalog::new();
    catalog.add_subclass("StereoCamera", "Camera");
    let required = vec![Restriction::min("has", "Camera", 1)];
    let available = vec![Restriction::exact("has", "StereoCamera", 3)];

    let solver = SolverConfig::default()
        .with_policy(SearchPolicy::Optimal)
        .with_value_order(ValueOrder::Max);
    let matcher =
        ResourceMatcher::new(&catalog).with_config(MatchConfig::default().with_solver(solver));

    let assignment = matcher.assign(&required, &available).unwrap();
    assert_eq!(assignment.status(), SolverStatus::Optimal);
    assert_eq!(assignment.solution_bounds(), vec![ModelBound::exact("StereoCamera", 1)]);
}

#[test]
fn random_split_is_reproducible_with_seed() {
    let mut catalog = ModelCatalog::new();
    catalog
        .add_subclass("StereoCamera", "Camera")
        .add_subclass("MonoCamera", "Camera");
    let required = vec![Restriction::min("has", "Camera", 3)];
    let available = vec![
        Restriction::exact("has", "StereoCamera", 2),
        Restriction::exact("has", "MonoCamera", 2),
    ];

    let solver = SolverConfig::default()
        .with_value_order(ValueOrder::RandomSplit)
        .with_seed(7);
    let matcher =
        ResourceMatcher::new(&catalog).with_config(MatchConfig::default().with_solver(solver));

    let first = matcher.assign(&required, &available).unwrap();
    let second = matcher.assign(&required, &available).unwrap();
    assert_eq!(first, second);
    assert!(first.committed_to(0) >= 3);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn contradictory_requirements_are_errors_not_infeasibility() {
    let matcher = ResourceMatcher::new(&derived_is_base);
    let required = vec![
        Restriction::exact("has", "Base", 2),
        Restriction::max("has", "Base", 1),
    ];
    let available = vec![Restriction::exact("has", "Base", 5)];

    let result = matcher.is_supporting(&available, &required);
    assert!(matches!(result, Err(MatchError::InvalidBound { .. })));
}

#[test]
fn cancelled_search_is_aborted() {
    let cancel = Arc::new(AtomicBool::new(true));
    let matcher = ResourceMatcher::new(&derived_is_base).with_cancel(cancel);
    let required = vec![Restriction::exact("has", "Base", 2)];
    let available = vec![Restriction::exact("has", "Derived", 3)];

    assert_eq!(
        matcher.solve(&required, &available),
        Err(MatchError::SearchAborted {
            status: SolverStatus::Cancelled
        })
    );
}

// =============================================================================
// Pools and candidate filtering
// =============================================================================

fn robot_catalog() -> ModelCatalog {
    let mut c = ModelCatalog::new();
    c.add_subclass("StereoCamera", "Camera")
        .add_subclass("Camera", "Sensor")
        .add_subclass("Lidar", "Sensor")
        .add_subclass("Inspection", "Mapping")
        .add_subclass("Inspection", "Photography")
        .add_restriction("Rover", Restriction::exact("has", "StereoCamera", 1))
        .add_restriction("Rover", Restriction::exact("has", "Wheel", 4))
        .add_restriction("Drone", Restriction::exact("has", "Lidar", 1))
        .add_restriction("Drone", Restriction::exact("has", "Camera", 1))
        .add_restriction("Mapping", Restriction::min("has", "Sensor", 2))
        .add_restriction("Photography", Restriction::min("has", "Camera", 1))
        .add_restriction("Traverse", Restriction::min("has", "Wheel", 4));
    c
}

#[test]
fn pool_supports_models_it_can_cover() {
    init_tracing();
    let catalog = robot_catalog();
    let matcher = ResourceMatcher::new(&catalog);
    let candidates: Vec<Iri> = ["Mapping", "Photography", "Traverse"]
        .into_iter()
        .map(Iri::new)
        .collect();

    let rover = ModelPool::new().with("Rover", 1);
    assert_eq!(
        matcher.filter_supported_models(&rover, &candidates, &catalog),
        vec![Iri::new("Photography"), Iri::new("Traverse")]
    );

    let rover_and_drone = ModelPool::new().with("Rover", 1).with("Drone", 1);
    assert_eq!(
        matcher.filter_supported_models(&rover_and_drone, &candidates, &catalog),
        candidates
    );
}

#[test]
fn inherited_requirements_are_checked_against_pool() {
    let catalog = robot_catalog();
    let matcher = ResourceMatcher::new(&catalog);

    // Mapping needs 2 sensors, Photography 1 camera; together 3 units.
    let inspection = catalog
        .inherited_restrictions(&Iri::new("Inspection"), None, JoinOp::Sum)
        .unwrap();

    let one_each = ModelPool::new().with("Rover", 1).with("Drone", 1);
    let provided = matcher.pool_restrictions(&one_each, &catalog).unwrap();
    assert!(matcher.is_supporting(&provided, &inspection).unwrap());

    let two_rovers = ModelPool::new().with("Rover", 2);
    let provided = matcher.pool_restrictions(&two_rovers, &catalog).unwrap();
    assert!(!matcher.is_supporting(&provided, &inspection).unwrap());
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_filter_matches_sequential() {
    let catalog = robot_catalog();
    let candidates: Vec<Iri> = ["Mapping", "Photography", "Traverse", "Unknown"]
        .into_iter()
        .map(Iri::new)
        .collect();
    let pool = ModelPool::new().with("Rover", 1);

    let sequential = ResourceMatcher::new(&catalog);
    let parallel =
        ResourceMatcher::new(&catalog).with_config(MatchConfig::default().with_parallel(true));

    assert_eq!(
        sequential.filter_supported_models(&pool, &candidates, &catalog),
        parallel.filter_supported_models(&pool, &candidates, &catalog)
    );
}
