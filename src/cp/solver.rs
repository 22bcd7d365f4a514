//! CP solver interface and depth-first reference implementation.

use super::model::{CpModel, Constraint, Objective, Relation};
use crate::error::{MatchError, Result};
use rand::Rng;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};
use u_numflow::random::create_rng;

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible (but not necessarily optimal) solution found.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// Model or configuration is invalid.
    ModelInvalid,
    /// Solver exceeded time limit.
    Timeout,
    /// Solver exceeded its node budget.
    NodeLimit,
    /// Cancelled through the cancellation token.
    Cancelled,
}

/// When the search may stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPolicy {
    /// Accept the first feasible assignment; the objective is ignored.
    #[default]
    FirstFeasible,
    /// Branch and bound on the model objective until optimality is proven.
    Optimal,
}

/// Which unfixed variable to branch on next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarOrder {
    /// First unfixed variable in model order.
    #[default]
    InputOrder,
    /// Unfixed variable with the smallest domain.
    SmallestDomain,
    /// Unfixed variable with the largest domain.
    LargestDomain,
}

/// How the domain of the branching variable is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueOrder {
    /// `x = min` first, then `x > min`.
    #[default]
    Min,
    /// `x = max` first, then `x < max`.
    Max,
    /// Lower half first.
    SplitMin,
    /// Upper half first.
    SplitMax,
    /// Split at a random point, lower part first.
    RandomSplit,
}

/// Solution from a CP solver.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective function value (if any).
    pub objective_value: Option<i64>,
    /// Integer variable assignments.
    pub int_vars: HashMap<String, i64>,
    /// Number of search nodes explored.
    pub nodes: u64,
    /// Solve time in milliseconds.
    pub solve_time_ms: i64,
}

impl CpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            int_vars: HashMap::new(),
            nodes: 0,
            solve_time_ms: 0,
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    /// Value assigned to a variable.
    pub fn value(&self, name: &str) -> Option<i64> {
        self.int_vars.get(name).copied()
    }
}

/// Solver configuration.
///
/// # Examples
///
/// ```
/// use u_resmatch::cp::{SearchPolicy, SolverConfig, ValueOrder, VarOrder};
///
/// let config = SolverConfig::default()
///     .with_policy(SearchPolicy::Optimal)
///     .with_var_order(VarOrder::SmallestDomain)
///     .with_value_order(ValueOrder::SplitMin)
///     .with_time_limit_ms(500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum solve time in milliseconds.
    pub time_limit_ms: i64,
    /// Maximum number of search nodes. 0 = no limit.
    pub node_limit: u64,
    /// Stop policy.
    pub policy: SearchPolicy,
    /// Variable selection heuristic.
    pub var_order: VarOrder,
    /// Value selection heuristic.
    pub value_order: ValueOrder,
    /// Random seed for [`ValueOrder::RandomSplit`].
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 60_000,
            node_limit: 0,
            policy: SearchPolicy::FirstFeasible,
            var_order: VarOrder::InputOrder,
            value_order: ValueOrder::Min,
            seed: None,
        }
    }
}

impl SolverConfig {
    /// Sets the wall-clock limit in milliseconds.
    pub fn with_time_limit_ms(mut self, ms: i64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Sets the node limit; `0` disables it.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = nodes;
        self
    }

    /// Sets the stopping rule.
    pub fn with_policy(mut self, policy: SearchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets which open variable is branched on first.
    pub fn with_var_order(mut self, order: VarOrder) -> Self {
        self.var_order = order;
        self
    }

    /// Sets how a domain is split when branching.
    pub fn with_value_order(mut self, order: ValueOrder) -> Self {
        self.value_order = order;
        self
    }

    /// Sets the seed used by [`ValueOrder::RandomSplit`].
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.time_limit_ms <= 0 {
            return Err(MatchError::InvalidConfig(format!(
                "time_limit_ms must be positive, got {}",
                self.time_limit_ms
            )));
        }
        Ok(())
    }
}

/// Trait for CP solver implementations.
///
/// Implementors provide the actual constraint solving logic. This can wrap
/// external solvers or use the bundled [`DfsSolver`].
pub trait CpSolver: Send + Sync {
    /// Solves the model and returns a solution.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        self.solve_with_cancel(model, config, None)
    }

    /// Solves the model, stopping early once `cancel` is set to `true`.
    fn solve_with_cancel(
        &self,
        model: &CpModel,
        config: &SolverConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> CpSolution;
}

/// Depth-first search with bounds propagation.
///
/// Domains are intervals. Before every branching step each linear
/// constraint is revised until a fixpoint; branching then narrows one
/// unfixed variable according to [`VarOrder`] and [`ValueOrder`]. Under
/// [`SearchPolicy::Optimal`] every solution adds a cut requiring a strictly
/// better objective.
///
/// # Examples
///
/// ```
/// use u_resmatch::cp::{CpModel, CpSolver, DfsSolver, IntVar, Relation, SolverConfig};
///
/// let mut model = CpModel::new("pair", 5);
/// model.add_int_var(IntVar::new("x", 0, 5));
/// model.add_int_var(IntVar::new("y", 0, 2));
/// model.add_sum(vec!["x".into(), "y".into()], Relation::Eq, 6);
///
/// let solution = DfsSolver::new().solve(&model, &SolverConfig::default());
/// assert!(solution.is_solution_found());
/// assert_eq!(solution.value("x").unwrap() + solution.value("y").unwrap(), 6);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DfsSolver;

impl DfsSolver {
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for DfsSolver {
    fn solve_with_cancel(
        &self,
        model: &CpModel,
        config: &SolverConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> CpSolution {
        if let Err(e) = config.validate().and_then(|_| model.validate()) {
            warn!(model = %model.name, error = %e, "refusing to solve");
            return CpSolution::empty(SolverStatus::ModelInvalid);
        }

        let started = Instant::now();
        let (root, constraints) = compile(model);
        let objective = model.objective.as_ref().map(|o| compile_objective(model, o));

        let mut search = Search {
            config,
            cancel,
            constraints,
            objective,
            cut: None,
            started,
            nodes: 0,
            best: None,
            stopped: None,
        };

        let mut rng = create_rng(config.seed.unwrap_or(42));
        search.run(root, &mut rng);

        let status = match (search.stopped, &search.best, config.policy) {
            (Some(_), Some(_), _) => SolverStatus::Feasible,
            (Some(stop), None, _) => stop,
            (None, Some(_), SearchPolicy::Optimal) => SolverStatus::Optimal,
            (None, Some(_), SearchPolicy::FirstFeasible) => SolverStatus::Feasible,
            (None, None, _) => SolverStatus::Infeasible,
        };

        let mut solution = CpSolution::empty(status);
        solution.nodes = search.nodes;
        solution.solve_time_ms = started.elapsed().as_millis() as i64;
        if let Some((values, _)) = search.best {
            solution.int_vars = model
                .int_vars
                .iter()
                .zip(values)
                .map(|(var, v)| (var.name.clone(), v))
                .collect();
            solution.objective_value = model
                .objective
                .as_ref()
                .map(|o| o.evaluate(&solution.int_vars));
        }

        debug!(
            model = %model.name,
            vars = model.var_count(),
            constraints = model.constraint_count(),
            ?status,
            nodes = solution.nodes,
            elapsed_ms = solution.solve_time_ms,
            "search finished"
        );
        solution
    }
}

type Domains = Vec<(i64, i64)>;

/// `sum(coef * x) <= rhs` over variable indices.
#[derive(Debug, Clone)]
struct Linear {
    terms: Vec<(usize, i64)>,
    rhs: i64,
}

/// Lowers the model into interval domains and `<=` constraints.
///
/// Expects a validated model.
fn compile(model: &CpModel) -> (Domains, Vec<Linear>) {
    let mut domains: Domains = model
        .int_vars
        .iter()
        .map(|v| {
            let (lo, hi) = v.bounds();
            (lo, hi.min(model.upper_bound))
        })
        .collect();
    let mut linear = Vec::new();

    for c in &model.constraints {
        match c {
            Constraint::Bounds { var, min, max } => {
                if let Some(i) = model.var_index(var) {
                    let d = &mut domains[i];
                    d.0 = d.0.max(*min);
                    d.1 = d.1.min(*max);
                }
            }
            Constraint::Sum {
                vars,
                relation,
                rhs,
            } => {
                let idx: Vec<usize> = vars.iter().filter_map(|n| model.var_index(n)).collect();
                let le = Linear {
                    terms: idx.iter().map(|&i| (i, 1)).collect(),
                    rhs: *rhs,
                };
                let ge = Linear {
                    terms: idx.iter().map(|&i| (i, -1)).collect(),
                    rhs: -rhs,
                };
                match relation {
                    Relation::Le => linear.push(le),
                    Relation::Ge => linear.push(ge),
                    Relation::Eq => {
                        linear.push(le);
                        linear.push(ge);
                    }
                }
            }
        }
    }

    (domains, linear)
}

/// Objective terms in minimization form.
fn compile_objective(model: &CpModel, objective: &Objective) -> Vec<(usize, i64)> {
    let sign = match objective {
        Objective::Minimize { .. } => 1,
        Objective::Maximize { .. } => -1,
    };
    objective
        .terms()
        .iter()
        .filter_map(|(name, coef)| model.var_index(name).map(|i| (i, sign * coef)))
        .collect()
}

struct Search<'a> {
    config: &'a SolverConfig,
    cancel: Option<Arc<AtomicBool>>,
    constraints: Vec<Linear>,
    objective: Option<Vec<(usize, i64)>>,
    cut: Option<Linear>,
    started: Instant,
    nodes: u64,
    best: Option<(Vec<i64>, i64)>,
    stopped: Option<SolverStatus>,
}

impl Search<'_> {
    fn run<R: Rng>(&mut self, root: Domains, rng: &mut R) {
        let mut stack = vec![root];

        while let Some(mut domains) = stack.pop() {
            if let Some(status) = self.limit_reached() {
                self.stopped = Some(status);
                break;
            }
            self.nodes += 1;

            if !self.propagate(&mut domains) {
                continue;
            }

            let Some(var) = self.select_var(&domains) else {
                let values: Vec<i64> = domains.iter().map(|&(lo, _)| lo).collect();
                let cost = self.cost(&values);
                trace!(nodes = self.nodes, cost, "solution found");
                self.best = Some((values, cost));

                match (&self.objective, self.config.policy) {
                    (Some(terms), SearchPolicy::Optimal) => {
                        self.cut = Some(Linear {
                            terms: terms.clone(),
                            rhs: cost - 1,
                        });
                    }
                    _ => break,
                }
                continue;
            };

            let (first, second) = self.split(domains, var, rng);
            stack.push(second);
            stack.push(first);
        }
    }

    fn limit_reached(&self) -> Option<SolverStatus> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Some(SolverStatus::Cancelled);
            }
        }
        if self.config.node_limit > 0 && self.nodes >= self.config.node_limit {
            return Some(SolverStatus::NodeLimit);
        }
        if self.nodes % 256 == 0
            && self.started.elapsed().as_millis() as i64 >= self.config.time_limit_ms
        {
            return Some(SolverStatus::Timeout);
        }
        None
    }

    /// Revises all constraints to a fixpoint; `false` on a wipe-out.
    fn propagate(&self, domains: &mut Domains) -> bool {
        if domains.iter().any(|&(lo, hi)| lo > hi) {
            return false;
        }
        loop {
            let mut changed = false;
            for c in self.constraints.iter().chain(self.cut.as_ref()) {
                match revise(c, domains) {
                    Some(ch) => changed |= ch,
                    None => return false,
                }
            }
            if !changed {
                return true;
            }
        }
    }

    fn select_var(&self, domains: &Domains) -> Option<usize> {
        let mut open = domains
            .iter()
            .enumerate()
            .filter(|(_, &(lo, hi))| lo < hi)
            .map(|(i, &(lo, hi))| (i, hi - lo));

        match self.config.var_order {
            VarOrder::InputOrder => open.next().map(|(i, _)| i),
            VarOrder::SmallestDomain => open.min_by_key(|&(i, size)| (size, i)).map(|(i, _)| i),
            VarOrder::LargestDomain => open
                .min_by_key(|&(i, size)| (Reverse(size), i))
                .map(|(i, _)| i),
        }
    }

    /// Splits the domain of `var` into two children, preferred one first.
    fn split<R: Rng>(&self, domains: Domains, var: usize, rng: &mut R) -> (Domains, Domains) {
        let (lo, hi) = domains[var];
        let mid = lo + (hi - lo) / 2;
        let (a, b) = match self.config.value_order {
            ValueOrder::Min => ((lo, lo), (lo + 1, hi)),
            ValueOrder::Max => ((hi, hi), (lo, hi - 1)),
            ValueOrder::SplitMin => ((lo, mid), (mid + 1, hi)),
            ValueOrder::SplitMax => ((mid + 1, hi), (lo, mid)),
            ValueOrder::RandomSplit => {
                let v = rng.random_range(lo..hi);
                ((lo, v), (v + 1, hi))
            }
        };
        let mut first = domains.clone();
        first[var] = a;
        let mut second = domains;
        second[var] = b;
        (first, second)
    }

    fn cost(&self, values: &[i64]) -> i64 {
        self.objective
            .as_ref()
            .map(|terms| terms.iter().map(|&(i, k)| k * values[i]).sum())
            .unwrap_or(0)
    }
}

/// Bounds-consistency revision of one `<=` constraint.
///
/// Returns `None` if the constraint cannot be satisfied, otherwise whether
/// a domain changed.
fn revise(c: &Linear, domains: &mut Domains) -> Option<bool> {
    let min_sum: i64 = c
        .terms
        .iter()
        .map(|&(i, k)| if k > 0 { k * domains[i].0 } else { k * domains[i].1 })
        .sum();
    if min_sum > c.rhs {
        return None;
    }

    let mut changed = false;
    for &(i, k) in &c.terms {
        let (lo, hi) = domains[i];
        let own = if k > 0 { k * lo } else { k * hi };
        let slack = c.rhs - (min_sum - own);
        if k > 0 {
            let new_hi = floor_div(slack, k);
            if new_hi < hi {
                if new_hi < lo {
                    return None;
                }
                domains[i].1 = new_hi;
                changed = true;
            }
        } else if k < 0 {
            let new_lo = ceil_div(slack, k);
            if new_lo > lo {
                if new_lo > hi {
                    return None;
                }
                domains[i].0 = new_lo;
                changed = true;
            }
        }
    }
    Some(changed)
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn ceil_div(a: i64, b: i64) -> i64 {
    -floor_div(-a, b)
}
