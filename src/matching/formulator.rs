//! Assignment-matrix formulation and solution extraction.

use super::oracle::SubsumptionOracle;
use crate::bound::{max_of, ModelBound};
use crate::cp::{
    CpModel, CpSolution, CpSolver, IntVar, Objective, Relation, SolverConfig, SolverStatus,
};
use crate::error::{MatchError, Result};
use crate::restriction::Iri;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, trace};

/// Assignment-matrix CSP between required and available model bounds.
///
/// Rows are required bounds, columns available bounds. Cell `x[r][a]` is
/// the number of units of column `a` committed to row `r`:
///
/// - a cell is open (`0 ..= min(required.max, available.max)`) when the
///   column model equals the row model or is a subclass of it, otherwise it
///   is forced to zero;
/// - every row receives at least `required.min` units;
/// - no column gives away more than `available.max` units.
///
/// The model also carries the objective "minimize committed units", which
/// only matters under [`SearchPolicy::Optimal`](crate::cp::SearchPolicy::Optimal).
///
/// # Examples
///
/// ```
/// use u_resmatch::bound::ModelBound;
/// use u_resmatch::cp::{DfsSolver, SolverConfig};
/// use u_resmatch::matching::ResourceMatch;
/// use u_resmatch::restriction::Iri;
///
/// let oracle = |sub: &Iri, sup: &Iri| sub.as_str() == "Derived" && sup.as_str() == "Base";
/// let required = vec![ModelBound::exact("Base", 2)];
/// let available = vec![ModelBound::exact("Derived", 3)];
///
/// let matching = ResourceMatch::formulate(&required, &available, &oracle);
/// let assignment = matching
///     .solve(&DfsSolver::new(), &SolverConfig::default(), None)
///     .unwrap();
/// assert_eq!(assignment.solution_bounds(), vec![ModelBound::exact("Derived", 2)]);
/// ```
#[derive(Debug, Clone)]
pub struct ResourceMatch {
    required: Vec<ModelBound>,
    available: Vec<ModelBound>,
    compatible: Vec<Vec<bool>>,
    model: CpModel,
}

impl ResourceMatch {
    /// Builds the CSP for `required` against `available`.
    pub fn formulate<O>(required: &[ModelBound], available: &[ModelBound], oracle: &O) -> Self
    where
        O: SubsumptionOracle + ?Sized,
    {
        let upper = max_of(required).max(max_of(available)) as i64;
        let mut model = CpModel::new("resource-match", upper);
        let mut compatible = vec![vec![false; available.len()]; required.len()];

        for (r, req) in required.iter().enumerate() {
            for (a, avail) in available.iter().enumerate() {
                let name = Self::var_name(r, a);
                model.add_int_var(IntVar::new(name.clone(), 0, upper));

                let ok = avail.model == req.model || oracle.is_subclass_of(&avail.model, &req.model);
                compatible[r][a] = ok;
                let cap = if ok { req.max.min(avail.max) as i64 } else { 0 };
                trace!(row = r, col = a, required = %req.model, available = %avail.model, cap, "cell");
                model.add_bounds(name, 0, cap);
            }
        }

        for (r, req) in required.iter().enumerate() {
            let row = (0..available.len()).map(|a| Self::var_name(r, a)).collect();
            model.add_sum(row, Relation::Ge, req.min as i64);
        }
        for (a, avail) in available.iter().enumerate() {
            let col = (0..required.len()).map(|r| Self::var_name(r, a)).collect();
            model.add_sum(col, Relation::Le, avail.max as i64);
        }

        let terms = model.int_vars.iter().map(|v| (v.name.clone(), 1)).collect();
        model.set_objective(Objective::Minimize { terms });

        debug!(
            rows = required.len(),
            cols = available.len(),
            open_cells = compatible.iter().flatten().filter(|&&c| c).count(),
            upper,
            "formulated resource match"
        );

        Self {
            required: required.to_vec(),
            available: available.to_vec(),
            compatible,
            model,
        }
    }

    /// Name of the decision variable for cell (`row`, `col`).
    pub fn var_name(row: usize, col: usize) -> String {
        format!("x_{row}_{col}")
    }

    /// The generated CP model.
    pub fn model(&self) -> &CpModel {
        &self.model
    }

    pub fn required(&self) -> &[ModelBound] {
        &self.required
    }

    pub fn available(&self) -> &[ModelBound] {
        &self.available
    }

    /// Whether column `col` may contribute to row `row`.
    pub fn is_compatible(&self, row: usize, col: usize) -> bool {
        self.compatible
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    /// Runs `solver` on the model and extracts the assignment.
    ///
    /// # Errors
    ///
    /// - [`MatchError::NoSolutionFound`] if the model is infeasible.
    /// - [`MatchError::SearchAborted`] on timeout, node limit or
    ///   cancellation without a solution.
    /// - [`MatchError::InvalidModel`] if the solver rejects the model or
    ///   its configuration.
    pub fn solve<S>(
        &self,
        solver: &S,
        config: &SolverConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<Assignment>
    where
        S: CpSolver + ?Sized,
    {
        let solution = solver.solve_with_cancel(&self.model, config, cancel);
        match solution.status {
            SolverStatus::Optimal | SolverStatus::Feasible => {
                Ok(Assignment::from_solution(self, &solution))
            }
            SolverStatus::Infeasible => Err(MatchError::NoSolutionFound),
            SolverStatus::ModelInvalid => Err(MatchError::InvalidModel(format!(
                "solver rejected model {}",
                self.model.name
            ))),
            status => Err(MatchError::SearchAborted { status }),
        }
    }
}

/// One nonzero cell of a solved assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentCell {
    /// Row index into the required bounds.
    pub required: usize,
    /// Column index into the available bounds.
    pub available: usize,
    /// Model of the available column.
    pub model: Iri,
    /// Units committed.
    pub count: u32,
}

/// A solved resource assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    cells: Vec<AssignmentCell>,
    status: SolverStatus,
}

impl Assignment {
    /// Reads the nonzero cells of `solution`, column by column.
    ///
    /// Cells missing from the solution count as zero.
    pub fn from_solution(matching: &ResourceMatch, solution: &CpSolution) -> Self {
        let mut cells = Vec::new();
        for (a, avail) in matching.available.iter().enumerate() {
            for r in 0..matching.required.len() {
                let value = solution
                    .value(&ResourceMatch::var_name(r, a))
                    .and_then(|v| u32::try_from(v).ok())
                    .unwrap_or(0);
                if value > 0 {
                    cells.push(AssignmentCell {
                        required: r,
                        available: a,
                        model: avail.model.clone(),
                        count: value,
                    });
                }
            }
        }
        Self {
            cells,
            status: solution.status,
        }
    }

    /// Nonzero cells with their row and column attribution.
    pub fn cells(&self) -> &[AssignmentCell] {
        &self.cells
    }

    /// Status the solver reported.
    pub fn status(&self) -> SolverStatus {
        self.status
    }

    /// One exact bound per nonzero cell, keyed by the available model.
    ///
    /// The same model appears more than once when its units serve several
    /// requirements; see [`Assignment::aggregated`] for per-model totals.
    pub fn solution_bounds(&self) -> Vec<ModelBound> {
        self.cells
            .iter()
            .map(|c| ModelBound::exact(c.model.clone(), c.count))
            .collect()
    }

    /// Total units committed per available model.
    pub fn aggregated(&self) -> Vec<ModelBound> {
        let mut out: Vec<ModelBound> = Vec::new();
        for c in &self.cells {
            match out.iter_mut().find(|b| b.model == c.model) {
                Some(b) => {
                    b.min += c.count;
                    b.max += c.count;
                }
                None => out.push(ModelBound::exact(c.model.clone(), c.count)),
            }
        }
        out
    }

    /// Total units committed to required row `row`.
    pub fn committed_to(&self, row: usize) -> u32 {
        self.cells
            .iter()
            .filter(|c| c.required == row)
            .map(|c| c.count)
            .sum()
    }

    /// Whether nothing had to be committed.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
