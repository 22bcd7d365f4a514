//! CP model definition.

use super::variables::IntVar;
use crate::error::{MatchError, Result};
use std::collections::HashMap;

/// Relation of a linear sum to its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `sum <= rhs`
    Le,
    /// `sum >= rhs`
    Ge,
    /// `sum == rhs`
    Eq,
}

/// A constraint in the CP model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Narrows the domain of a single variable to `[min, max]`.
    Bounds {
        /// Constrained variable.
        var: String,
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },

    /// Unit-coefficient linear constraint: `sum(vars) <relation> rhs`.
    Sum {
        /// Names of the summed variables.
        vars: Vec<String>,
        /// Comparison with `rhs`.
        relation: Relation,
        /// Right-hand side.
        rhs: i64,
    },
}

/// Objective function for the CP model.
///
/// Only consulted by solvers running with
/// [`SearchPolicy::Optimal`](super::SearchPolicy::Optimal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Objective {
    /// Minimize a linear combination of integer variables.
    Minimize {
        /// (variable_name, coefficient) pairs.
        terms: Vec<(String, i64)>,
    },

    /// Maximize a linear combination of integer variables.
    Maximize {
        /// (variable_name, coefficient) pairs.
        terms: Vec<(String, i64)>,
    },
}

impl Objective {
    /// The objective terms.
    pub fn terms(&self) -> &[(String, i64)] {
        match self {
            Objective::Minimize { terms } | Objective::Maximize { terms } => terms,
        }
    }

    /// Evaluates the objective on an assignment; unknown names count as 0.
    pub fn evaluate(&self, values: &HashMap<String, i64>) -> i64 {
        self.terms()
            .iter()
            .map(|(name, coef)| coef * values.get(name).copied().unwrap_or(0))
            .sum()
    }
}

/// A constraint programming model over integer variables.
///
/// Variables keep their insertion order, which solvers use as the default
/// branching order.
///
/// # Examples
///
/// ```
/// use u_resmatch::cp::{CpModel, IntVar, Relation};
///
/// let mut model = CpModel::new("example", 10);
/// model.add_int_var(IntVar::new("x", 0, 10));
/// model.add_int_var(IntVar::new("y", 0, 10));
/// model.add_sum(vec!["x".into(), "y".into()], Relation::Ge, 4);
/// model.add_bounds("x".into(), 0, 1);
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Integer variables, in insertion order.
    pub int_vars: Vec<IntVar>,
    /// Constraints.
    pub constraints: Vec<Constraint>,
    /// Objective function.
    pub objective: Option<Objective>,
    /// Global upper bound of every variable domain.
    pub upper_bound: i64,
    index: HashMap<String, usize>,
}

impl CpModel {
    /// Creates a new empty model.
    pub fn new(name: impl Into<String>, upper_bound: i64) -> Self {
        Self {
            name: name.into(),
            int_vars: Vec::new(),
            constraints: Vec::new(),
            objective: None,
            upper_bound,
            index: HashMap::new(),
        }
    }

    /// Adds an integer variable, replacing one with the same name.
    pub fn add_int_var(&mut self, var: IntVar) {
        match self.index.get(&var.name) {
            Some(&i) => self.int_vars[i] = var,
            None => {
                self.index.insert(var.name.clone(), self.int_vars.len());
                self.int_vars.push(var);
            }
        }
    }

    /// Looks up a variable by name.
    pub fn int_var(&self, name: &str) -> Option<&IntVar> {
        self.index.get(name).map(|&i| &self.int_vars[i])
    }

    /// Position of a variable in [`CpModel::int_vars`].
    pub fn var_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Convenience: add a bounds constraint.
    pub fn add_bounds(&mut self, var: String, min: i64, max: i64) {
        self.constraints.push(Constraint::Bounds { var, min, max });
    }

    /// Convenience: add a sum constraint.
    pub fn add_sum(&mut self, vars: Vec<String>, relation: Relation, rhs: i64) {
        self.constraints.push(Constraint::Sum {
            vars,
            relation,
            rhs,
        });
    }

    /// Sets the objective function.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Validates the model for consistency.
    ///
    /// Checks that all referenced variable names exist and that no
    /// variable domain exceeds `[.., upper_bound]`.
    pub fn validate(&self) -> Result<()> {
        for var in &self.int_vars {
            if var.max > self.upper_bound {
                return Err(MatchError::InvalidModel(format!(
                    "variable {} exceeds upper bound {}",
                    var.name, self.upper_bound
                )));
            }
        }
        for constraint in &self.constraints {
            match constraint {
                Constraint::Bounds { var, .. } => self.check_var(var)?,
                Constraint::Sum { vars, .. } => {
                    for name in vars {
                        self.check_var(name)?;
                    }
                }
            }
        }
        if let Some(objective) = &self.objective {
            for (name, _) in objective.terms() {
                self.check_var(name)?;
            }
        }
        Ok(())
    }

    fn check_var(&self, name: &str) -> Result<()> {
        if self.index.contains_key(name) {
            Ok(())
        } else {
            Err(MatchError::InvalidModel(format!("undefined variable: {name}")))
        }
    }

    /// Returns the number of integer variables.
    pub fn var_count(&self) -> usize {
        self.int_vars.len()
    }

    /// Returns the number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}
