//! Solve facility: hands a parameterized program to a good_lp backend and maps
//! the outcome to a status / termination pair.

use std::str::FromStr;

use good_lp::{
    constraint, default_solver, variable, Constraint, Expression, ProblemVariables,
    ResolutionError, Solution, SolverModel, Variable,
};
use serde::Serialize;
use strum::{Display, EnumString, VariantNames};
use tracing::{debug, warn};

use super::model::{ParameterizedProgram, Trajectory};
use crate::domain::Sense;
use crate::error::ConfigError;

/// LP backends known by name.
///
/// `minilp` runs good_lp's bundled pure-Rust default solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum SolverBackend {
    Minilp,
    Cbc,
}

impl SolverBackend {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::from_str(name).map_err(|_| ConfigError::NotFound {
            kind: "solver",
            name: name.to_string(),
            available: Self::VARIANTS.to_vec(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SolverStatus {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminationCondition {
    Optimal,
    Infeasible,
    Unbounded,
    SolverUnavailable,
    Error,
}

/// Outcome of one look-ahead solve.
///
/// `objective` and `trajectory` are only present when the solver produced values.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverReport {
    pub status: SolverStatus,
    pub termination: TerminationCondition,
    pub objective: Option<f64>,
    pub trajectory: Option<Trajectory>,
}

impl SolverReport {
    pub fn is_optimal(&self) -> bool {
        self.status == SolverStatus::Ok && self.termination == TerminationCondition::Optimal
    }
}

/// Raw result of the backend: per-variable values on success.
#[derive(Debug, Clone, PartialEq)]
pub struct LpOutcome {
    pub status: SolverStatus,
    pub termination: TerminationCondition,
    pub values: Option<Vec<f64>>,
}

impl LpOutcome {
    fn failed(status: SolverStatus, termination: TerminationCondition) -> Self {
        Self {
            status,
            termination,
            values: None,
        }
    }
}

pub fn solve_program(backend: SolverBackend, program: &ParameterizedProgram<'_>) -> LpOutcome {
    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = program
        .bounds
        .iter()
        .map(|&(lo, hi)| vars.add(variable().min(lo).max(hi)))
        .collect();

    let objective: Expression = program
        .objective
        .iter()
        .zip(&handles)
        .filter(|(c, _)| **c != 0.0)
        .map(|(c, v)| *c * *v)
        .sum();

    let rows: Vec<Constraint> = program
        .rows
        .iter()
        .map(|&(terms, rhs)| {
            let lhs: Expression = terms.iter().map(|&(j, c)| c * handles[j]).sum();
            constraint!(lhs == rhs)
        })
        .collect();

    debug!(
        backend = %backend,
        variables = handles.len(),
        constraints = rows.len(),
        sense = %program.sense,
        "solving look-ahead program"
    );

    let unsolved = match program.sense {
        Sense::Maximize => vars.maximise(objective),
        Sense::Minimize => vars.minimise(objective),
    };

    match backend {
        SolverBackend::Minilp => run(unsolved.using(default_solver), rows, &handles),
        #[cfg(feature = "cbc")]
        SolverBackend::Cbc => {
            let mut model = unsolved.using(good_lp::solvers::coin_cbc::coin_cbc);
            model.set_parameter("log", "0");
            run(model, rows, &handles)
        }
        #[cfg(not(feature = "cbc"))]
        SolverBackend::Cbc => {
            warn!("cbc backend requested but this build has no `cbc` feature");
            LpOutcome::failed(SolverStatus::Error, TerminationCondition::SolverUnavailable)
        }
    }
}

fn run<M>(mut model: M, rows: Vec<Constraint>, handles: &[Variable]) -> LpOutcome
where
    M: SolverModel<Error = ResolutionError>,
{
    for row in rows {
        model = model.with(row);
    }

    match model.solve() {
        Ok(solution) => LpOutcome {
            status: SolverStatus::Ok,
            termination: TerminationCondition::Optimal,
            values: Some(handles.iter().map(|v| solution.value(*v)).collect()),
        },
        Err(ResolutionError::Infeasible) => {
            LpOutcome::failed(SolverStatus::Warning, TerminationCondition::Infeasible)
        }
        Err(ResolutionError::Unbounded) => {
            LpOutcome::failed(SolverStatus::Warning, TerminationCondition::Unbounded)
        }
        Err(e) => {
            warn!(error = %e, "LP backend failed");
            LpOutcome::failed(SolverStatus::Error, TerminationCondition::Error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn program<'a>(
        sense: Sense,
        bounds: &'a [(f64, f64)],
        rows: Vec<(&'a [(usize, f64)], f64)>,
        objective: Vec<f64>,
    ) -> ParameterizedProgram<'a> {
        ParameterizedProgram {
            sense,
            bounds,
            rows,
            objective,
        }
    }

    #[rstest]
    #[case("minilp", SolverBackend::Minilp)]
    #[case("cbc", SolverBackend::Cbc)]
    fn backends_by_name(#[case] name: &str, #[case] expected: SolverBackend) {
        assert_eq!(SolverBackend::from_name(name).unwrap(), expected);
    }

    #[test]
    fn unknown_backend_lists_alternatives() {
        let err = SolverBackend::from_name("glpk").unwrap_err();
        assert_eq!(
            err.to_string(),
            "requested solver `glpk` not found (available: minilp, cbc)"
        );
    }

    #[test]
    fn maximises_within_bounds() {
        let bounds = [(0.0, 4.0), (0.0, 3.0)];
        let row = [(0, 1.0), (1, 1.0)];
        let p = program(Sense::Maximize, &bounds, vec![(&row[..], 5.0)], vec![2.0, 1.0]);
        let out = solve_program(SolverBackend::Minilp, &p);
        assert_eq!(out.status, SolverStatus::Ok);
        let v = out.values.unwrap();
        assert!((v[0] - 4.0).abs() < 1e-6);
        assert!((v[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn minimise_picks_the_lower_corner() {
        let bounds = [(1.0, 4.0)];
        let p = program(Sense::Minimize, &bounds, Vec::new(), vec![3.0]);
        let v = solve_program(SolverBackend::Minilp, &p).values.unwrap();
        assert!((v[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn contradictory_rows_are_infeasible() {
        let bounds = [(0.0, 1.0)];
        let row = [(0, 1.0)];
        let p = program(Sense::Maximize, &bounds, vec![(&row[..], 3.0)], vec![1.0]);
        let out = solve_program(SolverBackend::Minilp, &p);
        assert_eq!(out.status, SolverStatus::Warning);
        assert_eq!(out.termination, TerminationCondition::Infeasible);
        assert!(out.values.is_none());
    }

    #[cfg(not(feature = "cbc"))]
    #[test]
    fn cbc_without_feature_is_unavailable() {
        let bounds = [(0.0, 1.0)];
        let p = program(Sense::Maximize, &bounds, Vec::new(), vec![1.0]);
        let out = solve_program(SolverBackend::Cbc, &p);
        assert_eq!(out.termination, TerminationCondition::SolverUnavailable);
    }

    #[test]
    fn conditions_render_snake_case() {
        assert_eq!(TerminationCondition::SolverUnavailable.to_string(), "solver_unavailable");
        assert_eq!(SolverStatus::Warning.to_string(), "warning");
    }
}
