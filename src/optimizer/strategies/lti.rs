//! Receding-horizon MPC over a discrete linear time-invariant plant.
//!
//! The plant `x(t) = A x(t-1) + B u(t-1)`, `y(t) = C x(t)` is laid out over the
//! whole horizon as one linear program. The program structure is built once;
//! each call supplies the reward horizon and the initial state, and the solver
//! returns the full trajectory. Only the step right after the initial state is
//! applied.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{DispatchDecision, Horizon, Rewards};
use crate::error::{ConfigError, DispatchError, Violation};
use crate::optimizer::model::LinearModel;
use crate::optimizer::solver::{solve_program, SolverBackend, SolverReport};
use crate::optimizer::{DispatchOptimizer, OptimizerParams, OptimizerSettings, StateSpaceMatrices};

fn default_solver() -> String {
    "minilp".to_string()
}

fn default_executable() -> PathBuf {
    PathBuf::from(".")
}

/// Document fields of an `LTIStateSpaceMPC` optimizer.
#[derive(Debug, Clone, Deserialize)]
pub struct LtiParams {
    #[serde(default = "default_solver")]
    pub solver: String,
    /// Handed to external backends; the bundled solvers ignore it.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    pub matrices: PathBuf,
    #[serde(flatten)]
    pub common: OptimizerParams,
}

pub struct LtiStateSpaceOptimizer {
    settings: OptimizerSettings,
    backend: SolverBackend,
    executable: PathBuf,
    matrices: StateSpaceMatrices,
    model: LinearModel,
}

impl std::fmt::Debug for LtiStateSpaceOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LtiStateSpaceOptimizer")
            .field("backend", &self.backend)
            .field("executable", &self.executable)
            .field("n", &self.settings.horizon().n())
            .finish()
    }
}

impl LtiStateSpaceOptimizer {
    pub fn new(
        settings: OptimizerSettings,
        matrices: StateSpaceMatrices,
        backend: SolverBackend,
        executable: PathBuf,
    ) -> Result<Self, ConfigError> {
        let violations: Vec<Violation> = matrices.violations(
            settings.states().len(),
            settings.control().len(),
            settings.measurements().map(|m| m.len()),
        );
        if !violations.is_empty() {
            return Err(ConfigError::invalid("LTIStateSpaceMPC", violations));
        }

        let model = LinearModel::build(&settings, &matrices);
        info!(
            backend = %backend,
            n = settings.horizon().n(),
            variables = model.layout().len(),
            constraints = model.equalities().len(),
            "LTI state-space optimizer ready"
        );

        Ok(Self {
            settings,
            backend,
            executable,
            matrices,
            model,
        })
    }

    /// Builds from document fields; `resolve` maps the `matrices` path to a readable location.
    pub fn from_params(
        horizon: Horizon,
        params: LtiParams,
        resolve: impl Fn(&Path) -> PathBuf,
    ) -> Result<Self, ConfigError> {
        let backend = SolverBackend::from_name(&params.solver)?;
        let settings = OptimizerSettings::new(horizon, params.common)?;
        let matrices = StateSpaceMatrices::load(&resolve(&params.matrices))?;
        Self::new(settings, matrices, backend, params.executable)
    }

    pub fn matrices(&self) -> &StateSpaceMatrices {
        &self.matrices
    }

    pub fn backend(&self) -> SolverBackend {
        self.backend
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Solves the look-ahead problem over the whole horizon.
    ///
    /// Shape problems in the inputs are errors. Solver failures are not: they
    /// come back in the report's status and termination.
    pub fn solve(&self, rewards: &Rewards, x_init: &[f64]) -> Result<SolverReport, DispatchError> {
        self.settings.check_initial_state(x_init)?;
        self.settings.check_rewards(rewards)?;

        let program = self.model.parameterize(rewards, x_init);
        let outcome = solve_program(self.backend, &program);

        let (objective, trajectory) = match outcome.values {
            Some(values) => {
                let objective: f64 = program
                    .objective
                    .iter()
                    .zip(&values)
                    .map(|(c, v)| c * v)
                    .sum();
                (Some(objective), Some(self.model.trajectory(&values)))
            }
            None => (None, None),
        };

        let report = SolverReport {
            status: outcome.status,
            termination: outcome.termination,
            objective,
            trajectory,
        };
        if report.is_optimal() {
            debug!(objective = ?report.objective, "look-ahead solved");
        } else {
            warn!(
                status = %report.status,
                termination = %report.termination,
                "look-ahead solve did not reach optimality"
            );
        }
        Ok(report)
    }
}

impl DispatchOptimizer for LtiStateSpaceOptimizer {
    fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    fn return_next_dispatch(
        &self,
        rewards: &Rewards,
        x_init: &[f64],
    ) -> Result<DispatchDecision, DispatchError> {
        let report = self.solve(rewards, x_init)?;
        let optimal = report.is_optimal();
        let trajectory = match report.trajectory {
            Some(t) if optimal => t,
            _ => {
                return Err(DispatchError::Solve {
                    status: report.status,
                    termination: report.termination,
                })
            }
        };

        let prediction = trajectory
            .states
            .iter()
            .chain(&trajectory.control)
            .cloned()
            .collect();
        Ok(DispatchDecision {
            states: trajectory.states_at(1),
            control: trajectory.control_at(1),
            measurements: self
                .settings
                .measurements()
                .map(|_| trajectory.measurements_at(1)),
            prediction,
        })
    }
}
