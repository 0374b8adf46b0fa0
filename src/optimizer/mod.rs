pub mod matrices;
pub mod model;
pub mod solver;
pub mod strategies;
pub mod types;
pub mod validation;

pub use matrices::*;
pub use model::{LinearModel, Trajectory};
pub use solver::{SolverBackend, SolverReport, SolverStatus, TerminationCondition};
pub use strategies::*;
pub use types::*;
