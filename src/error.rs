use std::fmt;
use std::path::PathBuf;

use itertools::Itertools;
use thiserror::Error;

use crate::optimizer::{SolverStatus, TerminationCondition};

/// A single problem found while validating a configuration object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Construction-time failures. No partially built object escapes one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {component} configuration: {}", .violations.iter().join("; "))]
    Invalid {
        component: String,
        violations: Vec<Violation>,
    },

    #[error("requested {kind} `{name}` not found (available: {})", .available.join(", "))]
    NotFound {
        kind: &'static str,
        name: String,
        available: Vec<&'static str>,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("state-space matrices from {path}: {message}")]
    Matrix { path: PathBuf, message: String },

    #[error("historical dataset {path}: {message}")]
    Dataset { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn invalid(component: impl Into<String>, violations: Vec<Violation>) -> Self {
        ConfigError::Invalid {
            component: component.into(),
            violations,
        }
    }

    /// Violations carried by an `Invalid` error, empty for every other kind.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ConfigError::Invalid { violations, .. } => violations,
            _ => &[],
        }
    }
}

/// Reward forecast failures raised while generating a horizon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    #[error("samples requested beyond historical data: step {step} + horizon {horizon} > {available} rows")]
    Exhausted {
        step: usize,
        horizon: usize,
        available: usize,
    },
}

/// Call-time failures of a dispatch step.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("reward forecast `{channel}` failed: {source}")]
    Forecast {
        channel: String,
        #[source]
        source: ForecastError,
    },

    #[error("reward channel `{0}` required by the objective is missing")]
    MissingRewardChannel(String),

    #[error("reward channel `{0}` is not part of the objective")]
    UnknownRewardChannel(String),

    #[error("reward channel `{channel}` has {actual} samples, horizon needs {expected}")]
    RewardLength {
        channel: String,
        expected: usize,
        actual: usize,
    },

    #[error("initial state has {actual} entries, model has {expected} states")]
    InitialStateLength { expected: usize, actual: usize },

    #[error("solve did not reach an optimum (status: {status}, termination: {termination})")]
    Solve {
        status: SolverStatus,
        termination: TerminationCondition,
    },
}
