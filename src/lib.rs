//! Receding-horizon dispatch optimization for linear time-invariant plants.
//!
//! A [`controller::DispatchLoop`] pulls a reward horizon from every configured
//! forecast source, solves the look-ahead linear program and keeps the first
//! step of the optimal trajectory.

pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod optimizer;
pub mod telemetry;

pub use controller::DispatchLoop;
pub use error::{ConfigError, DispatchError, ForecastError};
