use serde::Deserialize;

use crate::domain::horizon::strict_f64_opt;
use crate::domain::Horizon;
use crate::error::ForecastError;

/// A source of reward samples, one look-ahead horizon per call.
///
/// Every source carries a step counter `i`. `gen_reward` returns the horizon
/// starting at `i` and then advances `i` by one.
#[cfg_attr(test, mockall::automock)]
pub trait RewardForecaster: Send {
    fn horizon(&self) -> Horizon;

    fn step(&self) -> usize;

    fn set_step(&mut self, step: usize);

    fn reset(&mut self) {
        self.set_step(0);
    }

    fn gen_reward(&mut self) -> Result<Vec<f64>, ForecastError>;
}

pub const DEFAULT_REWARD_VALUE: f64 = 10.0;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewardParams {
    #[serde(default, deserialize_with = "strict_f64_opt")]
    pub value: Option<f64>,
}

/// Constant reward over the whole horizon.
#[derive(Debug, Clone)]
pub struct RewardForecast {
    horizon: Horizon,
    value: f64,
    step: usize,
}

impl RewardForecast {
    pub fn new(horizon: Horizon, value: f64) -> Self {
        Self {
            horizon,
            value,
            step: 0,
        }
    }

    pub fn from_params(horizon: Horizon, params: RewardParams) -> Self {
        Self::new(horizon, params.value.unwrap_or(DEFAULT_REWARD_VALUE))
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl RewardForecaster for RewardForecast {
    fn horizon(&self) -> Horizon {
        self.horizon
    }

    fn step(&self) -> usize {
        self.step
    }

    fn set_step(&mut self, step: usize) {
        self.step = step;
    }

    fn gen_reward(&mut self) -> Result<Vec<f64>, ForecastError> {
        self.step += 1;
        Ok(vec![self.value; self.horizon.n()])
    }
}
