use serde::{Deserialize, Serialize};
use tracing::debug;

use super::validation::validate_params;
use crate::domain::{DispatchDecision, Horizon, ObjectiveSpec, Rewards, VariableSpec};
use crate::error::{ConfigError, DispatchError};

/// Fields every optimizer configuration carries, as written in a dispatch document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerParams {
    pub states: VariableSpec,
    pub control: VariableSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<VariableSpec>,
    pub objective: ObjectiveSpec,
}

/// Validated optimizer configuration bound to a horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    horizon: Horizon,
    params: OptimizerParams,
}

impl OptimizerSettings {
    pub fn new(horizon: Horizon, params: OptimizerParams) -> Result<Self, ConfigError> {
        let violations = validate_params(&params);
        if !violations.is_empty() {
            return Err(ConfigError::invalid("optimization", violations));
        }
        Ok(Self { horizon, params })
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn states(&self) -> &VariableSpec {
        &self.params.states
    }

    pub fn control(&self) -> &VariableSpec {
        &self.params.control
    }

    pub fn measurements(&self) -> Option<&VariableSpec> {
        self.params.measurements.as_ref()
    }

    pub fn objective(&self) -> &ObjectiveSpec {
        &self.params.objective
    }

    pub fn check_initial_state(&self, x_init: &[f64]) -> Result<(), DispatchError> {
        let expected = self.states().len();
        if x_init.len() != expected {
            return Err(DispatchError::InitialStateLength {
                expected,
                actual: x_init.len(),
            });
        }
        Ok(())
    }

    /// Rewards must cover exactly the objective's channels with one horizon each.
    pub fn check_rewards(&self, rewards: &Rewards) -> Result<(), DispatchError> {
        let n = self.horizon.n();
        for channel in self.objective().channel_names() {
            let samples = rewards
                .get(channel)
                .ok_or_else(|| DispatchError::MissingRewardChannel(channel.to_string()))?;
            if samples.len() != n {
                return Err(DispatchError::RewardLength {
                    channel: channel.to_string(),
                    expected: n,
                    actual: samples.len(),
                });
            }
        }
        if let Some(extra) = rewards
            .keys()
            .find(|k| !self.objective().channels.contains_key(k.as_str()))
        {
            return Err(DispatchError::UnknownRewardChannel(extra.clone()));
        }
        Ok(())
    }
}

/// A receding-horizon dispatch optimizer.
///
/// Implementations own their model; the reward horizon and the initial state
/// come in as arguments on every call.
#[cfg_attr(test, mockall::automock)]
pub trait DispatchOptimizer: Send {
    fn settings(&self) -> &OptimizerSettings;

    /// Decision for the step immediately following `x_init`.
    fn return_next_dispatch(
        &self,
        rewards: &Rewards,
        x_init: &[f64],
    ) -> Result<DispatchDecision, DispatchError>;
}

/// No-op optimizer: holds the initial state and applies zero control.
///
/// Useful as a baseline and for wiring tests; it never looks at the rewards.
#[derive(Debug, Clone)]
pub struct PassThroughOptimizer {
    settings: OptimizerSettings,
}

impl PassThroughOptimizer {
    pub fn new(settings: OptimizerSettings) -> Self {
        Self { settings }
    }
}

impl DispatchOptimizer for PassThroughOptimizer {
    fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    fn return_next_dispatch(
        &self,
        _rewards: &Rewards,
        x_init: &[f64],
    ) -> Result<DispatchDecision, DispatchError> {
        self.settings.check_initial_state(x_init)?;
        debug!(states = x_init.len(), "pass-through dispatch");

        Ok(DispatchDecision {
            states: x_init.to_vec(),
            control: vec![0.0; self.settings.control().len()],
            measurements: self.settings.measurements().map(|m| vec![0.0; m.len()]),
            prediction: Vec::new(),
        })
    }
}
