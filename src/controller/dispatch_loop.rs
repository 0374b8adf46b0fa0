use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::registry::{build_forecast, build_optimizer};
use crate::domain::{DispatchDecision, DispatchSpec, HistoryTable, Horizon, Rewards};
use crate::error::{ConfigError, DispatchError, Violation};
use crate::forecast::RewardForecaster;
use crate::optimizer::DispatchOptimizer;

/// Receding-horizon orchestrator.
///
/// Each step pulls one horizon from every reward source, asks the optimizer
/// for the next dispatch and records the step. A step either completes or
/// leaves the loop as it was: histories and forecast counters only move on
/// success.
pub struct DispatchLoop {
    horizon: Horizon,
    optimizer: Box<dyn DispatchOptimizer>,
    forecasters: BTreeMap<String, Box<dyn RewardForecaster>>,
    initial_states: HistoryTable,
    optimal_results: HistoryTable,
}

impl DispatchLoop {
    pub fn new(
        optimizer: Box<dyn DispatchOptimizer>,
        forecasters: BTreeMap<String, Box<dyn RewardForecaster>>,
    ) -> Result<Self, ConfigError> {
        let settings = optimizer.settings();
        let horizon = settings.horizon();

        let mut violations: Vec<Violation> = forecasters
            .iter()
            .filter(|(_, f)| f.horizon() != horizon)
            .map(|(name, f)| {
                let h = f.horizon();
                Violation::new(
                    format!("reward.{name}"),
                    format!(
                        "horizon ({}, {}) differs from the optimizer's ({}, {})",
                        h.t_window(),
                        h.dt(),
                        horizon.t_window(),
                        horizon.dt()
                    ),
                )
            })
            .collect();

        let objective = settings.objective();
        for channel in objective.channel_names() {
            if !forecasters.contains_key(channel) {
                violations.push(Violation::new(
                    format!("reward.{channel}"),
                    "objective channel has no reward source",
                ));
            }
        }
        for name in forecasters.keys() {
            if !objective.channels.contains_key(name) {
                violations.push(Violation::new(
                    format!("reward.{name}"),
                    "reward source is not an objective channel",
                ));
            }
        }
        if !violations.is_empty() {
            return Err(ConfigError::invalid("dispatch loop", violations));
        }

        let initial_states = HistoryTable::new(settings.states().order().to_vec());
        let mut result_columns: Vec<String> = settings
            .states()
            .order()
            .iter()
            .chain(settings.control().order())
            .cloned()
            .collect();
        if let Some(m) = settings.measurements() {
            result_columns.extend(m.order().iter().cloned());
        }
        result_columns.extend(forecasters.keys().cloned());

        Ok(Self {
            horizon,
            optimizer,
            forecasters,
            initial_states,
            optimal_results: HistoryTable::new(result_columns),
        })
    }

    pub fn from_spec(spec: &DispatchSpec) -> Result<Self, ConfigError> {
        let horizon = spec.horizon()?;
        let optimizer = build_optimizer(spec, horizon)?;
        let forecasters = spec
            .reward
            .iter()
            .map(|(name, component)| {
                build_forecast(spec, name, component, horizon).map(|f| (name.clone(), f))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        info!(
            optimizer = %spec.optimization.kind,
            channels = forecasters.len(),
            n = horizon.n(),
            dt = horizon.dt(),
            "dispatch loop configured"
        );
        Self::new(optimizer, forecasters)
    }

    pub fn from_spec_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_spec(&DispatchSpec::from_path(path)?)
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn optimizer(&self) -> &dyn DispatchOptimizer {
        self.optimizer.as_ref()
    }

    pub fn forecaster(&self, channel: &str) -> Option<&dyn RewardForecaster> {
        self.forecasters.get(channel).map(|f| f.as_ref())
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.forecasters.keys().map(String::as_str)
    }

    pub fn initial_states(&self) -> &HistoryTable {
        &self.initial_states
    }

    pub fn optimal_results(&self) -> &HistoryTable {
        &self.optimal_results
    }

    /// Runs one receding-horizon step from `x_init` at `time`.
    ///
    /// The decision is recorded at `time + dt` together with the second sample
    /// of every reward channel, the price the decision is dispatched against.
    ///
    /// Unlike a plain `gen_reward` sequence, a failed step (forecast or
    /// optimizer) restores every forecast counter to its value before the call,
    /// so the same step can be retried.
    pub fn return_optimal_next_dispatch(
        &mut self,
        time: NaiveDateTime,
        x_init: &[f64],
    ) -> Result<DispatchDecision, DispatchError> {
        self.optimizer.settings().check_initial_state(x_init)?;

        let steps: Vec<usize> = self.forecasters.values().map(|f| f.step()).collect();
        let outcome = self.step(x_init);
        let (rewards, decision) = match outcome {
            Ok(done) => done,
            Err(e) => {
                for (f, step) in self.forecasters.values_mut().zip(steps) {
                    f.set_step(step);
                }
                warn!(%time, error = %e, "dispatch step failed");
                return Err(e);
            }
        };

        self.initial_states.push(time, x_init.to_vec());
        let mut row: Vec<f64> = decision
            .states
            .iter()
            .chain(&decision.control)
            .chain(decision.measurements.iter().flatten())
            .copied()
            .collect();
        row.extend(rewards.values().map(|samples| samples[1]));
        let at = time + self.horizon.step_duration();
        self.optimal_results.push(at, row);

        info!(
            %time,
            states = ?decision.states,
            control = ?decision.control,
            "dispatch step recorded"
        );
        Ok(decision)
    }

    fn step(&mut self, x_init: &[f64]) -> Result<(Rewards, DispatchDecision), DispatchError> {
        let mut rewards = Rewards::new();
        for (channel, forecaster) in self.forecasters.iter_mut() {
            let samples = forecaster
                .gen_reward()
                .map_err(|source| DispatchError::Forecast {
                    channel: channel.clone(),
                    source,
                })?;
            rewards.insert(channel.clone(), samples);
        }
        debug!(channels = rewards.len(), "reward horizons generated");

        let decision = self.optimizer.return_next_dispatch(&rewards, x_init)?;
        Ok((rewards, decision))
    }

    /// Zeroes every forecast counter and empties both histories.
    pub fn reset(&mut self) {
        for f in self.forecasters.values_mut() {
            f.reset();
        }
        self.initial_states.clear();
        self.optimal_results.clear();
        debug!("dispatch loop reset");
    }

    /// Closed loop: each decision's states become the next initial state.
    ///
    /// Stops at the first failed step; earlier steps stay in the histories.
    pub fn simulate(
        &mut self,
        start: NaiveDateTime,
        x0: &[f64],
        steps: usize,
    ) -> Result<Vec<DispatchDecision>, DispatchError> {
        let mut time = start;
        let mut x = x0.to_vec();
        let mut decisions = Vec::with_capacity(steps);
        for _ in 0..steps {
            let decision = self.return_optimal_next_dispatch(time, &x)?;
            x.clone_from(&decision.states);
            time += self.horizon.step_duration();
            decisions.push(decision);
        }
        Ok(decisions)
    }
}
