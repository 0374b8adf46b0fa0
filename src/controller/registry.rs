//! Closed name -> constructor registry for the components a dispatch document can name.

use tracing::debug;

use crate::domain::{ComponentSpec, DispatchSpec, Horizon};
use crate::error::ConfigError;
use crate::forecast::{
    HistoryParams, RewardForecast, RewardForecaster, RewardParams, SinusoidParams,
    SinusoidalForecast, StaticHistoricalForecast,
};
use crate::optimizer::{
    DispatchOptimizer, LtiParams, LtiStateSpaceOptimizer, OptimizerParams, OptimizerSettings,
    PassThroughOptimizer,
};

type OptimizerCtor =
    fn(&DispatchSpec, Horizon) -> Result<Box<dyn DispatchOptimizer>, ConfigError>;
type ForecastCtor = fn(
    &DispatchSpec,
    &str,
    &ComponentSpec,
    Horizon,
) -> Result<Box<dyn RewardForecaster>, ConfigError>;

pub const OPTIMIZERS: &[(&str, OptimizerCtor)] = &[
    ("Optimization", pass_through),
    ("LTIStateSpaceMPC", lti_state_space),
];

pub const FORECASTS: &[(&str, ForecastCtor)] = &[
    ("RewardForecast", constant),
    ("SinusoidalForecast", sinusoidal),
    ("StaticHistoricalForecast", static_historical),
];

fn lookup<T: Copy>(
    table: &[(&'static str, T)],
    kind: &'static str,
    name: &str,
) -> Result<T, ConfigError> {
    table
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, ctor)| *ctor)
        .ok_or_else(|| ConfigError::NotFound {
            kind,
            name: name.to_string(),
            available: table.iter().map(|(key, _)| *key).collect(),
        })
}

pub fn build_optimizer(
    spec: &DispatchSpec,
    horizon: Horizon,
) -> Result<Box<dyn DispatchOptimizer>, ConfigError> {
    let ctor = lookup(OPTIMIZERS, "optimizer", &spec.optimization.kind)?;
    debug!(kind = %spec.optimization.kind, "building optimizer");
    ctor(spec, horizon)
}

pub fn build_forecast(
    spec: &DispatchSpec,
    channel: &str,
    component: &ComponentSpec,
    horizon: Horizon,
) -> Result<Box<dyn RewardForecaster>, ConfigError> {
    let ctor = lookup(FORECASTS, "forecast", &component.kind)?;
    debug!(channel, kind = %component.kind, "building reward forecast");
    ctor(spec, channel, component, horizon)
}

fn pass_through(
    spec: &DispatchSpec,
    horizon: Horizon,
) -> Result<Box<dyn DispatchOptimizer>, ConfigError> {
    let params: OptimizerParams = spec.optimization.decode("optimization")?;
    let settings = OptimizerSettings::new(horizon, params)?;
    Ok(Box::new(PassThroughOptimizer::new(settings)))
}

fn lti_state_space(
    spec: &DispatchSpec,
    horizon: Horizon,
) -> Result<Box<dyn DispatchOptimizer>, ConfigError> {
    let params: LtiParams = spec.optimization.decode("optimization")?;
    let optimizer = LtiStateSpaceOptimizer::from_params(horizon, params, |p| spec.resolve(p))?;
    Ok(Box::new(optimizer))
}

fn constant(
    _spec: &DispatchSpec,
    channel: &str,
    component: &ComponentSpec,
    horizon: Horizon,
) -> Result<Box<dyn RewardForecaster>, ConfigError> {
    let params: RewardParams = component.decode(&format!("reward.{channel}"))?;
    Ok(Box::new(RewardForecast::from_params(horizon, params)))
}

fn sinusoidal(
    _spec: &DispatchSpec,
    channel: &str,
    component: &ComponentSpec,
    horizon: Horizon,
) -> Result<Box<dyn RewardForecaster>, ConfigError> {
    let params: SinusoidParams = component.decode(&format!("reward.{channel}"))?;
    Ok(Box::new(SinusoidalForecast::new(horizon, params)))
}

fn static_historical(
    spec: &DispatchSpec,
    channel: &str,
    component: &ComponentSpec,
    horizon: Horizon,
) -> Result<Box<dyn RewardForecaster>, ConfigError> {
    let params: HistoryParams = component.decode(&format!("reward.{channel}"))?;
    let forecast = StaticHistoricalForecast::from_params(horizon, params, |p| spec.resolve(p))?;
    Ok(Box::new(forecast))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn spec(optimizer: ComponentSpec) -> DispatchSpec {
        DispatchSpec {
            t_window: 20.0,
            dt: 5.0,
            optimization: optimizer,
            reward: BTreeMap::new(),
            base_dir: None,
        }
    }

    fn pass_through_component() -> ComponentSpec {
        ComponentSpec::new("Optimization")
            .with("states", json!({"order": ["SOC"], "lb": [0.0], "ub": [20.0]}))
            .with("control", json!({"order": ["qC"], "lb": [0.0], "ub": [10.0]}))
            .with(
                "objective",
                json!({"sense": "maximize", "price": {"state_multiplier": [1.0], "control_multiplier": [-1.0]}}),
            )
    }

    fn horizon() -> Horizon {
        Horizon::new(20.0, 5.0).unwrap()
    }

    #[test]
    fn builds_registered_optimizer() {
        let opt = build_optimizer(&spec(pass_through_component()), horizon()).unwrap();
        assert_eq!(opt.settings().states().order(), ["SOC".to_string()]);
    }

    #[test]
    fn unknown_optimizer_lists_registered_names() {
        let Err(err) = build_optimizer(&spec(ComponentSpec::new("taco")), horizon()) else {
            panic!("unknown optimizer type accepted");
        };
        assert_eq!(
            err.to_string(),
            "requested optimizer `taco` not found (available: Optimization, LTIStateSpaceMPC)"
        );
    }

    #[test]
    fn unknown_forecast_lists_registered_names() {
        let s = spec(pass_through_component());
        let Err(err) = build_forecast(&s, "price", &ComponentSpec::new("burrito"), horizon()) else {
            panic!("unknown forecast type accepted");
        };
        match err {
            ConfigError::NotFound { kind, available, .. } => {
                assert_eq!(kind, "forecast");
                assert_eq!(
                    available,
                    vec!["RewardForecast", "SinusoidalForecast", "StaticHistoricalForecast"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn forecast_parameters_reach_the_source() {
        let s = spec(pass_through_component());
        let component = ComponentSpec::new("RewardForecast").with("value", 2.5);
        let mut f = build_forecast(&s, "price", &component, horizon()).unwrap();
        assert_eq!(f.gen_reward().unwrap(), vec![2.5; 4]);
    }

    #[test]
    fn every_forecast_type_tolerates_a_repeated_horizon() {
        let s = spec(pass_through_component());
        let components = [
            ComponentSpec::new("RewardForecast").with("value", 2.5),
            ComponentSpec::new("SinusoidalForecast").with("amplitude", 2.5),
        ];
        for component in components {
            let component = component.with("t_window", 20.0).with("dt", 5.0);
            let f = build_forecast(&s, "price", &component, horizon()).unwrap();
            assert_eq!(f.horizon(), horizon());
        }
    }

    #[test]
    fn malformed_component_fields_are_parse_errors() {
        let s = spec(pass_through_component());
        let component = ComponentSpec::new("SinusoidalForecast").with("amplitude", 3);
        assert!(matches!(
            build_forecast(&s, "price", &component, horizon()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
