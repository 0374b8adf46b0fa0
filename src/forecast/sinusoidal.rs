//! Periodic reward signal: `offset + amplitude * sin(frequency * x + phase)`
//! sampled at `x = i, i+1, ..., i+n-1`.

use std::f64::consts::PI;

use serde::Deserialize;

use super::RewardForecaster;
use crate::domain::horizon::strict_f64_opt;
use crate::domain::Horizon;
use crate::error::ForecastError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinusoidParams {
    #[serde(default, deserialize_with = "strict_f64_opt")]
    pub amplitude: Option<f64>,
    #[serde(default, deserialize_with = "strict_f64_opt")]
    pub phase: Option<f64>,
    #[serde(default, deserialize_with = "strict_f64_opt")]
    pub frequency: Option<f64>,
    #[serde(default, deserialize_with = "strict_f64_opt")]
    pub offset: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SinusoidalForecast {
    horizon: Horizon,
    amplitude: f64,
    phase: f64,
    frequency: f64,
    offset: f64,
    step: usize,
}

impl SinusoidalForecast {
    pub const DEFAULT_AMPLITUDE: f64 = 10.0;
    pub const DEFAULT_PHASE: f64 = PI / 4.0;
    /// One period per 144 steps (12 hours of 5 minute steps).
    pub const DEFAULT_FREQUENCY: f64 = 2.0 * PI / 144.0;
    pub const DEFAULT_OFFSET: f64 = 10.0;

    pub fn new(horizon: Horizon, params: SinusoidParams) -> Self {
        Self {
            horizon,
            amplitude: params.amplitude.unwrap_or(Self::DEFAULT_AMPLITUDE),
            phase: params.phase.unwrap_or(Self::DEFAULT_PHASE),
            frequency: params.frequency.unwrap_or(Self::DEFAULT_FREQUENCY),
            offset: params.offset.unwrap_or(Self::DEFAULT_OFFSET),
            step: 0,
        }
    }

    pub fn sample(&self, x: f64) -> f64 {
        self.offset + self.amplitude * (self.frequency * x + self.phase).sin()
    }
}

impl RewardForecaster for SinusoidalForecast {
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
        let start = self.step;
        let samples = (start..start + self.horizon.n())
            .map(|x| self.sample(x as f64))
            .collect();
        self.step += 1;
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn horizon() -> Horizon {
        Horizon::new(20.0, 5.0).unwrap()
    }

    #[test]
    fn default_signal() {
        let mut f = SinusoidalForecast::new(horizon(), SinusoidParams::default());
        let first = f.gen_reward().unwrap();
        assert_eq!(first.len(), 4);
        assert!((first[0] - (10.0 + 10.0 * (PI / 4.0).sin())).abs() < 1e-12);
        assert_eq!(f.step(), 1);
    }

    #[test]
    fn consecutive_horizons_overlap_by_one_step() {
        let mut f = SinusoidalForecast::new(horizon(), SinusoidParams::default());
        let a = f.gen_reward().unwrap();
        let b = f.gen_reward().unwrap();
        assert_eq!(a[1..], b[..3]);
    }

    #[rstest]
    #[case(r#"{"amplitude": 5}"#)]
    #[case(r#"{"phase": 0}"#)]
    #[case(r#"{"frequency": 1}"#)]
    #[case(r#"{"offset": 20}"#)]
    fn integer_parameters_are_rejected(#[case] doc: &str) {
        assert!(serde_json::from_str::<SinusoidParams>(doc).is_err());
    }

    #[test]
    fn custom_parameters() {
        let params: SinusoidParams = serde_json::from_str(
            r#"{"amplitude": 2.0, "phase": 0.0, "frequency": 0.0, "offset": 1.0}"#,
        )
        .unwrap();
        let mut f = SinusoidalForecast::new(horizon(), params);
        assert_eq!(f.gen_reward().unwrap(), vec![1.0; 4]);
    }

    #[test]
    fn second_horizon_follows_the_configured_curve() {
        let (amplitude, phase, frequency, offset) = (5.0, PI / 3.0, 2.0 * PI / 144.0, 20.0);
        let params = SinusoidParams {
            amplitude: Some(amplitude),
            phase: Some(phase),
            frequency: Some(frequency),
            offset: Some(offset),
        };
        let mut f = SinusoidalForecast::new(Horizon::new(720.0, 5.0).unwrap(), params);
        assert_eq!(f.step(), 0);
        f.gen_reward().unwrap();
        assert_eq!(f.step(), 1);

        let second = f.gen_reward().unwrap();
        assert_eq!(f.step(), 2);
        assert_eq!(second.len(), 144);
        for (k, value) in second.iter().enumerate() {
            let expected = offset + amplitude * (frequency * (1 + k) as f64 + phase).sin();
            assert!((value - expected).abs() < 1e-12, "sample {k}: {value} != {expected}");
        }
    }

    #[test]
    fn reset_restarts_the_signal() {
        let mut f = SinusoidalForecast::new(horizon(), SinusoidParams::default());
        let first = f.gen_reward().unwrap();
        f.gen_reward().unwrap();
        f.reset();
        assert_eq!(f.gen_reward().unwrap(), first);
    }
}
