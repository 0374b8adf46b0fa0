use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Violation};

/// Look-ahead window shared by every optimizer and forecast of one dispatch loop.
///
/// Both values are in minutes. `n` is fixed at construction and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Horizon {
    t_window: f64,
    dt: f64,
    n: usize,
}

impl Horizon {
    pub fn new(t_window: f64, dt: f64) -> Result<Self, ConfigError> {
        let mut violations = Vec::new();
        if !t_window.is_finite() || t_window <= 0.0 {
            violations.push(Violation::new(
                "t_window",
                format!("must be a positive finite number of minutes, got {t_window}"),
            ));
        }
        if !dt.is_finite() || dt <= 0.0 {
            violations.push(Violation::new(
                "dt",
                format!("must be a positive finite number of minutes, got {dt}"),
            ));
        }
        if !violations.is_empty() {
            return Err(ConfigError::invalid("horizon", violations));
        }

        let n = (t_window / dt).floor() as usize;
        if n < 2 {
            return Err(ConfigError::invalid(
                "horizon",
                vec![Violation::new(
                    "t_window",
                    format!("window {t_window} / step {dt} gives {n} steps, at least 2 are needed"),
                )],
            ));
        }

        Ok(Self { t_window, dt, n })
    }

    pub fn t_window(&self) -> f64 {
        self.t_window
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of discrete steps in every look-ahead.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Step length as a chrono duration, rounded to the millisecond.
    pub fn step_duration(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.dt * 60_000.0).round() as i64)
    }
}

/// Deserializes a float while rejecting integer literals.
///
/// Dispatch documents have to say `720.0`, not `720`.
pub fn strict_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct StrictFloat;

    impl<'de> Visitor<'de> for StrictFloat {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a floating-point number (e.g. 5.0)")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_f32<E: de::Error>(self, v: f32) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Err(E::invalid_type(de::Unexpected::Signed(v), &self))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Err(E::invalid_type(de::Unexpected::Unsigned(v), &self))
        }
    }

    deserializer.deserialize_any(StrictFloat)
}

/// `strict_f64` for optional fields with a default.
pub fn strict_f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "strict_f64")] f64);

    Option::<Wrapped>::deserialize(deserializer).map(|w| w.map(|Wrapped(v)| v))
}
