use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use validator::Validate;

/// Settings of the simulation runner binary.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub run: RunConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RunConfig {
    /// Dispatch document (YAML, JSON or TOML).
    pub spec: PathBuf,
    #[validate(range(min = 1, max = 1_000_000))]
    pub steps: usize,
    pub start: NaiveDateTime,
    #[validate(length(min = 1))]
    pub initial_state: Vec<f64>,
    /// Optional CSV export of the `optimal_results` history.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("DISPATCH__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract().context("loading runner configuration")?;
        cfg.validate().context("validating runner configuration")?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
[run]
spec = "tests/data/dispatch.yaml"
steps = 8
start = "2022-05-31T00:00:00"
initial_state = [50.0, 0.0]
"#;

    #[test]
    fn parses_runner_config() {
        let cfg = Config::from_figment(Figment::new().merge(Toml::string(DOC))).unwrap();
        assert_eq!(cfg.run.steps, 8);
        assert_eq!(cfg.run.initial_state, vec![50.0, 0.0]);
        assert!(cfg.run.output.is_none());
        assert!(!cfg.log.json);
    }

    #[test]
    fn zero_steps_fail_validation() {
        let doc = DOC.replace("steps = 8", "steps = 0");
        assert!(Config::from_figment(Figment::new().merge(Toml::string(&doc))).is_err());
    }

    #[test]
    fn empty_initial_state_fails_validation() {
        let doc = DOC.replace("[50.0, 0.0]", "[]");
        assert!(Config::from_figment(Figment::new().merge(Toml::string(&doc))).is_err());
    }
}
