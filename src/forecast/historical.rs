//! Replay of a recorded reward series.
//!
//! The series is one column of a CSV dataset with a header row. Call `i`
//! returns rows `[i, i+n)`; once fewer than `n` rows remain the source is
//! exhausted and the counter stays put.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::RewardForecaster;
use crate::domain::Horizon;
use crate::error::{ConfigError, ForecastError};

fn default_column() -> String {
    "LMP".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryParams {
    pub history: PathBuf,
    #[serde(default = "default_column")]
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct StaticHistoricalForecast {
    horizon: Horizon,
    column: String,
    series: Vec<f64>,
    step: usize,
}

impl StaticHistoricalForecast {
    pub fn from_series(horizon: Horizon, column: impl Into<String>, series: Vec<f64>) -> Self {
        Self {
            horizon,
            column: column.into(),
            series,
            step: 0,
        }
    }

    pub fn from_params(
        horizon: Horizon,
        params: HistoryParams,
        resolve: impl Fn(&Path) -> PathBuf,
    ) -> Result<Self, ConfigError> {
        let path = resolve(&params.history);
        let file = std::fs::File::open(&path).map_err(|e| ConfigError::Dataset {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let series = read_column(file, &params.name).map_err(|message| ConfigError::Dataset {
            path: path.clone(),
            message,
        })?;
        debug!(path = %path.display(), column = %params.name, rows = series.len(), "loaded reward history");
        Ok(Self::from_series(horizon, params.name, series))
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Reads the named column of a headed CSV stream as floats.
pub fn read_column(reader: impl Read, column: &str) -> Result<Vec<f64>, String> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers().map_err(|e| e.to_string())?.clone();
    let idx = headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| format!("no column `{column}` in header"))?;

    let mut out = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        let cell = record.get(idx).unwrap_or("");
        let value = cell
            .parse::<f64>()
            .map_err(|_| format!("row {row}: `{cell}` in column `{column}` is not a number"))?;
        out.push(value);
    }
    Ok(out)
}

impl RewardForecaster for StaticHistoricalForecast {
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
        let n = self.horizon.n();
        let end = self.step + n;
        if end > self.series.len() {
            return Err(ForecastError::Exhausted {
                step: self.step,
                horizon: n,
                available: self.series.len(),
            });
        }
        let samples = self.series[self.step..end].to_vec();
        self.step += 1;
        Ok(samples)
    }
}
