use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One horizon of reward samples per named channel.
pub type Rewards = BTreeMap<String, Vec<f64>>;

/// Values to apply for the step right after the carried-over initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchDecision {
    pub states: Vec<f64>,
    pub control: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Vec<f64>>,
    /// Full predicted trajectory per variable: states in declared order, then controls.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prediction: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub time: NaiveDateTime,
    pub values: Vec<f64>,
}

/// Append-only time-keyed table with fixed columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTable {
    columns: Vec<String>,
    rows: Vec<HistoryRow>,
}

impl HistoryTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, time: NaiveDateTime, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push(HistoryRow { time, values });
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn times(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.time).collect()
    }

    /// All recorded values of one column, oldest first.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    pub fn last(&self) -> Option<&HistoryRow> {
        self.rows.last()
    }

    /// Writes a header (`time` then the columns) and one line per row.
    pub fn write_csv(&self, writer: impl std::io::Write) -> csv::Result<()> {
        let mut wtr = csv::WriterBuilder::new().from_writer(writer);
        wtr.write_record(std::iter::once("time").chain(self.columns.iter().map(String::as_str)))?;
        for row in &self.rows {
            wtr.write_record(
                std::iter::once(row.time.format("%Y-%m-%d %H:%M:%S").to_string())
                    .chain(row.values.iter().map(|v| v.to_string())),
            )?;
        }
        wtr.flush()?;
        Ok(())
    }
}
