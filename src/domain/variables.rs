use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Violation};

/// Names and bounds of one vector of model variables (states, control or measurements).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableSpec {
    order: Vec<String>,
    lb: Vec<f64>,
    ub: Vec<f64>,
}

impl VariableSpec {
    pub fn new(
        name: &str,
        order: Vec<String>,
        lb: Vec<f64>,
        ub: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let spec = Self { order, lb, ub };
        let violations = spec.violations(name);
        if violations.is_empty() {
            Ok(spec)
        } else {
            Err(ConfigError::invalid(name, violations))
        }
    }

    /// Every problem with this spec, field names prefixed with `name`.
    pub fn violations(&self, name: &str) -> Vec<Violation> {
        let mut out = Vec::new();
        let len = self.order.len();

        if len == 0 {
            out.push(Violation::new(format!("{name}.order"), "must not be empty"));
        }
        if self.lb.len() != len {
            out.push(Violation::new(
                format!("{name}.lb"),
                format!("has {} entries, order has {len}", self.lb.len()),
            ));
        }
        if self.ub.len() != len {
            out.push(Violation::new(
                format!("{name}.ub"),
                format!("has {} entries, order has {len}", self.ub.len()),
            ));
        }

        let mut seen = HashSet::new();
        for var in &self.order {
            if var.trim().is_empty() {
                out.push(Violation::new(format!("{name}.order"), "contains an empty name"));
            } else if !seen.insert(var.as_str()) {
                out.push(Violation::new(
                    format!("{name}.order"),
                    format!("`{var}` appears more than once"),
                ));
            }
        }

        for (i, (lo, hi)) in self.lb.iter().zip(&self.ub).enumerate() {
            if !lo.is_finite() || !hi.is_finite() {
                out.push(Violation::new(
                    format!("{name}[{i}]"),
                    format!("bounds must be finite, got ({lo}, {hi})"),
                ));
            } else if lo > hi {
                out.push(Violation::new(
                    format!("{name}[{i}]"),
                    format!("lower bound {lo} exceeds upper bound {hi}"),
                ));
            }
        }

        out
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn lb(&self) -> &[f64] {
        &self.lb
    }

    pub fn ub(&self) -> &[f64] {
        &self.ub
    }

    pub fn bounds(&self, i: usize) -> (f64, f64) {
        (self.lb[i], self.ub[i])
    }
}
