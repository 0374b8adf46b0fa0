//! Owned, time-indexed linear program of the LTI dispatch problem.
//!
//! The structure (variables, bounds, equality rows, objective weights) is
//! built once per optimizer. A solve only supplies the parameters: the reward
//! horizon per channel and the initial state.

use std::collections::BTreeMap;

use tracing::warn;

use super::{OptimizerSettings, StateSpaceMatrices};
use crate::domain::{Rewards, Sense};

/// Reference to one decision variable at one horizon step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarRef {
    State { i: usize, t: usize },
    Control { i: usize, t: usize },
    Measurement { i: usize, t: usize },
}

/// Flat variable numbering: all states, then all controls, then all measurements,
/// each block variable-major (`i * n + t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelLayout {
    pub n: usize,
    pub n_states: usize,
    pub n_control: usize,
    pub n_measurements: usize,
}

impl ModelLayout {
    pub fn index(&self, var: VarRef) -> usize {
        match var {
            VarRef::State { i, t } => i * self.n + t,
            VarRef::Control { i, t } => (self.n_states + i) * self.n + t,
            VarRef::Measurement { i, t } => (self.n_states + self.n_control + i) * self.n + t,
        }
    }

    pub fn len(&self) -> usize {
        (self.n_states + self.n_control + self.n_measurements) * self.n
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Right-hand side of an equality row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rhs {
    Zero,
    /// The carried-over initial value of state `i`.
    InitialState(usize),
}

/// `Σ coef · var = rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearEquality {
    pub terms: Vec<(usize, f64)>,
    pub rhs: Rhs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    layout: ModelLayout,
    sense: Sense,
    bounds: Vec<(f64, f64)>,
    equalities: Vec<LinearEquality>,
    /// channel -> weight per variable index, multiplied by `P[channel, t]` at solve time
    weights: BTreeMap<String, Vec<f64>>,
}

/// A model with its parameters filled in, ready for the solve facility.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizedProgram<'a> {
    pub sense: Sense,
    pub bounds: &'a [(f64, f64)],
    pub rows: Vec<(&'a [(usize, f64)], f64)>,
    pub objective: Vec<f64>,
}

/// Solved values per variable over the whole horizon, indexed `[variable][t]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub states: Vec<Vec<f64>>,
    pub control: Vec<Vec<f64>>,
    pub measurements: Vec<Vec<f64>>,
}

impl Trajectory {
    pub fn states_at(&self, t: usize) -> Vec<f64> {
        self.states.iter().map(|row| row[t]).collect()
    }

    pub fn control_at(&self, t: usize) -> Vec<f64> {
        self.control.iter().map(|row| row[t]).collect()
    }

    pub fn measurements_at(&self, t: usize) -> Vec<f64> {
        self.measurements.iter().map(|row| row[t]).collect()
    }
}

impl LinearModel {
    /// Builds the structure for `settings` and `matrices`, which must already
    /// agree on dimensions.
    pub fn build(settings: &OptimizerSettings, matrices: &StateSpaceMatrices) -> Self {
        let states = settings.states();
        let control = settings.control();
        let measurements = settings.measurements();
        let layout = ModelLayout {
            n: settings.horizon().n(),
            n_states: states.len(),
            n_control: control.len(),
            n_measurements: measurements.map(|m| m.len()).unwrap_or(0),
        };
        let n = layout.n;

        // every decision variable lives in the nonnegative orthant
        let mut bounds = vec![(0.0, 0.0); layout.len()];
        let mut fill = |name: &str, order: &[String], lb: &[f64], ub: &[f64], at: &dyn Fn(usize, usize) -> VarRef| {
            for (i, var) in order.iter().enumerate() {
                if lb[i] < 0.0 {
                    warn!(
                        block = name,
                        variable = %var,
                        lower_bound = lb[i],
                        "negative lower bound clamped to 0.0"
                    );
                }
                for t in 0..n {
                    bounds[layout.index(at(i, t))] = (lb[i].max(0.0), ub[i]);
                }
            }
        };
        fill("states", states.order(), states.lb(), states.ub(), &|i, t| VarRef::State { i, t });
        fill("control", control.order(), control.lb(), control.ub(), &|i, t| VarRef::Control { i, t });
        if let Some(m) = measurements {
            fill("measurements", m.order(), m.lb(), m.ub(), &|i, t| VarRef::Measurement { i, t });
        }

        let mut equalities = Vec::new();
        for t in 0..n {
            for i in 0..layout.n_states {
                let x_it = layout.index(VarRef::State { i, t });
                if t == 0 {
                    equalities.push(LinearEquality {
                        terms: vec![(x_it, 1.0)],
                        rhs: Rhs::InitialState(i),
                    });
                    continue;
                }
                let mut terms = vec![(x_it, 1.0)];
                for j in 0..layout.n_states {
                    let a = matrices.a[(i, j)];
                    if a != 0.0 {
                        terms.push((layout.index(VarRef::State { i: j, t: t - 1 }), -a));
                    }
                }
                for k in 0..layout.n_control {
                    let b = matrices.b[(i, k)];
                    if b != 0.0 {
                        terms.push((layout.index(VarRef::Control { i: k, t: t - 1 }), -b));
                    }
                }
                equalities.push(LinearEquality { terms, rhs: Rhs::Zero });
            }
        }
        if let Some(c) = matrices.c.as_ref().filter(|_| layout.n_measurements > 0) {
            for t in 0..n {
                for l in 0..layout.n_measurements {
                    let mut terms = vec![(layout.index(VarRef::Measurement { i: l, t }), 1.0)];
                    for j in 0..layout.n_states {
                        let coef = c[(l, j)];
                        if coef != 0.0 {
                            terms.push((layout.index(VarRef::State { i: j, t }), -coef));
                        }
                    }
                    equalities.push(LinearEquality { terms, rhs: Rhs::Zero });
                }
            }
        }

        let mut weights = BTreeMap::new();
        for (channel, w) in &settings.objective().channels {
            let mut per_var = vec![0.0; layout.len()];
            for t in 0..n {
                for (i, m) in w.state_multiplier.iter().enumerate() {
                    per_var[layout.index(VarRef::State { i, t })] = *m;
                }
                for (i, m) in w.control_multiplier.iter().enumerate() {
                    per_var[layout.index(VarRef::Control { i, t })] = *m;
                }
                if layout.n_measurements > 0 {
                    for (i, m) in w.measurement_multiplier.iter().flatten().enumerate() {
                        per_var[layout.index(VarRef::Measurement { i, t })] = *m;
                    }
                }
            }
            weights.insert(channel.clone(), per_var);
        }

        Self {
            layout,
            sense: settings.objective().sense,
            bounds,
            equalities,
            weights,
        }
    }

    pub fn layout(&self) -> ModelLayout {
        self.layout
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    pub fn equalities(&self) -> &[LinearEquality] {
        &self.equalities
    }

    /// Objective coefficient of every variable for one reward horizon.
    ///
    /// Channels absent from `rewards` contribute nothing; callers check coverage first.
    pub fn objective_coefficients(&self, rewards: &Rewards) -> Vec<f64> {
        let n = self.layout.n;
        let mut coef = vec![0.0; self.layout.len()];
        for (channel, per_var) in &self.weights {
            let Some(prices) = rewards.get(channel) else {
                continue;
            };
            for (idx, w) in per_var.iter().enumerate() {
                if *w != 0.0 {
                    coef[idx] += prices[idx % n] * w;
                }
            }
        }
        coef
    }

    pub fn parameterize(&self, rewards: &Rewards, x_init: &[f64]) -> ParameterizedProgram<'_> {
        let rows = self
            .equalities
            .iter()
            .map(|eq| {
                let rhs = match eq.rhs {
                    Rhs::Zero => 0.0,
                    Rhs::InitialState(i) => x_init[i],
                };
                (eq.terms.as_slice(), rhs)
            })
            .collect();

        ParameterizedProgram {
            sense: self.sense,
            bounds: &self.bounds,
            rows,
            objective: self.objective_coefficients(rewards),
        }
    }

    /// Unflattens solver values, snapping each into its bounds to drop solver tolerance noise.
    pub fn trajectory(&self, values: &[f64]) -> Trajectory {
        let l = self.layout;
        let value = |idx: usize| {
            let (lo, hi) = self.bounds[idx];
            values[idx].max(lo).min(hi)
        };
        let block = |count: usize, at: &dyn Fn(usize, usize) -> VarRef| -> Vec<Vec<f64>> {
            (0..count)
                .map(|i| (0..l.n).map(|t| value(l.index(at(i, t)))).collect())
                .collect()
        };
        Trajectory {
            states: block(l.n_states, &|i, t| VarRef::State { i, t }),
            control: block(l.n_control, &|i, t| VarRef::Control { i, t }),
            measurements: block(l.n_measurements, &|i, t| VarRef::Measurement { i, t }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Horizon;
    use crate::optimizer::types::fixtures::storage_params;
    use crate::optimizer::MatrixMapping;

    fn model(with_measurements: bool) -> LinearModel {
        let settings = OptimizerSettings::new(
            Horizon::new(20.0, 5.0).unwrap(),
            storage_params(with_measurements),
        )
        .unwrap();
        let matrices = StateSpaceMatrices::from_mapping(&MatrixMapping {
            a: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            b: vec![vec![0.0, 0.0], vec![1.0, -1.0]],
            c: Some(vec![vec![0.0, 1.0]]),
        })
        .unwrap();
        LinearModel::build(&settings, &matrices)
    }

    #[test]
    fn layout_numbers_blocks_in_order() {
        let l = model(true).layout();
        assert_eq!(l.len(), (2 + 2 + 1) * 4);
        assert_eq!(l.index(VarRef::State { i: 0, t: 0 }), 0);
        assert_eq!(l.index(VarRef::State { i: 1, t: 3 }), 7);
        assert_eq!(l.index(VarRef::Control { i: 0, t: 0 }), 8);
        assert_eq!(l.index(VarRef::Measurement { i: 0, t: 3 }), 19);
    }

    #[test]
    fn one_equality_per_state_and_measurement_step() {
        let m = model(true);
        assert_eq!(m.equalities().len(), 2 * 4 + 4);
        let initial: Vec<_> = m
            .equalities()
            .iter()
            .filter(|e| matches!(e.rhs, Rhs::InitialState(_)))
            .collect();
        assert_eq!(initial.len(), 2);
        assert_eq!(initial[1].terms, vec![(4, 1.0)]);

        assert_eq!(model(false).equalities().len(), 2 * 4);
    }

    #[test]
    fn state_row_carries_a_and_b_coefficients() {
        let m = model(true);
        let l = m.layout();
        // SOC at t=2 = SOC(1) + qC(1) - qD(1)
        let row = m
            .equalities()
            .iter()
            .find(|e| e.terms[0].0 == l.index(VarRef::State { i: 1, t: 2 }))
            .unwrap();
        assert_eq!(
            row.terms,
            vec![
                (l.index(VarRef::State { i: 1, t: 2 }), 1.0),
                (l.index(VarRef::State { i: 1, t: 1 }), -1.0),
                (l.index(VarRef::Control { i: 0, t: 1 }), -1.0),
                (l.index(VarRef::Control { i: 1, t: 1 }), 1.0),
            ]
        );
    }

    #[test]
    fn bounds_follow_specs() {
        let m = model(true);
        let l = m.layout();
        assert_eq!(m.bounds()[l.index(VarRef::State { i: 0, t: 2 })], (0.0, 50.0));
        assert_eq!(m.bounds()[l.index(VarRef::Control { i: 0, t: 1 })], (0.0, 10.0));
        assert_eq!(m.bounds()[l.index(VarRef::Measurement { i: 0, t: 0 })], (0.0, 20.0));
    }

    #[test]
    fn objective_scales_weights_by_price_per_step() {
        let m = model(true);
        let l = m.layout();
        let rewards = Rewards::from([("price".to_string(), vec![5.0, 10.0, 30.0, 40.0])]);
        let c = m.objective_coefficients(&rewards);
        assert_eq!(c[l.index(VarRef::State { i: 0, t: 2 })], 30.0);
        assert_eq!(c[l.index(VarRef::State { i: 1, t: 2 })], 0.0);
        assert_eq!(c[l.index(VarRef::Control { i: 0, t: 1 })], -10.0);
        assert_eq!(c[l.index(VarRef::Control { i: 1, t: 3 })], 40.0 * 0.9);
    }

    #[test]
    fn parameterize_fills_initial_state() {
        let m = model(false);
        let rewards = Rewards::from([("price".to_string(), vec![1.0; 4])]);
        let p = m.parameterize(&rewards, &[50.0, 3.0]);
        let rhs: Vec<f64> = p.rows.iter().take(2).map(|(_, r)| *r).collect();
        assert_eq!(rhs, vec![50.0, 3.0]);
        assert!(p.rows.iter().skip(2).all(|(_, r)| *r == 0.0));
    }

    #[test]
    fn trajectory_unflattens_values() {
        let m = model(true);
        let values: Vec<f64> = (0..m.layout().len()).map(|v| v as f64 / 100.0).collect();
        let traj = m.trajectory(&values);
        assert_eq!(traj.states[1], vec![0.04, 0.05, 0.06, 0.07]);
        assert_eq!(traj.control_at(1), vec![0.09, 0.13]);
        assert_eq!(traj.measurements_at(0), vec![0.16]);
    }

    #[test]
    fn trajectory_snaps_into_bounds() {
        let m = model(false);
        let mut values = vec![0.0; m.layout().len()];
        values[m.layout().index(VarRef::State { i: 1, t: 1 })] = 20.000_000_001;
        values[m.layout().index(VarRef::Control { i: 0, t: 0 })] = -1e-12;
        let traj = m.trajectory(&values);
        assert_eq!(traj.states[1][1], 20.0);
        assert_eq!(traj.control[0][0], 0.0);
    }
}
