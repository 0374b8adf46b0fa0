//! Single upfront validation pass over an optimizer configuration.
//!
//! Every check runs; the caller gets the full list of violations instead of
//! the first failed assertion.

use super::OptimizerParams;
use crate::error::Violation;

pub fn validate_params(params: &OptimizerParams) -> Vec<Violation> {
    let mut out = Vec::new();

    out.extend(params.states.violations("states"));
    out.extend(params.control.violations("control"));
    if let Some(m) = &params.measurements {
        out.extend(m.violations("measurements"));
    }

    if params.objective.channels.is_empty() {
        out.push(Violation::new(
            "objective",
            "needs at least one reward channel next to `sense`",
        ));
    }

    let n_states = params.states.len();
    let n_control = params.control.len();
    let n_meas = params.measurements.as_ref().map(|m| m.len());

    for (channel, weights) in &params.objective.channels {
        check_multiplier(
            &mut out,
            channel,
            "state_multiplier",
            &weights.state_multiplier,
            n_states,
            "states",
        );
        check_multiplier(
            &mut out,
            channel,
            "control_multiplier",
            &weights.control_multiplier,
            n_control,
            "control",
        );

        if let Some(mm) = &weights.measurement_multiplier {
            match n_meas {
                Some(len) => check_multiplier(
                    &mut out,
                    channel,
                    "measurement_multiplier",
                    mm,
                    len,
                    "measurements",
                ),
                None => out.push(Violation::new(
                    format!("objective.{channel}.measurement_multiplier"),
                    "requires a measurements block",
                )),
            }
        }
    }

    out
}

fn check_multiplier(
    out: &mut Vec<Violation>,
    channel: &str,
    key: &str,
    values: &[f64],
    expected: usize,
    against: &str,
) {
    let field = format!("objective.{channel}.{key}");
    if values.len() != expected {
        out.push(Violation::new(
            field.clone(),
            format!("has {} entries, {against} has {expected}", values.len()),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        out.push(Violation::new(field, "entries must be finite"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelWeights, ObjectiveSpec, Sense, VariableSpec};

    fn spec(name: &str, order: &[&str], ub: f64) -> VariableSpec {
        VariableSpec::new(
            name,
            order.iter().map(|s| s.to_string()).collect(),
            vec![0.0; order.len()],
            vec![ub; order.len()],
        )
        .unwrap()
    }

    fn params() -> OptimizerParams {
        OptimizerParams {
            states: spec("states", &["qNPP", "SOC"], 50.0),
            control: spec("control", &["qC", "qD"], 20.0),
            measurements: Some(spec("measurements", &["SOC2"], 20.0)),
            objective: ObjectiveSpec::new(Sense::Maximize).with_channel(
                "price",
                ChannelWeights {
                    state_multiplier: vec![1.0, 0.0],
                    control_multiplier: vec![-1.0, 1.0],
                    measurement_multiplier: Some(vec![0.0]),
                },
            ),
        }
    }

    #[test]
    fn reference_configuration_is_clean() {
        assert!(validate_params(&params()).is_empty());
    }

    #[test]
    fn every_multiplier_problem_is_reported_at_once() {
        let mut p = params();
        let w = p.objective.channels.get_mut("price").unwrap();
        w.state_multiplier = vec![0.0; 100];
        w.control_multiplier = vec![1.0];
        w.measurement_multiplier = Some(vec![0.0, f64::NAN]);

        let fields: Vec<_> = validate_params(&p).into_iter().map(|v| v.field).collect();
        assert_eq!(
            fields,
            vec![
                "objective.price.state_multiplier",
                "objective.price.control_multiplier",
                "objective.price.measurement_multiplier",
                "objective.price.measurement_multiplier",
            ]
        );
    }

    #[test]
    fn measurement_multiplier_needs_measurements() {
        let mut p = params();
        p.measurements = None;
        let v = validate_params(&p);
        assert_eq!(v.len(), 1);
        assert!(v[0].message.contains("requires a measurements block"));
    }

    #[test]
    fn objective_without_channels_is_rejected() {
        let mut p = params();
        p.objective.channels.clear();
        assert_eq!(validate_params(&p)[0].field, "objective");
    }
}
