use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Optimization direction of the dispatch objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sense {
    Maximize,
    Minimize,
}

/// Per-variable weights applied to one reward channel's price at every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelWeights {
    pub state_multiplier: Vec<f64>,
    pub control_multiplier: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_multiplier: Option<Vec<f64>>,
}

/// Objective of the look-ahead problem: a sense plus one weight set per reward channel.
///
/// In documents the channels sit next to `sense`:
///
/// ```yaml
/// sense: maximize
/// price:
///   state_multiplier: [1.0, 0.0]
///   control_multiplier: [-1.0, 1.0]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSpec {
    pub sense: Sense,
    #[serde(flatten)]
    pub channels: BTreeMap<String, ChannelWeights>,
}

impl ObjectiveSpec {
    pub fn new(sense: Sense) -> Self {
        Self {
            sense,
            channels: BTreeMap::new(),
        }
    }

    pub fn with_channel(mut self, name: impl Into<String>, weights: ChannelWeights) -> Self {
        self.channels.insert(name.into(), weights);
        self
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_channels_beside_sense() {
        let yaml = r#"
sense: maximize
price:
  state_multiplier: [1.0, 0.0]
  control_multiplier: [-1.0, 1.0]
  measurement_multiplier: [0.0]
"#;
        let obj: ObjectiveSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(obj.sense, Sense::Maximize);
        let price = &obj.channels["price"];
        assert_eq!(price.control_multiplier, vec![-1.0, 1.0]);
        assert_eq!(price.measurement_multiplier.as_deref(), Some(&[0.0][..]));
    }

    #[test]
    fn unknown_sense_is_rejected() {
        let yaml = "sense: zero\nprice: {state_multiplier: [1.0], control_multiplier: [1.0]}";
        assert!(serde_yaml::from_str::<ObjectiveSpec>(yaml).is_err());
        let missing = "price: {state_multiplier: [1.0], control_multiplier: [1.0]}";
        assert!(serde_yaml::from_str::<ObjectiveSpec>(missing).is_err());
    }

    #[test]
    fn missing_multiplier_is_rejected() {
        let yaml = "sense: minimize\nprice: {state_multiplier: [1.0]}";
        assert!(serde_yaml::from_str::<ObjectiveSpec>(yaml).is_err());
    }

    #[test]
    fn sense_round_trips_through_strings() {
        assert_eq!("minimize".parse::<Sense>().unwrap(), Sense::Minimize);
        assert_eq!(Sense::Maximize.to_string(), "maximize");
    }
}
