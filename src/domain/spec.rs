use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::horizon::{strict_f64, Horizon};
use crate::error::ConfigError;

const HORIZON_KEYS: [&str; 2] = ["t_window", "dt"];

/// One component entry of a dispatch document: a registry name plus its own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ComponentSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Deserializes the type-specific fields into `T`.
    ///
    /// `t_window` and `dt` repeated inside a component are ignored; the
    /// document-level horizon is the one every component gets.
    pub fn decode<T: DeserializeOwned>(&self, component: &str) -> Result<T, ConfigError> {
        let mut params = self.params.clone();
        for key in HORIZON_KEYS {
            params.remove(key);
        }
        serde_json::from_value(Value::Object(params)).map_err(|e| {
            ConfigError::Parse {
                path: PathBuf::from(component),
                message: e.to_string(),
            }
        })
    }
}

/// Declarative description of one dispatch loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSpec {
    #[serde(deserialize_with = "strict_f64")]
    pub t_window: f64,
    #[serde(deserialize_with = "strict_f64")]
    pub dt: f64,
    pub optimization: ComponentSpec,
    pub reward: BTreeMap<String, ComponentSpec>,
    /// Directory relative `matrices`/`history` paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl DispatchSpec {
    /// Reads a YAML, JSON or TOML document, picked by extension (YAML if unknown).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parsed: Result<Self, String> = match ext.as_deref() {
            Some("json") => serde_json::from_str(&text).map_err(|e| e.to_string()),
            Some("toml") => toml::from_str(&text).map_err(|e| e.to_string()),
            _ => serde_yaml::from_str(&text).map_err(|e| e.to_string()),
        };
        let mut spec = parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        spec.base_dir = path.parent().map(Path::to_path_buf);
        Ok(spec)
    }

    pub fn horizon(&self) -> Result<Horizon, ConfigError> {
        Horizon::new(self.t_window, self.dt)
    }

    /// Resolves a path from the document against its directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
