//! Transform configuration

use crate::error::{SvgReworkError, SvgReworkResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration for one transform.
///
/// Built once and passed by reference into every transform call; nothing is
/// kept in process-wide state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Prefix for resolving image file references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<PathBuf>,

    /// Declaration properties to rewrite; `None` rewrites every declaration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<String>>,

    /// Unrecognized keys, kept but not interpreted
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransformConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from a host-supplied value.
    ///
    /// A string is the base path. An object contributes its recognized keys
    /// (`base_path`, `properties`) and keeps the rest in `extra`. Any other
    /// value is ignored and yields the default config.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(base_path) => Self::default().with_base_path(base_path),
            Value::Object(mut map) => {
                let mut config = Self::default();

                match map.remove("base_path") {
                    Some(Value::String(base_path)) => config.base_path = Some(base_path.into()),
                    Some(Value::Null) | None => {}
                    Some(other) => warn!(value = %other, "ignoring non-string base_path"),
                }

                match map.remove("properties") {
                    Some(Value::Array(items)) => {
                        let properties = items
                            .into_iter()
                            .filter_map(|item| match item {
                                Value::String(property) => Some(property),
                                other => {
                                    warn!(value = %other, "ignoring non-string property name");
                                    None
                                }
                            })
                            .collect();
                        config.properties = Some(properties);
                    }
                    Some(Value::String(property)) => config.properties = Some(vec![property]),
                    Some(Value::Null) | None => {}
                    Some(other) => warn!(value = %other, "ignoring invalid properties list"),
                }

                config.extra = map;
                config
            }
            other => {
                debug!(value = %other, "ignoring configuration that is neither a string nor an object");
                Self::default()
            }
        }
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> SvgReworkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SvgReworkError::io(path, e))?;
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            SvgReworkError::config(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::from_value(value))
    }

    /// Set the base path for relative image references
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Restrict rewriting to the given declaration properties
    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = Some(properties.into_iter().map(Into::into).collect());
        self
    }

    /// Whether declarations of `property` are scanned for directives.
    pub fn rewrites_property(&self, property: &str) -> bool {
        match &self.properties {
            Some(allowed) => allowed.iter().any(|p| p.eq_ignore_ascii_case(property)),
            None => true,
        }
    }

    /// Resolve an image file reference against the base path.
    ///
    /// With a base path set, references are always taken relative to it, so a
    /// leading `/` does not escape the base directory.
    pub fn resolve_path(&self, reference: &str) -> PathBuf {
        match &self.base_path {
            Some(base) => base.join(reference.trim_start_matches('/')),
            None => PathBuf::from(reference),
        }
    }
}
