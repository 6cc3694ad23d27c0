//! Pipeline and component configuration.
//!
//! A pipeline file lists the pipes to run and where their artifacts go. Each pipe
//! names a registered component and carries an untyped [`ConfigLayer`] that is
//! merged over the component's defaults and validated against the component's
//! config struct before anything runs.
//!
//! Per-document overrides live next to the pipeline in
//! `{config_dir}/{file_name}.{stub}.yml` and are parsed as a [`ScopedConfig`].

use crate::{DocintError, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Untyped configuration values keyed by field name.
pub type ConfigLayer = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_name")]
    pub name: String,
    /// Input files whose path contains any of these substrings are skipped.
    #[serde(default)]
    pub ignore_docs: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default)]
    pub pipes: Vec<PipeSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeSettings {
    pub name: String,
    pub component: String,
    /// File-name suffix for this pipe's cache, config and log files.
    #[serde(default)]
    pub stub: Option<String>,
    #[serde(default)]
    pub config: ConfigLayer,
}

fn default_name() -> String {
    "pipeline".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("conf")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_true() -> bool {
    true
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            ignore_docs: Vec::new(),
            output_dir: default_output_dir(),
            config_dir: default_config_dir(),
            log_dir: default_log_dir(),
            use_cache: true,
            pipes: Vec::new(),
        }
    }
}

impl PipeSettings {
    pub fn new(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
            stub: None,
            config: ConfigLayer::new(),
        }
    }

    pub fn with_stub(mut self, stub: impl Into<String>) -> Self {
        self.stub = Some(stub.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn stub(&self) -> &str {
        self.stub.as_deref().unwrap_or(&self.name)
    }
}

impl PipelineSettings {
    /// Load settings, picking the format from the extension
    /// (`.yml`/`.yaml`, `.json` or `.toml`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("yml") | Some("yaml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            Some("toml") => Self::from_toml_file(path),
            _ => Err(DocintError::validation(format!(
                "Unsupported pipeline file format: {}",
                path.display()
            ))),
        }
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config_file(path.as_ref())?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| DocintError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config_file(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| DocintError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config_file(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| DocintError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Path of the per-document config for `file_name` under pipe `stub`.
    pub fn doc_config_path(&self, file_name: &str, stub: &str) -> PathBuf {
        self.config_dir.join(format!("{}.{}.yml", file_name, stub))
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.ignore_docs.iter().any(|pattern| path.contains(pattern.as_str()))
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| DocintError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

/// Overrides for one scope, with optional overrides for nested scopes.
///
/// ```yaml
/// overlap_percent: 60
/// scope_configs:
///   page_2:
///     overlap_percent: 50
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopedConfig {
    #[serde(default)]
    pub scope_configs: IndexMap<String, ScopedConfig>,
    #[serde(flatten)]
    pub fields: ConfigLayer,
}

impl ScopedConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config_file(path.as_ref())?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(&content)
            .map_err(|e| DocintError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load the file if it exists.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.is_file() {
            Self::from_yaml_file(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Overrides for the nested scope `name`, matched case-insensitively.
    pub fn scope(&self, name: &str) -> Option<&ScopedConfig> {
        self.scope_configs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

/// Serialize a config struct's defaults into a layer.
pub fn defaults_layer<T: Serialize + Default>() -> Result<ConfigLayer> {
    match serde_json::to_value(T::default())? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(DocintError::validation(format!(
            "Component defaults must serialize to a map, got {}",
            other
        ))),
    }
}

/// Deserialize a fully merged layer into a typed config.
pub fn typed<T: DeserializeOwned>(layer: &ConfigLayer) -> Result<T> {
    serde_json::from_value(layer_to_value(layer))
        .map_err(|e| DocintError::validation_with_source(format!("Invalid configuration: {}", e), e))
}

pub fn layer_to_value(layer: &ConfigLayer) -> Value {
    Value::Object(layer.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

/// Deep-merge `overlay` into `base`. Nested maps merge key by key; everything else
/// is replaced.
pub fn merge_layers(base: &mut ConfigLayer, overlay: ConfigLayer) {
    for (key, value) in overlay {
        if let Some(existing) = base.get_mut(&key) {
            merge_value(existing, value);
        } else {
            base.insert(key, value);
        }
    }
}

fn merge_value(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                if let Some(existing) = base.get_mut(&key) {
                    merge_value(existing, value);
                } else {
                    base.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Rename keys to the spelling used in `defaults`, matching case-insensitively.
/// Keys without a counterpart are kept as written.
pub fn canonicalize(layer: ConfigLayer, defaults: &ConfigLayer) -> ConfigLayer {
    layer
        .into_iter()
        .map(|(key, value)| match find_key(defaults, &key) {
            Some((canonical, default)) => {
                let value = match (value, default) {
                    (Value::Object(map), Value::Object(default_map)) => {
                        let nested: ConfigLayer = map.into_iter().collect();
                        let default_nested: ConfigLayer =
                            default_map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                        layer_to_value(&canonicalize(nested, &default_nested))
                    }
                    (value, _) => value,
                };
                (canonical.to_string(), value)
            }
            None => (key, value),
        })
        .collect()
}

fn find_key<'a>(layer: &'a ConfigLayer, key: &str) -> Option<(&'a str, &'a Value)> {
    layer
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(k, v)| (k.as_str(), v))
}

/// Resolve a case-insensitive key path through the defaults' field tree, returning
/// the canonical spelling of each segment.
pub fn resolve_key_path(defaults: &ConfigLayer, segments: &[String]) -> Option<Vec<String>> {
    let (first, rest) = segments.split_first()?;
    let (key, mut value) = find_key(defaults, first)?;
    let mut path = vec![key.to_string()];
    for segment in rest {
        let Value::Object(map) = value else {
            return None;
        };
        let (k, v) = map.iter().find(|(k, _)| k.eq_ignore_ascii_case(segment))?;
        path.push(k.clone());
        value = v;
    }
    Some(path)
}

/// Build a layer setting `value` at the nested `path`.
pub fn layer_at(path: &[String], value: Value) -> ConfigLayer {
    let mut layer = ConfigLayer::new();
    if let Some((first, rest)) = path.split_first() {
        let nested = rest.iter().rev().fold(value, |acc, key| {
            let mut map = serde_json::Map::new();
            map.insert(key.clone(), acc);
            Value::Object(map)
        });
        layer.insert(first.clone(), nested);
    }
    layer
}

/// Parse an environment value as a YAML scalar or flow collection, falling back
/// to the raw string.
pub fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::String(raw.to_string());
    }
    match serde_yaml_ng::from_str::<Value>(trimmed) {
        Ok(Value::Null) if !matches!(trimmed, "null" | "~" | "Null" | "NULL") => Value::String(raw.to_string()),
        Ok(value) => value,
        Err(_) => Value::String(raw.to_string()),
    }
}

/// Check `layer` against the config type `T`, naming every offending field.
///
/// Unknown keys are detected against `defaults`; each known key is then merged
/// alone over `defaults` and deserialized, so every bad value is reported.
pub fn validate_layer<T: DeserializeOwned>(component: &str, defaults: &ConfigLayer, layer: &ConfigLayer) -> Result<()> {
    let mut problems = Vec::new();
    collect_unknown(defaults, layer, "", &mut problems);

    for (key, value) in layer {
        if find_key(defaults, key).is_none() {
            continue;
        }
        let mut candidate = defaults.clone();
        merge_layers(&mut candidate, canonicalize(ConfigLayer::from([(key.clone(), value.clone())]), defaults));
        if let Err(e) = serde_json::from_value::<T>(layer_to_value(&candidate)) {
            problems.push(format!("invalid value for '{}': {}", key, e));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(DocintError::validation(format!(
            "Invalid configuration for component '{}': {}",
            component,
            problems.join("; ")
        )))
    }
}

fn collect_unknown(defaults: &ConfigLayer, layer: &ConfigLayer, prefix: &str, problems: &mut Vec<String>) {
    for (key, value) in layer {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match find_key(defaults, key) {
            None => problems.push(format!("unknown field '{}'", full)),
            Some((_, Value::Object(default_map))) => {
                if let Value::Object(map) = value {
                    let nested: ConfigLayer = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    let default_nested: ConfigLayer =
                        default_map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    collect_unknown(&default_nested, &nested, &full, problems);
                }
            }
            Some(_) => {}
        }
    }
}
