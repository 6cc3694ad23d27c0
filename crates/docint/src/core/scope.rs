//! Scoped configuration stack.
//!
//! Every pipe owns a [`PipeConfig`]: a stack of [`ConfigLayer`]s searched top-down.
//!
//! ```text
//!   [n]  scope "page_1"   file overrides for the scope, then matching env values
//!   ...
//!   [2]  scope "report"   per-document file, then matching env values
//!   [1]  env              DI_{PIPE}__{FIELD} without a scope path
//!   [0]  static           component defaults + pipeline file
//! ```
//!
//! Scopes are entered through [`PipeConfig::enter_scope`] and
//! [`PipeConfig::enter_document`], which return a [`ScopeGuard`] that pops its
//! layer when dropped. Environment values always win over file values at the
//! same scope.

use super::config::{
    ConfigLayer, ScopedConfig, canonicalize, layer_at, merge_layers, parse_env_value, resolve_key_path, typed,
};
use crate::{DocintError, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

pub const ENV_PREFIX: &str = "DI_";
const ENV_SEPARATOR: &str = "__";

/// Checks an override layer against a component's schema.
pub type LayerValidator = Arc<dyn Fn(&ConfigLayer) -> Result<()> + Send + Sync>;

/// Environment overrides for one pipe, grouped by scope path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    buckets: IndexMap<Vec<String>, ConfigLayer>,
}

/// Upper-case env form of a pipe name.
pub fn env_pipe_name(pipe: &str) -> String {
    pipe.to_ascii_uppercase().replace(['-', '.', ' '], "_")
}

impl EnvOverrides {
    /// Collect `DI_{PIPE}__...` variables from the process environment.
    pub fn from_env(pipe: &str, defaults: &ConfigLayer) -> Result<Self> {
        Self::from_vars(pipe, std::env::vars(), defaults)
    }

    /// Collect overrides for `pipe` from `vars`.
    ///
    /// After the pipe name, the longest run of segments that names a field of
    /// `defaults` is the key path; any remaining segments are the scope path.
    ///
    /// # Errors
    ///
    /// Returns `DocintError::Validation` naming every variable that does not resolve
    /// to a field.
    pub fn from_vars(
        pipe: &str,
        vars: impl IntoIterator<Item = (String, String)>,
        defaults: &ConfigLayer,
    ) -> Result<Self> {
        let prefix = format!("{}{}{}", ENV_PREFIX, env_pipe_name(pipe), ENV_SEPARATOR);
        let mut overrides = Self::default();
        let mut unknown = Vec::new();

        for (name, raw) in vars {
            let upper = name.to_ascii_uppercase();
            let Some(rest) = upper.strip_prefix(&prefix) else {
                continue;
            };
            let segments: Vec<String> = rest.split(ENV_SEPARATOR).map(str::to_string).collect();
            if segments.iter().any(String::is_empty) {
                unknown.push(name);
                continue;
            }

            let resolved = (1..=segments.len())
                .rev()
                .find_map(|len| resolve_key_path(defaults, &segments[..len]).map(|path| (len, path)));
            let Some((len, key_path)) = resolved else {
                unknown.push(name);
                continue;
            };

            let scope_path: Vec<String> = segments[len..].iter().map(|s| s.to_ascii_lowercase()).collect();
            tracing::debug!(var = %name, key = %key_path.join("."), scope = %scope_path.join("/"), "Env override");
            merge_layers(
                overrides.buckets.entry(scope_path).or_default(),
                layer_at(&key_path, parse_env_value(&raw)),
            );
        }

        if !unknown.is_empty() {
            unknown.sort();
            return Err(DocintError::validation(format!(
                "Environment overrides for pipe '{}' name unknown fields: {}",
                pipe,
                unknown.join(", ")
            )));
        }

        overrides.buckets.sort_by(|a, _, b, _| a.len().cmp(&b.len()));
        Ok(overrides)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Every bucket with its scope path.
    pub fn layers(&self) -> impl Iterator<Item = (&[String], &ConfigLayer)> {
        self.buckets.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn unscoped(&self) -> ConfigLayer {
        self.buckets.get(&Vec::<String>::new()).cloned().unwrap_or_default()
    }

    /// Merge the buckets whose path is a prefix of `scope_path`, shortest first.
    fn matching(&self, scope_path: &[String]) -> ConfigLayer {
        let mut layer = ConfigLayer::new();
        for (path, bucket) in &self.buckets {
            if path.len() <= scope_path.len() && scope_path[..path.len()] == path[..] {
                merge_layers(&mut layer, bucket.clone());
            }
        }
        layer
    }
}

struct Frame {
    scope: Option<String>,
    layer: ConfigLayer,
    overrides: ScopedConfig,
}

/// Configuration of one pipe: defaults, pipeline values, environment and the
/// currently entered scopes.
pub struct PipeConfig {
    pipe: String,
    defaults: ConfigLayer,
    env: EnvOverrides,
    frames: Vec<Frame>,
    base_depth: usize,
    validator: Option<LayerValidator>,
}

impl std::fmt::Debug for PipeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeConfig")
            .field("pipe", &self.pipe)
            .field("depth", &self.frames.len())
            .field("scope_path", &self.scope_path())
            .finish()
    }
}

impl PipeConfig {
    pub fn new(pipe: impl Into<String>, defaults: ConfigLayer, pipeline: ConfigLayer, env: EnvOverrides) -> Self {
        let mut static_layer = defaults.clone();
        merge_layers(&mut static_layer, canonicalize(pipeline, &defaults));
        let frames = vec![
            Frame {
                scope: None,
                layer: static_layer,
                overrides: ScopedConfig::default(),
            },
            Frame {
                scope: None,
                layer: env.unscoped(),
                overrides: ScopedConfig::default(),
            },
        ];
        let base_depth = frames.len();
        Self {
            pipe: pipe.into(),
            defaults,
            env,
            frames,
            base_depth,
            validator: None,
        }
    }

    /// Validate every file layer pushed from now on with `validator`.
    pub fn with_validator(mut self, validator: LayerValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn pipe(&self) -> &str {
        &self.pipe
    }

    pub fn defaults(&self) -> &ConfigLayer {
        &self.defaults
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn base_depth(&self) -> usize {
        self.base_depth
    }

    pub fn is_at_base(&self) -> bool {
        self.frames.len() == self.base_depth
    }

    /// Names of the entered scopes, outermost first.
    pub fn scope_path(&self) -> Vec<&str> {
        self.frames.iter().filter_map(|f| f.scope.as_deref()).collect()
    }

    /// Enter the document scope `name` with the document's file overrides.
    pub fn enter_document(&mut self, name: &str, overrides: Option<ScopedConfig>) -> Result<ScopeGuard<'_>> {
        self.push(name, overrides.unwrap_or_default())?;
        Ok(ScopeGuard { config: self })
    }

    /// Enter a nested scope. File overrides come from the enclosing scope's
    /// `scope_configs`.
    pub fn enter_scope(&mut self, name: &str) -> Result<ScopeGuard<'_>> {
        let overrides = self
            .frames
            .last()
            .and_then(|f| f.overrides.scope(name))
            .cloned()
            .unwrap_or_default();
        self.push(name, overrides)?;
        Ok(ScopeGuard { config: self })
    }

    fn push(&mut self, name: &str, overrides: ScopedConfig) -> Result<()> {
        let file_layer = canonicalize(overrides.fields.clone(), &self.defaults);
        if !file_layer.is_empty()
            && let Some(validator) = &self.validator
        {
            validator(&file_layer)?;
        }

        let mut scope_path: Vec<String> = self
            .frames
            .iter()
            .filter_map(|f| f.scope.as_deref())
            .map(str::to_ascii_lowercase)
            .collect();
        scope_path.push(name.to_ascii_lowercase());

        let mut layer = file_layer;
        merge_layers(&mut layer, self.env.matching(&scope_path));
        tracing::debug!(pipe = %self.pipe, scope = %scope_path.join("/"), keys = layer.len(), "Entered scope");

        self.frames.push(Frame {
            scope: Some(name.to_string()),
            layer,
            overrides,
        });
        Ok(())
    }

    fn pop(&mut self) {
        if self.frames.len() > self.base_depth
            && let Some(frame) = self.frames.pop()
        {
            tracing::debug!(pipe = %self.pipe, scope = ?frame.scope, "Left scope");
        }
    }

    /// First value for `key` found scanning the stack top-down.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|f| {
            f.layer
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// First value at the nested `path`, scanning top-down.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        self.frames.iter().rev().find_map(|f| {
            let mut value = f.layer.iter().find(|(k, _)| k.eq_ignore_ascii_case(first)).map(|(_, v)| v)?;
            for segment in rest {
                value = value
                    .as_object()?
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(segment))
                    .map(|(_, v)| v)?;
            }
            Some(value)
        })
    }

    /// All layers merged bottom-up.
    pub fn resolved(&self) -> ConfigLayer {
        let mut out = ConfigLayer::new();
        for frame in &self.frames {
            merge_layers(&mut out, frame.layer.clone());
        }
        out
    }

    /// The effective config as the component's typed struct.
    pub fn typed<T: DeserializeOwned>(&self) -> Result<T> {
        typed(&self.resolved())
    }
}

/// Keeps a scope entered; leaving happens on drop.
pub struct ScopeGuard<'a> {
    config: &'a mut PipeConfig,
}

impl Deref for ScopeGuard<'_> {
    type Target = PipeConfig;

    fn deref(&self) -> &PipeConfig {
        self.config
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut PipeConfig {
        self.config
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.config.pop();
    }
}
