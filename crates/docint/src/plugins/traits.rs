//! Component traits.
//!
//! Every pipeline step is a [`Component`]. Components are stateless: all
//! per-run state lives on the [`File`] they receive and in the [`PipeConfig`]
//! scope stack of the pipe that runs them.

use crate::Result;
use crate::core::config::ConfigLayer;
use crate::core::scope::PipeConfig;
use crate::file::{File, FileKind};
use serde_json::Value;

/// Metadata and lifecycle shared by all plugins.
pub trait Plugin: Send + Sync {
    /// Unique registry name, e.g. `grid_table_finder`.
    fn name(&self) -> &str;

    fn version(&self) -> String;

    /// Called once when a pipeline is built around the component.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Called when that pipeline is dropped.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn description(&self) -> &str {
        ""
    }
}

/// A pipeline step.
///
/// # Contract
///
/// - `process` receives ownership of the file and returns it, possibly modified.
///   Returning an error drops the file in batch mode.
/// - `default_config` is the full set of known fields; anything else in a
///   pipeline or per-document layer is rejected by `validate_config`.
/// - `assigns` names the file attributes the component produces; `requires`
///   names attributes an earlier pipe (or the loader) must have produced.
/// - Files whose kind is not `accepts`-ed pass through untouched.
pub trait Component: Plugin {
    fn accepts(&self, kind: FileKind) -> bool {
        kind.is_document()
    }

    fn assigns(&self) -> &[&'static str] {
        &[]
    }

    fn requires(&self) -> &[&'static str] {
        &[]
    }

    /// External tools or models the component needs at runtime.
    fn depends(&self) -> &[&'static str] {
        &[]
    }

    fn default_config(&self) -> Result<ConfigLayer>;

    /// Check an override layer (pipeline, per-document or environment) against
    /// the component's schema.
    fn validate_config(&self, layer: &ConfigLayer) -> Result<()>;

    fn process(&self, file: File, config: &mut PipeConfig) -> Result<File>;

    /// Whether the pipe should keep a side-file cache of this component's output.
    fn cacheable(&self) -> bool {
        false
    }

    /// Serializable snapshot of what `process` produced, for the side-file cache.
    /// `None` skips the cache write for this file.
    fn cache_snapshot(&self, _file: &File) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Re-apply a snapshot from [`Component::cache_snapshot`] instead of processing.
    fn cache_restore(&self, _file: &mut File, _snapshot: Value) -> Result<()> {
        Ok(())
    }
}
