//! Pipeline engine: settings, scoped configuration, per-document logs and execution.

pub mod config;
pub mod doc_log;
pub mod pipeline;
pub mod scope;

pub use config::{ConfigLayer, PipeSettings, PipelineSettings, ScopedConfig};
pub use doc_log::DocLog;
pub use pipeline::{FileStream, Pipe, Pipeline};
pub use scope::{EnvOverrides, PipeConfig, ScopeGuard};
