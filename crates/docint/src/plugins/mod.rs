//! Component plugin system.
//!
//! A pipeline is a sequence of pipes, each running one [`Component`] looked up by
//! name in the global registry. The built-in components are registered on first
//! use; applications add their own with [`register_component`].
//!
//! # Example
//!
//! ```rust
//! use docint::core::config::ConfigLayer;
//! use docint::core::scope::PipeConfig;
//! use docint::file::File;
//! use docint::plugins::{Component, Plugin, register_component};
//! use docint::Result;
//! use std::sync::Arc;
//!
//! struct PageCounter;
//!
//! impl Plugin for PageCounter {
//!     fn name(&self) -> &str { "page_counter" }
//!     fn version(&self) -> String { "1.0.0".to_string() }
//! }
//!
//! impl Component for PageCounter {
//!     fn default_config(&self) -> Result<ConfigLayer> { Ok(ConfigLayer::new()) }
//!     fn validate_config(&self, _layer: &ConfigLayer) -> Result<()> { Ok(()) }
//!     fn process(&self, file: File, _config: &mut PipeConfig) -> Result<File> {
//!         if let Some(doc) = file.as_doc() {
//!             tracing::info!(pages = doc.num_pages(), "counted");
//!         }
//!         Ok(file)
//!     }
//! }
//!
//! register_component("page_counter", Arc::new(|| Arc::new(PageCounter) as Arc<dyn Component>))?;
//! # Ok::<(), docint::DocintError>(())
//! ```

pub mod registry;
pub mod traits;

pub use registry::{
    ComponentFactory, ComponentRegistry, get_component, get_component_registry, list_components,
    register_component, reset_components, unregister_component,
};
pub use traits::{Component, Plugin};
