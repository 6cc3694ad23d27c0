//! Docint - table extraction from word-geometry documents.
//!
//! Documents arrive as pages of positioned words (plus detected grids and list
//! items) and flow through a configurable pipeline of components that find
//! tables, validate them and record what they changed.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use docint::{Pipeline, PipelineSettings};
//! use std::path::PathBuf;
//!
//! # fn main() -> docint::Result<()> {
//! let settings = PipelineSettings::from_yaml_file("pipeline.yml")?;
//! let mut pipeline = Pipeline::from_settings(settings)?;
//!
//! for file in pipeline.run(&[PathBuf::from("report.json")])? {
//!     let file = file?;
//!     println!("{}: {} pipes", file.name(), file.state().pipe_names.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`geometry`] and [`region`] - normalized boxes, words and text regions
//! - [`table`] - table model, grid and gap finders, structural validation
//! - [`file`] - documents, audio and video inputs and their processing history
//! - [`core`] - pipeline settings, scoped config, execution
//! - [`plugins`] - the component trait and global registry
//! - [`components`] - built-in components
//! - [`cache`] - side-file caching of component output

#![deny(unsafe_code)]

pub mod cache;
pub mod components;
pub mod core;
pub mod error;
pub mod file;
pub mod geometry;
pub mod plugins;
pub mod region;
pub mod table;

pub use error::{DocintError, Result};

pub use core::config::{PipeSettings, PipelineSettings, ScopedConfig};
pub use core::pipeline::{Pipe, Pipeline};
pub use core::scope::PipeConfig;

pub use file::{Doc, DocumentLoader, File, FileKind, Page};
pub use geometry::BBox;
pub use region::{Region, Word};
pub use table::Table;
pub use table::validation::{TableDataError, TableErrorKind, TableErrorName};

pub use plugins::{Component, Plugin, get_component, list_components, register_component};
