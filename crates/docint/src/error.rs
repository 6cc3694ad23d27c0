//! Error types for docint.
//!
//! All fallible operations return [`DocintError`]. The variants split into two
//! groups that the pipeline engine treats differently:
//!
//! **Fatal errors** signal an integration or configuration mistake and are never
//! recovered, not even in batch mode:
//! - `Validation` - invalid pipeline or component configuration
//! - `MissingComponent` - a pipe names a component that was never registered
//! - `UnsupportedFormat` - an input file with an unknown extension
//! - `MissingDependency` - e.g. a PDF input without a document loader
//! - `LockPoisoned` - the global registry lock was poisoned
//!
//! **Per-file errors** (`Io`, `Parsing`, `Plugin`, `Cache`, `Serialization`, `Other`)
//! drop the offending file from a batch and propagate in single-file mode.
//!
//! Structural table defects are *not* errors of this type; see
//! [`crate::table::validation::TableDataError`].
//!
//! # Example
//!
//! ```rust
//! use docint::{DocintError, Result};
//!
//! fn read_pipeline(path: &str) -> Result<String> {
//!     let content = std::fs::read_to_string(path)?;
//!     if content.trim().is_empty() {
//!         return Err(DocintError::validation(format!("Pipeline file is empty: {}", path)));
//!     }
//!     Ok(content)
//! }
//! ```
use thiserror::Error;

/// Result type alias using `DocintError`.
pub type Result<T> = std::result::Result<T, DocintError>;

/// Main error type for all docint operations.
#[derive(Debug, Error)]
pub enum DocintError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Component '{0}' is not registered")]
    MissingComponent(String),

    #[error("Component error in '{component}': {message}")]
    Plugin { message: String, component: String },

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for DocintError {
    fn from(err: serde_json::Error) -> Self {
        DocintError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml_ng::Error> for DocintError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        DocintError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for DocintError {
    fn from(err: toml::de::Error) -> Self {
        DocintError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl DocintError {
    error_constructor!(parsing, Parsing);
    error_constructor!(validation, Validation);
    error_constructor!(cache, Cache);
    error_constructor!(serialization, Serialization);

    /// Create a component failure attributed to `component`.
    pub fn plugin<S: Into<String>, N: Into<String>>(component: N, message: S) -> Self {
        Self::Plugin {
            message: message.into(),
            component: component.into(),
        }
    }

    /// Whether this error must abort a batch instead of dropping a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::MissingComponent(_)
                | Self::UnsupportedFormat(_)
                | Self::MissingDependency(_)
                | Self::LockPoisoned(_)
        )
    }
}
