//! Built-in components.
//!
//! - `grid_table_finder` - tables from detected grids ([`GridTableFinderComponent`])
//! - `list_table_finder` - two-column tables from list items ([`ListTableFinder`])
//! - `table_validator` - structural checks on found tables ([`TableValidator`])
//!
//! Both finders read their settings per page inside a `page_{idx}` scope, so a
//! per-document config can tune a single page through `scope_configs`.

mod grid_table_finder;
mod list_table_finder;
mod table_validator;

pub use grid_table_finder::GridTableFinderComponent;
pub use list_table_finder::ListTableFinder;
pub use table_validator::{TableValidator, TableValidatorConfig};

use crate::Result;
use crate::cache::TableCache;
use crate::file::File;
use crate::plugins::{Component, ComponentFactory};
use serde_json::Value;
use std::sync::Arc;

pub(crate) fn builtin_factories() -> Vec<(&'static str, ComponentFactory)> {
    vec![
        (
            "grid_table_finder",
            Arc::new(|| Arc::new(GridTableFinderComponent::default()) as Arc<dyn Component>) as ComponentFactory,
        ),
        (
            "list_table_finder",
            Arc::new(|| Arc::new(ListTableFinder) as Arc<dyn Component>),
        ),
        (
            "table_validator",
            Arc::new(|| Arc::new(TableValidator) as Arc<dyn Component>),
        ),
    ]
}

/// Scope name used for page-level overrides.
pub fn page_scope(page_idx: usize) -> String {
    format!("page_{}", page_idx)
}

fn table_snapshot(file: &File) -> Result<Option<Value>> {
    match file.as_doc() {
        Some(doc) => Ok(Some(serde_json::to_value(TableCache::from_doc(doc))?)),
        None => Ok(None),
    }
}

fn table_restore(file: &mut File, snapshot: Value) -> Result<()> {
    if let Some(doc) = file.as_doc_mut() {
        let cache: TableCache = serde_json::from_value(snapshot)?;
        cache.apply_to(doc)?;
    }
    Ok(())
}
