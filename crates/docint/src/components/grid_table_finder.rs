use super::{page_scope, table_restore, table_snapshot};
use crate::Result;
use crate::core::config::{ConfigLayer, defaults_layer, validate_layer};
use crate::core::scope::PipeConfig;
use crate::file::File;
use crate::plugins::{Component, Plugin};
use crate::table::grid::{GridDetector, GridFinderConfig, GridTableFinder, PrecomputedGridDetector};
use serde_json::Value;
use std::sync::Arc;

const NAME: &str = "grid_table_finder";

/// Finds tables from detected grids. Uses the grids attached to each page unless
/// built with another [`GridDetector`].
pub struct GridTableFinderComponent {
    detector: Arc<dyn GridDetector>,
}

impl GridTableFinderComponent {
    pub fn with_detector(detector: Arc<dyn GridDetector>) -> Self {
        Self { detector }
    }
}

impl Default for GridTableFinderComponent {
    fn default() -> Self {
        Self::with_detector(Arc::new(PrecomputedGridDetector))
    }
}

impl Plugin for GridTableFinderComponent {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn description(&self) -> &str {
        "Builds header and body rows from detected table grids"
    }
}

impl Component for GridTableFinderComponent {
    fn assigns(&self) -> &[&'static str] {
        &["tables", "heading", "table_edges"]
    }

    fn requires(&self) -> &[&'static str] {
        &["words", "grids"]
    }

    fn default_config(&self) -> Result<ConfigLayer> {
        defaults_layer::<GridFinderConfig>()
    }

    fn validate_config(&self, layer: &ConfigLayer) -> Result<()> {
        validate_layer::<GridFinderConfig>(NAME, &self.default_config()?, layer)
    }

    fn process(&self, mut file: File, config: &mut PipeConfig) -> Result<File> {
        let pipe = config.pipe().to_string();
        let Some(doc) = file.as_doc_mut() else {
            return Ok(file);
        };

        let mut doc_header_taken = false;
        let mut skipped = Vec::new();
        for (pos, page) in doc.pages.iter_mut().enumerate() {
            let scope = config.enter_scope(&page_scope(page.page_idx))?;
            let settings: GridFinderConfig = scope.typed()?;
            let found = GridTableFinder::new(&settings, self.detector.as_ref()).find_in_page(
                page,
                pos == 0,
                &mut doc_header_taken,
            )?;
            tracing::debug!(page = page.page_idx, tables = found.tables.len(), "Grid tables found");
            page.tables = found.tables;
            page.heading = found.heading;
            page.table_edges = found.table_edges;
            skipped.extend(found.skipped_rows);
        }

        for path in skipped {
            tracing::info!(pipe = %pipe, path = %path, "Skipped row with merged cells");
            file.add_edit(&pipe, path, "skipped row with merged cells");
        }
        Ok(file)
    }

    fn cacheable(&self) -> bool {
        true
    }

    fn cache_snapshot(&self, file: &File) -> Result<Option<Value>> {
        table_snapshot(file)
    }

    fn cache_restore(&self, file: &mut File, snapshot: Value) -> Result<()> {
        table_restore(file, snapshot)
    }
}
