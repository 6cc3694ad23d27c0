use super::{page_scope, table_restore, table_snapshot};
use crate::Result;
use crate::core::config::{ConfigLayer, defaults_layer, validate_layer};
use crate::core::scope::PipeConfig;
use crate::file::File;
use crate::plugins::{Component, Plugin};
use crate::table::gap::{GapFinderConfig, MissingGapPolicy, find_in_page};
use crate::table::validation::{TableDataError, TableErrorKind};
use serde_json::Value;

const NAME: &str = "list_table_finder";

/// Turns the list items of each page into one `[marker, left, right]` table.
pub struct ListTableFinder;

impl Plugin for ListTableFinder {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn description(&self) -> &str {
        "Splits list items into two-column tables at their widest blank gap"
    }
}

impl Component for ListTableFinder {
    fn assigns(&self) -> &[&'static str] {
        &["tables"]
    }

    fn requires(&self) -> &[&'static str] {
        &["words", "list_items"]
    }

    fn default_config(&self) -> Result<ConfigLayer> {
        defaults_layer::<GapFinderConfig>()
    }

    fn validate_config(&self, layer: &ConfigLayer) -> Result<()> {
        validate_layer::<GapFinderConfig>(NAME, &self.default_config()?, layer)
    }

    fn process(&self, mut file: File, config: &mut PipeConfig) -> Result<File> {
        let pipe = config.pipe().to_string();
        let Some(doc) = file.as_doc_mut() else {
            return Ok(file);
        };

        let mut no_gap_errors = Vec::new();
        let mut skipped = Vec::new();
        for page in &mut doc.pages {
            let scope = config.enter_scope(&page_scope(page.page_idx))?;
            let settings: GapFinderConfig = scope.typed()?;
            let found = find_in_page(page, &settings);
            page.tables = found.table.into_iter().collect();

            for missing in found.missing {
                tracing::warn!(pipe = %pipe, path = %missing.path, marker = %missing.marker, "No column gap in list item");
                match settings.on_missing_gap {
                    MissingGapPolicy::Skip => skipped.push(missing.path),
                    MissingGapPolicy::Error => no_gap_errors.push(TableDataError::new(
                        missing.path,
                        TableErrorKind::NoGap { marker: missing.marker },
                    )),
                }
            }
        }

        for path in skipped {
            file.add_edit(&pipe, path, "skipped list item without column gap");
        }
        if !no_gap_errors.is_empty() {
            file.add_errors(&pipe, no_gap_errors);
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
