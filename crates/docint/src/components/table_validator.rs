use crate::Result;
use crate::core::config::{ConfigLayer, defaults_layer, validate_layer};
use crate::core::scope::PipeConfig;
use crate::file::File;
use crate::plugins::{Component, Plugin};
use crate::table::validation::{ErrorSummary, TableErrorName, ValidationOptions, table_path};
use serde::{Deserialize, Serialize};

const NAME: &str = "table_validator";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableValidatorConfig {
    #[serde(default)]
    pub ignore_errors: Vec<TableErrorName>,
    /// Cells per row; the first row's count when unset.
    #[serde(default)]
    pub expected_cols: Option<usize>,
    /// Skip `TableEmptyHeaderError` for every table after the document's first.
    #[serde(default = "default_true")]
    pub ignore_header_for_later_tables: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TableValidatorConfig {
    fn default() -> Self {
        Self {
            ignore_errors: Vec::new(),
            expected_cols: None,
            ignore_header_for_later_tables: true,
        }
    }
}

/// Runs the structural checks on every table of a document and stores the
/// errors on the file under the pipe's name.
pub struct TableValidator;

impl Plugin for TableValidator {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn description(&self) -> &str {
        "Reports structural table defects"
    }
}

impl Component for TableValidator {
    fn assigns(&self) -> &[&'static str] {
        &["errors"]
    }

    fn requires(&self) -> &[&'static str] {
        &["tables"]
    }

    fn default_config(&self) -> Result<ConfigLayer> {
        defaults_layer::<TableValidatorConfig>()
    }

    fn validate_config(&self, layer: &ConfigLayer) -> Result<()> {
        validate_layer::<TableValidatorConfig>(NAME, &self.default_config()?, layer)
    }

    fn process(&self, mut file: File, config: &mut PipeConfig) -> Result<File> {
        let settings: TableValidatorConfig = config.typed()?;
        let Some(doc) = file.as_doc() else {
            return Ok(file);
        };

        let mut errors = Vec::new();
        for (pos, (page_idx, table_idx, table)) in doc.tables().enumerate() {
            let mut ignore = settings.ignore_errors.clone();
            if pos > 0 && settings.ignore_header_for_later_tables {
                ignore.push(TableErrorName::EmptyHeader);
            }
            let options = ValidationOptions {
                expected_cols: settings.expected_cols,
                ignore,
            };
            errors.extend(table.test(&table_path(page_idx, table_idx), &options));
        }

        let summary = ErrorSummary::from_errors(&errors);
        if summary.is_empty() {
            tracing::info!(file = %file.name(), "No table errors");
        } else {
            tracing::warn!(file = %file.name(), total = summary.total(), "Table errors: {}", summary);
            for error in &errors {
                tracing::info!(file = %file.name(), "{}", error);
            }
        }

        file.add_errors(config.pipe(), errors);
        Ok(file)
    }
}
