#![allow(dead_code)]

use docint::core::config::{ConfigLayer, defaults_layer, validate_layer};
use docint::file::{DetectedGrid, DetectedRow, Doc, FileState, ListItem, Page};
use docint::geometry::{BBox, PixelRect};
use docint::plugins::{Component, Plugin};
use docint::region::{Region, Word};
use docint::{DocintError, File, PipeConfig, PipeSettings, PipelineSettings, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings rooted in a temporary directory.
pub fn settings(root: &Path, pipes: Vec<PipeSettings>) -> PipelineSettings {
    PipelineSettings {
        name: "test".to_string(),
        output_dir: root.join("output"),
        config_dir: root.join("conf"),
        log_dir: root.join("logs"),
        pipes,
        ..Default::default()
    }
}

/// A 100x100 page with one two-row, two-column grid.
pub fn grid_page(page_idx: usize) -> Page {
    let words = vec![
        Word::new("Item", BBox::new(0.12, 0.11, 0.2, 0.13)),
        Word::new("Price", BBox::new(0.52, 0.11, 0.6, 0.13)),
        Word::new("Tea", BBox::new(0.12, 0.21, 0.18, 0.23)),
        Word::new("4.20", BBox::new(0.52, 0.21, 0.58, 0.23)),
    ];
    let mut page = Page::new(page_idx, 100.0, 100.0, words);
    page.grids = vec![DetectedGrid {
        rows: vec![
            DetectedRow {
                bbox: PixelRect::new(10.0, 10.0, 90.0, 20.0),
                cells: vec![
                    Some(PixelRect::new(10.0, 10.0, 50.0, 20.0)),
                    Some(PixelRect::new(50.0, 10.0, 90.0, 20.0)),
                ],
            },
            DetectedRow {
                bbox: PixelRect::new(10.0, 20.0, 90.0, 30.0),
                cells: vec![
                    Some(PixelRect::new(10.0, 20.0, 50.0, 30.0)),
                    Some(PixelRect::new(50.0, 20.0, 90.0, 30.0)),
                ],
            },
        ],
        edges: vec![],
    }];
    page
}

/// A page with one list item split by a wide gap.
pub fn list_page(page_idx: usize) -> Page {
    let mut page = Page::new(page_idx, 1000.0, 1000.0, vec![]);
    page.list_items = vec![ListItem {
        marker: "1.".to_string(),
        marker_bbox: Some(BBox::new(0.0, 0.1, 0.02, 0.12)),
        region: Region::new(vec![
            Word::new("Rent", BBox::new(0.05, 0.1, 0.2, 0.12)),
            Word::new("900", BBox::new(0.7, 0.1, 0.8, 0.12)),
        ]),
    }];
    page
}

pub fn doc(name: &str, pages: Vec<Page>) -> Doc {
    Doc::new(FileState::new(name, format!("{}.json", name)), pages)
}

/// Write `doc` as a cached document under `dir` and return its path.
pub fn write_doc(dir: &Path, doc: &Doc) -> PathBuf {
    doc.save_json(dir).unwrap()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EchoConfig {
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    /// Files whose name contains this fail with a per-file error.
    #[serde(default)]
    pub fail_on: Option<String>,
    /// Files whose name contains this are rejected with a `Validation` error.
    #[serde(default)]
    pub reject_on: Option<String>,
}

fn default_threshold() -> i64 {
    1
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            fail_on: None,
            reject_on: None,
        }
    }
}

/// Records the resolved `threshold` as an edit, optionally failing some files.
pub struct Echo;

impl Plugin for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn version(&self) -> String {
        "0.1.0".to_string()
    }
}

impl Component for Echo {
    fn default_config(&self) -> Result<ConfigLayer> {
        defaults_layer::<EchoConfig>()
    }

    fn validate_config(&self, layer: &ConfigLayer) -> Result<()> {
        validate_layer::<EchoConfig>("echo", &self.default_config()?, layer)
    }

    fn process(&self, mut file: File, config: &mut PipeConfig) -> Result<File> {
        let settings: EchoConfig = config.typed()?;
        if let Some(pattern) = &settings.fail_on
            && file.name().contains(pattern.as_str())
        {
            return Err(DocintError::plugin("echo", format!("refusing {}", file.name())));
        }
        if let Some(pattern) = &settings.reject_on
            && file.name().contains(pattern.as_str())
        {
            return Err(DocintError::validation(format!("bad data in {}", file.name())));
        }
        let pipe = config.pipe().to_string();
        file.add_edit(&pipe, "doc", format!("threshold={}", settings.threshold));
        Ok(file)
    }
}

/// The `threshold=` edit an echo pipe left on `file`.
pub fn echoed_threshold(file: &File, pipe: &str) -> Option<i64> {
    file.state()
        .edits
        .iter()
        .find(|e| e.pipe == pipe)
        .and_then(|e| e.description.strip_prefix("threshold="))
        .and_then(|v| v.parse().ok())
}
