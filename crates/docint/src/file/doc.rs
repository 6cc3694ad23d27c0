//! Documents and pages.

use super::FileState;
use crate::geometry::{PixelEdge, PixelRect};
use crate::region::{Region, Word};
use crate::table::{Table, TableEdges};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A row reported by a grid detector.
///
/// `cells` holds one rectangle per column; `None` marks a column whose cell
/// was merged into a neighbour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedRow {
    pub bbox: PixelRect,
    pub cells: Vec<Option<PixelRect>>,
}

/// One table grid reported by a grid detector, in page pixels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedGrid {
    pub rows: Vec<DetectedRow>,
    /// Every line segment the detector saw, whether or not it bounds a cell.
    #[serde(default)]
    pub edges: Vec<PixelEdge>,
}

impl DetectedGrid {
    /// Bounding rectangle of all rows.
    pub fn bbox(&self) -> Option<PixelRect> {
        self.rows.iter().map(|r| r.bbox).reduce(|a, b| {
            PixelRect::new(a.x0.min(b.x0), a.y0.min(b.y0), a.x1.max(b.x1), a.y1.max(b.y1))
        })
    }
}

/// A list item found on a page by an upstream list detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub marker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_bbox: Option<crate::geometry::BBox>,
    pub region: Region,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_idx: usize,
    /// Page width in pixels of the rendering the detectors worked on.
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub list_items: Vec<ListItem>,
    #[serde(default)]
    pub grids: Vec<DetectedGrid>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub heading: Option<Region>,
    #[serde(default)]
    pub table_edges: Vec<TableEdges>,
}

impl Page {
    pub fn new(page_idx: usize, width: f64, height: f64, words: Vec<Word>) -> Self {
        Self {
            page_idx,
            width,
            height,
            words,
            ..Default::default()
        }
    }

    /// All words of the page as a region.
    pub fn region(&self) -> Region {
        Region::new(self.words.clone())
    }

    /// Convert a vertical pixel distance to normalized units.
    pub fn normalize_height(&self, pixels: f64) -> f64 {
        if self.height > 0.0 { pixels / self.height } else { 0.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    #[serde(flatten)]
    pub state: FileState,
    pub pages: Vec<Page>,
}

impl Doc {
    pub fn new(state: FileState, pages: Vec<Page>) -> Self {
        Self { state, pages }
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn tables(&self) -> impl Iterator<Item = (usize, usize, &Table)> {
        self.pages
            .iter()
            .flat_map(|p| p.tables.iter().enumerate().map(move |(t, table)| (p.page_idx, t, table)))
    }

    /// Write the document to `{dir}/{name}.json`, returning the written path.
    pub fn save_json(&self, dir: &Path) -> Result<std::path::PathBuf> {
        super::write_json(dir, &self.state.name, self)
    }

    /// Load a document previously written with [`Doc::save_json`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut doc: Doc = serde_json::from_str(&content)?;
        if doc.state.name.is_empty() {
            doc.state.name = super::file_stem(path);
        }
        doc.state.path = path.to_path_buf();
        Ok(doc)
    }
}

/// Backend that turns a PDF into pages of words.
///
/// Text extraction and OCR live outside this crate; the engine only needs a
/// document with word geometry.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Doc>;
}
