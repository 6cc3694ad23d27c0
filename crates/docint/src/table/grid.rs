//! Grid-based table finding.
//!
//! A [`GridDetector`] reports table grids in page pixels: one rectangle per row
//! and one optional rectangle per cell. The finder normalizes them, assigns page
//! words to rows and cells by area overlap, and classifies every row as header,
//! body or skipped.

use super::{Row, Table, TableEdges};
use crate::Result;
use crate::file::{DetectedGrid, Doc, Page};
use crate::geometry::{BBox, DEFAULT_OVERLAP_PERCENT};
use crate::region::{Direction, Region};
use serde::{Deserialize, Serialize};

/// Which first rows become header rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderRowPolicy {
    /// Only the first row of the first table in the document.
    #[default]
    FirstPageFirstRow,
    /// The first row of the first table on every page.
    EveryPageFirstRow,
    /// The first row of every table.
    EveryPageEveryTableFirstRow,
    /// All rows are body rows.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridFinderConfig {
    #[serde(default = "default_true")]
    pub skip_row_with_merged_cells: bool,
    #[serde(default)]
    pub header_row_policy: HeaderRowPolicy,
    #[serde(default = "default_true")]
    pub capture_heading: bool,
    /// Height of the band above the first table searched for a heading, in pixels.
    #[serde(default = "default_heading_offset_px")]
    pub heading_offset_px: f64,
    #[serde(default = "default_overlap_percent")]
    pub overlap_percent: f64,
}

fn default_true() -> bool {
    true
}

fn default_heading_offset_px() -> f64 {
    150.0
}

fn default_overlap_percent() -> f64 {
    DEFAULT_OVERLAP_PERCENT
}

impl Default for GridFinderConfig {
    fn default() -> Self {
        Self {
            skip_row_with_merged_cells: default_true(),
            header_row_policy: HeaderRowPolicy::default(),
            capture_heading: default_true(),
            heading_offset_px: default_heading_offset_px(),
            overlap_percent: default_overlap_percent(),
        }
    }
}

/// Source of table grids for a page.
pub trait GridDetector: Send + Sync {
    fn detect(&self, page: &Page) -> Result<Vec<DetectedGrid>>;
}

/// Detector returning the grids already attached to the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputedGridDetector;

impl GridDetector for PrecomputedGridDetector {
    fn detect(&self, page: &Page) -> Result<Vec<DetectedGrid>> {
        Ok(page.grids.clone())
    }
}

/// Tables found on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageTables {
    pub tables: Vec<Table>,
    pub heading: Option<Region>,
    pub table_edges: Vec<TableEdges>,
    /// Paths (`p{page}.t{table}.r{row}`) of rows dropped for merged cells.
    pub skipped_rows: Vec<String>,
}

enum RowClass {
    Header,
    Body,
    Skip,
}

pub struct GridTableFinder<'a> {
    config: &'a GridFinderConfig,
    detector: &'a dyn GridDetector,
}

impl<'a> GridTableFinder<'a> {
    pub fn new(config: &'a GridFinderConfig, detector: &'a dyn GridDetector) -> Self {
        Self { config, detector }
    }

    /// Find tables on every page of `doc`, storing tables, heading and edges on
    /// each page. Returns the paths of skipped rows.
    pub fn find_in_doc(&self, doc: &mut Doc) -> Result<Vec<String>> {
        let mut doc_header_taken = false;
        let mut skipped = Vec::new();
        for (pos, page) in doc.pages.iter_mut().enumerate() {
            let found = self.find_in_page(page, pos == 0, &mut doc_header_taken)?;
            tracing::debug!(
                page = page.page_idx,
                tables = found.tables.len(),
                skipped_rows = found.skipped_rows.len(),
                "Grid tables found"
            );
            page.tables = found.tables;
            page.heading = found.heading;
            page.table_edges = found.table_edges;
            skipped.extend(found.skipped_rows);
        }
        Ok(skipped)
    }

    /// Build the tables of a single page.
    ///
    /// `doc_header_taken` tracks whether the document's first table was already
    /// built, for [`HeaderRowPolicy::FirstPageFirstRow`].
    pub fn find_in_page(&self, page: &Page, first_page: bool, doc_header_taken: &mut bool) -> Result<PageTables> {
        let grids = self.detector.detect(page)?;
        let mut out = PageTables::default();
        if page.width <= 0.0 || page.height <= 0.0 {
            if !grids.is_empty() {
                tracing::warn!(page = page.page_idx, "Page has no pixel dimensions, ignoring detected grids");
            }
            return Ok(out);
        }

        let page_region = page.region();
        for (table_idx, grid) in grids.iter().enumerate() {
            let header_allowed = match self.config.header_row_policy {
                HeaderRowPolicy::FirstPageFirstRow => !*doc_header_taken,
                HeaderRowPolicy::EveryPageFirstRow => table_idx == 0,
                HeaderRowPolicy::EveryPageEveryTableFirstRow => true,
                HeaderRowPolicy::None => false,
            };
            *doc_header_taken = true;

            let mut table = Table {
                bbox: grid.bbox().map(|r| r.normalize(page.width, page.height)),
                ..Default::default()
            };

            let mut row_idx = 0;
            for (grid_row_idx, detected) in grid.rows.iter().enumerate() {
                let row_box = detected.bbox.normalize(page.width, page.height);
                let row_words = Region::new(page_region.words_in(&row_box, self.config.overlap_percent));
                let cells = detected
                    .cells
                    .iter()
                    .map(|rect| {
                        rect.map(|r| {
                            let cell_box = r.normalize(page.width, page.height);
                            Region::new(row_words.words_in(&cell_box, self.config.overlap_percent))
                        })
                    })
                    .collect();
                let row = Row::new(cells);

                let class = if row.has_merged_cell() && self.config.skip_row_with_merged_cells {
                    RowClass::Skip
                } else if row_idx == 0 && header_allowed {
                    RowClass::Header
                } else {
                    RowClass::Body
                };

                match class {
                    RowClass::Skip => {
                        out.skipped_rows
                            .push(format!("p{}.t{}.r{}", page.page_idx, table_idx, grid_row_idx));
                        continue;
                    }
                    RowClass::Header => table.header_rows.push(row),
                    RowClass::Body => table.body_rows.push(row),
                }
                row_idx += 1;
            }

            let edges = TableEdges::from_edges(grid.edges.iter().map(|e| e.normalize(page.width, page.height)));
            table.edges = Some(edges.clone());
            out.table_edges.push(edges);
            out.tables.push(table);
        }

        if first_page
            && self.config.capture_heading
            && let Some(anchor) = out.tables.first().and_then(Table::bbox)
        {
            out.heading = heading_above(&page_region, &anchor, page.normalize_height(self.config.heading_offset_px));
            if let Some(first) = out.tables.first_mut() {
                first.heading = out.heading.clone();
            }
        }

        Ok(out)
    }
}

fn heading_above(page_region: &Region, anchor: &BBox, offset: f64) -> Option<Region> {
    let heading = page_region.words_to_bbox(Direction::Above, anchor, offset);
    (!heading.is_empty()).then_some(heading)
}
