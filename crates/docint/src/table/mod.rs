//! Table model and table finders.
//!
//! Tables are immutable snapshots: a finder builds them once per page from the
//! page's words and the externally detected layout, after which they are cached
//! and reloaded verbatim.
//!
//! - [`grid`] - tables from detected row/column rectangles
//! - [`gap`] - two-column tables inferred from list items
//! - [`validation`] - structural checks producing [`validation::TableDataError`]s

pub mod gap;
pub mod grid;
pub mod validation;

use crate::geometry::{BBox, Edge};
use crate::region::{Region, Word};
use serde::{Deserialize, Serialize};

/// A table cell. Absent (merged) cells are represented by `None` in [`Row::cells`].
pub type Cell = Region;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<Option<Cell>>,
}

impl Row {
    pub fn new(cells: Vec<Option<Cell>>) -> Self {
        Self { cells }
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Words of all present cells, left to right.
    pub fn words(&self) -> Vec<&Word> {
        self.cells.iter().flatten().flat_map(|c| c.words.iter()).collect()
    }

    pub fn has_merged_cell(&self) -> bool {
        self.cells.iter().any(Option::is_none)
    }

    /// Cell texts, with `None` for absent cells.
    pub fn texts(&self) -> Vec<Option<String>> {
        self.cells.iter().map(|c| c.as_ref().map(Region::text)).collect()
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.cells
            .iter()
            .flatten()
            .filter_map(Region::bbox)
            .reduce(|acc, b| acc.union(&b))
    }
}

/// Raw grid lines of a table, kept independently of its rows and cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableEdges {
    pub horizontal: Vec<Edge>,
    pub vertical: Vec<Edge>,
}

impl TableEdges {
    pub fn from_edges(edges: impl IntoIterator<Item = Edge>) -> Self {
        let (horizontal, vertical) = edges.into_iter().partition(Edge::is_horizontal);
        Self { horizontal, vertical }
    }

    pub fn len(&self) -> usize {
        self.horizontal.len() + self.vertical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub header_rows: Vec<Row>,
    pub body_rows: Vec<Row>,
    /// Extent of the detected grid; falls back to the word extent when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<TableEdges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<Region>,
}

impl Table {
    pub fn new(header_rows: Vec<Row>, body_rows: Vec<Row>) -> Self {
        Self {
            header_rows,
            body_rows,
            ..Default::default()
        }
    }

    /// Header rows followed by body rows.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.header_rows.iter().chain(self.body_rows.iter())
    }

    pub fn num_rows(&self) -> usize {
        self.header_rows.len() + self.body_rows.len()
    }

    /// Every word of every row, header rows first.
    pub fn words(&self) -> Vec<&Word> {
        self.rows().flat_map(Row::words).collect()
    }

    pub fn region(&self) -> Region {
        Region::new(self.words().into_iter().cloned().collect())
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.bbox
            .or_else(|| self.rows().filter_map(Row::bbox).reduce(|acc, b| acc.union(&b)))
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }
}
