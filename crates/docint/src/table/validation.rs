//! Structural table validation.
//!
//! Validation never fails: [`Table::test`] walks the whole table and returns
//! every defect it finds as a [`TableDataError`], addressed by a dotted path such
//! as `p0.t1.b2.c0` (page 0, table 1, body row 2, cell 0). Header rows use `h`
//! instead of `b`. Callers decide what is severe and may suppress kinds by name.

use super::{Row, Table};
use crate::{DocintError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of an error kind, used to suppress kinds and to group summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableErrorName {
    #[serde(rename = "TableEmptyError")]
    Empty,
    #[serde(rename = "TableEmptyHeaderError")]
    EmptyHeader,
    #[serde(rename = "TableEmptyBodyError")]
    EmptyBody,
    #[serde(rename = "TableMismatchColsError")]
    MismatchCols,
    #[serde(rename = "TableEmptyHeaderCellError")]
    EmptyHeaderCell,
    #[serde(rename = "TableEmptyBodyCellError")]
    EmptyBodyCell,
    #[serde(rename = "TableNoGapError")]
    NoGap,
}

impl TableErrorName {
    pub const ALL: [TableErrorName; 7] = [
        Self::Empty,
        Self::EmptyHeader,
        Self::EmptyBody,
        Self::MismatchCols,
        Self::EmptyHeaderCell,
        Self::EmptyBodyCell,
        Self::NoGap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "TableEmptyError",
            Self::EmptyHeader => "TableEmptyHeaderError",
            Self::EmptyBody => "TableEmptyBodyError",
            Self::MismatchCols => "TableMismatchColsError",
            Self::EmptyHeaderCell => "TableEmptyHeaderCellError",
            Self::EmptyBodyCell => "TableEmptyBodyCellError",
            Self::NoGap => "TableNoGapError",
        }
    }
}

impl fmt::Display for TableErrorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableErrorName {
    type Err = DocintError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| DocintError::validation(format!("Unknown table error kind '{}'", s)))
    }
}

/// What went wrong, with the details each kind carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TableErrorKind {
    #[serde(rename = "TableEmptyError")]
    Empty,
    #[serde(rename = "TableEmptyHeaderError")]
    EmptyHeader,
    #[serde(rename = "TableEmptyBodyError")]
    EmptyBody,
    #[serde(rename = "TableMismatchColsError")]
    MismatchCols { expected: usize, actual: usize },
    /// `is_none` separates an absent (merged) cell from a present but empty one.
    #[serde(rename = "TableEmptyHeaderCellError")]
    EmptyHeaderCell { is_none: bool },
    #[serde(rename = "TableEmptyBodyCellError")]
    EmptyBodyCell { is_none: bool },
    /// A list item whose words leave no column gap; only recorded on request.
    #[serde(rename = "TableNoGapError")]
    NoGap { marker: String },
}

impl TableErrorKind {
    pub fn name(&self) -> TableErrorName {
        match self {
            Self::Empty => TableErrorName::Empty,
            Self::EmptyHeader => TableErrorName::EmptyHeader,
            Self::EmptyBody => TableErrorName::EmptyBody,
            Self::MismatchCols { .. } => TableErrorName::MismatchCols,
            Self::EmptyHeaderCell { .. } => TableErrorName::EmptyHeaderCell,
            Self::EmptyBodyCell { .. } => TableErrorName::EmptyBodyCell,
            Self::NoGap { .. } => TableErrorName::NoGap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDataError {
    pub path: String,
    #[serde(flatten)]
    pub kind: TableErrorKind,
}

impl TableDataError {
    pub fn new(path: impl Into<String>, kind: TableErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn name(&self) -> TableErrorName {
        self.kind.name()
    }
}

impl fmt::Display for TableDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TableErrorKind::MismatchCols { expected, actual } => {
                write!(f, "{} at {}: expected {} cells, found {}", self.name(), self.path, expected, actual)
            }
            TableErrorKind::EmptyHeaderCell { is_none } | TableErrorKind::EmptyBodyCell { is_none } => {
                let what = if *is_none { "absent" } else { "empty" };
                write!(f, "{} at {}: cell is {}", self.name(), self.path, what)
            }
            TableErrorKind::NoGap { marker } => {
                write!(f, "{} at {}: no column gap for item '{}'", self.name(), self.path, marker)
            }
            _ => write!(f, "{} at {}", self.name(), self.path),
        }
    }
}

/// Dotted path of a table on a page.
pub fn table_path(page_idx: usize, table_idx: usize) -> String {
    format!("p{}.t{}", page_idx, table_idx)
}

#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Expected cells per row. `None` takes the first row's cell count.
    pub expected_cols: Option<usize>,
    pub ignore: Vec<TableErrorName>,
}

impl ValidationOptions {
    fn keeps(&self, name: TableErrorName) -> bool {
        !self.ignore.contains(&name)
    }
}

impl Table {
    /// Run every structural check and return all defects found.
    pub fn test(&self, path: &str, options: &ValidationOptions) -> Vec<TableDataError> {
        let mut errors = Vec::new();
        let mut push = |path: String, kind: TableErrorKind| {
            if options.keeps(kind.name()) {
                errors.push(TableDataError::new(path, kind));
            }
        };

        if self.header_rows.is_empty() && self.body_rows.is_empty() {
            push(path.to_string(), TableErrorKind::Empty);
        }
        if self.header_rows.is_empty() {
            push(path.to_string(), TableErrorKind::EmptyHeader);
        }
        if self.body_rows.is_empty() {
            push(path.to_string(), TableErrorKind::EmptyBody);
        }

        let expected = options
            .expected_cols
            .or_else(|| self.rows().next().map(Row::num_cells));

        for (prefix, rows, header) in [("h", &self.header_rows, true), ("b", &self.body_rows, false)] {
            for (row_idx, row) in rows.iter().enumerate() {
                let row_path = format!("{}.{}{}", path, prefix, row_idx);

                if let Some(expected) = expected
                    && row.num_cells() != expected
                {
                    push(
                        row_path.clone(),
                        TableErrorKind::MismatchCols {
                            expected,
                            actual: row.num_cells(),
                        },
                    );
                }

                for (cell_idx, cell) in row.cells.iter().enumerate() {
                    let is_none = match cell {
                        None => true,
                        Some(region) if region.raw_text().trim().is_empty() => false,
                        Some(_) => continue,
                    };
                    let kind = if header {
                        TableErrorKind::EmptyHeaderCell { is_none }
                    } else {
                        TableErrorKind::EmptyBodyCell { is_none }
                    };
                    push(format!("{}.c{}", row_path, cell_idx), kind);
                }
            }
        }

        errors
    }
}

/// Count of errors per kind, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub counts: IndexMap<TableErrorName, usize>,
}

impl ErrorSummary {
    pub fn from_errors<'a>(errors: impl IntoIterator<Item = &'a TableDataError>) -> Self {
        let mut counts = IndexMap::new();
        for error in errors {
            *counts.entry(error.name()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn count(&self, name: TableErrorName) -> usize {
        self.counts.get(&name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl fmt::Display for ErrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.counts.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        f.write_str(&parts.join(", "))
    }
}
