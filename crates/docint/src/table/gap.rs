//! Gap-based table finding for list items.
//!
//! Many documents lay out key/value pairs as list items with a wide blank column
//! between label and value. For every list item the finder projects its words onto
//! a row of `num_slots` horizontal slots, looks for the longest empty run inside
//! a search window, and splits the item's words on either side of that run. Each
//! item becomes a `[marker, left, right]` row.

use super::{Row, Table};
use crate::file::{ListItem, Page};
use crate::geometry::BBox;
use crate::region::{Region, Word};
use serde::{Deserialize, Serialize};

/// What to do with a list item that has no gap in the search window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingGapPolicy {
    /// Drop the item and record an edit.
    #[default]
    Skip,
    /// Drop the item and record a `TableNoGapError`.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GapFinderConfig {
    #[serde(default = "default_num_slots")]
    pub num_slots: usize,
    /// Normalized `[start, end]` range searched for the gap.
    #[serde(default = "default_window")]
    pub window: (f64, f64),
    #[serde(default = "default_margin_slots")]
    pub margin_slots: usize,
    #[serde(default)]
    pub on_missing_gap: MissingGapPolicy,
}

fn default_num_slots() -> usize {
    1000
}

fn default_window() -> (f64, f64) {
    (0.3, 0.6)
}

fn default_margin_slots() -> usize {
    5
}

impl Default for GapFinderConfig {
    fn default() -> Self {
        Self {
            num_slots: default_num_slots(),
            window: default_window(),
            margin_slots: default_margin_slots(),
            on_missing_gap: MissingGapPolicy::default(),
        }
    }
}

/// A list item that produced no row.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingGap {
    /// `p{page}.l{item}`
    pub path: String,
    pub marker: String,
}

/// Result of running the finder over one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GapTables {
    pub table: Option<Table>,
    pub missing: Vec<MissingGap>,
}

/// Longest run of empty slots inside the window, expanded by the margin.
///
/// Returns the normalized `(start, end)` of the expanded run, or `None` when every
/// slot in the window is covered.
pub fn find_gap(words: &[Word], config: &GapFinderConfig) -> Option<(f64, f64)> {
    let n = config.num_slots;
    if n == 0 {
        return None;
    }
    let nf = n as f64;
    let to_slot = |v: f64| (v.max(0.0) * nf).min(nf);

    let mut coverage = vec![0u32; n];
    for word in words {
        let start = to_slot(word.bbox.x0()).floor() as usize;
        let end = to_slot(word.bbox.x1()).ceil() as usize;
        if start >= end {
            continue;
        }
        for slot in &mut coverage[start.min(n)..end.min(n)] {
            *slot += 1;
        }
    }

    let lo = to_slot(config.window.0).floor() as usize;
    let hi = to_slot(config.window.1).floor() as usize;

    let mut best: Option<(usize, usize)> = None;
    let mut run_start = None;
    for slot in lo..=hi {
        let empty = slot < hi && coverage[slot] == 0;
        match (empty, run_start) {
            (true, None) => run_start = Some(slot),
            (false, Some(start)) => {
                if best.is_none_or(|(s, e)| slot - start > e - s) {
                    best = Some((start, slot));
                }
                run_start = None;
            }
            _ => {}
        }
    }

    best.map(|(start, end)| {
        let start = start.saturating_sub(config.margin_slots);
        let end = (end + config.margin_slots).min(n);
        (start as f64 / nf, end as f64 / nf)
    })
}

/// Split a list item into `[marker, left, right]` around its gap.
pub fn split_item(item: &ListItem, config: &GapFinderConfig) -> Option<Row> {
    let (start, end) = find_gap(&item.region.words, config)?;
    let left = item
        .region
        .words
        .iter()
        .filter(|w| w.bbox.x0() < start)
        .cloned()
        .collect();
    let right = item
        .region
        .words
        .iter()
        .filter(|w| w.bbox.x1() > end)
        .cloned()
        .collect();
    Some(Row::new(vec![
        Some(marker_cell(item)),
        Some(Region::new(left)),
        Some(Region::new(right)),
    ]))
}

fn marker_cell(item: &ListItem) -> Region {
    if item.marker.is_empty() {
        return Region::default();
    }
    let bbox = item.marker_bbox.unwrap_or_else(|| match item.region.bbox() {
        Some(b) => BBox::new(b.x0(), b.y0(), b.x0(), b.y1()),
        None => BBox::default(),
    });
    Region::new(vec![Word::new(item.marker.clone(), bbox)])
}

/// Build one table from all list items of `page`.
pub fn find_in_page(page: &Page, config: &GapFinderConfig) -> GapTables {
    let mut out = GapTables::default();
    let mut rows = Vec::new();
    for (item_idx, item) in page.list_items.iter().enumerate() {
        match split_item(item, config) {
            Some(row) => rows.push(row),
            None => out.missing.push(MissingGap {
                path: format!("p{}.l{}", page.page_idx, item_idx),
                marker: item.marker.clone(),
            }),
        }
    }
    if !rows.is_empty() {
        out.table = Some(Table::new(vec![], rows));
    }
    out
}
