//! Words and regions of words.
//!
//! A [`Region`] is an ordered sequence of [`Word`]s. Text, visual lines and the
//! bounding box are derived on demand and never stored, so a region reloaded from
//! a cache file behaves exactly like the one that was written.

use crate::geometry::BBox;
use crate::{DocintError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The atomic unit of page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub bbox: BBox,
}

impl Word {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Search direction for [`Region::words_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
    Left,
    Right,
}

impl FromStr for Direction {
    type Err = DocintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "above" => Ok(Self::Above),
            "below" => Ok(Self::Below),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(DocintError::validation(format!("Unknown direction '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub words: Vec<Word>,
}

impl Region {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Union of all word boxes, `None` for an empty region.
    pub fn bbox(&self) -> Option<BBox> {
        let mut iter = self.words.iter();
        let first = iter.next()?.bbox;
        Some(iter.fold(first, |acc, w| acc.union(&w.bbox)))
    }

    /// Word texts joined by a single space, in stored order.
    pub fn raw_text(&self) -> String {
        self.words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ")
    }

    /// Text in reading order: one output line per visual line.
    pub fn text(&self) -> String {
        self.word_lines()
            .iter()
            .map(|line| line.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Group words into visual lines, top to bottom, each line left to right.
    ///
    /// A word joins the current line when its vertical centre falls inside the
    /// line's vertical extent.
    pub fn word_lines(&self) -> Vec<Vec<&Word>> {
        let mut sorted: Vec<&Word> = self.words.iter().collect();
        sorted.sort_by(|a, b| a.bbox.y_center().total_cmp(&b.bbox.y_center()));

        let mut lines: Vec<(f64, f64, Vec<&Word>)> = Vec::new();
        for word in sorted {
            let center = word.bbox.y_center();
            match lines.last_mut() {
                Some((y0, y1, line)) if center >= *y0 && center <= *y1 => {
                    *y0 = y0.min(word.bbox.y0());
                    *y1 = y1.max(word.bbox.y1());
                    line.push(word);
                }
                _ => lines.push((word.bbox.y0(), word.bbox.y1(), vec![word])),
            }
        }

        lines
            .into_iter()
            .map(|(_, _, mut line)| {
                line.sort_by(|a, b| a.bbox.x0().total_cmp(&b.bbox.x0()));
                line
            })
            .collect()
    }

    /// Words lying before `anchor` along `direction`, within `offset` of its edge.
    ///
    /// A word qualifies when it sits entirely on the `direction` side of the
    /// anchor and entirely inside the band of width `offset` adjacent to the
    /// anchor. An empty anchor yields an empty region.
    pub fn words_to(&self, direction: Direction, anchor: &Region, offset: f64) -> Region {
        match anchor.bbox() {
            Some(bbox) => self.words_to_bbox(direction, &bbox, offset),
            None => Region::default(),
        }
    }

    /// Same as [`Region::words_to`] with an explicit anchor box.
    pub fn words_to_bbox(&self, direction: Direction, anchor: &BBox, offset: f64) -> Region {
        let words = self
            .words
            .iter()
            .filter(|w| {
                let b = &w.bbox;
                match direction {
                    Direction::Above => b.y1() <= anchor.y0() && b.y0() >= anchor.y0() - offset,
                    Direction::Below => b.y0() >= anchor.y1() && b.y1() <= anchor.y1() + offset,
                    Direction::Left => b.x1() <= anchor.x0() && b.x0() >= anchor.x0() - offset,
                    Direction::Right => b.x0() >= anchor.x1() && b.x1() <= anchor.x1() + offset,
                }
            })
            .cloned()
            .collect();
        Region::new(words)
    }

    /// Words of this region that `bbox` covers by at least `percent`% of their area.
    pub fn words_in(&self, bbox: &BBox, percent: f64) -> Vec<Word> {
        self.words
            .iter()
            .filter(|w| bbox.overlaps(&w.bbox, percent))
            .cloned()
            .collect()
    }
}

impl From<Vec<Word>> for Region {
    fn from(words: Vec<Word>) -> Self {
        Self::new(words)
    }
}
