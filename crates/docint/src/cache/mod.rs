//! JSON side-file cache.
//!
//! Each pipe writes `{output_dir}/{file_name}.{stub}.json` after processing a file
//! and, on later runs, loads it instead of recomputing. An unreadable or
//! unparsable entry is removed and treated as a miss.
//!
//! [`TableCache`] is the schema the table finders persist:
//!
//! ```json
//! {"table_infos": [[...tables of page 0...], ...],
//!  "heading_infos": [null, ...],
//!  "table_edges_infos": [[...], ...]}
//! ```

use crate::error::{DocintError, Result};
use crate::file::Doc;
use crate::region::Region;
use crate::table::{Table, TableEdges};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub struct SideFileCache {
    dir: PathBuf,
}

impl SideFileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file_name: &str, stub: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.json", file_name, stub))
    }

    pub fn contains(&self, file_name: &str, stub: &str) -> bool {
        self.path_for(file_name, stub).is_file()
    }

    /// Read and parse an entry. Corrupt entries are deleted and reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, file_name: &str, stub: &str) -> Result<Option<T>> {
        let path = self.path_for(file_name, stub);
        if !path.exists() {
            return Ok(None);
        }

        let parsed = fs::read_to_string(&path)
            .map_err(DocintError::from)
            .and_then(|content| serde_json::from_str::<T>(&content).map_err(DocintError::from));

        match parsed {
            Ok(value) => {
                tracing::debug!(path = %path.display(), "Cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt cache entry");
                if let Err(e) = fs::remove_file(&path) {
                    tracing::debug!("Failed to remove corrupted cache file: {}", e);
                }
                Ok(None)
            }
        }
    }

    pub fn set<T: Serialize>(&self, file_name: &str, stub: &str, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| DocintError::cache_with_source(format!("Failed to create cache directory {}", self.dir.display()), e))?;
        let path = self.path_for(file_name, stub);
        let data = serde_json::to_vec_pretty(value)?;
        fs::write(&path, data).map_err(|e| DocintError::cache_with_source("Failed to write cache file", e))?;
        tracing::debug!(path = %path.display(), "Cache written");
        Ok(path)
    }

    pub fn remove(&self, file_name: &str, stub: &str) -> Result<bool> {
        let path = self.path_for(file_name, stub);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }
}

/// Per-page table finder output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCache {
    pub table_infos: Vec<Vec<Table>>,
    #[serde(default)]
    pub heading_infos: Vec<Option<Region>>,
    #[serde(default)]
    pub table_edges_infos: Vec<Vec<TableEdges>>,
}

impl TableCache {
    pub fn from_doc(doc: &Doc) -> Self {
        Self {
            table_infos: doc.pages.iter().map(|p| p.tables.clone()).collect(),
            heading_infos: doc.pages.iter().map(|p| p.heading.clone()).collect(),
            table_edges_infos: doc.pages.iter().map(|p| p.table_edges.clone()).collect(),
        }
    }

    /// Restore the cached tables onto `doc`.
    ///
    /// # Errors
    ///
    /// Returns `DocintError::Cache` when the entry was written for a different page count.
    pub fn apply_to(self, doc: &mut Doc) -> Result<()> {
        if self.table_infos.len() != doc.pages.len() {
            return Err(DocintError::cache(format!(
                "Cache has {} pages but document '{}' has {}",
                self.table_infos.len(),
                doc.state.name,
                doc.pages.len()
            )));
        }

        let mut headings = self.heading_infos.into_iter();
        let mut edges = self.table_edges_infos.into_iter();
        for (page, tables) in doc.pages.iter_mut().zip(self.table_infos) {
            page.tables = tables;
            page.heading = headings.next().flatten();
            page.table_edges = edges.next().unwrap_or_default();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{FileState, Page};
    use crate::geometry::BBox;
    use crate::region::Word;
    use crate::table::Row;
    use tempfile::tempdir;

    fn doc_with_table() -> Doc {
        let mut page = Page::new(0, 100.0, 100.0, vec![]);
        let cell = Region::new(vec![Word::new("42", BBox::new(0.1, 0.1, 0.2, 0.2))]);
        page.tables = vec![Table::new(vec![], vec![Row::new(vec![Some(cell), None])])];
        Doc::new(FileState::new("report", "report.pdf"), vec![page, Page::new(1, 100.0, 100.0, vec![])])
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempdir().unwrap();
        let cache = SideFileCache::new(dir.path());
        let entry = TableCache::from_doc(&doc_with_table());

        let path = cache.set("report", "grid", &entry).unwrap();
        assert_eq!(path, dir.path().join("report.grid.json"));
        let loaded: TableCache = cache.get("report", "grid").unwrap().unwrap();
        assert_eq!(loaded, entry);
    }

    #[test]
    fn test_missing_entry() {
        let dir = tempdir().unwrap();
        let cache = SideFileCache::new(dir.path());
        assert!(cache.get::<TableCache>("nope", "grid").unwrap().is_none());
        assert!(!cache.remove("nope", "grid").unwrap());
    }

    #[test]
    fn test_corrupt_entry_is_removed() {
        let dir = tempdir().unwrap();
        let cache = SideFileCache::new(dir.path());
        fs::write(cache.path_for("report", "grid"), "{not json").unwrap();

        assert!(cache.get::<TableCache>("report", "grid").unwrap().is_none());
        assert!(!cache.contains("report", "grid"));
    }

    #[test]
    fn test_apply_restores_pages() {
        let source = doc_with_table();
        let entry = TableCache::from_doc(&source);

        let mut fresh = source.clone();
        for page in &mut fresh.pages {
            page.tables.clear();
        }
        entry.apply_to(&mut fresh).unwrap();
        assert_eq!(fresh.pages[0].tables, source.pages[0].tables);
        assert!(fresh.pages[1].tables.is_empty());
    }

    #[test]
    fn test_apply_rejects_page_mismatch() {
        let entry = TableCache {
            table_infos: vec![vec![]],
            ..Default::default()
        };
        let mut doc = doc_with_table();
        assert!(matches!(entry.apply_to(&mut doc), Err(DocintError::Cache { .. })));
    }
}
