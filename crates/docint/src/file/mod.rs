//! Pipeline inputs.
//!
//! Every input becomes a [`File`]: a document, an audio recording or a video,
//! picked by file extension. All variants share a [`FileState`] that records
//! which pipes touched the file and the errors and edits those pipes left behind.

mod doc;
mod media;

pub use doc::{DetectedGrid, DetectedRow, Doc, DocumentLoader, ListItem, Page};
pub use media::{Audio, TranscriptSegment, Video};

use crate::table::validation::TableDataError;
use crate::{DocintError, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// A PDF built through a [`DocumentLoader`].
    Document,
    /// A document previously serialized to JSON.
    CachedDocument,
    Audio,
    Video,
}

static EXT_TO_KIND: Lazy<HashMap<&'static str, FileKind>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("pdf", FileKind::Document);
    m.insert("json", FileKind::CachedDocument);
    m.insert("webm", FileKind::Audio);
    m.insert("mp3", FileKind::Audio);
    m.insert("mp4", FileKind::Video);
    m
});

impl FileKind {
    /// Pick the file kind from the path's extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `DocintError::UnsupportedFormat` for unknown or missing extensions.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        EXT_TO_KIND
            .get(ext.as_str())
            .copied()
            .ok_or_else(|| DocintError::UnsupportedFormat(format!("unknown format '.{}' for {}", ext, path.display())))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document | Self::CachedDocument)
    }
}

/// A change a pipe made to a file that is worth reporting, e.g. a dropped row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edit {
    pub pipe: String,
    pub path: String,
    pub description: String,
}

/// State shared by every file variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileState {
    pub name: String,
    #[serde(default)]
    pub path: PathBuf,
    /// Pipes that processed this file, in order.
    #[serde(default)]
    pub pipe_names: Vec<String>,
    /// Table errors per pipe.
    #[serde(default)]
    pub errors: IndexMap<String, Vec<TableDataError>>,
    #[serde(default)]
    pub edits: Vec<Edit>,
}

impl FileState {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    fn from_path(path: &Path) -> Self {
        Self::new(file_stem(path), path)
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum File {
    Doc(Doc),
    Audio(Audio),
    Video(Video),
}

impl File {
    /// Build a file from disk, dispatching on the extension.
    ///
    /// PDFs need a `loader`; without one the call fails with
    /// `DocintError::MissingDependency`.
    pub fn load(path: &Path, loader: Option<&dyn DocumentLoader>) -> Result<Self> {
        match FileKind::from_path(path)? {
            FileKind::Document => {
                let loader = loader.ok_or_else(|| {
                    DocintError::MissingDependency(format!("no document loader configured for {}", path.display()))
                })?;
                let mut doc = loader.load(path)?;
                if doc.state.name.is_empty() {
                    doc.state.name = file_stem(path);
                }
                doc.state.path = path.to_path_buf();
                Ok(File::Doc(doc))
            }
            FileKind::CachedDocument => Ok(File::Doc(Doc::from_json_file(path)?)),
            FileKind::Audio => Ok(File::Audio(Audio {
                state: FileState::from_path(path),
                ..Default::default()
            })),
            FileKind::Video => Ok(File::Video(Video {
                state: FileState::from_path(path),
                ..Default::default()
            })),
        }
    }

    pub fn state(&self) -> &FileState {
        match self {
            File::Doc(d) => &d.state,
            File::Audio(a) => &a.state,
            File::Video(v) => &v.state,
        }
    }

    pub fn state_mut(&mut self) -> &mut FileState {
        match self {
            File::Doc(d) => &mut d.state,
            File::Audio(a) => &mut a.state,
            File::Video(v) => &mut v.state,
        }
    }

    pub fn name(&self) -> &str {
        &self.state().name
    }

    pub fn path(&self) -> &Path {
        &self.state().path
    }

    /// Kind of the in-memory value; cached documents report `Document`.
    pub fn kind(&self) -> FileKind {
        match self {
            File::Doc(_) => FileKind::Document,
            File::Audio(_) => FileKind::Audio,
            File::Video(_) => FileKind::Video,
        }
    }

    pub fn as_doc(&self) -> Option<&Doc> {
        match self {
            File::Doc(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_doc_mut(&mut self) -> Option<&mut Doc> {
        match self {
            File::Doc(d) => Some(d),
            _ => None,
        }
    }

    pub fn add_pipe(&mut self, pipe: &str) {
        self.state_mut().pipe_names.push(pipe.to_string());
    }

    pub fn add_errors(&mut self, pipe: &str, errors: impl IntoIterator<Item = TableDataError>) {
        self.state_mut()
            .errors
            .entry(pipe.to_string())
            .or_default()
            .extend(errors);
    }

    pub fn errors(&self, pipe: &str) -> &[TableDataError] {
        self.state().errors.get(pipe).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn add_edit(&mut self, pipe: &str, path: impl Into<String>, description: impl Into<String>) {
        self.state_mut().edits.push(Edit {
            pipe: pipe.to_string(),
            path: path.into(),
            description: description.into(),
        });
    }

    /// Serialize the file to `{dir}/{name}.json`.
    pub fn save_json(&self, dir: &Path) -> Result<PathBuf> {
        match self {
            File::Doc(d) => d.save_json(dir),
            File::Audio(a) => write_json(dir, &a.state.name, a),
            File::Video(v) => write_json(dir, &v.state.name, v),
        }
    }
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", name));
    std::fs::write(&path, serde_json::to_vec_pretty(value)?)?;
    Ok(path)
}
