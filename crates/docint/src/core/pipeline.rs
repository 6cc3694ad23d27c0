//! Pipeline execution.
//!
//! A [`Pipeline`] is an ordered list of [`Pipe`]s built from
//! [`PipelineSettings`]. Files flow through the pipes one at a time. For every
//! file and pipe the engine:
//!
//! 1. records the pipe in the file's history,
//! 2. opens the per-document log `{log_dir}/{file_name}.{stub}.log`,
//! 3. enters the document scope (per-document config file plus env overrides),
//! 4. restores the side-file cache or runs the component and writes the cache,
//! 5. leaves the scope and checks the scope stack is back at its base depth.
//!
//! # Failure handling
//!
//! [`Pipeline::run`] streams a batch lazily. Anything a component returns while
//! handling one file is a per-file failure: it is reported as
//! `DocintError::Plugin`, written to the document log, and the file is dropped
//! while the rest continue. Fatal errors (see [`DocintError::is_fatal`]) come from
//! inputs and configuration only: unsupported formats, a missing loader, invalid
//! per-document config. They are yielded as `Err` and end the stream.
//! [`Pipeline::process_file`] propagates every error.
//!
//! While a component runs, its `tracing` events go to the document log instead of
//! the global subscriber.

use super::config::{PipeSettings, PipelineSettings, ScopedConfig};
use super::doc_log::DocLog;
use super::scope::{EnvOverrides, LayerValidator, PipeConfig};
use crate::cache::SideFileCache;
use crate::file::{DocumentLoader, File, FileKind};
use crate::plugins::{Component, get_component};
use crate::table::validation::ErrorSummary;
use crate::{DocintError, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Attributes every loaded document provides before any pipe runs.
const LOADER_ASSIGNS: [&str; 4] = ["pages", "words", "list_items", "grids"];

/// Lazily processed batch of files.
pub type FileStream<'a> = Box<dyn Iterator<Item = Result<File>> + 'a>;

/// One pipeline step: a named component with its own configuration stack.
pub struct Pipe {
    name: String,
    stub: String,
    component: Arc<dyn Component>,
    config: PipeConfig,
}

impl std::fmt::Debug for Pipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe")
            .field("name", &self.name)
            .field("stub", &self.stub)
            .field("component", &self.component.name())
            .finish()
    }
}

impl Pipe {
    /// Build a pipe, validating the pipeline layer and every environment override.
    pub fn new(
        settings: &PipeSettings,
        component: Arc<dyn Component>,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let defaults = component.default_config()?;
        component.validate_config(&settings.config)?;

        let env = EnvOverrides::from_vars(&settings.name, env, &defaults)?;
        for (_, layer) in env.layers() {
            component.validate_config(layer)?;
        }

        let validating = component.clone();
        let validator: LayerValidator = Arc::new(move |layer| validating.validate_config(layer));
        let config = PipeConfig::new(settings.name.clone(), defaults, settings.config.clone(), env).with_validator(validator);

        Ok(Self {
            name: settings.name.clone(),
            stub: settings.stub().to_string(),
            component,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stub(&self) -> &str {
        &self.stub
    }

    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Run the pipe on one file.
    pub fn process(&mut self, mut file: File, settings: &PipelineSettings) -> Result<File> {
        if !self.component.accepts(file.kind()) {
            tracing::debug!(pipe = %self.name, file = %file.name(), kind = ?file.kind(), "Kind not accepted, passing through");
            return Ok(file);
        }

        let file_name = file.name().to_string();
        file.add_pipe(&self.name);
        let log = DocLog::open(&settings.log_dir, &file_name, &self.stub)?;
        log.in_scope(|| {
            tracing::info!(
                "pipe '{}' running {} v{}",
                self.name,
                self.component.name(),
                self.component.version()
            )
        });

        let overrides = ScopedConfig::load_optional(&settings.doc_config_path(&file_name, &self.stub))?;
        if overrides.is_some() {
            log.in_scope(|| tracing::info!("using per-document config"));
        }
        let cache = settings.use_cache.then(|| SideFileCache::new(&settings.output_dir));

        let result = {
            let mut scope = self.config.enter_document(&file_name, overrides)?;
            let component = self.component.as_ref();
            let stub = self.stub.as_str();
            log.in_scope(|| run_component(component, file, &mut scope, cache.as_ref(), stub))
                .map_err(|e| component_failure(component.name(), e))
        };
        assert!(
            self.config.is_at_base(),
            "scope stack of pipe '{}' not balanced after '{}'",
            self.name,
            file_name
        );

        log.in_scope(|| match &result {
            Ok(file) => {
                let summary = ErrorSummary::from_errors(file.errors(&self.name));
                if !summary.is_empty() {
                    tracing::warn!("table errors: {}", summary);
                }
                for edit in file.state().edits.iter().filter(|e| e.pipe == self.name) {
                    tracing::info!("edit {}: {}", edit.path, edit.description);
                }
                tracing::info!("done");
            }
            Err(e) => tracing::error!("failed: {}", e),
        });
        if result.is_ok() {
            tracing::info!(pipe = %self.name, file = %file_name, log = %log.path().display(), "Processed");
        }
        result
    }
}

/// Errors raised while a component handles one file never abort a batch.
fn component_failure(component: &str, error: DocintError) -> DocintError {
    if error.is_fatal() {
        DocintError::plugin(component, error.to_string())
    } else {
        error
    }
}

fn run_component(
    component: &dyn Component,
    mut file: File,
    config: &mut PipeConfig,
    cache: Option<&SideFileCache>,
    stub: &str,
) -> Result<File> {
    let file_name = file.name().to_string();

    if component.cacheable()
        && let Some(cache) = cache
        && let Some(snapshot) = cache.get::<Value>(&file_name, stub)?
    {
        match component.cache_restore(&mut file, snapshot) {
            Ok(()) => {
                tracing::info!("restored from {}", cache.path_for(&file_name, stub).display());
                return Ok(file);
            }
            Err(e) => {
                tracing::warn!(error = %e, "cache unusable, recomputing");
                cache.remove(&file_name, stub)?;
            }
        }
    }

    let file = component.process(file, config)?;

    if component.cacheable()
        && let Some(cache) = cache
        && let Some(snapshot) = component.cache_snapshot(&file)?
    {
        let path = cache.set(&file_name, stub, &snapshot)?;
        tracing::info!("cached to {}", path.display());
    }
    Ok(file)
}

pub struct Pipeline {
    settings: PipelineSettings,
    pipes: Vec<Pipe>,
    loader: Option<Arc<dyn DocumentLoader>>,
}

impl Pipeline {
    /// Build from settings, reading overrides from the process environment.
    pub fn from_settings(settings: PipelineSettings) -> Result<Self> {
        let env: Vec<(String, String)> = std::env::vars().collect();
        Self::from_settings_with_env(settings, env)
    }

    /// Build from settings with an explicit set of environment variables.
    ///
    /// # Errors
    ///
    /// All errors are fatal: unknown components (`MissingComponent`), invalid
    /// pipeline or environment values and duplicate pipe names (`Validation`).
    pub fn from_settings_with_env(
        settings: PipelineSettings,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let env: Vec<(String, String)> = env.into_iter().collect();
        let mut names = HashSet::new();
        let mut available: HashSet<&str> = LOADER_ASSIGNS.into_iter().collect();
        let mut pipes = Vec::with_capacity(settings.pipes.len());

        for pipe_settings in &settings.pipes {
            if !names.insert(pipe_settings.name.as_str()) {
                return Err(DocintError::validation(format!(
                    "Duplicate pipe name '{}' in pipeline '{}'",
                    pipe_settings.name, settings.name
                )));
            }

            let component = get_component(&pipe_settings.component)?;
            for required in component.requires() {
                if !available.contains(required) {
                    tracing::warn!(
                        pipe = %pipe_settings.name,
                        attribute = required,
                        "No earlier pipe assigns a required attribute"
                    );
                }
            }
            available.extend(component.assigns().iter().copied());

            component.initialize()?;
            pipes.push(Pipe::new(pipe_settings, component, env.iter().cloned())?);
        }

        tracing::debug!(pipeline = %settings.name, pipes = pipes.len(), "Pipeline built");
        Ok(Self {
            settings,
            pipes,
            loader: None,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_settings(PipelineSettings::from_file(path)?)
    }

    /// Backend used to turn `.pdf` inputs into documents.
    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn pipes(&self) -> &[Pipe] {
        &self.pipes
    }

    /// Load and process a single file; every failure is returned.
    pub fn process_file(&mut self, path: impl AsRef<Path>) -> Result<File> {
        let file = File::load(path.as_ref(), self.loader.as_deref())?;
        self.process(file)
    }

    /// Run an already loaded file through every pipe.
    pub fn process(&mut self, mut file: File) -> Result<File> {
        for pipe in &mut self.pipes {
            file = pipe.process(file, &self.settings)?;
        }
        Ok(file)
    }

    /// Process a batch lazily.
    ///
    /// Paths matching `ignore_docs` are dropped first. The remaining formats are
    /// checked before anything is loaded, so an unsupported extension or a PDF
    /// without a loader fails here.
    pub fn run<'a>(&'a mut self, paths: &[PathBuf]) -> Result<FileStream<'a>> {
        let inputs: Vec<PathBuf> = paths
            .iter()
            .filter(|p| {
                let ignored = self.settings.is_ignored(p);
                if ignored {
                    tracing::info!(path = %p.display(), "Ignoring document");
                }
                !ignored
            })
            .cloned()
            .collect();

        for path in &inputs {
            let kind = FileKind::from_path(path)?;
            if kind == FileKind::Document && self.loader.is_none() {
                return Err(DocintError::MissingDependency(format!(
                    "no document loader configured for {}",
                    path.display()
                )));
            }
        }

        let Pipeline {
            settings,
            pipes,
            loader,
        } = self;
        let settings: &'a PipelineSettings = settings;
        let loader = loader.clone();

        let mut stream: FileStream<'a> = Box::new(inputs.into_iter().filter_map(move |path| {
            keep_or_drop(File::load(&path, loader.as_deref()), "load", &path.display().to_string())
        }));

        for pipe in pipes.iter_mut() {
            stream = Box::new(stream.filter_map(move |item| match item {
                Ok(file) => {
                    let name = file.name().to_string();
                    keep_or_drop(pipe.process(file, settings), &pipe.name, &name)
                }
                Err(e) => Some(Err(e)),
            }));
        }

        let mut stopped = false;
        Ok(Box::new(std::iter::from_fn(move || {
            if stopped {
                return None;
            }
            let item = stream.next()?;
            stopped = item.is_err();
            Some(item)
        })))
    }
}

/// Keep successes and fatal errors; log and drop per-file failures.
fn keep_or_drop(result: Result<File>, stage: &str, file_name: &str) -> Option<Result<File>> {
    match result {
        Ok(file) => Some(Ok(file)),
        Err(e) if e.is_fatal() => {
            tracing::error!(stage, file = file_name, error = %e, "Fatal error, stopping batch");
            Some(Err(e))
        }
        Err(e) => {
            tracing::warn!(stage, file = file_name, error = %e, "Dropping file");
            None
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        for pipe in &self.pipes {
            if let Err(e) = pipe.component.shutdown() {
                tracing::debug!(pipe = %pipe.name, "Component shutdown failed: {}", e);
            }
        }
    }
}
