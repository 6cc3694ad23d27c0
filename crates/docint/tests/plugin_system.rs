//! Custom component registration and lifecycle through the global registry.

mod common;

use common::{doc, settings, write_doc};
use docint::core::config::ConfigLayer;
use docint::file::FileKind;
use docint::plugins::{
    Component, Plugin, get_component, list_components, register_component, reset_components, unregister_component,
};
use docint::{DocintError, File, PipeConfig, PipeSettings, Pipeline, Result};
use serial_test::serial;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

struct Counting {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl Plugin for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn version(&self) -> String {
        "1.0.0".to_string()
    }

    fn initialize(&self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Component for Counting {
    fn accepts(&self, kind: FileKind) -> bool {
        matches!(kind, FileKind::Document | FileKind::Audio)
    }

    fn default_config(&self) -> Result<ConfigLayer> {
        Ok(ConfigLayer::new())
    }

    fn validate_config(&self, layer: &ConfigLayer) -> Result<()> {
        match layer.keys().next() {
            Some(key) => Err(DocintError::validation(format!("counting takes no settings, got '{}'", key))),
            None => Ok(()),
        }
    }

    fn process(&self, mut file: File, config: &mut PipeConfig) -> Result<File> {
        let pipe = config.pipe().to_string();
        file.add_edit(&pipe, "file", "counted");
        Ok(file)
    }
}

fn register_counting() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let starts = Arc::new(AtomicUsize::new(0));
    let stops = Arc::new(AtomicUsize::new(0));
    let (s, t) = (starts.clone(), stops.clone());
    register_component(
        "counting",
        Arc::new(move || {
            Arc::new(Counting {
                starts: s.clone(),
                stops: t.clone(),
            }) as Arc<dyn Component>
        }),
    )
    .unwrap();
    (starts, stops)
}

#[test]
#[serial]
fn test_builtins_listed() {
    reset_components().unwrap();
    let names = list_components().unwrap();
    for builtin in ["grid_table_finder", "list_table_finder", "table_validator"] {
        assert!(names.contains(&builtin.to_string()));
    }
}

#[test]
#[serial]
fn test_register_and_unregister() {
    register_counting();
    assert_eq!(get_component("counting").unwrap().name(), "counting");

    assert!(unregister_component("counting").unwrap());
    assert!(matches!(
        get_component("counting").err().unwrap(),
        DocintError::MissingComponent(_)
    ));
}

#[test]
#[serial]
fn test_lifecycle_follows_pipeline() {
    let (starts, stops) = register_counting();
    let dir = tempdir().unwrap();
    {
        let _pipeline = Pipeline::from_settings_with_env(
            settings(dir.path(), vec![PipeSettings::new("a", "counting"), PipeSettings::new("b", "counting")]),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert_eq!(stops.load(Ordering::SeqCst), 0);
    }
    assert_eq!(stops.load(Ordering::SeqCst), 2);
    unregister_component("counting").unwrap();
}

#[test]
#[serial]
fn test_custom_component_sees_media_files() {
    register_counting();
    let dir = tempdir().unwrap();
    let docs = write_doc(dir.path(), &doc("paper", vec![]));
    let audio = dir.path().join("call.mp3");
    let video = dir.path().join("talk.mp4");

    let mut pipeline = Pipeline::from_settings_with_env(
        settings(dir.path(), vec![PipeSettings::new("count", "counting")]),
        Vec::new(),
    )
    .unwrap();
    let files: Vec<File> = pipeline
        .run(&[docs, audio, video])
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    let counted: Vec<(&str, bool)> = files
        .iter()
        .map(|f| (f.name(), !f.state().edits.is_empty()))
        .collect();
    assert_eq!(counted, vec![("paper", true), ("call", true), ("talk", false)]);
    unregister_component("counting").unwrap();
}

#[test]
#[serial]
fn test_component_rejects_pipeline_values() {
    register_counting();
    let dir = tempdir().unwrap();
    let err = Pipeline::from_settings_with_env(
        settings(dir.path(), vec![PipeSettings::new("count", "counting").with_value("speed", 2)]),
        Vec::new(),
    )
    .err()
    .unwrap();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("speed"));
    unregister_component("counting").unwrap();
}
