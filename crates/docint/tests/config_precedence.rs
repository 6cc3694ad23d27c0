//! Override precedence across the pipeline file, per-document files and the
//! environment.

mod common;

use common::{Echo, doc, grid_page, echoed_threshold, settings, write_doc};
use docint::plugins::{Component, register_component, unregister_component};
use docint::{PipeSettings, Pipeline, PipelineSettings};
use serial_test::serial;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn env(vars: &[(&str, &str)]) -> Vec<(String, String)> {
    vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn write_doc_config(config_dir: &Path, file: &str, stub: &str, yaml: &str) {
    std::fs::create_dir_all(config_dir).unwrap();
    std::fs::write(config_dir.join(format!("{}.{}.yml", file, stub)), yaml).unwrap();
}

fn echo_pipeline(root: &Path, vars: &[(&str, &str)]) -> Pipeline {
    let echo = PipeSettings::new("echo", "echo").with_value("threshold", 3);
    Pipeline::from_settings_with_env(settings(root, vec![echo]), env(vars)).unwrap()
}

#[test]
#[serial]
fn test_env_beats_document_beats_pipeline() {
    register_component("echo", Arc::new(|| Arc::new(Echo) as Arc<dyn Component>)).unwrap();
    let dir = tempdir().unwrap();
    let report = write_doc(&dir.path().join("in"), &doc("report", vec![]));
    let other = write_doc(&dir.path().join("in"), &doc("other", vec![]));
    write_doc_config(&dir.path().join("conf"), "report", "echo", "threshold: 10\n");

    let mut pipeline = echo_pipeline(dir.path(), &[]);
    let file = pipeline.process_file(&other).unwrap();
    assert_eq!(echoed_threshold(&file, "echo"), Some(3));
    let file = pipeline.process_file(&report).unwrap();
    assert_eq!(echoed_threshold(&file, "echo"), Some(10));

    let mut pipeline = echo_pipeline(dir.path(), &[("DI_ECHO__THRESHOLD", "5")]);
    let file = pipeline.process_file(&report).unwrap();
    assert_eq!(echoed_threshold(&file, "echo"), Some(5));
    let file = pipeline.process_file(&other).unwrap();
    assert_eq!(echoed_threshold(&file, "echo"), Some(5));

    unregister_component("echo").unwrap();
}

#[test]
#[serial]
fn test_document_scoped_env_only_hits_that_document() {
    register_component("echo", Arc::new(|| Arc::new(Echo) as Arc<dyn Component>)).unwrap();
    let dir = tempdir().unwrap();
    let report = write_doc(dir.path(), &doc("report", vec![]));
    let other = write_doc(dir.path(), &doc("other", vec![]));

    let mut pipeline = echo_pipeline(dir.path(), &[("DI_ECHO__THRESHOLD__REPORT", "7")]);
    let file = pipeline.process_file(&report).unwrap();
    assert_eq!(echoed_threshold(&file, "echo"), Some(7));
    let file = pipeline.process_file(&other).unwrap();
    assert_eq!(echoed_threshold(&file, "echo"), Some(3));

    unregister_component("echo").unwrap();
}

#[test]
fn test_unknown_env_field_is_fatal() {
    let dir = tempdir().unwrap();
    let err = Pipeline::from_settings_with_env(
        settings(dir.path(), vec![PipeSettings::new("grid", "grid_table_finder")]),
        env(&[("DI_GRID__COLOUR", "red")]),
    )
    .err()
    .unwrap();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("DI_GRID__COLOUR"));
}

#[test]
fn test_invalid_document_config_is_fatal_in_batch() {
    let dir = tempdir().unwrap();
    let path = write_doc(dir.path(), &doc("menu", vec![grid_page(0)]));
    write_doc_config(&dir.path().join("conf"), "menu", "grid", "overlap_percent: plenty\n");

    let mut pipeline = Pipeline::from_settings_with_env(
        settings(dir.path(), vec![PipeSettings::new("grid", "grid_table_finder")]),
        Vec::new(),
    )
    .unwrap();
    let results: Vec<_> = pipeline.run(&[path.clone(), path]).unwrap().collect();
    assert_eq!(results.len(), 1);
    let err = results.into_iter().next().unwrap().unwrap_err();
    assert!(err.to_string().contains("overlap_percent"));
    assert!(pipeline.pipes()[0].config().is_at_base());
}

#[test]
fn test_page_scope_from_document_config() {
    let dir = tempdir().unwrap();
    let path = write_doc(dir.path(), &doc("menu", vec![grid_page(0), grid_page(1)]));
    write_doc_config(
        &dir.path().join("conf"),
        "menu",
        "grid",
        "scope_configs:\n  page_1:\n    header_row_policy: every_page_first_row\n",
    );

    let mut pipeline = Pipeline::from_settings_with_env(
        settings(dir.path(), vec![PipeSettings::new("grid", "grid_table_finder")]),
        Vec::new(),
    )
    .unwrap();
    let file = pipeline.process_file(&path).unwrap();
    let pages = &file.as_doc().unwrap().pages;
    assert_eq!(pages[0].tables[0].header_rows.len(), 1);
    assert_eq!(pages[1].tables[0].header_rows.len(), 1);
}

#[test]
fn test_pipeline_file_formats() {
    let dir = tempdir().unwrap();
    let yaml = dir.path().join("pipeline.yml");
    std::fs::write(
        &yaml,
        "name: invoices\nuse_cache: false\npipes:\n  - name: grid\n    component: grid_table_finder\n    config:\n      overlap_percent: 60\n",
    )
    .unwrap();
    let from_yaml = PipelineSettings::from_file(&yaml).unwrap();
    assert_eq!(from_yaml.name, "invoices");
    assert!(!from_yaml.use_cache);
    assert_eq!(from_yaml.pipes[0].config["overlap_percent"], 60);

    let toml = dir.path().join("pipeline.toml");
    std::fs::write(
        &toml,
        "name = \"invoices\"\n\n[[pipes]]\nname = \"grid\"\ncomponent = \"grid_table_finder\"\n",
    )
    .unwrap();
    let from_toml = PipelineSettings::from_file(&toml).unwrap();
    assert_eq!(from_toml.pipes[0].component, "grid_table_finder");
    assert!(from_toml.use_cache);

    let bad = dir.path().join("pipeline.ini");
    std::fs::write(&bad, "").unwrap();
    assert!(PipelineSettings::from_file(&bad).unwrap_err().is_fatal());
}
