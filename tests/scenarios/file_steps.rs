//! Test: file steps against a scratch directory

use crate::helpers::*;
use serde_json::json;
use stagehand::Controller;

#[test]
fn test_write_then_read_through_variables() {
    let dir = tempfile::tempdir().unwrap();
    let data = pipeline_of_steps(vec![
        json!({
            "name": "save",
            "file": "write",
            "target": "${scratch}/notes.txt",
            "content": "remember this",
            "output": "saved_path"
        }),
        json!({
            "name": "load",
            "file": "read",
            "target": "${saved_path}",
            "output": "loaded"
        }),
        json!({"name": "check", "assert": "${loaded}", "equals": "remember this"}),
    ]);
    let (pipeline, context) = compile_os(&data);
    context.set_variable("scratch", json!(dir.path().to_string_lossy()));

    pipeline.start().unwrap();
    assert_finished(&pipeline);
}

#[test]
fn test_structured_content_is_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let data = pipeline_of_steps(vec![
        json!({
            "name": "save",
            "file": "write",
            "target": "${scratch}/config.json",
            "content": {"retries": 3}
        }),
        json!({
            "name": "load",
            "file": "read",
            "target": "${scratch}/config.json",
            "output": "raw"
        }),
        json!({"name": "parse", "json": "${raw}", "action": "parse", "output": "config"}),
        json!({"name": "check", "assert": "${config.retries}", "equals": 3}),
    ]);
    let (pipeline, _context) = compile_os(&data);
    _context.set_variable("scratch", json!(dir.path().to_string_lossy()));

    pipeline.start().unwrap();
    assert_finished(&pipeline);
}

#[test]
fn test_read_create_seeds_once_then_reads() {
    let dir = tempfile::tempdir().unwrap();
    let step = json!({
        "name": "settings",
        "file": "read/create",
        "target": "${scratch}/settings.txt",
        "default": "fresh",
        "output": "value"
    });

    let data = pipeline_of_steps(vec![step.clone()]);
    let (pipeline, context) = compile_os(&data);
    context.set_variable("scratch", json!(dir.path().to_string_lossy()));
    pipeline.start().unwrap();
    assert_finished(&pipeline);
    assert_eq!(context.get_variable("value"), Some(json!("fresh")));

    std::fs::write(dir.path().join("settings.txt"), "edited").unwrap();

    let data = pipeline_of_steps(vec![step]);
    let (pipeline, context) = compile_os(&data);
    context.set_variable("scratch", json!(dir.path().to_string_lossy()));
    pipeline.start().unwrap();
    assert_finished(&pipeline);
    assert_eq!(context.get_variable("value"), Some(json!("edited")));
}

#[test]
fn test_mkdir_creates_workspace_for_later_steps() {
    let data = pipeline_of_steps(vec![
        json!({"name": "workspace", "file": "mkdir", "output": "dir"}),
        json!({
            "name": "save",
            "file": "write",
            "target": "${dir}/artifact.txt",
            "content": "built"
        }),
        json!({"name": "load", "file": "read", "target": "${dir}/artifact.txt", "output": "seen"}),
        json!({"name": "check", "assert": "${seen}", "equals": "built"}),
    ]);
    let (pipeline, context) = compile_os(&data);

    pipeline.start().unwrap();
    assert_finished(&pipeline);

    // Clean up the temp workspace the pipeline created.
    if let Some(serde_json::Value::String(dir)) = context.get_variable("dir") {
        std::fs::remove_dir_all(dir).ok();
    }
}

#[test]
fn test_missing_file_fails_the_read() {
    let data = pipeline_of_steps(vec![
        json!({"name": "load", "file": "read", "target": "/definitely/not/here.txt"}),
    ]);
    let (pipeline, _context) = compile_os(&data);

    pipeline.start().unwrap();
    assert_failed(&pipeline, "file not found");
}
