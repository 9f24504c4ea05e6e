//! Test: function-backed steps working over context variables

use crate::helpers::*;
use serde_json::json;
use stagehand::Controller;

#[test]
fn test_json_round_trip_between_steps() {
    let data = pipeline_of_steps(vec![
        json!({"name": "seed", "set": {"version": 3, "tags": ["a", "b"]}, "variable": "release"}),
        json!({"name": "encode", "json": "${release}", "output": "encoded"}),
        json!({"name": "decode", "json": "${encoded}", "action": "parse", "output": "decoded"}),
        json!({"name": "verify", "assert": "${decoded}", "equals": "${release}"}),
    ]);
    let (pipeline, context) = compile_stubbed(&data);

    pipeline.start().unwrap();

    assert_finished(&pipeline);
    assert_eq!(
        context.get_variable("decoded"),
        Some(json!({"version": 3, "tags": ["a", "b"]}))
    );
}

#[test]
fn test_csv_stringify_and_parse() {
    let data = pipeline_of_steps(vec![
        json!({"name": "rows", "set": [["name", "count"], ["widget", 7]], "variable": "table"}),
        json!({"name": "encode", "csv": "${table}", "output": "text"}),
        json!({"name": "check-text", "assert": "${text}", "equals": "name,count\nwidget,7"}),
        json!({"name": "decode", "csv": "${text}", "action": "parse", "output": "parsed"}),
        json!({"name": "check-rows", "assert": "${parsed}",
               "equals": [["name", "count"], ["widget", "7"]]}),
    ]);
    let (pipeline, _context) = compile_stubbed(&data);

    pipeline.start().unwrap();
    assert_finished(&pipeline);
}

#[test]
fn test_concat_flattens_and_merges() {
    let data = pipeline_of_steps(vec![
        json!({"name": "flat", "concat": [[1, 2], [3]], "output": "flattened"}),
        json!({"name": "check-flat", "assert": "${flattened}", "equals": [1, 2, 3]}),
        json!({"name": "merge", "concat": [{"a": 1}, {"a": 2, "b": 3}], "output": "merged"}),
        json!({"name": "check-merge", "assert": "${merged}", "equals": {"a": 2, "b": 3}}),
        json!({"name": "join", "concat": ["x-", "${flattened}"], "output": "joined"}),
        json!({"name": "check-join", "assert": "${joined}", "equals": "x-[1,2,3]"}),
    ]);
    let (pipeline, _context) = compile_stubbed(&data);

    pipeline.start().unwrap();
    assert_finished(&pipeline);
}

#[test]
fn test_parameter_defaults_and_overrides() {
    let data = json!({
        "name": "parameterized",
        "parameters": [
            {"name": "greeting", "default": "hello"},
            {"name": "target", "default": "world"}
        ],
        "stages": [{"name": "s", "jobs": [{"name": "j", "steps": [
            {"name": "combine", "concat": ["${greeting} ", "${target}"], "output": "message"}
        ]}]}]
    });
    let (pipeline, context) = compile_stubbed(&data);

    // An override applied before start wins over the default.
    context.set_variable("target", json!("there"));
    pipeline.start().unwrap();

    assert_finished(&pipeline);
    assert_eq!(context.get_variable("message"), Some(json!("hello there")));
}

#[test]
fn test_unresolved_reference_compiles_to_null() {
    let data = pipeline_of_steps(vec![
        json!({"name": "hole", "set": "${never.bound}", "variable": "copied"}),
        json!({"name": "check", "assert": "${copied}", "equals": null}),
    ]);
    let (pipeline, _context) = compile_stubbed(&data);

    pipeline.start().unwrap();
    assert_finished(&pipeline);
}

#[test]
fn test_unknown_action_fails_the_step() {
    let data = pipeline_of_steps(vec![
        json!({"name": "bad", "json": 1, "action": "minify"}),
    ]);
    let (pipeline, _context) = compile_stubbed(&data);

    pipeline.start().unwrap();
    assert_failed(&pipeline, "unknown action");
}
