// integration tests for the eval command

use crate::common::*;

#[test]
fn test_eval_json_output() {
    let fixture = Fixture::new();
    let output = fixture.run(&["eval", "${1 + 1}", "--json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["jsonrpc"], "2.0");
    assert_eq!(json["result"]["value"], 2);
    assert_eq!(json["result"]["type"], "number");
    assert_eq!(json["result"]["is_template"], true);
}

#[test]
fn test_eval_binds_entity_state() {
    let fixture = Fixture::new();
    let output = fixture.run(&["eval", "${state == 'on'}", "-e", "light.kitchen", "--no-json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "true");
}

#[test]
fn test_eval_reads_other_entities_and_user() {
    let fixture = Fixture::new();
    let output = fixture.run(&[
        "eval",
        "${hass.states['binary_sensor.night'].state == 'off' && user.name == 'test user'}",
        "--no-json",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "true");
}

#[test]
fn test_eval_user_override() {
    let fixture = Fixture::new();
    let output = fixture.run(&["eval", "${user.name}", "--user", r#"{"name": "guest"}"#, "--no-json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "guest");
}

#[test]
fn test_eval_plain_string_is_echoed() {
    let fixture = Fixture::new();
    let output = fixture.run(&["eval", "some string", "--json"]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["result"]["value"], "some string");
    assert_eq!(json["result"]["is_template"], false);
}

#[test]
fn test_eval_html_markup() {
    let fixture = Fixture::new();
    let output = fixture.run(&["eval", "${html`<b>${state}</b>`}", "-e", "light.kitchen", "--no-json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "<b>on</b>");
}

#[test]
fn test_eval_reference_error() {
    let fixture = Fixture::new();
    let output = fixture.run(&["eval", "${xxx}", "--json"]);

    assert_eq!(exit_code(&output), 5);
    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], -32005);
    assert_eq!(
        json["error"]["message"],
        "ReferenceError: xxx is not defined in 'return xxx'"
    );
}

#[test]
fn test_eval_error_data_names_template_failure() {
    let fixture = Fixture::new();
    let output = fixture.run(&["eval", "${state.nope()}", "-e", "light.kitchen", "--json"]);

    assert_eq!(exit_code(&output), 5);
    let data = &stdout_json(&output)["error"]["data"];
    assert_eq!(data["name"], "MinimalistAreaCardJSTemplateError");
    assert_eq!(data["kind"], "TemplateEvaluationError");
    assert_eq!(data["cause"], "TypeError");
}

#[test]
fn test_eval_deeply_nested_template_literal() {
    let fixture = Fixture::new();
    let template = format!("${{{}1{}}}", "`${".repeat(5_000), "}`".repeat(5_000));
    let output = fixture.run(&["eval", &template, "--json"]);

    assert_eq!(exit_code(&output), 5);
    let json = stdout_json(&output);
    assert_eq!(json["error"]["data"]["cause"], "SyntaxError");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("SyntaxError: Expression nested too deeply"));
}

#[test]
fn test_eval_syntax_error_text() {
    let fixture = Fixture::new();
    let output = fixture.run(&["eval", "${state ==}", "--no-json"]);

    assert_eq!(exit_code(&output), 5);
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("SyntaxError"));
}

#[test]
fn test_eval_missing_entity_suggests() {
    let fixture = Fixture::new();
    let output = fixture.run(&["eval", "${state}", "-e", "light.kitchn", "--json"]);

    assert_eq!(exit_code(&output), 7);
    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], -32007);
    assert_eq!(json["error"]["data"]["suggestions"][0], "light.kitchen");
}

#[test]
fn test_eval_missing_states_file() {
    let fixture = Fixture::new();
    std::fs::remove_file(fixture.states_path()).unwrap();
    let output = fixture.run(&["eval", "${1}", "--no-json"]);

    assert_eq!(exit_code(&output), 4);
    assert!(stderr(&output).contains("State snapshot not found"));
}

#[test]
fn test_eval_invalid_states_file() {
    let fixture = Fixture::new();
    fixture.write_states("{ not json");
    let output = fixture.run(&["eval", "${1}", "--json"]);

    assert_eq!(exit_code(&output), 4);
    assert_eq!(stdout_json(&output)["error"]["code"], -32004);
}

#[test]
fn test_eval_states_from_environment() {
    let fixture = Fixture::new();
    let output = std::process::Command::new(acard_binary())
        .args(["eval", "${state}", "-e", "switch.coffee_maker", "--no-json"])
        .env("ACARD_STATES", fixture.states_path())
        .env_remove("ACARD_LOG")
        .current_dir(fixture.path())
        .output()
        .expect("Failed to run acard");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "off");
}
