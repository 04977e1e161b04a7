// integration tests for the config and completions commands

use crate::common::*;

#[test]
fn test_config_path() {
    let fixture = Fixture::new();
    let output = fixture.run(&["config", "path", "--no-json"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), fixture.config_path().display().to_string());
}

#[test]
fn test_config_path_json_reports_existence() {
    let fixture = Fixture::new();
    let output = fixture.run(&["config", "path", "--json"]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["result"]["exists"], false);
}

#[test]
fn test_config_default_is_valid() {
    let fixture = Fixture::new();
    let output = fixture.run(&["config", "default", "--no-json"]);
    assert!(output.status.success());

    fixture.write_config(&stdout(&output));
    let output = fixture.run(&["config", "verify", "--no-json"]);

    assert!(output.status.success(), "stdout: {}", stdout(&output));
    assert!(stdout(&output).contains("Configuration is valid"));
}

#[test]
fn test_config_show_json5() {
    let fixture = Fixture::with_config(
        "{
            // a comment
            title: 'Terrace',
            entities: ['light.kitchen',],
        }",
    );
    let output = fixture.run(&["config", "show", "--json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let config = &stdout_json(&output)["result"];
    assert_eq!(config["title"], "Terrace");
    assert_eq!(config["entities"][0], "light.kitchen");
}

#[test]
fn test_config_verify_reports_errors() {
    let fixture = Fixture::with_config(
        r#"{
            entities: [
                { entity: 'light.kitchen', state: [ { value: 1, operator: '=~' } ] },
                { entity: 'sensor.kitchen_humidity', hide: '${state >}' },
            ],
        }"#,
    );
    let output = fixture.run(&["config", "verify", "--no-json"]);

    assert_eq!(exit_code(&output), 3);
    let text = stdout(&output);
    assert!(text.contains("Configuration has 2 error(s)"));
    assert!(text.contains("entities[0].state[0]: unknown operator '=~'"));
    assert!(text.contains("entities[1].hide: SyntaxError"));
}

#[test]
fn test_config_verify_json_details() {
    let fixture = Fixture::with_config("{ entities: [ 'kitchen' ] }");
    let output = fixture.run(&["config", "verify", "--json"]);

    assert_eq!(exit_code(&output), 3);
    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], -32003);
    let details = json["error"]["data"]["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert!(details[0].as_str().unwrap().contains("invalid entity id 'kitchen'"));
}

#[test]
fn test_config_invalid_json5() {
    let fixture = Fixture::with_config("{ title: ");
    let output = fixture.run(&["config", "show", "--no-json"]);

    assert_eq!(exit_code(&output), 3);
    assert!(stderr(&output).contains("Failed to parse config file"));
}

#[test]
fn test_completions() {
    let fixture = Fixture::new();
    let output = fixture.run(&["completions", "bash"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("acard"));
}

#[test]
fn test_invalid_arguments_exit_code() {
    let fixture = Fixture::new();
    let output = fixture.run(&["match", "-e", "light.kitchen"]);

    assert_eq!(exit_code(&output), 2);
}
