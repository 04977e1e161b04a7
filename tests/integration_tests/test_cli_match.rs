// integration tests for the match command

use crate::common::*;

const TEMPERATURE_RULES: &str = "[
    { value: 25, operator: '>', color: 'red' },
    { value: 20, operator: '>', color: 'orange' },
    { value: 0, operator: 'default', color: 'blue' },
]";

#[test]
fn test_match_first_rule_in_list_order() {
    let fixture = Fixture::new();
    let output = fixture.run(&[
        "match",
        "-e",
        "sensor.kitchen_temperature",
        "-r",
        TEMPERATURE_RULES,
        "--json",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["result"]["value"], 22.4);
    assert_eq!(json["result"]["index"], 1);
    assert_eq!(json["result"]["rule"]["color"], "orange");
}

#[test]
fn test_match_default_rule() {
    let fixture = Fixture::new();
    let output = fixture.run(&[
        "match",
        "-e",
        "sensor.kitchen_temperature",
        "-r",
        TEMPERATURE_RULES,
        "--value",
        "12",
        "--json",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["result"]["value"], 12);
    assert_eq!(json["result"]["index"], 2);
}

#[test]
fn test_match_no_rule() {
    let fixture = Fixture::new();
    let output = fixture.run(&[
        "match",
        "-e",
        "light.kitchen",
        "-r",
        "[{ value: 'off', icon: 'mdi:lightbulb-off' }]",
        "--no-json",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "no rule matched on");
}

#[test]
fn test_match_template_and_regex_operators() {
    let fixture = Fixture::new();
    let output = fixture.run(&[
        "match",
        "-e",
        "switch.coffee_maker",
        "-r",
        r#"[
            { value: "${hass.states['binary_sensor.night'].state == 'on'}", operator: 'template', icon: 'mdi:moon' },
            { value: '^of+$', operator: 'regex', icon: 'mdi:power-off' },
        ]"#,
        "--no-json",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.starts_with("rule 1 matched:"), "stdout: {}", text);
    assert!(text.contains("mdi:power-off"));
}

#[test]
fn test_match_invalid_regex() {
    let fixture = Fixture::new();
    let output = fixture.run(&[
        "match",
        "-e",
        "light.kitchen",
        "-r",
        "[{ value: 'on' }, { value: '(', operator: 'regex' }]",
        "--json",
    ]);

    assert_eq!(exit_code(&output), 6);
    let message = stdout_json(&output)["error"]["message"].as_str().unwrap().to_string();
    assert!(message.starts_with("rule 1: invalid regex '('"), "message: {}", message);
}

#[test]
fn test_match_failing_template_rule() {
    let fixture = Fixture::new();
    let output = fixture.run(&[
        "match",
        "-e",
        "light.kitchen",
        "-r",
        "[{ value: '${missing.value}', operator: 'template' }]",
        "--json",
    ]);

    assert_eq!(exit_code(&output), 6);
    let message = stdout_json(&output)["error"]["message"].as_str().unwrap().to_string();
    assert!(message.contains("ReferenceError: missing is not defined"));
}

#[test]
fn test_match_template_rule_with_literal_value() {
    let fixture = Fixture::new();
    let output = fixture.run(&[
        "match",
        "-e",
        "light.kitchen",
        "-r",
        "[{ value: true, operator: 'template' }]",
        "--json",
    ]);

    assert_eq!(exit_code(&output), 6);
    let json = stdout_json(&output);
    assert_eq!(
        json["error"]["message"],
        "rule 0: operator 'template' expects a template string, got true"
    );
    assert!(json["error"].get("data").is_none());
}

#[test]
fn test_match_invalid_rules() {
    let fixture = Fixture::new();
    let output = fixture.run(&["match", "-e", "light.kitchen", "-r", "[{ operator: '>' }]", "--json"]);

    assert_eq!(exit_code(&output), 2);
    assert_eq!(stdout_json(&output)["error"]["code"], -32002);
}

#[test]
fn test_match_missing_entity() {
    let fixture = Fixture::new();
    let output = fixture.run(&["match", "-e", "switch.coffe_maker", "-r", "[]", "--no-json"]);

    assert_eq!(exit_code(&output), 7);
    let err = stderr(&output);
    assert!(err.contains("entity 'switch.coffe_maker' not found in states"));
    assert!(err.contains("switch.coffee_maker"));
}
