// integration tests for the render and templates commands

use crate::common::*;

const CARD: &str = r#"{
    type: 'custom:better-minimalistic-area-card',
    title: "${user.name}'s kitchen",
    icon: 'mdi:silverware-fork-knife',
    show_area_icon: true,
    align: { buttons: 'left' },
    entities: [
        'sensor.kitchen_temperature',
        {
            entity: 'sensor.kitchen_humidity',
            state: [
                { value: 60, operator: '>', color: 'red', icon: 'mdi:water-alert' },
                { value: 0, operator: 'default', color: 'green' },
            ],
        },
        { entity: 'light.kitchen', icon: "${state == 'on' ? 'mdi:lightbulb' : 'mdi:lightbulb-off'}" },
        { entity: 'switch.coffee_maker', hide: "${hass.states['binary_sensor.night'].state == 'off'}" },
        { entity: 'binary_sensor.kitchen_window', section: 'title' },
        'switch.garage',
    ],
}"#;

#[test]
fn test_render_json() {
    let fixture = Fixture::with_config(CARD);
    let output = fixture.run(&["render", "--json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let card = &stdout_json(&output)["result"];

    assert_eq!(card["title"], "${user.name}'s kitchen");
    assert_eq!(card["icon"], "mdi:silverware-fork-knife");
    assert_eq!(card["size"], 3);
    assert_eq!(card["align"]["buttons"], "left");
    assert_eq!(card["align"]["title_entities"], "right");

    let sensors = card["sensors"].as_array().unwrap();
    assert_eq!(sensors.len(), 2);
    assert_eq!(sensors[0]["state_text"], "22.4 °C");
    assert_eq!(sensors[1]["color"], "red");
    assert_eq!(sensors[1]["icon"], "mdi:water-alert");
    assert_eq!(sensors[1]["matched_rule"], 0);

    let buttons = card["buttons"].as_array().unwrap();
    assert_eq!(buttons[0]["entity"], "light.kitchen");
    assert_eq!(buttons[0]["icon"], "mdi:lightbulb");
    assert_eq!(buttons[0]["tap_action"], "toggle");
    assert_eq!(buttons[0]["active"], true);
    assert_eq!(buttons[1]["status"], "hidden");
    assert_eq!(buttons[2]["status"], "unavailable");

    let title = card["title_entities"].as_array().unwrap();
    assert_eq!(title[0]["status"], "shown");
    assert_eq!(title[0]["show_state"], false);

    assert_eq!(card["templated_entities"], serde_json::json!(["binary_sensor.night"]));
}

const AREA_STATES: &str = r#"{
    "states": {
        "light.kitchen": { "state": "on" },
        "sensor.kitchen_temperature": {
            "state": "22.4",
            "attributes": { "unit_of_measurement": "°C" }
        },
        "sensor.plug_signal": { "state": "-60" }
    },
    "areas": {
        "kitchen": { "area_id": "kitchen", "name": "Kitchen", "icon": "mdi:fridge", "picture": "/local/kitchen.jpg" }
    },
    "devices": { "plug": { "area_id": "kitchen" } },
    "entities": {
        "light.kitchen": { "device_id": "plug" },
        "sensor.kitchen_temperature": { "area_id": "kitchen" },
        "sensor.plug_signal": { "device_id": "plug", "entity_category": "diagnostic" }
    },
    "user": { "name": "test user" }
}"#;

#[test]
fn test_render_area_card() {
    let fixture = Fixture::with_config("{ title: 'Kitchen', area: 'kitchen', show_area_icon: true }");
    fixture.write_states(AREA_STATES);
    let output = fixture.run(&["render", "--json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let card = &stdout_json(&output)["result"];
    assert_eq!(card["icon"], "mdi:fridge");
    assert_eq!(card["image"], "/local/kitchen.jpg");
    assert_eq!(card["sensors"][0]["entity"], "sensor.kitchen_temperature");
    assert_eq!(card["sensors"].as_array().unwrap().len(), 1);
    assert_eq!(card["buttons"][0]["entity"], "light.kitchen");
}

#[test]
fn test_render_invalid_area_registry() {
    let fixture = Fixture::with_config("{ area: 'kitchen' }");
    fixture.write_states(r#"{ "states": {}, "areas": { "kitchen": { "icon": 1 } } }"#);
    let output = fixture.run(&["render", "--json"]);

    assert_eq!(exit_code(&output), 4);
    let message = stdout_json(&output)["error"]["message"].as_str().unwrap().to_string();
    assert!(message.contains("invalid 'areas' registry"), "message: {}", message);
}

#[test]
fn test_render_hide_unavailable() {
    let fixture = Fixture::with_config("{ hide_unavailable: true, entities: ['switch.garage', 'light.attic'] }");
    let output = fixture.run(&["render", "--json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let buttons = stdout_json(&output)["result"]["buttons"].clone();
    assert_eq!(buttons[0]["status"], "hidden");
    assert_eq!(buttons[1]["status"], "hidden");
}

#[test]
fn test_render_text() {
    let fixture = Fixture::with_config(CARD);
    let output = fixture.run(&["render", "--no-json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.starts_with("${user.name}'s kitchen [size 3]"));
    assert!(text.contains("sensor.kitchen_temperature  22.4 °C"));
    assert!(text.contains("switch.coffee_maker  (hidden)"));
    assert!(text.contains("switch.garage  (unavailable)"));
    assert!(text.contains("templated: binary_sensor.night"));
}

#[test]
fn test_render_template_error() {
    let fixture = Fixture::with_config("{ entities: [ { entity: 'light.kitchen', color: '${nope}' } ] }");
    let output = fixture.run(&["render", "--json"]);

    assert_eq!(exit_code(&output), 5);
    let message = stdout_json(&output)["error"]["message"].as_str().unwrap().to_string();
    assert_eq!(
        message,
        "entity 'light.kitchen': ReferenceError: nope is not defined in 'return nope'"
    );
}

#[test]
fn test_render_rule_error() {
    let fixture = Fixture::with_config(
        "{ entities: [ { entity: 'light.kitchen', state: [ { value: '[', operator: 'regex' } ] } ] }",
    );
    let output = fixture.run(&["render", "--no-json"]);

    assert_eq!(exit_code(&output), 6);
    assert!(stderr(&output).contains("entity 'light.kitchen': rule 0: invalid regex '['"));
}

#[test]
fn test_render_missing_config() {
    let fixture = Fixture::new();
    let output = fixture.run(&["render", "--json"]);

    assert_eq!(exit_code(&output), 3);
    let message = stdout_json(&output)["error"]["message"].as_str().unwrap().to_string();
    assert!(message.contains("Config file not found"));
}

#[test]
fn test_templates_lists_referenced_entities() {
    let fixture = Fixture::with_config(
        r#"{
            title: "${hass.states['sensor.kitchen_temperature'].state + ' °C'}",
            entities: [
                { entity: 'light.kitchen', hide: "${hass.states['binary_sensor.night'].state == 'on'}" },
                { entity: 'switch.coffee_maker', color: "${hass.states['light.unknown'].state}" },
            ],
        }"#,
    );
    let output = fixture.run(&["templates", "--no-json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let mut lines: Vec<String> = stdout(&output).lines().map(String::from).collect();
    lines.sort();
    assert_eq!(lines, vec!["binary_sensor.night", "sensor.kitchen_temperature"]);
}

#[test]
fn test_quiet_suppresses_output() {
    let fixture = Fixture::with_config(CARD);
    let output = fixture.run(&["render", "-q"]);

    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}
