// shared utilities for integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

/// snapshot shared by most tests
pub const STATES: &str = r#"{
    "states": {
        "light.kitchen": { "state": "on", "attributes": { "friendly_name": "Kitchen Light" } },
        "switch.coffee_maker": { "state": "off" },
        "sensor.kitchen_temperature": {
            "state": "22.4",
            "attributes": { "unit_of_measurement": "°C" }
        },
        "sensor.kitchen_humidity": {
            "state": "64",
            "attributes": { "unit_of_measurement": "%" }
        },
        "binary_sensor.kitchen_window": { "state": "off" },
        "binary_sensor.night": { "state": "off" },
        "switch.garage": { "state": "unavailable" }
    },
    "user": { "name": "test user" }
}"#;

/// path to the built acard binary
pub fn acard_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_acard"))
}

/// temp directory holding a state snapshot and, optionally, a card config
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create test directory");
        fs::write(dir.path().join("states.json"), STATES).expect("Failed to write states");
        Self { dir }
    }

    pub fn with_config(content: &str) -> Self {
        let fixture = Self::new();
        fixture.write_config(content);
        fixture
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.config_path(), content).expect("Failed to write config");
    }

    pub fn write_states(&self, content: &str) {
        fs::write(self.states_path(), content).expect("Failed to write states");
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("card.json5")
    }

    pub fn states_path(&self) -> PathBuf {
        self.dir.path().join("states.json")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// run acard against this fixture's files
    pub fn run(&self, args: &[&str]) -> Output {
        let config = self.config_path();
        let states = self.states_path();

        Command::new(acard_binary())
            .arg("--config")
            .arg(&config)
            .arg("--states")
            .arg(&states)
            .args(args)
            .env_remove("ACARD_CONFIG")
            .env_remove("ACARD_STATES")
            .env_remove("ACARD_LOG")
            .output()
            .expect("Failed to run acard")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// parse the single JSON-RPC line printed on stdout
pub fn stdout_json(output: &Output) -> Value {
    let text = stdout(output);
    serde_json::from_str(text.trim())
        .unwrap_or_else(|e| panic!("stdout is not JSON ({}): {}", e, text))
}

pub fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}
