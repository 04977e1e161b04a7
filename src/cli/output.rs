//! output formatting for scriptable CLI output
//!
//! uses JSON-RPC 2.0 format for machine-readable output:
//! - success: {"jsonrpc": "2.0", "result": {...}, "id": null}
//! - error: {"jsonrpc": "2.0", "error": {"code": N, "message": "...", "data": {...}}, "id": null}

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::io::IsTerminal;

use crate::rules::ConditionalRule;

/// JSON-RPC version constant
const JSONRPC_VERSION: &str = "2.0";

/// output mode determines how results are formatted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// human-readable text output
    Text,
    /// machine-readable JSON-RPC 2.0 output
    Json,
    /// no output on success (errors still go to stderr)
    Quiet,
}

impl OutputMode {
    /// determine output mode from CLI flags and environment
    ///
    /// priority: quiet > json > no_json > auto-detect
    pub fn from_flags(json: bool, no_json: bool, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        if json {
            return Self::Json;
        }
        if no_json {
            return Self::Text;
        }
        // JSON when stdout is piped
        if !std::io::stdout().is_terminal() {
            Self::Json
        } else {
            Self::Text
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self, Self::Quiet)
    }
}

/// JSON-RPC 2.0 success response
#[derive(Serialize)]
pub struct JsonRpcResponse<T: Serialize> {
    pub jsonrpc: &'static str,
    pub result: T,
    /// null for CLI responses (no request id)
    pub id: Option<String>,
}

impl<T: Serialize> JsonRpcResponse<T> {
    pub fn new(result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result,
            id: None,
        }
    }
}

/// JSON-RPC 2.0 error response
#[derive(Serialize)]
pub struct JsonRpcError {
    pub jsonrpc: &'static str,
    pub error: RpcError,
    pub id: Option<String>,
}

/// JSON-RPC 2.0 error object
#[derive(Serialize)]
pub struct RpcError {
    /// acard exit code offset by -32000
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
}

/// extra error details, omitted from the response when empty
#[derive(Debug, Default, Serialize)]
pub struct ErrorData {
    /// error name of template failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    /// taxonomy kind of template failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    /// underlying script error, e.g. ReferenceError
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ErrorData {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.kind.is_none()
            && self.cause.is_none()
            && self.suggestions.is_empty()
            && self.details.is_empty()
    }
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            error: RpcError {
                code: to_jsonrpc_code(code),
                message: message.into(),
                data: None,
            },
            id: None,
        }
    }

    pub fn with_data(code: i32, message: impl Into<String>, data: ErrorData) -> Self {
        let mut error = Self::new(code, message);
        if !data.is_empty() {
            error.error.data = Some(data);
        }
        error
    }
}

/// convert acard exit code to JSON-RPC error code
/// JSON-RPC reserves -32000 to -32099 for server/application errors
fn to_jsonrpc_code(code: i32) -> i32 {
    -32000 - code
}

// ============================================================================
// Result data structures for different commands
// ============================================================================

/// result of `acard eval`
#[derive(Serialize)]
pub struct EvalData {
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub is_template: bool,
    /// `typeof` of the result
    #[serde(rename = "type")]
    pub value_type: &'static str,
    pub value: JsonValue,
}

/// result of `acard match`
#[derive(Serialize)]
pub struct MatchData {
    pub entity: String,
    /// value the rules were matched against
    pub value: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<ConditionalRule>,
}

/// result of `acard templates`
#[derive(Serialize)]
pub struct TemplatesData {
    pub entities: Vec<String>,
}

/// result of `acard config verify`
#[derive(Serialize)]
pub struct VerifyData {
    pub path: String,
    pub valid: bool,
    pub errors: Vec<String>,
}

/// result of `acard config path`
#[derive(Serialize)]
pub struct PathData {
    pub path: String,
    pub exists: bool,
}

// ============================================================================
// Output functions
// ============================================================================

/// print JSON-RPC success response to stdout
pub fn print_json<T: Serialize>(data: &T) {
    let response = JsonRpcResponse::new(data);
    if let Ok(json) = serde_json::to_string(&response) {
        println!("{}", json);
    }
}

/// print JSON-RPC error to stdout
pub fn print_json_error(code: i32, message: &str, data: ErrorData) {
    let error = JsonRpcError::with_data(code, message, data);
    if let Ok(json) = serde_json::to_string(&error) {
        println!("{}", json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_mode_from_flags_quiet_wins() {
        assert_eq!(OutputMode::from_flags(true, false, true), OutputMode::Quiet);
    }

    #[test]
    fn test_output_mode_from_flags_json() {
        assert_eq!(OutputMode::from_flags(true, false, false), OutputMode::Json);
    }

    #[test]
    fn test_output_mode_from_flags_no_json() {
        assert_eq!(OutputMode::from_flags(false, true, false), OutputMode::Text);
    }

    #[test]
    fn test_jsonrpc_response_format() {
        let data = EvalData {
            template: "${1 + 1}".to_string(),
            entity: None,
            is_template: true,
            value_type: "number",
            value: json!(2),
        };

        let response = JsonRpcResponse::new(&data);
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":null"));
        assert!(json.contains("\"type\":\"number\""));
        assert!(json.contains("\"value\":2"));
        assert!(!json.contains("\"entity\""));
    }

    #[test]
    fn test_jsonrpc_error_format() {
        let error = JsonRpcError::new(5, "ReferenceError: x is not defined in 'return x'");
        let json = serde_json::to_string(&error).unwrap();

        assert!(json.contains("\"code\":-32005"));
        assert!(json.contains("\"message\":\"ReferenceError"));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn test_jsonrpc_error_with_suggestions() {
        let error = JsonRpcError::with_data(
            7,
            "entity 'light.kitchn' not found in states",
            ErrorData {
                suggestions: vec!["light.kitchen".to_string()],
                ..ErrorData::default()
            },
        );
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["error"]["code"], json!(-32007));
        assert_eq!(json["error"]["data"]["suggestions"], json!(["light.kitchen"]));
        assert!(json["error"]["data"].get("details").is_none());
        assert!(json["error"]["data"].get("name").is_none());
    }

    #[test]
    fn test_jsonrpc_error_empty_data_is_omitted() {
        let error = JsonRpcError::with_data(1, "failed", ErrorData::default());
        let json = serde_json::to_value(&error).unwrap();
        assert!(json["error"].get("data").is_none());
    }

    #[test]
    fn test_jsonrpc_code_conversion() {
        assert_eq!(to_jsonrpc_code(0), -32000);
        assert_eq!(to_jsonrpc_code(3), -32003);
    }
}
