//! Protocol message types
//!
//! JSON-RPC 2.0 envelopes plus the control-plane request and response
//! bodies. All bodies are camelCase on the wire.

use std::collections::BTreeMap;

use recon_core::{PlannedChange, TrackedState};
use recon_meta::{DeclaredConfig, ProviderConfig, ResourceSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Initialize response result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A problem reported back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    /// Error taxonomy tag, e.g. `not_found` or `capability_unavailable`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            kind: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary, detail)
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }
}

impl From<&recon_core::Error> for Diagnostic {
    fn from(err: &recon_core::Error) -> Self {
        let summary = match &err.id {
            Some(id) => format!("Failed to {} {} {id}", err.operation, err.type_name),
            None => format!("Failed to {} {}", err.operation, err.type_name),
        };
        Diagnostic::error(summary, err.to_string()).with_kind(err.kind.tag())
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

/// Requests addressed to one object type.
pub trait TypedRequest {
    fn type_name(&self) -> &str;
}

macro_rules! typed_request {
    ($($request:ty),* $(,)?) => {
        $(impl TypedRequest for $request {
            fn type_name(&self) -> &str {
                &self.type_name
            }
        })*
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSchemaResponse {
    #[serde(default)]
    pub resource_schemas: BTreeMap<String, ResourceSchema>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureRequest {
    #[serde(default)]
    pub config: ProviderConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureResponse {
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub type_name: String,
    pub config: DeclaredConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub type_name: String,
    #[serde(default)]
    pub prior_state: Option<TrackedState>,
    #[serde(default)]
    pub proposed_config: Option<DeclaredConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<PlannedChange>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

/// Apply the change from `prior_state` to `config`.
///
/// `None` on either side means the object does not exist there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub type_name: String,
    #[serde(default)]
    pub prior_state: Option<TrackedState>,
    #[serde(default)]
    pub config: Option<DeclaredConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    #[serde(default)]
    pub new_state: Option<TrackedState>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub type_name: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    #[serde(default)]
    pub imported: Option<TrackedState>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    pub type_name: String,
    pub current_state: TrackedState,
}

/// `new_state` is `None` when the remote object is gone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse {
    #[serde(default)]
    pub new_state: Option<TrackedState>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

typed_request!(ValidateRequest, PlanRequest, ApplyRequest, ImportRequest, ReadRequest);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use recon_core::{ErrorKind, Operation};
    use serde_json::json;

    #[test]
    fn jsonrpc_request_without_id_is_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "initialized"}"#;
        let request: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert!(request.id.is_none());
        assert_eq!(request.params, Value::Null);
    }

    #[test]
    fn error_response_omits_result() {
        let response = JsonRpcResponse::error(Some(json!(1)), METHOD_NOT_FOUND, "nope".to_string());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["code"], -32601);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn requests_are_camel_case() {
        let request: ApplyRequest = serde_json::from_value(json!({
            "typeName": "pages_domain",
            "priorState": null,
            "config": {"project": "g/p", "domain": "a.example"},
        }))
        .unwrap();
        assert_eq!(request.type_name(), "pages_domain");
        assert!(request.prior_state.is_none());
        assert!(request.config.is_some());
    }

    #[test]
    fn engine_error_becomes_tagged_diagnostic() {
        let err = recon_core::Error::new(
            Operation::Read,
            "pages_domain",
            Some("g/p:a.example".to_string()),
            ErrorKind::Cancelled,
        );
        let diagnostic = Diagnostic::from(&err);
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.kind.as_deref(), Some("cancelled"));
        assert!(diagnostic.summary.contains("g/p:a.example"));
        assert!(has_errors(&[diagnostic]));
    }

    #[test]
    fn warnings_are_not_errors() {
        assert!(!has_errors(&[Diagnostic::warning("gone", "")]));
    }
}
