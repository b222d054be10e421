//! End-to-end protocol tests
//!
//! Each test drives the full stack the orchestrator sees:
//! JSON-RPC line -> ProtocolServer -> MuxServer -> EngineServer -> Engine
//! -> object type -> in-memory remote.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pretty_assertions::assert_eq;
use recon_client::{CallContext, CancellationToken};
use recon_mux::protocol::{INTERNAL_ERROR, INVALID_PARAMS};
use recon_mux::{MuxServer, ProtocolServer, default_mux};
use recon_test_utils::MemoryRemote;
use serde_json::{Value, json};

/// A protocol client speaking to an in-process server.
struct Session {
    server: ProtocolServer<MuxServer>,
    next_id: AtomicU64,
}

impl Session {
    async fn start(remote: Arc<MemoryRemote>) -> Self {
        Self::with_context(remote, CallContext::new()).await
    }

    async fn with_context(remote: Arc<MemoryRemote>, ctx: CallContext) -> Self {
        let mux = default_mux(remote).await.unwrap();
        let session = Self {
            server: ProtocolServer::new(mux).with_context(ctx),
            next_id: AtomicU64::new(1),
        };
        let configured = session.result("provider/configure", json!({"config": {}})).await;
        assert_eq!(configured["diagnostics"], json!([]));
        session
    }

    /// Send one request and return the raw response.
    async fn send(&self, method: &str, params: Value) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string();
        let response = self.server.handle_message(&line).await.unwrap();
        let response = serde_json::to_value(response).unwrap();
        assert_eq!(response["id"], id);
        response
    }

    /// Send one request that must succeed at the protocol level.
    async fn result(&self, method: &str, params: Value) -> Value {
        let response = self.send(method, params).await;
        assert!(response.get("error").is_none(), "{method} failed: {response}");
        response["result"].clone()
    }
}

fn remote() -> Arc<MemoryRemote> {
    Arc::new(
        MemoryRemote::new()
            .key_field("pages_domains", "domain")
            .key_field("protected_environments", "name")
            .key_field("integrations/emails_on_push", "project"),
    )
}

fn domain_config(auto_ssl: bool) -> Value {
    json!({"project": "group/site", "domain": "docs.example.com", "auto_ssl_enabled": auto_ssl})
}

mod lifecycle {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn plan_apply_read_delete() {
        let remote = remote();
        let session = Session::start(remote.clone()).await;

        let plan = session
            .result(
                "resource/plan",
                json!({"typeName": "pages_domain", "proposedConfig": domain_config(false)}),
            )
            .await;
        assert_eq!(plan["change"]["action"], "create");

        let applied = session
            .result(
                "resource/apply",
                json!({"typeName": "pages_domain", "config": domain_config(false)}),
            )
            .await;
        let state = applied["newState"].clone();
        assert_eq!(state["id"], "group/site:docs.example.com");
        assert_eq!(state["type"], "pages_domain");

        let read = session
            .result(
                "resource/read",
                json!({"typeName": "pages_domain", "currentState": state}),
            )
            .await;
        assert_eq!(read["newState"]["attributes"], state["attributes"]);

        let updated = session
            .result(
                "resource/apply",
                json!({"typeName": "pages_domain", "priorState": state, "config": domain_config(true)}),
            )
            .await;
        assert_eq!(updated["newState"]["attributes"]["auto_ssl_enabled"], true);

        let deleted = session
            .result(
                "resource/apply",
                json!({"typeName": "pages_domain", "priorState": updated["newState"]}),
            )
            .await;
        assert_eq!(deleted["newState"], Value::Null);
        assert_eq!(remote.count("pages_domains"), 0);

        let gone = session
            .result(
                "resource/read",
                json!({"typeName": "pages_domain", "currentState": updated["newState"]}),
            )
            .await;
        assert_eq!(gone["newState"], Value::Null);
        assert_eq!(gone["diagnostics"], json!([]));
    }

    #[tokio::test]
    async fn force_new_change_plans_replace() {
        let session = Session::start(remote()).await;
        let applied = session
            .result(
                "resource/apply",
                json!({"typeName": "pages_domain", "config": domain_config(false)}),
            )
            .await;

        let plan = session
            .result(
                "resource/plan",
                json!({
                    "typeName": "pages_domain",
                    "priorState": applied["newState"],
                    "proposedConfig": {"project": "group/site", "domain": "www.example.com"},
                }),
            )
            .await;
        assert_eq!(plan["change"]["action"], "replace");
        assert_eq!(plan["change"]["requiresReplace"], json!(["domain"]));
    }

    #[tokio::test]
    async fn import_adopts_existing_object() {
        let remote = remote();
        remote.seed(
            "protected_environments",
            &["group/app", "production"],
            json!({
                "name": "production",
                "deploy_access_levels": [{"access_level": 40}, {"access_level": 30}],
                "required_approval_count": 1,
            }),
        );
        let session = Session::start(remote).await;

        let imported = session
            .result(
                "resource/import",
                json!({"typeName": "protected_environment", "id": "group/app:production"}),
            )
            .await;
        let state = &imported["imported"];
        assert_eq!(state["attributes"]["deploy_access_levels"], json!(["developer", "maintainer"]));

        let plan = session
            .result(
                "resource/plan",
                json!({
                    "typeName": "protected_environment",
                    "priorState": state,
                    "proposedConfig": {
                        "project": "group/app",
                        "environment": "production",
                        "deploy_access_levels": ["maintainer", "developer"],
                    },
                }),
            )
            .await;
        assert_eq!(plan["change"]["action"], "no_op");
    }
}

mod failures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn engine_errors_are_tagged_diagnostics() {
        let session = Session::start(remote()).await;

        let bad_id = session
            .result(
                "resource/import",
                json!({"typeName": "pages_domain", "id": "group/site"}),
            )
            .await;
        assert_eq!(bad_id["diagnostics"][0]["kind"], "malformed_identifier");
        assert!(bad_id["diagnostics"][0]["detail"]
            .as_str()
            .unwrap()
            .contains("<project>:<domain>"));

        let missing = session
            .result(
                "resource/import",
                json!({"typeName": "integration_emails_on_push", "id": "group/app"}),
            )
            .await;
        assert_eq!(missing["imported"], Value::Null);
        assert_eq!(missing["diagnostics"][0]["kind"], "not_found");
    }

    #[tokio::test]
    async fn capability_gate_fires_before_writes() {
        let remote = Arc::new(MemoryRemote::new().with_version("14.5.2"));
        let session = Session::start(remote.clone()).await;

        let applied = session
            .result(
                "resource/apply",
                json!({
                    "typeName": "compliance_framework",
                    "config": {"namespace": "acme", "name": "SOX", "description": "SOX", "color": "#1aaa55"},
                }),
            )
            .await;
        assert_eq!(applied["newState"], Value::Null);
        assert_eq!(applied["diagnostics"][0]["kind"], "capability_unavailable");
        assert_eq!(remote.calls("get_version"), 1);
        assert_eq!(remote.calls("create"), 0);
    }

    #[tokio::test]
    async fn cancelled_session_makes_no_remote_calls() {
        let remote = remote();
        let token = CancellationToken::new();
        let session = Session::with_context(remote.clone(), CallContext::with_token(token.clone())).await;
        token.cancel();

        let applied = session
            .result(
                "resource/apply",
                json!({"typeName": "pages_domain", "config": domain_config(false)}),
            )
            .await;
        assert_eq!(applied["diagnostics"][0]["kind"], "cancelled");
        assert_eq!(remote.total_calls(), 0);
    }

    #[tokio::test]
    async fn unowned_type_is_internal_error() {
        let session = Session::start(remote()).await;
        let response = session
            .send(
                "resource/validate",
                json!({"typeName": "deploy_key", "config": {}}),
            )
            .await;
        assert_eq!(response["error"]["code"], INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn malformed_params_are_rejected() {
        let session = Session::start(remote()).await;
        let response = session
            .send("resource/apply", json!({"config": domain_config(false)}))
            .await;
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn second_configure_is_internal_error() {
        let session = Session::start(remote()).await;
        let response = session.send("provider/configure", json!({"config": {}})).await;
        assert_eq!(response["error"]["code"], INTERNAL_ERROR);
    }
}

mod stream {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn serve_over_byte_stream() {
        let mux = default_mux(remote()).await.unwrap();
        let server = ProtocolServer::new(mux);
        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "schema/get"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "provider/configure", "params": {"config": {"page_size": 5}}}),
        ]
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");

        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "mux");
        let types: Vec<&String> = responses[1]["result"]["resourceSchemas"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(types.len(), 5);
        assert_eq!(responses[2]["id"], 3);
    }
}
