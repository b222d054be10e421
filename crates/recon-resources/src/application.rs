//! OAuth applications
//!
//! The remote has no get-by-id for applications, so reads scan the paginated
//! list. Nothing can change in place; any difference forces replacement.

use async_trait::async_trait;
use recon_client::Outcome;
use recon_core::resource::{pick, response_str};
use recon_core::{Reconcilable, Remote, RemoteState, ResourceResult};
use recon_meta::{AttributeSchema, DeclaredConfig, IdFormat, ResourceSchema};
use serde_json::{Value, json};

const KIND: &str = "applications";
const ID: IdFormat = IdFormat::new(&["id"]);
const TRACKED: &[&str] = &["name", "redirect_uri", "scopes", "confidential", "application_id"];

pub struct Application;

impl Application {
    fn state(id: String, body: &Value) -> RemoteState {
        let mut attributes = pick(body, TRACKED);
        if let Some(Value::String(scopes)) = attributes.get("scopes") {
            // The list endpoint reports scopes space-separated.
            let scopes: Vec<Value> = scopes.split_whitespace().map(|s| json!(s)).collect();
            attributes.insert("scopes".to_string(), Value::Array(scopes));
        }
        RemoteState::new(vec![id], attributes)
    }
}

#[async_trait]
impl Reconcilable for Application {
    fn type_name(&self) -> &'static str {
        "application"
    }

    fn id_format(&self) -> IdFormat {
        ID
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name(), ID)
            .with_description("An OAuth application registered on the remote instance")
            .attribute(AttributeSchema::string("name").required().force_new())
            .attribute(AttributeSchema::string("redirect_uri").required().force_new())
            .attribute(AttributeSchema::string_set("scopes").required().force_new())
            .attribute(
                AttributeSchema::bool("confidential")
                    .computed()
                    .optional()
                    .force_new(),
            )
            .attribute(AttributeSchema::string("application_id").computed())
    }

    async fn create(&self, remote: &Remote<'_>, config: &DeclaredConfig) -> ResourceResult<RemoteState> {
        let scopes: Vec<String> = config.string_set("scopes")?.into_iter().collect();
        let mut payload = json!({
            "name": config.required_str("name")?,
            "redirect_uri": config.required_str("redirect_uri")?,
            "scopes": scopes.join(" "),
        });
        if let Some(confidential) = config.optional_bool("confidential")? {
            payload["confidential"] = json!(confidential);
        }

        let created = remote.create(KIND, &[], payload).await?;
        let id = response_str(&created, "id")?;
        Ok(Self::state(id, &created))
    }

    async fn read(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Option<RemoteState>> {
        let wanted = &id[0];
        let found = remote
            .find_in_pages(KIND, &[], |item| {
                response_str(item, "id").is_ok_and(|candidate| &candidate == wanted)
            })
            .await?;
        Ok(found.into_option().map(|body| Self::state(wanted.clone(), &body)))
    }

    async fn delete(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Outcome<()>> {
        remote.delete(KIND, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_client::CallContext;
    use recon_core::{Engine, ErrorKind};
    use recon_test_utils::MemoryRemote;
    use std::sync::Arc;

    fn config() -> DeclaredConfig {
        DeclaredConfig::from_json(json!({
            "name": "ci",
            "redirect_uri": "https://ci.example.com/callback",
            "scopes": ["read_user", "api"],
        }))
    }

    #[tokio::test]
    async fn create_and_scan_back() {
        let remote = Arc::new(MemoryRemote::new().on_write(KIND, |app| {
            app.insert("application_id".to_string(), json!("abc123"));
            app.insert("confidential".to_string(), json!(true));
        }));
        let engine = Engine::new(remote.clone());
        let ctx = CallContext::new();

        let created = engine.create(&Application, &config(), &ctx).await.unwrap();
        assert_eq!(created.id, "1");
        assert_eq!(created.get("scopes"), Some(&json!(["api", "read_user"])));
        assert_eq!(created.get_str("application_id"), Some("abc123"));

        let read = engine.read(&Application, "1", &ctx).await.unwrap();
        let read = read.into_state().unwrap();
        assert!(read.equivalent(&created, &Application.schema()));
        assert_eq!(remote.calls("list_page"), 1);
    }

    #[tokio::test]
    async fn update_is_immutable() {
        let remote = Arc::new(MemoryRemote::new());
        let engine = Engine::new(remote.clone());
        let err = engine
            .update(&Application, "1", &config(), &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ImmutableResource { .. }));
        assert_eq!(remote.total_calls(), 0);
    }

    #[tokio::test]
    async fn composite_identifier_is_rejected() {
        let engine = Engine::new(Arc::new(MemoryRemote::new()));
        let err = engine
            .read(&Application, "1:2", &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MalformedIdentifier(_)));
    }
}
