//! Custom domains for static sites
//!
//! Identified by `<project>:<domain>`. Only `auto_ssl_enabled` changes in
//! place; the remote computes `url`, `verified` and `verification_code`.

use async_trait::async_trait;
use recon_client::Outcome;
use recon_core::resource::{pick, response_str};
use recon_core::{Reconcilable, Remote, RemoteState, ResourceResult};
use recon_meta::{AttributeSchema, DeclaredConfig, IdFormat, ResourceSchema};
use serde_json::{Value, json};

const KIND: &str = "pages_domains";
const ID: IdFormat = IdFormat::new(&["project", "domain"]);
const TRACKED: &[&str] = &["domain", "auto_ssl_enabled", "url", "verified", "verification_code"];

pub struct PagesDomain;

fn state(project: &str, body: &Value) -> ResourceResult<RemoteState> {
    let domain = response_str(body, "domain")?;
    let mut attributes = pick(body, TRACKED);
    attributes.insert("project".to_string(), json!(project));
    Ok(RemoteState::new(vec![project.to_string(), domain], attributes))
}

#[async_trait]
impl Reconcilable for PagesDomain {
    fn type_name(&self) -> &'static str {
        "pages_domain"
    }

    fn id_format(&self) -> IdFormat {
        ID
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name(), ID)
            .with_description("A custom domain served by a project's static site")
            .attribute(AttributeSchema::string("project").required().force_new())
            .attribute(AttributeSchema::string("domain").required().force_new())
            .attribute(AttributeSchema::bool("auto_ssl_enabled").computed().optional())
            .attribute(AttributeSchema::string("url").computed())
            .attribute(AttributeSchema::bool("verified").computed())
            .attribute(
                AttributeSchema::string("verification_code")
                    .computed()
                    .sensitive(),
            )
    }

    async fn create(&self, remote: &Remote<'_>, config: &DeclaredConfig) -> ResourceResult<RemoteState> {
        let project = config.required_str("project")?;
        let mut payload = json!({"domain": config.required_str("domain")?});
        if let Some(auto_ssl) = config.optional_bool("auto_ssl_enabled")? {
            payload["auto_ssl_enabled"] = json!(auto_ssl);
        }

        let created = remote.create(KIND, &[project.clone()], payload).await?;
        state(&project, &created)
    }

    async fn read(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Option<RemoteState>> {
        match remote.get(KIND, id).await? {
            Outcome::Found(body) => Ok(Some(state(&id[0], &body)?)),
            Outcome::NotFound => Ok(None),
        }
    }

    async fn update(&self, remote: &Remote<'_>, id: &[String], config: &DeclaredConfig) -> ResourceResult<()> {
        let mut payload = json!({});
        if let Some(auto_ssl) = config.optional_bool("auto_ssl_enabled")? {
            payload["auto_ssl_enabled"] = json!(auto_ssl);
        }
        remote.update(KIND, id, payload).await?;
        Ok(())
    }

    async fn delete(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Outcome<()>> {
        remote.delete(KIND, id).await
    }
}
