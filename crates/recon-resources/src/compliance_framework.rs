//! Compliance frameworks defined on a top-level namespace
//!
//! Only available on remotes 14.6 or later; every operation checks the
//! version before its first call. The remote offers no get-by-id, so reads
//! scan the namespace's frameworks.

use std::sync::LazyLock;

use async_trait::async_trait;
use recon_client::Outcome;
use recon_core::resource::{pick, response_str};
use recon_core::{Reconcilable, Remote, RemoteState, ResourceResult};
use recon_meta::{AttributeSchema, CapabilityDescriptor, DeclaredConfig, IdFormat, ResourceSchema};
use regex::Regex;
use serde_json::{Value, json};

use crate::support::is_known;

const KIND: &str = "compliance_frameworks";
const ID: IdFormat = IdFormat::new(&["namespace", "framework_id"]);
const TRACKED: &[&str] = &["name", "description", "color", "default"];

pub const AVAILABLE_SINCE: CapabilityDescriptor = CapabilityDescriptor::new(14, 6);

static COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("Invalid color regex"));

pub struct ComplianceFramework;

fn state(namespace: &str, body: &Value) -> ResourceResult<RemoteState> {
    let id = response_str(body, "id")?;
    let mut attributes = pick(body, TRACKED);
    attributes.insert("namespace".to_string(), json!(namespace));
    attributes.insert("framework_id".to_string(), json!(id));
    Ok(RemoteState::new(vec![namespace.to_string(), id], attributes))
}

fn payload(config: &DeclaredConfig) -> recon_meta::Result<Value> {
    let mut payload = json!({
        "name": config.required_str("name")?,
        "description": config.required_str("description")?,
        "color": config.required_str("color")?,
    });
    if let Some(default) = config.optional_bool("default")? {
        payload["default"] = json!(default);
    }
    Ok(payload)
}

async fn gate(remote: &Remote<'_>) -> ResourceResult<()> {
    remote
        .require_version("compliance frameworks", AVAILABLE_SINCE)
        .await
}

#[async_trait]
impl Reconcilable for ComplianceFramework {
    fn type_name(&self) -> &'static str {
        "compliance_framework"
    }

    fn id_format(&self) -> IdFormat {
        ID
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name(), ID)
            .with_description("A compliance framework label for projects in a namespace")
            .attribute(AttributeSchema::string("namespace").required().force_new())
            .attribute(AttributeSchema::string("name").required())
            .attribute(AttributeSchema::string("description").required())
            .attribute(
                AttributeSchema::string("color")
                    .required()
                    .describe("Hex colour such as #1aaa55"),
            )
            .attribute(AttributeSchema::bool("default").computed().optional())
            .attribute(AttributeSchema::string("framework_id").computed())
    }

    fn validate_extra(&self, config: &DeclaredConfig) -> recon_meta::Result<()> {
        if is_known(config, "color") {
            let color = config.required_str("color")?;
            if !COLOR.is_match(&color) {
                return Err(recon_meta::Error::InvalidValue {
                    attribute: "color".to_string(),
                    message: format!("{color:?} is not a #RRGGBB colour"),
                });
            }
        }
        Ok(())
    }

    async fn create(&self, remote: &Remote<'_>, config: &DeclaredConfig) -> ResourceResult<RemoteState> {
        gate(remote).await?;
        let namespace = config.required_str("namespace")?;
        let created = remote
            .create(KIND, &[namespace.clone()], payload(config)?)
            .await?;
        state(&namespace, &created)
    }

    async fn read(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Option<RemoteState>> {
        gate(remote).await?;
        let (namespace, wanted) = (&id[0], &id[1]);
        let found = remote
            .find_in_pages(KIND, &id[..1], |item| {
                response_str(item, "id").is_ok_and(|candidate| &candidate == wanted)
            })
            .await?;
        match found {
            Outcome::Found(body) => Ok(Some(state(namespace, &body)?)),
            Outcome::NotFound => Ok(None),
        }
    }

    async fn update(&self, remote: &Remote<'_>, id: &[String], config: &DeclaredConfig) -> ResourceResult<()> {
        gate(remote).await?;
        remote.update(KIND, id, payload(config)?).await?;
        Ok(())
    }

    async fn delete(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Outcome<()>> {
        gate(remote).await?;
        remote.delete(KIND, id).await
    }
}
