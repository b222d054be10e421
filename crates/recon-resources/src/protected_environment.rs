//! Protected deployment environments
//!
//! Identified by `<project>:<environment>`. Who may deploy is a set of
//! access-level names, compared without regard to order. Two features depend
//! on the remote version:
//!
//! - in-place updates need 15.4 or later
//! - `required_approval_count` needs 14.8 or later

use async_trait::async_trait;
use recon_client::Outcome;
use recon_core::resource::response_str;
use recon_core::{Reconcilable, Remote, RemoteState, ResourceResult};
use recon_meta::{AccessFamily, AttributeSchema, CapabilityDescriptor, DeclaredConfig, IdFormat, ResourceSchema};
use serde_json::{Map, Value, json};

use crate::support::{access_levels_from_wire, access_levels_to_wire, check_access_levels};

const KIND: &str = "protected_environments";
const ID: IdFormat = IdFormat::new(&["project", "environment"]);
const FAMILY: AccessFamily = AccessFamily::ProtectedEnvironmentDeploy;

pub const UPDATE_SINCE: CapabilityDescriptor = CapabilityDescriptor::new(15, 4);
pub const APPROVALS_SINCE: CapabilityDescriptor = CapabilityDescriptor::new(14, 8);

pub struct ProtectedEnvironment;

fn state(project: &str, body: &Value) -> ResourceResult<RemoteState> {
    let environment = response_str(body, "name")?;
    let mut attributes = Map::new();
    attributes.insert("project".to_string(), json!(project));
    attributes.insert("environment".to_string(), json!(environment));
    attributes.insert(
        "deploy_access_levels".to_string(),
        json!(access_levels_from_wire(body.get("deploy_access_levels"))?),
    );
    if let Some(count) = body.get("required_approval_count").filter(|v| v.is_i64()) {
        attributes.insert("required_approval_count".to_string(), count.clone());
    }
    Ok(RemoteState::new(vec![project.to_string(), environment], attributes))
}

fn payload(config: &DeclaredConfig) -> recon_meta::Result<Value> {
    let mut payload = json!({
        "deploy_access_levels": access_levels_to_wire(config, "deploy_access_levels", FAMILY)?,
    });
    if let Some(count) = config.optional_i64("required_approval_count")? {
        payload["required_approval_count"] = json!(count);
    }
    Ok(payload)
}

async fn gate_approvals(remote: &Remote<'_>, config: &DeclaredConfig) -> ResourceResult<()> {
    if config.optional_i64("required_approval_count")?.is_some_and(|n| n > 0) {
        remote
            .require_version("required_approval_count", APPROVALS_SINCE)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl Reconcilable for ProtectedEnvironment {
    fn type_name(&self) -> &'static str {
        "protected_environment"
    }

    fn id_format(&self) -> IdFormat {
        ID
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name(), ID)
            .with_description("Restricts who may deploy to a project environment")
            .attribute(AttributeSchema::string("project").required().force_new())
            .attribute(AttributeSchema::string("environment").required().force_new())
            .attribute(
                AttributeSchema::string_set("deploy_access_levels")
                    .required()
                    .describe("Access levels allowed to deploy: developer or maintainer"),
            )
            .attribute(
                AttributeSchema::int("required_approval_count")
                    .computed()
                    .optional(),
            )
    }

    fn validate_extra(&self, config: &DeclaredConfig) -> recon_meta::Result<()> {
        check_access_levels(config, "deploy_access_levels", FAMILY)?;
        let count = config
            .get("required_approval_count")
            .and_then(|v| v.known())
            .and_then(Value::as_i64);
        if let Some(n) = count.filter(|n| *n < 0) {
            return Err(recon_meta::Error::InvalidValue {
                attribute: "required_approval_count".to_string(),
                message: format!("must not be negative, got {n}"),
            });
        }
        Ok(())
    }

    async fn create(&self, remote: &Remote<'_>, config: &DeclaredConfig) -> ResourceResult<RemoteState> {
        gate_approvals(remote, config).await?;
        let project = config.required_str("project")?;
        let mut body = payload(config)?;
        body["name"] = json!(config.required_str("environment")?);

        let created = remote.create(KIND, &[project.clone()], body).await?;
        state(&project, &created)
    }

    async fn read(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Option<RemoteState>> {
        match remote.get(KIND, id).await? {
            Outcome::Found(body) => Ok(Some(state(&id[0], &body)?)),
            Outcome::NotFound => Ok(None),
        }
    }

    async fn update(&self, remote: &Remote<'_>, id: &[String], config: &DeclaredConfig) -> ResourceResult<()> {
        remote
            .require_version("protected environment updates", UPDATE_SINCE)
            .await?;
        gate_approvals(remote, config).await?;
        remote.update(KIND, id, payload(config)?).await?;
        Ok(())
    }

    async fn delete(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Outcome<()>> {
        remote.delete(KIND, id).await
    }
}
