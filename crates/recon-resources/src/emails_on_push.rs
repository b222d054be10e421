//! The emails-on-push project integration
//!
//! A project has at most one such integration, so the identifier is just the
//! project. The remote has no separate create: writing settings enables the
//! integration, and deleting it disables it. A disabled integration reads as
//! absent.

use async_trait::async_trait;
use recon_client::Outcome;
use recon_core::resource::pick;
use recon_core::{Reconcilable, Remote, RemoteState, ResourceResult};
use recon_meta::{AttributeSchema, DeclaredConfig, IdFormat, ResourceSchema};
use serde_json::{Map, Value, json};

use crate::support::is_known;

const KIND: &str = "integrations/emails_on_push";
const ID: IdFormat = IdFormat::new(&["project"]);
const TRACKED: &[&str] = &[
    "disable_diffs",
    "send_from_committer_email",
    "branches_to_be_notified",
    "active",
];

pub const BRANCH_FILTERS: &[&str] = &["all", "default", "protected", "default_and_protected"];

pub struct EmailsOnPush;

fn state(project: &str, body: &Value) -> Option<RemoteState> {
    if body.get("active").and_then(Value::as_bool) == Some(false) {
        return None;
    }
    let mut attributes: Map<String, Value> = pick(body, TRACKED);
    attributes.insert("project".to_string(), json!(project));
    if let Some(recipients) = body.get("recipients").and_then(Value::as_str) {
        let mut list: Vec<&str> = recipients.split_whitespace().collect();
        list.sort_unstable();
        attributes.insert("recipients".to_string(), json!(list));
    }
    Some(RemoteState::new(vec![project.to_string()], attributes))
}

fn payload(config: &DeclaredConfig) -> recon_meta::Result<Value> {
    let recipients: Vec<String> = config.string_set("recipients")?.into_iter().collect();
    let mut payload = json!({
        "recipients": recipients.join(" "),
        "active": true,
    });
    for flag in ["disable_diffs", "send_from_committer_email"] {
        if let Some(value) = config.optional_bool(flag)? {
            payload[flag] = json!(value);
        }
    }
    if let Some(branches) = config.optional_str("branches_to_be_notified")? {
        payload["branches_to_be_notified"] = json!(branches);
    }
    Ok(payload)
}

#[async_trait]
impl Reconcilable for EmailsOnPush {
    fn type_name(&self) -> &'static str {
        "integration_emails_on_push"
    }

    fn id_format(&self) -> IdFormat {
        ID
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name(), ID)
            .with_description("Emails recipients on every push to a project")
            .attribute(AttributeSchema::string("project").required().force_new())
            .attribute(AttributeSchema::string_set("recipients").required())
            .attribute(AttributeSchema::bool("disable_diffs").computed().optional())
            .attribute(
                AttributeSchema::bool("send_from_committer_email")
                    .computed()
                    .optional(),
            )
            .attribute(
                AttributeSchema::string("branches_to_be_notified")
                    .computed()
                    .optional(),
            )
            .attribute(AttributeSchema::bool("active").computed())
    }

    fn validate_extra(&self, config: &DeclaredConfig) -> recon_meta::Result<()> {
        if is_known(config, "branches_to_be_notified") {
            if let Some(branches) = config.optional_str("branches_to_be_notified")? {
                if !BRANCH_FILTERS.contains(&branches.as_str()) {
                    return Err(recon_meta::Error::InvalidValue {
                        attribute: "branches_to_be_notified".to_string(),
                        message: format!("expected one of {}", BRANCH_FILTERS.join(", ")),
                    });
                }
            }
        }
        Ok(())
    }

    /// Upsert: enable the integration whether or not it was configured before.
    async fn create(&self, remote: &Remote<'_>, config: &DeclaredConfig) -> ResourceResult<RemoteState> {
        let project = config.required_str("project")?;
        let key = vec![project.clone()];
        let mut body = payload(config)?;

        let written = match remote.get(KIND, &key).await? {
            Outcome::Found(_) => {
                tracing::debug!(project = %project, "Integration already configured; updating in place");
                remote.update(KIND, &key, body).await?
            }
            Outcome::NotFound => {
                body["project"] = json!(project);
                remote.create(KIND, &[], body).await?
            }
        };
        state(&project, &written).ok_or_else(|| {
            recon_core::ErrorKind::invalid_response("integration is still inactive after write")
        })
    }

    async fn read(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Option<RemoteState>> {
        Ok(remote
            .get(KIND, id)
            .await?
            .into_option()
            .and_then(|body| state(&id[0], &body)))
    }

    async fn update(&self, remote: &Remote<'_>, id: &[String], config: &DeclaredConfig) -> ResourceResult<()> {
        remote.update(KIND, id, payload(config)?).await?;
        Ok(())
    }

    async fn delete(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Outcome<()>> {
        remote.delete(KIND, id).await
    }
}
