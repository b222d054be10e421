//! Shared fixtures for recon-core tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use recon_client::Outcome;
use recon_core::resource::{pick, response_str};
use recon_core::{Engine, Reconcilable, Remote, RemoteState, ResourceRegistry, ResourceResult};
use recon_meta::{AttributeSchema, DeclaredConfig, IdFormat, ResourceSchema};
use recon_test_utils::MemoryRemote;
use serde_json::{Map, Value, json};

/// Project-scoped note with a server-computed `web_url`.
pub struct Note;

const NOTE_ID: IdFormat = IdFormat::new(&["project", "note"]);

fn note_state(project: &str, id: String, body: &Value) -> RemoteState {
    let mut attributes = pick(body, &["title", "body", "web_url"]);
    attributes.insert("project".to_string(), json!(project));
    RemoteState::new(vec![project.to_string(), id], attributes)
}

#[async_trait]
impl Reconcilable for Note {
    fn type_name(&self) -> &'static str {
        "note"
    }

    fn id_format(&self) -> IdFormat {
        NOTE_ID
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("note", NOTE_ID)
            .attribute(AttributeSchema::string("project").required().force_new())
            .attribute(AttributeSchema::string("title").required())
            .attribute(AttributeSchema::string("body").force_new())
            .attribute(AttributeSchema::string("web_url").computed())
    }

    async fn create(&self, remote: &Remote<'_>, config: &DeclaredConfig) -> ResourceResult<RemoteState> {
        let project = config.required_str("project")?;
        let payload = json!({
            "title": config.required_str("title")?,
            "body": config.optional_str("body")?,
        });
        let created = remote.create("notes", &[project.clone()], payload).await?;
        let id = response_str(&created, "id")?;
        Ok(note_state(&project, id, &created))
    }

    async fn read(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Option<RemoteState>> {
        Ok(remote
            .get("notes", id)
            .await?
            .into_option()
            .map(|body| note_state(&id[0], id[1].clone(), &body)))
    }

    async fn update(&self, remote: &Remote<'_>, id: &[String], config: &DeclaredConfig) -> ResourceResult<()> {
        remote
            .update("notes", id, json!({"title": config.required_str("title")?}))
            .await?;
        Ok(())
    }

    async fn delete(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Outcome<()>> {
        remote.delete("notes", id).await
    }
}

/// A type with nothing mutable and a list-scan read.
pub struct Badge;

#[async_trait]
impl Reconcilable for Badge {
    fn type_name(&self) -> &'static str {
        "badge"
    }

    fn id_format(&self) -> IdFormat {
        IdFormat::new(&["id"])
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("badge", self.id_format())
            .attribute(AttributeSchema::string("name").required().force_new())
    }

    async fn create(&self, remote: &Remote<'_>, config: &DeclaredConfig) -> ResourceResult<RemoteState> {
        let created = remote
            .create("badges", &[], json!({"name": config.required_str("name")?}))
            .await?;
        let id = response_str(&created, "id")?;
        Ok(RemoteState::new(vec![id], pick(&created, &["name"])))
    }

    async fn read(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Option<RemoteState>> {
        let wanted = id[0].clone();
        let found = remote
            .find_in_pages("badges", &[], |item| {
                response_str(item, "id").is_ok_and(|candidate| candidate == wanted)
            })
            .await?;
        Ok(found
            .into_option()
            .map(|body| RemoteState::new(id.to_vec(), pick(&body, &["name"]))))
    }

    async fn delete(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Outcome<()>> {
        remote.delete("badges", id).await
    }
}

pub fn remote() -> Arc<MemoryRemote> {
    Arc::new(MemoryRemote::new().on_write("notes", |note: &mut Map<String, Value>| {
        let id = note.get("id").cloned().unwrap_or(Value::Null);
        note.insert("web_url".to_string(), json!(format!("https://notes.example.com/{id}")));
    }))
}

pub fn engine(remote: &Arc<MemoryRemote>) -> Engine {
    Engine::new(remote.clone())
}

pub fn registry() -> ResourceRegistry {
    ResourceRegistry::new()
        .with(Note)
        .and_then(|r| r.with(Badge))
        .unwrap()
}

pub fn note_config(project: &str, title: &str) -> DeclaredConfig {
    DeclaredConfig::from_json(json!({"project": project, "title": title}))
}
