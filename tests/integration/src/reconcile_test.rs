//! End-to-end control loop tests
//!
//! A manifest on disk, a ledger on disk, every built-in object type, and the
//! in-memory remote. Each run loads the ledger, plans, applies and saves, the
//! way an orchestrator would between invocations.

use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use recon_client::{CallContext, RemoteError};
use recon_core::{ApplyReport, ChangeAction, Engine, Ledger, Manifest, ReconcilePlan, Reconciler, ResourceRegistry};
use recon_resources::{Application, ComplianceFramework, EmailsOnPush, PagesDomain, ProtectedEnvironment};
use recon_test_utils::{MemoryRemote, TestWorkspace};
use rstest::rstest;
use serde_json::json;

const MANIFEST: &str = r##"
[[object]]
address = "site.docs"
type = "pages_domain"
config = { project = "group/site", domain = "docs.example.com" }

[[object]]
address = "app.production"
type = "protected_environment"
config = { project = "group/app", environment = "production", deploy_access_levels = ["maintainer"] }

[[object]]
address = "ci"
type = "application"
config = { name = "ci", redirect_uri = "https://ci.example.com/callback", scopes = ["api", "read_user"] }

[[object]]
address = "app.push"
type = "integration_emails_on_push"
config = { project = "group/app", recipients = ["ops@example.com"] }

[[object]]
address = "acme.sox"
type = "compliance_framework"
config = { namespace = "acme", name = "SOX", description = "Sarbanes-Oxley", color = "#1aaa55" }
"##;

const MANIFEST_CHANGED: &str = r##"
[[object]]
address = "site.docs"
type = "pages_domain"
config = { project = "group/site", domain = "docs.example.com", auto_ssl_enabled = true }

[[object]]
address = "app.production"
type = "protected_environment"
config = { project = "group/app", environment = "production", deploy_access_levels = ["developer", "maintainer"], required_approval_count = 2 }

[[object]]
address = "app.push"
type = "integration_emails_on_push"
config = { project = "group/app", recipients = ["ops@example.com", "dev@example.com"] }

[[object]]
address = "acme.sox"
type = "compliance_framework"
config = { namespace = "acme", name = "SOX", description = "Sarbanes-Oxley", color = "#1aaa55" }
"##;

fn remote() -> Arc<MemoryRemote> {
    Arc::new(
        MemoryRemote::new()
            .key_field("pages_domains", "domain")
            .key_field("protected_environments", "name")
            .key_field("integrations/emails_on_push", "project"),
    )
}

fn reconciler(remote: &Arc<MemoryRemote>) -> Reconciler {
    let registry = ResourceRegistry::new()
        .with(Application)
        .and_then(|r| r.with(PagesDomain))
        .and_then(|r| r.with(EmailsOnPush))
        .and_then(|r| r.with(ProtectedEnvironment))
        .and_then(|r| r.with(ComplianceFramework))
        .unwrap();
    Reconciler::new(Engine::new(remote.clone()).with_page_size(2), registry)
}

/// One orchestrator invocation: load, plan, apply, save.
async fn run(
    reconciler: &Reconciler,
    manifest: &Path,
    ledger_path: &Path,
) -> (ReconcilePlan, ApplyReport, Ledger) {
    let manifest = Manifest::load(manifest).unwrap();
    let mut ledger = Ledger::load_or_new(ledger_path).unwrap();
    let ctx = CallContext::new();

    let plan = reconciler.plan(&manifest, &mut ledger, &ctx).await.unwrap();
    let report = reconciler.apply(&plan, &mut ledger, &ctx).await;
    ledger.save(ledger_path).unwrap();
    (plan, report, ledger)
}

mod lifecycle {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn converge_then_stay_converged() {
        let ws = TestWorkspace::new();
        let manifest = ws.write("manifest.toml", MANIFEST);
        let ledger_path = ws.path("ledger.toml");
        let remote = remote();
        let reconciler = reconciler(&remote);

        let (plan, report, ledger) = run(&reconciler, &manifest, &ledger_path).await;
        assert_eq!(plan.count(ChangeAction::Create), 5);
        assert!(report.success, "{:?}", report.errors);
        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.serial(), 1);
        assert_eq!(ledger.get("app.production").unwrap().id(), "group/app:production");
        assert_eq!(ledger.get("app.push").unwrap().id(), "group/app");

        let (plan, report, ledger) = run(&reconciler, &manifest, &ledger_path).await;
        assert!(!plan.has_changes(), "{:?}", plan.steps);
        assert_eq!(plan.unchanged.len(), 5);
        assert!(report.success);
        assert_eq!(ledger.serial(), 2, "refresh timestamps are saved");
    }

    #[tokio::test]
    async fn changed_manifest_updates_and_deletes() {
        let ws = TestWorkspace::new();
        let manifest = ws.write("manifest.toml", MANIFEST);
        let ledger_path = ws.path("ledger.toml");
        let remote = remote();
        let reconciler = reconciler(&remote);
        run(&reconciler, &manifest, &ledger_path).await;

        let changed = ws.write("manifest.toml", MANIFEST_CHANGED);
        let (plan, report, ledger) = run(&reconciler, &changed, &ledger_path).await;

        assert_eq!(plan.steps[0].action, ChangeAction::Delete);
        assert_eq!(plan.steps[0].address, "ci");
        assert_eq!(plan.count(ChangeAction::Update), 3);
        assert_eq!(plan.unchanged, vec!["acme.sox".to_string()]);
        assert!(report.success, "{:?}", report.errors);

        assert_eq!(ledger.len(), 4);
        assert_eq!(remote.count("applications"), 0);
        let environment = &ledger.get("app.production").unwrap().state;
        assert_eq!(environment.get("deploy_access_levels"), Some(&json!(["developer", "maintainer"])));
        assert_eq!(environment.get("required_approval_count"), Some(&json!(2)));
        let push = &ledger.get("app.push").unwrap().state;
        assert_eq!(push.get("recipients"), Some(&json!(["dev@example.com", "ops@example.com"])));
    }

    #[tokio::test]
    async fn out_of_band_delete_is_recreated() {
        let ws = TestWorkspace::new();
        let manifest = ws.write("manifest.toml", MANIFEST);
        let ledger_path = ws.path("ledger.toml");
        let remote = remote();
        let reconciler = reconciler(&remote);
        run(&reconciler, &manifest, &ledger_path).await;

        remote.remove("pages_domains", &["group/site", "docs.example.com"]).unwrap();
        let (plan, report, ledger) = run(&reconciler, &manifest, &ledger_path).await;

        assert_eq!(plan.dropped, vec!["site.docs".to_string()]);
        assert_eq!(plan.count(ChangeAction::Create), 1);
        assert!(report.success);
        assert_eq!(ledger.len(), 5);
        assert_eq!(remote.count("pages_domains"), 1);
    }
}

mod failures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case::server_error(RemoteError::status(500, "internal"))]
    #[case::unauthorized(RemoteError::status(401, "token expired"))]
    #[case::network(RemoteError::transport("connection reset"))]
    #[tokio::test]
    async fn refresh_failure_keeps_ledger_entry(#[case] failure: RemoteError) {
        let ws = TestWorkspace::new();
        let manifest = ws.write("manifest.toml", MANIFEST);
        let ledger_path = ws.path("ledger.toml");
        let remote = remote();
        let reconciler = reconciler(&remote);
        run(&reconciler, &manifest, &ledger_path).await;

        remote.fail_next("get", failure);
        let (plan, report, ledger) = run(&reconciler, &manifest, &ledger_path).await;

        assert_eq!(plan.errors.len(), 1);
        assert!(plan.dropped.is_empty());
        assert!(!plan.has_changes());
        assert!(report.success);
        assert_eq!(ledger.len(), 5);
    }

    #[tokio::test]
    async fn failed_create_is_retried_on_next_run() {
        let ws = TestWorkspace::new();
        let manifest = ws.write("manifest.toml", MANIFEST);
        let ledger_path = ws.path("ledger.toml");
        let remote = remote();
        let reconciler = reconciler(&remote);

        remote.fail_next("create", RemoteError::status(503, "unavailable"));
        let (_, report, ledger) = run(&reconciler, &manifest, &ledger_path).await;
        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(ledger.len(), 4);

        let (plan, report, ledger) = run(&reconciler, &manifest, &ledger_path).await;
        assert_eq!(plan.count(ChangeAction::Create), 1);
        assert!(report.success, "{:?}", report.errors);
        assert_eq!(ledger.len(), 5);
    }

    #[tokio::test]
    async fn old_remote_blocks_only_gated_types() {
        let ws = TestWorkspace::new();
        let manifest = ws.write("manifest.toml", MANIFEST);
        let ledger_path = ws.path("ledger.toml");
        let remote = Arc::new(
            MemoryRemote::new()
                .with_version("14.0.0")
                .key_field("pages_domains", "domain")
                .key_field("protected_environments", "name")
                .key_field("integrations/emails_on_push", "project"),
        );
        let reconciler = reconciler(&remote);

        let (_, report, ledger) = run(&reconciler, &manifest, &ledger_path).await;
        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("compliance_framework"));
        assert!(ledger.get("acme.sox").is_none());
        assert_eq!(ledger.len(), 4);
        assert_eq!(remote.calls("get_version"), 1, "one probe per run");
    }
}
