//! Capability gate
//!
//! Feature availability is decided by comparing the remote system's version
//! against a minimum. [`VersionProbe`] asks the remote on every call.
//! [`MemoizedProbe`] asks once and reuses the answer; hold one per run,
//! never per process, since the remote may be upgraded underneath.

use recon_client::{CallContext, RemoteClient};
use recon_meta::CapabilityDescriptor;
use tokio::sync::OnceCell;

use crate::error::ErrorKind;

/// Live version probe. Every call is a remote round-trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionProbe;

impl VersionProbe {
    pub async fn probe(
        &self,
        client: &dyn RemoteClient,
        ctx: &CallContext,
    ) -> Result<CapabilityDescriptor, ErrorKind> {
        let raw = client.get_version(ctx).await?;
        let descriptor = CapabilityDescriptor::parse(&raw)?;
        tracing::debug!(version = %raw, capability = %descriptor, "Probed remote version");
        Ok(descriptor)
    }
}

/// Probe that asks the remote at most once.
#[derive(Debug, Default)]
pub struct MemoizedProbe {
    cell: OnceCell<CapabilityDescriptor>,
}

impl MemoizedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn probe(
        &self,
        client: &dyn RemoteClient,
        ctx: &CallContext,
    ) -> Result<CapabilityDescriptor, ErrorKind> {
        self.cell
            .get_or_try_init(|| VersionProbe.probe(client, ctx))
            .await
            .copied()
    }

    /// The memoized descriptor, if a probe has succeeded.
    pub fn cached(&self) -> Option<CapabilityDescriptor> {
        self.cell.get().copied()
    }
}

/// Fail with `CapabilityUnavailable` unless `current` is at least `minimum`.
pub fn check(
    capability: &str,
    current: CapabilityDescriptor,
    minimum: CapabilityDescriptor,
) -> Result<(), ErrorKind> {
    if current.at_least(&minimum) {
        Ok(())
    } else {
        Err(ErrorKind::CapabilityUnavailable {
            capability: capability.to_string(),
            required: minimum.to_string(),
            current: current.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_test_utils::MemoryRemote;

    #[test]
    fn check_compares_major_then_minor() {
        let v = CapabilityDescriptor::new;
        check("approvals", v(14, 8), v(14, 8)).unwrap();
        check("approvals", v(15, 0), v(14, 8)).unwrap();
        assert!(matches!(
            check("approvals", v(14, 7), v(14, 8)),
            Err(ErrorKind::CapabilityUnavailable { .. })
        ));
        assert!(check("approvals", v(13, 12), v(14, 8)).is_err());
    }

    #[tokio::test]
    async fn live_probe_calls_every_time() {
        let remote = MemoryRemote::new().with_version("15.4.2-ee");
        let ctx = CallContext::new();
        let probe = VersionProbe;
        assert_eq!(
            probe.probe(&remote, &ctx).await.unwrap(),
            CapabilityDescriptor::new(15, 4)
        );
        probe.probe(&remote, &ctx).await.unwrap();
        assert_eq!(remote.calls("get_version"), 2);
    }

    #[tokio::test]
    async fn memoized_probe_calls_once() {
        let remote = MemoryRemote::new().with_version("14.6.0");
        let ctx = CallContext::new();
        let probe = MemoizedProbe::new();
        assert!(probe.cached().is_none());
        probe.probe(&remote, &ctx).await.unwrap();
        probe.probe(&remote, &ctx).await.unwrap();
        assert_eq!(remote.calls("get_version"), 1);
        assert_eq!(probe.cached(), Some(CapabilityDescriptor::new(14, 6)));
    }

    #[tokio::test]
    async fn unparseable_version_is_version_parse() {
        let remote = MemoryRemote::new().with_version("unknown");
        let err = VersionProbe
            .probe(&remote, &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ErrorKind::VersionParse(_)));
    }
}
