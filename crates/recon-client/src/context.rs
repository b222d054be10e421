//! Per-call context carried through every remote operation

use tokio_util::sync::CancellationToken;

use crate::error::{RemoteError, Result};

/// Context for one engine operation.
///
/// Carries the caller's cancellation token. Timeouts are the remote client's
/// responsibility; the engine only checks the token before it starts work.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail with [`RemoteError::Cancelled`] if the token already fired.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            tracing::debug!("Call context already cancelled");
            return Err(RemoteError::Cancelled);
        }
        Ok(())
    }

    /// A context whose token is cancelled along with this one.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }
}
