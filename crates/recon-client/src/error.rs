//! Error types for the remote client boundary

pub type Result<T> = std::result::Result<T, RemoteError>;

/// Status code the remote system uses for absent objects.
pub const NOT_FOUND_STATUS: u16 = 404;

/// Failure talking to the remote system.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Network, authentication or server failure. `status` is the transport
    /// status code when the remote answered at all.
    #[error("{}", render_transport(.status, .message))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// The remote answered with a body that could not be decoded.
    #[error("cannot decode remote response: {0}")]
    Decode(#[from] serde_json::Error),
}

fn render_transport(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("remote returned {code}: {message}"),
        None => format!("transport failure: {message}"),
    }
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(code),
            message: message.into(),
        }
    }

    /// Whether the remote explicitly reported the object as absent.
    ///
    /// Only a 404 status counts. Any other failure, including one without a
    /// status, is not a not-found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                status: Some(NOT_FOUND_STATUS),
                ..
            }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_404_is_not_found() {
        assert!(RemoteError::status(404, "404 Project Not Found").is_not_found());
        assert!(!RemoteError::status(403, "forbidden").is_not_found());
        assert!(!RemoteError::transport("connection reset").is_not_found());
        assert!(!RemoteError::Cancelled.is_not_found());
    }

    #[test]
    fn display_includes_status() {
        let err = RemoteError::status(500, "boom");
        assert_eq!(err.to_string(), "remote returned 500: boom");
        let err = RemoteError::transport("dns failure");
        assert_eq!(err.to_string(), "transport failure: dns failure");
    }
}
