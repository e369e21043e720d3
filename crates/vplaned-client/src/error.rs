use std::time::Duration;

use vplaned_transport::TransportError;

/// Errors returned by controller and dataplane operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error, including failure to connect.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error on an established channel.
    #[error("frame error: {0}")]
    Frame(#[from] vplaned_frame::FrameError),

    /// Local envelope encoding or decoding failure.
    #[error("envelope error: {0}")]
    Envelope(#[from] vplaned_envelope::EnvelopeError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// No reply within the receive window.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A store request had no action and no commit action is configured.
    #[error("COMMIT_ACTION not found")]
    NoCommitAction,

    /// A configured commit action is neither SET nor DELETE.
    #[error("invalid commit action '{0}' (expected SET or DELETE)")]
    InvalidAction(String),

    /// The controller replied with an empty message.
    #[error("no response from controller")]
    NoControllerResponse,

    /// The store daemon rejected the configuration.
    #[error("config store failed: {status}")]
    ConfigStoreFailed { status: String },

    /// The controller rejected a config command.
    #[error("config command failed: {status}")]
    ConfigCommandFailed { status: String },

    /// The controller acknowledged a config command but sent no body.
    #[error("empty config command response")]
    EmptyConfigCommandResponse,

    /// The dataplane channel is closed or was never opened.
    #[error("dataplane socket not connected")]
    DataplaneNotConnected,

    /// The dataplane replied with an empty message.
    #[error("empty response from dataplane")]
    EmptyDataplaneResponse,

    /// The dataplane rejected a console command.
    #[error("dataplane command '{command}' returned {status}")]
    DataplaneCommandFailed { command: String, status: String },
}

impl ClientError {
    /// The channel could not be established.
    pub fn is_connect(&self) -> bool {
        matches!(
            self,
            Self::Transport(
                TransportError::Connect { .. }
                    | TransportError::PathTooLong { .. }
                    | TransportError::InvalidEndpoint { .. }
            )
        )
    }

    /// The request was refused by the local frame limits before any byte
    /// reached the socket.
    pub fn is_rejected_before_send(&self) -> bool {
        matches!(self, Self::Frame(err) if err.is_limit())
    }

    /// No reply arrived within the receive window.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether repeating the whole operation (after reopening) may succeed.
    ///
    /// Local encoding errors, oversized or malformed messages and explicit
    /// rejections are not retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(TransportError::InvalidEndpoint { .. })
            | Self::Transport(TransportError::PathTooLong { .. }) => false,
            Self::Frame(err) => !err.is_malformed(),
            Self::Transport(_)
            | Self::Timeout(_)
            | Self::NoControllerResponse
            | Self::DataplaneNotConnected => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
