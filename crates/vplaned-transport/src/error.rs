use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A [`crate::LocalListener`] could not claim its socket path.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The controller or dataplane socket refused or does not exist.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Longer than `sockaddr_un.sun_path` allows.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The socket was closed on this side.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
