use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;
use vplaned_envelope::{Action, EnvelopeError};
use vplaned_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};
use vplaned_transport::{ConnectOptions, Endpoint};

use crate::error::{ClientError, Result};

/// Controller store socket.
pub const DEFAULT_STORE_SOCKET: &str = "/var/run/vyatta/vplaned.socket";
/// Controller config (discovery) socket.
pub const DEFAULT_CONFIG_SOCKET: &str = "/var/run/vyatta/vplaned-config.socket";
/// Control socket of the local dataplane, used when a descriptor names none.
pub const DEFAULT_DATAPLANE_SOCKET: &str = "/var/run/vplane.socket";

/// How long a request waits for its reply.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the default commit action (`SET` or `DELETE`).
pub const COMMIT_ACTION_ENV: &str = "COMMIT_ACTION";
/// Environment override for the store endpoint.
pub const STORE_ENDPOINT_ENV: &str = "VPLANED_STORE_ENDPOINT";
/// Environment override for the config endpoint.
pub const CONFIG_ENDPOINT_ENV: &str = "VPLANED_CONFIG_ENDPOINT";

/// Connection settings shared by every channel a client opens.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub store_endpoint: Endpoint,
    pub config_endpoint: Endpoint,
    /// Fallback for dataplane descriptors without a control address.
    pub dataplane_endpoint: Endpoint,
    pub receive_timeout: Duration,
    /// Resolve TCP hosts to IPv6 as well as IPv4 addresses.
    pub ipv6: bool,
    /// Per-part payload limit, in both directions. Oversized requests are
    /// refused before they are written.
    pub max_payload_size: usize,
    /// Action used by store requests that do not carry one.
    pub commit_action: Option<Action>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store_endpoint: Endpoint::Ipc(PathBuf::from(DEFAULT_STORE_SOCKET)),
            config_endpoint: Endpoint::Ipc(PathBuf::from(DEFAULT_CONFIG_SOCKET)),
            dataplane_endpoint: Endpoint::Ipc(PathBuf::from(DEFAULT_DATAPLANE_SOCKET)),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            ipv6: true,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            commit_action: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`. Unset and empty
    /// variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(endpoint) = get(STORE_ENDPOINT_ENV) {
            config.store_endpoint = Endpoint::parse(&endpoint)?;
        }
        if let Some(endpoint) = get(CONFIG_ENDPOINT_ENV) {
            config.config_endpoint = Endpoint::parse(&endpoint)?;
        }
        if let Some(action) = get(COMMIT_ACTION_ENV) {
            config.commit_action = Some(action.parse::<Action>().map_err(|err| match err {
                EnvelopeError::InvalidAction(value) => ClientError::InvalidAction(value),
                other => ClientError::Envelope(other),
            })?);
        }

        debug!(
            store = %config.store_endpoint,
            config = %config.config_endpoint,
            commit_action = ?config.commit_action,
            "loaded client config"
        );
        Ok(config)
    }

    pub fn with_store_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.store_endpoint = endpoint;
        self
    }

    pub fn with_config_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.config_endpoint = endpoint;
        self
    }

    pub fn with_dataplane_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.dataplane_endpoint = endpoint;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_ipv6(mut self, ipv6: bool) -> Self {
        self.ipv6 = ipv6;
        self
    }

    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.max_payload_size = max;
        self
    }

    pub fn with_commit_action(mut self, action: Action) -> Self {
        self.commit_action = Some(action);
        self
    }

    pub(crate) fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            ipv6: self.ipv6,
            linger: Some(Duration::ZERO),
            connect_timeout: Some(self.receive_timeout),
        }
    }

    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            read_timeout: Some(self.receive_timeout),
            write_timeout: Some(self.receive_timeout),
            ..FrameConfig::default()
        }
    }
}
