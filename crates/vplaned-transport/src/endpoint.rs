use std::fmt;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::IpcStream;

const IPC_SCHEME: &str = "ipc://";
const TCP_SCHEME: &str = "tcp://";

/// Maximum socket path length.
/// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
#[cfg(target_os = "linux")]
pub(crate) const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
pub(crate) const MAX_PATH_LEN: usize = 104;

/// A controller or dataplane address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Unix domain socket at a filesystem path.
    Ipc(PathBuf),
    /// TCP host and port. `host` may be a name or an IPv4/IPv6 literal.
    Tcp { host: String, port: u16 },
}

impl Endpoint {
    /// Parse an endpoint string.
    ///
    /// Accepts `ipc://<path>`, `tcp://<host>:<port>` (IPv6 literals in
    /// brackets), or a bare absolute path.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            endpoint: input.to_string(),
            reason: reason.to_string(),
        };

        if let Some(path) = input.strip_prefix(IPC_SCHEME) {
            if path.is_empty() {
                return Err(invalid("empty socket path"));
            }
            return Ok(Self::Ipc(PathBuf::from(path)));
        }

        if let Some(rest) = input.strip_prefix(TCP_SCHEME) {
            let (host, port) = rest
                .rsplit_once(':')
                .ok_or_else(|| invalid("missing port"))?;
            let host = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host);
            if host.is_empty() {
                return Err(invalid("empty host"));
            }
            let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
            return Ok(Self::Tcp {
                host: host.to_string(),
                port,
            });
        }

        if input.starts_with('/') {
            return Ok(Self::Ipc(PathBuf::from(input)));
        }

        Err(invalid("expected ipc:// or tcp:// scheme"))
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Self::Ipc(_) => "unix-domain-socket",
            Self::Tcp { .. } => "tcp",
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipc(path) => write!(f, "{IPC_SCHEME}{}", path.display()),
            Self::Tcp { host, port } if host.contains(':') => {
                write!(f, "{TCP_SCHEME}[{host}]:{port}")
            }
            Self::Tcp { host, port } => write!(f, "{TCP_SCHEME}{host}:{port}"),
        }
    }
}

/// Socket options applied when connecting.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Allow IPv6 addresses when resolving TCP endpoints (dual-stack).
    pub ipv6: bool,
    /// `SO_LINGER` applied to the connected socket. `Some(ZERO)` drops unsent
    /// data on close; `None` keeps the platform default.
    pub linger: Option<Duration>,
    /// Bound on TCP connection setup. Unix sockets connect immediately or fail.
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            ipv6: true,
            linger: Some(Duration::ZERO),
            connect_timeout: None,
        }
    }
}

/// Connect to an endpoint (blocking).
pub fn connect(endpoint: &Endpoint, options: &ConnectOptions) -> Result<IpcStream> {
    let stream = match endpoint {
        Endpoint::Ipc(path) => connect_ipc(endpoint, path)?,
        Endpoint::Tcp { host, port } => connect_tcp(endpoint, host, *port, options)?,
    };

    if let Some(linger) = options.linger {
        stream.set_linger(Some(linger))?;
    }
    debug!(%endpoint, "connected");
    Ok(stream)
}

#[cfg(unix)]
fn connect_ipc(endpoint: &Endpoint, path: &std::path::Path) -> Result<IpcStream> {
    let len = path.as_os_str().len();
    if len >= MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max: MAX_PATH_LEN,
        });
    }
    let stream =
        std::os::unix::net::UnixStream::connect(path).map_err(|e| TransportError::Connect {
            endpoint: endpoint.to_string(),
            source: e,
        })?;
    Ok(IpcStream::from_unix(stream))
}

#[cfg(not(unix))]
fn connect_ipc(endpoint: &Endpoint, _path: &std::path::Path) -> Result<IpcStream> {
    Err(TransportError::Connect {
        endpoint: endpoint.to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "ipc:// endpoints require Unix domain sockets",
        ),
    })
}

fn connect_tcp(
    endpoint: &Endpoint,
    host: &str,
    port: u16,
    options: &ConnectOptions,
) -> Result<IpcStream> {
    let connect_err = |source: std::io::Error| TransportError::Connect {
        endpoint: endpoint.to_string(),
        source,
    };

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(connect_err)?
        .filter(|addr| options.ipv6 || addr.is_ipv4())
        .collect();

    let mut last_err = None;
    for addr in addrs {
        let attempt = match options.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(IpcStream::from_tcp(stream));
            }
            Err(err) => {
                debug!(%addr, %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(connect_err(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "no usable address for endpoint",
        )
    })))
}
