//! Stream transport for talking to the vplane controller and dataplanes.
//!
//! Endpoints are written the way the controller advertises them:
//! - `ipc:///var/run/vyatta/vplaned.socket` (Unix domain socket)
//! - `tcp://10.0.0.1:5678` (remote controller or dataplane)
//!
//! This is the lowest layer. Everything else builds on the [`IpcStream`]
//! returned by [`connect`].

pub mod endpoint;
pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use endpoint::{connect, ConnectOptions, Endpoint};
pub use error::{Result, TransportError};
pub use stream::IpcStream;

#[cfg(unix)]
pub use uds::LocalListener;
