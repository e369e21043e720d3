//! Client for the vplane controller and its dataplanes.
//!
//! - [`Connection`] holds the store and config channels to the controller:
//!   push configuration with [`Connection::store`], list attached dataplanes
//!   with [`Connection::list_dataplanes`].
//! - [`DataplaneChannel`] talks to one dataplane directly.
//!
//! Every channel is strict request/reply: one request in flight, guarded by
//! an exclusive lock for the whole send/receive cycle. Errors are returned to
//! the caller as-is; nothing is retried.
//!
//! Messages travel as `vplaned-frame` "VP" frames rather than ZeroMQ
//! REQ/REP, so the peer must be a daemon that speaks the same framing. Do not
//! point this client at a production ZeroMQ based vplaned.
//!
//! ```no_run
//! use vplaned_client::{Action, ClientConfig, Connection, DataplaneChannel, StoreRequest};
//!
//! # fn main() -> vplaned_client::Result<()> {
//! let config = ClientConfig::default().with_commit_action(Action::Set);
//! let conn = Connection::open(config.clone())?;
//!
//! let request = StoreRequest::new("interfaces dataplane dp0s3 mtu", "vyatta:mtu")?;
//! conn.store_raw(&request, b"\x10\xa8\x46")?;
//!
//! for dp in conn.list_dataplanes()? {
//!     let channel = DataplaneChannel::open(&dp, &config)?;
//!     println!("{}", channel.string_command("netflow show")?);
//!     channel.close()?;
//! }
//! conn.close()
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod connection;
pub mod dataplane;
pub mod discovery;
pub mod error;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{Channel, ChannelOptions, Interrupter, SocketTransport, Transport};
pub use config::{
    ClientConfig, COMMIT_ACTION_ENV, CONFIG_ENDPOINT_ENV, DEFAULT_CONFIG_SOCKET,
    DEFAULT_DATAPLANE_SOCKET, DEFAULT_RECEIVE_TIMEOUT, DEFAULT_STORE_SOCKET, STORE_ENDPOINT_ENV,
};
pub use connection::{Connection, StoreRequest, ACK, GET_DATAPLANES_COMMAND};
pub use dataplane::{DataplaneChannel, PROTOBUF_TAG};
pub use discovery::{decode_roster, DataplaneDescriptor, InterfaceDescriptor};
pub use error::{ClientError, Result};
pub use vplaned_envelope::{Action, ConfigPath};
pub use vplaned_transport::Endpoint;
