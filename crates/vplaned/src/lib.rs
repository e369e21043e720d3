//! Client for the vplane controller and its dataplanes.
//!
//! # Crate Structure
//!
//! - [`transport`]: endpoints and stream sockets (Unix domain, TCP)
//! - [`frame`]: multi-part message framing
//! - [`envelope`]: protobuf envelopes and the store command tree
//! - [`client`]: controller and dataplane channels (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use vplaned_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use vplaned_frame::*;
}

/// Re-export envelope types.
pub mod envelope {
    pub use vplaned_envelope::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use vplaned_client::*;
}

#[cfg(feature = "client")]
pub use vplaned_client::{
    ClientConfig, ClientError, Connection, DataplaneChannel, DataplaneDescriptor, StoreRequest,
};
pub use vplaned_envelope::{Action, ConfigPath};
