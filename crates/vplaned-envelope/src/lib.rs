//! Protobuf envelopes and JSON command trees for the vplane controller.
//!
//! A configuration change travels to the controller in two forms at once:
//!
//! ```text
//! {"interface": {"dataplane": {"dp0s3": {
//!     "__SET__": "protobuf CgNrZXk...",      <- base64 VPlanedEnvelope
//!     "__INTERFACE__": "dp0s3",
//!     "__PROTOBUF__": true }}}}
//! ```
//!
//! The JSON tree shows the path and action to anything reading the socket;
//! the authoritative payload is the [`VPlanedEnvelope`] inside the command
//! string, which in turn wraps a typed [`DataplaneEnvelope`].
//!
//! Older commands are stored as plain text, with no envelope and no
//! `__PROTOBUF__` marker; see [`encode_text_command`].

pub mod action;
pub mod codec;
pub mod error;
pub mod path;
pub mod proto;
pub mod tree;

pub use action::Action;
pub use codec::{
    decode_command, decode_dataplane_envelope, encode_dataplane_envelope, encode_message,
    encode_store_command, encode_text_command, EncodedCommand, ALL_INTERFACES,
    PROTOBUF_COMMAND_PREFIX,
};
pub use error::{EnvelopeError, Result};
pub use path::ConfigPath;
pub use proto::{DataplaneEnvelope, VPlanedEnvelope};
pub use tree::{CommandLeaf, CommandNode, CommandTree};
