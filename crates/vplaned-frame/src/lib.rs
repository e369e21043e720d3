//! Length-prefixed multi-part message framing.
//!
//! The controller protocol is built from multi-part messages (`["OK", json]`,
//! `["protobuf", envelope]`). Each part travels as one frame with:
//! - A 2-byte magic number ("VP") for stream synchronization
//! - A 4-byte little-endian payload length
//! - A flags byte (`MORE`: another part follows, `VOID`: zero-part message)
//! - A reserved byte
//!
//! This framing is not ZeroMQ's ZMTP. A client built on it cannot talk to an
//! existing ZeroMQ based vplaned controller or dataplane; both ends of the
//! socket must speak "VP" frames.

pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, FrameHeader, DEFAULT_MAX_PARTS,
    DEFAULT_MAX_PAYLOAD, FLAG_MORE, FLAG_VOID, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use message::Message;
pub use reader::FrameReader;
pub use writer::FrameWriter;
