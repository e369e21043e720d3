use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;
use vplaned_transport::IpcStream;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::reader::socket_error;

/// Encodes frames and messages onto a byte stream.
///
/// A whole message is staged in one buffer and written in a single pass, so
/// a message that fails its size checks puts nothing on the wire.
pub struct FrameWriter<T> {
    stream: T,
    staged: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(stream: T) -> Self {
        Self::with_config(stream, FrameConfig::default())
    }

    pub fn with_config(stream: T, config: FrameConfig) -> Self {
        Self {
            stream,
            staged: BytesMut::new(),
            config,
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.staged.clear();
        self.stage(frame)?;
        self.drain()
    }

    /// Send every part of `message`, `MORE` set on all but the last.
    pub fn send_message(&mut self, message: &Message) -> Result<()> {
        if message.len() > self.config.max_parts {
            return Err(FrameError::TooManyParts {
                max: self.config.max_parts,
            });
        }
        self.staged.clear();
        for frame in message.to_frames() {
            self.stage(&frame)?;
        }
        trace!(parts = message.len(), bytes = message.payload_size(), "message out");
        self.drain()
    }

    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    fn stage(&mut self, frame: &Frame) -> Result<()> {
        let max = self.config.max_payload_size;
        if frame.payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload.len(),
                max,
            });
        }
        encode_frame(frame.flags, &frame.payload, &mut self.staged)
    }

    fn drain(&mut self) -> Result<()> {
        let mut rest = &self.staged[..];
        while !rest.is_empty() {
            match self.stream.write(rest) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => rest = &rest[n..],
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(FrameError::Io(e)),
            }
        }
        loop {
            match self.stream.flush() {
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                other => return Ok(other?),
            }
        }
    }
}

impl FrameWriter<IpcStream> {
    /// Writer over a socket, with `config.write_timeout` applied to it.
    pub fn for_stream(stream: IpcStream, config: FrameConfig) -> Result<Self> {
        stream
            .set_write_timeout(config.write_timeout)
            .map_err(socket_error)?;
        Ok(Self::with_config(stream, config))
    }
}
