use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;
use vplaned_transport::{IpcStream, TransportError};

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::message::Message;

const CHUNK: usize = 8 * 1024;

/// Pulls whole frames and messages off a byte stream.
///
/// Short reads are buffered internally.
pub struct FrameReader<T> {
    stream: T,
    pending: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    pub fn new(stream: T) -> Self {
        Self::with_config(stream, FrameConfig::default())
    }

    pub fn with_config(stream: T, config: FrameConfig) -> Self {
        Self {
            stream,
            pending: BytesMut::with_capacity(CHUNK),
            config,
        }
    }

    /// Block until a complete frame is available.
    ///
    /// End of stream, even in the middle of a frame, is
    /// [`FrameError::ConnectionClosed`].
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.pending, self.config.max_payload_size)? {
                return Ok(frame);
            }
            self.fill()?;
        }
    }

    /// Block until the final frame of a message has arrived.
    pub fn read_message(&mut self) -> Result<Message> {
        let first = self.read_frame()?;
        if first.is_void() {
            return Ok(Message::new());
        }

        let mut more = first.more();
        let mut message = Message::single(first.payload);
        while more {
            let frame = self.read_frame()?;
            if frame.is_void() {
                return Err(FrameError::InvalidFlags(frame.flags));
            }
            if message.len() == self.config.max_parts {
                return Err(FrameError::TooManyParts {
                    max: self.config.max_parts,
                });
            }
            more = frame.more();
            message.push(frame.payload);
        }

        trace!(parts = message.len(), bytes = message.payload_size(), "message in");
        Ok(message)
    }

    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; CHUNK];
        let n = loop {
            match self.stream.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(FrameError::Io(e)),
            }
        };
        if n == 0 {
            return Err(FrameError::ConnectionClosed);
        }
        self.pending.extend_from_slice(&chunk[..n]);
        Ok(())
    }
}

impl FrameReader<IpcStream> {
    /// Reader over a socket, with `config.read_timeout` applied to it.
    pub fn for_stream(stream: IpcStream, config: FrameConfig) -> Result<Self> {
        stream
            .set_read_timeout(config.read_timeout)
            .map_err(socket_error)?;
        Ok(Self::with_config(stream, config))
    }
}

pub(crate) fn socket_error(err: TransportError) -> FrameError {
    match err {
        TransportError::Io(e) | TransportError::Accept(e) => FrameError::Io(e),
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            FrameError::Io(source)
        }
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
