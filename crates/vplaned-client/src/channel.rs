//! Request/reply channels.
//!
//! A [`Channel`] owns one [`Transport`] and allows a single request in
//! flight. The lock is held from the start of the send until the reply (or
//! failure) arrives, so replies can never be matched to the wrong caller.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, trace};
use vplaned_frame::{FrameError, FrameReader, FrameWriter, Message};
use vplaned_transport::{connect, Endpoint, IpcStream, TransportError};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Message-level transport underneath a [`Channel`].
pub trait Transport: Send {
    /// Send one complete message.
    fn send(&mut self, message: &Message) -> Result<()>;

    /// Block until one complete message arrives or the receive window expires.
    fn recv(&mut self) -> Result<Message>;

    /// Handle that can abort a blocked `send`/`recv` from another thread.
    fn interrupter(&self) -> Option<Interrupter> {
        None
    }

    /// Release the underlying socket.
    fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Aborts blocked I/O on a socket by shutting it down.
#[derive(Debug)]
pub struct Interrupter {
    stream: IpcStream,
}

impl Interrupter {
    pub fn new(stream: IpcStream) -> Self {
        Self { stream }
    }

    pub fn interrupt(&self) {
        // Already-closed sockets are fine here.
        let _ = self.stream.shutdown();
    }
}

/// Per-channel socket settings.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub receive_timeout: Duration,
    pub connect: vplaned_transport::ConnectOptions,
    pub frame: vplaned_frame::FrameConfig,
}

impl From<&ClientConfig> for ChannelOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            receive_timeout: config.receive_timeout,
            connect: config.connect_options(),
            frame: config.frame_config(),
        }
    }
}

/// [`Transport`] over a connected stream socket.
pub struct SocketTransport {
    endpoint: Endpoint,
    reader: FrameReader<IpcStream>,
    writer: FrameWriter<IpcStream>,
    receive_timeout: Duration,
}

impl SocketTransport {
    /// Connect to `endpoint` and apply the receive window to both directions.
    pub fn open(endpoint: &Endpoint, options: &ChannelOptions) -> Result<Self> {
        let stream = connect(endpoint, &options.connect)?;
        let read_half = stream.try_clone()?;

        let reader = FrameReader::for_stream(read_half, options.frame.clone())?;
        let writer = FrameWriter::for_stream(stream, options.frame.clone())?;

        debug!(%endpoint, timeout = ?options.receive_timeout, "channel open");
        Ok(Self {
            endpoint: endpoint.clone(),
            reader,
            writer,
            receive_timeout: options.receive_timeout,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn map_frame_error(&self, err: FrameError) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.receive_timeout)
        } else {
            ClientError::Frame(err)
        }
    }
}

impl Transport for SocketTransport {
    fn send(&mut self, message: &Message) -> Result<()> {
        self.writer
            .send_message(message)
            .map_err(|err| self.map_frame_error(err))
    }

    fn recv(&mut self) -> Result<Message> {
        self.reader
            .read_message()
            .map_err(|err| self.map_frame_error(err))
    }

    fn interrupter(&self) -> Option<Interrupter> {
        self.writer.get_ref().try_clone().ok().map(Interrupter::new)
    }

    fn disconnect(&mut self) -> Result<()> {
        debug!(endpoint = %self.endpoint, "channel closed");
        Ok(self.writer.get_ref().shutdown()?)
    }
}

/// One request/reply channel.
///
/// A failed exchange tears the transport down, since a request without its
/// reply leaves the peer out of step. A message refused by the frame limits
/// before it is written leaves the channel open. The channel stays closed until a new
/// transport is attached with [`Channel::attach`].
pub struct Channel<T> {
    name: &'static str,
    transport: Mutex<Option<T>>,
    interrupter: Mutex<Option<Interrupter>>,
}

impl<T: Transport> Channel<T> {
    /// An open channel over `transport`.
    pub fn new(name: &'static str, transport: T) -> Self {
        let channel = Self::closed(name);
        channel.attach(transport);
        channel
    }

    /// A channel with no transport; every request fails with
    /// [`TransportError::Shutdown`].
    pub fn closed(name: &'static str) -> Self {
        Self {
            name,
            transport: Mutex::new(None),
            interrupter: Mutex::new(None),
        }
    }

    /// Install a transport, replacing (and disconnecting) any previous one.
    pub fn attach(&self, transport: T) {
        let interrupter = transport.interrupter();
        let previous = lock(&self.transport).replace(transport);
        *lock(&self.interrupter) = interrupter;
        if let Some(mut previous) = previous {
            let _ = previous.disconnect();
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_open(&self) -> bool {
        lock(&self.transport).is_some()
    }

    /// Send `message` and wait for its reply, holding the channel exclusively.
    pub fn request(&self, message: &Message) -> Result<Message> {
        let mut guard = lock(&self.transport);
        let transport = guard
            .as_mut()
            .ok_or(ClientError::Transport(TransportError::Shutdown))?;

        trace!(channel = self.name, parts = message.len(), "request");
        let result = match transport.send(message) {
            // Nothing reached the peer, so the channel is still in step.
            Err(err) if err.is_rejected_before_send() => return Err(err),
            sent => sent.and_then(|()| transport.recv()),
        };

        match &result {
            Ok(reply) => trace!(channel = self.name, parts = reply.len(), "reply"),
            Err(_) => {
                debug!(channel = self.name, "closing channel after failed request");
                if let Some(mut transport) = guard.take() {
                    let _ = transport.disconnect();
                }
                lock(&self.interrupter).take();
            }
        }
        result
    }

    /// Close the channel. An in-flight request is aborted and fails.
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if let Some(interrupter) = lock(&self.interrupter).take() {
            interrupter.interrupt();
        }
        match lock(&self.transport).take() {
            Some(mut transport) => transport.disconnect(),
            None => Ok(()),
        }
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").field("name", &self.name).finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
