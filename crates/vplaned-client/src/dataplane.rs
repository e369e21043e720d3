use bytes::Bytes;
use tracing::debug;
use vplaned_envelope::{decode_dataplane_envelope, encode_dataplane_envelope};
use vplaned_frame::Message;
use vplaned_transport::{Endpoint, TransportError};

use crate::channel::{Channel, ChannelOptions, SocketTransport, Transport};
use crate::config::ClientConfig;
use crate::connection::ACK;
use crate::discovery::DataplaneDescriptor;
use crate::error::{ClientError, Result};

/// First part of a protobuf request to a dataplane.
pub const PROTOBUF_TAG: &str = "protobuf";

/// Request/reply channel to a single dataplane.
pub struct DataplaneChannel<T: Transport = SocketTransport> {
    descriptor: DataplaneDescriptor,
    endpoint: Endpoint,
    channel: Channel<T>,
}

impl DataplaneChannel<SocketTransport> {
    /// Connect to the dataplane's control endpoint, or the configured default
    /// when the descriptor has none.
    pub fn open(descriptor: &DataplaneDescriptor, config: &ClientConfig) -> Result<Self> {
        let channel = Self::new(descriptor, config)?;
        channel.connect(config)?;
        Ok(channel)
    }

    /// (Re)connect a closed channel.
    pub fn connect(&self, config: &ClientConfig) -> Result<()> {
        let transport = SocketTransport::open(&self.endpoint, &ChannelOptions::from(config))?;
        self.channel.attach(transport);
        debug!(id = self.descriptor.id, endpoint = %self.endpoint, "dataplane connected");
        Ok(())
    }
}

impl<T: Transport> DataplaneChannel<T> {
    /// A channel that is not connected yet.
    pub fn new(descriptor: &DataplaneDescriptor, config: &ClientConfig) -> Result<Self> {
        let endpoint = descriptor.control_endpoint(&config.dataplane_endpoint)?;
        Ok(Self {
            descriptor: descriptor.clone(),
            endpoint,
            channel: Channel::closed("dataplane"),
        })
    }

    /// A connected channel over an existing transport.
    pub fn with_transport(descriptor: &DataplaneDescriptor, endpoint: Endpoint, transport: T) -> Self {
        Self {
            descriptor: descriptor.clone(),
            endpoint,
            channel: Channel::new("dataplane", transport),
        }
    }

    pub fn descriptor(&self) -> &DataplaneDescriptor {
        &self.descriptor
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    /// Close the channel. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        self.channel.close()
    }

    /// Typed protobuf command. A reply without payload yields
    /// `Resp::default()`.
    pub fn command<Req, Resp>(&self, msg_type: &str, request: &Req) -> Result<Resp>
    where
        Req: prost::Message,
        Resp: prost::Message + Default,
    {
        let mut response = Resp::default();
        self.command_into(msg_type, request, &mut response)?;
        Ok(response)
    }

    /// Like [`DataplaneChannel::command`] but decodes into `response`, which
    /// is reset first.
    pub fn command_into<Req, Resp>(
        &self,
        msg_type: &str,
        request: &Req,
        response: &mut Resp,
    ) -> Result<()>
    where
        Req: prost::Message,
        Resp: prost::Message,
    {
        response.clear();
        if let Some(payload) = self.command_raw(msg_type, &request.encode_to_vec())? {
            response
                .merge(payload)
                .map_err(|source| vplaned_envelope::EnvelopeError::Decode {
                    what: "dataplane response",
                    source,
                })?;
        }
        Ok(())
    }

    /// Send an already serialized payload and return the reply payload, or
    /// `None` when the dataplane sent an envelope without one.
    pub fn command_raw(&self, msg_type: &str, payload: &[u8]) -> Result<Option<Bytes>> {
        let envelope = encode_dataplane_envelope(msg_type, payload)?;
        let request = Message::single(PROTOBUF_TAG).with_part(envelope);

        debug!(id = self.descriptor.id, msg_type, "dataplane command");
        let reply = self.request(&request)?;
        let body = reply.first().ok_or(ClientError::EmptyDataplaneResponse)?;

        let envelope = decode_dataplane_envelope(body)?;
        Ok(envelope.msg.filter(|m| !m.is_empty()).map(Bytes::from))
    }

    /// Send a console command and return the reply body.
    ///
    /// The dataplane answers with an `OK` status followed by the body.
    pub fn string_command(&self, command: &str) -> Result<String> {
        let body = self.console(command)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Console command whose body is a JSON document.
    pub fn json_command(&self, command: &str) -> Result<serde_json::Value> {
        let body = self.console(command)?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn console(&self, command: &str) -> Result<Bytes> {
        debug!(id = self.descriptor.id, command, "dataplane console command");
        let reply = self.request(&Message::single(command.to_string()))?;
        let mut parts = reply.into_parts().into_iter();

        match parts.next() {
            None => Err(ClientError::EmptyDataplaneResponse),
            Some(status) if status.as_ref() == ACK => {
                parts.next().ok_or(ClientError::EmptyDataplaneResponse)
            }
            Some(status) => Err(ClientError::DataplaneCommandFailed {
                command: command.to_string(),
                status: String::from_utf8_lossy(&status).into_owned(),
            }),
        }
    }

    fn request(&self, message: &Message) -> Result<Message> {
        self.channel.request(message).map_err(|err| match err {
            ClientError::Transport(TransportError::Shutdown) => ClientError::DataplaneNotConnected,
            other => other,
        })
    }
}

impl<T: Transport> Drop for DataplaneChannel<T> {
    fn drop(&mut self) {
        let _ = self.channel.close();
    }
}

impl<T: Transport> std::fmt::Debug for DataplaneChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataplaneChannel")
            .field("id", &self.descriptor.id)
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}
