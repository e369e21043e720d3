use bytes::Bytes;
use tracing::debug;
use vplaned_envelope::{encode_store_command, encode_text_command, Action, CommandTree, ConfigPath};
use vplaned_frame::Message;

use crate::channel::{Channel, ChannelOptions, SocketTransport, Transport};
use crate::config::ClientConfig;
use crate::discovery::{decode_roster, DataplaneDescriptor};
use crate::error::{ClientError, Result};

/// Status part of a successful controller reply.
pub const ACK: &[u8] = b"OK";

/// Config command that lists attached dataplanes.
pub const GET_DATAPLANES_COMMAND: &str = "GETVPCONFIG";

/// One configuration change to push to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRequest {
    pub path: ConfigPath,
    /// Fully-qualified type name of the payload message.
    pub msg_type: String,
    /// Overrides the configured commit action.
    pub action: Option<Action>,
    /// Interface the change applies to, if any.
    pub interface: Option<String>,
}

impl StoreRequest {
    /// Request for a space-separated config path.
    pub fn new(path: &str, msg_type: impl Into<String>) -> Result<Self> {
        Ok(Self::for_path(ConfigPath::parse(path)?, msg_type))
    }

    pub fn for_path(path: ConfigPath, msg_type: impl Into<String>) -> Self {
        Self {
            path,
            msg_type: msg_type.into(),
            action: None,
            interface: None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }
}

/// Store and config channels to the controller.
///
/// Both channels are opened together and closed together. If either one
/// fails mid-request the other is closed as well, and the connection must be
/// reopened.
pub struct Connection<T: Transport = SocketTransport> {
    config: ClientConfig,
    store: Channel<T>,
    control: Channel<T>,
}

impl Connection<SocketTransport> {
    /// Connect both channels. On failure nothing stays open.
    pub fn open(config: ClientConfig) -> Result<Self> {
        let options = ChannelOptions::from(&config);
        let mut store = SocketTransport::open(&config.store_endpoint, &options)?;
        let control = match SocketTransport::open(&config.config_endpoint, &options) {
            Ok(control) => control,
            Err(err) => {
                let _ = store.disconnect();
                return Err(err);
            }
        };
        Ok(Self::with_transports(config, store, control))
    }
}

impl<T: Transport> Connection<T> {
    /// Connection over already established transports.
    pub fn with_transports(config: ClientConfig, store: T, control: T) -> Self {
        Self {
            config,
            store: Channel::new("store", store),
            control: Channel::new("config", control),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.store.is_open() && self.control.is_open()
    }

    /// Close both channels. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        let store = self.store.close();
        let control = self.control.close();
        store.and(control)
    }

    /// Encode `msg` and push it to the store at `request.path`.
    pub fn store<M: prost::Message>(&self, request: &StoreRequest, msg: &M) -> Result<()> {
        self.store_raw(request, &msg.encode_to_vec())
    }

    /// Push an already serialized payload to the store.
    ///
    /// Fails with [`ClientError::NoCommitAction`] before any I/O when neither
    /// the request nor the configuration supplies an action.
    pub fn store_raw(&self, request: &StoreRequest, payload: &[u8]) -> Result<()> {
        let action = self.commit_action(request.action)?;

        let encoded = encode_store_command(
            &request.path,
            &request.msg_type,
            payload,
            action,
            request.interface.as_deref(),
        )?;
        debug!(path = %request.path, %action, msg_type = %request.msg_type, "store");
        self.push(&encoded.tree)
    }

    /// Store a plain text dataplane command at a space-separated `path`.
    ///
    /// The command applies to every interface unless `interface` names one.
    /// The action and acknowledgement rules are those of
    /// [`Connection::store_raw`].
    pub fn store_command(
        &self,
        path: &str,
        command: &str,
        action: Option<Action>,
        interface: Option<&str>,
    ) -> Result<()> {
        let action = self.commit_action(action)?;
        let path = ConfigPath::parse(path)?;
        let tree = encode_text_command(&path, command, action, interface);

        debug!(%path, %action, command, "store command");
        self.push(&tree)
    }

    fn commit_action(&self, action: Option<Action>) -> Result<Action> {
        action
            .or(self.config.commit_action)
            .ok_or(ClientError::NoCommitAction)
    }

    fn push(&self, tree: &CommandTree) -> Result<()> {
        let reply = self.exchange(&self.store, &Message::single(tree.to_json()?))?;

        match reply.first() {
            None => Err(ClientError::NoControllerResponse),
            Some(status) if status.as_ref() == ACK => Ok(()),
            Some(status) => Err(ClientError::ConfigStoreFailed {
                status: String::from_utf8_lossy(status).into_owned(),
            }),
        }
    }

    /// Send an arbitrary command on the config channel and return the reply
    /// parts after the `OK` status.
    pub fn config_command(&self, command: Message) -> Result<Vec<Bytes>> {
        let reply = self.exchange(&self.control, &command)?;
        let mut parts = reply.into_parts().into_iter();
        match parts.next() {
            None => Err(ClientError::NoControllerResponse),
            Some(status) if status.as_ref() == ACK => Ok(parts.collect()),
            Some(status) => Err(ClientError::ConfigCommandFailed {
                status: String::from_utf8_lossy(&status).into_owned(),
            }),
        }
    }

    /// Ask the controller which dataplanes are attached.
    pub fn list_dataplanes(&self) -> Result<Vec<DataplaneDescriptor>> {
        let body = self
            .config_command(Message::single(GET_DATAPLANES_COMMAND))?
            .into_iter()
            .next()
            .ok_or(ClientError::EmptyConfigCommandResponse)?;
        let dataplanes = decode_roster(&body)?;
        debug!(count = dataplanes.len(), "dataplanes");
        Ok(dataplanes)
    }

    fn exchange(&self, channel: &Channel<T>, message: &Message) -> Result<Message> {
        let result = channel.request(message);
        if result.is_err() && !channel.is_open() {
            let _ = self.close();
        }
        result
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use serde_json::Value;

    use super::*;
    use crate::testing::{Event, ScriptedTransport};

    fn connection(store: ScriptedTransport, control: ScriptedTransport) -> Connection<ScriptedTransport> {
        Connection::with_transports(ClientConfig::default(), store, control)
    }

    fn request() -> StoreRequest {
        StoreRequest::new("interfaces dataplane dp0s3 mtu", "vyatta:mtu").unwrap()
    }

    #[test]
    fn store_without_action_does_no_io() {
        let store = ScriptedTransport::new().reply_parts(&["OK"]);
        let log = store.log();
        let conn = connection(store, ScriptedTransport::new());

        let err = conn.store_raw(&request(), b"\x01").unwrap_err();
        assert!(matches!(err, ClientError::NoCommitAction));
        assert!(log.events().is_empty());
    }

    #[test]
    fn store_sends_command_tree() {
        let store = ScriptedTransport::new().reply_parts(&["OK"]);
        let log = store.log();
        let conn = connection(store, ScriptedTransport::new());

        let request = request().with_action(Action::Delete).with_interface("dp0s3");
        conn.store_raw(&request, b"\x10\x01").unwrap();

        let sent = log.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), 1);
        let body = sent[0].first().unwrap();

        let value: Value = serde_json::from_slice(body).unwrap();
        let leaf = &value["interfaces"]["dataplane"]["dp0s3"]["mtu"];
        assert_eq!(leaf["__INTERFACE__"], "dp0s3");
        assert_eq!(leaf["__PROTOBUF__"], true);
        assert!(leaf["__DELETE__"].as_str().unwrap().starts_with("protobuf "));

        let tree = CommandTree::from_json(body).unwrap();
        let (_, inner) = tree.leaves()[0].1.decode().unwrap();
        assert_eq!(inner.msg.as_deref(), Some(&b"\x10\x01"[..]));
    }

    #[test]
    fn store_uses_configured_action() {
        let store = ScriptedTransport::new().reply_parts(&["OK"]);
        let log = store.log();
        let config = ClientConfig::default().with_commit_action(Action::Set);
        let conn = Connection::with_transports(config, store, ScriptedTransport::new());

        conn.store_raw(&request(), b"").unwrap();

        let tree = CommandTree::from_json(log.sent()[0].first().unwrap()).unwrap();
        assert_eq!(tree.leaves()[0].1.action, Action::Set);
    }

    #[test]
    fn store_encodes_typed_message() {
        #[derive(Clone, PartialEq, prost::Message)]
        struct Mtu {
            #[prost(uint32, tag = "1")]
            value: u32,
        }

        let store = ScriptedTransport::new().reply_parts(&["OK"]);
        let log = store.log();
        let conn = connection(store, ScriptedTransport::new());

        conn.store(&request().with_action(Action::Set), &Mtu { value: 1500 })
            .unwrap();

        let tree = CommandTree::from_json(log.sent()[0].first().unwrap()).unwrap();
        let (_, inner) = tree.leaves()[0].1.decode().unwrap();
        let decoded = <Mtu as prost::Message>::decode(inner.msg.unwrap().as_slice()).unwrap();
        assert_eq!(decoded.value, 1500);
    }

    #[test]
    fn store_ack_must_be_exact() {
        for status in ["ok", "", "FAIL", "OK "] {
            let store = ScriptedTransport::new().reply(Message::single(status));
            let conn = connection(store, ScriptedTransport::new());
            let err = conn
                .store_raw(&request().with_action(Action::Set), b"")
                .unwrap_err();
            assert!(
                matches!(err, ClientError::ConfigStoreFailed { status: ref s } if s == status),
                "{status:?} should be rejected, got {err}"
            );
        }
    }

    #[test]
    fn store_empty_reply_is_no_response() {
        let store = ScriptedTransport::new().reply(Message::new());
        let conn = connection(store, ScriptedTransport::new());
        let err = conn
            .store_raw(&request().with_action(Action::Set), b"")
            .unwrap_err();
        assert!(matches!(err, ClientError::NoControllerResponse));
    }

    #[test]
    fn store_command_sends_text_leaf() {
        let store = ScriptedTransport::new().reply_parts(&["OK"]);
        let log = store.log();
        let conn = connection(store, ScriptedTransport::new());

        conn.store_command("path to object", "command 1", Some(Action::Set), None)
            .unwrap();

        let value: Value = serde_json::from_slice(log.sent()[0].first().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"path": {"to": {"object": {
                "__SET__": "command 1",
                "__INTERFACE__": "ALL"
            }}}})
        );
    }

    #[test]
    fn store_command_rejected_by_controller() {
        let store = ScriptedTransport::new().reply_parts(&["FAIL"]);
        let log = store.log();
        let conn = connection(store, ScriptedTransport::new());

        let err = conn
            .store_command("path to object", "command 2", Some(Action::Delete), Some("dp0s3"))
            .unwrap_err();
        assert!(matches!(err, ClientError::ConfigStoreFailed { ref status } if status == "FAIL"));
        assert!(conn.is_open());

        let tree = CommandTree::from_json(log.sent()[0].first().unwrap()).unwrap();
        let leaves = tree.leaves();
        let leaf = leaves[0].1;
        assert_eq!(leaf.action, Action::Delete);
        assert_eq!(leaf.command, "command 2");
        assert_eq!(leaf.interface.as_deref(), Some("dp0s3"));
        assert!(!leaf.protobuf);
    }

    #[test]
    fn store_command_without_action_does_no_io() {
        let store = ScriptedTransport::new().reply_parts(&["OK"]);
        let log = store.log();
        let conn = connection(store, ScriptedTransport::new());

        let err = conn
            .store_command("path to object", "command 2", None, None)
            .unwrap_err();
        assert!(matches!(err, ClientError::NoCommitAction));
        assert!(log.events().is_empty());
    }

    #[test]
    fn store_command_empty_reply_is_no_response() {
        let store = ScriptedTransport::new().reply(Message::new());
        let config = ClientConfig::default().with_commit_action(Action::Set);
        let conn = Connection::with_transports(config, store, ScriptedTransport::new());
        assert!(matches!(
            conn.store_command("system", "x", None, None),
            Err(ClientError::NoControllerResponse)
        ));
    }

    #[test]
    fn oversized_store_leaves_connection_open() {
        let store = ScriptedTransport::new()
            .reject_send(ClientError::Frame(vplaned_frame::FrameError::PayloadTooLarge {
                size: 1443,
                max: 256,
            }))
            .reply_parts(&["OK"]);
        let store_log = store.log();
        let control = ScriptedTransport::new();
        let control_log = control.log();
        let conn = connection(store, control);

        let err = conn
            .store_raw(&request().with_action(Action::Set), &[7u8; 1024])
            .unwrap_err();
        assert!(!err.is_retryable());
        assert!(conn.is_open());
        assert!(control_log.events().is_empty());

        conn.store_raw(&request().with_action(Action::Set), b"\x01")
            .unwrap();
        assert_eq!(store_log.sent().len(), 1);
    }

    #[test]
    fn list_dataplanes_decodes_roster() {
        let control = ScriptedTransport::new().reply_parts(&[
            "OK",
            r#"{"dataplanes":[{"id":3,"control":"ipc:///tmp/dp3"}]}"#,
        ]);
        let log = control.log();
        let conn = connection(ScriptedTransport::new(), control);

        let dataplanes = conn.list_dataplanes().unwrap();
        assert_eq!(dataplanes.len(), 1);
        assert_eq!(dataplanes[0].id, 3);
        assert_eq!(dataplanes[0].control, "ipc:///tmp/dp3");
        assert_eq!(log.sent(), vec![Message::single("GETVPCONFIG")]);
    }

    fn list_with_reply(reply: Message) -> ClientError {
        let control = ScriptedTransport::new().reply(reply);
        let conn = connection(ScriptedTransport::new(), control);
        let err = conn.list_dataplanes().unwrap_err();
        assert!(conn.is_open(), "rejections keep the connection open");
        err
    }

    #[test]
    fn list_dataplanes_errors() {
        assert!(matches!(
            list_with_reply(Message::single("OK")),
            ClientError::EmptyConfigCommandResponse
        ));
        assert!(matches!(
            list_with_reply(Message::single("OK").with_part("not json")),
            ClientError::Json(_)
        ));
        assert!(matches!(
            list_with_reply(Message::single("ERR").with_part("{}")),
            ClientError::ConfigCommandFailed { ref status } if status == "ERR"
        ));
        assert!(matches!(
            list_with_reply(Message::new()),
            ClientError::NoControllerResponse
        ));
    }

    #[test]
    fn failed_request_closes_both_channels() {
        let store = ScriptedTransport::new();
        let store_log = store.log();
        let control = ScriptedTransport::new().fail(ClientError::Timeout(Duration::from_millis(1)));
        let conn = connection(store, control);

        let err = conn.list_dataplanes().unwrap_err();
        assert!(err.is_timeout());
        assert!(!conn.is_open());
        assert_eq!(store_log.events(), vec![Event::Disconnect]);

        let err = conn
            .store_raw(&request().with_action(Action::Set), b"")
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[test]
    fn close_twice() {
        let conn = connection(ScriptedTransport::new(), ScriptedTransport::new());
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(!conn.is_open());
    }

    #[test]
    fn concurrent_requests_do_not_interleave() {
        let control = ScriptedTransport::new()
            .echo()
            .delay(Duration::from_millis(20));
        let log = control.log();
        let conn = Arc::new(connection(ScriptedTransport::new(), control));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let conn = Arc::clone(&conn);
                thread::spawn(move || {
                    let body = format!("request-{i}");
                    let reply = conn
                        .config_command(Message::single(body.clone()))
                        .unwrap();
                    assert_eq!(reply, vec![Bytes::from(body)]);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let events = log.events();
        assert_eq!(events.len(), 8);
        for pair in events.chunks(2) {
            assert!(matches!(pair[0], Event::Send(_)));
            assert_eq!(pair[1], Event::Recv);
        }
    }

    #[test]
    fn concurrent_stores_do_not_interleave() {
        let store = ScriptedTransport::new()
            .echo()
            .delay(Duration::from_millis(20));
        let log = store.log();
        let config = ClientConfig::default().with_commit_action(Action::Set);
        let conn = Arc::new(Connection::with_transports(
            config,
            store,
            ScriptedTransport::new(),
        ));

        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let conn = Arc::clone(&conn);
                thread::spawn(move || conn.store_raw(&request(), &[i]).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let events = log.events();
        assert_eq!(events.len(), 8);
        for pair in events.chunks(2) {
            assert!(matches!(pair[0], Event::Send(_)));
            assert_eq!(pair[1], Event::Recv);
        }

        let mut payloads: Vec<u8> = log
            .sent()
            .iter()
            .map(|sent| {
                let tree = CommandTree::from_json(sent.first().unwrap()).unwrap();
                let (_, inner) = tree.leaves()[0].1.decode().unwrap();
                inner.msg.unwrap()[0]
            })
            .collect();
        payloads.sort_unstable();
        assert_eq!(payloads, vec![0, 1, 2, 3]);
    }
}
