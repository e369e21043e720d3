use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use bytes::Bytes;
use prost::Message;

use crate::action::Action;
use crate::error::{EnvelopeError, Result};
use crate::path::ConfigPath;
use crate::proto::{DataplaneEnvelope, VPlanedEnvelope};
use crate::tree::{CommandLeaf, CommandTree};

/// Prefix of the command string carried in a tree leaf.
pub const PROTOBUF_COMMAND_PREFIX: &str = "protobuf ";

/// Interface named by text commands that apply everywhere.
pub const ALL_INTERFACES: &str = "ALL";

/// Output of [`encode_store_command`].
#[derive(Debug, Clone)]
pub struct EncodedCommand {
    /// Serialized [`VPlanedEnvelope`].
    pub envelope: Bytes,
    /// Tree to send to the store socket.
    pub tree: CommandTree,
}

/// Serialize any protobuf message into a fresh buffer.
pub fn encode_message<M: Message>(msg: &M, what: &'static str) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(msg.encoded_len());
    msg.encode(&mut buf)
        .map_err(|source| EnvelopeError::Encode { what, source })?;
    Ok(buf)
}

/// Wrap an already serialized payload in a [`DataplaneEnvelope`] and serialize it.
pub fn encode_dataplane_envelope(msg_type: &str, payload: &[u8]) -> Result<Vec<u8>> {
    if msg_type.is_empty() {
        return Err(EnvelopeError::EmptyMessageType);
    }
    let envelope = DataplaneEnvelope {
        r#type: Some(msg_type.to_string()),
        msg: Some(payload.to_vec()),
    };
    encode_message(&envelope, "dataplane envelope")
}

/// Parse a serialized [`DataplaneEnvelope`].
pub fn decode_dataplane_envelope(bytes: &[u8]) -> Result<DataplaneEnvelope> {
    DataplaneEnvelope::decode(bytes).map_err(|source| EnvelopeError::Decode {
        what: "dataplane envelope",
        source,
    })
}

/// Build both envelopes and the command tree for one configuration change.
///
/// `payload` is the caller's already serialized message; it is carried
/// opaquely. An empty `interface` is treated as absent.
pub fn encode_store_command(
    path: &ConfigPath,
    msg_type: &str,
    payload: &[u8],
    action: Action,
    interface: Option<&str>,
) -> Result<EncodedCommand> {
    let interface = interface.filter(|i| !i.is_empty());
    let inner = encode_dataplane_envelope(msg_type, payload)?;

    let outer = VPlanedEnvelope {
        key: Some(path.key()),
        action: Some(action as i32),
        interface: interface.map(str::to_string),
        msg: Some(inner),
    };
    let envelope = encode_message(&outer, "vplaned envelope")?;

    let leaf = CommandLeaf {
        action,
        command: format!(
            "{PROTOBUF_COMMAND_PREFIX}{}",
            BASE64_STANDARD.encode(&envelope)
        ),
        interface: interface.map(str::to_string),
        protobuf: true,
    };

    Ok(EncodedCommand {
        envelope: Bytes::from(envelope),
        tree: CommandTree::new(path, leaf),
    })
}

/// Command tree for a plain text dataplane command.
///
/// The leaf always names an interface: [`ALL_INTERFACES`] when `interface`
/// is absent or empty.
pub fn encode_text_command(
    path: &ConfigPath,
    command: &str,
    action: Action,
    interface: Option<&str>,
) -> CommandTree {
    let interface = interface.filter(|i| !i.is_empty()).unwrap_or(ALL_INTERFACES);
    CommandTree::new(
        path,
        CommandLeaf::text(action, command, Some(interface.to_string())),
    )
}

/// Inverse of the leaf command string: strip the prefix, base64-decode, and
/// parse both envelope layers.
pub fn decode_command(command: &str) -> Result<(VPlanedEnvelope, DataplaneEnvelope)> {
    let encoded = command
        .strip_prefix(PROTOBUF_COMMAND_PREFIX)
        .ok_or(EnvelopeError::NotProtobufCommand)?;
    let raw = BASE64_STANDARD.decode(encoded)?;

    let outer = VPlanedEnvelope::decode(raw.as_slice()).map_err(|source| {
        EnvelopeError::Decode {
            what: "vplaned envelope",
            source,
        }
    })?;
    let inner = decode_dataplane_envelope(outer.msg.as_deref().unwrap_or_default())?;
    Ok((outer, inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stand-in for a generated config message.
    #[derive(Clone, PartialEq, prost::Message)]
    struct MtuConfig {
        #[prost(string, tag = "1")]
        ifname: String,
        #[prost(uint32, tag = "2")]
        mtu: u32,
    }

    #[test]
    fn command_string_decodes_back_to_payload() {
        let path = ConfigPath::parse("interfaces dataplane dp0s3 mtu").unwrap();
        let msg = MtuConfig {
            ifname: "dp0s3".to_string(),
            mtu: 9000,
        };
        let payload = msg.encode_to_vec();

        let encoded =
            encode_store_command(&path, "vyatta:mtu", &payload, Action::Set, Some("dp0s3"))
                .unwrap();

        let leaves = encoded.tree.leaves();
        assert_eq!(leaves.len(), 1);
        let (leaf_path, leaf) = &leaves[0];
        assert_eq!(leaf_path, &path);
        assert!(leaf.command.starts_with(PROTOBUF_COMMAND_PREFIX));

        let (outer, inner) = leaf.decode().unwrap();
        assert_eq!(outer.key.as_deref(), Some("interfaces dataplane dp0s3 mtu"));
        assert_eq!(outer.commit_action(), Some(Action::Set));
        assert_eq!(outer.interface.as_deref(), Some("dp0s3"));
        assert_eq!(inner.r#type.as_deref(), Some("vyatta:mtu"));
        assert_eq!(inner.msg.as_deref(), Some(payload.as_slice()));
        assert_eq!(MtuConfig::decode(inner.msg.unwrap().as_slice()).unwrap(), msg);

        // The envelope bytes in the result are the ones embedded in the leaf.
        let outer_bytes = encode_message(&outer, "outer").unwrap();
        assert_eq!(encoded.envelope.as_ref(), outer_bytes.as_slice());
    }

    #[test]
    fn outer_payload_is_serialized_inner_envelope() {
        let path = ConfigPath::parse("system").unwrap();
        let encoded = encode_store_command(&path, "t", b"\x01\x02", Action::Delete, None).unwrap();

        let outer = VPlanedEnvelope::decode(encoded.envelope.as_ref()).unwrap();
        let expected_inner = encode_dataplane_envelope("t", b"\x01\x02").unwrap();
        assert_eq!(outer.msg.as_deref(), Some(expected_inner.as_slice()));
        assert_eq!(outer.commit_action(), Some(Action::Delete));
        assert!(outer.interface.is_none());
    }

    #[test]
    fn empty_interface_is_omitted() {
        let path = ConfigPath::parse("a b").unwrap();
        let encoded = encode_store_command(&path, "t", b"", Action::Set, Some("")).unwrap();
        let value = serde_json::to_value(&encoded.tree).unwrap();
        assert!(value["a"]["b"].get("__INTERFACE__").is_none());
    }

    #[test]
    fn empty_payload_roundtrips() {
        let path = ConfigPath::parse("a").unwrap();
        let encoded = encode_store_command(&path, "empty", b"", Action::Set, None).unwrap();
        let (_, inner) = encoded.tree.leaves()[0].1.decode().unwrap();
        assert_eq!(inner.r#type.as_deref(), Some("empty"));
        assert_eq!(inner.msg.as_deref(), Some(&[][..]));
    }

    #[test]
    fn empty_message_type_is_encoding_error() {
        let path = ConfigPath::parse("a").unwrap();
        let err = encode_store_command(&path, "", b"x", Action::Set, None).unwrap_err();
        assert!(err.is_encoding());
    }

    #[test]
    fn decode_command_rejects_garbage() {
        assert!(matches!(
            decode_command("set interfaces"),
            Err(EnvelopeError::NotProtobufCommand)
        ));
        assert!(matches!(
            decode_command("protobuf !!!"),
            Err(EnvelopeError::Base64(_))
        ));
        let junk = format!("protobuf {}", BASE64_STANDARD.encode([0xff, 0xff, 0xff]));
        assert!(decode_command(&junk).unwrap_err().is_decoding());
    }

    #[test]
    fn text_command_defaults_to_all_interfaces() {
        let path = ConfigPath::parse("path to object").unwrap();

        let tree = encode_text_command(&path, "command 2", Action::Delete, None);
        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"path": {"to": {"object": {
                "__DELETE__": "command 2",
                "__INTERFACE__": "ALL"
            }}}})
        );

        let tree = encode_text_command(&path, "mtu 9000", Action::Set, Some("dp0s3"));
        let leaves = tree.leaves();
        let leaf = leaves[0].1;
        assert_eq!(leaf.interface.as_deref(), Some("dp0s3"));
        assert!(!leaf.protobuf);

        let tree = encode_text_command(&path, "x", Action::Set, Some(""));
        assert_eq!(tree.leaves()[0].1.interface.as_deref(), Some(ALL_INTERFACES));
    }

    #[test]
    fn dataplane_envelope_decode_error() {
        let err = decode_dataplane_envelope(&[0x0a, 0x05, b'a']).unwrap_err();
        assert!(matches!(err, EnvelopeError::Decode { .. }));
    }
}
