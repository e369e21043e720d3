//! The JSON command tree sent to the controller's store socket.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::action::Action;
use crate::codec::decode_command;
use crate::error::{EnvelopeError, Result};
use crate::path::ConfigPath;
use crate::proto::{DataplaneEnvelope, VPlanedEnvelope};

const INTERFACE_KEY: &str = "__INTERFACE__";
const PROTOBUF_KEY: &str = "__PROTOBUF__";
const LEAF_KEYS: [&str; 4] = ["__SET__", "__DELETE__", INTERFACE_KEY, PROTOBUF_KEY];

/// Terminal record of a command tree.
///
/// A protobuf leaf carries `"protobuf "` followed by the base64 encoded
/// [`VPlanedEnvelope`] and is marked with `__PROTOBUF__`. A text leaf carries
/// a plain space-separated dataplane command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLeaf {
    pub action: Action,
    pub command: String,
    pub interface: Option<String>,
    pub protobuf: bool,
}

impl CommandLeaf {
    /// Leaf holding a plain dataplane command.
    pub fn text(action: Action, command: impl Into<String>, interface: Option<String>) -> Self {
        Self {
            action,
            command: command.into(),
            interface,
            protobuf: false,
        }
    }

    /// Decode the envelopes carried in [`CommandLeaf::command`].
    ///
    /// Text leaves carry no envelope and fail with
    /// [`EnvelopeError::NotProtobufCommand`].
    pub fn decode(&self) -> Result<(VPlanedEnvelope, DataplaneEnvelope)> {
        if !self.protobuf {
            return Err(EnvelopeError::NotProtobufCommand);
        }
        decode_command(&self.command)
    }
}

impl Serialize for CommandLeaf {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = 1 + usize::from(self.interface.is_some()) + usize::from(self.protobuf);
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(self.action.leaf_key(), &self.command)?;
        if let Some(interface) = &self.interface {
            map.serialize_entry(INTERFACE_KEY, interface)?;
        }
        if self.protobuf {
            map.serialize_entry(PROTOBUF_KEY, &true)?;
        }
        map.end()
    }
}

/// A node is either a branch keyed by path token or a leaf record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandNode {
    Branch(BTreeMap<String, CommandNode>),
    Leaf(CommandLeaf),
}

impl Serialize for CommandNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Branch(children) => children.serialize(serializer),
            Self::Leaf(leaf) => leaf.serialize(serializer),
        }
    }
}

/// Nested map keyed by successive path tokens, ending in a [`CommandLeaf`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandTree {
    root: BTreeMap<String, CommandNode>,
}

impl CommandTree {
    /// Build the single-path tree for `path`, one nesting level per token.
    pub fn new(path: &ConfigPath, leaf: CommandLeaf) -> Self {
        // ConfigPath is never empty, so the fold always ends in a branch.
        let node = path
            .tokens()
            .iter()
            .rev()
            .fold(CommandNode::Leaf(leaf), |node, token| {
                CommandNode::Branch(BTreeMap::from([(token.clone(), node)]))
            });
        let root = match node {
            CommandNode::Branch(root) => root,
            CommandNode::Leaf(_) => BTreeMap::new(),
        };
        Self { root }
    }

    pub fn root(&self) -> &BTreeMap<String, CommandNode> {
        &self.root
    }

    /// Every leaf together with the path leading to it, in key order.
    pub fn leaves(&self) -> Vec<(ConfigPath, &CommandLeaf)> {
        fn walk<'a>(
            children: &'a BTreeMap<String, CommandNode>,
            prefix: &mut Vec<String>,
            out: &mut Vec<(ConfigPath, &'a CommandLeaf)>,
        ) {
            for (token, node) in children {
                prefix.push(token.clone());
                match node {
                    CommandNode::Branch(next) => walk(next, prefix, out),
                    CommandNode::Leaf(leaf) => {
                        if let Ok(path) = ConfigPath::from_tokens(prefix.iter().cloned()) {
                            out.push((path, leaf));
                        }
                    }
                }
                prefix.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// Compact JSON encoding, the store wire format.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a command tree document as received by the controller.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        match parse_node(value)? {
            CommandNode::Branch(root) if !root.is_empty() => Ok(Self { root }),
            CommandNode::Branch(_) => Err(EnvelopeError::MalformedTree(
                "tree has no path".to_string(),
            )),
            CommandNode::Leaf(_) => Err(EnvelopeError::MalformedTree(
                "leaf record at top level".to_string(),
            )),
        }
    }
}

fn parse_node(value: Value) -> Result<CommandNode> {
    let Value::Object(map) = value else {
        return Err(EnvelopeError::MalformedTree(
            "expected a JSON object".to_string(),
        ));
    };

    if !LEAF_KEYS.iter().any(|key| map.contains_key(*key)) {
        let mut children = BTreeMap::new();
        for (token, child) in map {
            children.insert(token, parse_node(child)?);
        }
        return Ok(CommandNode::Branch(children));
    }

    let mut action = None;
    let mut interface = None;
    let mut protobuf = false;
    for (key, value) in map {
        match key.as_str() {
            PROTOBUF_KEY => protobuf = true,
            INTERFACE_KEY => interface = Some(expect_string(&key, value)?),
            "__SET__" => action = Some((Action::Set, expect_string(&key, value)?)),
            "__DELETE__" => action = Some((Action::Delete, expect_string(&key, value)?)),
            other => {
                return Err(EnvelopeError::MalformedTree(format!(
                    "unexpected key '{other}' in leaf record"
                )))
            }
        }
    }

    let (action, command) = action.ok_or_else(|| {
        EnvelopeError::MalformedTree("leaf record has no __SET__ or __DELETE__".to_string())
    })?;
    Ok(CommandNode::Leaf(CommandLeaf {
        action,
        command,
        interface,
        protobuf,
    }))
}

fn expect_string(key: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(EnvelopeError::MalformedTree(format!(
            "'{key}' must be a string"
        ))),
    }
}
