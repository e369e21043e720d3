/// Errors raised while building or taking apart envelopes and command trees.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Protobuf serialization failed.
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        source: prost::EncodeError,
    },

    /// Protobuf deserialization failed.
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        source: prost::DecodeError,
    },

    /// The command string is not valid base64.
    #[error("invalid base64 in command string: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The command string does not start with `"protobuf "`.
    #[error("command string is not a protobuf command")]
    NotProtobufCommand,

    /// The configuration path is empty or has an empty token.
    #[error("invalid config path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The action is neither `SET` nor `DELETE`.
    #[error("invalid commit action '{0}' (expected SET or DELETE)")]
    InvalidAction(String),

    /// The message type tag is empty.
    #[error("message type must not be empty")]
    EmptyMessageType,

    /// A JSON document does not have the command tree shape.
    #[error("malformed command tree: {0}")]
    MalformedTree(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnvelopeError {
    /// True for failures while producing bytes from caller input.
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            Self::Encode { .. } | Self::InvalidPath { .. } | Self::EmptyMessageType
        )
    }

    /// True for failures while interpreting received bytes.
    pub fn is_decoding(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. }
                | Self::Base64(_)
                | Self::NotProtobufCommand
                | Self::MalformedTree(_)
                | Self::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
