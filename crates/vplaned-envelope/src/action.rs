use std::fmt;
use std::str::FromStr;

use crate::error::EnvelopeError;

/// Commit action attached to a configuration change.
///
/// Doubles as the `VPlanedEnvelope.Action` protobuf enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Action {
    Set = 0,
    Delete = 1,
}

impl Action {
    /// The spelling used by the commit machinery (`COMMIT_ACTION`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::Delete => "DELETE",
        }
    }

    /// Key of the command string in a command tree leaf, e.g. `__SET__`.
    pub fn leaf_key(self) -> &'static str {
        match self {
            Self::Set => "__SET__",
            Self::Delete => "__DELETE__",
        }
    }

    /// Parse `SET` or `DELETE` exactly; anything else is rejected.
    pub fn parse(input: &str) -> Result<Self, EnvelopeError> {
        match input {
            "SET" => Ok(Self::Set),
            "DELETE" => Ok(Self::Delete),
            other => Err(EnvelopeError::InvalidAction(other.to_string())),
        }
    }
}

impl FromStr for Action {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
