//! Wire messages shared with the controller and the dataplanes (proto2).
//!
//! ```text
//! message DataplaneEnvelope {
//!     optional string type = 1;
//!     optional bytes msg = 2;
//! }
//!
//! message VPlanedEnvelope {
//!     enum Action { SET = 0; DELETE = 1; }
//!     optional string key = 1;
//!     optional Action action = 2;
//!     optional string interface = 3;
//!     optional bytes msg = 4;
//! }
//! ```

use crate::action::Action;

/// Typed payload wrapper understood by every dataplane.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DataplaneEnvelope {
    /// Schema name of `msg`, e.g. `vyatta:route`.
    #[prost(string, optional, tag = "1")]
    pub r#type: Option<String>,
    /// Serialized payload.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub msg: Option<Vec<u8>>,
}

/// Keyed, actioned wrapper the controller stores and replays.
#[derive(Clone, PartialEq, prost::Message)]
pub struct VPlanedEnvelope {
    /// Space-joined configuration path.
    #[prost(string, optional, tag = "1")]
    pub key: Option<String>,
    #[prost(enumeration = "Action", optional, tag = "2")]
    pub action: Option<i32>,
    #[prost(string, optional, tag = "3")]
    pub interface: Option<String>,
    /// Serialized [`DataplaneEnvelope`].
    #[prost(bytes = "vec", optional, tag = "4")]
    pub msg: Option<Vec<u8>>,
}

impl VPlanedEnvelope {
    /// The decoded action, if present and known.
    pub fn commit_action(&self) -> Option<Action> {
        match self.action? {
            0 => Some(Action::Set),
            1 => Some(Action::Delete),
            _ => None,
        }
    }
}
