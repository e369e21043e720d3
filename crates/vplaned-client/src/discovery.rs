//! Dataplane roster as reported by the controller.

use serde::{Deserialize, Serialize};
use vplaned_transport::Endpoint;

use crate::error::Result;

/// One dataplane attached to the controller.
///
/// Every field is optional on the wire and takes its zero value when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataplaneDescriptor {
    pub id: u32,
    pub timeout: u64,
    pub local: bool,
    pub connected: bool,
    #[serde(rename = "delpend")]
    pub delete_pending: bool,
    #[serde(rename = "ctladdr")]
    pub control_address: String,
    #[serde(rename = "clocktick")]
    pub clock_tick: u32,
    pub connects: u32,
    pub uuid: String,
    #[serde(rename = "sessionid")]
    pub session_id: String,
    /// Endpoint of the dataplane's control channel.
    pub control: String,
    pub interfaces: Vec<InterfaceDescriptor>,
}

impl DataplaneDescriptor {
    /// Endpoint for [`crate::DataplaneChannel`], or `default` when the
    /// descriptor names none.
    pub fn control_endpoint(&self, default: &Endpoint) -> Result<Endpoint> {
        if self.control.is_empty() {
            Ok(default.clone())
        } else {
            Ok(Endpoint::parse(&self.control)?)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceDescriptor {
    pub index: u32,
    pub name: String,
    pub state: String,
}

impl InterfaceDescriptor {
    /// Dataplane id encoded in the interface name: the digits right after the
    /// leading lowercase letters (`dp0s3` is on dataplane 0, `dp12p1` on 12).
    pub fn dataplane_id(&self) -> Option<u32> {
        let rest = self.name.trim_start_matches(|c: char| c.is_ascii_lowercase());
        if rest.len() == self.name.len() {
            return None;
        }
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .map_or(rest, |end| &rest[..end]);
        digits.parse().ok()
    }
}

#[derive(Deserialize)]
struct Roster {
    dataplanes: Vec<DataplaneDescriptor>,
}

/// Decode a `{"dataplanes": [...]}` document.
pub fn decode_roster(body: &[u8]) -> Result<Vec<DataplaneDescriptor>> {
    let roster: Roster = serde_json::from_slice(body)?;
    Ok(roster.dataplanes)
}
