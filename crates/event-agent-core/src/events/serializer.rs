use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TelephonyEvent;
use crate::context::now_micros;
use crate::error::Result;
use crate::node::NodeIdentity;

/// Wire format of a published event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_name: String,
    /// Microseconds since the Unix epoch, taken at serialization
    pub timestamp: i64,
    pub node_id: String,
    /// Value of the `Unique-ID` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// A header that appears more than once keeps its last value
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl EventEnvelope {
    pub fn from_event(event: &TelephonyEvent, node: &NodeIdentity) -> Self {
        let headers = event
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            event_name: event.name.clone(),
            timestamp: now_micros(),
            node_id: node.to_string(),
            uuid: event.unique_id().map(str::to_string),
            headers,
            body: event.body.clone(),
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}
