//! Reply envelope sent back on `reply_to`

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CommandResult;
use crate::context::now_micros;
use crate::error::Result;
use crate::node::NodeIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// Wire format of every command reply
///
/// ```json
/// {"success":true,"status":"success","message":"Agent status","timestamp":1700000000000000,"node_id":"fs_node_a","data":{}}
/// ```
///
/// `data` is only present on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub success: bool,
    pub status: ReplyStatus,
    pub message: String,
    /// Microseconds since the Unix epoch
    pub timestamp: i64,
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ReplyEnvelope {
    pub fn from_result(result: &CommandResult, node: &NodeIdentity) -> Self {
        let success = result.is_success();
        Self {
            success,
            status: if success { ReplyStatus::Success } else { ReplyStatus::Error },
            message: result.reply_message().to_string(),
            timestamp: now_micros(),
            node_id: node.to_string(),
            data: if success { result.data.clone() } else { None },
        }
    }

    /// Error reply produced before any handler ran
    pub fn failure(message: impl Into<String>, node: &NodeIdentity) -> Self {
        Self {
            success: false,
            status: ReplyStatus::Error,
            message: message.into(),
            timestamp: now_micros(),
            node_id: node.to_string(),
            data: None,
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_only_on_success() {
        let node = NodeIdentity::new("node-a");

        let ok = ReplyEnvelope::from_result(&CommandResult::ok().with_data(json!({"k": 1})), &node);
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "Command executed");
        assert_eq!(value["node_id"], "node_a");
        assert_eq!(value["data"], json!({"k": 1}));

        let failed = CommandResult::error("boom").with_data(json!({"k": 1}));
        let value = serde_json::to_value(ReplyEnvelope::from_result(&failed, &node)).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "boom");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_timestamp_is_microseconds() {
        let reply = ReplyEnvelope::failure("Invalid JSON payload", &NodeIdentity::new("n"));
        // anything after 2001 in microseconds has at least 16 digits
        assert!(reply.timestamp > 1_000_000_000_000_000);
    }
}
