//! Classroom chat model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A posted chat line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub message: String,
    /// RFC 3339
    pub timestamp: String,
}

/// Request body for posting a chat message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub user_name: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}
