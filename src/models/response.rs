//! A student's recorded answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One student's single choice for one poll. Never edited or removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub poll_id: String,
    pub student_id: String,
    pub option_id: String,
    pub submitted_at: DateTime<Utc>,
}

/// Request body for submitting a response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    #[serde(default)]
    pub student_id: Option<Value>,
    #[serde(default)]
    pub option_id: Option<Value>,
}
