//! Poll model and its lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a poll.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    #[default]
    Draft,
    Active,
    Completed,
}

impl PollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollStatus::Draft => "draft",
            PollStatus::Active => "active",
            PollStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PollStatus::Draft),
            "active" => Some(PollStatus::Active),
            "completed" => Some(PollStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable answer. Never edited; replacing a poll's options mints new ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollOption {
    pub id: String,
    pub text: String,
}

/// A question put to the class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
    pub created_by: String,
    /// Seconds, in `1..=60`
    pub time_limit: u32,
    pub status: PollStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Poll {
    pub fn option(&self, option_id: &str) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// Request body for creating a poll.
///
/// Fields stay loosely typed so a wrong JSON type is reported as a
/// validation failure on that field rather than an undecodable body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    #[serde(default)]
    pub question: Option<Value>,
    #[serde(default)]
    pub options: Option<Value>,
    #[serde(default)]
    pub created_by: Option<Value>,
    #[serde(default)]
    pub time_limit: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
}

/// Request body for a partial poll update. Absent fields are left untouched;
/// a field sent as `null` is present and must validate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    #[serde(default, deserialize_with = "super::present")]
    pub question: Option<Value>,
    #[serde(default, deserialize_with = "super::present")]
    pub options: Option<Value>,
    #[serde(default, deserialize_with = "super::present")]
    pub time_limit: Option<Value>,
    #[serde(default, deserialize_with = "super::present")]
    pub status: Option<Value>,
}

/// Tally for one option.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OptionResult {
    pub option_id: String,
    pub text: String,
    pub count: usize,
}

/// Aggregated results for a poll, in the poll's option order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub poll_id: String,
    pub results: Vec<OptionResult>,
}
