//! Data models for the classroom poll backend.
//!
//! Field names serialize in camelCase to match the web client.

mod chat;
mod poll;
mod response;
mod user;

pub use chat::*;
pub use poll::*;
pub use response::*;
pub use user::*;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Keep an explicit `null` as `Some(Value::Null)`, so a field sent as null
/// is told apart from one left out. Pair with `#[serde(default)]`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
