//! Identifier minting for users, sessions, polls, options, responses and chat messages.

use uuid::Uuid;

/// Mint a fresh opaque identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
