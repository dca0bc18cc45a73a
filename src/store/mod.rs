//! In-memory entity store.
//!
//! The store is the single owner of every collection. It lives for the whole
//! process and is shared between services behind one async mutex: holding the
//! lock for an entire validate-and-commit step is what keeps each operation
//! atomic with respect to the others.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::{ChatMessage, Poll, PollResponse, PollStatus, Role, User};

/// Store handle shared by all services.
pub type SharedStore = Arc<Mutex<Store>>;

/// Authoritative collections of users, polls, responses and chat messages.
///
/// Lookups scan; classroom-sized collections stay small.
#[derive(Debug, Default)]
pub struct Store {
    users: Vec<User>,
    polls: Vec<Poll>,
    responses: Vec<PollResponse>,
    messages: Vec<ChatMessage>,
    revision: i64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh, empty store ready to hand to services.
    pub fn shared() -> SharedStore {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Number of committed writes so far.
    pub fn revision(&self) -> i64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    // ==================== USER OPERATIONS ====================

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user_mut(&mut self, id: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    pub fn insert_user(&mut self, user: User) {
        self.users.push(user);
        self.bump();
    }

    /// Remove a user, returning it if it existed.
    pub fn remove_user(&mut self, id: &str) -> Option<User> {
        let idx = self.users.iter().position(|u| u.id == id)?;
        self.bump();
        Some(self.users.remove(idx))
    }

    /// Number of distinct registered students.
    pub fn student_count(&self) -> usize {
        self.users
            .iter()
            .filter(|u| u.role == Role::Student)
            .map(|u| u.id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    // ==================== POLL OPERATIONS ====================

    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn poll(&self, id: &str) -> Option<&Poll> {
        self.polls.iter().find(|p| p.id == id)
    }

    /// The poll currently accepting responses, if any.
    pub fn active_poll(&self) -> Option<&Poll> {
        self.polls.iter().find(|p| p.status == PollStatus::Active)
    }

    pub fn insert_poll(&mut self, poll: Poll) {
        self.polls.push(poll);
        self.bump();
    }

    /// Apply `change` to the poll in place and return the updated snapshot.
    pub fn update_poll(&mut self, id: &str, change: impl FnOnce(&mut Poll)) -> Option<Poll> {
        let poll = self.polls.iter_mut().find(|p| p.id == id)?;
        change(poll);
        let updated = poll.clone();
        self.bump();
        Some(updated)
    }

    /// Remove a poll. Its responses are left in place.
    pub fn remove_poll(&mut self, id: &str) -> Option<Poll> {
        let idx = self.polls.iter().position(|p| p.id == id)?;
        self.bump();
        Some(self.polls.remove(idx))
    }

    // ==================== RESPONSE OPERATIONS ====================

    pub fn responses_for<'a>(&'a self, poll_id: &'a str) -> impl Iterator<Item = &'a PollResponse> {
        self.responses.iter().filter(move |r| r.poll_id == poll_id)
    }

    pub fn has_response(&self, poll_id: &str, student_id: &str) -> bool {
        self.responses_for(poll_id)
            .any(|r| r.student_id == student_id)
    }

    /// Number of distinct students who answered the poll.
    pub fn responder_count(&self, poll_id: &str) -> usize {
        self.responses_for(poll_id)
            .map(|r| r.student_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn insert_response(&mut self, response: PollResponse) {
        self.responses.push(response);
        self.bump();
    }

    // ==================== CHAT OPERATIONS ====================

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn insert_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.bump();
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Builders shared by unit tests across modules.

    use chrono::Utc;

    use crate::ids::new_id;
    use crate::models::{Poll, PollOption, PollResponse, PollStatus, Role, User};

    pub fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: new_id(),
            name: "Ada".to_string(),
            role,
            session_id: new_id(),
            created_at: now,
            last_active: now,
        }
    }

    pub fn poll(status: PollStatus, options: &[&str]) -> Poll {
        Poll {
            id: new_id(),
            question: "Pick one".to_string(),
            options: options
                .iter()
                .map(|text| PollOption {
                    id: new_id(),
                    text: text.to_string(),
                })
                .collect(),
            created_by: "teacher-1".to_string(),
            time_limit: 30,
            status,
            created_at: Utc::now(),
            activated_at: None,
            completed_at: None,
        }
    }

    pub fn response(poll_id: &str, student_id: &str, option_id: &str) -> PollResponse {
        PollResponse {
            id: new_id(),
            poll_id: poll_id.to_string(),
            student_id: student_id.to_string(),
            option_id: option_id.to_string(),
            submitted_at: Utc::now(),
        }
    }
}
