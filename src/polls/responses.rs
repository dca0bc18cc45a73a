//! Response collection: one answer per student per poll.

use chrono::Utc;

use super::{poll_not_found, results};
use crate::errors::AppError;
use crate::ids::new_id;
use crate::models::{PollResponse, PollStatus, SubmitResponseRequest};
use crate::notify::{Dispatcher, Event};
use crate::store::SharedStore;
use crate::validate;

/// Records student answers and triggers results on full participation.
#[derive(Clone)]
pub struct ResponseCollector {
    store: SharedStore,
    events: Dispatcher,
}

impl ResponseCollector {
    pub fn new(store: SharedStore, events: Dispatcher) -> Self {
        Self { store, events }
    }

    /// Record a student's answer to the active poll.
    ///
    /// Broadcasts `poll:response`, followed by `poll:results` when every
    /// registered student has now answered.
    pub async fn submit(
        &self,
        poll_id: &str,
        request: &SubmitResponseRequest,
    ) -> Result<PollResponse, AppError> {
        let mut store = self.store.lock().await;

        let poll = store.poll(poll_id).ok_or_else(|| poll_not_found(poll_id))?;
        if poll.status != PollStatus::Active {
            tracing::warn!("Poll {} is not active ({})", poll_id, poll.status);
            return Err(AppError::InvalidState("Poll is not active".to_string()));
        }

        let student_id = validate::require(
            &request.student_id,
            validate::identifier,
            "studentId is required",
        )?;
        let option_id = validate::require(
            &request.option_id,
            validate::identifier,
            "optionId is required",
        )?;

        if poll.option(&option_id).is_none() {
            tracing::warn!("Invalid optionId {} for poll {}", option_id, poll_id);
            return Err(AppError::Validation("Invalid optionId".to_string()));
        }

        if store.has_response(poll_id, &student_id) {
            tracing::info!("Student {} already responded to poll {}", student_id, poll_id);
            return Err(AppError::Conflict(
                "Student has already responded to this poll".to_string(),
            ));
        }

        let response = PollResponse {
            id: new_id(),
            poll_id: poll_id.to_string(),
            student_id,
            option_id,
            submitted_at: Utc::now(),
        };
        store.insert_response(response.clone());

        if let Some(user) = store.user_mut(&response.student_id) {
            user.last_active = response.submitted_at;
        }

        let mut events = vec![Event::PollResponse(response.clone())];

        let students = store.student_count();
        let responders = store.responder_count(poll_id);
        if students > 0 && responders == students {
            if let Some(poll) = store.poll(poll_id) {
                tracing::info!("All students responded to poll {}", poll_id);
                events.push(Event::PollResults(results::poll_results(&store, poll)));
            }
        } else {
            tracing::debug!("Responses received: {}/{}", responders, students);
        }
        drop(store);

        tracing::info!(
            "Stored response {} from {} for poll {}",
            response.id,
            response.student_id,
            poll_id
        );
        self.events.dispatch(events);

        Ok(response)
    }

    /// All responses recorded for a poll that still exists.
    pub async fn list_by_poll(&self, poll_id: &str) -> Result<Vec<PollResponse>, AppError> {
        let store = self.store.lock().await;
        if store.poll(poll_id).is_none() {
            return Err(poll_not_found(poll_id));
        }
        Ok(store.responses_for(poll_id).cloned().collect())
    }
}
