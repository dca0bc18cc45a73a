//! Poll creation, partial updates and status transitions.
//!
//! At most one poll in the store may be `active` at any time. A status change
//! into `active` broadcasts `poll:activated`; a change into `completed`
//! broadcasts `poll:results`. Both are queued only after the change is
//! committed and are never able to undo it.

use chrono::{DateTime, Utc};

use super::{poll_not_found, results};
use crate::errors::AppError;
use crate::ids::new_id;
use crate::models::{
    CreatePollRequest, Poll, PollOption, PollResults, PollStatus, UpdatePollRequest,
};
use crate::notify::{Dispatcher, Event};
use crate::store::SharedStore;
use crate::validate;

const QUESTION_REQUIRED: &str = "Question is required";
const INVALID_QUESTION: &str = "Invalid question";
const INVALID_OPTIONS: &str = "At least two valid options are required";
const INVALID_TIME_LIMIT: &str = "Time limit must be between 1 and 60 seconds";
const CREATED_BY_REQUIRED: &str = "createdBy is required";
const INVALID_STATUS: &str = "Invalid status";
const ALREADY_ACTIVE: &str = "Another poll is already active";

/// Always mints fresh option ids.
fn mint_options(texts: Vec<String>) -> Vec<PollOption> {
    texts
        .into_iter()
        .map(|text| PollOption { id: new_id(), text })
        .collect()
}

/// Stamp the timestamp belonging to the status being entered.
fn mark_entered(poll: &mut Poll, status: PollStatus, at: DateTime<Utc>) {
    match status {
        PollStatus::Active => poll.activated_at = Some(at),
        PollStatus::Completed => poll.completed_at = Some(at),
        PollStatus::Draft => {}
    }
}

/// Fields of an update request that passed validation.
#[derive(Debug, Default)]
struct PollChanges {
    question: Option<String>,
    options: Option<Vec<String>>,
    time_limit: Option<u32>,
    status: Option<PollStatus>,
}

impl PollChanges {
    fn from_request(request: &UpdatePollRequest) -> Result<Self, AppError> {
        Ok(Self {
            question: validate::optional(
                &request.question,
                validate::non_blank_text,
                INVALID_QUESTION,
            )?,
            options: validate::optional(&request.options, validate::option_texts, INVALID_OPTIONS)?,
            time_limit: validate::optional(
                &request.time_limit,
                validate::time_limit,
                INVALID_TIME_LIMIT,
            )?,
            status: validate::optional(&request.status, validate::status, INVALID_STATUS)?,
        })
    }

    fn apply(self, poll: &mut Poll) {
        if let Some(question) = self.question {
            poll.question = question;
        }
        if let Some(options) = self.options {
            poll.options = mint_options(options);
        }
        if let Some(time_limit) = self.time_limit {
            poll.time_limit = time_limit;
        }
        if let Some(status) = self.status {
            poll.status = status;
        }
    }
}

/// Owns poll creation and the draft → active → completed lifecycle.
#[derive(Clone)]
pub struct PollService {
    store: SharedStore,
    events: Dispatcher,
}

impl PollService {
    pub fn new(store: SharedStore, events: Dispatcher) -> Self {
        Self { store, events }
    }

    /// All polls in creation order.
    pub async fn list(&self) -> Vec<Poll> {
        self.store.lock().await.polls().to_vec()
    }

    pub async fn get(&self, id: &str) -> Result<Poll, AppError> {
        self.store
            .lock()
            .await
            .poll(id)
            .cloned()
            .ok_or_else(|| poll_not_found(id))
    }

    /// Create a poll, `draft` unless the request says otherwise.
    pub async fn create(&self, request: &CreatePollRequest) -> Result<Poll, AppError> {
        let question = validate::require(
            &request.question,
            validate::non_blank_text,
            QUESTION_REQUIRED,
        )?;
        let options = validate::require(&request.options, validate::option_texts, INVALID_OPTIONS)?;
        let time_limit = validate::require(
            &request.time_limit,
            validate::time_limit,
            INVALID_TIME_LIMIT,
        )?;
        let created_by = validate::require(
            &request.created_by,
            validate::identifier,
            CREATED_BY_REQUIRED,
        )?;
        let status = validate::optional(&request.status, validate::status, INVALID_STATUS)?
            .unwrap_or_default();

        let mut store = self.store.lock().await;

        if status == PollStatus::Active {
            if let Some(active) = store.active_poll() {
                tracing::warn!("Rejected active poll: {} is already active", active.id);
                return Err(AppError::Conflict(ALREADY_ACTIVE.to_string()));
            }
        }

        let now = Utc::now();
        let mut poll = Poll {
            id: new_id(),
            question,
            options: mint_options(options),
            created_by,
            time_limit,
            status,
            created_at: now,
            activated_at: None,
            completed_at: None,
        };
        mark_entered(&mut poll, status, now);

        store.insert_poll(poll.clone());
        drop(store);

        tracing::info!(
            "Poll {} created with {} options ({})",
            poll.id,
            poll.options.len(),
            poll.status
        );
        self.events.dispatch([Event::PollCreated(poll.clone())]);

        Ok(poll)
    }

    /// Apply a partial update. All present fields are validated before
    /// anything is written.
    pub async fn update(&self, id: &str, request: &UpdatePollRequest) -> Result<Poll, AppError> {
        let mut store = self.store.lock().await;

        let previous = store.poll(id).ok_or_else(|| poll_not_found(id))?.status;
        let changes = PollChanges::from_request(request)?;

        if changes.status == Some(PollStatus::Active) {
            if let Some(active) = store.active_poll().filter(|p| p.id != id) {
                tracing::warn!(
                    "Rejected activation of {}: {} is already active",
                    id,
                    active.id
                );
                return Err(AppError::Conflict(ALREADY_ACTIVE.to_string()));
            }
        }

        // Setting the current status again is not a transition
        let entered = changes.status.filter(|status| *status != previous);
        let now = Utc::now();

        let poll = store
            .update_poll(id, |poll| {
                changes.apply(poll);
                if let Some(status) = entered {
                    mark_entered(poll, status, now);
                }
            })
            .ok_or_else(|| poll_not_found(id))?;

        let event = match entered {
            Some(PollStatus::Active) => Some(Event::PollActivated(poll.clone())),
            Some(PollStatus::Completed) => {
                Some(Event::PollResults(results::poll_results(&store, &poll)))
            }
            _ => None,
        };
        drop(store);

        match entered {
            Some(status) => tracing::info!("Poll {} moved {} -> {}", poll.id, previous, status),
            None => tracing::info!("Poll {} updated", poll.id),
        }
        self.events.dispatch(event);

        Ok(poll)
    }

    /// Remove a poll. Responses recorded against it stay in the store.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let removed = self.store.lock().await.remove_poll(id);

        match removed {
            Some(poll) => {
                tracing::info!("Poll {} deleted", poll.id);
                Ok(())
            }
            None => {
                tracing::warn!("Poll {} not found for delete", id);
                Err(poll_not_found(id))
            }
        }
    }

    /// Current tally for a poll that still exists.
    pub async fn results(&self, id: &str) -> Result<PollResults, AppError> {
        let store = self.store.lock().await;
        let poll = store.poll(id).ok_or_else(|| poll_not_found(id))?;
        Ok(results::poll_results(&store, poll))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::notify::testing::{FailingNotifier, RecordingNotifier};
    use crate::store::{fixtures, Store};

    struct Harness {
        store: SharedStore,
        recorder: Arc<RecordingNotifier>,
        dispatcher: Dispatcher,
        service: PollService,
    }

    impl Harness {
        fn new() -> Self {
            let store = Store::shared();
            let recorder = Arc::new(RecordingNotifier::default());
            let dispatcher = Dispatcher::spawn(recorder.clone());
            let service = PollService::new(store.clone(), dispatcher.clone());
            Self {
                store,
                recorder,
                dispatcher,
                service,
            }
        }

        async fn event_names(&self) -> Vec<&'static str> {
            self.dispatcher.flush().await;
            self.recorder.names()
        }
    }

    fn create_request(status: Option<&str>) -> CreatePollRequest {
        CreatePollRequest {
            question: Some(json!("Which planet is largest?")),
            options: Some(json!(["Jupiter", "Mars"])),
            created_by: Some(json!("teacher-1")),
            time_limit: Some(json!(30)),
            status: status.map(|s| json!(s)),
        }
    }

    fn status_update(status: &str) -> UpdatePollRequest {
        UpdatePollRequest {
            status: Some(json!(status)),
            ..Default::default()
        }
    }

    async fn active_count(store: &SharedStore) -> usize {
        store
            .lock()
            .await
            .polls()
            .iter()
            .filter(|p| p.status == PollStatus::Active)
            .count()
    }

    #[tokio::test]
    async fn test_create_defaults_to_draft() {
        let h = Harness::new();

        let poll = h.service.create(&create_request(None)).await.unwrap();

        assert_eq!(poll.status, PollStatus::Draft);
        assert_eq!(poll.time_limit, 30);
        assert_eq!(poll.options.len(), 2);
        assert_ne!(poll.options[0].id, poll.options[1].id);
        assert!(poll.activated_at.is_none());
        assert_eq!(h.event_names().await, vec!["poll:created"]);
        assert_eq!(h.service.get(&poll.id).await.unwrap().question, poll.question);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let h = Harness::new();

        let cases: Vec<(&str, Value, &str)> = vec![
            ("question", json!("   "), QUESTION_REQUIRED),
            ("options", json!(["Only one"]), INVALID_OPTIONS),
            ("options", json!(["A", ""]), INVALID_OPTIONS),
            ("timeLimit", json!(0), INVALID_TIME_LIMIT),
            ("timeLimit", json!(61), INVALID_TIME_LIMIT),
            ("timeLimit", json!("30"), INVALID_TIME_LIMIT),
            ("createdBy", json!(""), CREATED_BY_REQUIRED),
            ("status", json!("paused"), INVALID_STATUS),
        ];

        for (field, value, message) in cases {
            let mut request = create_request(None);
            match field {
                "question" => request.question = Some(value),
                "options" => request.options = Some(value),
                "timeLimit" => request.time_limit = Some(value),
                "createdBy" => request.created_by = Some(value),
                _ => request.status = Some(value),
            }
            let err = h.service.create(&request).await.unwrap_err();
            assert_eq!(err, AppError::Validation(message.to_string()), "{}", field);
        }

        assert!(h.service.list().await.is_empty());
        assert!(h.event_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_structured_options() {
        let h = Harness::new();
        let mut request = create_request(None);
        request.options = Some(json!([{"id": "mine", "text": "A"}, "B"]));

        // Options must be plain strings
        assert!(h.service.create(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_activate_then_second_active_create_conflicts() {
        let h = Harness::new();
        let poll = h.service.create(&create_request(None)).await.unwrap();

        let active = h.service.update(&poll.id, &status_update("active")).await.unwrap();
        assert_eq!(active.status, PollStatus::Active);
        assert!(active.activated_at.is_some());

        let err = h
            .service
            .create(&create_request(Some("active")))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Conflict(ALREADY_ACTIVE.to_string()));

        // Drafts can still be prepared while another poll runs
        assert!(h.service.create(&create_request(None)).await.is_ok());

        assert_eq!(
            h.event_names().await,
            vec!["poll:created", "poll:activated", "poll:created"]
        );
    }

    #[tokio::test]
    async fn test_activating_second_poll_conflicts() {
        let h = Harness::new();
        let first = h.service.create(&create_request(Some("active"))).await.unwrap();
        let second = h.service.create(&create_request(None)).await.unwrap();

        let err = h
            .service
            .update(&second.id, &status_update("active"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(h.service.get(&second.id).await.unwrap().status, PollStatus::Draft);

        h.service.update(&first.id, &status_update("completed")).await.unwrap();
        let second = h.service.update(&second.id, &status_update("active")).await.unwrap();
        assert_eq!(second.status, PollStatus::Active);
        assert_eq!(active_count(&h.store).await, 1);
    }

    #[tokio::test]
    async fn test_single_active_poll_over_many_operations() {
        let h = Harness::new();
        let mut ids = Vec::new();
        for i in 0..4 {
            let status = if i % 2 == 0 { Some("active") } else { None };
            if let Ok(poll) = h.service.create(&create_request(status)).await {
                ids.push(poll.id);
            }
            assert!(active_count(&h.store).await <= 1);
        }

        let statuses = ["active", "draft", "completed", "active"];
        for round in 0..3 {
            for (i, id) in ids.iter().enumerate() {
                let status = statuses[(i + round) % statuses.len()];
                let _ = h.service.update(id, &status_update(status)).await;
                assert!(active_count(&h.store).await <= 1);
            }
        }
    }

    #[tokio::test]
    async fn test_self_transition_emits_nothing() {
        let h = Harness::new();
        let poll = h.service.create(&create_request(Some("active"))).await.unwrap();
        let activated_at = poll.activated_at;

        let again = h.service.update(&poll.id, &status_update("active")).await.unwrap();
        assert_eq!(again.status, PollStatus::Active);
        assert_eq!(again.activated_at, activated_at);

        h.service.update(&poll.id, &status_update("completed")).await.unwrap();
        h.service.update(&poll.id, &status_update("completed")).await.unwrap();

        assert_eq!(h.event_names().await, vec!["poll:created", "poll:results"]);
    }

    #[tokio::test]
    async fn test_completion_broadcasts_results() {
        let h = Harness::new();
        let poll = h.service.create(&create_request(Some("active"))).await.unwrap();
        let jupiter = poll.options[0].id.clone();
        {
            let mut store = h.store.lock().await;
            store.insert_response(fixtures::response(&poll.id, "s1", &jupiter));
            store.insert_response(fixtures::response(&poll.id, "s2", &jupiter));
        }

        let done = h.service.update(&poll.id, &status_update("completed")).await.unwrap();
        assert!(done.completed_at.is_some());

        h.dispatcher.flush().await;
        let events = h.recorder.events();
        let Some(Event::PollResults(results)) = events.last() else {
            panic!("expected poll:results, got {:?}", h.recorder.names());
        };
        assert_eq!(results.poll_id, poll.id);
        assert_eq!(results.results[0].count, 2);
        assert_eq!(results.results[1].count, 0);
    }

    #[tokio::test]
    async fn test_update_is_all_or_nothing() {
        let h = Harness::new();
        let poll = h.service.create(&create_request(None)).await.unwrap();

        let request = UpdatePollRequest {
            question: Some(json!("Changed?")),
            time_limit: Some(json!(120)),
            ..Default::default()
        };
        let err = h.service.update(&poll.id, &request).await.unwrap_err();

        assert_eq!(err, AppError::Validation(INVALID_TIME_LIMIT.to_string()));
        assert_eq!(h.service.get(&poll.id).await.unwrap().question, poll.question);
    }

    #[tokio::test]
    async fn test_update_rejects_null_fields() {
        let h = Harness::new();
        let poll = h.service.create(&create_request(None)).await.unwrap();
        let revision = h.store.lock().await.revision();

        for (body, message) in [
            (json!({ "question": null }), INVALID_QUESTION),
            (json!({ "options": null }), INVALID_OPTIONS),
            (json!({ "timeLimit": null }), INVALID_TIME_LIMIT),
            (json!({ "status": null }), INVALID_STATUS),
        ] {
            let request: UpdatePollRequest = serde_json::from_value(body).unwrap();
            let err = h.service.update(&poll.id, &request).await.unwrap_err();
            assert_eq!(err, AppError::Validation(message.to_string()));
        }

        let stored = h.service.get(&poll.id).await.unwrap();
        assert_eq!(stored.question, poll.question);
        assert_eq!(stored.status, PollStatus::Draft);
        assert_eq!(h.store.lock().await.revision(), revision);
        assert_eq!(h.event_names().await, vec!["poll:created"]);
    }

    #[tokio::test]
    async fn test_update_fields() {
        let h = Harness::new();
        let poll = h.service.create(&create_request(None)).await.unwrap();

        let request = UpdatePollRequest {
            question: Some(json!("Smallest planet?")),
            options: Some(json!(["Mercury", "Venus", "Earth"])),
            time_limit: Some(json!(45)),
            status: None,
        };
        let updated = h.service.update(&poll.id, &request).await.unwrap();

        assert_eq!(updated.question, "Smallest planet?");
        assert_eq!(updated.time_limit, 45);
        assert_eq!(updated.status, PollStatus::Draft);
        let texts: Vec<&str> = updated.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Mercury", "Venus", "Earth"]);
        assert!(updated
            .options
            .iter()
            .all(|o| poll.options.iter().all(|old| old.id != o.id)));
    }

    #[tokio::test]
    async fn test_replaced_options_drop_old_responses_from_results() {
        let h = Harness::new();
        let poll = h.service.create(&create_request(Some("active"))).await.unwrap();
        let old = poll.options[0].id.clone();
        h.store
            .lock()
            .await
            .insert_response(fixtures::response(&poll.id, "s1", &old));

        let request = UpdatePollRequest {
            options: Some(json!(["Jupiter", "Mars"])),
            ..Default::default()
        };
        h.service.update(&poll.id, &request).await.unwrap();

        let results = h.service.results(&poll.id).await.unwrap();
        assert!(results.results.iter().all(|r| r.count == 0));
        assert!(results.results.iter().all(|r| r.option_id != old));
    }

    #[tokio::test]
    async fn test_missing_poll() {
        let h = Harness::new();

        assert!(matches!(h.service.get("nope").await, Err(AppError::NotFound(_))));
        assert!(matches!(
            h.service.update("nope", &status_update("active")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(h.service.delete("nope").await, Err(AppError::NotFound(_))));
        assert!(matches!(h.service.results("nope").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_frees_active_slot() {
        let h = Harness::new();
        let poll = h.service.create(&create_request(Some("active"))).await.unwrap();

        h.service.delete(&poll.id).await.unwrap();

        assert!(h.service.list().await.is_empty());
        assert!(matches!(h.service.results(&poll.id).await, Err(AppError::NotFound(_))));
        assert!(h.service.create(&create_request(Some("active"))).await.is_ok());
    }

    #[tokio::test]
    async fn test_notifier_failure_keeps_state() {
        let store = Store::shared();
        let dispatcher = Dispatcher::spawn(Arc::new(FailingNotifier));
        let service = PollService::new(store.clone(), dispatcher.clone());

        let poll = service.create(&create_request(None)).await.unwrap();
        let active = service.update(&poll.id, &status_update("active")).await.unwrap();
        dispatcher.flush().await;

        assert_eq!(active.status, PollStatus::Active);
        assert_eq!(service.get(&poll.id).await.unwrap().status, PollStatus::Active);
    }

    #[tokio::test]
    async fn test_default_dispatcher_is_silent() {
        let service = PollService::new(Store::shared(), Dispatcher::default());
        let poll = service.create(&create_request(Some("active"))).await.unwrap();
        assert!(service.update(&poll.id, &status_update("completed")).await.is_ok());
    }
}
