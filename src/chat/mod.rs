//! Append-only classroom chat.

use chrono::Utc;

use crate::errors::AppError;
use crate::ids::new_id;
use crate::models::{ChatMessage, PostMessageRequest};
use crate::notify::{Dispatcher, Event};
use crate::store::SharedStore;
use crate::validate;

#[derive(Clone)]
pub struct ChatService {
    store: SharedStore,
    events: Dispatcher,
}

impl ChatService {
    pub fn new(store: SharedStore, events: Dispatcher) -> Self {
        Self { store, events }
    }

    /// Append a message and broadcast it as `chat:newMessage`.
    pub async fn post(&self, request: &PostMessageRequest) -> Result<ChatMessage, AppError> {
        let missing = || AppError::Validation("Missing required fields".to_string());

        let user_id = validate::identifier(request.user_id.as_ref()).ok_or_else(missing)?;
        let user_name = validate::non_blank_text(request.user_name.as_ref()).ok_or_else(missing)?;
        let message = validate::non_blank_text(request.message.as_ref()).ok_or_else(missing)?;

        let message = ChatMessage {
            id: new_id(),
            user_id,
            user_name,
            message,
            timestamp: Utc::now().to_rfc3339(),
        };

        self.store.lock().await.insert_message(message.clone());
        tracing::debug!("Chat message {} from {}", message.id, message.user_name);
        self.events.dispatch([Event::ChatMessage(message.clone())]);

        Ok(message)
    }

    /// All messages in posting order.
    pub async fn list(&self) -> Vec<ChatMessage> {
        self.store.lock().await.messages().to_vec()
    }
}
