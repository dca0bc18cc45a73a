//! Best-effort push notifications.
//!
//! Services hand events to a [`Dispatcher`], which delivers them to a
//! [`Notifier`] on a background task in the order they were queued. Delivery
//! failures are logged and dropped; they never reach the caller that
//! triggered the event.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::models::{ChatMessage, Poll, PollResponse, PollResults};

/// Events pushed to connected clients.
///
/// Serializes as `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Event {
    #[serde(rename = "poll:created")]
    PollCreated(Poll),
    #[serde(rename = "poll:activated")]
    PollActivated(Poll),
    #[serde(rename = "poll:response")]
    PollResponse(PollResponse),
    #[serde(rename = "poll:results")]
    PollResults(PollResults),
    #[serde(rename = "chat:newMessage")]
    ChatMessage(ChatMessage),
    /// Client-originated chat frame relayed verbatim to the other clients.
    #[serde(rename = "chat-message")]
    ChatRelay(serde_json::Value),
}

impl Event {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Event::PollCreated(_) => "poll:created",
            Event::PollActivated(_) => "poll:activated",
            Event::PollResponse(_) => "poll:response",
            Event::PollResults(_) => "poll:results",
            Event::ChatMessage(_) => "chat:newMessage",
            Event::ChatRelay(_) => "chat-message",
        }
    }
}

/// Delivery failure reported by a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The delivery channel is gone.
    Closed,
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Closed => write!(f, "notification channel closed"),
        }
    }
}

impl std::error::Error for NotifyError {}

/// Something that can push an event to every connected observer.
pub trait Notifier: Send + Sync {
    fn emit(&self, event: &Event) -> Result<(), NotifyError>;
}

/// Drops every event. Used until a real channel is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn emit(&self, event: &Event) -> Result<(), NotifyError> {
        tracing::trace!("Dropping {} (no notifier attached)", event.name());
        Ok(())
    }
}

/// An event tagged with the connection it came from, if any.
#[derive(Debug, Clone)]
pub struct Broadcast {
    /// Connection that must not receive its own frame back
    pub origin: Option<String>,
    pub event: Event,
}

/// Fans events out to every WebSocket subscriber.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Broadcast>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.tx.subscribe()
    }

    /// Relay a client frame to every connection except `origin`.
    pub fn relay(&self, origin: &str, event: Event) {
        self.send(Broadcast {
            origin: Some(origin.to_string()),
            event,
        });
    }

    fn send(&self, broadcast: Broadcast) {
        let name = broadcast.event.name();
        match self.tx.send(broadcast) {
            Ok(receivers) => tracing::debug!("Broadcast {} to {} subscriber(s)", name, receivers),
            // No subscribers yet; nothing to deliver
            Err(_) => tracing::debug!("No subscribers for {}", name),
        }
    }
}

impl Notifier for BroadcastNotifier {
    fn emit(&self, event: &Event) -> Result<(), NotifyError> {
        self.send(Broadcast {
            origin: None,
            event: event.clone(),
        });
        Ok(())
    }
}

enum Job {
    Emit(Event),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
enum Route {
    /// Deliver on the caller's task
    Inline(Arc<dyn Notifier>),
    /// Hand off to the worker task
    Queued(mpsc::UnboundedSender<Job>),
}

/// Queues events for ordered, deferred delivery.
///
/// The default dispatcher delivers inline to a [`NoopNotifier`].
#[derive(Clone)]
pub struct Dispatcher {
    route: Route,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            route: Route::Inline(Arc::new(NoopNotifier)),
        }
    }
}

impl Dispatcher {
    /// Start a worker task that feeds queued events to `notifier`.
    pub fn spawn(notifier: Arc<dyn Notifier>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::Emit(event) => deliver(notifier.as_ref(), &event),
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self {
            route: Route::Queued(tx),
        }
    }

    /// Queue events; they are delivered after the caller moves on.
    pub fn dispatch(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            match &self.route {
                Route::Inline(notifier) => deliver(notifier.as_ref(), &event),
                Route::Queued(tx) => {
                    let name = event.name();
                    if tx.send(Job::Emit(event)).is_err() {
                        tracing::warn!("Failed to emit {}: {}", name, NotifyError::Closed);
                    }
                }
            }
        }
    }

    /// Wait until everything queued so far has been handed to the notifier.
    pub async fn flush(&self) {
        let Route::Queued(tx) = &self.route else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if tx.send(Job::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

fn deliver(notifier: &dyn Notifier, event: &Event) {
    if let Err(e) = notifier.emit(event) {
        tracing::warn!("Failed to emit {}: {}", event.name(), e);
    }
}
