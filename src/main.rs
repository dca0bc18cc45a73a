//! Classroom Poll Backend
//!
//! Real-time classroom polling: teachers run polls, students answer once each,
//! and every connected client follows along over a WebSocket push channel.

mod api;
mod chat;
mod config;
mod errors;
mod ids;
mod models;
mod notify;
mod polls;
mod realtime;
mod roster;
mod store;
mod validate;

use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chat::ChatService;
use config::Config;
use errors::{AppError, AppErrorWithRevision};
use notify::{BroadcastNotifier, Dispatcher};
use polls::{PollService, ResponseCollector};
use roster::RosterService;
use store::{SharedStore, Store};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub polls: PollService,
    pub responses: ResponseCollector,
    pub roster: RosterService,
    pub chat: ChatService,
    pub broadcaster: Arc<BroadcastNotifier>,
    pub events: Dispatcher,
}

impl AppState {
    /// Wire a fresh store and broadcast channel into every service.
    ///
    /// Must be called from within a tokio runtime: the event dispatcher
    /// spawns its worker task here.
    pub fn new(config: Config) -> Self {
        let store = Store::shared();
        let broadcaster = Arc::new(BroadcastNotifier::new(config.event_capacity));
        let events = Dispatcher::spawn(broadcaster.clone());

        Self {
            polls: PollService::new(store.clone(), events.clone()),
            responses: ResponseCollector::new(store.clone(), events.clone()),
            roster: RosterService::new(store.clone()),
            chat: ChatService::new(store.clone(), events.clone()),
            store,
            broadcaster,
            events,
        }
    }

    /// Current store revision, echoed in every response envelope.
    pub async fn revision(&self) -> i64 {
        self.store.lock().await.revision()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Classroom Poll Backend");
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Event buffer capacity: {}", config.event_capacity);

    let bind_addr = config.bind_addr;
    let state = AppState::new(config);
    let events = state.events.clone();

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Deliver whatever is still queued before the process exits
    events.flush().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Session
        .route("/session/register", post(api::register_student))
        .route("/session/teacher", post(api::register_teacher))
        // Roster
        .route("/students", get(api::list_users))
        .route("/students/{id}", delete(api::remove_student))
        // Polls
        .route("/polls", get(api::list_polls).post(api::create_poll))
        .route(
            "/polls/{id}",
            get(api::get_poll)
                .put(api::update_poll)
                .delete(api::delete_poll),
        )
        .route("/polls/{id}/results", get(api::get_results))
        // Responses
        .route(
            "/polls/{id}/responses",
            get(api::list_responses).post(api::submit_response),
        )
        // Chat
        .route("/chat", get(api::list_messages).post(api::post_message));

    // Health check and push channel
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(realtime::ws_handler));

    Router::new()
        .nest("/api", api_routes)
        .merge(root_routes)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Turn a handler panic into an `INTERNAL_ERROR` envelope.
fn handle_panic(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);

    AppErrorWithRevision {
        error: AppError::Internal("Internal server error".to_string()),
        revision_id: 0,
    }
    .into_response()
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
