use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use tutoria_shared::protocol::{ContactsResponse, InitializeRequest, InitializeResponse};
use tutoria_shared::types::UserId;
use tutoria_store::Database;

use crate::config::ServerConfig;
use crate::directory::ContactDirectory;
use crate::error::ServerError;
use crate::history::HistoryStore;
use crate::presence::PresenceRegistry;
use crate::resolver::ConversationResolver;
use crate::router::MessageRouter;
use crate::ws;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub history: HistoryStore,
    pub presence: Arc<PresenceRegistry>,
    pub resolver: Arc<ConversationResolver>,
    pub router: Arc<MessageRouter>,
    pub directory: Arc<ContactDirectory>,
}

/// Wire the chat subsystems together around an open database.
pub fn build_state(config: ServerConfig, db: Database) -> AppState {
    let history = HistoryStore::new(db, config.store_timeout);
    let presence = Arc::new(PresenceRegistry::new());

    AppState {
        config: Arc::new(config),
        history: history.clone(),
        presence: presence.clone(),
        resolver: Arc::new(ConversationResolver::new(history.clone())),
        router: Arc::new(MessageRouter::new(history.clone(), presence)),
        directory: Arc::new(ContactDirectory::new(history)),
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/conversations/initialize", post(conversation_initialize))
        .route("/contacts/{user_id}", get(contacts))
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    online_users: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        online_users: state.presence.online_count(),
    })
}

/// `POST /conversations/initialize` -- resolve (creating if absent) the
/// conversation for the given pair and return its id plus ordered history.
async fn conversation_initialize(
    State(state): State<AppState>,
    Json(request): Json<InitializeRequest>,
) -> Result<Json<InitializeResponse>, ServerError> {
    let response = state
        .resolver
        .initialize(&request.user_id, &request.partner_id)
        .await?;
    Ok(Json(response))
}

/// `GET /contacts/{user_id}` -- role-filtered list of eligible chat partners.
async fn contacts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ContactsResponse>, ServerError> {
    let contacts = state.directory.list(&UserId::new(user_id)).await?;
    Ok(Json(ContactsResponse { contacts }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting chat server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
