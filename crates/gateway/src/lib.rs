//! HTTP gateway for Sera.
//!
//! Routes:
//! - `POST /chat`: run one exchange for the caller's session
//! - `POST /reset`: clear the caller's session
//! - `GET /health`: liveness, backend reachability and session count
//!
//! Sessions are tracked with an HTTP-only cookie, so browsers calling from
//! another origin must send credentials; CORS is configured accordingly.

pub mod chat;
pub mod error;
pub mod identity;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, Method, header};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use sera_config::AppConfig;
use sera_conversation::ConversationOrchestrator;

pub use error::{ApiError, ErrorResponse};
pub use identity::CookieSettings;

/// Shared state behind every handler.
pub struct GatewayState {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub cookie: CookieSettings,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(orchestrator: Arc<ConversationOrchestrator>, config: &AppConfig) -> Self {
        Self {
            orchestrator,
            cookie: CookieSettings {
                name: config.gateway.cookie_name.clone(),
                secure: config.gateway.cookie_secure,
            },
        }
    }
}

/// Build the router with CORS, body limit and request tracing applied.
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat::chat_handler))
        .route("/reset", post(chat::reset_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors_layer(cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Credentialed CORS for the configured origins. Unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Builds the backend, token counter and session store from `config` once
/// and shares them across all requests.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = sera_providers::build_from_config(&config)?;
    let token_counter = sera_providers::build_token_counter(&config)?;
    let store = sera_sessions::open(&config.sessions);

    info!(
        provider = provider.name(),
        tokenizer = token_counter.name(),
        store = store.name(),
        max_tokens_limit = config.max_tokens_limit,
        "Conversation pipeline ready"
    );

    let orchestrator = Arc::new(ConversationOrchestrator::from_config(
        &config,
        provider,
        token_counter,
        store,
    ));
    let state = Arc::new(GatewayState::new(orchestrator, &config));
    let app = build_router(state, &config.gateway.cors_origins);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    provider: String,
    backend_reachable: bool,
    sessions: usize,
}

const BACKEND_CHECK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Ask the backend whether it is up. Errors and slow answers count as down.
async fn backend_reachable(provider: &dyn sera_core::Provider) -> bool {
    match tokio::time::timeout(BACKEND_CHECK_TIMEOUT, provider.health_check()).await {
        Ok(Ok(up)) => up,
        Ok(Err(e)) => {
            warn!(provider = provider.name(), error = %e, "Backend health check failed");
            false
        }
        Err(_) => {
            warn!(provider = provider.name(), "Backend health check timed out");
            false
        }
    }
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let sessions = match state.orchestrator.store().count().await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Session count unavailable");
            0
        }
    };
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.orchestrator.provider().name().to_string(),
        backend_reachable: backend_reachable(state.orchestrator.provider().as_ref()).await,
        sessions,
    })
}
