//! Automation API
//!
//! Create, update, delete, trigger and inspect host automations through
//! three entry layers that share one [`AutomationApi`] facade:
//!
//! - HTTP routes under `/api/automation_api/` (API key in `X-API-KEY`)
//! - a WebSocket command channel at `/api/automation_api/websocket`
//! - services in the `automation_api` domain of a [`ServiceRegistry`]
//!
//! Persistence goes through `automation-store`; reloads, triggers, live
//! states and registries go through the `automation-host` seam.

pub mod activity_log;
pub mod api;
pub mod auth;
pub mod entry;
mod error;
mod http;
pub mod services;
pub mod websocket;

pub use activity_log::{ActivityLog, LogLevel, DEFAULT_LOG_FILE};
pub use api::{
    AreaSummary, AutomationApi, AutomationSummary, EntityFilter, EntitySummary, RecordRef,
    RecordResponse, ReloadScope, TriggerResponse, TriggerTarget,
};
pub use entry::{ensure_entry, ConfigEntry};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use websocket::CommandTable;

use std::sync::Arc;

use automation_host::ServiceRegistry;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Domain of the plugin's services, commands and storage keys
pub const DOMAIN: &str = "automation_api";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<AutomationApi>,
    /// Service-call layer, also reachable through the `call_service` command
    pub services: Arc<ServiceRegistry>,
    /// Push-channel commands, built once
    pub commands: Arc<CommandTable>,
    /// Config entry holding the API key; without one every request is rejected
    pub entry: Option<Arc<ConfigEntry>>,
}

impl AppState {
    /// Build the state and register the plugin's services
    pub fn new(api: Arc<AutomationApi>, entry: Option<ConfigEntry>) -> Self {
        let services = Arc::new(ServiceRegistry::new());
        services::register_services(&services, Arc::clone(&api));

        Self {
            api,
            services,
            commands: Arc::new(CommandTable::standard()),
            entry: entry.map(Arc::new),
        }
    }

    /// Key callers must present
    pub fn api_key(&self) -> Option<&str> {
        self.entry.as_deref().map(ConfigEntry::api_key)
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let http_routes = Router::new()
        .route(
            "/automations",
            get(http::list_automations)
                .post(http::create_automation)
                .delete(http::delete_automation),
        )
        .route("/trigger", post(http::trigger_automation))
        .route("/areas", get(http::list_areas))
        .route("/entities", get(http::list_entities))
        .route("/automations_yaml", get(http::list_definitions))
        .route("/log", get(http::read_log))
        .fallback(http::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    let ws_routes = Router::new().route("/websocket", get(websocket::ws_handler));

    Router::new()
        .nest("/api/automation_api", ws_routes.merge(http_routes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn start_server<F>(state: AppState, addr: &str, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("Automation API listening on {}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
