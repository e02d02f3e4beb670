// rest_api/src/lib.rs
// axum surface of the clinic service.

use std::net::SocketAddr;

use anyhow::{Context, Error as AnyhowError};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use lib::config::{ClinicConfig, ServerConfig};
use lib::ClinicServices;
use security::{Claims, Role, TokenIssuer};

pub mod errors;
mod handlers;

pub use errors::{ApiError, ApiResult};

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    pub services: ClinicServices,
    pub tokens: TokenIssuer,
    pub require_staff_token: bool,
}

impl AppState {
    pub fn new(config: &ClinicConfig, services: ClinicServices) -> Self {
        Self {
            services,
            tokens: TokenIssuer::new(&config.auth.jwt_secret, config.auth.token_ttl_hours),
            require_staff_token: config.auth.require_staff_token,
        }
    }
}

/// Guard for staff-only handlers. Carries the staff claims when tokens are
/// enforced, `None` otherwise.
pub struct StaffSession(pub Option<Claims>);

#[async_trait]
impl FromRequestParts<AppState> for StaffSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !state.require_staff_token {
            return Ok(StaffSession(None));
        }
        let header = parts.headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
        let claims = state.tokens.authorize(header, Role::Staff).map_err(|e| {
            warn!("Rejected staff request to {}: {}", parts.uri.path(), e);
            e
        })?;
        Ok(StaffSession(Some(claims)))
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Every route of the service, without CORS.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::system::banner))
        .route("/api/health", get(handlers::system::health))
        .route(
            "/api/appointments",
            get(handlers::appointments::list).post(handlers::appointments::book),
        )
        .route("/api/appointments/slots", get(handlers::appointments::available_slots))
        .route(
            "/api/appointments/:id",
            get(handlers::appointments::fetch)
                .patch(handlers::appointments::update)
                .delete(handlers::appointments::cancel),
        )
        .route("/api/appointments/:id/accept", put(handlers::appointments::accept))
        .route("/api/appointments/:id/complete", put(handlers::appointments::complete))
        .route("/api/appointments/:id/link-prescription", put(handlers::appointments::link_prescription))
        .route("/api/prescriptions/generate", post(handlers::prescriptions::generate))
        .route("/api/prescriptions/appointment/:appointment_id", get(handlers::prescriptions::for_appointment))
        .route("/api/prescriptions/patient/:patient_id", get(handlers::prescriptions::for_patient))
        .route("/api/dashboard/revenue-stats", get(handlers::dashboard::revenue_stats))
        .route("/api/dashboard/visit-stats", get(handlers::dashboard::visit_stats))
        .route("/api/dashboard/patient-stats", get(handlers::dashboard::patient_stats))
        .route("/api/patient-visits", get(handlers::visits::list))
        .route("/api/auth/register", post(handlers::accounts::register))
        .route("/api/auth/login", post(handlers::accounts::login))
        .route("/api/auth/staff-login", post(handlers::accounts::staff_login))
        .fallback(handlers::system::route_not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves until `shutdown_rx` fires or the process receives Ctrl-C, then
/// flushes the store.
pub async fn start_server(config: ClinicConfig, shutdown_rx: oneshot::Receiver<()>) -> Result<(), AnyhowError> {
    let services = ClinicServices::from_config(&config).context("Failed to initialise clinic services")?;
    let storage = services.storage.clone();
    let app = build_router(AppState::new(&config, services)).layer(cors_layer(&config.server));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;

    let shutdown_signal = async {
        tokio::select! {
            _ = shutdown_rx => {
                info!("Received external shutdown signal.");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down.");
            }
        }
    };

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;
    info!("Clinic API listening on {} (storage: {})", addr, storage.get_type());

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Clinic API server failed")?;

    storage.flush().await.context("Failed to flush storage on shutdown")?;
    info!("Clinic API stopped.");
    Ok(())
}
