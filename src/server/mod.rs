//! HTTP API
//!
//! An axum router over [`SessionService`]. Every route except `/` and
//! `/health` requires a bearer token.

pub mod auth;
mod handlers;
pub mod responses;

use crate::config::{Config, ServerConfig};
use crate::error::{Result, SeoAssistantError};
use crate::identity::{IdentityVerifier, JwtVerifier};
use crate::service::SessionService;
use axum::routing::{get, patch, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use responses::ApiError;

/// Process-wide components shared by all requests
pub struct AppState {
    /// Session and job operations
    pub service: SessionService,
    /// Bearer token verifier
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    /// Create the state
    pub fn new(service: SessionService, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { service, verifier }
    }

    /// Build the state described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let service = SessionService::from_config(config)?;
        let verifier: Arc<dyn IdentityVerifier> = Arc::new(JwtVerifier::from_config(&config.auth)?);
        Ok(Self::new(service, verifier))
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::info))
        .route("/health", get(handlers::health))
        .route(
            "/sessions",
            post(handlers::create_session).get(handlers::list_sessions),
        )
        .route("/sessions/async", post(handlers::create_session_async))
        .route(
            "/sessions/:id",
            patch(handlers::update_session).delete(handlers::delete_session),
        )
        .route(
            "/sessions/:id/messages",
            get(handlers::list_messages).post(handlers::add_message),
        )
        .route(
            "/sessions/:id/messages/async",
            post(handlers::add_message_async),
        )
        .route("/jobs/:id/status", get(handlers::job_status))
        .with_state(state)
}

/// Apply a `host:port` or bare `port` bind override
pub fn apply_bind_override(server: &mut ServerConfig, bind: &str) -> Result<()> {
    if let Some((host, port)) = bind.rsplit_once(':') {
        if host.is_empty() {
            return Err(SeoAssistantError::Config(format!("Invalid bind address: {}", bind)).into());
        }
        server.host = host.to_string();
        server.port = parse_port(port)?;
        return Ok(());
    }

    server.port = parse_port(bind)?;
    Ok(())
}

fn parse_port(port: &str) -> Result<u16> {
    port.parse()
        .map_err(|_| SeoAssistantError::Config(format!("Invalid port: {}", port)).into())
}

/// Bind and serve until the process is stopped
pub async fn serve(state: Arc<AppState>, server: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", server.host, server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
