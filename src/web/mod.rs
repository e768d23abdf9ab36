//! Read-only status API.

mod handlers;

use crate::db::Store;

use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
}

/// Status API server for Upwatch.
pub struct Server {
    port: u16,
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(port: u16, store: Arc<Store>) -> Self {
        Self {
            port,
            state: AppState { store },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            .route("/healthz", get(handlers::handle_healthz))
            .route("/api/endpoints", get(handlers::handle_get_endpoints))
            .route("/api/endpoints/{id}", get(handlers::handle_get_endpoint))
            .route("/api/endpoints/{id}/checks", get(handlers::handle_get_checks))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = self.routes();

        tracing::info!("Status API listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
