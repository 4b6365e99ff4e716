//! The HTTP surface: routes, shared state and the server loop.

pub mod handlers;
pub mod render;

use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::startup::Artifacts;

/// Interface the app binds by default: loopback only.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the form has always been reached at.
pub const DEFAULT_PORT: u16 = 8501;

/// Builds the application router over the shared artifacts.
pub fn router(artifacts: Arc<Artifacts>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict_form))
        .route("/api/predict", post(handlers::predict_api))
        .route("/health", get(handlers::health))
        .with_state(artifacts)
}

/// Binds the listener and serves requests until the process is stopped.
pub async fn serve(artifacts: Arc<Artifacts>, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = router(artifacts);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{addr}");
    axum::serve(listener, app).await
}
