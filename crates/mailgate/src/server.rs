//! HTTP server wiring.

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{health_handler, send_email_handler};
use crate::sender::SendEmail;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Sender used for every request.
    pub sender: Arc<dyn SendEmail>,
}

impl AppState {
    #[must_use]
    pub fn new(sender: Arc<dyn SendEmail>) -> Self {
        Self { sender }
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/email", post(send_email_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

/// Serve `state` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn run_server<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Mail gateway listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Mail gateway stopped");
    Ok(())
}
