pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use crate::http::routes::create_router;
use crate::http::state::AppState;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Serve the control plane on localhost until `shutdown` resolves
pub async fn serve(
    state: Arc<AppState>,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let app = create_router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP API listening on {}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}
