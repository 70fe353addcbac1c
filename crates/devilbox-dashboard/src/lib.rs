//! devilbox-dashboard: HTTP view of a Devilbox health pass.
//!
//! Every request runs a fresh pass; nothing is cached between requests.
//!
//! # Routes
//!
//! | Route | Handler |
//! |---|---|
//! | `/` | Plain-text probe lines and score |
//! | `/api/health` | Health report JSON |
//! | `/api/services` | Auxiliary service liveness, keyed by service |

pub mod pages;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use devilbox_core::DevilboxConfig;

/// Shared state for dashboard handlers.
#[derive(Clone)]
pub struct DashboardState {
    pub config: Arc<DevilboxConfig>,
}

impl DashboardState {
    pub fn new(config: DevilboxConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Build the dashboard router.
pub fn dashboard_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(pages::overview))
        .route("/api/health", get(pages::health))
        .route("/api/services", get(pages::services))
        .with_state(state)
}

/// Bind `addr` and serve the dashboard until the process exits.
pub async fn serve(state: DashboardState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "dashboard listening");
    axum::serve(listener, dashboard_router(state)).await
}
