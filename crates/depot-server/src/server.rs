use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Depot update server.
pub struct DepotServer {
    state: Arc<AppState>,
}

impl DepotServer {
    /// Validate `config` and open storage. Fails before anything is served.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        Ok(Self::from_state(AppState::open(config)?))
    }

    pub fn from_state(state: AppState) -> Self {
        Self { state: Arc::new(state) }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.state))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let addr = self.state.config.bind_addr;
        let app = self.router();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            %addr,
            root = %self.state.config.storage_root.display(),
            "depot server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
