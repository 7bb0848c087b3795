use std::sync::Arc;

use depot_catalog::JsonFileCatalog;
use depot_ingest::{IngestionEngine, VersionRegistry};
use depot_store::FsBlobStore;

use crate::auth::{AllowAllAuth, AuthProvider, StaticTokenAuth};
use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Everything a request handler needs, shared behind an `Arc`.
pub struct AppState {
    pub config: ServerConfig,
    pub engine: Arc<IngestionEngine>,
    pub registry: Arc<VersionRegistry>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        engine: Arc<IngestionEngine>,
        registry: Arc<VersionRegistry>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self { config, engine, registry, auth }
    }

    /// Open the filesystem store and JSON catalog named by `config`.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let (engine, registry) = open_storage(&config)?;
        let auth = auth_provider(&config);
        Ok(Self::new(config, Arc::new(engine), Arc::new(registry), auth))
    }
}

/// Validate `config`, then open the filesystem store and JSON catalog it
/// names and build the engine and registry over them.
pub fn open_storage(config: &ServerConfig) -> ServerResult<(IngestionEngine, VersionRegistry)> {
    config.validate()?;
    let store = Arc::new(FsBlobStore::open(&config.storage_root)?);
    let catalog = Arc::new(JsonFileCatalog::open(config.catalog_path())?);

    let engine = IngestionEngine::new(store.clone(), catalog.clone());
    let registry = VersionRegistry::new(store, catalog).with_policy(config.mandatory_policy);
    Ok((engine, registry))
}

/// Static tokens if any are configured, otherwise allow everything.
pub fn auth_provider(config: &ServerConfig) -> Arc<dyn AuthProvider> {
    if config.tokens.is_empty() {
        tracing::warn!("no tokens configured; all requests are allowed");
        Arc::new(AllowAllAuth)
    } else {
        Arc::new(StaticTokenAuth::new(
            config.tokens.clone(),
            config.allow_anonymous_read,
        ))
    }
}
