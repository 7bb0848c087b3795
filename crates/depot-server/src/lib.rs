//! HTTP server for the depot update server.
//!
//! Exposes game-file uploads and manifests, client release publishing and
//! downloads, and the client update check over a small JSON/REST API.
//! Request bodies are streamed straight into the ingestion engine.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{Action, AllowAllAuth, AuthProvider, Credentials, Identity, StaticTokenAuth};
pub use config::{ServerConfig, TokenConfig};
pub use error::{ServerError, ServerResult};
pub use server::DepotServer;
pub use state::{open_storage, AppState};
