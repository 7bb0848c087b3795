use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use depot_ingest::MandatoryPolicy;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Default request body cap: 5 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root of the blob store (`games/`, `client/`, `.staging/`).
    pub storage_root: PathBuf,
    /// Catalog document. Defaults to `{storage_root}/catalog.json`.
    pub catalog_path: Option<PathBuf>,
    /// Externally reachable base URL, used to build download links.
    pub public_url: String,
    pub max_upload_bytes: u64,
    pub allow_anonymous_read: bool,
    pub mandatory_policy: MandatoryPolicy,
    /// Bearer tokens. With none configured, every request is allowed.
    pub tokens: Vec<TokenConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            storage_root: PathBuf::from("depot-data"),
            catalog_path: None,
            public_url: "http://127.0.0.1:8080".into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allow_anonymous_read: true,
            mandatory_policy: MandatoryPolicy::default(),
            tokens: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub token: String,
    #[serde(default)]
    pub admin: bool,
}

impl ServerConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.storage_root.as_os_str().is_empty() {
            return Err(ServerError::Config("storage_root must not be empty".into()));
        }
        if !(self.public_url.starts_with("http://") || self.public_url.starts_with("https://")) {
            return Err(ServerError::Config(format!(
                "public_url must be an http(s) URL, got {:?}",
                self.public_url
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(ServerError::Config("max_upload_bytes must be positive".into()));
        }
        if let Some(t) = self.tokens.iter().find(|t| t.token.is_empty()) {
            return Err(ServerError::Config(format!("token {:?} is empty", t.name)));
        }
        Ok(())
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| self.storage_root.join("catalog.json"))
    }

    /// Absolute download URL of a release.
    pub fn release_download_url(&self, version: &str) -> String {
        format!(
            "{}/v1/releases/{}/download",
            self.public_url.trim_end_matches('/'),
            version
        )
    }
}
