use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::config::TokenConfig;
use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub is_admin: bool,
    pub is_anonymous: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self { name: "anonymous".into(), is_admin: false, is_anonymous: true }
    }
    pub fn user(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_admin: false, is_anonymous: false }
    }
    pub fn admin(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_admin: true, is_anonymous: false }
    }
}

#[derive(Clone, Debug)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read `Authorization: Bearer <token>`. Anything else is anonymous.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .map(|token| Credentials::Bearer(token.to_string()))
            .unwrap_or(Credentials::Anonymous)
    }
}

#[derive(Clone, Debug)]
pub enum Action {
    /// Fetch manifests, files, releases, or update info.
    Read { resource: String },
    /// Upload game files, publish releases, or edit release notes.
    Write { resource: String },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { resource } => write!(f, "read:{resource}"),
            Self::Write { resource } => write!(f, "write:{resource}"),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool>;
}

/// Accepts everyone for everything. Development only.
pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => {
                let prefix: String = token.chars().take(8).collect();
                Ok(Identity::user(format!("bearer:{prefix}")))
            }
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }

    async fn authorize(&self, _identity: &Identity, _action: &Action) -> ServerResult<bool> {
        Ok(true)
    }
}

/// Fixed set of bearer tokens from configuration. Writes need an admin
/// token; reads need any token unless anonymous reads are allowed.
pub struct StaticTokenAuth {
    tokens: Vec<TokenConfig>,
    allow_anonymous_read: bool,
}

impl StaticTokenAuth {
    pub fn new(tokens: Vec<TokenConfig>, allow_anonymous_read: bool) -> Self {
        Self { tokens, allow_anonymous_read }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Anonymous => Ok(Identity::anonymous()),
            Credentials::Bearer(token) => self
                .tokens
                .iter()
                .find(|t| token_matches(token, &t.token))
                .map(|t| {
                    if t.admin {
                        Identity::admin(&t.name)
                    } else {
                        Identity::user(&t.name)
                    }
                })
                .ok_or_else(|| ServerError::AuthFailed("unknown token".into())),
        }
    }

    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool> {
        Ok(match action {
            Action::Read { .. } => !identity.is_anonymous || self.allow_anonymous_read,
            Action::Write { .. } => identity.is_admin,
        })
    }
}

/// Authenticate the caller and check `action`, mapping a refusal to 401 for
/// anonymous callers and 403 otherwise.
pub async fn require(
    provider: &dyn AuthProvider,
    headers: &HeaderMap,
    action: Action,
) -> ServerResult<Identity> {
    let identity = provider.authenticate(&Credentials::from_headers(headers)).await?;
    if provider.authorize(&identity, &action).await? {
        return Ok(identity);
    }
    if identity.is_anonymous {
        Err(ServerError::AuthFailed(format!("{action} requires a token")))
    } else {
        tracing::warn!(identity = %identity.name, %action, "request denied");
        Err(ServerError::AuthorizationDenied { action: action.to_string() })
    }
}

/// Compare a presented token with a configured one in constant time.
fn token_matches(provided: &str, expected: &str) -> bool {
    let (provided, expected) = (provided.as_bytes(), expected.as_bytes());
    if provided.len() != expected.len() {
        return false;
    }
    provided.ct_eq(expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> StaticTokenAuth {
        StaticTokenAuth::new(
            vec![
                TokenConfig { name: "ci".into(), token: "admin-token".into(), admin: true },
                TokenConfig { name: "qa".into(), token: "read-token".into(), admin: false },
            ],
            false,
        )
    }

    fn read() -> Action {
        Action::Read { resource: "releases".into() }
    }

    fn write() -> Action {
        Action::Write { resource: "releases".into() }
    }

    #[test]
    fn identity_variants() {
        let a = Identity::anonymous();
        assert_eq!(a.name, "anonymous");
        assert!(a.is_anonymous && !a.is_admin);
        assert!(!Identity::user("alice").is_admin);
        assert!(Identity::admin("root").is_admin);
    }

    #[test]
    fn action_display() {
        assert_eq!(read().to_string(), "read:releases");
        assert_eq!(Action::Write { resource: "g/a".into() }.to_string(), "write:g/a");
    }

    #[test]
    fn bearer_header_parsing() {
        let mut h = HeaderMap::new();
        assert!(matches!(Credentials::from_headers(&h), Credentials::Anonymous));
        h.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert!(matches!(Credentials::from_headers(&h), Credentials::Bearer(t) if t == "abc"));
        h.insert(AUTHORIZATION, "Basic Zm9v".parse().unwrap());
        assert!(matches!(Credentials::from_headers(&h), Credentials::Anonymous));
    }

    #[tokio::test]
    async fn allow_all_auth() {
        let auth = AllowAllAuth;
        let id = auth.authenticate(&Credentials::Anonymous).await.unwrap();
        assert_eq!(id.name, "anonymous");
        assert!(auth.authorize(&id, &write()).await.unwrap());

        let id = auth.authenticate(&Credentials::Bearer("é".into())).await.unwrap();
        assert_eq!(id.name, "bearer:é");
    }

    #[tokio::test]
    async fn static_tokens() {
        let auth = tokens();
        let admin = auth.authenticate(&Credentials::Bearer("admin-token".into())).await.unwrap();
        let reader = auth.authenticate(&Credentials::Bearer("read-token".into())).await.unwrap();
        let anon = auth.authenticate(&Credentials::Anonymous).await.unwrap();

        assert!(auth.authorize(&admin, &write()).await.unwrap());
        assert!(!auth.authorize(&reader, &write()).await.unwrap());
        assert!(auth.authorize(&reader, &read()).await.unwrap());
        assert!(!auth.authorize(&anon, &read()).await.unwrap());

        assert!(matches!(
            auth.authenticate(&Credentials::Bearer("wrong".into())).await,
            Err(ServerError::AuthFailed(_))
        ));
    }

    #[test]
    fn token_comparison_is_exact() {
        assert!(token_matches("admin-token", "admin-token"));
        assert!(!token_matches("admin-toke", "admin-token"));
        assert!(!token_matches("admin-token2", "admin-token"));
        assert!(!token_matches("Admin-token", "admin-token"));
        assert!(!token_matches("", "admin-token"));
    }

    #[tokio::test]
    async fn token_prefix_does_not_authenticate() {
        let auth = tokens();
        assert!(matches!(
            auth.authenticate(&Credentials::Bearer("admin".into())).await,
            Err(ServerError::AuthFailed(_))
        ));
    }

    #[tokio::test]
    async fn require_maps_refusals() {
        let auth = tokens();
        let mut h = HeaderMap::new();
        assert!(matches!(
            require(&auth, &h, read()).await,
            Err(ServerError::AuthFailed(_))
        ));
        h.insert(AUTHORIZATION, "Bearer read-token".parse().unwrap());
        assert!(matches!(
            require(&auth, &h, write()).await,
            Err(ServerError::AuthorizationDenied { .. })
        ));
        assert_eq!(require(&auth, &h, read()).await.unwrap().name, "qa");
    }
}
