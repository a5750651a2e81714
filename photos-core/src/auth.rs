use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::AuthError;

pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/photoslibrary.readonly";
pub const LIBRARY_SCOPE: &str = "https://www.googleapis.com/auth/photoslibrary";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens within this margin of expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth2 user credentials, in the `token.json` layout left by the
/// installed-app consent flow.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Fields we do not interpret but write back unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl Credentials {
    /// Bare bearer token with no refresh capability.
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: token.into(),
            refresh_token: None,
            token_uri: default_token_uri(),
            client_id: None,
            client_secret: None,
            scopes: Vec::new(),
            expiry: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn bearer(&self) -> &str {
        &self.access_token
    }

    pub fn is_expired(&self) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= Utc::now())
    }

    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }

    /// An empty scope list means the file did not record scopes; accept it.
    pub fn grants(&self, scope: &str) -> bool {
        self.scopes.is_empty() || self.scopes.iter().any(|granted| granted == scope)
    }

    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AuthError::TokenFileMissing(path.to_path_buf())
            } else {
                AuthError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| AuthError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Supplies valid credentials for a set of scopes.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, scopes: &[&str]) -> Result<Credentials, AuthError>;
}

/// Reads `token.json`, refreshing and rewriting it when the access token
/// has expired. The interactive consent flow that first creates the file is
/// not handled here.
#[derive(Debug, Clone)]
pub struct TokenFileAuthenticator {
    path: PathBuf,
    http: reqwest::Client,
}

impl TokenFileAuthenticator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn refresh(&self, credentials: &mut Credentials) -> Result<(), AuthError> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NotRefreshable("no refresh_token"))?;
        let client_id = credentials
            .client_id
            .as_deref()
            .ok_or(AuthError::NotRefreshable("no client_id"))?;
        let client_secret = credentials
            .client_secret
            .as_deref()
            .ok_or(AuthError::NotRefreshable("no client_secret"))?;

        tracing::debug!("POST {} grant_type=refresh_token", credentials.token_uri);
        let response = self
            .http
            .post(&credentials.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::Rejected { status, body });
        }

        let refreshed: RefreshResponse = serde_json::from_str(&body)?;
        credentials.access_token = refreshed.access_token;
        credentials.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(rotated) = refreshed.refresh_token {
            credentials.refresh_token = Some(rotated);
        }
        Ok(())
    }
}

#[async_trait]
impl Authenticator for TokenFileAuthenticator {
    async fn authenticate(&self, scopes: &[&str]) -> Result<Credentials, AuthError> {
        let mut credentials = Credentials::load(&self.path)?;

        if let Some(missing) = scopes.iter().find(|scope| !credentials.grants(scope)) {
            return Err(AuthError::MissingScope(missing.to_string()));
        }

        if credentials.is_valid() {
            tracing::debug!("Using stored token from {}", self.path.display());
            return Ok(credentials);
        }

        if !credentials.can_refresh() {
            return Err(AuthError::NotRefreshable("missing refresh material"));
        }

        tracing::info!("Access token expired, refreshing");
        self.refresh(&mut credentials).await?;
        credentials.save(&self.path)?;
        tracing::debug!("Refreshed token written to {}", self.path.display());

        Ok(credentials)
    }
}
