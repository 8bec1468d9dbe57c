//! Google service-account authentication for the Firebase Hosting API.
//!
//! The process holds one [`FirebaseAuth`] handle. It starts
//! `Uninitialized`, and a startup task moves it exactly once to `Ready`
//! (a working token source) or `Failed` (the reason). Publish calls read
//! the state and refuse to start when it is not `Ready`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};

use crate::error::provider_message;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

pub const HOSTING_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase",
];

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertions are valid for one hour, the maximum Google accepts.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Renew this long before the access token expires.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid service account: {0}")]
    InvalidServiceAccount(String),

    #[error("failed to sign token request: {0}")]
    Signing(String),

    #[error("token request failed: {0}")]
    TokenRequest(String),
}

/// The fields of a Google service-account key file this crate uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let account: ServiceAccount = serde_json::from_str(json)
            .map_err(|e| AuthError::InvalidServiceAccount(e.to_string()))?;

        if let Some(kind) = &account.account_type
            && kind != "service_account"
        {
            return Err(AuthError::InvalidServiceAccount(format!(
                "expected type \"service_account\", got \"{}\"",
                kind
            )));
        }
        if account.client_email.trim().is_empty() {
            return Err(AuthError::InvalidServiceAccount(
                "client_email is empty".to_string(),
            ));
        }

        Ok(account)
    }
}

/// JWT claims for the OAuth 2.0 JWT-bearer grant.
#[derive(Debug, Serialize, PartialEq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AssertionClaims {
    pub fn new(account: &ServiceAccount, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            iss: account.client_email.clone(),
            scope: HOSTING_SCOPES.join(" "),
            aud: account.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }
}

/// Something that can hand out a bearer token for the Hosting API.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// Exchanges signed service-account assertions for access tokens and
/// caches the current token until shortly before it expires.
pub struct ServiceAccountTokenSource {
    account: ServiceAccount,
    key: EncodingKey,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(account: ServiceAccount, timeout: Duration) -> Result<Self, AuthError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| AuthError::InvalidServiceAccount(format!("private_key: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::TokenRequest(e.to_string()))?;

        Ok(Self {
            account,
            key,
            client,
            cached: Mutex::new(None),
        })
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.account.private_key_id.clone();
        jsonwebtoken::encode(&header, &AssertionClaims::new(&self.account, now), &self.key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    async fn fetch_token(&self) -> Result<CachedToken, AuthError> {
        let now = Utc::now();
        let assertion = self.sign_assertion(now)?;

        let response = self
            .client
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AuthError::TokenRequest(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::TokenRequest(e.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::TokenRequest(format!(
                "HTTP {}: {}",
                status.as_u16(),
                provider_message(&body)
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::TokenRequest(format!("unexpected token response: {}", e)))?;

        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + chrono::Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.is_fresh(Utc::now())
        {
            return Ok(token.token.clone());
        }

        tracing::debug!(client_email = %self.account.client_email, "requesting Google access token");
        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

/// Read-only view of the auth lifecycle.
pub enum AuthState<'a> {
    Uninitialized,
    Ready(&'a Arc<dyn TokenSource>),
    Failed(&'a str),
}

/// Process-wide Firebase auth handle. Cloning shares the same state.
#[derive(Clone, Default)]
pub struct FirebaseAuth {
    cell: Arc<OnceCell<Result<Arc<dyn TokenSource>, String>>>,
}

impl FirebaseAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that is `Ready` from the start.
    pub fn ready(source: Arc<dyn TokenSource>) -> Self {
        let auth = Self::new();
        auth.mark_ready(source);
        auth
    }

    /// A handle that is `Failed` from the start.
    pub fn failed(reason: impl Into<String>) -> Self {
        let auth = Self::new();
        auth.mark_failed(reason);
        auth
    }

    /// Returns `false` if the state was already decided.
    pub fn mark_ready(&self, source: Arc<dyn TokenSource>) -> bool {
        self.cell.set(Ok(source)).is_ok()
    }

    /// Returns `false` if the state was already decided.
    pub fn mark_failed(&self, reason: impl Into<String>) -> bool {
        self.cell.set(Err(reason.into())).is_ok()
    }

    pub fn state(&self) -> AuthState<'_> {
        match self.cell.get() {
            None => AuthState::Uninitialized,
            Some(Ok(source)) => AuthState::Ready(source),
            Some(Err(reason)) => AuthState::Failed(reason),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state(), AuthState::Ready(_))
    }

    /// Build a token source from `account` and prove it works by fetching a
    /// first token. Decides the state either way.
    pub async fn initialize(&self, account: ServiceAccount, timeout: Duration) {
        let client_email = account.client_email.clone();
        let result = async {
            let source = ServiceAccountTokenSource::new(account, timeout)?;
            source.access_token().await?;
            Ok::<_, AuthError>(source)
        }
        .await;

        match result {
            Ok(source) => {
                self.mark_ready(Arc::new(source));
                tracing::info!(%client_email, "Firebase Hosting credentials ready");
            }
            Err(e) => {
                tracing::error!(%client_email, error = %e, "Firebase Hosting credentials unusable");
                self.mark_failed(e.to_string());
            }
        }
    }
}
