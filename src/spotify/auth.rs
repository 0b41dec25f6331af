//! Spotify OAuth - authorization code flow and access token refresh
//!
//! The refresh token is long-lived and persisted through [`TokenPersistence`].
//! Access tokens are derived from it on demand and cached until shortly
//! before they expire.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Scopes needed for playback state and profile lookups
pub const SCOPES: &str =
    "user-read-private user-read-email user-read-playback-state user-read-currently-playing";

/// Refresh this long before the provider's expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Outstanding login attempts remembered for /callback
const MAX_PENDING_LOGINS: usize = 32;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no refresh token available, log in first")]
    NotAuthorized,

    #[error("unknown or expired login state")]
    UnknownState,

    #[error("access token rejected by Spotify")]
    Revoked,

    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: StatusCode, body: String },

    #[error("token persistence failed: {0}")]
    Persistence(#[from] std::io::Error),
}

/// Source of bearer tokens for API calls
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A currently valid access token, refreshing if needed
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Drop the cached access token so the next call refreshes
    async fn invalidate(&self);
}

/// Storage for the refresh token across restarts
#[async_trait]
pub trait TokenPersistence: Send + Sync {
    async fn load(&self) -> std::io::Result<Option<String>>;
    async fn save(&self, refresh_token: &str) -> std::io::Result<()>;
}

/// Refresh token kept as the whole content of a text file
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenPersistence for FileTokenStore {
    async fn load(&self) -> std::io::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn save(&self, refresh_token: &str) -> std::io::Result<()> {
        tokio::fs::write(&self.path, refresh_token).await
    }
}

/// In-process token storage, nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

#[async_trait]
impl TokenPersistence for MemoryTokenStore {
    async fn load(&self) -> std::io::Result<Option<String>> {
        Ok(self.token.lock().clone())
    }

    async fn save(&self, refresh_token: &str) -> std::io::Result<()> {
        *self.token.lock() = Some(refresh_token.to_string());
        Ok(())
    }
}

/// OAuth client registration
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Accounts service base URL, e.g. https://accounts.spotify.com
    pub accounts_url: String,
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    refresh_token: Option<String>,
}

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    expires_at: Option<Instant>,
    refresh_token: Option<String>,
}

impl TokenState {
    fn valid_access_token(&self, now: Instant) -> Option<String> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if now + EXPIRY_MARGIN < expires_at => {
                Some(token.clone())
            }
            _ => None,
        }
    }
}

/// Authorization state as seen by a caller that must not wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Authorized,
    Unauthorized,
    /// A token request is in flight
    Refreshing,
}

impl AuthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthStatus::Authorized => "authorized",
            AuthStatus::Unauthorized => "unauthorized",
            AuthStatus::Refreshing => "refreshing",
        }
    }
}

/// Generate a random OAuth state value
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    hex::encode(random_bytes)
}

/// Spotify token manager
pub struct SpotifyAuth {
    client: Client,
    credentials: SpotifyCredentials,
    persistence: Arc<dyn TokenPersistence>,
    /// Held across refreshes so concurrent callers share one request
    state: tokio::sync::Mutex<TokenState>,
    pending_logins: Mutex<VecDeque<String>>,
}

impl SpotifyAuth {
    /// Create the token manager, loading any persisted refresh token
    pub async fn new(
        client: Client,
        credentials: SpotifyCredentials,
        persistence: Arc<dyn TokenPersistence>,
    ) -> Result<Self, AuthError> {
        let refresh_token = persistence.load().await?;
        if refresh_token.is_some() {
            info!("Loaded persisted Spotify refresh token");
        } else {
            info!("No Spotify refresh token yet, visit /login to authorize");
        }

        Ok(Self {
            client,
            credentials,
            persistence,
            state: tokio::sync::Mutex::new(TokenState {
                refresh_token,
                ..Default::default()
            }),
            pending_logins: Mutex::new(VecDeque::new()),
        })
    }

    /// Whether a refresh token is available, without waiting behind a
    /// token request
    pub fn status(&self) -> AuthStatus {
        match self.state.try_lock() {
            Ok(state) if state.refresh_token.is_some() => AuthStatus::Authorized,
            Ok(_) => AuthStatus::Unauthorized,
            Err(_) => AuthStatus::Refreshing,
        }
    }

    /// Authorization URL for a given state value
    pub fn authorize_url(&self, state: &str) -> String {
        let base = format!("{}/authorize", self.credentials.accounts_url);
        let params = [
            ("response_type", "code"),
            ("client_id", self.credentials.client_id.as_str()),
            ("scope", SCOPES),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ("state", state),
        ];
        match Url::parse_with_params(&base, &params) {
            Ok(url) => url.to_string(),
            // accounts_url is not a valid base; let the browser report it
            Err(_) => base,
        }
    }

    /// Start a login: remember a fresh state and return the authorize URL
    pub fn begin_login(&self) -> String {
        let state = generate_state();
        let url = self.authorize_url(&state);

        let mut pending = self.pending_logins.lock();
        if pending.len() >= MAX_PENDING_LOGINS {
            pending.pop_front();
        }
        pending.push_back(state);

        url
    }

    /// Finish a login by exchanging the authorization code
    pub async fn complete_login(&self, code: &str, state: &str) -> Result<(), AuthError> {
        {
            let mut pending = self.pending_logins.lock();
            let position = pending
                .iter()
                .position(|s| s == state)
                .ok_or(AuthError::UnknownState)?;
            pending.remove(position);
        }

        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ])
            .await?;

        let mut token_state = self.state.lock().await;
        if let Some(refresh_token) = &response.refresh_token {
            self.persistence.save(refresh_token).await?;
            token_state.refresh_token = Some(refresh_token.clone());
        }
        token_state.access_token = Some(response.access_token);
        token_state.expires_at = Some(Instant::now() + Duration::from_secs(response.expires_in));

        info!("Spotify authorization complete");
        Ok(())
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(format!("{}/api/token", self.credentials.accounts_url))
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Spotify token endpoint error: {} - {}", status, body);
            return Err(AuthError::TokenEndpoint { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TokenProvider for SpotifyAuth {
    async fn access_token(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.valid_access_token(Instant::now()) {
            return Ok(token);
        }

        let refresh_token = state
            .refresh_token
            .clone()
            .ok_or(AuthError::NotAuthorized)?;

        debug!("Refreshing Spotify access token");
        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .await?;

        if let Some(rotated) = response.refresh_token.filter(|t| *t != refresh_token) {
            debug!("Spotify rotated the refresh token");
            self.persistence.save(&rotated).await?;
            state.refresh_token = Some(rotated);
        }

        state.expires_at = Some(Instant::now() + Duration::from_secs(response.expires_in));
        state.access_token = Some(response.access_token.clone());
        Ok(response.access_token)
    }

    async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.access_token = None;
        state.expires_at = None;
    }
}
