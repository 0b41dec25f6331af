//! Common test utilities - CoverdTest harness for end-to-end testing

pub mod upstream;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use coverd::photos::{NewPhoto, PhotoRecord, PhotoRecords};
use coverd::spotify::MemoryTokenStore;
use coverd::{Config, Server};
use reqwest::{redirect::Policy, Client};
use tokio::task::JoinHandle;

pub use upstream::{MockUpstream, UpstreamState};

/// Refresh token the harness starts with
pub const SEEDED_REFRESH_TOKEN: &str = "seeded-refresh-token";

/// Test harness that spawns a real coverd server on a random port,
/// pointed at a mock of every upstream API
pub struct CoverdTest {
    pub addr: SocketAddr,
    pub client: Client,
    pub upstream: MockUpstream,
    pub tokens: Arc<MemoryTokenStore>,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl CoverdTest {
    /// Start a server that already holds a refresh token
    pub async fn start() -> Result<Self> {
        Self::start_with_refresh_token(Some(SEEDED_REFRESH_TOKEN)).await
    }

    /// Start a server with an optional persisted refresh token
    pub async fn start_with_refresh_token(refresh_token: Option<&str>) -> Result<Self> {
        let upstream = MockUpstream::start().await?;

        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let config = Config {
            spotify_client_id: "client-id".to_string(),
            spotify_client_secret: "client-secret".to_string(),
            spotify_redirect_uri: format!("http://{}/callback", addr),
            spotify_accounts_url: upstream.base_url.clone(),
            spotify_api_url: upstream.base_url.clone(),
            supabase_url: upstream.base_url.clone(),
            supabase_key: "service-key".to_string(),
            telegram_api_url: upstream.base_url.clone(),
            ..Config::default()
        }
        .with_bind_addr(addr);

        let tokens = Arc::new(MemoryTokenStore::new(refresh_token.map(str::to_string)));
        let server = Arc::new(Server::with_token_persistence(config, tokens.clone()).await?);
        let server_clone = server.clone();

        // Spawn the server in a background task
        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(Policy::none())
            .build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            upstream,
            tokens,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Mock upstream state
    pub fn upstream(&self) -> &UpstreamState {
        &self.upstream.state
    }

    /// Direct access to the running server's collaborators
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Record a photo hosted by the mock upstream
    pub async fn add_photo(&self, image: &str, username: &str, title: &str) -> Result<PhotoRecord> {
        Ok(self
            .server
            .state()
            .photos
            .insert(NewPhoto {
                photo_url: self.upstream.image_url(image),
                username: username.to_string(),
                title: title.to_string(),
            })
            .await?)
    }
}

impl Drop for CoverdTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}
