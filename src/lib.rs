//! coverd - Spotify cover relay for 64x64 RGB565 displays
//!
//! Serves the current album cover and user-submitted photos as packed pixel
//! grids, and runs an optional Telegram bot that collects those photos.

pub mod api;
pub mod config;
pub mod db;
pub mod fetch;
pub mod photos;
pub mod raster;
pub mod spotify;
pub mod storage;
pub mod telegram;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

pub use config::Config;
use db::Database;
use fetch::ImageFetcher;
use photos::{PhotoRecords, SqlitePhotoStore};
use raster::RasterConverter;
use spotify::{FileTokenStore, SpotifyAuth, SpotifyClient, SpotifyCredentials, TokenPersistence};
use storage::{BlobStore, SupabaseStorage};
use telegram::{PhotoBot, PhotoIngestor, TelegramBot};

/// Timeout for upstream requests other than bot long polls
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The coverd server instance
pub struct Server {
    config: Config,
    db: Arc<Database>,
    state: api::AppState,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a server persisting the refresh token to the configured file
    pub async fn new(config: Config) -> Result<Self> {
        let persistence = Arc::new(FileTokenStore::new(&config.refresh_token_path));
        Self::with_token_persistence(config, persistence).await
    }

    /// Create a server with a custom refresh token backend
    pub async fn with_token_persistence(
        config: Config,
        persistence: Arc<dyn TokenPersistence>,
    ) -> Result<Self> {
        let db = Arc::new(Database::new(config.database_path.as_deref()).await?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let credentials = SpotifyCredentials {
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            redirect_uri: config.spotify_redirect_uri.clone(),
            accounts_url: config.spotify_accounts_url.clone(),
        };
        let auth = Arc::new(SpotifyAuth::new(client.clone(), credentials, persistence).await?);
        let spotify = SpotifyClient::new(client.clone(), &config.spotify_api_url, auth.clone());

        let storage: Arc<dyn BlobStore> = Arc::new(SupabaseStorage::new(
            client.clone(),
            &config.supabase_url,
            &config.supabase_key,
            &config.storage_bucket,
        ));
        let photos: Arc<dyn PhotoRecords> = Arc::new(SqlitePhotoStore::new(db.pool().clone()));

        let state = api::AppState {
            db: db.clone(),
            auth,
            spotify,
            photos,
            storage,
            fetcher: ImageFetcher::new(client),
            converter: RasterConverter::default(),
        };

        Ok(Self {
            config,
            db,
            state,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get the database handle
    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Shared handler state
    pub fn state(&self) -> &api::AppState {
        &self.state
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    /// Photo bot, when a token is configured
    fn photo_bot(&self) -> Option<PhotoBot> {
        let token = self.config.telegram_bot_token.as_deref()?;
        // Long polls need a client without the short request timeout
        let bot = TelegramBot::new(Client::new(), &self.config.telegram_api_url, token);
        let ingestor = PhotoIngestor::new(self.state.storage.clone(), self.state.photos.clone());
        Some(PhotoBot::new(bot, ingestor))
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let local_addr = listener.local_addr()?;
        info!("coverd listening on {}", local_addr);

        let bot_handle = match self.photo_bot() {
            Some(bot) => Some(tokio::spawn(bot.run(self.shutdown_rx.clone()))),
            None => {
                info!("TELEGRAM_BOT_TOKEN not set, photo bot disabled");
                None
            }
        };

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        if let Some(handle) = bot_handle {
            handle.await.ok();
        }

        info!("coverd shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr()
    }
}
