//! Server configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! raw environment variables (`SPOTIFY_CLIENT_ID`, `PORT`, ...).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Environment variables read on top of the defaults and config file
const ENV_KEYS: &[&str] = &[
    "host",
    "port",
    "spotify_client_id",
    "spotify_client_secret",
    "spotify_redirect_uri",
    "spotify_accounts_url",
    "spotify_api_url",
    "refresh_token_path",
    "database_path",
    "supabase_url",
    "supabase_key",
    "storage_bucket",
    "telegram_bot_token",
    "telegram_api_url",
];

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,

    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    pub spotify_accounts_url: String,
    pub spotify_api_url: String,

    /// File holding the Spotify refresh token between restarts
    pub refresh_token_path: PathBuf,

    /// SQLite database file; None = in-memory
    pub database_path: Option<String>,

    pub supabase_url: String,
    pub supabase_key: String,
    pub storage_bucket: String,

    /// The photo bot only runs when this is set
    pub telegram_bot_token: Option<String>,
    pub telegram_api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            spotify_redirect_uri: "http://localhost:3000/callback".to_string(),
            spotify_accounts_url: "https://accounts.spotify.com".to_string(),
            spotify_api_url: "https://api.spotify.com".to_string(),
            refresh_token_path: PathBuf::from("refresh_token.txt"),
            database_path: None,
            supabase_url: String::new(),
            supabase_key: String::new(),
            storage_bucket: "photos".to_string(),
            telegram_bot_token: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl Config {
    /// Build the figment for defaults, an optional TOML file and the environment
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::raw().only(ENV_KEYS))
    }

    /// Load the configuration
    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(file).extract()
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Override the listen address
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.host = addr.ip();
        self.port = addr.port();
        self
    }
}
