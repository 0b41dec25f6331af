//! Spotify integration
//!
//! Provides:
//! - OAuth authorization and single-flight access token refresh
//! - Refresh token persistence
//! - Playback and profile queries

pub mod auth;
mod client;

pub use auth::{
    AuthError, FileTokenStore, MemoryTokenStore, SpotifyAuth, SpotifyCredentials, TokenPersistence,
    TokenProvider,
};
pub use client::{NowPlaying, Profile, SpotifyClient, SpotifyError};
