//! Minimal Telegram Bot API client (long polling)

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Bot API errors
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    #[error("Bot API error: {0}")]
    Api(String),
}

/// Envelope around every Bot API result
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub caption: Option<String>,
    /// Sizes of one photo, smallest first
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Telegram bot client
#[derive(Debug, Clone)]
pub struct TelegramBot {
    client: Client,
    /// API base URL, e.g. https://api.telegram.org
    api_url: String,
    token: String,
}

impl TelegramBot {
    pub fn new(client: Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            token: token.into(),
        }
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let body = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: &["message"],
        };
        // Let the server hold the request for the full poll window
        self.call_with_timeout("getUpdates", &body, timeout + Duration::from_secs(10))
            .await
    }

    /// Resolve a file id to a downloadable path
    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        self.call("getFile", &serde_json::json!({ "file_id": file_id }))
            .await
    }

    /// Download a file returned by [`TelegramBot::get_file`]
    pub async fn download(&self, file_path: &str) -> Result<Vec<u8>, TelegramError> {
        let url = format!("{}/file/bot{}/{}", self.api_url, self.token, file_path);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(TelegramError::Status(response.status()));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Reply with plain text
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let _: Message = self
            .call("sendMessage", &SendMessage { chat_id, text })
            .await?;
        Ok(())
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, TelegramError> {
        self.call_with_timeout(method, body, Duration::from_secs(30))
            .await
    }

    async fn call_with_timeout<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        debug!("Telegram API call: {}", method);

        let response = self
            .client
            .post(format!("{}/bot{}/{}", self.api_url, self.token, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let envelope: ApiResponse<T> = match response.json().await {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(TelegramError::Status(status)),
            Err(e) => return Err(e.into()),
        };

        if !envelope.ok {
            let description = envelope.description.unwrap_or_default();
            warn!("Telegram {} failed: {}", method, description);
            return Err(TelegramError::Api(description));
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::Api(format!("{} returned no result", method)))
    }
}
