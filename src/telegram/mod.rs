//! Telegram photo bot
//!
//! Long-polls the Bot API. Photos sent to the bot are uploaded to the
//! storage bucket and recorded in the `photos` table; the sender gets a text
//! reply either way.

mod api;
mod ingest;

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

pub use api::{Message, TelegramBot, TelegramError, Update};
pub use ingest::{object_name, photo_submission, IngestError, PhotoIngestor, PhotoSubmission};

/// Long-poll window for getUpdates
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after a failed poll before trying again
const ERROR_PAUSE: Duration = Duration::from_secs(5);

const REPLY_SAVED: &str = "¡Foto guardada! Gracias por compartirla.";
const REPLY_DOWNLOAD_FAILED: &str = "No se pudo descargar la foto. Inténtalo de nuevo.";
const REPLY_UPLOAD_FAILED: &str = "No se pudo subir la foto al almacenamiento.";
const REPLY_INSERT_FAILED: &str = "No se pudo registrar la foto en la base de datos.";
const REPLY_USAGE: &str =
    "Envíame una foto (con un título opcional) para mostrarla en la pantalla.";

/// Runs the bot until shutdown is signalled
pub struct PhotoBot {
    bot: TelegramBot,
    ingestor: PhotoIngestor,
}

impl PhotoBot {
    pub fn new(bot: TelegramBot, ingestor: PhotoIngestor) -> Self {
        Self { bot, ingestor }
    }

    /// Poll for updates until `shutdown_rx` changes
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Photo bot started");
        let mut offset = 0;

        loop {
            let updates = tokio::select! {
                _ = shutdown_rx.changed() => break,
                result = self.bot.get_updates(offset, POLL_TIMEOUT) => result,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    warn!("Telegram poll failed: {}", e);
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = tokio::time::sleep(ERROR_PAUSE) => {}
                    }
                }
            }
        }

        info!("Photo bot stopped");
    }

    /// Process one update and reply to its chat
    pub async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };

        let reply = match photo_submission(&message) {
            Some(submission) => self.handle_submission(&submission).await,
            None => REPLY_USAGE,
        };

        if let Err(e) = self.bot.send_message(message.chat.id, reply).await {
            warn!("Failed to reply to chat {}: {}", message.chat.id, e);
        }
    }

    async fn handle_submission(&self, submission: &PhotoSubmission) -> &'static str {
        let data = match self.download(&submission.file_id).await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to download photo {}: {}", submission.file_id, e);
                return REPLY_DOWNLOAD_FAILED;
            }
        };

        match self
            .ingestor
            .ingest(data, &submission.username, &submission.title)
            .await
        {
            Ok(_) => REPLY_SAVED,
            Err(e @ IngestError::Upload(_)) => {
                error!("Photo ingestion failed: {}", e);
                REPLY_UPLOAD_FAILED
            }
            Err(e @ IngestError::Insert(_)) => {
                error!("Photo ingestion failed: {}", e);
                REPLY_INSERT_FAILED
            }
        }
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, TelegramError> {
        let file = self.bot.get_file(file_id).await?;
        let path = file
            .file_path
            .ok_or_else(|| TelegramError::Api(format!("no file_path for {}", file_id)))?;
        self.bot.download(&path).await
    }
}
