use common::{config::AppConfig, models::Notification};
use storage::SettingsStore;
use teloxide::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Prints notifications and, when a bot is configured and push
/// notifications are on, forwards them to Telegram.
pub struct NotificationService {
    telegram: Option<(Bot, ChatId)>,
    settings: SettingsStore,
}

impl NotificationService {
    pub fn new(config: &AppConfig, settings: SettingsStore) -> Self {
        let telegram = match (&config.telegram_token, config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some((Bot::new(token), ChatId(chat_id))),
            (Some(_), None) => {
                warn!("TELEGRAM_BOT_TOKEN set without TELEGRAM_CHAT_ID, not forwarding");
                None
            }
            _ => None,
        };
        Self { telegram, settings }
    }

    pub fn forwards_to_telegram(&self) -> bool {
        self.telegram.is_some()
    }

    pub async fn start(self, mut rx: broadcast::Receiver<Notification>) {
        info!(
            "Starting Notification Service (telegram: {})",
            self.forwards_to_telegram()
        );

        loop {
            match rx.recv().await {
                Ok(note) => {
                    println!("{}", note);
                    self.forward(&note).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    error!("Notification service lagged behind. Missed {} messages.", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Notification channel closed. Stopping service.");
                    break;
                }
            }
        }
    }

    async fn forward(&self, note: &Notification) {
        let Some((bot, chat_id)) = &self.telegram else {
            return;
        };

        match self.settings.load().await {
            Ok(settings) if settings.push_notifications => {
                if let Err(e) = bot.send_message(*chat_id, note.to_string()).await {
                    error!("Failed to send Telegram message: {}", e);
                }
            }
            Ok(_) => debug!("Push notifications off, not forwarding"),
            Err(e) => warn!("Could not read settings, not forwarding: {}", e),
        }
    }
}
