use std::sync::Arc;

use common::{
    actors::{Actor, ActorType},
    config::AppConfig,
    models::{ChannelState, Notification, Settings, View},
    session::Session,
};
use gateway::{ApiClient, LiveChannel, remote::live_channel_url};
use storage::{LocalDb, SessionStore, SettingsStore};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::info;
use url::Url;

use crate::{actors::supervisor::Supervisor, error::AppError, lifecycle::SessionLifecycle, views::ViewController};

/// Everything one running dashboard shares.
pub struct AppContext {
    pub config: AppConfig,
    pub lifecycle: SessionLifecycle,
    pub api: Arc<ApiClient>,
    pub settings: SettingsStore,
    pub views: Arc<ViewController>,
    pub notify_tx: broadcast::Sender<Notification>,
    channel_tx: watch::Sender<ChannelState>,
    live_url: Url,
}

impl AppContext {
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let db = LocalDb::open(&config.db_path).await?;
        Self::with_db(config, &db)
    }

    pub fn with_db(config: AppConfig, db: &LocalDb) -> anyhow::Result<Self> {
        let (notify_tx, _) = broadcast::channel::<Notification>(256);
        let session = Session::new();
        let lifecycle = SessionLifecycle::new(session.clone(), SessionStore::new(db), notify_tx.clone());

        let api = Arc::new(ApiClient::new(
            &config.api_url,
            &config.api_prefix,
            session,
            Arc::new(lifecycle.clone()),
        )?);
        let settings = SettingsStore::new(db);
        let views = Arc::new(ViewController::new(
            api.clone(),
            settings.clone(),
            notify_tx.clone(),
            config.signal_limit,
        ));
        let live_url = live_channel_url(&config.api_url, config.ws_url.as_deref())?;

        Ok(Self {
            config,
            lifecycle,
            api,
            settings,
            views,
            notify_tx,
            channel_tx: watch::Sender::new(ChannelState::Disconnected),
            live_url,
        })
    }

    pub fn channel_state(&self) -> watch::Receiver<ChannelState> {
        self.channel_tx.subscribe()
    }

    /// Starts the live channel and refresh timers of a logged-in session.
    /// They run until the session ends.
    pub async fn start_session_tasks(&self) -> JoinHandle<()> {
        let mut supervisor = Supervisor::new(self.config.reconnect_delay);

        let url = self.live_url.clone();
        let state_tx = self.channel_tx.clone();
        let views = self.views.clone();
        let notify_tx = self.notify_tx.clone();
        supervisor.register_actor(
            ActorType::LiveChannelActor,
            Box::new(move || {
                Box::new(LiveChannel::new(
                    url.clone(),
                    state_tx.clone(),
                    views.clone(),
                    notify_tx.clone(),
                )) as Box<dyn Actor>
            }),
        );
        supervisor
            .scheduler_mut()
            .schedule_defaults(&self.config, self.views.clone());

        self.lifecycle.attach_supervisor(supervisor.sender()).await;
        info!("Session tasks starting, live channel at {}", self.live_url);
        tokio::spawn(supervisor.start())
    }

    /// Changes one setting, saves it, and redraws the settings view if shown.
    pub async fn update_setting(&self, key: &str, value: &str) -> Result<Settings, AppError> {
        let mut settings = self.settings.load().await?;
        settings.set(key, value)?;
        self.settings.save(&settings).await?;
        if self.views.active_view() == View::Settings {
            self.views.reload(View::Settings).await?;
        }
        Ok(settings)
    }

    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }
}
