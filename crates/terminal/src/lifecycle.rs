use std::sync::Arc;

use async_trait::async_trait;
use common::{
    actors::ControlMessage,
    models::Notification,
    session::Session,
};
use gateway::{ApiClient, SessionTeardown};
use storage::SessionStore;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tracing::{error, info, warn};

use crate::error::AppError;

/// Login, restore and logout of the one user session.
///
/// Logout runs on its own task: a caller aborted mid-way (a refresh timer or
/// the live channel torn down by this very logout) cannot leave it half done.
#[derive(Clone)]
pub struct SessionLifecycle {
    inner: Arc<Inner>,
}

struct Inner {
    session: Session,
    store: SessionStore,
    supervisor_tx: Mutex<Option<mpsc::Sender<ControlMessage>>>,
    logged_in: watch::Sender<bool>,
    notify_tx: broadcast::Sender<Notification>,
}

impl SessionLifecycle {
    pub fn new(
        session: Session,
        store: SessionStore,
        notify_tx: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                session,
                store,
                supervisor_tx: Mutex::new(None),
                logged_in: watch::Sender::new(false),
                notify_tx,
            }),
        }
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// `true` while logged in. Flips to `false` once a logout has completed.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.logged_in.subscribe()
    }

    /// Hands over the supervisor of the session's background tasks.
    pub async fn attach_supervisor(&self, tx: mpsc::Sender<ControlMessage>) {
        let mut slot = self.inner.supervisor_tx.lock().await;
        if let Some(previous) = slot.replace(tx) {
            warn!("Replacing a supervisor that was never torn down");
            Inner::teardown(previous).await;
        }
    }

    /// Picks up a token persisted by an earlier run.
    pub async fn restore(&self) -> Result<bool, AppError> {
        let Some(token) = self.inner.store.load_token().await? else {
            return Ok(false);
        };
        self.inner.session.start(token, None).await;
        self.inner.logged_in.send_replace(true);
        info!("Restored persisted session");
        Ok(true)
    }

    pub async fn login(&self, api: &ApiClient, username: &str, password: &str) -> Result<(), AppError> {
        let response = api.login(username, password).await?;
        self.inner.store.save_token(&response.access_token).await?;
        self.inner.logged_in.send_replace(true);
        let _ = self.inner.notify_tx.send(Notification::success(format!(
            "Logged in as {}",
            response.username().unwrap_or(username)
        )));
        Ok(())
    }

    /// Ends the session: token cleared in memory and on disk, every
    /// background task stopped. Safe to call any number of times.
    pub async fn logout(&self) {
        let inner = self.inner.clone();
        let result = tokio::spawn(async move {
            let had_session = inner.session.clear().await;
            if let Err(e) = inner.store.clear_token().await {
                error!("Failed to remove persisted token: {}", e);
            }
            inner.stop_tasks().await;
            inner.logged_in.send_replace(false);
            if had_session {
                info!("Logged out");
                let _ = inner.notify_tx.send(Notification::warning("Logged out"));
            }
        })
        .await;

        if let Err(e) = result {
            error!("Logout task failed: {}", e);
        }
    }

    /// Stops background tasks but keeps the persisted token for the next run.
    pub async fn shutdown(&self) {
        self.inner.stop_tasks().await;
        self.inner.logged_in.send_replace(false);
    }
}

impl Inner {
    /// Holds the slot until the supervisor acknowledged, so a concurrent
    /// logout returns only once the tasks are really gone.
    async fn stop_tasks(&self) {
        let mut slot = self.supervisor_tx.lock().await;
        if let Some(tx) = slot.take() {
            Self::teardown(tx).await;
        }
    }

    async fn teardown(tx: mpsc::Sender<ControlMessage>) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if tx.send(ControlMessage::Teardown(ack_tx)).await.is_err() {
            // Supervisor already gone, nothing left to stop.
            return;
        }
        if ack_rx.await.is_err() {
            warn!("Supervisor stopped without acknowledging teardown");
        }
    }
}

#[async_trait]
impl SessionTeardown for SessionLifecycle {
    async fn logout(&self) {
        SessionLifecycle::logout(self).await;
    }
}
