pub mod render;

use std::sync::Arc;

use async_trait::async_trait;
use common::models::{Notification, View};
use gateway::{ApiClient, ApiError, RefreshTarget};
use serde_json::Value;
use storage::{SettingsStore, StorageError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::error::AppError;

/// Days of history shown by the analytics view.
const ANALYTICS_DAYS: u32 = 30;

/// What the terminal currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub view: View,
    pub body: String,
}

/// Sole writer of the active view.
///
/// Frames are published on a `watch`, so a slow consumer only ever sees the
/// latest one. Data that arrives for a view no longer active is dropped.
pub struct ViewController {
    api: Arc<ApiClient>,
    settings: SettingsStore,
    active_tx: watch::Sender<View>,
    frame_tx: watch::Sender<Frame>,
    notify_tx: broadcast::Sender<Notification>,
    signal_limit: u32,
}

impl ViewController {
    pub fn new(
        api: Arc<ApiClient>,
        settings: SettingsStore,
        notify_tx: broadcast::Sender<Notification>,
        signal_limit: u32,
    ) -> Self {
        let initial = View::default();
        Self {
            api,
            settings,
            active_tx: watch::Sender::new(initial),
            frame_tx: watch::Sender::new(Frame {
                view: initial,
                body: render::placeholder(initial),
            }),
            notify_tx,
            signal_limit,
        }
    }

    pub fn active_view(&self) -> View {
        *self.active_tx.borrow()
    }

    pub fn subscribe_frames(&self) -> watch::Receiver<Frame> {
        self.frame_tx.subscribe()
    }

    pub fn current_frame(&self) -> Frame {
        self.frame_tx.borrow().clone()
    }

    /// Makes `view` the only active view, shows its placeholder and loads it.
    pub async fn switch_to(&self, view: View) -> Result<(), AppError> {
        let previous = self.active_tx.send_replace(view);
        if previous != view {
            debug!("View {} -> {}", previous, view);
        }
        self.frame_tx.send_replace(Frame {
            view,
            body: render::placeholder(view),
        });
        self.reload(view).await
    }

    /// Fetches and renders `view`. Failures are also reported as
    /// notifications, so callers may ignore the result.
    pub async fn reload(&self, view: View) -> Result<(), AppError> {
        match self.load(view).await {
            Ok(data) => {
                self.publish(view, render::render(view, &data));
                Ok(())
            }
            Err(AppError::Api(ApiError::MalformedPayload(reason))) => {
                warn!("Malformed {} payload: {}", view, reason);
                self.publish(view, render::render(view, &Value::Null));
                Ok(())
            }
            Err(e) => {
                let note = if e.is_unauthorized() {
                    Notification::warning("Session expired, please log in again")
                } else {
                    Notification::error(format!("Failed to load {}: {}", view, e))
                };
                let _ = self.notify_tx.send(note);
                Err(e)
            }
        }
    }

    async fn load(&self, view: View) -> Result<Value, AppError> {
        let envelope = match view {
            View::Dashboard => self.api.dashboard_summary().await?,
            View::Signals => self.api.latest_signals(self.signal_limit).await?,
            View::Portfolio => self.api.optimize_portfolio(None).await?,
            View::Analytics => self.api.performance(ANALYTICS_DAYS).await?,
            View::Markets => self.api.market_scan().await?,
            View::News => self.api.news_summary(None).await?,
            View::Settings => {
                let settings = self.settings.load().await?;
                return Ok(serde_json::to_value(settings).map_err(StorageError::from)?);
            }
        };
        Ok(envelope.into_data())
    }

    fn publish(&self, view: View, body: String) {
        if self.active_view() != view {
            debug!("Dropping {} frame, view no longer active", view);
            return;
        }
        self.frame_tx.send_replace(Frame { view, body });
    }
}

#[async_trait]
impl RefreshTarget for ViewController {
    fn active_view(&self) -> View {
        ViewController::active_view(self)
    }

    async fn refresh(&self, view: View) {
        if self.active_view() != view {
            return;
        }
        match self.reload(view).await {
            Err(e) if e.is_transient() => debug!("Refresh of {} failed, next tick retries: {}", view, e),
            Err(e) => warn!("Refresh of {} failed: {}", view, e),
            Ok(()) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{CountingTeardown, Route, StubBackend};
    use common::{
        models::{NotificationLevel, Settings},
        session::Session,
    };
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use storage::LocalDb;

    struct Fixture {
        views: ViewController,
        backend: StubBackend,
        db: LocalDb,
        teardown: Arc<CountingTeardown>,
        notes: broadcast::Receiver<Notification>,
    }

    async fn fixture(routes: Vec<Route>) -> Fixture {
        let backend = StubBackend::start(routes).await;
        let session = Session::new();
        session.start("tok".to_string(), None).await;
        let teardown = Arc::new(CountingTeardown::default());
        let api = ApiClient::new(&backend.base_url, "/api", session, teardown.clone()).unwrap();
        let db = LocalDb::in_memory().await.unwrap();
        let (notify_tx, notes) = broadcast::channel(16);
        let views = ViewController::new(Arc::new(api), SettingsStore::new(&db), notify_tx, 20);
        Fixture {
            views,
            backend,
            db,
            teardown,
            notes,
        }
    }

    fn summary() -> Route {
        Route::ok(
            "/api/dashboard/summary",
            json!({
                "success": true,
                "data": {"active_session": "London", "total_pairs": 12, "recent_signals": []}
            }),
        )
    }

    #[tokio::test]
    async fn starts_on_the_dashboard_placeholder() {
        let f = fixture(vec![]).await;
        assert_eq!(f.views.active_view(), View::Dashboard);
        assert_eq!(f.views.current_frame().body, render::placeholder(View::Dashboard));
    }

    #[tokio::test]
    async fn switches_keep_a_single_active_view() {
        let f = fixture(vec![
            summary(),
            Route::ok("/api/signals/latest", json!({"success": true, "data": []})),
        ])
        .await;

        for view in [View::Signals, View::Settings, View::Dashboard, View::Signals] {
            f.views.switch_to(view).await.unwrap();
            assert_eq!(f.views.active_view(), view);
            assert_eq!(f.views.current_frame().view, view);
        }
        assert!(f.views.current_frame().body.contains("No signals yet"));
        assert_eq!(f.backend.hits("/api/signals/latest"), 2);
    }

    #[tokio::test]
    async fn data_for_a_hidden_view_is_dropped() {
        let f = fixture(vec![summary()]).await;
        f.views.switch_to(View::Settings).await.unwrap();
        let shown = f.views.current_frame();

        f.views.reload(View::Dashboard).await.unwrap();

        assert_eq!(f.views.current_frame(), shown);
        assert_eq!(f.backend.hits("/api/dashboard/summary"), 1);
    }

    #[tokio::test]
    async fn refresh_of_a_hidden_view_does_not_fetch() {
        let f = fixture(vec![summary()]).await;
        f.views.switch_to(View::Settings).await.unwrap();

        RefreshTarget::refresh(&f.views, View::Dashboard).await;

        assert_eq!(f.backend.hits("/api/dashboard/summary"), 0);
    }

    #[tokio::test]
    async fn dashboard_renders_the_summary() {
        let f = fixture(vec![summary()]).await;
        f.views.switch_to(View::Dashboard).await.unwrap();

        let body = f.views.current_frame().body;
        assert!(body.contains("London"));
        assert!(body.contains("12"));
    }

    #[tokio::test]
    async fn malformed_payload_renders_placeholders() {
        let f = fixture(vec![Route::ok("/api/market/scan", json!([1, 2, 3]))]).await;

        f.views.switch_to(View::Markets).await.unwrap();

        let frame = f.views.current_frame();
        assert_eq!(frame.body, render::render(View::Markets, &Value::Null));
        assert!(frame.body.contains(render::MISSING));
    }

    #[tokio::test]
    async fn bad_status_is_reported_and_keeps_the_placeholder() {
        let mut f = fixture(vec![Route::status(
            "/api/portfolio/optimize",
            "500 Internal Server Error",
        )])
        .await;

        let err = f.views.switch_to(View::Portfolio).await.unwrap_err();

        assert!(matches!(err, AppError::Api(ApiError::BadStatus { status: 500, .. })));
        assert_eq!(f.views.current_frame().body, render::placeholder(View::Portfolio));
        let note = f.notes.try_recv().unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(f.teardown.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unauthorized_ends_the_session() {
        let mut f = fixture(vec![Route::status("/api/dashboard/summary", "401 Unauthorized")]).await;

        let err = f.views.switch_to(View::Dashboard).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(f.teardown.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.notes.try_recv().unwrap().level, NotificationLevel::Warning);
    }

    #[tokio::test]
    async fn settings_view_reads_the_local_store() {
        let f = fixture(vec![]).await;
        let store = SettingsStore::new(&f.db);
        let mut settings = Settings::default();
        settings.theme = "light".to_string();
        store.save(&settings).await.unwrap();

        f.views.switch_to(View::Settings).await.unwrap();

        let body = f.views.current_frame().body;
        assert!(body.contains("light"));
        assert!(body.contains("70.0%"));
    }
}
