use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

/// Shared handle to the bearer credential.
///
/// Cloning is cheap and every clone sees the same token. The token lives
/// from a successful login until `clear` is called by logout.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session. `expires_in` is the validity window announced by the
    /// backend, when it announced one. A window too large to represent is
    /// treated as no window at all.
    pub async fn start(&self, token: String, expires_in: Option<i64>) {
        let mut state = self.inner.write().await;
        state.token = Some(token);
        state.expires_at = expires_in
            .and_then(Duration::try_seconds)
            .and_then(|window| Utc::now().checked_add_signed(window));
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.read().await.token.clone()
    }

    pub async fn is_active(&self) -> bool {
        self.inner.read().await.token.is_some()
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.expires_at
    }

    /// A restored session has no known window and is never considered expired
    /// locally; the backend answers 401 once it is.
    pub async fn is_expired(&self) -> bool {
        matches!(self.inner.read().await.expires_at, Some(at) if at <= Utc::now())
    }

    /// Drops the token. Returns whether there was one.
    pub async fn clear(&self) -> bool {
        let mut state = self.inner.write().await;
        state.expires_at = None;
        state.token.take().is_some()
    }
}
