use async_trait::async_trait;
use common::models::View;

/// Whoever owns the views: tells which one is visible and reloads one on demand.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTarget: Send + Sync {
    fn active_view(&self) -> View;

    async fn refresh(&self, view: View);
}

/// Forced end of the session, run by the API client on an unauthorized answer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionTeardown: Send + Sync {
    async fn logout(&self);
}
