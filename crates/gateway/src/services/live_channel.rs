use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use common::{
    actors::{Actor, ActorType, ControlMessage},
    models::{ChannelState, LiveEvent, Notification},
};

use crate::traits::RefreshTarget;

/// One live-update connection. The actor ends when the connection does;
/// reconnecting is the supervisor's job.
pub struct LiveChannel {
    id: Uuid,
    url: Url,
    state_tx: watch::Sender<ChannelState>,
    target: Arc<dyn RefreshTarget>,
    notify_tx: broadcast::Sender<Notification>,
}

#[async_trait]
impl Actor for LiveChannel {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::LiveChannelActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        self.state_tx.send_replace(ChannelState::Connecting);
        // Also covers the task being aborted mid-connection.
        let _disconnected = DisconnectOnDrop(&self.state_tx);
        info!("[{}] Connecting to: {}", self.id, self.url);

        let ws_stream = match tokio_tungstenite::connect_async(self.url.as_str()).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => bail!("Connection failed: {}", e),
        };

        self.state_tx.send_replace(ChannelState::Connected);
        info!("[{}] Live channel connected", self.id);

        let (mut write, mut read) = ws_stream.split();

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<LiveEvent>(&text) {
                    Ok(event) => {
                        dispatch(event, self.target.as_ref(), &self.notify_tx).await;
                    }
                    Err(e) => {
                        warn!("[{}] Unknown live message: {}", self.id, e);
                        let _ = supervisor_tx
                            .send(ControlMessage::Error(
                                self.name(),
                                format!("Unknown live message: {}", e),
                            ))
                            .await;
                    }
                },
                Ok(Message::Ping(pg)) => {
                    if let Err(e) = write.send(Message::Pong(pg)).await {
                        error!("[{}] Failed to answer ping: {}", self.id, e);
                        break;
                    }
                    debug!("Ping - Pong message sent to websocket.");
                }
                Ok(Message::Close(frame)) => {
                    debug!("[{}] Close message received: {:?}", self.id, frame);
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    error!("[{}] WebSocket error: {}", self.id, e);
                    break;
                }
            }
        }

        info!("[{}] Live channel closed", self.id);
        Ok(())
    }
}

struct DisconnectOnDrop<'a>(&'a watch::Sender<ChannelState>);

impl Drop for DisconnectOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(ChannelState::Disconnected);
    }
}

impl LiveChannel {
    pub fn new(
        url: Url,
        state_tx: watch::Sender<ChannelState>,
        target: Arc<dyn RefreshTarget>,
        notify_tx: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            state_tx,
            target,
            notify_tx,
        }
    }
}

/// Reacts to one live event. Called in arrival order.
pub async fn dispatch(
    event: LiveEvent,
    target: &dyn RefreshTarget,
    notify_tx: &broadcast::Sender<Notification>,
) {
    match event {
        LiveEvent::NewSignal(signal) => {
            // No receivers just means nobody is listening yet.
            let _ = notify_tx.send(Notification::info(format!(
                "New signal: {}",
                signal.headline()
            )));

            let view = target.active_view();
            if view.shows_signals() {
                target.refresh(view).await;
            } else {
                debug!("New signal while on {}, no refresh", view);
            }
        }
        other @ (LiveEvent::SignalUpdate(_) | LiveEvent::MarketUpdate(_)) => {
            debug!("Live {} received", other.kind());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockRefreshTarget;
    use common::models::{Signal, View};
    use mockall::predicate::eq;
    use tokio::net::TcpListener;

    fn new_signal() -> LiveEvent {
        LiveEvent::NewSignal(Signal {
            symbol: Some("GBPUSD".to_string()),
            direction: Some("BUY".to_string()),
            confidence: Some(81.0),
            ..Signal::default()
        })
    }

    #[tokio::test]
    async fn new_signal_on_portfolio_only_notifies() {
        let mut target = MockRefreshTarget::new();
        target.expect_active_view().return_const(View::Portfolio);
        target.expect_refresh().times(0);
        let (notify_tx, mut notify_rx) = broadcast::channel(8);

        dispatch(new_signal(), &target, &notify_tx).await;

        let note = notify_rx.try_recv().unwrap();
        assert_eq!(note.message, "New signal: GBPUSD BUY (81%)");
    }

    #[tokio::test]
    async fn new_signal_refreshes_signal_views() {
        for view in [View::Dashboard, View::Signals] {
            let mut target = MockRefreshTarget::new();
            target.expect_active_view().return_const(view);
            target
                .expect_refresh()
                .with(eq(view))
                .times(1)
                .returning(|_| ());
            let (notify_tx, _notify_rx) = broadcast::channel(8);

            dispatch(new_signal(), &target, &notify_tx).await;
        }
    }

    #[tokio::test]
    async fn updates_have_no_default_reaction() {
        let mut target = MockRefreshTarget::new();
        target.expect_active_view().times(0);
        target.expect_refresh().times(0);
        let (notify_tx, mut notify_rx) = broadcast::channel(8);

        dispatch(LiveEvent::SignalUpdate(serde_json::json!({})), &target, &notify_tx).await;
        dispatch(LiveEvent::MarketUpdate(serde_json::json!({})), &target, &notify_tx).await;

        assert!(notify_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn delivers_events_then_reports_closure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(Message::text("not json")).await.unwrap();
            ws.send(Message::text(
                r#"{"type":"new_signal","data":{"symbol":"XAUUSD","direction":"SELL","confidence":90}}"#,
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        });

        let mut target = MockRefreshTarget::new();
        target.expect_active_view().return_const(View::Signals);
        target
            .expect_refresh()
            .with(eq(View::Signals))
            .times(1)
            .returning(|_| ());

        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (notify_tx, mut notify_rx) = broadcast::channel(8);
        let (supervisor_tx, mut supervisor_rx) = mpsc::channel(8);

        let url = Url::parse(&format!("ws://{}/ws", addr)).unwrap();
        let mut channel = LiveChannel::new(url, state_tx, Arc::new(target), notify_tx);
        channel.run(supervisor_tx).await.unwrap();

        assert_eq!(*state_rx.borrow(), ChannelState::Disconnected);
        assert_eq!(
            notify_rx.try_recv().unwrap().message,
            "New signal: XAUUSD SELL (90%)"
        );
        assert!(matches!(
            supervisor_rx.try_recv(),
            Ok(ControlMessage::Error(ActorType::LiveChannelActor, _))
        ));
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (notify_tx, _) = broadcast::channel(8);
        let (supervisor_tx, _supervisor_rx) = mpsc::channel(8);
        let url = Url::parse(&format!("ws://{}/ws", addr)).unwrap();

        let mut channel = LiveChannel::new(url, state_tx, Arc::new(MockRefreshTarget::new()), notify_tx);
        assert!(channel.run(supervisor_tx).await.is_err());
        assert_eq!(*state_rx.borrow(), ChannelState::Disconnected);
    }
}
