use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::models::View;
use gateway::{RefreshTarget, SessionTeardown};
use tokio::net::TcpListener;
use tokio::sync::watch;

pub use gateway::testing::{Route, StubBackend};

/// Refresh target that only counts.
pub struct CountingTarget {
    active: watch::Sender<View>,
    counts: Mutex<HashMap<View, usize>>,
}

impl CountingTarget {
    pub fn new(active: View) -> Arc<Self> {
        Arc::new(Self {
            active: watch::Sender::new(active),
            counts: Mutex::new(HashMap::new()),
        })
    }

    pub fn set_active(&self, view: View) {
        self.active.send_replace(view);
    }

    pub fn count(&self, view: View) -> usize {
        self.counts.lock().unwrap().get(&view).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl RefreshTarget for CountingTarget {
    fn active_view(&self) -> View {
        *self.active.borrow()
    }

    async fn refresh(&self, view: View) {
        *self.counts.lock().unwrap().entry(view).or_default() += 1;
    }
}

#[derive(Default)]
pub struct CountingTeardown {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SessionTeardown for CountingTeardown {
    async fn logout(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Loopback websocket endpoint that keeps every connection open until the
/// client goes away. `open` counts connections currently open.
pub struct StubLiveServer {
    pub url: String,
    pub open: Arc<AtomicUsize>,
    pub accepted: Arc<AtomicUsize>,
}

impl StubLiveServer {
    pub async fn start() -> Self {
        use futures_util::StreamExt;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let open = Arc::new(AtomicUsize::new(0));
        let accepted = Arc::new(AtomicUsize::new(0));
        let (open_in, accepted_in) = (open.clone(), accepted.clone());

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let open = open_in.clone();
                accepted_in.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
                        return;
                    };
                    open.fetch_add(1, Ordering::SeqCst);
                    while let Some(Ok(_)) = ws.next().await {}
                    open.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            url,
            open,
            accepted,
        }
    }
}
