use std::{collections::HashMap, time::Duration};
use tracing::{debug, error, info, warn};

use tokio::{sync::mpsc, task::JoinHandle, time};

use common::actors::{Actor, ActorType, ControlMessage};

use crate::services::refresh_scheduler::RefreshScheduler;

pub type ActorFactory = Box<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

/// Owns every background task of a session.
///
/// Actors that end are started again after `restart_delay`; at most one
/// restart is pending per actor and at most one instance runs. `Teardown`
/// aborts actors, pending restarts and refresh timers, then stops the loop.
pub struct Supervisor {
    actor_factories: HashMap<ActorType, ActorFactory>,
    handles: HashMap<ActorType, JoinHandle<()>>,
    pending_restarts: HashMap<ActorType, JoinHandle<()>>,
    scheduler: RefreshScheduler,
    restart_delay: Duration,
    supervisor_tx: mpsc::Sender<ControlMessage>,
    supervisor_rx: mpsc::Receiver<ControlMessage>,
}

impl Supervisor {
    pub fn new(restart_delay: Duration) -> Self {
        let (supervisor_tx, supervisor_rx) = mpsc::channel::<ControlMessage>(512);
        Self {
            actor_factories: HashMap::new(),
            handles: HashMap::new(),
            pending_restarts: HashMap::new(),
            scheduler: RefreshScheduler::new(),
            restart_delay,
            supervisor_tx,
            supervisor_rx,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<ControlMessage> {
        self.supervisor_tx.clone()
    }

    pub fn register_actor(&mut self, actor_type: ActorType, factory: ActorFactory) {
        self.actor_factories.insert(actor_type, factory);
    }

    pub fn scheduler_mut(&mut self) -> &mut RefreshScheduler {
        &mut self.scheduler
    }

    /// Runs until a `Teardown` arrives.
    pub async fn start(mut self) {
        let actors: Vec<ActorType> = self.actor_factories.keys().copied().collect();
        actors.into_iter().for_each(|actor| self.spawn_actor(actor));

        while let Some(msg) = self.supervisor_rx.recv().await {
            match msg {
                ControlMessage::Closed(actor_type) => {
                    self.handles.remove(&actor_type);
                    self.schedule_restart(actor_type);
                }
                ControlMessage::Restart(actor_type) => {
                    self.pending_restarts.remove(&actor_type);
                    self.spawn_actor(actor_type);
                }
                ControlMessage::Error(actor_type, error_msg) => {
                    error!("Actor {:?} reported error: {}", actor_type, error_msg);
                }
                ControlMessage::Teardown(ack) => {
                    let aborted = self.abort_all();
                    info!("Supervisor torn down ({} tasks aborted)", aborted);
                    let _ = ack.send(());
                    break;
                }
            }
        }
    }

    fn schedule_restart(&mut self, actor_type: ActorType) {
        if self
            .pending_restarts
            .get(&actor_type)
            .is_some_and(|h| !h.is_finished())
        {
            debug!("{:?} restart already pending", actor_type);
            return;
        }

        warn!("{:?} closed, restarting in {:?}", actor_type, self.restart_delay);
        let tx = self.supervisor_tx.clone();
        let delay = self.restart_delay;
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(ControlMessage::Restart(actor_type)).await;
        });
        self.pending_restarts.insert(actor_type, handle);
    }

    fn spawn_actor(&mut self, actor_type: ActorType) {
        let Some(factory) = self.actor_factories.get(&actor_type) else {
            error!("No factory registered for {:?}", actor_type);
            return;
        };

        if let Some(previous) = self.handles.remove(&actor_type) {
            previous.abort();
        }

        let mut new_actor = factory();
        let tx = self.supervisor_tx.clone();
        debug!("Spawning {:?} ({})", actor_type, new_actor.id());
        let new_actor_handle = tokio::spawn(async move {
            if let Err(e) = new_actor.run(tx.clone()).await {
                error!("Actor {:?} crashed: {}", actor_type, e);
            }
            let _ = tx.send(ControlMessage::Closed(actor_type)).await;
        });
        self.handles.insert(actor_type, new_actor_handle);
    }

    fn abort_all(&mut self) -> usize {
        let mut aborted = 0;
        for (_, handle) in self.handles.drain().chain(self.pending_restarts.drain()) {
            handle.abort();
            aborted += 1;
        }
        aborted + self.scheduler.cancel_all()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::models::View;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;
    use uuid::Uuid;

    use crate::services::refresh_scheduler::RefreshTask;
    use crate::test_helpers::CountingTarget;

    #[derive(Default)]
    struct Gauges {
        starts: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    struct Running(Arc<Gauges>);

    impl Drop for Running {
        fn drop(&mut self) {
            self.0.running.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Stays "connected" for `lifetime`, then closes.
    struct FakeChannel {
        id: Uuid,
        lifetime: Duration,
        gauges: Arc<Gauges>,
    }

    #[async_trait]
    impl Actor for FakeChannel {
        fn name(&self) -> ActorType {
            ActorType::LiveChannelActor
        }

        fn id(&self) -> Uuid {
            self.id
        }

        async fn run(&mut self, _tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
            self.gauges.starts.fetch_add(1, Ordering::SeqCst);
            let now = self.gauges.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.gauges.max_running.fetch_max(now, Ordering::SeqCst);
            let _running = Running(self.gauges.clone());
            time::sleep(self.lifetime).await;
            Ok(())
        }
    }

    fn supervisor_with(lifetime: Duration, gauges: Arc<Gauges>) -> Supervisor {
        let mut supervisor = Supervisor::new(Duration::from_secs(5));
        supervisor.register_actor(
            ActorType::LiveChannelActor,
            Box::new(move || {
                Box::new(FakeChannel {
                    id: Uuid::new_v4(),
                    lifetime,
                    gauges: gauges.clone(),
                }) as Box<dyn Actor>
            }),
        );
        supervisor
    }

    async fn teardown(tx: &mpsc::Sender<ControlMessage>) {
        let (ack_tx, ack_rx) = oneshot::channel();
        tx.send(ControlMessage::Teardown(ack_tx)).await.unwrap();
        ack_rx.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_comes_back_once_after_the_delay() {
        let gauges = Arc::new(Gauges::default());
        let supervisor = supervisor_with(Duration::from_secs(1), gauges.clone());
        let tx = supervisor.sender();
        let handle = tokio::spawn(supervisor.start());

        // Closes at 1s, restart due at 6s.
        time::sleep(Duration::from_millis(5_900)).await;
        assert_eq!(gauges.starts.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(gauges.starts.load(Ordering::SeqCst), 2);

        // Second close at 7.1s, restart at 12.1s.
        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(gauges.starts.load(Ordering::SeqCst), 3);
        assert_eq!(gauges.max_running.load(Ordering::SeqCst), 1);

        teardown(&tx).await;
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_the_pending_reconnection() {
        let gauges = Arc::new(Gauges::default());
        let supervisor = supervisor_with(Duration::from_secs(1), gauges.clone());
        let tx = supervisor.sender();
        let handle = tokio::spawn(supervisor.start());

        time::sleep(Duration::from_secs(2)).await;
        teardown(&tx).await;
        handle.await.unwrap();

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(gauges.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_closes_an_open_channel_and_stops_refreshes() {
        let gauges = Arc::new(Gauges::default());
        let mut supervisor = supervisor_with(Duration::from_secs(3600), gauges.clone());
        let target = CountingTarget::new(View::Dashboard);
        supervisor
            .scheduler_mut()
            .schedule(RefreshTask::Dashboard, Duration::from_secs(30), target.clone());
        let tx = supervisor.sender();
        let handle = tokio::spawn(supervisor.start());

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(gauges.running.load(Ordering::SeqCst), 1);
        assert_eq!(target.count(View::Dashboard), 1);

        teardown(&tx).await;
        handle.await.unwrap();
        time::sleep(Duration::from_millis(1)).await;

        assert_eq!(gauges.running.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(target.count(View::Dashboard), 1);
        assert_eq!(gauges.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_are_not_fatal() {
        let gauges = Arc::new(Gauges::default());
        let supervisor = supervisor_with(Duration::from_secs(3600), gauges.clone());
        let tx = supervisor.sender();
        let handle = tokio::spawn(supervisor.start());

        tx.send(ControlMessage::Error(ActorType::LiveChannelActor, "bad frame".to_string()))
            .await
            .unwrap();
        time::sleep(Duration::from_secs(10)).await;
        assert!(!handle.is_finished());
        assert_eq!(gauges.running.load(Ordering::SeqCst), 1);

        teardown(&tx).await;
        handle.await.unwrap();
    }
}
