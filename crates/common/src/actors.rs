use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorType {
    LiveChannelActor,
}

/// Messages sent to the Supervisor
pub enum ControlMessage {
    /// The actor's run loop returned, cleanly or not.
    Closed(ActorType),
    /// A delayed restart is due.
    Restart(ActorType),
    Error(ActorType, String),
    /// Abort every task owned by the supervisor, then acknowledge.
    Teardown(oneshot::Sender<()>),
}

impl std::fmt::Debug for ControlMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed(actor_type) => write!(f, "Closed({:?})", actor_type),
            Self::Restart(actor_type) => write!(f, "Restart({:?})", actor_type),
            Self::Error(actor_type, err) => write!(f, "Error({:?}, {})", actor_type, err),
            Self::Teardown(_) => write!(f, "Teardown"),
        }
    }
}

/// The trait that all restartable services must implement
#[async_trait]
pub trait Actor: Send + Sync {
    /// The kind of the actor, used by the supervisor as its key.
    fn name(&self) -> ActorType;

    /// Unique per instance, so restarts can be told apart in the logs.
    fn id(&self) -> Uuid;

    /// The main loop of the actor.
    /// Returning (with or without an error) means the actor is done; the
    /// supervisor decides whether it comes back.
    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()>;
}
