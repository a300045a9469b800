use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Identity of one bound player instance. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/**
    Reference to the player instance currently bound to a media URL.

    The instance itself stays owned by the adapter; holders of a handle can
    only read it.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerHandle {
    id: HandleId,
    url: Url,
}

impl PlayerHandle {
    pub(super) fn new(id: HandleId, url: Url) -> Self {
        Self { id, url }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Notifications from a running player instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Playback reached the end of the stream. Sent once per playback run.
    EndOfStream(HandleId),
    /// The player went away on its own (window closed, process crashed).
    Closed(HandleId),
}

pub type PlayerEventSender = mpsc::UnboundedSender<PlayerEvent>;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("failed to launch player: {0}")]
    Launch(String),

    #[error("player control failed: {0}")]
    Ipc(String),

    #[error("no player is bound")]
    NotBound,
}

/**
    A native playback surface able to start player instances.
*/
#[async_trait]
pub trait PlayerSurface: Send + Sync + 'static {
    /**
        Start playing `url` in a new instance identified by `id`.

        The instance starts unpaused and reports through `events`.
    */
    async fn launch(
        &self,
        id: HandleId,
        url: &Url,
        events: PlayerEventSender,
    ) -> Result<Box<dyn PlayerInstance>, PlayerError>;
}

/**
    A live player instance bound to exactly one media URL.
*/
#[async_trait]
pub trait PlayerInstance: Send {
    async fn play(&mut self) -> Result<(), PlayerError>;

    async fn pause(&mut self) -> Result<(), PlayerError>;

    /// Seek to the start and resume playback; re-arms end-of-stream.
    async fn replay(&mut self) -> Result<(), PlayerError>;

    /// Release all native resources. Must not return before they are gone.
    async fn shutdown(&mut self);
}
