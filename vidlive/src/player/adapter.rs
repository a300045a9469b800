use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

use super::surface::{
    HandleId, PlayerError, PlayerEvent, PlayerEventSender, PlayerHandle, PlayerInstance,
    PlayerSurface,
};

struct Bound {
    handle: PlayerHandle,
    instance: Box<dyn PlayerInstance>,
}

/**
    Owns the single player instance shown on the playback surface.

    Binding a new URL always disposes the previous instance first, so two
    instances are never alive at the same time.
*/
pub struct PlayerAdapter {
    surface: Arc<dyn PlayerSurface>,
    bound: Option<Bound>,
    next_id: u64,
    events: PlayerEventSender,
}

impl PlayerAdapter {
    /// Create an adapter and the receiver for its end-of-stream / closed events.
    pub fn new(surface: Arc<dyn PlayerSurface>) -> (Self, mpsc::UnboundedReceiver<PlayerEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let adapter = Self {
            surface,
            bound: None,
            next_id: 0,
            events,
        };
        (adapter, events_rx)
    }

    pub fn current(&self) -> Option<&PlayerHandle> {
        self.bound.as_ref().map(|b| &b.handle)
    }

    pub fn is_current(&self, id: HandleId) -> bool {
        self.current().is_some_and(|h| h.id() == id)
    }

    /**
        Bind `url` to a fresh player instance, disposing any current one.
    */
    pub async fn bind(&mut self, url: Url) -> Result<PlayerHandle, PlayerError> {
        self.dispose().await;

        self.next_id += 1;
        let id = HandleId(self.next_id);

        let instance = self.surface.launch(id, &url, self.events.clone()).await?;
        let handle = PlayerHandle::new(id, url);
        info!(handle = %id, url = %handle.url(), "player bound");

        self.bound = Some(Bound {
            handle: handle.clone(),
            instance,
        });
        Ok(handle)
    }

    pub async fn play(&mut self) -> Result<(), PlayerError> {
        self.instance()?.play().await
    }

    pub async fn pause(&mut self) -> Result<(), PlayerError> {
        self.instance()?.pause().await
    }

    pub async fn replay(&mut self) -> Result<(), PlayerError> {
        self.instance()?.replay().await
    }

    /**
        Tear down the current instance, if any. Returns once its native
        resources are released.
    */
    pub async fn dispose(&mut self) {
        if let Some(mut bound) = self.bound.take() {
            debug!(handle = %bound.handle.id(), "disposing player");
            bound.instance.shutdown().await;
        }
    }

    fn instance(&mut self) -> Result<&mut Box<dyn PlayerInstance>, PlayerError> {
        self.bound
            .as_mut()
            .map(|b| &mut b.instance)
            .ok_or(PlayerError::NotBound)
    }
}
