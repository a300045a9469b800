use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::player::{PlayerAdapter, PlayerEvent, PlayerSurface};
use crate::resolver::{ChannelRequest, ResolutionSession, SessionReport, StreamResolver};

use super::state::PlaybackState;

pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub resolve_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

/// User-facing intents the engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    SelectChannel(ChannelRequest),
    /// Re-resolve the current channel. Also the retry action after an error.
    Reload,
    TogglePlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("playback engine has stopped")]
pub struct EngineStopped;

enum Command {
    Trigger(Trigger),
    Dispose,
}

/**
    Handle to a running engine task.

    Triggers are queued and applied one at a time by the engine task;
    state changes are observed through [`EngineHandle::subscribe`].
*/
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PlaybackState>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    pub fn send(&self, trigger: Trigger) -> Result<(), EngineStopped> {
        self.commands
            .send(Command::Trigger(trigger))
            .map_err(|_| EngineStopped)
    }

    pub fn select_channel(&self, request: ChannelRequest) -> Result<(), EngineStopped> {
        self.send(Trigger::SelectChannel(request))
    }

    pub fn reload(&self) -> Result<(), EngineStopped> {
        self.send(Trigger::Reload)
    }

    pub fn toggle_play(&self) -> Result<(), EngineStopped> {
        self.send(Trigger::TogglePlay)
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    /**
        Stop the engine: cancel any resolution, tear down the player and
        wait until both are gone.
    */
    pub async fn dispose(self) {
        let _ = self.commands.send(Command::Dispose);
        if let Err(e) = self.task.await {
            error!("playback engine task failed: {}", e);
        }
    }
}

/// Channels feeding results back into the engine task.
pub struct EngineInbox {
    pub reports: mpsc::UnboundedReceiver<SessionReport>,
    pub player_events: mpsc::UnboundedReceiver<PlayerEvent>,
}

/**
    The playback handoff state machine.

    Owns the playback state, the current resolution session and the player
    adapter. Every transition that starts a session first cancels the old
    one and bumps the sequence number, and only a report carrying the
    current sequence number is ever applied.
*/
pub struct HandoffEngine {
    resolver: Arc<dyn StreamResolver>,
    adapter: PlayerAdapter,
    config: EngineConfig,
    state: watch::Sender<PlaybackState>,
    seq: u64,
    session: Option<ResolutionSession>,
    reports: mpsc::UnboundedSender<SessionReport>,
}

impl HandoffEngine {
    pub fn new(
        config: EngineConfig,
        resolver: Arc<dyn StreamResolver>,
        surface: Arc<dyn PlayerSurface>,
    ) -> (Self, EngineInbox) {
        let (reports, reports_rx) = mpsc::unbounded_channel();
        let (adapter, player_events) = PlayerAdapter::new(surface);
        let (state, _) = watch::channel(PlaybackState::Idle);

        let engine = Self {
            resolver,
            adapter,
            config,
            state,
            seq: 0,
            session: None,
            reports,
        };
        let inbox = EngineInbox {
            reports: reports_rx,
            player_events,
        };
        (engine, inbox)
    }

    /// Start the engine on its own task.
    pub fn spawn(
        config: EngineConfig,
        resolver: Arc<dyn StreamResolver>,
        surface: Arc<dyn PlayerSurface>,
    ) -> EngineHandle {
        let (engine, inbox) = Self::new(config, resolver, surface);
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let state = engine.subscribe();
        let task = tokio::spawn(engine.run(commands_rx, inbox));

        EngineHandle {
            commands,
            state,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, mut inbox: EngineInbox) {
        info!("playback engine started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Trigger(trigger)) => self.handle(trigger).await,
                    Some(Command::Dispose) | None => break,
                },
                Some(report) = inbox.reports.recv() => self.apply_report(report).await,
                Some(event) = inbox.player_events.recv() => self.handle_player_event(event).await,
            }
        }

        self.shutdown().await;
    }

    pub async fn handle(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::SelectChannel(request) => self.select_channel(request).await,
            Trigger::Reload => self.reload().await,
            Trigger::TogglePlay => self.toggle_play().await,
        }
    }

    async fn select_channel(&mut self, request: ChannelRequest) {
        let already_playing = matches!(
            &*self.state.borrow(),
            PlaybackState::Ready { request: current, .. } if *current == request
        );
        if already_playing {
            debug!(channel = %request.channel(), "channel already playing");
            return;
        }

        self.start_resolution(request).await;
    }

    async fn reload(&mut self) {
        let request = self.state.borrow().request().cloned();
        match request {
            Some(request) => self.start_resolution(request).await,
            None => debug!("reload ignored, no channel selected"),
        }
    }

    async fn toggle_play(&mut self) {
        let (request, url, is_playing) = match &*self.state.borrow() {
            PlaybackState::Ready {
                request,
                url,
                is_playing,
            } => (request.clone(), url.clone(), *is_playing),
            other => {
                debug!(state = other.label(), "toggle ignored, nothing is playing");
                return;
            }
        };

        let result = if is_playing {
            self.adapter.pause().await
        } else {
            self.adapter.play().await
        };

        match result {
            Ok(()) => self.publish(PlaybackState::Ready {
                request,
                url,
                is_playing: !is_playing,
            }),
            Err(e) => warn!(channel = %request.channel(), "toggle play failed: {}", e),
        }
    }

    /**
        Supersede whatever is going on with a fresh resolution of `request`.
    */
    async fn start_resolution(&mut self, request: ChannelRequest) {
        self.adapter.dispose().await;

        let previous = self.session.take().map(|session| {
            debug!(seq = session.seq(), state = ?session.state(), "superseding session");
            session.cancel();
            session.into_task()
        });

        self.seq += 1;
        let seq = self.seq;
        info!(
            channel = %request.channel(),
            quality = %request.quality(),
            seq,
            "resolving stream"
        );

        self.session = Some(ResolutionSession::start(
            seq,
            request.clone(),
            Arc::clone(&self.resolver),
            self.config.resolve_timeout,
            previous,
            self.reports.clone(),
        ));
        self.publish(PlaybackState::Resolving { request, seq });
    }

    pub async fn apply_report(&mut self, report: SessionReport) {
        let awaiting = matches!(
            &*self.state.borrow(),
            PlaybackState::Resolving { seq, .. } if *seq == report.seq
        );
        if !awaiting || report.seq != self.seq {
            debug!(seq = report.seq, current = self.seq, "discarding stale resolution result");
            return;
        }

        let Some(request) = self.session.as_ref().map(|s| s.request().clone()) else {
            return;
        };

        match report.result {
            Ok(url) => match self.adapter.bind(url).await {
                Ok(handle) => {
                    info!(channel = %request.channel(), handle = %handle.id(), "playback started");
                    self.publish(PlaybackState::Ready {
                        request,
                        url: handle.url().clone(),
                        is_playing: true,
                    });
                }
                Err(e) => {
                    error!(channel = %request.channel(), "player failed: {}", e);
                    self.publish(PlaybackState::Error {
                        request,
                        message: e.to_string(),
                    });
                }
            },
            Err(e) if e.is_cancelled() => {
                debug!(seq = report.seq, "ignoring cancelled resolution");
            }
            Err(e) => {
                warn!(channel = %request.channel(), kind = ?e.kind(), "resolution failed: {}", e);
                self.publish(PlaybackState::Error {
                    request,
                    message: e.to_string(),
                });
            }
        }
    }

    pub async fn handle_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::EndOfStream(id) => {
                if !self.adapter.is_current(id) {
                    debug!(handle = %id, "end of stream from disposed player");
                    return;
                }
                if !self.state.borrow().is_playing() {
                    debug!(handle = %id, "end of stream while paused, not replaying");
                    return;
                }
                match self.adapter.replay().await {
                    Ok(()) => debug!(handle = %id, "replaying from start"),
                    Err(e) => warn!(handle = %id, "replay failed: {}", e),
                }
            }
            PlayerEvent::Closed(id) => {
                if !self.adapter.is_current(id) {
                    return;
                }
                let request = self.state.borrow().request().cloned();
                self.adapter.dispose().await;
                if let Some(request) = request {
                    warn!(channel = %request.channel(), handle = %id, "player closed");
                    self.publish(PlaybackState::Error {
                        request,
                        message: "player closed".to_string(),
                    });
                }
            }
        }
    }

    async fn shutdown(mut self) {
        if let Some(session) = self.session.take() {
            session.cancel();
            let _ = session.into_task().await;
        }
        self.adapter.dispose().await;
        info!("playback engine stopped");
    }

    fn publish(&self, state: PlaybackState) {
        debug!(state = state.label(), seq = self.seq, "state transition");
        self.state.send_replace(state);
    }
}
