//! In-memory resolver and player doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::player::{
    HandleId, PlayerError, PlayerEvent, PlayerEventSender, PlayerInstance, PlayerSurface,
};
use crate::resolver::{ChannelRequest, ResolutionResult, ResolveError, StreamResolver};

pub fn media_url(name: &str) -> Url {
    Url::parse(&format!("https://video.example.net/{}.m3u8", name)).unwrap()
}

/// How the fake resolver answers for one channel.
#[derive(Clone)]
pub enum Script {
    Immediate(ResolutionResult),
    /// Answer once the gate is notified.
    Gated {
        gate: Arc<Notify>,
        result: ResolutionResult,
    },
    /// Never answer; only cancellation ends the call.
    Hang,
    /// Answer once the gate is notified, even after cancellation.
    IgnoresCancel {
        gate: Arc<Notify>,
        result: ResolutionResult,
    },
}

#[derive(Default)]
struct ResolverLog {
    scripts: HashMap<String, Script>,
    calls: Vec<String>,
    cancelled: Vec<String>,
    active: usize,
    max_active: usize,
}

#[derive(Default)]
pub struct FakeResolver {
    log: Arc<Mutex<ResolverLog>>,
}

struct ActiveGuard(Arc<Mutex<ResolverLog>>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.lock().active -= 1;
    }
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, channel: &str, script: Script) {
        self.log.lock().scripts.insert(channel.to_string(), script);
    }

    /// Script `channel` to answer with `result` once the returned gate is notified.
    pub fn gate(&self, channel: &str, result: ResolutionResult) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script(
            channel,
            Script::Gated {
                gate: Arc::clone(&gate),
                result,
            },
        );
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().calls.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.log.lock().cancelled.clone()
    }

    pub fn active(&self) -> usize {
        self.log.lock().active
    }

    pub fn max_active(&self) -> usize {
        self.log.lock().max_active
    }

    pub async fn wait_for_calls(&self, n: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while self.log.lock().calls.len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "resolver was not called {} times", n);
    }
}

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn resolve(
        &self,
        request: &ChannelRequest,
        _timeout: Duration,
        cancel: &CancellationToken,
    ) -> ResolutionResult {
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let channel = request.channel().as_str().to_string();
        let script = {
            let mut log = self.log.lock();
            log.calls.push(channel.clone());
            log.active += 1;
            log.max_active = log.max_active.max(log.active);
            log.scripts.get(&channel).cloned()
        };
        let _guard = ActiveGuard(Arc::clone(&self.log));

        if let Some(Script::IgnoresCancel { gate, result }) = script {
            gate.notified().await;
            return result;
        }

        let pending = async {
            match script {
                Some(Script::Immediate(result)) => result,
                Some(Script::Gated { gate, result }) => {
                    gate.notified().await;
                    result
                }
                Some(Script::Hang) | Some(Script::IgnoresCancel { .. }) => {
                    std::future::pending().await
                }
                None => Err(ResolveError::NonZeroExit {
                    code: Some(1),
                    message: format!("no script for {}", channel),
                }),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.log.lock().cancelled.push(channel.clone());
                Err(ResolveError::Cancelled)
            }
            result = pending => result,
        }
    }
}

/// Everything the fake surface was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Launch(HandleId, Url),
    Play(HandleId),
    Pause(HandleId),
    Replay(HandleId),
    Shutdown(HandleId),
}

#[derive(Default)]
struct SurfaceLog {
    calls: Vec<SurfaceCall>,
    live: usize,
    max_live: usize,
    fail_next_launch: bool,
    last: Option<(HandleId, PlayerEventSender)>,
}

#[derive(Default)]
pub struct FakeSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.log.lock().calls.clone()
    }

    pub fn live(&self) -> usize {
        self.log.lock().live
    }

    pub fn max_live(&self) -> usize {
        self.log.lock().max_live
    }

    pub fn fail_next_launch(&self) {
        self.log.lock().fail_next_launch = true;
    }

    /// Push an end-of-stream event for the most recently launched instance.
    pub fn emit_end_of_stream(&self) {
        self.emit(PlayerEvent::EndOfStream);
    }

    /// Push a closed event for the most recently launched instance.
    pub fn emit_closed(&self) {
        self.emit(PlayerEvent::Closed);
    }

    fn emit(&self, event: fn(HandleId) -> PlayerEvent) {
        let log = self.log.lock();
        let (id, events) = log.last.as_ref().expect("nothing launched");
        events.send(event(*id)).unwrap();
    }
}

#[async_trait]
impl PlayerSurface for FakeSurface {
    async fn launch(
        &self,
        id: HandleId,
        url: &Url,
        events: PlayerEventSender,
    ) -> Result<Box<dyn PlayerInstance>, PlayerError> {
        let mut log = self.log.lock();
        if std::mem::take(&mut log.fail_next_launch) {
            return Err(PlayerError::Launch("fake launch failure".to_string()));
        }

        log.calls.push(SurfaceCall::Launch(id, url.clone()));
        log.live += 1;
        log.max_live = log.max_live.max(log.live);
        log.last = Some((id, events));

        Ok(Box::new(FakeInstance {
            id,
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeInstance {
    id: HandleId,
    log: Arc<Mutex<SurfaceLog>>,
}

#[async_trait]
impl PlayerInstance for FakeInstance {
    async fn play(&mut self) -> Result<(), PlayerError> {
        self.log.lock().calls.push(SurfaceCall::Play(self.id));
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), PlayerError> {
        self.log.lock().calls.push(SurfaceCall::Pause(self.id));
        Ok(())
    }

    async fn replay(&mut self) -> Result<(), PlayerError> {
        self.log.lock().calls.push(SurfaceCall::Replay(self.id));
        Ok(())
    }

    async fn shutdown(&mut self) {
        let mut log = self.log.lock();
        log.calls.push(SurfaceCall::Shutdown(self.id));
        log.live -= 1;
    }
}
