use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::invoker::StreamResolver;
use super::types::{ChannelRequest, ResolutionResult};

/// Lifecycle of a resolution session. Everything but `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Resolved,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Pending)
    }
}

/// Result of a session, tagged with the sequence number it was started under.
#[derive(Debug)]
pub struct SessionReport {
    pub seq: u64,
    pub result: ResolutionResult,
}

/**
    One cancellable resolver invocation for one channel request.

    The resolver runs on its own task and reports back through the engine's
    result channel. A session that was cancelled never reports.
*/
pub struct ResolutionSession {
    seq: u64,
    request: ChannelRequest,
    state: Arc<Mutex<SessionState>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ResolutionSession {
    /**
        Start resolving `request` on a worker task.

        `previous` is the worker of the session this one supersedes; it is
        awaited before the resolver is invoked so at most one resolver
        process exists per engine.
    */
    pub fn start(
        seq: u64,
        request: ChannelRequest,
        resolver: Arc<dyn StreamResolver>,
        timeout: Duration,
        previous: Option<JoinHandle<()>>,
        reports: mpsc::UnboundedSender<SessionReport>,
    ) -> Self {
        let state = Arc::new(Mutex::new(SessionState::Pending));
        let cancel = CancellationToken::new();

        let task = {
            let state = Arc::clone(&state);
            let cancel = cancel.clone();
            let request = request.clone();
            tokio::spawn(async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }

                let result = resolver.resolve(&request, timeout, &cancel).await;

                let next = match &result {
                    Ok(_) => SessionState::Resolved,
                    Err(e) if e.is_cancelled() => SessionState::Cancelled,
                    Err(_) => SessionState::Failed,
                };

                {
                    let mut state = state.lock();
                    if state.is_terminal() {
                        debug!(seq, "session already cancelled, dropping result");
                        return;
                    }
                    *state = next;
                }

                if next == SessionState::Cancelled {
                    return;
                }
                let _ = reports.send(SessionReport { seq, result });
            })
        };

        Self {
            seq,
            request,
            state,
            cancel,
            task,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn request(&self) -> &ChannelRequest {
        &self.request
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /**
        Request termination of the resolver. Idempotent, and a no-op once
        the session has completed.
    */
    pub fn cancel(&self) {
        {
            let mut state = self.state.lock();
            if state.is_terminal() {
                return;
            }
            *state = SessionState::Cancelled;
        }
        debug!(seq = self.seq, channel = %self.request.channel(), "cancelling session");
        self.cancel.cancel();
    }

    /// Hand over the worker so the next session (or shutdown) can wait on its cleanup.
    pub fn into_task(self) -> JoinHandle<()> {
        self.task
    }
}
