use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use super::surface::{
    HandleId, PlayerError, PlayerEvent, PlayerEventSender, PlayerInstance, PlayerSurface,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_POLL: Duration = Duration::from_millis(50);
const QUIT_GRACE: Duration = Duration::from_secs(2);
const EOF_OBSERVER_ID: u64 = 1;

/**
    Playback surface backed by mpv, driven over its JSON IPC socket.

    Each handle gets its own mpv process and socket. `--keep-open` keeps the
    window on the last frame at end of stream so the engine can decide
    whether to replay.
*/
#[derive(Debug, Clone)]
pub struct MpvSurface {
    program: PathBuf,
    extra_args: Vec<String>,
    socket_dir: PathBuf,
}

impl MpvSurface {
    pub fn new(program: impl Into<PathBuf>, extra_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            extra_args,
            socket_dir: std::env::temp_dir(),
        }
    }

    pub fn launch_args(&self, socket: &Path, url: &Url) -> Vec<String> {
        let mut args = vec![
            format!("--input-ipc-server={}", socket.display()),
            "--keep-open=yes".to_string(),
            "--force-window=immediate".to_string(),
            "--no-terminal".to_string(),
            "--title=vidlive".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    fn socket_path(&self, id: HandleId) -> PathBuf {
        self.socket_dir
            .join(format!("vidlive-{}-{}.sock", std::process::id(), id.0))
    }
}

#[async_trait]
impl PlayerSurface for MpvSurface {
    async fn launch(
        &self,
        id: HandleId,
        url: &Url,
        events: PlayerEventSender,
    ) -> Result<Box<dyn PlayerInstance>, PlayerError> {
        let socket_path = self.socket_path(id);
        let _ = tokio::fs::remove_file(&socket_path).await;

        debug!(handle = %id, program = %self.program.display(), "launching mpv");
        let mut child = Command::new(&self.program)
            .args(self.launch_args(&socket_path, url))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlayerError::Launch(format!("{}: {}", self.program.display(), e)))?;

        let stream = match connect_ipc(&socket_path, &mut child).await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(e);
            }
        };

        let (reader, writer) = stream.into_split();
        let eof_armed = Arc::new(AtomicBool::new(true));
        let reader_task = tokio::spawn(read_events(id, reader, Arc::clone(&eof_armed), events));

        let mut instance = MpvInstance {
            id,
            child,
            writer,
            reader_task,
            eof_armed,
            socket_path,
        };

        if let Err(e) = instance
            .send(json!(["observe_property", EOF_OBSERVER_ID, "eof-reached"]))
            .await
        {
            instance.shutdown().await;
            return Err(e);
        }

        Ok(Box::new(instance))
    }
}

async fn connect_ipc(path: &Path, child: &mut Child) -> Result<UnixStream, PlayerError> {
    let deadline = Instant::now() + CONNECT_TIMEOUT;

    loop {
        if let Ok(stream) = UnixStream::connect(path).await {
            return Ok(stream);
        }

        if let Ok(Some(status)) = child.try_wait() {
            return Err(PlayerError::Launch(format!(
                "mpv exited ({}) before opening its control socket",
                status
            )));
        }

        if Instant::now() > deadline {
            return Err(PlayerError::Launch(
                "timed out waiting for mpv control socket".to_string(),
            ));
        }

        tokio::time::sleep(CONNECT_POLL).await;
    }
}

async fn read_events(
    id: HandleId,
    reader: OwnedReadHalf,
    eof_armed: Arc<AtomicBool>,
    events: PlayerEventSender,
) {
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if is_end_of_stream(&line) && eof_armed.swap(false, Ordering::SeqCst) {
                    debug!(handle = %id, "mpv reached end of stream");
                    let _ = events.send(PlayerEvent::EndOfStream(id));
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(handle = %id, "mpv control socket error: {}", e);
                break;
            }
        }
    }

    let _ = events.send(PlayerEvent::Closed(id));
}

#[derive(Debug, Deserialize)]
struct IpcMessage {
    event: Option<String>,
    name: Option<String>,
    data: Option<Value>,
}

/**
    True for the property-change push mpv sends when `eof-reached` turns on.
*/
pub fn is_end_of_stream(line: &str) -> bool {
    let Ok(message) = serde_json::from_str::<IpcMessage>(line) else {
        return false;
    };

    message.event.as_deref() == Some("property-change")
        && message.name.as_deref() == Some("eof-reached")
        && message.data == Some(Value::Bool(true))
}

/// Encode an mpv IPC command as a newline-terminated JSON line.
pub fn command_line(command: Value) -> String {
    let mut line = json!({ "command": command }).to_string();
    line.push('\n');
    line
}

struct MpvInstance {
    id: HandleId,
    child: Child,
    writer: OwnedWriteHalf,
    reader_task: JoinHandle<()>,
    eof_armed: Arc<AtomicBool>,
    socket_path: PathBuf,
}

impl MpvInstance {
    async fn send(&mut self, command: Value) -> Result<(), PlayerError> {
        self.writer
            .write_all(command_line(command).as_bytes())
            .await
            .map_err(|e| PlayerError::Ipc(e.to_string()))
    }
}

#[async_trait]
impl PlayerInstance for MpvInstance {
    async fn play(&mut self) -> Result<(), PlayerError> {
        self.send(json!(["set_property", "pause", false])).await
    }

    async fn pause(&mut self) -> Result<(), PlayerError> {
        self.send(json!(["set_property", "pause", true])).await
    }

    async fn replay(&mut self) -> Result<(), PlayerError> {
        self.eof_armed.store(true, Ordering::SeqCst);
        self.send(json!(["seek", 0, "absolute"])).await?;
        self.play().await
    }

    async fn shutdown(&mut self) {
        self.reader_task.abort();
        let _ = self.send(json!(["quit"])).await;

        if tokio::time::timeout(QUIT_GRACE, self.child.wait())
            .await
            .is_err()
        {
            warn!(handle = %self.id, "mpv ignored quit, killing");
            let _ = self.child.start_kill();
            let _ = self.child.wait().await;
        }

        let _ = tokio::fs::remove_file(&self.socket_path).await;
        debug!(handle = %self.id, "mpv stopped");
    }
}
