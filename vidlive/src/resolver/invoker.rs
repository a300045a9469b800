use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::types::{ChannelRequest, ResolutionResult, ResolveError};

/// Flags always passed to the resolver: print the URL only, strip ads, low latency.
pub const FIXED_FLAGS: [&str; 3] = [
    "--stream-url",
    "--twitch-disable-ads",
    "--twitch-low-latency",
];

const CHANNEL_HOST: &str = "twitch.tv";

/**
    Converts a channel request into a playable media URL.
*/
#[async_trait]
pub trait StreamResolver: Send + Sync + 'static {
    async fn resolve(
        &self,
        request: &ChannelRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ResolutionResult;
}

/**
    Resolver backed by an external streamlink-compatible CLI.

    `launcher_args` are placed between the program and the per-request
    arguments, so wrappers such as `python3 -m streamlink` work.
*/
#[derive(Debug, Clone)]
pub struct ProcessResolver {
    program: PathBuf,
    launcher_args: Vec<String>,
}

impl ProcessResolver {
    pub fn new(program: impl Into<PathBuf>, launcher_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            launcher_args,
        }
    }

    pub fn command_args(&self, request: &ChannelRequest) -> Vec<String> {
        let mut args = self.launcher_args.clone();
        args.push(format!("{}/{}", CHANNEL_HOST, request.channel()));
        args.push(request.quality().token().to_string());
        args.extend(FIXED_FLAGS.iter().map(|flag| flag.to_string()));
        args
    }
}

struct RawOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

enum Outcome {
    Exited(io::Result<RawOutput>),
    Cancelled,
    TimedOut,
}

#[async_trait]
impl StreamResolver for ProcessResolver {
    async fn resolve(
        &self,
        request: &ChannelRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ResolutionResult {
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let args = self.command_args(request);
        debug!(program = %self.program.display(), ?args, "spawning resolver");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ResolveError::SpawnFailed(format!("{}: {}", self.program.display(), e)))?;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = tokio::time::sleep(timeout) => Outcome::TimedOut,
            result = collect_output(&mut child) => Outcome::Exited(result),
        };

        match outcome {
            Outcome::Exited(Ok(output)) => interpret_output(&output),
            Outcome::Exited(Err(e)) => {
                terminate(&mut child).await;
                Err(ResolveError::SpawnFailed(format!(
                    "lost contact with resolver: {}",
                    e
                )))
            }
            Outcome::Cancelled => {
                terminate(&mut child).await;
                debug!(channel = %request.channel(), "resolver cancelled");
                Err(ResolveError::Cancelled)
            }
            Outcome::TimedOut => {
                terminate(&mut child).await;
                warn!(channel = %request.channel(), ?timeout, "resolver timed out");
                Err(ResolveError::Timeout(timeout))
            }
        }
    }
}

async fn collect_output(child: &mut Child) -> io::Result<RawOutput> {
    let (stdout, stderr) = tokio::try_join!(
        read_pipe(child.stdout.take()),
        read_pipe(child.stderr.take())
    )?;
    let status = child.wait().await?;
    Ok(RawOutput {
        status,
        stdout,
        stderr,
    })
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/**
    Kill the resolver if it is still running and reap it.

    Returns only once the process has exited.
*/
async fn terminate(child: &mut Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.start_kill() {
        debug!("resolver kill failed: {}", e);
    }
    if let Err(e) = child.wait().await {
        warn!("failed to reap resolver: {}", e);
    }
}

fn interpret_output(output: &RawOutput) -> ResolutionResult {
    let stdout = String::from_utf8_lossy(&output.stdout);

    if output.status.success() {
        let line = last_line(&stdout).unwrap_or_default();
        return match parse_media_url(line) {
            Some(url) => {
                info!(url = %url, "resolver produced stream URL");
                Ok(url)
            }
            None => Err(ResolveError::UnparsableOutput(if line.is_empty() {
                "empty output".to_string()
            } else {
                line.to_string()
            })),
        };
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = last_line(&stderr)
        .or_else(|| last_line(&stdout))
        .map(strip_error_prefix)
        .map(str::to_string)
        .unwrap_or_else(|| match output.status.code() {
            Some(code) => format!("resolver exited with status {}", code),
            None => "resolver was terminated by a signal".to_string(),
        });

    Err(ResolveError::NonZeroExit {
        code: output.status.code(),
        message,
    })
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rev().find(|l| !l.is_empty())
}

fn strip_error_prefix(line: &str) -> &str {
    line.strip_prefix("error:").map(str::trim_start).unwrap_or(line)
}

/**
    Accept only absolute URLs with a host; rejects things like `error: ...`
    which the URL grammar would otherwise read as a scheme.
*/
pub fn parse_media_url(text: &str) -> Option<Url> {
    let url = Url::parse(text.trim()).ok()?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return None;
    }
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::types::{ChannelId, Quality, ResolverErrorKind};

    fn request(channel: &str) -> ChannelRequest {
        ChannelRequest::new(ChannelId::parse(channel).unwrap(), Quality::Best)
    }

    /// Resolver running `script` through `sh -c`; per-request args arrive as `$1..`.
    fn shell_resolver(script: &str) -> ProcessResolver {
        ProcessResolver::new(
            "/bin/sh",
            vec!["-c".to_string(), script.to_string(), "resolver".to_string()],
        )
    }

    #[test]
    fn test_command_args() {
        let resolver = ProcessResolver::new("streamlink", Vec::new());
        let req = ChannelRequest::new(
            ChannelId::parse("alpha").unwrap(),
            Quality::Specific("720p60".into()),
        );
        assert_eq!(
            resolver.command_args(&req),
            vec![
                "twitch.tv/alpha",
                "720p60",
                "--stream-url",
                "--twitch-disable-ads",
                "--twitch-low-latency",
            ]
        );
    }

    #[test]
    fn test_parse_media_url() {
        assert!(parse_media_url("https://video.example.net/live/index.m3u8").is_some());
        assert!(parse_media_url("  https://example.com/a.m3u8\n").is_some());
        assert!(parse_media_url("error: No playable streams found").is_none());
        assert!(parse_media_url("/relative/path.m3u8").is_none());
        assert!(parse_media_url("").is_none());
    }

    #[tokio::test]
    async fn test_success_returns_url() {
        let resolver = shell_resolver("echo 'https://video.example.net/alpha.m3u8'");
        let url = resolver
            .resolve(&request("alpha"), Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(url.as_str(), "https://video.example.net/alpha.m3u8");
    }

    #[tokio::test]
    async fn test_passes_channel_quality_and_fixed_flags() {
        let dir = tempfile::tempdir().unwrap();
        let args_file = dir.path().join("args");
        let script = format!(
            "echo \"$@\" > '{}'; echo https://example.com/x.m3u8",
            args_file.display()
        );
        shell_resolver(&script)
            .resolve(&request("alpha"), Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();

        let recorded = std::fs::read_to_string(&args_file).unwrap();
        assert_eq!(
            recorded.trim(),
            "twitch.tv/alpha best --stream-url --twitch-disable-ads --twitch-low-latency"
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_uses_stderr() {
        let resolver = shell_resolver("echo 'No playable streams found' >&2; exit 1");
        let err = resolver
            .resolve(&request("alpha"), Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::NonZeroExit {
                code: Some(1),
                message: "No playable streams found".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_error_prefix_stripped() {
        let resolver = shell_resolver(
            "echo '[cli][info] Found matching plugin twitch'; \
             echo 'error: No playable streams found on this URL: twitch.tv/alpha'; exit 1",
        );
        let err = resolver
            .resolve(&request("alpha"), Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No playable streams found on this URL: twitch.tv/alpha"
        );
    }

    #[tokio::test]
    async fn test_unparsable_output() {
        let resolver = shell_resolver("echo 'not a url'");
        let err = resolver
            .resolve(&request("alpha"), Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ResolverErrorKind::UnparsableOutput);
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_failure() {
        let resolver = ProcessResolver::new("/nonexistent/vidlive-resolver", Vec::new());
        let err = resolver
            .resolve(&request("alpha"), Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ResolverErrorKind::SpawnFailed);
    }

    #[tokio::test]
    async fn test_timeout_kills_resolver() {
        let resolver = shell_resolver("exec sleep 30");
        let started = std::time::Instant::now();
        let err = resolver
            .resolve(&request("alpha"), Duration::from_millis(200), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ResolverErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_leaves_no_process_behind() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());
        let resolver = shell_resolver(&script);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let pid_path = pid_file.clone();
        tokio::spawn(async move {
            while !pid_path.exists() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            trigger.cancel();
        });

        let err = resolver
            .resolve(&request("alpha"), Duration::from_secs(20), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let alive = std::process::Command::new("kill")
            .args(["-0", pid.trim()])
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success());
    }

    #[tokio::test]
    async fn test_already_cancelled_never_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let resolver = shell_resolver(&format!("touch '{}'", marker.display()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = resolver
            .resolve(&request("alpha"), Duration::from_secs(5), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!marker.exists());
    }
}
