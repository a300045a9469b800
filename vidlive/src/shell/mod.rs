mod intent;
mod render;

use std::io::ErrorKind;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::signal;
use tracing::{info, warn};
use url::Url;

use crate::browser::{BrowserSession, FollowedChannel, LOGIN_URL};
use crate::playback::{EngineHandle, PlaybackState};
use crate::resolver::{ChannelId, ChannelRequest, Quality};

pub use intent::{HELP, Intent};
pub use render::{chat_embed_url, render_account, render_followed, render_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/**
    Terminal front end: reads intents from a line source, forwards them to
    the playback engine and prints every state change.
*/
pub struct Shell {
    engine: EngineHandle,
    browser: Arc<dyn BrowserSession>,
    quality: Quality,
    show_chat: bool,
    followed: Vec<FollowedChannel>,
}

impl Shell {
    pub fn new(
        engine: EngineHandle,
        browser: Arc<dyn BrowserSession>,
        quality: Quality,
        show_chat: bool,
    ) -> Self {
        Self {
            engine,
            browser,
            quality,
            show_chat,
            followed: Vec::new(),
        }
    }

    /**
        Run until `quit`, end of input or Ctrl-C, then dispose the engine.
    */
    pub async fn run<R>(mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut states = self.engine.subscribe();
        let ctrl_c = signal::ctrl_c();
        tokio::pin!(ctrl_c);

        self.refresh_session().await;
        println!("{}", render_state(&states.borrow_and_update()));

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("interrupted");
                    break;
                }
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = states.borrow_and_update().clone();
                    self.print_state(&state);
                }
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => break,
                        Err(e) if e.kind() == ErrorKind::InvalidData => {
                            println!("Ignoring input that is not valid UTF-8");
                            continue;
                        }
                        Err(e) => {
                            warn!("failed to read input: {}", e);
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    if self.handle_line(&line).await? == Flow::Quit {
                        break;
                    }
                }
            }
        }

        self.engine.dispose().await;
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match line.parse::<Intent>() {
            Ok(intent) => self.apply(intent).await,
            Err(e) => {
                println!("{}", e);
                Ok(Flow::Continue)
            }
        }
    }

    async fn apply(&mut self, intent: Intent) -> Result<Flow> {
        match intent {
            Intent::Select { channel, quality } => self.select(channel, quality)?,
            Intent::Followed(index) => match self.followed.get(index - 1) {
                Some(followed) => {
                    let channel = followed.channel.clone();
                    self.select(channel, None)?;
                }
                None => println!("No followed channel #{}", index),
            },
            Intent::Reload => self.engine.reload()?,
            Intent::TogglePlay => self.engine.toggle_play()?,
            Intent::ToggleChat => {
                self.show_chat = !self.show_chat;
                self.print_chat();
            }
            Intent::List => self.refresh_session().await,
            Intent::Login => {
                let url = Url::parse(LOGIN_URL)?;
                self.browser.navigate(&url).await?;
                println!("Sign in at {}", url);
            }
            Intent::Help => println!("{}", HELP),
            Intent::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn select(&self, channel: ChannelId, quality: Option<Quality>) -> Result<()> {
        let quality = quality.unwrap_or_else(|| self.quality.clone());
        self.engine
            .select_channel(ChannelRequest::new(channel, quality))?;
        Ok(())
    }

    async fn refresh_session(&mut self) {
        match self.browser.snapshot().await {
            Ok(snapshot) => {
                println!("{}", render_account(&snapshot));
                for line in render_followed(&snapshot.followed_live) {
                    println!("{}", line);
                }
                self.followed = snapshot.followed_live;
            }
            Err(e) => warn!("browser session unavailable: {}", e),
        }
    }

    fn print_state(&self, state: &PlaybackState) {
        println!("{}", render_state(state));
        if self.show_chat && matches!(state, PlaybackState::Ready { .. }) {
            self.print_chat();
        }
    }

    fn print_chat(&self) {
        let state = self.engine.state();
        match (self.show_chat, state.request()) {
            (true, Some(request)) => println!("Chat: {}", chat_embed_url(request.channel())),
            (true, None) => println!("Chat will open with the next channel"),
            (false, _) => println!("Chat hidden"),
        }
    }
}
