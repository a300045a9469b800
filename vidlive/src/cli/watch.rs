use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

use crate::browser::SessionFile;
use crate::player::MpvSurface;
use crate::playback::{EngineConfig, HandoffEngine};
use crate::resolver::{ChannelId, ChannelRequest, ProcessResolver};
use crate::settings::Settings;
use crate::shell::Shell;

use super::SettingsOverrides;

#[derive(Parser, Debug, Default)]
pub struct WatchCommand {
    /// Channel to start with (login or channel URL)
    pub channel: Option<String>,

    /// Browser session snapshot exported by the web view
    #[arg(long)]
    pub session: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SettingsOverrides,
}

impl WatchCommand {
    pub async fn run(self) -> Result<()> {
        let settings = self.overrides.apply(Settings::load());

        // Collaborators
        let resolver = Arc::new(ProcessResolver::new(
            &settings.resolver,
            settings.resolver_args.clone(),
        ));
        let surface = Arc::new(MpvSurface::new(
            &settings.player,
            settings.player_args.clone(),
        ));
        let session_path = self
            .session
            .or_else(SessionFile::default_path)
            .unwrap_or_else(|| PathBuf::from("session.json"));
        let session = Arc::new(SessionFile::new(session_path));

        info!(
            resolver = %settings.resolver.display(),
            player = %settings.player.display(),
            quality = %settings.quality,
            session = %session.path().display(),
            "starting"
        );

        let engine = HandoffEngine::spawn(
            EngineConfig {
                resolve_timeout: settings.resolve_timeout(),
            },
            resolver,
            surface,
        );

        if let Some(channel) = &self.channel {
            let channel = ChannelId::parse(channel)
                .with_context(|| format!("invalid channel '{}'", channel))?;
            engine.select_channel(ChannelRequest::new(channel, settings.quality.clone()))?;
        }

        let shell = Shell::new(engine, session, settings.quality, settings.show_chat);
        shell.run(BufReader::new(tokio::io::stdin())).await
    }
}
