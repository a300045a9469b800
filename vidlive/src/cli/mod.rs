use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::resolver::Quality;
use crate::settings::Settings;
use crate::util::logging;

mod resolve;
mod settings;
mod watch;

pub use resolve::ResolveCommand;
pub use settings::SettingsCommand;
pub use watch::WatchCommand;

#[derive(Parser, Debug)]
#[command(name = "vidlive")]
#[command(about = "Watch live channels in a native player without ads")]
pub struct Args {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the interactive player (default)
    Watch(WatchCommand),
    /// Resolve one channel to its media URL and exit
    Resolve(ResolveCommand),
    /// Show the effective settings, optionally saving them
    Settings(SettingsCommand),
}

impl Args {
    pub async fn run(self) -> Result<()> {
        logging::init(self.verbose);

        let command = self
            .command
            .unwrap_or(Command::Watch(WatchCommand::default()));

        match command {
            Command::Watch(cmd) => cmd.run().await,
            Command::Resolve(cmd) => cmd.run().await,
            Command::Settings(cmd) => cmd.run().await,
        }
    }
}

/// Flags that override the persisted settings for one run.
#[derive(clap::Args, Debug, Default)]
pub struct SettingsOverrides {
    /// Stream quality (best, worst, or a stream tag like 720p60)
    #[arg(short, long)]
    pub quality: Option<Quality>,

    /// Resolver executable
    #[arg(long)]
    pub resolver: Option<PathBuf>,

    /// Argument placed before the channel reference (repeatable)
    #[arg(long = "resolver-arg", allow_hyphen_values = true)]
    pub resolver_args: Vec<String>,

    /// Player executable
    #[arg(long)]
    pub player: Option<PathBuf>,

    /// Extra player argument (repeatable)
    #[arg(long = "player-arg", allow_hyphen_values = true)]
    pub player_args: Vec<String>,

    /// Resolve timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Show the chat link when a channel starts
    #[arg(long)]
    pub chat: bool,
}

impl SettingsOverrides {
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(quality) = &self.quality {
            settings.quality = quality.clone();
        }
        if let Some(resolver) = &self.resolver {
            settings.resolver = resolver.clone();
        }
        if !self.resolver_args.is_empty() {
            settings.resolver_args = self.resolver_args.clone();
        }
        if let Some(player) = &self.player {
            settings.player = player.clone();
        }
        if !self.player_args.is_empty() {
            settings.player_args = self.player_args.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.resolve_timeout_secs = timeout;
        }
        if self.chat {
            settings.show_chat = true;
        }
        settings
    }
}
