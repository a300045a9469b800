use anyhow::Result;
use clap::Parser;

mod browser;
mod cli;
mod playback;
mod player;
mod resolver;
mod settings;
mod shell;
mod util;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    cli::Args::parse().run().await
}
