use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::resolver::{ChannelId, ChannelRequest, ProcessResolver, StreamResolver};
use crate::settings::Settings;

use super::SettingsOverrides;

#[derive(Parser, Debug)]
pub struct ResolveCommand {
    /// Channel login or channel URL
    pub channel: String,

    #[command(flatten)]
    pub overrides: SettingsOverrides,
}

impl ResolveCommand {
    pub async fn run(self) -> Result<()> {
        let settings = self.overrides.apply(Settings::load());
        let channel = ChannelId::parse(&self.channel)
            .with_context(|| format!("invalid channel '{}'", self.channel))?;
        let request = ChannelRequest::new(channel, settings.quality.clone());

        let resolver = ProcessResolver::new(&settings.resolver, settings.resolver_args.clone());
        eprintln!(
            "Resolving {} ({}) with {}",
            request.channel(),
            request.quality(),
            settings.resolver.display()
        );

        let cancel = CancellationToken::new();
        let resolve = resolver.resolve(&request, settings.resolve_timeout(), &cancel);
        tokio::pin!(resolve);

        let result = tokio::select! {
            result = &mut resolve => result,
            _ = signal::ctrl_c() => {
                cancel.cancel();
                resolve.await
            }
        };

        match result {
            Ok(url) => {
                println!("{}", url);
                Ok(())
            }
            Err(e) => bail!("{:?}: {}", e.kind(), e),
        }
    }
}
