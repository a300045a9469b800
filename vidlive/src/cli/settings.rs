use anyhow::Result;
use clap::Parser;

use crate::settings::Settings;

use super::SettingsOverrides;

#[derive(Parser, Debug)]
pub struct SettingsCommand {
    /// Write the effective settings to the settings file
    #[arg(long)]
    pub save: bool,

    #[command(flatten)]
    pub overrides: SettingsOverrides,
}

impl SettingsCommand {
    pub async fn run(self) -> Result<()> {
        let settings = self.overrides.apply(Settings::load());
        println!("{}", serde_json::to_string_pretty(&settings)?);

        if self.save {
            match settings.save()? {
                Some(path) => eprintln!("Saved to {}", path.display()),
                None => eprintln!("No config directory on this platform, nothing saved"),
            }
        } else if let Some(path) = Settings::file_path() {
            eprintln!("Settings file: {}", path.display());
        }

        Ok(())
    }
}
