use std::str::FromStr;

use thiserror::Error;

use crate::resolver::{ChannelId, ChannelParseError, Quality};

/// A command typed at the shell prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Select {
        channel: ChannelId,
        quality: Option<Quality>,
    },
    /// 1-based index into the followed-channel list.
    Followed(usize),
    Reload,
    TogglePlay,
    ToggleChat,
    List,
    Login,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("usage: select <channel> [quality]")]
    MissingChannel,

    #[error("followed channels are numbered from 1")]
    ZeroIndex,

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error(transparent)]
    Channel(#[from] ChannelParseError),
}

impl FromStr for Intent {
    type Err = IntentParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(IntentParseError::Empty)?;

        if let Ok(index) = command.parse::<usize>() {
            if index == 0 {
                return Err(IntentParseError::ZeroIndex);
            }
            return finish(Intent::Followed(index), words);
        }

        let intent = match command.to_lowercase().as_str() {
            "select" | "s" => {
                let channel = words.next().ok_or(IntentParseError::MissingChannel)?;
                let channel = ChannelId::parse(channel)?;
                let quality = words.next().map(str::parse).transpose()?;
                Intent::Select { channel, quality }
            }
            "reload" | "r" | "retry" => Intent::Reload,
            "toggle" | "p" => Intent::TogglePlay,
            "chat" | "c" => Intent::ToggleChat,
            "list" | "l" => Intent::List,
            "login" => Intent::Login,
            "help" | "h" | "?" => Intent::Help,
            "quit" | "q" | "exit" => Intent::Quit,
            other => return Err(IntentParseError::Unknown(other.to_string())),
        };

        finish(intent, words)
    }
}

fn finish<'a>(
    intent: Intent,
    mut rest: impl Iterator<Item = &'a str>,
) -> Result<Intent, IntentParseError> {
    match rest.next() {
        Some(extra) => Err(IntentParseError::UnexpectedArgument(extra.to_string())),
        None => Ok(intent),
    }
}

pub const HELP: &str = "\
commands:
  select <channel> [quality]   watch a channel (alias: s)
  <n>                          watch followed channel n
  reload                       reload or retry the current channel (alias: r)
  toggle                       pause or resume (alias: p)
  chat                         show or hide the chat link (alias: c)
  list                         refresh account and followed channels (alias: l)
  login                        open the sign-in page
  quit                         stop playback and exit (alias: q)";
