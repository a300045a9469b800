mod session_file;
mod snapshot;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub use session_file::SessionFile;
pub use snapshot::{FollowedChannel, SessionSnapshot};

pub const LOGIN_URL: &str = "https://www.twitch.tv/login";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session snapshot: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid session snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/**
    The embedded web view that owns the user's site session.

    Playback never depends on it; it only feeds the account header and the
    followed-channel list, and takes navigation requests such as login.
*/
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn snapshot(&self) -> Result<SessionSnapshot, SessionError>;

    async fn navigate(&self, url: &Url) -> Result<(), SessionError>;
}
