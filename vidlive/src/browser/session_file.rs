use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};
use url::Url;

use super::snapshot::SessionSnapshot;
use super::{BrowserSession, SessionError};

/**
    Browser session backed by a JSON snapshot the web view exports.

    A missing file reads as a signed-out session with nothing followed.
    Navigation cannot be forwarded to the web view from here, so requests
    are only logged and remembered.
*/
pub struct SessionFile {
    path: PathBuf,
    navigations: Mutex<Vec<Url>>,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            navigations: Mutex::new(Vec::new()),
        }
    }

    /// `<config_dir>/vidlive/session.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vidlive").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub fn navigations(&self) -> Vec<Url> {
        self.navigations.lock().clone()
    }
}

#[async_trait]
impl BrowserSession for SessionFile {
    async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no session snapshot");
                return Ok(SessionSnapshot::default());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&contents)?)
    }

    async fn navigate(&self, url: &Url) -> Result<(), SessionError> {
        info!(url = %url, "browser navigation requested");
        self.navigations.lock().push(url.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::LOGIN_URL;

    #[tokio::test]
    async fn test_missing_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionFile::new(dir.path().join("session.json"));

        let snapshot = session.snapshot().await.unwrap();
        assert!(!snapshot.logged_in);
        assert!(snapshot.followed_live.is_empty());
    }

    #[tokio::test]
    async fn test_reads_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{"logged_in":true,"display_name":"Alpha","followed_live":[{"channel":"beta"}]}"#,
        )
        .unwrap();

        let snapshot = SessionFile::new(&path).snapshot().await.unwrap();
        assert_eq!(snapshot.account_label(), "Alpha");
        assert_eq!(snapshot.followed_live[0].label(), "beta");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = SessionFile::new(&path).snapshot().await.unwrap_err();
        assert!(matches!(err, SessionError::Parse(_)));
    }

    #[tokio::test]
    async fn test_navigate_is_recorded() {
        let session = SessionFile::new("/nonexistent/session.json");
        let login = Url::parse(LOGIN_URL).unwrap();

        session.navigate(&login).await.unwrap();
        assert_eq!(session.navigations(), vec![login]);
    }
}
