use serde::{Deserialize, Serialize};
use url::Url;

use crate::resolver::ChannelId;

/// Names the site uses for its own menu buttons; never a real account name.
const PLACEHOLDER_NAMES: &[&str] = &["user", "profile", "account", "avatar", "menu", "user menu"];

/// A followed channel that is currently live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedChannel {
    pub channel: ChannelId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<Url>,
}

impl FollowedChannel {
    pub fn label(&self) -> &str {
        normalize_name(self.display_name.as_deref()).unwrap_or(self.channel.as_str())
    }
}

/**
    What the embedded web view knows about the signed-in account.

    Scraped from the page, so the name fields may hold blanks or menu labels
    instead of real names; use [`SessionSnapshot::account_label`] and
    [`SessionSnapshot::account_subtitle`] rather than reading them directly.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub logged_in: bool,
    pub display_name: Option<String>,
    pub login: Option<String>,
    pub avatar: Option<Url>,
    pub followed_live: Vec<FollowedChannel>,
}

impl SessionSnapshot {
    pub fn account_label(&self) -> String {
        normalize_name(self.display_name.as_deref())
            .or_else(|| normalize_name(self.login.as_deref()))
            .unwrap_or(if self.logged_in {
                "Profile"
            } else {
                "Not signed in"
            })
            .to_string()
    }

    pub fn account_subtitle(&self) -> String {
        if !self.logged_in {
            return "Sign in to continue".to_string();
        }
        match normalize_name(self.login.as_deref()) {
            Some(login) => format!("@{}", login),
            None => "Account".to_string(),
        }
    }
}

/**
    Trim a scraped name, dropping blanks and placeholder menu labels.
*/
pub fn normalize_name(value: Option<&str>) -> Option<&str> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    if PLACEHOLDER_NAMES.contains(&lower.as_str()) {
        return None;
    }
    Some(trimmed)
}
