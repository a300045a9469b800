use crate::browser::{FollowedChannel, SessionSnapshot};
use crate::playback::PlaybackState;
use crate::resolver::ChannelId;

pub fn chat_embed_url(channel: &ChannelId) -> String {
    format!(
        "https://www.twitch.tv/embed/{}/chat?parent=localhost&darkpopout",
        channel
    )
}

/// One status line per playback state.
pub fn render_state(state: &PlaybackState) -> String {
    match state {
        PlaybackState::Idle => "Select a channel to start watching.".to_string(),
        PlaybackState::Resolving { request, .. } => format!(
            "Loading {} ({})...",
            request.channel(),
            request.quality()
        ),
        PlaybackState::Ready {
            request,
            is_playing: true,
            ..
        } => format!("Playing {} ({})", request.channel(), request.quality()),
        PlaybackState::Ready { request, .. } => format!("Paused {}", request.channel()),
        PlaybackState::Error { request, message } => format!(
            "Could not play {}: {} (type 'r' to retry)",
            request.channel(),
            message
        ),
    }
}

pub fn render_account(snapshot: &SessionSnapshot) -> String {
    format!(
        "{} - {}",
        snapshot.account_label(),
        snapshot.account_subtitle()
    )
}

pub fn render_followed(followed: &[FollowedChannel]) -> Vec<String> {
    if followed.is_empty() {
        return vec!["No live channels".to_string()];
    }

    followed
        .iter()
        .enumerate()
        .map(|(i, channel)| {
            if channel.label() == channel.channel.as_str() {
                format!("{:>3}. {}", i + 1, channel.channel)
            } else {
                format!("{:>3}. {} ({})", i + 1, channel.label(), channel.channel)
            }
        })
        .collect()
}
