use url::Url;

use crate::resolver::ChannelRequest;

/**
    What the playback surface is doing right now.

    Owned and mutated by the handoff engine only; everyone else observes it
    through a watch channel.
*/
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Resolving {
        request: ChannelRequest,
        seq: u64,
    },
    Ready {
        request: ChannelRequest,
        url: Url,
        is_playing: bool,
    },
    Error {
        request: ChannelRequest,
        message: String,
    },
}

impl PlaybackState {
    /// The request this state belongs to, if a channel has been selected.
    pub fn request(&self) -> Option<&ChannelRequest> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Resolving { request, .. }
            | PlaybackState::Ready { request, .. }
            | PlaybackState::Error { request, .. } => Some(request),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Resolving { .. } => "resolving",
            PlaybackState::Ready { .. } => "ready",
            PlaybackState::Error { .. } => "error",
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Ready { is_playing: true, .. })
    }
}
