use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/**
    Errors from parsing a channel reference or quality token.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelParseError {
    #[error("channel reference is empty")]
    Empty,

    #[error("channel reference '{0}' contains whitespace")]
    Whitespace(String),

    #[error("quality token is empty")]
    EmptyQuality,

    #[error("invalid quality token '{0}'")]
    InvalidQuality(String),
}

/**
    Opaque, non-empty channel identifier (a channel login).
*/
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    /**
        Parse a channel reference.

        Accepts a bare login (`alpha`), a host-relative reference
        (`twitch.tv/alpha`) or a full URL (`https://www.twitch.tv/alpha`).
        The identifier is the last non-empty path component.
    */
    pub fn parse(input: &str) -> Result<Self, ChannelParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ChannelParseError::Empty);
        }

        let without_query = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or(trimmed);

        let last = without_query
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .ok_or(ChannelParseError::Empty)?;

        if last.chars().any(char::is_whitespace) {
            return Err(ChannelParseError::Whitespace(last.to_string()));
        }

        Ok(Self(last.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ChannelId {
    type Error = ChannelParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChannelId> for String {
    fn from(value: ChannelId) -> Self {
        value.0
    }
}

/// Stream quality preference passed to the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Quality {
    #[default]
    Best,
    Worst,
    /// A specific stream tag, e.g. `720p60` or `audio_only`.
    Specific(String),
}

impl Quality {
    pub fn token(&self) -> &str {
        match self {
            Quality::Best => "best",
            Quality::Worst => "worst",
            Quality::Specific(tag) => tag,
        }
    }
}

impl FromStr for Quality {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(ChannelParseError::EmptyQuality),
            "best" => Ok(Quality::Best),
            "worst" => Ok(Quality::Worst),
            other if other.starts_with('-') || other.chars().any(char::is_whitespace) => {
                Err(ChannelParseError::InvalidQuality(other.to_string()))
            }
            other => Ok(Quality::Specific(other.to_string())),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl TryFrom<String> for Quality {
    type Error = ChannelParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quality> for String {
    fn from(value: Quality) -> Self {
        value.token().to_string()
    }
}

/**
    One resolution attempt: which channel, at which quality.

    Immutable once created.
*/
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRequest {
    channel: ChannelId,
    quality: Quality,
}

impl ChannelRequest {
    pub fn new(channel: ChannelId, quality: Quality) -> Self {
        Self { channel, quality }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn quality(&self) -> &Quality {
        &self.quality
    }
}

/// Failure category of a resolver invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverErrorKind {
    SpawnFailed,
    NonZeroExit,
    UnparsableOutput,
    Timeout,
    Cancelled,
}

/**
    Typed resolver failure.

    The `Display` text is the user-facing message.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Resolver binary missing or not executable.
    #[error("failed to launch resolver: {0}")]
    SpawnFailed(String),

    /// Resolver ran but reported that no stream is available.
    #[error("{message}")]
    NonZeroExit { code: Option<i32>, message: String },

    /// Resolver exited cleanly but did not print an absolute URL.
    #[error("resolver returned no playable URL: {0}")]
    UnparsableOutput(String),

    #[error("resolver timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Superseded by a newer request. Never shown to the user.
    #[error("resolution cancelled")]
    Cancelled,
}

impl ResolveError {
    pub fn kind(&self) -> ResolverErrorKind {
        match self {
            ResolveError::SpawnFailed(_) => ResolverErrorKind::SpawnFailed,
            ResolveError::NonZeroExit { .. } => ResolverErrorKind::NonZeroExit,
            ResolveError::UnparsableOutput(_) => ResolverErrorKind::UnparsableOutput,
            ResolveError::Timeout(_) => ResolverErrorKind::Timeout,
            ResolveError::Cancelled => ResolverErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResolveError::Cancelled)
    }
}

/// Outcome of one resolution: a playable media URL or a typed failure.
pub type ResolutionResult = Result<Url, ResolveError>;
