pub mod invoker;
pub mod session;
pub mod types;

pub use invoker::{ProcessResolver, StreamResolver};
pub use session::{ResolutionSession, SessionReport};
pub use types::{
    ChannelId, ChannelParseError, ChannelRequest, Quality, ResolutionResult, ResolveError,
};
