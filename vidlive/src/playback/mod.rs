mod engine;
mod state;

pub use engine::{DEFAULT_RESOLVE_TIMEOUT, EngineConfig, EngineHandle, HandoffEngine};
pub use state::PlaybackState;
