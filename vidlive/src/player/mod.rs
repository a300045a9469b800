mod adapter;
mod mpv;
mod surface;

pub use adapter::PlayerAdapter;
pub use mpv::MpvSurface;
pub use surface::{
    HandleId, PlayerError, PlayerEvent, PlayerEventSender, PlayerInstance, PlayerSurface,
};
