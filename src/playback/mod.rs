//! Playback session and status line

pub mod session;
pub mod status;

pub use session::{PlaybackSession, PlaybackSnapshot, SessionOptions};
pub use status::{StatusNotifier, DEFAULT_STATUS_DISPLAY};
