//! TurnUp - voice-controlled music player core
//!
//! A playback session bound to a hands-free voice command interpreter.
//! Recognized utterances, track completions, brightness changes and user
//! gestures arrive as events; the orchestrator serializes them onto one
//! owning thread and publishes a now-playing snapshot for the UI.

pub mod audio;
pub mod catalog;
pub mod display;
pub mod integration;
pub mod playback;
pub mod state;
pub mod utils;
pub mod voice;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TurnUpError {
    #[error("Audio resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Failed to decode audio: {0}")]
    DecodeFailure(String),

    #[error("Speech recognition permission denied")]
    RecognitionAuthDenied,

    #[error("Recognition session error: {0}")]
    RecognitionSessionError(String),

    #[error("Audio session configuration failed: {0}")]
    AudioSessionConfigFailure(String),

    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Unknown playlist id: {0}")]
    UnknownPlaylist(u32),

    #[error("Song index {index} out of range for playlist {playlist_id}")]
    SongIndexOutOfRange { playlist_id: u32, index: usize },

    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for TurnUpError {
    fn from(e: std::io::Error) -> Self {
        TurnUpError::IOError(e.to_string())
    }
}

impl TurnUpError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the player in its last good state and
    /// only need reporting. The rest stop a subsystem until restart.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Playback keeps going with the previous track
            TurnUpError::ResourceNotFound(_) => true,
            TurnUpError::DecodeFailure(_) => true,
            // The user has to grant permission in system settings
            TurnUpError::RecognitionAuthDenied => false,
            // Sessions are restarted by the supervisor
            TurnUpError::RecognitionSessionError(_) => true,
            TurnUpError::AudioSessionConfigFailure(_) => true,
            TurnUpError::AudioDeviceError(_) => false,
            TurnUpError::UnknownPlaylist(_) => true,
            TurnUpError::SongIndexOutOfRange { .. } => true,
            TurnUpError::CatalogError(_) => false,
            TurnUpError::ConfigError(_) => false,
            TurnUpError::IOError(_) => false,
            TurnUpError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            TurnUpError::ResourceNotFound(_) => "Song file is missing.".to_string(),
            TurnUpError::DecodeFailure(_) => "Song could not be played.".to_string(),
            TurnUpError::RecognitionAuthDenied => "Permission denied".to_string(),
            TurnUpError::RecognitionSessionError(_) => {
                "Voice control hiccup. Listening again shortly.".to_string()
            }
            TurnUpError::AudioSessionConfigFailure(_) => {
                "Microphone unavailable. Voice control paused.".to_string()
            }
            TurnUpError::AudioDeviceError(_) => {
                "Audio device error. Please check your speakers.".to_string()
            }
            TurnUpError::UnknownPlaylist(_) | TurnUpError::SongIndexOutOfRange { .. } => {
                "That song is not in the library.".to_string()
            }
            TurnUpError::CatalogError(_) => "Music library could not be loaded.".to_string(),
            TurnUpError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            TurnUpError::IOError(_) => "File system error occurred.".to_string(),
            TurnUpError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TurnUpError>;

// Re-export the types most callers need
pub use catalog::{Catalog, Playlist, Song};
pub use integration::{Orchestrator, OrchestratorHandle, TurnUpConfig};
pub use playback::{PlaybackSession, StatusNotifier};
pub use state::{NowPlaying, PlayerCommand, PlayerEvent, SharedPlayerState};
pub use voice::{RecognitionSupervisor, VoiceCommand, VoiceInterpreter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_failures_are_recoverable() {
        assert!(TurnUpError::ResourceNotFound("espresso".into()).is_recoverable());
        assert!(TurnUpError::DecodeFailure("bad header".into()).is_recoverable());
        assert!(TurnUpError::RecognitionSessionError("ended".into()).is_recoverable());
        assert!(!TurnUpError::RecognitionAuthDenied.is_recoverable());
    }

    #[test]
    fn test_auth_denied_user_message() {
        assert_eq!(
            TurnUpError::RecognitionAuthDenied.user_message(),
            "Permission denied"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TurnUpError = io.into();
        assert!(matches!(err, TurnUpError::IOError(_)));
    }
}
