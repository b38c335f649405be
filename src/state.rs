//! Shared player state
//!
//! This module provides a thread-safe snapshot of everything the UI shows:
//! - **Orchestrator**: the only writer, after every handled event or timer
//! - **UI / demo binary**: reads snapshots for rendering, sends commands
//! - **Tests**: read snapshots for assertions
//!
//! State is queried from `SharedPlayerState`; `PlayerEvent`s only say that
//! something changed or carry transient text.

use crate::catalog::Song;
use crate::playback::PlaybackSnapshot;
use crate::voice::{InterpreterMode, SupervisorState};
use parking_lot::RwLock;
use std::sync::Arc;

/// Everything the now-playing screen renders
#[derive(Clone, Debug, PartialEq)]
pub struct NowPlaying {
    pub playlist_index: usize,
    pub playlist_id: Option<u32>,
    pub playlist_name: Option<String>,
    pub playlist_count: usize,
    pub song_index: usize,
    pub current_song: Option<Song>,
    pub is_playing: bool,
    /// Elapsed fraction in [0, 1]
    pub progress: f64,
    /// Elapsed time as `M:SS`
    pub elapsed_label: String,
    pub status: Option<String>,
    /// Changes every time a status is shown, even when the text repeats
    pub status_sequence: u64,
    /// Wall clock as `HH:mm`
    pub clock_label: String,
    pub dark_mode: bool,
    pub voice_mode: InterpreterMode,
    pub recognition: SupervisorState,
}

impl Default for NowPlaying {
    fn default() -> Self {
        Self {
            playlist_index: 0,
            playlist_id: None,
            playlist_name: None,
            playlist_count: 0,
            song_index: 0,
            current_song: None,
            is_playing: false,
            progress: 0.0,
            elapsed_label: "0:00".to_string(),
            status: None,
            status_sequence: 0,
            clock_label: String::new(),
            dark_mode: false,
            voice_mode: InterpreterMode::Idle,
            recognition: SupervisorState::Stopped,
        }
    }
}

impl NowPlaying {
    /// Copy the playback part of the state from a session snapshot
    pub fn apply_playback(&mut self, playback: PlaybackSnapshot) {
        self.playlist_index = playback.playlist_index;
        self.playlist_id = playback.playlist_id;
        self.playlist_name = playback.playlist_name;
        self.playlist_count = playback.playlist_count;
        self.song_index = playback.song_index;
        self.current_song = playback.current_song;
        self.is_playing = playback.is_playing;
        self.progress = playback.progress;
        self.elapsed_label = playback.elapsed_label;
        self.status = playback.status;
        self.status_sequence = playback.status_sequence;
    }

    /// Name of the current song, if any
    pub fn song_name(&self) -> Option<&str> {
        self.current_song.as_ref().map(|s| s.name.as_str())
    }

    pub fn is_listening_for_title(&self) -> bool {
        self.voice_mode == InterpreterMode::CollectingTitle
    }
}

/// Thread-safe shared player state
///
/// This wraps `NowPlaying` in `Arc<RwLock<>>` for safe concurrent access.
#[derive(Clone, Default)]
pub struct SharedPlayerState {
    inner: Arc<RwLock<NowPlaying>>,
}

impl SharedPlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a read lock on the state
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, NowPlaying> {
        self.inner.read()
    }

    /// Get a copy of current state (no lock held after return)
    pub fn snapshot(&self) -> NowPlaying {
        self.inner.read().clone()
    }

    /// Replace the state, returning true if it differs from the old one
    pub fn publish(&self, next: NowPlaying) -> bool {
        let mut state = self.inner.write();
        if *state == next {
            return false;
        }
        *state = next;
        true
    }

    // === Convenience read methods ===

    pub fn is_playing(&self) -> bool {
        self.inner.read().is_playing
    }

    pub fn song_name(&self) -> Option<String> {
        self.inner.read().song_name().map(str::to_string)
    }

    pub fn status(&self) -> Option<String> {
        self.inner.read().status.clone()
    }

    pub fn is_dark_mode(&self) -> bool {
        self.inner.read().dark_mode
    }
}

/// Commands that can be sent to the orchestrator
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerCommand {
    TogglePlayPause,
    Next,
    Previous,
    NextPlaylist,
    PreviousPlaylist,
    /// Seek to a fraction of the current track
    Seek(f64),
    /// Jump to a song by playlist id and index
    SelectSong { playlist_id: u32, index: usize },
    UnlockHiddenPlaylist,
    /// Interpret text as if it had been recognized (bypasses the recognizer)
    Utterance(String),
    StartListening,
    StopListening,
    /// Shutdown the orchestrator
    Shutdown,
}

/// Events emitted by the orchestrator
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    /// Shared state has changed (trigger UI repaint)
    StateChanged,
    /// A new status message became visible
    Status(String),
    /// An operation failed; state is unchanged
    Error(String),
    /// Shutdown complete
    Shutdown,
}
