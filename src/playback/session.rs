//! Playback session
//!
//! Owns the catalog, the audio output and every piece of now-playing
//! state. All transport operations go through here and are called from a
//! single owning thread. Song changes load the new resource before
//! committing any selection change, so a missing or undecodable file
//! leaves the session exactly as it was.

use crate::audio::{AudioOutput, AudioStore, TrackId};
use crate::catalog::{Catalog, Playlist, Song};
use crate::playback::status::{StatusNotifier, DEFAULT_STATUS_DISPLAY};
use crate::utils::{earliest, format_elapsed, IntervalTimer, SharedClock};
use crate::{Result, TurnUpError};
use crossbeam_channel::{unbounded, Receiver};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Construction parameters for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Playlist position selected at startup
    pub default_playlist: usize,
    /// Period of the elapsed-time sampler
    pub sampler_interval: Duration,
    /// How long status messages stay visible
    pub status_display: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_playlist: 1,
            sampler_interval: Duration::from_millis(500),
            status_display: DEFAULT_STATUS_DISPLAY,
        }
    }
}

/// Copy of the published session state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub playlist_index: usize,
    pub playlist_id: Option<u32>,
    pub playlist_name: Option<String>,
    pub song_index: usize,
    pub current_song: Option<Song>,
    pub is_playing: bool,
    pub progress: f64,
    pub elapsed_label: String,
    pub status: Option<String>,
    /// Increments with every status shown
    pub status_sequence: u64,
    pub playlist_count: usize,
}

pub struct PlaybackSession {
    catalog: Catalog,
    store: Box<dyn AudioStore>,
    output: Box<dyn AudioOutput>,
    clock: SharedClock,

    playlist_index: usize,
    song_index: usize,
    current_song: Option<Song>,
    is_playing: bool,
    progress: f64,
    elapsed_label: String,

    current_track: Option<TrackId>,
    sampler: IntervalTimer,
    status: StatusNotifier,
    completion_rx: Receiver<TrackId>,
}

impl PlaybackSession {
    /// Create a session bound to the first song of the default playlist
    ///
    /// Nothing is loaded until [`start`](Self::start) is called.
    pub fn new(
        catalog: Catalog,
        store: Box<dyn AudioStore>,
        mut output: Box<dyn AudioOutput>,
        clock: SharedClock,
        options: SessionOptions,
    ) -> Self {
        let (completion_tx, completion_rx) = unbounded();
        output.set_completion_handler(Box::new(move |id| {
            let _ = completion_tx.send(id);
        }));

        let playlist_index = if options.default_playlist < catalog.len() {
            options.default_playlist
        } else {
            warn!(
                "Default playlist {} out of range, using 0",
                options.default_playlist
            );
            0
        };
        let current_song = catalog
            .playlist(playlist_index)
            .and_then(|p| p.songs.first())
            .cloned();

        Self {
            catalog,
            store,
            output,
            clock,
            playlist_index,
            song_index: 0,
            current_song,
            is_playing: false,
            progress: 0.0,
            elapsed_label: format_elapsed(Duration::ZERO),
            current_track: None,
            sampler: IntervalTimer::new(options.sampler_interval),
            status: StatusNotifier::new(options.status_display),
            completion_rx,
        }
    }

    /// Load and start the current song
    pub fn start(&mut self) -> Result<()> {
        let song = self
            .current_song
            .clone()
            .ok_or_else(|| TurnUpError::CatalogError("No song to start with".into()))?;
        info!("Starting playback with {}", song.name);
        self.load_and_play(song)
    }

    // === Transport ===

    /// Flip between playing and paused, no-op when nothing is loaded
    pub fn toggle_play_pause(&mut self) {
        if !self.output.is_loaded() {
            debug!("Toggle ignored, nothing loaded");
            return;
        }
        if self.is_playing {
            self.pause();
        } else {
            self.resume();
        }
    }

    /// Pause if playing
    pub fn pause(&mut self) {
        if !self.output.is_loaded() || !self.is_playing {
            return;
        }
        self.output.pause();
        self.is_playing = false;
        self.sample();
        let now = self.clock.now();
        self.status.show("Paused", now);
    }

    /// Resume if paused
    pub fn resume(&mut self) {
        if !self.output.is_loaded() || self.is_playing {
            return;
        }
        self.output.play();
        self.is_playing = true;
        let now = self.clock.now();
        if !self.sampler.is_running() {
            self.sampler.start(now);
        }
        self.status.show("Playing", now);
    }

    /// Advance to the next song, wrapping at the end of the playlist
    pub fn next(&mut self) -> Result<()> {
        let len = self.current_playlist_len();
        self.change_song((self.song_index + 1) % len)
    }

    /// Go back one song, wrapping at the start of the playlist
    pub fn previous(&mut self) -> Result<()> {
        let len = self.current_playlist_len();
        self.change_song((self.song_index + len - 1) % len)
    }

    /// Select the next playlist and start its first song
    pub fn next_playlist(&mut self) -> Result<()> {
        let count = self.catalog.len().max(1);
        self.select_playlist_index((self.playlist_index + 1) % count)
    }

    /// Select the previous playlist and start its first song
    pub fn previous_playlist(&mut self) -> Result<()> {
        let count = self.catalog.len().max(1);
        self.select_playlist_index((self.playlist_index + count - 1) % count)
    }

    /// Jump to a fraction of the current track
    ///
    /// The fraction is clamped to [0, 1]; NaN counts as 0.
    pub fn seek(&mut self, fraction: f64) {
        if !self.output.is_loaded() {
            return;
        }
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let target = self.output.duration().mul_f64(fraction);
        self.output.seek(target);
        self.progress = fraction;
        self.elapsed_label = format_elapsed(target);
        debug!("Seek to {} ({:.2})", self.elapsed_label, fraction);
    }

    /// Jump to a song of the playlist with the given id
    pub fn select_song(&mut self, playlist_id: u32, index: usize) -> Result<()> {
        let position = self
            .catalog
            .position_of(playlist_id)
            .ok_or(TurnUpError::UnknownPlaylist(playlist_id))?;
        let song = self
            .catalog
            .playlist(position)
            .and_then(|p| p.songs.get(index))
            .cloned()
            .ok_or(TurnUpError::SongIndexOutOfRange { playlist_id, index })?;

        self.load_and_play(song)?;
        self.playlist_index = position;
        self.song_index = index;
        Ok(())
    }

    /// Select a playlist by position and start its first song
    pub fn select_playlist_index(&mut self, position: usize) -> Result<()> {
        let playlist = self.catalog.playlist(position).ok_or_else(|| {
            TurnUpError::CatalogError(format!("No playlist at position {}", position))
        })?;
        let song = playlist
            .songs
            .first()
            .cloned()
            .ok_or_else(|| TurnUpError::CatalogError(format!("Playlist {} is empty", playlist.id)))?;

        self.load_and_play(song)?;
        self.playlist_index = position;
        self.song_index = 0;
        Ok(())
    }

    /// Load a song without touching the playlist/index bookkeeping
    pub fn play_song(&mut self, song: &Song) -> Result<()> {
        self.load_and_play(song.clone())
    }

    /// Append and select the hidden playlist
    ///
    /// Returns `Ok(false)` when it is already unlocked.
    pub fn unlock_hidden_playlist(&mut self) -> Result<bool> {
        if self.catalog.is_hidden_unlocked() {
            debug!("Hidden playlist already unlocked");
            return Ok(false);
        }
        let song = self
            .catalog
            .hidden()
            .songs
            .first()
            .cloned()
            .ok_or_else(|| TurnUpError::CatalogError("Hidden playlist is empty".into()))?;

        // Catalog stays untouched if the first song cannot be loaded
        self.load_and_play(song)?;
        let position = match self.catalog.unlock_hidden() {
            Some(position) => position,
            None => return Ok(false),
        };
        info!("Hidden playlist unlocked at position {}", position);

        self.playlist_index = position;
        self.song_index = 0;
        let now = self.clock.now();
        self.status.show("Party Mode Activated!", now);
        Ok(true)
    }

    /// Show a status message
    pub fn show_status(&mut self, text: impl Into<String>) {
        let now = self.clock.now();
        self.status.show(text, now);
    }

    // === Timers and completion ===

    /// Handle completions and due timers
    ///
    /// Returns true if any published state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        self.output.poll();
        let completed: Vec<TrackId> = self.completion_rx.try_iter().collect();
        for id in completed {
            if Some(id) != self.current_track {
                debug!("Ignoring completion of stale track {}", id);
                continue;
            }
            debug!("Track {} finished, advancing", id);
            self.sampler.stop();
            if let Err(e) = self.next() {
                warn!("Auto-advance failed: {}", e);
                self.is_playing = false;
            }
            changed = true;
        }

        let now = self.clock.now();
        if self.sampler.tick(now) {
            self.sample();
            changed = true;
        }
        if self.status.poll(now) {
            changed = true;
        }
        changed
    }

    /// Earliest instant at which `poll` has timer work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([self.sampler.deadline(), self.status.deadline()])
    }

    // === Accessors ===

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn current_playlist(&self) -> Option<&Playlist> {
        self.catalog.playlist(self.playlist_index)
    }

    pub fn playlist_index(&self) -> usize {
        self.playlist_index
    }

    pub fn song_index(&self) -> usize {
        self.song_index
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current_song.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Elapsed fraction of the current track in [0, 1]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Elapsed time as `M:SS`
    pub fn elapsed_label(&self) -> &str {
        &self.elapsed_label
    }

    pub fn status(&self) -> Option<&str> {
        self.status.current()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let playlist = self.current_playlist();
        PlaybackSnapshot {
            playlist_index: self.playlist_index,
            playlist_id: playlist.map(|p| p.id),
            playlist_name: playlist.map(|p| p.name.clone()),
            song_index: self.song_index,
            current_song: self.current_song.clone(),
            is_playing: self.is_playing,
            progress: self.progress,
            elapsed_label: self.elapsed_label.clone(),
            status: self.status.current().map(str::to_string),
            status_sequence: self.status.sequence(),
            playlist_count: self.catalog.len(),
        }
    }

    // === Internals ===

    fn current_playlist_len(&self) -> usize {
        self.current_playlist().map(Playlist::len).unwrap_or(0).max(1)
    }

    fn change_song(&mut self, index: usize) -> Result<()> {
        let song = self
            .current_playlist()
            .and_then(|p| p.songs.get(index))
            .cloned()
            .ok_or_else(|| {
                TurnUpError::CatalogError(format!("No song at index {}", index))
            })?;
        self.load_and_play(song)?;
        self.song_index = index;
        Ok(())
    }

    /// Decode, load and start a song
    ///
    /// On failure nothing about the session changes.
    fn load_and_play(&mut self, song: Song) -> Result<()> {
        let track = self.store.load(&song.file_name).map_err(|e| {
            warn!("Could not load {}: {}", song.name, e);
            e
        })?;
        let id = self.output.load(track).map_err(|e| {
            warn!("Output rejected {}: {}", song.name, e);
            e
        })?;

        self.sampler.stop();
        self.output.play();
        info!("Now playing {} by {}", song.name, song.artist);

        self.current_track = Some(id);
        self.current_song = Some(song);
        self.is_playing = true;
        self.progress = 0.0;
        self.elapsed_label = format_elapsed(Duration::ZERO);
        self.sampler.start(self.clock.now());
        Ok(())
    }

    /// Refresh progress and label from the output position
    fn sample(&mut self) {
        let position = self.output.position();
        let duration = self.output.duration();
        self.progress = if duration.is_zero() {
            0.0
        } else {
            (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
        };
        self.elapsed_label = format_elapsed(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MemoryAudioStore, SimulatedOutput};
    use crate::catalog::HIDDEN_PLAYLIST_ID;
    use crate::utils::ManualClock;
    use std::sync::Arc;

    const SONG_LENGTH: Duration = Duration::from_secs(120);

    fn session_with(store: MemoryAudioStore) -> (PlaybackSession, Arc<ManualClock>) {
        let clock = ManualClock::shared();
        let output = SimulatedOutput::new(clock.clone());
        let session = PlaybackSession::new(
            Catalog::builtin(),
            Box::new(store),
            Box::new(output),
            clock.clone(),
            SessionOptions::default(),
        );
        (session, clock)
    }

    fn started_session() -> (PlaybackSession, Arc<ManualClock>, MemoryAudioStore) {
        let store = MemoryAudioStore::with_catalog(&Catalog::builtin(), SONG_LENGTH);
        let (mut session, clock) = session_with(store.clone());
        session.start().unwrap();
        (session, clock, store)
    }

    #[test]
    fn test_starts_on_default_song() {
        let (session, _clock, _store) = started_session();
        assert_eq!(session.playlist_index(), 1);
        assert_eq!(session.song_index(), 0);
        assert_eq!(session.current_song().unwrap().name, "Espresso");
        assert!(session.is_playing());
        assert_eq!(session.elapsed_label(), "0:00");
    }

    #[test]
    fn test_next_previous_are_inverse() {
        let (mut session, _clock, _store) = started_session();
        for playlist in 0..session.catalog().len() {
            session.select_playlist_index(playlist).unwrap();
            let len = session.current_playlist().unwrap().len();
            for start in 0..len {
                let id = session.current_playlist().unwrap().id;
                session.select_song(id, start).unwrap();

                session.next().unwrap();
                session.previous().unwrap();
                assert_eq!(session.song_index(), start);

                session.previous().unwrap();
                session.next().unwrap();
                assert_eq!(session.song_index(), start);
            }
        }
    }

    #[test]
    fn test_single_song_playlist_wraps_to_itself() {
        let catalog = Catalog::new(
            vec![Playlist::new(0, "Solo", vec![Song::new("Only", "A", "only", "only")])],
            Playlist::new(99, "Hidden", vec![Song::new("H", "B", "h", "h")]),
        )
        .unwrap();
        let store = MemoryAudioStore::with_catalog(&catalog, SONG_LENGTH);
        let clock = ManualClock::shared();
        let mut session = PlaybackSession::new(
            catalog,
            Box::new(store),
            Box::new(SimulatedOutput::new(clock.clone())),
            clock,
            SessionOptions {
                default_playlist: 0,
                ..Default::default()
            },
        );
        session.start().unwrap();

        session.next().unwrap();
        assert_eq!(session.song_index(), 0);
        session.previous().unwrap();
        assert_eq!(session.song_index(), 0);
    }

    #[test]
    fn test_playlist_navigation_wraps_and_resets_index() {
        let (mut session, _clock, _store) = started_session();
        session.next().unwrap();
        assert_eq!(session.song_index(), 1);

        session.next_playlist().unwrap();
        assert_eq!(session.playlist_index(), 0);
        assert_eq!(session.song_index(), 0);
        assert_eq!(session.current_song().unwrap().name, "GPS-A");

        session.previous_playlist().unwrap();
        assert_eq!(session.playlist_index(), 1);
    }

    #[test]
    fn test_toggle_reports_status() {
        let (mut session, _clock, _store) = started_session();
        session.toggle_play_pause();
        assert!(!session.is_playing());
        assert_eq!(session.status(), Some("Paused"));

        session.toggle_play_pause();
        assert!(session.is_playing());
        assert_eq!(session.status(), Some("Playing"));
    }

    #[test]
    fn test_toggle_without_track_is_silent() {
        let store = MemoryAudioStore::new();
        let (mut session, _clock) = session_with(store);
        session.toggle_play_pause();
        assert!(!session.is_playing());
        assert_eq!(session.status(), None);
    }

    #[test]
    fn test_seek_half_of_two_minutes() {
        let (mut session, _clock, _store) = started_session();
        session.seek(0.5);
        assert_eq!(session.progress(), 0.5);
        assert_eq!(session.elapsed_label(), "1:00");
    }

    #[test]
    fn test_seek_clamps_fraction() {
        let (mut session, _clock, _store) = started_session();
        session.seek(3.0);
        assert_eq!(session.progress(), 1.0);
        assert_eq!(session.elapsed_label(), "2:00");

        session.seek(-1.0);
        assert_eq!(session.progress(), 0.0);

        session.seek(f64::NAN);
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn test_sampler_updates_elapsed() {
        let (mut session, clock, _store) = started_session();
        clock.advance_ms(30_000);
        assert!(session.poll());
        assert_eq!(session.elapsed_label(), "0:30");
        assert!((session.progress() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_completion_advances_to_next_song() {
        let (mut session, clock, _store) = started_session();
        clock.advance(SONG_LENGTH + Duration::from_millis(10));
        assert!(session.poll());
        assert_eq!(session.song_index(), 1);
        assert_eq!(session.current_song().unwrap().name, "Side to side");
        assert!(session.is_playing());
    }

    #[test]
    fn test_unlock_hidden_is_idempotent() {
        let (mut session, _clock, _store) = started_session();
        assert!(session.unlock_hidden_playlist().unwrap());
        let once = (session.playlist_index(), session.song_index());
        assert_eq!(session.status(), Some("Party Mode Activated!"));

        assert!(!session.unlock_hidden_playlist().unwrap());
        assert_eq!((session.playlist_index(), session.song_index()), once);

        let hidden_count = session
            .catalog()
            .playlists()
            .iter()
            .filter(|p| p.id == HIDDEN_PLAYLIST_ID)
            .count();
        assert_eq!(hidden_count, 1);
        assert_eq!(session.current_song().unwrap().name, "Fireball");
    }

    #[test]
    fn test_missing_resource_keeps_last_good_state() {
        let (mut session, clock, store) = started_session();
        clock.advance_ms(10_000);
        session.poll();
        store.remove("side");

        let err = session.next().unwrap_err();
        assert!(matches!(err, TurnUpError::ResourceNotFound(_)));
        assert_eq!(session.playlist_index(), 1);
        assert_eq!(session.song_index(), 0);
        assert_eq!(session.current_song().unwrap().name, "Espresso");
        assert!(session.is_playing());

        // The previous track keeps playing
        clock.advance_ms(5_000);
        session.poll();
        assert_eq!(session.elapsed_label(), "0:15");
    }

    #[test]
    fn test_resume_after_failed_auto_advance_replays_track() {
        let (mut session, clock, store) = started_session();
        store.remove("side");

        clock.advance(SONG_LENGTH + Duration::from_secs(1));
        assert!(session.poll());
        assert!(!session.is_playing());
        assert_eq!(session.current_song().unwrap().name, "Espresso");

        session.toggle_play_pause();
        assert!(session.is_playing());
        assert_eq!(session.status(), Some("Playing"));

        clock.advance_ms(10_000);
        session.poll();
        assert_eq!(session.elapsed_label(), "0:10");

        session.seek(0.0);
        clock.advance_ms(5_000);
        session.poll();
        assert_eq!(session.elapsed_label(), "0:05");

        // The replayed track completes again and the advance is retried
        store.insert_silence("side", SONG_LENGTH);
        clock.advance(SONG_LENGTH);
        assert!(session.poll());
        assert_eq!(session.current_song().unwrap().name, "Side to side");
        assert!(session.is_playing());
    }

    #[test]
    fn test_corrupt_resource_keeps_selection() {
        let (mut session, _clock, store) = started_session();
        store.insert_corrupt("GPS-A", "bad header");
        let err = session.next_playlist().unwrap_err();
        assert!(matches!(err, TurnUpError::DecodeFailure(_)));
        assert_eq!(session.playlist_index(), 1);
        assert_eq!(session.current_song().unwrap().name, "Espresso");
    }

    #[test]
    fn test_select_song_rejects_bad_input() {
        let (mut session, _clock, _store) = started_session();
        assert_eq!(
            session.select_song(42, 0).unwrap_err(),
            TurnUpError::UnknownPlaylist(42)
        );
        assert_eq!(
            session.select_song(0, 7).unwrap_err(),
            TurnUpError::SongIndexOutOfRange {
                playlist_id: 0,
                index: 7
            }
        );
        // Hidden playlist is not selectable before unlock
        assert!(session.select_song(HIDDEN_PLAYLIST_ID, 0).is_err());
    }

    #[test]
    fn test_play_song_keeps_index() {
        let (mut session, _clock, _store) = started_session();
        let lunch = session.current_playlist().unwrap().songs[2].clone();
        session.play_song(&lunch).unwrap();
        assert_eq!(session.current_song().unwrap().name, "LUNCH");
        assert_eq!(session.song_index(), 0);
    }
}
