//! Voice command state machine
//!
//! Idle utterances are matched against keyword commands. The exact
//! utterance "play" switches to title collection: every following
//! utterance is added to the collected words and matched against playlist
//! names, then against the songs of the current playlist. Collection ends
//! on a match or after a period without utterances.

use crate::playback::PlaybackSession;
use crate::utils::{OneShotTimer, SharedClock};
use crate::voice::command::VoiceCommand;
use crate::Result;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default inactivity timeout while collecting a title
pub const DEFAULT_TITLE_TIMEOUT: Duration = Duration::from_secs(5);

pub const PROMPT_STATUS: &str = "Say the song or playlist name...";
pub const NOTHING_RECOGNIZED_STATUS: &str = "Nothing recognized";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InterpreterMode {
    #[default]
    Idle,
    CollectingTitle,
}

impl std::fmt::Display for InterpreterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpreterMode::Idle => write!(f, "Idle"),
            InterpreterMode::CollectingTitle => write!(f, "Collecting title"),
        }
    }
}

/// What an utterance did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// Nothing matched, or the utterance was empty
    Ignored,
    /// An idle keyword command was handled
    Command(VoiceCommand),
    /// Added to the collected words without a match yet
    Collecting,
    /// Switched to the playlist at this position
    MatchedPlaylist(usize),
    /// Loaded the song with this name
    MatchedSong(String),
}

pub struct VoiceInterpreter {
    mode: InterpreterMode,
    words: Vec<String>,
    timeout: OneShotTimer,
    title_timeout: Duration,
    clock: SharedClock,
}

impl VoiceInterpreter {
    pub fn new(clock: SharedClock, title_timeout: Duration) -> Self {
        Self {
            mode: InterpreterMode::Idle,
            words: Vec::new(),
            timeout: OneShotTimer::new(),
            title_timeout,
            clock,
        }
    }

    pub fn mode(&self) -> InterpreterMode {
        self.mode
    }

    pub fn is_collecting(&self) -> bool {
        self.mode == InterpreterMode::CollectingTitle
    }

    /// Words collected in the current title lookup
    pub fn collected_words(&self) -> &[String] {
        &self.words
    }

    /// Pending inactivity timeout
    pub fn deadline(&self) -> Option<Instant> {
        self.timeout.deadline()
    }

    /// Interpret one recognized fragment
    ///
    /// Errors come from the playback operation the utterance triggered;
    /// the interpreter state is already updated when they are returned.
    pub fn handle_utterance(
        &mut self,
        text: &str,
        session: &mut PlaybackSession,
    ) -> Result<Interpretation> {
        let utterance = text.trim().to_lowercase();
        if utterance.is_empty() {
            return Ok(Interpretation::Ignored);
        }
        debug!("Heard: {}", utterance);

        match self.mode {
            InterpreterMode::Idle => self.handle_idle(&utterance, session),
            InterpreterMode::CollectingTitle => self.handle_title_word(utterance, session),
        }
    }

    /// Fire the inactivity timeout if due
    ///
    /// Returns true when title collection was abandoned.
    pub fn poll(&mut self, session: &mut PlaybackSession) -> bool {
        let now = self.clock.now();
        if !self.timeout.fire(now) {
            return false;
        }
        if !self.is_collecting() {
            return false;
        }
        info!("Title lookup timed out after {:?}", self.title_timeout);
        self.reset();
        session.show_status(NOTHING_RECOGNIZED_STATUS);
        true
    }

    /// Abandon any title lookup
    pub fn reset(&mut self) {
        self.mode = InterpreterMode::Idle;
        self.words.clear();
        self.timeout.cancel();
    }

    fn handle_idle(
        &mut self,
        utterance: &str,
        session: &mut PlaybackSession,
    ) -> Result<Interpretation> {
        let Some(command) = VoiceCommand::parse(utterance) else {
            return Ok(Interpretation::Ignored);
        };
        debug!("Voice command: {}", command);

        match command {
            VoiceCommand::Pause => {
                if session.is_playing() {
                    session.pause();
                }
            }
            VoiceCommand::Next => session.next()?,
            VoiceCommand::Previous => session.previous()?,
            VoiceCommand::Party => {
                session.unlock_hidden_playlist()?;
            }
            VoiceCommand::PlayByTitle => {
                self.mode = InterpreterMode::CollectingTitle;
                self.words.clear();
                self.timeout.arm(self.clock.now(), self.title_timeout);
                session.show_status(PROMPT_STATUS);
            }
            VoiceCommand::Resume => {
                if !session.is_playing() {
                    session.resume();
                }
            }
        }
        Ok(Interpretation::Command(command))
    }

    fn handle_title_word(
        &mut self,
        utterance: String,
        session: &mut PlaybackSession,
    ) -> Result<Interpretation> {
        self.timeout.arm(self.clock.now(), self.title_timeout);
        self.words.push(utterance);

        if let Some(position) = session.catalog().match_playlist(&self.words) {
            let name = session
                .catalog()
                .playlist(position)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            info!("Title lookup matched playlist {}", name);
            self.reset();
            session.select_playlist_index(position)?;
            session.show_status(format!("Playing {}", name));
            return Ok(Interpretation::MatchedPlaylist(position));
        }

        let song = session
            .current_playlist()
            .and_then(|p| p.match_song(&self.words))
            .cloned();
        if let Some(song) = song {
            info!("Title lookup matched song {}", song.name);
            self.reset();
            session.play_song(&song)?;
            session.show_status(format!("Playing {}", song.name));
            return Ok(Interpretation::MatchedSong(song.name));
        }

        debug!("No match yet for {:?}", self.words);
        Ok(Interpretation::Collecting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MemoryAudioStore, SimulatedOutput};
    use crate::catalog::Catalog;
    use crate::playback::SessionOptions;
    use crate::utils::ManualClock;
    use std::sync::Arc;

    fn setup() -> (VoiceInterpreter, PlaybackSession, Arc<ManualClock>) {
        let clock = ManualClock::shared();
        let catalog = Catalog::builtin();
        let store = MemoryAudioStore::with_catalog(&catalog, Duration::from_secs(180));
        let mut session = PlaybackSession::new(
            catalog,
            Box::new(store),
            Box::new(SimulatedOutput::new(clock.clone())),
            clock.clone(),
            SessionOptions::default(),
        );
        session.start().unwrap();
        let interpreter = VoiceInterpreter::new(clock.clone(), DEFAULT_TITLE_TIMEOUT);
        (interpreter, session, clock)
    }

    #[test]
    fn test_play_then_song_title() {
        let (mut voice, mut session, clock) = setup();
        session.next().unwrap();

        let result = voice.handle_utterance("play", &mut session).unwrap();
        assert_eq!(result, Interpretation::Command(VoiceCommand::PlayByTitle));
        assert!(voice.is_collecting());
        assert_eq!(session.status(), Some(PROMPT_STATUS));

        clock.advance_ms(2000);
        let result = voice.handle_utterance("espresso", &mut session).unwrap();
        assert_eq!(result, Interpretation::MatchedSong("Espresso".into()));
        assert_eq!(voice.mode(), InterpreterMode::Idle);
        assert!(voice.collected_words().is_empty());
        assert!(voice.deadline().is_none());
        assert_eq!(session.current_song().unwrap().name, "Espresso");
        assert_eq!(session.status(), Some("Playing Espresso"));
    }

    #[test]
    fn test_play_then_playlist_name() {
        let (mut voice, mut session, _clock) = setup();
        voice.handle_utterance("play", &mut session).unwrap();
        let result = voice.handle_utterance("bulgaria", &mut session).unwrap();
        assert_eq!(result, Interpretation::MatchedPlaylist(0));
        assert_eq!(session.playlist_index(), 0);
        assert_eq!(session.song_index(), 0);
        assert_eq!(session.status(), Some("Playing Welcome to Bulgaria"));
    }

    #[test]
    fn test_silence_times_out() {
        let (mut voice, mut session, clock) = setup();
        voice.handle_utterance("play", &mut session).unwrap();

        clock.advance_ms(4999);
        assert!(!voice.poll(&mut session));
        assert!(voice.is_collecting());

        clock.advance_ms(1);
        assert!(voice.poll(&mut session));
        assert_eq!(voice.mode(), InterpreterMode::Idle);
        assert!(voice.collected_words().is_empty());
        assert_eq!(session.status(), Some(NOTHING_RECOGNIZED_STATUS));
    }

    #[test]
    fn test_each_word_rearms_timeout() {
        let (mut voice, mut session, clock) = setup();
        voice.handle_utterance("play", &mut session).unwrap();

        clock.advance_ms(4000);
        let result = voice.handle_utterance("xyz", &mut session).unwrap();
        assert_eq!(result, Interpretation::Collecting);

        // The first deadline has passed but was superseded
        clock.advance_ms(4000);
        assert!(!voice.poll(&mut session));
        assert_eq!(voice.collected_words(), ["xyz".to_string()]);

        clock.advance_ms(1000);
        assert!(voice.poll(&mut session));
        assert!(voice.collected_words().is_empty());
    }

    #[test]
    fn test_skip_advances_once() {
        let (mut voice, mut session, _clock) = setup();
        voice.handle_utterance("please skip this", &mut session).unwrap();
        assert_eq!(session.song_index(), 1);
    }

    #[test]
    fn test_stop_wins_over_next() {
        let (mut voice, mut session, _clock) = setup();
        voice.handle_utterance("stop next", &mut session).unwrap();
        assert_eq!(session.song_index(), 0);
        assert!(!session.is_playing());
    }

    #[test]
    fn test_resume_only_when_paused() {
        let (mut voice, mut session, _clock) = setup();
        voice.handle_utterance("continue", &mut session).unwrap();
        assert!(session.is_playing());
        assert_eq!(session.status(), None);

        voice.handle_utterance("pause", &mut session).unwrap();
        assert!(!session.is_playing());
        voice.handle_utterance("resume please", &mut session).unwrap();
        assert!(session.is_playing());
        assert_eq!(session.status(), Some("Playing"));
    }

    #[test]
    fn test_party_unlocks_hidden_playlist() {
        let (mut voice, mut session, _clock) = setup();
        voice.handle_utterance("party", &mut session).unwrap();
        assert_eq!(session.current_playlist().unwrap().id, 99);
        assert_eq!(session.status(), Some("Party Mode Activated!"));
    }

    #[test]
    fn test_empty_and_unknown_are_ignored() {
        let (mut voice, mut session, _clock) = setup();
        assert_eq!(
            voice.handle_utterance("   ", &mut session).unwrap(),
            Interpretation::Ignored
        );
        assert_eq!(
            voice.handle_utterance("hello", &mut session).unwrap(),
            Interpretation::Ignored
        );
        assert_eq!(session.song_index(), 0);
    }

    #[test]
    fn test_keywords_are_title_words_while_collecting() {
        let (mut voice, mut session, _clock) = setup();
        voice.handle_utterance("play", &mut session).unwrap();
        let result = voice.handle_utterance("zzz next", &mut session).unwrap();
        assert_eq!(result, Interpretation::Collecting);
        assert_eq!(session.song_index(), 0);
    }
}
