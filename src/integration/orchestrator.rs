//! Orchestrator owning the player state
//!
//! One thread owns the playback session, the voice interpreter and the
//! recognition supervisor. Everything that can change them arrives over a
//! channel:
//! - Commands from the UI, the demo binary or tests
//! - Recognition events from recognizer threads
//! - Dark-mode changes from the brightness source
//!
//! Between messages the loop sleeps until the earliest timer deadline,
//! then polls every timer. After each pass it publishes a `NowPlaying`
//! snapshot into `SharedPlayerState`.

use crate::audio::{AudioOutput, AudioStore};
use crate::catalog::Catalog;
use crate::display::{observe_dark_mode, BrightnessSource, ClockDisplay, Subscription};
use crate::integration::config::TurnUpConfig;
use crate::playback::{PlaybackSession, SessionOptions};
use crate::state::{NowPlaying, PlayerCommand, PlayerEvent, SharedPlayerState};
use crate::utils::{earliest, OrchestratorChannels, SharedClock};
use crate::voice::{
    MicrophoneTap, NoopTap, RecognitionEvent, RecognitionSupervisor, SpeechRecognizer,
    VoiceInterpreter,
};
use crate::{Result, TurnUpError};
use crossbeam_channel::{select, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Longest the loop sleeps without checking its timers
///
/// Bounds the latency of track completion detection and of clocks that do
/// not follow real time.
const MAX_IDLE_WAIT: Duration = Duration::from_millis(50);

/// External collaborators the orchestrator is built from
pub struct OrchestratorComponents {
    pub catalog: Catalog,
    pub store: Box<dyn AudioStore>,
    pub output: Box<dyn AudioOutput>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub tap: Box<dyn MicrophoneTap>,
    pub brightness: Option<Arc<dyn BrightnessSource>>,
    pub clock: SharedClock,
}

impl OrchestratorComponents {
    /// Components without microphone tap or brightness source
    pub fn new(
        catalog: Catalog,
        store: Box<dyn AudioStore>,
        output: Box<dyn AudioOutput>,
        recognizer: Arc<dyn SpeechRecognizer>,
        clock: SharedClock,
    ) -> Self {
        Self {
            catalog,
            store,
            output,
            recognizer,
            tap: Box::new(NoopTap),
            brightness: None,
            clock,
        }
    }

    pub fn with_tap(mut self, tap: Box<dyn MicrophoneTap>) -> Self {
        self.tap = tap;
        self
    }

    pub fn with_brightness(mut self, source: Arc<dyn BrightnessSource>) -> Self {
        self.brightness = Some(source);
        self
    }
}

/// Handle for controlling the orchestrator from the UI or tests
///
/// This provides the public interface for:
/// - Sending commands
/// - Receiving events (for UI updates)
/// - Querying state (via SharedPlayerState)
#[derive(Clone)]
pub struct OrchestratorHandle {
    command_tx: Sender<PlayerCommand>,
    event_rx: Receiver<PlayerEvent>,
    state: SharedPlayerState,
    shutdown_timeout: Duration,
}

impl OrchestratorHandle {
    /// Send a command to the orchestrator
    pub fn send_command(&self, cmd: PlayerCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| TurnUpError::ChannelError(format!("Failed to send command: {}", e)))
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send_command(PlayerCommand::TogglePlayPause)
    }

    pub fn next(&self) -> Result<()> {
        self.send_command(PlayerCommand::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send_command(PlayerCommand::Previous)
    }

    pub fn next_playlist(&self) -> Result<()> {
        self.send_command(PlayerCommand::NextPlaylist)
    }

    pub fn previous_playlist(&self) -> Result<()> {
        self.send_command(PlayerCommand::PreviousPlaylist)
    }

    /// Seek to a fraction of the current track
    pub fn seek(&self, fraction: f64) -> Result<()> {
        self.send_command(PlayerCommand::Seek(fraction))
    }

    pub fn select_song(&self, playlist_id: u32, index: usize) -> Result<()> {
        self.send_command(PlayerCommand::SelectSong { playlist_id, index })
    }

    pub fn unlock_hidden_playlist(&self) -> Result<()> {
        self.send_command(PlayerCommand::UnlockHiddenPlaylist)
    }

    /// Interpret text directly (bypasses the recognizer)
    pub fn send_utterance(&self, text: impl Into<String>) -> Result<()> {
        self.send_command(PlayerCommand::Utterance(text.into()))
    }

    pub fn start_listening(&self) -> Result<()> {
        self.send_command(PlayerCommand::StartListening)
    }

    pub fn stop_listening(&self) -> Result<()> {
        self.send_command(PlayerCommand::StopListening)
    }

    /// Request shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.send_command(PlayerCommand::Shutdown)
    }

    /// Request shutdown and wait for it to complete
    pub fn shutdown_and_wait(&self) -> Result<()> {
        self.shutdown()?;
        let deadline = Instant::now() + self.shutdown_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.event_rx.recv_timeout(remaining) {
                Ok(PlayerEvent::Shutdown) => return Ok(()),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Shutdown timeout reached");
                    return Err(TurnUpError::ChannelError("Shutdown timed out".into()));
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }
        }
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<PlayerEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> Result<PlayerEvent> {
        self.event_rx
            .recv()
            .map_err(|e| TurnUpError::ChannelError(format!("Failed to receive event: {}", e)))
    }

    /// Receive an event, giving up after `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<PlayerEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Get the shared player state
    pub fn state(&self) -> &SharedPlayerState {
        &self.state
    }

    /// Block until `predicate` holds for the shared state or `timeout` passes
    ///
    /// Returns the last snapshot seen and whether the predicate held.
    pub fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> (NowPlaying, bool)
    where
        F: FnMut(&NowPlaying) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let snapshot = self.state.snapshot();
            if predicate(&snapshot) {
                return (snapshot, true);
            }
            if Instant::now() >= deadline {
                return (snapshot, false);
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

/// Owner of all player state, run on its own thread by `start`
pub struct Orchestrator {
    config: TurnUpConfig,
    state: SharedPlayerState,
    clock: SharedClock,

    command_rx: Receiver<PlayerCommand>,
    event_tx: Sender<PlayerEvent>,
    recognition_rx: Receiver<RecognitionEvent>,
    dark_mode_tx: Sender<bool>,
    dark_mode_rx: Receiver<bool>,

    session: PlaybackSession,
    interpreter: VoiceInterpreter,
    supervisor: RecognitionSupervisor,
    clock_display: ClockDisplay,
    brightness: Option<Arc<dyn BrightnessSource>>,
}

impl Orchestrator {
    /// Create an orchestrator and a handle for controlling it
    ///
    /// Nothing runs until `start()` is called.
    pub fn new(
        config: TurnUpConfig,
        components: OrchestratorComponents,
    ) -> Result<(Self, OrchestratorHandle)> {
        config.validate()?;
        let channels = OrchestratorChannels::new(config.channel_buffer_size);
        let state = SharedPlayerState::new();

        let OrchestratorComponents {
            catalog,
            store,
            output,
            recognizer,
            tap,
            brightness,
            clock,
        } = components;

        let session = PlaybackSession::new(
            catalog,
            store,
            output,
            clock.clone(),
            SessionOptions {
                default_playlist: config.playback.default_playlist,
                sampler_interval: config.sampler_interval(),
                status_display: config.status_display(),
            },
        );
        let interpreter = VoiceInterpreter::new(clock.clone(), config.title_timeout());
        let supervisor = RecognitionSupervisor::new(
            recognizer,
            tap,
            channels.recognition_tx.clone(),
            clock.clone(),
            config.restart_delay(),
        );
        let clock_display = ClockDisplay::new(config.clock_interval());

        let handle = OrchestratorHandle {
            command_tx: channels.command_tx,
            event_rx: channels.event_rx,
            state: state.clone(),
            shutdown_timeout: config.shutdown_timeout(),
        };

        let orchestrator = Self {
            config,
            state,
            clock,
            command_rx: channels.command_rx,
            event_tx: channels.event_tx,
            recognition_rx: channels.recognition_rx,
            dark_mode_tx: channels.dark_mode_tx,
            dark_mode_rx: channels.dark_mode_rx,
            session,
            interpreter,
            supervisor,
            clock_display,
            brightness,
        };

        Ok((orchestrator, handle))
    }

    /// Start the owning thread
    ///
    /// This consumes the orchestrator and returns the join handles of the
    /// threads it started.
    pub fn start(self) -> Result<Vec<JoinHandle<()>>> {
        let handle = thread::Builder::new()
            .name("turnup-orchestrator".into())
            .spawn(move || self.run())?;
        info!("Orchestrator loop started");
        Ok(vec![handle])
    }

    fn run(mut self) {
        info!("Orchestrator main loop starting");
        let mut dark_mode = false;

        // Held for the lifetime of the loop, unsubscribes on drop
        let _brightness_subscription: Option<Subscription> = self.brightness.clone().map(|source| {
            let tx = self.dark_mode_tx.clone();
            observe_dark_mode(
                source.as_ref(),
                self.config.display.dark_mode_threshold,
                move |dark| {
                    let _ = tx.try_send(dark);
                },
            )
        });

        if let Err(e) = self.session.start() {
            self.report_error(&e);
        }
        self.clock_display.start(self.clock.now());
        if self.config.voice.listen_on_start {
            self.supervisor.start();
        }
        let mut last = self.publish(NowPlaying::default(), dark_mode);

        let command_rx = self.command_rx.clone();
        let recognition_rx = self.recognition_rx.clone();
        let dark_mode_rx = self.dark_mode_rx.clone();

        loop {
            let timeout = self.wait_timeout();
            select! {
                recv(command_rx) -> cmd => match cmd {
                    Ok(PlayerCommand::Shutdown) => {
                        info!("Shutdown requested");
                        break;
                    }
                    Ok(cmd) => self.handle_command(cmd),
                    Err(_) => {
                        warn!("Command channel disconnected");
                        break;
                    }
                },

                recv(recognition_rx) -> event => {
                    if let Ok(event) = event {
                        self.handle_recognition(event);
                    }
                },

                recv(dark_mode_rx) -> dark => {
                    if let Ok(dark) = dark {
                        debug!("Dark mode: {}", dark);
                        dark_mode = dark;
                    }
                },

                default(timeout) => {}
            }

            self.poll_timers();
            last = self.publish(last, dark_mode);
        }

        self.supervisor.stop();
        self.publish(last, dark_mode);

        let _ = self.event_tx.try_send(PlayerEvent::Shutdown);
        info!("Orchestrator shutdown complete");
    }

    /// Time until the next timer deadline, capped at `MAX_IDLE_WAIT`
    fn wait_timeout(&self) -> Duration {
        let next = earliest([
            self.session.next_deadline(),
            self.interpreter.deadline(),
            self.supervisor.deadline(),
            self.clock_display.deadline(),
        ]);
        match next {
            Some(deadline) => deadline
                .saturating_duration_since(self.clock.now())
                .min(MAX_IDLE_WAIT),
            None => MAX_IDLE_WAIT,
        }
    }

    fn handle_command(&mut self, cmd: PlayerCommand) {
        debug!("Command: {:?}", cmd);
        let result = match cmd {
            PlayerCommand::TogglePlayPause => {
                self.session.toggle_play_pause();
                Ok(())
            }
            PlayerCommand::Next => self.session.next(),
            PlayerCommand::Previous => self.session.previous(),
            PlayerCommand::NextPlaylist => self.session.next_playlist(),
            PlayerCommand::PreviousPlaylist => self.session.previous_playlist(),
            PlayerCommand::Seek(fraction) => {
                self.session.seek(fraction);
                Ok(())
            }
            PlayerCommand::SelectSong { playlist_id, index } => {
                self.session.select_song(playlist_id, index)
            }
            PlayerCommand::UnlockHiddenPlaylist => {
                self.session.unlock_hidden_playlist().map(|_| ())
            }
            PlayerCommand::Utterance(text) => self.interpret(&text),
            PlayerCommand::StartListening => {
                self.supervisor.start();
                Ok(())
            }
            PlayerCommand::StopListening => {
                self.supervisor.stop();
                Ok(())
            }
            // Handled by the loop
            PlayerCommand::Shutdown => Ok(()),
        };
        if let Err(e) = result {
            self.report_error(&e);
        }
    }

    fn handle_recognition(&mut self, event: RecognitionEvent) {
        match self.supervisor.handle_event(event) {
            Ok(Some(text)) => {
                if let Err(e) = self.interpret(&text) {
                    self.report_error(&e);
                }
            }
            Ok(None) => {}
            Err(e) => self.report_error(&e),
        }
    }

    fn interpret(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let outcome = self.interpreter.handle_utterance(text, &mut self.session)?;
        debug!("Interpreted {:?} as {:?}", text, outcome);
        Ok(())
    }

    fn poll_timers(&mut self) {
        self.session.poll();
        self.interpreter.poll(&mut self.session);
        if let Err(e) = self.supervisor.poll() {
            self.report_error(&e);
        }
        self.clock_display.poll(self.clock.now());
    }

    fn report_error(&mut self, e: &TurnUpError) {
        if e.is_recoverable() {
            warn!("{}", e);
        } else {
            error!("{}", e);
        }
        if matches!(e, TurnUpError::RecognitionAuthDenied) {
            self.session.show_status(e.user_message());
        }
        let _ = self.event_tx.try_send(PlayerEvent::Error(e.user_message()));
    }

    /// Publish the current snapshot, emitting events for what changed
    fn publish(&self, previous: NowPlaying, dark_mode: bool) -> NowPlaying {
        let mut next = NowPlaying {
            clock_label: self.clock_display.label().to_string(),
            dark_mode,
            voice_mode: self.interpreter.mode(),
            recognition: self.supervisor.state(),
            ..NowPlaying::default()
        };
        next.apply_playback(self.session.snapshot());

        if next.status_sequence != previous.status_sequence {
            if let Some(status) = &next.status {
                let _ = self.event_tx.try_send(PlayerEvent::Status(status.clone()));
            }
        }
        if self.state.publish(next.clone()) {
            let _ = self.event_tx.try_send(PlayerEvent::StateChanged);
        }
        next
    }
}
