//! Speech recognition session supervision
//!
//! The supervisor keeps listening perpetual: every recognition session
//! ends eventually (final result or error) and a fresh one is started
//! after a short delay until [`RecognitionSupervisor::stop`] is called.
//! Recognizer callbacks arrive from other threads as [`RecognitionEvent`]s
//! and are handled on the owning thread.

use crate::audio::buffer::{CaptureBuffer, DEFAULT_CAPTURE_CAPACITY};
use crate::utils::{OneShotTimer, SharedClock};
use crate::{Result, TurnUpError};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default delay before a new session replaces an ended one
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(500);

pub type SessionId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
    Restricted,
    NotDetermined,
}

impl AuthorizationStatus {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationStatus::Authorized)
    }
}

/// Message from a recognizer (or its authorization request) to the owner
#[derive(Clone, Debug, PartialEq)]
pub enum RecognitionEvent {
    /// Answer to an authorization request
    Authorization(AuthorizationStatus),
    /// Recognized text for a session
    Transcript {
        session: SessionId,
        text: String,
        is_final: bool,
    },
    /// The session failed and is over
    Failed { session: SessionId, error: String },
    /// The session ended without a final transcript
    Ended { session: SessionId },
}

impl RecognitionEvent {
    /// Session the event belongs to, None for authorization answers
    pub fn session(&self) -> Option<SessionId> {
        match self {
            RecognitionEvent::Authorization(_) => None,
            RecognitionEvent::Transcript { session, .. }
            | RecognitionEvent::Failed { session, .. }
            | RecognitionEvent::Ended { session } => Some(*session),
        }
    }
}

/// Speech-to-text backend
///
/// Implementations deliver results for a session through the events
/// sender, from any thread, until `stop_session` is called for it.
pub trait SpeechRecognizer: Send + Sync {
    /// Ask for permission to recognize speech. May block.
    fn request_authorization(&self) -> AuthorizationStatus;

    /// Start recognizing audio appended to `audio`
    fn start_session(
        &self,
        session: SessionId,
        audio: CaptureBuffer,
        events: Sender<RecognitionEvent>,
    ) -> Result<()>;

    /// Stop a session; no more events should be sent for it
    fn stop_session(&self, session: SessionId);
}

/// Source of microphone samples for recognition
pub trait MicrophoneTap: Send {
    /// Start appending captured samples to `buffer`, replacing any previous tap
    fn install(&mut self, buffer: CaptureBuffer) -> Result<()>;

    /// Stop capturing
    fn remove(&mut self);
}

/// Tap that captures nothing, for recognizers that bring their own input
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTap;

impl MicrophoneTap for NoopTap {
    fn install(&mut self, _buffer: CaptureBuffer) -> Result<()> {
        Ok(())
    }

    fn remove(&mut self) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SupervisorState {
    #[default]
    Stopped,
    /// Waiting for the authorization answer
    Authorizing,
    Listening,
    /// Session over, restart pending
    Restarting,
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorState::Stopped => write!(f, "Stopped"),
            SupervisorState::Authorizing => write!(f, "Authorizing"),
            SupervisorState::Listening => write!(f, "Listening"),
            SupervisorState::Restarting => write!(f, "Restarting"),
        }
    }
}

pub struct RecognitionSupervisor {
    recognizer: Arc<dyn SpeechRecognizer>,
    tap: Box<dyn MicrophoneTap>,
    events_tx: Sender<RecognitionEvent>,
    clock: SharedClock,
    restart_delay: Duration,
    capture_capacity: usize,

    state: SupervisorState,
    active: Option<SessionId>,
    next_session: SessionId,
    restart: OneShotTimer,
    capture: Option<CaptureBuffer>,
}

impl RecognitionSupervisor {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        tap: Box<dyn MicrophoneTap>,
        events_tx: Sender<RecognitionEvent>,
        clock: SharedClock,
        restart_delay: Duration,
    ) -> Self {
        Self {
            recognizer,
            tap,
            events_tx,
            clock,
            restart_delay,
            capture_capacity: DEFAULT_CAPTURE_CAPACITY,
            state: SupervisorState::Stopped,
            active: None,
            next_session: 1,
            restart: OneShotTimer::new(),
            capture: None,
        }
    }

    /// Capacity of each session's capture buffer, in samples
    pub fn with_capture_capacity(mut self, capacity: usize) -> Self {
        self.capture_capacity = capacity;
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active
    }

    /// Capture buffer of the active session
    pub fn capture(&self) -> Option<&CaptureBuffer> {
        self.capture.as_ref()
    }

    /// Pending restart deadline
    pub fn deadline(&self) -> Option<Instant> {
        self.restart.deadline()
    }

    /// Request authorization and start listening once granted
    ///
    /// The request runs on its own thread; the answer comes back as a
    /// [`RecognitionEvent::Authorization`].
    pub fn start(&mut self) {
        if self.state != SupervisorState::Stopped {
            debug!("Recognition already {}", self.state);
            return;
        }
        self.state = SupervisorState::Authorizing;

        let recognizer = Arc::clone(&self.recognizer);
        let events_tx = self.events_tx.clone();
        let spawned = thread::Builder::new()
            .name("speech-authorization".into())
            .spawn(move || {
                let status = recognizer.request_authorization();
                let _ = events_tx.send(RecognitionEvent::Authorization(status));
            });
        if let Err(e) = spawned {
            warn!("Failed to spawn authorization thread: {}", e);
            self.state = SupervisorState::Stopped;
        }
    }

    /// Tear down the active session and cancel any pending restart
    pub fn stop(&mut self) {
        self.restart.cancel();
        self.end_session();
        if self.state != SupervisorState::Stopped {
            info!("Recognition stopped");
        }
        self.state = SupervisorState::Stopped;
    }

    /// Handle an event from the recognizer
    ///
    /// Returns the transcript to interpret, if the event carried one for
    /// the active session. Session errors are logged and restarted, not
    /// returned.
    pub fn handle_event(&mut self, event: RecognitionEvent) -> Result<Option<String>> {
        if let Some(session) = event.session() {
            if self.active != Some(session) {
                debug!("Ignoring event from superseded session {}", session);
                return Ok(None);
            }
        }

        match event {
            RecognitionEvent::Authorization(status) => {
                if self.state != SupervisorState::Authorizing {
                    debug!("Late authorization answer ignored");
                    return Ok(None);
                }
                if !status.is_authorized() {
                    warn!("Speech recognition not authorized: {:?}", status);
                    self.state = SupervisorState::Stopped;
                    return Err(TurnUpError::RecognitionAuthDenied);
                }
                info!("Speech recognition authorized");
                self.begin_session()?;
                Ok(None)
            }
            RecognitionEvent::Transcript { text, is_final, .. } => {
                let text = text.trim().to_lowercase();
                if is_final {
                    debug!("Final transcript, session over");
                    self.end_session();
                    self.schedule_restart();
                }
                Ok((!text.is_empty()).then_some(text))
            }
            RecognitionEvent::Failed { session, error } => {
                let e = TurnUpError::RecognitionSessionError(error);
                warn!("Session {}: {}", session, e);
                self.end_session();
                self.schedule_restart();
                Ok(None)
            }
            RecognitionEvent::Ended { session } => {
                debug!("Session {} ended", session);
                self.end_session();
                self.schedule_restart();
                Ok(None)
            }
        }
    }

    /// Start the next session once the restart delay is over
    ///
    /// Returns true if a restart was attempted.
    pub fn poll(&mut self) -> Result<bool> {
        let now = self.clock.now();
        if !self.restart.fire(now) {
            return Ok(false);
        }
        if self.state != SupervisorState::Restarting {
            return Ok(false);
        }
        debug!("Restarting recognition");
        self.begin_session()?;
        Ok(true)
    }

    fn schedule_restart(&mut self) {
        self.state = SupervisorState::Restarting;
        self.restart.arm(self.clock.now(), self.restart_delay);
    }

    /// Start a fresh session, replacing the current one
    ///
    /// A tap failure aborts this attempt without scheduling a restart.
    fn begin_session(&mut self) -> Result<()> {
        self.end_session();

        let capture = CaptureBuffer::new(self.capture_capacity);
        if let Err(e) = self.tap.install(capture.clone()) {
            warn!("Microphone setup failed: {}", e);
            self.state = SupervisorState::Stopped;
            return Err(e);
        }

        let session = self.next_session;
        self.next_session += 1;

        if let Err(e) =
            self.recognizer
                .start_session(session, capture.clone(), self.events_tx.clone())
        {
            warn!("Recognition session {} failed to start: {}", session, e);
            self.tap.remove();
            self.schedule_restart();
            return Ok(());
        }

        info!("Listening (session {})", session);
        self.active = Some(session);
        self.capture = Some(capture);
        self.state = SupervisorState::Listening;
        Ok(())
    }

    fn end_session(&mut self) {
        if let Some(session) = self.active.take() {
            self.recognizer.stop_session(session);
            self.tap.remove();
        }
        self.capture = None;
    }
}

impl Drop for RecognitionSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use crossbeam_channel::{unbounded, Receiver};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeRecognizer {
        denied: bool,
        started: Mutex<Vec<SessionId>>,
        stopped: Mutex<Vec<SessionId>>,
    }

    impl SpeechRecognizer for FakeRecognizer {
        fn request_authorization(&self) -> AuthorizationStatus {
            if self.denied {
                AuthorizationStatus::Denied
            } else {
                AuthorizationStatus::Authorized
            }
        }

        fn start_session(
            &self,
            session: SessionId,
            _audio: CaptureBuffer,
            _events: Sender<RecognitionEvent>,
        ) -> Result<()> {
            self.started.lock().push(session);
            Ok(())
        }

        fn stop_session(&self, session: SessionId) {
            self.stopped.lock().push(session);
        }
    }

    struct FailingTap;

    impl MicrophoneTap for FailingTap {
        fn install(&mut self, _buffer: CaptureBuffer) -> Result<()> {
            Err(TurnUpError::AudioSessionConfigFailure("no input".into()))
        }

        fn remove(&mut self) {}
    }

    struct Harness {
        supervisor: RecognitionSupervisor,
        recognizer: Arc<FakeRecognizer>,
        events: Receiver<RecognitionEvent>,
        clock: Arc<ManualClock>,
    }

    fn harness(recognizer: FakeRecognizer, tap: Box<dyn MicrophoneTap>) -> Harness {
        let clock = ManualClock::shared();
        let recognizer = Arc::new(recognizer);
        let (tx, events) = unbounded();
        let supervisor = RecognitionSupervisor::new(
            recognizer.clone(),
            tap,
            tx,
            clock.clone(),
            DEFAULT_RESTART_DELAY,
        );
        Harness {
            supervisor,
            recognizer,
            events,
            clock,
        }
    }

    fn authorize(h: &mut Harness) -> Result<Option<String>> {
        h.supervisor.start();
        let answer = h
            .events
            .recv_timeout(Duration::from_secs(5))
            .expect("authorization answer");
        h.supervisor.handle_event(answer)
    }

    #[test]
    fn test_authorized_start_begins_session() {
        let mut h = harness(FakeRecognizer::default(), Box::new(NoopTap));
        authorize(&mut h).unwrap();
        assert_eq!(h.supervisor.state(), SupervisorState::Listening);
        assert_eq!(h.supervisor.active_session(), Some(1));
        assert!(h.supervisor.capture().is_some());
        assert_eq!(*h.recognizer.started.lock(), vec![1]);
    }

    #[test]
    fn test_denied_authorization() {
        let recognizer = FakeRecognizer {
            denied: true,
            ..Default::default()
        };
        let mut h = harness(recognizer, Box::new(NoopTap));
        let err = authorize(&mut h).unwrap_err();
        assert_eq!(err, TurnUpError::RecognitionAuthDenied);
        assert_eq!(err.user_message(), "Permission denied");
        assert_eq!(h.supervisor.state(), SupervisorState::Stopped);
        assert!(h.recognizer.started.lock().is_empty());
    }

    #[test]
    fn test_transcripts_are_normalized() {
        let mut h = harness(FakeRecognizer::default(), Box::new(NoopTap));
        authorize(&mut h).unwrap();

        let text = h
            .supervisor
            .handle_event(RecognitionEvent::Transcript {
                session: 1,
                text: "  Next ".into(),
                is_final: false,
            })
            .unwrap();
        assert_eq!(text.as_deref(), Some("next"));

        let empty = h
            .supervisor
            .handle_event(RecognitionEvent::Transcript {
                session: 1,
                text: "   ".into(),
                is_final: false,
            })
            .unwrap();
        assert_eq!(empty, None);
    }

    #[test]
    fn test_restart_after_session_error() {
        let mut h = harness(FakeRecognizer::default(), Box::new(NoopTap));
        authorize(&mut h).unwrap();

        h.supervisor
            .handle_event(RecognitionEvent::Failed {
                session: 1,
                error: "timeout".into(),
            })
            .unwrap();
        assert_eq!(h.supervisor.state(), SupervisorState::Restarting);
        assert_eq!(*h.recognizer.stopped.lock(), vec![1]);

        h.clock.advance_ms(499);
        assert!(!h.supervisor.poll().unwrap());

        h.clock.advance_ms(1);
        assert!(h.supervisor.poll().unwrap());
        assert_eq!(h.supervisor.active_session(), Some(2));
        assert_eq!(h.supervisor.state(), SupervisorState::Listening);
    }

    #[test]
    fn test_final_transcript_is_delivered_then_restarts() {
        let mut h = harness(FakeRecognizer::default(), Box::new(NoopTap));
        authorize(&mut h).unwrap();

        let text = h
            .supervisor
            .handle_event(RecognitionEvent::Transcript {
                session: 1,
                text: "pause".into(),
                is_final: true,
            })
            .unwrap();
        assert_eq!(text.as_deref(), Some("pause"));
        assert_eq!(h.supervisor.state(), SupervisorState::Restarting);

        h.clock.advance_ms(500);
        assert!(h.supervisor.poll().unwrap());
        assert_eq!(h.supervisor.active_session(), Some(2));
    }

    #[test]
    fn test_stale_session_events_are_ignored() {
        let mut h = harness(FakeRecognizer::default(), Box::new(NoopTap));
        authorize(&mut h).unwrap();
        h.supervisor
            .handle_event(RecognitionEvent::Ended { session: 1 })
            .unwrap();
        h.clock.advance_ms(500);
        h.supervisor.poll().unwrap();

        let text = h
            .supervisor
            .handle_event(RecognitionEvent::Transcript {
                session: 1,
                text: "next".into(),
                is_final: true,
            })
            .unwrap();
        assert_eq!(text, None);
        assert_eq!(h.supervisor.state(), SupervisorState::Listening);
        assert_eq!(h.supervisor.active_session(), Some(2));
    }

    #[test]
    fn test_stop_cancels_pending_restart() {
        let mut h = harness(FakeRecognizer::default(), Box::new(NoopTap));
        authorize(&mut h).unwrap();
        h.supervisor
            .handle_event(RecognitionEvent::Ended { session: 1 })
            .unwrap();
        h.supervisor.stop();
        assert!(h.supervisor.deadline().is_none());

        h.clock.advance_ms(5000);
        assert!(!h.supervisor.poll().unwrap());
        assert_eq!(h.supervisor.state(), SupervisorState::Stopped);
        assert_eq!(*h.recognizer.started.lock(), vec![1]);
    }

    #[test]
    fn test_tap_failure_aborts_attempt() {
        let mut h = harness(FakeRecognizer::default(), Box::new(FailingTap));
        let err = authorize(&mut h).unwrap_err();
        assert!(matches!(err, TurnUpError::AudioSessionConfigFailure(_)));
        assert_eq!(h.supervisor.state(), SupervisorState::Stopped);
        assert!(h.supervisor.deadline().is_none());
        assert!(h.recognizer.started.lock().is_empty());
    }
}
