//! Recognizer fed with ready-made text
//!
//! Lines arriving on a channel are forwarded as transcripts of whichever
//! session is active. The binary wires stdin into it; tests push strings
//! directly. The capture buffer handed to each session is not read.

use crate::audio::buffer::CaptureBuffer;
use crate::voice::recognition::{
    AuthorizationStatus, RecognitionEvent, SessionId, SpeechRecognizer,
};
use crate::Result;
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

struct ActiveSession {
    id: SessionId,
    /// Dropping this ends the forwarding thread
    _stop_tx: Sender<()>,
}

#[derive(Default)]
struct Shared {
    active: Option<ActiveSession>,
    /// Lines taken off the feed while no session was active
    held: VecDeque<String>,
}

enum Forwarded {
    Continue,
    Done,
}

pub struct ChannelRecognizer {
    lines: Receiver<String>,
    authorization: AuthorizationStatus,
    /// End each session after this many transcripts
    session_limit: Option<usize>,
    shared: Arc<Mutex<Shared>>,
}

impl ChannelRecognizer {
    pub fn new(lines: Receiver<String>) -> Self {
        Self {
            lines,
            authorization: AuthorizationStatus::Authorized,
            session_limit: None,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Answer authorization requests with `status`
    pub fn with_authorization(mut self, status: AuthorizationStatus) -> Self {
        self.authorization = status;
        self
    }

    /// Mark every `limit`-th transcript final, ending the session
    pub fn with_session_limit(mut self, limit: usize) -> Self {
        self.session_limit = Some(limit.max(1));
        self
    }
}

/// Deliver one line to whichever session is active right now
///
/// A thread whose session was superseded hands the line to the new
/// session and stops. With no session active the line is held for the
/// next one.
fn forward(
    shared: &Mutex<Shared>,
    session: SessionId,
    text: String,
    heard: &mut usize,
    limit: Option<usize>,
    events: &Sender<RecognitionEvent>,
) -> Forwarded {
    let mut shared = shared.lock();
    let Some(active) = shared.active.as_ref().map(|a| a.id) else {
        debug!("Holding \"{}\" until the next session", text);
        shared.held.push_back(text);
        return Forwarded::Done;
    };

    let is_final = if active == session {
        *heard += 1;
        limit.is_some_and(|n| *heard >= n)
    } else {
        debug!("Session {} superseded, passing line to {}", session, active);
        false
    };

    // No blocking send under the lock; stop_session runs on the draining thread
    let event = RecognitionEvent::Transcript {
        session: active,
        text,
        is_final,
    };
    match events.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => warn!("Recognition channel full, dropping utterance"),
        Err(TrySendError::Disconnected(_)) => return Forwarded::Done,
    }

    if active != session || is_final {
        Forwarded::Done
    } else {
        Forwarded::Continue
    }
}

impl SpeechRecognizer for ChannelRecognizer {
    fn request_authorization(&self) -> AuthorizationStatus {
        self.authorization
    }

    fn start_session(
        &self,
        session: SessionId,
        _audio: CaptureBuffer,
        events: Sender<RecognitionEvent>,
    ) -> Result<()> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let lines = self.lines.clone();
        let limit = self.session_limit;
        let shared = self.shared.clone();

        self.shared.lock().active = Some(ActiveSession {
            id: session,
            _stop_tx: stop_tx,
        });

        let spawned = thread::Builder::new()
            .name(format!("recognizer-{}", session))
            .spawn(move || {
                let mut heard = 0usize;
                loop {
                    let held = {
                        let mut shared = shared.lock();
                        if shared.active.as_ref().is_some_and(|a| a.id == session) {
                            shared.held.pop_front()
                        } else {
                            None
                        }
                    };
                    let text = match held {
                        Some(text) => text,
                        None => select! {
                            recv(stop_rx) -> _ => break,
                            recv(lines) -> line => match line {
                                Ok(text) => text,
                                Err(_) => {
                                    info!("Utterance feed closed");
                                    let _ = events.try_send(RecognitionEvent::Ended { session });
                                    break;
                                }
                            },
                        },
                    };
                    if let Forwarded::Done =
                        forward(&shared, session, text, &mut heard, limit, &events)
                    {
                        break;
                    }
                }
                debug!("Recognizer session {} finished", session);
            });

        if let Err(e) = spawned {
            let mut shared = self.shared.lock();
            if shared.active.as_ref().is_some_and(|a| a.id == session) {
                shared.active = None;
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn stop_session(&self, session: SessionId) {
        let mut shared = self.shared.lock();
        match shared.active.as_ref() {
            Some(current) if current.id == session => {
                shared.active = None;
            }
            Some(current) => warn!(
                "Stop for session {} while {} is active",
                session, current.id
            ),
            None => {}
        }
    }
}
