//! Ephemeral status line
//!
//! Holds at most one message. Showing a new message rearms the clear
//! timer, so an older message's pending clear never hides a newer one.

use crate::utils::OneShotTimer;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default time a status message stays visible
pub const DEFAULT_STATUS_DISPLAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct StatusNotifier {
    message: Option<String>,
    clear: OneShotTimer,
    display_for: Duration,
    /// Bumped on every `show`, so repeats of the same text are distinguishable
    sequence: u64,
}

impl StatusNotifier {
    pub fn new(display_for: Duration) -> Self {
        Self {
            message: None,
            clear: OneShotTimer::new(),
            display_for,
            sequence: 0,
        }
    }

    /// Show a message, superseding whatever is visible
    pub fn show(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        debug!("Status: {}", text);
        self.message = Some(text);
        self.sequence += 1;
        self.clear.arm(now, self.display_for);
    }

    /// Number of messages shown so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Visible message, if any
    pub fn current(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// When the visible message will be cleared
    pub fn deadline(&self) -> Option<Instant> {
        self.clear.deadline()
    }

    /// Clear the message once its display time is over
    ///
    /// Returns true if a message was cleared.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.clear.fire(now) {
            self.message = None;
            return true;
        }
        false
    }
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_DISPLAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_clears_after_display_time() {
        let start = Instant::now();
        let mut status = StatusNotifier::default();

        status.show("Paused", start);
        assert_eq!(status.current(), Some("Paused"));

        assert!(!status.poll(start + Duration::from_millis(999)));
        assert_eq!(status.current(), Some("Paused"));

        assert!(status.poll(start + Duration::from_secs(1)));
        assert_eq!(status.current(), None);
    }

    #[test]
    fn test_newer_message_survives_older_clear() {
        let start = Instant::now();
        let mut status = StatusNotifier::default();

        status.show("Paused", start);
        status.show("Playing", start + Duration::from_millis(300));
        status.show("Party Mode Activated!", start + Duration::from_millis(600));

        // When the first message's clear would have fired, only the newest is visible
        assert!(!status.poll(start + Duration::from_secs(1)));
        assert_eq!(status.current(), Some("Party Mode Activated!"));

        assert!(status.poll(start + Duration::from_millis(1600)));
        assert_eq!(status.current(), None);
    }

    #[test]
    fn test_deadline_tracks_latest_message() {
        let start = Instant::now();
        let mut status = StatusNotifier::new(Duration::from_millis(500));
        assert!(status.deadline().is_none());

        status.show("a", start);
        status.show("b", start + Duration::from_millis(100));
        assert_eq!(status.deadline(), Some(start + Duration::from_millis(600)));
    }

    #[test]
    fn test_repeated_text_bumps_sequence() {
        let start = Instant::now();
        let mut status = StatusNotifier::default();
        assert_eq!(status.sequence(), 0);

        status.show("Nothing recognized", start);
        status.show("Nothing recognized", start + Duration::from_millis(200));
        assert_eq!(status.sequence(), 2);
        assert_eq!(status.current(), Some("Nothing recognized"));
        assert_eq!(status.deadline(), Some(start + Duration::from_millis(1200)));
    }
}
