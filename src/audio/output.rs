//! Audio output abstraction
//!
//! An output holds at most one loaded track. Natural end of playback is
//! reported through a single registered completion handler, once per
//! loaded track, with the id `load` returned for it.

use crate::audio::store::DecodedTrack;
use crate::utils::SharedClock;
use crate::Result;
use std::time::{Duration, Instant};
use tracing::debug;

/// Identifier handed out by `AudioOutput::load`
pub type TrackId = u64;

/// Callback invoked when a track finishes playing on its own
pub type CompletionHandler = Box<dyn FnMut(TrackId) + Send>;

/// Playback backend
pub trait AudioOutput: Send {
    /// Register the completion handler, replacing any previous one
    fn set_completion_handler(&mut self, handler: CompletionHandler);

    /// Replace the loaded track. The new track starts paused at 0:00.
    fn load(&mut self, track: DecodedTrack) -> Result<TrackId>;

    /// Check if a track is loaded
    fn is_loaded(&self) -> bool;

    fn play(&mut self);

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    /// Current playback position
    fn position(&self) -> Duration;

    /// Length of the loaded track, zero when nothing is loaded
    fn duration(&self) -> Duration;

    /// Jump to a position, clamped to the track length
    fn seek(&mut self, position: Duration);

    /// Detect natural completion and notify the handler
    fn poll(&mut self);
}

#[derive(Debug)]
struct SimulatedTrack {
    id: TrackId,
    duration: Duration,
    /// Position at the last play/pause/seek
    base: Duration,
    /// When playback (re)started, None while paused
    started_at: Option<Instant>,
    completed: bool,
}

impl SimulatedTrack {
    fn position(&self, now: Instant) -> Duration {
        let running = self
            .started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        (self.base + running).min(self.duration)
    }
}

/// Silent output that advances the playback position from a clock
///
/// Used when no audio device is wanted (tests, headless runs). With a
/// `ManualClock` the whole playback timeline is deterministic.
pub struct SimulatedOutput {
    clock: SharedClock,
    track: Option<SimulatedTrack>,
    next_id: TrackId,
    handler: Option<CompletionHandler>,
}

impl SimulatedOutput {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            track: None,
            next_id: 1,
            handler: None,
        }
    }
}

impl AudioOutput for SimulatedOutput {
    fn set_completion_handler(&mut self, handler: CompletionHandler) {
        self.handler = Some(handler);
    }

    fn load(&mut self, track: DecodedTrack) -> Result<TrackId> {
        let id = self.next_id;
        self.next_id += 1;
        debug!("Simulated output loaded {} as track {}", track.resource, id);
        self.track = Some(SimulatedTrack {
            id,
            duration: track.duration(),
            base: Duration::ZERO,
            started_at: None,
            completed: false,
        });
        Ok(id)
    }

    fn is_loaded(&self) -> bool {
        self.track.is_some()
    }

    fn play(&mut self) {
        let now = self.clock.now();
        if let Some(track) = self.track.as_mut() {
            if track.completed {
                debug!("Restarting finished track {}", track.id);
                track.base = Duration::ZERO;
                track.completed = false;
            }
            if track.started_at.is_none() {
                track.started_at = Some(now);
            }
        }
    }

    fn pause(&mut self) {
        let now = self.clock.now();
        if let Some(track) = self.track.as_mut() {
            track.base = track.position(now);
            track.started_at = None;
        }
    }

    fn is_playing(&self) -> bool {
        self.track
            .as_ref()
            .map(|t| t.started_at.is_some())
            .unwrap_or(false)
    }

    fn position(&self) -> Duration {
        let now = self.clock.now();
        self.track
            .as_ref()
            .map(|t| t.position(now))
            .unwrap_or_default()
    }

    fn duration(&self) -> Duration {
        self.track.as_ref().map(|t| t.duration).unwrap_or_default()
    }

    fn seek(&mut self, position: Duration) {
        let now = self.clock.now();
        if let Some(track) = self.track.as_mut() {
            track.base = position.min(track.duration);
            track.completed = false;
            if track.started_at.is_some() {
                track.started_at = Some(now);
            }
        }
    }

    fn poll(&mut self) {
        let now = self.clock.now();
        let Some(track) = self.track.as_mut() else {
            return;
        };
        if track.completed || track.started_at.is_none() {
            return;
        }
        if track.position(now) >= track.duration {
            track.completed = true;
            track.base = track.duration;
            track.started_at = None;
            let id = track.id;
            debug!("Simulated track {} finished", id);
            if let Some(handler) = self.handler.as_mut() {
                handler(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use crossbeam_channel::unbounded;

    fn output_with_clock() -> (SimulatedOutput, std::sync::Arc<ManualClock>) {
        let clock = ManualClock::shared();
        (SimulatedOutput::new(clock.clone()), clock)
    }

    #[test]
    fn test_position_follows_clock_while_playing() {
        let (mut output, clock) = output_with_clock();
        output
            .load(DecodedTrack::silence("a", Duration::from_secs(10)))
            .unwrap();
        assert!(!output.is_playing());

        output.play();
        clock.advance_ms(2500);
        assert_eq!(output.position(), Duration::from_millis(2500));

        output.pause();
        clock.advance_ms(5000);
        assert_eq!(output.position(), Duration::from_millis(2500));
    }

    #[test]
    fn test_seek_while_playing() {
        let (mut output, clock) = output_with_clock();
        output
            .load(DecodedTrack::silence("a", Duration::from_secs(120)))
            .unwrap();
        output.play();
        output.seek(Duration::from_secs(60));
        clock.advance_ms(1000);
        assert_eq!(output.position(), Duration::from_secs(61));

        output.seek(Duration::from_secs(500));
        assert_eq!(output.position(), Duration::from_secs(120));
    }

    #[test]
    fn test_completion_fires_once() {
        let (mut output, clock) = output_with_clock();
        let (tx, rx) = unbounded();
        output.set_completion_handler(Box::new(move |id| {
            let _ = tx.send(id);
        }));

        let id = output
            .load(DecodedTrack::silence("a", Duration::from_secs(3)))
            .unwrap();
        output.play();

        clock.advance_ms(2000);
        output.poll();
        assert!(rx.try_recv().is_err());

        clock.advance_ms(1500);
        output.poll();
        output.poll();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![id]);
        assert!(!output.is_playing());
    }

    #[test]
    fn test_play_after_completion_restarts_from_zero() {
        let (mut output, clock) = output_with_clock();
        let (tx, rx) = unbounded();
        output.set_completion_handler(Box::new(move |id| {
            let _ = tx.send(id);
        }));
        let id = output
            .load(DecodedTrack::silence("a", Duration::from_secs(2)))
            .unwrap();
        output.play();
        clock.advance_ms(2500);
        output.poll();
        assert_eq!(rx.try_recv().unwrap(), id);

        output.play();
        assert!(output.is_playing());
        clock.advance_ms(500);
        assert_eq!(output.position(), Duration::from_millis(500));

        clock.advance_ms(2000);
        output.poll();
        assert_eq!(rx.try_recv().unwrap(), id);
    }

    #[test]
    fn test_seek_after_completion_rearms_track() {
        let (mut output, clock) = output_with_clock();
        let (tx, rx) = unbounded();
        output.set_completion_handler(Box::new(move |id| {
            let _ = tx.send(id);
        }));
        output
            .load(DecodedTrack::silence("a", Duration::from_secs(2)))
            .unwrap();
        output.play();
        clock.advance_ms(3000);
        output.poll();
        assert!(rx.try_recv().is_ok());

        output.seek(Duration::from_secs(1));
        output.play();
        clock.advance_ms(400);
        assert_eq!(output.position(), Duration::from_millis(1400));
        clock.advance_ms(1000);
        output.poll();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_paused_track_never_completes() {
        let (mut output, clock) = output_with_clock();
        let (tx, rx) = unbounded();
        output.set_completion_handler(Box::new(move |id| {
            let _ = tx.send(id);
        }));
        output
            .load(DecodedTrack::silence("a", Duration::from_secs(1)))
            .unwrap();

        clock.advance_ms(5000);
        output.poll();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_load_hands_out_fresh_ids() {
        let (mut output, _clock) = output_with_clock();
        let a = output
            .load(DecodedTrack::silence("a", Duration::from_secs(1)))
            .unwrap();
        let b = output
            .load(DecodedTrack::silence("b", Duration::from_secs(1)))
            .unwrap();
        assert_ne!(a, b);
    }
}
