//! Capture buffer for speech recognition requests
//!
//! The microphone callback appends raw samples here and the recognizer
//! drains them. The buffer drops the oldest samples when full so the
//! real-time side never waits on a slow consumer.

use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::sync::Arc;

/// Default capacity: ten seconds of 16kHz mono audio
pub const DEFAULT_CAPTURE_CAPACITY: usize = 16_000 * 10;

/// Thread-safe ring buffer shared between the capture callback and the recognizer
#[derive(Clone)]
pub struct CaptureBuffer {
    buffer: Arc<Mutex<HeapRb<f32>>>,
}

impl CaptureBuffer {
    /// Create a new buffer holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(HeapRb::new(capacity.max(1)))),
        }
    }

    /// Append samples, dropping the oldest ones on overflow
    ///
    /// Returns the number of samples written (always `samples.len()`).
    pub fn append(&self, samples: &[f32]) -> usize {
        let mut buffer = self.buffer.lock();

        for &sample in samples {
            if buffer.try_push(sample).is_err() {
                let _ = buffer.try_pop();
                let _ = buffer.try_push(sample);
            }
        }

        samples.len()
    }

    /// Append without waiting if the consumer currently holds the lock
    ///
    /// Returns false when the samples were skipped. Intended for the
    /// real-time audio callback.
    pub fn try_append(&self, samples: &[f32]) -> bool {
        let Some(mut buffer) = self.buffer.try_lock() else {
            return false;
        };

        for &sample in samples {
            if buffer.try_push(sample).is_err() {
                let _ = buffer.try_pop();
                let _ = buffer.try_push(sample);
            }
        }

        true
    }

    /// Remove and return up to `count` samples, oldest first
    pub fn drain(&self, count: usize) -> Vec<f32> {
        let mut buffer = self.buffer.lock();
        let mut samples = Vec::with_capacity(count.min(buffer.occupied_len()));

        for _ in 0..count {
            match buffer.try_pop() {
                Some(sample) => samples.push(sample),
                None => break,
            }
        }

        samples
    }

    /// Discard everything buffered
    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.lock().capacity().get()
    }
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_CAPACITY)
    }
}
