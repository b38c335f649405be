//! Screen brightness and dark mode
//!
//! Sources push raw brightness levels to subscribers. A subscription is
//! removed when its [`Subscription`] handle is dropped.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Default brightness below which dark mode is used
pub const DEFAULT_DARK_MODE_THRESHOLD: f32 = 0.3;

pub type BrightnessCallback = Box<dyn FnMut(f32) + Send>;

/// Provider of screen brightness in [0, 1]
pub trait BrightnessSource: Send + Sync {
    /// Current brightness
    fn brightness(&self) -> f32;

    /// Call `callback` with every later brightness change
    fn subscribe(&self, callback: BrightnessCallback) -> Subscription;
}

/// Handle that unsubscribes when dropped
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Subscription with nothing to undo
    pub fn empty() -> Self {
        Self { unsubscribe: None }
    }

    /// Unsubscribe now
    pub fn cancel(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

struct ManualInner {
    level: f32,
    next_id: u64,
    subscribers: Vec<(u64, BrightnessCallback)>,
}

/// Brightness set by hand, for the demo binary and tests
#[derive(Clone)]
pub struct ManualBrightness {
    inner: Arc<Mutex<ManualInner>>,
}

impl ManualBrightness {
    pub fn new(level: f32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualInner {
                level: level.clamp(0.0, 1.0),
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Change the brightness and notify subscribers
    ///
    /// Callbacks run on the calling thread with the source locked, so
    /// they must not call back into this source.
    pub fn set(&self, level: f32) {
        let level = level.clamp(0.0, 1.0);
        let mut inner = self.inner.lock();
        inner.level = level;
        for (_, callback) in inner.subscribers.iter_mut() {
            callback(level);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl Default for ManualBrightness {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl BrightnessSource for ManualBrightness {
    fn brightness(&self) -> f32 {
        self.inner.lock().level
    }

    fn subscribe(&self, callback: BrightnessCallback) -> Subscription {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, callback));
            id
        };

        let weak: Weak<Mutex<ManualInner>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().subscribers.retain(|(sid, _)| *sid != id);
                debug!("Brightness subscriber {} removed", id);
            }
        })
    }
}

/// Check if a brightness level calls for dark mode
pub fn is_dark(brightness: f32, threshold: f32) -> bool {
    brightness < threshold
}

/// Follow the dark-mode flag of a brightness source
///
/// `on_change` is called once with the current flag, then only when the
/// flag flips.
pub fn observe_dark_mode<F>(
    source: &dyn BrightnessSource,
    threshold: f32,
    mut on_change: F,
) -> Subscription
where
    F: FnMut(bool) + Send + 'static,
{
    let mut last = is_dark(source.brightness(), threshold);
    on_change(last);

    source.subscribe(Box::new(move |level| {
        let dark = is_dark(level, threshold);
        if dark != last {
            last = dark;
            on_change(dark);
        }
    }))
}
