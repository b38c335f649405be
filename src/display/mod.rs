//! Presentation-side state: dark mode and the clock label

pub mod brightness;
pub mod clock_label;

pub use brightness::{
    is_dark, observe_dark_mode, BrightnessCallback, BrightnessSource, ManualBrightness,
    Subscription, DEFAULT_DARK_MODE_THRESHOLD,
};
pub use clock_label::{ClockDisplay, DEFAULT_CLOCK_INTERVAL};
