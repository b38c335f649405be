pub mod channels;
pub mod clock;
pub mod format;
pub mod timer;

pub use channels::OrchestratorChannels;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use format::{format_clock, format_elapsed};
pub use timer::{earliest, IntervalTimer, OneShotTimer};
