//! Wall-clock label shown on the now-playing screen

use crate::utils::{format_clock, IntervalTimer};
use chrono::{DateTime, Local, TimeZone};
use std::time::{Duration, Instant};

pub const DEFAULT_CLOCK_INTERVAL: Duration = Duration::from_secs(60);

/// "HH:mm" label refreshed on a fixed interval
#[derive(Debug, Clone)]
pub struct ClockDisplay {
    label: String,
    interval: IntervalTimer,
}

impl ClockDisplay {
    pub fn new(period: Duration) -> Self {
        Self {
            label: format_clock(&Local::now()),
            interval: IntervalTimer::new(period),
        }
    }

    /// Refresh now and start the interval
    pub fn start(&mut self, now: Instant) {
        self.refresh();
        self.interval.start(now);
    }

    pub fn stop(&mut self) {
        self.interval.stop();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.interval.deadline()
    }

    /// Refresh the label if the interval is due
    ///
    /// Returns true if the label text changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.interval.tick(now) {
            return false;
        }
        self.refresh()
    }

    /// Set the label from local time
    pub fn refresh(&mut self) -> bool {
        self.refresh_at(&Local::now())
    }

    /// Set the label from the given time
    pub fn refresh_at<Tz: TimeZone>(&mut self, time: &DateTime<Tz>) -> bool
    where
        Tz::Offset: std::fmt::Display,
    {
        let label = format_clock(time);
        if label == self.label {
            return false;
        }
        self.label = label;
        true
    }
}

impl Default for ClockDisplay {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_INTERVAL)
    }
}
