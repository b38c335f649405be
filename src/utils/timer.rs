//! Cooperative timers polled against a `Clock`
//!
//! Nothing here spawns threads. The owning loop asks each timer for its
//! deadline, sleeps until the earliest one, then polls. Arming an already
//! armed timer replaces the previous deadline, so only the most recent
//! arming can ever fire.

use std::time::{Duration, Instant};

/// Rearmable one-shot timer
#[derive(Debug, Default, Clone)]
pub struct OneShotTimer {
    deadline: Option<Instant>,
}

impl OneShotTimer {
    /// Create a disarmed timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer to fire `delay` after `now`, superseding any pending deadline
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// Disarm the timer
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Check if a deadline is pending
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire the timer if its deadline has passed
    ///
    /// Returns true exactly once per arming.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Fixed-period repeating timer
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    period: Duration,
    next: Option<Instant>,
}

impl IntervalTimer {
    /// Create a stopped interval. Periods below one millisecond are raised to one.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next: None,
        }
    }

    /// Interval period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start (or restart) the interval; the first tick is one period from `now`
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    /// Stop the interval
    pub fn stop(&mut self) {
        self.next = None;
    }

    /// Check if the interval is running
    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// Next tick deadline, if running
    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Consume a due tick
    ///
    /// Missed ticks collapse into one; the next deadline is the first
    /// period boundary after `now`.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(mut next) = self.next else {
            return false;
        };
        if now < next {
            return false;
        }
        while next <= now {
            next += self.period;
        }
        self.next = Some(next);
        true
    }
}

/// Earliest of a set of optional deadlines
pub fn earliest<I>(deadlines: I) -> Option<Instant>
where
    I: IntoIterator<Item = Option<Instant>>,
{
    deadlines.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_fires_once() {
        let start = Instant::now();
        let mut timer = OneShotTimer::new();
        assert!(!timer.is_armed());

        timer.arm(start, Duration::from_secs(5));
        assert!(!timer.fire(start + Duration::from_secs(4)));
        assert!(timer.fire(start + Duration::from_secs(5)));
        assert!(!timer.fire(start + Duration::from_secs(6)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_rearm_supersedes_previous_deadline() {
        let start = Instant::now();
        let mut timer = OneShotTimer::new();

        timer.arm(start, Duration::from_secs(5));
        timer.arm(start + Duration::from_secs(3), Duration::from_secs(5));

        // The first deadline no longer fires
        assert!(!timer.fire(start + Duration::from_secs(5)));
        assert!(timer.fire(start + Duration::from_secs(8)));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut timer = OneShotTimer::new();
        timer.arm(start, Duration::from_millis(10));
        timer.cancel();
        assert!(!timer.fire(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_interval_ticks_each_period() {
        let start = Instant::now();
        let mut interval = IntervalTimer::new(Duration::from_millis(500));
        assert!(!interval.tick(start));

        interval.start(start);
        assert!(!interval.tick(start + Duration::from_millis(499)));
        assert!(interval.tick(start + Duration::from_millis(500)));
        assert!(!interval.tick(start + Duration::from_millis(700)));
        assert!(interval.tick(start + Duration::from_millis(1000)));
    }

    #[test]
    fn test_interval_collapses_missed_ticks() {
        let start = Instant::now();
        let mut interval = IntervalTimer::new(Duration::from_millis(500));
        interval.start(start);

        assert!(interval.tick(start + Duration::from_millis(2200)));
        assert!(!interval.tick(start + Duration::from_millis(2400)));
        assert_eq!(
            interval.deadline(),
            Some(start + Duration::from_millis(2500))
        );
    }

    #[test]
    fn test_interval_zero_period_is_clamped() {
        let interval = IntervalTimer::new(Duration::ZERO);
        assert_eq!(interval.period(), Duration::from_millis(1));
    }

    #[test]
    fn test_earliest() {
        let start = Instant::now();
        let later = start + Duration::from_secs(1);
        assert_eq!(earliest([None, Some(later), Some(start)]), Some(start));
        assert_eq!(earliest([None, None]), None);
    }
}
