use std::time::{Duration, Instant};

/// Monotonic clock used to timestamp stimulus onsets and responses.
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);

    /// Milliseconds between two timestamps, as a reaction time.
    fn millis_between(&self, from: Self::Timestamp, to: Self::Timestamp) -> f64;
}

/// Nanosecond timer anchored at session start.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn millis_between(&self, from: u64, to: u64) -> f64 {
        to.saturating_sub(from) as f64 / 1_000_000.0
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Milliseconds since the timer was created.
    pub fn session_millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        // SAFETY: `req` is a valid timespec and the remainder pointer may be null.
        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic() {
        let t = HighPrecisionTimer::new();
        let a = t.now();
        let b = t.now();
        assert!(b >= a);
    }

    #[test]
    fn sleep_waits_at_least_requested() {
        let t = HighPrecisionTimer::new();
        let before = t.now();
        t.sleep(Duration::from_millis(5));
        assert!(t.elapsed(before) >= Duration::from_millis(5));
    }

    #[test]
    fn millis_between_saturates() {
        let t = HighPrecisionTimer::new();
        assert_eq!(t.millis_between(2_500_000, 1_000_000), 0.0);
        assert_eq!(t.millis_between(1_000_000, 3_500_000), 2.5);
    }
}
