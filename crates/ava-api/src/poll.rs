use std::time::Duration;

/// Shortest delay between polls, whatever the policy says.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// How often, and for how long, to poll a chat job.
///
/// Delays start at `initial_interval` and grow by `multiplier` after each
/// poll, capped at `max_interval`. Polling gives up once the next delay
/// would push total waiting past `max_wait`.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(8),
            multiplier: 1.5,
            max_wait: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    /// Poll every `interval` until `max_wait` has passed.
    pub fn fixed(interval: Duration, max_wait: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
            max_wait,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// The delay sequence between polls. Infinite; the caller enforces `max_wait`.
    pub fn delays(&self) -> Delays {
        let max = self.max_interval.max(MIN_INTERVAL);
        Delays {
            next: self.initial_interval.clamp(MIN_INTERVAL, max),
            max,
            multiplier: self.multiplier.max(1.0),
        }
    }
}

/// Iterator over backoff delays.
#[derive(Debug, Clone)]
pub struct Delays {
    next: Duration,
    max: Duration,
    multiplier: f64,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current.mul_f64(self.multiplier).min(self.max);
        Some(current)
    }
}
