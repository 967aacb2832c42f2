use std::time::Duration;

use crate::config::PollConfig;

/// Polling cadence: base interval, multiplicative backoff with a cap, and a
/// wall-clock deadline measured from the first attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second attempt.
    pub interval: Duration,
    /// Growth applied to the delay after every attempt (values below 1 are treated as 1).
    pub backoff_factor: f64,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Deadline for the whole wait.
    pub max_wait: Duration,
}

/// Decision taken after a non-terminal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Sleep for the delay, then poll again.
    SleepFor(Duration),
    /// The next attempt would start past the deadline.
    GiveUp,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(4000),
            backoff_factor: 1.25,
            max_delay: Duration::from_millis(6000),
            max_wait: Duration::from_secs(120),
        }
    }
}

impl PollPolicy {
    /// Event poster result endpoint.
    pub fn event_asset() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            ..Self::default()
        }
    }

    /// Menu poster result endpoint.
    pub fn menu_poster_asset() -> Self {
        Self::default()
    }

    /// Menu poster → asset id resolution; ids usually appear within a few seconds.
    pub fn asset_id() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            ..Self::default()
        }
    }

    /// Review asset result endpoint: a fixed 5 s cadence; video renders can
    /// take several minutes.
    pub fn review_asset() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(5000),
            max_wait: Duration::from_secs(300),
        }
    }

    /// Build from a config section, filling unset fields from `base`.
    pub fn from_config(cfg: Option<&PollConfig>, base: PollPolicy) -> Self {
        let Some(cfg) = cfg else {
            return base;
        };
        Self {
            interval: cfg.interval_ms.map(Duration::from_millis).unwrap_or(base.interval),
            backoff_factor: cfg.backoff_factor.unwrap_or(base.backoff_factor),
            max_delay: cfg.max_delay_ms.map(Duration::from_millis).unwrap_or(base.max_delay),
            max_wait: cfg.max_wait_ms.map(Duration::from_millis).unwrap_or(base.max_wait),
        }
    }

    /// Delay to use after `current`: grown by the backoff factor and capped.
    /// The cap never drops below the base interval.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let factor = if self.backoff_factor.is_finite() && self.backoff_factor >= 1.0 {
            self.backoff_factor
        } else {
            1.0
        };
        let cap = self.max_delay.max(self.interval);
        // Grow in float seconds so an oversized factor saturates at the cap.
        Duration::try_from_secs_f64(current.as_secs_f64() * factor).map_or(cap, |d| d.min(cap))
    }

    /// Decide whether another attempt fits before the deadline.
    pub fn decide(&self, elapsed: Duration, delay: Duration) -> PollDecision {
        if elapsed >= self.max_wait || elapsed.saturating_add(delay) > self.max_wait {
            PollDecision::GiveUp
        } else {
            PollDecision::SleepFor(delay)
        }
    }
}
