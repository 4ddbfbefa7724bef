// Copyright (c) James Kassemi, SC, US. All rights reserved.

use rand::Rng;
use std::time::Duration;

/// Jittered exponential backoff schedule for slice downloads.
///
/// Attempt `n` (1-based) that fails waits `base * 2^(n-1)` capped at `max`,
/// with a symmetric random jitter applied on top. The caller owns the retry
/// loop itself, since terminal errors (auth, missing data) must not retry.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_pct: f64,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: usize,
        base_delay: Duration,
        max_delay: Duration,
        jitter_pct: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: base_delay.max(Duration::from_millis(1)),
            max_delay: max_delay.max(base_delay),
            jitter_pct: jitter_pct.clamp(0.0, 1.0),
        }
    }

    /// Defaults tuned for the data service: 5 attempts, 250 ms base, 5 s cap.
    pub fn default_network() -> Self {
        Self::new(
            5,
            Duration::from_millis(250),
            Duration::from_secs(5),
            0.25,
        )
    }

    /// Delay to sleep after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exp = 2_u32.saturating_pow(attempt.saturating_sub(1).min(u32::MAX as usize) as u32);
        let mut delay = self.base_delay.saturating_mul(exp);
        if delay > self.max_delay {
            delay = self.max_delay;
        }
        if self.jitter_pct > 0.0 {
            let millis = delay.as_millis() as i64;
            let spread = (millis as f64 * self.jitter_pct) as i64;
            if spread > 0 {
                let delta = rand::thread_rng().gen_range(-spread..=spread);
                delay = Duration::from_millis(millis.saturating_add(delta).max(0) as u64);
            }
        }
        delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_network()
    }
}
