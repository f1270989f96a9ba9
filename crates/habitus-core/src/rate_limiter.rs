//! Sliding-window throttle on extraction throughput
//!
//! Per-process only: it protects this process's fan-out to the similarity
//! service and makes no attempt at a global quota.

use crate::config::RateLimitConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source for the limiter
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Rolling window of accepted call timestamps
#[derive(Debug)]
pub struct RateLimiter {
    max_events: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_events: config.max_events,
            window: config.window,
            clock,
            timestamps: Mutex::new(VecDeque::with_capacity(config.max_events.min(1024))),
        }
    }

    /// Record a call if the window has room; `false` once the cap is hit
    pub fn allow(&self) -> bool {
        let now = self.clock.now();
        let mut timestamps = self.timestamps.lock();
        Self::evict(&mut timestamps, now, self.window);

        if timestamps.len() >= self.max_events {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Calls still allowed in the current window
    pub fn remaining(&self) -> usize {
        let now = self.clock.now();
        let mut timestamps = self.timestamps.lock();
        Self::evict(&mut timestamps, now, self.window);
        self.max_events.saturating_sub(timestamps.len())
    }

    fn evict(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = timestamps.front() {
            if now.saturating_duration_since(*oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}
