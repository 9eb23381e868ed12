//! Rolling-window request throttling for outbound API calls.
//!
//! [`Throttler`] keeps a log of recent call times and allows at most
//! `max_requests` calls inside any trailing `window`. When the limit is
//! reached, [`Throttler::acquire`] sleeps until the oldest call ages out
//! (plus a safety buffer), then re-checks. There is no background refill:
//! every decision happens at call time.
//!
//! Time comes from [`tokio::time::Instant`], so tests can pause and
//! advance the clock.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::consts::{DEFAULT_BUFFER, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
use crate::events::{Event, EventBus};

/// Lower bound on a single wait so a zero buffer can't spin.
const MIN_WAIT: Duration = Duration::from_millis(1);

const TICK: Duration = Duration::from_secs(1);

/// Largest accepted `max_requests`.
pub const MAX_REQUESTS_CAP: u32 = 100_000;

/// Longest accepted window.
pub const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest accepted buffer.
pub const MAX_BUFFER: Duration = Duration::from_secs(60 * 60);

/// Limits for a [`Throttler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Maximum calls allowed within one window.
    pub max_requests: u32,
    /// Length of the rolling window.
    pub window: Duration,
    /// Extra delay added to every computed wait.
    pub buffer: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
            buffer: DEFAULT_BUFFER,
        }
    }
}

impl ThrottleConfig {
    /// `requests` per minute with the default buffer.
    pub fn per_minute(requests: u32) -> Self {
        Self {
            max_requests: requests,
            ..Self::default()
        }
    }
}

/// Whether the next call would go straight through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    Available,
    Throttled,
}

/// Sliding-log rate limiter. One instance per upstream, owned by the caller.
pub struct Throttler {
    config: ThrottleConfig,
    /// Call times, oldest first.
    log: VecDeque<Instant>,
    events: Option<Arc<EventBus>>,
}

impl Throttler {
    pub fn new(config: ThrottleConfig) -> Result<Self> {
        if config.max_requests == 0 {
            bail!("throttle limit must allow at least one request per window");
        }
        if config.max_requests > MAX_REQUESTS_CAP {
            bail!("throttle limit must be at most {MAX_REQUESTS_CAP} requests per window");
        }
        if config.window.is_zero() {
            bail!("throttle window must be longer than zero");
        }
        if config.window > MAX_WINDOW {
            bail!("throttle window must be at most {}s", MAX_WINDOW.as_secs());
        }
        if config.buffer > MAX_BUFFER {
            bail!("throttle buffer must be at most {}s", MAX_BUFFER.as_secs());
        }
        Ok(Self {
            config,
            log: VecDeque::new(),
            events: None,
        })
    }

    /// Report countdown ticks on the given bus while waiting.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Number of logged calls still inside the window.
    pub fn in_window(&mut self) -> usize {
        self.evict(Instant::now());
        self.log.len()
    }

    pub fn state(&mut self) -> ThrottleState {
        if self.in_window() >= self.config.max_requests as usize {
            ThrottleState::Throttled
        } else {
            ThrottleState::Available
        }
    }

    /// Block until one more call fits in the window, then record it.
    ///
    /// Returns the total time spent waiting. Never fails.
    pub async fn acquire(&mut self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let now = Instant::now();
            self.evict(now);
            let Some(wait) = self.wait_needed(now) else {
                break;
            };
            info!(
                in_window = self.log.len(),
                limit = self.config.max_requests,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "rate limit reached, waiting"
            );
            self.countdown(wait).await;
            waited = waited.saturating_add(wait);
        }

        self.log.push_back(Instant::now());
        debug!(in_window = self.log.len(), "call recorded");
        waited
    }

    /// Drop entries older than the window.
    fn evict(&mut self, now: Instant) {
        let before = self.log.len();
        while let Some(&oldest) = self.log.front() {
            if now.duration_since(oldest) > self.config.window {
                self.log.pop_front();
            } else {
                break;
            }
        }
        let evicted = before - self.log.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.log.len(), "evicted expired calls");
        }
    }

    /// How long until the oldest call leaves the window, if the log is full.
    fn wait_needed(&self, now: Instant) -> Option<Duration> {
        if self.log.len() < self.config.max_requests as usize {
            return None;
        }
        let oldest = *self.log.front()?;
        let age = now.duration_since(oldest);
        let wait = self
            .config
            .window
            .saturating_sub(age)
            .saturating_add(self.config.buffer);
        Some(wait.max(MIN_WAIT))
    }

    /// Sleep for `wait`, one second at a time, announcing what is left.
    async fn countdown(&self, wait: Duration) {
        let whole = wait.as_secs();
        for remaining in (1..=whole).rev() {
            self.emit(Event::Throttled {
                remaining_secs: remaining,
            });
            tokio::time::sleep(TICK).await;
        }
        let rest = wait - Duration::from_secs(whole);
        if !rest.is_zero() {
            tokio::time::sleep(rest).await;
        }
        self.emit(Event::ThrottleCleared);
    }

    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}
