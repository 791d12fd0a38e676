//! Time source for CAS values and expiry.
//!
//! Wall-clock time from `chrono`, shifted by an offset tests can advance so
//! lock and expiry deadlines pass without sleeping.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MockClock {
    offset_ms: AtomicI64,
    last_cas: AtomicU64,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time, including any advance.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + ChronoDuration::milliseconds(self.offset_ms.load(Ordering::Acquire))
    }

    /// Current time as unix seconds.
    pub fn now_secs(&self) -> u64 {
        self.now().timestamp().max(0) as u64
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.offset_ms.fetch_add(ms, Ordering::AcqRel);
        tracing::debug!(advanced_ms = ms, "mock clock advanced");
    }

    /// A fresh CAS: nanoseconds since the epoch, strictly increasing.
    pub fn next_cas(&self) -> u64 {
        let nanos = self.now().timestamp_nanos_opt().unwrap_or(0).max(0) as u64;
        let mut current = self.last_cas.load(Ordering::Acquire);
        loop {
            let next = nanos.max(current + 1);
            match self.last_cas.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Resolve a wire expiry to absolute unix seconds (0 = none).
    ///
    /// Values up to 30 days are relative to now; larger values are already
    /// absolute.
    pub fn absolute_expiry(&self, wire: u32) -> u64 {
        const RELATIVE_LIMIT: u32 = 30 * 24 * 60 * 60;
        match wire {
            0 => 0,
            secs if secs <= RELATIVE_LIMIT => self.now_secs() + u64::from(secs),
            secs => u64::from(secs),
        }
    }
}
