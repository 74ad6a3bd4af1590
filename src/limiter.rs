use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{Result, ServerError};

const SECOND_WINDOW: Duration = Duration::from_secs(1);
// DuckDuckGo quotas roll over roughly monthly; thirty days is the contract.
const MONTH_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug)]
struct Windows {
    second_count: u32,
    second_start: Instant,
    month_count: u32,
    month_start: Instant,
}

/// Fixed dual-window admission control, shared by both search tools.
///
/// Windows reset lazily on the first check observed after they elapse;
/// there is no background timer. Bursts straddling a window boundary are
/// admitted: callers rely on fixed-window semantics, so this must not be
/// swapped for a sliding window or token bucket.
#[derive(Debug)]
pub struct RateLimiter {
    per_second: u32,
    per_month: u32,
    state: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new(per_second: u32, per_month: u32) -> Self {
        let now = Instant::now();
        Self {
            per_second,
            per_month,
            state: Mutex::new(Windows {
                second_count: 0,
                second_start: now,
                month_count: 0,
                month_start: now,
            }),
        }
    }

    /// Admit or reject one call. Rejection leaves both counters untouched.
    pub fn check(&self) -> Result<()> {
        self.check_at(Instant::now())
    }

    /// The whole read-check-increment step runs under one guard with no
    /// await point, so concurrent callers cannot both pass the cap check.
    fn check_at(&self, now: Instant) -> Result<()> {
        let mut w = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if now.duration_since(w.second_start) > SECOND_WINDOW {
            w.second_count = 0;
            w.second_start = now;
        }
        if now.duration_since(w.month_start) > MONTH_WINDOW {
            w.month_count = 0;
            w.month_start = now;
        }

        if w.second_count >= self.per_second {
            return Err(ServerError::PerSecondLimit(self.per_second));
        }
        if w.month_count >= self.per_month {
            return Err(ServerError::MonthlyLimit(self.per_month));
        }

        w.second_count += 1;
        w.month_count += 1;
        Ok(())
    }
}
