//! Rolling-window rate governor for chargeable page loads.
//!
//! Each consumer (an account id) may be charged at most `limit` actions
//! within any trailing `period`. Pruning, comparing and charging happen
//! under one lock, so concurrent callers cannot overshoot the budget.

use crate::error::{HarvestError, HarvestResult};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces at most `limit` charges per consumer per rolling `period`.
pub struct RateGovernor {
    limit: usize,
    period: Duration,
    charges: Mutex<HashMap<String, VecDeque<Instant>>>,
}

/// Outcome of one admission attempt under the lock.
enum Admission {
    Charged,
    WaitUntil(Instant),
}

impl RateGovernor {
    /// Create a governor. A zero limit or zero period is rejected.
    pub fn new(limit: usize, period: Duration) -> HarvestResult<Self> {
        if limit == 0 {
            return Err(HarvestError::Config(
                "rate governor limit must be at least 1".into(),
            ));
        }
        if period.is_zero() {
            return Err(HarvestError::Config(
                "rate governor period must be non-zero".into(),
            ));
        }
        Ok(Self {
            limit,
            period,
            charges: Mutex::new(HashMap::new()),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    async fn admit(&self, consumer: &str) -> Admission {
        let now = Instant::now();
        let mut charges = self.charges.lock().await;
        let window = charges.entry(consumer.to_string()).or_default();

        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) >= self.period {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < self.limit {
            window.push_back(now);
            return Admission::Charged;
        }

        match window.front() {
            Some(oldest) => Admission::WaitUntil(*oldest + self.period),
            None => {
                window.push_back(now);
                Admission::Charged
            }
        }
    }

    /// Block until `consumer` has budget left in the window, then charge it.
    ///
    /// Returns how long the caller was held.
    pub async fn check(&self, consumer: &str) -> Duration {
        let started = Instant::now();
        loop {
            match self.admit(consumer).await {
                Admission::Charged => return started.elapsed(),
                Admission::WaitUntil(deadline) => tokio::time::sleep_until(deadline).await,
            }
        }
    }

    /// Charge `consumer` only if budget is available right now.
    pub async fn try_check(&self, consumer: &str) -> bool {
        matches!(self.admit(consumer).await, Admission::Charged)
    }

    /// Charges currently inside the window for `consumer`.
    pub async fn charged(&self, consumer: &str) -> usize {
        let now = Instant::now();
        let charges = self.charges.lock().await;
        charges.get(consumer).map_or(0, |window| {
            window
                .iter()
                .filter(|t| now.duration_since(**t) < self.period)
                .count()
        })
    }
}
