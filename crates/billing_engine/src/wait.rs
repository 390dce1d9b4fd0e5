use std::time::Duration;

/// Source of delays for polling loops. Tests substitute a clock that only
/// records the requested sleeps.
#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait::async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fixed-interval polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    /// Budget for a page transition: 1 s between checks, 20 checks.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 20,
        }
    }
}

impl PollPolicy {
    /// Budget for the table to appear after page load: 500 ms between checks, 20 checks.
    pub fn table_ready() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_attempts: 20,
        }
    }

    /// Upper bound on the time spent waiting under this policy.
    pub fn ceiling(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Hands out at most `max_attempts` attempts, sleeping one interval before each.
///
/// ```ignore
/// let mut poller = Poller::new(&clock, policy);
/// while poller.next_attempt().await {
///     if condition().await {
///         return Ok(());
///     }
/// }
/// ```
pub struct Poller<'a> {
    clock: &'a dyn Clock,
    policy: PollPolicy,
    attempts: u32,
}

impl<'a> Poller<'a> {
    pub fn new(clock: &'a dyn Clock, policy: PollPolicy) -> Self {
        Self {
            clock,
            policy,
            attempts: 0,
        }
    }

    /// Sleeps one interval and returns true, or returns false without sleeping
    /// once the budget is spent.
    pub async fn next_attempt(&mut self) -> bool {
        if self.attempts >= self.policy.max_attempts {
            return false;
        }
        self.clock.sleep(self.policy.interval).await;
        self.attempts += 1;
        true
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
