// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Lockout of clients that keep failing to sign in.

use dashmap::DashMap;
use metrics::counter;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::metrics::SIGN_IN_LOCKOUT;

/// Failure streaks older than this are forgotten by [`AuthRateLimiter::purge`]
const FAILURE_MEMORY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
struct Strike {
    failures: u32,
    last_failure: Instant,
    locked_until: Option<Instant>,
}

impl Strike {
    fn locked_at(&self, now: Instant) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

/// Per-client sign-in failure tracking.
///
/// Clones share the same table.
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    strikes: Arc<DashMap<IpAddr, Strike>>,
    max_failures: u32,
    lockout: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5 * 60))
    }
}

impl AuthRateLimiter {
    pub fn new(max_failures: u32, lockout: Duration) -> Self {
        Self {
            strikes: Arc::new(DashMap::new()),
            max_failures,
            lockout,
        }
    }

    /// Whether `ip` may attempt a sign-in right now
    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        self.strikes.get(&ip).map_or(true, |strike| !strike.locked_at(now))
    }

    /// Count a rejected sign-in; locks the client once the limit is reached
    pub fn record_failure(&self, ip: IpAddr) {
        let now = Instant::now();
        let mut strike = self.strikes.entry(ip).or_insert(Strike {
            failures: 0,
            last_failure: now,
            locked_until: None,
        });

        // a served lockout starts a fresh streak
        if strike.locked_until.is_some_and(|until| now >= until) {
            strike.failures = 0;
            strike.locked_until = None;
        }

        strike.failures += 1;
        strike.last_failure = now;

        if strike.failures >= self.max_failures && strike.locked_until.is_none() {
            strike.locked_until = Some(now + self.lockout);
            counter!(SIGN_IN_LOCKOUT).increment(1);
            tracing::warn!(
                %ip,
                failures = strike.failures,
                lockout_secs = self.lockout.as_secs(),
                "client locked out after repeated sign-in failures"
            );
        }
    }

    /// Forget the client's failures after a successful sign-in
    pub fn record_success(&self, ip: IpAddr) {
        self.strikes.remove(&ip);
    }

    /// Drop served lockouts and stale failure streaks
    pub fn purge(&self) {
        let now = Instant::now();
        self.strikes.retain(|_, strike| match strike.locked_until {
            Some(_) => strike.locked_at(now),
            None => now.duration_since(strike.last_failure) < FAILURE_MEMORY,
        });
    }

    /// Spawn a task calling [`purge`](Self::purge) every `every`
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                limiter.purge();
            }
        })
    }

    /// Number of clients currently tracked
    pub fn tracked(&self) -> usize {
        self.strikes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const IP: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
    const OTHER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 8));

    #[test]
    fn test_locks_out_after_max_failures() {
        let limiter = AuthRateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..2 {
            limiter.record_failure(IP);
            assert!(limiter.is_allowed(IP));
        }
        limiter.record_failure(IP);
        assert!(!limiter.is_allowed(IP));
        assert!(limiter.is_allowed(OTHER));
    }

    #[test]
    fn test_success_resets_streak() {
        let limiter = AuthRateLimiter::new(2, Duration::from_secs(60));
        limiter.record_failure(IP);
        limiter.record_success(IP);
        limiter.record_failure(IP);
        assert!(limiter.is_allowed(IP));
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn test_lockout_expires() {
        let limiter = AuthRateLimiter::new(1, Duration::from_millis(10));
        limiter.record_failure(IP);
        assert!(!limiter.is_allowed(IP));

        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.is_allowed(IP));
        limiter.purge();
        assert_eq!(limiter.tracked(), 0);
    }
}
