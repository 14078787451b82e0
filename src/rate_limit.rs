use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Biodata submissions allowed per client address per window.
pub const SUBMISSION_LIMIT: u32 = 20;
pub const SUBMISSION_WINDOW_SECS: u64 = 10 * 60;

const LOGIN_FAILURES: u32 = 5;
const LOGIN_WINDOW_SECS: u64 = 15 * 60;

/// Per-IP submission limiter using a fixed window.
pub struct SubmissionRateLimiter {
    /// ip -> (count, window_start)
    entries: DashMap<IpAddr, (u32, Instant)>,
}

impl SubmissionRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Ok if the request is allowed, otherwise the seconds until retry.
    pub fn check(&self, ip: IpAddr, limit: u32, window_secs: u64) -> Result<(), u64> {
        let window = Duration::from_secs(window_secs);
        let now = Instant::now();

        let mut entry = self.entries.entry(ip).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= limit {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(window_secs.saturating_sub(elapsed));
        }

        *count += 1;
        Ok(())
    }

    /// Remove stale entries older than the given duration.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }
}

impl Default for SubmissionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-email login brute force limiter.
pub struct LoginRateLimiter {
    /// email -> (failed_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// 5 failures per 15 minutes. Does not count the attempt; call
    /// `record_failure()` on a bad password.
    pub fn check(&self, email: &str) -> Result<(), u64> {
        let window = Duration::from_secs(LOGIN_WINDOW_SECS);
        let now = Instant::now();

        let Some(entry) = self.entries.get(&email.to_lowercase()) else {
            return Ok(());
        };

        let (count, start) = entry.value();

        if now.duration_since(*start) > window {
            return Ok(());
        }

        if *count >= LOGIN_FAILURES {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(LOGIN_WINDOW_SECS.saturating_sub(elapsed));
        }

        Ok(())
    }

    pub fn record_failure(&self, email: &str) {
        let window = Duration::from_secs(LOGIN_WINDOW_SECS);
        let now = Instant::now();

        let mut entry = self.entries.entry(email.to_lowercase()).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > window {
            *count = 1;
            *start = now;
        } else {
            *count += 1;
        }
    }

    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically drop expired limiter entries so the maps stay bounded.
pub fn spawn_cleanup(state: crate::state::SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            state
                .submission_limiter
                .cleanup(Duration::from_secs(SUBMISSION_WINDOW_SECS));
            state
                .login_limiter
                .cleanup(Duration::from_secs(LOGIN_WINDOW_SECS));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_limit_is_per_address() {
        let limiter = SubmissionRateLimiter::new();
        let a: IpAddr = "198.51.100.1".parse().unwrap();
        let b: IpAddr = "198.51.100.2".parse().unwrap();
        for _ in 0..3 {
            assert!(limiter.check(a, 3, 600).is_ok());
        }
        let retry = limiter.check(a, 3, 600).unwrap_err();
        assert!(retry > 0 && retry <= 600);
        assert!(limiter.check(b, 3, 600).is_ok());
    }

    #[test]
    fn login_blocks_after_five_failures_case_insensitively() {
        let limiter = LoginRateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.check("Admin@Example.com").is_ok());
            limiter.record_failure("admin@example.com");
        }
        assert!(limiter.check("ADMIN@example.com").is_err());
        assert!(limiter.check("other@example.com").is_ok());
    }

    #[test]
    fn cleanup_drops_stale_entries() {
        let limiter = SubmissionRateLimiter::new();
        let ip: IpAddr = "198.51.100.1".parse().unwrap();
        limiter.check(ip, 1, 600).unwrap();
        limiter.cleanup(Duration::ZERO);
        assert!(limiter.check(ip, 1, 600).is_ok());
    }
}
