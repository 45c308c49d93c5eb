//! Per-host request rate limiting.
//!
//! Two fixed windows per host: one second and one minute. A request is
//! admitted only if both windows have room; rejected requests do not count.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use walletbridge_core::ErrorCode;

use crate::config::RateLimitSection;

/// Decision from policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Pass,
    Reject { code: ErrorCode, msg: &'static str },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self { started: now, count: 0 }
    }

    fn roll(&mut self, now: Instant, len: Duration) {
        if now.duration_since(self.started) >= len {
            *self = Window::new(now);
        }
    }
}

#[derive(Debug)]
struct HostWindows {
    second: Window,
    minute: Window,
}

pub struct HostRateLimiter {
    enabled: bool,
    per_second: u32,
    per_minute: u32,
    hosts: DashMap<String, HostWindows>,
}

impl HostRateLimiter {
    pub fn new(cfg: &RateLimitSection) -> Self {
        Self {
            enabled: cfg.enabled,
            per_second: cfg.per_second,
            per_minute: cfg.per_minute,
            hosts: DashMap::new(),
        }
    }

    pub fn check(&self, host: &str) -> PolicyDecision {
        self.check_at(host, Instant::now())
    }

    pub fn check_at(&self, host: &str, now: Instant) -> PolicyDecision {
        if !self.enabled {
            return PolicyDecision::Pass;
        }
        let mut w = self.hosts.entry(host.to_string()).or_insert_with(|| HostWindows {
            second: Window::new(now),
            minute: Window::new(now),
        });
        w.second.roll(now, Duration::from_secs(1));
        w.minute.roll(now, Duration::from_secs(60));

        if w.second.count >= self.per_second {
            return PolicyDecision::Reject {
                code: ErrorCode::RateLimited,
                msg: "too many requests per second",
            };
        }
        if w.minute.count >= self.per_minute {
            return PolicyDecision::Reject {
                code: ErrorCode::RateLimited,
                msg: "too many requests per minute",
            };
        }
        w.second.count += 1;
        w.minute.count += 1;
        PolicyDecision::Pass
    }

    /// Forget a host's windows (session removed).
    pub fn reset(&self, host: &str) {
        self.hosts.remove(host);
    }

    pub fn prune_idle(&self) -> usize {
        self.prune_idle_at(Instant::now())
    }

    /// Drop hosts whose minute window has run out; they hold no budget.
    pub fn prune_idle_at(&self, now: Instant) -> usize {
        let before = self.hosts.len();
        self.hosts
            .retain(|_, w| now.duration_since(w.minute.started) < Duration::from_secs(60));
        before - self.hosts.len()
    }

    pub fn tracked_hosts(&self) -> usize {
        self.hosts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_second: u32, per_minute: u32) -> HostRateLimiter {
        HostRateLimiter::new(&RateLimitSection {
            enabled: true,
            per_second,
            per_minute,
        })
    }

    #[test]
    fn idle_hosts_are_pruned() {
        let l = limiter(5, 50);
        let t0 = Instant::now();
        l.check_at("old.example", t0);
        l.check_at("fresh.example", t0 + Duration::from_secs(50));
        assert_eq!(l.tracked_hosts(), 2);

        assert_eq!(l.prune_idle_at(t0 + Duration::from_secs(61)), 1);
        assert_eq!(l.tracked_hosts(), 1);
        assert_eq!(l.prune_idle_at(t0 + Duration::from_secs(61)), 0);
    }

    #[test]
    fn second_window_rolls() {
        let l = limiter(2, 100);
        let t0 = Instant::now();
        assert_eq!(l.check_at("a.example", t0), PolicyDecision::Pass);
        assert_eq!(l.check_at("a.example", t0), PolicyDecision::Pass);
        assert!(matches!(l.check_at("a.example", t0), PolicyDecision::Reject { .. }));
        assert_eq!(l.check_at("a.example", t0 + Duration::from_millis(1001)), PolicyDecision::Pass);
    }

    #[test]
    fn minute_window_caps_bursts() {
        let l = limiter(5, 6);
        let t0 = Instant::now();
        for _ in 0..5 {
            assert_eq!(l.check_at("a.example", t0), PolicyDecision::Pass);
        }
        let t1 = t0 + Duration::from_secs(2);
        assert_eq!(l.check_at("a.example", t1), PolicyDecision::Pass);
        assert!(matches!(l.check_at("a.example", t1), PolicyDecision::Reject { .. }));
    }

    #[test]
    fn hosts_are_independent() {
        let l = limiter(1, 10);
        let t0 = Instant::now();
        assert_eq!(l.check_at("a.example", t0), PolicyDecision::Pass);
        assert_eq!(l.check_at("b.example", t0), PolicyDecision::Pass);
        assert!(matches!(l.check_at("a.example", t0), PolicyDecision::Reject { .. }));
    }
}
