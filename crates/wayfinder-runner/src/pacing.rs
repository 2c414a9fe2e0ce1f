//! Per-host navigation pacing (spec.md §5 "Rate limiting"). A minimal
//! token-bucket limiter applied at the point the Task Runner is about to
//! issue a `dom.navigate` tool call or the initial navigation — the exact
//! algorithm is an implementation detail per spec.md, so the simplest thing
//! that enforces a minimum interval between navigations to the same host is
//! used rather than a full token-bucket with burst capacity.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Tracks the last navigation time per host and sleeps just enough to
/// respect `min_interval` before letting the caller proceed. Shared
/// process-wide (spec.md §5 "the Tool Registry is immutable after
/// startup" companion: this limiter is likewise process-wide and read
/// concurrently by every task).
pub struct HostPacer {
    min_interval: Duration,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl HostPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last_seen: Mutex::new(HashMap::new()) }
    }

    /// Extracts the host from a URL; falls back to the whole URL string if
    /// it cannot be parsed, so pacing degrades gracefully rather than
    /// failing the navigation outright.
    pub fn host_of(url: &str) -> String {
        url.split("://")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .unwrap_or(url)
            .to_string()
    }

    /// Waits (if necessary) until `min_interval` has elapsed since the last
    /// navigation to `host`, then records this call as the new last time.
    pub async fn wait_turn(&self, host: &str) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut guard = self.last_seen.lock().await;
        let now = Instant::now();
        if let Some(&last) = guard.get(host) {
            let elapsed = now.duration_since(last);
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                drop(guard);
                tokio::time::sleep(remaining).await;
                guard = self.last_seen.lock().await;
            }
        }
        guard.insert(host.to_string(), Instant::now());
    }
}

impl Default for HostPacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_of_strips_scheme_and_path() {
        assert_eq!(HostPacer::host_of("https://example.com/a/b"), "example.com");
        assert_eq!(HostPacer::host_of("http://shop.example.com"), "shop.example.com");
    }

    #[tokio::test]
    async fn second_call_to_same_host_is_delayed() {
        let pacer = HostPacer::new(Duration::from_millis(80));
        let start = Instant::now();
        pacer.wait_turn("example.com").await;
        pacer.wait_turn("example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn different_hosts_do_not_block_each_other() {
        let pacer = HostPacer::new(Duration::from_millis(200));
        let start = Instant::now();
        pacer.wait_turn("a.com").await;
        pacer.wait_turn("b.com").await;
        assert!(start.elapsed() < Duration::from_millis(200));
    }
}
