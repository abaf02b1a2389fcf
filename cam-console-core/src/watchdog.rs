//! Stream supervision: consecutive-failure counting, capped exponential
//! reload backoff, and cache-busting reload tokens.
//!
//! The watchdog never touches the network. It decides *when* the next
//! attempt should start and *which* token identifies it; the engine owns
//! the timer and the reader task owns the connection. Signals from an old
//! attempt are recognised by token and dropped.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Externally visible stream health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Frames are arriving.
    Healthy,
    /// First failure; a reload is due after the base delay.
    Retrying,
    /// Repeated failures; reloads are spaced exponentially. Carries the
    /// consecutive failure count.
    Backoff(u32),
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn backoff_delay(failure_count: u32, base_delay: Duration, max_delay: Duration) -> Duration {
    if failure_count == 0 {
        base_delay
    } else {
        let exponential_delay = base_delay.saturating_mul(2_u32.saturating_pow(failure_count.min(10)));
        exponential_delay.min(max_delay)
    }
}

/// Reload scheduling state for the video stream.
#[derive(Debug)]
pub struct StreamWatchdog {
    base_delay: Duration,
    max_delay: Duration,
    consecutive_failures: u32,
    reload_at: Option<Instant>,
    current_token: u64,
}

impl StreamWatchdog {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        let mut watchdog = StreamWatchdog {
            base_delay,
            max_delay,
            consecutive_failures: 0,
            reload_at: None,
            current_token: 0,
        };
        watchdog.current_token = watchdog.mint_token();
        watchdog
    }

    /// The token of the attempt currently allowed to report.
    pub fn token(&self) -> u64 {
        self.current_token
    }

    /// True if `t` belongs to the current attempt.
    pub fn is_current(&self, t: u64) -> bool {
        t == self.current_token
    }

    pub fn phase(&self) -> StreamPhase {
        match self.consecutive_failures {
            0 => StreamPhase::Healthy,
            1 => StreamPhase::Retrying,
            n => StreamPhase::Backoff(n),
        }
    }

    /// When the next scheduled reload should fire, if one is pending.
    pub fn reload_deadline(&self) -> Option<Instant> {
        self.reload_at
    }

    /// Record a failed attempt. Schedules a reload at the current backoff
    /// delay and returns it, or returns `None` when a reload is already
    /// pending (there is never more than one timer).
    pub fn on_failure(&mut self, now: Instant) -> Option<Duration> {
        if self.reload_at.is_some() {
            return None;
        }
        let delay = backoff_delay(self.consecutive_failures, self.base_delay, self.max_delay);
        self.consecutive_failures += 1;
        self.reload_at = Some(now + delay);
        Some(delay)
    }

    /// Record that the current attempt delivered a frame.
    pub fn on_success(&mut self) {
        self.consecutive_failures = 0;
        self.reload_at = None;
    }

    /// Begin a fresh attempt now: cancel any pending reload timer and mint
    /// the token that names the new attempt. Used both when a scheduled
    /// reload fires and when the user forces a refresh past the backoff.
    pub fn reload(&mut self) -> u64 {
        self.reload_at = None;
        self.current_token = self.mint_token();
        self.current_token
    }

    // Wall-clock millis, bumped past the previous token so every attempt
    // gets a distinct, strictly increasing cache-buster.
    fn mint_token(&self) -> u64 {
        unix_millis().max(self.current_token + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let base = Duration::from_millis(3000);
        let max = Duration::from_millis(30000);
        assert_eq!(backoff_delay(0, base, max), Duration::from_millis(3000));
        assert_eq!(backoff_delay(1, base, max), Duration::from_millis(6000));
        assert_eq!(backoff_delay(2, base, max), Duration::from_millis(12000));
        assert_eq!(backoff_delay(3, base, max), Duration::from_millis(24000));
        assert_eq!(backoff_delay(4, base, max), Duration::from_millis(30000));
        assert_eq!(backoff_delay(20, base, max), Duration::from_millis(30000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_schedules_base_delay() {
        let mut watchdog =
            StreamWatchdog::new(Duration::from_secs(3), Duration::from_secs(30));
        let now = Instant::now();

        assert_eq!(watchdog.on_failure(now), Some(Duration::from_secs(3)));
        assert_eq!(watchdog.phase(), StreamPhase::Retrying);
        assert_eq!(watchdog.reload_deadline(), Some(now + Duration::from_secs(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_while_pending_is_ignored() {
        let mut watchdog =
            StreamWatchdog::new(Duration::from_secs(3), Duration::from_secs(30));
        let now = Instant::now();

        watchdog.on_failure(now);
        assert_eq!(watchdog.on_failure(now), None);
        assert_eq!(watchdog.phase(), StreamPhase::Retrying);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_escalates_per_attempt() {
        let mut watchdog =
            StreamWatchdog::new(Duration::from_secs(3), Duration::from_secs(30));

        let mut delays = Vec::new();
        for _ in 0..6 {
            let delay = watchdog.on_failure(Instant::now());
            delays.push(delay.expect("no reload should be pending"));
            watchdog.reload();
        }
        let secs: Vec<u64> = delays.iter().map(|d| d.as_secs()).collect();
        assert_eq!(secs, vec![3, 6, 12, 24, 30, 30]);
        assert_eq!(watchdog.phase(), StreamPhase::Backoff(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_everything() {
        let mut watchdog =
            StreamWatchdog::new(Duration::from_secs(3), Duration::from_secs(30));
        watchdog.on_failure(Instant::now());
        watchdog.on_success();

        assert_eq!(watchdog.phase(), StreamPhase::Healthy);
        assert_eq!(watchdog.reload_deadline(), None);
        // Next failure starts over at the base delay.
        assert_eq!(
            watchdog.on_failure(Instant::now()),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_tokens_strictly_increase() {
        let mut watchdog =
            StreamWatchdog::new(Duration::from_secs(3), Duration::from_secs(30));
        let first = watchdog.token();
        let second = watchdog.reload();
        let third = watchdog.reload();
        assert!(second > first);
        assert!(third > second);
        assert!(watchdog.is_current(third));
        assert!(!watchdog.is_current(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_reload_cancels_pending_timer() {
        let mut watchdog =
            StreamWatchdog::new(Duration::from_secs(3), Duration::from_secs(30));
        watchdog.on_failure(Instant::now());
        assert!(watchdog.reload_deadline().is_some());

        watchdog.reload();
        assert_eq!(watchdog.reload_deadline(), None);
        // The failure streak is still live until a frame arrives.
        assert_eq!(watchdog.phase(), StreamPhase::Retrying);
    }
}
