//! Server-authoritative active-camera state.
//!
//! The selection only ever changes on a confirmed switch response or an
//! identity-poll result; a pending switch request changes nothing. A short
//! hold after each confirmed switch keeps a poll that was already in flight
//! when the switch landed from flapping the selection back to the old
//! camera.

use std::time::Duration;

use cam_console_shared::CameraIdentity;
use tokio::time::Instant;

#[derive(Debug, Default)]
pub struct CameraSelection {
    active: Option<CameraIdentity>,
    hold_until: Option<Instant>,
}

impl CameraSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&CameraIdentity> {
        self.active.as_ref()
    }

    /// Adopt the identity confirmed by a switch response and start the
    /// poll-suppression hold. A zero grace disables the hold.
    pub fn confirm_switch(&mut self, identity: CameraIdentity, now: Instant, grace: Duration) {
        self.active = Some(identity);
        self.hold_until = if grace.is_zero() {
            None
        } else {
            Some(now + grace)
        };
    }

    /// Offer an identity-poll result. Returns true when it changed the
    /// selection; false when suppressed by the hold or already current.
    pub fn apply_poll(&mut self, identity: CameraIdentity, now: Instant) -> bool {
        if self.hold_until.is_some_and(|until| now < until) {
            return false;
        }
        self.hold_until = None;
        if self.active.as_ref() == Some(&identity) {
            return false;
        }
        self.active = Some(identity);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(index: u32) -> CameraIdentity {
        CameraIdentity::from_parts(index, Some(format!("Camera {index}")))
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_adopts_new_identity() {
        let mut selection = CameraSelection::new();
        assert!(selection.apply_poll(camera(0), Instant::now()));
        assert_eq!(selection.active(), Some(&camera(0)));
        // Same identity again is not a change.
        assert!(!selection.apply_poll(camera(0), Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_suppresses_stale_poll() {
        let mut selection = CameraSelection::new();
        selection.apply_poll(camera(0), Instant::now());
        selection.confirm_switch(camera(1), Instant::now(), Duration::from_secs(3));

        // A poll that raced the switch still reports the old camera; the
        // hold keeps it from winning.
        assert!(!selection.apply_poll(camera(0), Instant::now()));
        assert_eq!(selection.active(), Some(&camera(1)));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(selection.apply_poll(camera(0), Instant::now()));
        assert_eq!(selection.active(), Some(&camera(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_grace_disables_hold() {
        let mut selection = CameraSelection::new();
        selection.confirm_switch(camera(1), Instant::now(), Duration::ZERO);
        assert!(selection.apply_poll(camera(2), Instant::now()));
    }
}
