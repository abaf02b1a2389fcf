//! Common utilities for console integration tests.
//!
//! Every test drives a full console (engine + stream reader) against the
//! scriptable mock camera API under a paused tokio clock. Updates from the
//! polls, the stream reader and dispatches interleave freely, so assertions
//! go through `wait_for`-style helpers that discard what they are not
//! looking for.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use cam_console_core::{Console, ConsoleConfig, ConsoleHandle, NoticeKind, Update};
use cam_console_shared::camera_api::mock::MockCameraApi;
use cam_console_shared::CameraIdentity;

/// Virtual-time limit on waiting for an expected update. Under a paused
/// clock the runtime fast-forwards here instantly when a test would
/// otherwise hang.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(120);

pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn test_config() -> ConsoleConfig {
    ConsoleConfig::default()
}

pub struct TestConsole {
    pub api: Arc<MockCameraApi>,
    pub handle: ConsoleHandle,
    pub updates: mpsc::UnboundedReceiver<Update>,
}

pub fn start_console(config: ConsoleConfig) -> TestConsole {
    start_console_with(Arc::new(MockCameraApi::new()), config)
}

/// Start a console over a pre-scripted mock.
pub fn start_console_with(api: Arc<MockCameraApi>, config: ConsoleConfig) -> TestConsole {
    init_logging();
    let (handle, updates) = Console::start(Arc::clone(&api), config).expect("console start");
    TestConsole {
        api,
        handle,
        updates,
    }
}

/// Let the engine and any spawned request tasks run to quiescence without
/// moving the clock.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock, then settle whatever that released.
pub async fn advance_and_settle(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

/// Receive updates until `matcher` yields a value, discarding the rest.
pub async fn wait_for<T>(
    updates: &mut mpsc::UnboundedReceiver<Update>,
    mut matcher: impl FnMut(&Update) -> Option<T>,
) -> T {
    let result = tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match updates.recv().await {
                Some(update) => {
                    if let Some(found) = matcher(&update) {
                        return found;
                    }
                }
                None => panic!("update channel closed while waiting"),
            }
        }
    })
    .await;
    result.expect("timed out waiting for update")
}

/// Wait for the next notice of the given kind and return its text.
pub async fn wait_for_notice(
    updates: &mut mpsc::UnboundedReceiver<Update>,
    kind: NoticeKind,
) -> String {
    wait_for(updates, |update| match update {
        Update::Notice { kind: k, text } if *k == kind => Some(text.clone()),
        _ => None,
    })
    .await
}

/// Wait for the next active-camera update.
pub async fn wait_for_active_camera(
    updates: &mut mpsc::UnboundedReceiver<Update>,
) -> CameraIdentity {
    wait_for(updates, |update| match update {
        Update::ActiveCamera(identity) => Some(identity.clone()),
        _ => None,
    })
    .await
}

/// Everything currently queued on the update channel, without waiting.
pub fn drain_pending(updates: &mut mpsc::UnboundedReceiver<Update>) -> Vec<Update> {
    let mut drained = Vec::new();
    while let Ok(update) = updates.try_recv() {
        drained.push(update);
    }
    drained
}
