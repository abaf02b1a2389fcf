//! Stream watchdog behavior end to end: reload scheduling, exponential
//! backoff, bypass on forced refresh, and recovery resetting the ladder.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{advance_and_settle, drain_pending, settle, start_console_with, test_config, wait_for};
use cam_console_core::{ControlEdit, StreamPhase, Update};
use cam_console_shared::camera_api::mock::{MockCameraApi, VideoScript};

async fn next_phase(updates: &mut tokio::sync::mpsc::UnboundedReceiver<Update>) -> StreamPhase {
    wait_for(updates, |update| match update {
        Update::StreamHealth(phase) => Some(*phase),
        _ => None,
    })
    .await
}

fn phases(updates: &[Update]) -> Vec<StreamPhase> {
    updates
        .iter()
        .filter_map(|update| match update {
            Update::StreamHealth(phase) => Some(*phase),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_failed_stream_reloads_after_base_delay() {
    let api = Arc::new(MockCameraApi::new());
    api.script_video(VideoScript::ConnectError);
    api.script_video(VideoScript::FramesThenHold { count: 1 });
    let mut tc = start_console_with(api, test_config());
    settle().await;

    assert_eq!(next_phase(&mut tc.updates).await, StreamPhase::Retrying);
    assert_eq!(tc.api.video_connects().len(), 1);

    // Nothing reconnects before the base delay elapses.
    advance_and_settle(Duration::from_millis(2_999)).await;
    assert_eq!(tc.api.video_connects().len(), 1);

    advance_and_settle(Duration::from_millis(1)).await;
    let connects = tc.api.video_connects();
    assert_eq!(connects.len(), 2);
    assert!(connects[1] > connects[0], "reload must bust the cache");
    assert_eq!(next_phase(&mut tc.updates).await, StreamPhase::Healthy);
}

#[tokio::test(start_paused = true)]
async fn test_reload_delays_escalate_and_cap() {
    let api = Arc::new(MockCameraApi::new());
    for _ in 0..6 {
        api.script_video(VideoScript::ConnectError);
    }
    api.script_video(VideoScript::FramesThenHold { count: 1 });
    let mut tc = start_console_with(api, test_config());
    settle().await;
    assert_eq!(tc.api.video_connects().len(), 1);

    // 3s, 6s, 12s, 24s, then pinned at the 30s cap.
    let delays_ms = [3_000u64, 6_000, 12_000, 24_000, 30_000];
    for (failures, delay_ms) in delays_ms.iter().enumerate() {
        advance_and_settle(Duration::from_millis(delay_ms - 1)).await;
        assert_eq!(tc.api.video_connects().len(), failures + 1);
        advance_and_settle(Duration::from_millis(1)).await;
        assert_eq!(tc.api.video_connects().len(), failures + 2);
    }
    advance_and_settle(Duration::from_secs(30)).await;

    let connects = tc.api.video_connects();
    assert_eq!(connects.len(), 7);
    assert!(connects.windows(2).all(|pair| pair[1] > pair[0]));

    let drained = drain_pending(&mut tc.updates);
    assert_eq!(
        phases(&drained),
        vec![
            StreamPhase::Retrying,
            StreamPhase::Backoff(2),
            StreamPhase::Backoff(3),
            StreamPhase::Backoff(4),
            StreamPhase::Backoff(5),
            StreamPhase::Backoff(6),
            StreamPhase::Healthy,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_forced_refresh_bypasses_backoff() {
    let api = Arc::new(MockCameraApi::new());
    api.script_video(VideoScript::ConnectError);
    api.script_video(VideoScript::ConnectError);
    api.script_video(VideoScript::FramesThenHold { count: 1 });
    let mut tc = start_console_with(api, test_config());
    settle().await;

    advance_and_settle(Duration::from_secs(3)).await;
    assert_eq!(tc.api.video_connects().len(), 2);

    // Second failure scheduled a reload at t=9s. A settings dispatch at
    // t=4s forces a refresh right away instead.
    advance_and_settle(Duration::from_secs(1)).await;
    tc.handle.edit(ControlEdit::YoloEnabled(false));
    settle().await;
    let connects = tc.api.video_connects();
    assert_eq!(connects.len(), 3);
    assert!(connects[2] > connects[1]);

    // The pending backoff timer was cancelled, not left to double-fire.
    advance_and_settle(Duration::from_secs(10)).await;
    assert_eq!(tc.api.video_connects().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_reconnects_immediately() {
    let api = Arc::new(MockCameraApi::new());
    let mut tc = start_console_with(api, test_config());
    settle().await;
    assert_eq!(next_phase(&mut tc.updates).await, StreamPhase::Healthy);
    assert_eq!(tc.api.video_connects().len(), 1);

    tc.handle.refresh_stream();
    settle().await;
    let connects = tc.api.video_connects();
    assert_eq!(connects.len(), 2);
    assert!(connects[1] > connects[0]);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_resets_backoff_ladder() {
    let api = Arc::new(MockCameraApi::new());
    for _ in 0..3 {
        api.script_video(VideoScript::Frames { count: 1 });
    }
    api.script_video(VideoScript::FramesThenHold { count: 1 });
    let mut tc = start_console_with(api, test_config());
    settle().await;
    assert_eq!(tc.api.video_connects().len(), 1);

    // Each attempt delivers a frame before dying, so the failure count
    // resets every cycle and every reload waits only the base delay.
    for expected in [2usize, 3, 4] {
        advance_and_settle(Duration::from_millis(2_999)).await;
        assert_eq!(tc.api.video_connects().len(), expected - 1);
        advance_and_settle(Duration::from_millis(1)).await;
        assert_eq!(tc.api.video_connects().len(), expected);
    }

    let drained = drain_pending(&mut tc.updates);
    assert!(phases(&drained)
        .iter()
        .all(|phase| !matches!(phase, StreamPhase::Backoff(_))));
}
