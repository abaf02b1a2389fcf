//! Settings synchronization and stream resilience for a remote camera
//! server.
//!
//! The engine keeps operator-edited controls (detection toggles, quality and
//! FPS limits, flip/rotation, color correction) in step with the server by
//! debouncing bursts of edits into per-group dispatches, reconciles the
//! displayed active camera against the server's answer on a fixed poll, and
//! supervises the MJPEG video feed with capped exponential reload backoff.
//!
//! [`Console::start`] spawns the engine and the stream reader and hands back
//! a [`ConsoleHandle`] for operator input plus an unbounded channel of
//! [`Update`]s for rendering. All networking goes through the
//! [`cam_console_shared::CameraApi`] trait, so tests run against the
//! scriptable mock instead of a live server.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use cam_console_shared::CameraApi;

pub mod config;
pub mod controls;
pub mod debounce;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod selection;
pub mod stream;
pub mod watchdog;

pub use config::ConsoleConfig;
pub use controls::{Cadence, ControlEdit, ControlValues, FlipPreset, Rotation, SettingsGroup};
pub use error::{ConsoleError, DispatchError};
pub use event::{NoticeKind, Update};
pub use watchdog::StreamPhase;

use event::Event;

/// Entry point for embedding the engine.
pub struct Console;

impl Console {
    /// Validate the configuration, spawn the engine task and the stream
    /// reader task, and return the operator handle plus the update channel.
    ///
    /// The initial stream target is emitted before the engine runs so a
    /// consumer can point its video surface at the feed right away.
    pub fn start<A>(
        api: Arc<A>,
        config: ConsoleConfig,
    ) -> Result<(ConsoleHandle, mpsc::UnboundedReceiver<Update>), ConsoleError>
    where
        A: CameraApi + 'static,
    {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (engine, targets_rx) =
            engine::Engine::new(Arc::clone(&api), config, events_tx.clone(), updates_tx.clone());

        let initial_url = targets_rx.borrow().url.clone();
        updates_tx
            .send(Update::StreamTarget { url: initial_url })
            .map_err(|_| ConsoleError::UpdatesClosed)?;

        tokio::spawn(stream::run_stream_reader(api, targets_rx, events_tx.clone()));
        let engine_task = tokio::spawn(engine.run(events_rx));

        Ok((
            ConsoleHandle {
                events: events_tx,
                engine: engine_task,
            },
            updates_rx,
        ))
    }
}

/// Operator-side handle to a running console.
///
/// Input methods are fire-and-forget: once the engine has stopped they do
/// nothing, and the stop itself surfaces through [`ConsoleHandle::shutdown`]
/// or the update channel closing.
pub struct ConsoleHandle {
    events: mpsc::UnboundedSender<Event>,
    engine: JoinHandle<Result<(), ConsoleError>>,
}

impl ConsoleHandle {
    /// Feed one control change into the debounced mutation queue.
    pub fn edit(&self, edit: ControlEdit) {
        let _ = self.events.send(Event::Edit(edit));
    }

    /// Dispatch all three settings groups now, cancelling pending windows.
    pub fn apply_now(&self) {
        let _ = self.events.send(Event::ApplyNow);
    }

    /// Overwrite the flip controls with a preset and dispatch immediately.
    pub fn set_flip_preset(&self, preset: FlipPreset) {
        let _ = self.events.send(Event::SetFlipPreset(preset));
    }

    /// Ask the server to switch the active camera. No local state changes
    /// until the server confirms.
    pub fn switch_camera(&self, index: u32) {
        let _ = self.events.send(Event::SwitchCamera { index });
    }

    /// Reset flip settings to server defaults.
    pub fn reset_flip(&self) {
        let _ = self.events.send(Event::ResetFlip);
    }

    /// Reset color settings to server defaults.
    pub fn reset_color(&self) {
        let _ = self.events.send(Event::ResetColor);
    }

    /// Force a stream reload now, regardless of any backoff in progress.
    pub fn refresh_stream(&self) {
        let _ = self.events.send(Event::RefreshStream);
    }

    /// Stop the engine and wait for it to finish.
    pub async fn shutdown(self) -> Result<(), ConsoleError> {
        let _ = self.events.send(Event::Shutdown);
        match self.engine.await {
            Ok(result) => result,
            Err(err) => Err(ConsoleError::Task(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cam_console_shared::camera_api::mock::MockCameraApi;

    #[tokio::test]
    async fn test_start_emits_initial_target_and_shuts_down() {
        let api = Arc::new(MockCameraApi::new());
        let (handle, mut updates) = Console::start(api, ConsoleConfig::default()).unwrap();

        match updates.recv().await {
            Some(Update::StreamTarget { url }) => assert!(url.contains("/video_feed?t=")),
            other => panic!("expected initial stream target, got {other:?}"),
        }

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_is_refused() {
        let api = Arc::new(MockCameraApi::new());
        let config = ConsoleConfig {
            base_url: String::new(),
            ..ConsoleConfig::default()
        };
        assert!(matches!(
            Console::start(api, config),
            Err(ConsoleError::InvalidConfig(_))
        ));
    }
}
