//! The engine task: one loop that owns all mutable console state.
//!
//! Every input — operator events, resolved requests, poll results, stream
//! signals — arrives on a single mpsc channel; the two poll intervals, the
//! per-group debounce deadlines and the watchdog reload deadline are
//! multiplexed into the same `tokio::select!`. Spawned work never touches
//! state directly: it reports back by sending an event, so there is no
//! locking anywhere in the engine.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration, Instant};

use cam_console_shared::{ApplyResponse, CameraApi, CameraIdentity, HttpClientError};

use crate::config::ConsoleConfig;
use crate::controls::{Cadence, ControlValues, SettingsGroup};
use crate::debounce::DebounceQueue;
use crate::dispatch::DispatchGate;
use crate::error::{ConsoleError, DispatchError};
use crate::event::{Confirmation, Event, NoticeKind, StreamSignal, Update};
use crate::selection::CameraSelection;
use crate::stream::StreamTarget;
use crate::watchdog::{StreamPhase, StreamWatchdog};

/// Run a request under the dispatch timeout and map transport errors onto
/// the dispatch taxonomy.
async fn fetch_outcome<T, F>(timeout: Duration, request: F) -> Result<T, DispatchError>
where
    F: Future<Output = Result<T, HttpClientError>>,
{
    match time::timeout(timeout, request).await {
        Ok(Ok(body)) => Ok(body),
        Ok(Err(err)) => Err(DispatchError::from(err)),
        Err(_) => Err(DispatchError::Network("request timed out".to_string())),
    }
}

/// Like [`fetch_outcome`], but also treats a `success: false` body as a
/// rejection, which is how the settings and reset endpoints report refusals.
async fn apply_outcome<F>(timeout: Duration, request: F) -> Result<Confirmation, DispatchError>
where
    F: Future<Output = Result<ApplyResponse, HttpClientError>>,
{
    let body = fetch_outcome(timeout, request).await?;
    if body.success {
        Ok(Confirmation {
            message: body.message,
        })
    } else {
        Err(DispatchError::Rejected(
            body.text().unwrap_or("request rejected").to_string(),
        ))
    }
}

pub struct Engine<A> {
    api: Arc<A>,
    config: ConsoleConfig,
    controls: ControlValues,
    debounce: DebounceQueue,
    gate: DispatchGate,
    watchdog: StreamWatchdog,
    selection: CameraSelection,
    identity_poll_pending: bool,
    status_poll_pending: bool,
    /// None until the first status probe resolves; transitions drive the
    /// connection lost/restored notices.
    status_reachable: Option<bool>,
    events_tx: mpsc::UnboundedSender<Event>,
    updates: mpsc::UnboundedSender<Update>,
    targets: watch::Sender<StreamTarget>,
}

impl<A: CameraApi + 'static> Engine<A> {
    pub(crate) fn new(
        api: Arc<A>,
        config: ConsoleConfig,
        events_tx: mpsc::UnboundedSender<Event>,
        updates: mpsc::UnboundedSender<Update>,
    ) -> (Self, watch::Receiver<StreamTarget>) {
        let watchdog = StreamWatchdog::new(config.stream_retry_base(), config.stream_retry_max());
        let t = watchdog.token();
        let url = stream_url(&config.base_url, t);
        let (targets, targets_rx) = watch::channel(StreamTarget { url, t });

        let engine = Engine {
            api,
            config,
            controls: ControlValues::default(),
            debounce: DebounceQueue::new(),
            gate: DispatchGate::new(),
            watchdog,
            selection: CameraSelection::new(),
            identity_poll_pending: false,
            status_poll_pending: false,
            status_reachable: None,
            events_tx,
            updates,
            targets,
        };
        (engine, targets_rx)
    }

    /// Drive the console until shutdown. The first poll ticks fire
    /// immediately, which doubles as the startup identity sync.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) -> Result<(), ConsoleError> {
        let mut identity_timer = time::interval(self.config.identity_poll());
        let mut status_timer = time::interval(self.config.status_poll());

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(Event::Shutdown) | None => return Ok(()),
                    Some(event) => self.handle_event(event)?,
                },
                _ = identity_timer.tick() => self.poll_identity(),
                _ = status_timer.tick() => self.poll_status(),
                _ = async {
                    match deadline {
                        Some(at) => time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => self.on_deadline()?,
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (self.debounce.next_deadline(), self.watchdog.reload_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<(), ConsoleError> {
        match event {
            Event::Edit(edit) => {
                let group = edit.group();
                self.controls.apply(edit);
                let delay = match edit.cadence() {
                    Cadence::Immediate => None,
                    Cadence::Continuous => Some(self.config.continuous_debounce()),
                    Cadence::Discrete => Some(self.config.discrete_debounce()),
                };
                match delay {
                    // Immediate edits skip the queue. The dispatch snapshots
                    // current values, so any armed window for the group is
                    // already covered by it.
                    None => {
                        self.debounce.cancel(group);
                        self.try_begin_dispatch(group);
                    }
                    Some(delay) => self.debounce.schedule(
                        group,
                        delay,
                        Instant::now(),
                        self.config.debounce_max_wait(),
                    ),
                }
                Ok(())
            }
            Event::ApplyNow => {
                for group in SettingsGroup::ALL {
                    self.debounce.cancel(group);
                    self.try_begin_dispatch(group);
                }
                Ok(())
            }
            Event::SetFlipPreset(preset) => {
                self.controls.apply_preset(preset);
                self.push_update(Update::Controls(self.controls.clone()))?;
                self.debounce.cancel(SettingsGroup::Flip);
                self.try_begin_dispatch(SettingsGroup::Flip);
                Ok(())
            }
            Event::SwitchCamera { index } => self.begin_switch(index),
            Event::ResetFlip => self.begin_reset(SettingsGroup::Flip),
            Event::ResetColor => self.begin_reset(SettingsGroup::Color),
            Event::RefreshStream => {
                tracing::info!("manual stream refresh requested");
                self.force_stream_refresh()
            }
            Event::DispatchResolved { group, outcome } => self.on_dispatch_resolved(group, outcome),
            Event::SwitchResolved { requested, outcome } => {
                self.on_switch_resolved(requested, outcome)
            }
            Event::ResetResolved { group, outcome } => self.on_reset_resolved(group, outcome),
            Event::Stream(signal) => self.on_stream_signal(signal),
            Event::IdentityFetched(outcome) => {
                self.identity_poll_pending = false;
                self.on_identity_fetched(outcome)
            }
            Event::StatusFetched(outcome) => {
                self.status_poll_pending = false;
                self.on_status_fetched(outcome)
            }
            Event::Shutdown => Ok(()),
        }
    }

    /// A debounce deadline or the watchdog reload deadline ran out.
    fn on_deadline(&mut self) -> Result<(), ConsoleError> {
        let now = Instant::now();
        if self.watchdog.reload_deadline().is_some_and(|at| at <= now) {
            tracing::debug!("stream reload timer fired");
            self.publish_stream_target()?;
        }
        for group in self.debounce.take_due(now) {
            self.try_begin_dispatch(group);
        }
        Ok(())
    }

    /// Start a settings dispatch for `group`, or queue the one follow-up
    /// when a request for the group is already out.
    fn try_begin_dispatch(&mut self, group: SettingsGroup) {
        if self.gate.is_in_flight(group) {
            tracing::debug!(group = group.name(), "dispatch in flight, queueing follow-up");
            self.gate.set_queued(group);
            return;
        }
        self.gate.begin(group);

        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        let timeout = self.config.dispatch_timeout();
        match group {
            SettingsGroup::Detection => {
                let payload = self.controls.detection();
                tokio::spawn(async move {
                    let outcome = apply_outcome(timeout, api.apply_detection(&payload)).await;
                    let _ = events.send(Event::DispatchResolved { group, outcome });
                });
            }
            SettingsGroup::Flip => {
                let payload = self.controls.flip();
                tokio::spawn(async move {
                    let outcome = apply_outcome(timeout, api.apply_flip(&payload)).await;
                    let _ = events.send(Event::DispatchResolved { group, outcome });
                });
            }
            SettingsGroup::Color => {
                let payload = self.controls.color();
                tokio::spawn(async move {
                    let outcome = apply_outcome(timeout, api.apply_color(&payload)).await;
                    let _ = events.send(Event::DispatchResolved { group, outcome });
                });
            }
        }
    }

    fn on_dispatch_resolved(
        &mut self,
        group: SettingsGroup,
        outcome: Result<Confirmation, DispatchError>,
    ) -> Result<(), ConsoleError> {
        self.gate.finish(group);
        match outcome {
            Ok(confirmation) => {
                let text = confirmation
                    .message
                    .unwrap_or_else(|| format!("{} settings updated", group.name()));
                self.push_update(Update::Notice {
                    kind: NoticeKind::Success,
                    text,
                })?;
                // All three groups change the rendered frame, so a confirmed
                // mutation is worth a fresh attempt even mid-backoff.
                self.force_stream_refresh()?;
            }
            Err(err) => {
                tracing::warn!(group = group.name(), error = %err, "settings dispatch failed");
                self.push_update(Update::Notice {
                    kind: NoticeKind::Error,
                    text: format!("failed to update {} settings: {err}", group.name()),
                })?;
            }
        }
        if self.gate.take_queued(group) {
            self.try_begin_dispatch(group);
        }
        Ok(())
    }

    fn begin_switch(&mut self, index: u32) -> Result<(), ConsoleError> {
        if !self.gate.begin_switch() {
            tracing::debug!(index, "camera switch already in flight, ignoring");
            return Ok(());
        }
        self.push_update(Update::Notice {
            kind: NoticeKind::Info,
            text: format!("switching to camera {index}"),
        })?;

        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        let timeout = self.config.dispatch_timeout();
        tokio::spawn(async move {
            let outcome = fetch_outcome(timeout, api.switch_camera(index)).await;
            let _ = events.send(Event::SwitchResolved {
                requested: index,
                outcome,
            });
        });
        Ok(())
    }

    fn on_switch_resolved(
        &mut self,
        requested: u32,
        outcome: Result<cam_console_shared::SwitchResponse, DispatchError>,
    ) -> Result<(), ConsoleError> {
        self.gate.finish_switch();
        match outcome {
            Ok(body) if body.success => {
                let index = body.camera_index.unwrap_or(requested);
                let identity = CameraIdentity::from_parts(index, body.camera_name.clone());
                self.selection.confirm_switch(
                    identity.clone(),
                    Instant::now(),
                    self.config.switch_grace(),
                );
                tracing::info!(camera = %identity, "switched camera");
                self.push_update(Update::ActiveCamera(identity))?;
                let text = body
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("switched to camera {index}"));
                self.push_update(Update::Notice {
                    kind: NoticeKind::Success,
                    text,
                })?;
            }
            Ok(body) => {
                let text = body.text().unwrap_or("switch rejected").to_string();
                tracing::warn!(requested, reason = %text, "camera switch rejected");
                self.push_update(Update::Notice {
                    kind: NoticeKind::Error,
                    text: format!("camera switch failed: {text}"),
                })?;
            }
            Err(err) => {
                tracing::warn!(requested, error = %err, "camera switch failed");
                self.push_update(Update::Notice {
                    kind: NoticeKind::Error,
                    text: format!("camera switch failed: {err}"),
                })?;
            }
        }
        Ok(())
    }

    fn begin_reset(&mut self, group: SettingsGroup) -> Result<(), ConsoleError> {
        if !self.gate.begin_reset(group) {
            tracing::debug!(group = group.name(), "reset already in flight, ignoring");
            return Ok(());
        }
        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        let timeout = self.config.dispatch_timeout();
        match group {
            SettingsGroup::Flip => {
                tokio::spawn(async move {
                    let outcome = apply_outcome(timeout, api.reset_flip()).await;
                    let _ = events.send(Event::ResetResolved { group, outcome });
                });
            }
            SettingsGroup::Color => {
                tokio::spawn(async move {
                    let outcome = apply_outcome(timeout, api.reset_color()).await;
                    let _ = events.send(Event::ResetResolved { group, outcome });
                });
            }
            SettingsGroup::Detection => {}
        }
        Ok(())
    }

    fn on_reset_resolved(
        &mut self,
        group: SettingsGroup,
        outcome: Result<Confirmation, DispatchError>,
    ) -> Result<(), ConsoleError> {
        self.gate.finish_reset(group);
        match outcome {
            Ok(confirmation) => {
                match group {
                    SettingsGroup::Flip => self.controls.reset_flip(),
                    SettingsGroup::Color => self.controls.reset_color(),
                    SettingsGroup::Detection => {}
                }
                self.push_update(Update::Controls(self.controls.clone()))?;
                let text = confirmation
                    .message
                    .unwrap_or_else(|| format!("{} settings reset", group.name()));
                self.push_update(Update::Notice {
                    kind: NoticeKind::Success,
                    text,
                })?;
                self.force_stream_refresh()?;
            }
            Err(err) => {
                tracing::warn!(group = group.name(), error = %err, "reset failed");
                self.push_update(Update::Notice {
                    kind: NoticeKind::Error,
                    text: format!("failed to reset {} settings: {err}", group.name()),
                })?;
            }
        }
        Ok(())
    }

    fn on_stream_signal(&mut self, signal: StreamSignal) -> Result<(), ConsoleError> {
        match signal {
            StreamSignal::Opened { t } if self.watchdog.is_current(t) => {
                if self.watchdog.phase() != StreamPhase::Healthy {
                    tracing::info!(t, "video stream recovered");
                }
                self.watchdog.on_success();
                self.push_update(Update::StreamHealth(StreamPhase::Healthy))?;
            }
            StreamSignal::Failed { t } if self.watchdog.is_current(t) => {
                match self.watchdog.on_failure(Instant::now()) {
                    Some(delay) => {
                        tracing::warn!(
                            t,
                            retry_in_ms = delay.as_millis() as u64,
                            "video stream failed, reload scheduled"
                        );
                        self.push_update(Update::StreamHealth(self.watchdog.phase()))?;
                    }
                    None => tracing::debug!(t, "stream failure while a reload is pending"),
                }
            }
            StreamSignal::Opened { t } | StreamSignal::Failed { t } => {
                tracing::debug!(t, current = self.watchdog.token(), "stale stream signal ignored");
            }
        }
        Ok(())
    }

    fn poll_identity(&mut self) {
        if self.identity_poll_pending {
            tracing::debug!("identity poll still in flight, skipping tick");
            return;
        }
        self.identity_poll_pending = true;
        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        let timeout = self.config.dispatch_timeout();
        tokio::spawn(async move {
            let outcome = fetch_outcome(timeout, api.current_camera()).await;
            let _ = events.send(Event::IdentityFetched(outcome));
        });
    }

    fn on_identity_fetched(
        &mut self,
        outcome: Result<cam_console_shared::CurrentCameraResponse, DispatchError>,
    ) -> Result<(), ConsoleError> {
        match outcome {
            Ok(body) => {
                let index = match (body.success, body.camera_index) {
                    (true, Some(index)) => index,
                    _ => {
                        tracing::debug!(success = body.success, "identity poll returned no camera");
                        return Ok(());
                    }
                };
                let identity = CameraIdentity::from_parts(index, body.camera_name);
                if self.selection.apply_poll(identity.clone(), Instant::now()) {
                    tracing::info!(camera = %identity, "active camera updated from poll");
                    self.push_update(Update::ActiveCamera(identity))?;
                }
            }
            // Poll failures retry on the next tick and never reach the
            // operator.
            Err(err) => tracing::debug!(error = %err, "identity poll failed"),
        }
        Ok(())
    }

    fn poll_status(&mut self) {
        if self.status_poll_pending {
            tracing::debug!("status probe still in flight, skipping tick");
            return;
        }
        self.status_poll_pending = true;
        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        let timeout = self.config.dispatch_timeout();
        tokio::spawn(async move {
            let outcome = fetch_outcome(timeout, api.system_status()).await;
            let _ = events.send(Event::StatusFetched(outcome));
        });
    }

    fn on_status_fetched(
        &mut self,
        outcome: Result<cam_console_shared::SystemStatus, DispatchError>,
    ) -> Result<(), ConsoleError> {
        match outcome {
            Ok(status) => {
                if self.status_reachable == Some(false) {
                    tracing::info!("camera server reachable again");
                    self.push_update(Update::Notice {
                        kind: NoticeKind::Success,
                        text: "connection to camera server restored".to_string(),
                    })?;
                    self.force_stream_refresh()?;
                }
                self.status_reachable = Some(true);
                self.push_update(Update::Status(status))?;
            }
            Err(err) => {
                tracing::debug!(error = %err, "status probe failed");
                if self.status_reachable == Some(true) {
                    self.push_update(Update::Notice {
                        kind: NoticeKind::Error,
                        text: "connection to camera server lost".to_string(),
                    })?;
                }
                self.status_reachable = Some(false);
            }
        }
        Ok(())
    }

    /// Immediate stream-target change past any pending backoff timer.
    fn force_stream_refresh(&mut self) -> Result<(), ConsoleError> {
        self.publish_stream_target()
    }

    fn publish_stream_target(&mut self) -> Result<(), ConsoleError> {
        let t = self.watchdog.reload();
        let url = stream_url(&self.config.base_url, t);
        if self
            .targets
            .send(StreamTarget {
                url: url.clone(),
                t,
            })
            .is_err()
        {
            tracing::debug!("stream reader gone, target not delivered");
        }
        self.push_update(Update::StreamTarget { url })
    }

    fn push_update(&self, update: Update) -> Result<(), ConsoleError> {
        self.updates
            .send(update)
            .map_err(|_| ConsoleError::UpdatesClosed)
    }
}

fn stream_url(base_url: &str, t: u64) -> String {
    format!("{}/video_feed?t={t}", base_url.trim_end_matches('/'))
}
