//! Scriptable mock camera API for tests.
//!
//! Records every call, lets tests queue per-endpoint outcomes and response
//! delays, and scripts video connections so stream recovery paths can run
//! against a paused clock. Unscripted calls succeed with sensible defaults.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use super::{CameraApi, VideoStream};
use crate::http_client::HttpClientError;
use crate::{
    ApplyResponse, ColorSettings, CurrentCameraResponse, DetectionSettings, FlipSettings,
    SwitchResponse, SystemStatus,
};

/// Behavior of one scripted video connection attempt.
#[derive(Debug, Clone)]
pub enum VideoScript {
    /// Connection attempt fails outright.
    ConnectError,
    /// Yield this many frames, then the stream ends.
    Frames { count: u32 },
    /// Yield this many frames, then stay open forever.
    FramesThenHold { count: u32 },
    /// Connect successfully but never yield anything.
    Hang,
}

struct Scripted<T> {
    queue: VecDeque<T>,
}

impl<T> Default for Scripted<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<T> Scripted<T> {
    fn push(&mut self, item: T) {
        self.queue.push_back(item);
    }

    fn next(&mut self) -> Option<T> {
        self.queue.pop_front()
    }
}

struct MockState {
    detection_calls: Vec<DetectionSettings>,
    flip_calls: Vec<FlipSettings>,
    color_calls: Vec<ColorSettings>,
    switch_calls: Vec<u32>,
    reset_flip_calls: usize,
    reset_color_calls: usize,
    identity_fetches: usize,
    status_fetches: usize,
    video_connects: Vec<u64>,

    detection_results: Scripted<Result<ApplyResponse, HttpClientError>>,
    flip_results: Scripted<Result<ApplyResponse, HttpClientError>>,
    color_results: Scripted<Result<ApplyResponse, HttpClientError>>,
    reset_flip_results: Scripted<Result<ApplyResponse, HttpClientError>>,
    reset_color_results: Scripted<Result<ApplyResponse, HttpClientError>>,
    switch_results: Scripted<Result<SwitchResponse, HttpClientError>>,
    current_results: Scripted<Result<CurrentCameraResponse, HttpClientError>>,
    video_scripts: Scripted<VideoScript>,

    current_camera: CurrentCameraResponse,
    status: SystemStatus,
    status_reachable: bool,

    detection_delay: Duration,
    flip_delay: Duration,
    color_delay: Duration,
    switch_delay: Duration,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            detection_calls: Vec::new(),
            flip_calls: Vec::new(),
            color_calls: Vec::new(),
            switch_calls: Vec::new(),
            reset_flip_calls: 0,
            reset_color_calls: 0,
            identity_fetches: 0,
            status_fetches: 0,
            video_connects: Vec::new(),
            detection_results: Scripted::default(),
            flip_results: Scripted::default(),
            color_results: Scripted::default(),
            reset_flip_results: Scripted::default(),
            reset_color_results: Scripted::default(),
            switch_results: Scripted::default(),
            current_results: Scripted::default(),
            video_scripts: Scripted::default(),
            current_camera: CurrentCameraResponse {
                success: true,
                camera_index: Some(0),
                camera_name: Some("Camera 0".to_string()),
                is_running: Some(true),
                error: None,
            },
            status: SystemStatus {
                camera_connected: true,
                streaming: true,
                camera_index: 0,
                os_type: "linux".to_string(),
                last_checked: String::new(),
                available_cameras: Vec::new(),
                current_fps: None,
            },
            status_reachable: true,
            detection_delay: Duration::ZERO,
            flip_delay: Duration::ZERO,
            color_delay: Duration::ZERO,
            switch_delay: Duration::ZERO,
        }
    }
}

/// Mock implementation of [`CameraApi`].
#[derive(Default)]
pub struct MockCameraApi {
    state: Mutex<MockState>,
}

impl MockCameraApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn ok_apply(message: &str) -> ApplyResponse {
        ApplyResponse {
            success: true,
            message: Some(message.to_string()),
            error: None,
        }
    }

    /// Acknowledgement body with `success: false`, as the server sends on
    /// rejected settings.
    pub fn rejected_apply(message: &str) -> ApplyResponse {
        ApplyResponse {
            success: false,
            message: Some(message.to_string()),
            error: None,
        }
    }

    // --- scripting ---

    pub fn script_detection(&self, result: Result<ApplyResponse, HttpClientError>) {
        self.state.lock().unwrap().detection_results.push(result);
    }

    pub fn script_flip(&self, result: Result<ApplyResponse, HttpClientError>) {
        self.state.lock().unwrap().flip_results.push(result);
    }

    pub fn script_color(&self, result: Result<ApplyResponse, HttpClientError>) {
        self.state.lock().unwrap().color_results.push(result);
    }

    pub fn script_reset_flip(&self, result: Result<ApplyResponse, HttpClientError>) {
        self.state.lock().unwrap().reset_flip_results.push(result);
    }

    pub fn script_reset_color(&self, result: Result<ApplyResponse, HttpClientError>) {
        self.state.lock().unwrap().reset_color_results.push(result);
    }

    pub fn script_switch(&self, result: Result<SwitchResponse, HttpClientError>) {
        self.state.lock().unwrap().switch_results.push(result);
    }

    pub fn script_current_camera(&self, result: Result<CurrentCameraResponse, HttpClientError>) {
        self.state.lock().unwrap().current_results.push(result);
    }

    /// Queue the behavior of the next video connection attempt. Unscripted
    /// attempts behave as `FramesThenHold { count: 1 }` (a healthy stream).
    pub fn script_video(&self, script: VideoScript) {
        self.state.lock().unwrap().video_scripts.push(script);
    }

    /// Set the identity returned by unscripted `/get_current_camera` fetches.
    pub fn set_current_camera(&self, index: u32, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.current_camera = CurrentCameraResponse {
            success: true,
            camera_index: Some(index),
            camera_name: Some(name.to_string()),
            is_running: Some(true),
            error: None,
        };
    }

    /// Make unscripted `/status` fetches succeed or fail from now on.
    pub fn set_status_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().status_reachable = reachable;
    }

    pub fn set_current_fps(&self, fps: f64) {
        self.state.lock().unwrap().status.current_fps = Some(fps);
    }

    pub fn set_detection_delay(&self, delay: Duration) {
        self.state.lock().unwrap().detection_delay = delay;
    }

    pub fn set_flip_delay(&self, delay: Duration) {
        self.state.lock().unwrap().flip_delay = delay;
    }

    pub fn set_color_delay(&self, delay: Duration) {
        self.state.lock().unwrap().color_delay = delay;
    }

    pub fn set_switch_delay(&self, delay: Duration) {
        self.state.lock().unwrap().switch_delay = delay;
    }

    // --- recorded calls ---

    pub fn detection_calls(&self) -> Vec<DetectionSettings> {
        self.state.lock().unwrap().detection_calls.clone()
    }

    pub fn flip_calls(&self) -> Vec<FlipSettings> {
        self.state.lock().unwrap().flip_calls.clone()
    }

    pub fn color_calls(&self) -> Vec<ColorSettings> {
        self.state.lock().unwrap().color_calls.clone()
    }

    pub fn switch_calls(&self) -> Vec<u32> {
        self.state.lock().unwrap().switch_calls.clone()
    }

    pub fn reset_flip_calls(&self) -> usize {
        self.state.lock().unwrap().reset_flip_calls
    }

    pub fn reset_color_calls(&self) -> usize {
        self.state.lock().unwrap().reset_color_calls
    }

    pub fn identity_fetches(&self) -> usize {
        self.state.lock().unwrap().identity_fetches
    }

    pub fn status_fetches(&self) -> usize {
        self.state.lock().unwrap().status_fetches
    }

    /// `t` parameters of every video connection attempt, in order.
    pub fn video_connects(&self) -> Vec<u64> {
        self.state.lock().unwrap().video_connects.clone()
    }
}

/// A minimal JPEG body (SOI, filler, EOI) wrapped in an MJPEG part the way
/// the camera server frames it.
pub fn mjpeg_part() -> Bytes {
    let jpeg: &[u8] = &[0xFF, 0xD8, 0x00, 0x11, 0x22, 0x33, 0xFF, 0xD9];
    let mut part = Vec::new();
    part.extend_from_slice(b"--frame\r\n");
    part.extend_from_slice(b"Content-Type: image/jpeg\r\n");
    part.extend_from_slice(format!("Content-Length: {}\r\n\r\n", jpeg.len()).as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

#[async_trait]
impl CameraApi for MockCameraApi {
    async fn apply_detection(
        &self,
        settings: &DetectionSettings,
    ) -> Result<ApplyResponse, HttpClientError> {
        let (delay, result) = {
            let mut state = self.state.lock().unwrap();
            state.detection_calls.push(settings.clone());
            let result = state
                .detection_results
                .next()
                .unwrap_or_else(|| Ok(Self::ok_apply("detection settings saved")));
            (state.detection_delay, result)
        };
        tokio::time::sleep(delay).await;
        result
    }

    async fn apply_flip(&self, settings: &FlipSettings) -> Result<ApplyResponse, HttpClientError> {
        let (delay, result) = {
            let mut state = self.state.lock().unwrap();
            state.flip_calls.push(settings.clone());
            let result = state
                .flip_results
                .next()
                .unwrap_or_else(|| Ok(Self::ok_apply("flip settings saved")));
            (state.flip_delay, result)
        };
        tokio::time::sleep(delay).await;
        result
    }

    async fn apply_color(
        &self,
        settings: &ColorSettings,
    ) -> Result<ApplyResponse, HttpClientError> {
        let (delay, result) = {
            let mut state = self.state.lock().unwrap();
            state.color_calls.push(settings.clone());
            let result = state
                .color_results
                .next()
                .unwrap_or_else(|| Ok(Self::ok_apply("color settings saved")));
            (state.color_delay, result)
        };
        tokio::time::sleep(delay).await;
        result
    }

    async fn reset_flip(&self) -> Result<ApplyResponse, HttpClientError> {
        let mut state = self.state.lock().unwrap();
        state.reset_flip_calls += 1;
        state
            .reset_flip_results
            .next()
            .unwrap_or_else(|| Ok(Self::ok_apply("flip settings reset")))
    }

    async fn reset_color(&self) -> Result<ApplyResponse, HttpClientError> {
        let mut state = self.state.lock().unwrap();
        state.reset_color_calls += 1;
        state
            .reset_color_results
            .next()
            .unwrap_or_else(|| Ok(Self::ok_apply("color settings reset")))
    }

    async fn switch_camera(&self, index: u32) -> Result<SwitchResponse, HttpClientError> {
        let (delay, result) = {
            let mut state = self.state.lock().unwrap();
            state.switch_calls.push(index);
            let result = state.switch_results.next().unwrap_or_else(|| {
                Ok(SwitchResponse {
                    success: true,
                    camera_index: Some(index),
                    camera_name: Some(format!("Camera {index}")),
                    message: Some(format!("switched to camera {index}")),
                    error: None,
                })
            });
            (state.switch_delay, result)
        };
        tokio::time::sleep(delay).await;
        result
    }

    async fn current_camera(&self) -> Result<CurrentCameraResponse, HttpClientError> {
        let mut state = self.state.lock().unwrap();
        state.identity_fetches += 1;
        state
            .current_results
            .next()
            .unwrap_or_else(|| Ok(state.current_camera.clone()))
    }

    async fn system_status(&self) -> Result<SystemStatus, HttpClientError> {
        let mut state = self.state.lock().unwrap();
        state.status_fetches += 1;
        if state.status_reachable {
            Ok(state.status.clone())
        } else {
            Err(HttpClientError::Connection("status probe refused".to_string()))
        }
    }

    async fn open_video(&self, t: u64) -> Result<VideoStream, HttpClientError> {
        let script = {
            let mut state = self.state.lock().unwrap();
            state.video_connects.push(t);
            state
                .video_scripts
                .next()
                .unwrap_or(VideoScript::FramesThenHold { count: 1 })
        };

        match script {
            VideoScript::ConnectError => {
                Err(HttpClientError::Connection("video feed refused".to_string()))
            }
            VideoScript::Frames { count } => {
                let parts: Vec<_> = (0..count).map(|_| Ok(mjpeg_part())).collect();
                Ok(stream::iter(parts).boxed())
            }
            VideoScript::FramesThenHold { count } => {
                let parts: Vec<_> = (0..count).map(|_| Ok(mjpeg_part())).collect();
                Ok(stream::iter(parts).chain(stream::pending()).boxed())
            }
            VideoScript::Hang => Ok(stream::pending().boxed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls_and_scripts_results() {
        let api = MockCameraApi::new();
        api.script_detection(Err(HttpClientError::Timeout));

        let first = api.apply_detection(&DetectionSettings::default()).await;
        assert!(matches!(first, Err(HttpClientError::Timeout)));

        let second = api.apply_detection(&DetectionSettings::default()).await;
        assert!(second.unwrap().success);

        assert_eq!(api.detection_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_video_scripts() {
        let api = MockCameraApi::new();
        api.script_video(VideoScript::ConnectError);
        assert!(api.open_video(1).await.is_err());

        api.script_video(VideoScript::Frames { count: 2 });
        let mut stream = api.open_video(2).await.unwrap();
        let mut chunks = 0;
        while let Some(chunk) = stream.next().await {
            chunk.unwrap();
            chunks += 1;
        }
        assert_eq!(chunks, 2);
        assert_eq!(api.video_connects(), vec![1, 2]);
    }
}
