//! Camera server API surface.
//!
//! [`CameraApi`] is the seam between the engine and the network: the engine
//! only ever talks to this trait, backed by [`CameraServerClient`] in
//! production and [`mock::MockCameraApi`] in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::http_client::{HttpClient, HttpClientError};
use crate::{
    ApplyResponse, ColorSettings, CurrentCameraResponse, DetectionSettings, FlipSettings,
    SwitchRequest, SwitchResponse, SystemStatus,
};

pub mod mock;

/// Raw byte stream of a live video connection.
pub type VideoStream = BoxStream<'static, Result<Bytes, HttpClientError>>;

/// Everything the engine needs from the camera server.
#[async_trait]
pub trait CameraApi: Send + Sync {
    /// Apply detection settings (POST /update_detection_settings).
    async fn apply_detection(
        &self,
        settings: &DetectionSettings,
    ) -> Result<ApplyResponse, HttpClientError>;

    /// Apply flip/rotation settings (POST /update_flip_settings).
    async fn apply_flip(&self, settings: &FlipSettings) -> Result<ApplyResponse, HttpClientError>;

    /// Apply color correction settings (POST /update_color_settings).
    async fn apply_color(&self, settings: &ColorSettings)
        -> Result<ApplyResponse, HttpClientError>;

    /// Reset flip settings to server defaults (POST /reset_flip_settings).
    async fn reset_flip(&self) -> Result<ApplyResponse, HttpClientError>;

    /// Reset color settings to server defaults (POST /reset_color_settings).
    async fn reset_color(&self) -> Result<ApplyResponse, HttpClientError>;

    /// Switch the active camera (POST /switch_camera).
    async fn switch_camera(&self, index: u32) -> Result<SwitchResponse, HttpClientError>;

    /// Fetch the authoritative active camera (GET /get_current_camera).
    async fn current_camera(&self) -> Result<CurrentCameraResponse, HttpClientError>;

    /// Fetch the liveness/status probe (GET /status).
    async fn system_status(&self) -> Result<SystemStatus, HttpClientError>;

    /// Open the live video feed with the given cache-busting parameter
    /// (GET /video_feed?t=...).
    async fn open_video(&self, t: u64) -> Result<VideoStream, HttpClientError>;
}

/// HTTP client for the camera server.
#[derive(Debug, Clone)]
pub struct CameraServerClient {
    http: HttpClient,
}

impl CameraServerClient {
    /// Create a client pointing at the given base URL, e.g.
    /// `http://localhost:5000`.
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Self {
        Self {
            http: HttpClient::new(base_url, timeout),
        }
    }

    /// Base URL this client is configured for.
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// URL of the video feed without a cache-busting parameter.
    pub fn video_url(&self) -> String {
        format!("{}/video_feed", self.http.base_url())
    }

    /// Cache-busted video feed URL for the given `t`.
    pub fn video_url_with_t(&self, t: u64) -> String {
        format!("{}/video_feed?t={}", self.http.base_url(), t)
    }
}

#[async_trait]
impl CameraApi for CameraServerClient {
    async fn apply_detection(
        &self,
        settings: &DetectionSettings,
    ) -> Result<ApplyResponse, HttpClientError> {
        self.http.post("/update_detection_settings", settings).await
    }

    async fn apply_flip(&self, settings: &FlipSettings) -> Result<ApplyResponse, HttpClientError> {
        self.http.post("/update_flip_settings", settings).await
    }

    async fn apply_color(
        &self,
        settings: &ColorSettings,
    ) -> Result<ApplyResponse, HttpClientError> {
        self.http.post("/update_color_settings", settings).await
    }

    async fn reset_flip(&self) -> Result<ApplyResponse, HttpClientError> {
        self.http.post_empty("/reset_flip_settings").await
    }

    async fn reset_color(&self) -> Result<ApplyResponse, HttpClientError> {
        self.http.post_empty("/reset_color_settings").await
    }

    async fn switch_camera(&self, index: u32) -> Result<SwitchResponse, HttpClientError> {
        self.http
            .post("/switch_camera", &SwitchRequest { camera_index: index })
            .await
    }

    async fn current_camera(&self) -> Result<CurrentCameraResponse, HttpClientError> {
        self.http.get("/get_current_camera").await
    }

    async fn system_status(&self) -> Result<SystemStatus, HttpClientError> {
        self.http.get("/status").await
    }

    async fn open_video(&self, t: u64) -> Result<VideoStream, HttpClientError> {
        self.http.get_stream(&format!("/video_feed?t={t}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_url_construction() {
        let client = CameraServerClient::new("http://localhost:5000", Duration::from_secs(10));
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.video_url(), "http://localhost:5000/video_feed");
        assert_eq!(
            client.video_url_with_t(1700000000123),
            "http://localhost:5000/video_feed?t=1700000000123"
        );
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = CameraServerClient::new("http://localhost:5000/", Duration::from_secs(10));
        assert_eq!(client.base_url(), "http://localhost:5000");
    }
}
