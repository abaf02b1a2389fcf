//! Shared wire types for the camera console.
//!
//! This crate contains the serialization types for the camera server's HTTP
//! API, the generic [`http_client::HttpClient`] they travel through, and the
//! [`camera_api::CameraApi`] trait that the engine consumes. All request and
//! response shapes match the camera server's JSON contract field for field.

use serde::{Deserialize, Serialize};

pub mod camera_api;
pub mod http_client;

pub use camera_api::{CameraApi, CameraServerClient, VideoStream};
pub use http_client::{HttpClient, HttpClientError};

/// Detection settings payload for POST /update_detection_settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Whether YOLO object detection runs on the stream
    pub yolo_enabled: bool,
    /// Whether the OpenCV cascade detector runs on the stream
    pub opencv_enabled: bool,
    /// Whether the FPS overlay is drawn on frames
    pub show_fps: bool,
    /// JPEG encode quality, 1-100
    pub quality: u8,
    /// Upper bound on streamed frames per second
    pub fps_limit: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            yolo_enabled: true,
            opencv_enabled: true,
            show_fps: true,
            quality: 85,
            fps_limit: 30,
        }
    }
}

/// Flip/rotation settings payload for POST /update_flip_settings.
///
/// `rotation` is constrained to 0/90/180/270 by the engine before it reaches
/// the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FlipSettings {
    /// Mirror the image horizontally
    pub horizontal: bool,
    /// Mirror the image vertically
    pub vertical: bool,
    /// Clockwise rotation in degrees
    pub rotation: u16,
}

/// Color correction preset selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Standard,
    Warm,
    Cool,
    Night,
}

impl ColorMode {
    /// Wire name of the mode, as sent in the JSON body.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Standard => "standard",
            ColorMode::Warm => "warm",
            ColorMode::Cool => "cool",
            ColorMode::Night => "night",
        }
    }
}

/// Color correction settings payload for POST /update_color_settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSettings {
    /// Whether color correction is applied at all
    pub enabled: bool,
    /// Red channel attenuation factor
    pub red_reduction: f64,
    /// Green channel gain factor
    pub green_boost: f64,
    /// Blue channel gain factor
    pub blue_boost: f64,
    /// Named correction preset
    pub mode: ColorMode,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            red_reduction: 1.0,
            green_boost: 1.0,
            blue_boost: 1.0,
            mode: ColorMode::Standard,
        }
    }
}

/// Generic acknowledgement body returned by the settings and reset endpoints.
///
/// The server reports failures either as `message` or as `error` depending on
/// the route, so both are optional here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub success: bool,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplyResponse {
    /// Best-effort human-readable text from the body, regardless of which
    /// field the server used.
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

/// Request body for POST /switch_camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchRequest {
    pub camera_index: u32,
}

/// Response body for POST /switch_camera.
///
/// On success the server echoes the authoritative index and display name;
/// on failure only `success` plus a message/error is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchResponse {
    pub success: bool,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_index: Option<u32>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_name: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SwitchResponse {
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

/// Response body for GET /get_current_camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentCameraResponse {
    pub success: bool,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_index: Option<u32>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_name: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One detected camera in `SystemStatus::available_cameras`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableCamera {
    pub index: u32,
    pub name: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_read: Option<bool>,
}

/// Response body for GET /status, the lightweight liveness probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub camera_connected: bool,
    pub streaming: bool,
    pub camera_index: u32,
    pub os_type: String,
    pub last_checked: String,
    #[serde(default)]
    pub available_cameras: Vec<AvailableCamera>,
    /// Measured stream rate, present on servers that report it
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_fps: Option<f64>,
}

/// The one camera the client currently treats as active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraIdentity {
    pub index: u32,
    pub name: String,
}

impl CameraIdentity {
    /// Build an identity from a possibly partial server response, falling
    /// back to a generic display name when the server omits one.
    pub fn from_parts(index: u32, name: Option<String>) -> Self {
        Self {
            name: name.unwrap_or_else(|| format!("Camera {index}")),
            index,
        }
    }
}

impl std::fmt::Display for CameraIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.index, self.name)
    }
}
