//! Events feeding the engine and updates flowing back out of it.
//!
//! The engine is a single task that owns all mutable state; everything that
//! happens — user edits, completed requests, poll results, stream signals —
//! arrives as an [`Event`] on one channel, and everything the front end
//! needs to render leaves as an [`Update`] on another.

use cam_console_shared::{
    CameraIdentity, CurrentCameraResponse, SwitchResponse, SystemStatus,
};

use crate::controls::{ControlEdit, ControlValues, FlipPreset, SettingsGroup};
use crate::error::DispatchError;
use crate::watchdog::StreamPhase;

/// Acknowledgement carried by a successful settings dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Server-provided message, when the response body had one.
    pub message: Option<String>,
}

/// Signals from the stream reader task, tagged with the cache-busting token
/// of the attempt they belong to so stale reports are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSignal {
    /// The current attempt produced at least one complete frame.
    Opened { t: u64 },
    /// The current attempt failed to connect or the stream ended.
    Failed { t: u64 },
}

/// Everything the engine reacts to.
#[derive(Debug)]
pub enum Event {
    /// A control changed in the front end.
    Edit(ControlEdit),
    /// Flush all pending debounce windows and dispatch now.
    ApplyNow,
    /// Set the whole flip group from a preset.
    SetFlipPreset(FlipPreset),
    /// Request a switch to another camera.
    SwitchCamera { index: u32 },
    /// Return flip settings to server defaults.
    ResetFlip,
    /// Return color settings to server defaults.
    ResetColor,
    /// User asked for a stream reload regardless of backoff.
    RefreshStream,
    /// A settings dispatch for `group` finished.
    DispatchResolved {
        group: SettingsGroup,
        outcome: Result<Confirmation, DispatchError>,
    },
    /// A camera switch request finished.
    SwitchResolved {
        requested: u32,
        outcome: Result<SwitchResponse, DispatchError>,
    },
    /// A reset request finished. Only ever carries `Flip` or `Color`.
    ResetResolved {
        group: SettingsGroup,
        outcome: Result<Confirmation, DispatchError>,
    },
    /// Report from the stream reader.
    Stream(StreamSignal),
    /// The identity poll returned.
    IdentityFetched(Result<CurrentCameraResponse, DispatchError>),
    /// The status poll returned.
    StatusFetched(Result<SystemStatus, DispatchError>),
    /// Stop the engine.
    Shutdown,
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// State the front end renders.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// A transient message for the user.
    Notice { kind: NoticeKind, text: String },
    /// The server-confirmed active camera changed.
    ActiveCamera(CameraIdentity),
    /// Control values changed outside a plain edit (preset or reset).
    Controls(ControlValues),
    /// The video element should load this URL.
    StreamTarget { url: String },
    /// Stream health changed.
    StreamHealth(StreamPhase),
    /// Fresh system status from the probe.
    Status(SystemStatus),
}
