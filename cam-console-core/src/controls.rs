//! Control-surface model: every adjustable value the console exposes, the
//! settings group each belongs to, and the debounce cadence of each control.

use cam_console_shared::{ColorMode, ColorSettings, DetectionSettings, FlipSettings};

/// The three independently-dispatched settings groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsGroup {
    Detection,
    Flip,
    Color,
}

impl SettingsGroup {
    pub const ALL: [SettingsGroup; 3] = [
        SettingsGroup::Detection,
        SettingsGroup::Flip,
        SettingsGroup::Color,
    ];

    /// Human-readable name for notices and logs.
    pub fn name(&self) -> &'static str {
        match self {
            SettingsGroup::Detection => "detection",
            SettingsGroup::Flip => "flip",
            SettingsGroup::Color => "color",
        }
    }
}

/// How long an edit should sit in the debounce queue before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Dispatch on the next deadline pass with no added delay.
    Immediate,
    /// Slider-style controls that fire many edits while dragged.
    Continuous,
    /// Numeric steppers that change in coarse increments.
    Discrete,
}

/// Image rotation in 90-degree steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn from_degrees(deg: u16) -> Option<Rotation> {
        match deg {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }
}

/// One-shot flip arrangements that set all three flip fields at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipPreset {
    Normal,
    Horizontal,
    Vertical,
    Both,
    Rotate180,
}

impl FlipPreset {
    /// The (horizontal, vertical, rotation) triple the preset stands for.
    pub fn fields(&self) -> (bool, bool, Rotation) {
        match self {
            FlipPreset::Normal => (false, false, Rotation::Deg0),
            FlipPreset::Horizontal => (true, false, Rotation::Deg0),
            FlipPreset::Vertical => (false, true, Rotation::Deg0),
            FlipPreset::Both => (true, true, Rotation::Deg0),
            FlipPreset::Rotate180 => (false, false, Rotation::Deg180),
        }
    }
}

/// A single control change from the front end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEdit {
    YoloEnabled(bool),
    OpencvEnabled(bool),
    ShowFps(bool),
    Quality(u8),
    FpsLimit(u32),
    FlipHorizontal(bool),
    FlipVertical(bool),
    RotationDeg(Rotation),
    ColorEnabled(bool),
    RedReduction(f64),
    GreenBoost(f64),
    BlueBoost(f64),
    Mode(ColorMode),
}

impl ControlEdit {
    /// The settings group this edit mutates.
    pub fn group(&self) -> SettingsGroup {
        match self {
            ControlEdit::YoloEnabled(_)
            | ControlEdit::OpencvEnabled(_)
            | ControlEdit::ShowFps(_)
            | ControlEdit::Quality(_)
            | ControlEdit::FpsLimit(_) => SettingsGroup::Detection,
            ControlEdit::FlipHorizontal(_)
            | ControlEdit::FlipVertical(_)
            | ControlEdit::RotationDeg(_) => SettingsGroup::Flip,
            ControlEdit::ColorEnabled(_)
            | ControlEdit::RedReduction(_)
            | ControlEdit::GreenBoost(_)
            | ControlEdit::BlueBoost(_)
            | ControlEdit::Mode(_) => SettingsGroup::Color,
        }
    }

    /// Debounce cadence. Toggles and selectors go out immediately, sliders
    /// wait for the drag to settle, steppers wait a little longer.
    pub fn cadence(&self) -> Cadence {
        match self {
            ControlEdit::YoloEnabled(_)
            | ControlEdit::OpencvEnabled(_)
            | ControlEdit::ShowFps(_)
            | ControlEdit::FlipHorizontal(_)
            | ControlEdit::FlipVertical(_)
            | ControlEdit::RotationDeg(_)
            | ControlEdit::ColorEnabled(_)
            | ControlEdit::Mode(_) => Cadence::Immediate,
            ControlEdit::RedReduction(_)
            | ControlEdit::GreenBoost(_)
            | ControlEdit::BlueBoost(_) => Cadence::Continuous,
            ControlEdit::Quality(_) | ControlEdit::FpsLimit(_) => Cadence::Discrete,
        }
    }
}

/// The full set of current control values. Edits land here the moment they
/// arrive; dispatch snapshots whatever is here when the request goes out, so
/// a request always carries the freshest values for its group.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlValues {
    pub detection: DetectionSettings,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub rotation: Rotation,
    pub color: ColorSettings,
}

impl Default for ControlValues {
    fn default() -> Self {
        ControlValues {
            detection: DetectionSettings::default(),
            flip_horizontal: false,
            flip_vertical: false,
            rotation: Rotation::Deg0,
            color: ColorSettings::default(),
        }
    }
}

impl ControlValues {
    /// Fold an edit into the current values.
    pub fn apply(&mut self, edit: ControlEdit) {
        match edit {
            ControlEdit::YoloEnabled(v) => self.detection.yolo_enabled = v,
            ControlEdit::OpencvEnabled(v) => self.detection.opencv_enabled = v,
            ControlEdit::ShowFps(v) => self.detection.show_fps = v,
            ControlEdit::Quality(v) => self.detection.quality = v,
            ControlEdit::FpsLimit(v) => self.detection.fps_limit = v,
            ControlEdit::FlipHorizontal(v) => self.flip_horizontal = v,
            ControlEdit::FlipVertical(v) => self.flip_vertical = v,
            ControlEdit::RotationDeg(v) => self.rotation = v,
            ControlEdit::ColorEnabled(v) => self.color.enabled = v,
            ControlEdit::RedReduction(v) => self.color.red_reduction = v,
            ControlEdit::GreenBoost(v) => self.color.green_boost = v,
            ControlEdit::BlueBoost(v) => self.color.blue_boost = v,
            ControlEdit::Mode(v) => self.color.mode = v,
        }
    }

    /// Set the flip fields from a preset.
    pub fn apply_preset(&mut self, preset: FlipPreset) {
        let (h, v, r) = preset.fields();
        self.flip_horizontal = h;
        self.flip_vertical = v;
        self.rotation = r;
    }

    /// Snapshot of the detection payload.
    pub fn detection(&self) -> DetectionSettings {
        self.detection.clone()
    }

    /// Snapshot of the flip payload.
    pub fn flip(&self) -> FlipSettings {
        FlipSettings {
            horizontal: self.flip_horizontal,
            vertical: self.flip_vertical,
            rotation: self.rotation.degrees(),
        }
    }

    /// Snapshot of the color payload.
    pub fn color(&self) -> ColorSettings {
        self.color.clone()
    }

    /// Return the flip group to its defaults, as the server does on reset.
    pub fn reset_flip(&mut self) {
        self.flip_horizontal = false;
        self.flip_vertical = false;
        self.rotation = Rotation::Deg0;
    }

    /// Return the color group to its defaults.
    pub fn reset_color(&mut self) {
        self.color = ColorSettings::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_routes_to_its_group() {
        assert_eq!(
            ControlEdit::Quality(60).group(),
            SettingsGroup::Detection
        );
        assert_eq!(
            ControlEdit::RotationDeg(Rotation::Deg90).group(),
            SettingsGroup::Flip
        );
        assert_eq!(
            ControlEdit::RedReduction(0.5).group(),
            SettingsGroup::Color
        );
    }

    #[test]
    fn test_cadence_split() {
        assert_eq!(ControlEdit::YoloEnabled(false).cadence(), Cadence::Immediate);
        assert_eq!(ControlEdit::GreenBoost(1.2).cadence(), Cadence::Continuous);
        assert_eq!(ControlEdit::Quality(40).cadence(), Cadence::Discrete);
        assert_eq!(ControlEdit::FpsLimit(10).cadence(), Cadence::Discrete);
    }

    #[test]
    fn test_apply_and_snapshot() {
        let mut values = ControlValues::default();
        values.apply(ControlEdit::Quality(55));
        values.apply(ControlEdit::FlipHorizontal(true));
        values.apply(ControlEdit::RotationDeg(Rotation::Deg270));

        assert_eq!(values.detection().quality, 55);
        let flip = values.flip();
        assert!(flip.horizontal);
        assert!(!flip.vertical);
        assert_eq!(flip.rotation, 270);
    }

    #[test]
    fn test_preset_sets_all_three_fields() {
        let mut values = ControlValues::default();
        values.apply(ControlEdit::FlipHorizontal(true));
        values.apply_preset(FlipPreset::Rotate180);

        assert!(!values.flip_horizontal);
        assert!(!values.flip_vertical);
        assert_eq!(values.rotation, Rotation::Deg180);
    }

    #[test]
    fn test_reset_returns_group_defaults() {
        let mut values = ControlValues::default();
        values.apply(ControlEdit::ColorEnabled(true));
        values.apply(ControlEdit::RedReduction(0.4));
        values.reset_color();

        assert_eq!(values.color(), ColorSettings::default());
    }

    #[test]
    fn test_rotation_degree_mapping() {
        assert_eq!(Rotation::from_degrees(180), Some(Rotation::Deg180));
        assert_eq!(Rotation::from_degrees(45), None);
        assert_eq!(Rotation::Deg270.degrees(), 270);
    }
}
