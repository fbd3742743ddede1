// Application settings.
//
// Every field has a built-in default, so a TOML file only needs the keys it
// wants to change:
//
// ```toml
// default_color = "Red"
// button_cooldown_frames = 12
//
// [[thickness_presets]]
// name = "Hairline"
// value = 1
// ```

use crate::error::{Error, Result};
use crate::types::Rgb;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Widest stroke a config may ask for, in pixels.
pub const MAX_LINE_THICKNESS: u32 = 64;

/// Which fingertip operates the on-screen buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiFinger {
    #[default]
    Middle,
    Pinky,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NamedColor {
    pub name: String,
    pub rgb: Rgb,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ThicknessPreset {
    pub name: String,
    pub value: u32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // Display
    pub window_title: String,
    pub window_width: usize,
    pub window_height: usize,
    pub show_fps: bool,

    // Camera
    pub camera_index: u32,
    pub capture_width: u32,
    pub capture_height: u32,
    pub mirror_camera: bool,

    // Perception
    pub detector_command: Vec<String>,
    pub max_hands: usize,
    pub hand_detection_confidence: f32,
    pub hand_tracking_confidence: f32,
    pub face_detection_confidence: f32,
    pub show_hand_landmarks: bool,
    pub show_face_boxes: bool,

    // Drawing
    pub default_color: String,
    pub default_thickness: u32,
    pub canvas_opacity: f32,
    pub camera_weight: f32,
    pub palette: Vec<NamedColor>,
    pub thickness_presets: Vec<ThicknessPreset>,

    // Buttons
    pub show_ui_by_default: bool,
    pub ui_finger: UiFinger,
    pub button_cooldown_frames: u32,
    pub reset_button_color: Rgb,
    pub thickness_button_color: Rgb,
    pub save_button_color: Rgb,

    // Saving
    pub save_directory: PathBuf,
    pub save_prefix: String,
}

fn named(name: &str, r: u8, g: u8, b: u8) -> NamedColor {
    NamedColor { name: name.to_string(), rgb: Rgb::new(r, g, b) }
}

fn preset(name: &str, value: u32) -> ThicknessPreset {
    ThicknessPreset { name: name.to_string(), value }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_title: "Paint LiveCam".to_string(),
            window_width: 860,
            window_height: 640,
            show_fps: true,

            camera_index: 0,
            capture_width: 640,
            capture_height: 480,
            mirror_camera: true,

            detector_command: vec!["python3".to_string(), "hand_face_detect.py".to_string()],
            max_hands: 1,
            hand_detection_confidence: 0.7,
            hand_tracking_confidence: 0.5,
            face_detection_confidence: 0.5,
            show_hand_landmarks: true,
            show_face_boxes: true,

            default_color: "Yellow".to_string(),
            default_thickness: 4,
            canvas_opacity: 1.0,
            camera_weight: 0.8,
            palette: vec![
                named("Yellow", 255, 255, 0),
                named("Blue", 0, 0, 255),
                named("Green", 0, 255, 0),
                named("Red", 255, 0, 0),
                named("Purple", 255, 0, 255),
                named("Orange", 255, 165, 0),
                named("White", 255, 255, 255),
                named("Black", 0, 0, 0),
            ],
            thickness_presets: vec![
                preset("Thin", 2),
                preset("Medium", 4),
                preset("Thick", 8),
                preset("Very Thick", 12),
            ],

            show_ui_by_default: true,
            ui_finger: UiFinger::Middle,
            button_cooldown_frames: 20,
            reset_button_color: Rgb::new(200, 50, 50),
            thickness_button_color: Rgb::new(150, 150, 150),
            save_button_color: Rgb::new(0, 200, 0),

            save_directory: PathBuf::from("saved_drawings"),
            save_prefix: "drawing".to_string(),
        }
    }
}

impl Config {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(Error::Config("window size must be non-zero".into()));
        }
        if self.palette.is_empty() {
            return Err(Error::Config("palette must contain at least one color".into()));
        }
        if self.thickness_presets.is_empty() {
            return Err(Error::Config("at least one thickness preset is required".into()));
        }
        if self.color_named(&self.default_color).is_none() {
            return Err(Error::Config(format!(
                "default color {:?} is not in the palette",
                self.default_color
            )));
        }
        let thicknesses = std::iter::once(self.default_thickness)
            .chain(self.thickness_presets.iter().map(|p| p.value));
        for t in thicknesses {
            if !(1..=MAX_LINE_THICKNESS).contains(&t) {
                return Err(Error::Config(format!(
                    "line thickness must be within [1, {MAX_LINE_THICKNESS}], got {t}"
                )));
            }
        }
        for (key, v) in [("canvas_opacity", self.canvas_opacity), ("camera_weight", self.camera_weight)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::Config(format!("{key} must be within [0, 1], got {v}")));
            }
        }
        if self.detector_command.is_empty() {
            return Err(Error::Config("detector_command must name a program".into()));
        }
        Ok(())
    }

    pub fn color_named(&self, name: &str) -> Option<Rgb> {
        self.palette.iter().find(|c| c.name == name).map(|c| c.rgb)
    }

    /// The configured default color; falls back to the first palette entry.
    pub fn default_rgb(&self) -> Rgb {
        self.color_named(&self.default_color)
            .or_else(|| self.palette.first().map(|c| c.rgb))
            .unwrap_or(Rgb::WHITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = Config::default();
        c.validate().unwrap();
        assert_eq!(c.default_rgb(), Rgb::new(255, 255, 0));
        assert_eq!(c.button_cooldown_frames, 20);
        assert_eq!(c.palette.len(), 8);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = Config::from_toml(
            r#"
            default_color = "Red"
            button_cooldown_frames = 5
            ui_finger = "pinky"
            save_directory = "out"
            "#,
        )
        .unwrap();
        assert_eq!(c.default_rgb(), Rgb::new(255, 0, 0));
        assert_eq!(c.button_cooldown_frames, 5);
        assert_eq!(c.ui_finger, UiFinger::Pinky);
        assert_eq!(c.save_directory, PathBuf::from("out"));
        assert_eq!(c.window_width, 860);
    }

    #[test]
    fn palette_override_replaces_whole_list() {
        let c = Config::from_toml(
            r#"
            default_color = "Teal"
            [[palette]]
            name = "Teal"
            rgb = [0, 128, 128]
            "#,
        )
        .unwrap();
        assert_eq!(c.palette.len(), 1);
        assert_eq!(c.default_rgb(), Rgb::new(0, 128, 128));
    }

    #[test]
    fn rejects_unknown_default_color() {
        let err = Config::from_toml(r#"default_color = "Mauve""#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_oversized_thickness() {
        let err = Config::from_toml("default_thickness = 3000000000").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_toml(
            r#"
            [[thickness_presets]]
            name = "Huge"
            value = 65
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let c = Config::from_toml("default_thickness = 64").unwrap();
        assert_eq!(c.default_thickness, MAX_LINE_THICKNESS);
    }

    #[test]
    fn rejects_out_of_range_opacity() {
        let err = Config::from_toml("canvas_opacity = 1.5").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(Config::from_toml("colour = 3"), Err(Error::Toml(_))));
    }
}
