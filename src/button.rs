// On-screen buttons operated by a fingertip.
//
// Hit-testing is stateless apart from the per-button `is_pressed` flag, which
// only drives the pressed look. A frame-counted [`Cooldown`] keeps a finger
// resting on a button from firing it every frame.

use crate::config::Config;
use crate::types::{BoundingBox, Point, Rgb};

/// What a button does when it fires. Dispatched by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    Reset,
    SetColor { name: String, rgb: Rgb },
    SetThickness { name: String, value: u32 },
    Save,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub rect: BoundingBox,
    pub color: Rgb,
    pub label: String,
    pub action: ButtonAction,
    pub is_pressed: bool,
}

impl Button {
    pub fn new(rect: BoundingBox, color: Rgb, label: impl Into<String>, action: ButtonAction) -> Self {
        Self { rect, color, label: label.into(), action, is_pressed: false }
    }

    pub fn contains(&self, p: Point) -> bool {
        self.rect.contains(p)
    }
}

/// First button (in order) whose rectangle contains `point`, edges inclusive.
/// Buttons scanned before the hit are marked unpressed; the hit is marked pressed.
pub fn hit_test(buttons: &mut [Button], point: Point) -> Option<usize> {
    for (i, button) in buttons.iter_mut().enumerate() {
        if button.contains(point) {
            button.is_pressed = true;
            return Some(i);
        }
        button.is_pressed = false;
    }
    None
}

/// Frames remaining before another button may fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cooldown {
    remaining: u32,
    duration: u32,
}

impl Cooldown {
    pub const fn new(duration: u32) -> Self {
        Self { remaining: 0, duration }
    }

    pub const fn is_ready(&self) -> bool {
        self.remaining == 0
    }

    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn arm(&mut self) {
        self.remaining = self.duration;
    }

    /// Call exactly once per frame.
    pub fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// The button list plus its cooldown and visibility.
#[derive(Clone, Debug)]
pub struct ControlSurface {
    buttons: Vec<Button>,
    cooldown: Cooldown,
    visible: bool,
}

const SIDE_BUTTON_W: i32 = 100;
const SIDE_BUTTON_H: i32 = 40;
const LIST_BUTTON_W: i32 = 80;
const LIST_BUTTON_H: i32 = 30;
const LIST_SPACING: i32 = 40;

impl ControlSurface {
    pub fn new(buttons: Vec<Button>, cooldown_frames: u32, visible: bool) -> Self {
        Self { buttons, cooldown: Cooldown::new(cooldown_frames), visible }
    }

    /// Default layout for a canvas `width` pixels wide.
    ///
    /// Reset sits top-right. If the UI starts visible, the palette column,
    /// the thickness column and Save are added as well.
    pub fn with_default_layout(config: &Config, width: usize) -> Self {
        let right = width as i32 - SIDE_BUTTON_W - 10;
        let mut buttons = vec![Button::new(
            BoundingBox::new(right, 10, SIDE_BUTTON_W, SIDE_BUTTON_H),
            config.reset_button_color,
            "Reset",
            ButtonAction::Reset,
        )];

        if config.show_ui_by_default {
            for (i, c) in config.palette.iter().enumerate() {
                buttons.push(Button::new(
                    BoundingBox::new(10, 10 + i as i32 * LIST_SPACING, LIST_BUTTON_W, LIST_BUTTON_H),
                    c.rgb,
                    c.name.clone(),
                    ButtonAction::SetColor { name: c.name.clone(), rgb: c.rgb },
                ));
            }
            for (i, t) in config.thickness_presets.iter().enumerate() {
                buttons.push(Button::new(
                    BoundingBox::new(100, 10 + i as i32 * LIST_SPACING, LIST_BUTTON_W, LIST_BUTTON_H),
                    config.thickness_button_color,
                    t.name.clone(),
                    ButtonAction::SetThickness { name: t.name.clone(), value: t.value },
                ));
            }
            buttons.push(Button::new(
                BoundingBox::new(right, 60, SIDE_BUTTON_W, SIDE_BUTTON_H),
                config.save_button_color,
                "Save",
                ButtonAction::Save,
            ));
        }

        Self::new(buttons, config.button_cooldown_frames, config.show_ui_by_default)
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn cooldown(&self) -> Cooldown {
        self.cooldown
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Try to fire the button under `point`. At most one fires, and only
    /// while the surface is visible and the cooldown has run out.
    pub fn press(&mut self, point: Point) -> Option<&Button> {
        if !self.visible || !self.cooldown.is_ready() {
            return None;
        }
        let i = hit_test(&mut self.buttons, point)?;
        self.cooldown.arm();
        Some(&self.buttons[i])
    }

    /// Once per frame, whether or not anything was pressed.
    pub fn end_frame(&mut self) {
        self.cooldown.tick();
    }
}
