// The drawing engine as the application loop sees it: strokes, buttons,
// current brush and an event queue for side effects the engine itself does
// not perform (saving, sound, UI feedback).

use crate::button::{Button, ButtonAction, ControlSurface};
use crate::config::Config;
use crate::gesture::FingerRole;
use crate::stroke::{FaceFollowMode, Segment, StrokeEngine};
use crate::types::{FaceDetection, FrameBuffer, Point, Rgb};
use log::info;

/// Something the application loop may want to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    ButtonPressed(String),
    ColorChanged(String),
    ThicknessChanged(u32),
    ModeChanged(FaceFollowMode),
    Cleared,
    SaveRequested,
    UiToggled(bool),
}

pub struct Engine {
    strokes: StrokeEngine,
    surface: ControlSurface,
    palette: Vec<(String, Rgb)>,
    color: Rgb,
    thickness: u32,
    events: Vec<EngineEvent>,
}

impl Engine {
    pub fn new(config: &Config, width: usize, height: usize) -> Self {
        Self {
            strokes: StrokeEngine::new(width, height),
            surface: ControlSurface::with_default_layout(config, width),
            palette: config.palette.iter().map(|c| (c.name.clone(), c.rgb)).collect(),
            color: config.default_rgb(),
            thickness: config.default_thickness,
            events: Vec::new(),
        }
    }

    /// Feed one fingertip. Returns whether the input did anything.
    pub fn process_finger_input(&mut self, point: Point, role: FingerRole) -> bool {
        match role {
            FingerRole::Ui => {
                let Some(button) = self.surface.press(point) else {
                    return false;
                };
                let (label, action) = (button.label.clone(), button.action.clone());
                info!("Button pressed: {label}");
                self.events.push(EngineEvent::ButtonPressed(label));
                self.dispatch(action);
                true
            }
            FingerRole::Draw => {
                if self.strokes.is_drawing() {
                    self.strokes.continue_stroke(point);
                } else {
                    self.strokes.start(point, self.color, self.thickness);
                }
                true
            }
        }
    }

    fn dispatch(&mut self, action: ButtonAction) {
        match action {
            ButtonAction::Reset => self.clear(),
            ButtonAction::SetColor { name, rgb } => {
                self.color = rgb;
                info!("Color changed to {name}");
                self.events.push(EngineEvent::ColorChanged(name));
            }
            ButtonAction::SetThickness { name, value } => {
                self.thickness = value;
                info!("Line thickness changed to {value} ({name})");
                self.events.push(EngineEvent::ThicknessChanged(value));
            }
            ButtonAction::Save => self.events.push(EngineEvent::SaveRequested),
        }
    }

    pub fn stop_drawing(&mut self, end_point: Option<Point>) {
        if let Some(end) = self.strokes.stop(end_point) {
            if let Some(mode) = end.mode_change {
                self.events.push(EngineEvent::ModeChanged(mode));
            }
        }
    }

    pub fn update_faces(&mut self, faces: &[FaceDetection]) {
        self.strokes.update_faces(faces);
    }

    pub fn apply_face_movement(&mut self, center: Point) {
        self.strokes.apply_face_movement(center);
    }

    pub fn render(&mut self) -> &FrameBuffer {
        self.strokes.render()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        info!("Canvas cleared");
        self.events.push(EngineEvent::Cleared);
    }

    pub fn toggle_ui(&mut self) {
        let visible = !self.surface.is_visible();
        self.surface.set_visible(visible);
        info!("UI visibility: {}", if visible { "shown" } else { "hidden" });
        self.events.push(EngineEvent::UiToggled(visible));
    }

    /// Once per frame, after all input for the frame.
    pub fn end_frame(&mut self) {
        self.surface.end_frame();
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Palette name of the current color, if it has one.
    pub fn color_name(&self) -> Option<&str> {
        self.palette.iter().find(|(_, rgb)| *rgb == self.color).map(|(name, _)| name.as_str())
    }

    pub fn thickness(&self) -> u32 {
        self.thickness
    }

    pub fn mode(&self) -> FaceFollowMode {
        self.strokes.mode()
    }

    pub fn ui_visible(&self) -> bool {
        self.surface.is_visible()
    }

    pub fn is_drawing(&self) -> bool {
        self.strokes.is_drawing()
    }

    pub fn segment_count(&self) -> usize {
        self.strokes.segment_count()
    }

    pub fn segments(&self) -> &[Segment] {
        self.strokes.segments()
    }

    pub fn buttons(&self) -> &[Button] {
        self.surface.buttons()
    }

    pub fn canvas(&self) -> &FrameBuffer {
        self.strokes.canvas()
    }
}
