// One frame tick: perception results in, engine updated.

use crate::config::UiFinger;
use crate::engine::Engine;
use crate::gesture::{FingerPositions, FingerRole};
use crate::perception::Perception;

/// Drive the engine with one frame's detections.
///
/// Faces go first so every stroke decision in this frame sees this frame's
/// faces. A frame with no hand ends any open stroke. Returns the fingertips
/// found (all `None` without a hand) for the overlay.
pub fn step(engine: &mut Engine, perception: &Perception, ui_finger: UiFinger) -> FingerPositions {
    engine.update_faces(&perception.faces);
    if let Some(face) = perception.faces.first() {
        engine.apply_face_movement(face.center);
    }

    let fingers = match perception.hands.first() {
        None => {
            engine.stop_drawing(None);
            FingerPositions::default()
        }
        Some(hand) => {
            let fingers = FingerPositions::from_hand(hand);
            if let Some(p) = fingers.ui_pointer(ui_finger) {
                engine.process_finger_input(p, FingerRole::Ui);
            }
            match fingers.index_tip {
                Some(tip) if fingers.drawing_enabled() => {
                    engine.process_finger_input(tip, FingerRole::Draw);
                }
                tip => engine.stop_drawing(tip),
            }
            fingers
        }
    };

    engine.end_frame();
    fingers
}
