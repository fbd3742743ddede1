// Gesture extraction: raw hand keypoints → fingertip positions and a
// "may draw" signal.
//
// Only three gestures exist:
//
// | Posture | Meaning |
// |---|---|
// | index tip visible, middle finger folded | draw with the index tip |
// | index + middle up ("V") | pause drawing |
// | UI fingertip over a button | press it |

use crate::config::UiFinger;
use crate::perception::Hand;
use crate::types::Point;

/// Hand landmark indices (MediaPipe 21-point hand model).
pub mod landmarks {
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const PINKY_TIP: usize = 20;
    pub const COUNT: usize = 21;
}

/// What a fingertip is being used for this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FingerRole {
    Draw,
    Ui,
}

/// Fingertips of interest for one frame. Any of them may be missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerPositions {
    pub index_tip: Option<Point>,
    pub middle_tip: Option<Point>,
    /// Middle finger knuckle; the tip rising above it forms the "V" pause.
    pub middle_ref: Option<Point>,
    pub pinky_tip: Option<Point>,
}

impl FingerPositions {
    pub fn from_hand(hand: &Hand) -> Self {
        let mut out = Self::default();
        for kp in &hand.keypoints {
            match kp.id {
                landmarks::INDEX_FINGER_TIP => out.index_tip = Some(kp.point),
                landmarks::MIDDLE_FINGER_TIP => out.middle_tip = Some(kp.point),
                landmarks::MIDDLE_FINGER_MCP => out.middle_ref = Some(kp.point),
                landmarks::PINKY_TIP => out.pinky_tip = Some(kp.point),
                _ => {}
            }
        }
        out
    }

    /// Middle tip above its knuckle (smaller y in image space).
    pub fn is_pause_gesture(&self) -> bool {
        match (self.middle_tip, self.middle_ref) {
            (Some(tip), Some(knuckle)) => tip.y < knuckle.y,
            _ => false,
        }
    }

    pub fn drawing_enabled(&self) -> bool {
        self.index_tip.is_some() && !self.is_pause_gesture()
    }

    /// The fingertip that operates buttons.
    pub fn ui_pointer(&self, finger: UiFinger) -> Option<Point> {
        match finger {
            UiFinger::Middle => self.middle_tip,
            UiFinger::Pinky => self.pinky_tip,
        }
    }
}
