// Finger painting over a live webcam feed.
//
// Strokes are drawn with the index fingertip and paused with a "V" pose.
// Strokes ended on a face are tagged and follow that face as it moves.
// The pieces that need hardware (camera, window, detector process) are
// kept at the edges; everything from [`app::step`] inward runs on plain
// data and is tested without a camera.

pub mod app;
pub mod button;
pub mod camera;
pub mod compositor;
pub mod config;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod perception;
pub mod render;
pub mod save;
pub mod stroke;
pub mod types;
pub mod window;

pub use config::Config;
pub use engine::{Engine, EngineEvent};
pub use error::{Error, Result};
