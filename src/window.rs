// The on-screen window plus the keyboard and mouse input we care about.

use crate::error::Error;
use crate::perception::SimInput;
use crate::types::{FrameBuffer, Point};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

pub struct Drawer {
    window: Window,
}

impl Drawer {
    /// Create a window of the given size. Frames of any size are stretched to fit.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let options = WindowOptions { resize: true, ..WindowOptions::default() };
        let window = Window::new(title, width, height, options)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn quit_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape) || self.window.is_key_pressed(Key::Q, KeyRepeat::No)
    }

    pub fn toggle_ui_pressed(&self) -> bool {
        self.window.is_key_pressed(Key::I, KeyRepeat::No)
    }

    pub fn clear_pressed(&self) -> bool {
        self.window.is_key_pressed(Key::C, KeyRepeat::No)
    }

    pub fn save_pressed(&self) -> bool {
        self.window.is_key_pressed(Key::S, KeyRepeat::No)
    }

    /// Mouse state mapped into frame coordinates, for simulated perception.
    pub fn sim_input(&self, frame_width: usize, frame_height: usize) -> SimInput {
        let (win_w, win_h) = self.window.get_size();
        // Window may be stretched relative to the frame.
        let cursor = self.window.get_mouse_pos(MouseMode::Clamp).map(|(x, y)| {
            let sx = frame_width as f32 / win_w.max(1) as f32;
            let sy = frame_height as f32 / win_h.max(1) as f32;
            Point::new((x.max(0.0) * sx) as i32, (y.max(0.0) * sy) as i32)
        });
        SimInput {
            cursor,
            draw: self.window.get_mouse_down(MouseButton::Left),
            point: self.window.get_mouse_down(MouseButton::Right),
            face: self.window.is_key_down(Key::F),
        }
    }
}
