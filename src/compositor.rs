// Builds the frame you see: camera image, detection overlays, the drawing
// canvas on top, then buttons and HUD text.

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::gesture::FingerPositions;
use crate::perception::Hand;
use crate::render::{draw_line, fill_circle, fill_rect, put_pixel, stroke_rect};
use crate::types::{FaceDetection, FrameBuffer, Rgb};

const FACE_BOX_COLOR: u32 = 0x00_00_FF_00;
const SKELETON_COLOR: u32 = 0x00_F0_F0_F0;
const LANDMARK_COLOR: u32 = 0x00_FF_30_30;
const INDEX_TIP_COLOR: u32 = 0x00_FF_00_FF;
const MIDDLE_TIP_COLOR: u32 = 0x00_FF_FF_00;
const BUTTON_BORDER: u32 = 0x00_32_32_32;
const TEXT_COLOR: u32 = 0x00_FF_FF_FF;
const FPS_COLOR: u32 = 0x00_00_FF_00;

/// MediaPipe 21-point hand skeleton.
const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// Per-frame things to draw besides the engine state.
pub struct Overlay<'a> {
    pub hand: Option<&'a Hand>,
    pub fingers: FingerPositions,
    pub faces: &'a [FaceDetection],
    pub fps: Option<f32>,
}

pub struct Compositor {
    camera_weight: f32,
    canvas_opacity: f32,
    show_fps: bool,
    show_face_boxes: bool,
    show_hand_landmarks: bool,
}

impl Compositor {
    pub fn new(config: &Config) -> Self {
        Self {
            camera_weight: config.camera_weight,
            canvas_opacity: config.canvas_opacity,
            show_fps: config.show_fps,
            show_face_boxes: config.show_face_boxes,
            show_hand_landmarks: config.show_hand_landmarks,
        }
    }

    /// Compose one frame into `screen`, sized to the engine canvas. A camera
    /// frame of another size is scaled to fit.
    pub fn compose(
        &self,
        screen: &mut FrameBuffer,
        camera: &FrameBuffer,
        engine: &Engine,
        overlay: &Overlay,
    ) -> Result<()> {
        let canvas = engine.canvas();
        if screen.width != canvas.width || screen.height != canvas.height {
            *screen = FrameBuffer::new(canvas.width, canvas.height);
        }
        resample_into(camera, screen);

        // 1) Detection overlays go onto the camera image, under the drawing.
        if self.show_face_boxes {
            for face in overlay.faces {
                let b = face.bbox;
                stroke_rect(screen, b.x, b.y, b.width, b.height, 2, FACE_BOX_COLOR);
            }
        }
        if self.show_hand_landmarks {
            if let Some(hand) = overlay.hand {
                draw_hand_skeleton(screen, hand);
            }
        }
        draw_finger_indicators(screen, &overlay.fingers);

        // 2) Canvas over camera.
        blend_in_place(screen, engine.canvas(), self.camera_weight, self.canvas_opacity)?;

        // 3) Buttons, then text.
        if engine.ui_visible() {
            for button in engine.buttons() {
                let color = if button.is_pressed { button.color.darken(40) } else { button.color };
                let r = button.rect;
                fill_rect(screen, r.x, r.y, r.width, r.height, color.to_u32());
                stroke_rect(screen, r.x, r.y, r.width, r.height, 2, BUTTON_BORDER);
                let tw = text_width(&button.label, 1);
                let tx = r.x + (r.width - tw) / 2;
                let ty = r.y + (r.height - GLYPH_H) / 2;
                draw_text_5x7(screen, tx, ty, &button.label, 1, TEXT_COLOR);
            }
        }

        let h = screen.height as i32;
        let name = engine.color_name().unwrap_or("Custom");
        draw_text_5x7(screen, 10, h - 90, &format!("Color: {name}"), 2, TEXT_COLOR);
        draw_text_5x7(screen, 10, h - 60, &format!("Thickness: {}", engine.thickness()), 2, TEXT_COLOR);
        draw_text_5x7(screen, 10, h - 30, &format!("Mode: {}", engine.mode()), 2, TEXT_COLOR);

        if self.show_fps {
            if let Some(fps) = overlay.fps {
                let text = format!("FPS: {}", fps as u32);
                let x = (screen.width as i32 - text_width(&text, 2)) / 2;
                draw_text_5x7(screen, x, 10, &text, 2, FPS_COLOR);
            }
        }

        Ok(())
    }
}

/// Nearest-neighbour scale of `src` onto `dst` (whose size is kept).
pub fn resample_into(src: &FrameBuffer, dst: &mut FrameBuffer) {
    if src.width == dst.width && src.height == dst.height {
        dst.pixels.copy_from_slice(&src.pixels);
        return;
    }
    if src.width == 0 || src.height == 0 {
        dst.clear();
        return;
    }
    for y in 0..dst.height {
        let sy = y * src.height / dst.height;
        let src_row = &src.pixels[sy * src.width..(sy + 1) * src.width];
        let dst_row = &mut dst.pixels[y * dst.width..(y + 1) * dst.width];
        for (x, px) in dst_row.iter_mut().enumerate() {
            *px = src_row[x * src.width / dst.width];
        }
    }
}

/// Camera frame scaled to `width` x `height`, or a plain copy if it already fits.
pub fn fit_frame(src: &FrameBuffer, width: usize, height: usize) -> FrameBuffer {
    let mut out = FrameBuffer::new(width, height);
    resample_into(src, &mut out);
    out
}

/// `base = base * base_weight + overlay * overlay_weight` per channel,
/// rounded and clamped to 0..=255.
pub fn blend_in_place(
    base: &mut FrameBuffer,
    overlay: &FrameBuffer,
    base_weight: f32,
    overlay_weight: f32,
) -> Result<()> {
    if base.width != overlay.width || base.height != overlay.height {
        return Err(Error::CameraFrame("blend: dimension mismatch".into()));
    }

    let mix = |a: u8, b: u8| -> u8 {
        (a as f32 * base_weight + b as f32 * overlay_weight).round().clamp(0.0, 255.0) as u8
    };

    for (dst, &src) in base.pixels.iter_mut().zip(&overlay.pixels) {
        let a = Rgb::from_u32(*dst);
        let b = Rgb::from_u32(src);
        *dst = Rgb::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b)).to_u32();
    }
    Ok(())
}

fn draw_hand_skeleton(fb: &mut FrameBuffer, hand: &Hand) {
    for &(a, b) in &HAND_CONNECTIONS {
        if let (Some(pa), Some(pb)) = (hand.keypoint(a), hand.keypoint(b)) {
            draw_line(fb, pa, pb, SKELETON_COLOR);
        }
    }
    for kp in &hand.keypoints {
        fill_circle(fb, kp.point, 3, LANDMARK_COLOR);
    }
}

fn draw_finger_indicators(fb: &mut FrameBuffer, fingers: &FingerPositions) {
    if let Some(p) = fingers.index_tip {
        fill_circle(fb, p, 10, INDEX_TIP_COLOR);
    }
    if let Some(p) = fingers.middle_tip {
        fill_circle(fb, p, 8, MIDDLE_TIP_COLOR);
    }
}

/* ---------- 5x7 bitmap font ---------- */

const GLYPH_W: i32 = 5;
const GLYPH_H: i32 = 7;

/// Return a 5x7 glyph bitmap. Lower-case letters use the upper-case shapes.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '/' => g!(0b00001,0b00010,0b00010,0b00100,0b01000,0b01000,0b10000),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),

        _ => None,
    }
}

/// Draw one glyph with each font pixel as a `scale`×`scale` block.
fn draw_glyph(fb: &mut FrameBuffer, x: i32, y: i32, rows: &[u8; 7], scale: i32, color: u32) {
    for (ry, rowbits) in rows.iter().enumerate() {
        for rx in 0..GLYPH_W {
            if (rowbits & (1 << (4 - rx))) == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    put_pixel(fb, x + rx * scale + sx, y + ry as i32 * scale + sy, color);
                }
            }
        }
    }
}

/// Width in pixels of `text` at `scale`.
pub fn text_width(text: &str, scale: i32) -> i32 {
    let n = text.chars().count() as i32;
    if n == 0 { 0 } else { n * (GLYPH_W + 1) * scale - scale }
}

/// Draw a text string using 5x7 glyphs, with a 1-pixel black shadow.
/// Unknown characters leave a blank cell.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, scale: i32, color: u32) {
    let scale = scale.max(1);
    for ch in text.chars() {
        if let Some(rows) = glyph5x7(ch) {
            draw_glyph(fb, x + 1, y + 1, &rows, scale, 0x00000000);
            draw_glyph(fb, x, y, &rows, scale, color);
        }
        x += (GLYPH_W + 1) * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::FingerRole;
    use crate::types::{BoundingBox, Point};

    #[test]
    fn blend_uses_camera_weight_and_opaque_canvas() {
        let mut base = FrameBuffer { width: 3, height: 1, pixels: vec![0x00_64_64_64, 0x00_FF_FF_FF, 0x00_0A_14_1E] };
        let canvas = FrameBuffer { width: 3, height: 1, pixels: vec![0, 0x00_FF_00_00, 0x00_00_FF_00] };
        blend_in_place(&mut base, &canvas, 0.8, 1.0).unwrap();
        // 100*0.8 = 80; saturates at 255; 10*0.8=8, 20*0.8+255 → 255, 30*0.8=24.
        assert_eq!(base.pixels, vec![0x00_50_50_50, 0x00_FF_CC_CC, 0x00_08_FF_18]);
    }

    #[test]
    fn blend_rejects_mismatched_sizes() {
        let mut base = FrameBuffer::new(2, 2);
        assert!(blend_in_place(&mut base, &FrameBuffer::new(3, 2), 0.8, 1.0).is_err());
    }

    #[test]
    fn resample_repeats_nearest_source_pixels() {
        let src = FrameBuffer { width: 2, height: 1, pixels: vec![1, 2] };
        let out = fit_frame(&src, 4, 2);
        assert_eq!(out.pixels, vec![1, 1, 2, 2, 1, 1, 2, 2]);

        let big = FrameBuffer { width: 4, height: 2, pixels: (0..8).collect() };
        assert_eq!(fit_frame(&big, 2, 1).pixels, vec![0, 2]);
    }

    #[test]
    fn compose_scales_a_smaller_camera_frame_to_the_canvas() {
        let config = Config { show_ui_by_default: false, show_fps: false, ..Config::default() };
        let mut engine = Engine::new(&config, 640, 480);
        engine.process_finger_input(Point::new(300, 100), FingerRole::Draw);
        engine.process_finger_input(Point::new(340, 100), FingerRole::Draw);

        let mut camera = FrameBuffer { width: 320, height: 240, pixels: vec![0x00_64_64_64; 320 * 240] };
        camera.pixels[0] = 0x00_0A_0A_0A;
        let mut screen = FrameBuffer::new(320, 240);
        let overlay = Overlay { hand: None, fingers: FingerPositions::default(), faces: &[], fps: None };
        Compositor::new(&config).compose(&mut screen, &camera, &engine, &overlay).unwrap();

        assert_eq!((screen.width, screen.height), (640, 480));
        assert_eq!(screen.get(600, 300), Some(0x00_50_50_50));
        // Top-left camera pixel covers a 2x2 block.
        assert_eq!(screen.get(1, 1), Some(0x00_08_08_08));
        assert_eq!(screen.get(320, 100), Some(0x00_FF_FF_50));
    }

    #[test]
    fn text_width_counts_spacing() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("A", 1), 5);
        assert_eq!(text_width("AB", 2), 22);
    }

    #[test]
    fn text_is_drawn_case_insensitively() {
        let mut a = FrameBuffer::new(20, 10);
        let mut b = FrameBuffer::new(20, 10);
        draw_text_5x7(&mut a, 1, 1, "ok", 1, TEXT_COLOR);
        draw_text_5x7(&mut b, 1, 1, "OK", 1, TEXT_COLOR);
        assert_eq!(a, b);
        assert!(!a.is_blank());
    }

    #[test]
    fn compose_shows_drawing_over_dimmed_camera() {
        let config = Config { show_ui_by_default: false, show_fps: false, ..Config::default() };
        let mut engine = Engine::new(&config, 200, 200);
        engine.process_finger_input(Point::new(100, 50), FingerRole::Draw);
        engine.process_finger_input(Point::new(150, 50), FingerRole::Draw);

        let camera = FrameBuffer { width: 200, height: 200, pixels: vec![0x00_64_64_64; 200 * 200] };
        let mut screen = FrameBuffer::new(1, 1);
        let faces = [FaceDetection::from_bbox(BoundingBox::new(20, 20, 30, 30))];
        let overlay = Overlay { hand: None, fingers: FingerPositions::default(), faces: &faces, fps: None };
        Compositor::new(&config).compose(&mut screen, &camera, &engine, &overlay).unwrap();

        assert_eq!((screen.width, screen.height), (200, 200));
        // Drawn pixel: 100*0.8 + 255 saturates to the stroke color (yellow).
        assert_eq!(screen.get(120, 50), Some(0x00_FF_FF_50));
        // Plain camera pixel is dimmed.
        assert_eq!(screen.get(180, 120), Some(0x00_50_50_50));
        // Face box edge, blended.
        assert_eq!(screen.get(20, 35), Some(0x00_00_CC_00));
    }
}
