// Software rasterizer: segment list → canvas pixels, plus the small set of
// primitives the compositor reuses (lines, discs, rectangles).

use crate::stroke::Segment;
use crate::types::{FrameBuffer, Point, Rgb};

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
pub fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Visit every pixel on the Bresenham line from `a` to `b`, both ends included.
fn for_each_line_pixel(a: Point, b: Point, mut f: impl FnMut(i32, i32)) {
    let (mut x0, mut y0) = (a.x, a.y);
    let dx = (b.x - x0).abs();
    let sx = if x0 < b.x { 1 } else { -1 };
    let dy = -(b.y - y0).abs();
    let sy = if y0 < b.y { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        f(x0, y0);
        if x0 == b.x && y0 == b.y { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// 1-pixel line.
pub fn draw_line(fb: &mut FrameBuffer, a: Point, b: Point, color: u32) {
    for_each_line_pixel(a, b, |x, y| put_pixel(fb, x, y, color));
}

/// Offsets covered by a filled disc of radius `r` centred on the origin.
fn disc_offsets(r: i32) -> Vec<(i32, i32)> {
    let r2 = r * r;
    let mut out = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r2 {
                out.push((dx, dy));
            }
        }
    }
    out
}

pub fn fill_circle(fb: &mut FrameBuffer, c: Point, radius: i32, color: u32) {
    for (dx, dy) in disc_offsets(radius.max(0)) {
        put_pixel(fb, c.x + dx, c.y + dy, color);
    }
}

/// Line `thickness` pixels wide with round caps: a disc stamped at every step.
pub fn draw_thick_line(fb: &mut FrameBuffer, a: Point, b: Point, thickness: u32, color: u32) {
    if thickness <= 1 {
        draw_line(fb, a, b, color);
        return;
    }
    let stamp = disc_offsets(thickness as i32 / 2);
    for_each_line_pixel(a, b, |x, y| {
        for &(dx, dy) in &stamp {
            put_pixel(fb, x + dx, y + dy, color);
        }
    });
}

pub fn fill_rect(fb: &mut FrameBuffer, x: i32, y: i32, w: i32, h: i32, color: u32) {
    for yy in y..=y + h {
        for xx in x..=x + w {
            put_pixel(fb, xx, yy, color);
        }
    }
}

/// Rectangle outline `border` pixels wide, drawn inward from the edges.
pub fn stroke_rect(fb: &mut FrameBuffer, x: i32, y: i32, w: i32, h: i32, border: i32, color: u32) {
    for i in 0..border.max(1) {
        let (x0, y0, x1, y1) = (x + i, y + i, x + w - i, y + h - i);
        draw_line(fb, Point::new(x0, y0), Point::new(x1, y0), color);
        draw_line(fb, Point::new(x0, y1), Point::new(x1, y1), color);
        draw_line(fb, Point::new(x0, y0), Point::new(x0, y1), color);
        draw_line(fb, Point::new(x1, y0), Point::new(x1, y1), color);
    }
}

/// Clear `fb` and draw every segment, in order, each in its own style.
/// Later segments land on top of earlier ones.
pub fn render_into(fb: &mut FrameBuffer, segments: &[Segment]) {
    fb.clear();
    for seg in segments {
        let color = seg.color.to_u32();
        for pair in seg.points.windows(2) {
            draw_thick_line(fb, pair[0], pair[1], seg.thickness, color);
        }
    }
}

/// A fresh canvas holding exactly `segments`.
pub fn render(segments: &[Segment], width: usize, height: usize) -> FrameBuffer {
    let mut fb = FrameBuffer::new(width, height);
    render_into(&mut fb, segments);
    fb
}

/// Pixel color as RGB, or None outside the buffer.
pub fn rgb_at(fb: &FrameBuffer, p: Point) -> Option<Rgb> {
    fb.get(p.x, p.y).map(Rgb::from_u32)
}
