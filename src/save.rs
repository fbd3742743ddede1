// Writes a frame to disk as `<prefix>_<YYYYmmdd-HHMMSS>.png`.

use crate::error::Result;
use crate::types::FrameBuffer;
use image::{ImageBuffer, Rgb};
use log::info;
use std::path::{Path, PathBuf};

pub fn timestamped_name(prefix: &str) -> String {
    format!("{prefix}_{}.png", chrono::Local::now().format("%Y%m%d-%H%M%S"))
}

pub fn to_rgb_image(frame: &FrameBuffer) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    ImageBuffer::from_fn(frame.width as u32, frame.height as u32, |x, y| {
        let px = frame.pixels[y as usize * frame.width + x as usize];
        Rgb([(px >> 16) as u8, (px >> 8) as u8, px as u8])
    })
}

/// Save `frame` under `dir` (created if missing). Returns the file path.
pub fn save_png(frame: &FrameBuffer, dir: &Path, prefix: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(timestamped_name(prefix));
    to_rgb_image(frame).save(&path)?;
    info!("Drawing saved to {}", path.display());
    Ok(path)
}
