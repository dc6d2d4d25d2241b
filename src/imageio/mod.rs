//! Writing rendered images to disk.
//!
//! PNG output is gamma encoded and clamped to 8 bits; EXR output keeps the linear
//! floating point values.

use std::path::Path;

use anyhow::{bail, Context};
use image::{ImageFormat, Rgb32FImage, RgbImage};
use tracing::info;

use crate::Float;

/// The sRGB transfer curve.
pub fn gamma_correct(v: Float) -> Float {
    if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

pub fn inverse_gamma_correct(v: Float) -> Float {
    if v <= 0.04045 {
        v * 1.0 / 12.92
    } else {
        ((v + 0.055) * 1.0 / 1.055).powf(2.4)
    }
}

fn to_u8(v: f32) -> u8 {
    let v = if v.is_nan() { 0.0 } else { gamma_correct(v as Float) };
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

pub fn to_rgb8(img: &Rgb32FImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        image::Rgb([to_u8(p[0]), to_u8(p[1]), to_u8(p[2])])
    })
}

pub fn write_png(path: impl AsRef<Path>, img: &Rgb32FImage) -> anyhow::Result<()> {
    let path = path.as_ref();
    to_rgb8(img)
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("failed to write PNG image to {}", path.display()))
}

pub fn write_exr(path: impl AsRef<Path>, img: &Rgb32FImage) -> anyhow::Result<()> {
    let path = path.as_ref();
    exr::prelude::write_rgb_file(path, img.width() as usize, img.height() as usize, |x, y| {
        let p = img.get_pixel(x as u32, y as u32);
        (p[0], p[1], p[2])
    })
    .with_context(|| format!("failed to write EXR image to {}", path.display()))
}

/// Writes `img` in the format named by the path's extension.
pub fn write_image(path: impl AsRef<Path>, img: &Rgb32FImage) -> anyhow::Result<()> {
    let path = path.as_ref();
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => write_png(path, img)?,
        Some("exr") => write_exr(path, img)?,
        _ => bail!("unsupported output format for {}, expected .png or .exr", path.display()),
    }
    info!(path = %path.display(), width = img.width(), height = img.height(), "wrote image");
    Ok(())
}
