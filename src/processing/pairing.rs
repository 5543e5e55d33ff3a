use image::{Rgba, RgbaImage, imageops};

use crate::error::Error;
use crate::processing::resize::resize_rgba;

/// Horizontal gap between two paired portraits.
pub const PAIR_GAP: u32 = 8;

/// Place two portrait pictures side by side on a black canvas.
///
/// The wider picture is scaled to the narrower one's width; the canvas is
/// as tall as the shorter result, so the taller one is cropped at the bottom.
pub fn combine_pair(left: RgbaImage, right: RgbaImage) -> Result<RgbaImage, Error> {
    let (left, right) = if left.width() > right.width() {
        let scaled = scale_to_width(&left, right.width())?;
        (scaled, right)
    } else {
        let scaled = scale_to_width(&right, left.width())?;
        (left, scaled)
    };

    let width = left.width() + right.width() + PAIR_GAP;
    let height = left.height().min(right.height());
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    imageops::replace(&mut canvas, &left, 0, 0);
    imageops::replace(&mut canvas, &right, i64::from(left.width() + PAIR_GAP), 0);
    Ok(canvas)
}

fn scale_to_width(img: &RgbaImage, width: u32) -> Result<RgbaImage, Error> {
    if img.width() == width {
        return Ok(img.clone());
    }
    let height = (u64::from(img.height()) * u64::from(width) / u64::from(img.width().max(1)))
        .max(1) as u32;
    resize_rgba(img, width.max(1), height)
}
