use image::{RgbaImage, imageops};

use crate::error::Error;
use crate::processing::layout::{center_offset, display_ratio};
use crate::processing::resize::resize_rgba;

/// Width the background is reduced to before blurring.
const BLUR_WIDTH: u32 = 512;

/// Settings for filling letterbox areas with a blurred copy of the picture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeBlur {
    /// Gaussian sigma applied at the reduced size.
    pub amount: f32,
    /// Extra zoom into the background crop, at least 1.
    pub zoom: f32,
    /// Opacity of the blurred background.
    pub alpha: f32,
}

pub fn apply_blur(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    imageops::blur(image, sigma)
}

/// Compose `image` centred over a blurred, display-sized copy of itself.
///
/// Returns `Ok(None)` when the picture already matches the display shape
/// closely enough that no edges would show.
pub fn edge_blur_composite(
    image: &RgbaImage,
    display: (u32, u32),
    blur: &EdgeBlur,
) -> Result<Option<RgbaImage>, Error> {
    let (dw, dh) = (display.0.max(1), display.1.max(1));
    let (iw, ih) = image.dimensions();
    if iw == 0 || ih == 0 {
        return Ok(None);
    }
    let ratio = display_ratio((dw, dh), (iw, ih));
    if (ratio - 1.0).abs() <= 0.01 {
        return Ok(None);
    }

    // sc_b covers the display, sc_f fits inside it.
    let (mut sc_b, mut sc_f) = (dh as f32 / ih as f32, dw as f32 / iw as f32);
    if ratio > 1.0 {
        std::mem::swap(&mut sc_b, &mut sc_f);
    }
    let zoom = blur.zoom.max(1.0);
    let crop_w = ((dw as f32 / sc_b / zoom).round() as u32).clamp(1, iw);
    let crop_h = ((dh as f32 / sc_b / zoom).round() as u32).clamp(1, ih);
    let (x, y) = center_offset(crop_w, crop_h, iw, ih);
    let crop = imageops::crop_imm(image, x, y, crop_w, crop_h).to_image();

    let small_h = (u64::from(dh) * u64::from(BLUR_WIDTH) / u64::from(dw)).max(1) as u32;
    let small = imageops::resize(&crop, BLUR_WIDTH, small_h, imageops::FilterType::Triangle);
    let small = apply_blur(&small, blur.amount);
    let mut background = resize_rgba(&small, dw, dh)?;
    let alpha = (255.0 * blur.alpha.clamp(0.0, 1.0)).round() as u8;
    for px in background.pixels_mut() {
        px.0[3] = alpha;
    }

    let fg_w = ((iw as f32 * sc_f) as u32).clamp(1, dw);
    let fg_h = ((ih as f32 * sc_f) as u32).clamp(1, dh);
    let foreground = resize_rgba(image, fg_w, fg_h)?;
    let (ox, oy) = center_offset(fg_w, fg_h, dw, dh);
    imageops::replace(&mut background, &foreground, i64::from(ox), i64::from(oy));
    Ok(Some(background))
}
