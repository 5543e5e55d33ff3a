use fast_image_resize as fir;
use image::RgbaImage;

use crate::error::Error;

/// Bicubic (Catmull-Rom) resize of an RGBA buffer.
pub fn resize_rgba(source: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage, Error> {
    if target_w == 0 || target_h == 0 {
        return Err(Error::Processing(
            "resize dimensions must be positive".to_string(),
        ));
    }
    if source.width() == target_w && source.height() == target_h {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .map_err(|e| Error::Processing(format!("invalid resize source: {e}")))?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|e| Error::Processing(format!("resize failed: {e}")))?;
    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| Error::Processing("failed to construct resized RGBA image".to_string()))
}

/// Dimensions after shrinking so neither edge exceeds `max_dim`, keeping the
/// aspect ratio. Returns `None` when the image already fits.
#[must_use]
pub fn limit_dimensions(w: u32, h: u32, max_dim: u32) -> Option<(u32, u32)> {
    if w > max_dim && w >= h {
        let nh = (u64::from(h) * u64::from(max_dim) / u64::from(w)).max(1) as u32;
        Some((max_dim, nh))
    } else if h > max_dim {
        let nw = (u64::from(w) * u64::from(max_dim) / u64::from(h)).max(1) as u32;
        Some((nw, max_dim))
    } else if w > max_dim {
        let nh = (u64::from(h) * u64::from(max_dim) / u64::from(w)).max(1) as u32;
        Some((max_dim, nh))
    } else {
        None
    }
}

/// Shrink `img` to fit within `max_dim` on both axes.
pub fn downsize(img: RgbaImage, max_dim: u32) -> Result<RgbaImage, Error> {
    match limit_dimensions(img.width(), img.height(), max_dim) {
        Some((w, h)) => resize_rgba(&img, w, h),
        None => Ok(img),
    }
}
