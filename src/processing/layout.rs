//! Geometry shared by image preparation and the presentation loop.

pub fn center_offset(inner_w: u32, inner_h: u32, outer_w: u32, outer_h: u32) -> (u32, u32) {
    let ox = outer_w.saturating_sub(inner_w) / 2;
    let oy = outer_h.saturating_sub(inner_h) / 2;
    (ox, oy)
}

/// Display width/height ratio divided by the image's.
///
/// Greater than one when the display is relatively wider than the image.
pub fn display_ratio(display: (u32, u32), image: (u32, u32)) -> f32 {
    let (dw, dh) = (display.0.max(1) as f32, display.1.max(1) as f32);
    let (iw, ih) = (image.0.max(1) as f32, image.1.max(1) as f32);
    (dw * ih) / (dh * iw)
}

/// How a slide texture maps onto the display, in texture coordinates.
///
/// A scale above one on an axis means that axis is letterboxed (fit) or,
/// on the other axis, cropped (fill); `offset` keeps the picture centred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: [f32; 2],
    pub offset: [f32; 2],
}

impl Placement {
    /// Letterbox (`fit`) or crop-to-fill the picture on the display.
    pub fn new(display: (u32, u32), image: (u32, u32), fit: bool) -> Self {
        let ratio = display_ratio(display, image);
        if (ratio > 1.0 && fit) || (ratio <= 1.0 && !fit) {
            Self {
                scale: [ratio, 1.0],
                offset: [(ratio - 1.0) * 0.5, 0.0],
            }
        } else {
            let ratio = 1.0 / ratio;
            Self {
                scale: [1.0, ratio],
                offset: [0.0, (ratio - 1.0) * 0.5],
            }
        }
    }

    /// Ken Burns pan: the offset starts at zero and drifts to twice the
    /// centred value as `remaining` runs down to zero.
    #[must_use]
    pub fn panned(self, remaining: f32, total: f32) -> Self {
        if total <= 0.0 {
            return self;
        }
        let t = 1.0 - (remaining / total).clamp(0.0, 1.0);
        Self {
            scale: self.scale,
            offset: [self.offset[0] * 2.0 * t, self.offset[1] * 2.0 * t],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn centre_offset_handles_oversize() {
        assert_eq!(center_offset(100, 50, 200, 150), (50, 50));
        assert_eq!(center_offset(300, 50, 200, 50), (0, 0));
    }

    #[test]
    fn fill_crops_portrait_vertically() {
        // Portrait on a landscape display: fill scales the height factor down.
        let p = Placement::new((1600, 900), (900, 1600), false);
        assert!(close(p.scale[0], 1.0));
        assert!(p.scale[1] < 1.0);
        assert!(p.offset[1] < 0.0);
    }

    #[test]
    fn fit_letterboxes_portrait_horizontally() {
        let p = Placement::new((1600, 900), (900, 1600), true);
        assert!(p.scale[0] > 1.0);
        assert!(close(p.scale[1], 1.0));
        assert!(close(p.offset[0], (p.scale[0] - 1.0) * 0.5));
    }

    #[test]
    fn matching_aspect_is_identity() {
        let p = Placement::new((1920, 1080), (3840, 2160), false);
        assert!(close(p.scale[0], 1.0) && close(p.scale[1], 1.0));
        assert!(close(p.offset[0], 0.0) && close(p.offset[1], 0.0));
    }

    #[test]
    fn pan_runs_from_zero_to_double_offset() {
        let p = Placement {
            scale: [1.0, 1.5],
            offset: [0.0, 0.25],
        };
        assert!(close(p.panned(10.0, 10.0).offset[1], 0.0));
        assert!(close(p.panned(5.0, 10.0).offset[1], 0.25));
        assert!(close(p.panned(0.0, 10.0).offset[1], 0.5));
        assert!(close(p.panned(20.0, 10.0).offset[1], 0.0));
    }

    #[test]
    fn pan_without_duration_is_unchanged() {
        let p = Placement::new((1600, 900), (900, 1600), false);
        assert_eq!(p.panned(3.0, 0.0), p);
    }
}
