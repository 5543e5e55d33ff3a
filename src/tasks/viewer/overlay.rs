//! Caption text and fade curves drawn over a slide.

use std::collections::HashSet;

use crate::catalog::PictureRecord;
use crate::state::TextFlags;

pub const NO_IMAGES: &str = "NO IMAGES SELECTED";
pub const PAUSED: &str = "PAUSED";
pub const SEPARATOR: &str = " • ";

/// Rules for turning a record into caption text.
#[derive(Debug, Clone, Default)]
pub struct CaptionStyle {
    /// Characters the caption font can draw; `None` allows everything.
    codepoints: Option<HashSet<char>>,
    load_geoloc: bool,
}

impl CaptionStyle {
    pub fn new(codepoints: Option<&str>, load_geoloc: bool) -> Self {
        Self {
            codepoints: codepoints.map(|s| s.chars().collect()),
            load_geoloc,
        }
    }

    /// Drop characters the font cannot render.
    pub fn sanitize(&self, text: &str) -> String {
        match &self.codepoints {
            Some(allowed) => text.chars().filter(|c| allowed.contains(c)).collect(),
            None => text.to_string(),
        }
    }

    pub fn compose(&self, record: Option<&PictureRecord>, flags: TextFlags, paused: bool) -> String {
        let mut parts = Vec::new();
        if let Some(record) = record {
            if flags.contains(TextFlags::NAME) {
                parts.push(self.sanitize(record.file_name()));
            }
            if flags.contains(TextFlags::DATE)
                && let Some(meta) = record.meta.meta()
            {
                parts.push(meta.display_date.clone());
            }
            if self.load_geoloc
                && flags.contains(TextFlags::LOCATION)
                && let Some(meta) = record.meta.meta()
            {
                let location = self.sanitize(meta.location.trim());
                if !location.is_empty() {
                    parts.push(location);
                }
            }
            if flags.contains(TextFlags::FOLDER) {
                parts.push(self.sanitize(record.folder_name()));
            }
        }
        if paused {
            parts.push(PAUSED.to_string());
        }
        parts.join(SEPARATOR)
    }
}

/// Eased cross-fade weight for a linear fade position.
#[inline]
pub fn smoothstep(a: f32) -> f32 {
    let a = a.clamp(0.0, 1.0);
    a * a * (3.0 - 2.0 * a)
}

/// Caption opacity `elapsed` seconds into a caption shown for `duration`.
///
/// Rises and falls symmetrically around the midpoint and never exceeds the
/// slide's own fade position `image_alpha`.
pub fn text_alpha(elapsed: f64, duration: f64, image_alpha: f32) -> f32 {
    if duration <= 0.0 {
        return 0.0;
    }
    let dt = (elapsed + 0.1) / duration;
    let ramp = (duration / 4.0).max(4.0);
    (ramp * (f64::from(image_alpha) - (1.0 - 2.0 * dt).abs())).clamp(0.0, 1.0) as f32
}
