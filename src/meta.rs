//! Capture metadata for a picture: orientation, date, location and aspect.
//!
//! Reads only the image header and the EXIF block; never decodes pixels.

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};
use exif::{Exif, In, Tag, Value};
use tracing::debug;

/// Aspect assumed until a picture's header has been read.
pub const DEFAULT_ASPECT: f32 = 1.5;

#[derive(Debug, Clone)]
pub struct MetaOptions {
    /// strftime pattern used for [`PictureMeta::display_date`].
    pub date_format: String,
    /// Populate [`PictureMeta::location`] from GPS tags.
    pub load_geoloc: bool,
}

impl Default for MetaOptions {
    fn default() -> Self {
        Self {
            date_format: "%b %d, %Y".to_string(),
            load_geoloc: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PictureMeta {
    /// EXIF orientation code, 1..=8.
    pub orientation: u16,
    /// Capture time in seconds since the epoch.
    pub taken_at: i64,
    pub display_date: String,
    pub location: String,
    /// Width over height as displayed (after orientation).
    pub aspect: f32,
}

impl PictureMeta {
    #[must_use]
    pub fn is_portrait(&self) -> bool {
        self.aspect < 1.0
    }

    /// Local calendar day the picture was taken.
    #[must_use]
    pub fn taken_on(&self) -> Option<NaiveDate> {
        Local
            .timestamp_opt(self.taken_at, 0)
            .earliest()
            .map(|dt| dt.date_naive())
    }
}

/// Resolution state of a record's metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MetaState {
    /// Not read yet (deferred mode).
    #[default]
    Pending,
    /// Read from the file.
    Resolved(PictureMeta),
    /// The file could not be inspected; defaults were substituted.
    Fallback(PictureMeta),
}

impl MetaState {
    #[must_use]
    pub fn meta(&self) -> Option<&PictureMeta> {
        match self {
            Self::Pending => None,
            Self::Resolved(meta) | Self::Fallback(meta) => Some(meta),
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Read metadata for `path`, substituting defaults on any failure.
pub fn resolve(path: &Path, opts: &MetaOptions) -> MetaState {
    match try_read_meta(path, opts) {
        Ok(meta) => MetaState::Resolved(meta),
        Err(err) => {
            debug!(path = %path.display(), "metadata unavailable: {err:#}");
            MetaState::Fallback(fallback_meta(path, opts))
        }
    }
}

/// Read metadata for `path`; fails only if the image header is unreadable.
///
/// Missing EXIF is not an error: orientation stays 1 and the capture time
/// falls back to the file's modification time.
pub fn try_read_meta(path: &Path, opts: &MetaOptions) -> Result<PictureMeta> {
    let (w, h) = image::image_dimensions(path)
        .with_context(|| format!("reading dimensions of {}", path.display()))?;
    let mut meta = fallback_meta(path, opts);
    meta.aspect = w as f32 / h.max(1) as f32;

    if let Some(exif) = read_exif(path) {
        if let Some(o) = orientation(&exif) {
            meta.orientation = o;
        }
        if let Some(ts) = date_time_original(&exif) {
            meta.taken_at = ts;
            meta.display_date = format_timestamp(ts, &opts.date_format);
        }
        if opts.load_geoloc {
            meta.location = gps_location(&exif).unwrap_or_default();
        }
    }
    if swaps_axes(meta.orientation) {
        meta.aspect = 1.0 / meta.aspect;
    }
    Ok(meta)
}

/// Defaults: orientation 1, landscape aspect, capture time = mtime.
pub fn fallback_meta(path: &Path, opts: &MetaOptions) -> PictureMeta {
    let taken_at = modified_secs(path);
    PictureMeta {
        orientation: 1,
        taken_at,
        display_date: format_timestamp(taken_at, &opts.date_format),
        location: String::new(),
        aspect: DEFAULT_ASPECT,
    }
}

/// Orientations 5..=8 rotate by 90 or 270 degrees.
#[inline]
#[must_use]
pub const fn swaps_axes(orientation: u16) -> bool {
    matches!(orientation, 5..=8)
}

pub fn modified_secs(path: &Path) -> i64 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(system_time_secs)
        .unwrap_or(0)
}

pub fn system_time_secs(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

pub fn format_timestamp(secs: i64, fmt: &str) -> String {
    let Some(dt) = Local.timestamp_opt(secs, 0).earliest() else {
        return String::new();
    };
    let mut out = String::new();
    if std::fmt::write(&mut out, format_args!("{}", dt.format(fmt))).is_err() {
        return String::new();
    }
    out
}

fn read_exif(path: &Path) -> Option<Exif> {
    let f = fs::File::open(path).ok()?;
    let mut buf = BufReader::new(f);
    exif::Reader::new().read_from_container(&mut buf).ok()
}

fn orientation(exif: &Exif) -> Option<u16> {
    let field = exif.get_field(Tag::Orientation, In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    (1..=8).contains(&o).then_some(o)
}

fn date_time_original(exif: &Exif) -> Option<i64> {
    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    let Value::Ascii(ref parts) = field.value else {
        return None;
    };
    let dt = exif::DateTime::from_ascii(parts.first()?).ok()?;
    let naive = NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_opt(u32::from(dt.hour), u32::from(dt.minute), u32::from(dt.second))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.timestamp())
}

fn gps_location(exif: &Exif) -> Option<String> {
    let lat = gps_degrees(exif, Tag::GPSLatitude)?;
    let lon = gps_degrees(exif, Tag::GPSLongitude)?;
    let lat_ref = gps_ref(exif, Tag::GPSLatitudeRef).unwrap_or('N');
    let lon_ref = gps_ref(exif, Tag::GPSLongitudeRef).unwrap_or('E');
    Some(format!("{lat:.5}{lat_ref}, {lon:.5}{lon_ref}"))
}

fn gps_degrees(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Rational(ref parts) = field.value else {
        return None;
    };
    let mut deg = 0.0;
    for (i, r) in parts.iter().take(3).enumerate() {
        if r.denom == 0 {
            return None;
        }
        deg += r.to_f64() / 60f64.powi(i as i32);
    }
    Some(deg)
}

fn gps_ref(exif: &Exif, tag: Tag) -> Option<char> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .and_then(|p| p.first())
            .map(|&b| char::from(b).to_ascii_uppercase()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"not really a jpeg").unwrap();

        let meta = match resolve(&path, &MetaOptions::default()) {
            MetaState::Fallback(meta) => meta,
            other => panic!("expected fallback metadata, got {other:?}"),
        };
        assert_eq!(meta.orientation, 1);
        assert!((meta.aspect - DEFAULT_ASPECT).abs() < f32::EPSILON);
        assert_eq!(meta.taken_at, modified_secs(&path));
        assert!(meta.location.is_empty());
    }

    #[test]
    fn png_without_exif_uses_header_aspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tall.png");
        image::RgbaImage::new(2, 4).save(&path).unwrap();

        let meta = try_read_meta(&path, &MetaOptions::default()).unwrap();
        assert_eq!(meta.orientation, 1);
        assert!((meta.aspect - 0.5).abs() < f32::EPSILON);
        assert!(meta.is_portrait());
    }

    #[test]
    fn formats_with_pattern() {
        let ts = Local
            .with_ymd_and_hms(2016, 12, 25, 10, 0, 0)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(format_timestamp(ts, "%Y-%m-%d"), "2016-12-25");
    }

    #[test]
    fn rotated_orientations_swap_axes() {
        assert!(!swaps_axes(1));
        assert!(!swaps_axes(3));
        assert!(swaps_axes(6));
        assert!(swaps_axes(8));
    }
}
