//! Turns a catalog record into a display-ready RGBA texture.

use std::path::Path;

use image::RgbaImage;
use tracing::{debug, warn};

use crate::catalog::{Catalog, DateRange, Pairing};
use crate::error::Error;
use crate::meta::MetaOptions;
use crate::processing::blur::{EdgeBlur, edge_blur_composite};
use crate::processing::orientation::orient;
use crate::processing::pairing::combine_pair;
use crate::processing::resize::downsize;
use crate::scan::is_heif;

#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Output surface size in pixels.
    pub display: (u32, u32),
    pub max_dimension: u32,
    pub portrait_pairs: bool,
    pub edge_blur: Option<EdgeBlur>,
    pub meta: MetaOptions,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            display: (1920, 1080),
            max_dimension: 1920,
            portrait_pairs: false,
            edge_blur: None,
            meta: MetaOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already shown this pass as the right half of a pair.
    AlreadyPaired,
    OutsideDateRange,
}

#[derive(Debug)]
pub struct Prepared {
    pub image: RgbaImage,
    /// Catalog index of the (left) picture.
    pub index: usize,
    /// Catalog index of the right-hand portrait when paired.
    pub partner: Option<usize>,
}

#[derive(Debug)]
pub enum Outcome {
    Ready(Prepared),
    Skip(SkipReason),
}

#[derive(Debug, Clone, Default)]
pub struct Preparer {
    opts: PrepareOptions,
}

impl Preparer {
    pub fn new(opts: PrepareOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PrepareOptions {
        &self.opts
    }

    /// Prepare the record at `index`, pairing it with a later portrait when
    /// enabled.
    ///
    /// # Errors
    /// Decode and processing failures; callers treat these as unusable.
    pub fn prepare(
        &self,
        catalog: &mut Catalog,
        index: usize,
        range: &DateRange,
    ) -> Result<Outcome, Error> {
        let Some(record) = catalog.get_mut(index) else {
            return Err(Error::Processing(format!("no picture at index {index}")));
        };
        if record.shown_as_partner() {
            return Ok(Outcome::Skip(SkipReason::AlreadyPaired));
        }
        let meta = record.ensure_meta(&self.opts.meta);
        if !range.contains(meta) {
            return Ok(Outcome::Skip(SkipReason::OutsideDateRange));
        }
        let portrait = meta.is_portrait();
        let orientation = meta.orientation;
        let path = record.path.clone();
        let earlier_partner = match record.pairing {
            Some(Pairing::Lead { partner }) => Some(partner),
            _ => None,
        };

        let mut image = decode_rgba(&path)?;
        let mut partner = None;
        if self.opts.portrait_pairs && portrait {
            let candidate = earlier_partner.or_else(|| self.find_partner(catalog, index));
            if let Some(other) = candidate
                && let Some(paired) = self.pair_with(catalog, &image, orientation, other)
            {
                catalog.pair(index, other);
                image = paired;
                partner = Some(other);
            }
        }

        let image = if partner.is_some() {
            downsize(image, self.opts.max_dimension)?
        } else {
            orient(downsize(image, self.opts.max_dimension)?, orientation)
        };
        let image = self.finish(image)?;
        Ok(Outcome::Ready(Prepared {
            image,
            index,
            partner,
        }))
    }

    /// [`Self::prepare`] with skips and failures folded into `None`.
    pub fn try_prepare(
        &self,
        catalog: &mut Catalog,
        index: usize,
        range: &DateRange,
    ) -> Option<Prepared> {
        match self.prepare(catalog, index, range) {
            Ok(Outcome::Ready(prepared)) => Some(prepared),
            Ok(Outcome::Skip(reason)) => {
                debug!(index, ?reason, "picture skipped");
                None
            }
            Err(err) => {
                warn!(index, "picture unusable: {err}");
                None
            }
        }
    }

    /// Prepare a file outside the catalog, such as the placeholder image.
    /// EXIF orientation is ignored.
    pub fn prepare_path(&self, path: &Path) -> Result<RgbaImage, Error> {
        let image = downsize(decode_rgba(path)?, self.opts.max_dimension)?;
        self.finish(image)
    }

    fn finish(&self, image: RgbaImage) -> Result<RgbaImage, Error> {
        match &self.opts.edge_blur {
            Some(blur) => Ok(edge_blur_composite(&image, self.opts.display, blur)?.unwrap_or(image)),
            None => Ok(image),
        }
    }

    /// First later portrait that is not yet part of a pair.
    fn find_partner(&self, catalog: &mut Catalog, index: usize) -> Option<usize> {
        (index + 1..catalog.len()).find(|&j| {
            catalog.get_mut(j).is_some_and(|rec| {
                rec.ensure_meta(&self.opts.meta);
                rec.pairing.is_none() && rec.is_portrait()
            })
        })
    }

    fn pair_with(
        &self,
        catalog: &Catalog,
        lead: &RgbaImage,
        lead_orientation: u16,
        other: usize,
    ) -> Option<RgbaImage> {
        let rec = catalog.get(other)?;
        let right = match decode_rgba(&rec.path) {
            Ok(img) => orient(img, rec.orientation()),
            Err(err) => {
                debug!("portrait partner unusable: {err}");
                return None;
            }
        };
        let left = orient(lead.clone(), lead_orientation);
        match combine_pair(left, right) {
            Ok(img) => Some(img),
            Err(err) => {
                warn!("failed to pair portraits: {err}");
                None
            }
        }
    }
}

/// Decode any supported format into RGBA8.
///
/// # Errors
/// [`Error::UnsupportedFormat`] for HEIF/HEIC without touching the file.
pub fn decode_rgba(path: &Path) -> Result<RgbaImage, Error> {
    if is_heif(path) {
        return Err(Error::UnsupportedFormat(path.to_path_buf()));
    }
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| Error::decode(path, e))?;
    Ok(img.to_rgba8())
}
