//! The ordered list of pictures currently eligible for display.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::meta::{self, DEFAULT_ASPECT, MetaOptions, MetaState, PictureMeta};
use crate::scan::{self, DirectoryWatch};

/// Link between two portrait pictures shown together in one frame.
///
/// Indices point into the owning [`Catalog`] and are cleared in bulk whenever
/// the catalog is reordered or shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    /// Shown as the left half; `partner` filled the right half.
    Lead { partner: usize },
    /// Shown as the right half of `lead`'s frame.
    Partner { lead: usize },
}

impl Pairing {
    #[must_use]
    pub const fn other(self) -> usize {
        match self {
            Self::Lead { partner } => partner,
            Self::Partner { lead } => lead,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PictureRecord {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub meta: MetaState,
    pub pairing: Option<Pairing>,
}

impl PictureRecord {
    pub fn new(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            modified,
            meta: MetaState::Pending,
            pairing: None,
        }
    }

    /// Read metadata now if it has not been read yet.
    pub fn ensure_meta(&mut self, opts: &MetaOptions) -> &PictureMeta {
        if self.meta.is_pending() {
            self.meta = meta::resolve(&self.path, opts);
        }
        match &self.meta {
            MetaState::Resolved(m) | MetaState::Fallback(m) => m,
            MetaState::Pending => unreachable!("metadata resolved above"),
        }
    }

    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.meta.meta().map_or(DEFAULT_ASPECT, |m| m.aspect)
    }

    #[must_use]
    pub fn is_portrait(&self) -> bool {
        self.aspect() < 1.0
    }

    #[must_use]
    pub fn orientation(&self) -> u16 {
        self.meta.meta().map_or(1, |m| m.orientation)
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn folder_name(&self) -> &str {
        self.path
            .parent()
            .and_then(Path::file_name)
            .and_then(OsStr::to_str)
            .unwrap_or_default()
    }

    /// Whether this record filled the right half of an earlier frame this pass.
    #[must_use]
    pub fn shown_as_partner(&self) -> bool {
        matches!(self.pairing, Some(Pairing::Partner { .. }))
    }
}

/// Inclusive capture-date filter. `None` bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    #[must_use]
    pub fn contains_date(&self, day: NaiveDate) -> bool {
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }

    /// Whether a picture's capture day falls within the range.
    #[must_use]
    pub fn contains(&self, meta: &PictureMeta) -> bool {
        if self.is_unbounded() {
            return true;
        }
        meta.taken_on().is_some_and(|day| self.contains_date(day))
    }
}

/// Inputs for [`build`].
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub root: PathBuf,
    pub range: DateRange,
    pub shuffle: bool,
    /// Size of the "most recent" partition shuffled to the front.
    pub recent_n: usize,
    /// Leave metadata unread until display time.
    pub deferred: bool,
    pub meta: MetaOptions,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<PictureRecord>,
}

impl Catalog {
    /// Wrap an already ordered list of records.
    pub fn from_records(records: Vec<PictureRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PictureRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PictureRecord> {
        self.records.get_mut(index)
    }

    #[must_use]
    pub fn records(&self) -> &[PictureRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &PictureRecord> {
        self.records.iter()
    }

    /// Forget every pairing so portraits can be combined again.
    pub fn clear_pairings(&mut self) {
        for record in &mut self.records {
            record.pairing = None;
        }
    }

    /// Forget pairings that point at `index`.
    pub fn clear_pairings_referencing(&mut self, index: usize) {
        for record in &mut self.records {
            if record.pairing.is_some_and(|p| p.other() == index) {
                record.pairing = None;
            }
        }
    }

    /// Link `lead` and `partner` as shown together this pass.
    pub fn pair(&mut self, lead: usize, partner: usize) {
        if let Some(r) = self.records.get_mut(lead) {
            r.pairing = Some(Pairing::Lead { partner });
        }
        if let Some(r) = self.records.get_mut(partner) {
            r.pairing = Some(Pairing::Partner { lead });
        }
    }

    /// Remove one record in place. Pairing indices shift, so all are reset.
    pub fn remove(&mut self, index: usize) -> Option<PictureRecord> {
        if index >= self.records.len() {
            return None;
        }
        let removed = self.records.remove(index);
        self.clear_pairings();
        Some(removed)
    }

    /// Shuffle the whole catalog (used after N passes).
    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.records.shuffle(rng);
        self.clear_pairings();
    }
}

/// Walk `opts.root` and build an ordered catalog.
///
/// A missing root yields an empty catalog; the show then displays its
/// placeholder instead of failing.
pub fn build<R: Rng + ?Sized>(
    opts: &CatalogOptions,
    watch: Option<&mut DirectoryWatch>,
    rng: &mut R,
) -> Catalog {
    let scanned = match scan::scan_pictures(&opts.root) {
        Ok(scanned) => scanned,
        Err(err) => {
            warn!("{err}; showing no pictures");
            return Catalog::default();
        }
    };
    if let Some(watch) = watch {
        watch.observe(scanned.newest_dir_change);
    }

    let discovered = scanned.files.len();
    let mut records = Vec::with_capacity(discovered);
    for file in scanned.files {
        let mut record = PictureRecord::new(file.path, file.modified);
        if !opts.deferred {
            record.meta = meta::resolve(&record.path, &opts.meta);
            if let Some(m) = record.meta.meta()
                && !opts.range.contains(m)
            {
                debug!(path = %record.path.display(), "outside date range");
                continue;
            }
        }
        records.push(record);
    }

    order_records(&mut records, opts.shuffle, opts.recent_n, rng);
    info!(
        root = %opts.root.display(),
        discovered,
        selected = records.len(),
        shuffle = opts.shuffle,
        deferred = opts.deferred,
        "catalog built"
    );
    Catalog::from_records(records)
}

/// Order records in place: deduplicated, then either alphabetical by path or
/// "most recent `recent_n`" shuffled ahead of the shuffled remainder.
pub fn order_records<R: Rng + ?Sized>(
    records: &mut Vec<PictureRecord>,
    shuffle: bool,
    recent_n: usize,
    rng: &mut R,
) {
    records.sort_by(|a, b| a.path.cmp(&b.path));
    records.dedup_by(|a, b| a.path == b.path);
    if !shuffle {
        return;
    }

    // Stable sort keeps path order among equal mtimes.
    records.sort_by_key(|r| r.modified);
    let split = records.len().saturating_sub(recent_n);
    let mut recent = records.split_off(split);
    recent.shuffle(rng);
    records.shuffle(rng);
    recent.append(records);
    *records = recent;
}
