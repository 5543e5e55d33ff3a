//! Directory scanning utilities for discovering picture files.

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

/// Extensions recognised as pictures (lowercase, without dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "heif", "heic"];

/// Listed so the catalog matches the folder contents, but the `image` crate
/// has no HEIF decoder; such files are reported unusable at display time.
pub const HEIF_EXTENSIONS: &[&str] = &["heif", "heic"];

/// Sidecar directory some file servers sprinkle through shared trees.
const APPLE_DOUBLE: &str = ".AppleDouble";

/// One candidate file found by [`scan_pictures`].
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Result of walking a picture tree.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: Vec<ScannedFile>,
    /// Newest modification time seen on any walked directory.
    pub newest_dir_change: Option<SystemTime>,
}

fn has_extension(path: &Path, list: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            list.iter().any(|e| *e == ext)
        })
}

/// Return `true` if `path` has a supported picture extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, SUPPORTED_EXTENSIONS)
}

#[must_use]
pub fn is_heif(path: &Path) -> bool {
    has_extension(path, HEIF_EXTENSIONS)
}

/// Recursively collect pictures below `root`.
///
/// # Errors
/// Returns [`Error::BadDir`] if `root` is missing or not a directory.
pub fn scan_pictures(root: &Path) -> Result<ScanResult, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.display().to_string()));
    }

    let mut out = ScanResult::default();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !should_skip(e))
        .flatten()
    {
        let Ok(md) = entry.metadata() else {
            continue;
        };
        let modified = md.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if md.is_dir() {
            bump(&mut out.newest_dir_change, modified);
        } else if md.is_file() && is_supported_image(entry.path()) {
            out.files.push(ScannedFile {
                path: entry.into_path(),
                modified,
            });
        }
    }
    Ok(out)
}

fn bump(slot: &mut Option<SystemTime>, t: SystemTime) {
    if slot.is_none_or(|seen| t > seen) {
        *slot = Some(t);
    }
}

fn should_skip(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    // Dotfiles, hidden directories and AppleDouble sidecars.
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.') || n == APPLE_DOUBLE)
}

/// Polls the picture tree for directory modifications.
///
/// Adding or removing a file bumps its parent directory's mtime, so tracking
/// the newest directory mtime is enough to notice catalog changes.
#[derive(Debug)]
pub struct DirectoryWatch {
    root: PathBuf,
    last_change: Option<SystemTime>,
    interval: std::time::Duration,
    next_check: Option<Instant>,
}

impl DirectoryWatch {
    pub fn new(root: impl Into<PathBuf>, interval: std::time::Duration) -> Self {
        Self {
            root: root.into(),
            last_change: None,
            interval,
            next_check: None,
        }
    }

    /// Record a change time observed while building the catalog.
    pub fn observe(&mut self, t: Option<SystemTime>) {
        if let Some(t) = t {
            bump(&mut self.last_change, t);
        }
    }

    #[must_use]
    pub fn last_change(&self) -> Option<SystemTime> {
        self.last_change
    }

    /// Walk the tree and report whether any directory changed since the last
    /// observation.
    pub fn check_changes(&mut self) -> bool {
        let mut changed = false;
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.file_type().is_dir() && !should_skip(e))
            .flatten()
        {
            let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) else {
                continue;
            };
            if self.last_change.is_none_or(|seen| modified > seen) {
                debug!(dir = %entry.path().display(), "directory changed");
                self.last_change = Some(modified);
                changed = true;
            }
        }
        changed
    }

    /// Rate-limited [`Self::check_changes`]; returns `false` until the poll
    /// interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_check {
            Some(at) if now < at => false,
            Some(_) => {
                self.next_check = Some(now + self.interval);
                self.check_changes()
            }
            None => {
                self.next_check = Some(now + self.interval);
                false
            }
        }
    }
}
