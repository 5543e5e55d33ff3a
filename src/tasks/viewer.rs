//! Frame-paced presentation loop.
//!
//! [`Slideshow`] owns the catalog, cursor and playback state and advances
//! them one tick at a time. [`run`] drives it from a tokio interval, applies
//! control messages between ticks and hands each [`Frame`] to a [`Renderer`].

mod overlay;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use image::{Rgba, RgbaImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{self, Catalog, CatalogOptions};
use crate::config::Configuration;
use crate::error::Error;
use crate::events::ControlMessage;
use crate::playlist::{Advance, Cursor, PassPolicy};
use crate::processing::layout::Placement;
use crate::processing::prepare::{Prepared, Preparer};
use crate::scan::DirectoryWatch;
use crate::state::{PlaybackState, TextFlags};

pub use overlay::{CaptionStyle, NO_IMAGES, PAUSED, SEPARATOR, smoothstep, text_alpha};

/// A prepared picture on its way to the screen.
#[derive(Debug, Clone)]
pub struct Slide {
    pub image: Arc<RgbaImage>,
    pub path: PathBuf,
    /// Catalog index, `None` for the placeholder.
    pub index: Option<usize>,
    pub partner: Option<usize>,
    /// Centred placement before any pan.
    pub base: Placement,
    /// Placement for the current tick.
    pub placement: Placement,
}

impl Slide {
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.index.is_none()
    }
}

/// Everything a renderer needs to draw one tick.
#[derive(Debug)]
pub struct Frame<'a> {
    pub foreground: Option<&'a Slide>,
    pub background: Option<&'a Slide>,
    /// Foreground weight of the cross-fade, eased.
    pub blend: f32,
    pub caption: &'a str,
    pub caption_alpha: f32,
    pub brightness: f32,
}

/// Draws frames. Implementations own whatever display surface they use.
pub trait Renderer {
    fn present(&mut self, frame: &Frame<'_>) -> Result<()>;
}

/// Headless renderer that logs slide and caption changes.
#[derive(Debug, Default)]
pub struct TracingRenderer {
    last_path: Option<PathBuf>,
    last_caption: String,
}

impl Renderer for TracingRenderer {
    fn present(&mut self, frame: &Frame<'_>) -> Result<()> {
        if let Some(fg) = frame.foreground
            && self.last_path.as_ref() != Some(&fg.path)
        {
            let (width, height) = fg.image.dimensions();
            info!(
                path = %fg.path.display(),
                width,
                height,
                paired = fg.partner.is_some(),
                "showing picture"
            );
            self.last_path = Some(fg.path.clone());
        }
        if frame.caption_alpha > 0.0 && frame.caption != self.last_caption {
            debug!(caption = frame.caption, "caption");
            self.last_caption = frame.caption.to_string();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum TextClock {
    /// Recompose the caption on the next tick, showing it after `delay` seconds.
    Restart { delay: f64 },
    Since(Instant),
}

pub struct Slideshow {
    cfg: Configuration,
    state: PlaybackState,
    catalog: Catalog,
    cursor: Cursor,
    preparer: Preparer,
    watch: DirectoryWatch,
    rng: StdRng,
    captions: CaptionStyle,
    foreground: Option<Slide>,
    background: Option<Slide>,
    placeholder: Option<Slide>,
    /// Linear fade position of the foreground, 0..=1.
    alpha: f32,
    next_slide_at: Option<Instant>,
    slide_secs: f32,
    force: bool,
    exhausted: bool,
    text_clock: TextClock,
    caption: String,
    caption_alpha: f32,
}

impl Slideshow {
    /// Build the initial catalog and an idle show; the first [`Self::update`]
    /// puts a picture up.
    pub fn new(cfg: Configuration, mut rng: StdRng) -> Self {
        let state = PlaybackState::from_config(&cfg);
        let mut watch = DirectoryWatch::new(&cfg.pic_dir, cfg.check_dir_interval);
        let catalog = catalog::build(&catalog_options(&cfg, &state), Some(&mut watch), &mut rng);
        let preparer = Preparer::new(cfg.prepare_options());
        let captions = CaptionStyle::new(cfg.text.codepoints.as_deref(), cfg.text.load_geoloc);
        Self {
            cfg,
            state,
            catalog,
            cursor: Cursor::new(),
            preparer,
            watch,
            rng,
            captions,
            foreground: None,
            background: None,
            placeholder: None,
            alpha: 0.0,
            next_slide_at: None,
            slide_secs: 0.0,
            force: false,
            exhausted: false,
            text_clock: TextClock::Restart { delay: 0.0 },
            caption: String::new(),
            caption_alpha: 0.0,
        }
    }

    /// [`Self::new`] seeded from `shuffle-seed` or the OS.
    pub fn from_config(cfg: Configuration) -> Self {
        let rng = match cfg.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(cfg, rng)
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn foreground(&self) -> Option<&Slide> {
        self.foreground.as_ref()
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Linear fade position of the current slide.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn showing_placeholder(&self) -> bool {
        self.foreground.as_ref().is_some_and(Slide::is_placeholder)
    }

    /// Advance the show to `now`. Returns `true` when a new slide went up.
    pub fn update(&mut self, now: Instant) -> bool {
        let paused = self.state.paused;
        let due = self.force || self.next_slide_at.is_none_or(|at| !paused && now >= at);
        if due {
            self.next_slide(now);
        }

        if let TextClock::Restart { delay } = self.text_clock {
            self.caption = self.compose_caption();
            self.text_clock = TextClock::Since(later(now, seconds(delay)));
        }

        if self.cfg.kenburns
            && let (Some(fg), Some(at)) = (self.foreground.as_mut(), self.next_slide_at)
        {
            let remaining = at.saturating_duration_since(now).as_secs_f32();
            fg.placement = fg.base.panned(remaining, self.slide_secs);
        }

        if self.alpha < 1.0 {
            self.alpha = (self.alpha + self.state.fade_step).min(1.0);
        } else if self.watch.poll(now) {
            info!("picture directory changed; rebuilding catalog");
            self.rebuild();
        }

        self.caption_alpha = self.caption_alpha_at(now);
        due
    }

    /// Snapshot of the current tick for a renderer.
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            foreground: self.foreground.as_ref(),
            background: self.background.as_ref(),
            blend: smoothstep(self.alpha),
            caption: &self.caption,
            caption_alpha: self.caption_alpha,
            brightness: self.state.brightness,
        }
    }

    /// Apply a control request. Changes take effect on the next tick.
    pub fn apply(&mut self, msg: ControlMessage) {
        debug!(?msg, "control message");
        match msg {
            ControlMessage::DateFrom(date) => {
                self.state.date_from = date;
                self.rebuild();
            }
            ControlMessage::DateTo(date) => {
                self.state.date_to = date;
                self.rebuild();
            }
            ControlMessage::TimeDelay(secs) => self.state.set_time_delay(secs),
            ControlMessage::FadeTime(secs) => self.state.set_fade_time(secs),
            ControlMessage::Shuffle(on) => {
                self.state.shuffle = on;
                self.rebuild();
            }
            ControlMessage::Quit => self.state.quit = true,
            ControlMessage::Paused(paused) => {
                self.state.paused = paused.unwrap_or(!self.state.paused);
                self.restart_text();
            }
            ControlMessage::Back => {
                self.cursor.back();
                self.refresh();
            }
            ControlMessage::Next => self.refresh(),
            ControlMessage::Subdirectory(dir) => {
                self.state.subdirectory = dir;
                self.rebuild();
            }
            ControlMessage::Delete => {
                self.delete_current();
                self.refresh();
            }
            ControlMessage::ShowText { field, duration } => {
                self.state.set_text_duration(if duration > 2.0 {
                    duration
                } else {
                    0.33 * self.cfg.time_delay.as_secs_f64()
                });
                self.state.text.toggle(field);
                self.restart_text();
            }
            ControlMessage::TextOff => {
                self.state.text = TextFlags::NONE;
                self.restart_text();
            }
            ControlMessage::TextRefresh => {
                self.cursor.replay();
                self.refresh();
            }
            ControlMessage::Brightness(level) => self.state.brightness = level,
        }
    }

    /// Catalog order for the next `count` advances, without decoding pixels.
    pub fn plan(&mut self, count: usize) -> Vec<PathBuf> {
        let policy = self.pass_policy();
        let range = self.state.date_range();
        let meta = self.cfg.meta_options();
        let mut order = Vec::with_capacity(count);
        for _ in 0..count {
            let step = self
                .cursor
                .advance(&mut self.catalog, policy, &mut self.rng, |cat, i| {
                    let rec = cat.get_mut(i)?;
                    if rec.shown_as_partner() {
                        return None;
                    }
                    let inside = range.contains(rec.ensure_meta(&meta));
                    inside.then(|| rec.path.clone())
                });
            match step {
                Advance::Shown { item, .. } => order.push(item),
                Advance::Exhausted => break,
            }
        }
        order
    }

    fn pass_policy(&self) -> PassPolicy {
        PassPolicy {
            shuffle: self.state.shuffle,
            reshuffle_after: self.cfg.reshuffle_num,
        }
    }

    fn next_slide(&mut self, now: Instant) {
        self.force = false;
        let delay = seconds(self.state.time_delay.max(0.001));
        self.next_slide_at = Some(later(now, delay));
        self.slide_secs = delay.as_secs_f32();

        let mut incoming = None;
        if !self.exhausted && !self.catalog.is_empty() {
            let policy = self.pass_policy();
            let range = self.state.date_range();
            let preparer = &self.preparer;
            let step = self
                .cursor
                .advance(&mut self.catalog, policy, &mut self.rng, |cat, i| {
                    preparer.try_prepare(cat, i, &range)
                });
            match step {
                Advance::Shown { item, .. } => incoming = Some(self.slide_from(item)),
                Advance::Exhausted => {
                    warn!(
                        pictures = self.catalog.len(),
                        "no usable pictures; showing placeholder"
                    );
                    self.exhausted = true;
                }
            }
        }

        let slide = match incoming {
            Some(slide) => slide,
            None => self.placeholder(),
        };
        let previous = self.foreground.take();
        self.background = match previous {
            Some(prev) if !slide.is_placeholder() => Some(prev),
            _ => Some(slide.clone()),
        };
        self.foreground = Some(slide);
        self.alpha = 0.0;
        self.text_clock = TextClock::Restart {
            delay: self.state.fade_time,
        };
    }

    fn slide_from(&self, prepared: Prepared) -> Slide {
        let path = self
            .catalog
            .get(prepared.index)
            .map(|r| r.path.clone())
            .unwrap_or_default();
        let base = Placement::new(
            (self.cfg.display.width, self.cfg.display.height),
            prepared.image.dimensions(),
            self.cfg.fit,
        );
        Slide {
            image: Arc::new(prepared.image),
            path,
            index: Some(prepared.index),
            partner: prepared.partner,
            base,
            placement: base,
        }
    }

    fn placeholder(&mut self) -> Slide {
        if let Some(slide) = &self.placeholder {
            return slide.clone();
        }
        let display = (self.cfg.display.width, self.cfg.display.height);
        let path = self.cfg.no_files_img.clone();
        let image = match self.preparer.prepare_path(&path) {
            Ok(img) => img,
            Err(err) => {
                warn!("placeholder image unavailable: {err}");
                RgbaImage::from_pixel(display.0, display.1, Rgba([0, 0, 0, 255]))
            }
        };
        let base = Placement::new(display, image.dimensions(), self.cfg.fit);
        let slide = Slide {
            image: Arc::new(image),
            path,
            index: None,
            partner: None,
            base,
            placement: base,
        };
        self.placeholder = Some(slide.clone());
        slide
    }

    /// Catalog index of the picture on screen, if it is still listed.
    fn current_index(&self) -> Option<usize> {
        let fg = self.foreground.as_ref()?;
        let index = fg.index?;
        match self.catalog.get(index) {
            Some(rec) if rec.path == fg.path => Some(index),
            _ => self.catalog.iter().position(|r| r.path == fg.path),
        }
    }

    fn compose_caption(&self) -> String {
        if self.showing_placeholder() {
            return NO_IMAGES.to_string();
        }
        if !self.state.wants_caption() {
            return String::new();
        }
        let record = self.current_index().and_then(|i| self.catalog.get(i));
        self.captions
            .compose(record, self.state.text, self.state.paused)
    }

    fn caption_alpha_at(&self, now: Instant) -> f32 {
        if self.showing_placeholder() {
            return 1.0;
        }
        let TextClock::Since(start) = self.text_clock else {
            return 0.0;
        };
        if !self.state.wants_caption() || self.caption.is_empty() {
            return 0.0;
        }
        let elapsed = if now >= start {
            (now - start).as_secs_f64()
        } else {
            -(start - now).as_secs_f64()
        };
        if elapsed >= self.state.text_duration {
            return 0.0;
        }
        text_alpha(elapsed, self.state.text_duration, self.alpha)
    }

    fn restart_text(&mut self) {
        self.text_clock = TextClock::Restart { delay: 0.0 };
    }

    /// End the current slide on the next tick.
    fn refresh(&mut self) {
        self.force = true;
        self.cursor.refresh_pairings(&mut self.catalog);
    }

    fn rebuild(&mut self) {
        let opts = catalog_options(&self.cfg, &self.state);
        self.catalog = catalog::build(&opts, Some(&mut self.watch), &mut self.rng);
        self.cursor.reset();
        self.exhausted = false;
        if self.showing_placeholder() {
            self.force = true;
        }
    }

    fn delete_current(&mut self) {
        let Some(index) = self.current_index() else {
            debug!("nothing on screen to delete");
            return;
        };
        let Some(path) = self.catalog.get(index).map(|r| r.path.clone()) else {
            return;
        };
        match quarantine(&path, &self.cfg.deleted_pictures_dir) {
            Ok(dest) => {
                info!(
                    from = %path.display(),
                    to = %dest.display(),
                    "moved picture to deleted pictures"
                );
                self.catalog.remove(index);
                self.cursor.removed(index);
            }
            Err(err) => warn!("{err}"),
        }
    }
}

/// `secs` as a [`Duration`]; negative or unrepresentable values become zero.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::ZERO)
}

/// `now + delay`, saturating at `now` when the sum overflows.
fn later(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay).unwrap_or(now)
}

fn catalog_options(cfg: &Configuration, state: &PlaybackState) -> CatalogOptions {
    CatalogOptions {
        root: cfg.picture_root(&state.subdirectory),
        range: state.date_range(),
        shuffle: state.shuffle,
        recent_n: cfg.recent_n,
        deferred: cfg.delay_exif,
        meta: cfg.meta_options(),
    }
}

/// Move `path` into `dir`, creating it if needed. Falls back to copy and
/// remove when a rename crosses filesystems.
pub fn quarantine(path: &Path, dir: &Path) -> Result<PathBuf, Error> {
    let fail = |source| Error::Quarantine {
        path: path.to_path_buf(),
        dest: dir.to_path_buf(),
        source,
    };
    fs::create_dir_all(dir).map_err(fail)?;
    let name = path
        .file_name()
        .ok_or_else(|| fail(io::Error::new(io::ErrorKind::InvalidInput, "no file name")))?;
    let dest = dir.join(name);
    if let Err(err) = fs::rename(path, &dest) {
        debug!("rename failed ({err}); copying instead");
        fs::copy(path, &dest).map_err(fail)?;
        fs::remove_file(path).map_err(fail)?;
    }
    Ok(dest)
}

/// Drive `show` at its configured frame rate until cancelled or asked to quit.
pub async fn run<R: Renderer>(
    mut show: Slideshow,
    mut renderer: R,
    mut control: Receiver<ControlMessage>,
    cancel: CancellationToken,
) -> Result<()> {
    let period = Duration::from_secs_f32(1.0 / show.state().fps.max(0.1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        pictures = show.catalog().len(),
        fps = show.state().fps,
        "presentation loop started"
    );

    loop {
        select! {
            _ = cancel.cancelled() => break,
            Some(msg) = control.recv() => show.apply(msg),
            _ = ticker.tick() => {
                show.update(Instant::now());
                renderer.present(&show.frame())?;
            }
        }
        if show.state().quit {
            info!("quit requested");
            cancel.cancel();
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarantine_moves_file() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.jpg");
        fs::write(&src, b"x").unwrap();
        let dir = tmp.path().join("deleted").join("nested");

        let dest = quarantine(&src, &dir).unwrap();
        assert_eq!(dest, dir.join("a.jpg"));
        assert!(dest.exists());
        assert!(!src.exists());
    }

    #[test]
    fn quarantine_reports_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let err = quarantine(&tmp.path().join("gone.jpg"), tmp.path()).unwrap_err();
        assert!(matches!(err, Error::Quarantine { .. }));
    }
}
