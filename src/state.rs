//! Playback parameters that can be tuned at runtime.

use std::ops::{BitOr, BitOrAssign};

use chrono::NaiveDate;

use crate::catalog::DateRange;
use crate::config::{Configuration, TextField};

/// Longest slide, fade or caption duration accepted at runtime, in seconds.
pub const MAX_INTERVAL_SECS: f64 = 7.0 * 24.0 * 3600.0;

/// A usable runtime duration: finite, positive and at most
/// [`MAX_INTERVAL_SECS`].
fn interval(seconds: f64) -> Option<f64> {
    (seconds.is_finite() && seconds > 0.0).then(|| seconds.min(MAX_INTERVAL_SECS))
}

/// Bitmask selecting which caption parts are drawn over a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct TextFlags(u8);

impl TextFlags {
    pub const NONE: Self = Self(0);
    pub const NAME: Self = Self(1);
    pub const DATE: Self = Self(2);
    pub const LOCATION: Self = Self(4);
    pub const FOLDER: Self = Self(8);

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn toggle(&mut self, other: Self) {
        self.0 ^= other.0;
    }

    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a TextField>) -> Self {
        fields.into_iter().fold(Self::NONE, |acc, field| {
            acc | match field {
                TextField::Name => Self::NAME,
                TextField::Date => Self::DATE,
                TextField::Location => Self::LOCATION,
                TextField::Folder => Self::FOLDER,
            }
        })
    }
}

impl BitOr for TextFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TextFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Process-wide playback state. Owned by the presentation loop; other tasks
/// change it only by sending [`crate::events::ControlMessage`] values.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    /// Seconds each slide stays up.
    pub time_delay: f64,
    /// Seconds spent cross-fading into a new slide.
    pub fade_time: f64,
    /// Alpha increment applied per frame while fading.
    pub fade_step: f32,
    pub fps: f32,
    pub shuffle: bool,
    pub subdirectory: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub paused: bool,
    pub quit: bool,
    pub text: TextFlags,
    /// Seconds a caption stays visible.
    pub text_duration: f64,
    pub brightness: f32,
}

impl PlaybackState {
    pub fn from_config(cfg: &Configuration) -> Self {
        let mut state = Self {
            time_delay: cfg.time_delay.as_secs_f64(),
            fade_time: cfg.fade_time.as_secs_f64(),
            fade_step: 1.0,
            fps: cfg.fps,
            shuffle: cfg.shuffle,
            subdirectory: cfg.subdirectory.clone(),
            date_from: cfg.date_from,
            date_to: cfg.date_to,
            paused: false,
            quit: false,
            text: TextFlags::from_fields(&cfg.text.show),
            text_duration: cfg.text.duration.as_secs_f64(),
            brightness: 1.0,
        };
        state.set_fade_time(state.fade_time);
        state
    }

    /// Change how long each slide stays up. Unusable values are ignored.
    pub fn set_time_delay(&mut self, seconds: f64) {
        if let Some(seconds) = interval(seconds) {
            self.time_delay = seconds;
        }
    }

    /// Change how long captions stay visible. Unusable values are ignored.
    pub fn set_text_duration(&mut self, seconds: f64) {
        if let Some(seconds) = interval(seconds) {
            self.text_duration = seconds;
        }
    }

    /// Update the fade duration and the derived per-frame increment.
    pub fn set_fade_time(&mut self, seconds: f64) {
        if let Some(seconds) = interval(seconds) {
            self.fade_time = seconds;
        }
        let frames = f64::from(self.fps) * self.fade_time;
        self.fade_step = if frames > 0.0 {
            (1.0 / frames) as f32
        } else {
            1.0
        };
    }

    #[must_use]
    pub fn date_range(&self) -> DateRange {
        DateRange {
            from: self.date_from,
            to: self.date_to,
        }
    }

    /// Whether a caption should be composed for the current slide.
    #[must_use]
    pub fn wants_caption(&self) -> bool {
        !self.text.is_empty() || self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_flags_round_trips() {
        let mut flags = TextFlags::NAME | TextFlags::DATE;
        flags.toggle(TextFlags::DATE);
        assert_eq!(flags, TextFlags::NAME);
        flags.toggle(TextFlags::LOCATION);
        assert!(flags.contains(TextFlags::LOCATION));
        assert_eq!(flags.bits(), 5);
    }

    #[test]
    fn fade_step_follows_fps_and_duration() {
        let cfg = Configuration::default();
        let mut state = PlaybackState::from_config(&cfg);
        state.fps = 20.0;
        state.set_fade_time(2.0);
        assert!((state.fade_step - 0.025).abs() < 1e-6);

        // Non-positive durations keep the previous value.
        state.set_fade_time(0.0);
        assert!((state.fade_time - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn runtime_durations_reject_non_finite_and_clamp_large() {
        let mut state = PlaybackState::from_config(&Configuration::default());
        let delay = state.time_delay;
        state.set_time_delay(f64::INFINITY);
        state.set_time_delay(f64::NAN);
        state.set_time_delay(-3.0);
        assert!((state.time_delay - delay).abs() < f64::EPSILON);

        state.set_fade_time(1e300);
        assert!((state.fade_time - MAX_INTERVAL_SECS).abs() < f64::EPSILON);
        assert!(state.fade_step > 0.0);

        state.set_text_duration(1e300);
        assert!((state.text_duration - MAX_INTERVAL_SECS).abs() < f64::EPSILON);
    }
}
