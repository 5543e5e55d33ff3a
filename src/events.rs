use chrono::NaiveDate;

use crate::state::TextFlags;

/// Runtime control request delivered to the presentation loop.
///
/// Produced by the MQTT listener and the keyboard reader; applied only by
/// the task that owns the playback state.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// `None` clears the lower bound.
    DateFrom(Option<NaiveDate>),
    /// `None` clears the upper bound.
    DateTo(Option<NaiveDate>),
    /// Seconds per slide; ignored unless positive.
    TimeDelay(f64),
    /// Cross-fade seconds; ignored unless positive.
    FadeTime(f64),
    Shuffle(bool),
    Quit,
    /// `None` toggles.
    Paused(Option<bool>),
    Back,
    Next,
    Subdirectory(String),
    /// Move the picture on screen to the deleted-pictures directory.
    Delete,
    /// Toggle caption parts; `duration` is the requested display time in
    /// seconds (short values select the default).
    ShowText { field: TextFlags, duration: f64 },
    TextOff,
    /// Show the current picture again, restarting its caption.
    TextRefresh,
    Brightness(f32),
}
