//! MQTT topic names and payload parsing for remote control.

use chrono::NaiveDate;

use crate::events::ControlMessage;
use crate::state::TextFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    DateFrom,
    DateTo,
    TimeDelay,
    FadeTime,
    Shuffle,
    Quit,
    Paused,
    Back,
    Next,
    Subdirectory,
    Delete,
    TextOn,
    DateOn,
    LocationOn,
    TextOff,
    TextRefresh,
    Brightness,
}

impl Topic {
    pub const ALL: [Self; 17] = [
        Self::DateFrom,
        Self::DateTo,
        Self::TimeDelay,
        Self::FadeTime,
        Self::Shuffle,
        Self::Quit,
        Self::Paused,
        Self::Back,
        Self::Next,
        Self::Subdirectory,
        Self::Delete,
        Self::TextOn,
        Self::DateOn,
        Self::LocationOn,
        Self::TextOff,
        Self::TextRefresh,
        Self::Brightness,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DateFrom => "date_from",
            Self::DateTo => "date_to",
            Self::TimeDelay => "time_delay",
            Self::FadeTime => "fade_time",
            Self::Shuffle => "shuffle",
            Self::Quit => "quit",
            Self::Paused => "paused",
            Self::Back => "back",
            Self::Next => "next",
            Self::Subdirectory => "subdirectory",
            Self::Delete => "delete",
            Self::TextOn => "text_on",
            Self::DateOn => "date_on",
            Self::LocationOn => "location_on",
            Self::TextOff => "text_off",
            Self::TextRefresh => "text_refresh",
            Self::Brightness => "brightness",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Build the control message for a payload received on this topic.
    pub fn message(self, payload: &str) -> ControlMessage {
        match self {
            Self::DateFrom => ControlMessage::DateFrom(parse_date(payload)),
            Self::DateTo => ControlMessage::DateTo(parse_date(payload)),
            Self::TimeDelay => ControlMessage::TimeDelay(parse_number(payload)),
            Self::FadeTime => ControlMessage::FadeTime(parse_number(payload)),
            Self::Shuffle => ControlMessage::Shuffle(parse_bool(payload).unwrap_or(false)),
            Self::Quit => ControlMessage::Quit,
            Self::Paused => ControlMessage::Paused(parse_bool(payload)),
            Self::Back => ControlMessage::Back,
            Self::Next => ControlMessage::Next,
            Self::Subdirectory => ControlMessage::Subdirectory(payload.trim().to_string()),
            Self::Delete => ControlMessage::Delete,
            Self::TextOn => show_text(TextFlags::NAME, payload),
            Self::DateOn => show_text(TextFlags::DATE, payload),
            Self::LocationOn => show_text(TextFlags::LOCATION, payload),
            Self::TextOff => ControlMessage::TextOff,
            Self::TextRefresh => ControlMessage::TextRefresh,
            Self::Brightness => ControlMessage::Brightness(parse_number(payload) as f32),
        }
    }
}

fn show_text(field: TextFlags, payload: &str) -> ControlMessage {
    ControlMessage::ShowText {
        field,
        duration: parse_number(payload),
    }
}

/// Full topic names for one installation.
#[derive(Debug, Clone)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    /// Topics are `<id>/<name>`, or bare names when `id` is empty.
    pub fn new(id: &str) -> Self {
        let id = id.trim();
        let prefix = if id.is_empty() {
            String::new()
        } else {
            format!("{id}/")
        };
        Self { prefix }
    }

    pub fn full_name(&self, topic: Topic) -> String {
        format!("{}{}", self.prefix, topic.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Topic, String)> + '_ {
        Topic::ALL.into_iter().map(|t| (t, self.full_name(t)))
    }

    /// Translate an incoming publish into a control message.
    ///
    /// Returns `None` for topics outside this installation's namespace.
    pub fn parse(&self, topic: &str, payload: &[u8]) -> Option<ControlMessage> {
        let name = topic.strip_prefix(self.prefix.as_str())?;
        let topic = Topic::from_name(name)?;
        let payload = String::from_utf8_lossy(payload);
        Some(topic.message(&payload))
    }
}

/// `on`/`true`/`yes` and `off`/`false`/`no`, case-insensitive.
pub fn parse_bool(payload: &str) -> Option<bool> {
    match payload.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Parse `year:month:day`, also accepting `/`, `-` and `.` as separators.
/// Anything else, including impossible dates, yields `None`.
pub fn parse_date(payload: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = payload.trim().split([':', '/', '-', '.']).collect();
    let [y, m, d] = parts.as_slice() else {
        return None;
    };
    NaiveDate::from_ymd_opt(
        y.trim().parse().ok()?,
        m.trim().parse().ok()?,
        d.trim().parse().ok()?,
    )
}

/// Numeric payload, 0.0 when it does not parse or is not finite.
pub fn parse_number(payload: &str) -> f64 {
    payload
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}
