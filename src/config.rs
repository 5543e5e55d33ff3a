use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;

use crate::meta::MetaOptions;
use crate::processing::blur::EdgeBlur;
use crate::processing::prepare::PrepareOptions;

pub const DEFAULT_PIC_DIR: &str = "/home/pi/Pictures";
pub const DEFAULT_DELETED_DIR: &str = "/home/pi/DeletedPictures";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextField {
    Name,
    Date,
    Location,
    Folder,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DisplaySettings {
    /// Width of the output surface in pixels.
    pub width: u32,
    /// Height of the output surface in pixels.
    pub height: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct TextSettings {
    /// Caption parts shown at startup.
    pub show: Vec<TextField>,
    /// How long a caption stays visible after a slide appears.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// strftime-style pattern for the capture date.
    pub date_format: String,
    /// Characters the caption font can render. Others are dropped.
    pub codepoints: Option<String>,
    /// Read GPS tags into the location caption.
    pub load_geoloc: bool,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            show: Vec::new(),
            duration: Duration::from_secs(20),
            date_format: "%b %d, %Y".to_string(),
            codepoints: None,
            load_geoloc: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct MqttSettings {
    pub enabled: bool,
    pub server: String,
    pub port: u16,
    pub login: Option<String>,
    pub password: Option<String>,
    /// Installation identifier; topics become `<id>/<name>` when set.
    pub id: String,
    pub client_id: String,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            server: "localhost".to_string(),
            port: 1883,
            login: None,
            password: None,
            id: String::new(),
            client_id: "picture-frame".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Root directory scanned recursively for pictures.
    pub pic_dir: PathBuf,
    /// Subdirectory of `pic-dir` to restrict the show to. Empty means all.
    pub subdirectory: String,
    /// Placeholder image shown when nothing else can be displayed.
    pub no_files_img: PathBuf,
    /// Pictures removed through the `delete` control are moved here.
    pub deleted_pictures_dir: PathBuf,
    /// Time each slide stays on screen.
    #[serde(with = "humantime_serde")]
    pub time_delay: Duration,
    /// Duration of the cross-fade between slides.
    #[serde(with = "humantime_serde")]
    pub fade_time: Duration,
    /// Target frame rate of the presentation loop.
    pub fps: f32,
    pub shuffle: bool,
    /// Number of most recently modified files shown first after a shuffle.
    pub recent_n: usize,
    /// Reshuffle after this many full passes through the catalog.
    pub reshuffle_num: u32,
    /// How often the picture tree is polled for changes.
    #[serde(with = "humantime_serde")]
    pub check_dir_interval: Duration,
    /// Read EXIF lazily when a picture is first shown.
    pub delay_exif: bool,
    /// Show two portrait pictures side by side.
    pub portrait_pairs: bool,
    /// Fill letterbox areas with a blurred copy of the picture.
    pub blur_edges: bool,
    pub blur_amount: f32,
    pub blur_zoom: f32,
    pub edge_alpha: f32,
    /// Letterbox instead of crop when aspect ratios differ.
    pub fit: bool,
    /// Slow pan across each slide.
    pub kenburns: bool,
    /// Largest texture edge; bigger pictures are downsized.
    pub max_dimension: u32,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub display: DisplaySettings,
    pub text: TextSettings,
    /// Read single-key commands from the controlling terminal.
    pub keyboard: bool,
    pub mqtt: MqttSettings,
    /// Optional deterministic seed for shuffling.
    pub shuffle_seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            pic_dir: PathBuf::from(DEFAULT_PIC_DIR),
            subdirectory: String::new(),
            no_files_img: PathBuf::from("PictureFrame2020img.jpg"),
            deleted_pictures_dir: PathBuf::from(DEFAULT_DELETED_DIR),
            time_delay: Duration::from_secs(200),
            fade_time: Duration::from_secs(10),
            fps: 20.0,
            shuffle: true,
            recent_n: 4,
            reshuffle_num: 1,
            check_dir_interval: Duration::from_secs(60 * 60),
            delay_exif: true,
            portrait_pairs: false,
            blur_edges: false,
            blur_amount: 12.0,
            blur_zoom: 1.0,
            edge_alpha: 0.5,
            fit: false,
            kenburns: false,
            max_dimension: 1920,
            date_from: None,
            date_to: None,
            display: DisplaySettings::default(),
            text: TextSettings::default(),
            keyboard: false,
            mqtt: MqttSettings::default(),
            shuffle_seed: None,
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(
            !self.pic_dir.as_os_str().is_empty(),
            "pic-dir must not be empty"
        );
        ensure!(self.fps > 0.0, "fps must be positive");
        ensure!(
            !self.time_delay.is_zero(),
            "time-delay must be greater than zero"
        );
        ensure!(
            !self.fade_time.is_zero(),
            "fade-time must be greater than zero"
        );
        ensure!(
            self.max_dimension > 0,
            "max-dimension must be greater than zero"
        );
        ensure!(
            self.display.width > 0 && self.display.height > 0,
            "display width and height must be greater than zero"
        );
        ensure!(
            (0.0..=1.0).contains(&self.edge_alpha),
            "edge-alpha must be within [0, 1]"
        );
        ensure!(self.blur_amount >= 0.0, "blur-amount must not be negative");
        ensure!(
            self.reshuffle_num > 0,
            "reshuffle-num must be greater than zero"
        );
        ensure!(
            !StrftimeItems::new(&self.text.date_format).any(|item| matches!(item, Item::Error)),
            "text.date-format {:?} is not a valid strftime pattern",
            self.text.date_format
        );
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            ensure!(from <= to, "date-from must not be after date-to");
        }
        if self.mqtt.enabled {
            ensure!(
                !self.mqtt.server.trim().is_empty(),
                "mqtt.server must be set when mqtt is enabled"
            );
        }

        if self.blur_zoom < 1.0 {
            self.blur_zoom = 1.0;
        }
        if self.kenburns {
            // Panning needs the cropped fill; letterboxing and edge blur would fight it.
            self.fit = false;
            self.blur_edges = false;
        }
        Ok(self)
    }

    pub fn meta_options(&self) -> MetaOptions {
        MetaOptions {
            date_format: self.text.date_format.clone(),
            load_geoloc: self.text.load_geoloc,
        }
    }

    pub fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions {
            display: (self.display.width, self.display.height),
            max_dimension: self.max_dimension,
            portrait_pairs: self.portrait_pairs,
            edge_blur: self.blur_edges.then_some(EdgeBlur {
                amount: self.blur_amount,
                zoom: self.blur_zoom,
                alpha: self.edge_alpha,
            }),
            meta: self.meta_options(),
        }
    }

    /// Directory the catalog is built from for the given subdirectory.
    pub fn picture_root(&self, subdirectory: &str) -> PathBuf {
        let sub = subdirectory.trim().trim_start_matches('/');
        if sub.is_empty() {
            self.pic_dir.clone()
        } else {
            self.pic_dir.join(sub)
        }
    }
}
