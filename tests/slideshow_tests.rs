use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use image::{Rgba, RgbaImage};
use picture_frame::config::Configuration;
use picture_frame::control::Topics;
use picture_frame::events::ControlMessage;
use picture_frame::state::{MAX_INTERVAL_SECS, TextFlags};
use picture_frame::tasks::viewer::{self, Frame, NO_IMAGES, Renderer, Slideshow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct Fixture {
    _dir: TempDir,
    pics: PathBuf,
    deleted: PathBuf,
}

fn fixture(files: &[(&str, u32, u32)]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let pics = dir.path().join("pics");
    fs::create_dir_all(&pics).unwrap();
    for (name, w, h) in files {
        RgbaImage::from_pixel(*w, *h, Rgba([90, 120, 150, 255]))
            .save(pics.join(name))
            .unwrap();
    }
    let deleted = dir.path().join("deleted");
    Fixture {
        _dir: dir,
        pics,
        deleted,
    }
}

fn config(fx: &Fixture) -> Configuration {
    let mut cfg = Configuration {
        pic_dir: fx.pics.clone(),
        no_files_img: fx.pics.join("missing-placeholder.png"),
        deleted_pictures_dir: fx.deleted.clone(),
        shuffle: false,
        time_delay: Duration::from_secs(10),
        fade_time: Duration::from_secs(1),
        ..Configuration::default()
    };
    cfg.display.width = 64;
    cfg.display.height = 36;
    cfg.validated().unwrap()
}

fn show(cfg: Configuration) -> Slideshow {
    Slideshow::new(cfg, StdRng::seed_from_u64(5))
}

fn on_screen(show: &Slideshow) -> String {
    show.foreground()
        .and_then(|s| s.path.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

#[test]
fn sequential_plan_visits_each_picture_once_per_pass() {
    let fx = fixture(&[("a.png", 8, 6), ("b.png", 8, 6), ("c.png", 8, 6)]);
    let mut show = show(config(&fx));
    let plan = file_names(&show.plan(4));
    assert_eq!(plan, vec!["a.png", "b.png", "c.png", "a.png"]);
}

#[test]
fn advances_after_time_delay() {
    let fx = fixture(&[("a.png", 8, 6), ("b.png", 8, 6)]);
    let mut show = show(config(&fx));
    let t0 = Instant::now();

    assert!(show.update(t0));
    assert_eq!(on_screen(&show), "a.png");
    assert!(!show.update(t0 + Duration::from_secs(5)));
    assert_eq!(on_screen(&show), "a.png");
    assert!(show.update(t0 + Duration::from_secs(11)));
    assert_eq!(on_screen(&show), "b.png");
}

#[test]
fn fade_reaches_full_opacity() {
    let fx = fixture(&[("a.png", 8, 6)]);
    let mut show = show(config(&fx));
    let t0 = Instant::now();
    show.update(t0);
    // 20 fps over a one second fade.
    for i in 1..=25 {
        show.update(t0 + Duration::from_millis(i * 50));
    }
    assert!((show.alpha() - 1.0).abs() < f32::EPSILON);
    assert!((show.frame().blend - 1.0).abs() < f32::EPSILON);
}

#[test]
fn back_then_next_returns_to_same_picture() {
    let fx = fixture(&[("a.png", 8, 6), ("b.png", 8, 6), ("c.png", 8, 6)]);
    let mut show = show(config(&fx));
    let t0 = Instant::now();
    show.update(t0);
    show.apply(ControlMessage::Next);
    show.update(t0);
    show.apply(ControlMessage::Next);
    show.update(t0);
    assert_eq!(on_screen(&show), "c.png");

    show.apply(ControlMessage::Back);
    show.update(t0);
    assert_eq!(on_screen(&show), "b.png");
    show.apply(ControlMessage::Next);
    show.update(t0);
    assert_eq!(on_screen(&show), "c.png");
}

#[test]
fn text_refresh_replays_current_picture() {
    let fx = fixture(&[("a.png", 8, 6), ("b.png", 8, 6)]);
    let mut show = show(config(&fx));
    let t0 = Instant::now();
    show.update(t0);
    show.apply(ControlMessage::TextRefresh);
    assert!(show.update(t0));
    assert_eq!(on_screen(&show), "a.png");
}

#[test]
fn delete_moves_file_and_drops_one_record() {
    let fx = fixture(&[("a.png", 8, 6), ("b.png", 8, 6), ("c.png", 8, 6)]);
    let mut show = show(config(&fx));
    let t0 = Instant::now();
    show.update(t0);
    assert_eq!(on_screen(&show), "a.png");

    show.apply(ControlMessage::Delete);
    assert_eq!(show.catalog().len(), 2);
    assert!(fx.deleted.join("a.png").exists());
    assert!(!fx.pics.join("a.png").exists());

    show.update(t0);
    assert_eq!(on_screen(&show), "b.png");
}

#[test]
fn empty_directory_shows_placeholder() {
    let fx = fixture(&[]);
    let mut show = show(config(&fx));
    show.update(Instant::now());
    assert!(show.showing_placeholder());
    let frame = show.frame();
    assert_eq!(frame.caption, NO_IMAGES);
    assert!((frame.caption_alpha - 1.0).abs() < f32::EPSILON);
}

#[test]
fn unusable_pictures_fall_back_to_placeholder() {
    let fx = fixture(&[]);
    fs::write(fx.pics.join("broken.jpg"), b"not a jpeg").unwrap();
    let mut show = show(config(&fx));
    assert_eq!(show.catalog().len(), 1);
    show.update(Instant::now());
    assert!(show.showing_placeholder());
}

#[test]
fn pause_holds_current_picture() {
    let fx = fixture(&[("a.png", 8, 6), ("b.png", 8, 6)]);
    let mut show = show(config(&fx));
    let t0 = Instant::now();
    show.update(t0);
    show.apply(ControlMessage::Paused(Some(true)));
    assert!(!show.update(t0 + Duration::from_secs(60)));
    assert_eq!(on_screen(&show), "a.png");
    assert!(show.caption().ends_with("PAUSED"));

    show.apply(ControlMessage::Paused(None));
    assert!(!show.state().paused);
    assert!(show.update(t0 + Duration::from_secs(61)));
    assert_eq!(on_screen(&show), "b.png");
}

#[test]
fn timing_changes_ignore_non_positive_values() {
    let fx = fixture(&[("a.png", 8, 6)]);
    let mut show = show(config(&fx));
    show.apply(ControlMessage::TimeDelay(0.0));
    assert!((show.state().time_delay - 10.0).abs() < f64::EPSILON);
    show.apply(ControlMessage::TimeDelay(4.5));
    assert!((show.state().time_delay - 4.5).abs() < f64::EPSILON);
    show.apply(ControlMessage::FadeTime(-1.0));
    assert!((show.state().fade_time - 1.0).abs() < f64::EPSILON);
    show.apply(ControlMessage::FadeTime(2.0));
    assert!((show.state().fade_step - 0.025).abs() < 1e-6);
}

#[test]
fn extreme_timing_payloads_keep_the_show_running() {
    let fx = fixture(&[("a.png", 8, 6), ("b.png", 8, 6)]);
    let mut show = show(config(&fx));
    let topics = Topics::new("");
    let t0 = Instant::now();
    show.update(t0);

    show.apply(topics.parse("time_delay", b"inf").unwrap());
    assert!((show.state().time_delay - 10.0).abs() < f64::EPSILON);
    show.apply(ControlMessage::TimeDelay(f64::INFINITY));
    show.apply(ControlMessage::TimeDelay(f64::NAN));
    assert!((show.state().time_delay - 10.0).abs() < f64::EPSILON);

    show.apply(topics.parse("fade_time", b"1e300").unwrap());
    assert!((show.state().fade_time - MAX_INTERVAL_SECS).abs() < f64::EPSILON);
    show.apply(ControlMessage::TimeDelay(1e300));
    assert!((show.state().time_delay - MAX_INTERVAL_SECS).abs() < f64::EPSILON);
    show.apply(ControlMessage::ShowText {
        field: TextFlags::NAME,
        duration: 1e300,
    });

    show.apply(ControlMessage::Next);
    assert!(show.update(t0 + Duration::from_millis(50)));
    assert_eq!(on_screen(&show), "b.png");
    show.update(t0 + Duration::from_secs(3600));
    assert!(!show.update(t0 + Duration::from_secs(86_400)));
}

#[test]
fn text_toggles_and_uses_default_duration() {
    let fx = fixture(&[("a.png", 8, 6)]);
    let mut show = show(config(&fx));
    let t0 = Instant::now();
    show.update(t0);

    show.apply(ControlMessage::ShowText {
        field: TextFlags::NAME,
        duration: 0.0,
    });
    assert_eq!(show.state().text, TextFlags::NAME);
    assert!((show.state().text_duration - 3.3).abs() < 1e-9);
    show.update(t0);
    assert_eq!(show.caption(), "a.png");

    show.apply(ControlMessage::ShowText {
        field: TextFlags::NAME,
        duration: 30.0,
    });
    assert!(show.state().text.is_empty());
    assert!((show.state().text_duration - 30.0).abs() < f64::EPSILON);

    show.apply(ControlMessage::ShowText {
        field: TextFlags::FOLDER,
        duration: 30.0,
    });
    show.apply(ControlMessage::TextOff);
    assert!(show.state().text.is_empty());
}

#[test]
fn subdirectory_rebuilds_catalog() {
    let fx = fixture(&[("a.png", 8, 6)]);
    let nested = fx.pics.join("2019");
    fs::create_dir_all(&nested).unwrap();
    RgbaImage::new(8, 6).save(nested.join("x.png")).unwrap();
    RgbaImage::new(8, 6).save(nested.join("y.png")).unwrap();

    let mut show = show(config(&fx));
    assert_eq!(show.catalog().len(), 3);
    show.apply(ControlMessage::Subdirectory("2019".to_string()));
    assert_eq!(show.catalog().len(), 2);
    assert_eq!(show.cursor().next_position(), 0);
    show.apply(ControlMessage::Subdirectory(String::new()));
    assert_eq!(show.catalog().len(), 3);
}

#[test]
fn portrait_partner_is_not_shown_again() {
    let fx = fixture(&[("a.png", 6, 8), ("b.png", 8, 6), ("c.png", 6, 8)]);
    let mut cfg = config(&fx);
    cfg.portrait_pairs = true;
    let mut show = show(cfg);
    let t0 = Instant::now();

    show.update(t0);
    assert_eq!(on_screen(&show), "a.png");
    assert_eq!(show.foreground().unwrap().partner, Some(2));

    let mut seen = Vec::new();
    for i in 1..=2 {
        show.update(t0 + Duration::from_secs(11 * i));
        seen.push(on_screen(&show));
    }
    // c.png filled the right half of a.png's frame, so the pass wraps.
    assert_eq!(seen, vec!["b.png", "a.png"]);
    assert_eq!(show.foreground().unwrap().partner, Some(2));
}

#[test]
fn brightness_reaches_frame() {
    let fx = fixture(&[("a.png", 8, 6)]);
    let mut show = show(config(&fx));
    show.apply(ControlMessage::Brightness(0.4));
    show.update(Instant::now());
    assert!((show.frame().brightness - 0.4).abs() < f32::EPSILON);
}

#[derive(Default)]
struct CountingRenderer {
    frames: usize,
}

impl Renderer for CountingRenderer {
    fn present(&mut self, _frame: &Frame<'_>) -> Result<()> {
        self.frames += 1;
        Ok(())
    }
}

#[tokio::test]
async fn run_stops_when_quit_arrives() {
    let fx = fixture(&[("a.png", 8, 6)]);
    let (tx, rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    tx.send(ControlMessage::Quit).await.unwrap();

    viewer::run(show(config(&fx)), CountingRenderer::default(), rx, cancel.clone())
        .await
        .unwrap();
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn run_stops_on_cancellation() {
    let fx = fixture(&[("a.png", 8, 6)]);
    let (_tx, rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(viewer::run(
        show(config(&fx)),
        CountingRenderer::default(),
        rx,
        cancel.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(120)).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();
}

