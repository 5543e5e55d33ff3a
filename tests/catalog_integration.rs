use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{Local, NaiveDate, TimeZone};
use image::{Rgba, RgbaImage};
use picture_frame::catalog::{self, CatalogOptions, DateRange};
use picture_frame::meta::MetaOptions;
use picture_frame::scan::DirectoryWatch;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn write_png(path: &Path, modified: SystemTime) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]))
        .save(path)
        .unwrap();
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}

fn at_secs(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn local_noon(y: i32, m: u32, d: u32) -> SystemTime {
    let ts = Local
        .with_ymd_and_hms(y, m, d, 12, 0, 0)
        .earliest()
        .unwrap()
        .timestamp();
    at_secs(ts as u64)
}

fn options(root: &Path) -> CatalogOptions {
    CatalogOptions {
        root: root.to_path_buf(),
        range: DateRange::default(),
        shuffle: false,
        recent_n: 1,
        deferred: true,
        meta: MetaOptions::default(),
    }
}

fn names(cat: &catalog::Catalog) -> Vec<String> {
    cat.iter().map(|r| r.file_name().to_string()).collect()
}

#[test]
fn sequential_catalog_is_sorted_by_path() {
    let tmp = tempfile::tempdir().unwrap();
    write_png(&tmp.path().join("b.png"), at_secs(1_000));
    write_png(&tmp.path().join("a.png"), at_secs(2_000));
    write_png(&tmp.path().join("sub").join("c.png"), at_secs(3_000));
    fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let cat = catalog::build(&options(tmp.path()), None, &mut rng);
    assert_eq!(names(&cat), vec!["a.png", "b.png", "c.png"]);
    assert!(cat.iter().all(|r| r.meta.is_pending()));
}

#[test]
fn newest_file_leads_shuffled_catalog() {
    let tmp = tempfile::tempdir().unwrap();
    write_png(&tmp.path().join("A.png"), at_secs(1_000));
    write_png(&tmp.path().join("B.png"), at_secs(2_000));
    write_png(&tmp.path().join("C.png"), at_secs(3_000));

    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let opts = CatalogOptions {
            shuffle: true,
            ..options(tmp.path())
        };
        let cat = catalog::build(&opts, None, &mut rng);
        let order = names(&cat);
        assert_eq!(order[0], "C.png");
        assert_eq!(order.len(), 3);
    }
}

#[test]
fn eager_mode_filters_by_capture_day() {
    let tmp = tempfile::tempdir().unwrap();
    write_png(&tmp.path().join("early.png"), local_noon(2019, 5, 31));
    write_png(&tmp.path().join("first.png"), local_noon(2019, 6, 1));
    write_png(&tmp.path().join("last.png"), local_noon(2019, 6, 30));
    write_png(&tmp.path().join("late.png"), local_noon(2019, 7, 1));

    let opts = CatalogOptions {
        deferred: false,
        range: DateRange {
            from: NaiveDate::from_ymd_opt(2019, 6, 1),
            to: NaiveDate::from_ymd_opt(2019, 6, 30),
        },
        ..options(tmp.path())
    };
    let mut rng = StdRng::seed_from_u64(1);
    let cat = catalog::build(&opts, None, &mut rng);
    assert_eq!(names(&cat), vec!["first.png", "last.png"]);
    assert!(cat.iter().all(|r| !r.meta.is_pending()));
}

#[test]
fn missing_root_gives_empty_catalog() {
    let mut rng = StdRng::seed_from_u64(1);
    let cat = catalog::build(&options(&PathBuf::from("/no/such/dir")), None, &mut rng);
    assert!(cat.is_empty());
}

#[test]
fn build_primes_directory_watch() {
    let tmp = tempfile::tempdir().unwrap();
    write_png(&tmp.path().join("a.png"), at_secs(1_000));
    let mut watch = DirectoryWatch::new(tmp.path(), Duration::from_secs(60));
    let mut rng = StdRng::seed_from_u64(1);
    catalog::build(&options(tmp.path()), Some(&mut watch), &mut rng);
    assert!(watch.last_change().is_some());
    assert!(!watch.check_changes());
}
