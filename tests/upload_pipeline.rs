//! End-to-end upload tests through the public API and the real backend.

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use resizable::config::{self, Allowlist, DerivativeSpec, UploadConfig};
use resizable::imaging::{FitMode, SourceFormat, source};
use resizable::types::DerivativeOutcome;
use resizable::upload::{UploadRequest, rollback, upload};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 200]))
        .save(path)
        .unwrap();
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 50]))
        .save(path)
        .unwrap();
}

fn write_gif(path: &Path, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 255]))
        .save(path)
        .unwrap();
}

fn derivative(dimension: &str, mode: FitMode, sub_dir: &str) -> DerivativeSpec {
    DerivativeSpec {
        dimension: dimension.to_string(),
        dimension_type: mode,
        sub_dir: sub_dir.to_string(),
        quality: None,
    }
}

fn config_with(root: &Path, derivatives: Vec<(&str, DerivativeSpec)>) -> UploadConfig {
    UploadConfig {
        base_dir: root.join("media"),
        create_dir: true,
        derivatives: derivatives
            .into_iter()
            .map(|(name, spec)| (name.to_string(), spec))
            .collect::<BTreeMap<_, _>>(),
        ..UploadConfig::default()
    }
}

fn generated_size(outcome: &DerivativeOutcome) -> (u32, u32) {
    match outcome {
        DerivativeOutcome::Generated { width, height, .. } => (*width, *height),
        DerivativeOutcome::Failed { error } => panic!("derivative failed: {error}"),
    }
}

#[test]
fn every_fit_mode_on_a_landscape_jpeg() {
    let tmp = TempDir::new().unwrap();
    let photo = tmp.path().join("Beach Day.jpg");
    write_jpeg(&photo, 800, 600);

    let config = config_with(
        tmp.path(),
        vec![
            ("a_exact", derivative("200x160", FitMode::Exact, "exact")),
            ("b_portrait", derivative("1x300", FitMode::Portrait, "portrait")),
            ("c_landscape", derivative("400x1", FitMode::Landscape, "landscape")),
            ("d_auto", derivative("400x320", FitMode::Auto, "auto")),
            ("e_crop", derivative("400x320", FitMode::Crop, "crop")),
        ],
    );
    let report = upload(&config, &UploadRequest::from_path("42", &photo)).unwrap();

    assert_eq!(report.physical_name, "42-Beach-Day.jpg");
    assert_eq!(report.format, SourceFormat::Jpeg);

    let sizes: Vec<(u32, u32)> = report
        .derivatives
        .iter()
        .map(|d| generated_size(&d.outcome))
        .collect();
    assert_eq!(
        sizes,
        vec![(200, 160), (400, 300), (400, 300), (400, 300), (400, 320)]
    );

    for d in &report.derivatives {
        let path = tmp
            .path()
            .join("media/files")
            .join(&d.sub_dir)
            .join("42-Beach-Day.jpg");
        let info = source::identify(&path).unwrap();
        assert_eq!(info.format, SourceFormat::Jpeg);
        assert_eq!((info.width, info.height), generated_size(&d.outcome));
    }
}

#[test]
fn png_and_gif_keep_their_format() {
    let tmp = TempDir::new().unwrap();
    let png = tmp.path().join("logo.png");
    let gif = tmp.path().join("anim.gif");
    write_png(&png, 120, 240);
    write_gif(&gif, 90, 30);

    let config = config_with(
        tmp.path(),
        vec![("small", derivative("60x60", FitMode::Auto, "small"))],
    );

    let png_report = upload(&config, &UploadRequest::from_path("1", &png)).unwrap();
    assert_eq!(generated_size(&png_report.derivatives[0].outcome), (30, 60));
    let written = tmp.path().join("media/files/small/1-logo.png");
    assert_eq!(source::identify(&written).unwrap().format, SourceFormat::Png);

    let gif_report = upload(&config, &UploadRequest::from_path("2", &gif)).unwrap();
    assert_eq!(generated_size(&gif_report.derivatives[0].outcome), (60, 20));
    let written = tmp.path().join("media/files/small/2-anim.gif");
    assert_eq!(source::identify(&written).unwrap().format, SourceFormat::Gif);
}

#[test]
fn rejected_upload_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let photo = tmp.path().join("big.png");
    write_png(&photo, 64, 64);

    let config = UploadConfig {
        extensions: Allowlist::Only(vec!["jpg".into()]),
        ..config_with(tmp.path(), vec![])
    };
    let err = upload(&config, &UploadRequest::from_path("1", &photo)).unwrap_err();

    assert_eq!(err.code(), "INVALID_FILE_EXTENSION");
    assert_eq!(
        config.message_for(err.code()),
        "This file type is not supported."
    );
    assert!(!tmp.path().join("media").exists());
}

#[test]
fn config_file_drives_the_upload() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join(config::CONFIG_FILENAME);
    fs::write(
        &config_path,
        format!(
            r#"
base_dir = "{}"
dir = "avatars"
physical_name = "user-{{ID}}.{{EXT}}"
create_dir = true
quality = 80

[derivatives.square]
dimension = "64x64"
dimension_type = "crop"
sub_dir = "64"

[error_messages]
INVALID_FILE = "Please upload a picture."
"#,
            tmp.path().join("store").display()
        ),
    )
    .unwrap();
    let config = config::load_config(&config_path).unwrap();

    let photo = tmp.path().join("Me.PNG");
    write_png(&photo, 300, 200);
    let report = upload(&config, &UploadRequest::from_path("9", &photo)).unwrap();

    assert_eq!(report.physical_name, "user-9.png");
    assert_eq!(report.derivatives.len(), 1);
    assert_eq!(generated_size(&report.derivatives[0].outcome), (64, 64));
    assert!(tmp.path().join("store/avatars/original/user-9.png").exists());
    assert!(tmp.path().join("store/avatars/64/user-9.png").exists());

    let text = tmp.path().join("notes.png");
    fs::write(&text, "not an image").unwrap();
    let err = upload(&config, &UploadRequest::from_path("9", &text)).unwrap_err();
    assert_eq!(config.message_for(err.code()), "Please upload a picture.");
}

#[test]
fn rollback_after_upload() {
    let tmp = TempDir::new().unwrap();
    let photo = tmp.path().join("p.jpg");
    write_jpeg(&photo, 50, 50);

    let config = config_with(
        tmp.path(),
        vec![("thumb", derivative("10x10", FitMode::Crop, "thumb"))],
    );
    let report = upload(&config, &UploadRequest::from_path("5", &photo)).unwrap();
    assert_eq!(report.stored_files().len(), 2);

    assert_eq!(rollback(&report), 2);
    assert!(!report.original.exists());
    assert!(photo.exists());
}

#[test]
fn report_serializes_to_json() {
    let tmp = TempDir::new().unwrap();
    let photo = tmp.path().join("p.png");
    write_png(&photo, 40, 20);

    let config = config_with(
        tmp.path(),
        vec![("half", derivative("20x10", FitMode::Exact, "half"))],
    );
    let report = upload(&config, &UploadRequest::from_path("8", &photo)).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["record_id"], "8");
    assert_eq!(json["format"], "png");
    assert_eq!(json["dimensions"]["width"], 40);
    assert_eq!(json["derivatives"][0]["outcome"]["status"], "generated");
    assert_eq!(json["derivatives"][0]["outcome"]["width"], 20);
}
