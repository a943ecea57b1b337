use std::{thread, time::Duration};

use batchcrop::crop::{NormalizedCrop, TransformState};
use batchcrop::export::{render, rotate_expanded, ExportRequest, Exporter, OutputFormat};
use image::DynamicImage;
use once_cell::sync::Lazy;
use tempfile::tempdir;

mod common;
use common::{quadrant_image, solid_image, write_image, BLUE, GREEN, RED, WHITE};

static QUADRANTS: Lazy<DynamicImage> = Lazy::new(|| quadrant_image(100));

fn full_crop() -> NormalizedCrop {
    NormalizedCrop::new(0.0, 0.0, 1.0, 1.0)
}

fn pixel(image: &DynamicImage, x: u32, y: u32) -> [u8; 4] {
    image.to_rgba8().get_pixel(x, y).0
}

#[test]
fn crop_selects_the_requested_fraction() {
    let crop = NormalizedCrop::new(0.5, 0.0, 0.5, 0.5);
    let out = render(&QUADRANTS, crop, TransformState::default(), None).unwrap();
    assert_eq!((out.width(), out.height()), (50, 50));
    assert_eq!(pixel(&out, 25, 25), GREEN);
}

#[test]
fn flip_happens_before_crop() {
    let crop = NormalizedCrop::new(0.5, 0.0, 0.5, 0.5);
    let transform = TransformState {
        flip_h: true,
        ..Default::default()
    };
    let out = render(&QUADRANTS, crop, transform, None).unwrap();
    // mirrored: the top-right quadrant is now red
    assert_eq!(pixel(&out, 25, 25), RED);
}

#[test]
fn quarter_rotation_is_applied_before_crop() {
    let crop = NormalizedCrop::new(0.0, 0.0, 0.5, 0.5);
    let transform = TransformState {
        rotation_degrees: 90.0,
        ..Default::default()
    };
    let out = render(&QUADRANTS, crop, transform, None).unwrap();
    // clockwise turn moves the bottom-left quadrant to the top-left
    assert_eq!(pixel(&out, 25, 25), BLUE);
}

#[test]
fn flips_apply_before_rotation() {
    let crop = NormalizedCrop::new(0.0, 0.0, 0.5, 0.5);
    let transform = TransformState {
        rotation_degrees: 90.0,
        flip_h: true,
        flip_v: false,
    };
    let out = render(&QUADRANTS, crop, transform, None).unwrap();
    // flipped bottom-left is white; rotation then carries it to the top-left
    assert_eq!(pixel(&out, 25, 25), WHITE);
}

#[test]
fn downsample_hits_the_target_width() {
    let out = render(
        &QUADRANTS,
        full_crop(),
        TransformState::default(),
        Some(25),
    )
    .unwrap();
    assert_eq!(out.width(), 25);
    assert_eq!(out.height(), 25);
}

#[test]
fn downsample_preserves_crop_aspect() {
    let crop = NormalizedCrop::new(0.0, 0.0, 1.0, 0.5);
    let out = render(&QUADRANTS, crop, TransformState::default(), Some(50)).unwrap();
    assert_eq!(out.width(), 50);
    assert_eq!(out.height(), 25);
}

#[test]
fn empty_crop_is_an_error() {
    let crop = NormalizedCrop::new(0.5, 0.5, 0.0, 0.0);
    assert!(render(&QUADRANTS, crop, TransformState::default(), None).is_err());
}

#[test]
fn rotation_expands_the_canvas() {
    let rotated = rotate_expanded(&solid_image(100, 100, RED), 45.0);
    let expected = (100.0 * 2.0_f32.sqrt()).ceil() as u32;
    assert_eq!(rotated.width(), expected);
    assert_eq!(rotated.height(), expected);
    // the source center survives rotation
    let c = rotated.width() / 2;
    assert_eq!(pixel(&rotated, c, c), RED);
}

#[test]
fn rotation_bounds_match_for_rectangles() {
    let rotated = rotate_expanded(&solid_image(200, 100, RED), 30.0);
    let (sin, cos) = 30.0_f32.to_radians().sin_cos();
    let expected_w = (200.0 * cos + 100.0 * sin).ceil() as u32;
    let expected_h = (200.0 * sin + 100.0 * cos).ceil() as u32;
    assert_eq!(rotated.width(), expected_w);
    assert_eq!(rotated.height(), expected_h);
}

#[test]
fn quarter_turns_are_lossless() {
    let rotated = rotate_expanded(&QUADRANTS, 90.0);
    assert_eq!((rotated.width(), rotated.height()), (100, 100));
    assert_eq!(pixel(&rotated, 25, 25), BLUE);
    let rotated = rotate_expanded(&QUADRANTS, -90.0);
    assert_eq!(pixel(&rotated, 25, 25), GREEN);
    let rotated = rotate_expanded(&QUADRANTS, 180.0);
    assert_eq!(pixel(&rotated, 25, 25), WHITE);
}

#[test]
fn exporter_writes_files_and_reports_per_task_results() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("source.png");
    write_image(&source, &quadrant_image(100));
    let out_dir = tmp.path().join("out");

    let mut exporter = Exporter::new(2);
    exporter
        .queue(ExportRequest {
            source: source.clone(),
            output: out_dir.join("source.jpg"),
            crop: Some(NormalizedCrop::new(0.0, 0.0, 0.5, 0.5)),
            aspect: 1.0,
            transform: TransformState::default(),
            target_width: Some(50),
            quality: 90,
            format: OutputFormat::Jpg,
        })
        .unwrap();
    exporter
        .queue(ExportRequest {
            source: tmp.path().join("missing.png"),
            output: out_dir.join("missing.jpg"),
            crop: None,
            aspect: 1.0,
            transform: TransformState::default(),
            target_width: None,
            quality: 90,
            format: OutputFormat::Jpg,
        })
        .unwrap();

    let mut statuses = Vec::new();
    for _ in 0..200 {
        statuses.extend(exporter.check_completions());
        if statuses.len() == 2 {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(statuses.len(), 2, "both tasks must report");
    assert!(exporter.is_idle());

    let ok = statuses.iter().find(|s| s.source == source).unwrap();
    let output = ok.result.as_ref().expect("valid source should export");
    assert!(output.exists());
    let written = image::open(output).unwrap();
    assert_eq!((written.width(), written.height()), (50, 50));

    let failed = statuses.iter().find(|s| s.source != source).unwrap();
    assert!(failed.result.is_err(), "missing source must fail alone");
}

#[test]
fn untouched_images_export_with_the_default_crop() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("wide.png");
    write_image(&source, &solid_image(200, 100, GREEN));

    let mut exporter = Exporter::new(1);
    exporter
        .queue(ExportRequest {
            source: source.clone(),
            output: tmp.path().join("wide-out.png"),
            crop: None,
            aspect: 1.0,
            transform: TransformState::default(),
            target_width: None,
            quality: 90,
            format: OutputFormat::Png,
        })
        .unwrap();

    let mut statuses = Vec::new();
    for _ in 0..200 {
        statuses.extend(exporter.check_completions());
        if !statuses.is_empty() {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    let output = statuses[0].result.as_ref().unwrap();
    let written = image::open(output).unwrap();
    // maximal centered 1:1 crop of a 200x100 image
    assert_eq!((written.width(), written.height()), (100, 100));
}
