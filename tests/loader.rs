use std::{thread, time::Duration};

use batchcrop::cache::{LoadRequest, Tier};
use batchcrop::loader::{decode_image, LoaderPool};
use tempfile::tempdir;

mod common;
use common::{solid_image, write_image};

#[test]
fn full_load_keeps_native_resolution() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("sample.png");
    write_image(&path, &solid_image(64, 32, [10, 20, 30, 255]));

    let (image, is_full) = decode_image(&path, None).unwrap();
    assert!(is_full);
    assert_eq!((image.width(), image.height()), (64, 32));
}

#[test]
fn proxy_load_downsamples_to_the_limit() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("big.png");
    write_image(&path, &solid_image(128, 64, [10, 20, 30, 255]));

    let (image, is_full) = decode_image(&path, Some(32)).unwrap();
    assert!(!is_full);
    assert_eq!(image.width(), 32);
    assert_eq!(image.height(), 16);
}

#[test]
fn proxy_load_of_small_source_resolves_full() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("small.png");
    write_image(&path, &solid_image(16, 16, [10, 20, 30, 255]));

    let (image, is_full) = decode_image(&path, Some(64)).unwrap();
    assert!(is_full);
    assert_eq!(image.width(), 16);
}

#[test]
fn decode_reports_unreadable_paths() {
    let missing = std::path::Path::new("/definitely/not/here.png");
    assert!(decode_image(missing, None).is_err());
}

#[test]
fn decode_reports_undecodable_bytes() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("garbage.png");
    std::fs::write(&path, b"this is not a png").unwrap();
    assert!(decode_image(&path, None).is_err());
}

#[test]
fn jpeg_round_trips_through_the_fast_path() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("photo.jpg");
    solid_image(40, 30, [200, 100, 50, 255])
        .to_rgb8()
        .save(&path)
        .unwrap();

    let (image, is_full) = decode_image(&path, None).unwrap();
    assert!(is_full);
    assert_eq!((image.width(), image.height()), (40, 30));
}

#[test]
fn pool_delivers_completions_with_request_metadata() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("sample.png");
    write_image(&path, &solid_image(48, 48, [1, 2, 3, 255]));

    let (request_tx, result_rx) = LoaderPool::spawn(2);
    request_tx
        .send(LoadRequest {
            path: path.clone(),
            max_dim: Some(24),
            generation: 7,
        })
        .unwrap();

    let mut received = None;
    for _ in 0..100 {
        if let Ok(result) = result_rx.try_recv() {
            received = Some(result);
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    let result = received.expect("loader pool should deliver a completion");
    assert_eq!(result.path, path);
    assert_eq!(result.requested_tier, Tier::Proxy);
    assert_eq!(result.generation, 7);
    let (bitmap, is_full) = result.result.unwrap();
    assert!(!is_full);
    assert_eq!(bitmap.size, [24, 24]);
}

#[test]
fn pool_reports_failures_instead_of_dropping_them() {
    let (request_tx, result_rx) = LoaderPool::spawn(1);
    request_tx
        .send(LoadRequest {
            path: "/definitely/not/here.png".into(),
            max_dim: None,
            generation: 0,
        })
        .unwrap();

    let mut received = None;
    for _ in 0..100 {
        if let Ok(result) = result_rx.try_recv() {
            received = Some(result);
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    let result = received.expect("failure should still produce a completion");
    assert_eq!(result.requested_tier, Tier::Full);
    assert!(result.result.is_err());
}
