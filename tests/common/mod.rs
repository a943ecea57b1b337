use image::{DynamicImage, Rgba, RgbaImage};
use std::path::PathBuf;

pub fn solid_image(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
    let pixel = Rgba(color);
    let buffer = RgbaImage::from_pixel(width, height, pixel);
    DynamicImage::ImageRgba8(buffer)
}

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Square image split into four solid quadrants: red top-left, green
/// top-right, blue bottom-left, white bottom-right.
pub fn quadrant_image(size: u32) -> DynamicImage {
    let half = size / 2;
    let buffer = RgbaImage::from_fn(size, size, |x, y| {
        Rgba(match (x < half, y < half) {
            (true, true) => RED,
            (false, true) => GREEN,
            (true, false) => BLUE,
            (false, false) => WHITE,
        })
    });
    DynamicImage::ImageRgba8(buffer)
}

pub fn write_image(path: impl Into<PathBuf>, image: &DynamicImage) {
    image
        .save(path.into())
        .expect("failed to write image to disk");
}
