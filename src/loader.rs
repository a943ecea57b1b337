use std::{
    io::Cursor,
    path::Path,
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc, Mutex,
    },
    thread,
};

use anyhow::{anyhow, Context, Result};
use eframe::egui::ColorImage;
use fast_image_resize::images::Image;
use fast_image_resize::{PixelType, ResizeOptions, Resizer};
use image::DynamicImage;
use tracing::debug;
use zune_jpeg::JpegDecoder;

use crate::cache::{LoadRequest, LoadResult, Tier};

pub const DEFAULT_DECODE_THREADS: usize = 4;

pub fn to_color_image(img: &DynamicImage) -> ColorImage {
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.into_raw();
    ColorImage::from_rgba_unmultiplied(size, &pixels)
}

/// Bounded pool of decode threads. Requests go in through the returned
/// sender (the cache holds a clone); completions come back on the receiver,
/// drained by the UI thread once per frame. Workers exit when either channel
/// closes.
pub struct LoaderPool;

impl LoaderPool {
    pub fn spawn(workers: usize) -> (Sender<LoadRequest>, Receiver<LoadResult>) {
        let (request_tx, request_rx) = mpsc::channel::<LoadRequest>();
        let (result_tx, result_rx) = mpsc::channel();
        let request_rx = Arc::new(Mutex::new(request_rx));

        for _ in 0..workers.max(1) {
            let rx = Arc::clone(&request_rx);
            let tx = result_tx.clone();
            thread::spawn(move || loop {
                let request = {
                    let Ok(lock) = rx.lock() else { break };
                    match lock.recv() {
                        Ok(request) => request,
                        Err(_) => break,
                    }
                };
                let requested_tier = if request.max_dim.is_some() {
                    Tier::Proxy
                } else {
                    Tier::Full
                };
                let result = decode_image(&request.path, request.max_dim)
                    .map(|(image, is_full)| (to_color_image(&image), is_full));
                let completion = LoadResult {
                    path: request.path,
                    requested_tier,
                    generation: request.generation,
                    result,
                };
                if tx.send(completion).is_err() {
                    break;
                }
            });
        }
        (request_tx, result_rx)
    }
}

/// Decode `path`, downsampling so neither side exceeds `max_dim` when given.
/// The second return value is true iff the bitmap is full quality, i.e. no
/// downsampling was actually applied.
pub fn decode_image(path: &Path, max_dim: Option<u32>) -> Result<(DynamicImage, bool)> {
    let bytes =
        std::fs::read(path).with_context(|| format!("unable to read {}", path.display()))?;

    // zune-jpeg first for JPEGs, standard loader for everything else
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.eq_ignore_ascii_case("jpg") || s.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false);

    let image = if is_jpeg {
        decode_jpeg_fast(&bytes).or_else(|err| {
            debug!(path = %path.display(), "zune-jpeg failed, falling back: {err:#}");
            image::load_from_memory(&bytes)
                .with_context(|| format!("unable to decode {}", path.display()))
        })?
    } else {
        image::load_from_memory(&bytes)
            .with_context(|| format!("unable to decode {}", path.display()))?
    };
    drop(bytes);

    let Some(max_dim) = max_dim else {
        return Ok((image, true));
    };
    if image.width() <= max_dim && image.height() <= max_dim {
        // Already small enough; a proxy request resolves as full quality.
        return Ok((image, true));
    }

    let scale = max_dim as f64 / image.width().max(image.height()) as f64;
    let new_w = ((image.width() as f64 * scale) as u32).max(1);
    let new_h = ((image.height() as f64 * scale) as u32).max(1);
    let downsampled = resize_rgba(&image, new_w, new_h)
        .with_context(|| format!("unable to downsample {}", path.display()))?;
    Ok((downsampled, false))
}

fn decode_jpeg_fast(bytes: &[u8]) -> Result<DynamicImage> {
    let mut decoder = JpegDecoder::new(Cursor::new(bytes));
    let pixels = decoder.decode().map_err(|e| anyhow!("jpeg decode: {e}"))?;
    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("jpeg decode yielded no header info"))?;
    let (width, height) = (info.width as u32, info.height as u32);
    // zune-jpeg normally hands back RGB8; anything else goes to the fallback
    if pixels.len() != (width * height * 3) as usize {
        return Err(anyhow!("unexpected jpeg pixel layout"));
    }
    image::RgbImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| anyhow!("jpeg buffer size mismatch"))
}

fn resize_rgba(image: &DynamicImage, new_w: u32, new_h: u32) -> Result<DynamicImage> {
    let src_image = match image {
        DynamicImage::ImageRgb8(rgb) => Image::from_vec_u8(
            rgb.width(),
            rgb.height(),
            rgb.as_raw().clone(),
            PixelType::U8x3,
        ),
        DynamicImage::ImageRgba8(rgba) => Image::from_vec_u8(
            rgba.width(),
            rgba.height(),
            rgba.as_raw().clone(),
            PixelType::U8x4,
        ),
        other => {
            let rgba = other.to_rgba8();
            Image::from_vec_u8(rgba.width(), rgba.height(), rgba.into_raw(), PixelType::U8x4)
        }
    }
    .map_err(|e| anyhow!("resize source: {e}"))?;

    let mut dst_image = Image::new(new_w, new_h, src_image.pixel_type());
    let mut resizer = Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &ResizeOptions::default())
        .map_err(|e| anyhow!("resize: {e}"))?;

    let out = match dst_image.pixel_type() {
        PixelType::U8x3 => image::RgbImage::from_raw(new_w, new_h, dst_image.into_vec())
            .map(DynamicImage::ImageRgb8),
        _ => image::RgbaImage::from_raw(new_w, new_h, dst_image.into_vec())
            .map(DynamicImage::ImageRgba8),
    };
    out.ok_or_else(|| anyhow!("resize produced a short buffer"))
}
