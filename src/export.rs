use std::{
    path::PathBuf,
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc, Mutex,
    },
    thread,
};

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use image::{codecs::avif::AvifEncoder, imageops::FilterType, DynamicImage, Rgba, RgbaImage};

use crate::crop::{default_crop, NormalizedCrop, TransformState};
use crate::geometry::{normalize_degrees, rotated_bounds};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum OutputFormat {
    Jpg,
    Png,
    Webp,
    Avif,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
        }
    }
}

pub struct ExportRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    /// `None` for images never touched by the user; the worker falls back
    /// to the maximal centered crop at `aspect`.
    pub crop: Option<NormalizedCrop>,
    pub aspect: f32,
    pub transform: TransformState,
    /// Output width in pixels; `None` keeps the cropped resolution.
    pub target_width: Option<u32>,
    pub quality: u8,
    pub format: OutputFormat,
}

pub struct ExportStatus {
    pub source: PathBuf,
    pub result: Result<PathBuf>,
}

/// Apply flips, rotation, crop and optional downsampling to a decoded image.
///
/// Flips mirror the image in its own frame before rotation. Rotation expands
/// the canvas to the rotated bounding box, and the normalized crop fractions
/// then select from that expanded box, matching what the interactive crop
/// stores.
pub fn render(
    image: &DynamicImage,
    crop: NormalizedCrop,
    transform: TransformState,
    target_width: Option<u32>,
) -> Result<DynamicImage> {
    let mut image = image.clone();
    if transform.flip_h {
        image = image.fliph();
    }
    if transform.flip_v {
        image = image.flipv();
    }
    image = rotate_expanded(&image, transform.rotation_degrees);

    let (w, h) = (image.width() as f32, image.height() as f32);
    let left = (crop.x * w).round().clamp(0.0, w) as u32;
    let top = (crop.y * h).round().clamp(0.0, h) as u32;
    let right = ((crop.x + crop.w) * w).round().clamp(0.0, w) as u32;
    let bottom = ((crop.y + crop.h) * h).round().clamp(0.0, h) as u32;
    if right <= left || bottom <= top {
        return Err(anyhow!("crop region is empty"));
    }
    let mut out = image.crop_imm(left, top, right - left, bottom - top);

    if let Some(tw) = target_width {
        if tw > 0 && out.width() != tw {
            let th = ((tw as f64 * out.height() as f64 / out.width() as f64) as u32).max(1);
            out = out.resize_exact(tw, th, FilterType::Lanczos3);
        }
    }
    Ok(out)
}

/// Rotate clockwise by `degrees` about the image center, expanding the
/// canvas to the rotated bounding box. Quarter turns take the lossless
/// paths; everything else is bilinear inverse mapping.
pub fn rotate_expanded(image: &DynamicImage, degrees: f32) -> DynamicImage {
    let degrees = normalize_degrees(degrees);
    if degrees.abs() < 1e-3 {
        return image.clone();
    }
    if (degrees - 90.0).abs() < 1e-3 {
        return image.rotate90();
    }
    if (degrees + 90.0).abs() < 1e-3 {
        return image.rotate270();
    }
    if (degrees.abs() - 180.0).abs() < 1e-3 {
        return image.rotate180();
    }

    let src = image.to_rgba8();
    let (sw, sh) = (src.width() as f32, src.height() as f32);
    let rad = degrees.to_radians();
    let (sin, cos) = rad.sin_cos();
    let dw = (sw * cos.abs() + sh * sin.abs()).ceil().max(1.0) as u32;
    let dh = (sw * sin.abs() + sh * cos.abs()).ceil().max(1.0) as u32;
    let (scx, scy) = (sw * 0.5, sh * 0.5);
    let (dcx, dcy) = (dw as f32 * 0.5, dh as f32 * 0.5);

    let mut out = RgbaImage::new(dw, dh);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let dx = x as f32 + 0.5 - dcx;
        let dy = y as f32 + 0.5 - dcy;
        // inverse rotation back into the source frame
        let sx = dx * cos + dy * sin + scx - 0.5;
        let sy = -dx * sin + dy * cos + scy - 0.5;
        if sx < -1.0 || sy < -1.0 || sx > sw || sy > sh {
            continue;
        }
        *pixel = sample_bilinear(&src, sx, sy);
    }
    DynamicImage::ImageRgba8(out)
}

fn sample_bilinear(src: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let max_x = src.width() as i64 - 1;
    let max_y = src.height() as i64 - 1;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let tap = |ix: i64, iy: i64| -> [f32; 4] {
        let px = src.get_pixel(ix.clamp(0, max_x) as u32, iy.clamp(0, max_y) as u32);
        [
            px.0[0] as f32,
            px.0[1] as f32,
            px.0[2] as f32,
            px.0[3] as f32,
        ]
    };
    let (x0, y0) = (x0 as i64, y0 as i64);
    let p00 = tap(x0, y0);
    let p10 = tap(x0 + 1, y0);
    let p01 = tap(x0, y0 + 1);
    let p11 = tap(x0 + 1, y0 + 1);
    let mut px = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] + (p10[c] - p00[c]) * fx;
        let bottom = p01[c] + (p11[c] - p01[c]) * fx;
        px[c] = (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(px)
}

/// Background export pool. Each worker opens the source, renders, and
/// encodes; results come back through `check_completions`. A failed image
/// reports its error and the rest of the batch keeps going.
pub struct Exporter {
    request_tx: Sender<ExportRequest>,
    status_rx: Receiver<ExportStatus>,
    pub pending: Vec<PathBuf>,
}

impl Exporter {
    pub fn new(concurrency: usize) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<ExportRequest>();
        let (status_tx, status_rx) = mpsc::channel();
        let request_rx = Arc::new(Mutex::new(request_rx));

        for _ in 0..concurrency.max(1) {
            Self::spawn_export_thread(Arc::clone(&request_rx), status_tx.clone());
        }

        Self {
            request_tx,
            status_rx,
            pending: Vec::new(),
        }
    }

    fn spawn_export_thread(rx: Arc<Mutex<Receiver<ExportRequest>>>, tx: Sender<ExportStatus>) {
        thread::spawn(move || loop {
            let request = {
                let Ok(lock) = rx.lock() else { break };
                match lock.recv() {
                    Ok(request) => request,
                    Err(_) => break,
                }
            };
            let source = request.source.clone();
            let result = Self::run_export(request);
            if tx.send(ExportStatus { source, result }).is_err() {
                break;
            }
        });
    }

    fn run_export(request: ExportRequest) -> Result<PathBuf> {
        let image = image::open(&request.source)
            .with_context(|| format!("unable to open {}", request.source.display()))?;
        let crop = request.crop.unwrap_or_else(|| {
            let bounds = rotated_bounds(
                eframe::egui::vec2(image.width() as f32, image.height() as f32),
                request.transform.rotation_degrees,
            );
            default_crop(bounds, request.aspect)
        });
        let rendered = render(&image, crop, request.transform, request.target_width)?;

        if let Some(parent) = request.output.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("unable to create {}", parent.display()))?;
        }
        let file = std::fs::File::create(&request.output)
            .with_context(|| format!("unable to create {}", request.output.display()))?;
        let writer = std::io::BufWriter::new(file);
        match request.format {
            OutputFormat::Jpg => {
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(writer, request.quality);
                // the jpeg encoder has no alpha channel to offer
                DynamicImage::ImageRgb8(rendered.to_rgb8()).write_with_encoder(encoder)?;
            }
            OutputFormat::Png => {
                let encoder = image::codecs::png::PngEncoder::new(writer);
                rendered.write_with_encoder(encoder)?;
            }
            OutputFormat::Webp => {
                let encoder = image::codecs::webp::WebPEncoder::new_lossless(writer);
                rendered.write_with_encoder(encoder)?;
            }
            OutputFormat::Avif => {
                let encoder = AvifEncoder::new_with_speed_quality(writer, 4, request.quality);
                rendered.write_with_encoder(encoder)?;
            }
        }
        Ok(request.output)
    }

    pub fn queue(&mut self, request: ExportRequest) -> Result<()> {
        self.pending.push(request.source.clone());
        self.request_tx
            .send(request)
            .map_err(|e| anyhow!("failed to queue export: {e}"))
    }

    pub fn check_completions(&mut self) -> Vec<ExportStatus> {
        let mut completed = Vec::new();
        while let Ok(status) = self.status_rx.try_recv() {
            if let Some(idx) = self.pending.iter().position(|p| *p == status.source) {
                self.pending.remove(idx);
            }
            completed.push(status);
        }
        completed
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}
