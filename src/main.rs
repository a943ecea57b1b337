use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use eframe::egui;
use rand::seq::SliceRandom;
use tracing_subscriber::EnvFilter;

use batchcrop::app::{AppConfig, BatchCropApp};
use batchcrop::cache::{DEFAULT_PROXY_RADIUS, DEFAULT_PROXY_SIZE};
use batchcrop::crop::DEFAULT_RATIO_LABEL;
use batchcrop::export::OutputFormat;
use batchcrop::fs_utils::{build_filter, collect_images};
use batchcrop::loader::DEFAULT_DECODE_THREADS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum SortOrder {
    Filename,
    Randomize,
    Modified,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Batch fixed-ratio image cropper with windowed preloading"
)]
struct Args {
    /// Directory that contains images to process
    #[arg(value_name = "DIRECTORY")]
    directory: PathBuf,

    /// Output directory for exported crops (default: DIRECTORY/cropped)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target aspect ratio as W:H
    #[arg(short = 'a', long, default_value = DEFAULT_RATIO_LABEL)]
    ratio: String,

    /// Output width of exported images in pixels
    #[arg(short = 'w', long, default_value_t = 1080)]
    width: u32,

    /// Quality of the output image (1-100)
    #[arg(short, long, default_value_t = 92)]
    quality: u8,

    /// Output format for exported images
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Jpg)]
    format: OutputFormat,

    /// Number of parallel export threads
    #[arg(short = 'j', long = "parallel", default_value_t = 8)]
    parallel: usize,

    /// Number of background decode threads
    #[arg(long, default_value_t = DEFAULT_DECODE_THREADS)]
    decode_threads: usize,

    /// Neighbors on each side kept preloaded at proxy quality
    #[arg(long, default_value_t = DEFAULT_PROXY_RADIUS)]
    window_radius: usize,

    /// Longest side of proxy-quality preloads, in pixels
    #[arg(long, default_value_t = DEFAULT_PROXY_SIZE)]
    proxy_size: u32,

    /// Recurse into subdirectories to find images (disabled by default)
    #[arg(short = 'r', long = "recursive", default_value_t = false)]
    recursive: bool,

    /// Only include files whose name matches these comma-separated globs
    #[arg(long)]
    filter: Option<String>,

    /// Order in which images are processed
    #[arg(long, value_enum, default_value_t = SortOrder::Filename)]
    order: SortOrder,

    /// Invert order of processed images (ignored for randomize)
    #[arg(short = 'i', long = "inverse-order", default_value_t = false)]
    inverse: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let filter = args.filter.as_deref().map(build_filter).transpose()?;
    let mut files = collect_images(&args.directory, args.recursive, filter.as_ref())?;
    if files.is_empty() {
        return Err(anyhow!(
            "No supported image files found in {}. Supported formats are: {}",
            args.directory.display(),
            batchcrop::fs_utils::SUPPORTED_EXTENSIONS.join(", ")
        ));
    }
    match args.order {
        SortOrder::Filename => files.sort(),
        SortOrder::Randomize => files.shuffle(&mut rand::thread_rng()),
        SortOrder::Modified => {
            files.sort_by_key(|path| std::fs::metadata(path).and_then(|m| m.modified()).ok())
        }
    }
    if args.inverse && args.order != SortOrder::Randomize {
        files.reverse();
    }

    let config = AppConfig {
        files,
        output_dir: args
            .output
            .unwrap_or_else(|| args.directory.join("cropped")),
        ratio: args.ratio,
        target_width: args.width,
        quality: args.quality.clamp(1, 100),
        format: args.format,
        export_threads: args.parallel,
        decode_threads: args.decode_threads,
        window_radius: args.window_radius,
        proxy_size: args.proxy_size,
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(egui::vec2(1280.0, 860.0)),
        ..Default::default()
    };

    eframe::run_native(
        "BatchCrop",
        native_options,
        Box::new(move |cc| {
            let app = BatchCropApp::new(cc, config)?;
            Ok(Box::new(app) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|err| anyhow!("{err}"))?;

    Ok(())
}
