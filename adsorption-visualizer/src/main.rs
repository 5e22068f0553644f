use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, RgbImage};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{debug, info, warn, LevelFilter};
use rayon::prelude::*;
use adsorption_common::{FrameSnapshot, RunRecord, COMPLETED_MESSAGE};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

mod charts;
mod heatmap;

use charts::ChartConfig;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run record written by adsorption-engine (.json, .bin or .msgpack)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for the GIF, heatmap and charts
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Width of each animation frame in pixels
    #[arg(long, default_value_t = 600)]
    width: u32,

    /// Height of each animation frame in pixels
    #[arg(long, default_value_t = 500)]
    height: u32,

    /// Pixels per bin in the final heatmap image
    #[arg(long, default_value_t = 1)]
    scale: u32,

    /// Display time per animation frame in milliseconds (defaults to the simulated frame duration)
    #[arg(long)]
    frame_delay_ms: Option<u32>,

    /// Render bare heatmaps without title, axes or color bar
    #[arg(long)]
    plain: bool,
}

/// Reads a run record, choosing the decoder from the file extension.
fn load_record(path: &Path) -> Result<RunRecord> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let record: RunRecord = match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => bincode::deserialize_from(reader)
            .context("Failed to decode bincode run record")?,
        Some("json") => serde_json::from_reader(reader)
            .context("Failed to decode JSON run record")?,
        Some("msgpack") => rmp_serde::decode::from_read(reader)
            .context("Failed to decode MessagePack run record")?,
        other => anyhow::bail!("Unsupported run record extension: {:?}", other),
    };
    Ok(record)
}

/// Renders one animation frame.
fn draw_frame(snapshot: &FrameSnapshot, surface: &str, args: &Args) -> Result<RgbImage> {
    if args.plain {
        // Largest whole-pixel bin size that fits both dimensions.
        let scale = (args.width / snapshot.grid.bins_x.max(1))
            .min(args.height / snapshot.grid.bins_y.max(1))
            .max(1);
        return Ok(heatmap::grid_to_image(&snapshot.grid, scale));
    }
    let title = format!(
        "2-CEES Adsorption Heatmap ({})  Time: {:.1} s",
        surface, snapshot.elapsed_s
    );
    heatmap::render_annotated_frame(&snapshot.grid, &title, args.width, args.height)
}

/// Writes the frames as a looping animated GIF.
fn write_gif(frames: Vec<RgbImage>, path: &Path, delay_ms: u32) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create GIF file: {}", path.display()))?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite)?;

    let delay = Delay::from_numer_denom_ms(delay_ms, 1);
    for image in frames {
        let rgba = DynamicImage::ImageRgb8(image).to_rgba8();
        encoder
            .encode_frame(Frame::from_parts(rgba, 0, 0, delay))
            .context("Failed to encode GIF frame")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger
    Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .try_init()
        .ok();

    info!("Starting Adsorption Visualizer...");
    info!("Input file: {}", args.input.display());

    let record = load_record(&args.input)?;
    let surface = record.surface_label().to_string();
    info!(
        "Loaded run: surface '{}', {} frames, {} time-series samples",
        surface,
        record.frames.len(),
        record.time_series.len()
    );
    debug!("Deposition rates: {:?}", record.rates);

    if record.frames.is_empty() {
        warn!("Run record contains no frames. Exiting.");
        return Ok(());
    }
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory: {}", args.output_dir.display()))?;

    // --- Render Frames ---
    let progress_bar = ProgressBar::new(record.frames.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]")?
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    let frames: Vec<RgbImage> = record
        .frames
        .par_iter()
        .progress_with(progress_bar.clone())
        .map(|snapshot| draw_frame(snapshot, &surface, &args))
        .collect::<Result<_>>()?;
    progress_bar.finish_with_message(format!("Rendered {} frames", frames.len()));
    info!("Frames rendered in {:.2?}", start_time.elapsed());

    // --- Animation ---
    let delay_ms = args
        .frame_delay_ms
        .unwrap_or_else(|| (record.timing.frame_duration_s() * 1000.0).round() as u32);
    let gif_path = args.output_dir.join("adsorption_simulation.gif");
    write_gif(frames, &gif_path, delay_ms)?;
    info!("Animation saved to {} ({} ms per frame)", gif_path.display(), delay_ms);

    // --- Final Heatmap ---
    if let Some(grid) = record.final_grid() {
        let heatmap_path = args.output_dir.join("heatmap.png");
        heatmap::grid_to_image(grid, args.scale)
            .save(&heatmap_path)
            .with_context(|| format!("Failed to save heatmap: {}", heatmap_path.display()))?;
        info!("Final heatmap saved to {}", heatmap_path.display());
    }

    // --- Time-Series Charts ---
    let adsorption_path = args.output_dir.join("adsorption_vs_time.png");
    charts::plot_series(
        &charts::adsorption_points(&record.time_series),
        &adsorption_path,
        &ChartConfig::adsorption(),
    )?;
    let resistance_path = args.output_dir.join("resistance_vs_time.png");
    charts::plot_series(
        &charts::resistance_points(&record.time_series),
        &resistance_path,
        &ChartConfig::resistance(),
    )?;
    info!("Charts saved to {} and {}", adsorption_path.display(), resistance_path.display());

    println!("{}", COMPLETED_MESSAGE);
    Ok(())
}
