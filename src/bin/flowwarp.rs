use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use image::RgbImage;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowwarp::layout::{interleaved_u8_to_planar, planar_to_interleaved_u8};
use flowwarp::{timesteps_for_multiplier, Interpolator, InterpolatorConfig, OnnxModel};

const DEFAULT_LOG_FILTER: &str = "flowwarp=info";

#[derive(Parser, Debug)]
#[command(name = "flowwarp")]
#[command(about = "Synthesize intermediate frames between two PNG images")]
struct Cli {
    /// First frame
    frame0: PathBuf,
    /// Second frame
    frame1: PathBuf,
    #[arg(long, short, default_value = "flownet.onnx")]
    model: PathBuf,
    /// TOML file overriding stride and tensor names
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output PNG; with --multiplier, frames are numbered `<stem>_<i>.png`
    #[arg(long, short, default_value = "interpolated.png")]
    output: PathBuf,
    #[arg(long, short, default_value_t = 0.5, conflicts_with = "multiplier")]
    timestep: f32,
    /// Emit N-1 evenly spaced frames for an N× frame rate
    #[arg(long)]
    multiplier: Option<u32>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        1 => EnvFilter::new("flowwarp=debug"),
        _ => EnvFilter::new("flowwarp=trace,ort=debug"),
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn load_rgb(path: &Path) -> Result<RgbImage> {
    Ok(image::open(path)
        .with_context(|| format!("opening input image {}", path.display()))?
        .into_rgb8())
}

fn numbered_output(base: &Path, index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    base.with_file_name(format!("{stem}_{index}.png"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => InterpolatorConfig::load_from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => InterpolatorConfig::default(),
    };
    config.model_path = cli.model.clone();

    let frame0 = load_rgb(&cli.frame0)?;
    let frame1 = load_rgb(&cli.frame1)?;
    if frame0.dimensions() != frame1.dimensions() {
        bail!(
            "frame sizes differ: {:?} vs {:?}",
            frame0.dimensions(),
            frame1.dimensions()
        );
    }
    let (width, height) = (frame0.width() as usize, frame0.height() as usize);

    let timesteps = match cli.multiplier {
        Some(m) if m < 2 => bail!("multiplier must be at least 2, got {m}"),
        Some(m) => timesteps_for_multiplier(m),
        None => vec![cli.timestep],
    };

    let mut interpolator = Interpolator::new(config)?;
    interpolator
        .init(&OnnxModel::load)
        .with_context(|| format!("loading model {}", cli.model.display()))?;

    let planar0 = interleaved_u8_to_planar(frame0.as_raw(), width, height, 3)?;
    let planar1 = interleaved_u8_to_planar(frame1.as_raw(), width, height, 3)?;

    let started = Instant::now();
    let frames =
        interpolator.interpolate_planar_many(&planar0.view(), &planar1.view(), &timesteps)?;
    info!(
        frames = frames.len(),
        width,
        height,
        elapsed_ms = format!("{:.1}", started.elapsed().as_secs_f64() * 1000.0),
        "interpolation finished"
    );

    for (i, frame) in frames.iter().enumerate() {
        let path = if cli.multiplier.is_some() {
            numbered_output(&cli.output, i + 1)
        } else {
            cli.output.clone()
        };
        let pixels = planar_to_interleaved_u8(&frame.view());
        let out = RgbImage::from_raw(width as u32, height as u32, pixels)
            .context("output buffer does not match frame size")?;
        out.save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "frame written");
    }

    Ok(())
}
