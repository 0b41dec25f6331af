//! coverd_convert - Offline image to RGB565 grid conversion
//!
//! Prints the same JSON the HTTP endpoints return, for checking a display
//! against a known image without running the server.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use coverd::raster::{CropMode, RasterConverter};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Crop {
    /// Resize the whole image
    None,
    /// Crop to a centered square first
    Center,
}

impl From<Crop> for CropMode {
    fn from(crop: Crop) -> Self {
        match crop {
            Crop::None => CropMode::None,
            Crop::Center => CropMode::CenterSquare,
        }
    }
}

/// Convert an image file to a 64x64 RGB565 grid
#[derive(Parser, Debug)]
#[command(name = "coverd_convert", version, about)]
struct Args {
    /// Image file to convert (PNG, JPEG, ...)
    input: PathBuf,

    /// Framing before the resize
    #[arg(long, value_enum, default_value_t = Crop::None)]
    crop: Crop,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coverd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let grid = RasterConverter::default()
        .convert(&bytes, args.crop.into())
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    let json = serde_json::to_string(&grid)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(
                "Wrote {}x{} grid to {}",
                grid.width(),
                grid.height(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
