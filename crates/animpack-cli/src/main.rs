use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use animpack_core::{AnimError, FrameBuffer, FrameSequence, HoldTime, RasterFrame};
use animpack_encode::{encode_outputs, EncodeOptions, OutputKind, OutputSpec};

#[derive(Parser)]
#[command(
    name = "animpack",
    version,
    about = "Assemble still PNG frames into animated WebP, AVIF, and GIF files"
)]
struct Cli {
    /// Input PNG frames, in display order (repeatable)
    #[arg(short, long = "input", required = true)]
    input: Vec<PathBuf>,

    /// Output files; format chosen by extension: .webp, .avif, .gif (repeatable)
    #[arg(short, long = "output", required = true)]
    output: Vec<PathBuf>,

    /// How long each frame stays on screen, in 100ths of a second
    #[arg(short, long, default_value_t = 4)]
    delay: u32,

    /// Worker threads for backends that encode in parallel
    #[arg(short, long)]
    threads: Option<usize>,
}

/// Decode one input PNG into an RGBA8 frame buffer.
fn decode_png(path: &Path) -> Result<FrameBuffer, AnimError> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return Err(AnimError::decode(
            "unsupported input file type (expected .png)",
            path,
        ));
    }
    let decoded = image::open(path).map_err(|e| AnimError::decode(e.to_string(), path))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameBuffer::from_raw(width, height, rgba.into_raw())
        .ok_or_else(|| AnimError::decode("decoded buffer size mismatch", path))
}

/// Decode every input PNG, enforcing the canvas guarantee the encoders
/// rely on: all buffers must match the first frame's dimensions. The
/// backends feed raw pointers with the canvas stride into C libraries, so
/// a mismatched frame must never get past this point.
fn load_frames(paths: &[PathBuf], hold: HoldTime) -> Result<Vec<RasterFrame>, AnimError> {
    let mut frames = Vec::with_capacity(paths.len());
    let mut canvas: Option<(u32, u32)> = None;
    for path in paths {
        let buffer = decode_png(path)?;
        match canvas {
            None => canvas = Some((buffer.width, buffer.height)),
            Some((width, height)) if (buffer.width, buffer.height) != (width, height) => {
                return Err(AnimError::decode(
                    format!(
                        "image dimensions {}x{} do not match first frame ({}x{})",
                        buffer.width, buffer.height, width, height
                    ),
                    path,
                ));
            }
            Some(_) => {}
        }
        frames.push(RasterFrame::new(buffer, hold));
    }
    Ok(frames)
}

/// Pick the backend for an output path by its extension.
fn output_kind(path: &Path) -> Result<OutputKind> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("webp") => Ok(OutputKind::Webp),
        Some("avif") => Ok(OutputKind::Avif),
        Some("gif") => Ok(OutputKind::Gif),
        _ => bail!(
            "\"{}\" is an unsupported file type for an output image (expected .webp, .avif or .gif)",
            path.display()
        ),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if cli.delay == 0 {
        bail!("{} is not a valid value for delay", cli.delay);
    }
    let hold = HoldTime::from_centis(cli.delay)?;

    let mut options = EncodeOptions::default();
    if let Some(threads) = cli.threads {
        if threads == 0 {
            bail!("{} is not a valid value for threads", threads);
        }
        options.threads = threads;
    }

    let outputs = cli
        .output
        .iter()
        .map(|path| Ok(OutputSpec::new(output_kind(path)?, path)))
        .collect::<Result<Vec<_>>>()?;

    let frames = load_frames(&cli.input, hold).context("could not load input frames")?;

    let decoded = frames.len();
    let sequence = FrameSequence::from_frames(frames)?;
    tracing::info!(
        "{} input frames deduplicated to {} ({}x{}, {}cs total)",
        decoded,
        sequence.len(),
        sequence.width(),
        sequence.height(),
        sequence.total_centis(),
    );

    encode_outputs(&sequence, &outputs, &options)?;
    Ok(())
}
