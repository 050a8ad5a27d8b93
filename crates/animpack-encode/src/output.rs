//! Output dispatch: one backend session per requested output spec.
//!
//! Specs are processed strictly sequentially; no two sessions run at once
//! and no state is shared between them. The first failing spec aborts the
//! run — outputs written by earlier specs are never rolled back, and later
//! specs are not attempted.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use animpack_core::{AnimError, AnimResult, FrameSequence};

use crate::{AvifEncoder, GifEncoder, WebpEncoder};

/// The output container family, one per backend driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Animated WebP (lossless, libwebp).
    Webp,
    /// AVIF image sequence (libavif).
    Avif,
    /// GIF (gifski).
    Gif,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputKind::Webp => "webp",
            OutputKind::Avif => "avif",
            OutputKind::Gif => "gif",
        };
        write!(f, "{}", name)
    }
}

/// One requested output: a container family and a destination path.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub kind: OutputKind,
    pub path: PathBuf,
}

impl OutputSpec {
    pub fn new(kind: OutputKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Knobs shared by every backend session in a run.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Worker count handed to backends that parallelize internally (AVIF).
    pub threads: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Encode the frame sequence once per requested output spec.
///
/// Fails with `InvalidArgument` before any backend session is created when
/// `outputs` is empty.
pub fn encode_outputs(
    sequence: &FrameSequence,
    outputs: &[OutputSpec],
    options: &EncodeOptions,
) -> AnimResult<()> {
    if outputs.is_empty() {
        return Err(AnimError::InvalidArgument(
            "at least one output file is required".into(),
        ));
    }

    for spec in outputs {
        tracing::debug!("encoding {} output to {}", spec.kind, spec.path.display());
        match spec.kind {
            OutputKind::Webp => WebpEncoder::encode(sequence, &spec.path)?,
            OutputKind::Avif => AvifEncoder::encode(sequence, &spec.path, options.threads)?,
            OutputKind::Gif => GifEncoder::encode(sequence, &spec.path)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use animpack_core::{FrameBuffer, HoldTime, RasterFrame};

    fn tiny_sequence() -> FrameSequence {
        FrameSequence::from_frames(vec![RasterFrame::new(
            FrameBuffer::solid(2, 2, [255, 255, 255, 255]),
            HoldTime::from_centis(4).unwrap(),
        )])
        .unwrap()
    }

    #[test]
    fn test_empty_output_list_rejected() {
        let seq = tiny_sequence();
        let result = encode_outputs(&seq, &[], &EncodeOptions::default());
        assert!(matches!(result, Err(AnimError::InvalidArgument(_))));
    }

    #[test]
    fn test_dispatch_selects_matching_backend() {
        let seq = tiny_sequence();
        let out = std::env::temp_dir().join("animpack_test_dispatch.gif");
        let specs = [OutputSpec::new(OutputKind::Gif, &out)];
        let result = encode_outputs(&seq, &specs, &EncodeOptions::default());
        assert!(result.is_ok(), "dispatch failed: {:?}", result.err());

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[0..3], b"GIF");

        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn test_output_kind_display() {
        assert_eq!(OutputKind::Webp.to_string(), "webp");
        assert_eq!(OutputKind::Avif.to_string(), "avif");
        assert_eq!(OutputKind::Gif.to_string(), "gif");
    }
}
