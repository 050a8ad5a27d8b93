//! # animpack-encode
//!
//! Encoder back ends for the animpack pipeline — each module drives one
//! third-party animation container library over a deduplicated
//! [`FrameSequence`](animpack_core::FrameSequence):
//!
//! - [`webp`]: animated WebP via libwebp's `WebPAnimEncoder` (plus a
//!   `WebPMux` remux pass for the loop count),
//! - [`avif`]: AVIF image sequences via libavif's timed add-image path,
//! - [`gif`]: GIF via gifski.
//!
//! [`output::encode_outputs`] dispatches a frame sequence to every requested
//! output, one backend session at a time.

pub mod avif;
pub mod gif;
pub mod output;
pub mod webp;

pub use avif::AvifEncoder;
pub use gif::GifEncoder;
pub use output::{encode_outputs, EncodeOptions, OutputKind, OutputSpec};
pub use webp::WebpEncoder;
