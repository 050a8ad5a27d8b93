//! # animpack-core
//!
//! Core types and primitives for the animpack animation assembler.
//! This crate contains the foundational types shared across all animpack
//! crates: frame buffers, hold-times, timing translation, frame-sequence
//! deduplication, and error types.

pub mod error;
pub mod frame;
pub mod sequence;
pub mod time;

pub use error::{AnimError, AnimResult};
pub use frame::{FrameBuffer, RasterFrame};
pub use sequence::FrameSequence;
pub use time::{HoldTime, Timeline};
