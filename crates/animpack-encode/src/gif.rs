//! GIF encoder over gifski.
//!
//! gifski wants each frame's *presentation offset* in fractional seconds —
//! the cumulative sum of the hold-times of every earlier frame — so the
//! first frame is always submitted at 0.0 and a frame's own hold-time only
//! affects the frames after it.

use std::fs::File;
use std::path::Path;
use std::thread;

use gifski::progress::NoProgress;
use gifski::{Repeat, Settings};
use imgref::ImgVec;
use rgb::RGBA8;

use animpack_core::{AnimError, AnimResult, FrameSequence, Timeline};

const GIF_QUALITY: u8 = 95;

/// GIF encoder: palette-based, full compression effort, looping forever,
/// writing straight to the destination file.
pub struct GifEncoder;

impl GifEncoder {
    /// Encode a deduplicated frame sequence to a GIF file.
    pub fn encode(sequence: &FrameSequence, output_path: &Path) -> AnimResult<()> {
        let settings = Settings {
            width: Some(sequence.width()),
            height: Some(sequence.height()),
            quality: GIF_QUALITY,
            fast: false,
            repeat: Repeat::Infinite,
        };
        let (collector, writer) = gifski::new(settings)
            .map_err(|e| AnimError::Config(format!("could not create gifski encoder: {}", e)))?;

        let file = File::create(output_path)?;

        // gifski streams frames through a bounded internal queue; the writer
        // half drains it on its own thread while frames are collected, and
        // finishes once the collector is dropped.
        let writer_thread = thread::spawn(move || {
            let mut progress = NoProgress {};
            writer.write(file, &mut progress)
        });

        let mut timeline = Timeline::new();
        let mut frame_error = None;
        for (index, frame) in sequence.frames().iter().enumerate() {
            let pixels: Vec<RGBA8> = frame
                .buffer
                .data
                .chunks_exact(4)
                .map(|p| RGBA8::new(p[0], p[1], p[2], p[3]))
                .collect();
            let image = ImgVec::new(
                pixels,
                sequence.width() as usize,
                sequence.height() as usize,
            );

            if let Err(e) = collector.add_frame_rgba(index, image, timeline.seconds()) {
                frame_error = Some(AnimError::frame(index, "gif frame add", e.to_string()));
                break;
            }
            timeline.advance(frame.hold);
        }

        // Dropping the collector closes the queue so the writer can finish;
        // it must be joined even when a frame failed, or its handle would
        // outlive the session.
        drop(collector);
        let write_result = writer_thread
            .join()
            .map_err(|_| AnimError::Finalize("gif writer thread panicked".into()))?;

        if let Some(err) = frame_error {
            return Err(err);
        }
        write_result.map_err(|e| AnimError::Finalize(format!("failed to finish GIF: {}", e)))?;

        tracing::info!(
            "Encoded {} frames to GIF at {} ({}x{}, {}cs total)",
            sequence.len(),
            output_path.display(),
            sequence.width(),
            sequence.height(),
            sequence.total_centis(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animpack_core::{FrameBuffer, HoldTime, RasterFrame};

    fn sequence(colors: &[[u8; 4]]) -> FrameSequence {
        let frames = colors
            .iter()
            .map(|&c| {
                RasterFrame::new(FrameBuffer::solid(4, 4, c), HoldTime::from_centis(4).unwrap())
            })
            .collect();
        FrameSequence::from_frames(frames).unwrap()
    }

    #[test]
    fn test_gif_encode_multi_frame() {
        let seq = sequence(&[
            [255, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
        ]);
        let out = std::env::temp_dir().join("animpack_test_multi.gif");
        let result = GifEncoder::encode(&seq, &out);
        assert!(result.is_ok(), "GIF encode failed: {:?}", result.err());

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[0..6], b"GIF89a");

        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn test_gif_encode_single_frame() {
        let seq = sequence(&[[200, 100, 50, 255]]);
        let out = std::env::temp_dir().join("animpack_test_single.gif");
        let result = GifEncoder::encode(&seq, &out);
        assert!(result.is_ok(), "GIF encode failed: {:?}", result.err());

        let meta = std::fs::metadata(&out).unwrap();
        assert!(meta.len() > 0);

        let _ = std::fs::remove_file(&out);
    }
}
