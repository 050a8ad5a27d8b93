//! Frame-sequence assembly and deduplication.
//!
//! Consecutive bit-identical frames are collapsed before any encoder sees
//! them: the duplicate's hold-time is folded into its predecessor and its
//! pixel buffer is dropped. Deduplication runs exactly once, at ingestion.

use crate::error::{AnimError, AnimResult};
use crate::frame::RasterFrame;

/// An ordered, non-empty list of frames with no two adjacent entries
/// pixel-identical, plus the canvas dimensions shared by every frame.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<RasterFrame>,
    width: u32,
    height: u32,
}

impl FrameSequence {
    /// Build a sequence from frames in arrival order, merging consecutive
    /// bit-identical frames as described above.
    ///
    /// Canvas dimensions are recorded from the first *surviving* frame, so
    /// a run that opens with two identical frames still sizes the canvas
    /// correctly. All frames are assumed to share the first frame's
    /// dimensions (a decode-time guarantee, not re-validated here).
    ///
    /// Fails with `InvalidArgument` if `frames` is empty.
    pub fn from_frames(frames: Vec<RasterFrame>) -> AnimResult<Self> {
        // Left-fold into a fresh vector rather than mutating in place, so
        // runs of several consecutive duplicates cannot shift indices out
        // from under the scan.
        let mut folded: Vec<RasterFrame> = Vec::with_capacity(frames.len());
        for frame in frames {
            match folded.last_mut() {
                Some(last) if last.buffer.same_pixels(&frame.buffer) => {
                    last.hold.merge(frame.hold);
                    // frame.buffer dropped here; the deduplicator is the
                    // only stage allowed to free an absorbed buffer.
                }
                _ => folded.push(frame),
            }
        }

        let first = folded.first().ok_or_else(|| {
            AnimError::InvalidArgument("frame sequence must contain at least one frame".into())
        })?;
        let (width, height) = (first.buffer.width, first.buffer.height);

        Ok(Self {
            frames: folded,
            width,
            height,
        })
    }

    /// The deduplicated frames, in order.
    pub fn frames(&self) -> &[RasterFrame] {
        &self.frames
    }

    /// Number of frames after deduplication.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; an empty sequence cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total animation duration in centiseconds.
    pub fn total_centis(&self) -> u64 {
        self.frames
            .iter()
            .map(|f| u64::from(f.hold.as_centis()))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameBuffer;
    use crate::time::HoldTime;

    fn frame(rgba: [u8; 4], hold_centis: u32) -> RasterFrame {
        RasterFrame::new(
            FrameBuffer::solid(4, 4, rgba),
            HoldTime::from_centis(hold_centis).unwrap(),
        )
    }

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    #[test]
    fn test_empty_input_rejected() {
        let result = FrameSequence::from_frames(vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_single_frame_unchanged() {
        let seq = FrameSequence::from_frames(vec![frame(RED, 7)]).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.frames()[0].hold.as_centis(), 7);
        assert_eq!((seq.width(), seq.height()), (4, 4));
    }

    #[test]
    fn test_identical_pair_merges_holds() {
        // Two identical frames with holds 4 and 6 collapse into one frame
        // holding for 10.
        let seq = FrameSequence::from_frames(vec![frame(RED, 4), frame(RED, 6)]).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.frames()[0].hold.as_centis(), 10);
    }

    #[test]
    fn test_distinct_frames_unchanged() {
        let seq =
            FrameSequence::from_frames(vec![frame(RED, 4), frame(GREEN, 5), frame(BLUE, 6)])
                .unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.total_centis(), 15);
    }

    #[test]
    fn test_run_of_duplicates_folds_into_one() {
        let seq = FrameSequence::from_frames(vec![
            frame(RED, 1),
            frame(RED, 2),
            frame(RED, 3),
            frame(GREEN, 4),
            frame(GREEN, 4),
        ])
        .unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.frames()[0].hold.as_centis(), 6);
        assert_eq!(seq.frames()[1].hold.as_centis(), 8);
    }

    #[test]
    fn test_non_adjacent_duplicates_kept() {
        // A-B-A must stay three frames; only *consecutive* duplicates merge.
        let seq =
            FrameSequence::from_frames(vec![frame(RED, 4), frame(GREEN, 4), frame(RED, 4)])
                .unwrap();
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn test_total_hold_preserved() {
        let inputs = vec![
            frame(RED, 3),
            frame(RED, 5),
            frame(GREEN, 2),
            frame(GREEN, 2),
            frame(BLUE, 1),
        ];
        let before: u64 = inputs.iter().map(|f| u64::from(f.hold.as_centis())).sum();
        let seq = FrameSequence::from_frames(inputs).unwrap();
        assert_eq!(seq.total_centis(), before);
    }

    #[test]
    fn test_dedup_idempotent() {
        let seq = FrameSequence::from_frames(vec![
            frame(RED, 4),
            frame(RED, 6),
            frame(GREEN, 2),
            frame(BLUE, 2),
            frame(BLUE, 2),
        ])
        .unwrap();
        let holds: Vec<u32> = seq.frames().iter().map(|f| f.hold.as_centis()).collect();

        let again = FrameSequence::from_frames(seq.frames().to_vec()).unwrap();
        let holds_again: Vec<u32> = again.frames().iter().map(|f| f.hold.as_centis()).collect();
        assert_eq!(holds, holds_again);
        assert_eq!(seq.len(), again.len());
    }

    #[test]
    fn test_no_adjacent_equal_frames_after_dedup() {
        let seq = FrameSequence::from_frames(vec![
            frame(RED, 1),
            frame(RED, 1),
            frame(GREEN, 1),
            frame(GREEN, 1),
            frame(RED, 1),
        ])
        .unwrap();
        for pair in seq.frames().windows(2) {
            assert!(!pair[0].buffer.same_pixels(&pair[1].buffer));
        }
    }

    #[test]
    fn test_canvas_from_first_surviving_frame() {
        // The leading duplicate pair merges; the canvas must still come from
        // the merged (surviving) frame, not be lost to the fold.
        let seq = FrameSequence::from_frames(vec![frame(RED, 4), frame(RED, 4), frame(GREEN, 4)])
            .unwrap();
        assert_eq!((seq.width(), seq.height()), (4, 4));
        assert_eq!(seq.len(), 2);
    }
}
