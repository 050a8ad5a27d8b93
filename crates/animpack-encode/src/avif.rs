//! AVIF image-sequence encoder over libavif.
//!
//! libavif takes per-frame durations (not cumulative timestamps) counted in
//! the encoder's declared timescale. The timescale is fixed at 100 units per
//! second, so the pipeline's centisecond hold-times pass through unchanged.

use std::ffi::CStr;
use std::fs;
use std::path::Path;

use libavif_sys::*;

use animpack_core::{AnimError, AnimResult, FrameSequence};

/// Declared timescale: 100 units per second, one unit per centisecond.
const TIMESCALE: u64 = 100;

/// Owned `avifEncoder`, destroyed on every exit path.
struct EncoderHandle(*mut avifEncoder);

impl Drop for EncoderHandle {
    fn drop(&mut self) {
        unsafe { avifEncoderDestroy(self.0) };
    }
}

/// Owned `avifImage` used as the reusable YUV staging image.
struct ImageHandle(*mut avifImage);

impl Drop for ImageHandle {
    fn drop(&mut self) {
        unsafe { avifImageDestroy(self.0) };
    }
}

/// An `avifRWData` buffer whose backing memory is owned by libavif.
struct AvifBytes(avifRWData);

impl AvifBytes {
    fn empty() -> Self {
        // All-zero avifRWData is AVIF_DATA_EMPTY.
        Self(unsafe { std::mem::zeroed() })
    }

    fn as_slice(&self) -> &[u8] {
        if self.0.data.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.0.data, self.0.size) }
        }
    }
}

impl Drop for AvifBytes {
    fn drop(&mut self) {
        unsafe { avifRWDataFree(&mut self.0) };
    }
}

fn result_message(res: avifResult) -> String {
    unsafe { CStr::from_ptr(avifResultToString(res)) }
        .to_string_lossy()
        .into_owned()
}

/// AVIF image-sequence encoder: full-range 8-bit YUV444, bounded quantizer
/// ranges, per-frame delta timing.
pub struct AvifEncoder;

impl AvifEncoder {
    /// Encode a deduplicated frame sequence to an AVIF image sequence.
    ///
    /// `threads` is handed to libavif as its internal worker count; the call
    /// itself stays blocking and synchronous. The destination is only opened
    /// for writing once the container bytes are fully assembled.
    pub fn encode(sequence: &FrameSequence, output_path: &Path, threads: usize) -> AnimResult<()> {
        let bytes = Self::assemble(sequence, threads)?;
        fs::write(output_path, bytes.as_slice())?;

        tracing::info!(
            "Encoded {} frames to AVIF at {} ({}x{}, {}cs total)",
            sequence.len(),
            output_path.display(),
            sequence.width(),
            sequence.height(),
            sequence.total_centis(),
        );
        Ok(())
    }

    fn assemble(sequence: &FrameSequence, threads: usize) -> AnimResult<AvifBytes> {
        let width = sequence.width();
        let height = sequence.height();

        // Init: encoder settings and the empty staging image with declared
        // colorimetry. Keyframe placement is left to the encoder.
        let raw = unsafe { avifEncoderCreate() };
        if raw.is_null() {
            return Err(AnimError::Config("could not create AVIF encoder".into()));
        }
        let encoder = EncoderHandle(raw);
        unsafe {
            (*encoder.0).maxThreads = threads as i32;
            (*encoder.0).minQuantizer = 5;
            (*encoder.0).maxQuantizer = 20;
            (*encoder.0).minQuantizerAlpha = 0;
            (*encoder.0).maxQuantizerAlpha = 10;
            (*encoder.0).tileColsLog2 = 2;
            (*encoder.0).tileRowsLog2 = 2;
            (*encoder.0).speed = 4;
            (*encoder.0).timescale = TIMESCALE;
            (*encoder.0).keyframeInterval = 0;
        }

        let raw = unsafe { avifImageCreateEmpty() };
        if raw.is_null() {
            return Err(AnimError::Config("could not create AVIF image".into()));
        }
        let image = ImageHandle(raw);
        unsafe {
            (*image.0).colorPrimaries = AVIF_COLOR_PRIMARIES_BT709 as _;
            (*image.0).transferCharacteristics = AVIF_TRANSFER_CHARACTERISTICS_SRGB as _;
            (*image.0).matrixCoefficients = AVIF_MATRIX_COEFFICIENTS_BT601 as _;
            (*image.0).yuvRange = AVIF_RANGE_FULL as _;
            (*image.0).alphaPremultiplied = AVIF_FALSE as _;
            (*image.0).width = width;
            (*image.0).height = height;
            (*image.0).depth = 8;
            (*image.0).yuvFormat = AVIF_PIXEL_FORMAT_YUV444 as _;
        }

        // Per-frame: convert RGBA into the staging image, then add it with
        // its own hold-time as the duration.
        for (index, frame) in sequence.frames().iter().enumerate() {
            let mut rgb: avifRGBImage = unsafe { std::mem::zeroed() };
            unsafe { avifRGBImageSetDefaults(&mut rgb, image.0) };
            rgb.format = AVIF_RGB_FORMAT_RGBA as _;
            rgb.depth = 8;
            rgb.rowBytes = 4 * width;
            // libavif reads but never writes through this pointer.
            rgb.pixels = frame.buffer.data.as_ptr() as *mut u8;

            let res = unsafe { avifImageRGBToYUV(image.0, &rgb) };
            if res != AVIF_RESULT_OK {
                return Err(AnimError::frame(index, "color conversion", result_message(res)));
            }

            let duration = u64::from(frame.hold.as_centis());
            let res = unsafe {
                avifEncoderAddImage(encoder.0, image.0, duration, AVIF_ADD_IMAGE_FLAG_NONE as _)
            };
            if res != AVIF_RESULT_OK {
                return Err(AnimError::frame(index, "frame add", result_message(res)));
            }
        }

        // Finalize: assemble the container honoring the thread count.
        let mut output = AvifBytes::empty();
        let res = unsafe { avifEncoderFinish(encoder.0, &mut output.0) };
        if res != AVIF_RESULT_OK {
            return Err(AnimError::Finalize(format!(
                "failed to finish AVIF encode: {}",
                result_message(res)
            )));
        }
        Ok(output)
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
    fn test_avif_encode_single_frame() {
        let seq = sequence(&[[0, 255, 0, 255]]);
        let out = std::env::temp_dir().join("animpack_test_single.avif");
        let result = AvifEncoder::encode(&seq, &out, 1);
        assert!(result.is_ok(), "AVIF encode failed: {:?}", result.err());

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.len() > 8);
        assert_eq!(&bytes[4..8], b"ftyp");

        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn test_avif_encode_timed_sequence() {
        // Three distinct frames, 4cs each: three adds of duration 4 in the
        // 100 units/second timescale.
        let seq = sequence(&[
            [255, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
        ]);
        let out = std::env::temp_dir().join("animpack_test_multi.avif");
        let result = AvifEncoder::encode(&seq, &out, 2);
        assert!(result.is_ok(), "AVIF encode failed: {:?}", result.err());

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[4..8], b"ftyp");

        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn test_avif_failed_session_leaves_no_file() {
        let frames = vec![RasterFrame::new(
            FrameBuffer::new(0, 0),
            HoldTime::from_centis(4).unwrap(),
        )];
        let seq = FrameSequence::from_frames(frames).unwrap();
        let out = std::env::temp_dir().join("animpack_test_invalid.avif");
        let _ = std::fs::remove_file(&out);

        let result = AvifEncoder::encode(&seq, &out, 1);
        assert!(matches!(
            result,
            Err(AnimError::Frame { .. } | AnimError::Config(_))
        ));
        assert!(!out.exists());
    }
}
