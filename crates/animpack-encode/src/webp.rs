//! Animated WebP encoder over libwebp's `WebPAnimEncoder`.
//!
//! libwebp wants cumulative millisecond timestamps, and it only emits the
//! last frame's duration when a sentinel empty frame is added after the real
//! ones. The loop count cannot be set through the animation encoder at all:
//! multi-frame outputs are re-opened with `WebPMux` and reassembled with the
//! loop count forced to "repeat indefinitely". Single-frame files carry no
//! ANIM chunk, so they skip that pass.

use std::fs;
use std::mem::MaybeUninit;
use std::path::Path;
use std::ptr;

use libwebp_sys::*;

use animpack_core::{AnimError, AnimResult, FrameSequence, Timeline};

const LOSSLESS_QUALITY: f32 = 95.0;
/// libwebp encodes "repeat indefinitely" as a loop count of zero.
const LOOP_FOREVER: i32 = 0;

/// Owned `WebPAnimEncoder` handle, deleted on every exit path.
struct AnimEncoderHandle(*mut WebPAnimEncoder);

impl Drop for AnimEncoderHandle {
    fn drop(&mut self) {
        unsafe { WebPAnimEncoderDelete(self.0) };
    }
}

/// Owned `WebPMux` handle.
struct MuxHandle(*mut WebPMux);

impl Drop for MuxHandle {
    fn drop(&mut self) {
        unsafe { WebPMuxDelete(self.0) };
    }
}

/// A `WebPData` byte buffer whose backing memory is owned by libwebp.
struct WebpBytes(WebPData);

impl WebpBytes {
    fn empty() -> Self {
        // All-zero WebPData is the documented empty state.
        Self(unsafe { std::mem::zeroed() })
    }

    fn as_slice(&self) -> &[u8] {
        if self.0.bytes.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.0.bytes, self.0.size) }
        }
    }
}

impl Drop for WebpBytes {
    fn drop(&mut self) {
        // WebPDataClear is a header-only inline; WebPFree is the underlying
        // deallocator for libwebp-owned buffers.
        if !self.0.bytes.is_null() {
            unsafe { WebPFree(self.0.bytes as *mut _) };
        }
    }
}

/// A `WebPPicture` freed when the guard goes out of scope. One is created
/// and released per frame; libwebp keeps its own copy inside the encoder.
struct PictureHandle(WebPPicture);

impl PictureHandle {
    fn new(width: u32, height: u32) -> AnimResult<Self> {
        let mut picture = MaybeUninit::<WebPPicture>::uninit();
        let ok = unsafe {
            WebPPictureInitInternal(picture.as_mut_ptr(), WEBP_ENCODER_ABI_VERSION as i32)
        };
        if ok == 0 {
            return Err(AnimError::Config("libwebp library version mismatch".into()));
        }
        let mut picture = unsafe { picture.assume_init() };
        picture.use_argb = 1;
        picture.width = width as i32;
        picture.height = height as i32;
        Ok(Self(picture))
    }
}

impl Drop for PictureHandle {
    fn drop(&mut self) {
        unsafe { WebPPictureFree(&mut self.0) };
    }
}

/// Animated WebP encoder: lossless frames at cumulative millisecond
/// timestamps, looping forever.
pub struct WebpEncoder;

impl WebpEncoder {
    /// Encode a deduplicated frame sequence to an animated WebP file.
    ///
    /// The destination is only opened for writing once the container bytes
    /// are fully assembled in memory; a failed session leaves no file
    /// behind.
    pub fn encode(sequence: &FrameSequence, output_path: &Path) -> AnimResult<()> {
        let bytes = Self::assemble(sequence)?;
        fs::write(output_path, bytes.as_slice())?;

        tracing::info!(
            "Encoded {} frames to WebP at {} ({}x{}, {}cs total)",
            sequence.len(),
            output_path.display(),
            sequence.width(),
            sequence.height(),
            sequence.total_centis(),
        );
        Ok(())
    }

    /// Run the full encoder session and return the finished container bytes.
    fn assemble(sequence: &FrameSequence) -> AnimResult<WebpBytes> {
        let width = sequence.width();
        let height = sequence.height();

        // Init: animation options and per-frame encoding config.
        let mut anim_options = MaybeUninit::<WebPAnimEncoderOptions>::uninit();
        let ok = unsafe {
            WebPAnimEncoderOptionsInitInternal(anim_options.as_mut_ptr(), WEBP_MUX_ABI_VERSION as i32)
        };
        if ok == 0 {
            return Err(AnimError::Config("libwebp mux library version mismatch".into()));
        }
        let mut anim_options = unsafe { anim_options.assume_init() };
        anim_options.allow_mixed = 1;

        let mut config = MaybeUninit::<WebPConfig>::uninit();
        let ok = unsafe {
            WebPConfigInitInternal(
                config.as_mut_ptr(),
                WebPPreset::WEBP_PRESET_DEFAULT,
                LOSSLESS_QUALITY,
                WEBP_ENCODER_ABI_VERSION as i32,
            )
        };
        if ok == 0 {
            return Err(AnimError::Config("libwebp library version mismatch".into()));
        }
        let mut config = unsafe { config.assume_init() };
        config.lossless = 1;
        config.quality = LOSSLESS_QUALITY;
        config.thread_level = 0;
        if unsafe { WebPValidateConfig(&config) } == 0 {
            return Err(AnimError::Config("invalid WebP encoder configuration".into()));
        }

        let raw = unsafe {
            WebPAnimEncoderNewInternal(
                width as i32,
                height as i32,
                &anim_options,
                WEBP_MUX_ABI_VERSION as i32,
            )
        };
        if raw.is_null() {
            return Err(AnimError::Config(
                "could not create WebP animation encoder".into(),
            ));
        }
        let encoder = AnimEncoderHandle(raw);

        // Per-frame: import RGBA into a picture, add at the cumulative
        // timestamp, release the picture.
        let mut timeline = Timeline::new();
        for (index, frame) in sequence.frames().iter().enumerate() {
            let mut picture = PictureHandle::new(width, height)?;
            let stride = 4 * width as i32;
            let ok = unsafe {
                WebPPictureImportRGBA(&mut picture.0, frame.buffer.data.as_ptr(), stride) != 0
                    && WebPAnimEncoderAdd(encoder.0, &mut picture.0, timeline.millis(), &config) != 0
            };
            if !ok {
                return Err(AnimError::frame(
                    index,
                    "webp frame add",
                    format!("encoder rejected frame (picture error {:?})", picture.0.error_code),
                ));
            }
            timeline.advance(frame.hold);
        }

        // Terminate: the sentinel empty frame closes out the last real
        // frame's display duration, then the container is assembled.
        let mut assembled = WebpBytes::empty();
        let ok = unsafe {
            WebPAnimEncoderAdd(encoder.0, ptr::null_mut(), timeline.millis(), ptr::null()) != 0
                && WebPAnimEncoderAssemble(encoder.0, &mut assembled.0) != 0
        };
        if !ok {
            return Err(AnimError::Finalize(
                "error during final WebP animation assembly".into(),
            ));
        }

        if sequence.len() > 1 {
            Self::remux_loop_forever(&assembled)
        } else {
            Ok(assembled)
        }
    }

    /// Re-open the assembled container and force the loop count to
    /// "repeat indefinitely".
    fn remux_loop_forever(assembled: &WebpBytes) -> AnimResult<WebpBytes> {
        let raw = unsafe { WebPMuxCreateInternal(&assembled.0, 1, WEBP_MUX_ABI_VERSION as i32) };
        if raw.is_null() {
            return Err(AnimError::Finalize(
                "could not re-open assembled WebP for remuxing".into(),
            ));
        }
        let mux = MuxHandle(raw);

        let mut params = MaybeUninit::<WebPMuxAnimParams>::uninit();
        let err = unsafe { WebPMuxGetAnimationParams(mux.0, params.as_mut_ptr()) };
        if !matches!(err, WebPMuxError::WEBP_MUX_OK) {
            return Err(AnimError::Finalize(format!(
                "could not read WebP animation params: {:?}",
                err
            )));
        }
        let mut params = unsafe { params.assume_init() };
        params.loop_count = LOOP_FOREVER;
        let err = unsafe { WebPMuxSetAnimationParams(mux.0, &params) };
        if !matches!(err, WebPMuxError::WEBP_MUX_OK) {
            return Err(AnimError::Finalize(format!(
                "could not update WebP loop count: {:?}",
                err
            )));
        }

        let mut remuxed = WebpBytes::empty();
        let err = unsafe { WebPMuxAssemble(mux.0, &mut remuxed.0) };
        if !matches!(err, WebPMuxError::WEBP_MUX_OK) {
            return Err(AnimError::Finalize(format!(
                "could not reassemble WebP after setting loop count: {:?}",
                err
            )));
        }
        Ok(remuxed)
    }
}
