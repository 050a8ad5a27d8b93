use crate::time::HoldTime;

/// A single decoded raster image as a raw RGBA8 pixel buffer
/// (4 bytes per pixel, RGBA channel order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Raw pixel data, `width * height * 4` bytes.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize) * (height as usize) * 4;
        Self {
            data: vec![0u8; size],
            width,
            height,
        }
    }

    /// Create a frame buffer from raw RGBA bytes. Returns None if the byte
    /// length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    /// Create a frame buffer filled with a solid RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgba);
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data[offset..offset + 4].copy_from_slice(&rgba);
    }

    /// Exact (bitwise) equality against another buffer: dimensions must match
    /// and every channel of every pixel must be identical. Never perceptual,
    /// never tolerance-based.
    pub fn same_pixels(&self, other: &FrameBuffer) -> bool {
        self.width == other.width && self.height == other.height && self.data == other.data
    }
}

/// A decoded frame together with the duration it stays on screen.
#[derive(Debug, Clone)]
pub struct RasterFrame {
    /// The decoded RGBA8 pixel buffer.
    pub buffer: FrameBuffer,
    /// How long the frame is displayed before the next one.
    pub hold: HoldTime,
}

impl RasterFrame {
    pub fn new(buffer: FrameBuffer, hold: HoldTime) -> Self {
        Self { buffer, hold }
    }
}
