//! Borrowed camera frames.
//!
//! - `FrameBuffer`: opaque pixel data on loan from the camera driver.
//! - `FrameSource`: the camera collaborator (acquire/release/configure).
//! - `FrameLease`: guard tying every acquisition to exactly one release.
//!
//! The driver owns a small pool of capture buffers. A frame held past its
//! cycle starves that pool and eventually stalls capture entirely, so the
//! lease returns the buffer on every exit path, success or failure.

use std::ops::Deref;

use crate::CaptureError;

/// Pixel layout of a captured frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Already-compressed JPEG bytes; written to storage unchanged.
    Jpeg,
    /// 16-bit RGB565, big-endian words as delivered by the sensor.
    Rgb565,
    /// 24-bit interleaved RGB.
    Rgb888,
}

impl PixelFormat {
    /// True when frames in this format need no software encoding.
    pub fn is_encoded(self) -> bool {
        matches!(self, PixelFormat::Jpeg)
    }
}

/// A frame on loan from the camera driver for the duration of one capture.
#[derive(Debug)]
pub struct FrameBuffer {
    data: Vec<u8>,
    format: PixelFormat,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    /// Called by sources when the driver hands out a frame.
    pub fn new(data: Vec<u8>, format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            data,
            format,
            width,
            height,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Driver side: reclaim the allocation when the frame returns to the pool.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// One-time sensor tuning applied before the first real capture.
#[derive(Clone, Copy, Debug)]
pub struct SensorSettings {
    pub width: u32,
    pub height: u32,
    pub brightness: i8,
    pub contrast: i8,
}

impl Default for SensorSettings {
    fn default() -> Self {
        // SVGA with a slight brightness lift; values the sensor tolerates
        // straight out of reset.
        Self {
            width: 800,
            height: 600,
            brightness: 1,
            contrast: 0,
        }
    }
}

/// Camera collaborator.
///
/// `acquire_frame` may block until the driver has a frame ready; the driver
/// is configured to wait for a free buffer rather than drop frames. Every
/// successful acquisition must be matched by exactly one `release_frame`,
/// which `FrameLease` enforces.
pub trait FrameSource {
    /// Block until the next frame is available.
    fn acquire_frame(&mut self) -> Result<FrameBuffer, CaptureError>;

    /// Return a frame's buffer to the driver pool.
    fn release_frame(&mut self, frame: FrameBuffer);

    /// One-time sensor configuration. Sources without a tunable sensor keep
    /// the default no-op.
    fn configure_sensor(&mut self, settings: &SensorSettings) -> Result<(), CaptureError> {
        let _ = settings;
        Ok(())
    }
}

impl std::fmt::Debug for dyn FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn FrameSource")
    }
}

/// Guard for a borrowed frame.
///
/// Dropping the lease returns the frame to its source, so early returns and
/// `?` propagation on the capture path cannot leak a pool buffer.
pub struct FrameLease<'a> {
    source: &'a mut dyn FrameSource,
    frame: Option<FrameBuffer>,
}

impl<'a> FrameLease<'a> {
    /// Acquire the next frame from `source`, wrapped so it is returned on drop.
    pub fn acquire(source: &'a mut dyn FrameSource) -> Result<Self, CaptureError> {
        let frame = source.acquire_frame()?;
        Ok(Self {
            source,
            frame: Some(frame),
        })
    }
}

impl Deref for FrameLease<'_> {
    type Target = FrameBuffer;

    fn deref(&self) -> &FrameBuffer {
        self.frame.as_ref().expect("lease holds a frame until drop")
    }
}

impl Drop for FrameLease<'_> {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.source.release_frame(frame);
        }
    }
}
