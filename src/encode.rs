//! Still-image encoding.
//!
//! Frames that arrive already compressed pass through byte-for-byte; raw
//! frames are compressed in software at a fixed quality. Output streams
//! through the sink as the encoder produces it, so peak memory tracks one
//! output chunk rather than the whole compressed image. There is no retry: a
//! failure here aborts only the image half of the current cycle.

use std::io::{self, Write};

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::frame::{FrameBuffer, PixelFormat};
use crate::CaptureError;

/// Write `frame` to `sink` as a JPEG, returning the bytes produced.
///
/// Already-JPEG frames pass through unchanged; the write fails unless every
/// declared byte reaches the sink. Raw frames are compressed at `quality`
/// (1-100). Producing zero bytes is a failure on every path.
pub fn write_image<W: Write>(
    frame: &FrameBuffer,
    quality: u8,
    sink: &mut W,
) -> Result<u64, CaptureError> {
    let mut counted = CountingWriter {
        inner: sink,
        written: 0,
    };

    match frame.format() {
        PixelFormat::Jpeg => {
            counted.write_all(frame.bytes())?;
        }
        PixelFormat::Rgb565 => {
            let rgb = rgb565_to_rgb888(frame.bytes(), frame.width(), frame.height())?;
            encode_rgb(&mut counted, &rgb, frame.width(), frame.height(), quality)?;
        }
        PixelFormat::Rgb888 => {
            let expected = pixel_count(frame.width(), frame.height())?
                .checked_mul(3)
                .ok_or_else(|| CaptureError::Encode("frame dimensions overflow".into()))?;
            if frame.len() != expected {
                return Err(CaptureError::Encode(format!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    frame.len()
                )));
            }
            encode_rgb(&mut counted, frame.bytes(), frame.width(), frame.height(), quality)?;
        }
    }

    if counted.written == 0 {
        return Err(CaptureError::Encode("encoder produced no output".into()));
    }
    Ok(counted.written)
}

fn encode_rgb<W: Write>(
    sink: &mut CountingWriter<'_, W>,
    rgb: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<(), CaptureError> {
    let mut encoder = JpegEncoder::new_with_quality(&mut *sink, quality);
    encoder
        .encode(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|err| match err {
            image::ImageError::IoError(e) => CaptureError::StorageWrite(e),
            other => CaptureError::Encode(other.to_string()),
        })
}

/// Expand big-endian RGB565 words to interleaved RGB888, replicating the high
/// bits into the low bits so full-scale values stay full scale.
pub(crate) fn rgb565_to_rgb888(
    pixels: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, CaptureError> {
    let count = pixel_count(width, height)?;
    let expected = count
        .checked_mul(2)
        .ok_or_else(|| CaptureError::Encode("frame dimensions overflow".into()))?;
    if pixels.len() != expected {
        return Err(CaptureError::Encode(format!(
            "RGB565 frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        )));
    }

    let mut rgb = Vec::with_capacity(count * 3);
    for pair in pixels.chunks_exact(2) {
        let word = u16::from_be_bytes([pair[0], pair[1]]);
        let r = ((word >> 11) & 0x1F) as u8;
        let g = ((word >> 5) & 0x3F) as u8;
        let b = (word & 0x1F) as u8;
        rgb.push((r << 3) | (r >> 2));
        rgb.push((g << 2) | (g >> 4));
        rgb.push((b << 3) | (b >> 2));
    }
    Ok(rgb)
}

fn pixel_count(width: u32, height: u32) -> Result<usize, CaptureError> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| CaptureError::Encode("frame dimensions overflow".into()))
}

struct CountingWriter<'a, W: Write> {
    inner: &'a mut W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
