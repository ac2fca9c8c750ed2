//! Synthetic capture sources.
//!
//! Deterministic stand-ins for the camera and microphone drivers: a moving
//! test-pattern camera with a bounded buffer pool and a sine-tone microphone.
//! Used by tests and by `stub://` daemon runs on hardware-less hosts. Neither
//! source ever blocks.

use std::f32::consts::TAU;

use crate::clip::SampleSource;
use crate::frame::{FrameBuffer, FrameSource, PixelFormat, SensorSettings};
use crate::wav::WavSpec;
use crate::CaptureError;

/// Configuration for the synthetic camera.
#[derive(Clone, Debug)]
pub struct SyntheticCameraConfig {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Buffer pool depth. Acquisitions past this without a release fail,
    /// mirroring a starved driver pool.
    pub pool_frames: usize,
}

impl Default for SyntheticCameraConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            format: PixelFormat::Rgb565,
            pool_frames: 2,
        }
    }
}

/// Synthetic camera serving a gradient pattern that drifts frame to frame.
pub struct SyntheticCamera {
    config: SyntheticCameraConfig,
    frames_served: u64,
    outstanding: usize,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticCameraConfig) -> Self {
        Self {
            config,
            frames_served: 0,
            outstanding: 0,
        }
    }

    /// Frames handed out since construction.
    pub fn frames_served(&self) -> u64 {
        self.frames_served
    }

    /// Frames currently on loan.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    fn render_pattern(&self) -> Vec<u8> {
        let (w, h) = (self.config.width as usize, self.config.height as usize);
        let drift = self.frames_served as usize;
        match self.config.format {
            PixelFormat::Rgb565 => {
                let mut data = Vec::with_capacity(w * h * 2);
                for y in 0..h {
                    for x in 0..w {
                        let r = ((x + drift) % 32) as u16;
                        let g = ((y + drift) % 64) as u16;
                        let b = ((x + y) % 32) as u16;
                        let word = (r << 11) | (g << 5) | b;
                        data.extend_from_slice(&word.to_be_bytes());
                    }
                }
                data
            }
            PixelFormat::Rgb888 => {
                let mut data = Vec::with_capacity(w * h * 3);
                for y in 0..h {
                    for x in 0..w {
                        data.push(((x + drift) % 256) as u8);
                        data.push(((y + drift) % 256) as u8);
                        data.push(((x + y) % 256) as u8);
                    }
                }
                data
            }
            PixelFormat::Jpeg => {
                // Opaque payload framed by JPEG markers; pass-through never
                // inspects the bytes in between.
                let mut data = vec![0xFF, 0xD8];
                data.extend((0..w * h / 8).map(|i| ((i + drift) % 256) as u8));
                data.extend_from_slice(&[0xFF, 0xD9]);
                data
            }
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn acquire_frame(&mut self) -> Result<FrameBuffer, CaptureError> {
        if self.outstanding >= self.config.pool_frames {
            return Err(CaptureError::Acquire(format!(
                "frame pool exhausted ({} outstanding)",
                self.outstanding
            )));
        }
        self.outstanding += 1;
        let data = self.render_pattern();
        self.frames_served += 1;
        Ok(FrameBuffer::new(
            data,
            self.config.format,
            self.config.width,
            self.config.height,
        ))
    }

    fn release_frame(&mut self, frame: FrameBuffer) {
        drop(frame.into_data());
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    fn configure_sensor(&mut self, settings: &SensorSettings) -> Result<(), CaptureError> {
        self.config.width = settings.width;
        self.config.height = settings.height;
        log::debug!(
            "synthetic sensor configured: {}x{} brightness={} contrast={}",
            settings.width,
            settings.height,
            settings.brightness,
            settings.contrast
        );
        Ok(())
    }
}

/// Configuration for the synthetic microphone.
#[derive(Clone, Debug)]
pub struct SyntheticMicConfig {
    pub spec: WavSpec,
    pub tone_hz: u32,
}

impl Default for SyntheticMicConfig {
    fn default() -> Self {
        Self {
            spec: WavSpec::default(),
            tone_hz: 440,
        }
    }
}

/// Synthetic microphone producing a continuous sine tone.
///
/// The byte cursor persists across reads, so consecutive blocks are
/// phase-continuous regardless of block sizes.
pub struct SyntheticMic {
    config: SyntheticMicConfig,
    byte_cursor: u64,
    blocks_served: u64,
}

impl SyntheticMic {
    pub fn new(config: SyntheticMicConfig) -> Self {
        Self {
            config,
            byte_cursor: 0,
            blocks_served: 0,
        }
    }

    /// Blocks delivered since construction.
    pub fn blocks_served(&self) -> u64 {
        self.blocks_served
    }

    fn amplitude_at(&self, frame_index: u64) -> f32 {
        let t = frame_index as f32 / self.config.spec.sample_rate as f32;
        0.25 * (TAU * self.config.tone_hz as f32 * t).sin()
    }
}

impl SampleSource for SyntheticMic {
    fn read_block(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        let spec = self.config.spec;
        let bytes_per_sample = (spec.bits_per_sample / 8).max(1) as u64;
        let frame_len = spec.block_align().max(1) as u64;

        for out in buf.iter_mut() {
            let frame_index = self.byte_cursor / frame_len;
            let byte_in_sample = (self.byte_cursor % frame_len) % bytes_per_sample;
            let amplitude = self.amplitude_at(frame_index);
            *out = match spec.bits_per_sample {
                // 8-bit WAV samples are unsigned.
                8 => ((amplitude + 1.0) * 127.5) as u8,
                _ => {
                    let sample = (amplitude * i16::MAX as f32) as i16;
                    sample.to_le_bytes()[byte_in_sample as usize]
                }
            };
            self.byte_cursor += 1;
        }
        self.blocks_served += 1;
        Ok(buf.len())
    }
}
