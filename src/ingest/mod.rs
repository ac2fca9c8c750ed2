//! Capture sources.
//!
//! This module provides the in-process capture sources:
//! - Synthetic camera (test-pattern frames, `stub://` selection)
//! - Synthetic microphone (tone PCM, `stub://` selection)
//!
//! Hardware sources (the image sensor behind the parallel bus, the PDM
//! microphone behind I2S) are board support, supplied out of tree as
//! `FrameSource` / `SampleSource` implementations and wired in by the board's
//! own daemon. The selection helpers here accept `stub://` names and reject
//! anything else rather than pretend a driver exists.

mod synthetic;

pub use synthetic::{SyntheticCamera, SyntheticCameraConfig, SyntheticMic, SyntheticMicConfig};

use anyhow::{anyhow, Result};

use crate::clip::SampleSource;
use crate::frame::{FrameSource, PixelFormat, SensorSettings};
use crate::wav::WavSpec;

/// Build the camera source named by `source` (e.g. `stub://ov3660`).
pub fn open_camera(source: &str, sensor: &SensorSettings) -> Result<Box<dyn FrameSource>> {
    if source.starts_with("stub://") {
        let camera = SyntheticCamera::new(SyntheticCameraConfig {
            width: sensor.width,
            height: sensor.height,
            format: PixelFormat::Rgb565,
            pool_frames: 2,
        });
        log::info!("camera source {} (synthetic)", source);
        return Ok(Box::new(camera));
    }
    Err(anyhow!(
        "camera source '{}' requires board support; only stub:// sources are built in",
        source
    ))
}

/// Build the microphone source named by `source` (e.g. `stub://pdm0`).
pub fn open_mic(source: &str, spec: WavSpec) -> Result<Box<dyn SampleSource>> {
    if source.starts_with("stub://") {
        let mic = SyntheticMic::new(SyntheticMicConfig { spec, tone_hz: 440 });
        log::info!("microphone source {} (synthetic)", source);
        return Ok(Box::new(mic));
    }
    Err(anyhow!(
        "microphone source '{}' requires board support; only stub:// sources are built in",
        source
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_sources_resolve() {
        assert!(open_camera("stub://ov3660", &SensorSettings::default()).is_ok());
        assert!(open_mic("stub://pdm0", WavSpec::default()).is_ok());
    }

    #[test]
    fn hardware_sources_are_rejected() {
        let err = open_camera("dvp://ov3660", &SensorSettings::default())
            .expect_err("no board support");
        assert!(err.to_string().contains("board support"));
        assert!(open_mic("i2s://pdm0", WavSpec::default()).is_err());
    }
}
