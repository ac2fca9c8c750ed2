use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::frame::SensorSettings;
use crate::sched::CaptureSettings;
use crate::wav::WavSpec;

const DEFAULT_OUTPUT_DIR: &str = "/sdcard";
const DEFAULT_CAMERA_SOURCE: &str = "stub://ov3660";
const DEFAULT_MIC_SOURCE: &str = "stub://pdm0";
const DEFAULT_JPEG_QUALITY: u8 = 80;
const DEFAULT_SAMPLE_RATE_HZ: u32 = 16_000;
const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
const DEFAULT_CHANNELS: u16 = 1;
const DEFAULT_CLIP_MS: u64 = 3_000;
const DEFAULT_CYCLE_INTERVAL_MS: u64 = 5_000;
const DEFAULT_WARMUP_MS: u64 = 200;

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    output_dir: Option<String>,
    camera: Option<CameraConfigFile>,
    audio: Option<AudioConfigFile>,
    schedule: Option<ScheduleConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    source: Option<String>,
    jpeg_quality: Option<u8>,
    width: Option<u32>,
    height: Option<u32>,
    brightness: Option<i8>,
    contrast: Option<i8>,
}

#[derive(Debug, Deserialize, Default)]
struct AudioConfigFile {
    source: Option<String>,
    sample_rate_hz: Option<u32>,
    bits_per_sample: Option<u16>,
    channels: Option<u16>,
    clip_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ScheduleConfigFile {
    cycle_interval_ms: Option<u64>,
    warmup_ms: Option<u64>,
}

/// Daemon configuration: compile-time defaults, overridable by a JSON config
/// file (`FIELDCAM_CONFIG`) and then by environment variables.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub output_dir: PathBuf,
    pub camera_source: String,
    pub mic_source: String,
    pub settings: CaptureSettings,
}

impl CaptureConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FIELDCAM_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CaptureConfigFile) -> Self {
        let output_dir = PathBuf::from(
            file.output_dir
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
        );
        let camera = file.camera.unwrap_or_default();
        let audio = file.audio.unwrap_or_default();
        let schedule = file.schedule.unwrap_or_default();

        let settings = CaptureSettings {
            jpeg_quality: camera.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
            wav: WavSpec {
                sample_rate: audio.sample_rate_hz.unwrap_or(DEFAULT_SAMPLE_RATE_HZ),
                bits_per_sample: audio.bits_per_sample.unwrap_or(DEFAULT_BITS_PER_SAMPLE),
                channels: audio.channels.unwrap_or(DEFAULT_CHANNELS),
            },
            clip_duration: Duration::from_millis(audio.clip_ms.unwrap_or(DEFAULT_CLIP_MS)),
            cycle_interval: Duration::from_millis(
                schedule
                    .cycle_interval_ms
                    .unwrap_or(DEFAULT_CYCLE_INTERVAL_MS),
            ),
            warmup_delay: Duration::from_millis(schedule.warmup_ms.unwrap_or(DEFAULT_WARMUP_MS)),
            sensor: {
                let defaults = SensorSettings::default();
                SensorSettings {
                    width: camera.width.unwrap_or(defaults.width),
                    height: camera.height.unwrap_or(defaults.height),
                    brightness: camera.brightness.unwrap_or(defaults.brightness),
                    contrast: camera.contrast.unwrap_or(defaults.contrast),
                }
            },
        };

        Self {
            output_dir,
            camera_source: camera
                .source
                .unwrap_or_else(|| DEFAULT_CAMERA_SOURCE.to_string()),
            mic_source: audio
                .source
                .unwrap_or_else(|| DEFAULT_MIC_SOURCE.to_string()),
            settings,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("FIELDCAM_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }
        if let Ok(source) = std::env::var("FIELDCAM_CAMERA_SOURCE") {
            if !source.trim().is_empty() {
                self.camera_source = source;
            }
        }
        if let Ok(source) = std::env::var("FIELDCAM_MIC_SOURCE") {
            if !source.trim().is_empty() {
                self.mic_source = source;
            }
        }
        if let Ok(ms) = std::env::var("FIELDCAM_CLIP_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| anyhow!("FIELDCAM_CLIP_MS must be an integer number of ms"))?;
            self.settings.clip_duration = Duration::from_millis(ms);
        }
        if let Ok(ms) = std::env::var("FIELDCAM_CYCLE_INTERVAL_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                anyhow!("FIELDCAM_CYCLE_INTERVAL_MS must be an integer number of ms")
            })?;
            self.settings.cycle_interval = Duration::from_millis(ms);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let s = &self.settings;
        if s.jpeg_quality == 0 || s.jpeg_quality > 100 {
            return Err(anyhow!("jpeg_quality must be in 1..=100"));
        }
        if s.wav.sample_rate == 0 {
            return Err(anyhow!("sample_rate_hz must be greater than zero"));
        }
        if !matches!(s.wav.bits_per_sample, 8 | 16) {
            return Err(anyhow!("bits_per_sample must be 8 or 16"));
        }
        if !matches!(s.wav.channels, 1 | 2) {
            return Err(anyhow!("channels must be 1 or 2"));
        }
        if s.clip_duration.is_zero() {
            return Err(anyhow!("clip_ms must be greater than zero"));
        }
        if s.sensor.width == 0 || s.sensor.height == 0 {
            return Err(anyhow!("sensor frame size must be nonzero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<CaptureConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let cfg = CaptureConfig::from_file(CaptureConfigFile::default());
        assert_eq!(cfg.output_dir, PathBuf::from("/sdcard"));
        assert_eq!(cfg.camera_source, "stub://ov3660");
        assert_eq!(cfg.mic_source, "stub://pdm0");
        assert_eq!(cfg.settings.wav.sample_rate, 16_000);
        assert_eq!(cfg.settings.clip_duration, Duration::from_millis(3_000));
        assert_eq!(cfg.settings.cycle_interval, Duration::from_millis(5_000));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn file_fields_override_defaults() {
        let file: CaptureConfigFile = serde_json::from_str(
            r#"{
                "output_dir": "/mnt/card/capture",
                "camera": { "jpeg_quality": 60, "width": 640, "height": 480 },
                "audio": { "sample_rate_hz": 22050, "clip_ms": 1500 },
                "schedule": { "cycle_interval_ms": 10000 }
            }"#,
        )
        .expect("parse");
        let cfg = CaptureConfig::from_file(file);

        assert_eq!(cfg.output_dir, PathBuf::from("/mnt/card/capture"));
        assert_eq!(cfg.settings.jpeg_quality, 60);
        assert_eq!(cfg.settings.sensor.width, 640);
        assert_eq!(cfg.settings.wav.sample_rate, 22_050);
        assert_eq!(cfg.settings.clip_duration, Duration::from_millis(1_500));
        assert_eq!(cfg.settings.cycle_interval, Duration::from_millis(10_000));
        // Unset fields keep their defaults.
        assert_eq!(cfg.settings.wav.channels, 1);
        assert_eq!(cfg.mic_source, "stub://pdm0");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = CaptureConfig::from_file(CaptureConfigFile::default());
        cfg.settings.jpeg_quality = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = CaptureConfig::from_file(CaptureConfigFile::default());
        cfg.settings.wav.bits_per_sample = 24;
        assert!(cfg.validate().is_err());

        let mut cfg = CaptureConfig::from_file(CaptureConfigFile::default());
        cfg.settings.clip_duration = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }
}
