//! Capture cycle scheduler.
//!
//! One sequential loop drives the whole device: capture a still, record a
//! clip, sleep, repeat. Within a cycle the image step fully completes before
//! the audio step starts, and each cycle's files are flushed and closed
//! before the next cycle writes: the storage volume is a single-writer
//! resource and is accessed strictly serially. Failures are contained per
//! step: a bad frame or a failed clip is logged and the loop moves on.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clip::{record_clip, SampleSource};
use crate::encode;
use crate::frame::{FrameLease, FrameSource, SensorSettings};
use crate::storage::MediaDir;
use crate::wav::WavSpec;
use crate::CaptureError;

/// Cooperative stop signal for the capture loop.
///
/// Production runs forever; the daemon sets the flag only on shutdown
/// (Ctrl-C). Tests set it directly.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fixed knobs for a capture loop. All compile-time defaults; there is no
/// runtime reconfiguration.
#[derive(Clone, Debug)]
pub struct CaptureSettings {
    /// JPEG quality for frames that need software encoding (1-100).
    pub jpeg_quality: u8,
    /// PCM format the microphone delivers and the container declares.
    pub wav: WavSpec,
    /// Nominal audio clip length per cycle.
    pub clip_duration: Duration,
    /// Delay between cycles, applied after the work (actual period >= nominal).
    pub cycle_interval: Duration,
    /// Settle delay after the warm-up frame discard.
    pub warmup_delay: Duration,
    /// One-time sensor tuning applied before the loop.
    pub sensor: SensorSettings,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: 80,
            wav: WavSpec::default(),
            clip_duration: Duration::from_millis(3000),
            cycle_interval: Duration::from_millis(5000),
            warmup_delay: Duration::from_millis(200),
            sensor: SensorSettings::default(),
        }
    }
}

/// What one cycle produced. Either half may fail without affecting the other.
#[derive(Debug)]
pub struct CycleOutcome {
    pub cycle: u32,
    /// Image bytes written, or why the image step was abandoned.
    pub image: Result<u64, CaptureError>,
    /// Audio payload bytes written, or why the clip was abandoned.
    pub audio: Result<u32, CaptureError>,
}

/// The capture loop: owns the camera, the microphone, and the output
/// directory for the life of the process.
pub struct CaptureLoop {
    camera: Box<dyn FrameSource>,
    mic: Box<dyn SampleSource>,
    media: MediaDir,
    settings: CaptureSettings,
    cycle: u32,
}

impl CaptureLoop {
    pub fn new(
        camera: Box<dyn FrameSource>,
        mic: Box<dyn SampleSource>,
        media: MediaDir,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            camera,
            mic,
            media,
            settings,
            cycle: 0,
        }
    }

    /// Cycles completed so far (also the next cycle's ordinal).
    pub fn cycles_completed(&self) -> u32 {
        self.cycle
    }

    /// One-time pre-loop sequence: sensor tuning, first-frame discard, settle
    /// delay. Nothing here is fatal; the loop starts regardless.
    pub fn warm_up(&mut self) {
        if let Err(e) = self.camera.configure_sensor(&self.settings.sensor) {
            log::warn!("sensor configuration failed: {}", e);
        }
        // The first frame out of reset is exposed before the sensor settles.
        match FrameLease::acquire(self.camera.as_mut()) {
            Ok(lease) => drop(lease),
            Err(e) => log::warn!("warm-up frame discard failed: {}", e),
        }
        std::thread::sleep(self.settings.warmup_delay);
    }

    /// Run one capture cycle: image, then audio, then advance the counter.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let cycle = self.cycle;

        let image_path = self.media.image_path(cycle);
        let image = self.capture_image(&image_path);
        match &image {
            Ok(bytes) => log::info!("saved image {} ({} bytes)", image_path.display(), bytes),
            Err(e) => log::error!("cycle {}: {}", cycle, e),
        }

        let audio_path = self.media.audio_path(cycle);
        let audio = record_clip(
            self.mic.as_mut(),
            &audio_path,
            self.settings.wav,
            self.settings.clip_duration,
        );
        match &audio {
            Ok(bytes) => log::info!(
                "saved audio {} ({} payload bytes)",
                audio_path.display(),
                bytes
            ),
            Err(e) => log::error!("cycle {}: {}", cycle, e),
        }

        self.cycle += 1;
        CycleOutcome {
            cycle,
            image,
            audio,
        }
    }

    /// Run cycles until `shutdown` is set.
    ///
    /// The inter-cycle delay starts after the cycle's work, so the actual
    /// period is at least the nominal interval; the sleep is sliced so a
    /// shutdown request is honored promptly.
    pub fn run(&mut self, shutdown: &ShutdownFlag) {
        self.warm_up();
        while !shutdown.is_set() {
            self.run_cycle();
            sleep_unless_shutdown(self.settings.cycle_interval, shutdown);
        }
        log::info!("capture loop stopped after {} cycles", self.cycle);
    }

    fn capture_image(&mut self, path: &Path) -> Result<u64, CaptureError> {
        // The lease returns the frame to the driver on every exit path below.
        let lease = FrameLease::acquire(self.camera.as_mut())?;
        let file = File::create(path).map_err(|source| CaptureError::StorageOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let mut sink = BufWriter::new(file);
        let written = encode::write_image(&lease, self.settings.jpeg_quality, &mut sink)?;
        sink.flush()?;
        Ok(written)
    }
}

fn sleep_unless_shutdown(total: Duration, shutdown: &ShutdownFlag) {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = total;
    while !shutdown.is_set() && !remaining.is_zero() {
        let step = remaining.min(SLICE);
        std::thread::sleep(step);
        remaining -= step;
    }
}
