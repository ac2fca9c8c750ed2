//! fieldcamd - field camera capture daemon
//!
//! This daemon:
//! 1. Loads layered configuration (defaults, config file, environment)
//! 2. Opens the output directory on the mounted volume
//! 3. Builds the camera and microphone sources
//! 4. Warms up the sensor and runs the capture loop until Ctrl-C
//!
//! Hardware bring-up (buses, pins, volume mount) happens before this process
//! is started; board support crates supply real sources in place of the
//! built-in `stub://` ones.

use anyhow::Result;

use fieldcam::{ingest, CaptureConfig, CaptureLoop, MediaDir, ShutdownFlag};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = CaptureConfig::load()?;
    let media = MediaDir::open(&cfg.output_dir)?;
    let camera = ingest::open_camera(&cfg.camera_source, &cfg.settings.sensor)?;
    let mic = ingest::open_mic(&cfg.mic_source, cfg.settings.wav)?;

    let shutdown = ShutdownFlag::new();
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        handler_flag.set();
    })
    .expect("error setting Ctrl-C handler");

    log::info!("fieldcamd running. writing to {}", media.root().display());
    log::info!(
        "camera={} mic={} clip={}ms interval={}ms quality={}",
        cfg.camera_source,
        cfg.mic_source,
        cfg.settings.clip_duration.as_millis(),
        cfg.settings.cycle_interval.as_millis(),
        cfg.settings.jpeg_quality
    );

    let mut capture = CaptureLoop::new(camera, mic, media, cfg.settings);
    capture.run(&shutdown);

    log::info!("shutdown complete");
    Ok(())
}
