//! fieldcam - capture core for a battery-class field camera.
//!
//! The device wakes, captures a still image and a short audio clip, writes
//! both to removable storage, sleeps, and repeats. This crate implements the
//! one part of the firmware with real state and failure handling: the media
//! capture and persistence loop. Bus bring-up, pin assignment, and volume
//! mounting are collaborators behind the `FrameSource` and `SampleSource`
//! traits and an ordinary mounted directory.
//!
//! # Module Structure
//!
//! - `frame`: borrowed camera frames (`FrameBuffer`, `FrameSource`, `FrameLease`)
//! - `ingest`: capture sources (synthetic stub camera and microphone)
//! - `encode`: JPEG pass-through / software compression
//! - `wav`: RIFF/WAVE header codec
//! - `clip`: streaming audio container writer
//! - `storage`: media directory and per-cycle filenames
//! - `sched`: the capture cycle loop
//! - `config`: layered daemon configuration

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod clip;
pub mod config;
pub mod encode;
pub mod frame;
pub mod ingest;
pub mod sched;
pub mod storage;
pub mod wav;

pub use clip::{record_clip, ClipWriter, SampleSource, SAMPLE_BLOCK_BYTES};
pub use config::CaptureConfig;
pub use encode::write_image;
pub use frame::{FrameBuffer, FrameLease, FrameSource, PixelFormat, SensorSettings};
pub use ingest::{
    open_camera, open_mic, SyntheticCamera, SyntheticCameraConfig, SyntheticMic,
    SyntheticMicConfig,
};
pub use sched::{CaptureLoop, CaptureSettings, CycleOutcome, ShutdownFlag};
pub use storage::MediaDir;
pub use wav::{WavSpec, WAV_HEADER_LEN};

/// Failure kinds for the capture loop, one tag per fallible operation.
///
/// Every error is contained at the step that raised it: the scheduler logs it
/// and abandons the step, never the process and never the sibling step. There
/// are no retries within a cycle; the next opportunity is the next cycle.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The camera driver had no frame to hand out.
    #[error("frame acquisition failed: {0}")]
    Acquire(String),

    /// The JPEG transform failed or produced no bytes.
    #[error("image encode failed: {0}")]
    Encode(String),

    /// A target file could not be created on the storage volume.
    #[error("failed to open {}: {source}", path.display())]
    StorageOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A write, seek, flush, or sync against storage failed.
    #[error("storage write failed: {0}")]
    StorageWrite(#[from] io::Error),

    /// Storage accepted fewer bytes than were handed to it. The short-write
    /// subcase of a storage write failure, kept distinct so callers can see
    /// how much actually landed.
    #[error("short write: {written} of {expected} bytes reached storage")]
    ShortWrite { written: usize, expected: usize },

    /// The microphone sample stream failed mid-read.
    #[error("sample stream read failed: {0}")]
    StreamRead(String),

    /// Composite outcome for the audio step: the stream or storage failed
    /// while a clip was being recorded.
    #[error("audio capture failed: {0}")]
    AudioCapture(#[source] Box<CaptureError>),
}
