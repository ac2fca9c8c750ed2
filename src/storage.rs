//! Media directory layout.
//!
//! Artifacts land in one flat directory on the mounted volume: an
//! `imgNNNNN.jpg` / `audNNNNN.wav` pair per capture cycle, ordinal
//! zero-padded to five digits. Growth is unbounded; rotation and cleanup are
//! operator concerns. The core never remounts the volume, it only opens,
//! writes, and closes files inside it.

use std::path::{Path, PathBuf};

use crate::CaptureError;

/// The output directory for captured media.
pub struct MediaDir {
    root: PathBuf,
}

impl MediaDir {
    /// Open the output directory, creating it if the volume doesn't have it yet.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| CaptureError::StorageOpen {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Image artifact path for one capture cycle.
    pub fn image_path(&self, cycle: u32) -> PathBuf {
        self.root.join(format!("img{cycle:05}.jpg"))
    }

    /// Audio artifact path for the same cycle.
    pub fn audio_path(&self, cycle: u32) -> PathBuf {
        self.root.join(format!("aud{cycle:05}.wav"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_seven_filenames() {
        let media = MediaDir {
            root: PathBuf::from("/sdcard"),
        };
        assert_eq!(media.image_path(7), PathBuf::from("/sdcard/img00007.jpg"));
        assert_eq!(media.audio_path(7), PathBuf::from("/sdcard/aud00007.wav"));
    }

    #[test]
    fn ordinals_zero_pad_to_five_digits() {
        let media = MediaDir {
            root: PathBuf::from("/sdcard"),
        };
        assert_eq!(media.image_path(0), PathBuf::from("/sdcard/img00000.jpg"));
        // Past five digits the name simply widens.
        assert_eq!(
            media.image_path(123_456),
            PathBuf::from("/sdcard/img123456.jpg")
        );
    }

    #[test]
    fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("media");
        let media = MediaDir::open(&root).expect("open");
        assert!(root.is_dir());
        assert_eq!(media.root(), root);
    }
}
