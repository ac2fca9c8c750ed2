//! RIFF/WAVE container header codec.
//!
//! The audio artifact is a canonical 44-byte PCM WAV: a header describing the
//! payload, followed by raw little-endian samples. The header is written
//! twice per clip: once as a placeholder (payload size 0) when the file is
//! created, and once with the true sizes when the clip finalizes. Both writes
//! occupy the same 44 bytes, so the patch is an in-place overwrite.
//!
//! Layout:
//!
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    riff size = 36 + payload bytes (excludes the 8-byte id+size prefix)
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16 (PCM format chunk size)
//! [20-21]  1 (linear PCM)
//! [22-23]  channels
//! [24-27]  sample rate
//! [28-31]  byte rate = rate * channels * bytes per sample
//! [32-33]  block align = channels * bytes per sample
//! [34-35]  bits per sample
//! [36-39]  "data"
//! [40-43]  payload bytes
//! ```

use std::time::Duration;

use anyhow::{anyhow, Result};

/// Size of the container header in bytes.
pub const WAV_HEADER_LEN: usize = 44;

/// Declared PCM format of a clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        // 16 kHz 16-bit mono, the PDM microphone's native delivery format.
        Self {
            sample_rate: 16_000,
            bits_per_sample: 16,
            channels: 1,
        }
    }
}

impl WavSpec {
    /// Bytes per sample frame across all channels.
    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    /// Payload bytes per second.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Payload budget for a clip of `duration`, truncated to whole bytes.
    pub fn clip_budget_bytes(&self, duration: Duration) -> u32 {
        (self.byte_rate() as u64 * duration.as_millis() as u64 / 1000) as u32
    }
}

/// Build the 44-byte header for a clip carrying `data_len` payload bytes.
pub fn header_bytes(spec: &WavSpec, data_len: u32) -> [u8; WAV_HEADER_LEN] {
    let riff_size = WAV_HEADER_LEN as u32 - 8 + data_len;
    let mut hdr = [0u8; WAV_HEADER_LEN];

    hdr[0..4].copy_from_slice(b"RIFF");
    hdr[4..8].copy_from_slice(&riff_size.to_le_bytes());
    hdr[8..12].copy_from_slice(b"WAVE");

    hdr[12..16].copy_from_slice(b"fmt ");
    hdr[16..20].copy_from_slice(&16u32.to_le_bytes());
    hdr[20..22].copy_from_slice(&1u16.to_le_bytes());
    hdr[22..24].copy_from_slice(&spec.channels.to_le_bytes());
    hdr[24..28].copy_from_slice(&spec.sample_rate.to_le_bytes());
    hdr[28..32].copy_from_slice(&spec.byte_rate().to_le_bytes());
    hdr[32..34].copy_from_slice(&spec.block_align().to_le_bytes());
    hdr[34..36].copy_from_slice(&spec.bits_per_sample.to_le_bytes());

    hdr[36..40].copy_from_slice(b"data");
    hdr[40..44].copy_from_slice(&data_len.to_le_bytes());

    hdr
}

/// Header fields read back from disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavHeader {
    pub spec: WavSpec,
    pub riff_size: u32,
    pub data_len: u32,
}

impl WavHeader {
    /// Sample frames declared by the header.
    pub fn sample_count(&self) -> u32 {
        self.data_len / self.spec.block_align() as u32
    }

    /// Declared clip length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.data_len as f64 / self.spec.byte_rate() as f64
    }
}

/// Parse and validate a 44-byte PCM WAV header.
///
/// Strict: derived fields (byte rate, block align) must match the declared
/// sample rate, depth, and channel count.
pub fn parse_header(bytes: &[u8]) -> Result<WavHeader> {
    if bytes.len() < WAV_HEADER_LEN {
        return Err(anyhow!(
            "header truncated: {} of {} bytes",
            bytes.len(),
            WAV_HEADER_LEN
        ));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(anyhow!("not a RIFF/WAVE container"));
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(anyhow!("unexpected chunk layout"));
    }

    let fmt_size = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    if fmt_size != 16 {
        return Err(anyhow!("unsupported fmt chunk size {}", fmt_size));
    }
    let format_code = u16::from_le_bytes([bytes[20], bytes[21]]);
    if format_code != 1 {
        return Err(anyhow!("unsupported format code {} (want linear PCM)", format_code));
    }

    let spec = WavSpec {
        channels: u16::from_le_bytes([bytes[22], bytes[23]]),
        sample_rate: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
        bits_per_sample: u16::from_le_bytes([bytes[34], bytes[35]]),
    };
    if spec.channels == 0
        || spec.sample_rate == 0
        || spec.bits_per_sample == 0
        || spec.bits_per_sample % 8 != 0
    {
        return Err(anyhow!(
            "implausible format: {} Hz, {}-bit, {} channel(s)",
            spec.sample_rate,
            spec.bits_per_sample,
            spec.channels
        ));
    }

    let byte_rate = u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]);
    let block_align = u16::from_le_bytes([bytes[32], bytes[33]]);
    if byte_rate != spec.byte_rate() || block_align != spec.block_align() {
        return Err(anyhow!(
            "derived fields inconsistent: byte rate {} (want {}), block align {} (want {})",
            byte_rate,
            spec.byte_rate(),
            block_align,
            spec.block_align()
        ));
    }

    Ok(WavHeader {
        spec,
        riff_size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        data_len: u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIC: WavSpec = WavSpec {
        sample_rate: 16_000,
        bits_per_sample: 16,
        channels: 1,
    };

    #[test]
    fn header_magics() {
        let hdr = header_bytes(&MIC, 0);
        assert_eq!(hdr.len(), WAV_HEADER_LEN);
        assert_eq!(&hdr[0..4], b"RIFF");
        assert_eq!(&hdr[8..12], b"WAVE");
        assert_eq!(&hdr[12..16], b"fmt ");
        assert_eq!(&hdr[36..40], b"data");
    }

    #[test]
    fn header_fields_for_mic_spec() {
        let hdr = header_bytes(&MIC, 96_000);

        assert_eq!(u32::from_le_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]), 96_036);
        assert_eq!(u16::from_le_bytes([hdr[20], hdr[21]]), 1);
        assert_eq!(u16::from_le_bytes([hdr[22], hdr[23]]), 1);
        assert_eq!(
            u32::from_le_bytes([hdr[24], hdr[25], hdr[26], hdr[27]]),
            16_000
        );
        assert_eq!(
            u32::from_le_bytes([hdr[28], hdr[29], hdr[30], hdr[31]]),
            32_000
        );
        assert_eq!(u16::from_le_bytes([hdr[32], hdr[33]]), 2);
        assert_eq!(u16::from_le_bytes([hdr[34], hdr[35]]), 16);
        assert_eq!(
            u32::from_le_bytes([hdr[40], hdr[41], hdr[42], hdr[43]]),
            96_000
        );
    }

    #[test]
    fn placeholder_then_patch_same_width() {
        let placeholder = header_bytes(&MIC, 0);
        let finalized = header_bytes(&MIC, 1234);
        assert_eq!(placeholder.len(), finalized.len());
        // Only the two size fields differ.
        assert_eq!(placeholder[8..40], finalized[8..40]);
    }

    #[test]
    fn clip_budget_for_three_seconds() {
        assert_eq!(
            MIC.clip_budget_bytes(Duration::from_millis(3000)),
            96_000
        );
    }

    #[test]
    fn clip_budget_truncates_to_whole_bytes() {
        let spec = WavSpec {
            sample_rate: 11_025,
            bits_per_sample: 8,
            channels: 1,
        };
        // 11.025 bytes/ms truncates.
        assert_eq!(spec.clip_budget_bytes(Duration::from_millis(1)), 11);
    }

    #[test]
    fn parse_round_trips_built_header() {
        let spec = WavSpec {
            sample_rate: 48_000,
            bits_per_sample: 16,
            channels: 2,
        };
        let parsed = parse_header(&header_bytes(&spec, 9_600)).expect("parse");
        assert_eq!(parsed.spec, spec);
        assert_eq!(parsed.riff_size, 36 + 9_600);
        assert_eq!(parsed.data_len, 9_600);
        assert_eq!(parsed.sample_count(), 9_600 / 4);
    }

    #[test]
    fn parse_rejects_bad_magic() {
        let mut hdr = header_bytes(&MIC, 0);
        hdr[0] = b'X';
        assert!(parse_header(&hdr).is_err());
    }

    #[test]
    fn parse_rejects_truncated_header() {
        let hdr = header_bytes(&MIC, 0);
        assert!(parse_header(&hdr[..20]).is_err());
    }

    #[test]
    fn parse_rejects_inconsistent_byte_rate() {
        let mut hdr = header_bytes(&MIC, 0);
        hdr[28..32].copy_from_slice(&999u32.to_le_bytes());
        assert!(parse_header(&hdr).is_err());
    }

    #[test]
    fn duration_from_header() {
        let parsed = parse_header(&header_bytes(&MIC, 96_000)).expect("parse");
        assert!((parsed.duration_secs() - 3.0).abs() < 1e-9);
    }
}
