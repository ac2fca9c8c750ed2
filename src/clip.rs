//! Streaming audio container writer.
//!
//! One clip per invocation: create the file, reserve a placeholder header,
//! append sample blocks pulled from the microphone stream, then patch the
//! header with the sizes that actually landed. A clip that fails mid-stream
//! still gets its header patched before the file closes, so whatever is on
//! disk parses as a well-formed (possibly shorter) recording.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Duration;

use crate::wav::{self, WavSpec};
use crate::CaptureError;

/// Nominal bytes pulled from the sample stream per read.
pub const SAMPLE_BLOCK_BYTES: usize = 1024;

/// Microphone collaborator: a blocking PCM sample stream.
pub trait SampleSource {
    /// Fill `buf` with raw little-endian PCM bytes, blocking until data is
    /// ready. Returns the number of bytes read, at most `buf.len()`.
    fn read_block(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError>;
}

/// Incremental writer for one WAV artifact.
///
/// Construction reserves the placeholder header (payload size 0) occupying
/// the exact final header width; `append` streams payload while tracking the
/// bytes that actually reached the sink; `finalize` seeks back and overwrites
/// the header in place with the true sizes. Callers on failure paths must
/// still finalize so the file stays parseable.
pub struct ClipWriter<W: Write + Seek> {
    sink: W,
    spec: WavSpec,
    payload_bytes: u32,
}

impl<W: Write + Seek> ClipWriter<W> {
    /// Reserve the placeholder header at the head of `sink`.
    pub fn new(mut sink: W, spec: WavSpec) -> Result<Self, CaptureError> {
        sink.write_all(&wav::header_bytes(&spec, 0))?;
        Ok(Self {
            sink,
            spec,
            payload_bytes: 0,
        })
    }

    /// Payload bytes that have reached the sink so far.
    pub fn payload_bytes(&self) -> u32 {
        self.payload_bytes
    }

    /// Append one sample block.
    ///
    /// A short write advances the payload counter by the bytes that landed
    /// and is fatal for this clip.
    pub fn append(&mut self, block: &[u8]) -> Result<(), CaptureError> {
        let written = self.sink.write(block)?;
        self.payload_bytes += written as u32;
        if written < block.len() {
            return Err(CaptureError::ShortWrite {
                written,
                expected: block.len(),
            });
        }
        Ok(())
    }

    /// Patch the header with the true payload size and hand the sink back for
    /// the final sync/close.
    pub fn finalize(mut self) -> Result<(u32, W), CaptureError> {
        self.sink.seek(SeekFrom::Start(0))?;
        self.sink
            .write_all(&wav::header_bytes(&self.spec, self.payload_bytes))?;
        self.sink.flush()?;
        Ok((self.payload_bytes, self.sink))
    }
}

/// Record `duration` worth of samples from `source` into a WAV file at `path`.
///
/// The payload never exceeds the duration's byte budget; the final read is
/// clipped so the budget is hit exactly. Stream-read failures and short
/// writes abort the clip, but the header is still patched with the bytes that
/// reached storage before the file is synced and closed. Returns the payload
/// byte count on success.
pub fn record_clip(
    source: &mut dyn SampleSource,
    path: &Path,
    spec: WavSpec,
    duration: Duration,
) -> Result<u32, CaptureError> {
    let file = File::create(path).map_err(|source| CaptureError::StorageOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = ClipWriter::new(file, spec)?;

    let budget = spec.clip_budget_bytes(duration);
    let mut block = [0u8; SAMPLE_BLOCK_BYTES];
    let mut failure = None;

    while writer.payload_bytes() < budget {
        let want = SAMPLE_BLOCK_BYTES.min((budget - writer.payload_bytes()) as usize);
        let got = match source.read_block(&mut block[..want]) {
            Ok(0) => {
                failure = Some(CaptureError::StreamRead("sample stream ended early".into()));
                break;
            }
            Ok(got) => got,
            Err(e) => {
                failure = Some(e);
                break;
            }
        };
        if let Err(e) = writer.append(&block[..got]) {
            failure = Some(e);
            break;
        }
    }

    // The header patch runs on failure paths too: a clip that died mid-stream
    // must still parse, sized to the bytes that landed.
    let finalized = writer.finalize().and_then(|(payload, file)| {
        file.sync_all()?;
        Ok(payload)
    });

    match failure {
        Some(inner) => Err(CaptureError::AudioCapture(Box::new(inner))),
        None => finalized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    use crate::ingest::{SyntheticMic, SyntheticMicConfig};
    use crate::wav::{parse_header, WAV_HEADER_LEN};

    const MIC: WavSpec = WavSpec {
        sample_rate: 16_000,
        bits_per_sample: 16,
        channels: 1,
    };

    fn synthetic_mic() -> SyntheticMic {
        SyntheticMic::new(SyntheticMicConfig {
            spec: MIC,
            tone_hz: 440,
        })
    }

    /// Source that delivers from an inner mic until a byte limit, then fails.
    struct FailingMic {
        inner: SyntheticMic,
        remaining: usize,
    }

    impl SampleSource for FailingMic {
        fn read_block(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
            if self.remaining == 0 {
                return Err(CaptureError::StreamRead("bus fault".into()));
            }
            let take = buf.len().min(self.remaining);
            let got = self.inner.read_block(&mut buf[..take])?;
            self.remaining -= got;
            Ok(got)
        }
    }

    /// Full-volume sink: overwriting already-allocated bytes succeeds, but
    /// growing the file beyond `accept` new bytes short-writes.
    struct ShortSink {
        inner: Cursor<Vec<u8>>,
        accept: usize,
    }

    impl Write for ShortSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let pos = self.inner.position() as usize;
            let overwrite = self.inner.get_ref().len().saturating_sub(pos);
            let take = buf.len().min(overwrite + self.accept);
            self.accept -= take.saturating_sub(overwrite);
            self.inner.write(&buf[..take])
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl Seek for ShortSink {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn three_second_clip_matches_budget_exactly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("aud00000.wav");
        let mut mic = synthetic_mic();

        let payload =
            record_clip(&mut mic, &path, MIC, Duration::from_millis(3000)).expect("record");
        assert_eq!(payload, 96_000);

        let bytes = std::fs::read(&path).expect("read clip");
        assert_eq!(bytes.len(), 96_044);

        let header = parse_header(&bytes).expect("parse");
        assert_eq!(header.data_len, 96_000);
        assert_eq!(header.riff_size, 96_036);
        assert_eq!(header.sample_count(), 48_000);
        assert_eq!(header.spec, MIC);
    }

    #[test]
    fn final_block_is_clipped_to_budget() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clip.wav");
        let mut mic = synthetic_mic();

        // 150 ms at 32000 B/s = 4800 bytes: 4 full blocks + one 704-byte read.
        let payload =
            record_clip(&mut mic, &path, MIC, Duration::from_millis(150)).expect("record");
        assert_eq!(payload, 4_800);

        let len = std::fs::metadata(&path).expect("metadata").len();
        assert_eq!(len, (WAV_HEADER_LEN + 4_800) as u64);
    }

    #[test]
    fn stream_failure_leaves_parseable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clip.wav");
        let mut mic = FailingMic {
            inner: synthetic_mic(),
            remaining: 2048,
        };

        let err = record_clip(&mut mic, &path, MIC, Duration::from_millis(3000))
            .expect_err("must fail");
        match err {
            CaptureError::AudioCapture(inner) => {
                assert!(matches!(*inner, CaptureError::StreamRead(_)))
            }
            other => panic!("unexpected error: {other}"),
        }

        // The two delivered blocks are on disk under a header that counts them.
        let bytes = std::fs::read(&path).expect("read clip");
        assert_eq!(bytes.len(), WAV_HEADER_LEN + 2048);
        let header = parse_header(&bytes).expect("parse");
        assert_eq!(header.data_len, 2048);
        assert_eq!(header.riff_size, 36 + 2048);
    }

    #[test]
    fn short_write_is_fatal_and_counted() {
        // Header (44) plus 100 payload bytes fit; the next append short-writes.
        let sink = ShortSink {
            inner: Cursor::new(Vec::new()),
            accept: WAV_HEADER_LEN + 100,
        };
        let mut writer = ClipWriter::new(sink, MIC).expect("reserve header");

        writer.append(&[0u8; 64]).expect("first block fits");
        let err = writer.append(&[0u8; 64]).expect_err("short write");
        match err {
            CaptureError::ShortWrite { written, expected } => {
                assert_eq!(written, 36);
                assert_eq!(expected, 64);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(writer.payload_bytes(), 100);
        let (payload, mut sink) = writer.finalize().expect("finalize");
        assert_eq!(payload, 100);

        sink.inner.seek(SeekFrom::Start(0)).expect("rewind");
        let mut bytes = Vec::new();
        sink.inner.read_to_end(&mut bytes).expect("read back");
        let header = parse_header(&bytes).expect("parse");
        assert_eq!(header.data_len, 100);
    }

    #[test]
    fn placeholder_header_declares_empty_payload() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let writer = ClipWriter::new(&mut cursor, MIC).expect("reserve");
            assert_eq!(writer.payload_bytes(), 0);
            // Dropped without finalize: simulates a power cut mid-capture.
        }
        let bytes = cursor.into_inner();
        assert_eq!(bytes.len(), WAV_HEADER_LEN);
        let header = parse_header(&bytes).expect("parse");
        assert_eq!(header.data_len, 0);
        assert_eq!(header.sample_count(), 0);
    }
}
