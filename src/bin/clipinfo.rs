//! clipinfo - inspect a recorded clip's container header
//!
//! Prints the declared format and sizes of a WAV clip and checks them against
//! the bytes actually on disk, so a card pulled from a device can be
//! sanity-checked without an audio player. A clip interrupted mid-capture
//! shows up here as shorter than requested but still consistent.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use fieldcam::wav::{parse_header, WAV_HEADER_LEN};

#[derive(Parser, Debug)]
#[command(name = "clipinfo", about = "Inspect a fieldcam WAV clip header")]
struct Args {
    /// Path to the .wav clip
    clip: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut file = File::open(&args.clip)?;
    let file_len = file.metadata()?.len();
    let mut header = [0u8; WAV_HEADER_LEN];
    file.read_exact(&mut header)
        .map_err(|_| anyhow!("{}: shorter than a WAV header", args.clip.display()))?;
    let parsed = parse_header(&header)?;

    println!("{}", args.clip.display());
    println!(
        "  format:      {} Hz, {}-bit, {} channel(s)",
        parsed.spec.sample_rate, parsed.spec.bits_per_sample, parsed.spec.channels
    );
    println!(
        "  payload:     {} bytes ({} sample frames)",
        parsed.data_len,
        parsed.sample_count()
    );
    println!("  duration:    {:.3} s", parsed.duration_secs());
    println!("  riff size:   {}", parsed.riff_size);

    let declared_len = WAV_HEADER_LEN as u64 + parsed.data_len as u64;
    if file_len == declared_len {
        println!("  file length: {} bytes (consistent)", file_len);
        Ok(())
    } else {
        println!(
            "  file length: {} bytes (header declares {})",
            file_len, declared_len
        );
        Err(anyhow!("file length does not match header"))
    }
}
