//! WAV buffer provider
//!
//! Decodes a WAV file into a [`SampleBuffer`] with `hound`. Integer formats
//! are scaled to [-1, 1]; float files are passed through.

use std::path::Path;

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use woodshed_core::SampleBuffer;

/// Decode the WAV file at `path`
pub fn load_wav(path: &Path) -> Result<SampleBuffer> {
    let mut reader = WavReader::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let spec = reader.spec();
    log::debug!(
        "Decoding {:?}: {} ch, {} Hz, {} bit {:?}",
        path,
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample,
        spec.sample_format
    );

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .with_context(|| format!("Failed to decode {:?}", path))?,
        SampleFormat::Int => {
            if !(1..=32).contains(&spec.bits_per_sample) {
                bail!("Unsupported bit depth {} in {:?}", spec.bits_per_sample, path);
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<f32>, _>>()
                .with_context(|| format!("Failed to decode {:?}", path))?
        }
    };

    SampleBuffer::from_interleaved(spec.sample_rate, spec.channels as usize, &samples)
        .with_context(|| format!("{:?} has no usable audio", path))
}
