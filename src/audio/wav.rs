use crate::{Result, TurnUpError};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use tracing::debug;

/// Write audio samples to a 16-bit WAV file
///
/// # Arguments
/// * `path` - Path to the output WAV file
/// * `samples` - Interleaved samples in -1.0..=1.0
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - Number of channels
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
) -> Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)
        .map_err(|e| TurnUpError::IOError(format!("Failed to create WAV writer: {}", e)))?;

    for &sample in samples {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| TurnUpError::IOError(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| TurnUpError::IOError(format!("Failed to finalize WAV file: {}", e)))?;

    Ok(())
}

/// Decode a WAV file into interleaved f32 samples
///
/// # Returns
/// * Tuple of (samples, sample_rate, channels)
///
/// Any failure after the file has been opened is a `DecodeFailure`.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32, u16)> {
    let path = path.as_ref();
    let mut reader = WavReader::open(path).map_err(|e| {
        TurnUpError::DecodeFailure(format!("{}: {}", path.display(), e))
    })?;

    let spec = reader.spec();
    debug!(
        "Decoding {}: {} Hz, {} channels, {} bits",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    let decode_err = |e: hound::Error| TurnUpError::DecodeFailure(format!("{}: {}", path.display(), e));

    let samples: Result<Vec<f32>> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader.samples::<f32>().map(|s| s.map_err(decode_err)).collect(),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0).map_err(decode_err))
            .collect(),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32).map_err(decode_err))
            .collect(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0).map_err(decode_err))
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / i32::MAX as f32).map_err(decode_err))
            .collect(),
        (_, bits) => {
            return Err(TurnUpError::DecodeFailure(format!(
                "{}: unsupported bit depth {}",
                path.display(),
                bits
            )));
        }
    };

    Ok((samples?, spec.sample_rate, spec.channels))
}
