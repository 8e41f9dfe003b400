//! Audio resampling using rubato.

use crate::error::{Error, Result};
use audioadapter_buffers::direct::SequentialSlice;
use rubato::{Fft, FixedSync, Resampler};

const CHUNK_FRAMES: usize = 1024;

/// Resample mono audio to `to_rate`.
///
/// Input already at the target rate is returned unchanged. The output is
/// trimmed to the length implied by the rate ratio.
pub fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples);
    }

    let mut resampler = Fft::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_FRAMES,
        1,
        1,
        FixedSync::Both,
    )
    .map_err(|e| Error::Resample {
        reason: e.to_string(),
    })?;

    let frames_per_chunk = resampler.input_frames_next();
    let expected_len = expected_output_len(samples.len(), from_rate, to_rate);
    let mut output = Vec::with_capacity(expected_len + CHUNK_FRAMES);

    let mut chunks = samples.chunks_exact(frames_per_chunk);
    for chunk in chunks.by_ref() {
        process_chunk(&mut resampler, chunk, &mut output)?;
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut padded = tail.to_vec();
        padded.resize(frames_per_chunk, 0.0);
        process_chunk(&mut resampler, &padded, &mut output)?;
    }

    output.truncate(expected_len);
    Ok(output)
}

fn process_chunk(resampler: &mut Fft<f32>, chunk: &[f32], output: &mut Vec<f32>) -> Result<()> {
    let input = SequentialSlice::new(chunk, 1, chunk.len()).map_err(|e| Error::Resample {
        reason: format!("failed to wrap input: {e}"),
    })?;

    let resampled = resampler
        .process(&input, 0, None)
        .map_err(|e| Error::Resample {
            reason: e.to_string(),
        })?;

    output.extend_from_slice(&resampled.take_data());
    Ok(())
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn expected_output_len(input_len: usize, from_rate: u32, to_rate: u32) -> usize {
    ((input_len as f64) * f64::from(to_rate) / f64::from(from_rate)).ceil() as usize
}
