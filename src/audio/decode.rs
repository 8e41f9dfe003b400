//! Audio decoding using symphonia.

use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Decoded mono audio.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Samples in range [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Duration in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode an audio file to mono f32 samples.
///
/// The container is probed from its content, with the file extension as a
/// hint. Multi-channel audio is averaged down to mono. Corrupt packets are
/// skipped.
pub fn decode_audio_file(path: &Path) -> Result<DecodedAudio> {
    let open_error = |source: Box<dyn std::error::Error + Send + Sync>| Error::AudioOpen {
        path: path.to_path_buf(),
        source,
    };
    let decode_error = |source: Box<dyn std::error::Error + Send + Sync>| Error::AudioDecode {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|e| open_error(Box::new(e)))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| open_error(Box::new(e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::NoAudioTracks {
            path: path.to_path_buf(),
        })?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_error("missing sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error(Box::new(e)))?;

    let mut samples = Vec::new();
    let mut interleaved: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(decode_error(Box::new(e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                debug!("Skipping corrupt packet in {}: {reason}", path.display());
                continue;
            }
            Err(e) => return Err(decode_error(Box::new(e))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        let frames = decoded.capacity();
        if interleaved
            .as_ref()
            .is_none_or(|b| b.capacity() < frames * channels)
        {
            interleaved = Some(SampleBuffer::new(frames as u64, spec));
        }
        let Some(buffer) = interleaved.as_mut() else {
            continue;
        };
        buffer.copy_interleaved_ref(decoded);

        mix_to_mono(buffer.samples(), channels, &mut samples);
    }

    debug!(
        "Decoded {}: {} samples at {} Hz",
        path.display(),
        samples.len(),
        sample_rate
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Average interleaved frames into `output`.
fn mix_to_mono(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
    if channels == 1 {
        output.extend_from_slice(interleaved);
        return;
    }

    #[allow(clippy::cast_precision_loss)]
    let scale = 1.0 / channels as f32;
    output.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_to_mono_passthrough() {
        let mut out = Vec::new();
        mix_to_mono(&[0.1, 0.2, 0.3], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_mix_to_mono_averages_stereo() {
        let mut out = Vec::new();
        mix_to_mono(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let result = decode_audio_file(Path::new("/nonexistent/clip.wav"));
        assert!(matches!(result, Err(Error::AudioOpen { .. })));
    }

    #[test]
    fn test_garbage_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();
        let result = decode_audio_file(&path);
        assert!(matches!(result, Err(Error::AudioOpen { .. })));
    }

    #[test]
    fn test_duration() {
        let audio = DecodedAudio {
            samples: vec![0.0; 48_000],
            sample_rate: 32_000,
        };
        assert_eq!(audio.duration_secs(), 1.5);
    }
}
