//! Fixed-length segmentation of a recording.

/// One model-sized slice of a recording.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Exactly `segment_duration * sample_rate` samples.
    pub samples: Vec<f32>,
    /// Start time in seconds.
    pub start_time: f32,
    /// End time in seconds.
    pub end_time: f32,
}

/// Split samples into segments of `duration` seconds advancing by
/// `duration - overlap`. The last segment is zero-padded. An empty input,
/// or an overlap that leaves no forward step, yields no segments.
pub fn split_segments(
    samples: &[f32],
    sample_rate: u32,
    duration: f32,
    overlap: f32,
) -> Vec<Segment> {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let to_samples = |secs: f32| (secs * sample_rate as f32) as usize;

    let segment_len = to_samples(duration);
    let step = segment_len.saturating_sub(to_samples(overlap));
    if step == 0 || samples.is_empty() {
        return Vec::new();
    }

    (0..samples.len())
        .step_by(step)
        .map(|start| {
            let end = (start + segment_len).min(samples.len());
            let mut segment = samples[start..end].to_vec();
            segment.resize(segment_len, 0.0);

            #[allow(clippy::cast_precision_loss)]
            let start_time = start as f32 / sample_rate as f32;

            Segment {
                samples: segment,
                start_time,
                end_time: start_time + duration,
            }
        })
        .collect()
}
