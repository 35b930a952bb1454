use std::path::Path;

use crate::assets::media::MIX_SAMPLE_RATE;
use crate::assets::store::AssetStore;
use crate::foundation::core::Fps;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::timeline::plan::Segment;

/// Place every scene's narration at its segment start and mix into one
/// interleaved stereo track covering the whole timeline.
///
/// Returns `None` when no scene has decodable narration, so silent stories
/// encode without an audio track. Narration PCM is already at the mix rate
/// and channel count (the decoder enforces both), so placement is a straight
/// sample copy; overlapping audio cannot occur because scene segments never
/// run shorter than their narration.
pub(crate) fn build_narration_mix(
    segments: &[Segment],
    assets: &AssetStore,
    fps: Fps,
) -> Option<Vec<f32>> {
    let channels = 2usize;

    let mut cues = Vec::new();
    let mut cursor_frames = 0u64;
    for segment in segments {
        if let Segment::Scene { index, .. } = segment
            && let Some(pcm) = &assets.scene(*index).narration
            && !pcm.interleaved_f32.is_empty()
        {
            cues.push((cursor_frames, pcm));
        }
        cursor_frames += fps.secs_to_frames_ceil(segment.duration());
    }
    if cues.is_empty() {
        return None;
    }

    let total_samples = frame_to_sample(cursor_frames, fps, MIX_SAMPLE_RATE);
    let mut out = vec![0.0f32; total_samples as usize * channels];
    for (start_frame, pcm) in cues {
        let start = frame_to_sample(start_frame, fps, MIX_SAMPLE_RATE) as usize * channels;
        if start >= out.len() {
            continue;
        }
        let take = pcm.interleaved_f32.len().min(out.len() - start);
        for (dst, src) in out[start..start + take]
            .iter_mut()
            .zip(&pcm.interleaved_f32[..take])
        {
            *dst += *src;
        }
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    Some(out)
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub(crate) fn write_mix_to_f32le_file(
    samples_interleaved: &[f32],
    out_path: &Path,
) -> SlidecastResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            SlidecastError::encode(format!(
                "failed to create audio mix output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        SlidecastError::encode(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

/// Convert a frame delta to the nearest sample index at `sample_rate`.
pub(crate) fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
