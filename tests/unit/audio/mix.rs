use super::*;

use crate::assets::decode::PreparedImage;
use crate::assets::media::AudioPcm;
use crate::assets::store::{SceneAssets, VisualAsset};
use crate::story::model::AspectMode;

fn pcm(secs: f64, value: f32) -> AudioPcm {
    let frames = (secs * f64::from(MIX_SAMPLE_RATE)).round() as usize;
    AudioPcm {
        sample_rate: MIX_SAMPLE_RATE,
        channels: 2,
        interleaved_f32: vec![value; frames * 2],
    }
}

fn store_with_narrations(narrations: Vec<Option<AudioPcm>>) -> AssetStore {
    let canvas = AspectMode::Wide.canvas();
    let scenes = narrations
        .into_iter()
        .map(|narration| SceneAssets {
            visual: VisualAsset::Image(PreparedImage::placeholder(canvas)),
            narration,
            narration_text: String::new(),
            transition: None,
        })
        .collect();
    AssetStore::from_parts(canvas, None, scenes)
}

#[test]
fn frame_to_sample_uses_rational_fps() {
    let fps = Fps {
        num: 30_000,
        den: 1001,
    };
    assert_eq!(frame_to_sample(0, fps, 48_000), 0);
    assert!(frame_to_sample(1, fps, 48_000) > 0);

    let fps = Fps { num: 30, den: 1 };
    assert_eq!(frame_to_sample(30, fps, 48_000), 48_000);
}

#[test]
fn silent_story_mixes_to_none() {
    let assets = store_with_narrations(vec![None, None]);
    let segments = vec![
        Segment::Scene {
            index: 0,
            duration: 3.0,
        },
        Segment::Transition {
            from: 0,
            clip: false,
            duration: 1.0,
        },
        Segment::Scene {
            index: 1,
            duration: 3.0,
        },
        Segment::Outro {
            last: 1,
            scene_duration: 3.0,
        },
    ];
    let fps = Fps { num: 30, den: 1 };
    assert!(build_narration_mix(&segments, &assets, fps).is_none());
}

#[test]
fn narration_lands_at_its_segment_start() {
    // Scene 1 is silent for 3.0s, a 1.0s synthesized transition follows,
    // then scene 2 speaks for its full 2.0s floor.
    let assets = store_with_narrations(vec![None, Some(pcm(1.0, 0.5))]);
    let segments = vec![
        Segment::Scene {
            index: 0,
            duration: 3.0,
        },
        Segment::Transition {
            from: 0,
            clip: false,
            duration: 1.0,
        },
        Segment::Scene {
            index: 1,
            duration: 2.0,
        },
        Segment::Outro {
            last: 1,
            scene_duration: 2.0,
        },
    ];
    let fps = Fps { num: 30, den: 1 };
    let mix = build_narration_mix(&segments, &assets, fps).unwrap();

    // Timeline is 8.0s of stereo samples.
    assert_eq!(mix.len(), 8 * MIX_SAMPLE_RATE as usize * 2);

    let start = 4 * MIX_SAMPLE_RATE as usize * 2;
    let end = start + MIX_SAMPLE_RATE as usize * 2;
    assert_eq!(mix[start - 1], 0.0);
    assert_eq!(mix[start], 0.5);
    assert_eq!(mix[end - 1], 0.5);
    assert_eq!(mix[end], 0.0);
    assert!(mix[..start].iter().all(|s| *s == 0.0));
}

#[test]
fn mix_clamps_to_unit_range() {
    let assets = store_with_narrations(vec![Some(pcm(0.5, 7.5))]);
    let segments = vec![
        Segment::Scene {
            index: 0,
            duration: 2.0,
        },
        Segment::Outro {
            last: 0,
            scene_duration: 2.0,
        },
    ];
    let fps = Fps { num: 30, den: 1 };
    let mix = build_narration_mix(&segments, &assets, fps).unwrap();
    assert!(mix.iter().all(|s| (-1.0..=1.0).contains(s)));
    assert_eq!(mix[0], 1.0);
}

#[test]
fn mix_round_trips_through_f32le_file() {
    let samples = vec![0.0f32, 0.25, -0.5, 1.0];
    let path = std::env::temp_dir().join(format!(
        "slidecast_mix_test_{}.f32le",
        std::process::id()
    ));
    write_mix_to_f32le_file(&samples, &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(bytes.len(), samples.len() * 4);
    let restored: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(restored, samples);
}
