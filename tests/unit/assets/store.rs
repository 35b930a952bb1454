use super::*;

use crate::story::model::AspectMode;

fn fake_clip_info(width: u32, height: u32, duration_secs: f64) -> ClipSourceInfo {
    ClipSourceInfo {
        source_path: std::path::PathBuf::from("/nonexistent/slidecast-test-clip.mp4"),
        width,
        height,
        duration_secs,
        has_audio: false,
    }
}

#[test]
fn clip_sample_falls_back_to_opaque_black_when_decode_fails() {
    let mut clip = ClipAsset::new(fake_clip_info(4, 2, 1.0));
    let frame = clip.sample_frame(0.5, 30);
    assert_eq!(frame.len(), 4 * 2 * 4);
    assert!(frame.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
}

#[test]
fn clip_release_frames_keeps_probe_metadata() {
    let mut clip = ClipAsset::new(fake_clip_info(6, 6, 2.5));
    let _ = clip.sample_frame(0.0, 30);
    clip.release_frames();
    assert_eq!(clip.pixel_size(), (6, 6));
    assert!((clip.duration_secs() - 2.5).abs() < 1e-12);
}

#[test]
fn visual_asset_reports_kind_and_size() {
    let canvas = AspectMode::Wide.canvas();
    let image = VisualAsset::Image(PreparedImage::placeholder(canvas));
    assert!(!image.is_clip());
    assert_eq!(image.pixel_size(), (1280, 720));

    let clip = VisualAsset::Clip(ClipAsset::new(fake_clip_info(640, 360, 1.0)));
    assert!(clip.is_clip());
    assert_eq!(clip.pixel_size(), (640, 360));
}

#[test]
fn load_substitutes_placeholder_for_missing_and_garbage_visuals() {
    let story = Story {
        title: "fallbacks".to_owned(),
        aspect: AspectMode::Wide,
        cover_image: Some(vec![9, 9, 9]),
        scenes: vec![
            Scene::default(),
            Scene {
                image: Some(vec![1, 2, 3]),
                audio: Some(vec![4, 5, 6]),
                ..Scene::default()
            },
        ],
    };

    let mut seen = Vec::new();
    let assets = AssetStore::load(&story, 30, |i, n| seen.push((i, n)));

    assert_eq!(seen, vec![(0, 2), (1, 2)]);
    // Garbage cover bytes degrade to "no intro" rather than failing the run.
    assert!(assets.cover().is_none());
    assert_eq!(assets.scene_count(), 2);
    for i in 0..2 {
        match &assets.scene(i).visual {
            VisualAsset::Image(img) => assert_eq!((img.width, img.height), (1280, 720)),
            VisualAsset::Clip(_) => panic!("expected placeholder image for scene {i}"),
        }
        assert!(assets.narration_duration_secs(i).is_none());
    }
}

#[test]
fn release_scene_touches_only_clip_caches() {
    let canvas = AspectMode::Tall.canvas();
    let mut assets = AssetStore::from_parts(
        canvas,
        None,
        vec![SceneAssets {
            visual: VisualAsset::Clip(ClipAsset::new(fake_clip_info(2, 2, 1.0))),
            narration: None,
            narration_text: String::new(),
            transition: Some(ClipAsset::new(fake_clip_info(2, 2, 0.4))),
        }],
    );

    assets.release_scene(0);
    let scene = assets.scene(0);
    assert!(scene.transition.is_some());
    assert!(scene.visual.is_clip());
}
