use super::*;

fn image_scene() -> Scene {
    Scene {
        image: Some(vec![0u8; 4]),
        ..Scene::default()
    }
}

#[test]
fn aspect_mode_fixes_resolution() {
    assert_eq!(
        AspectMode::Wide.canvas(),
        Canvas {
            width: 1280,
            height: 720
        }
    );
    assert_eq!(
        AspectMode::Tall.canvas(),
        Canvas {
            width: 720,
            height: 1280
        }
    );
}

#[test]
fn validate_rejects_empty_scene_list() {
    let story = Story {
        title: "empty".to_owned(),
        aspect: AspectMode::Wide,
        cover_image: None,
        scenes: Vec::new(),
    };
    assert!(story.validate().is_err());
}

#[test]
fn validate_rejects_scene_without_visual() {
    let story = Story {
        title: "no visual".to_owned(),
        aspect: AspectMode::Wide,
        cover_image: None,
        scenes: vec![image_scene(), Scene::default()],
    };
    let err = story.validate().unwrap_err().to_string();
    assert!(err.contains("scene 1"), "unexpected error: {err}");
}

#[test]
fn validate_accepts_clip_only_scene() {
    let story = Story {
        title: "clips".to_owned(),
        aspect: AspectMode::Tall,
        cover_image: None,
        scenes: vec![Scene {
            clip: Some(std::path::PathBuf::from("clip.mp4")),
            ..Scene::default()
        }],
    };
    assert!(story.validate().is_ok());
}

#[test]
fn manifest_parses_and_resolves_clip_paths() {
    let json = r#"{
        "title": "t",
        "aspect": "wide",
        "scenes": [
            { "narration": "hello", "clip": "media/clip.mp4" }
        ]
    }"#;
    let manifest: StoryManifest = serde_json::from_str(json).unwrap();
    let story = manifest.into_story(std::path::Path::new("/stories")).unwrap();
    assert_eq!(story.scenes.len(), 1);
    assert_eq!(story.scenes[0].narration, "hello");
    assert_eq!(
        story.scenes[0].clip.as_deref(),
        Some(std::path::Path::new("/stories/media/clip.mp4"))
    );
    assert!(story.cover_image.is_none());
}

#[test]
fn manifest_fails_on_missing_media_file() {
    let json = r#"{
        "title": "t",
        "aspect": "tall",
        "scenes": [ { "image": "missing.png" } ]
    }"#;
    let manifest: StoryManifest = serde_json::from_str(json).unwrap();
    let err = manifest
        .into_story(std::path::Path::new("/nonexistent-root"))
        .unwrap_err();
    assert!(err.to_string().contains("missing.png"));
}
