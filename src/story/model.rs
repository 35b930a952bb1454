use std::path::{Path, PathBuf};

use crate::foundation::core::Canvas;
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Output orientation of a story.
///
/// The aspect mode fixes the export resolution: `wide` renders 1280x720,
/// `tall` renders 720x1280.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectMode {
    /// 16:9 landscape output.
    Wide,
    /// 9:16 portrait output.
    Tall,
}

impl AspectMode {
    /// Target canvas for this orientation.
    pub fn canvas(self) -> Canvas {
        match self {
            Self::Wide => Canvas {
                width: 1280,
                height: 720,
            },
            Self::Tall => Canvas {
                width: 720,
                height: 1280,
            },
        }
    }
}

/// One narrated scene of a story.
///
/// A scene must carry at least one visual source (`image` or `clip`); when
/// both are present the clip wins for the main segment. `transition_clip`
/// depicts the cut into the *next* scene and is ignored on the last scene.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Narration text, rendered as the subtitle overlay. May be empty.
    pub narration: String,
    /// Encoded raster image bytes (PNG/JPEG/...).
    pub image: Option<Vec<u8>>,
    /// Pre-rendered video clip used instead of the image when present.
    pub clip: Option<PathBuf>,
    /// Encoded narration audio bytes (decodable to PCM).
    pub audio: Option<Vec<u8>>,
    /// Pre-rendered transition clip into the next scene.
    pub transition_clip: Option<PathBuf>,
}

impl Scene {
    /// Return `true` when the scene carries any visual source.
    pub fn has_visual(&self) -> bool {
        self.image.is_some() || self.clip.is_some()
    }
}

/// A complete story: ordered scenes plus presentation metadata.
#[derive(Clone, Debug)]
pub struct Story {
    /// Display title (not rendered by the pipeline).
    pub title: String,
    /// Output orientation.
    pub aspect: AspectMode,
    /// Optional encoded cover image; its presence enables the intro segment.
    pub cover_image: Option<Vec<u8>>,
    /// Scenes in narrative order. Order is significant.
    pub scenes: Vec<Scene>,
}

impl Story {
    /// Validate export preconditions.
    ///
    /// This is the only schema validation the pipeline performs: a non-empty
    /// scene list, and at least one visual source per scene.
    pub fn validate(&self) -> SlidecastResult<()> {
        if self.scenes.is_empty() {
            return Err(SlidecastError::validation(
                "story must contain at least one scene",
            ));
        }
        for (i, scene) in self.scenes.iter().enumerate() {
            if !scene.has_visual() {
                return Err(SlidecastError::validation(format!(
                    "scene {i} has neither an image nor a video clip"
                )));
            }
        }
        Ok(())
    }

    /// Load a story from a JSON manifest on disk.
    ///
    /// The manifest references image/audio files by path (resolved relative
    /// to the manifest's directory) and they are read into memory here; clip
    /// references stay paths because the decoder consumes them from disk.
    pub fn from_manifest_path(path: impl AsRef<Path>) -> SlidecastResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SlidecastError::validation(format!("open story manifest '{}': {e}", path.display()))
        })?;
        let manifest: StoryManifest = serde_json::from_str(&text).map_err(|e| {
            SlidecastError::validation(format!("parse story manifest '{}': {e}", path.display()))
        })?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.into_story(root)
    }
}

/// JSON boundary form of [`Story`], with media referenced by relative path.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StoryManifest {
    /// Display title.
    pub title: String,
    /// Output orientation.
    pub aspect: AspectMode,
    /// Optional cover image path.
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Scene list in narrative order.
    pub scenes: Vec<SceneManifest>,
}

/// JSON boundary form of [`Scene`].
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SceneManifest {
    /// Narration text.
    #[serde(default)]
    pub narration: String,
    /// Still image path.
    #[serde(default)]
    pub image: Option<String>,
    /// Main video clip path.
    #[serde(default)]
    pub clip: Option<String>,
    /// Narration audio path.
    #[serde(default)]
    pub audio: Option<String>,
    /// Transition clip path.
    #[serde(default)]
    pub transition_clip: Option<String>,
}

impl StoryManifest {
    /// Resolve the manifest into an in-memory [`Story`], reading referenced
    /// image/audio files relative to `root`.
    pub fn into_story(self, root: &Path) -> SlidecastResult<Story> {
        let cover_image = self
            .cover_image
            .map(|rel| read_media(root, &rel))
            .transpose()?;

        let mut scenes = Vec::with_capacity(self.scenes.len());
        for scene in self.scenes {
            scenes.push(Scene {
                narration: scene.narration,
                image: scene.image.map(|rel| read_media(root, &rel)).transpose()?,
                clip: scene.clip.map(|rel| root.join(rel)),
                audio: scene.audio.map(|rel| read_media(root, &rel)).transpose()?,
                transition_clip: scene.transition_clip.map(|rel| root.join(rel)),
            });
        }

        Ok(Story {
            title: self.title,
            aspect: self.aspect,
            cover_image,
            scenes,
        })
    }
}

fn read_media(root: &Path, rel: &str) -> SlidecastResult<Vec<u8>> {
    let path = root.join(rel);
    std::fs::read(&path).map_err(|e| {
        SlidecastError::validation(format!("read media file '{}': {e}", path.display()))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/story/model.rs"]
mod tests;
