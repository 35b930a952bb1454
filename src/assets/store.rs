use tracing::{debug, warn};

use crate::assets::decode::{PreparedImage, decode_image};
use crate::assets::media::{
    AudioPcm, ClipSourceInfo, MIX_SAMPLE_RATE, decode_audio_f32_stereo, decode_clip_frames_rgba8,
    probe_clip,
};
use crate::foundation::core::Canvas;
use crate::foundation::error::SlidecastResult;
use crate::story::model::{Scene, Story};

/// Frames decoded per clip batch (one second at the export frame rate).
pub(crate) const CLIP_BATCH_FRAMES: u32 = 30;

/// A decodable video clip with a one-batch frame cache.
///
/// Frames are decoded lazily in one-second batches while the clip's segment
/// renders; [`ClipAsset::release_frames`] pauses the clip by dropping the
/// cache (probe metadata survives, nothing is re-probed).
#[derive(Clone, Debug)]
pub struct ClipAsset {
    info: ClipSourceInfo,
    batch_start: Option<u64>,
    frames: Vec<Vec<u8>>,
    fallback: Option<Vec<u8>>,
}

impl ClipAsset {
    pub(crate) fn new(info: ClipSourceInfo) -> Self {
        Self {
            info,
            batch_start: None,
            frames: Vec::new(),
            fallback: None,
        }
    }

    /// Playable duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.info.duration_secs
    }

    /// Intrinsic pixel size of the source.
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    /// Decode the first frame batch, proving the clip is actually decodable
    /// before any segment starts compositing against it.
    pub(crate) fn preload(&mut self, fps: u32) -> SlidecastResult<()> {
        self.ensure_batch(0, fps)
    }

    fn ensure_batch(&mut self, batch: u64, fps: u32) -> SlidecastResult<()> {
        if self.batch_start == Some(batch) && !self.frames.is_empty() {
            return Ok(());
        }
        let start_sec = (batch * u64::from(CLIP_BATCH_FRAMES)) as f64 / f64::from(fps);
        self.frames = decode_clip_frames_rgba8(&self.info, start_sec, CLIP_BATCH_FRAMES, fps)?;
        self.batch_start = Some(batch);
        Ok(())
    }

    /// Sample the frame showing the clip at `local_secs`, clamped to the
    /// clip's playable range. Mid-render decode failures reuse the nearest
    /// cached frame rather than aborting the export.
    pub(crate) fn sample_frame(&mut self, local_secs: f64, fps: u32) -> &[u8] {
        let max_t = (self.info.duration_secs - 1e-6).max(0.0);
        let t = local_secs.clamp(0.0, max_t);
        let global = (t * f64::from(fps)).floor() as u64;
        let batch = global / u64::from(CLIP_BATCH_FRAMES);

        if self.batch_start != Some(batch)
            && let Err(e) = self.ensure_batch(batch, fps)
        {
            warn!(
                clip = %self.info.source_path.display(),
                error = %e,
                "clip batch decode failed, reusing cached pixels"
            );
        }

        if self.frames.is_empty() && self.fallback.is_none() {
            let px = self.info.width as usize * self.info.height as usize;
            let mut black = vec![0u8; px * 4];
            for chunk in black.chunks_exact_mut(4) {
                chunk[3] = 255;
            }
            self.fallback = Some(black);
        }

        if self.frames.is_empty() {
            self.fallback.as_deref().unwrap_or(&[])
        } else {
            let idx = (global % u64::from(CLIP_BATCH_FRAMES)) as usize;
            let idx = idx.min(self.frames.len() - 1);
            &self.frames[idx]
        }
    }

    /// Pause the clip: drop cached frames, keep probe metadata.
    pub(crate) fn release_frames(&mut self) {
        self.frames = Vec::new();
        self.batch_start = None;
        self.fallback = None;
    }
}

/// Decoded visual source for a scene's main segment.
#[derive(Clone, Debug)]
pub enum VisualAsset {
    /// A still image, animated with the Ken Burns effect.
    Image(PreparedImage),
    /// A pre-rendered clip, played back at scale 1.0.
    Clip(ClipAsset),
}

impl VisualAsset {
    /// Return `true` for the clip variant.
    pub fn is_clip(&self) -> bool {
        matches!(self, Self::Clip(_))
    }

    /// Intrinsic pixel size of the source.
    pub fn pixel_size(&self) -> (u32, u32) {
        match self {
            Self::Image(img) => (img.width, img.height),
            Self::Clip(clip) => clip.pixel_size(),
        }
    }
}

/// Everything decoded for one scene.
#[derive(Clone, Debug)]
pub struct SceneAssets {
    /// Main visual source (always resolved; placeholder at worst).
    pub visual: VisualAsset,
    /// Narration PCM; `None` renders the scene silent.
    pub narration: Option<AudioPcm>,
    /// Narration text for the subtitle overlay.
    pub narration_text: String,
    /// Transition clip into the next scene, when present and decodable.
    pub transition: Option<ClipAsset>,
}

/// Index-addressed table of decoded assets for one export run.
///
/// All inputs are resolved here, sequentially and with per-asset fallbacks,
/// before the timeline is built. Nothing mutates a scene mid-render: the
/// render loop owns the store exclusively and only touches clip frame caches.
#[derive(Clone, Debug)]
pub struct AssetStore {
    canvas: Canvas,
    cover: Option<PreparedImage>,
    scenes: Vec<SceneAssets>,
}

impl AssetStore {
    /// Resolve every scene of `story` into decoded, ready-to-sample assets.
    ///
    /// This never fails: decode errors and timeouts degrade to the scene's
    /// image, a placeholder image, or silence. `on_scene` is invoked before
    /// each scene loads with `(index, total)` for progress reporting.
    #[tracing::instrument(skip_all, fields(scenes = story.scenes.len()))]
    pub fn load(story: &Story, fps: u32, mut on_scene: impl FnMut(usize, usize)) -> Self {
        let canvas = story.aspect.canvas();

        let cover = story.cover_image.as_deref().and_then(|bytes| {
            decode_image(bytes)
                .map_err(|e| warn!(error = %e, "cover image decode failed, skipping intro"))
                .ok()
        });

        let total = story.scenes.len();
        let mut scenes = Vec::with_capacity(total);
        for (i, scene) in story.scenes.iter().enumerate() {
            on_scene(i, total);
            scenes.push(load_scene(scene, i, i + 1 < total, canvas, fps));
        }

        debug!(cover = cover.is_some(), "asset table resolved");
        Self {
            canvas,
            cover,
            scenes,
        }
    }

    /// Target canvas the assets were resolved against.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Decoded cover image, when the story has one.
    pub fn cover(&self) -> Option<&PreparedImage> {
        self.cover.as_ref()
    }

    /// Number of scenes in the table.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Borrow the decoded assets of scene `i`.
    pub fn scene(&self, i: usize) -> &SceneAssets {
        &self.scenes[i]
    }

    /// Mutably borrow the decoded assets of scene `i` (clip frame caches).
    pub fn scene_mut(&mut self, i: usize) -> &mut SceneAssets {
        &mut self.scenes[i]
    }

    /// Narration duration of scene `i` in seconds, when audio decoded.
    pub fn narration_duration_secs(&self, i: usize) -> Option<f64> {
        self.scenes[i].narration.as_ref().map(AudioPcm::duration_secs)
    }

    /// Pause scene `i`'s clip assets once no later segment can reference them.
    pub fn release_scene(&mut self, i: usize) {
        let scene = &mut self.scenes[i];
        if let VisualAsset::Clip(clip) = &mut scene.visual {
            clip.release_frames();
        }
        if let Some(clip) = &mut scene.transition {
            clip.release_frames();
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        canvas: Canvas,
        cover: Option<PreparedImage>,
        scenes: Vec<SceneAssets>,
    ) -> Self {
        Self {
            canvas,
            cover,
            scenes,
        }
    }
}

fn load_scene(scene: &Scene, index: usize, has_next: bool, canvas: Canvas, fps: u32) -> SceneAssets {
    let visual = match &scene.clip {
        Some(path) => match load_clip(path, fps) {
            Ok(clip) => VisualAsset::Clip(clip),
            Err(e) => {
                warn!(scene = index, error = %e, "clip load failed, falling back to image");
                VisualAsset::Image(load_image_or_placeholder(scene, index, canvas))
            }
        },
        None => VisualAsset::Image(load_image_or_placeholder(scene, index, canvas)),
    };

    let narration = scene.audio.as_deref().and_then(|bytes| {
        decode_audio_f32_stereo(bytes, MIX_SAMPLE_RATE)
            .map_err(|e| warn!(scene = index, error = %e, "narration decode failed, scene is silent"))
            .ok()
    });

    let transition = if has_next {
        scene.transition_clip.as_deref().and_then(|path| {
            load_clip(path, fps)
                .map_err(|e| {
                    warn!(
                        scene = index,
                        error = %e,
                        "transition clip load failed, using synthesized transition"
                    )
                })
                .ok()
        })
    } else {
        None
    };

    SceneAssets {
        visual,
        narration,
        narration_text: scene.narration.clone(),
        transition,
    }
}

fn load_clip(path: &std::path::Path, fps: u32) -> SlidecastResult<ClipAsset> {
    let info = probe_clip(path)?;
    let mut clip = ClipAsset::new(info);
    clip.preload(fps)?;
    Ok(clip)
}

fn load_image_or_placeholder(scene: &Scene, index: usize, canvas: Canvas) -> PreparedImage {
    match scene.image.as_deref() {
        Some(bytes) => decode_image(bytes).unwrap_or_else(|e| {
            warn!(scene = index, error = %e, "image decode failed, using placeholder");
            PreparedImage::placeholder(canvas)
        }),
        None => PreparedImage::placeholder(canvas),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
