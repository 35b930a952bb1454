use crate::animation::ease::ease_in_out_cubic;
use crate::assets::store::{AssetStore, VisualAsset};
use crate::compose::draw::{PixelSource, draw_cover_fit};
use crate::compose::subtitle::{SubtitleRenderer, subtitle_alpha};
use crate::compose::surface::{FrameRGBA, fill_black, fill_black_span};
use crate::foundation::core::{Canvas, Vec2};
use crate::foundation::math::lerp;
use crate::story::model::AspectMode;
use crate::timeline::plan::{FRAME_RATE, INTRO_EFFECT_SECS, OUTRO_FADE_SECS, Segment};

/// Ken Burns zoom at the near end of the travel.
pub(crate) const KEN_BURNS_NEAR: f64 = 1.10;
/// Ken Burns zoom at the far end of the travel.
pub(crate) const KEN_BURNS_FAR: f64 = 1.25;
const BREATH_AMPLITUDE: f64 = 0.005;
const BREATH_RATE: f64 = 2.0; // rad/s

const INTRO_ZOOM_END: f64 = 1.05;
const INTRO_FADE_SECS: f64 = 0.5;

const SLIDE_OUT_IMAGE_SCALE: f64 = 1.25;
const SLIDE_IN_IMAGE_SCALE: f64 = 1.10;
const SLIDE_SHADOW_PX: f64 = 50.0;
const SLIDE_SHADOW_ALPHA: f32 = 0.35;

/// Ken Burns zoom for a still image, excluding the breathing term.
///
/// Zoom direction alternates by scene index parity: even scenes travel
/// 1.10 -> 1.25, odd scenes the reverse.
pub fn ken_burns_zoom(scene_index: usize, progress: f64) -> f64 {
    let (from, to) = if scene_index % 2 == 0 {
        (KEN_BURNS_NEAR, KEN_BURNS_FAR)
    } else {
        (KEN_BURNS_FAR, KEN_BURNS_NEAR)
    };
    lerp(from, to, progress.clamp(0.0, 1.0))
}

fn breathing(elapsed: f64) -> f64 {
    BREATH_AMPLITUDE * (BREATH_RATE * elapsed).sin()
}

/// Per-frame compositor for one export run.
///
/// `render` is deterministic and idempotent: identical `(segment, elapsed)`
/// inputs produce pixel-identical frames (clip frame caches only affect how
/// fast the pixels are fetched, not their values).
pub struct Compositor {
    canvas: Canvas,
    aspect: AspectMode,
    subtitles: SubtitleRenderer,
}

impl Compositor {
    /// Create a compositor targeting the given orientation's canvas.
    pub fn new(aspect: AspectMode) -> Self {
        Self {
            canvas: aspect.canvas(),
            aspect,
            subtitles: SubtitleRenderer::new(),
        }
    }

    /// Target canvas of this compositor.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Draw the frame for `segment` at `elapsed` seconds into it.
    pub fn render(&mut self, assets: &mut AssetStore, segment: &Segment, elapsed: f64) -> FrameRGBA {
        let mut frame = FrameRGBA::new_black(self.canvas);
        match segment {
            Segment::Intro => self.render_intro(&mut frame, assets, elapsed),
            Segment::Scene { index, duration } => {
                self.render_scene(&mut frame, assets, *index, elapsed, *duration);
            }
            Segment::Transition {
                from,
                clip,
                duration,
            } => self.render_transition(&mut frame, assets, *from, *clip, *duration, elapsed),
            Segment::Outro {
                last,
                scene_duration,
            } => self.render_outro(&mut frame, assets, *last, *scene_duration, elapsed),
        }
        frame
    }

    fn render_intro(&mut self, frame: &mut FrameRGBA, assets: &AssetStore, elapsed: f64) {
        let Some(cover) = assets.cover() else {
            return;
        };
        if elapsed >= INTRO_EFFECT_SECS {
            // Black hold between the cover and the first scene.
            return;
        }

        let p = (elapsed / INTRO_EFFECT_SECS).clamp(0.0, 1.0);
        let scale = lerp(1.0, INTRO_ZOOM_END, p);
        draw_cover_fit(
            frame,
            PixelSource::new(cover.width, cover.height, &cover.rgba8_premul),
            self.canvas,
            scale,
            Vec2::ZERO,
            1.0,
        );

        let fade_in = 1.0 - (elapsed / INTRO_FADE_SECS).clamp(0.0, 1.0);
        let fade_out =
            ((elapsed - (INTRO_EFFECT_SECS - INTRO_FADE_SECS)) / INTRO_FADE_SECS).clamp(0.0, 1.0);
        fill_black(frame, fade_in.max(fade_out) as f32);
    }

    fn render_scene(
        &mut self,
        frame: &mut FrameRGBA,
        assets: &mut AssetStore,
        index: usize,
        elapsed: f64,
        duration: f64,
    ) {
        self.draw_scene_kenburns(frame, assets, index, elapsed, duration);
        let text = &assets.scene(index).narration_text;
        self.subtitles
            .draw(frame, self.canvas, self.aspect, text, subtitle_alpha(elapsed));
    }

    fn render_transition(
        &mut self,
        frame: &mut FrameRGBA,
        assets: &mut AssetStore,
        from: usize,
        clip_mode: bool,
        duration: f64,
        elapsed: f64,
    ) {
        if clip_mode && assets.scene(from).transition.is_some() {
            let canvas = self.canvas;
            let scene = assets.scene_mut(from);
            if let Some(clip) = &mut scene.transition {
                let (w, h) = clip.pixel_size();
                let data = clip.sample_frame(elapsed, FRAME_RATE);
                draw_cover_fit(
                    frame,
                    PixelSource::new(w, h, data),
                    canvas,
                    1.0,
                    Vec2::ZERO,
                    1.0,
                );
            }
            return;
        }

        // Synthesized slide: outgoing pushes left under a darkening overlay,
        // incoming enters from the right behind a soft leading-edge shadow.
        let p = if duration > 0.0 {
            (elapsed / duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let e = ease_in_out_cubic(p);
        let width = f64::from(self.canvas.width);

        self.draw_scene_fixed(
            frame,
            assets,
            from,
            SLIDE_OUT_IMAGE_SCALE,
            f64::MAX,
            Vec2::new(-width * e, 0.0),
        );
        fill_black(frame, (0.5 * e) as f32);

        let edge = width * (1.0 - e);
        self.draw_shadow_band(frame, edge);
        self.draw_scene_fixed(
            frame,
            assets,
            from + 1,
            SLIDE_IN_IMAGE_SCALE,
            0.0,
            Vec2::new(edge, 0.0),
        );
    }

    fn render_outro(
        &mut self,
        frame: &mut FrameRGBA,
        assets: &mut AssetStore,
        last: usize,
        scene_duration: f64,
        elapsed: f64,
    ) {
        if elapsed >= OUTRO_FADE_SECS {
            // Solid black hold.
            return;
        }
        self.render_scene(frame, assets, last, scene_duration, scene_duration);
        fill_black(frame, (elapsed / OUTRO_FADE_SECS).clamp(0.0, 1.0) as f32);
    }

    /// Scene visual with the Ken Burns treatment: animated zoom for images,
    /// scale 1.0 playback for clips.
    fn draw_scene_kenburns(
        &self,
        frame: &mut FrameRGBA,
        assets: &mut AssetStore,
        index: usize,
        elapsed: f64,
        duration: f64,
    ) {
        let canvas = self.canvas;
        let scene = assets.scene_mut(index);
        match &mut scene.visual {
            VisualAsset::Image(img) => {
                let p = if duration > 0.0 {
                    (elapsed / duration).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let scale = ken_burns_zoom(index, p) + breathing(elapsed);
                draw_cover_fit(
                    frame,
                    PixelSource::new(img.width, img.height, &img.rgba8_premul),
                    canvas,
                    scale,
                    Vec2::ZERO,
                    1.0,
                );
            }
            VisualAsset::Clip(clip) => {
                let (w, h) = clip.pixel_size();
                let data = clip.sample_frame(elapsed, FRAME_RATE);
                draw_cover_fit(
                    frame,
                    PixelSource::new(w, h, data),
                    canvas,
                    1.0,
                    Vec2::ZERO,
                    1.0,
                );
            }
        }
    }

    /// Scene visual at a fixed scale and pixel offset, sampling clips at
    /// `clip_secs` (clamped to the clip's range). Used by the slide.
    fn draw_scene_fixed(
        &self,
        frame: &mut FrameRGBA,
        assets: &mut AssetStore,
        index: usize,
        image_scale: f64,
        clip_secs: f64,
        offset: Vec2,
    ) {
        let canvas = self.canvas;
        let scene = assets.scene_mut(index);
        match &mut scene.visual {
            VisualAsset::Image(img) => {
                draw_cover_fit(
                    frame,
                    PixelSource::new(img.width, img.height, &img.rgba8_premul),
                    canvas,
                    image_scale,
                    offset,
                    1.0,
                );
            }
            VisualAsset::Clip(clip) => {
                let (w, h) = clip.pixel_size();
                let data = clip.sample_frame(clip_secs, FRAME_RATE);
                draw_cover_fit(
                    frame,
                    PixelSource::new(w, h, data),
                    canvas,
                    1.0,
                    offset,
                    1.0,
                );
            }
        }
    }

    /// Soft shadow cast by the incoming slide's leading edge at `edge`.
    fn draw_shadow_band(&self, frame: &mut FrameRGBA, edge: f64) {
        let x1 = edge.min(f64::from(self.canvas.width));
        let x0 = (edge - SLIDE_SHADOW_PX).max(0.0);
        if x1 <= 0.0 || x0 >= x1 {
            return;
        }
        let x0 = x0.floor() as u32;
        let x1 = x1.ceil() as u32;
        for x in x0..x1 {
            let t = 1.0 - (edge - f64::from(x)).clamp(0.0, SLIDE_SHADOW_PX) / SLIDE_SHADOW_PX;
            let alpha = SLIDE_SHADOW_ALPHA * t as f32;
            if alpha <= 0.0 {
                continue;
            }
            for y in 0..frame.height {
                fill_black_span(frame, y, x, x + 1, alpha);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/frame.rs"]
mod tests;
