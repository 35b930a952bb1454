use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache, Weight, Wrap};

use crate::compose::surface::{FrameRGBA, fill_black_span, over};
use crate::foundation::core::Canvas;
use crate::foundation::math::lerp;
use crate::story::model::AspectMode;

/// Horizontal padding unit for the subtitle panel, in pixels.
pub(crate) const SUBTITLE_PADDING: f32 = 24.0;

/// Subtitle typography and placement for one orientation.
///
/// Tall mode uses a larger face and a higher bottom margin so the band clears
/// player chrome.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SubtitleStyle {
    pub(crate) font_size: f32,
    pub(crate) line_height: f32,
    pub(crate) padding: f32,
    pub(crate) bottom_margin: f32,
}

impl SubtitleStyle {
    pub(crate) fn for_aspect(aspect: AspectMode) -> Self {
        match aspect {
            AspectMode::Wide => Self {
                font_size: 36.0,
                line_height: 47.0,
                padding: SUBTITLE_PADDING,
                bottom_margin: 48.0,
            },
            AspectMode::Tall => Self {
                font_size: 44.0,
                line_height: 57.0,
                padding: SUBTITLE_PADDING,
                bottom_margin: 120.0,
            },
        }
    }
}

/// Maximum wrapped line width: canvas width minus panel margin and text inset
/// on both sides.
pub(crate) fn wrap_width(canvas: Canvas, style: SubtitleStyle) -> f32 {
    canvas.width as f32 - 4.0 * style.padding
}

/// Vertical budget the panel may occupy: at most half the canvas, sitting
/// above the bottom margin.
pub(crate) fn max_band_height(canvas: Canvas, style: SubtitleStyle) -> f32 {
    (canvas.height as f32 * 0.5).min(canvas.height as f32 - style.bottom_margin)
}

/// Greatest wrapped line count whose panel still fits the vertical budget.
pub(crate) fn max_line_count(canvas: Canvas, style: SubtitleStyle) -> usize {
    let text_budget = max_band_height(canvas, style) - 2.0 * style.padding;
    (text_budget / style.line_height).floor().max(0.0) as usize
}

/// Resolved geometry of the subtitle panel, anchored to the bottom margin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SubtitleBand {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) text_x: f32,
    pub(crate) text_y: f32,
}

/// Compute the band for `text_height` pixels of wrapped lines. Lines stack
/// bottom-up: the band grows upward from the fixed bottom margin. Callers
/// bound `text_height` by [`max_line_count`] so the band stays on canvas.
pub(crate) fn band_for_text(canvas: Canvas, style: SubtitleStyle, text_height: f32) -> SubtitleBand {
    let width = canvas.width as f32 - 2.0 * style.padding;
    let height = text_height + 2.0 * style.padding;
    let x = style.padding;
    let y = canvas.height as f32 - style.bottom_margin - height;
    SubtitleBand {
        x,
        y,
        width,
        height,
        text_x: x + style.padding,
        text_y: y + style.padding,
    }
}

/// Subtitle opacity: fades in linearly over the first half second of the
/// owning segment, then holds at full.
pub(crate) fn subtitle_alpha(elapsed: f64) -> f32 {
    (elapsed * 2.0).clamp(0.0, 1.0) as f32
}

/// Shapes and rasterizes the narration overlay.
///
/// Wrapping is word-boundary with a per-glyph fallback, so ideographic text
/// still breaks inside runs while space-delimited scripts keep words whole.
pub(crate) struct SubtitleRenderer {
    font_system: FontSystem,
    swash: SwashCache,
}

impl SubtitleRenderer {
    pub(crate) fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash: SwashCache::new(),
        }
    }

    /// Draw `text` over `frame` at `alpha` opacity (panel included).
    pub(crate) fn draw(
        &mut self,
        frame: &mut FrameRGBA,
        canvas: Canvas,
        aspect: AspectMode,
        text: &str,
        alpha: f32,
    ) {
        if text.trim().is_empty() || alpha <= 0.0 {
            return;
        }
        let style = SubtitleStyle::for_aspect(aspect);
        let max_lines = max_line_count(canvas, style);
        if max_lines == 0 {
            return;
        }

        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics::new(style.font_size, style.line_height),
        );
        buffer.set_wrap(&mut self.font_system, Wrap::WordOrGlyph);
        // The height bound drops lines past the vertical budget; overlong
        // narration truncates instead of pushing the panel off the top.
        buffer.set_size(
            &mut self.font_system,
            Some(wrap_width(canvas, style)),
            Some(max_lines as f32 * style.line_height),
        );
        let attrs = Attrs::new().family(Family::SansSerif).weight(Weight::BOLD);
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let line_count = buffer.layout_runs().count().min(max_lines);
        if line_count == 0 {
            return;
        }
        let text_height = line_count as f32 * style.line_height;
        let band = band_for_text(canvas, style, text_height);

        draw_panel(frame, band, alpha);

        let text_x = band.text_x;
        let text_y = band.text_y;
        let white = cosmic_text::Color::rgba(255, 255, 255, 255);
        buffer.draw(
            &mut self.font_system,
            &mut self.swash,
            white,
            |gx, gy, gw, gh, color| {
                let glyph_alpha = (f32::from(color.a()) / 255.0) * alpha;
                if glyph_alpha <= 0.0 {
                    return;
                }
                let a8 = (glyph_alpha * 255.0).round() as u16;
                let src = [
                    ((u16::from(color.r()) * a8 + 127) / 255) as u8,
                    ((u16::from(color.g()) * a8 + 127) / 255) as u8,
                    ((u16::from(color.b()) * a8 + 127) / 255) as u8,
                    a8 as u8,
                ];
                blend_rect(
                    frame,
                    text_x as i32 + gx,
                    text_y as i32 + gy,
                    gw,
                    gh,
                    src,
                );
            },
        );
    }
}

fn draw_panel(frame: &mut FrameRGBA, band: SubtitleBand, alpha: f32) {
    let y0 = band.y.floor().max(0.0) as u32;
    let y1 = ((band.y + band.height).ceil().max(0.0) as u32).min(frame.height);
    let x0 = band.x.floor().max(0.0) as u32;
    let x1 = ((band.x + band.width).ceil().max(0.0) as u32).min(frame.width);
    if y0 >= y1 || x0 >= x1 {
        return;
    }

    // Two-stop vertical gradient, darker toward the bottom.
    for y in y0..y1 {
        let t = (f64::from(y) - f64::from(y0)) / f64::from(y1 - y0).max(1.0);
        let row_alpha = lerp(0.12, 0.78, t) as f32 * alpha;
        fill_black_span(frame, y, x0, x1, row_alpha);
    }
}

fn blend_rect(frame: &mut FrameRGBA, x: i32, y: i32, w: u32, h: u32, src: [u8; 4]) {
    for dy in 0..h as i32 {
        let py = y + dy;
        if py < 0 || py >= frame.height as i32 {
            continue;
        }
        for dx in 0..w as i32 {
            let px = x + dx;
            if px < 0 || px >= frame.width as i32 {
                continue;
            }
            let idx = (py as usize * frame.width as usize + px as usize) * 4;
            let d = [
                frame.data[idx],
                frame.data[idx + 1],
                frame.data[idx + 2],
                frame.data[idx + 3],
            ];
            let out = over(d, src, 1.0);
            frame.data[idx..idx + 4].copy_from_slice(&out);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/subtitle.rs"]
mod tests;
