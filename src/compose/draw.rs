use crate::compose::surface::{FrameRGBA, over};
use crate::foundation::core::{Affine, Canvas, Point, Rect, Vec2};

/// Borrowed view over decoded premultiplied RGBA8 pixels.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PixelSource<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba8_premul: &'a [u8],
}

impl<'a> PixelSource<'a> {
    pub(crate) fn new(width: u32, height: u32, rgba8_premul: &'a [u8]) -> Self {
        Self {
            width,
            height,
            rgba8_premul,
        }
    }
}

/// Cover-fit scale factor: the smallest scale at which the asset fully covers
/// the canvas, cropping the overflowing dimension.
pub(crate) fn cover_fit_scale(canvas: Canvas, asset_w: u32, asset_h: u32) -> f64 {
    let aw = f64::from(asset_w.max(1));
    let ah = f64::from(asset_h.max(1));
    if aw / ah > canvas.aspect() {
        f64::from(canvas.height) / ah
    } else {
        f64::from(canvas.width) / aw
    }
}

/// Draw an asset centered on the frame at cover-fit size times `scale`,
/// shifted by `offset` pixels, blended with `opacity`.
///
/// Sampling is bilinear with clamped edges; the asset's own alpha is
/// respected via source-over blending.
pub(crate) fn draw_cover_fit(
    dst: &mut FrameRGBA,
    src: PixelSource<'_>,
    canvas: Canvas,
    scale: f64,
    offset: Vec2,
    opacity: f32,
) {
    let expected = src.width as usize * src.height as usize * 4;
    if expected == 0 || src.rgba8_premul.len() != expected || opacity <= 0.0 {
        return;
    }

    let base = cover_fit_scale(canvas, src.width, src.height) * scale;
    if !base.is_finite() || base <= 0.0 {
        return;
    }

    let dst_center = Vec2::new(
        f64::from(canvas.width) / 2.0 + offset.x,
        f64::from(canvas.height) / 2.0 + offset.y,
    );
    let src_center = Vec2::new(f64::from(src.width) / 2.0, f64::from(src.height) / 2.0);
    let forward = Affine::translate(dst_center) * Affine::scale(base) * Affine::translate(-src_center);
    let inverse = forward.inverse();

    let covered = forward.transform_rect_bbox(Rect::new(
        0.0,
        0.0,
        f64::from(src.width),
        f64::from(src.height),
    ));
    let x0 = covered.x0.floor().max(0.0) as u32;
    let y0 = covered.y0.floor().max(0.0) as u32;
    let x1 = (covered.x1.ceil() as i64).clamp(0, i64::from(canvas.width.min(dst.width))) as u32;
    let y1 = (covered.y1.ceil() as i64).clamp(0, i64::from(canvas.height.min(dst.height))) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let p = inverse * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let sx = p.x - 0.5;
            let sy = p.y - 0.5;
            if sx < -0.5
                || sy < -0.5
                || sx > f64::from(src.width) - 0.5
                || sy > f64::from(src.height) - 0.5
            {
                continue;
            }
            let sample = sample_bilinear(src, sx, sy);
            let idx = (y as usize * dst.width as usize + x as usize) * 4;
            let d = [
                dst.data[idx],
                dst.data[idx + 1],
                dst.data[idx + 2],
                dst.data[idx + 3],
            ];
            let out = over(d, sample, opacity);
            dst.data[idx..idx + 4].copy_from_slice(&out);
        }
    }
}

fn sample_bilinear(src: PixelSource<'_>, x: f64, y: f64) -> [u8; 4] {
    let max_x = src.width as i64 - 1;
    let max_y = src.height as i64 - 1;

    let fx = x.floor();
    let fy = y.floor();
    let tx = (x - fx) as f32;
    let ty = (y - fy) as f32;

    let x0 = (fx as i64).clamp(0, max_x) as usize;
    let x1 = (fx as i64 + 1).clamp(0, max_x) as usize;
    let y0 = (fy as i64).clamp(0, max_y) as usize;
    let y1 = (fy as i64 + 1).clamp(0, max_y) as usize;

    let w = src.width as usize;
    let p00 = px(src.rgba8_premul, y0 * w + x0);
    let p10 = px(src.rgba8_premul, y0 * w + x1);
    let p01 = px(src.rgba8_premul, y1 * w + x0);
    let p11 = px(src.rgba8_premul, y1 * w + x1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f32::from(p00[c]) + (f32::from(p10[c]) - f32::from(p00[c])) * tx;
        let bot = f32::from(p01[c]) + (f32::from(p11[c]) - f32::from(p01[c])) * tx;
        out[c] = (top + (bot - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn px(data: &[u8], idx: usize) -> [u8; 4] {
    let off = idx * 4;
    [data[off], data[off + 1], data[off + 2], data[off + 3]]
}

#[cfg(test)]
#[path = "../../tests/unit/compose/draw.rs"]
mod tests;
