use super::*;

use crate::foundation::core::Canvas;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src, 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_dst_transparent_returns_scaled_src() {
    let dst = [0, 0, 0, 0];
    let src = [100, 110, 120, 200];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn new_black_is_opaque_black() {
    let frame = FrameRGBA::new_black(Canvas {
        width: 3,
        height: 2,
    });
    assert_eq!(frame.data.len(), 3 * 2 * 4);
    assert!(frame.premultiplied);
    assert!(frame.data.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
}

#[test]
fn fill_black_alpha_0_is_noop_and_alpha_1_is_black() {
    let canvas = Canvas {
        width: 2,
        height: 2,
    };
    let mut frame = FrameRGBA::new_black(canvas);
    for px in frame.data.chunks_exact_mut(4) {
        px.copy_from_slice(&[200, 100, 50, 255]);
    }
    let before = frame.data.clone();

    fill_black(&mut frame, 0.0);
    assert_eq!(frame.data, before);

    fill_black(&mut frame, 1.0);
    assert!(frame.data.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
}

#[test]
fn fill_black_half_darkens_channels() {
    let mut frame = FrameRGBA::new_black(Canvas {
        width: 1,
        height: 1,
    });
    frame.data.copy_from_slice(&[200, 100, 50, 255]);
    fill_black(&mut frame, 0.5);
    let px = &frame.data[..4];
    assert!(px[0] < 200 && px[0] > 80);
    assert_eq!(px[3], 255);
}

#[test]
fn fill_black_span_is_bounded_to_the_row() {
    let mut frame = FrameRGBA::new_black(Canvas {
        width: 4,
        height: 2,
    });
    for px in frame.data.chunks_exact_mut(4) {
        px.copy_from_slice(&[255, 255, 255, 255]);
    }
    fill_black_span(&mut frame, 0, 1, 3, 1.0);

    let px = |x: usize, y: usize| &frame.data[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
    assert_eq!(px(0, 0), &[255, 255, 255, 255]);
    assert_eq!(px(1, 0), &[0, 0, 0, 255]);
    assert_eq!(px(2, 0), &[0, 0, 0, 255]);
    assert_eq!(px(3, 0), &[255, 255, 255, 255]);
    assert_eq!(px(1, 1), &[255, 255, 255, 255]);

    // Out-of-range coordinates are clamped away instead of panicking.
    fill_black_span(&mut frame, 9, 0, 4, 1.0);
    fill_black_span(&mut frame, 1, 3, 99, 1.0);
}
