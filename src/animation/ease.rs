/// Cubic ease-in/out used to shape the synthesized slide transition.
///
/// Accelerates through the first half of the travel and decelerates through
/// the second; live playback uses the same curve so exported transitions
/// match. `t` is clamped to `[0, 1]`.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
