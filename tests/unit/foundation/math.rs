use super::*;

#[test]
fn mul_div255_variants_align() {
    for x in [0u16, 1, 127, 255] {
        for y in [0u16, 1, 127, 255] {
            assert_eq!(u16::from(mul_div255_u8(x, y)), mul_div255_u16(x, y));
        }
    }
}

#[test]
fn mul_div255_identity_at_255() {
    for x in 0..=255u16 {
        assert_eq!(mul_div255_u16(x, 255), x);
    }
}

#[test]
fn lerp_hits_endpoints() {
    assert_eq!(lerp(1.10, 1.25, 0.0), 1.10);
    assert_eq!(lerp(1.10, 1.25, 1.0), 1.25);
    assert!((lerp(0.0, 10.0, 0.5) - 5.0).abs() < 1e-12);
}
