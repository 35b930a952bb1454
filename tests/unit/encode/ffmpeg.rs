use super::*;

const FULL_LISTING: &str = "\
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC\n\
 V....D mpeg4                MPEG-4 part 2\n\
 V....D libvpx-vp9           libvpx VP9\n\
 A....D aac                  AAC (Advanced Audio Coding)\n";

#[test]
fn auto_prefers_h264_aac_mp4() {
    assert_eq!(
        select_format(CodecPreference::Auto, FULL_LISTING),
        ContainerFormat::Mp4H264Aac
    );
}

#[test]
fn auto_walks_the_ladder_as_encoders_disappear() {
    let no_x264 = FULL_LISTING.replace("libx264", "x");
    assert_eq!(
        select_format(CodecPreference::Auto, &no_x264),
        ContainerFormat::Mp4
    );

    let no_mp4 = no_x264.replace("mpeg4", "x");
    assert_eq!(
        select_format(CodecPreference::Auto, &no_mp4),
        ContainerFormat::WebmVp9
    );

    // Terminal fallback holds even for an empty listing.
    assert_eq!(
        select_format(CodecPreference::Auto, ""),
        ContainerFormat::Webm
    );
}

#[test]
fn explicit_preferences_bypass_detection() {
    assert_eq!(
        select_format(CodecPreference::WebmVp9, ""),
        ContainerFormat::WebmVp9
    );
    assert_eq!(
        select_format(CodecPreference::Mp4H264Aac, ""),
        ContainerFormat::Mp4H264Aac
    );
}

#[test]
fn container_extensions_match_families() {
    assert_eq!(ContainerFormat::Mp4H264Aac.extension(), "mp4");
    assert_eq!(ContainerFormat::Mp4.extension(), "mp4");
    assert_eq!(ContainerFormat::WebmVp9.extension(), "webm");
    assert_eq!(ContainerFormat::Webm.extension(), "webm");
}

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn sink_end_before_begin_is_an_error() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::default());
    assert!(sink.format().is_none());
    assert!(sink.take_bytes().is_none());
    assert!(sink.end().is_err());
}
