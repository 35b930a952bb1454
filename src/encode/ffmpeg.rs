use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, warn};

use crate::compose::surface::FrameRGBA;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::mul_div255_u16;

/// Fixed target video bitrate for exports.
const VIDEO_BITRATE: &str = "8M";

/// Caller-facing container/codec request.
///
/// `Auto` walks the fixed fallback ladder against what the runtime's ffmpeg
/// actually supports; the other variants pin a format explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CodecPreference {
    /// First supported of: MP4+H.264/AAC, MP4, WebM+VP9, WebM.
    #[default]
    Auto,
    /// MP4 container with H.264 video and AAC audio.
    Mp4H264Aac,
    /// MP4 container with ffmpeg's default codecs.
    Mp4,
    /// WebM container with VP9 video.
    WebmVp9,
    /// WebM container with ffmpeg's default codecs.
    Webm,
}

/// Resolved output container/codec combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerFormat {
    /// MP4 + libx264 + AAC.
    Mp4H264Aac,
    /// Generic MP4.
    Mp4,
    /// WebM + VP9.
    WebmVp9,
    /// Generic WebM (terminal fallback, always assumed available).
    Webm,
}

impl ContainerFormat {
    /// Conventional file extension for this container.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4H264Aac | Self::Mp4 => "mp4",
            Self::WebmVp9 | Self::Webm => "webm",
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mp4H264Aac => write!(f, "mp4 (h264/aac)"),
            Self::Mp4 => write!(f, "mp4"),
            Self::WebmVp9 => write!(f, "webm (vp9)"),
            Self::Webm => write!(f, "webm"),
        }
    }
}

/// Resolve a preference against an `ffmpeg -encoders` listing.
///
/// Pure so the ladder is testable with canned listings. The final WebM step
/// is unconditional by contract.
pub(crate) fn select_format(pref: CodecPreference, encoders: &str) -> ContainerFormat {
    match pref {
        CodecPreference::Mp4H264Aac => ContainerFormat::Mp4H264Aac,
        CodecPreference::Mp4 => ContainerFormat::Mp4,
        CodecPreference::WebmVp9 => ContainerFormat::WebmVp9,
        CodecPreference::Webm => ContainerFormat::Webm,
        CodecPreference::Auto => {
            if encoders.contains("libx264") && encoders.contains("aac") {
                ContainerFormat::Mp4H264Aac
            } else if encoders.contains("mpeg4") {
                ContainerFormat::Mp4
            } else if encoders.contains("libvpx-vp9") {
                ContainerFormat::WebmVp9
            } else {
                ContainerFormat::Webm
            }
        }
    }
}

fn detect_encoders() -> String {
    let out = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stderr(Stdio::null())
        .output();
    match out {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).into_owned(),
        _ => {
            warn!("could not list ffmpeg encoders, assuming terminal webm fallback only");
            String::new()
        }
    }
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Requested container/codec.
    pub codec: CodecPreference,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl Default for FfmpegSinkOpts {
    fn default() -> Self {
        Self {
            codec: CodecPreference::Auto,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Sink that spawns the system `ffmpeg`, streams raw frames to its stdin,
/// and finalizes the muxed container into an in-memory byte blob.
///
/// The blob survives failed exports: closing stdin early makes ffmpeg flush
/// and finish whatever it consumed, and [`FfmpegSink::take_bytes`] hands the
/// partial-but-finalized container to the caller.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    format: Option<ContainerFormat>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    tmp_path: Option<PathBuf>,
    bytes: Option<Vec<u8>>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            format: None,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
            tmp_path: None,
            bytes: None,
        }
    }

    /// Container format resolved in `begin`, if it ran.
    pub fn format(&self) -> Option<ContainerFormat> {
        self.format
    }

    /// Take the finalized container blob produced by `end`.
    pub fn take_bytes(&mut self) -> Option<Vec<u8>> {
        self.bytes.take()
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(SlidecastError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(SlidecastError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(SlidecastError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }

        if !is_ffmpeg_on_path() {
            return Err(SlidecastError::encode(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let format = select_format(self.opts.codec, &detect_encoders());
        debug!(%format, "selected output container");

        let tmp_path = std::env::temp_dir().join(format!(
            "slidecast_export_{}_{}.{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
            format.extension()
        ));

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args(["-y", "-loglevel", "error"]);

        // Input: raw RGBA8 frames, flattened over the background before each
        // write because ffmpeg does not understand premultiplied alpha.
        cmd.args([
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);

        if let Some(audio) = cfg.audio.as_ref() {
            if audio.sample_rate == 0 {
                return Err(SlidecastError::validation(
                    "audio sample_rate must be non-zero when audio is enabled",
                ));
            }
            if audio.channels == 0 {
                return Err(SlidecastError::validation(
                    "audio channels must be non-zero when audio is enabled",
                ));
            }
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&audio.path);
        }

        match format {
            ContainerFormat::Mp4H264Aac => {
                cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-b:v", VIDEO_BITRATE]);
                if cfg.audio.is_some() {
                    cmd.args(["-c:a", "aac"]);
                }
                cmd.args(["-movflags", "+faststart", "-f", "mp4"]);
            }
            ContainerFormat::Mp4 => {
                cmd.args(["-pix_fmt", "yuv420p", "-b:v", VIDEO_BITRATE]);
                cmd.args(["-movflags", "+faststart", "-f", "mp4"]);
            }
            ContainerFormat::WebmVp9 => {
                cmd.args(["-c:v", "libvpx-vp9", "-b:v", VIDEO_BITRATE]);
                if cfg.audio.is_some() {
                    cmd.args(["-c:a", "libopus"]);
                }
                cmd.args(["-f", "webm"]);
            }
            ContainerFormat::Webm => {
                cmd.args(["-b:v", VIDEO_BITRATE, "-f", "webm"]);
            }
        }
        if cfg.audio.is_some() {
            cmd.arg("-shortest");
        }
        cmd.arg(&tmp_path);

        let mut child = cmd.spawn().map_err(|e| {
            SlidecastError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SlidecastError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SlidecastError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; (cfg.width * cfg.height * 4) as usize];
        self.format = Some(format);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.tmp_path = Some(tmp_path);
        self.bytes = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SlidecastResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SlidecastError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(SlidecastError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(SlidecastError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(SlidecastError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SlidecastError::encode("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            SlidecastError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> SlidecastResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| SlidecastError::encode("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            SlidecastError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SlidecastError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| SlidecastError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        let tmp_path = self.tmp_path.take();
        if let Some(path) = tmp_path.as_ref() {
            self.bytes = std::fs::read(path).ok();
            let _ = std::fs::remove_file(path);
        }
        self.cfg = None;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(SlidecastError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        if self.bytes.is_none() {
            return Err(SlidecastError::encode(
                "ffmpeg finished but produced no output file",
            ));
        }
        Ok(())
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> SlidecastResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(SlidecastError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = u16::from(bg_rgba[0]);
    let bg_g = u16::from(bg_rgba[1]);
    let bg_b = u16::from(bg_rgba[2]);

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            d[3] = 255;
            continue;
        }

        let inv = 255u16 - a;
        let r = u16::from(s[0]) + mul_div255_u16(bg_r, inv);
        let g = u16::from(s[1]) + mul_div255_u16(bg_g, inv);
        let b = u16::from(s[2]) + mul_div255_u16(bg_b, inv);

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
