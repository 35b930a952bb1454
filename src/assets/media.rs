use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Internal audio mixing sample rate used across decode/mix/encode pipeline.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Bounded wait applied to each clip probe/decode subprocess.
pub const CLIP_DECODE_TIMEOUT: Duration = Duration::from_secs(5);

/// Basic metadata about a source clip file.
#[derive(Clone, Debug)]
pub struct ClipSourceInfo {
    /// Absolute source path used for probing/decoding.
    pub source_path: PathBuf,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Playable duration in seconds.
    pub duration_secs: f64,
    /// Whether ffprobe detected at least one audio stream.
    pub has_audio: bool,
}

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Playable duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        let frames = self.interleaved_f32.len() / usize::from(self.channels);
        (frames as f64) / f64::from(self.sample_rate)
    }
}

/// Probe source clip metadata through `ffprobe`, bounded by
/// [`CLIP_DECODE_TIMEOUT`].
pub fn probe_clip(source_path: &Path) -> SlidecastResult<ClipSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let mut cmd = Command::new("ffprobe");
    cmd.args([
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_streams",
        "-show_format",
    ])
    .arg(source_path);
    let out = run_with_deadline(cmd, CLIP_DECODE_TIMEOUT, "ffprobe")?;
    if !out.status.success() {
        return Err(SlidecastError::asset(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| SlidecastError::asset(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| SlidecastError::asset("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| SlidecastError::asset("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| SlidecastError::asset("missing video height from ffprobe"))?;

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video_stream.duration.as_deref())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| SlidecastError::asset("missing clip duration from ffprobe"))?;

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(ClipSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        duration_secs,
        has_audio,
    })
}

/// Decode up to `frame_count` sequential RGBA frames from a source clip,
/// resampled to the export frame rate so frame `k` of a batch starting at
/// `start_time_sec` shows the clip at `start_time_sec + k/fps`.
pub(crate) fn decode_clip_frames_rgba8(
    source: &ClipSourceInfo,
    start_time_sec: f64,
    frame_count: u32,
    fps: u32,
) -> SlidecastResult<Vec<Vec<u8>>> {
    if frame_count == 0 {
        return Ok(Vec::new());
    }

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-ss", &format!("{start_time_sec:.9}")])
        .arg("-i")
        .arg(&source.source_path)
        .args([
            "-r",
            &fps.to_string(),
            "-frames:v",
            &frame_count.to_string(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ]);
    let out = run_with_deadline(cmd, CLIP_DECODE_TIMEOUT, "ffmpeg video decode")?;

    if !out.status.success() {
        return Err(SlidecastError::asset(format!(
            "ffmpeg video decode batch failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected_len = source.width as usize * source.height as usize * 4;
    if expected_len == 0 {
        return Err(SlidecastError::asset(
            "decoded clip frame size is zero (invalid source dimensions)",
        ));
    }
    if out.stdout.is_empty() || !out.stdout.len().is_multiple_of(expected_len) {
        return Err(SlidecastError::asset(format!(
            "decoded clip batch has invalid size: got {} bytes, expected multiples of {expected_len}",
            out.stdout.len()
        )));
    }

    let available = (out.stdout.len() / expected_len).min(frame_count as usize);
    let mut frames = Vec::with_capacity(available);
    for idx in 0..available {
        let off = idx * expected_len;
        frames.push(out.stdout[off..off + expected_len].to_vec());
    }
    Ok(frames)
}

/// Decode encoded audio bytes to stereo interleaved `f32` PCM at `sample_rate`.
pub fn decode_audio_f32_stereo(bytes: &[u8], sample_rate: u32) -> SlidecastResult<AudioPcm> {
    let mut child = Command::new("ffmpeg")
        .args(["-v", "error", "-i", "pipe:0"])
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SlidecastError::asset(format!("failed to run ffmpeg for audio decode: {e}")))?;

    // Feed stdin from a thread so reading stdout cannot deadlock on a full
    // pipe. A broken pipe here just means ffmpeg rejected the input early.
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| SlidecastError::asset("failed to open ffmpeg stdin (unexpected)"))?;
    let input = bytes.to_vec();
    let writer = std::thread::spawn(move || {
        use std::io::Write as _;
        let mut stdin = stdin;
        let _ = stdin.write_all(&input);
    });

    let stderr_drain = child.stderr.take().map(|mut stderr| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            buf
        })
    });
    let mut stdout_bytes = Vec::new();
    if let Some(mut stdout) = child.stdout.take() {
        let _ = stdout.read_to_end(&mut stdout_bytes);
    }
    let status = child
        .wait()
        .map_err(|e| SlidecastError::asset(format!("failed to wait for ffmpeg: {e}")))?;
    let _ = writer.join();
    let stderr_bytes = stderr_drain
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if !status.success() {
        return Err(SlidecastError::asset(format!(
            "ffmpeg audio decode failed: {}",
            String::from_utf8_lossy(&stderr_bytes).trim()
        )));
    }

    if !stdout_bytes.len().is_multiple_of(4) {
        return Err(SlidecastError::asset(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(stdout_bytes.len() / 4);
    for chunk in stdout_bytes.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}

/// Run a subprocess to completion, killing it once `deadline` elapses.
///
/// Output pipes are drained from threads so a chatty child cannot stall on a
/// full pipe while we poll its exit status.
fn run_with_deadline(
    mut cmd: Command,
    deadline: Duration,
    what: &str,
) -> SlidecastResult<std::process::Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SlidecastError::asset(format!("failed to spawn {what}: {e}")))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| SlidecastError::asset(format!("failed to open {what} stdout")))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| SlidecastError::asset(format!("failed to open {what} stderr")))?;
    let stdout_drain = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });
    let stderr_drain = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        buf
    });

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_drain.join();
                    let _ = stderr_drain.join();
                    return Err(SlidecastError::asset(format!(
                        "{what} timed out after {:.1}s",
                        deadline.as_secs_f64()
                    )));
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                return Err(SlidecastError::asset(format!(
                    "failed to wait for {what}: {e}"
                )));
            }
        }
    };

    let stdout = stdout_drain
        .join()
        .map_err(|_| SlidecastError::asset(format!("{what} stdout drain thread panicked")))?;
    let stderr = stderr_drain
        .join()
        .map_err(|_| SlidecastError::asset(format!("{what} stderr drain thread panicked")))?;

    Ok(std::process::Output {
        status,
        stdout,
        stderr,
    })
}

// No unit tests here: these functions shell out to `ffprobe`/`ffmpeg` and are
// exercised through the store's fallback paths and integration tests instead.
