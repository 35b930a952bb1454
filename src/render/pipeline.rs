use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use tracing::{debug, info, warn};

use crate::assets::media::MIX_SAMPLE_RATE;
use crate::assets::store::AssetStore;
use crate::audio::mix::{build_narration_mix, write_mix_to_f32le_file};
use crate::compose::frame::Compositor;
use crate::compose::surface::FrameRGBA;
use crate::encode::ffmpeg::CodecPreference;
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::clock::ExportClock;
use crate::story::model::Story;
use crate::timeline::plan::{FRAME_RATE, Segment, build_timeline, total_duration};

const PROGRESS_LOAD_START: u8 = 2;
const PROGRESS_LOAD_END: u8 = 10;
const PROGRESS_MAIN_END: u8 = 95;
const PROGRESS_FINALIZE: u8 = 98;
const PROGRESS_DONE: u8 = 100;

/// Cooperative cancellation token checked once per render tick.
///
/// Cancelling fails the export; whatever the encoder consumed up to that
/// point is still finalized into a blob.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Return `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options controlling one export run.
#[derive(Clone, Debug)]
pub struct ExportOpts {
    /// Requested output container/codec.
    pub codec: CodecPreference,
    /// Sleep between ticks to hold the live 30 fps cadence. Off by default:
    /// offline exports run as fast as the encoder accepts frames, with
    /// identical timeline math either way.
    pub realtime_pacing: bool,
    /// Bounded channel capacity between the render loop and the encoder.
    pub channel_capacity: usize,
    /// Optional cancellation token.
    pub cancel: Option<CancelToken>,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            codec: CodecPreference::Auto,
            realtime_pacing: false,
            channel_capacity: 4,
            cancel: None,
        }
    }
}

/// Summary of a completed export.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExportReport {
    /// Frames pushed to the sink.
    pub frames_pushed: u64,
    /// Total timeline duration in seconds.
    pub duration_secs: f64,
    /// Number of timeline segments rendered.
    pub segments: usize,
}

/// Render-loop state machine. Terminal states are `Complete` and `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopState {
    Preloading,
    RenderingSegment(usize),
    Complete,
    Failed,
}

struct FrameMsg {
    idx: FrameIndex,
    frame: FrameRGBA,
}

/// Monotonic progress reporting over a caller-supplied callback.
pub(crate) struct ProgressReporter<'a> {
    callback: &'a mut dyn FnMut(u8, &str),
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(callback: &'a mut dyn FnMut(u8, &str)) -> Self {
        Self { callback, last: 0 }
    }

    /// Report `(percent, status)`, clamped so percent never decreases.
    pub(crate) fn report(&mut self, percent: u8, status: &str) {
        let percent = percent.min(100).max(self.last);
        self.last = percent;
        (self.callback)(percent, status);
    }
}

/// Export a story into `sink`, driving the full pipeline:
/// resolve assets, build the timeline, mix narration, then render frames
/// tick-by-tick against the export clock while the encoder consumes them
/// from a bounded channel.
///
/// Cleanup (clock release, temp audio removal, sink finalization) runs on
/// every exit path; a failed run surfaces one opaque error and leaves the
/// sink's best-effort output intact.
pub fn export_story(
    story: &Story,
    sink: &mut dyn FrameSink,
    progress: &mut dyn FnMut(u8, &str),
    opts: &ExportOpts,
) -> SlidecastResult<ExportReport> {
    story.validate()?;
    let fps = Fps::new(FRAME_RATE, 1)?;
    let mut progress = ProgressReporter::new(progress);
    let mut state = LoopState::Preloading;
    debug!(?state, "export starting");

    progress.report(PROGRESS_LOAD_START, "loading assets");
    let mut assets = AssetStore::load(story, FRAME_RATE, |i, n| {
        let span = usize::from(PROGRESS_LOAD_END - PROGRESS_LOAD_START);
        let pct = PROGRESS_LOAD_START + ((span * i) / n.max(1)) as u8;
        progress.report(pct, &format!("loading scene {}/{n}", i + 1));
    });
    progress.report(PROGRESS_LOAD_END, "assets ready");

    let segments = build_timeline(story, &assets);
    let total_secs = total_duration(&segments);
    info!(
        segments = segments.len(),
        duration_secs = total_secs,
        "timeline built"
    );

    let mut audio_tmp = TempFileGuard(None);
    let audio_cfg = match build_narration_mix(&segments, &assets, fps) {
        Some(mix) => {
            let path = std::env::temp_dir().join(format!(
                "slidecast_audio_mix_{}_{}.f32le",
                std::process::id(),
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or(0)
            ));
            write_mix_to_f32le_file(&mix, &path)?;
            audio_tmp.0 = Some(path.clone());
            Some(AudioInputConfig {
                path,
                sample_rate: MIX_SAMPLE_RATE,
                channels: 2,
            })
        }
        None => None,
    };

    let canvas = assets.canvas();
    let cfg = SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps,
        audio: audio_cfg,
    };

    let mut compositor = Compositor::new(story.aspect);
    let mut clock = ExportClock::new(fps, opts.realtime_pacing);
    let cancel = opts.cancel.clone();
    let cap = opts.channel_capacity.max(1);

    let run = std::thread::scope(|scope| -> SlidecastResult<u64> {
        let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
        let sink_ref: &mut dyn FrameSink = sink;

        // Encoder side: consume in arrival order (the single producer is
        // already ordered) and finalize unconditionally once producers hang
        // up, so failed exports keep their partial output.
        let enc = scope.spawn(move || -> SlidecastResult<()> {
            sink_ref.begin(cfg)?;
            let mut push_err: Option<SlidecastError> = None;
            while let Ok(msg) = rx.recv() {
                if push_err.is_none()
                    && let Err(e) = sink_ref.push_frame(msg.idx, &msg.frame)
                {
                    push_err = Some(e);
                }
            }
            let end_res = sink_ref.end();
            match push_err {
                Some(e) => Err(e),
                None => end_res,
            }
        });

        let produce = (|| -> SlidecastResult<u64> {
            let mut pushed = 0u64;
            let mut done_secs = 0.0f64;
            for (si, segment) in segments.iter().enumerate() {
                state = LoopState::RenderingSegment(si);
                debug!(?state, %segment, "segment start");
                if let Segment::Scene { index, .. } = segment {
                    progress.report(
                        main_progress(done_secs, total_secs),
                        &format!("rendering scene {}/{}", index + 1, assets.scene_count()),
                    );
                }

                let seg_start = clock.now_secs();
                let duration = segment.duration();
                loop {
                    let elapsed = clock.now_secs() - seg_start;
                    if elapsed >= duration - 1e-9 {
                        break;
                    }
                    if let Some(token) = &cancel
                        && token.is_cancelled()
                    {
                        return Err(SlidecastError::render("export cancelled"));
                    }

                    let frame = compositor.render(&mut assets, segment, elapsed);
                    tx.send(FrameMsg {
                        idx: clock.frame(),
                        frame,
                    })
                    .map_err(|_| SlidecastError::encode("encoder is not accepting frames"))?;
                    pushed += 1;
                    clock.tick();
                }

                // Segments are consumed strictly left to right, so once the
                // transition out of a scene finishes nothing can sample that
                // scene's clips again.
                if let Segment::Transition { from, .. } = segment {
                    assets.release_scene(*from);
                }

                done_secs += duration;
                progress.report(
                    main_progress(done_secs, total_secs),
                    &format!("rendered {segment}"),
                );
            }
            Ok(pushed)
        })();

        drop(tx);
        progress.report(PROGRESS_FINALIZE, "finalizing");
        let enc_res = enc
            .join()
            .map_err(|_| SlidecastError::render("encoder thread panicked"))?;

        match (produce, enc_res) {
            (Ok(pushed), Ok(())) => Ok(pushed),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(produce_err), Err(enc_err)) => {
                // The encoder failing is why the channel closed; it is the
                // root cause worth surfacing.
                warn!(error = %produce_err, "render loop failed alongside encoder");
                Err(enc_err)
            }
        }
    });

    clock.release();
    drop(audio_tmp);

    match run {
        Ok(frames_pushed) => {
            state = LoopState::Complete;
            debug!(?state, "export finished");
            progress.report(PROGRESS_DONE, "complete");
            info!(frames = frames_pushed, "export complete");
            Ok(ExportReport {
                frames_pushed,
                duration_secs: total_secs,
                segments: segments.len(),
            })
        }
        Err(e) => {
            state = LoopState::Failed;
            debug!(?state, "export failed");
            Err(e)
        }
    }
}

fn main_progress(done_secs: f64, total_secs: f64) -> u8 {
    let span = f64::from(PROGRESS_MAIN_END - PROGRESS_LOAD_END);
    let frac = if total_secs > 0.0 {
        (done_secs / total_secs).clamp(0.0, 1.0)
    } else {
        1.0
    };
    PROGRESS_LOAD_END + (span * frac).round() as u8
}

struct TempFileGuard(Option<std::path::PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
