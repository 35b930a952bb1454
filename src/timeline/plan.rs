use crate::assets::store::AssetStore;
use crate::story::model::Story;

/// Export frame rate in frames per second.
pub const FRAME_RATE: u32 = 30;

/// Scene duration when the scene has no narration audio.
pub const SCENE_FALLBACK_SECS: f64 = 3.0;
/// Hard floor for scene segment duration.
pub const SCENE_MIN_SECS: f64 = 2.0;
/// Cover zoom/fade portion of the intro.
pub const INTRO_EFFECT_SECS: f64 = 3.0;
/// Black hold appended to the intro before the first scene.
pub const INTRO_HOLD_SECS: f64 = 0.3;
/// Duration of a synthesized slide transition.
pub const SYNTH_TRANSITION_SECS: f64 = 1.0;
/// Fade-to-black portion of the outro.
pub const OUTRO_FADE_SECS: f64 = 1.5;
/// Solid black hold closing the outro.
pub const OUTRO_HOLD_SECS: f64 = 0.5;

/// One timed unit of the render timeline.
///
/// Segments are built once per export, immutable, and exclusively owned by
/// the render loop for the run. For `N` scenes the timeline is
/// `[intro?] + N scenes + (N-1) transitions + outro`, in that order.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    /// Cover zoom/fade plus a short black hold; present iff a cover decoded.
    Intro,
    /// Main segment of scene `index`.
    Scene {
        /// Scene index into the asset table.
        index: usize,
        /// Computed duration in seconds.
        duration: f64,
    },
    /// Cut from scene `from` into scene `from + 1`.
    Transition {
        /// Outgoing scene index.
        from: usize,
        /// `true` when a pre-rendered transition clip plays; `false` for the
        /// synthesized slide.
        clip: bool,
        /// Clip duration verbatim, or [`SYNTH_TRANSITION_SECS`].
        duration: f64,
    },
    /// Fade to black over the last scene's final frame, then hold.
    Outro {
        /// Index of the last scene.
        last: usize,
        /// Duration of the last scene's segment, used to freeze its final
        /// frame.
        scene_duration: f64,
    },
}

impl Segment {
    /// Duration of this segment in seconds. Always `> 0`, and `>= 2.0` for
    /// scene segments.
    pub fn duration(&self) -> f64 {
        match self {
            Self::Intro => INTRO_EFFECT_SECS + INTRO_HOLD_SECS,
            Self::Scene { duration, .. } | Self::Transition { duration, .. } => *duration,
            Self::Outro { .. } => OUTRO_FADE_SECS + OUTRO_HOLD_SECS,
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intro => write!(f, "intro ({:.2}s)", self.duration()),
            Self::Scene { index, duration } => {
                write!(f, "scene {} ({duration:.2}s)", index + 1)
            }
            Self::Transition {
                from,
                clip,
                duration,
            } => {
                let kind = if *clip { "clip" } else { "slide" };
                write!(
                    f,
                    "transition {} -> {} ({kind}, {duration:.2}s)",
                    from + 1,
                    from + 2
                )
            }
            Self::Outro { .. } => write!(f, "outro ({:.2}s)", self.duration()),
        }
    }
}

/// Duration rule for a scene segment.
///
/// Silent scenes hold for [`SCENE_FALLBACK_SECS`]; narrated scenes run for
/// their audio, floored at [`SCENE_MIN_SECS`].
pub fn scene_duration(audio_secs: Option<f64>) -> f64 {
    match audio_secs {
        None => SCENE_FALLBACK_SECS,
        Some(secs) => secs.max(SCENE_MIN_SECS),
    }
}

/// Build the ordered segment sequence for a story.
///
/// Pure computation over the story and its resolved asset table; callers
/// must have run [`Story::validate`] first (an empty scene list is a
/// precondition violation, not a runtime error here). A decoded transition
/// clip is always preferred over the synthesized slide, and its intrinsic
/// duration is taken verbatim, without clamping.
pub fn build_timeline(story: &Story, assets: &AssetStore) -> Vec<Segment> {
    let n = story.scenes.len();
    let mut segments = Vec::with_capacity(n * 2 + 1);

    if assets.cover().is_some() {
        segments.push(Segment::Intro);
    }

    let mut last_scene_duration = SCENE_FALLBACK_SECS;
    for index in 0..n {
        let duration = scene_duration(assets.narration_duration_secs(index));
        last_scene_duration = duration;
        segments.push(Segment::Scene { index, duration });

        if index + 1 < n {
            let (clip, duration) = match &assets.scene(index).transition {
                Some(clip) => (true, clip.duration_secs()),
                None => (false, SYNTH_TRANSITION_SECS),
            };
            segments.push(Segment::Transition {
                from: index,
                clip,
                duration,
            });
        }
    }

    segments.push(Segment::Outro {
        last: n - 1,
        scene_duration: last_scene_duration,
    });

    segments
}

/// Total rendered duration of a segment sequence in seconds.
pub fn total_duration(segments: &[Segment]) -> f64 {
    segments.iter().map(Segment::duration).sum()
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/plan.rs"]
mod tests;
