use std::time::{Duration, Instant};

use tracing::debug;

use crate::foundation::core::{Fps, FrameIndex};

/// Monotonic time source that is the sole timing authority for one export.
///
/// The clock is an explicitly constructed context object owned by the render
/// loop, never ambient state, so independent exports cannot share timing.
/// Each tick advances it by exactly one frame interval; segment elapsed time
/// is always *measured* from the tick count, while wall-clock sleeping is
/// only used to *pace* the loop when real-time pacing is requested. This
/// keeps the visual track in lockstep with the sample-accurate audio mix.
pub struct ExportClock {
    fps: Fps,
    ticks: u64,
    started: Instant,
    realtime_pacing: bool,
    released: bool,
}

impl ExportClock {
    /// Create a clock at timeline zero.
    pub fn new(fps: Fps, realtime_pacing: bool) -> Self {
        Self {
            fps,
            ticks: 0,
            started: Instant::now(),
            realtime_pacing,
            released: false,
        }
    }

    /// Current timeline position in seconds.
    pub fn now_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.ticks)
    }

    /// Current timeline position as a frame index.
    pub fn frame(&self) -> FrameIndex {
        FrameIndex(self.ticks)
    }

    /// Advance one frame interval, optionally sleeping to hold the real-time
    /// cadence.
    pub fn tick(&mut self) {
        self.ticks += 1;
        if self.realtime_pacing {
            let target = self.started + Duration::from_secs_f64(self.now_secs());
            let now = Instant::now();
            if target > now {
                std::thread::sleep(target - now);
            }
        }
    }

    /// Release the clock. Called on every exit path of an export; releasing
    /// twice is a no-op.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!(ticks = self.ticks, "export clock released");
        }
    }
}

impl Drop for ExportClock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/clock.rs"]
mod tests;
