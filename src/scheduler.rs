/// Default rolling window for the observed FPS counter
pub const DEFAULT_FPS_WINDOW_MS: f64 = 1000.0;

pub const MIN_TARGET_FPS: f32 = 1.0;
pub const MAX_TARGET_FPS: f32 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not started yet
    Idle,
    Running,
    Frozen,
}

/// Values for one accepted frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Simulation seconds since the origin
    pub time: f64,
    /// Total frames advanced since the last restart
    pub frame: u64,
    /// Observed FPS over the last complete window
    pub fps: f32,
}

/// Decides when a frame is due and keeps simulation time.
///
/// All timestamps are wall-clock milliseconds from any monotonic origin.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    state: SchedulerState,
    target_fps: f32,
    interval_ms: f64,
    origin_ms: f64,
    last_ms: f64,
    time: f64,
    frame: u64,
    fps_window_ms: f64,
    window_start_ms: f64,
    window_frames: u32,
    observed_fps: f32,
}

impl FrameScheduler {
    pub fn new(target_fps: f32, fps_window_ms: f64) -> Self {
        let target_fps = target_fps.max(1.0);
        Self {
            state: SchedulerState::Idle,
            target_fps,
            interval_ms: 1000.0 / target_fps as f64,
            origin_ms: 0.0,
            last_ms: 0.0,
            time: 0.0,
            frame: 0,
            fps_window_ms: fps_window_ms.max(1.0),
            window_start_ms: 0.0,
            window_frames: 0,
            observed_fps: 0.0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state == SchedulerState::Frozen
    }

    pub fn target_fps(&self) -> f32 {
        self.target_fps
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn observed_fps(&self) -> f32 {
        self.observed_fps
    }

    /// Milliseconds until the next frame is due, for sizing the event poll
    pub fn until_next(&self, now_ms: f64) -> f64 {
        if self.state == SchedulerState::Idle {
            return self.interval_ms;
        }
        (self.interval_ms - (now_ms - self.last_ms)).max(0.0)
    }

    /// Zero time and counters and start running; the first tick is due at once.
    /// Keeps a frozen scheduler frozen.
    pub fn restart(&mut self, now_ms: f64) {
        self.origin_ms = now_ms;
        self.last_ms = now_ms - self.interval_ms;
        self.time = 0.0;
        self.frame = 0;
        self.window_start_ms = now_ms;
        self.window_frames = 0;
        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::Running;
        }
    }

    pub fn set_target_fps(&mut self, fps: f32) {
        self.target_fps = fps.max(1.0);
        self.interval_ms = 1000.0 / self.target_fps as f64;
    }

    /// Freeze or unfreeze. Unfreezing re-bases the origin so time continues
    /// from where it stopped.
    pub fn set_frozen(&mut self, frozen: bool, now_ms: f64) {
        match (self.state, frozen) {
            (SchedulerState::Running, true) => self.state = SchedulerState::Frozen,
            (SchedulerState::Frozen, false) => {
                self.origin_ms = now_ms - self.time * 1000.0;
                self.state = SchedulerState::Running;
            }
            _ => {}
        }
    }

    pub fn toggle_freeze(&mut self, now_ms: f64) {
        let frozen = !self.is_frozen();
        self.set_frozen(frozen, now_ms);
    }

    /// Accept a frame if the interval has elapsed.
    ///
    /// Returns `None` without touching any state when it's too early or the
    /// scheduler hasn't started.
    pub fn tick(&mut self, now_ms: f64) -> Option<FrameTick> {
        if self.state == SchedulerState::Idle {
            return None;
        }
        let elapsed = now_ms - self.last_ms;
        if elapsed < self.interval_ms {
            return None;
        }
        self.last_ms = now_ms - elapsed % self.interval_ms;

        if self.state == SchedulerState::Running {
            self.time = (now_ms - self.origin_ms) / 1000.0;
            self.frame += 1;
            self.window_frames += 1;
        }

        let window_elapsed = now_ms - self.window_start_ms;
        if window_elapsed >= self.fps_window_ms {
            self.observed_fps = (self.window_frames as f64 * 1000.0 / window_elapsed) as f32;
            log::debug!("observed fps {:.1}", self.observed_fps);
            self.window_frames = 0;
            self.window_start_ms = now_ms;
        }

        Some(FrameTick {
            time: self.time,
            frame: self.frame,
            fps: self.observed_fps,
        })
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(60.0, DEFAULT_FPS_WINDOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(fps: f32, now: f64) -> FrameScheduler {
        let mut scheduler = FrameScheduler::new(fps, DEFAULT_FPS_WINDOW_MS);
        scheduler.restart(now);
        scheduler
    }

    #[test]
    fn test_idle_never_ticks() {
        let mut scheduler = FrameScheduler::default();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.tick(10_000.0).is_none());
    }

    #[test]
    fn test_first_tick_is_immediate() {
        let mut scheduler = started(50.0, 1000.0);
        let tick = scheduler.tick(1000.0).unwrap();
        assert_eq!(tick.frame, 1);
        assert_eq!(tick.time, 0.0);
    }

    #[test]
    fn test_early_tick_leaves_state() {
        let mut scheduler = started(50.0, 0.0);
        scheduler.tick(0.0);
        let before = scheduler.clone();
        assert!(scheduler.tick(19.9).is_none());
        assert_eq!(scheduler.frame(), before.frame());
        assert_eq!(scheduler.until_next(19.9), before.until_next(19.9));
    }

    #[test]
    fn test_baseline_keeps_phase() {
        // 50 fps -> 20 ms interval
        let mut scheduler = started(50.0, 0.0);
        scheduler.tick(0.0);
        assert!(scheduler.tick(25.0).is_some());
        // baseline became 20, so 40 is due but 39 is not
        assert!(scheduler.tick(39.0).is_none());
        assert!(scheduler.tick(40.0).is_some());
    }

    #[test]
    fn test_time_and_frames_advance() {
        let mut scheduler = started(50.0, 1000.0);
        scheduler.tick(1000.0);
        scheduler.tick(1020.0);
        let tick = scheduler.tick(1500.0).unwrap();
        assert_eq!(tick.frame, 3);
        assert!((tick.time - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_freeze_gap_resumes_time() {
        let mut scheduler = started(50.0, 0.0);
        scheduler.tick(0.0);
        scheduler.tick(1000.0);
        assert!((scheduler.time() - 1.0).abs() < 1e-9);

        scheduler.set_frozen(true, 1000.0);
        let frozen = scheduler.tick(3000.0).unwrap();
        assert!((frozen.time - 1.0).abs() < 1e-9);
        let frames = frozen.frame;
        scheduler.tick(6000.0);
        assert_eq!(scheduler.frame(), frames);

        // five seconds of wall clock passed while frozen
        scheduler.set_frozen(false, 6000.0);
        let resumed = scheduler.tick(6020.0).unwrap();
        assert!((resumed.time - 1.02).abs() < 1e-9, "time {}", resumed.time);
        assert_eq!(resumed.frame, frames + 1);
    }

    #[test]
    fn test_toggle_freeze() {
        let mut scheduler = started(60.0, 0.0);
        scheduler.toggle_freeze(0.0);
        assert!(scheduler.is_frozen());
        scheduler.toggle_freeze(10.0);
        assert_eq!(scheduler.state(), SchedulerState::Running);
    }

    #[test]
    fn test_restart_zeroes_counters() {
        let mut scheduler = started(50.0, 0.0);
        for i in 0..10 {
            scheduler.tick(i as f64 * 20.0);
        }
        scheduler.restart(5000.0);
        assert_eq!(scheduler.frame(), 0);
        assert_eq!(scheduler.time(), 0.0);
        assert_eq!(scheduler.tick(5000.0).unwrap().frame, 1);
    }

    #[test]
    fn test_observed_fps_window() {
        let mut scheduler = started(50.0, 0.0);
        for i in 0..=50 {
            scheduler.tick(i as f64 * 20.0);
        }
        // 51 frames over exactly one second
        assert!((scheduler.observed_fps() - 51.0).abs() < 0.01);
    }

    #[test]
    fn test_frozen_frames_not_counted_in_fps() {
        let mut scheduler = started(50.0, 0.0);
        scheduler.tick(0.0);
        scheduler.set_frozen(true, 0.0);
        for i in 1..=50 {
            scheduler.tick(i as f64 * 20.0);
        }
        // only the first frame ran within the window
        assert!((scheduler.observed_fps() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_set_target_fps() {
        let mut scheduler = started(50.0, 0.0);
        scheduler.tick(0.0);
        scheduler.set_target_fps(10.0);
        assert!(scheduler.tick(50.0).is_none());
        assert!(scheduler.tick(100.0).is_some());
    }
}
