use crate::blit;
use crate::brush::{brush_footprint, BrushState, Direction, Interaction, Mode, ResetVariant};
use crate::capture::{self, RecordLimits, RecordStatus, Recorder, StopReason};
use crate::config::AppConfig;
use crate::evolution::{CpuEvolution, Evolution};
use crate::paint::PaintBuffer;
use crate::params::{derive_parameters, ParameterVector};
use crate::scheduler::{FrameScheduler, FrameTick, MAX_TARGET_FPS, MIN_TARGET_FPS};
use crate::world::{FrameInputs, SimulationBuffer};
use rand::Rng;

/// Range for randomly picked seeds
pub const RANDOM_SEED_RANGE: std::ops::Range<u32> = 0..1000;
const TARGET_FPS_STEP: f32 = 5.0;

/// Everything the user can trigger, from a key or the action menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    WaterfallUp,
    WaterfallDown,
    MoveLeft,
    MoveRight,
    Erase,
    Freeze,
    Shuffle,
    Trickle,
    Paint(ResetVariant),
    CyclePaintVariant,
    TogglePause,
    NewSeed,
    Screenshot,
    ToggleRecording,
    BrushBigger,
    BrushSmaller,
    ToggleManual,
    ClearPaint,
    GlobalReset,
    ToggleGrid,
    ToggleWaterfall,
    ToggleHelp,
}

impl Action {
    /// Entries of the action menu, in display order
    pub const MENU: [Action; 21] = [
        Action::WaterfallDown,
        Action::WaterfallUp,
        Action::MoveLeft,
        Action::MoveRight,
        Action::Shuffle,
        Action::Trickle,
        Action::Freeze,
        Action::Erase,
        Action::Paint(ResetVariant::Reset),
        Action::Paint(ResetVariant::Empty),
        Action::Paint(ResetVariant::Static),
        Action::Paint(ResetVariant::Gem),
        Action::TogglePause,
        Action::ToggleManual,
        Action::ToggleGrid,
        Action::ToggleWaterfall,
        Action::ClearPaint,
        Action::GlobalReset,
        Action::NewSeed,
        Action::Screenshot,
        Action::ToggleRecording,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Action::WaterfallUp => "Waterfall up",
            Action::WaterfallDown => "Waterfall down",
            Action::MoveLeft => "Move left",
            Action::MoveRight => "Move right",
            Action::Erase => "Erase",
            Action::Freeze => "Freeze brush",
            Action::Shuffle => "Shuffle",
            Action::Trickle => "Trickle",
            Action::Paint(ResetVariant::Reset) => "Paint reset",
            Action::Paint(ResetVariant::Empty) => "Paint empty",
            Action::Paint(ResetVariant::Static) => "Paint static",
            Action::Paint(ResetVariant::Gem) => "Paint gem",
            Action::CyclePaintVariant => "Cycle paint variant",
            Action::TogglePause => "Pause / resume",
            Action::NewSeed => "New seed",
            Action::Screenshot => "Screenshot",
            Action::ToggleRecording => "Start / stop recording",
            Action::BrushBigger => "Bigger brush",
            Action::BrushSmaller => "Smaller brush",
            Action::ToggleManual => "Manual mode",
            Action::ClearPaint => "Clear paint",
            Action::GlobalReset => "Reset everything",
            Action::ToggleGrid => "Grid mode",
            Action::ToggleWaterfall => "Waterfalls",
            Action::ToggleHelp => "Help",
        }
    }

    pub fn key_hint(&self) -> &'static str {
        match self {
            Action::WaterfallUp => "↑",
            Action::WaterfallDown => "↓",
            Action::MoveLeft => "←",
            Action::MoveRight => "→",
            Action::Erase => "E",
            Action::Freeze => "F",
            Action::Shuffle => "S",
            Action::Trickle => "T",
            Action::Paint(ResetVariant::Reset) => "1",
            Action::Paint(ResetVariant::Empty) => "2",
            Action::Paint(ResetVariant::Static) => "3",
            Action::Paint(ResetVariant::Gem) => "4",
            Action::CyclePaintVariant => "D",
            Action::TogglePause => "Space",
            Action::NewSeed => "N",
            Action::Screenshot => "P",
            Action::ToggleRecording => "R",
            Action::BrushBigger => "]",
            Action::BrushSmaller => "[",
            Action::ToggleManual => "X",
            Action::ClearPaint => "C",
            Action::GlobalReset => "Z",
            Action::ToggleGrid => "B",
            Action::ToggleWaterfall => "W",
            Action::ToggleHelp => "H/?",
        }
    }
}

/// Popup menu state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionMenu {
    pub selected_idx: usize,
}

impl ActionMenu {
    pub fn selected(&self) -> Action {
        Action::MENU[self.selected_idx.min(Action::MENU.len() - 1)]
    }

    pub fn nav_up(&mut self) {
        if self.selected_idx > 0 {
            self.selected_idx -= 1;
        } else {
            self.selected_idx = Action::MENU.len() - 1;
        }
    }

    pub fn nav_down(&mut self) {
        if self.selected_idx < Action::MENU.len() - 1 {
            self.selected_idx += 1;
        } else {
            self.selected_idx = 0;
        }
    }
}

/// Main application state.
///
/// Write contract: the parameter vector is replaced only by reseed and the
/// grid/waterfall toggles; both texture pairs are reallocated only by
/// `resize` and reseed; the world is stepped only by `frame`; the paint
/// buffer is stroked only by pointer handlers and cleared only by the clear
/// and reset actions.
pub struct App {
    pub config: AppConfig,
    pub seed: u32,
    pub params: ParameterVector,
    pub world: SimulationBuffer,
    pub paint: PaintBuffer,
    pub evolution: Box<dyn Evolution>,
    pub scheduler: FrameScheduler,
    pub interaction: Interaction,
    pub brush: BrushState,
    pub manual_mode: bool,
    pub surface_size: (u32, u32),
    pub recorder: Option<Recorder>,
    pub menu: Option<ActionMenu>,
    pub show_help: bool,
    pub help_scroll: u16,
    pub controls_scroll: u16,
    pub fullscreen_mode: bool,
    /// Last user-facing message (captures, errors)
    pub status: Option<String>,
    pub should_quit: bool,
    last_pointer: Option<(f32, f32)>,
}

impl App {
    pub fn new(config: AppConfig, seed: u32, canvas: (u16, u16), now_ms: f64) -> Self {
        Self::with_evolution(config, seed, canvas, now_ms, Box::new(CpuEvolution::new()))
    }

    pub fn with_evolution(
        config: AppConfig,
        seed: u32,
        canvas: (u16, u16),
        now_ms: f64,
        evolution: Box<dyn Evolution>,
    ) -> Self {
        let params = derive_parameters(seed);
        let surface_size = blit::calculate_surface_size(canvas.0, canvas.1, config.pixel_density);
        let mut app = Self {
            seed,
            params,
            world: SimulationBuffer::new(),
            paint: PaintBuffer::new(),
            evolution,
            scheduler: FrameScheduler::new(config.target_fps, config.fps_window_ms),
            interaction: Interaction::new(config.start_mode, config.start_direction),
            brush: BrushState::new(params.grid_mode, params.grid_scale, surface_size),
            manual_mode: config.manual_mode,
            surface_size,
            recorder: None,
            menu: None,
            show_help: false,
            help_scroll: 0,
            controls_scroll: 0,
            fullscreen_mode: false,
            status: None,
            should_quit: false,
            last_pointer: None,
            config,
        };
        log::info!("seed {} ({})", seed, grid_label(&params));
        app.reallocate(now_ms);
        app
    }

    fn reallocate(&mut self, now_ms: f64) {
        let (width, height) = self.surface_size;
        self.world.allocate(width, height);
        self.paint.allocate(width, height);
        self.regenerate_brush();
        self.scheduler.restart(now_ms);
        self.last_pointer = None;
    }

    fn regenerate_brush(&mut self) {
        self.brush
            .regenerate(self.params.grid_mode, self.params.grid_scale, self.surface_size);
    }

    /// Step the target frame rate; the new interval applies from the next tick
    pub fn adjust_target_fps(&mut self, faster: bool) {
        let delta = if faster { TARGET_FPS_STEP } else { -TARGET_FPS_STEP };
        let fps = (self.scheduler.target_fps() + delta).clamp(MIN_TARGET_FPS, MAX_TARGET_FPS);
        self.scheduler.set_target_fps(fps);
        self.config.target_fps = fps;
        log::info!("target fps {}", fps);
    }

    pub fn global_freeze(&self) -> bool {
        self.scheduler.is_frozen()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Canvas resized (in terminal cells); clears world and paint
    pub fn resize(&mut self, canvas: (u16, u16), now_ms: f64) {
        self.surface_size =
            blit::calculate_surface_size(canvas.0, canvas.1, self.config.pixel_density);
        log::info!(
            "canvas {}x{} cells -> surface {}x{}",
            canvas.0,
            canvas.1,
            self.surface_size.0,
            self.surface_size.1
        );
        if self.recorder.is_some() {
            self.stop_recording();
        }
        self.reallocate(now_ms);
    }

    /// Replace the parameter vector from a new seed and start over
    pub fn reseed(&mut self, seed: u32, now_ms: f64) {
        self.seed = seed;
        self.params = derive_parameters(seed);
        log::info!("seed {} ({})", seed, grid_label(&self.params));
        self.reallocate(now_ms);
    }

    pub fn set_grid_mode(&mut self, grid_mode: bool) {
        self.params = self.params.with_grid_mode(grid_mode);
        self.regenerate_brush();
        log::info!("grid mode {}", if grid_mode { "on" } else { "off" });
    }

    fn set_waterfall(&mut self, enabled: bool) {
        self.params = self.params.with_waterfall(enabled);
        log::info!("waterfalls {}", if enabled { "on" } else { "off" });
    }

    /// Mode text for the status line, e.g. "paint gem [PAUSED]"
    pub fn mode_label(&self) -> String {
        let mut text = self.interaction.label();
        if self.global_freeze() {
            text.push_str(" [PAUSED]");
        }
        if self.manual_mode {
            text.push_str(" [MANUAL]");
        }
        text
    }

    pub fn brush_label(&self) -> String {
        self.brush
            .label(self.params.grid_mode, self.params.grid_scale, self.surface_size)
    }

    pub fn perform(&mut self, action: Action, now_ms: f64) {
        match action {
            Action::WaterfallUp => self.interaction.select_directional(Mode::Waterfall, Direction::Up),
            Action::WaterfallDown => {
                self.interaction.select_directional(Mode::Waterfall, Direction::Down)
            }
            Action::MoveLeft => self.interaction.select_directional(Mode::Move, Direction::Left),
            Action::MoveRight => self.interaction.select_directional(Mode::Move, Direction::Right),
            Action::Erase => self.interaction.select(Mode::Erase),
            Action::Freeze => self.interaction.select(Mode::Freeze),
            Action::Shuffle => self.interaction.select(Mode::Shuffle),
            Action::Trickle => self.interaction.select(Mode::Trickle),
            Action::Paint(variant) => self.interaction.select_paint(variant),
            Action::CyclePaintVariant => self.interaction.cycle_paint_variant(),
            Action::TogglePause => {
                self.scheduler.toggle_freeze(now_ms);
                log::info!("paused: {}", self.global_freeze());
            }
            Action::NewSeed => {
                let seed = rand::thread_rng().gen_range(RANDOM_SEED_RANGE);
                self.reseed(seed, now_ms);
            }
            Action::Screenshot => self.screenshot(),
            Action::ToggleRecording => {
                if self.recorder.is_some() {
                    self.stop_recording();
                } else {
                    self.start_recording(now_ms);
                }
            }
            Action::BrushBigger => self.brush.increase(),
            Action::BrushSmaller => self.brush.decrease(),
            Action::ToggleManual => {
                self.manual_mode = !self.manual_mode;
                log::info!("manual mode: {}", self.manual_mode);
            }
            Action::ClearPaint => self.paint.clear(),
            Action::GlobalReset => {
                self.paint.clear();
                self.world.request_reset();
                log::info!("global reset");
            }
            Action::ToggleGrid => self.set_grid_mode(!self.params.grid_mode),
            Action::ToggleWaterfall => self.set_waterfall(!self.params.waterfall_enabled()),
            Action::ToggleHelp => self.toggle_help(),
        }
        if matches!(
            action,
            Action::WaterfallUp
                | Action::WaterfallDown
                | Action::MoveLeft
                | Action::MoveRight
                | Action::Erase
                | Action::Freeze
                | Action::Shuffle
                | Action::Trickle
                | Action::Paint(_)
                | Action::CyclePaintVariant
        ) {
            log::info!("mode: {}", self.interaction.label());
        }
    }

    // === Frame ===

    fn frame_inputs(&self, tick: &FrameTick) -> FrameInputs {
        FrameInputs {
            time: tick.time as f32,
            frame: tick.frame,
            fps: tick.fps,
            target_fps: self.scheduler.target_fps(),
            pixel_density: self.config.pixel_density,
            seed: self.seed,
            params: self.params,
            global_freeze: self.global_freeze(),
            manual_mode: self.manual_mode,
        }
    }

    /// Step the world if a frame is due. Returns true when a new frame was
    /// produced.
    pub fn frame(&mut self, now_ms: f64) -> bool {
        let Some(tick) = self.scheduler.tick(now_ms) else {
            return false;
        };
        let inputs = self.frame_inputs(&tick);
        if !self
            .world
            .step(&inputs, self.paint.current(), self.evolution.as_mut())
        {
            return false;
        }
        self.record_frame(now_ms);
        true
    }

    // === Capture ===

    pub fn screenshot(&mut self) {
        let dir = self.config.output_dir();
        let result = capture::save_screenshot(
            self.world.current(),
            self.world.retained(),
            &dir,
            capture::unix_millis(),
        );
        self.status = Some(match result {
            Ok(path) => format!("saved {}", path.display()),
            Err(e) => {
                log::warn!("screenshot failed: {}", e);
                format!("screenshot failed: {}", e)
            }
        });
    }

    fn start_recording(&mut self, now_ms: f64) {
        let limits = RecordLimits {
            duration_secs: self.config.record_duration_secs,
            bitrate: self.config.record_bitrate,
        };
        match Recorder::start(
            &self.config.output_dir(),
            self.config.record_format,
            self.surface_size,
            self.scheduler.target_fps(),
            limits,
            now_ms,
            capture::unix_millis(),
        ) {
            Ok(recorder) => {
                self.status = Some(format!("recording {}", recorder.format().name()));
                self.recorder = Some(recorder);
            }
            Err(e) => {
                log::warn!("recording failed to start: {}", e);
                self.status = Some(format!("recording failed: {}", e));
            }
        }
    }

    pub fn stop_recording(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            return;
        };
        self.status = Some(match recorder.finish() {
            Ok(summary) => format!(
                "saved {} {} ({} frames, {} KB)",
                summary.format.name(),
                summary.path.display(),
                summary.frames,
                summary.bytes / 1024
            ),
            Err(e) => {
                log::warn!("recording failed to finish: {}", e);
                format!("recording failed: {}", e)
            }
        });
    }

    fn record_frame(&mut self, now_ms: f64) {
        let (Some(recorder), Some(frame)) = (self.recorder.as_mut(), self.world.current()) else {
            return;
        };
        match recorder.push_frame(frame, now_ms) {
            Ok(RecordStatus::Recording) => {}
            Ok(RecordStatus::Finished(reason)) => {
                log::info!(
                    "recording auto-stopped: {}",
                    match reason {
                        StopReason::Duration => "duration limit",
                        StopReason::ByteBudget => "size limit",
                    }
                );
                self.stop_recording();
            }
            Err(e) => {
                log::warn!("recording frame failed: {}", e);
                self.status = Some(format!("recording failed: {}", e));
                self.recorder = None;
            }
        }
    }

    // === Pointer ===

    fn pointer_to_surface(&self, cell: (u16, u16)) -> (f32, f32) {
        blit::cell_to_surface(cell.0, cell.1, self.config.pixel_density, self.surface_size.1)
    }

    fn stamp_enabled(&self) -> bool {
        self.menu.is_none() && self.interaction.mode != Mode::Off
    }

    /// Pointer pressed on a canvas cell
    pub fn pointer_down(&mut self, cell: (u16, u16)) {
        if !self.stamp_enabled() {
            return;
        }
        let point = self.pointer_to_surface(cell);
        let footprint = brush_footprint(
            point,
            self.params.grid_mode,
            self.params.grid_scale,
            self.surface_size,
            self.brush.radius(),
        );
        self.paint.stroke(&footprint, &self.interaction.style());
        self.last_pointer = Some(point);
    }

    /// Pointer dragged to a canvas cell while pressed
    pub fn pointer_drag(&mut self, cell: (u16, u16)) {
        let Some(from) = self.last_pointer else {
            self.pointer_down(cell);
            return;
        };
        if !self.stamp_enabled() {
            return;
        }
        let to = self.pointer_to_surface(cell);
        let (grid_mode, grid_scale, size) =
            (self.params.grid_mode, self.params.grid_scale, self.surface_size);
        let radius = self.brush.radius();
        let style = self.interaction.style();
        self.paint.stroke_line(from, to, radius, &style, |point| {
            brush_footprint(point, grid_mode, grid_scale, size, radius)
        });
        self.last_pointer = Some(to);
    }

    pub fn pointer_up(&mut self) {
        self.last_pointer = None;
    }

    // === Menu and overlays ===

    pub fn toggle_menu(&mut self) {
        self.menu = match self.menu {
            Some(_) => None,
            None => Some(ActionMenu::default()),
        };
        self.last_pointer = None;
    }

    pub fn close_menu(&mut self) {
        self.menu = None;
    }

    pub fn menu_nav_up(&mut self) {
        if let Some(menu) = &mut self.menu {
            menu.nav_up();
        }
    }

    pub fn menu_nav_down(&mut self) {
        if let Some(menu) = &mut self.menu {
            menu.nav_down();
        }
    }

    /// Run the selected menu action and close the menu
    pub fn confirm_menu(&mut self, now_ms: f64) {
        if let Some(menu) = self.menu.take() {
            self.perform(menu.selected(), now_ms);
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0;
        }
    }

    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }

    pub fn scroll_controls_up(&mut self) {
        self.controls_scroll = self.controls_scroll.saturating_sub(1);
    }

    pub fn scroll_controls_down(&mut self, max_scroll: u16) {
        self.controls_scroll = (self.controls_scroll + 1).min(max_scroll);
    }
}

fn grid_label(params: &ParameterVector) -> String {
    if params.grid_mode {
        format!("grid {}", params.grid_scale)
    } else {
        "free".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::Uniforms;
    use crate::paint::TRANSPARENT;
    use image::RgbaImage;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Copies the previous surface and logs every uniform set it sees
    struct Probe(Rc<RefCell<Vec<Uniforms>>>);

    impl Evolution for Probe {
        fn evolve(
            &mut self,
            uniforms: &Uniforms,
            previous: &RgbaImage,
            _paint: Option<&RgbaImage>,
            next: &mut RgbaImage,
        ) {
            self.0.borrow_mut().push(*uniforms);
            next.copy_from_slice(previous.as_raw());
        }
    }

    fn instrumented(canvas: (u16, u16)) -> (App, Rc<RefCell<Vec<Uniforms>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let app = App::with_evolution(
            AppConfig::default(),
            42,
            canvas,
            0.0,
            Box::new(Probe(Rc::clone(&log))),
        );
        (app, log)
    }

    fn paint_is_clear(app: &App) -> bool {
        app.paint.current().unwrap().pixels().all(|p| *p == TRANSPARENT)
    }

    #[test]
    fn test_new_allocates_surfaces() {
        let app = App::new(AppConfig::default(), 42, (40, 12), 0.0);
        assert_eq!(app.surface_size, (80, 48));
        assert_eq!(app.world.size(), Some((80, 48)));
        assert_eq!(app.paint.size(), Some((80, 48)));
        assert_eq!(app.params, derive_parameters(42));
        assert_eq!(app.interaction.label(), "waterfall down");
    }

    #[test]
    fn test_zero_canvas_stays_unallocated() {
        let (mut app, log) = instrumented((0, 10));
        assert!(!app.world.is_allocated());
        assert!(!app.frame(0.0));
        app.pointer_down((0, 0));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_frame_respects_interval() {
        let (mut app, log) = instrumented((10, 5));
        assert!(app.frame(0.0));
        assert!(!app.frame(5.0));
        assert!(app.frame(17.0));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_global_reset_clears_paint_and_forces_two_steps() {
        let (mut app, log) = instrumented((10, 5));
        app.pointer_down((3, 2));
        assert!(!paint_is_clear(&app));

        app.perform(Action::GlobalReset, 0.0);
        assert!(paint_is_clear(&app));
        for i in 0..4 {
            app.frame(i as f64 * 20.0);
        }
        let flags: Vec<bool> = log.borrow().iter().map(|u| u.force_reset).collect();
        assert_eq!(flags, vec![true, true, false, false]);
    }

    #[test]
    fn test_manual_mode_zeroes_motion_thresholds() {
        let (mut app, log) = instrumented((10, 5));
        app.params.should_fall_threshold = 0.2;
        app.perform(Action::ToggleManual, 0.0);
        app.frame(0.0);
        let u = log.borrow()[0];
        assert!(u.manual_mode);
        assert_eq!(u.params.should_fall_threshold, 0.0);
        assert_eq!(u.params.reset_threshold, app.params.reset_threshold);
        // the stored vector is untouched
        assert_eq!(app.params.should_fall_threshold, 0.2);
    }

    #[test]
    fn test_pause_holds_time() {
        let (mut app, log) = instrumented((10, 5));
        app.frame(0.0);
        app.frame(1000.0);
        app.perform(Action::TogglePause, 1000.0);
        app.frame(6000.0);
        app.perform(Action::TogglePause, 6000.0);
        app.frame(6020.0);

        let log = log.borrow();
        assert!(log[2].global_freeze);
        assert_eq!(log[2].time, log[1].time);
        assert!((log[3].time - 1.02).abs() < 1e-4);
        assert!(app.mode_label().ends_with("down"));
    }

    #[test]
    fn test_reseed_replaces_params_and_clears() {
        let (mut app, _) = instrumented((10, 5));
        app.pointer_down((3, 2));
        app.frame(0.0);
        app.reseed(7, 100.0);
        assert_eq!(app.seed, 7);
        assert_eq!(app.params, derive_parameters(7));
        assert!(paint_is_clear(&app));
        assert_eq!(app.scheduler.frame(), 0);
    }

    #[test]
    fn test_new_seed_stays_in_random_range() {
        let (mut app, _) = instrumented((10, 5));
        for _ in 0..20 {
            app.perform(Action::NewSeed, 0.0);
            assert!(RANDOM_SEED_RANGE.contains(&app.seed));
            assert_eq!(app.params, derive_parameters(app.seed));
        }
    }

    #[test]
    fn test_resize_reallocates() {
        let (mut app, _) = instrumented((10, 5));
        app.pointer_down((3, 2));
        app.resize((20, 8), 0.0);
        assert_eq!(app.world.size(), Some((40, 32)));
        assert!(paint_is_clear(&app));
        assert!(app.brush.index() < app.brush.options().len());
    }

    #[test]
    fn test_paint_actions_and_cycle() {
        let (mut app, _) = instrumented((10, 5));
        app.perform(Action::CyclePaintVariant, 0.0);
        assert_eq!(app.interaction.label(), "paint reset");
        app.perform(Action::CyclePaintVariant, 0.0);
        assert_eq!(app.interaction.label(), "paint static");
        app.perform(Action::Paint(ResetVariant::Gem), 0.0);
        assert_eq!(app.interaction.label(), "paint gem");
        app.perform(Action::MoveLeft, 0.0);
        assert_eq!(app.interaction.label(), "move left");
    }

    #[test]
    fn test_toggles_replace_params() {
        let (mut app, _) = instrumented((10, 5));
        let before = app.params;
        app.perform(Action::ToggleGrid, 0.0);
        assert_eq!(app.params.grid_mode, !before.grid_mode);
        app.perform(Action::ToggleWaterfall, 0.0);
        assert_eq!(app.params.waterfall_enabled(), !before.waterfall_enabled());
        app.perform(Action::ToggleGrid, 0.0);
        app.perform(Action::ToggleWaterfall, 0.0);
        assert_eq!(app.params.grid_mode, before.grid_mode);
    }

    #[test]
    fn test_drag_paints_line() {
        let (mut app, _) = instrumented((20, 5));
        app.set_grid_mode(false);
        app.pointer_down((1, 2));
        app.pointer_drag((18, 2));
        app.pointer_up();
        let surface = app.paint.current().unwrap();
        // pointer row 2 maps to y = 10 on the 40x20 surface
        let row = 10;
        let painted = (4..36).filter(|x| surface.get_pixel(*x, row).0[3] == 255).count();
        assert_eq!(painted, 32);
    }

    #[test]
    fn test_menu_blocks_painting_and_runs_action() {
        let (mut app, _) = instrumented((10, 5));
        app.toggle_menu();
        app.pointer_down((3, 2));
        assert!(paint_is_clear(&app));

        app.menu_nav_up();
        assert_eq!(app.menu.as_ref().unwrap().selected(), Action::ToggleRecording);
        app.menu_nav_down();
        app.menu_nav_down();
        assert_eq!(app.menu.as_ref().unwrap().selected(), Action::WaterfallUp);
        app.confirm_menu(0.0);
        assert!(app.menu.is_none());
        assert_eq!(app.interaction.label(), "waterfall up");
    }

    #[test]
    fn test_brush_actions() {
        let (mut app, _) = instrumented((40, 12));
        app.set_grid_mode(false);
        let start = app.brush.index();
        app.perform(Action::BrushBigger, 0.0);
        assert_eq!(app.brush.index(), (start + 1).min(app.brush.options().len() - 1));
        app.perform(Action::BrushSmaller, 0.0);
        assert_eq!(app.brush.index(), start);
    }

    #[test]
    fn test_adjust_target_fps_clamps() {
        let (mut app, _) = instrumented((10, 5));
        app.adjust_target_fps(true);
        assert_eq!(app.scheduler.target_fps(), 65.0);
        for _ in 0..40 {
            app.adjust_target_fps(false);
        }
        assert_eq!(app.scheduler.target_fps(), MIN_TARGET_FPS);
        for _ in 0..40 {
            app.adjust_target_fps(true);
        }
        assert_eq!(app.config.target_fps, MAX_TARGET_FPS);
    }

    #[test]
    fn test_screenshot_and_recording() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            output_dir: Some(dir.path().to_path_buf()),
            ..AppConfig::default()
        };
        let mut app = App::new(config, 42, (8, 4), 0.0);

        app.perform(Action::Screenshot, 0.0);
        assert!(app.status.as_deref().unwrap().starts_with("screenshot failed"));

        app.frame(0.0);
        app.perform(Action::Screenshot, 0.0);
        assert!(app.status.as_deref().unwrap().starts_with("saved"));

        app.perform(Action::ToggleRecording, 0.0);
        assert!(app.is_recording());
        app.frame(20.0);
        app.frame(40.0);
        app.perform(Action::ToggleRecording, 50.0);
        assert!(!app.is_recording());

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("screenshot-") && n.ends_with(".png")));
        assert!(names.iter().any(|n| n.starts_with("recording-") && n.ends_with(".gif")));
    }

    #[test]
    fn test_recording_auto_stops() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            output_dir: Some(dir.path().to_path_buf()),
            record_duration_secs: 0.05,
            ..AppConfig::default()
        };
        let mut app = App::new(config, 42, (8, 4), 0.0);
        app.frame(0.0);
        app.perform(Action::ToggleRecording, 0.0);
        app.frame(20.0);
        assert!(app.is_recording());
        app.frame(60.0);
        assert!(!app.is_recording());
    }
}
