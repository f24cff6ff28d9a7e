use crate::evolution::{Evolution, Uniforms};
use crate::params::{cycle_color_hue_speed, ParameterVector};
use crate::pingpong::PingPong;
use image::RgbaImage;

/// Number of steps that see the forced reset flag after a reset request
pub const FORCED_RESET_STEPS: u8 = 2;

/// Per-frame values supplied by the caller; the buffer adds resolution,
/// manual suppression and the forced reset flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub time: f32,
    pub frame: u64,
    pub fps: f32,
    pub target_fps: f32,
    pub pixel_density: u32,
    pub seed: u32,
    pub params: ParameterVector,
    pub global_freeze: bool,
    pub manual_mode: bool,
}

/// World simulation double buffer.
///
/// Each step the evolution reads the current surface and writes the other,
/// then the two swap so the fresh surface is current.
#[derive(Debug, Default)]
pub struct SimulationBuffer {
    surfaces: Option<PingPong<RgbaImage>>,
    forced_reset_remaining: u8,
}

impl SimulationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both surfaces with uninitialized (transparent) ones.
    /// A zero-sized canvas leaves the buffer unallocated.
    pub fn allocate(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("world buffer left unallocated for {}x{}", width, height);
            self.surfaces = None;
            return;
        }
        log::info!("world allocated at {}x{}", width, height);
        self.surfaces = Some(PingPong::filled(RgbaImage::new(width, height)));
    }

    pub fn is_allocated(&self) -> bool {
        self.surfaces.is_some()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.current().map(|s| s.dimensions())
    }

    /// Most recently written surface, the one on screen
    pub fn current(&self) -> Option<&RgbaImage> {
        self.surfaces.as_ref().map(|s| s.current())
    }

    /// The surface written one step before the presented one (the read side
    /// of the next step), used as the capture fallback
    pub fn retained(&self) -> Option<&RgbaImage> {
        self.surfaces.as_ref().map(|s| s.previous())
    }

    /// Force the next steps to rebuild the initial pattern everywhere
    pub fn request_reset(&mut self) {
        self.forced_reset_remaining = FORCED_RESET_STEPS;
    }

    pub fn reset_pending(&self) -> bool {
        self.forced_reset_remaining > 0
    }

    /// Uniforms for the next step without consuming the reset countdown
    pub fn uniforms(&self, inputs: &FrameInputs) -> Uniforms {
        let params = if inputs.manual_mode {
            inputs.params.with_manual_suppression()
        } else {
            inputs.params
        };
        Uniforms {
            time: inputs.time,
            frame: inputs.frame,
            fps: inputs.fps,
            target_fps: inputs.target_fps,
            resolution: self.size().unwrap_or((0, 0)),
            pixel_density: inputs.pixel_density,
            seed: inputs.seed,
            params,
            cycle_color_hue_speed: cycle_color_hue_speed(inputs.target_fps),
            grid_mode: inputs.params.grid_mode,
            global_freeze: inputs.global_freeze,
            force_reset: self.reset_pending(),
            manual_mode: inputs.manual_mode,
        }
    }

    /// Run one evolution step. Returns false (and does nothing) when the
    /// buffer isn't allocated.
    pub fn step(
        &mut self,
        inputs: &FrameInputs,
        paint: Option<&RgbaImage>,
        evolution: &mut dyn Evolution,
    ) -> bool {
        if !self.is_allocated() {
            log::debug!("step skipped: world buffer not allocated");
            return false;
        }
        let uniforms = self.uniforms(inputs);
        self.forced_reset_remaining = self.forced_reset_remaining.saturating_sub(1);

        let Some(surfaces) = self.surfaces.as_mut() else {
            return false;
        };
        let (previous, next) = surfaces.split();
        evolution.evolve(&uniforms, previous, paint, next);
        surfaces.swap();
        true
    }
}
