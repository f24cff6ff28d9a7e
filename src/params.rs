use crate::rng::{weighted_choice, SeededRng};
use serde::{Deserialize, Serialize};

/// Accounts for pixel density in movement and ribbons
pub const BASE_CHUNK_SIZE: f32 = 160.0;
pub const BLOCK_TIME_MULT: f32 = 0.05;
pub const STRUCTURAL_TIME_MULT: f32 = 0.01;
pub const MOVE_SPEED: f32 = 0.0033;
pub const RESET_EDGE_THRESHOLD: f32 = 0.33;
pub const RIBBON_DIRT_THRESHOLD: f32 = 0.9;
pub const USE_RIBBON_THRESHOLD: f32 = 0.25;
pub const BLANK_STATIC_THRESHOLD: f32 = 0.33;
pub const BLANK_STATIC_TIME_MULT: f32 = 2.0;
pub const EXTRA_FALL_SHAPE_TIME_MULT: f32 = 0.025;
pub const EXTRA_STUTTER_THRESHOLD: f32 = 0.1;
pub const EXTRA_FALL_STUTTER_SCALE: [f32; 2] = [50.0, 500.01];
pub const EXTRA_MOVE_STUTTER_SCALE: [f32; 2] = [500.0, 50.01];
pub const CYCLE_COLOR_HUE_BASE_SPEED: f32 = 0.0025;

/// Threshold at which the shape normalizer is neutral
const SHAPE_NORMALIZER_REFERENCE: f32 = 0.2;

/// Probability of the alternate "blob" preset for move and fall shapes
const BLOB_PROBABILITY: f64 = 0.2;

/// Magnitude multiplier applied to the secondary shape scales
const EXTRA_SHAPE_MULTIPLIER: f32 = 3.0;

const GRID_MODE_WEIGHTS: &[(bool, f64)] = &[(true, 1.0), (false, 4.0)];
const GRID_SCALE_WEIGHTS_GRID: &[(u32, f64)] =
    &[(4, 1.0), (8, 2.0), (16, 3.0), (32, 2.0), (64, 1.0)];
const GRID_SCALE_WEIGHTS_FREE: &[(u32, f64)] =
    &[(8, 1.0), (16, 2.0), (32, 3.0), (64, 4.0), (128, 3.0), (256, 2.0)];
const PRIMARY_THRESHOLD_WEIGHTS: &[(f32, f64)] =
    &[(0.0, 1.0), (0.15, 2.0), (0.2, 5.0), (0.25, 2.0), (0.4, 1.0)];
const EXTRA_THRESHOLD_WEIGHTS: &[(f32, f64)] =
    &[(0.0, 1.0), (0.05, 2.0), (0.1, 5.0), (0.2, 2.0), (0.3, 1.0)];
const NOISE_THRESHOLD_WEIGHTS: &[(f32, f64)] = &[(0.4, 1.0), (0.5, 4.0), (0.6, 1.0)];
const WATERFALL_MULT_WEIGHTS: &[(f32, f64)] = &[(0.0, 1.0), (2.0, 4.0)];
const BLACK_NOISE_EDGE_WEIGHTS: &[(f32, f64)] = &[(0.0, 1.0), (0.025, 4.0)];
const BLACK_NOISE_BASE_OPTIONS: [f32; 3] = [2.0, 4.0, 8.0];

/// Base shape presets: (base scale, adjustment factor)
const FALL_SHAPE: ([f32; 2], f32) = ([10.0, 0.5], 1.0);
const FALL_BLOB_SHAPE: ([f32; 2], f32) = ([10.0, 8.0], 3.0);
const MOVE_SHAPE: ([f32; 2], f32) = ([0.5, 5.0], 1.0);
const MOVE_BLOB_SHAPE: ([f32; 2], f32) = ([5.0, 5.0], 2.0);

/// Full set of derived controls for one seed.
///
/// Replaced wholesale whenever it changes; nothing mutates a live vector
/// field by field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    // === Grid ===
    pub grid_mode: bool,
    /// Cells per axis
    pub grid_scale: u32,

    // === Move ===
    pub should_move_threshold: f32,
    pub use_move_blob: bool,
    pub move_shape_speed: f32,
    pub move_shape_scale: [f32; 2],

    // === Fall ===
    pub should_fall_threshold: f32,
    pub use_fall_blob: bool,
    pub fall_shape_speed: f32,
    pub should_fall_scale: [f32; 2],
    /// 0 disables waterfalls, 2 enables them
    pub fall_waterfall_mult: f32,

    // === Black noise ===
    pub black_noise_threshold: f32,
    pub black_noise_scale: [f32; 2],
    pub black_noise_edge_mult: f32,

    // === Reset ===
    pub reset_threshold: f32,
    pub reset_noise_scale: [f32; 2],

    // === Ribbons / static ===
    pub dirt_noise_scale: [f32; 2],
    pub blank_static_scale: [f32; 2],
    pub use_grayscale: bool,
    pub blank_color: [f32; 3],
    pub static_colors: [[f32; 3]; 3],

    // === Extra effects ===
    pub extra_fall_shape_threshold: f32,
    pub extra_fall_shape_scale: [f32; 2],
    pub extra_move_shape_threshold: f32,
    pub extra_move_shape_scale: [f32; 2],
}

impl Default for ParameterVector {
    fn default() -> Self {
        let grid_scale = 256;
        Self {
            grid_mode: false,
            grid_scale,
            should_move_threshold: 0.2,
            use_move_blob: false,
            move_shape_speed: move_shape_speed(false),
            move_shape_scale: move_shape_scale(0.2, false, None),
            should_fall_threshold: 0.2,
            use_fall_blob: false,
            fall_shape_speed: fall_shape_speed(false),
            should_fall_scale: fall_shape_scale(0.2, false, None),
            fall_waterfall_mult: 2.0,
            black_noise_threshold: 0.5,
            black_noise_scale: per_cell([8.0, 8.0], grid_scale),
            black_noise_edge_mult: 0.02,
            reset_threshold: 0.5,
            reset_noise_scale: per_cell([8.0, 8.0], grid_scale),
            dirt_noise_scale: [2500.1, 2490.9],
            blank_static_scale: [100.0, 0.01],
            use_grayscale: false,
            blank_color: [0.0, 0.0, 0.0],
            static_colors: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            extra_fall_shape_threshold: 0.2,
            extra_fall_shape_scale: [30.0, 1.0],
            extra_move_shape_threshold: 0.2,
            extra_move_shape_scale: [1.0, 10.0],
        }
    }
}

impl ParameterVector {
    /// Copy with grid mode switched; everything else is kept as derived
    pub fn with_grid_mode(&self, grid_mode: bool) -> Self {
        Self { grid_mode, ..*self }
    }

    /// Copy with the waterfall multiplier switched on (2) or off (0)
    pub fn with_waterfall(&self, enabled: bool) -> Self {
        Self {
            fall_waterfall_mult: if enabled { 2.0 } else { 0.0 },
            ..*self
        }
    }

    pub fn waterfall_enabled(&self) -> bool {
        self.fall_waterfall_mult > 0.0
    }

    /// Copy with autonomous motion disabled for manual mode.
    ///
    /// Move, fall and both extra thresholds drop to zero; the reset threshold
    /// stays so painted resets keep working.
    pub fn with_manual_suppression(&self) -> Self {
        Self {
            should_move_threshold: 0.0,
            should_fall_threshold: 0.0,
            extra_move_shape_threshold: 0.0,
            extra_fall_shape_threshold: 0.0,
            ..*self
        }
    }

    /// Grid divisor applied to shape scales, if grid mode is on
    pub fn grid_divisor(&self) -> Option<u32> {
        self.grid_mode.then_some(self.grid_scale)
    }
}

/// Hue cycling speed normalized to the target frame rate
pub fn cycle_color_hue_speed(target_fps: f32) -> f32 {
    CYCLE_COLOR_HUE_BASE_SPEED * (60.0 / target_fps.max(1.0))
}

fn per_cell(base: [f32; 2], grid_scale: u32) -> [f32; 2] {
    base.map(|v| v / grid_scale as f32)
}

/// Normalize a base shape scale so perceived shape size stays stable as the
/// threshold (which also acts as a frequency control) varies.
///
/// `effective = (grid ? base / grid_scale : base) / (0.2 / threshold) / adjustment`
pub fn shape_scale(base: [f32; 2], threshold: f32, adjustment: f32, grid: Option<u32>) -> [f32; 2] {
    let normalizer = SHAPE_NORMALIZER_REFERENCE / threshold;
    base.map(|n| {
        let base = match grid {
            Some(scale) => n / scale as f32,
            None => n,
        };
        base / normalizer / adjustment
    })
}

pub fn fall_shape_scale(threshold: f32, blob: bool, grid: Option<u32>) -> [f32; 2] {
    let (base, adjustment) = if blob { FALL_BLOB_SHAPE } else { FALL_SHAPE };
    shape_scale(base, threshold, adjustment, grid)
}

pub fn move_shape_scale(threshold: f32, blob: bool, grid: Option<u32>) -> [f32; 2] {
    let (base, adjustment) = if blob { MOVE_BLOB_SHAPE } else { MOVE_SHAPE };
    shape_scale(base, threshold, adjustment, grid)
}

fn fall_shape_speed(blob: bool) -> f32 {
    if blob {
        0.052
    } else {
        0.044
    }
}

fn move_shape_speed(blob: bool) -> f32 {
    if blob {
        0.03125
    } else {
        0.025
    }
}

/// Derive the full parameter vector from a seed.
///
/// Every random decision is drawn from one mulberry32 stream in a fixed
/// order, so the result is bit-for-bit reproducible.
pub fn derive_parameters(seed: u32) -> ParameterVector {
    let mut rng = SeededRng::new(seed);
    let defaults = ParameterVector::default();

    // Grid first: everything scale-related depends on it
    let grid_mode = weighted_choice(&mut rng, GRID_MODE_WEIGHTS).unwrap_or(false);
    let scale_table = if grid_mode {
        GRID_SCALE_WEIGHTS_GRID
    } else {
        GRID_SCALE_WEIGHTS_FREE
    };
    let grid_scale = weighted_choice(&mut rng, scale_table).unwrap_or(defaults.grid_scale);
    let grid = grid_mode.then_some(grid_scale);

    // Move
    let should_move_threshold =
        weighted_choice(&mut rng, PRIMARY_THRESHOLD_WEIGHTS).unwrap_or(0.2);
    let use_move_blob = rng.unit() < BLOB_PROBABILITY;
    let move_scale = move_shape_scale(should_move_threshold, use_move_blob, grid);

    // Fall
    let should_fall_threshold =
        weighted_choice(&mut rng, PRIMARY_THRESHOLD_WEIGHTS).unwrap_or(0.2);
    let fall_waterfall_mult = weighted_choice(&mut rng, WATERFALL_MULT_WEIGHTS).unwrap_or(2.0);
    let use_fall_blob = rng.unit() < BLOB_PROBABILITY;
    let should_fall_scale = fall_shape_scale(should_fall_threshold, use_fall_blob, grid);

    // Black noise
    let black_noise_threshold = weighted_choice(&mut rng, NOISE_THRESHOLD_WEIGHTS).unwrap_or(0.5);
    let noise_base = [
        rng.pick(&BLACK_NOISE_BASE_OPTIONS).unwrap_or(8.0),
        rng.pick(&BLACK_NOISE_BASE_OPTIONS).unwrap_or(8.0),
    ];
    let black_noise_scale = per_cell(noise_base, grid_scale);
    let black_noise_edge_mult =
        weighted_choice(&mut rng, BLACK_NOISE_EDGE_WEIGHTS).unwrap_or(0.025);

    // Reset shares the black noise base shape
    let reset_threshold = weighted_choice(&mut rng, NOISE_THRESHOLD_WEIGHTS).unwrap_or(0.5);
    let reset_noise_scale = per_cell(noise_base, grid_scale);

    // Ribbon dirt and blank static
    let dirt_noise_scale = [
        rng.range(2400.0, 2600.0) as f32,
        rng.range(2400.0, 2600.0) as f32,
    ];
    let blank_static_scale = [rng.range(90.0, 110.0) as f32, 0.01];

    // Extra effects reuse the primary shape presets at triple magnitude
    let extra_fall_shape_threshold =
        weighted_choice(&mut rng, EXTRA_THRESHOLD_WEIGHTS).unwrap_or(0.2);
    let extra_fall_shape_scale = fall_shape_scale(extra_fall_shape_threshold, use_fall_blob, grid)
        .map(|v| v * EXTRA_SHAPE_MULTIPLIER);

    let extra_move_shape_threshold =
        weighted_choice(&mut rng, EXTRA_THRESHOLD_WEIGHTS).unwrap_or(0.2);
    let extra_move_shape_scale = move_shape_scale(extra_move_shape_threshold, use_move_blob, grid)
        .map(|v| v * EXTRA_SHAPE_MULTIPLIER);

    ParameterVector {
        grid_mode,
        grid_scale,
        should_move_threshold,
        use_move_blob,
        move_shape_speed: move_shape_speed(use_move_blob),
        move_shape_scale: move_scale,
        should_fall_threshold,
        use_fall_blob,
        fall_shape_speed: fall_shape_speed(use_fall_blob),
        should_fall_scale,
        fall_waterfall_mult,
        black_noise_threshold,
        black_noise_scale,
        black_noise_edge_mult,
        reset_threshold,
        reset_noise_scale,
        dirt_noise_scale,
        blank_static_scale,
        extra_fall_shape_threshold,
        extra_fall_shape_scale,
        extra_move_shape_threshold,
        extra_move_shape_scale,
        ..defaults
    }
}
