use serde::{Deserialize, Serialize};

/// Paint channel encoding.
///
/// Each channel is split into sub-ranges; anything below `OFF_BELOW` means
/// "no effect". R carries move/shuffle, G waterfall/trickle, B freeze and the
/// reset variants.
pub mod channel {
    pub const OFF_BELOW: f32 = 0.25;

    pub const SHUFFLE: f32 = 0.375;
    pub const MOVE_RIGHT: f32 = 0.625;
    pub const MOVE_LEFT: f32 = 0.875;

    pub const TRICKLE: f32 = 0.375;
    pub const WATERFALL_DOWN: f32 = 0.625;
    pub const WATERFALL_UP: f32 = 0.875;

    pub const FREEZE: f32 = 0.375;
    pub const RESET: f32 = 0.53125;
    pub const EMPTY: f32 = 0.59375;
    pub const STATIC: f32 = 0.65625;
    pub const GEM: f32 = 0.71875;

    /// Upper edges of the R/G sub-ranges: [0.25, 0.5), [0.5, 0.75), [0.75, 1]
    pub const SECOND_BAND: f32 = 0.5;
    pub const THIRD_BAND: f32 = 0.75;

    /// Reset variant boundaries inside B: [0.5, 0.5625) reset, then empty,
    /// static and gem up to 0.75
    pub const RESET_BANDS: [f32; 4] = [0.5625, 0.625, 0.6875, 0.75];
}

/// Brush mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Off,
    Shuffle,
    Move,
    Erase,
    Freeze,
    Trickle,
    #[default]
    Waterfall,
    /// Shown as "paint"; the variant picks what gets painted
    Reset,
}

impl Mode {
    pub fn name(&self) -> &str {
        match self {
            Mode::Off => "off",
            Mode::Shuffle => "shuffle",
            Mode::Move => "move",
            Mode::Erase => "erase",
            Mode::Freeze => "freeze",
            Mode::Trickle => "trickle",
            Mode::Waterfall => "waterfall",
            Mode::Reset => "paint",
        }
    }

    pub fn uses_direction(&self) -> bool {
        matches!(self, Mode::Move | Mode::Waterfall)
    }

    /// Modes that overwrite R or G also wipe any freeze/reset in B
    pub fn clears_b(&self) -> bool {
        matches!(
            self,
            Mode::Move | Mode::Shuffle | Mode::Waterfall | Mode::Trickle
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    #[default]
    Down,
}

impl Direction {
    pub fn name(&self) -> &str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetVariant {
    #[default]
    Reset,
    Empty,
    Static,
    Gem,
}

impl ResetVariant {
    pub fn name(&self) -> &str {
        match self {
            ResetVariant::Reset => "reset",
            ResetVariant::Empty => "empty",
            ResetVariant::Static => "static",
            ResetVariant::Gem => "gem",
        }
    }

    /// Order used by the cycle key: reset, static, gem, empty
    pub fn next(&self) -> Self {
        match self {
            ResetVariant::Reset => ResetVariant::Static,
            ResetVariant::Static => ResetVariant::Gem,
            ResetVariant::Gem => ResetVariant::Empty,
            ResetVariant::Empty => ResetVariant::Reset,
        }
    }

    fn encoded(&self) -> f32 {
        match self {
            ResetVariant::Reset => channel::RESET,
            ResetVariant::Empty => channel::EMPTY,
            ResetVariant::Static => channel::STATIC,
            ResetVariant::Gem => channel::GEM,
        }
    }
}

/// Encode a mode into paint channel values.
///
/// Direction only matters for move and waterfall, the variant only for reset.
/// Move treats anything but left as right; waterfall anything but down as up.
pub fn mode_color(mode: Mode, direction: Direction, variant: ResetVariant) -> [f32; 3] {
    let mut rgb = [0.0; 3];
    match mode {
        Mode::Off | Mode::Erase => {}
        Mode::Shuffle => rgb[0] = channel::SHUFFLE,
        Mode::Move => {
            rgb[0] = if direction == Direction::Left {
                channel::MOVE_LEFT
            } else {
                channel::MOVE_RIGHT
            }
        }
        Mode::Trickle => rgb[1] = channel::TRICKLE,
        Mode::Waterfall => {
            rgb[1] = if direction == Direction::Down {
                channel::WATERFALL_DOWN
            } else {
                channel::WATERFALL_UP
            }
        }
        Mode::Freeze => rgb[2] = channel::FREEZE,
        Mode::Reset => rgb[2] = variant.encoded(),
    }
    rgb
}

/// Everything a stroke needs to know about what it writes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: [f32; 3],
    pub write: [bool; 3],
    pub clear_b: bool,
    pub erase: bool,
}

impl StrokeStyle {
    pub fn new(mode: Mode, direction: Direction, variant: ResetVariant) -> Self {
        let color = mode_color(mode, direction, variant);
        Self {
            color,
            write: color.map(|c| c > 0.0),
            clear_b: mode.clears_b(),
            erase: mode == Mode::Erase,
        }
    }
}

/// Current brush selection as the user sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interaction {
    pub mode: Mode,
    pub direction: Direction,
    pub variant: ResetVariant,
}

impl Interaction {
    pub fn new(mode: Mode, direction: Direction) -> Self {
        Self {
            mode,
            direction,
            variant: ResetVariant::default(),
        }
    }

    pub fn select(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn select_directional(&mut self, mode: Mode, direction: Direction) {
        self.mode = mode;
        self.direction = direction;
    }

    pub fn select_paint(&mut self, variant: ResetVariant) {
        self.mode = Mode::Reset;
        self.variant = variant;
    }

    /// Enter paint mode at "reset", or advance the variant if already painting
    pub fn cycle_paint_variant(&mut self) {
        if self.mode == Mode::Reset {
            self.variant = self.variant.next();
        } else {
            self.select_paint(ResetVariant::Reset);
        }
    }

    pub fn style(&self) -> StrokeStyle {
        StrokeStyle::new(self.mode, self.direction, self.variant)
    }

    /// e.g. "waterfall down", "paint gem", "erase"
    pub fn label(&self) -> String {
        let mut text = self.mode.name().to_string();
        if self.mode.uses_direction() {
            text.push(' ');
            text.push_str(self.direction.name());
        }
        if self.mode == Mode::Reset {
            text.push(' ');
            text.push_str(self.variant.name());
        }
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushShape {
    Circle,
    /// Axis-aligned, normalized per axis
    Rectangle,
}

/// Where and how big one stamp lands on the paint surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub center: (f32, f32),
    pub radius: (f32, f32),
    pub shape: BrushShape,
}

impl Footprint {
    /// Inclusive containment test for a point in surface coordinates
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let dx = x - self.center.0;
        let dy = y - self.center.1;
        match self.shape {
            BrushShape::Circle => (dx * dx + dy * dy).sqrt() <= self.radius.0,
            BrushShape::Rectangle => {
                let nx = dx.abs() / self.radius.0;
                let ny = dy.abs() / self.radius.1;
                nx.max(ny) <= 1.0
            }
        }
    }

    /// Inclusive pixel bounds touched by this footprint, clipped to the surface.
    /// Returns `None` when nothing lands on it.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        let reach_x = self.radius.0.max(0.0);
        let reach_y = match self.shape {
            BrushShape::Circle => reach_x,
            BrushShape::Rectangle => self.radius.1.max(0.0),
        };
        // pixel i has its centre at i + 0.5
        let x0 = (self.center.0 - reach_x - 0.5).ceil();
        let x1 = (self.center.0 + reach_x - 0.5).floor();
        let y0 = (self.center.1 - reach_y - 0.5).ceil();
        let y1 = (self.center.1 + reach_y - 0.5).floor();
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) {
            return None;
        }
        if x1 < 0.0 || y1 < 0.0 || x0 > (width - 1) as f32 || y0 > (height - 1) as f32 || x0 > x1 || y0 > y1
        {
            return None;
        }
        let clamp = |v: f32, max: u32| v.max(0.0).min(max as f32) as u32;
        Some((
            clamp(x0, width - 1),
            clamp(y0, height - 1),
            clamp(x1, width - 1),
            clamp(y1, height - 1),
        ))
    }
}

/// Cell size in surface pixels for a grid of `grid_scale` cells per axis
pub fn cell_size(grid_scale: u32, canvas: (u32, u32)) -> (f32, f32) {
    let scale = grid_scale.max(1) as f32;
    (canvas.0 as f32 / scale, canvas.1 as f32 / scale)
}

/// Compute the stamp for a pointer position.
///
/// Grid mode snaps to the centre of the containing cell and stretches the
/// vertical radius by the cell aspect ratio.
pub fn brush_footprint(
    pointer: (f32, f32),
    grid_mode: bool,
    grid_scale: u32,
    canvas: (u32, u32),
    radius: f32,
) -> Footprint {
    if !grid_mode {
        return Footprint {
            center: pointer,
            radius: (radius, radius),
            shape: BrushShape::Circle,
        };
    }

    let (cell_w, cell_h) = cell_size(grid_scale, canvas);
    let snap = |c: f32, cell: f32| {
        if cell > 0.0 {
            (c / cell).floor() * cell + cell / 2.0
        } else {
            c
        }
    };
    let radius_y = if cell_w > 0.0 {
        radius * cell_h / cell_w
    } else {
        radius
    };
    Footprint {
        center: (snap(pointer.0, cell_w), snap(pointer.1, cell_h)),
        radius: (radius, radius_y),
        shape: BrushShape::Rectangle,
    }
}

/// Option count above which grid sizes switch from linear to spread steps
const LINEAR_BLOCK_LIMIT: u32 = 15;
const SPREAD_STEPS: u32 = 10;
const CONTINUOUS_DEFAULT_INDEX: usize = 6;

/// Valid brush radii for the canvas, plus the default index.
///
/// The list is never empty and strictly increasing.
pub fn brush_size_options(grid_mode: bool, grid_scale: u32, canvas: (u32, u32)) -> (Vec<f32>, usize) {
    if grid_mode {
        let (cell_w, _) = cell_size(grid_scale, canvas);
        let radius_for = |cells: u32| cells as f32 * cell_w / 2.0;
        let max_blocks = (grid_scale / 2).max(1);

        let mut blocks: Vec<u32> = if max_blocks <= LINEAR_BLOCK_LIMIT {
            (1..=max_blocks).collect()
        } else {
            let step = ((max_blocks - 5) / SPREAD_STEPS).max(1);
            (1..=5)
                .chain((1..=SPREAD_STEPS).map(|i| 5 + i * step))
                .filter(|b| *b <= max_blocks)
                .collect()
        };
        if blocks.last().is_some_and(|last| *last < max_blocks) {
            blocks.push(max_blocks);
        }

        let mut options: Vec<f32> = blocks.into_iter().map(radius_for).collect();
        options.dedup();
        if options.is_empty() {
            options.push(1.0);
        }
        (options, 0)
    } else {
        let min_dim = canvas.0.min(canvas.1) as f32;
        let max_size = min_dim / 4.0;
        let step = max_size / SPREAD_STEPS as f32;

        let mut options: Vec<f32> = [32.0, 16.0, 8.0, 4.0, 2.0]
            .iter()
            .map(|div| step / div)
            .chain((1..=SPREAD_STEPS).map(|i| i as f32 * step))
            .map(|r| r.max(1.0))
            .collect();
        options.dedup();
        let index = CONTINUOUS_DEFAULT_INDEX.min(options.len() - 1);
        (options, index)
    }
}

/// Brush radius options and the current selection
#[derive(Debug, Clone, PartialEq)]
pub struct BrushState {
    options: Vec<f32>,
    index: usize,
}

impl BrushState {
    pub fn new(grid_mode: bool, grid_scale: u32, canvas: (u32, u32)) -> Self {
        let (options, index) = brush_size_options(grid_mode, grid_scale, canvas);
        Self { options, index }
    }

    /// Rebuild the option list and jump to its default index
    pub fn regenerate(&mut self, grid_mode: bool, grid_scale: u32, canvas: (u32, u32)) {
        *self = Self::new(grid_mode, grid_scale, canvas);
    }

    pub fn radius(&self) -> f32 {
        self.options.get(self.index).copied().unwrap_or(1.0)
    }

    pub fn options(&self) -> &[f32] {
        &self.options
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn increase(&mut self) {
        self.index = (self.index + 1).min(self.options.len().saturating_sub(1));
    }

    pub fn decrease(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Human readable size: block count in grid mode, pixels otherwise
    pub fn label(&self, grid_mode: bool, grid_scale: u32, canvas: (u32, u32)) -> String {
        let radius = self.radius();
        if grid_mode {
            let (cell_w, _) = cell_size(grid_scale, canvas);
            let blocks = if cell_w > 0.0 {
                ((radius * 2.0) / cell_w).round().max(1.0) as u32
            } else {
                1
            };
            format!("{} block{}", blocks, if blocks == 1 { "" } else { "s" })
        } else {
            format!("{} px", radius.round() as u32)
        }
    }
}
