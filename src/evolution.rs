use crate::paint::{Drift, Flow, Hold, PaintCell};
use crate::params::{
    ParameterVector, BASE_CHUNK_SIZE, BLANK_STATIC_THRESHOLD, BLANK_STATIC_TIME_MULT,
    BLOCK_TIME_MULT, EXTRA_FALL_SHAPE_TIME_MULT, EXTRA_FALL_STUTTER_SCALE,
    EXTRA_MOVE_STUTTER_SCALE, EXTRA_STUTTER_THRESHOLD, MOVE_SPEED, RESET_EDGE_THRESHOLD,
    RIBBON_DIRT_THRESHOLD, STRUCTURAL_TIME_MULT, USE_RIBBON_THRESHOLD,
};
use crate::brush::ResetVariant;
use crate::rng::mulberry32;
use image::{Rgba, RgbaImage};

/// Everything the evolution function sees for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniforms {
    /// Seconds since the scheduler origin, frozen while paused
    pub time: f32,
    pub frame: u64,
    /// Observed frames per second
    pub fps: f32,
    pub target_fps: f32,
    pub resolution: (u32, u32),
    pub pixel_density: u32,
    pub seed: u32,
    /// Parameters as passed to the evolution, manual suppression applied
    pub params: ParameterVector,
    pub cycle_color_hue_speed: f32,
    pub grid_mode: bool,
    pub global_freeze: bool,
    pub force_reset: bool,
    pub manual_mode: bool,
}

/// Per-frame transform from (previous world, paint, uniforms) to the next world.
///
/// `paint` is `None` when the paint buffer is unallocated or its size differs
/// from the world.
pub trait Evolution {
    fn evolve(
        &mut self,
        uniforms: &Uniforms,
        previous: &RgbaImage,
        paint: Option<&RgbaImage>,
        next: &mut RgbaImage,
    );
}

/// Small CPU reference evolution.
///
/// Paint effects gather from a neighbour instead of scattering, so each output
/// pixel is computed independently from the previous surface.
#[derive(Debug, Default, Clone)]
pub struct CpuEvolution;

impl CpuEvolution {
    pub fn new() -> Self {
        Self
    }
}

impl Evolution for CpuEvolution {
    fn evolve(
        &mut self,
        uniforms: &Uniforms,
        previous: &RgbaImage,
        paint: Option<&RgbaImage>,
        next: &mut RgbaImage,
    ) {
        let (width, height) = next.dimensions();
        if previous.dimensions() != (width, height) {
            log::debug!("evolution skipped: previous surface size mismatch");
            return;
        }
        let paint = paint.filter(|p| p.dimensions() == (width, height));
        let frame = Frame::new(uniforms, width, height);

        for (x, y, out) in next.enumerate_pixels_mut() {
            let cell = paint
                .map(|p| PaintCell::decode(*p.get_pixel(x, y)))
                .unwrap_or_default();
            *out = frame.pixel(x, y, cell, previous);
        }
    }
}

/// Per-frame constants shared by every pixel
struct Frame<'a> {
    u: &'a Uniforms,
    width: u32,
    height: u32,
    /// Sampling offset in pixels: one grid cell in grid mode, else one pixel
    step: (i64, i64),
    grid: f32,
}

impl<'a> Frame<'a> {
    fn new(u: &'a Uniforms, width: u32, height: u32) -> Self {
        let grid = u.params.grid_scale.max(1) as f32;
        let step = if u.grid_mode {
            (
                ((width as f32 / grid).round() as i64).max(1),
                ((height as f32 / grid).round() as i64).max(1),
            )
        } else {
            (1, 1)
        };
        Self {
            u,
            width,
            height,
            step,
            grid,
        }
    }

    /// Normalized coordinates, snapped to cell centres in grid mode
    fn uv(&self, x: u32, y: u32) -> [f32; 2] {
        let mut uv = [
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        ];
        if self.u.grid_mode {
            uv = uv.map(|c| ((c * self.grid).floor() + 0.5) / self.grid);
        }
        uv
    }

    fn hash(&self, x: u32, y: u32, salt: u32) -> f32 {
        hash01(x as i64, y as i64, self.u.frame as i64 ^ salt as i64, self.u.seed)
    }

    fn sample(&self, previous: &RgbaImage, x: u32, y: u32, dx: i64, dy: i64) -> Rgba<u8> {
        let sx = (x as i64 + dx * self.step.0).rem_euclid(self.width as i64) as u32;
        let sy = (y as i64 + dy * self.step.1).rem_euclid(self.height as i64) as u32;
        *previous.get_pixel(sx, sy)
    }

    fn pixel(&self, x: u32, y: u32, cell: PaintCell, previous: &RgbaImage) -> Rgba<u8> {
        let u = self.u;
        let prev = *previous.get_pixel(x, y);
        if u.force_reset || prev.0[3] == 0 {
            return self.initial(x, y);
        }

        match cell.hold {
            Some(Hold::Freeze) => return prev,
            Some(Hold::Reset(variant)) => return self.reset_variant(variant, x, y),
            None => {}
        }
        if u.global_freeze {
            return prev;
        }

        if let Some(offset) = self.painted_offset(x, y, cell) {
            return self.sample(previous, x, y, offset.0, offset.1);
        }

        let uv = self.uv(x, y);
        if let Some(color) = self.structural(uv, x, y) {
            return color;
        }
        match self.autonomous_offset(uv) {
            Some((dx, dy)) => self.sample(previous, x, y, dx, dy),
            None => prev,
        }
    }

    /// Gather offset for painted move/shuffle/waterfall/trickle.
    /// Row 0 is the bottom, so "down" content comes from the row above.
    fn painted_offset(&self, x: u32, y: u32, cell: PaintCell) -> Option<(i64, i64)> {
        let flow = cell.flow.and_then(|flow| match flow {
            Flow::WaterfallDown => Some((0, 1)),
            Flow::WaterfallUp => Some((0, -1)),
            Flow::Trickle => (self.hash(x, y, 0x7121) < 0.5).then_some((0, 1)),
        });
        flow.or_else(|| {
            cell.drift.map(|drift| match drift {
                Drift::MoveRight => (-1, 0),
                Drift::MoveLeft => (1, 0),
                Drift::Shuffle => {
                    const NEIGHBOURS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
                    let pick = (self.hash(x, y, 0x5f1e) * 4.0) as usize;
                    NEIGHBOURS[pick.min(3)]
                }
            })
        })
    }

    /// Black-noise edges and slow autonomous resets
    fn structural(&self, uv: [f32; 2], x: u32, y: u32) -> Option<Rgba<u8>> {
        let p = &self.u.params;
        let time = self.u.time;
        let blocks = uv.map(|c| c * self.grid);

        let black = value_noise(
            [blocks[0] * p.black_noise_scale[0], blocks[1] * p.black_noise_scale[1]],
            time * BLOCK_TIME_MULT,
            self.u.seed ^ 0xB1AC,
        );
        if (black - p.black_noise_threshold).abs() < p.black_noise_edge_mult {
            return Some(rgba(p.blank_color));
        }

        let reset = value_noise(
            [blocks[0] * p.reset_noise_scale[0], blocks[1] * p.reset_noise_scale[1]],
            time * STRUCTURAL_TIME_MULT,
            self.u.seed ^ 0x5E7,
        );
        if reset > 1.0 - p.reset_threshold * RESET_EDGE_THRESHOLD {
            return Some(self.initial(x, y));
        }
        None
    }

    /// Noise-driven fall and move, plus the stuttering extra effects
    fn autonomous_offset(&self, uv: [f32; 2]) -> Option<(i64, i64)> {
        let p = &self.u.params;
        let time = self.u.time;
        let seed = self.u.seed;

        let fall = value_noise(
            scale(uv, p.should_fall_scale),
            time * p.fall_shape_speed,
            seed ^ 0xFA11,
        );
        if fall < p.should_fall_threshold {
            let distance = if p.fall_waterfall_mult > 0.0 && fall < p.should_fall_threshold * 0.5 {
                p.fall_waterfall_mult as i64
            } else {
                1
            };
            return Some((0, distance));
        }

        let movement = value_noise(
            scale(uv, p.move_shape_scale),
            time * p.move_shape_speed,
            seed ^ 0x3073,
        );
        if movement < p.should_move_threshold {
            let heading = value_noise(uv, time * MOVE_SPEED, seed ^ 0xD1);
            return Some((if heading < 0.5 { -1 } else { 1 }, 0));
        }

        let stutter_fall = value_noise(scale(uv, EXTRA_FALL_STUTTER_SCALE), time, seed ^ 0x57);
        let extra_fall = value_noise(
            scale(uv, p.extra_fall_shape_scale),
            time * EXTRA_FALL_SHAPE_TIME_MULT,
            seed ^ 0xEF,
        );
        if extra_fall < p.extra_fall_shape_threshold && stutter_fall > EXTRA_STUTTER_THRESHOLD {
            return Some((0, 1));
        }

        let stutter_move = value_noise(scale(uv, EXTRA_MOVE_STUTTER_SCALE), time, seed ^ 0x58);
        let extra_move = value_noise(
            scale(uv, p.extra_move_shape_scale),
            time * EXTRA_FALL_SHAPE_TIME_MULT,
            seed ^ 0xE3,
        );
        if extra_move < p.extra_move_shape_threshold && stutter_move > EXTRA_STUTTER_THRESHOLD {
            return Some((1, 0));
        }
        None
    }

    fn reset_variant(&self, variant: ResetVariant, x: u32, y: u32) -> Rgba<u8> {
        let p = &self.u.params;
        match variant {
            ResetVariant::Reset => self.initial(x, y),
            ResetVariant::Empty => rgba(p.blank_color),
            ResetVariant::Static => self.static_color(x, y),
            ResetVariant::Gem => {
                let uv = self.uv(x, y);
                let hue = self.u.frame as f32 * self.u.cycle_color_hue_speed + (uv[0] + uv[1]) * 0.5;
                rgba(hsv(hue, 0.8, 1.0))
            }
        }
    }

    fn static_color(&self, x: u32, y: u32) -> Rgba<u8> {
        let p = &self.u.params;
        let flicker = value_noise(
            scale(self.uv(x, y), p.blank_static_scale),
            self.u.time * BLANK_STATIC_TIME_MULT,
            self.u.seed ^ 0x57A7,
        );
        if flicker < BLANK_STATIC_THRESHOLD {
            return rgba(p.blank_color);
        }
        let pick = (self.hash(x, y, 0x5C01) * 3.0) as usize;
        rgba(p.static_colors[pick.min(2)])
    }

    /// Seeded starting pattern: hue ribbons speckled with static dirt
    fn initial(&self, x: u32, y: u32) -> Rgba<u8> {
        let p = &self.u.params;
        let seed = self.u.seed;
        let uv = self.uv(x, y);

        let dirt = value_noise(
            [
                uv[0] * p.dirt_noise_scale[0] / BASE_CHUNK_SIZE * self.width as f32 / 8.0,
                uv[1] * p.dirt_noise_scale[1] / BASE_CHUNK_SIZE * self.height as f32 / 8.0,
            ],
            0.0,
            seed ^ 0xD127,
        );
        if dirt > RIBBON_DIRT_THRESHOLD {
            let pick = (hash01(x as i64, y as i64, 0, seed) * 3.0) as usize;
            return rgba(p.static_colors[pick.min(2)]);
        }

        let ribbon = value_noise([uv[0] * 1.5, uv[1] * 4.0], 0.0, seed ^ 0x81B);
        let offset = hash01(0, 0, 0, seed);
        let hue = ribbon + offset;
        let value = if ribbon < USE_RIBBON_THRESHOLD { 0.55 } else { 0.95 };
        let color = hsv(hue, 0.75, value);
        if p.use_grayscale {
            let luma = color[0] * 0.299 + color[1] * 0.587 + color[2] * 0.114;
            return rgba([luma, luma, luma]);
        }
        rgba(color)
    }
}

fn scale(uv: [f32; 2], by: [f32; 2]) -> [f32; 2] {
    [uv[0] * by[0], uv[1] * by[1]]
}

fn rgba(color: [f32; 3]) -> Rgba<u8> {
    let [r, g, b] = color.map(crate::paint::quantize);
    Rgba([r, g, b, 255])
}

/// Lattice hash in `[0, 1)`
fn hash01(x: i64, y: i64, z: i64, seed: u32) -> f32 {
    let key = (x as u32).wrapping_mul(0x8DA6_B343)
        ^ (y as u32).wrapping_mul(0xD816_3841)
        ^ (z as u32).wrapping_mul(0xCB1A_B31F)
        ^ seed;
    (mulberry32(key).0 as f64 / 4_294_967_296.0) as f32
}

/// Smoothed 2D value noise in `[0, 1]`, drifting diagonally with `t`
fn value_noise(p: [f32; 2], t: f32, seed: u32) -> f32 {
    let x = p[0] + t * 1.7;
    let y = p[1] + t * 0.9;
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (ix, iy) = (x0 as i64, y0 as i64);

    let smooth = |f: f32| f * f * (3.0 - 2.0 * f);
    let (sx, sy) = (smooth(fx), smooth(fy));

    let a = hash01(ix, iy, 0, seed);
    let b = hash01(ix + 1, iy, 0, seed);
    let c = hash01(ix, iy + 1, 0, seed);
    let d = hash01(ix + 1, iy + 1, 0, seed);

    let top = a + (b - a) * sx;
    let bottom = c + (d - c) * sx;
    top + (bottom - top) * sy
}

fn hsv(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let h = hue.rem_euclid(1.0) * 6.0;
    let sector = h.floor() as u32 % 6;
    let f = h - h.floor();
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));
    match sector {
        0 => [value, t, p],
        1 => [q, value, p],
        2 => [p, value, t],
        3 => [p, q, value],
        4 => [t, p, value],
        _ => [value, p, q],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::{Direction, Mode, StrokeStyle};
    use crate::paint::{quantize, PaintBuffer};
    use crate::brush::brush_footprint;

    /// Parameters with every autonomous effect disabled
    fn still_params() -> ParameterVector {
        ParameterVector {
            reset_threshold: 0.0,
            black_noise_edge_mult: 0.0,
            ..ParameterVector::default().with_manual_suppression()
        }
    }

    fn uniforms(w: u32, h: u32) -> Uniforms {
        Uniforms {
            time: 1.0,
            frame: 10,
            fps: 60.0,
            target_fps: 60.0,
            resolution: (w, h),
            pixel_density: 1,
            seed: 42,
            params: still_params(),
            cycle_color_hue_speed: 0.0025,
            grid_mode: false,
            global_freeze: false,
            force_reset: false,
            manual_mode: true,
        }
    }

    /// Surface with a distinct opaque color per pixel
    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8 * 10, y as u8 * 10, 7, 255]))
    }

    fn painted(w: u32, h: u32, mode: Mode, direction: Direction, variant: ResetVariant) -> PaintBuffer {
        let mut paint = PaintBuffer::new();
        paint.allocate(w, h);
        let fp = brush_footprint((w as f32 / 2.0, h as f32 / 2.0), false, 8, (w, h), 100.0);
        paint.stroke(&fp, &StrokeStyle::new(mode, direction, variant));
        paint
    }

    #[test]
    fn test_uninitialized_pixels_get_opaque_pattern() {
        let u = uniforms(12, 8);
        let previous = RgbaImage::new(12, 8);
        let mut next = RgbaImage::new(12, 8);
        CpuEvolution::new().evolve(&u, &previous, None, &mut next);
        assert!(next.pixels().all(|p| p.0[3] == 255));

        let mut again = RgbaImage::new(12, 8);
        CpuEvolution::new().evolve(&u, &previous, None, &mut again);
        assert_eq!(next, again);
    }

    #[test]
    fn test_still_params_keep_previous() {
        let u = uniforms(10, 6);
        let previous = gradient(10, 6);
        let mut next = RgbaImage::new(10, 6);
        CpuEvolution::new().evolve(&u, &previous, None, &mut next);
        assert_eq!(next, previous);
    }

    #[test]
    fn test_force_reset_replaces_everything() {
        let mut u = uniforms(10, 6);
        let blank = RgbaImage::new(10, 6);
        let mut expected = RgbaImage::new(10, 6);
        CpuEvolution::new().evolve(&u, &blank, None, &mut expected);

        u.force_reset = true;
        let previous = gradient(10, 6);
        let mut next = RgbaImage::new(10, 6);
        CpuEvolution::new().evolve(&u, &previous, None, &mut next);
        assert_eq!(next, expected);
    }

    #[test]
    fn test_painted_waterfall_down_pulls_from_above() {
        let u = uniforms(6, 6);
        let previous = gradient(6, 6);
        let paint = painted(6, 6, Mode::Waterfall, Direction::Down, ResetVariant::Reset);
        let mut next = RgbaImage::new(6, 6);
        CpuEvolution::new().evolve(&u, &previous, paint.current(), &mut next);
        assert_eq!(next.get_pixel(2, 2), previous.get_pixel(2, 3));
        // wraps at the top edge
        assert_eq!(next.get_pixel(2, 5), previous.get_pixel(2, 0));
    }

    #[test]
    fn test_painted_move_right_pulls_from_left() {
        let u = uniforms(6, 6);
        let previous = gradient(6, 6);
        let paint = painted(6, 6, Mode::Move, Direction::Right, ResetVariant::Reset);
        let mut next = RgbaImage::new(6, 6);
        CpuEvolution::new().evolve(&u, &previous, paint.current(), &mut next);
        assert_eq!(next.get_pixel(3, 1), previous.get_pixel(2, 1));
    }

    #[test]
    fn test_painted_freeze_survives_force_free_frames() {
        let mut u = uniforms(6, 6);
        u.params = ParameterVector::default();
        let previous = gradient(6, 6);
        let paint = painted(6, 6, Mode::Freeze, Direction::Down, ResetVariant::Reset);
        let mut next = RgbaImage::new(6, 6);
        CpuEvolution::new().evolve(&u, &previous, paint.current(), &mut next);
        assert_eq!(next, previous);
    }

    #[test]
    fn test_global_freeze_keeps_previous() {
        let mut u = uniforms(6, 6);
        u.params = ParameterVector::default();
        u.global_freeze = true;
        let previous = gradient(6, 6);
        let mut next = RgbaImage::new(6, 6);
        CpuEvolution::new().evolve(&u, &previous, None, &mut next);
        assert_eq!(next, previous);
    }

    #[test]
    fn test_painted_empty_uses_blank_color() {
        let mut u = uniforms(6, 6);
        u.params.blank_color = [0.0, 1.0, 0.0];
        let previous = gradient(6, 6);
        let paint = painted(6, 6, Mode::Reset, Direction::Down, ResetVariant::Empty);
        let mut next = RgbaImage::new(6, 6);
        CpuEvolution::new().evolve(&u, &previous, paint.current(), &mut next);
        assert!(next.pixels().all(|p| p.0 == [0, quantize(1.0), 0, 255]));
    }

    #[test]
    fn test_mismatched_paint_is_ignored() {
        let u = uniforms(6, 6);
        let previous = gradient(6, 6);
        let paint = painted(3, 3, Mode::Freeze, Direction::Down, ResetVariant::Reset);
        let mut next = RgbaImage::new(6, 6);
        CpuEvolution::new().evolve(&u, &previous, paint.current(), &mut next);
        assert_eq!(next, previous);
    }

    #[test]
    fn test_value_noise_range_and_determinism() {
        for i in 0..500 {
            let p = [i as f32 * 0.37, i as f32 * 0.11];
            let v = value_noise(p, 0.5, 9);
            assert!((0.0..=1.0).contains(&v));
            assert_eq!(v, value_noise(p, 0.5, 9));
        }
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv(0.0, 1.0, 1.0), [1.0, 0.0, 0.0]);
        assert_eq!(hsv(1.0 / 3.0, 1.0, 1.0).map(|c| c.round()), [0.0, 1.0, 0.0]);
        assert_eq!(hsv(2.0 / 3.0, 1.0, 1.0).map(|c| c.round()), [0.0, 0.0, 1.0]);
    }
}
