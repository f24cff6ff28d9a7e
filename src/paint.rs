use crate::brush::{channel, Footprint, ResetVariant, StrokeStyle};
use crate::pingpong::PingPong;
use image::{Rgba, RgbaImage};

/// Fully transparent, no effect in any channel
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Float channel value to its stored byte
pub fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Persistent user paint overlay.
///
/// Holds two equally sized RGBA surfaces; strokes read the current one and
/// write the other, then swap. Row 0 is the bottom of the canvas.
#[derive(Debug, Default)]
pub struct PaintBuffer {
    surfaces: Option<PingPong<RgbaImage>>,
}

impl PaintBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recreate both surfaces at the given size, cleared.
    /// A zero-sized canvas leaves the buffer unallocated.
    pub fn allocate(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("paint buffer left unallocated for {}x{}", width, height);
            self.surfaces = None;
            return;
        }
        self.surfaces = Some(PingPong::filled(RgbaImage::from_pixel(
            width,
            height,
            TRANSPARENT,
        )));
    }

    pub fn is_allocated(&self) -> bool {
        self.surfaces.is_some()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.current().map(|s| s.dimensions())
    }

    pub fn current(&self) -> Option<&RgbaImage> {
        self.surfaces.as_ref().map(|s| s.current())
    }

    /// Set both surfaces to transparent black
    pub fn clear(&mut self) {
        if let Some(surfaces) = self.surfaces.as_mut() {
            surfaces.for_each_mut(|surface| {
                for pixel in surface.pixels_mut() {
                    *pixel = TRANSPARENT;
                }
            });
        }
    }

    /// Composite one stamp. Returns false if the buffer isn't allocated.
    pub fn stroke(&mut self, footprint: &Footprint, style: &StrokeStyle) -> bool {
        let Some(surfaces) = self.surfaces.as_mut() else {
            log::debug!("stroke skipped: paint buffer not allocated");
            return false;
        };

        let (read, write) = surfaces.split();
        write.copy_from_slice(read.as_raw());
        stamp(write, footprint, style);
        surfaces.swap();
        true
    }

    /// Stamp along a segment so fast drags leave no gaps.
    ///
    /// Stamps are spaced half a brush radius apart, with at least one step.
    /// The whole line is one pass-through copy and one swap. Returns the
    /// number of stamps applied.
    pub fn stroke_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        radius: f32,
        style: &StrokeStyle,
        footprint_at: impl Fn((f32, f32)) -> Footprint,
    ) -> usize {
        let Some(surfaces) = self.surfaces.as_mut() else {
            log::debug!("line skipped: paint buffer not allocated");
            return 0;
        };

        let (read, write) = surfaces.split();
        write.copy_from_slice(read.as_raw());
        let points = line_stamps(from, to, radius);
        for point in &points {
            stamp(write, &footprint_at(*point), style);
        }
        surfaces.swap();
        points.len()
    }
}

/// Write one footprint into `surface` in place
fn stamp(surface: &mut RgbaImage, footprint: &Footprint, style: &StrokeStyle) {
    let (width, height) = surface.dimensions();
    let Some((x0, y0, x1, y1)) = footprint.pixel_bounds(width, height) else {
        return;
    };
    let color = style.color.map(quantize);
    for y in y0..=y1 {
        for x in x0..=x1 {
            if !footprint.contains(x as f32 + 0.5, y as f32 + 0.5) {
                continue;
            }
            let pixel = surface.get_pixel_mut(x, y);
            if style.erase {
                *pixel = TRANSPARENT;
                continue;
            }
            for c in 0..3 {
                if style.write[c] {
                    pixel.0[c] = color[c];
                }
            }
            if style.clear_b {
                pixel.0[2] = 0;
            }
            pixel.0[3] = 255;
        }
    }
}

/// Evenly spaced stamp positions from `from` to `to`, both ends included
pub fn line_stamps(from: (f32, f32), to: (f32, f32), radius: f32) -> Vec<(f32, f32)> {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let distance = (dx * dx + dy * dy).sqrt();
    let spacing = radius * 0.5;
    let steps = if spacing > 0.0 {
        ((distance / spacing).floor() as usize).max(1)
    } else {
        1
    };
    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            (from.0 + dx * t, from.1 + dy * t)
        })
        .collect()
}

/// R channel effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    Shuffle,
    MoveRight,
    MoveLeft,
}

/// G channel effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Trickle,
    WaterfallDown,
    WaterfallUp,
}

/// B channel effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    Freeze,
    Reset(ResetVariant),
}

/// One paint pixel decoded into its per-channel effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintCell {
    pub drift: Option<Drift>,
    pub flow: Option<Flow>,
    pub hold: Option<Hold>,
}

impl PaintCell {
    pub fn decode(pixel: Rgba<u8>) -> Self {
        let [r, g, b, _] = pixel.0.map(|c| c as f32 / 255.0);
        Self {
            drift: band(r).map(|band| match band {
                0 => Drift::Shuffle,
                1 => Drift::MoveRight,
                _ => Drift::MoveLeft,
            }),
            flow: band(g).map(|band| match band {
                0 => Flow::Trickle,
                1 => Flow::WaterfallDown,
                _ => Flow::WaterfallUp,
            }),
            hold: decode_hold(b),
        }
    }
}

/// Which of the three R/G sub-ranges a value falls in
fn band(value: f32) -> Option<u8> {
    if value < channel::OFF_BELOW {
        None
    } else if value < channel::SECOND_BAND {
        Some(0)
    } else if value < channel::THIRD_BAND {
        Some(1)
    } else {
        Some(2)
    }
}

fn decode_hold(value: f32) -> Option<Hold> {
    if value < channel::OFF_BELOW {
        return None;
    }
    if value < channel::SECOND_BAND {
        return Some(Hold::Freeze);
    }
    let [reset, empty, stat, gem] = channel::RESET_BANDS;
    let variant = if value < reset {
        ResetVariant::Reset
    } else if value < empty {
        ResetVariant::Empty
    } else if value < stat {
        ResetVariant::Static
    } else if value < gem {
        ResetVariant::Gem
    } else {
        return None;
    };
    Some(Hold::Reset(variant))
}
