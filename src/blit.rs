use image::{Rgba, RgbaImage};
use ratatui::style::Color;

/// Upper half block: foreground paints the top half, background the bottom
pub const HALF_BLOCK: char = '\u{2580}';

/// One terminal cell showing two vertically stacked surface samples
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfBlockCell {
    pub x: u16,
    pub y: u16,
    pub top: Color,
    pub bottom: Color,
}

fn to_color(pixel: &Rgba<u8>) -> Color {
    let [r, g, b, a] = pixel.0;
    if a == 0 {
        Color::Rgb(0, 0, 0)
    } else {
        Color::Rgb(r, g, b)
    }
}

/// Sample a surface (row 0 at the bottom) into half-block cells.
/// Terminal row 0 shows the top of the surface.
pub fn render_to_half_blocks(
    surface: &RgbaImage,
    canvas_width: u16,
    canvas_height: u16,
) -> Vec<HalfBlockCell> {
    let (surface_width, surface_height) = surface.dimensions();
    if surface_width == 0 || surface_height == 0 || canvas_width == 0 || canvas_height == 0 {
        return Vec::new();
    }

    // Half-block effective resolution
    let block_width = canvas_width as usize;
    let block_height = canvas_height as usize * 2;

    let scale_x = surface_width as f32 / block_width as f32;
    let scale_y = surface_height as f32 / block_height as f32;

    let sample = |bx: usize, by: usize| {
        let sx = ((bx as f32 * scale_x) as u32).min(surface_width - 1);
        let from_top = ((by as f32 * scale_y) as u32).min(surface_height - 1);
        to_color(surface.get_pixel(sx, surface_height - 1 - from_top))
    };

    let mut cells = Vec::with_capacity(canvas_width as usize * canvas_height as usize);
    for cy in 0..canvas_height {
        for cx in 0..canvas_width {
            let by = cy as usize * 2;
            cells.push(HalfBlockCell {
                x: cx,
                y: cy,
                top: sample(cx as usize, by),
                bottom: sample(cx as usize, by + 1),
            });
        }
    }
    cells
}

/// Surface size in pixels for a canvas of terminal cells.
/// Each cell covers `density` columns and `2 * density` rows.
pub fn calculate_surface_size(canvas_width: u16, canvas_height: u16, density: u32) -> (u32, u32) {
    let density = density.max(1);
    (
        canvas_width as u32 * density,
        canvas_height as u32 * 2 * density,
    )
}

/// Map a cell inside the canvas to the surface coordinate of its centre
/// (bottom-left origin).
pub fn cell_to_surface(cx: u16, cy: u16, density: u32, surface_height: u32) -> (f32, f32) {
    let density = density.max(1) as f32;
    let x = (cx as f32 + 0.5) * density;
    let from_top = (cy as f32 + 0.5) * 2.0 * density;
    (x, surface_height as f32 - from_top)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_block_char() {
        assert_eq!(HALF_BLOCK, '▀');
    }

    #[test]
    fn test_surface_size() {
        assert_eq!(calculate_surface_size(80, 24, 2), (160, 96));
        assert_eq!(calculate_surface_size(10, 5, 0), (10, 10));
        assert_eq!(calculate_surface_size(0, 5, 2), (0, 20));
    }

    #[test]
    fn test_top_row_shows_top_of_surface() {
        // 2x4 surface on a 2x2 canvas, one pixel per half
        let surface = RgbaImage::from_fn(2, 4, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let cells = render_to_half_blocks(&surface, 2, 2);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].top, Color::Rgb(0, 3, 0));
        assert_eq!(cells[0].bottom, Color::Rgb(0, 2, 0));
        assert_eq!(cells[3].x, 1);
        assert_eq!(cells[3].y, 1);
        assert_eq!(cells[3].bottom, Color::Rgb(1, 0, 0));
    }

    #[test]
    fn test_transparent_is_black() {
        let surface = RgbaImage::from_pixel(2, 2, Rgba([200, 10, 10, 0]));
        let cells = render_to_half_blocks(&surface, 1, 1);
        assert_eq!(cells[0].top, Color::Rgb(0, 0, 0));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(render_to_half_blocks(&RgbaImage::new(0, 0), 4, 4).is_empty());
        assert!(render_to_half_blocks(&RgbaImage::new(4, 4), 0, 4).is_empty());
    }

    #[test]
    fn test_cell_to_surface_flips_rows() {
        // canvas 10x5 at density 2 -> surface 20x20
        let (x, y) = cell_to_surface(0, 0, 2, 20);
        assert_eq!((x, y), (1.0, 18.0));
        let (_, bottom) = cell_to_surface(0, 4, 2, 20);
        assert_eq!(bottom, 2.0);
    }
}
