//! Frame-image renderer.
//!
//! Rasterizes a grid of styled cells into a raw RGB pixel buffer using the
//! embedded 8x16 font, wrapped in the same window chrome the SVG renderer
//! draws. The buffer encodes to PPM (P6), the interchange format the video
//! pipeline feeds to the muxer.

use crate::terminal::Cell;
use crate::theme::{Rgb, Theme};

use super::font::{self, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Padding around the cell grid, in pixels.
const PADDING: usize = 8;
/// Title bar height, in pixels.
const TITLE_BAR: usize = 24;
/// Traffic-light button colors.
const BUTTONS: [Rgb; 3] = [
    Rgb::new(0xff, 0x5f, 0x57),
    Rgb::new(0xfe, 0xbc, 0x2e),
    Rgb::new(0x28, 0xc8, 0x40),
];

/// A raw RGB image.
pub struct FrameImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl FrameImage {
    fn new(width: usize, height: usize, fill: Rgb) -> Self {
        let mut pixels = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            pixels.extend_from_slice(&[fill.r, fill.g, fill.b]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn set(&mut self, x: usize, y: usize, color: Rgb) {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 3;
            self.pixels[i] = color.r;
            self.pixels[i + 1] = color.g;
            self.pixels[i + 2] = color.b;
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Rgb) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                self.set(px, py, color);
            }
        }
    }

    fn fill_circle(&mut self, cx: usize, cy: usize, radius: usize, color: Rgb) {
        let r = radius as i64;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    let px = cx as i64 + dx;
                    let py = cy as i64 + dy;
                    if px >= 0 && py >= 0 {
                        self.set(px as usize, py as usize, color);
                    }
                }
            }
        }
    }

    /// Encode as binary portable pixmap: `P6\n<W> <H>\n255\n` + raw RGB.
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.pixels);
        out
    }
}

/// Pixel dimensions of a frame for a cols x rows grid.
///
/// Both are rounded up to even values; yuv420p subsampling rejects odd
/// dimensions.
pub fn frame_size(cols: usize, rows: usize) -> (usize, usize) {
    let width = cols * GLYPH_WIDTH + PADDING * 2;
    let height = rows * GLYPH_HEIGHT + TITLE_BAR + PADDING * 2;
    (width + width % 2, height + height % 2)
}

/// Render a grid into an RGB frame with window chrome.
pub fn render_frame(rows: &[Vec<Cell>], cols: usize, theme: &Theme) -> FrameImage {
    let (width, height) = frame_size(cols, rows.len());
    let mut image = FrameImage::new(width, height, theme.background);

    // Title bar buttons.
    for (i, color) in BUTTONS.iter().enumerate() {
        image.fill_circle(PADDING + 6 + i * 20, TITLE_BAR / 2, 5, *color);
    }

    let origin_y = TITLE_BAR + PADDING;
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate().take(cols) {
            let x = PADDING + col_idx * GLYPH_WIDTH;
            let y = origin_y + row_idx * GLYPH_HEIGHT;

            let bg = theme.resolve(cell.style.bg, false);
            let fg = theme.resolve(cell.style.fg, true);

            image.fill_rect(x, y, GLYPH_WIDTH, GLYPH_HEIGHT, bg);

            let bitmap = font::glyph(cell.glyph);
            for (gy, bits) in bitmap.iter().enumerate() {
                for gx in 0..GLYPH_WIDTH {
                    if bits & (0x80 >> gx) != 0 {
                        image.set(x + gx, y + gy, fg);
                    }
                }
            }

            if cell.style.underline {
                image.fill_rect(x, y + GLYPH_HEIGHT - 2, GLYPH_WIDTH, 1, fg);
            }
            if cell.style.strikethrough {
                image.fill_rect(x, y + GLYPH_HEIGHT / 2, GLYPH_WIDTH, 1, fg);
            }
        }
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::{CellStyle, Color, TerminalBuffer};

    fn grid(text: &str, cols: usize, rows: usize) -> Vec<Vec<Cell>> {
        let mut term = TerminalBuffer::new(cols, rows);
        term.process(text);
        term.rows().to_vec()
    }

    fn pixel(image: &FrameImage, x: usize, y: usize) -> (u8, u8, u8) {
        let i = (y * image.width() + x) * 3;
        let p = image.pixels();
        (p[i], p[i + 1], p[i + 2])
    }

    #[test]
    fn frame_size_is_even() {
        for cols in [1, 3, 80, 81] {
            for rows in [1, 24, 25] {
                let (w, h) = frame_size(cols, rows);
                assert_eq!(w % 2, 0);
                assert_eq!(h % 2, 0);
            }
        }
    }

    #[test]
    fn frame_accounts_for_chrome() {
        let (w, h) = frame_size(10, 2);
        assert!(w >= 10 * GLYPH_WIDTH + 2 * PADDING);
        assert!(h >= 2 * GLYPH_HEIGHT + TITLE_BAR + 2 * PADDING);
    }

    #[test]
    fn background_uses_theme_color() {
        let theme = Theme::by_name("dracula");
        let image = render_frame(&grid("", 4, 2), 4, theme);
        let (w, h) = (image.width(), image.height());
        assert_eq!(
            pixel(&image, w - 1, h - 1),
            (theme.background.r, theme.background.g, theme.background.b)
        );
    }

    #[test]
    fn glyph_pixels_use_foreground() {
        let theme = Theme::by_name("asciinema");
        // Full block: every pixel of the cell is foreground.
        let image = render_frame(&grid("\u{2588}", 2, 1), 2, theme);
        let x = PADDING + GLYPH_WIDTH / 2;
        let y = TITLE_BAR + PADDING + GLYPH_HEIGHT / 2;
        assert_eq!(
            pixel(&image, x, y),
            (theme.foreground.r, theme.foreground.g, theme.foreground.b)
        );
    }

    #[test]
    fn cell_background_fills_cell_rect() {
        let theme = Theme::by_name("asciinema");
        let image = render_frame(&grid("\x1b[41m \x1b[0m", 2, 1), 2, theme);
        let red = theme.palette[1];
        let x = PADDING + 1;
        let y = TITLE_BAR + PADDING + 1;
        assert_eq!(pixel(&image, x, y), (red.r, red.g, red.b));
    }

    #[test]
    fn unknown_glyph_leaves_cell_background() {
        let theme = Theme::by_name("asciinema");
        let image = render_frame(&grid("\u{00e9}", 2, 1), 2, theme);
        let x = PADDING + GLYPH_WIDTH / 2;
        let y = TITLE_BAR + PADDING + GLYPH_HEIGHT / 2;
        assert_eq!(
            pixel(&image, x, y),
            (theme.background.r, theme.background.g, theme.background.b)
        );
    }

    #[test]
    fn title_bar_has_button_pixels() {
        let theme = Theme::by_name("asciinema");
        let image = render_frame(&grid("", 4, 1), 4, theme);
        assert_eq!(
            pixel(&image, PADDING + 6, TITLE_BAR / 2),
            (BUTTONS[0].r, BUTTONS[0].g, BUTTONS[0].b)
        );
    }

    #[test]
    fn underline_draws_a_stroke() {
        let theme = Theme::by_name("asciinema");
        let mut style = CellStyle::default();
        style.underline = true;
        style.fg = Color::Ansi16(2);
        let rows = vec![vec![Cell::new(' ', style), Cell::default()]];
        let image = render_frame(&rows, 2, theme);
        let green = theme.palette[2];
        let y = TITLE_BAR + PADDING + GLYPH_HEIGHT - 2;
        assert_eq!(pixel(&image, PADDING + 3, y), (green.r, green.g, green.b));
    }

    #[test]
    fn ppm_header_and_length() {
        let theme = Theme::by_name("asciinema");
        let image = render_frame(&grid("hi", 4, 1), 4, theme);
        let ppm = image.to_ppm();
        let header = format!("P6\n{} {}\n255\n", image.width(), image.height());
        assert!(ppm.starts_with(header.as_bytes()));
        assert_eq!(
            ppm.len(),
            header.len() + image.width() * image.height() * 3
        );
    }
}
