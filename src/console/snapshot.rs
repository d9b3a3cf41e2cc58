//! Screen buffer snapshots and ANSI deltas.
//!
//! A [`Snapshot`] is one immutable sample of the visible console: a
//! row-major grid of styled cells plus the cursor. [`Snapshot::diff`]
//! computes the minimal ANSI patch that turns the previous visible image
//! into this one; the capture engine writes those patches as output events.

use std::time::Instant;

use crate::terminal::{Cell, CellStyle, Color};

/// Fraction of changed cells above which an incremental patch is replaced
/// by a full redraw. Untuned; a full dump is usually smaller past this
/// point and always simpler.
pub const FULL_REDRAW_RATIO: f64 = 0.5;

/// An immutable sample of the visible screen buffer.
#[derive(Debug, Clone)]
pub struct Snapshot {
    width: usize,
    height: usize,
    cursor_x: usize,
    cursor_y: usize,
    cells: Vec<Cell>,
    captured_at: Instant,
}

impl PartialEq for Snapshot {
    /// Equality ignores the capture instant.
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.cursor_x == other.cursor_x
            && self.cursor_y == other.cursor_y
            && self.cells == other.cells
    }
}

impl Snapshot {
    /// Build a snapshot from row-major cells.
    ///
    /// # Panics
    ///
    /// Panics when dimensions are zero, the cell count is not
    /// `width * height`, or the cursor is out of bounds.
    pub fn new(
        width: usize,
        height: usize,
        cursor_x: usize,
        cursor_y: usize,
        cells: Vec<Cell>,
    ) -> Self {
        assert!(width > 0 && height > 0, "dimensions must be positive");
        assert_eq!(cells.len(), width * height, "cell count must fill the grid");
        assert!(cursor_x < width && cursor_y < height, "cursor out of bounds");
        Self {
            width,
            height,
            cursor_x,
            cursor_y,
            cells,
            captured_at: Instant::now(),
        }
    }

    /// An all-blank snapshot with the cursor homed.
    pub fn blank(width: usize, height: usize) -> Self {
        Self::new(width, height, 0, 0, vec![Cell::default(); width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn cell(&self, x: usize, y: usize) -> &Cell {
        &self.cells[y * self.width + x]
    }

    pub fn same_dimensions(&self, other: &Snapshot) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Compute the ANSI patch that turns `previous` into this snapshot.
    ///
    /// Without a previous snapshot (or when dimensions changed) the patch
    /// is a full-screen dump. When more than [`FULL_REDRAW_RATIO`] of the
    /// cells changed, a full dump is emitted as well. Otherwise changed
    /// cells are written in row-major order with cursor moves and SGR
    /// transitions only where needed, ending with a cursor reposition when
    /// the cursor moved.
    ///
    /// Returns an empty string when nothing changed.
    pub fn diff(&self, previous: Option<&Snapshot>) -> String {
        let previous = match previous {
            Some(prev) if self.same_dimensions(prev) => prev,
            _ => return self.full_dump(),
        };

        let changed: Vec<(usize, usize)> = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (y, x)))
            .filter(|&(y, x)| self.cell(x, y) != previous.cell(x, y))
            .collect();

        if changed.is_empty() {
            if self.cursor() != previous.cursor() {
                return cursor_to(self.cursor_y, self.cursor_x);
            }
            return String::new();
        }

        let total = self.width * self.height;
        if changed.len() as f64 > total as f64 * FULL_REDRAW_RATIO {
            return self.full_dump();
        }

        let mut out = String::new();
        let mut last_pos: Option<(usize, usize)> = None;
        let mut last_style: Option<CellStyle> = None;

        for (y, x) in changed {
            let adjacent = matches!(last_pos, Some((py, px)) if py == y && px + 1 == x);
            if !adjacent {
                out.push_str(&cursor_to(y, x));
            }

            let cell = self.cell(x, y);
            if last_style != Some(cell.style) {
                out.push_str(&sgr_sequence(&cell.style));
                last_style = Some(cell.style);
            }
            out.push(cell.glyph);
            last_pos = Some((y, x));
        }

        if self.cursor() != previous.cursor() {
            out.push_str(&cursor_to(self.cursor_y, self.cursor_x));
        }

        out
    }

    /// Full-screen dump: home the cursor, repaint every cell, reset.
    fn full_dump(&self) -> String {
        let mut out = String::from("\x1b[H");
        let mut last_style: Option<CellStyle> = None;

        for y in 0..self.height {
            if y > 0 {
                out.push_str("\r\n");
            }
            for x in 0..self.width {
                let cell = self.cell(x, y);
                if last_style != Some(cell.style) {
                    out.push_str(&sgr_sequence(&cell.style));
                    last_style = Some(cell.style);
                }
                out.push(cell.glyph);
            }
        }

        out.push_str("\x1b[0m");
        out
    }
}

/// CSI cursor position for 0-based coordinates.
fn cursor_to(row: usize, col: usize) -> String {
    format!("\x1b[{};{}H", row + 1, col + 1)
}

/// The SGR sequence that establishes `style` from any prior state.
///
/// Always starts from a reset so the emitted patch does not depend on the
/// receiving terminal's current attributes.
pub fn sgr_sequence(style: &CellStyle) -> String {
    let mut params = String::from("0");

    if style.bold {
        params.push_str(";1");
    }
    if style.italic {
        params.push_str(";3");
    }
    if style.underline {
        params.push_str(";4");
    }
    if style.strikethrough {
        params.push_str(";9");
    }

    match style.fg {
        Color::Default => {}
        Color::Ansi16(n) if n < 8 => params.push_str(&format!(";{}", 30 + n)),
        Color::Ansi16(n) => params.push_str(&format!(";{}", 90 + (n - 8))),
        Color::Palette256(n) => params.push_str(&format!(";38;5;{}", n)),
        Color::Rgb { r, g, b } => params.push_str(&format!(";38;2;{};{};{}", r, g, b)),
    }
    match style.bg {
        Color::Default => {}
        Color::Ansi16(n) if n < 8 => params.push_str(&format!(";{}", 40 + n)),
        Color::Ansi16(n) => params.push_str(&format!(";{}", 100 + (n - 8))),
        Color::Palette256(n) => params.push_str(&format!(";48;5;{}", n)),
        Color::Rgb { r, g, b } => params.push_str(&format!(";48;2;{};{};{}", r, g, b)),
    }

    format!("\x1b[{}m", params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::TerminalBuffer;

    fn snapshot_of(width: usize, height: usize, text: &str) -> Snapshot {
        let mut cells = vec![Cell::default(); width * height];
        for (i, ch) in text.chars().enumerate().take(width * height) {
            cells[i].glyph = ch;
        }
        let cursor_x = text.chars().count().min(width - 1);
        Snapshot::new(width, height, cursor_x, 0, cells)
    }

    /// Replay a patch into an emulator seeded with `base` and return the
    /// resulting glyph grid.
    fn apply(base: Option<&Snapshot>, patch: &str, width: usize, height: usize) -> Vec<String> {
        let mut term = TerminalBuffer::new(width, height);
        if let Some(base) = base {
            term.process(&base.full_dump());
        }
        term.process(patch);
        term.rows()
            .iter()
            .map(|row| row.iter().map(|c| c.glyph).collect())
            .collect()
    }

    #[test]
    fn new_validates_cell_count() {
        let result = std::panic::catch_unwind(|| {
            Snapshot::new(2, 2, 0, 0, vec![Cell::default(); 3]);
        });
        assert!(result.is_err());
    }

    #[test]
    fn new_validates_cursor_bounds() {
        let result = std::panic::catch_unwind(|| {
            Snapshot::new(2, 2, 2, 0, vec![Cell::default(); 4]);
        });
        assert!(result.is_err());
    }

    #[test]
    fn equality_ignores_capture_instant() {
        let a = Snapshot::blank(4, 2);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = Snapshot::blank(4, 2);
        assert_eq!(a, b);
    }

    #[test]
    fn full_dump_homes_paints_and_resets() {
        let snap = snapshot_of(3, 2, "abc");
        let dump = snap.full_dump();
        assert!(dump.starts_with("\x1b[H"));
        assert!(dump.ends_with("\x1b[0m"));
        assert!(dump.contains("abc"));
        assert!(dump.contains("\r\n"));
    }

    #[test]
    fn diff_without_previous_is_full_dump() {
        let snap = snapshot_of(4, 2, "test");
        assert_eq!(snap.diff(None), snap.full_dump());
    }

    #[test]
    fn diff_of_identical_snapshots_is_empty() {
        let a = snapshot_of(4, 2, "same");
        let b = snapshot_of(4, 2, "same");
        assert!(a.diff(Some(&b)).is_empty());
    }

    #[test]
    fn diff_moves_cursor_when_only_cursor_changed() {
        let a = Snapshot::blank(4, 2);
        let mut cells = vec![Cell::default(); 8];
        cells[0].glyph = ' ';
        let b = Snapshot::new(4, 2, 2, 1, cells);
        assert_eq!(b.diff(Some(&a)), "\x1b[2;3H");
    }

    #[test]
    fn diff_writes_only_changed_cells() {
        let a = snapshot_of(8, 1, "aaaaaaaa");
        let b = snapshot_of(8, 1, "aaaaaaab");
        let patch = b.diff(Some(&a));
        // One cursor move, one SGR, one glyph.
        assert!(patch.contains("\x1b[1;8H"));
        assert_eq!(patch.matches('b').count(), 1);
        assert!(!patch.contains("aa"));
    }

    #[test]
    fn diff_run_of_adjacent_cells_positions_once() {
        let a = snapshot_of(8, 1, "xxxxxxxx");
        let b = snapshot_of(8, 1, "xxabcxxx");
        let patch = b.diff(Some(&a));
        assert_eq!(patch.matches("\x1b[1;3H").count(), 1);
        // No repositioning between adjacent cells.
        assert!(!patch.contains("\x1b[1;4H"));
        assert!(!patch.contains("\x1b[1;5H"));
        assert!(patch.contains("abc"));
    }

    #[test]
    fn diff_switches_to_full_dump_past_half() {
        // 2x2 grid: 3 of 4 cells changed is > 50%.
        let a = snapshot_of(2, 2, "aaaa");
        let b = snapshot_of(2, 2, "bbba");
        assert!(b.diff(Some(&a)).starts_with("\x1b[H"));

        // Exactly half changed stays incremental.
        let c = snapshot_of(2, 2, "bbaa");
        assert!(!c.diff(Some(&a)).starts_with("\x1b[H"));
    }

    #[test]
    fn diff_against_different_dimensions_is_full_dump() {
        let a = snapshot_of(4, 2, "aaaa");
        let b = snapshot_of(6, 2, "aaaa");
        assert_eq!(b.diff(Some(&a)), b.full_dump());
    }

    #[test]
    fn sgr_sequence_for_default_is_bare_reset() {
        assert_eq!(sgr_sequence(&CellStyle::default()), "\x1b[0m");
    }

    #[test]
    fn sgr_sequence_encodes_colors_and_attributes() {
        let style = CellStyle {
            fg: Color::Ansi16(1),
            bg: Color::Ansi16(12),
            bold: true,
            underline: true,
            ..Default::default()
        };
        assert_eq!(sgr_sequence(&style), "\x1b[0;1;4;31;104m");

        let truecolor = CellStyle {
            fg: Color::Rgb { r: 1, g: 2, b: 3 },
            bg: Color::Palette256(240),
            ..Default::default()
        };
        assert_eq!(sgr_sequence(&truecolor), "\x1b[0;38;2;1;2;3;48;5;240m");
    }

    #[test]
    fn applying_full_dump_reproduces_grid() {
        let snap = snapshot_of(6, 2, "hello!");
        let rows = apply(None, &snap.diff(None), 6, 2);
        assert_eq!(rows[0], "hello!");
        assert_eq!(rows[1], "      ");
    }

    #[test]
    fn applying_incremental_diff_reproduces_grid() {
        let a = snapshot_of(10, 2, "hello what");
        let b = snapshot_of(10, 2, "hello ther");

        let rows = apply(Some(&a), &b.diff(Some(&a)), 10, 2);
        assert_eq!(rows[0], "hello ther");
    }

    #[test]
    fn styled_diff_reproduces_styles() {
        let mut cells = vec![Cell::default(); 4];
        cells[1] = Cell::new(
            'R',
            CellStyle {
                fg: Color::Ansi16(1),
                bold: true,
                ..Default::default()
            },
        );
        let styled = Snapshot::new(4, 1, 2, 0, cells);
        let blank = Snapshot::blank(4, 1);

        let mut term = TerminalBuffer::new(4, 1);
        term.process(&styled.diff(Some(&blank)));

        let cell = term.rows()[0][1];
        assert_eq!(cell.glyph, 'R');
        assert_eq!(cell.style.fg, Color::Ansi16(1));
        assert!(cell.style.bold);
    }
}
