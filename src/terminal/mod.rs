//! Virtual terminal emulator.
//!
//! A VTE-based state machine that replays recorded ANSI output into a
//! fixed-size grid of styled cells. The same emulator backs the text/JSON
//! snapshots, the SVG renderer, and the video frame loop.
//!
//! The parser is stateful across calls, so feeding a byte stream in
//! arbitrary chunks produces the same final grid as feeding it whole.

mod performer;
mod types;

pub use types::{Cell, CellStyle, Color};

use std::fmt;

use vte::Parser;

/// A virtual terminal buffer that processes ANSI escape sequences.
pub struct TerminalBuffer {
    width: usize,
    height: usize,
    buffer: Vec<Vec<Cell>>,
    cursor_col: usize,
    cursor_row: usize,
    current_style: CellStyle,
    parser: Parser,
}

impl TerminalBuffer {
    /// Create a buffer with the given dimensions (both must be positive).
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "dimensions must be positive");
        Self {
            width,
            height,
            buffer: vec![vec![Cell::default(); width]; height],
            cursor_col: 0,
            cursor_row: 0,
            current_style: CellStyle::default(),
            parser: Parser::new(),
        }
    }

    /// Feed output data through the emulator.
    pub fn process(&mut self, data: &str) {
        let mut performer = performer::TerminalPerformer {
            buffer: &mut self.buffer,
            width: self.width,
            height: self.height,
            cursor_col: &mut self.cursor_col,
            cursor_row: &mut self.cursor_row,
            current_style: &mut self.current_style,
        };
        self.parser.advance(&mut performer, data.as_bytes());
    }

    /// Resize the grid, preserving overlapping content and clamping the
    /// cursor. Used for resize events during replay.
    pub fn resize(&mut self, new_width: usize, new_height: usize) {
        if new_width == 0 || new_height == 0 {
            return;
        }

        let mut new_buffer = vec![vec![Cell::default(); new_width]; new_height];
        for (row_idx, row) in self.buffer.iter().enumerate().take(new_height) {
            for (col_idx, cell) in row.iter().enumerate().take(new_width) {
                new_buffer[row_idx][col_idx] = *cell;
            }
        }

        self.buffer = new_buffer;
        self.width = new_width;
        self.height = new_height;
        self.cursor_col = self.cursor_col.min(new_width - 1);
        self.cursor_row = self.cursor_row.min(new_height - 1);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Cursor column, clamped into the grid.
    pub fn cursor_col(&self) -> usize {
        self.cursor_col.min(self.width - 1)
    }

    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    /// Borrow the grid rows; each row holds exactly `width` cells.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.buffer
    }

    /// Reference to a single row's cells.
    pub fn row(&self, row_idx: usize) -> Option<&[Cell]> {
        self.buffer.get(row_idx).map(|r| r.as_slice())
    }
}

impl fmt::Display for TerminalBuffer {
    /// Render the screen as plain text: trailing spaces trimmed per line,
    /// trailing empty lines removed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = self
            .buffer
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.glyph)
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect();

        while lines.last().map(|s| s.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        write!(f, "{}", lines.join("\n"))
    }
}
