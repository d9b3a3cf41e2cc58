//! VTE performer implementation.
//!
//! Implements `vte::Perform` over the grid owned by `TerminalBuffer`.
//! Handles the control bytes and CSI sequences a recording replay needs;
//! everything else (OSC, DCS, private modes) is consumed without effect.

use tracing::trace;
use unicode_width::UnicodeWidthChar;
use vte::Perform;

use super::types::{Cell, CellStyle, Color};

pub(crate) struct TerminalPerformer<'a> {
    pub buffer: &'a mut Vec<Vec<Cell>>,
    pub width: usize,
    pub height: usize,
    pub cursor_col: &'a mut usize,
    pub cursor_row: &'a mut usize,
    pub current_style: &'a mut CellStyle,
}

impl TerminalPerformer<'_> {
    /// Move cursor down one line, scrolling at the bottom. Column is
    /// unchanged (that's carriage return's job).
    fn line_feed(&mut self) {
        if *self.cursor_row + 1 < self.height {
            *self.cursor_row += 1;
        } else {
            self.buffer.remove(0);
            self.buffer.push(vec![Cell::default(); self.width]);
        }
    }

    fn carriage_return(&mut self) {
        *self.cursor_col = 0;
    }

    fn backspace(&mut self) {
        *self.cursor_col = self.cursor_col.saturating_sub(1);
    }

    /// Advance to the next multiple-of-8 tab stop, writing styled spaces.
    fn horizontal_tab(&mut self) {
        let next_stop = ((*self.cursor_col / 8) + 1) * 8;
        while *self.cursor_col < next_stop && *self.cursor_col < self.width {
            self.buffer[*self.cursor_row][*self.cursor_col] = Cell::new(' ', *self.current_style);
            *self.cursor_col += 1;
        }
    }

    /// Write a glyph at the cursor, wrapping past the right edge.
    fn put_char(&mut self, c: char) {
        let char_width = c.width().unwrap_or(1);
        if char_width == 0 {
            return;
        }

        if *self.cursor_col + char_width > self.width {
            self.line_feed();
            self.carriage_return();
        }

        self.buffer[*self.cursor_row][*self.cursor_col] = Cell::new(c, *self.current_style);
        *self.cursor_col += 1;

        // Wide glyphs occupy two cells; the trailing cell is a styled spacer.
        if char_width == 2 && *self.cursor_col < self.width {
            self.buffer[*self.cursor_row][*self.cursor_col] = Cell::new(' ', *self.current_style);
            *self.cursor_col += 1;
        }
    }

    fn erase_to_eol(&mut self) {
        for col in *self.cursor_col..self.width {
            self.buffer[*self.cursor_row][col] = Cell::default();
        }
    }

    fn erase_from_sol(&mut self) {
        let end = (*self.cursor_col).min(self.width - 1);
        for col in 0..=end {
            self.buffer[*self.cursor_row][col] = Cell::default();
        }
    }

    fn erase_line(&mut self) {
        for col in 0..self.width {
            self.buffer[*self.cursor_row][col] = Cell::default();
        }
    }

    fn erase_to_eos(&mut self) {
        self.erase_to_eol();
        for row in (*self.cursor_row + 1)..self.height {
            for col in 0..self.width {
                self.buffer[row][col] = Cell::default();
            }
        }
    }

    fn erase_from_sos(&mut self) {
        for row in 0..*self.cursor_row {
            for col in 0..self.width {
                self.buffer[row][col] = Cell::default();
            }
        }
        self.erase_from_sol();
    }

    fn clear_screen(&mut self) {
        for row in self.buffer.iter_mut() {
            for cell in row.iter_mut() {
                *cell = Cell::default();
            }
        }
        *self.cursor_row = 0;
        *self.cursor_col = 0;
    }

    /// Apply SGR parameters to the current style.
    fn handle_sgr(&mut self, params: &[u16]) {
        // Empty CSI m means reset.
        if params.is_empty() {
            *self.current_style = CellStyle::default();
            return;
        }

        let mut iter = params.iter().peekable();
        while let Some(&param) = iter.next() {
            match param {
                0 => *self.current_style = CellStyle::default(),
                1 => self.current_style.bold = true,
                3 => self.current_style.italic = true,
                4 => self.current_style.underline = true,
                9 => self.current_style.strikethrough = true,
                22 => self.current_style.bold = false,
                23 => self.current_style.italic = false,
                24 => self.current_style.underline = false,
                29 => self.current_style.strikethrough = false,
                30..=37 => self.current_style.fg = Color::Ansi16((param - 30) as u8),
                38 => {
                    if let Some(color) = extended_color(&mut iter) {
                        self.current_style.fg = color;
                    }
                }
                39 => self.current_style.fg = Color::Default,
                40..=47 => self.current_style.bg = Color::Ansi16((param - 40) as u8),
                48 => {
                    if let Some(color) = extended_color(&mut iter) {
                        self.current_style.bg = color;
                    }
                }
                49 => self.current_style.bg = Color::Default,
                90..=97 => self.current_style.fg = Color::Ansi16((param - 90 + 8) as u8),
                100..=107 => self.current_style.bg = Color::Ansi16((param - 100 + 8) as u8),
                _ => {}
            }
        }
    }
}

/// Parse the tail of an extended color sequence (`38;5;n`, `38;2;r;g;b`).
fn extended_color<'a, I>(iter: &mut std::iter::Peekable<I>) -> Option<Color>
where
    I: Iterator<Item = &'a u16>,
{
    match *iter.next()? {
        5 => {
            let idx = *iter.next()?;
            Some(Color::Palette256(idx as u8))
        }
        2 => {
            let r = *iter.next().unwrap_or(&0) as u8;
            let g = *iter.next().unwrap_or(&0) as u8;
            let b = *iter.next().unwrap_or(&0) as u8;
            Some(Color::Rgb { r, g, b })
        }
        _ => None,
    }
}

impl Perform for TerminalPerformer<'_> {
    fn print(&mut self, c: char) {
        self.put_char(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\r' => self.carriage_return(),
            b'\n' => self.line_feed(),
            b'\x08' => self.backspace(),
            b'\t' => self.horizontal_tab(),
            // Other C0 controls have no effect on the grid.
            _ => {}
        }
    }

    fn hook(&mut self, _params: &vte::Params, _intermediates: &[u8], _ignore: bool, _action: char) {
    }

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    fn csi_dispatch(
        &mut self,
        params: &vte::Params,
        intermediates: &[u8],
        _ignore: bool,
        action: char,
    ) {
        let params: Vec<u16> = params
            .iter()
            .map(|p| p.first().copied().unwrap_or(0))
            .collect();

        // DEC private modes and mouse tracking are irrelevant to the grid.
        if intermediates.contains(&b'?') || intermediates.contains(&b'<') {
            return;
        }

        match action {
            'A' => {
                let n = params.first().copied().filter(|&x| x != 0).unwrap_or(1) as usize;
                *self.cursor_row = self.cursor_row.saturating_sub(n);
            }
            'B' => {
                let n = params.first().copied().filter(|&x| x != 0).unwrap_or(1) as usize;
                *self.cursor_row = (*self.cursor_row + n).min(self.height - 1);
            }
            'C' => {
                let n = params.first().copied().filter(|&x| x != 0).unwrap_or(1) as usize;
                *self.cursor_col = (*self.cursor_col + n).min(self.width - 1);
            }
            'D' => {
                let n = params.first().copied().filter(|&x| x != 0).unwrap_or(1) as usize;
                *self.cursor_col = self.cursor_col.saturating_sub(n);
            }
            'G' => {
                // Cursor horizontal absolute, 1-based.
                let col = params.first().copied().unwrap_or(1) as usize;
                *self.cursor_col = col.saturating_sub(1).min(self.width - 1);
            }
            'H' | 'f' => {
                // Cursor position (row;col), 1-based.
                let row = params.first().copied().unwrap_or(1) as usize;
                let col = params.get(1).copied().unwrap_or(1) as usize;
                *self.cursor_row = row.saturating_sub(1).min(self.height - 1);
                *self.cursor_col = col.saturating_sub(1).min(self.width - 1);
            }
            'J' => match params.first().copied().unwrap_or(0) {
                0 => self.erase_to_eos(),
                1 => self.erase_from_sos(),
                2 | 3 => self.clear_screen(),
                _ => {}
            },
            'K' => match params.first().copied().unwrap_or(0) {
                0 => self.erase_to_eol(),
                1 => self.erase_from_sol(),
                2 => self.erase_line(),
                _ => {}
            },
            'm' => self.handle_sgr(&params),
            _ => {
                trace!(action = %action, params = ?params, "unhandled CSI sequence");
            }
        }
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}
