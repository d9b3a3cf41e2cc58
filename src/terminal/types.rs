//! Terminal cell data types.

/// A terminal color.
///
/// Capture produces `Ansi16` values from console attribute words; replayed
/// SGR sequences can additionally carry palette and true-color values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    /// One of the 16 base colors (0-7 normal, 8-15 bright).
    Ansi16(u8),
    /// 256-color palette index.
    Palette256(u8),
    /// 24-bit true color.
    Rgb { r: u8, g: u8, b: u8 },
}

/// Style attributes for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStyle {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
}

impl CellStyle {
    /// True when no color or attribute is active.
    pub fn is_default(&self) -> bool {
        *self == CellStyle::default()
    }
}

/// A single cell: one Unicode scalar plus its style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    pub style: CellStyle,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: ' ',
            style: CellStyle::default(),
        }
    }
}

impl Cell {
    pub fn new(glyph: char, style: CellStyle) -> Self {
        Self { glyph, style }
    }

    /// True for a space with no active style.
    pub fn is_blank(&self) -> bool {
        self.glyph == ' ' && self.style.is_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cell_is_blank() {
        assert!(Cell::default().is_blank());
    }

    #[test]
    fn styled_space_is_not_blank() {
        let mut style = CellStyle::default();
        style.bg = Color::Ansi16(4);
        assert!(!Cell::new(' ', style).is_blank());
    }

    #[test]
    fn default_style_has_no_attributes() {
        let style = CellStyle::default();
        assert!(style.is_default());
        assert_eq!(style.fg, Color::Default);
        assert_eq!(style.bg, Color::Default);
    }
}
