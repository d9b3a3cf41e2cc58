//! Console attribute word translation.
//!
//! A console cell's attribute word packs the foreground color index in the
//! low nibble (blue, green, red, intensity bits — note the BGR bit order),
//! the background index in the next nibble, and two styling flags above.
//! ANSI's 16-color indexes order the bits red, green, blue, so the
//! translation is an explicit table rather than mask arithmetic.

use crate::terminal::{CellStyle, Color};

pub const FOREGROUND_BLUE: u16 = 0x0001;
pub const FOREGROUND_GREEN: u16 = 0x0002;
pub const FOREGROUND_RED: u16 = 0x0004;
pub const FOREGROUND_INTENSITY: u16 = 0x0008;
pub const COMMON_LVB_REVERSE_VIDEO: u16 = 0x4000;
pub const COMMON_LVB_UNDERSCORE: u16 = 0x8000;

/// Windows nibble (BGRI) to ANSI index (RGB + bright).
///
/// The mapping swaps the red and blue bits; the table is its own inverse.
pub const WIN_TO_ANSI: [u8; 16] = [0, 4, 2, 6, 1, 5, 3, 7, 8, 12, 10, 14, 9, 13, 11, 15];

/// ANSI index (RGB + bright) to Windows nibble (BGRI).
pub const ANSI_TO_WIN: [u8; 16] = [0, 4, 2, 6, 1, 5, 3, 7, 8, 12, 10, 14, 9, 13, 11, 15];

/// Decode one attribute word into a cell style.
///
/// Reverse video is resolved here by swapping foreground and background so
/// downstream consumers never see a reverse flag.
pub fn style_from_attributes(attributes: u16) -> CellStyle {
    let fg_idx = WIN_TO_ANSI[(attributes & 0x0f) as usize];
    let bg_idx = WIN_TO_ANSI[((attributes >> 4) & 0x0f) as usize];

    let (fg, bg) = if attributes & COMMON_LVB_REVERSE_VIDEO != 0 {
        (Color::Ansi16(bg_idx), Color::Ansi16(fg_idx))
    } else {
        (Color::Ansi16(fg_idx), Color::Ansi16(bg_idx))
    };

    CellStyle {
        fg,
        bg,
        bold: false,
        italic: false,
        underline: attributes & COMMON_LVB_UNDERSCORE != 0,
        strikethrough: false,
    }
}

/// Encode a cell style back into an attribute word.
///
/// Only the colors the console can represent survive: 16-color values map
/// through the table, everything else falls back to the console default
/// (light gray on black).
pub fn attributes_from_style(style: &CellStyle) -> u16 {
    let fg = match style.fg {
        Color::Ansi16(n) => ANSI_TO_WIN[(n & 0x0f) as usize] as u16,
        _ => 0x07,
    };
    let bg = match style.bg {
        Color::Ansi16(n) => ANSI_TO_WIN[(n & 0x0f) as usize] as u16,
        _ => 0x00,
    };

    let mut attributes = fg | (bg << 4);
    if style.underline {
        attributes |= COMMON_LVB_UNDERSCORE;
    }
    attributes
}
