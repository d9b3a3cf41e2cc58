//! Color themes for rendered output.
//!
//! Each theme is an immutable named palette: background, foreground, cursor,
//! and the 16 base colors. Indexes 16-255 resolve through the standard
//! 256-color cube and grayscale ramp, which are theme-independent.

use crate::terminal::Color;

/// A 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS hex form, `#rrggbb`.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Shorthand used by the palette tables below.
const fn c(r: u8, g: u8, b: u8) -> Rgb {
    Rgb::new(r, g, b)
}

/// A named render theme.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub background: Rgb,
    pub foreground: Rgb,
    pub cursor: Rgb,
    pub palette: [Rgb; 16],
}

pub const ASCIINEMA: Theme = Theme {
    name: "asciinema",
    background: c(0x12, 0x13, 0x14),
    foreground: c(0xcc, 0xcc, 0xcc),
    cursor: c(0xcc, 0xcc, 0xcc),
    palette: [
        c(0x00, 0x00, 0x00),
        c(0xdd, 0x3c, 0x69),
        c(0x4e, 0xbf, 0x22),
        c(0xdd, 0xaf, 0x3c),
        c(0x26, 0xb0, 0xd7),
        c(0xb9, 0x54, 0xe1),
        c(0x54, 0xe1, 0xb9),
        c(0xd9, 0xd9, 0xd9),
        c(0x4d, 0x4d, 0x4d),
        c(0xdd, 0x3c, 0x69),
        c(0x4e, 0xbf, 0x22),
        c(0xdd, 0xaf, 0x3c),
        c(0x26, 0xb0, 0xd7),
        c(0xb9, 0x54, 0xe1),
        c(0x54, 0xe1, 0xb9),
        c(0xff, 0xff, 0xff),
    ],
};

pub const DRACULA: Theme = Theme {
    name: "dracula",
    background: c(0x28, 0x2a, 0x36),
    foreground: c(0xf8, 0xf8, 0xf2),
    cursor: c(0xf8, 0xf8, 0xf2),
    palette: [
        c(0x21, 0x22, 0x2c),
        c(0xff, 0x55, 0x55),
        c(0x50, 0xfa, 0x7b),
        c(0xf1, 0xfa, 0x8c),
        c(0xbd, 0x93, 0xf9),
        c(0xff, 0x79, 0xc6),
        c(0x8b, 0xe9, 0xfd),
        c(0xf8, 0xf8, 0xf2),
        c(0x62, 0x72, 0xa4),
        c(0xff, 0x6e, 0x6e),
        c(0x69, 0xff, 0x94),
        c(0xff, 0xff, 0xa5),
        c(0xd6, 0xac, 0xff),
        c(0xff, 0x92, 0xdf),
        c(0xa4, 0xff, 0xff),
        c(0xff, 0xff, 0xff),
    ],
};

pub const MONOKAI: Theme = Theme {
    name: "monokai",
    background: c(0x27, 0x28, 0x22),
    foreground: c(0xf8, 0xf8, 0xf2),
    cursor: c(0xf8, 0xf8, 0xf0),
    palette: [
        c(0x27, 0x28, 0x22),
        c(0xf9, 0x26, 0x72),
        c(0xa6, 0xe2, 0x2e),
        c(0xf4, 0xbf, 0x75),
        c(0x66, 0xd9, 0xef),
        c(0xae, 0x81, 0xff),
        c(0xa1, 0xef, 0xe4),
        c(0xf8, 0xf8, 0xf2),
        c(0x75, 0x71, 0x5e),
        c(0xf9, 0x26, 0x72),
        c(0xa6, 0xe2, 0x2e),
        c(0xf4, 0xbf, 0x75),
        c(0x66, 0xd9, 0xef),
        c(0xae, 0x81, 0xff),
        c(0xa1, 0xef, 0xe4),
        c(0xf9, 0xf8, 0xf5),
    ],
};

pub const SOLARIZED_DARK: Theme = Theme {
    name: "solarized-dark",
    background: c(0x00, 0x2b, 0x36),
    foreground: c(0x83, 0x94, 0x96),
    cursor: c(0x93, 0xa1, 0xa1),
    palette: [
        c(0x07, 0x36, 0x42),
        c(0xdc, 0x32, 0x2f),
        c(0x85, 0x99, 0x00),
        c(0xb5, 0x89, 0x00),
        c(0x26, 0x8b, 0xd2),
        c(0xd3, 0x36, 0x82),
        c(0x2a, 0xa1, 0x98),
        c(0xee, 0xe8, 0xd5),
        c(0x00, 0x2b, 0x36),
        c(0xcb, 0x4b, 0x16),
        c(0x58, 0x6e, 0x75),
        c(0x65, 0x7b, 0x83),
        c(0x83, 0x94, 0x96),
        c(0x6c, 0x71, 0xc4),
        c(0x93, 0xa1, 0xa1),
        c(0xfd, 0xf6, 0xe3),
    ],
};

pub const SOLARIZED_LIGHT: Theme = Theme {
    name: "solarized-light",
    background: c(0xfd, 0xf6, 0xe3),
    foreground: c(0x65, 0x7b, 0x83),
    cursor: c(0x58, 0x6e, 0x75),
    palette: [
        c(0x07, 0x36, 0x42),
        c(0xdc, 0x32, 0x2f),
        c(0x85, 0x99, 0x00),
        c(0xb5, 0x89, 0x00),
        c(0x26, 0x8b, 0xd2),
        c(0xd3, 0x36, 0x82),
        c(0x2a, 0xa1, 0x98),
        c(0xee, 0xe8, 0xd5),
        c(0x00, 0x2b, 0x36),
        c(0xcb, 0x4b, 0x16),
        c(0x58, 0x6e, 0x75),
        c(0x65, 0x7b, 0x83),
        c(0x83, 0x94, 0x96),
        c(0x6c, 0x71, 0xc4),
        c(0x93, 0xa1, 0xa1),
        c(0xfd, 0xf6, 0xe3),
    ],
};

pub const NORD: Theme = Theme {
    name: "nord",
    background: c(0x2e, 0x34, 0x40),
    foreground: c(0xd8, 0xde, 0xe9),
    cursor: c(0xd8, 0xde, 0xe9),
    palette: [
        c(0x3b, 0x42, 0x52),
        c(0xbf, 0x61, 0x6a),
        c(0xa3, 0xbe, 0x8c),
        c(0xeb, 0xcb, 0x8b),
        c(0x81, 0xa1, 0xc1),
        c(0xb4, 0x8e, 0xad),
        c(0x88, 0xc0, 0xd0),
        c(0xe5, 0xe9, 0xf0),
        c(0x4c, 0x56, 0x6a),
        c(0xbf, 0x61, 0x6a),
        c(0xa3, 0xbe, 0x8c),
        c(0xeb, 0xcb, 0x8b),
        c(0x81, 0xa1, 0xc1),
        c(0xb4, 0x8e, 0xad),
        c(0x8f, 0xbc, 0xbb),
        c(0xec, 0xef, 0xf4),
    ],
};

pub const ONE_DARK: Theme = Theme {
    name: "one-dark",
    background: c(0x28, 0x2c, 0x34),
    foreground: c(0xab, 0xb2, 0xbf),
    cursor: c(0x52, 0x8b, 0xff),
    palette: [
        c(0x28, 0x2c, 0x34),
        c(0xe0, 0x6c, 0x75),
        c(0x98, 0xc3, 0x79),
        c(0xe5, 0xc0, 0x7b),
        c(0x61, 0xaf, 0xef),
        c(0xc6, 0x78, 0xdd),
        c(0x56, 0xb6, 0xc2),
        c(0xab, 0xb2, 0xbf),
        c(0x54, 0x58, 0x62),
        c(0xe0, 0x6c, 0x75),
        c(0x98, 0xc3, 0x79),
        c(0xe5, 0xc0, 0x7b),
        c(0x61, 0xaf, 0xef),
        c(0xc6, 0x78, 0xdd),
        c(0x56, 0xb6, 0xc2),
        c(0xc8, 0xcc, 0xd4),
    ],
};

pub const GITHUB_DARK: Theme = Theme {
    name: "github-dark",
    background: c(0x0d, 0x11, 0x17),
    foreground: c(0xc9, 0xd1, 0xd9),
    cursor: c(0x58, 0xa6, 0xff),
    palette: [
        c(0x48, 0x4f, 0x58),
        c(0xff, 0x7b, 0x72),
        c(0x3f, 0xb9, 0x50),
        c(0xd2, 0x99, 0x22),
        c(0x58, 0xa6, 0xff),
        c(0xbc, 0x8c, 0xff),
        c(0x39, 0xc5, 0xcf),
        c(0xb1, 0xba, 0xc4),
        c(0x6e, 0x76, 0x81),
        c(0xff, 0xa1, 0x98),
        c(0x56, 0xd3, 0x64),
        c(0xe3, 0xb3, 0x41),
        c(0x79, 0xc0, 0xff),
        c(0xd2, 0xa8, 0xff),
        c(0x56, 0xd4, 0xdd),
        c(0xff, 0xff, 0xff),
    ],
};

pub const TOKYO_NIGHT: Theme = Theme {
    name: "tokyo-night",
    background: c(0x1a, 0x1b, 0x26),
    foreground: c(0xc0, 0xca, 0xf5),
    cursor: c(0xc0, 0xca, 0xf5),
    palette: [
        c(0x15, 0x16, 0x1e),
        c(0xf7, 0x76, 0x8e),
        c(0x9e, 0xce, 0x6a),
        c(0xe0, 0xaf, 0x68),
        c(0x7a, 0xa2, 0xf7),
        c(0xbb, 0x9a, 0xf7),
        c(0x7d, 0xcf, 0xff),
        c(0xa9, 0xb1, 0xd6),
        c(0x41, 0x48, 0x68),
        c(0xf7, 0x76, 0x8e),
        c(0x9e, 0xce, 0x6a),
        c(0xe0, 0xaf, 0x68),
        c(0x7a, 0xa2, 0xf7),
        c(0xbb, 0x9a, 0xf7),
        c(0x7d, 0xcf, 0xff),
        c(0xc0, 0xca, 0xf5),
    ],
};

const ALL: [&Theme; 9] = [
    &ASCIINEMA,
    &DRACULA,
    &MONOKAI,
    &SOLARIZED_DARK,
    &SOLARIZED_LIGHT,
    &NORD,
    &ONE_DARK,
    &GITHUB_DARK,
    &TOKYO_NIGHT,
];

impl Theme {
    /// Look a theme up by name; unknown names fall back to asciinema.
    pub fn by_name(name: &str) -> &'static Theme {
        ALL.iter()
            .find(|t| t.name == name)
            .copied()
            .unwrap_or(&ASCIINEMA)
    }

    /// Names of all built-in themes.
    pub fn names() -> Vec<&'static str> {
        ALL.iter().map(|t| t.name).collect()
    }

    /// Resolve a 256-color index.
    ///
    /// 0-15 use the theme palette; 16-231 the 6x6x6 cube where each axis
    /// value `a` maps to 0 or `55 + 40a`; 232-255 the grayscale ramp
    /// `8 + 10(n - 232)`.
    pub fn color_for(&self, index: u8) -> Rgb {
        match index {
            0..=15 => self.palette[index as usize],
            16..=231 => {
                let n = index - 16;
                let axis = |a: u8| if a == 0 { 0 } else { 55 + 40 * a };
                Rgb::new(axis(n / 36), axis((n / 6) % 6), axis(n % 6))
            }
            232..=255 => {
                let v = 8 + 10 * (index - 232);
                Rgb::new(v, v, v)
            }
        }
    }

    /// Resolve a foreground SGR code (30-37, 90-97, 39).
    pub fn fg_for(&self, code: u16) -> Rgb {
        match code {
            30..=37 => self.palette[(code - 30) as usize],
            90..=97 => self.palette[(code - 90 + 8) as usize],
            _ => self.foreground,
        }
    }

    /// Resolve a background SGR code (40-47, 100-107, 49).
    pub fn bg_for(&self, code: u16) -> Rgb {
        match code {
            40..=47 => self.palette[(code - 40) as usize],
            100..=107 => self.palette[(code - 100 + 8) as usize],
            _ => self.background,
        }
    }

    /// Map an emulator color to a concrete Rgb for rendering.
    ///
    /// `is_fg` selects the default used for `Color::Default`.
    pub fn resolve(&self, color: Color, is_fg: bool) -> Rgb {
        match color {
            Color::Default => {
                if is_fg {
                    self.foreground
                } else {
                    self.background
                }
            }
            Color::Ansi16(n) => self.palette[(n & 0x0f) as usize],
            Color::Palette256(n) => self.color_for(n),
            Color::Rgb { r, g, b } => Rgb::new(r, g, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_name_finds_every_builtin() {
        for name in Theme::names() {
            assert_eq!(Theme::by_name(name).name, name);
        }
    }

    #[test]
    fn unknown_name_falls_back_to_asciinema() {
        assert_eq!(Theme::by_name("no-such-theme").name, "asciinema");
    }

    #[test]
    fn dracula_background_hex() {
        assert_eq!(DRACULA.background.hex(), "#282a36");
    }

    #[test]
    fn color_for_low_indexes_use_palette() {
        let theme = Theme::by_name("dracula");
        for k in 0..16u8 {
            assert_eq!(theme.color_for(k), theme.palette[k as usize]);
        }
    }

    #[test]
    fn color_for_cube_matches_formula() {
        let theme = Theme::by_name("asciinema");
        // 16 is cube origin.
        assert_eq!(theme.color_for(16), Rgb::new(0, 0, 0));
        // 231 is cube maximum: 55 + 40*5 = 255 on each axis.
        assert_eq!(theme.color_for(231), Rgb::new(255, 255, 255));
        // 196 = 16 + 36*5: pure red axis.
        assert_eq!(theme.color_for(196), Rgb::new(255, 0, 0));
        // 110 = 16 + 36*2 + 6*3 + 4.
        assert_eq!(theme.color_for(110), Rgb::new(135, 175, 215));
    }

    #[test]
    fn color_for_grayscale_matches_formula() {
        let theme = Theme::by_name("asciinema");
        assert_eq!(theme.color_for(232), Rgb::new(8, 8, 8));
        assert_eq!(theme.color_for(244), Rgb::new(128, 128, 128));
        assert_eq!(theme.color_for(255), Rgb::new(238, 238, 238));
    }

    #[test]
    fn fg_for_resolves_basic_and_bright() {
        let theme = Theme::by_name("nord");
        assert_eq!(theme.fg_for(31), theme.palette[1]);
        assert_eq!(theme.fg_for(97), theme.palette[15]);
        assert_eq!(theme.fg_for(39), theme.foreground);
    }

    #[test]
    fn bg_for_resolves_basic_and_bright() {
        let theme = Theme::by_name("nord");
        assert_eq!(theme.bg_for(44), theme.palette[4]);
        assert_eq!(theme.bg_for(100), theme.palette[8]);
        assert_eq!(theme.bg_for(49), theme.background);
    }

    #[test]
    fn resolve_maps_emulator_colors() {
        let theme = Theme::by_name("dracula");
        assert_eq!(theme.resolve(Color::Default, true), theme.foreground);
        assert_eq!(theme.resolve(Color::Default, false), theme.background);
        assert_eq!(theme.resolve(Color::Ansi16(2), true), theme.palette[2]);
        assert_eq!(
            theme.resolve(Color::Palette256(196), true),
            Rgb::new(255, 0, 0)
        );
        assert_eq!(
            theme.resolve(Color::Rgb { r: 1, g: 2, b: 3 }, false),
            Rgb::new(1, 2, 3)
        );
    }
}
