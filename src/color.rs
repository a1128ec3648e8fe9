//! SGR color resolution
//!
//! Maps `CSI ... m` parameter lists onto a 16-name palette (plus default).
//! The buffer renderer styles text through named scopes rather than RGB, so
//! 256-index and 24-bit colors are downsampled here: palette indices 0-15 map
//! directly, the 6x6x6 cube collapses each channel to a single bit, and the
//! grayscale ramp is banded into black/dark-grey/light-grey/white. Truecolor
//! picks the nearest of the 16 colors by squared RGB distance.

use serde::{Deserialize, Serialize};

/// One of the 16 standard terminal colors, or the renderer default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

const STANDARD_COLORS: [Color; 8] = [
    Color::Black,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::White,
];

const BRIGHT_COLORS: [Color; 8] = [
    Color::BrightBlack,
    Color::BrightRed,
    Color::BrightGreen,
    Color::BrightYellow,
    Color::BrightBlue,
    Color::BrightMagenta,
    Color::BrightCyan,
    Color::BrightWhite,
];

/// Conventional xterm RGB values for the 16 palette entries, used for
/// nearest-color truecolor downsampling.
const PALETTE_RGB: [(Color, (u8, u8, u8)); 16] = [
    (Color::Black, (0, 0, 0)),
    (Color::Red, (205, 0, 0)),
    (Color::Green, (0, 205, 0)),
    (Color::Yellow, (205, 205, 0)),
    (Color::Blue, (0, 0, 238)),
    (Color::Magenta, (205, 0, 205)),
    (Color::Cyan, (0, 205, 205)),
    (Color::White, (229, 229, 229)),
    (Color::BrightBlack, (127, 127, 127)),
    (Color::BrightRed, (255, 0, 0)),
    (Color::BrightGreen, (0, 255, 0)),
    (Color::BrightYellow, (255, 255, 0)),
    (Color::BrightBlue, (92, 92, 255)),
    (Color::BrightMagenta, (255, 0, 255)),
    (Color::BrightCyan, (0, 255, 255)),
    (Color::BrightWhite, (255, 255, 255)),
];

impl Color {
    /// Stable lowercase name, suitable for style scope names.
    pub fn name(self) -> &'static str {
        match self {
            Color::Default => "default",
            Color::Black => "black",
            Color::Red => "red",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Blue => "blue",
            Color::Magenta => "magenta",
            Color::Cyan => "cyan",
            Color::White => "white",
            Color::BrightBlack => "brightblack",
            Color::BrightRed => "brightred",
            Color::BrightGreen => "brightgreen",
            Color::BrightYellow => "brightyellow",
            Color::BrightBlue => "brightblue",
            Color::BrightMagenta => "brightmagenta",
            Color::BrightCyan => "brightcyan",
            Color::BrightWhite => "brightwhite",
        }
    }

    /// Downsample a 256-color palette index.
    pub fn from_index(idx: u8) -> Color {
        match idx {
            0..=7 => STANDARD_COLORS[idx as usize],
            8..=15 => BRIGHT_COLORS[(idx - 8) as usize],
            16..=231 => {
                let idx = idx - 16;
                // Each cube channel is 0-5; dividing by 3 collapses it to a
                // single on/off bit.
                let r = (idx / 36) / 3;
                let g = ((idx % 36) / 6) / 3;
                let b = (idx % 6) / 3;
                cube_bit_color(r, g, b)
            }
            232..=255 => {
                // 24-step grayscale ramp, banded coarsest-to-brightest.
                match idx {
                    232..=237 => Color::Black,
                    238..=243 => Color::BrightBlack,
                    244..=249 => Color::White,
                    _ => Color::BrightWhite,
                }
            }
        }
    }

    /// Downsample a 24-bit color to the nearest palette entry.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Color {
        let mut best = Color::Black;
        let mut best_dist = u32::MAX;
        for (color, (pr, pg, pb)) in PALETTE_RGB {
            let dr = r.abs_diff(pr) as u32;
            let dg = g.abs_diff(pg) as u32;
            let db = b.abs_diff(pb) as u32;
            let dist = dr * dr + dg * dg + db * db;
            if dist < best_dist {
                best_dist = dist;
                best = color;
            }
        }
        best
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn cube_bit_color(r: u8, g: u8, b: u8) -> Color {
    match (r, g, b) {
        (0, 0, 0) => Color::Black,
        (1, 0, 0) => Color::Red,
        (0, 1, 0) => Color::Green,
        (1, 1, 0) => Color::Yellow,
        (0, 0, 1) => Color::Blue,
        (1, 0, 1) => Color::Magenta,
        (0, 1, 1) => Color::Cyan,
        _ => Color::White,
    }
}

/// Apply a semicolon-split SGR parameter list to the current (fg, bg) pair.
///
/// Processes parameters left to right; unknown values are logged and skipped
/// rather than treated as fatal.
pub fn resolve_sgr(params: &[u16], current: (Color, Color)) -> (Color, Color) {
    let (mut fg, mut bg) = current;
    let mut i = 0;
    while i < params.len() {
        let code = params[i];
        match code {
            0 => {
                fg = Color::Default;
                bg = Color::Default;
            }
            30..=37 => fg = STANDARD_COLORS[(code - 30) as usize],
            90..=97 => fg = BRIGHT_COLORS[(code - 90) as usize],
            40..=47 => bg = STANDARD_COLORS[(code - 40) as usize],
            100..=107 => bg = BRIGHT_COLORS[(code - 100) as usize],
            39 => fg = Color::Default,
            49 => bg = Color::Default,
            38 | 48 => {
                let (color, consumed) = resolve_extended(&params[i + 1..]);
                if let Some(color) = color {
                    if code == 38 {
                        fg = color;
                    } else {
                        bg = color;
                    }
                }
                i += consumed;
            }
            // Bold/dim/italic and friends have no named-scope representation;
            // the renderer styles purely by color pair.
            1..=9 | 21..=29 => {}
            _ => {
                tracing::debug!("ignoring unknown SGR parameter {}", code);
            }
        }
        i += 1;
    }
    (fg, bg)
}

/// Resolve a `38`/`48` sub-selector. Returns the color (if any) and the
/// number of extra parameters consumed.
fn resolve_extended(rest: &[u16]) -> (Option<Color>, usize) {
    match rest.first() {
        Some(&5) => match rest.get(1) {
            Some(&idx) if idx <= 255 => (Some(Color::from_index(idx as u8)), 2),
            _ => {
                tracing::debug!("truncated or out-of-range 256-color SGR: {:?}", rest);
                (None, rest.len().min(2))
            }
        },
        Some(&2) => {
            if let (Some(&r), Some(&g), Some(&b)) = (rest.get(1), rest.get(2), rest.get(3)) {
                if r <= 255 && g <= 255 && b <= 255 {
                    return (Some(Color::from_rgb(r as u8, g as u8, b as u8)), 4);
                }
                tracing::debug!("out-of-range truecolor SGR components: {:?}", &rest[1..4]);
                (None, 4)
            } else {
                tracing::debug!("truncated truecolor SGR: {:?}", rest);
                (None, rest.len().min(4))
            }
        }
        Some(other) => {
            tracing::debug!("unknown SGR color sub-selector {}", other);
            (None, 1)
        }
        None => (None, 0),
    }
}
