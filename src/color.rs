//! Colours as written in configuration: `#rrggbb`, `#rrggbbaa` or CSS `rgba(r,g,b,a)`.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Color::rgba(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Some(Color::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// `rgba(r, g, b, a)` with `a` in `0..=1`, or `rgb(r, g, b)`.
    pub fn from_css(css: &str) -> Option<Self> {
        let css = css.trim();
        let (body, has_alpha) = if let Some(rest) = css.strip_prefix("rgba(") {
            (rest, true)
        } else {
            (css.strip_prefix("rgb(")?, false)
        };
        let parts: Vec<&str> = body.strip_suffix(')')?.split(',').map(str::trim).collect();
        let byte = |s: &str| s.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
        match (parts.as_slice(), has_alpha) {
            ([r, g, b, a], true) => {
                let alpha = a.parse::<f64>().ok()?.clamp(0.0, 1.0);
                Some(Color::rgba(byte(r)?, byte(g)?, byte(b)?, (alpha * 255.0).round() as u8))
            }
            ([r, g, b], false) => Some(Color::rgba(byte(r)?, byte(g)?, byte(b)?, 255)),
            _ => None,
        }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Color { a, ..self }
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let parsed = if s.starts_with("rgb") {
            Color::from_css(s)
        } else {
            Color::from_hex(s)
        };
        parsed.ok_or_else(|| format!("invalid colour `{s}`"))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

/// The engine's default 32-entry text palette for `\C[n]`.
pub fn default_text_palette() -> Vec<Color> {
    [
        "#ffffff", "#20a0d6", "#ff784c", "#66cc40", "#99ccff", "#ccc0ff", "#ffffa0", "#808080",
        "#c0c0c0", "#2080cc", "#ff3810", "#00a010", "#3e9ade", "#a098ff", "#ffcc20", "#000000",
        "#84aaff", "#ffff40", "#ff2020", "#202040", "#e08040", "#f0c040", "#4080c0", "#40c0f0",
        "#80ff80", "#c08080", "#8080ff", "#ff80ff", "#00a040", "#00e060", "#a060e0", "#c080ff",
    ]
    .iter()
    .filter_map(|hex| Color::from_hex(hex))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Color::from_hex("#102030"), Some(Color::rgba(0x10, 0x20, 0x30, 255)));
        assert_eq!(Color::from_hex("10203040"), Some(Color::rgba(0x10, 0x20, 0x30, 0x40)));
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#zz0000"), None);
    }

    #[test]
    fn parses_css_rgba() {
        assert_eq!("rgba(0,0,0,0.6)".parse::<Color>().unwrap(), Color::rgba(0, 0, 0, 153));
        assert_eq!("rgba( 255, 128, 0, 1 )".parse::<Color>().unwrap(), Color::rgba(255, 128, 0, 255));
        assert_eq!("rgb(1,2,3)".parse::<Color>().unwrap(), Color::rgba(1, 2, 3, 255));
        assert!("rgba(0,0,0)".parse::<Color>().is_err());
        assert!("rgba(0,0,x,1)".parse::<Color>().is_err());
    }

    #[test]
    fn display_round_trips_through_hex() {
        let color = Color::rgba(1, 2, 3, 4);
        assert_eq!(color.to_string(), "#01020304");
        assert_eq!(Color::from_hex(&color.to_string()), Some(color));
    }

    #[test]
    fn palette_has_32_entries() {
        let palette = default_text_palette();
        assert_eq!(palette.len(), 32);
        assert_eq!(palette[0], Color::WHITE);
    }

    #[test]
    fn deserializes_from_toml_string() {
        #[derive(Deserialize)]
        struct Doc {
            back: Color,
        }
        let doc: Doc = toml::from_str("back = \"rgba(0,0,0,0.5)\"").unwrap();
        assert_eq!(doc.back, Color::rgba(0, 0, 0, 128));
    }
}
