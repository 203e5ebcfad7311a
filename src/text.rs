//! fontdue-backed text measuring and drawing with the message escape codes.
//!
//! Supported escapes: `\C[n]` palette colour, `\I[n]` icon, `\FS[n]` font size, `\G`
//! currency unit and `\\` for a literal backslash. Escape names are case-insensitive.
//! Unknown escapes are kept as literal text.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use tiny_skia::{FilterQuality, IntRect, Pixmap, PixmapPaint, Transform};

use crate::assets::decode_image;
use crate::color::Color;
use crate::config::PopupSection;
use crate::error::{PopupError, Result};
use crate::host::{ImageHandle, TextRenderer};

/// Icon cell edge in the icon sheet, in pixels.
pub const ICON_SIZE: u32 = 32;
/// Icons per row in the icon sheet.
pub const ICON_COLUMNS: u32 = 16;
/// Gap after an inline icon.
const ICON_GAP: f32 = 4.0;
/// `\FS[n]` arguments are clamped to `1..=MAX_FONT_SIZE`.
pub const MAX_FONT_SIZE: u32 = 256;

/// Tried in order when the configured font cannot be loaded.
pub const FALLBACK_FONTS: [&str; 3] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Char(char),
    Color(usize),
    Icon(u32),
    FontSize(f32),
}

/// Split `text` into glyphs and escape commands. `\G` expands to `currency`.
pub fn parse_escapes(text: &str, currency: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            tokens.push(Token::Char(ch));
            continue;
        }
        if chars.peek() == Some(&'\\') {
            chars.next();
            tokens.push(Token::Char('\\'));
            continue;
        }

        let mut raw = String::new();
        while let Some(c) = chars.peek().copied().filter(char::is_ascii_alphabetic) {
            raw.push(c);
            chars.next();
        }
        let name = raw.to_ascii_uppercase();
        let mut arg = None;
        if chars.peek() == Some(&'[') {
            let mut lookahead = chars.clone();
            lookahead.next();
            let digits: String = lookahead.by_ref().take_while(|c| *c != ']').collect();
            if let Ok(n) = digits.trim().parse::<u32>() {
                arg = Some(n);
                chars = lookahead;
            }
        }

        match (name.as_str(), arg) {
            ("C", Some(n)) => tokens.push(Token::Color(n as usize)),
            ("I", Some(n)) => tokens.push(Token::Icon(n)),
            ("FS", Some(n)) => tokens.push(Token::FontSize(n.clamp(1, MAX_FONT_SIZE) as f32)),
            ("G", None) => tokens.extend(currency.chars().map(Token::Char)),
            _ => {
                tokens.push(Token::Char('\\'));
                tokens.extend(raw.chars().map(Token::Char));
                if let Some(n) = arg {
                    tokens.push(Token::Char('['));
                    tokens.extend(n.to_string().chars().map(Token::Char));
                    tokens.push(Token::Char(']'));
                }
            }
        }
    }
    tokens
}

/// Remove `\C[n]` codes, leaving everything else as written.
pub fn strip_color_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('\\') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let is_color = tail
            .get(..2)
            .is_some_and(|head| head.eq_ignore_ascii_case("c["));
        if is_color {
            if let Some(end) = tail.find(']') {
                if tail[2..end].trim().parse::<u32>().is_ok() {
                    rest = &tail[end + 1..];
                    continue;
                }
            }
        }
        out.push('\\');
        rest = tail;
    }
    out.push_str(rest);
    out
}

pub struct FontText {
    font: fontdue::Font,
    size: f32,
    standard_size: f32,
    palette: Vec<Color>,
    currency: String,
    icons: Option<ImageHandle>,
}

impl FontText {
    pub fn new(font: fontdue::Font, size: f32, standard_size: f32, palette: Vec<Color>, currency: impl Into<String>) -> Self {
        FontText {
            font,
            size,
            standard_size: standard_size.max(1.0),
            palette,
            currency: currency.into(),
            icons: None,
        }
    }

    pub fn load_font(path: &Path) -> Result<fontdue::Font> {
        let data = std::fs::read(path)
            .map_err(|e| PopupError::Config(format!("read font {}: {e}", path.display())))?;
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|e| PopupError::Config(format!("parse font {}: {e}", path.display())))?;
        info!("Loaded font {}", path.display());
        Ok(font)
    }

    /// Font, palette and icon sheet from `config`, with paths relative to `root`. A
    /// missing icon sheet only disables icons.
    pub fn from_config(root: &Path, config: &PopupSection) -> Result<Self> {
        let mut candidates =
            std::iter::once(root.join(&config.font_path)).chain(FALLBACK_FONTS.iter().map(PathBuf::from));
        let font = candidates
            .find_map(|path| match Self::load_font(&path) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!("{e}");
                    None
                }
            })
            .ok_or_else(|| {
                PopupError::Config(format!(
                    "no usable font: {} and the system fallbacks all failed",
                    config.font_path.display()
                ))
            })?;

        let text = FontText::new(
            font,
            config.font_size,
            config.standard_font_size,
            config.text_colors.clone(),
            config.currency_unit.clone(),
        );
        match decode_image(&root.join(&config.icon_set)) {
            Ok(sheet) => Ok(text.with_icons(Arc::new(sheet))),
            Err(e) => {
                warn!("Icons disabled: {e}");
                Ok(text)
            }
        }
    }

    pub fn with_icons(mut self, icons: ImageHandle) -> Self {
        self.icons = Some(icons);
        self
    }

    fn icon_edge(&self, size: f32) -> f32 {
        ICON_SIZE as f32 * size / self.standard_size
    }

    fn icon(&self, index: u32) -> Option<Pixmap> {
        let sheet = self.icons.as_ref()?;
        let x = (index % ICON_COLUMNS) * ICON_SIZE;
        let y = (index / ICON_COLUMNS) * ICON_SIZE;
        let rect = IntRect::from_xywh(x as i32, y as i32, ICON_SIZE, ICON_SIZE)?;
        sheet.clone_rect(rect)
    }

    fn rasterize_glyph(&self, target: &mut Pixmap, ch: char, size: f32, x: f32, baseline: f32, c: Color) -> f32 {
        let (metrics, bitmap) = self.font.rasterize(ch, size);
        let pw = target.width() as i32;
        let ph = target.height() as i32;
        let gx = x as i32 + metrics.xmin;
        let gy = baseline as i32 - metrics.ymin - metrics.height as i32;
        let data = target.data_mut();

        for row in 0..metrics.height {
            for col in 0..metrics.width {
                let px = gx + col as i32;
                let py = gy + row as i32;
                if px < 0 || py < 0 || px >= pw || py >= ph {
                    continue;
                }
                let coverage = bitmap[row * metrics.width + col];
                if coverage == 0 {
                    continue;
                }
                let alpha = (coverage as u32 * c.a as u32) / 255;
                let inv = 255 - alpha;
                let idx = ((py * pw + px) * 4) as usize;
                data[idx] = ((c.r as u32 * alpha + data[idx] as u32 * inv) / 255) as u8;
                data[idx + 1] = ((c.g as u32 * alpha + data[idx + 1] as u32 * inv) / 255) as u8;
                data[idx + 2] = ((c.b as u32 * alpha + data[idx + 2] as u32 * inv) / 255) as u8;
                data[idx + 3] = (alpha + data[idx + 3] as u32 * inv / 255).min(255) as u8;
            }
        }
        metrics.advance_width
    }
}

impl TextRenderer for FontText {
    fn font_size(&self) -> f32 {
        self.size
    }

    fn measure(&self, text: &str) -> (u32, u32) {
        let mut size = self.size;
        let mut width = 0.0f32;
        let mut height = size;
        for token in parse_escapes(text, &self.currency) {
            match token {
                Token::Char(ch) => width += self.font.metrics(ch, size).advance_width,
                Token::Icon(_) => width += self.icon_edge(size) + ICON_GAP,
                Token::FontSize(n) => {
                    size = n;
                    height = height.max(n);
                }
                Token::Color(_) => {}
            }
        }
        (width.ceil() as u32, height.ceil() as u32)
    }

    fn draw(&self, text: &str, target: &mut Pixmap, x: f32, y: f32) {
        let mut size = self.size;
        let mut color = self.palette.first().copied().unwrap_or(Color::WHITE);
        let mut cursor = x;
        let ascent = |size: f32| {
            self.font
                .horizontal_line_metrics(size)
                .map(|lm| lm.ascent)
                .unwrap_or(size * 0.8)
        };

        for token in parse_escapes(text, &self.currency) {
            match token {
                Token::Char(ch) => {
                    cursor += self.rasterize_glyph(target, ch, size, cursor, y + ascent(size), color);
                }
                Token::Color(n) => {
                    color = self.palette.get(n).copied().unwrap_or(Color::WHITE);
                }
                Token::FontSize(n) => size = n,
                Token::Icon(index) => {
                    let edge = self.icon_edge(size);
                    if let Some(icon) = self.icon(index) {
                        let scale = edge / ICON_SIZE as f32;
                        let paint = PixmapPaint {
                            quality: FilterQuality::Bilinear,
                            ..PixmapPaint::default()
                        };
                        target.draw_pixmap(
                            0,
                            0,
                            icon.as_ref(),
                            &paint,
                            Transform::from_row(scale, 0.0, 0.0, scale, cursor, y + (size - edge).max(0.0) / 2.0),
                            None,
                        );
                    }
                    cursor += edge + ICON_GAP;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<Token> {
        s.chars().map(Token::Char).collect()
    }

    #[test]
    fn plain_text_is_all_glyphs() {
        assert_eq!(parse_escapes("abc", "G"), chars("abc"));
    }

    #[test]
    fn recognises_escape_commands() {
        let tokens = parse_escapes(r"\C[2]x\I[64]\FS[20]y", "G");
        assert_eq!(
            tokens,
            vec![
                Token::Color(2),
                Token::Char('x'),
                Token::Icon(64),
                Token::FontSize(20.0),
                Token::Char('y'),
            ]
        );
    }

    #[test]
    fn escape_names_ignore_case() {
        assert_eq!(parse_escapes(r"\c[3]\fs[12]", "G"), vec![Token::Color(3), Token::FontSize(12.0)]);
    }

    #[test]
    fn font_size_is_clamped() {
        assert_eq!(
            parse_escapes(r"\FS[4294967295]\FS[0]", "G"),
            vec![Token::FontSize(MAX_FONT_SIZE as f32), Token::FontSize(1.0)]
        );
    }

    #[test]
    fn currency_and_backslash() {
        assert_eq!(parse_escapes(r"10\G", "Gold"), chars("10Gold"));
        assert_eq!(parse_escapes(r"a\\b", "G"), chars(r"a\b"));
    }

    #[test]
    fn unknown_escapes_stay_literal() {
        assert_eq!(parse_escapes(r"\Q[5]!", "G"), chars(r"\Q[5]!"));
        assert_eq!(parse_escapes(r"\C[x]", "G"), chars(r"\C[x]"));
    }

    #[test]
    fn strips_only_color_codes() {
        assert_eq!(strip_color_codes(r"\C[3]Potion\C[0]"), "Potion");
        assert_eq!(strip_color_codes(r"\c[10]"), "");
        assert_eq!(strip_color_codes(r"\I[5] x"), r"\I[5] x");
        assert_eq!(strip_color_codes(r"\C[zz]"), r"\C[zz]");
    }
}
