//! Pop-up descriptors and their resolution from `key:value` command tokens.
//!
//! A descriptor is plain data: what to show, where, for how long and how it moves.
//! Everything polymorphic in the command language (`pattern`, `back`, `extend`) is
//! resolved here, once, into a tagged variant.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::Deserialize;

use crate::error::{PopupError, Result};
use crate::host::{BackgroundSource, ImageHandle, SceneView, Vec2};

pub const DEFAULT_COUNT: u32 = 60;
pub const DEFAULT_MOVE_Y: f64 = -48.0;
pub const DEFAULT_SE_VOLUME: u32 = 90;
pub const DEFAULT_SE_PITCH: u32 = 100;

#[derive(Clone)]
pub enum Content {
    Text(String),
    /// Pre-rendered pixels, used verbatim.
    Bitmap(ImageHandle),
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Content::Bitmap(image) => write!(f, "Bitmap({}x{})", image.width(), image.height()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Fade in, hold, fade out while sliding.
    Normal,
    /// Horizontal scale in and out.
    Stretch,
    /// Vertical scale in and out.
    GrowUp,
    /// Keyframe animation from the animation table.
    AnimationIndex(u32),
}

impl FromStr for Pattern {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim() {
            "0" | "Normal" => Ok(Pattern::Normal),
            "-1" | "Stretch" => Ok(Pattern::Stretch),
            "-2" | "GrowUp" => Ok(Pattern::GrowUp),
            other => match other.parse::<u32>() {
                Ok(index) if index > 0 => Ok(Pattern::AnimationIndex(index)),
                _ => Err("expected 0/Normal, -1/Stretch, -2/GrowUp or an animation index".into()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    Transparent,
    /// Flat colour band fading out at both ends.
    ColorGradient,
    ImageIndex(u32),
    ImagePath(String),
}

impl Background {
    /// `< 0` transparent, `0` colour band, `n > 0` numbered image, anything else a picture name.
    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        let value = value.trim();
        match value.parse::<f64>() {
            Ok(n) if !n.is_finite() => Err("background index must be finite".into()),
            Ok(n) if n < 0.0 => Ok(Background::Transparent),
            Ok(n) if n == 0.0 => Ok(Background::ColorGradient),
            Ok(n) if n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(Background::ImageIndex(n as u32)),
            Ok(_) => Err("background index must be a whole number".into()),
            Err(_) => {
                let name = value.trim_matches('"');
                if name.is_empty() {
                    Err("empty picture name".into())
                } else {
                    Ok(Background::ImagePath(name.to_string()))
                }
            }
        }
    }

    /// Image that must be loaded before the pop-up can be shown.
    pub fn source(&self) -> Option<BackgroundSource> {
        match self {
            Background::ImageIndex(index) => Some(BackgroundSource::Index(*index)),
            Background::ImagePath(name) => Some(BackgroundSource::Path(name.clone())),
            Background::Transparent | Background::ColorGradient => None,
        }
    }
}

/// Frame offsets where fade-in completes and fade-out begins, with optional fade lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoints {
    pub fade_in_end: f64,
    pub fade_out_start: f64,
    /// Fade-in runs over `total - fade_in_trim` frames.
    pub fade_in_trim: Option<f64>,
    /// Fade-out length in frames.
    pub fade_out_frames: Option<f64>,
}

impl Breakpoints {
    pub fn new(fade_in_end: f64, fade_out_start: f64) -> Self {
        Breakpoints {
            fade_in_end,
            fade_out_start,
            fade_in_trim: None,
            fade_out_frames: None,
        }
    }

    /// Quarter in, quarter out.
    pub fn defaults(total: f64) -> Self {
        Breakpoints::new(total / 4.0, total * 3.0 / 4.0)
    }

    pub fn check(&self, duration: u32) -> Result<()> {
        let total = duration as f64;
        if self.fade_in_end > self.fade_out_start {
            return Err(PopupError::InvalidBreakpoints(format!(
                "fade-in end {} is after fade-out start {}",
                self.fade_in_end, self.fade_out_start
            )));
        }
        if self.fade_out_start > total {
            return Err(PopupError::InvalidBreakpoints(format!(
                "fade-out start {} exceeds duration {duration}",
                self.fade_out_start
            )));
        }
        if let Some(trim) = self.fade_in_trim.filter(|trim| *trim >= total) {
            return Err(PopupError::InvalidBreakpoints(format!(
                "fade-in trim {trim} leaves no frames of duration {duration}"
            )));
        }
        Ok(())
    }
}

impl FromStr for Breakpoints {
    type Err = PopupError;

    fn from_str(s: &str) -> Result<Self> {
        let inner = s.trim();
        let inner = inner
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(inner);

        let mut values = Vec::with_capacity(4);
        for part in inner.split(',') {
            let value: f64 = part
                .trim()
                .parse()
                .map_err(|_| PopupError::InvalidBreakpoints(format!("`{}` is not a number", part.trim())))?;
            if !value.is_finite() || value < 0.0 {
                return Err(PopupError::InvalidBreakpoints(format!(
                    "`{}` must be a finite, non-negative frame count",
                    part.trim()
                )));
            }
            values.push(value);
        }

        match values.as_slice() {
            [a, b] => Ok(Breakpoints::new(*a, *b)),
            [a, b, fade_in, fade_out] => {
                if *fade_in == 0.0 || *fade_out == 0.0 {
                    return Err(PopupError::InvalidBreakpoints("fade lengths must be positive".into()));
                }
                Ok(Breakpoints {
                    fade_in_end: *a,
                    fade_out_start: *b,
                    fade_in_trim: Some(*fade_in),
                    fade_out_frames: Some(*fade_out),
                })
            }
            _ => Err(PopupError::InvalidBreakpoints(format!(
                "expected 2 or 4 numbers, got {}",
                values.len()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SlideDirection {
    #[default]
    Up,
    Down,
}

impl SlideDirection {
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("down") {
            SlideDirection::Down
        } else {
            SlideDirection::Up
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundCue {
    pub name: String,
    pub volume: u32,
    pub pitch: u32,
    pub pan: i32,
}

impl SoundCue {
    pub fn named(name: impl Into<String>) -> Self {
        SoundCue {
            name: name.into(),
            volume: DEFAULT_SE_VOLUME,
            pitch: DEFAULT_SE_PITCH,
            pan: 0,
        }
    }

    /// `name[,volume[,pitch[,pan]]]`
    pub fn parse(spec: &str) -> std::result::Result<Self, String> {
        let mut parts = spec.split(',').map(str::trim);
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err("sound name is empty".into());
        }
        let mut cue = SoundCue::named(name);
        if let Some(volume) = parts.next().filter(|p| !p.is_empty()) {
            cue.volume = volume.parse().map_err(|_| format!("bad volume `{volume}`"))?;
        }
        if let Some(pitch) = parts.next().filter(|p| !p.is_empty()) {
            cue.pitch = pitch.parse().map_err(|_| format!("bad pitch `{pitch}`"))?;
        }
        if let Some(pan) = parts.next().filter(|p| !p.is_empty()) {
            cue.pan = pan.parse().map_err(|_| format!("bad pan `{pan}`"))?;
        }
        Ok(cue)
    }
}

#[derive(Debug, Clone)]
pub struct PopupDescriptor {
    pub content: Content,
    pub duration: u32,
    pub delay: u32,
    pub position: Vec2,
    pub move_offset: Vec2,
    pub screen_offset: Vec2,
    pub content_offset: Vec2,
    pub pattern: Pattern,
    pub background: Background,
    pub extend: Option<Breakpoints>,
    /// Follow the map scroll instead of staying put on screen.
    pub fixed: bool,
    pub anchor: Vec2,
    pub slide_count: Option<u32>,
    pub slide_direction: SlideDirection,
    pub sound: Option<SoundCue>,
    pub tag: Option<String>,
}

impl Default for PopupDescriptor {
    fn default() -> Self {
        PopupDescriptor {
            content: Content::Text(String::new()),
            duration: DEFAULT_COUNT,
            delay: 0,
            position: Vec2::ZERO,
            move_offset: Vec2::new(0.0, DEFAULT_MOVE_Y),
            screen_offset: Vec2::ZERO,
            content_offset: Vec2::ZERO,
            pattern: Pattern::Normal,
            background: Background::Transparent,
            extend: None,
            fixed: true,
            anchor: Vec2::new(0.5, 0.5),
            slide_count: None,
            slide_direction: SlideDirection::Up,
            sound: None,
            tag: None,
        }
    }
}

impl PopupDescriptor {
    pub fn with_text(text: impl Into<String>) -> Self {
        PopupDescriptor {
            content: Content::Text(text.into()),
            ..PopupDescriptor::default()
        }
    }

    pub fn with_bitmap(image: ImageHandle) -> Self {
        PopupDescriptor {
            content: Content::Bitmap(image),
            ..PopupDescriptor::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.duration == 0 {
            return Err(PopupError::malformed("count", "0", "duration must be at least one frame"));
        }
        if let Some(extend) = &self.extend {
            extend.check(self.duration)?;
        }
        Ok(())
    }

    /// Breakpoints in effect: the explicit ones, or the quarter schedule.
    pub fn breakpoints(&self) -> Breakpoints {
        self.extend
            .unwrap_or_else(|| Breakpoints::defaults(self.duration as f64))
    }
}

/// Build a descriptor from `key:value` tokens. Unknown keys are ignored; a recognised key
/// with an unusable value fails the whole descriptor.
pub fn resolve(tokens: &[&str], scene: &dyn SceneView) -> Result<PopupDescriptor> {
    let mut desc = PopupDescriptor::default();
    let mut x = None;
    let mut y = None;
    let mut entity = 0;
    let mut extend = None;

    for token in tokens {
        let Some((key, value)) = token.split_once(':') else {
            debug!("ignoring popup token without value: `{token}`");
            continue;
        };
        if value.is_empty() {
            continue;
        }
        match key {
            "x" => x = Some(number(key, value)?),
            "y" => y = Some(number(key, value)?),
            "text" => desc.content = Content::Text(value.to_string()),
            "eventId" => entity = integer(key, value)?,
            "count" => desc.duration = frames(key, value)?,
            "delay" => desc.delay = frames(key, value)?,
            "moveX" => desc.move_offset.x = number(key, value)?,
            "moveY" => desc.move_offset.y = number(key, value)?,
            "sx" => desc.screen_offset.x = number(key, value)?,
            "sy" => desc.screen_offset.y = number(key, value)?,
            "bx" => desc.content_offset.x = number(key, value)?,
            "by" => desc.content_offset.y = number(key, value)?,
            "anchorX" => desc.anchor.x = number(key, value)?,
            "anchorY" => desc.anchor.y = number(key, value)?,
            "pattern" => {
                desc.pattern = value
                    .parse()
                    .map_err(|reason: String| PopupError::malformed(key, value, reason))?
            }
            "back" => {
                desc.background =
                    Background::parse(value).map_err(|reason| PopupError::malformed(key, value, reason))?
            }
            "extend" => extend = Some(value),
            "fixed" => desc.fixed = value == "true",
            "slideCount" => {
                let count = frames(key, value)?;
                desc.slide_count = (count > 0).then_some(count);
            }
            "slideAction" => desc.slide_direction = SlideDirection::from_name(value),
            "tag" => desc.tag = Some(value.to_string()),
            "se" => {
                desc.sound =
                    Some(SoundCue::parse(value).map_err(|reason| PopupError::malformed(key, value, reason))?)
            }
            _ => debug!("ignoring unknown popup key `{key}`"),
        }
    }

    if let Some(raw) = extend {
        desc.extend = Some(raw.parse()?);
    }
    desc.validate()?;

    if x.is_none() || y.is_none() {
        let origin = scene.entity_position(entity).map(|pos| {
            let scroll = if desc.fixed { scene.scroll() } else { Vec2::ZERO };
            Vec2::new(pos.x + scroll.x, pos.y + scroll.y)
        });
        let origin = origin.unwrap_or(Vec2::ZERO);
        desc.position = Vec2::new(x.unwrap_or(origin.x), y.unwrap_or(origin.y));
    } else {
        desc.position = Vec2::new(x.unwrap_or_default(), y.unwrap_or_default());
    }

    Ok(desc)
}

fn number(key: &str, value: &str) -> Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        Ok(_) => Err(PopupError::malformed(key, value, "must be finite")),
        Err(_) => Err(PopupError::malformed(key, value, "not a number")),
    }
}

fn integer(key: &str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| PopupError::malformed(key, value, "not an integer"))
}

fn frames(key: &str, value: &str) -> Result<u32> {
    let n = number(key, value)?;
    if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
        return Err(PopupError::malformed(key, value, "must be a whole, non-negative frame count"));
    }
    Ok(n as u32)
}
