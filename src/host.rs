//! Seams between the pop-up core and the program hosting it.
//!
//! The core never touches files, fonts, speakers or the screen directly. It asks an
//! [`AssetProvider`] for background images, a [`TextRenderer`] to measure and draw text,
//! an [`AudioSink`] to play sound cues, and a [`SceneView`] for entity positions and
//! camera scroll. Whatever composites the result implements [`RenderSink`].

use std::sync::Arc;

use tiny_skia::Pixmap;

use crate::animator::FrameState;
use crate::descriptor::SoundCue;

/// Shared, immutable pixel buffer (premultiplied RGBA).
pub type ImageHandle = Arc<Pixmap>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }
}

/// Where a background image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BackgroundSource {
    /// Numbered system image, resolved through the configured file-name template.
    Index(u32),
    /// Named picture.
    Path(String),
}

#[derive(Debug, Clone)]
pub enum AssetState {
    Pending,
    Ready(ImageHandle),
    Failed(String),
}

pub trait AssetProvider {
    /// Non-blocking readiness check. The first poll for a source starts loading it.
    fn poll(&mut self, source: &BackgroundSource) -> AssetState;
}

pub trait TextRenderer {
    /// Base font size in pixels.
    fn font_size(&self) -> f32;

    /// Pixel width and height of `text`, inline escapes included.
    fn measure(&self, text: &str) -> (u32, u32);

    /// Draw `text` with its em-box top-left at (`x`, `y`).
    fn draw(&self, text: &str, target: &mut Pixmap, x: f32, y: f32);
}

pub trait AudioSink {
    /// Fire-and-forget.
    fn play(&mut self, cue: &SoundCue);
}

pub trait SceneView {
    /// Screen position of a game entity. `0` is the entity that issued the request.
    fn entity_position(&self, id: i32) -> Option<Vec2>;

    /// Camera scroll in pixels.
    fn scroll(&self) -> Vec2;

    /// Pixel length of each looping map axis, `None` for axes that do not wrap.
    fn loop_size(&self) -> (Option<f64>, Option<f64>) {
        (None, None)
    }
}

pub trait RenderSink {
    fn present(&mut self, frames: &[FrameState]);
}

/// Scene with no entities and a camera that never moves.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticScene;

impl SceneView for StaticScene {
    fn entity_position(&self, _id: i32) -> Option<Vec2> {
        None
    }

    fn scroll(&self) -> Vec2 {
        Vec2::ZERO
    }
}

/// Audio sink that drops every cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: &SoundCue) {}
}

/// Everything a [`crate::system::PopupSystem`] needs from its host.
pub struct Collaborators {
    pub assets: Box<dyn AssetProvider>,
    pub text: Box<dyn TextRenderer>,
    pub audio: Box<dyn AudioSink>,
    pub scene: Box<dyn SceneView>,
}
