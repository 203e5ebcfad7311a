//! Fake collaborators shared by unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use tiny_skia::Pixmap;

use crate::descriptor::SoundCue;
use crate::host::{AssetProvider, AssetState, AudioSink, BackgroundSource, ImageHandle, TextRenderer};

/// Every glyph is `advance` pixels wide; drawing paints one opaque pixel per glyph.
pub struct FixedText {
    pub size: f32,
    pub advance: u32,
}

impl FixedText {
    pub fn new(size: f32) -> Self {
        FixedText { size, advance: 10 }
    }
}

impl TextRenderer for FixedText {
    fn font_size(&self) -> f32 {
        self.size
    }

    fn measure(&self, text: &str) -> (u32, u32) {
        (text.chars().count() as u32 * self.advance, self.size as u32)
    }

    fn draw(&self, text: &str, target: &mut Pixmap, x: f32, y: f32) {
        let width = target.width();
        let height = target.height();
        for i in 0..text.chars().count() as u32 {
            let px = x as u32 + i * self.advance;
            let py = y as u32;
            if px < width && py < height {
                let idx = ((py * width + px) * 4) as usize;
                target.data_mut()[idx..idx + 4].copy_from_slice(&[255, 255, 255, 255]);
            }
        }
    }
}

pub fn solid_image(width: u32, height: u32) -> ImageHandle {
    let mut pixmap = Pixmap::new(width, height).unwrap();
    pixmap.fill(tiny_skia::Color::from_rgba8(200, 40, 40, 255));
    Arc::new(pixmap)
}

/// Asset provider whose readiness tests flip by hand.
#[derive(Clone, Default)]
pub struct SwitchAssets {
    pub states: Rc<RefCell<HashMap<BackgroundSource, AssetState>>>,
    pub polls: Rc<RefCell<Vec<BackgroundSource>>>,
}

impl SwitchAssets {
    pub fn set(&self, source: BackgroundSource, state: AssetState) {
        self.states.borrow_mut().insert(source, state);
    }
}

impl AssetProvider for SwitchAssets {
    fn poll(&mut self, source: &BackgroundSource) -> AssetState {
        self.polls.borrow_mut().push(source.clone());
        self.states
            .borrow()
            .get(source)
            .cloned()
            .unwrap_or(AssetState::Pending)
    }
}

#[derive(Clone, Default)]
pub struct RecordingAudio {
    pub played: Rc<RefCell<Vec<SoundCue>>>,
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, cue: &SoundCue) {
        self.played.borrow_mut().push(cue.clone());
    }
}
