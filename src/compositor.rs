//! Software compositor: draws frame states onto a screen-sized pixmap.
//!
//! Each pop-up's content is placed so its anchor lands on the transform position, then
//! rotated and scaled about that point. Opacity and blend mode come from the transform.

use std::path::Path;

use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::animator::{BlendMode, FrameState};
use crate::error::{PopupError, Result};
use crate::host::RenderSink;

pub struct Compositor {
    screen: Pixmap,
    /// Drawn under the pop-ups every frame; transparent when absent.
    backdrop: Option<Pixmap>,
}

impl Compositor {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let screen = Pixmap::new(width, height)
            .ok_or_else(|| PopupError::Content(format!("cannot allocate {width}x{height} screen")))?;
        Ok(Compositor { screen, backdrop: None })
    }

    pub fn with_backdrop(mut self, backdrop: Pixmap) -> Self {
        self.backdrop = Some(backdrop);
        self
    }

    pub fn width(&self) -> u32 {
        self.screen.width()
    }

    pub fn height(&self) -> u32 {
        self.screen.height()
    }

    pub fn frame(&self) -> &Pixmap {
        &self.screen
    }

    fn clear(&mut self) {
        match &self.backdrop {
            Some(backdrop) => {
                self.screen.fill(tiny_skia::Color::TRANSPARENT);
                self.screen
                    .draw_pixmap(0, 0, backdrop.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
            }
            None => self.screen.fill(tiny_skia::Color::TRANSPARENT),
        }
    }

    fn draw(&mut self, state: &FrameState) {
        let t = &state.transform;
        if t.opacity == 0 || t.scale_x == 0.0 || t.scale_y == 0.0 {
            return;
        }
        let content: &Pixmap = &state.content;
        let pivot_x = state.anchor.x as f32 * content.width() as f32;
        let pivot_y = state.anchor.y as f32 * content.height() as f32;
        let transform = Transform::from_translate(t.x as f32, t.y as f32)
            .pre_rotate(t.rotation as f32)
            .pre_scale(t.scale_x as f32, t.scale_y as f32)
            .pre_translate(-pivot_x, -pivot_y);

        let paint = PixmapPaint {
            opacity: t.opacity as f32 / 255.0,
            blend_mode: skia_blend(t.blend),
            quality: FilterQuality::Bilinear,
        };
        self.screen.draw_pixmap(0, 0, content.as_ref(), &paint, transform, None);
    }

    /// Screen as 0xAARRGGBB words, premultiplied.
    pub fn to_argb(&self) -> Vec<u32> {
        self.screen
            .data()
            .chunks_exact(4)
            .map(|px| (px[3] as u32) << 24 | (px[0] as u32) << 16 | (px[1] as u32) << 8 | px[2] as u32)
            .collect()
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        save_pixmap_png(&self.screen, path)
    }
}

impl RenderSink for Compositor {
    fn present(&mut self, frames: &[FrameState]) {
        self.clear();
        for state in frames {
            self.draw(state);
        }
    }
}

fn skia_blend(mode: BlendMode) -> tiny_skia::BlendMode {
    match mode {
        BlendMode::Normal => tiny_skia::BlendMode::SourceOver,
        BlendMode::Additive => tiny_skia::BlendMode::Plus,
        BlendMode::Multiply => tiny_skia::BlendMode::Multiply,
        BlendMode::Screen => tiny_skia::BlendMode::Screen,
    }
}

/// Write a pixmap as straight-alpha RGBA PNG.
pub fn save_pixmap_png(pixmap: &Pixmap, path: &Path) -> Result<()> {
    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|px| {
            let c = px.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    let file = std::fs::File::create(path)?;
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), pixmap.width(), pixmap.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|e| PopupError::Content(format!("png header {}: {e}", path.display())))?;
    writer
        .write_image_data(&rgba)
        .map_err(|e| PopupError::Content(format!("png data {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::Transform as PopupTransform;
    use crate::host::Vec2;
    use crate::system::PopupId;
    use crate::testing::solid_image;

    fn state(id: PopupId, transform: PopupTransform) -> FrameState {
        FrameState {
            id,
            transform,
            anchor: Vec2::new(0.5, 0.5),
            content: solid_image(10, 10),
        }
    }

    fn some_id() -> PopupId {
        PopupId(1)
    }

    fn alpha_at(compositor: &Compositor, x: u32, y: u32) -> u8 {
        compositor.frame().pixel(x, y).unwrap().alpha()
    }

    #[test]
    fn content_is_centred_on_its_anchor() {
        let mut compositor = Compositor::new(100, 100).unwrap();
        compositor.present(&[state(some_id(), PopupTransform::at(Vec2::new(50.0, 50.0)))]);
        assert_eq!(alpha_at(&compositor, 50, 50), 255);
        assert_eq!(alpha_at(&compositor, 46, 46), 255);
        assert_eq!(alpha_at(&compositor, 40, 40), 0);
        assert_eq!(alpha_at(&compositor, 60, 60), 0);
    }

    #[test]
    fn opacity_scales_alpha() {
        let mut compositor = Compositor::new(100, 100).unwrap();
        let transform = PopupTransform {
            opacity: 128,
            ..PopupTransform::at(Vec2::new(50.0, 50.0))
        };
        compositor.present(&[state(some_id(), transform)]);
        let alpha = alpha_at(&compositor, 50, 50);
        assert!((126..=130).contains(&alpha), "alpha {alpha}");
    }

    #[test]
    fn collapsed_scale_draws_nothing() {
        let mut compositor = Compositor::new(100, 100).unwrap();
        let transform = PopupTransform {
            scale_y: 0.0,
            ..PopupTransform::at(Vec2::new(50.0, 50.0))
        };
        compositor.present(&[state(some_id(), transform)]);
        assert!(compositor.to_argb().iter().all(|&px| px == 0));
    }

    #[test]
    fn mirrored_content_still_covers_its_anchor() {
        let mut compositor = Compositor::new(100, 100).unwrap();
        let transform = PopupTransform {
            scale_x: -1.0,
            ..PopupTransform::at(Vec2::new(50.0, 50.0))
        };
        compositor.present(&[state(some_id(), transform)]);
        assert_eq!(alpha_at(&compositor, 50, 50), 255);
    }

    #[test]
    fn each_present_starts_from_a_clean_screen() {
        let mut compositor = Compositor::new(100, 100).unwrap();
        compositor.present(&[state(some_id(), PopupTransform::at(Vec2::new(50.0, 50.0)))]);
        compositor.present(&[]);
        assert_eq!(alpha_at(&compositor, 50, 50), 0);
    }

    #[test]
    fn backdrop_shows_under_popups() {
        let mut backdrop = Pixmap::new(100, 100).unwrap();
        backdrop.fill(tiny_skia::Color::from_rgba8(0, 0, 255, 255));
        let mut compositor = Compositor::new(100, 100).unwrap().with_backdrop(backdrop);
        compositor.present(&[]);
        assert_eq!(compositor.to_argb()[0], 0xFF0000FF);
    }

    #[test]
    fn saves_png_that_decodes_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut compositor = Compositor::new(32, 16).unwrap();
        compositor.present(&[state(some_id(), PopupTransform::at(Vec2::new(16.0, 8.0)))]);
        compositor.save_png(&path).unwrap();

        let pixmap = crate::assets::decode_png(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (32, 16));
        assert_eq!(pixmap.pixel(16, 8).unwrap().alpha(), 255);
    }
}
