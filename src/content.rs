//! Content buffers: the pixels a pop-up shows, built once when it activates.

use std::sync::Arc;

use tiny_skia::{
    FillRule, FilterQuality, GradientStop, LinearGradient, Paint, PathBuilder, Pixmap, PixmapPaint, Point, Shader,
    SpreadMode, Transform,
};

use crate::color::Color;
use crate::descriptor::{Background, Content, PopupDescriptor};
use crate::error::{PopupError, Result};
use crate::host::{ImageHandle, TextRenderer};

/// Horizontal padding on each side of the text.
const PAD_X: u32 = 12;
/// Padding above the text.
const PAD_Y: u32 = 4;
/// Largest text buffer edge, in pixels.
const MAX_EDGE: u32 = 8192;

/// Panel fill behind notification lines.
const PANEL_COLOR: Color = Color::rgba(0, 0, 0, 128);
/// Left inset of notification lines.
const PANEL_TEXT_X: f32 = 8.0;

/// Build the buffer for `desc`. `background` is the loaded image for image backgrounds.
pub fn build_content(
    desc: &PopupDescriptor,
    background: Option<&ImageHandle>,
    text: &dyn TextRenderer,
    back_color: Color,
) -> Result<ImageHandle> {
    let string = match &desc.content {
        Content::Bitmap(image) => return Ok(Arc::clone(image)),
        Content::Text(string) => string,
    };

    let (text_width, text_height) = text.measure(string);
    let bottom_pad = match desc.background {
        Background::ColorGradient => 2,
        _ => 8,
    };
    let line = text_height.max(text.font_size().ceil() as u32);
    let mut width = bounded(text_width.checked_add(PAD_X * 2), "content width")?;
    let mut height = bounded(line.checked_add(PAD_Y * 2 + bottom_pad), "content height")?;
    if let (Background::ImagePath(_), Some(picture)) = (&desc.background, background) {
        width = width.max(picture.width());
        height = height.max(picture.height());
    }

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| PopupError::Content(format!("cannot allocate {width}x{height} content buffer")))?;

    match (&desc.background, background) {
        (Background::ColorGradient, _) => paint_color_band(&mut pixmap, back_color),
        (Background::ImageIndex(_) | Background::ImagePath(_), Some(image)) => stretch_onto(&mut pixmap, image),
        _ => {}
    }

    let x = PAD_X as f32 + desc.content_offset.x as f32;
    let y = PAD_Y as f32 + desc.content_offset.y as f32 + 2.0;
    text.draw(string, &mut pixmap, x, y);
    Ok(Arc::new(pixmap))
}

/// Screen-wide panel with one notification line per row. The backdrop covers
/// `fill_width`: solid over the left half, fading out over the right half.
pub fn render_info_panel(
    lines: &[String],
    width: u32,
    fill_width: u32,
    size: f32,
    text: &dyn TextRenderer,
) -> Result<ImageHandle> {
    let line_height = bounded((size.ceil() as u32).checked_add(8), "info line height")?;
    let rows = u32::try_from(lines.len().max(1)).ok();
    let height = bounded(rows.and_then(|rows| line_height.checked_mul(rows)), "info panel height")?;
    let mut pixmap = Pixmap::new(width.max(1), height)
        .ok_or_else(|| PopupError::Content(format!("cannot allocate {width}x{height} info panel")))?;

    let half = fill_width as f32 / 2.0;
    fill_rect(&mut pixmap, 0.0, 0.0, half, height as f32, PANEL_COLOR);
    fill_horizontal_gradient(&mut pixmap, half, 0.0, half, height as f32, PANEL_COLOR, Color::TRANSPARENT);

    for (i, line) in lines.iter().enumerate() {
        let sized = format!("\\FS[{}]{line}", size.round() as u32);
        text.draw(&sized, &mut pixmap, PANEL_TEXT_X, (i as u32 * line_height) as f32);
    }
    Ok(Arc::new(pixmap))
}

fn bounded(edge: Option<u32>, what: &str) -> Result<u32> {
    edge.filter(|edge| *edge <= MAX_EDGE)
        .ok_or_else(|| PopupError::Content(format!("{what} exceeds {MAX_EDGE} pixels")))
}

/// Quarter fade-in, solid half, quarter fade-out, across the full width.
fn paint_color_band(pixmap: &mut Pixmap, color: Color) {
    let w = pixmap.width() as f32;
    let h = pixmap.height() as f32;
    let quarter = w / 4.0;
    fill_horizontal_gradient(pixmap, 0.0, 0.0, quarter, h, color.with_alpha(0), color);
    fill_rect(pixmap, quarter, 0.0, quarter * 2.0, h, color);
    fill_horizontal_gradient(pixmap, quarter * 3.0, 0.0, w - quarter * 3.0, h, color, color.with_alpha(0));
}

fn stretch_onto(pixmap: &mut Pixmap, image: &Pixmap) {
    if image.width() == 0 || image.height() == 0 {
        return;
    }
    let sx = pixmap.width() as f32 / image.width() as f32;
    let sy = pixmap.height() as f32 / image.height() as f32;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, image.as_ref(), &paint, Transform::from_scale(sx, sy), None);
}

// ── Drawing helpers ─────────────────────────────────────────

fn rect_path(x: f32, y: f32, w: f32, h: f32) -> Option<tiny_skia::Path> {
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(x, y);
    pb.line_to(x + w, y);
    pb.line_to(x + w, y + h);
    pb.line_to(x, y + h);
    pb.close();
    pb.finish()
}

fn fill_rect(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, c: Color) {
    if c.a == 0 {
        return;
    }
    if let Some(path) = rect_path(x, y, w, h) {
        let paint = Paint {
            shader: Shader::SolidColor(c.to_skia()),
            ..Paint::default()
        };
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

/// Left-to-right gradient fill (`from` at x, `to` at x+w).
fn fill_horizontal_gradient(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, from: Color, to: Color) {
    if from.a == 0 && to.a == 0 {
        return;
    }
    let Some(path) = rect_path(x, y, w, h) else {
        return;
    };
    let stops = vec![GradientStop::new(0.0, from.to_skia()), GradientStop::new(1.0, to.to_skia())];
    if let Some(shader) = LinearGradient::new(
        Point::from_xy(x, y),
        Point::from_xy(x + w, y),
        stops,
        SpreadMode::Pad,
        Transform::identity(),
    ) {
        let paint = Paint {
            shader,
            ..Paint::default()
        };
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Vec2;
    use crate::testing::{solid_image, FixedText};

    const BACK: Color = Color::rgba(0, 0, 0, 153);

    fn text_desc(text: &str, background: Background) -> PopupDescriptor {
        PopupDescriptor {
            background,
            ..PopupDescriptor::with_text(text)
        }
    }

    #[test]
    fn bitmap_content_is_used_verbatim() {
        let image = solid_image(5, 7);
        let desc = PopupDescriptor::with_bitmap(Arc::clone(&image));
        let built = build_content(&desc, None, &FixedText::new(28.0), BACK).unwrap();
        assert!(Arc::ptr_eq(&built, &image));
    }

    #[test]
    fn transparent_text_box_size() {
        let desc = text_desc("abcd", Background::Transparent);
        let built = build_content(&desc, None, &FixedText::new(28.0), BACK).unwrap();
        assert_eq!((built.width(), built.height()), (64, 44));
        assert_eq!(built.pixel(0, 0).unwrap().alpha(), 0);
    }

    #[test]
    fn color_band_is_shorter_and_solid_in_the_middle() {
        let desc = text_desc("abcdefgh", Background::ColorGradient);
        let built = build_content(&desc, None, &FixedText::new(28.0), BACK).unwrap();
        assert_eq!((built.width(), built.height()), (104, 38));
        let middle = built.pixel(52, 30).unwrap().alpha();
        assert!((150..=156).contains(&middle), "middle alpha {middle}");
        assert!(built.pixel(0, 30).unwrap().alpha() < 20);
        assert!(built.pixel(103, 30).unwrap().alpha() < 20);
    }

    #[test]
    fn text_is_drawn_at_padding_plus_content_offset() {
        let mut desc = text_desc("a", Background::Transparent);
        desc.content_offset = Vec2::new(3.0, 1.0);
        let built = build_content(&desc, None, &FixedText::new(28.0), BACK).unwrap();
        assert_eq!(built.pixel(15, 7).unwrap().alpha(), 255);
    }

    #[test]
    fn indexed_background_is_stretched() {
        let desc = text_desc("ab", Background::ImageIndex(1));
        let back = solid_image(4, 4);
        let built = build_content(&desc, Some(&back), &FixedText::new(28.0), BACK).unwrap();
        assert_eq!((built.width(), built.height()), (44, 44));
        assert_eq!(built.pixel(40, 40).unwrap().alpha(), 255);
    }

    #[test]
    fn large_picture_grows_the_buffer() {
        let desc = text_desc("ab", Background::ImagePath("frame".into()));
        let picture = solid_image(200, 80);
        let built = build_content(&desc, Some(&picture), &FixedText::new(28.0), BACK).unwrap();
        assert_eq!((built.width(), built.height()), (200, 80));
    }

    #[test]
    fn oversized_text_is_rejected() {
        let desc = text_desc("abc", Background::Transparent);
        let huge = FixedText::new(u32::MAX as f32);
        assert!(matches!(build_content(&desc, None, &huge, BACK), Err(PopupError::Content(_))));

        let wide = FixedText {
            size: 28.0,
            advance: 5000,
        };
        assert!(matches!(build_content(&desc, None, &wide, BACK), Err(PopupError::Content(_))));
    }

    #[test]
    fn oversized_info_panel_is_rejected() {
        let lines = vec!["one".to_string()];
        let result = render_info_panel(&lines, 816, 816, u32::MAX as f32, &FixedText::new(28.0));
        assert!(matches!(result, Err(PopupError::Content(_))));
    }

    #[test]
    fn info_panel_stacks_lines() {
        let lines = vec!["one".to_string(), "two".to_string()];
        let panel = render_info_panel(&lines, 816, 816, 20.0, &FixedText::new(28.0)).unwrap();
        assert_eq!((panel.width(), panel.height()), (816, 56));
        assert!(panel.pixel(100, 10).unwrap().alpha() > 100);
        assert!(panel.pixel(815, 10).unwrap().alpha() < 10);
    }
}
