//! Local preview tool: plays a scripted pop-up scenario and writes frames to PNG + atlas.
//! No display server or audio needed.
//!
//! Usage: cargo run --bin preview [-- --root PATH]
//!
//! Outputs:
//!   preview-output/normal-*.png: fade/slide pattern at rise, hold and fall
//!   preview-output/stretch-*.png: horizontal scale pattern
//!   preview-output/growup-*.png: vertical scale pattern
//!   preview-output/stacked-*.png: slide pop-ups pushing each other up
//!   preview-output/info-*.png: chained gain/loss notifications
//!   preview-output/atlas.png: single tiled overview

use std::path::{Path, PathBuf};

use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

use common_popup::animations::AnimationTable;
use common_popup::assets::DirAssets;
use common_popup::compositor::{save_pixmap_png, Compositor};
use common_popup::config::PopupConfig;
use common_popup::error::{PopupError, Result};
use common_popup::host::{Collaborators, NullAudio, StaticScene};
use common_popup::information::{InfoCategory, InfoSubject};
use common_popup::system::PopupSystem;
use common_popup::text::FontText;

struct Preview {
    system: PopupSystem,
    compositor: Compositor,
    out: PathBuf,
    frames: Vec<(String, Pixmap)>,
}

impl Preview {
    fn advance(&mut self, frames: usize) {
        for _ in 0..frames {
            self.system.tick();
        }
    }

    fn capture(&mut self, label: &str) -> Result<()> {
        self.system.present(&mut self.compositor);
        let path = self.out.join(format!("{label}.png"));
        self.compositor.save_png(&path)?;
        self.frames.push((label.to_string(), self.compositor.frame().clone()));
        Ok(())
    }

    fn command(&mut self, tokens: &[&str]) -> Result<()> {
        self.system.submit_tokens(tokens).map(|_| ())
    }

    fn drain(&mut self) {
        self.system.reset();
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let root = std::env::args()
        .skip_while(|a| a != "--root")
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")));
    println!("game root: {}", root.display());

    if let Err(e) = run(&root) {
        eprintln!("preview failed: {e}");
        std::process::exit(1);
    }
}

fn run(root: &Path) -> Result<()> {
    let config = PopupConfig::find_and_load(root);
    let width = config.popup.screen_width;
    let height = config.popup.screen_height;

    let collaborators = Collaborators {
        assets: Box::new(DirAssets::new(root, &config.popup)),
        text: Box::new(FontText::from_config(root, &config.popup)?),
        audio: Box::new(NullAudio),
        scene: Box::new(StaticScene),
    };
    let out = PathBuf::from("preview-output");
    std::fs::create_dir_all(&out)?;

    let mut preview = Preview {
        system: PopupSystem::new(&config, collaborators, AnimationTable::new()),
        compositor: Compositor::new(width, height)?.with_backdrop(game_background(width, height)?),
        out,
        frames: Vec::new(),
    };

    let cx = (width / 2).to_string();
    let cy = (height * 2 / 3).to_string();
    let x = format!("x:{cx}");
    let y = format!("y:{cy}");

    // ── Single-pattern runs ─────────────────────────────────
    for (label, pattern) in [("normal", "Normal"), ("stretch", "Stretch"), ("growup", "GrowUp")] {
        let pattern = format!("pattern:{pattern}");
        preview.command(&[r"text:\C[6]Treasure\C[0] found!", &x, &y, "back:0", "count:120", &pattern])?;
        preview.advance(10);
        preview.capture(&format!("{label}-rise"))?;
        preview.advance(50);
        preview.capture(&format!("{label}-hold"))?;
        preview.advance(45);
        preview.capture(&format!("{label}-fall"))?;
        preview.drain();
    }
    println!("rendered {} pattern frames", preview.frames.len());

    // ── Stacked slide pop-ups ───────────────────────────────
    let stacked_start = preview.frames.len();
    for (i, text) in ["First", "Second", "Third"].iter().enumerate() {
        let text = format!("text:{text} message");
        preview.command(&[&text, &x, &y, "back:0", "count:180", "moveY:0", "slideCount:20"])?;
        preview.advance(8);
        preview.capture(&format!("stacked-{i}"))?;
    }
    preview.advance(30);
    preview.capture("stacked-settled")?;
    preview.drain();
    println!("rendered {} stacked frames", preview.frames.len() - stacked_start);

    // ── Notifications ───────────────────────────────────────
    let info_start = preview.frames.len();
    let potion = InfoSubject {
        name: "Potion".into(),
        icon: Some(176),
        ..InfoSubject::default()
    };
    preview.system.show_info(&InfoSubject::named("Gold"), 250, &InfoCategory::Gold)?;
    preview.system.show_info(&potion, 3, &InfoCategory::Item)?;
    preview.system.show_info(&potion, -1, &InfoCategory::Item)?;
    for step in 0..4 {
        preview.advance(25);
        preview.capture(&format!("info-{step}"))?;
    }
    println!("rendered {} notification frames", preview.frames.len() - info_start);

    let atlas_path = preview.out.join("atlas.png");
    let atlas = build_atlas(&preview.frames, width, height)?;
    save_pixmap_png(&atlas, &atlas_path)?;
    println!("\natlas: {} ({}x{}, {} frames)", atlas_path.display(), atlas.width(), atlas.height(), preview.frames.len());
    println!("individual frames in {}/", preview.out.display());

    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("open").arg(&atlas_path).spawn();
    }
    Ok(())
}

/// Half-size thumbnails, three per row.
fn build_atlas(frames: &[(String, Pixmap)], width: u32, height: u32) -> Result<Pixmap> {
    let cols = 3_u32;
    let thumb_w = width / 2;
    let thumb_h = height / 2;
    let pad = 8_u32;
    let rows = (frames.len() as u32).div_ceil(cols).max(1);

    let atlas_w = cols * (thumb_w + pad) + pad;
    let atlas_h = rows * (thumb_h + pad) + pad;
    let mut atlas = Pixmap::new(atlas_w, atlas_h)
        .ok_or_else(|| PopupError::Content(format!("cannot allocate {atlas_w}x{atlas_h} atlas")))?;
    atlas.fill(tiny_skia::Color::from_rgba8(30, 30, 46, 255));

    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    for (idx, (_label, frame)) in frames.iter().enumerate() {
        let col = idx as u32 % cols;
        let row = idx as u32 / cols;
        let ox = (pad + col * (thumb_w + pad)) as f32;
        let oy = (pad + row * (thumb_h + pad)) as f32;
        let transform = Transform::from_translate(ox, oy).pre_scale(0.5, 0.5);
        atlas.draw_pixmap(0, 0, frame.as_ref(), &paint, transform, None);
    }
    Ok(atlas)
}

/// Fake game screenshot: dark gradient with some colour.
fn game_background(w: u32, h: u32) -> Result<Pixmap> {
    let mut pixmap =
        Pixmap::new(w, h).ok_or_else(|| PopupError::Content(format!("cannot allocate {w}x{h} background")))?;
    let data = pixmap.data_mut();
    for y in 0..h {
        for x in 0..w {
            let tx = x as f32 / w as f32;
            let ty = y as f32 / h as f32;
            let r = (15.0 + 25.0 * ty + 10.0 * tx) as u8;
            let g = (20.0 + 35.0 * ty + 15.0 * (1.0 - tx)) as u8;
            let b = (40.0 + 30.0 * (1.0 - ty) + 20.0 * tx) as u8;
            let i = ((y * w + x) * 4) as usize;
            data[i..i + 4].copy_from_slice(&[r, g, b, 255]);
        }
    }
    Ok(pixmap)
}
