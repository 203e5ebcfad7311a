//! Directory-backed background images, decoded on worker threads and polled per frame.
//!
//! Numbered backgrounds resolve through the configured file-name template under the
//! system directory; named pictures live in the pictures directory. Both may be PNG or SVG.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use log::{debug, warn};
use tiny_skia::Pixmap;

use crate::config::PopupSection;
use crate::error::{PopupError, Result};
use crate::host::{AssetProvider, AssetState, BackgroundSource};

/// Decode a PNG or SVG file into a premultiplied pixmap.
pub fn decode_image(path: &Path) -> Result<Pixmap> {
    let data = std::fs::read(path).map_err(|e| PopupError::Asset(format!("read {}: {e}", path.display())))?;
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if is_svg {
        decode_svg(&data).map_err(|e| PopupError::Asset(format!("{}: {e}", path.display())))
    } else {
        decode_png(&data).map_err(|e| PopupError::Asset(format!("{}: {e}", path.display())))
    }
}

pub fn decode_png(bytes: &[u8]) -> std::result::Result<Pixmap, String> {
    let mut decoder = png::Decoder::new(std::io::Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(|e| format!("png header: {e}"))?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).map_err(|e| format!("png data: {e}"))?;

    let channels = match info.color_type {
        png::ColorType::Rgba => 4,
        png::ColorType::Rgb => 3,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Grayscale => 1,
        other => return Err(format!("unsupported colour type {other:?}")),
    };

    let mut pixmap = Pixmap::new(info.width, info.height).ok_or("empty png")?;
    let data = pixmap.data_mut();
    for (i, px) in buf[..info.buffer_size()].chunks_exact(channels).enumerate() {
        let (r, g, b, a) = match channels {
            4 => (px[0], px[1], px[2], px[3]),
            3 => (px[0], px[1], px[2], 255),
            2 => (px[0], px[0], px[0], px[1]),
            _ => (px[0], px[0], px[0], 255),
        };
        let premultiply = |c: u8| ((c as u32 * a as u32 + 127) / 255) as u8;
        data[i * 4..i * 4 + 4].copy_from_slice(&[premultiply(r), premultiply(g), premultiply(b), a]);
    }
    Ok(pixmap)
}

pub fn decode_svg(bytes: &[u8]) -> std::result::Result<Pixmap, String> {
    let opts = resvg::usvg::Options::default();
    let tree = resvg::usvg::Tree::from_data(bytes, &opts).map_err(|e| format!("svg: {e}"))?;
    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height()).ok_or("empty svg")?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    Ok(pixmap)
}

type Loaded = (BackgroundSource, std::result::Result<Pixmap, String>);

pub struct DirAssets {
    root: PathBuf,
    system_dir: PathBuf,
    pictures_dir: PathBuf,
    file_template: String,
    states: HashMap<BackgroundSource, AssetState>,
    tx: Sender<Loaded>,
    rx: Receiver<Loaded>,
}

impl DirAssets {
    pub fn new(root: &Path, config: &PopupSection) -> Self {
        let (tx, rx) = channel();
        DirAssets {
            root: root.to_path_buf(),
            system_dir: config.system_dir.clone(),
            pictures_dir: config.pictures_dir.clone(),
            file_template: config.text_back_file_name.clone(),
            states: HashMap::new(),
            tx,
            rx,
        }
    }

    /// File for `source`, preferring PNG over SVG when both exist.
    pub fn resolve(&self, source: &BackgroundSource) -> PathBuf {
        let stem = match source {
            BackgroundSource::Index(index) => self
                .root
                .join(&self.system_dir)
                .join(self.file_template.replace("%d", &index.to_string())),
            BackgroundSource::Path(name) => self.root.join(&self.pictures_dir).join(name),
        };
        let png = stem.with_extension("png");
        if png.exists() {
            return png;
        }
        let svg = stem.with_extension("svg");
        if svg.exists() {
            svg
        } else {
            png
        }
    }

    fn drain(&mut self) {
        while let Ok((source, result)) = self.rx.try_recv() {
            let state = match result {
                Ok(pixmap) => {
                    debug!("Background {source:?} ready ({}x{})", pixmap.width(), pixmap.height());
                    AssetState::Ready(Arc::new(pixmap))
                }
                Err(e) => {
                    warn!("Background {source:?} failed: {e}");
                    AssetState::Failed(e)
                }
            };
            self.states.insert(source, state);
        }
    }

    fn start(&mut self, source: &BackgroundSource) {
        let path = self.resolve(source);
        let tx = self.tx.clone();
        let key = source.clone();
        debug!("Loading background {source:?} from {}", path.display());
        std::thread::spawn(move || {
            let result = decode_image(&path).map_err(|e| e.to_string());
            let _ = tx.send((key, result));
        });
        self.states.insert(source.clone(), AssetState::Pending);
    }
}

impl AssetProvider for DirAssets {
    fn poll(&mut self, source: &BackgroundSource) -> AssetState {
        self.drain();
        match self.states.get(source) {
            Some(state) => state.clone(),
            None => {
                self.start(source);
                AssetState::Pending
            }
        }
    }
}
