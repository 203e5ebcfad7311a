//! Keyframe animations for `pattern:<n>` pop-ups.
//!
//! Loads the editor's `Animations.json`: an array (index 0 is `null`) of objects whose
//! `frames` hold, per frame, a list of cells
//! `[pattern, x, y, scale%, rotation°, mirror, opacity, blend]`. Only the first cell of
//! each frame moves the pop-up.

use std::collections::HashMap;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::error::{PopupError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub x: f64,
    pub y: f64,
    /// Percent.
    pub scale: f64,
    /// Degrees.
    pub rotation: f64,
    pub mirror: bool,
    pub opacity: u8,
    pub blend: u8,
}

impl Cell {
    fn from_raw(raw: &[f64]) -> Self {
        let at = |i: usize, default: f64| raw.get(i).copied().unwrap_or(default);
        Cell {
            x: at(1, 0.0),
            y: at(2, 0.0),
            scale: at(3, 100.0),
            rotation: at(4, 0.0),
            mirror: at(5, 0.0) != 0.0,
            opacity: at(6, 255.0).clamp(0.0, 255.0) as u8,
            blend: at(7, 0.0).clamp(0.0, 3.0) as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeAnimation {
    pub name: String,
    /// Leading cell of every frame; `None` for frames with no cells.
    pub frames: Vec<Option<Cell>>,
}

#[derive(Debug, Deserialize)]
struct RawAnimation {
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    frames: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Default)]
pub struct AnimationTable {
    animations: HashMap<u32, KeyframeAnimation>,
}

impl AnimationTable {
    pub fn new() -> Self {
        AnimationTable::default()
    }

    pub fn insert(&mut self, index: u32, animation: KeyframeAnimation) {
        self.animations.insert(index, animation);
    }

    pub fn get(&self, index: u32) -> Option<&KeyframeAnimation> {
        self.animations.get(&index)
    }

    pub fn contains(&self, index: u32) -> bool {
        self.animations.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<Option<RawAnimation>> =
            serde_json::from_str(json).map_err(|e| PopupError::Config(format!("animations: {e}")))?;
        let mut table = AnimationTable::new();
        for animation in raw.into_iter().flatten() {
            let frames = animation
                .frames
                .iter()
                .map(|cells| cells.first().map(|cell| Cell::from_raw(cell)))
                .collect();
            table.insert(
                animation.id,
                KeyframeAnimation {
                    name: animation.name,
                    frames,
                },
            );
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| PopupError::Config(format!("read {}: {e}", path.display())))?;
        let table = Self::from_json(&json)?;
        info!("Loaded {} keyframe animations from {}", table.len(), path.display());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        null,
        {
            "id": 1,
            "name": "Hit",
            "position": 1,
            "timings": [],
            "frames": [
                [[0, 0, -10, 100, 0, 0, 255, 1]],
                [],
                [[1, 4, -20, 150, 90, 1, 128, 0], [2, 0, 0, 100, 0, 0, 255, 0]]
            ]
        },
        {
            "id": 2,
            "name": "Short cells",
            "frames": [[[0, 5]]]
        }
    ]"#;

    #[test]
    fn parses_editor_json() {
        let table = AnimationTable::from_json(SAMPLE).unwrap();
        assert_eq!(table.len(), 2);

        let hit = table.get(1).unwrap();
        assert_eq!(hit.name, "Hit");
        assert_eq!(hit.frames.len(), 3);
        assert!(hit.frames[1].is_none());

        let last = hit.frames[2].unwrap();
        assert_eq!((last.x, last.y), (4.0, -20.0));
        assert_eq!(last.scale, 150.0);
        assert_eq!(last.rotation, 90.0);
        assert!(last.mirror);
        assert_eq!(last.opacity, 128);
        assert_eq!(last.blend, 0);
    }

    #[test]
    fn short_cells_use_defaults() {
        let table = AnimationTable::from_json(SAMPLE).unwrap();
        let cell = table.get(2).unwrap().frames[0].unwrap();
        assert_eq!(cell.x, 5.0);
        assert_eq!(cell.scale, 100.0);
        assert_eq!(cell.opacity, 255);
    }

    #[test]
    fn rejects_garbage() {
        assert!(AnimationTable::from_json("{not json").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Animations.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let table = AnimationTable::load(&path).unwrap();
        assert!(table.contains(1));
        assert!(!table.contains(3));
    }
}
