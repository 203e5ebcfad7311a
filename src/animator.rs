//! Per-frame transform math for every pop-up pattern.
//!
//! Everything derives from `elapsed = total - remaining` and the descriptor's breakpoints:
//! rising while `elapsed < fade_in_end`, holding up to `fade_out_start`, falling after.

use crate::animations::AnimationTable;
use crate::descriptor::{Breakpoints, Pattern, PopupDescriptor};
use crate::host::{ImageHandle, SceneView, Vec2};
use crate::system::PopupId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiply,
    Screen,
}

impl BlendMode {
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => BlendMode::Additive,
            2 => BlendMode::Multiply,
            3 => BlendMode::Screen,
            _ => BlendMode::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees.
    pub rotation: f64,
    pub opacity: u8,
    pub blend: BlendMode,
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Transform {
            x: position.x,
            y: position.y,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            opacity: 255,
            blend: BlendMode::Normal,
        }
    }
}

/// What a render sink draws for one visible pop-up.
#[derive(Debug, Clone)]
pub struct FrameState {
    pub id: PopupId,
    pub transform: Transform,
    /// Normalised pivot for position, rotation and scale.
    pub anchor: Vec2,
    pub content: ImageHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rising,
    Holding,
    Falling,
}

pub fn stage(breakpoints: &Breakpoints, elapsed: f64) -> Stage {
    if elapsed < breakpoints.fade_in_end {
        Stage::Rising
    } else if elapsed <= breakpoints.fade_out_start {
        Stage::Holding
    } else {
        Stage::Falling
    }
}

/// Frames it takes to travel the full move offset.
fn travel_frames(total: f64, breakpoints: &Breakpoints) -> f64 {
    let tail = (total - breakpoints.fade_out_start).max(1.0);
    let ratio = (total / tail).max(0.1);
    total / ratio
}

/// Displacement from the start position, floored to whole pixels.
pub fn motion(desc: &PopupDescriptor, elapsed: f64) -> Vec2 {
    let total = desc.duration as f64;
    let breakpoints = desc.breakpoints();
    let span = travel_frames(total, &breakpoints);
    let travelled = match stage(&breakpoints, elapsed) {
        Stage::Rising => elapsed.min(span),
        Stage::Holding => span,
        Stage::Falling => span + (elapsed - breakpoints.fade_out_start),
    };
    Vec2::new(
        (desc.move_offset.x * travelled / span).floor(),
        (desc.move_offset.y * travelled / span).floor(),
    )
}

pub fn fade_opacity(desc: &PopupDescriptor, elapsed: f64) -> u8 {
    let total = desc.duration as f64;
    let remaining = total - elapsed;
    let breakpoints = desc.breakpoints();
    let fade_in = breakpoints.fade_in_trim.map_or(total / 3.0, |trim| total - trim);
    let fade_out = breakpoints.fade_out_frames.unwrap_or(total / 3.0);
    let value = match stage(&breakpoints, elapsed) {
        Stage::Rising => 255.0 * elapsed / fade_in,
        Stage::Holding => 255.0,
        Stage::Falling => 255.0 * remaining / fade_out,
    };
    value.floor().clamp(0.0, 255.0) as u8
}

/// Scale factor for the stretch and grow-up patterns, in `[0, 1]`.
pub fn scale_rate(desc: &PopupDescriptor, elapsed: f64) -> f64 {
    let total = desc.duration as f64;
    let remaining = total - elapsed;
    let breakpoints = desc.breakpoints();
    let rate = match stage(&breakpoints, elapsed) {
        Stage::Rising => elapsed / breakpoints.fade_in_end.max(1.0),
        Stage::Holding => 1.0,
        Stage::Falling => remaining / (total - breakpoints.fade_out_start).max(1.0),
    };
    rate.clamp(0.0, 1.0)
}

/// Screen position for a displacement, including the static screen offset and, for
/// map-anchored pop-ups, the camera scroll (wrapped on looping axes).
pub fn place(desc: &PopupDescriptor, offset: Vec2, scene: &dyn SceneView) -> Vec2 {
    let mut x = desc.position.x + offset.x + desc.screen_offset.x;
    let mut y = desc.position.y + offset.y + desc.screen_offset.y;
    if desc.fixed {
        let scroll = scene.scroll();
        let (loop_width, loop_height) = scene.loop_size();
        x -= scroll.x;
        y -= scroll.y;
        if x < 0.0 {
            if let Some(width) = loop_width {
                x += width;
            }
        }
        if y < 0.0 {
            if let Some(height) = loop_height {
                y += height;
            }
        }
    }
    Vec2::new(x, y)
}

/// Transform for the frame where `remaining` frames are left. Keyframe animations past
/// their last frame keep `current`.
pub fn animate(
    desc: &PopupDescriptor,
    remaining: u32,
    animations: &AnimationTable,
    scene: &dyn SceneView,
    current: &Transform,
) -> Transform {
    let elapsed = desc.duration.saturating_sub(remaining) as f64;
    match desc.pattern {
        Pattern::Normal => Transform {
            opacity: fade_opacity(desc, elapsed),
            ..Transform::at(place(desc, motion(desc, elapsed), scene))
        },
        Pattern::Stretch => Transform {
            scale_x: scale_rate(desc, elapsed),
            ..Transform::at(place(desc, motion(desc, elapsed), scene))
        },
        Pattern::GrowUp => Transform {
            scale_y: scale_rate(desc, elapsed),
            ..Transform::at(place(desc, motion(desc, elapsed), scene))
        },
        Pattern::AnimationIndex(index) => {
            keyframe(desc, index, elapsed, animations).unwrap_or(*current)
        }
    }
}

/// Cells are placed relative to the pop-up's position as authored; camera scroll does not
/// apply.
fn keyframe(desc: &PopupDescriptor, index: u32, elapsed: f64, animations: &AnimationTable) -> Option<Transform> {
    let animation = animations.get(index)?;
    let len = animation.frames.len();
    let frame = (len as f64 * elapsed / desc.duration as f64).floor() as usize;
    let cell = animation.frames.get(frame).copied().flatten()?;
    let scale = cell.scale / 100.0;
    Some(Transform {
        x: desc.position.x + cell.x + desc.screen_offset.x,
        y: desc.position.y + cell.y + desc.screen_offset.y,
        scale_x: if cell.mirror { -scale } else { scale },
        scale_y: scale,
        rotation: cell.rotation,
        opacity: cell.opacity,
        blend: BlendMode::from_index(cell.blend),
    })
}
