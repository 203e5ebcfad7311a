//! Shared modules for the pop-up crate.
//! Used by the host binary (socket + log watcher) and the preview binary.

pub mod animations;
pub mod animator;
pub mod assets;
pub mod audio;
pub mod color;
pub mod command;
pub mod compositor;
pub mod config;
pub mod content;
pub mod descriptor;
pub mod error;
pub mod host;
pub mod information;
pub mod slots;
pub mod stack;
pub mod system;
pub mod text;

#[cfg(test)]
mod testing;
