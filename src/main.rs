//! common-popup: frame-driven pop-up host.
//!
//! Accepts pop-up commands on a Unix socket and from an optional game log file, runs the
//! pop-up system at 60 fps, and composites every frame in software. With `--frames DIR`
//! each frame that shows something is written out as PNG.
//!
//! Usage: common-popup [LOG_FILE] [--frames DIR]

mod socket;
mod watcher;

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use common_popup::animations::AnimationTable;
use common_popup::assets::DirAssets;
use common_popup::audio::AplayAudio;
use common_popup::command::Command;
use common_popup::compositor::Compositor;
use common_popup::config::PopupConfig;
use common_popup::host::{Collaborators, StaticScene};
use common_popup::system::PopupSystem;
use common_popup::text::FontText;

struct Args {
    log_path: Option<PathBuf>,
    frames_dir: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(std::env::args().skip(1));
    let game_root = find_game_root();
    info!("Game root: {}", game_root.display());

    let config = PopupConfig::find_and_load(&game_root);

    let text = match FontText::from_config(&game_root, &config.popup) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to load text renderer: {e}");
            std::process::exit(1);
        }
    };

    let animations = match &config.popup.animations {
        Some(path) => AnimationTable::load(&game_root.join(path)).unwrap_or_else(|e| {
            warn!("Keyframe animations unavailable: {e}");
            AnimationTable::new()
        }),
        None => AnimationTable::new(),
    };

    let collaborators = Collaborators {
        assets: Box::new(DirAssets::new(&game_root, &config.popup)),
        text: Box::new(text),
        audio: Box::new(AplayAudio::new(game_root.join(&config.popup.se_dir))),
        scene: Box::new(StaticScene),
    };
    let mut system = PopupSystem::new(&config, collaborators, animations);

    let mut compositor = match Compositor::new(config.popup.screen_width, config.popup.screen_height) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create compositor: {e}");
            std::process::exit(1);
        }
    };

    if let Some(dir) = &args.frames_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!("Cannot create frame directory {}: {e}", dir.display());
            std::process::exit(1);
        }
        info!("Writing frames to {}", dir.display());
    }

    // Both command sources feed one channel
    let (tx, rx) = mpsc::channel::<Command>();

    let socket_tx = tx.clone();
    std::thread::spawn(move || {
        let path = socket::socket_path();
        if let Err(e) = socket::listen(&path, socket_tx) {
            error!("Socket listener error: {e}");
        }
    });

    if let Some(log_path) = args.log_path.clone() {
        info!("Watching log: {}", log_path.display());
        std::thread::spawn(move || {
            if let Err(e) = watcher::watch_log(&log_path, tx) {
                error!("Log watcher error: {e}");
            }
        });
    } else {
        drop(tx);
    }

    let frame_duration = Duration::from_millis(16); // ~60fps
    let mut written = 0u64;

    loop {
        let frame_start = Instant::now();

        while let Ok(cmd) = rx.try_recv() {
            match system.execute(&cmd) {
                Ok(Some(id)) => info!("{id} from {cmd:?}"),
                Ok(None) => {}
                Err(e) => warn!("Rejected {cmd:?}: {e}"),
            }
        }

        system.tick();
        system.present(&mut compositor);

        if let Some(dir) = &args.frames_dir {
            if !system.frame_states().is_empty() {
                let path = dir.join(format!("frame-{:06}.png", system.frame()));
                match compositor.save_png(&path) {
                    Ok(()) => written += 1,
                    Err(e) => warn!("Failed to write {}: {e}", path.display()),
                }
                if written % 600 == 1 {
                    info!("{written} frames written");
                }
            }
        }

        let elapsed = frame_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Args {
    let mut parsed = Args {
        log_path: None,
        frames_dir: None,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frames" => parsed.frames_dir = args.next().map(PathBuf::from),
            _ if arg.starts_with("--") => warn!("Ignoring unknown flag {arg}"),
            _ if parsed.log_path.is_none() => parsed.log_path = Some(PathBuf::from(arg)),
            _ => warn!("Ignoring extra argument {arg}"),
        }
    }
    parsed
}

/// Game root: `$COMMON_POPUP_ROOT`, else the nearest ancestor of the binary holding a
/// popup.toml, else the working directory.
fn find_game_root() -> PathBuf {
    if let Ok(root) = std::env::var("COMMON_POPUP_ROOT") {
        return PathBuf::from(root);
    }

    if let Ok(exe) = std::env::current_exe() {
        let mut dir = exe.parent().map(|p| p.to_path_buf());
        while let Some(d) = dir {
            if d.join("popup.toml").exists() {
                return d;
            }
            dir = d.parent().map(|p| p.to_path_buf());
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
