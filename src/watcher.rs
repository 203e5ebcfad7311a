//! Game log watcher.
//! Tails a log file with notify and turns pop-up command lines into commands.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::time::Duration;

use log::{debug, info, warn};
use notify::{EventKind, RecursiveMode, Watcher};

use common_popup::command::{parse_command, Command};

/// Watch `path` for appended command lines.
/// Blocks the calling thread. Sends parsed commands through `tx`.
pub fn watch_log(path: &Path, tx: Sender<Command>) -> Result<(), String> {
    while !path.exists() {
        info!("Waiting for log file: {}", path.display());
        std::thread::sleep(Duration::from_secs(2));
    }

    let mut file = File::open(path).map_err(|e| format!("open log: {e}"))?;
    // Only lines written from now on
    file.seek(SeekFrom::End(0)).map_err(|e| format!("seek: {e}"))?;
    let mut reader = BufReader::new(file);
    let mut line_buf = String::new();

    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res {
            let _ = notify_tx.send(event);
        }
    })
    .map_err(|e| format!("watcher: {e}"))?;

    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(|e| format!("watch: {e}"))?;

    info!("Watching {} for popup commands", path.display());

    loop {
        match notify_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_)) {
                    continue;
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                return Err("watcher disconnected".to_string());
            }
        }

        loop {
            line_buf.clear();
            match reader.read_line(&mut line_buf) {
                Ok(0) => break,
                Ok(_) => {
                    if let Some(cmd) = parse_log_line(&line_buf) {
                        debug!("Log command: {}", line_buf.trim_end());
                        if tx.send(cmd).is_err() {
                            return Err("channel closed".to_string());
                        }
                    }
                }
                Err(e) => {
                    warn!("Read error: {e}");
                    break;
                }
            }
        }
    }
}

/// Parse a log line, skipping leading `[LEVEL] [TAG]:` style prefixes.
/// `[INFO] [POPUP]: CommonPopup add text:Hi` and `CommonPopup add text:Hi` are equivalent.
fn parse_log_line(line: &str) -> Option<Command> {
    let mut rest = line.trim();
    while let Some(after) = rest.strip_prefix('[') {
        let close = after.find(']')?;
        rest = after[close + 1..].trim_start();
    }
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    parse_command(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefixed_line() {
        let line = "[INFO] [POPUP]: CommonPopup add text:Treasure count:90\n";
        let cmd = parse_log_line(line).unwrap();
        assert_eq!(cmd.tokens(), vec!["text:Treasure", "count:90"]);
    }

    #[test]
    fn parse_bare_line() {
        assert_eq!(parse_log_line("RESET"), Some(Command::Reset));
        assert_eq!(
            parse_log_line("[POPUP] ShowInfo Door opened"),
            Some(Command::ShowInfo("Door opened".into()))
        );
    }

    #[test]
    fn ignore_unrelated_lines() {
        assert!(parse_log_line("[INFO] [RENDER]: frame 12 took 3ms").is_none());
        assert!(parse_log_line("[unterminated").is_none());
        assert!(parse_log_line("").is_none());
    }
}
