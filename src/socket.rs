//! Unix domain socket listener for pop-up commands, one per line.

use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::sync::mpsc::Sender;

use log::{debug, info, warn};

use common_popup::command::{parse_command, Command};

pub const DEFAULT_SOCKET: &str = "/tmp/common-popup.sock";

/// Socket path from `$COMMON_POPUP_SOCKET`, else [`DEFAULT_SOCKET`].
pub fn socket_path() -> String {
    std::env::var("COMMON_POPUP_SOCKET").unwrap_or_else(|_| DEFAULT_SOCKET.to_string())
}

/// Listen for commands on a Unix domain socket. Blocks forever.
pub fn listen(path: &str, tx: Sender<Command>) -> Result<(), String> {
    // Remove stale socket
    if Path::new(path).exists() {
        let _ = std::fs::remove_file(path);
    }

    let listener = UnixListener::bind(path).map_err(|e| format!("bind {path}: {e}"))?;
    info!("Socket listening at {path}");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let reader = BufReader::new(stream);
                for line in reader.lines() {
                    match line {
                        Ok(line) => match parse_command(&line) {
                            Some(cmd) => {
                                debug!("Socket command: {line}");
                                if tx.send(cmd).is_err() {
                                    return Err("channel closed".into());
                                }
                            }
                            None if line.trim().is_empty() => {}
                            None => warn!("Ignoring unknown socket command: {line}"),
                        },
                        Err(e) => {
                            warn!("Socket read error: {e}");
                            break;
                        }
                    }
                }
            }
            Err(e) => warn!("Socket accept error: {e}"),
        }
    }

    Ok(())
}
