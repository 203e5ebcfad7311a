//! Textual commands: the event-script surface of the pop-up system.
//!
//! ```text
//! CommonPopup add text:Hello count:120 pattern:GrowUp
//! CommonPopup clear [tag]
//! ShowInfo <text>
//! RESET
//! ```
//! Japanese command names (`ポップアップ 表示|消去`, `インフォ表示`) are accepted too.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `key:value` tokens for a new pop-up.
    Add(Vec<String>),
    Clear(Option<String>),
    ShowInfo(String),
    Reset,
}

impl Command {
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            Command::Add(tokens) => tokens.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Parse one command line. Returns `None` for anything that is not a pop-up command.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line == "RESET" {
        return Some(Command::Reset);
    }

    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match name {
        "CommonPopup" | "ポップアップ" => {
            let mut args = rest.split_whitespace();
            match args.next()? {
                "add" | "表示" => Some(Command::Add(args.map(str::to_string).collect())),
                "clear" | "消去" => Some(Command::Clear(args.next().map(str::to_string))),
                _ => None,
            }
        }
        "ShowInfo" | "インフォ表示" if !rest.is_empty() => Some(Command::ShowInfo(rest.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_add_command() {
        let cmd = parse_command("CommonPopup add text:Hi count:240 moveY:-20").unwrap();
        assert_eq!(cmd.tokens(), vec!["text:Hi", "count:240", "moveY:-20"]);
    }

    #[test]
    fn parse_clear_with_and_without_tag() {
        assert_eq!(parse_command("CommonPopup clear"), Some(Command::Clear(None)));
        assert_eq!(parse_command("CommonPopup clear loot"), Some(Command::Clear(Some("loot".into()))));
    }

    #[test]
    fn parse_japanese_aliases() {
        assert!(matches!(parse_command("ポップアップ 表示 text:やあ"), Some(Command::Add(_))));
        assert_eq!(parse_command("ポップアップ 消去"), Some(Command::Clear(None)));
        assert_eq!(parse_command("インフォ表示 宝箱を開けた"), Some(Command::ShowInfo("宝箱を開けた".into())));
    }

    #[test]
    fn parse_show_info_keeps_spaces() {
        assert_eq!(
            parse_command("ShowInfo You opened the  chest"),
            Some(Command::ShowInfo("You opened the  chest".into()))
        );
        assert!(parse_command("ShowInfo").is_none());
    }

    #[test]
    fn parse_reset() {
        assert_eq!(parse_command(" RESET "), Some(Command::Reset));
    }

    #[test]
    fn parse_unknown_returns_none() {
        assert!(parse_command("CommonPopup wiggle").is_none());
        assert!(parse_command("CommonPopup").is_none());
        assert!(parse_command("GARBAGE").is_none());
        assert!(parse_command("").is_none());
    }
}
