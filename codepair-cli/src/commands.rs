//! Line commands read from stdin.
//!
//! Lines starting with `:` are commands; `::` escapes a literal colon.
//! Anything else is typed into the document followed by a newline.

use codepair_collab::EditorKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(String),
    Create(Option<String>),
    Key(EditorKey),
    Caret(usize),
    Show,
    Leave,
    Quit,
    Type(String),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        if let Some(literal) = line.strip_prefix("::") {
            return Command::Type(format!(":{literal}\n"));
        }
        let Some(command) = line.strip_prefix(':') else {
            return Command::Type(format!("{line}\n"));
        };

        let (name, arg) = match command.trim().split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command.trim(), ""),
        };
        match name {
            "join" | "j" => Command::Join(arg.to_string()),
            "create" => Command::Create(Some(arg).filter(|a| !a.is_empty()).map(str::to_string)),
            "tab" => Command::Key(EditorKey::Tab),
            "enter" => Command::Key(EditorKey::Enter),
            "esc" => Command::Key(EditorKey::Escape),
            "caret" => match arg.parse() {
                Ok(offset) => Command::Caret(offset),
                Err(_) => Command::Unknown(line.to_string()),
            },
            "show" => Command::Show,
            "leave" => Command::Leave,
            "quit" | "q" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Text a key inserts when the editor does not consume it.
pub fn passthrough_text(key: EditorKey) -> Option<&'static str> {
    match key {
        EditorKey::Tab => Some("\t"),
        EditorKey::Enter => Some("\n"),
        EditorKey::Escape => None,
    }
}
