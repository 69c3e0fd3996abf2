//! Logging utilities for chat lines so logs stay single-line and readable.
//! Strips formatting codes and escapes control characters.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

pub use crate::chat::format::strip_colors;

/// Log target used for every delivered chat line.
pub const CHAT_TARGET: &str = "chat";

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Truncates very long strings with an ellipsis to cap log noise.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 300;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// A formatted chat line as it should appear in the server log.
pub fn chat_log_line(s: &str) -> String {
    escape_log(&strip_colors(s))
}

/// Optional append-only log files fed by the logger's formatter.
///
/// `chat` receives only records logged under [`CHAT_TARGET`], whether or
/// not a main log file is configured.
#[derive(Default)]
pub struct LogSinks {
    main: Option<Mutex<File>>,
    chat: Option<Mutex<File>>,
}

impl LogSinks {
    /// Open whichever files are configured. A file that cannot be opened is
    /// reported on stderr and skipped.
    pub fn open(main: Option<&str>, chat: Option<&str>) -> Self {
        Self {
            main: main.and_then(open_append),
            chat: chat.and_then(open_append),
        }
    }

    pub fn has_main(&self) -> bool {
        self.main.is_some()
    }

    pub fn write(&self, target: &str, line: &str) {
        if let Some(file) = &self.main {
            append(file, line);
        }
        if target == CHAT_TARGET {
            if let Some(file) = &self.chat {
                append(file, line);
            }
        }
    }
}

fn open_append(path: &str) -> Option<Mutex<File>> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => Some(Mutex::new(f)),
        Err(e) => {
            eprintln!("cannot open log file {}: {}", path, e);
            None
        }
    }
}

fn append(file: &Mutex<File>, line: &str) {
    if let Ok(mut guard) = file.lock() {
        let _ = writeln!(guard, "{}", line);
    }
}
