//! Input validation for nicknames, chat lines and persisted records

use std::collections::HashSet;

use crate::chat::format::{strip_colors, translate_color_codes};

/// Nickname validation errors. Each maps onto a language key for the reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NicknameError {
    #[error("Nickname is empty")]
    Empty,

    #[error("Nickname is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Nickname contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Nickname is already used by {owner}")]
    Used { owner: String },
}

impl NicknameError {
    /// Language key used to report this error to a player.
    pub fn language_key(&self) -> &'static str {
        match self {
            NicknameError::Empty | NicknameError::InvalidCharacters { .. } => {
                "SinkChat.Commands.Nick.IllegalNickname"
            }
            NicknameError::TooLong { .. } => "SinkChat.Commands.Nick.TooLong",
            NicknameError::Used { .. } => "SinkChat.Commands.Nick.Used",
        }
    }
}

#[derive(Debug)]
pub enum SecurityError {
    /// Content is too long
    ContentTooLong { max_length: usize },

    /// File size exceeds maximum allowed
    FileSizeExceeded { limit: usize },

    /// JSON format is invalid or malformed
    InvalidFormat,
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::ContentTooLong { max_length } => write!(f, "Content too long (max {} bytes)", max_length),
            SecurityError::FileSizeExceeded { limit } => write!(f, "File size exceeds limit ({} bytes)", limit),
            SecurityError::InvalidFormat => write!(f, "Invalid format"),
        }
    }
}

/// Validate a requested nickname and return it with color codes translated.
///
/// Allowed: ASCII letters, digits, underscore, and `&` color codes. The
/// length limit applies to the visible text only.
pub fn validate_nickname(nickname: &str, max_length: usize) -> Result<String, NicknameError> {
    let trimmed = nickname.trim();
    let translated = translate_color_codes('&', trimmed);
    let visible = strip_colors(&translated);

    if visible.is_empty() {
        return Err(NicknameError::Empty);
    }
    if visible.chars().count() > max_length {
        return Err(NicknameError::TooLong { max: max_length });
    }

    let invalid: HashSet<char> = visible
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        .collect();
    if !invalid.is_empty() {
        let mut chars: Vec<char> = invalid.into_iter().collect();
        chars.sort_unstable();
        return Err(NicknameError::InvalidCharacters { chars: chars.into_iter().collect() });
    }

    Ok(translated)
}

/// Remove control characters from a chat line and enforce a byte limit.
pub fn sanitize_chat_message(content: &str, max_bytes: usize) -> Result<String, SecurityError> {
    if content.len() > max_bytes {
        return Err(SecurityError::ContentTooLong { max_length: max_bytes });
    }
    Ok(content.chars().filter(|c| !c.is_control()).collect())
}

/// Validate file size before reading
pub fn validate_file_size(size: u64, max_size: u64) -> Result<(), SecurityError> {
    if size > max_size {
        return Err(SecurityError::FileSizeExceeded {
            limit: max_size as usize,
        });
    }
    Ok(())
}

/// Parse JSON with a size cap, tolerating leading NULs left by interrupted writes.
pub fn secure_json_parse<T>(content: &str, max_bytes: usize) -> Result<T, SecurityError>
where
    T: serde::de::DeserializeOwned,
{
    if content.len() > max_bytes {
        return Err(SecurityError::FileSizeExceeded { limit: max_bytes });
    }
    let normalized = content.trim_start_matches('\0');
    serde_json::from_str(normalized).map_err(|_| SecurityError::InvalidFormat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_colored() {
        assert_eq!(validate_nickname("Steve_2", 16).unwrap(), "Steve_2");
        assert_eq!(validate_nickname("&aGreenGuy", 16).unwrap(), "§aGreenGuy");
    }

    #[test]
    fn length_counts_visible_text() {
        // 16 visible characters plus two color codes
        assert!(validate_nickname("&a&lABCDEFGHIJKLMNOP", 16).is_ok());
        assert_eq!(
            validate_nickname("ABCDEFGHIJKLMNOPQ", 16),
            Err(NicknameError::TooLong { max: 16 })
        );
    }

    #[test]
    fn rejects_symbols_and_empty() {
        assert!(matches!(
            validate_nickname("bad name!", 16),
            Err(NicknameError::InvalidCharacters { .. })
        ));
        assert_eq!(validate_nickname("&c", 16), Err(NicknameError::Empty));
    }

    #[test]
    fn sanitize_strips_control_chars() {
        assert_eq!(sanitize_chat_message("hi\u{7}there\n", 100).unwrap(), "hithere");
        assert!(sanitize_chat_message("toolong", 3).is_err());
    }

    #[test]
    fn json_parse_tolerates_leading_nul() {
        let v: serde_json::Value = secure_json_parse("\0\0{\"a\":1}", 100).unwrap();
        assert_eq!(v["a"], 1);
    }
}
