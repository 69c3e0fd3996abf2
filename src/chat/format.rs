//! Minecraft-style formatting codes.
//!
//! Chat text carries color and style as a section sign followed by one code
//! character (`§a`, `§r`, ...). Configuration and language files use an
//! alternate, typeable character (normally `&`) that is translated on load.

pub const COLOR_CHAR: char = '§';

pub const GRAY: &str = "§7";
pub const GOLD: &str = "§6";
pub const WHITE: &str = "§f";
pub const RESET: &str = "§r";

const CODES: &str = "0123456789AaBbCcDdEeFfKkLlMmNnOoRr";

/// Replace `alt` followed by a valid code character with the section sign.
///
/// `&&` or `&` before a non-code character is left untouched.
pub fn translate_color_codes(alt: char, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == alt {
            if let Some(&next) = chars.peek() {
                if CODES.contains(next) {
                    out.push(COLOR_CHAR);
                    out.push(next.to_ascii_lowercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Remove every formatting sequence (section sign plus the following character).
pub fn strip_colors(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == COLOR_CHAR {
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_valid_codes_only() {
        assert_eq!(translate_color_codes('&', "&aGreen &zNope"), "§aGreen &zNope");
        assert_eq!(translate_color_codes('&', "&L"), "§l");
        assert_eq!(translate_color_codes('&', "trailing &"), "trailing &");
    }

    #[test]
    fn strips_section_sequences() {
        assert_eq!(strip_colors("§7[Shout]§r hi"), "[Shout] hi");
        assert_eq!(strip_colors("dangling§"), "dangling");
    }
}
