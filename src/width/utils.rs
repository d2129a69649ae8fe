//! Terminal display width helpers.
//!
//! Markup parsing counts columns per character, while expanded terminal
//! output is measured after stripping ANSI escapes.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Compute the display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    UnicodeWidthStr::width(&*clean_str)
}

/// Columns occupied by a single character. Control characters take none.
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

/// Columns occupied by plain (escape-free) text.
pub fn plain_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}
