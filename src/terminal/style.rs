use std::collections::HashMap;

use crossterm::Command;
use crossterm::style::{Attribute, Color, SetAttribute, SetBackgroundColor, SetForegroundColor};

use crate::line::RESET_STYLE;

/// Named style tokens and the escape sequences they expand to.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    styles: HashMap<String, String>,
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self::standard()
    }
}

const COLORS: [(&str, Color, Color); 8] = [
    ("black", Color::Black, Color::DarkGrey),
    ("red", Color::DarkRed, Color::Red),
    ("green", Color::DarkGreen, Color::Green),
    ("yellow", Color::DarkYellow, Color::Yellow),
    ("blue", Color::DarkBlue, Color::Blue),
    ("magenta", Color::DarkMagenta, Color::Magenta),
    ("cyan", Color::DarkCyan, Color::Cyan),
    ("white", Color::Grey, Color::White),
];

fn ansi(command: impl Command) -> String {
    let mut out = String::new();
    let _ = command.write_ansi(&mut out);
    out
}

impl StyleSheet {
    /// Named colors (`red`, `bright_red`, `on_red`), `gray`, text attributes
    /// and the `normal` reset.
    pub fn standard() -> Self {
        let mut sheet = Self::empty();
        for (name, base, bright) in COLORS {
            sheet.insert(name, ansi(SetForegroundColor(base)));
            sheet.insert(format!("bright_{name}"), ansi(SetForegroundColor(bright)));
            sheet.insert(format!("on_{name}"), ansi(SetBackgroundColor(base)));
            sheet.insert(format!("on_bright_{name}"), ansi(SetBackgroundColor(bright)));
        }
        sheet.insert("gray", ansi(SetForegroundColor(Color::DarkGrey)));
        sheet.insert("grey", ansi(SetForegroundColor(Color::DarkGrey)));
        sheet.insert("bold", ansi(SetAttribute(Attribute::Bold)));
        sheet.insert("dim", ansi(SetAttribute(Attribute::Dim)));
        sheet.insert("italic", ansi(SetAttribute(Attribute::Italic)));
        sheet.insert("underline", ansi(SetAttribute(Attribute::Underlined)));
        sheet.insert("reverse", ansi(SetAttribute(Attribute::Reverse)));
        sheet.insert(RESET_STYLE, ansi(SetAttribute(Attribute::Reset)));
        sheet
    }

    pub fn empty() -> Self {
        Self {
            styles: HashMap::new(),
        }
    }

    /// Register or override a style.
    pub fn insert(&mut self, name: impl Into<String>, sequence: impl Into<String>) {
        self.styles.insert(name.into(), sequence.into());
    }

    pub fn sequence(&self, name: &str) -> Option<&str> {
        self.styles.get(name).map(String::as_str)
    }

    /// Turn a display row into terminal output. Unknown styles expand to
    /// nothing.
    pub fn expand(&self, display: &str) -> String {
        scan(display, |name| self.sequence(name).unwrap_or(""))
    }

    /// The visible text of a display row.
    pub fn strip(display: &str) -> String {
        scan(display, |_| "")
    }
}

fn scan<'a>(display: &str, mut style: impl FnMut(&str) -> &'a str) -> String {
    let mut out = String::with_capacity(display.len());
    let mut rest = display;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
        } else if let Some(close) = tail.strip_prefix('{').and_then(|t| t.find('}')) {
            out.push_str(style(&tail[1..=close]));
            rest = &tail[close + 2..];
        } else {
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
