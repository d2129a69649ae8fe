use std::collections::BTreeMap;
use std::iter;

use crate::justify::HJust;
use crate::width::{char_width, plain_width};

/// Style token that returns the terminal to its default attributes.
pub const RESET_STYLE: &str = "normal";

/// A row of text with inline `{name}` style tokens extracted.
///
/// Offsets are character positions into the plain text. A style recorded at
/// offset `n` becomes active right before the `n`th character; offsets equal
/// to the plain length describe tokens trailing the last character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    plain: Vec<char>,
    styles: BTreeMap<usize, String>,
    last_style: Option<String>,
}

/// Rendered views of a (possibly windowed) row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    /// Visible characters only.
    pub plain: String,
    /// Visible characters interleaved with the style tokens that apply.
    pub markup: String,
    /// Markup with literal braces doubled and a closing reset, ready for
    /// placeholder expansion by the terminal provider.
    pub display: String,
    /// Style in effect at the end of the row, if any.
    pub last_style: Option<String>,
}

impl Markup {
    /// Parse marked-up text. Malformed tokens are kept as literal text and
    /// control characters become blanks.
    pub fn parse(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut markup = Self::default();
        let mut idx = 0;
        while idx < chars.len() {
            if chars[idx] == '{' {
                if let Some((name, consumed)) = scan_token(&chars[idx..]) {
                    markup.push_style(name);
                    idx += consumed;
                    continue;
                }
            }
            markup.plain.push(printable(chars[idx]));
            idx += 1;
        }
        markup
    }

    pub fn plain(&self) -> String {
        self.plain.iter().collect()
    }

    /// Number of visible characters.
    pub fn len(&self) -> usize {
        self.plain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plain.is_empty()
    }

    /// Terminal columns taken by the visible characters.
    pub fn width(&self) -> usize {
        self.plain.iter().copied().map(char_width).sum()
    }

    /// Offset to style map, in ascending offset order.
    pub fn styles(&self) -> &BTreeMap<usize, String> {
        &self.styles
    }

    /// The last style token seen in the source text.
    pub fn last_style(&self) -> Option<&str> {
        self.last_style.as_deref()
    }

    /// Render the characters in `[start, end)`.
    ///
    /// The style active at `start` is re-emitted at the head of the window,
    /// and when tokens exist at or past `end` the final one is emitted after
    /// the last character so a truncated row still ends in the state the full
    /// row would have left.
    pub fn window(&self, start: usize, end: usize) -> Line {
        let end = end.min(self.plain.len());
        let start = start.min(end);
        let mut out = LineBuilder::default();

        if !self.styles.contains_key(&start) {
            if let Some(style) = self.active_before(start) {
                out.style(style);
            }
        }
        for offset in start..end {
            if let Some(style) = self.styles.get(&offset) {
                out.style(style);
            }
            out.text(self.plain[offset]);
        }
        if let Some((_, style)) = self.styles.range(end..).next_back() {
            out.style(style);
        }
        out.finish()
    }

    /// Truncate or pad to exactly `width` columns.
    pub fn fit(&self, width: usize, hjust: HJust) -> Line {
        let mut used = 0;
        let mut cut = 0;
        for &ch in &self.plain {
            let w = char_width(ch);
            if used + w > width {
                break;
            }
            used += w;
            cut += 1;
        }

        let (left, right) = hjust.split(width - used);
        let mut plain = Vec::with_capacity(left + cut + right);
        plain.extend(iter::repeat_n(' ', left));
        plain.extend_from_slice(&self.plain[..cut]);
        plain.extend(iter::repeat_n(' ', right));

        // Styles from the start of the row also cover the left padding, and
        // anything at or past the cut lands right after the last kept char.
        let mut styles = BTreeMap::new();
        for (&offset, style) in &self.styles {
            let shifted = match offset {
                0 => 0,
                o if o < cut => o + left,
                _ => cut + left,
            };
            styles.insert(shifted, style.clone());
        }

        let padded = Self {
            plain,
            styles,
            last_style: self.last_style.clone(),
        };
        padded.window(0, padded.plain.len())
    }

    fn push_style(&mut self, name: String) {
        if self.last_style.as_deref() == Some(name.as_str()) {
            return;
        }
        let offset = self.plain.len();
        if self.active_before(offset) == Some(name.as_str()) {
            self.styles.remove(&offset);
        } else {
            self.styles.insert(offset, name.clone());
        }
        self.last_style = Some(name);
    }

    fn active_before(&self, offset: usize) -> Option<&str> {
        self.styles
            .range(..offset)
            .next_back()
            .map(|(_, style)| style.as_str())
    }
}

impl Line {
    /// Parse and render a whole row.
    pub fn full(text: &str) -> Self {
        let markup = Markup::parse(text);
        markup.window(0, markup.len())
    }

    /// Parse a row and fit it to exactly `width` columns.
    pub fn fit(text: &str, width: usize, hjust: HJust) -> Self {
        Markup::parse(text).fit(width, hjust)
    }

    /// Tile `text` to exactly `width` columns, cutting the final repetition.
    ///
    /// Styles inside the pattern are replayed on every repetition. Text with
    /// no visible columns tiles to blanks.
    pub fn repeat_to_width(text: &str, width: usize) -> Self {
        let source = Markup::parse(text);
        let mut tiled = Markup::default();
        let mut used = 0;

        if source.width() > 0 {
            'tiling: loop {
                for (offset, &ch) in source.plain.iter().enumerate() {
                    let w = char_width(ch);
                    if used + w > width {
                        break 'tiling;
                    }
                    if let Some(style) = source.styles.get(&offset) {
                        tiled.push_style(style.clone());
                    }
                    tiled.plain.push(ch);
                    used += w;
                }
                if let Some(style) = source.styles.get(&source.plain.len()) {
                    tiled.push_style(style.clone());
                }
            }
        }

        tiled.plain.extend(iter::repeat_n(' ', width - used));
        tiled.window(0, tiled.plain.len())
    }

    /// Terminal columns taken by the visible text.
    pub fn width(&self) -> usize {
        plain_width(&self.plain)
    }
}

#[derive(Default)]
struct LineBuilder {
    plain: String,
    markup: String,
    display: String,
    active: Option<String>,
}

impl LineBuilder {
    fn style(&mut self, style: &str) {
        if self.active.as_deref() == Some(style) {
            return;
        }
        let token = format!("{{{style}}}");
        self.markup.push_str(&token);
        self.display.push_str(&token);
        self.active = Some(style.to_string());
    }

    fn text(&mut self, ch: char) {
        self.plain.push(ch);
        self.markup.push(ch);
        if ch == '{' || ch == '}' {
            self.display.push(ch);
        }
        self.display.push(ch);
    }

    fn finish(mut self) -> Line {
        if self.active.as_deref() != Some(RESET_STYLE) {
            self.display.push('{');
            self.display.push_str(RESET_STYLE);
            self.display.push('}');
        }
        Line {
            plain: self.plain,
            markup: self.markup,
            display: self.display,
            last_style: self.active,
        }
    }
}

/// Tabs, escapes and other control characters would move the cursor out
/// of the row's rectangle, so each one occupies a single blank column.
fn printable(ch: char) -> char {
    if ch.is_control() { ' ' } else { ch }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}

/// Recognise `{name}` at the head of `chars`, returning the name and the
/// number of characters consumed.
fn scan_token(chars: &[char]) -> Option<(String, usize)> {
    let name_len = chars[1..].iter().take_while(|&&ch| is_name_char(ch)).count();
    if name_len == 0 || chars.get(name_len + 1) != Some(&'}') {
        return None;
    }
    Some((chars[1..=name_len].iter().collect(), name_len + 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_round_trips_with_reset() {
        let line = Line::full("simple line of text");
        assert_eq!(line.plain, "simple line of text");
        assert_eq!(line.markup, line.plain);
        assert_eq!(line.display, "simple line of text{normal}");
        assert_eq!(line.last_style, None);
    }

    #[test]
    fn lone_token() {
        let line = Line::full("{green}");
        assert_eq!(line.plain, "");
        assert_eq!(line.markup, "{green}");
        assert_eq!(line.display, "{green}{normal}");
        assert_eq!(line.last_style.as_deref(), Some("green"));
    }

    #[test]
    fn stacked_tokens_keep_only_the_last() {
        let line = Line::full("abc{green}{blue}");
        assert_eq!(line.plain, "abc");
        assert_eq!(line.markup, "abc{blue}");
        assert_eq!(line.display, "abc{blue}{normal}");
    }

    #[test]
    fn adjacent_duplicates_collapse() {
        assert_eq!(Markup::parse("{green}{green}x"), Markup::parse("{green}x"));
        let line = Line::full("{red}x{red}y");
        assert_eq!(line.markup, "{red}xy");
    }

    #[test]
    fn malformed_tokens_are_literal_and_escaped() {
        let text = "{green}{}{}}{blac{yellow}k justp{cyan}laintext{pink}x";
        let line = Line::full(text);
        assert_eq!(line.plain, "{}{}}{black justplaintextx");
        assert_eq!(line.markup, text);
        assert_eq!(
            line.display,
            "{green}{{}}{{}}}}{{blac{yellow}k justp{cyan}laintext{pink}x{normal}"
        );
        assert_eq!(line.last_style.as_deref(), Some("pink"));

        let broken = Line::full("green}xyz");
        assert_eq!(broken.plain, "green}xyz");
        assert_eq!(broken.display, "green}}xyz{normal}");
    }

    #[test]
    fn trailing_reset_is_not_doubled() {
        let text = "hi there, {red}Red{normal}!";
        let line = Line::full(text);
        assert_eq!(line.plain, "hi there, Red!");
        assert_eq!(line.display, text);
        assert_eq!(line.last_style.as_deref(), Some("normal"));
    }

    #[test]
    fn truncation_keeps_style_in_flight() {
        let markup = Markup::parse("{red}abcdef");
        let line = markup.window(0, 3);
        assert_eq!(line.plain, "abc");
        assert_eq!(line.display, "{red}abc{normal}");
    }

    #[test]
    fn window_reapplies_style_active_at_start() {
        let markup = Markup::parse("{red}ab{green}cd{blue}ef");
        let line = markup.window(1, 3);
        assert_eq!(line.plain, "bc");
        assert_eq!(line.markup, "{red}b{green}c{blue}");
        assert_eq!(line.last_style.as_deref(), Some("blue"));

        let at_token = markup.window(2, 4);
        assert_eq!(at_token.markup, "{green}cd{blue}");
    }

    #[test]
    fn fit_pads_according_to_justification() {
        assert_eq!(Line::fit("ab", 6, HJust::Start).plain, "ab    ");
        assert_eq!(Line::fit("ab", 6, HJust::Center).plain, "  ab  ");
        assert_eq!(Line::fit("ab", 6, HJust::End).plain, "    ab");
        assert_eq!(Line::fit("abcdef", 3, HJust::End).plain, "abc");
    }

    #[test]
    fn fit_styles_cover_padding() {
        let line = Line::fit("{red}ab", 4, HJust::End);
        assert_eq!(line.display, "{red}  ab{normal}");
        let trailing = Line::fit("ab{blue}", 4, HJust::Start);
        assert_eq!(trailing.markup, "ab{blue}  ");
    }

    #[test]
    fn fit_replaces_straddling_wide_char_with_space() {
        let line = Line::fit("a日本", 4, HJust::Start);
        assert_eq!(line.plain, "a日 ");
        assert_eq!(line.width(), 4);
    }

    #[test]
    fn repeat_tiles_and_cuts() {
        assert_eq!(Line::repeat_to_width("ab", 5).plain, "ababa");
        let colored = Line::repeat_to_width("{red}-{blue}=", 3);
        assert_eq!(colored.markup, "{red}-{blue}={red}-");
        assert_eq!(Line::repeat_to_width("", 3).plain, "   ");
        assert_eq!(Line::repeat_to_width("xyz", 0).plain, "");
    }

    #[test]
    fn control_characters_render_as_blanks() {
        let line = Line::fit("a\tb\u{1b}[2Jc", 6, HJust::Start);
        assert_eq!(line.plain, "a b [2");
        assert_eq!(line.width(), 6);
        assert!(!line.display.chars().any(char::is_control));
        assert_eq!(Markup::parse("\u{7}x").width(), 2);
    }
}
