//! Text cleaning for LaTeX source fragments.
//!
//! Turns raw markup into presentable text: commands are stripped, escaped
//! specials are restored to their literal form, and whitespace is collapsed
//! while line breaks survive. The escape and ligature mappings are plain data
//! held by an [`EscapeTable`] so callers can extend them.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse multiple whitespace characters into one.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

/// Regex to find the first color directive in a fragment.
static COLOR_HINT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:textcolor|color)\s*(?:\[([A-Za-z]+)\])?\s*\{([^}]*)\}|\\alert\b").unwrap()
});

/// Control sequences replaced by fixed text.
const LATEX_ESCAPES: &[(&str, &str)] = &[
    ("%", "%"),
    ("$", "$"),
    ("&", "&"),
    ("#", "#"),
    ("_", "_"),
    ("{", "{"),
    ("}", "}"),
    (" ", " "),
    (",", " "),
    (";", " "),
    ("\\", "\n"),
    ("newline", "\n"),
    ("par", "\n"),
    ("item", "\n\u{2022} "),
    ("textbackslash", "\\"),
    ("textasciitilde", "~"),
    ("textasciicircum", "^"),
    ("textbar", "|"),
    ("textless", "<"),
    ("textgreater", ">"),
    ("ldots", "\u{2026}"),
    ("dots", "\u{2026}"),
    ("textendash", "\u{2013}"),
    ("textemdash", "\u{2014}"),
    ("copyright", "\u{a9}"),
    ("texttrademark", "\u{2122}"),
    ("textregistered", "\u{ae}"),
    ("euro", "\u{20ac}"),
    ("pounds", "\u{a3}"),
    ("S", "\u{a7}"),
    ("LaTeX", "LaTeX"),
    ("TeX", "TeX"),
];

/// Character sequences replaced by typographic equivalents, longest first.
const LATEX_LIGATURES: &[(&str, &str)] = &[
    ("---", "\u{2014}"),
    ("--", "\u{2013}"),
    ("``", "\u{201c}"),
    ("''", "\u{201d}"),
    ("~", " "),
];

/// Commands whose last argument is kept as text, with their argument count.
const LATEX_PASSTHROUGH: &[(&str, usize)] = &[
    ("textbf", 1),
    ("textit", 1),
    ("textsl", 1),
    ("textsc", 1),
    ("textsf", 1),
    ("texttt", 1),
    ("textrm", 1),
    ("textup", 1),
    ("textmd", 1),
    ("textnormal", 1),
    ("emph", 1),
    ("underline", 1),
    ("uline", 1),
    ("alert", 1),
    ("structure", 1),
    ("text", 1),
    ("mbox", 1),
    ("hbox", 1),
    ("url", 1),
    ("footnote", 1),
    ("textcolor", 2),
    ("colorbox", 2),
    ("href", 2),
];

/// Data table driving [`clean_text`].
#[derive(Debug, Clone)]
pub struct EscapeTable {
    escapes: Vec<(String, String)>,
    ligatures: Vec<(String, String)>,
    passthrough: Vec<(String, usize)>,
}

impl EscapeTable {
    /// The standard LaTeX table.
    pub fn latex() -> Self {
        Self {
            escapes: to_owned_pairs(LATEX_ESCAPES),
            ligatures: to_owned_pairs(LATEX_LIGATURES),
            passthrough: LATEX_PASSTHROUGH
                .iter()
                .map(|(name, arity)| (name.to_string(), *arity))
                .collect(),
        }
    }

    /// Add or replace a control sequence mapping.
    pub fn with_escape(mut self, command: &str, replacement: &str) -> Self {
        self.escapes.retain(|(c, _)| c != command);
        self.escapes
            .push((command.to_string(), replacement.to_string()));
        self
    }

    /// Treat `command` as formatting whose last of `arity` arguments is kept.
    pub fn with_passthrough(mut self, command: &str, arity: usize) -> Self {
        self.passthrough.retain(|(c, _)| c != command);
        self.passthrough.push((command.to_string(), arity.max(1)));
        self
    }

    fn escape(&self, command: &str) -> Option<&str> {
        self.escapes
            .iter()
            .find(|(c, _)| c == command)
            .map(|(_, r)| r.as_str())
    }

    fn passthrough_arity(&self, command: &str) -> Option<usize> {
        self.passthrough
            .iter()
            .find(|(c, _)| c == command)
            .map(|(_, n)| *n)
    }

    fn ligature_at(&self, chars: &[char], i: usize) -> Option<(&str, usize)> {
        self.ligatures.iter().find_map(|(pattern, replacement)| {
            let len = pattern.chars().count();
            let matches = i + len <= chars.len()
                && pattern.chars().zip(&chars[i..i + len]).all(|(a, &b)| a == b);
            matches.then_some((replacement.as_str(), len))
        })
    }
}

impl Default for EscapeTable {
    fn default() -> Self {
        Self::latex()
    }
}

fn to_owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

/// Clean a raw LaTeX fragment into presentable text.
///
/// - Escaped specials (`\%`, `\&`, `\_`, ...) come back as literals
/// - Formatting commands keep their text argument
/// - Other commands are removed together with their arguments
/// - Inline math keeps its source verbatim, without the `$` delimiters
/// - Whitespace collapses within lines; empty lines are dropped
pub fn clean_text(raw: &str, table: &EscapeTable) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let stripped = strip_markup(&chars, table);

    let lines: Vec<String> = stripped
        .lines()
        .map(|line| WHITESPACE_COLLAPSE_REGEX.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    lines.join("\n").nfc().collect()
}

/// Clean and flatten to a single line, as used for titles and table cells.
pub fn clean_inline(raw: &str, table: &EscapeTable) -> String {
    clean_text(raw, table)
        .lines()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_markup(chars: &[char], table: &EscapeTable) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let (name, next) = read_command_name(chars, i + 1);
                i = next;
                if name.is_empty() {
                    out.push('\\');
                    continue;
                }

                if let Some(replacement) = table.escape(&name) {
                    out.push_str(replacement);
                } else if let Some(arity) = table.passthrough_arity(&name) {
                    i = skip_optional_args(chars, i);
                    let mut kept = String::new();
                    for _ in 0..arity {
                        match read_group(chars, skip_spaces(chars, i)) {
                            Some((body, end)) => {
                                kept = body;
                                i = end;
                            }
                            None => break,
                        }
                    }
                    let inner: Vec<char> = kept.chars().collect();
                    out.push_str(&strip_markup(&inner, table));
                } else {
                    // Unknown command: drop it with any adjacent arguments.
                    i = skip_optional_args(chars, i);
                    while let Some((_, end)) = read_group(chars, i) {
                        i = end;
                    }
                }
            }
            '$' => {
                let display = chars.get(i + 1) == Some(&'$');
                let start = if display { i + 2 } else { i + 1 };
                match find_math_end(chars, start, display) {
                    Some(end) => {
                        out.extend(&chars[start..end]);
                        i = if display { end + 2 } else { end + 1 };
                    }
                    None => {
                        out.extend(&chars[start..]);
                        i = chars.len();
                    }
                }
            }
            '%' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '{' | '}' => i += 1,
            _ => {
                if let Some((replacement, len)) = table.ligature_at(chars, i) {
                    out.push_str(replacement);
                    i += len;
                } else {
                    out.push(chars[i]);
                    i += 1;
                }
            }
        }
    }

    out
}

/// Read a control sequence name starting right after the backslash.
fn read_command_name(chars: &[char], start: usize) -> (String, usize) {
    match chars.get(start) {
        None => (String::new(), start),
        Some(c) if c.is_ascii_alphabetic() => {
            let mut end = start;
            while end < chars.len() && chars[end].is_ascii_alphabetic() {
                end += 1;
            }
            if chars.get(end) == Some(&'*') {
                end += 1;
            }
            let name: String = chars[start..end].iter().filter(|c| **c != '*').collect();
            (name, end)
        }
        Some(c) => (c.to_string(), start + 1),
    }
}

fn skip_spaces(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
        i += 1;
    }
    i
}

/// Skip `[...]` and `<...>` arguments directly following a command.
fn skip_optional_args(chars: &[char], mut i: usize) -> usize {
    loop {
        let close = match chars.get(i) {
            Some('[') => ']',
            Some('<') => '>',
            _ => return i,
        };
        match chars[i + 1..].iter().position(|c| *c == close) {
            Some(offset) => i += offset + 2,
            None => return i,
        }
    }
}

/// Read a balanced `{...}` group at `start`, returning its body and the index after it.
fn read_group(chars: &[char], start: usize) -> Option<(String, usize)> {
    if chars.get(start) != Some(&'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((chars[start + 1..i].iter().collect(), i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

fn find_math_end(chars: &[char], start: usize, display: bool) -> Option<usize> {
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '$' if !display => return Some(i),
            '$' if chars.get(i + 1) == Some(&'$') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Find the first color directive in a fragment and resolve it to RRGGBB.
///
/// `\alert{...}` counts as red, matching the default Beamer theme.
pub fn color_hint(raw: &str) -> Option<String> {
    let caps = COLOR_HINT_REGEX.captures(raw)?;
    match caps.get(2) {
        Some(spec) => {
            let model = caps.get(1).map(|m| m.as_str());
            match model {
                Some(m) if m.eq_ignore_ascii_case("html") => resolve_hex(spec.as_str()),
                _ => resolve_color(spec.as_str()),
            }
        }
        None => resolve_color("red"),
    }
}

/// Resolve an xcolor name (or `name!percent` mix) or a hex code to RRGGBB.
pub fn resolve_color(spec: &str) -> Option<String> {
    let spec = spec.trim();
    if let Some(hex) = resolve_hex(spec) {
        return Some(hex);
    }

    // Mixes like `red!50!black` use the base color.
    let base = spec.split('!').next().unwrap_or(spec).to_ascii_lowercase();
    let hex = match base.as_str() {
        "black" => "000000",
        "white" => "FFFFFF",
        "red" => "FF0000",
        "green" => "00FF00",
        "blue" => "0000FF",
        "cyan" => "00FFFF",
        "magenta" => "FF00FF",
        "yellow" => "FFFF00",
        "gray" => "808080",
        "darkgray" => "404040",
        "lightgray" => "BFBFBF",
        "orange" => "FF8000",
        "purple" => "BF0040",
        "violet" => "800080",
        "brown" => "BF8040",
        "teal" => "008080",
        "olive" => "808000",
        "lime" => "BFFF00",
        "pink" => "FFBFBF",
        _ => return None,
    };

    Some(hex.to_string())
}

fn resolve_hex(spec: &str) -> Option<String> {
    let digits = spec.trim().trim_start_matches('#');
    (digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| digits.to_ascii_uppercase())
}
