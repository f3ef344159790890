//! Block lexer: turns Markdown source into a flat stream of classified lines.
//!
//! Fence state is the only lexer mode. Inside a fence every line is a
//! `CodeLine` until a closing fence of at least the opening length.

use crate::error::{ParseAnomalies, ParseAnomaly};

/// Maximum `#` run recognized as a heading marker
pub const MAX_HEADING_LEVEL: usize = 6;

/// Minimum backtick run that opens a fenced code block
pub const MIN_FENCE_LEN: usize = 3;

/// One classified source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'src> {
    /// 1-based line number
    pub number: usize,
    /// Leading whitespace width (tab = 4 columns)
    pub indent: usize,
    pub token: LineToken<'src>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineToken<'src> {
    Heading { level: u8, text: &'src str },
    TaskItem { checked: bool, text: &'src str },
    BulletItem { text: &'src str },
    OrderedItem { number: u64, text: &'src str },
    /// Line content after `>` and at most one space
    Quote { text: &'src str },
    FenceOpen { ticks: usize, info: &'src str },
    FenceClose,
    /// Raw line inside a fence
    CodeLine(&'src str),
    Rule,
    Blank,
    /// Trimmed paragraph text
    Text(&'src str),
}

/// Lex a source string into classified lines
pub fn lex_lines<'src>(source: &'src str, anomalies: &mut ParseAnomalies) -> Vec<Line<'src>> {
    let mut lines = Vec::new();
    let mut open_fence: Option<(usize, usize)> = None;

    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        let indent = indent_width(raw);

        let token = match open_fence {
            Some((ticks, _)) => {
                if is_fence_close(raw, ticks) {
                    open_fence = None;
                    LineToken::FenceClose
                } else {
                    LineToken::CodeLine(raw)
                }
            }
            None => {
                let token = classify_line(raw);
                match token {
                    LineToken::FenceOpen { ticks, .. } => open_fence = Some((ticks, number)),
                    LineToken::Text(text) => {
                        if let Some(hashes) = overlong_heading(text) {
                            anomalies.push(ParseAnomaly::HeadingTooDeep {
                                line: number,
                                hashes,
                            });
                        }
                    }
                    _ => {}
                }
                token
            }
        };

        lines.push(Line {
            number,
            indent,
            token,
        });
    }

    if let Some((_, line)) = open_fence {
        anomalies.push(ParseAnomaly::UnclosedFence { line });
    }

    lines
}

/// Classify a single line outside of any fence.
///
/// Rules are tried in priority order; the first match wins.
pub fn classify_line(raw: &str) -> LineToken<'_> {
    let line = raw.trim();
    if line.is_empty() {
        return LineToken::Blank;
    }

    if let Some(token) = heading(line) {
        return token;
    }
    if let Some(token) = task_item(line) {
        return token;
    }
    if let Some(token) = bullet_item(line) {
        return token;
    }
    if let Some(token) = ordered_item(line) {
        return token;
    }
    if line.starts_with('>') {
        return LineToken::Quote {
            text: quote_body(raw),
        };
    }
    if let Some(token) = fence_open(line) {
        return token;
    }
    if is_rule(line) {
        return LineToken::Rule;
    }

    LineToken::Text(line)
}

fn heading(line: &str) -> Option<LineToken<'_>> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > MAX_HEADING_LEVEL {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some(LineToken::Heading {
        level: hashes as u8,
        text: rest.trim(),
    })
}

fn overlong_heading(line: &str) -> Option<usize> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    let rest = &line[hashes..];
    (hashes > MAX_HEADING_LEVEL && (rest.is_empty() || rest.starts_with([' ', '\t'])))
        .then_some(hashes)
}

/// Text after a `-`/`*` bullet marker, if the line has one
fn bullet_body(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('-').or_else(|| line.strip_prefix('*'))?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.starts_with([' ', '\t']).then(|| rest.trim_start())
}

fn task_item(line: &str) -> Option<LineToken<'_>> {
    let body = bullet_body(line)?;
    let checked = if body.starts_with("[ ]") {
        false
    } else if body.starts_with("[x]") || body.starts_with("[X]") {
        true
    } else {
        return None;
    };
    let rest = &body[3..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some(LineToken::TaskItem {
        checked,
        text: rest.trim(),
    })
}

fn bullet_item(line: &str) -> Option<LineToken<'_>> {
    bullet_body(line).map(|text| LineToken::BulletItem { text: text.trim() })
}

fn ordered_item(line: &str) -> Option<LineToken<'_>> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let number = line[..digits].parse().ok()?;
    Some(LineToken::OrderedItem {
        number,
        text: rest.trim(),
    })
}

/// Body of a quote line keeps inner indentation: only the `>` and one space go.
fn quote_body(raw: &str) -> &str {
    let line = raw.trim_start();
    let after_marker = line.strip_prefix('>').unwrap_or(line);
    after_marker.strip_prefix(' ').unwrap_or(after_marker)
}

fn fence_open(line: &str) -> Option<LineToken<'_>> {
    let ticks = line.bytes().take_while(|b| *b == b'`').count();
    if ticks < MIN_FENCE_LEN {
        return None;
    }
    let info = line[ticks..].trim();
    if info.contains('`') {
        return None;
    }
    Some(LineToken::FenceOpen { ticks, info })
}

fn is_fence_close(raw: &str, opening_ticks: usize) -> bool {
    let line = raw.trim();
    let ticks = line.bytes().take_while(|b| *b == b'`').count();
    ticks >= opening_ticks && line[ticks..].trim().is_empty()
}

fn is_rule(line: &str) -> bool {
    let mut chars = line.chars();
    match chars.next() {
        Some(marker @ ('-' | '*' | '_')) => line.len() >= 3 && chars.all(|c| c == marker),
        _ => false,
    }
}

fn indent_width(raw: &str) -> usize {
    raw.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}
