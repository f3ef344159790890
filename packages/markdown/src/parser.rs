//! Recursive-descent builder from classified lines and inline tokens to a
//! `Document`.
//!
//! Parsing is total: unmatched delimiters degrade to literal text, nested
//! lists and continuation lines are flattened, and each such case is recorded
//! as a `ParseAnomaly` instead of failing.

use crate::ast::{Block, Document, Inline, ListItem, TaskItem};
use crate::error::{ParseAnomalies, ParseAnomaly};
use crate::lexer::{lex_lines, Line, LineToken};
use crate::tokenizer::{split_link, tokenize, Token};
use std::collections::HashSet;
use std::ops::Range;

/// Deepest blockquote nesting kept as structure
pub const MAX_QUOTE_DEPTH: usize = 16;

/// Deepest emphasis nesting kept as structure
pub const MAX_EMPHASIS_DEPTH: usize = 16;

/// A parsed document together with everything that was repaired on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutput {
    pub document: Document,
    pub anomalies: ParseAnomalies,
}

/// Parse Markdown into a document tree. Never fails.
pub fn parse(source: &str) -> Document {
    parse_with_diagnostics(source).document
}

/// Parse Markdown and keep the anomaly report
pub fn parse_with_diagnostics(source: &str) -> ParseOutput {
    let mut parser = Parser::new(source);
    let document = parser.parse_document();
    ParseOutput {
        document,
        anomalies: parser.anomalies,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Ordered,
    Task,
}

/// Kind, checkbox state and text of a list item line
fn list_item<'a>(token: &LineToken<'a>) -> Option<(ListKind, bool, &'a str)> {
    match *token {
        LineToken::BulletItem { text } => Some((ListKind::Bullet, false, text)),
        LineToken::OrderedItem { text, .. } => Some((ListKind::Ordered, false, text)),
        LineToken::TaskItem { checked, text } => Some((ListKind::Task, checked, text)),
        _ => None,
    }
}

pub struct Parser<'src> {
    lines: Vec<Line<'src>>,
    pos: usize,
    depth: usize,
    anomalies: ParseAnomalies,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self::nested(source, 0, 0)
    }

    /// Parser for a quote body whose first line sits `line_offset` lines into
    /// the enclosing source
    fn nested(source: &'src str, line_offset: usize, depth: usize) -> Self {
        let mut anomalies = ParseAnomalies::new();
        let mut lines = lex_lines(source, &mut anomalies);
        for line in &mut lines {
            line.number += line_offset;
        }
        anomalies.shift_lines(line_offset);

        Self {
            lines,
            pos: 0,
            depth,
            anomalies,
        }
    }

    pub fn parse_document(&mut self) -> Document {
        Document::new(self.parse_blocks())
    }

    pub fn anomalies(&self) -> &ParseAnomalies {
        &self.anomalies
    }

    fn parse_blocks(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();

        while let Some(line) = self.peek() {
            let block = match line.token {
                // Code lines and closers only exist inside a fence, which
                // `parse_code_block` consumes whole
                LineToken::Blank | LineToken::FenceClose | LineToken::CodeLine(_) => {
                    self.advance();
                    continue;
                }
                LineToken::Heading { level, text } => {
                    self.advance();
                    Block::heading(level, self.parse_inlines(text, line.number))
                }
                LineToken::Rule => {
                    self.advance();
                    Block::HorizontalRule
                }
                LineToken::FenceOpen { info, .. } => self.parse_code_block(info),
                LineToken::Quote { .. } => self.parse_blockquote(),
                LineToken::TaskItem { .. } => self.parse_list(ListKind::Task),
                LineToken::BulletItem { .. } => self.parse_list(ListKind::Bullet),
                LineToken::OrderedItem { .. } => self.parse_list(ListKind::Ordered),
                LineToken::Text(_) => self.parse_paragraph(),
            };
            blocks.push(block);
        }

        blocks
    }

    fn parse_paragraph(&mut self) -> Block {
        let first_line = self.peek().map_or(1, |line| line.number);
        let mut text = String::new();

        while let Some(Line {
            token: LineToken::Text(line),
            ..
        }) = self.peek()
        {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(line);
            self.advance();
        }

        Block::paragraph(self.parse_inlines(&text, first_line))
    }

    fn parse_list(&mut self, kind: ListKind) -> Block {
        // (checked, text, line number)
        let mut entries: Vec<(bool, String, usize)> = Vec::new();
        let mut base_indent: Option<usize> = None;

        while let Some(line) = self.peek() {
            if let Some((item_kind, checked, text)) = list_item(&line.token) {
                let base = *base_indent.get_or_insert(line.indent);
                let nested = line.indent > base + 1;
                if !nested && item_kind != kind {
                    break;
                }
                if nested {
                    self.anomalies.push(ParseAnomaly::NestedListFlattened { line: line.number });
                }
                entries.push((checked, text.to_string(), line.number));
                self.advance();
                continue;
            }

            match (line.token, entries.last_mut()) {
                (LineToken::Text(text), Some((_, item, _))) if line.indent > 0 => {
                    self.anomalies.push(ParseAnomaly::ContinuationFlattened { line: line.number });
                    if !item.is_empty() {
                        item.push(' ');
                    }
                    item.push_str(text);
                    self.advance();
                }
                _ => break,
            }
        }

        match kind {
            ListKind::Task => Block::TaskList {
                items: entries
                    .into_iter()
                    .map(|(checked, text, number)| {
                        TaskItem::new(checked, self.parse_inlines(&text, number))
                    })
                    .collect(),
            },
            ListKind::Bullet | ListKind::Ordered => {
                let items = entries
                    .into_iter()
                    .map(|(_, text, number)| ListItem::new(self.parse_inlines(&text, number)))
                    .collect();
                if kind == ListKind::Bullet {
                    Block::BulletList { items }
                } else {
                    Block::OrderedList { items }
                }
            }
        }
    }

    fn parse_blockquote(&mut self) -> Block {
        let first_line = self.peek().map_or(1, |line| line.number);
        let mut body = String::new();
        let mut count = 0;

        while let Some(Line {
            token: LineToken::Quote { text },
            ..
        }) = self.peek()
        {
            if count > 0 {
                body.push('\n');
            }
            body.push_str(text);
            count += 1;
            self.advance();
        }

        if self.depth >= MAX_QUOTE_DEPTH {
            let text = body
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            return Block::paragraph(self.parse_inlines(&text, first_line));
        }

        let mut inner = Parser::nested(&body, first_line - 1, self.depth + 1);
        let blocks = inner.parse_blocks();
        self.anomalies.extend(inner.anomalies);
        Block::Blockquote { blocks }
    }

    fn parse_code_block(&mut self, info: &str) -> Block {
        self.advance();
        let mut lines = Vec::new();

        while let Some(line) = self.peek() {
            match line.token {
                LineToken::CodeLine(text) => {
                    lines.push(text);
                    self.advance();
                }
                LineToken::FenceClose => {
                    self.advance();
                    break;
                }
                _ => break,
            }
        }

        Block::CodeBlock {
            language: (!info.is_empty()).then(|| info.to_string()),
            text: lines.join("\n"),
        }
    }

    fn parse_inlines(&mut self, text: &str, first_line: usize) -> Vec<Inline> {
        let mut inline = InlineParser::new(text, first_line);
        let content = inline.parse();
        self.anomalies.extend(inline.anomalies);
        content
    }

    // Helper methods

    fn peek(&self) -> Option<Line<'src>> {
        self.lines.get(self.pos).copied()
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }
}

/// Emphasis delimiter: `*`/`_`, single (italic) or double (bold)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Delimiter {
    marker: char,
    width: usize,
}

impl Delimiter {
    fn from_token(token: &Token<'_>) -> Option<Self> {
        let (marker, width) = match token {
            Token::DoubleStar => ('*', 2),
            Token::DoubleUnderscore => ('_', 2),
            Token::Star => ('*', 1),
            Token::Underscore => ('_', 1),
            _ => return None,
        };
        Some(Self { marker, width })
    }

    fn literal(&self) -> &'static str {
        match (self.marker, self.width) {
            ('*', 2) => "**",
            ('_', 2) => "__",
            ('*', _) => "*",
            _ => "_",
        }
    }

    fn wrap(&self, content: Vec<Inline>) -> Inline {
        if self.width == 2 {
            Inline::bold(content)
        } else {
            Inline::italic(content)
        }
    }
}

/// Accumulates inline nodes, merging adjacent text
#[derive(Default)]
struct InlineRun {
    nodes: Vec<Inline>,
    text: String,
}

impl InlineRun {
    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn push(&mut self, node: Inline) {
        self.flush();
        self.nodes.push(node);
    }

    fn push_token(&mut self, token: Token<'_>) {
        match token {
            Token::Code(value) => self.push(Inline::code(value)),
            Token::Link(slice) => {
                let (label, href) = split_link(slice);
                self.push(Inline::link(href, label));
            }
            other => self.push_text(other.literal()),
        }
    }

    fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.text.is_empty()
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.nodes.push(Inline::text(std::mem::take(&mut self.text)));
        }
    }

    fn finish(mut self) -> Vec<Inline> {
        self.flush();
        self.nodes
    }
}

/// Inline parser over logos tokens with backtracking emphasis matching
struct InlineParser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    first_line: usize,
    depth: usize,
    /// Openers already known to have no closer
    failed: HashSet<(usize, Delimiter)>,
    anomalies: Vec<ParseAnomaly>,
}

impl<'src> InlineParser<'src> {
    fn new(source: &'src str, first_line: usize) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            first_line,
            depth: 0,
            failed: HashSet::new(),
            anomalies: Vec::new(),
        }
    }

    fn parse(&mut self) -> Vec<Inline> {
        self.parse_until(None).unwrap_or_default()
    }

    /// Parse until `closer` closes the current emphasis, or to the end of
    /// input at top level. `None` means the closer never showed up.
    fn parse_until(&mut self, closer: Option<Delimiter>) -> Option<Vec<Inline>> {
        let mut run = InlineRun::default();

        while let Some((token, span)) = self.tokens.get(self.pos).cloned() {
            self.pos += 1;

            let Some(delimiter) = Delimiter::from_token(&token) else {
                run.push_token(token);
                continue;
            };

            if closer == Some(delimiter) && !run.is_empty() && self.can_close(delimiter, &span) {
                return Some(run.finish());
            }

            match self.try_emphasis(delimiter, &span) {
                Some(content) => run.push(delimiter.wrap(content)),
                None => run.push_text(delimiter.literal()),
            }
        }

        match closer {
            Some(_) => None,
            None => Some(run.finish()),
        }
    }

    fn try_emphasis(&mut self, delimiter: Delimiter, span: &Range<usize>) -> Option<Vec<Inline>> {
        if self.depth >= MAX_EMPHASIS_DEPTH || !self.can_open(delimiter, span) {
            return None;
        }
        let start = self.pos;
        if self.failed.contains(&(start, delimiter)) {
            return None;
        }

        self.depth += 1;
        let content = self.parse_until(Some(delimiter));
        self.depth -= 1;

        if content.is_none() {
            self.pos = start;
            self.failed.insert((start, delimiter));
            self.anomalies.push(ParseAnomaly::UnmatchedDelimiter {
                line: self.line_of(span.start),
                delimiter: delimiter.literal().to_string(),
            });
        }
        content
    }

    fn can_open(&self, delimiter: Delimiter, span: &Range<usize>) -> bool {
        let Some(next) = self.char_after(span) else {
            return false;
        };
        if next.is_whitespace() {
            return false;
        }
        delimiter.marker != '_' || !self.char_before(span).is_some_and(char::is_alphanumeric)
    }

    fn can_close(&self, delimiter: Delimiter, span: &Range<usize>) -> bool {
        let Some(prev) = self.char_before(span) else {
            return false;
        };
        if prev.is_whitespace() {
            return false;
        }
        delimiter.marker != '_' || !self.char_after(span).is_some_and(char::is_alphanumeric)
    }

    fn char_before(&self, span: &Range<usize>) -> Option<char> {
        self.source[..span.start].chars().next_back()
    }

    fn char_after(&self, span: &Range<usize>) -> Option<char> {
        self.source[span.end..].chars().next()
    }

    fn line_of(&self, offset: usize) -> usize {
        self.first_line + self.source[..offset].matches('\n').count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inlines(source: &str) -> Vec<Inline> {
        match parse(source).blocks.into_iter().next() {
            Some(Block::Paragraph { content }) => content,
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let doc = parse("# Monday\n\nWoke up early.\nWent running.");
        assert_eq!(
            doc.blocks,
            vec![
                Block::heading(1, vec![Inline::text("Monday")]),
                Block::paragraph(vec![Inline::text("Woke up early.\nWent running.")]),
            ]
        );
    }

    #[test]
    fn test_emphasis_nesting() {
        assert_eq!(
            inlines("a **bold _and italic_** b"),
            vec![
                Inline::text("a "),
                Inline::bold(vec![
                    Inline::text("bold "),
                    Inline::italic(vec![Inline::text("and italic")]),
                ]),
                Inline::text(" b"),
            ]
        );
    }

    #[test]
    fn test_unmatched_delimiter_is_literal() {
        let output = parse_with_diagnostics("2 **3 * 4");
        assert_eq!(
            output.document.blocks,
            vec![Block::paragraph(vec![Inline::text("2 **3 * 4")])]
        );
        assert_eq!(
            output.anomalies.anomalies,
            vec![ParseAnomaly::UnmatchedDelimiter {
                line: 1,
                delimiter: "**".to_string()
            }]
        );
    }

    #[test]
    fn test_intraword_underscore_stays_text() {
        let output = parse_with_diagnostics("snake_case_name");
        assert_eq!(
            output.document.blocks,
            vec![Block::paragraph(vec![Inline::text("snake_case_name")])]
        );
        assert!(output.anomalies.is_empty());
    }

    #[test]
    fn test_code_and_links() {
        assert_eq!(
            inlines("run `**x**` then see [docs](https://d.dev)"),
            vec![
                Inline::text("run "),
                Inline::code("**x**"),
                Inline::text(" then see "),
                Inline::link("https://d.dev", "docs"),
            ]
        );
    }

    #[test]
    fn test_escapes_become_text() {
        assert_eq!(inlines(r"\*not italic\*"), vec![Inline::text("*not italic*")]);
    }

    #[test]
    fn test_lists_group_by_kind() {
        let doc = parse("- a\n- b\n1. one\n- [x] done\n- [ ] todo");
        assert_eq!(
            doc.blocks,
            vec![
                Block::BulletList {
                    items: vec![
                        ListItem::new(vec![Inline::text("a")]),
                        ListItem::new(vec![Inline::text("b")]),
                    ]
                },
                Block::OrderedList {
                    items: vec![ListItem::new(vec![Inline::text("one")])]
                },
                Block::TaskList {
                    items: vec![
                        TaskItem::new(true, vec![Inline::text("done")]),
                        TaskItem::new(false, vec![Inline::text("todo")]),
                    ]
                },
            ]
        );
    }

    #[test]
    fn test_blank_line_splits_lists() {
        let doc = parse("- a\n\n- b");
        assert_eq!(doc.blocks.len(), 2);
    }

    #[test]
    fn test_nested_list_is_flattened() {
        let output = parse_with_diagnostics("- parent\n  - child\n  1. numbered");
        assert_eq!(
            output.document.blocks,
            vec![Block::BulletList {
                items: vec![
                    ListItem::new(vec![Inline::text("parent")]),
                    ListItem::new(vec![Inline::text("child")]),
                    ListItem::new(vec![Inline::text("numbered")]),
                ]
            }]
        );
        assert_eq!(
            output.anomalies.anomalies,
            vec![
                ParseAnomaly::NestedListFlattened { line: 2 },
                ParseAnomaly::NestedListFlattened { line: 3 },
            ]
        );
    }

    #[test]
    fn test_continuation_line_joins_item() {
        let output = parse_with_diagnostics("- buy milk\n  and bread\nafter");
        assert_eq!(
            output.document.blocks,
            vec![
                Block::BulletList {
                    items: vec![ListItem::new(vec![Inline::text("buy milk and bread")])]
                },
                Block::paragraph(vec![Inline::text("after")]),
            ]
        );
        assert_eq!(
            output.anomalies.anomalies,
            vec![ParseAnomaly::ContinuationFlattened { line: 2 }]
        );
    }

    #[test]
    fn test_blockquote_holds_blocks() {
        let doc = parse("> # Quote\n> body\n>\n> - item");
        assert_eq!(
            doc.blocks,
            vec![Block::Blockquote {
                blocks: vec![
                    Block::heading(1, vec![Inline::text("Quote")]),
                    Block::paragraph(vec![Inline::text("body")]),
                    Block::BulletList {
                        items: vec![ListItem::new(vec![Inline::text("item")])]
                    },
                ]
            }]
        );
    }

    #[test]
    fn test_nested_quote_anomaly_lines_are_absolute() {
        let output = parse_with_diagnostics("intro\n\n> fine\n> **open");
        assert_eq!(
            output.anomalies.anomalies,
            vec![ParseAnomaly::UnmatchedDelimiter {
                line: 4,
                delimiter: "**".to_string()
            }]
        );
    }

    #[test]
    fn test_code_block_keeps_text_verbatim() {
        let doc = parse("```rust\nfn main() {\n    # not heading\n}\n```");
        assert_eq!(
            doc.blocks,
            vec![Block::CodeBlock {
                language: Some("rust".to_string()),
                text: "fn main() {\n    # not heading\n}".to_string(),
            }]
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let output = parse_with_diagnostics("```\nstill code\n# still code");
        assert_eq!(
            output.document.blocks,
            vec![Block::CodeBlock {
                language: None,
                text: "still code\n# still code".to_string(),
            }]
        );
        assert_eq!(
            output.anomalies.anomalies,
            vec![ParseAnomaly::UnclosedFence { line: 1 }]
        );
    }

    #[test]
    fn test_horizontal_rule() {
        let doc = parse("above\n\n---\n\nbelow");
        assert_eq!(doc.blocks[1], Block::HorizontalRule);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }

    #[test]
    fn test_pathological_nesting_is_bounded() {
        let source = "> ".repeat(200) + "deep";
        let doc = parse(&source);
        assert!(doc.plain_text().ends_with("deep"));

        let source = "**a ".repeat(500);
        let doc = parse(&source);
        assert_eq!(doc.plain_text(), source.trim_end());
    }
}
