use crate::ast::*;
use crate::lexer::{classify_line, LineToken, MIN_FENCE_LEN};
use crate::parser::parse;

/// Characters a backslash can escape in inline text
const ESCAPABLE: &str = "\\`*_{}[]()#+-.!>|~";

/// Re-render rounds allowed before emphasis is given up on
const MAX_SETTLE_PASSES: usize = 4;

/// Serializer converts a document tree back to Markdown.
///
/// Output is canonical rather than faithful: `-` bullets, ordered lists
/// renumbered from 1, `**`/`*` emphasis (falling back to `__`/`_` where the
/// neighbors require it), one blank line between blocks. Any text that would
/// otherwise re-parse as markup is backslash-escaped.
///
/// A tree the parser could not have produced (or one whose emphasis cannot
/// be written back unambiguously) may read back as a slightly different
/// tree. `serialize` therefore re-renders its own re-parse until the text
/// stops changing, so the string it returns always serializes to itself.
pub struct Serializer {
    bullet: &'static str,
}

/// Surroundings of an inline sequence that affect delimiter choice
#[derive(Debug, Clone, Copy, Default)]
struct InlineContext {
    prev: Option<char>,
    next: Option<char>,
    enclosing: Option<(char, usize)>,
}

impl Serializer {
    pub fn new() -> Self {
        Self { bullet: "-" }
    }

    /// Serialize a Document to Markdown
    pub fn serialize(&self, doc: &Document) -> String {
        let markdown = self.render(doc);
        if let Some(stable) = self.settle(markdown) {
            return stable;
        }

        // Emphasis that keeps re-reading differently is written as plain text
        let plain = strip_emphasis(doc);
        let markdown = self.render(&plain);
        self.settle(markdown.clone()).unwrap_or(markdown)
    }

    /// Re-render `markdown` from its own parse until it is a fixed point
    fn settle(&self, mut markdown: String) -> Option<String> {
        for _ in 0..MAX_SETTLE_PASSES {
            let again = self.render(&parse(&markdown));
            if again == markdown {
                return Some(markdown);
            }
            markdown = again;
        }
        None
    }

    fn render(&self, doc: &Document) -> String {
        self.serialize_blocks(&doc.blocks)
    }

    fn serialize_blocks(&self, blocks: &[Block]) -> String {
        blocks
            .iter()
            .map(|block| self.serialize_block(block))
            .filter(|rendered| !rendered.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn serialize_block(&self, block: &Block) -> String {
        match block {
            Block::Paragraph { content } => self.serialize_paragraph(content),
            Block::Heading { level, content } => {
                let hashes = "#".repeat(usize::from((*level).clamp(1, 6)));
                let text = self.single_line(content);
                if text.is_empty() {
                    hashes
                } else {
                    format!("{} {}", hashes, text)
                }
            }
            Block::BulletList { items } => self.serialize_items(items.iter().map(|item| {
                let text = self.single_line(&item.content);
                if starts_with_checkbox(&text) {
                    format!("{} \\{}", self.bullet, text)
                } else {
                    format!("{} {}", self.bullet, text)
                }
            })),
            Block::OrderedList { items } => {
                self.serialize_items(items.iter().enumerate().map(|(i, item)| {
                    format!("{}. {}", i + 1, self.single_line(&item.content))
                }))
            }
            Block::TaskList { items } => self.serialize_items(items.iter().map(|item| {
                let mark = if item.checked { "x" } else { " " };
                format!(
                    "{} [{}] {}",
                    self.bullet,
                    mark,
                    self.single_line(&item.content)
                )
            })),
            Block::Blockquote { blocks } => self
                .serialize_blocks(blocks)
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Block::CodeBlock { language, text } => serialize_code_block(language.as_deref(), text),
            Block::HorizontalRule => "---".to_string(),
        }
    }

    fn serialize_items(&self, lines: impl Iterator<Item = String>) -> String {
        lines
            .map(|line| line.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn serialize_paragraph(&self, content: &[Inline]) -> String {
        self.render_inlines(content, InlineContext::default())
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(escape_block_marker)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inline content for headings and list items, which hold one line
    fn single_line(&self, content: &[Inline]) -> String {
        self.render_inlines(content, InlineContext::default())
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn render_inlines(&self, nodes: &[Inline], ctx: InlineContext) -> String {
        let nodes: Vec<&Inline> = nodes.iter().filter(|node| !renders_empty(node)).collect();
        let mut output = String::new();

        for (i, node) in nodes.iter().enumerate() {
            let prev = output.chars().next_back().or(ctx.prev);
            let next = match nodes.get(i + 1) {
                Some(sibling) => leading_char(sibling),
                None => ctx.next,
            };

            match node {
                Inline::Text { value } => output.push_str(&escape_text(value)),
                Inline::Code { value } => output.push_str(&render_code(value)),
                Inline::Link { href, label } => output.push_str(&render_link(href, label)),
                Inline::Bold { content } => {
                    output.push_str(&self.render_emphasis(2, content, prev, next, ctx.enclosing))
                }
                Inline::Italic { content } => {
                    output.push_str(&self.render_emphasis(1, content, prev, next, ctx.enclosing))
                }
            }
        }

        output
    }

    /// Wrap content in the first delimiter that will re-parse as the same
    /// emphasis; without one the content is emitted bare.
    fn render_emphasis(
        &self,
        width: usize,
        content: &[Inline],
        prev: Option<char>,
        next: Option<char>,
        enclosing: Option<(char, usize)>,
    ) -> String {
        for marker in ['*', '_'] {
            if prev == Some(marker) || next == Some(marker) || enclosing == Some((marker, width)) {
                continue;
            }
            if marker == '_'
                && (prev.is_some_and(char::is_alphanumeric)
                    || next.is_some_and(char::is_alphanumeric))
            {
                continue;
            }

            let inner = self.render_inlines(
                content,
                InlineContext {
                    prev: Some(marker),
                    next: Some(marker),
                    enclosing: Some((marker, width)),
                },
            );
            let (Some(first), Some(last)) = (inner.chars().next(), inner.chars().next_back()) else {
                return String::new();
            };
            if first.is_whitespace() || last.is_whitespace() || first == marker || last == marker {
                continue;
            }

            let delimiter = marker.to_string().repeat(width);
            return format!("{}{}{}", delimiter, inner, delimiter);
        }

        self.render_inlines(
            content,
            InlineContext {
                prev,
                next,
                enclosing,
            },
        )
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to serialize a document
pub fn serialize(doc: &Document) -> String {
    Serializer::new().serialize(doc)
}

/// Copy of `doc` with every bold/italic node replaced by its content
fn strip_emphasis(doc: &Document) -> Document {
    Document::new(doc.blocks.iter().map(strip_block).collect())
}

fn strip_block(block: &Block) -> Block {
    match block {
        Block::Paragraph { content } => Block::paragraph(strip_inlines(content)),
        Block::Heading { level, content } => Block::heading(*level, strip_inlines(content)),
        Block::BulletList { items } => Block::BulletList {
            items: items
                .iter()
                .map(|item| ListItem::new(strip_inlines(&item.content)))
                .collect(),
        },
        Block::OrderedList { items } => Block::OrderedList {
            items: items
                .iter()
                .map(|item| ListItem::new(strip_inlines(&item.content)))
                .collect(),
        },
        Block::TaskList { items } => Block::TaskList {
            items: items
                .iter()
                .map(|item| TaskItem::new(item.checked, strip_inlines(&item.content)))
                .collect(),
        },
        Block::Blockquote { blocks } => Block::Blockquote {
            blocks: blocks.iter().map(strip_block).collect(),
        },
        Block::CodeBlock { .. } | Block::HorizontalRule => block.clone(),
    }
}

/// Flatten emphasis, merging the text runs that end up adjacent
fn strip_inlines(nodes: &[Inline]) -> Vec<Inline> {
    fn walk(nodes: &[Inline], out: &mut Vec<Inline>) {
        for node in nodes {
            match node {
                Inline::Bold { content } | Inline::Italic { content } => walk(content, out),
                Inline::Text { value } => match out.last_mut() {
                    Some(Inline::Text { value: last }) => last.push_str(value),
                    _ => out.push(node.clone()),
                },
                other => out.push(other.clone()),
            }
        }
    }

    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}

fn serialize_code_block(language: Option<&str>, text: &str) -> String {
    let longest_run = text
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat((longest_run + 1).max(MIN_FENCE_LEN));
    let info = language
        .map(str::trim)
        .filter(|lang| !lang.contains(['`', '\n']))
        .unwrap_or("");

    if text.is_empty() {
        format!("{}{}\n{}", fence, info, fence)
    } else {
        format!("{}{}\n{}\n{}", fence, info, text, fence)
    }
}

/// Escape a paragraph line that would otherwise open a block
fn escape_block_marker(line: &str) -> String {
    match classify_line(line) {
        LineToken::Heading { .. }
        | LineToken::TaskItem { .. }
        | LineToken::BulletItem { .. }
        | LineToken::Quote { .. }
        | LineToken::FenceOpen { .. }
        | LineToken::Rule => format!("\\{}", line),
        LineToken::OrderedItem { .. } => {
            let digits = line.bytes().take_while(u8::is_ascii_digit).count();
            format!("{}\\{}", &line[..digits], &line[digits..])
        }
        _ => line.to_string(),
    }
}

/// Whether a bullet item's text would read back as a task checkbox
fn starts_with_checkbox(text: &str) -> bool {
    ["[ ]", "[x]", "[X]"].iter().any(|checkbox| {
        text.strip_prefix(checkbox)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
    })
}

fn escape_text(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut output = String::with_capacity(value.len());

    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|j| chars[j]);
        let next = chars.get(i + 1).copied();
        let escape = match c {
            '*' | '`' => true,
            // Intraword underscores can never open or close emphasis
            '_' => {
                !(prev.is_some_and(char::is_alphanumeric)
                    && next.is_some_and(char::is_alphanumeric))
            }
            '[' => bracket_may_open_link(&chars[i + 1..]),
            '\\' => next.map_or(true, |n| ESCAPABLE.contains(n)),
            _ => false,
        };
        if escape {
            output.push('\\');
        }
        output.push(c);
    }

    output
}

/// Whether `[` followed by `rest` could be read back as the start of a link
fn bracket_may_open_link(rest: &[char]) -> bool {
    match rest.iter().position(|c| *c == ']' || *c == '\n') {
        Some(i) if rest[i] == '\n' => false,
        Some(i) => !matches!(rest.get(i + 1), Some(c) if *c != '('),
        None => true,
    }
}

fn code_span_fits(value: &str) -> bool {
    !value.is_empty() && !value.contains(['`', '\n'])
}

fn render_code(value: &str) -> String {
    if code_span_fits(value) {
        format!("`{}`", value)
    } else {
        escape_text(value)
    }
}

fn link_fits(href: &str, label: &str) -> bool {
    !label.contains([']', '\n']) && !href.contains(|c: char| c == ')' || c.is_whitespace())
}

fn render_link(href: &str, label: &str) -> String {
    if link_fits(href, label) {
        format!("[{}]({})", label, href)
    } else {
        escape_text(label)
    }
}

fn renders_empty(node: &Inline) -> bool {
    match node {
        Inline::Text { value } | Inline::Code { value } => value.is_empty(),
        Inline::Bold { content } | Inline::Italic { content } => content.iter().all(renders_empty),
        Inline::Link { href, label } => label.is_empty() && !link_fits(href, label),
    }
}

/// First character a node will render as. Emphasis reports its first visible
/// character since it may render without markers.
fn leading_char(node: &Inline) -> Option<char> {
    match node {
        Inline::Text { value } => escape_text(value).chars().next(),
        Inline::Code { value } if code_span_fits(value) => Some('`'),
        Inline::Code { value } => escape_text(value).chars().next(),
        Inline::Link { href, label } if link_fits(href, label) => Some('['),
        Inline::Link { label, .. } => escape_text(label).chars().next(),
        Inline::Bold { content } | Inline::Italic { content } => {
            inline_text(content).chars().next()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(content: Vec<Inline>) -> Document {
        Document::new(vec![Block::paragraph(content)])
    }

    #[test]
    fn test_serialize_blocks() {
        let doc = Document::new(vec![
            Block::heading(2, vec![Inline::text("Plans")]),
            Block::TaskList {
                items: vec![
                    TaskItem::new(true, vec![Inline::text("gym")]),
                    TaskItem::new(false, vec![Inline::text("read")]),
                ],
            },
            Block::OrderedList {
                items: vec![
                    ListItem::new(vec![Inline::text("one")]),
                    ListItem::new(vec![Inline::text("two")]),
                ],
            },
            Block::HorizontalRule,
        ]);

        assert_eq!(
            serialize(&doc),
            "## Plans\n\n- [x] gym\n- [ ] read\n\n1. one\n2. two\n\n---"
        );
    }

    #[test]
    fn test_serialize_emphasis() {
        let doc = para(vec![
            Inline::bold(vec![Inline::text("bold")]),
            Inline::text(" and "),
            Inline::italic(vec![Inline::text("it")]),
        ]);
        assert_eq!(serialize(&doc), "**bold** and *it*");
    }

    #[test]
    fn test_adjacent_emphasis_switches_marker() {
        let doc = para(vec![
            Inline::bold(vec![Inline::text("a")]),
            Inline::bold(vec![Inline::text("b")]),
        ]);
        let markdown = serialize(&doc);
        assert_eq!(markdown, "**a**__b__");
        assert_eq!(parse(&markdown), doc);
    }

    #[test]
    fn test_literal_markup_is_escaped() {
        let doc = para(vec![Inline::text("2 * 3 = `six` [not](a link)")]);
        let markdown = serialize(&doc);
        assert_eq!(markdown, r"2 \* 3 = \`six\` \[not](a link)");
        assert_eq!(parse(&markdown), doc);
    }

    #[test]
    fn test_intraword_underscore_not_escaped() {
        let doc = para(vec![Inline::text("snake_case but _this")]);
        assert_eq!(serialize(&doc), r"snake_case but \_this");
    }

    #[test]
    fn test_block_markers_in_text_are_escaped() {
        let doc = para(vec![Inline::text("# not heading\n- not bullet\n1. not ordered\n> no")]);
        let markdown = serialize(&doc);
        assert_eq!(
            markdown,
            "\\# not heading\n\\- not bullet\n1\\. not ordered\n\\> no"
        );
        assert_eq!(parse(&markdown), doc);
    }

    #[test]
    fn test_code_block_fence_outgrows_content() {
        let doc = Document::new(vec![Block::CodeBlock {
            language: Some("md".to_string()),
            text: "```\ninner\n```".to_string(),
        }]);
        let markdown = serialize(&doc);
        assert_eq!(markdown, "````md\n```\ninner\n```\n````");
        assert_eq!(parse(&markdown), doc);
    }

    #[test]
    fn test_blockquote_prefixes_lines() {
        let doc = Document::new(vec![Block::Blockquote {
            blocks: vec![
                Block::paragraph(vec![Inline::text("first")]),
                Block::paragraph(vec![Inline::text("second")]),
            ],
        }]);
        assert_eq!(serialize(&doc), "> first\n>\n> second");
    }

    #[test]
    fn test_bullet_that_looks_like_task() {
        let doc = Document::new(vec![Block::BulletList {
            items: vec![ListItem::new(vec![Inline::text("[x] literal")])],
        }]);
        let markdown = serialize(&doc);
        assert_eq!(markdown, r"- \[x] literal");
        assert_eq!(parse(&markdown), doc);
    }

    #[test]
    fn test_unrepresentable_nodes_fall_back_to_text() {
        let doc = para(vec![
            Inline::code("has ` tick"),
            Inline::text(" "),
            Inline::link("has space", "label"),
        ]);
        assert_eq!(serialize(&doc), r"has \` tick label");
    }

    fn assert_fixed_point(source: &str) -> String {
        let once = serialize(&parse(source));
        assert_eq!(serialize(&parse(&once)), once, "unstable for {:?}", source);
        once
    }

    #[test]
    fn test_bracket_before_escaped_star_is_stable() {
        assert_eq!(assert_fixed_point("[a*]b"), r"[a\*]b");
        assert_eq!(assert_fixed_point(r"[a\*]b"), r"[a\*]b");
        assert_eq!(assert_fixed_point("[not a link"), r"\[not a link");
    }

    #[test]
    fn test_markerless_emphasis_settles() {
        assert_fixed_point("\\**[x]*1");
        assert_fixed_point("__bb)___**_");
        assert_fixed_point("*_a_*_b_");
    }

    #[test]
    fn test_output_serializes_to_itself() {
        let doc = para(vec![
            Inline::text("*"),
            Inline::italic(vec![Inline::text("[x]")]),
            Inline::text("1"),
        ]);
        let markdown = serialize(&doc);
        assert_eq!(serialize(&parse(&markdown)), markdown);
    }

    #[test]
    fn test_strip_emphasis_merges_text() {
        let doc = para(vec![
            Inline::text("a "),
            Inline::bold(vec![Inline::text("b "), Inline::italic(vec![Inline::code("c")])]),
            Inline::text(" d"),
        ]);
        assert_eq!(
            strip_emphasis(&doc),
            para(vec![Inline::text("a b "), Inline::code("c"), Inline::text(" d")])
        );
    }

    #[test]
    fn test_empty_nodes_are_skipped() {
        let doc = Document::new(vec![
            Block::paragraph(vec![]),
            Block::BulletList { items: vec![] },
            Block::paragraph(vec![Inline::bold(vec![])]),
            Block::paragraph(vec![Inline::text("kept")]),
        ]);
        assert_eq!(serialize(&doc), "kept");
    }
}
