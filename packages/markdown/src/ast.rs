use serde::{Deserialize, Serialize};

/// Root document node: blocks in reading order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Visible text of the whole document, one line per block.
    ///
    /// Markup, link targets and list markers are dropped; code block text is kept.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            block.collect_text(&mut lines);
        }
        lines.join("\n")
    }
}

/// Block-level node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Paragraph {
        content: Vec<Inline>,
    },
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    BulletList {
        items: Vec<ListItem>,
    },
    OrderedList {
        items: Vec<ListItem>,
    },
    TaskList {
        items: Vec<TaskItem>,
    },
    Blockquote {
        blocks: Vec<Block>,
    },
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    HorizontalRule,
}

impl Block {
    pub fn paragraph(content: Vec<Inline>) -> Self {
        Block::Paragraph { content }
    }

    /// Heading with the level clamped into `1..=6`
    pub fn heading(level: u8, content: Vec<Inline>) -> Self {
        Block::Heading {
            level: level.clamp(1, 6),
            content,
        }
    }

    fn collect_text(&self, lines: &mut Vec<String>) {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => {
                lines.push(inline_text(content));
            }
            Block::BulletList { items } | Block::OrderedList { items } => {
                lines.extend(items.iter().map(|item| inline_text(&item.content)));
            }
            Block::TaskList { items } => {
                lines.extend(items.iter().map(|item| inline_text(&item.content)));
            }
            Block::Blockquote { blocks } => {
                for block in blocks {
                    block.collect_text(lines);
                }
            }
            Block::CodeBlock { text, .. } => lines.push(text.clone()),
            Block::HorizontalRule => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub content: Vec<Inline>,
}

impl ListItem {
    pub fn new(content: Vec<Inline>) -> Self {
        Self { content }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub checked: bool,
    pub content: Vec<Inline>,
}

impl TaskItem {
    pub fn new(checked: bool, content: Vec<Inline>) -> Self {
        Self { checked, content }
    }
}

/// Inline run inside a paragraph, heading or list item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inline {
    Text { value: String },
    Bold { content: Vec<Inline> },
    Italic { content: Vec<Inline> },
    Code { value: String },
    Link { href: String, label: String },
}

impl Inline {
    pub fn text(value: impl Into<String>) -> Self {
        Inline::Text {
            value: value.into(),
        }
    }

    pub fn bold(content: Vec<Inline>) -> Self {
        Inline::Bold { content }
    }

    pub fn italic(content: Vec<Inline>) -> Self {
        Inline::Italic { content }
    }

    pub fn code(value: impl Into<String>) -> Self {
        Inline::Code {
            value: value.into(),
        }
    }

    pub fn link(href: impl Into<String>, label: impl Into<String>) -> Self {
        Inline::Link {
            href: href.into(),
            label: label.into(),
        }
    }
}

/// Visible text of an inline sequence
pub fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_inline_text(inlines, &mut out);
    out
}

fn push_inline_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text { value } | Inline::Code { value } => out.push_str(value),
            Inline::Bold { content } | Inline::Italic { content } => {
                push_inline_text(content, out)
            }
            Inline::Link { label, .. } => out.push_str(label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_drops_markup() {
        let doc = Document::new(vec![
            Block::heading(1, vec![Inline::text("Monday")]),
            Block::paragraph(vec![
                Inline::text("Met "),
                Inline::bold(vec![Inline::text("Ana")]),
                Inline::text(" at "),
                Inline::link("https://cafe.example", "the cafe"),
            ]),
            Block::TaskList {
                items: vec![TaskItem::new(true, vec![Inline::text("call mom")])],
            },
        ]);

        assert_eq!(doc.plain_text(), "Monday\nMet Ana at the cafe\ncall mom");
    }

    #[test]
    fn test_heading_level_is_clamped() {
        assert_eq!(
            Block::heading(9, vec![]),
            Block::Heading {
                level: 6,
                content: vec![]
            }
        );
        assert_eq!(
            Block::heading(0, vec![]),
            Block::Heading {
                level: 1,
                content: vec![]
            }
        );
    }

    #[test]
    fn test_tree_serializes_with_type_tags() {
        let block = Block::CodeBlock {
            language: Some("rust".to_string()),
            text: "fn main() {}".to_string(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "codeBlock");
        assert_eq!(json["language"], "rust");

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }
}
