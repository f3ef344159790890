//! Content and tag search over notes

use crate::note::{Note, TagId};
use serde::{Deserialize, Serialize};

/// Both filters are optional; an empty query matches every note
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Case-insensitive substring of the Markdown content
    pub text: Option<String>,
    pub tag_id: Option<TagId>,
}

impl SearchQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tag_id: None,
        }
    }

    pub fn with_tag(mut self, tag_id: TagId) -> Self {
        self.tag_id = Some(tag_id);
        self
    }

    pub fn matches(&self, note: &Note) -> bool {
        if let Some(tag_id) = self.tag_id {
            if !note.tag_ids.contains(&tag_id) {
                return false;
            }
        }
        match self.text.as_deref() {
            Some(text) if !text.is_empty() => {
                note.content.to_lowercase().contains(&text.to_lowercase())
            }
            _ => true,
        }
    }
}

/// Matching notes, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub notes: Vec<Note>,
    pub total: usize,
}

pub fn search_notes<'a>(
    notes: impl IntoIterator<Item = &'a Note>,
    query: &SearchQuery,
) -> SearchResult {
    let mut notes: Vec<Note> = notes
        .into_iter()
        .filter(|note| query.matches(note))
        .cloned()
        .collect();
    notes.sort_by(|a, b| b.date.cmp(&a.date));

    SearchResult {
        total: notes.len(),
        notes,
    }
}

/// Visible text of a note on one line, cut to `max_chars`
pub fn preview(note: &Note, max_chars: usize) -> String {
    let text = note.document().plain_text();
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= max_chars {
        return line;
    }

    let mut cut: String = line.chars().take(max_chars).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}
