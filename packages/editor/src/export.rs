//! Markdown and JSON exports of a whole journal

use crate::note::{Note, Tag, TagId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Which notes an export covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportScope {
    All,
    Selected(BTreeSet<NaiveDate>),
}

impl ExportScope {
    pub fn includes(&self, date: NaiveDate) -> bool {
        match self {
            ExportScope::All => true,
            ExportScope::Selected(dates) => dates.contains(&date),
        }
    }
}

/// A rendered export file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownExport {
    pub filename: String,
    pub content: String,
}

/// Backup payload: every note and tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub notes: Vec<Note>,
    pub tags: Vec<Tag>,
    pub exported_at: DateTime<Utc>,
}

/// Render notes in date order as one Markdown document.
///
/// Notes outside `scope` are left out; tags are listed by name, and tag ids
/// with no matching tag are ignored.
pub fn render_export(
    notes: &[Note],
    tags: &[Tag],
    scope: &ExportScope,
    exported_at: DateTime<Utc>,
) -> MarkdownExport {
    let tag_names: HashMap<TagId, &str> = tags
        .iter()
        .map(|tag| (tag.id, tag.name.as_str()))
        .collect();

    let mut selected: Vec<&Note> = notes
        .iter()
        .filter(|note| scope.includes(note.date))
        .collect();
    selected.sort_by_key(|note| note.date);

    let mut content = String::new();
    match scope {
        ExportScope::All => content.push_str("# DayBook Export\n\n"),
        ExportScope::Selected(_) => content.push_str("# DayBook Export (Selected Notes)\n\n"),
    }
    content.push_str(&format!(
        "Exported on: {} UTC\n\n",
        exported_at.format("%Y-%m-%d %H:%M:%S")
    ));
    if let ExportScope::Selected(_) = scope {
        content.push_str(&format!("**Number of notes:** {}\n\n", selected.len()));
    }
    content.push_str("---\n\n");

    for note in selected {
        content.push_str(&format!("## {}\n\n", note.date.format("%Y-%m-%d")));

        let mut names: Vec<&str> = note
            .tag_ids
            .iter()
            .filter_map(|id| tag_names.get(id).copied())
            .collect();
        names.sort_unstable();
        if !names.is_empty() {
            let tags = names
                .iter()
                .map(|name| format!("#{}", name))
                .collect::<Vec<_>>()
                .join(", ");
            content.push_str(&format!("**Tags:** {}\n\n", tags));
        }

        content.push_str(&note.content);
        content.push_str("\n\n---\n\n");
    }

    let prefix = match scope {
        ExportScope::All => "daybook_export",
        ExportScope::Selected(_) => "daybook_selected",
    };

    MarkdownExport {
        filename: format!("{}_{}.md", prefix, exported_at.format("%Y%m%d_%H%M%S")),
        content,
    }
}

/// Notes in date order and tags in name order
pub fn export_data(notes: &[Note], tags: &[Tag], exported_at: DateTime<Utc>) -> ExportData {
    let mut notes = notes.to_vec();
    notes.sort_by_key(|note| note.date);
    let mut tags = tags.to_vec();
    tags.sort_by(|a, b| a.name.cmp(&b.name));

    ExportData {
        notes,
        tags,
        exported_at,
    }
}
