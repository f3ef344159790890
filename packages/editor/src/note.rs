//! Note model shared with the backend

use chrono::{DateTime, NaiveDate, Utc};
use daybook_markdown::{parse, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub type TagId = i64;

/// One day's note. At most one note exists per date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub date: NaiveDate,
    /// Canonical Markdown
    pub content: String,
    #[serde(default)]
    pub tag_ids: BTreeSet<TagId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Content as a document tree
    pub fn document(&self) -> Document {
        parse(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// Where a save goes: update the note for a date, or create it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "date", rename_all = "camelCase")]
pub enum SaveTarget {
    Existing(NaiveDate),
    New(NaiveDate),
}

impl SaveTarget {
    pub fn date(&self) -> NaiveDate {
        match self {
            SaveTarget::Existing(date) | SaveTarget::New(date) => *date,
        }
    }

    pub fn exists(&self) -> bool {
        matches!(self, SaveTarget::Existing(_))
    }
}

impl fmt::Display for SaveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveTarget::Existing(date) => write!(f, "{}", date),
            SaveTarget::New(date) => write!(f, "new ({})", date),
        }
    }
}
