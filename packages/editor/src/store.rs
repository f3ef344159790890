//! Persistence contract for notes, plus an in-memory backend.

use crate::note::{Note, SaveTarget, Tag, TagId};
use crate::search::{search_notes, SearchQuery, SearchResult};
use crate::PersistenceError;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Backend the autosave coordinator persists through.
///
/// Content is always the serialized Markdown string, never a document tree.
/// Implementations must be `Send + Sync`: calls run on spawned tasks.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// `Ok(None)` when no note exists for the date
    async fn load_note(&self, date: NaiveDate) -> Result<Option<Note>, PersistenceError>;

    /// Create (`New`) or update (`Existing`) the note for a date
    async fn save_note(
        &self,
        target: SaveTarget,
        content: &str,
        tag_ids: &BTreeSet<TagId>,
    ) -> Result<Note, PersistenceError>;

    async fn delete_note(&self, date: NaiveDate) -> Result<(), PersistenceError>;
}

#[async_trait]
impl<S: NoteStore + ?Sized> NoteStore for Arc<S> {
    async fn load_note(&self, date: NaiveDate) -> Result<Option<Note>, PersistenceError> {
        (**self).load_note(date).await
    }

    async fn save_note(
        &self,
        target: SaveTarget,
        content: &str,
        tag_ids: &BTreeSet<TagId>,
    ) -> Result<Note, PersistenceError> {
        (**self).save_note(target, content, tag_ids).await
    }

    async fn delete_note(&self, date: NaiveDate) -> Result<(), PersistenceError> {
        (**self).delete_note(date).await
    }
}

/// A `save_note` call as the store received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveCall {
    pub target: SaveTarget,
    pub content: String,
    pub tag_ids: BTreeSet<TagId>,
}

#[derive(Default)]
struct MemoryState {
    notes: BTreeMap<NaiveDate, Note>,
    tags: BTreeMap<TagId, Tag>,
    next_note_id: i64,
    next_tag_id: TagId,
    save_calls: Vec<SaveCall>,
    injected_failures: VecDeque<PersistenceError>,
}

/// In-memory `NoteStore` with optional latency and injected failures
#[derive(Default)]
pub struct MemoryNoteStore {
    state: RwLock<MemoryState>,
    latency: Duration,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`, like a network round trip
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Seed a note directly, bypassing the save log
    pub async fn insert_note(
        &self,
        date: NaiveDate,
        content: impl Into<String>,
        tag_ids: BTreeSet<TagId>,
    ) -> Note {
        let mut state = self.state.write().await;
        state.next_note_id += 1;
        let now = Utc::now();
        let note = Note {
            id: state.next_note_id,
            date,
            content: content.into(),
            tag_ids,
            created_at: now,
            updated_at: now,
        };
        state.notes.insert(date, note.clone());
        note
    }

    /// Create a tag, or return the existing tag with that name
    pub async fn insert_tag(&self, name: &str) -> Tag {
        let mut state = self.state.write().await;
        if let Some(tag) = state.tags.values().find(|tag| tag.name == name) {
            return tag.clone();
        }
        state.next_tag_id += 1;
        let tag = Tag {
            id: state.next_tag_id,
            name: name.to_string(),
        };
        state.tags.insert(tag.id, tag.clone());
        tag
    }

    pub async fn tags(&self) -> Vec<Tag> {
        self.state.read().await.tags.values().cloned().collect()
    }

    /// All notes in date order
    pub async fn notes(&self) -> Vec<Note> {
        self.state.read().await.notes.values().cloned().collect()
    }

    /// Notes matching the query, newest first
    pub async fn search(&self, query: &SearchQuery) -> SearchResult {
        search_notes(self.state.read().await.notes.values(), query)
    }

    pub async fn save_calls(&self) -> Vec<SaveCall> {
        self.state.read().await.save_calls.clone()
    }

    /// Make the next `save_note` call fail with `error`
    pub async fn fail_next_save(&self, error: PersistenceError) {
        self.state.write().await.injected_failures.push_back(error);
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn load_note(&self, date: NaiveDate) -> Result<Option<Note>, PersistenceError> {
        self.simulate_latency().await;
        Ok(self.state.read().await.notes.get(&date).cloned())
    }

    async fn save_note(
        &self,
        target: SaveTarget,
        content: &str,
        tag_ids: &BTreeSet<TagId>,
    ) -> Result<Note, PersistenceError> {
        self.state.write().await.save_calls.push(SaveCall {
            target,
            content: content.to_string(),
            tag_ids: tag_ids.clone(),
        });

        self.simulate_latency().await;

        let mut state = self.state.write().await;
        if let Some(error) = state.injected_failures.pop_front() {
            return Err(error);
        }

        let now = Utc::now();
        match target {
            SaveTarget::New(date) => {
                if state.notes.contains_key(&date) {
                    return Err(PersistenceError::Conflict(date));
                }
                state.next_note_id += 1;
                let note = Note {
                    id: state.next_note_id,
                    date,
                    content: content.to_string(),
                    tag_ids: tag_ids.clone(),
                    created_at: now,
                    updated_at: now,
                };
                state.notes.insert(date, note.clone());
                Ok(note)
            }
            SaveTarget::Existing(date) => {
                let note = state
                    .notes
                    .get_mut(&date)
                    .ok_or(PersistenceError::NotFound(date))?;
                note.content = content.to_string();
                note.tag_ids = tag_ids.clone();
                note.updated_at = now;
                Ok(note.clone())
            }
        }
    }

    async fn delete_note(&self, date: NaiveDate) -> Result<(), PersistenceError> {
        self.simulate_latency().await;
        self.state
            .write()
            .await
            .notes
            .remove(&date)
            .map(|_| ())
            .ok_or(PersistenceError::NotFound(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_update() {
        let store = MemoryNoteStore::new();
        let tags = BTreeSet::from([1]);

        let created = store.save_note(SaveTarget::New(day(1)), "first", &tags).await.unwrap();
        assert_eq!(created.content, "first");

        let updated = store
            .save_note(SaveTarget::Existing(day(1)), "second", &BTreeSet::new())
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.content, "second");
        assert!(updated.tag_ids.is_empty());

        let loaded = store.load_note(day(1)).await.unwrap().unwrap();
        assert_eq!(loaded, updated);
        assert_eq!(store.save_calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_search_sees_saved_content() {
        let store = MemoryNoteStore::new();
        let work = store.insert_tag("work").await;
        store.insert_note(day(1), "Standup", BTreeSet::from([work.id])).await;
        store.insert_note(day(2), "standup moved", BTreeSet::new()).await;
        store.save_note(SaveTarget::New(day(3)), "lunch", &BTreeSet::new()).await.unwrap();

        let result = store.search(&SearchQuery::text("standup")).await;
        let dates: Vec<NaiveDate> = result.notes.iter().map(|note| note.date).collect();
        assert_eq!(dates, vec![day(2), day(1)]);
        assert_eq!(result.total, 2);

        let tagged = store.search(&SearchQuery::default().with_tag(work.id)).await;
        assert_eq!(tagged.notes[0].date, day(1));
        assert_eq!(tagged.total, 1);
    }

    #[tokio::test]
    async fn test_conflict_and_not_found() {
        let store = MemoryNoteStore::new();
        store.insert_note(day(2), "exists", BTreeSet::new()).await;

        let err = store
            .save_note(SaveTarget::New(day(2)), "again", &BTreeSet::new())
            .await
            .unwrap_err();
        assert_eq!(err, PersistenceError::Conflict(day(2)));

        let err = store
            .save_note(SaveTarget::Existing(day(3)), "missing", &BTreeSet::new())
            .await
            .unwrap_err();
        assert_eq!(err, PersistenceError::NotFound(day(3)));

        assert_eq!(store.delete_note(day(3)).await, Err(PersistenceError::NotFound(day(3))));
        assert_eq!(store.delete_note(day(2)).await, Ok(()));
        assert!(store.load_note(day(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let store = MemoryNoteStore::new();
        store
            .fail_next_save(PersistenceError::Network("offline".to_string()))
            .await;

        assert!(store
            .save_note(SaveTarget::New(day(4)), "x", &BTreeSet::new())
            .await
            .is_err());
        assert!(store
            .save_note(SaveTarget::New(day(4)), "x", &BTreeSet::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_tags_are_unique_by_name() {
        let store = MemoryNoteStore::new();
        let work = store.insert_tag("work").await;
        let again = store.insert_tag("work").await;
        let home = store.insert_tag("home").await;

        assert_eq!(work, again);
        assert_ne!(work.id, home.id);
        assert_eq!(store.tags().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_calls() {
        let store = MemoryNoteStore::new().with_latency(Duration::from_millis(300));
        let start = tokio::time::Instant::now();
        store.load_note(day(1)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
