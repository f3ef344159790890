//! # Editor Session
//!
//! Save bookkeeping for the one note being edited: baseline, pending edits,
//! dirty flag, save phase and status.
//!
//! The session is a plain state machine with no clock and no I/O. The
//! coordinator owns the timers and calls into it. Single-flight is the
//! `phase` field: `begin_save` only succeeds from `Phase::Idle` and hands out
//! a ticket that `complete_save` must present to settle.

use crate::note::{Note, SaveTarget, TagId};
use crate::status::SaveStatus;
use crate::{EditorError, PersistenceError};
use chrono::NaiveDate;
use daybook_markdown::{serialize, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// What an edit did to the dirty flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Differs from the baseline: (re)arm the debounce timer
    Dirty,
    /// Back at the baseline: disarm it
    Clean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    Debounce,
    Manual,
}

/// Why a save was not issued. Skips are silent, never errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveSkip {
    #[error("a save or delete is already in flight")]
    InFlight,

    #[error("new note has no content")]
    EmptyNewNote,

    #[error("nothing changed since the last save")]
    Unchanged,
}

/// Proof of an issued save, carrying exactly what was sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    seq: u64,
    pub target: SaveTarget,
    pub content: String,
    pub tag_ids: BTreeSet<TagId>,
}

impl SaveTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Holds the sequence number of the outstanding ticket
    Saving(u64),
    Deleting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveSettled {
    /// `dirty` is true when edits arrived while the save was in flight
    Saved { dirty: bool },
    Failed,
    /// Ticket no longer matches the phase; nothing changed
    Stale,
}

/// Read-only view for the host UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// `None` while no note is open
    pub target: Option<SaveTarget>,
    pub content: String,
    pub tag_ids: BTreeSet<TagId>,
    pub dirty: bool,
    pub saving: bool,
    pub deleting: bool,
    pub status: SaveStatus,
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    target: SaveTarget,
    last_saved_content: String,
    last_saved_tags: BTreeSet<TagId>,
    pending_content: String,
    selected_tag_ids: BTreeSet<TagId>,
    dirty: bool,
    phase: Phase,
    status: SaveStatus,
    next_seq: u64,
}

impl EditorSession {
    /// Pristine session for `date`, seeded from its note when one exists
    pub fn open(date: NaiveDate, note: Option<&Note>) -> Self {
        let (target, content, tags) = match note {
            Some(note) => (
                SaveTarget::Existing(date),
                note.content.clone(),
                note.tag_ids.clone(),
            ),
            None => (SaveTarget::New(date), String::new(), BTreeSet::new()),
        };

        Self {
            target,
            last_saved_content: content.clone(),
            last_saved_tags: tags.clone(),
            pending_content: content,
            selected_tag_ids: tags,
            dirty: false,
            phase: Phase::Idle,
            status: SaveStatus::Idle,
            next_seq: 0,
        }
    }

    pub fn target(&self) -> SaveTarget {
        self.target
    }

    pub fn pending_content(&self) -> &str {
        &self.pending_content
    }

    pub fn selected_tag_ids(&self) -> &BTreeSet<TagId> {
        &self.selected_tag_ids
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    pub fn edit_content(&mut self, content: impl Into<String>) -> EditOutcome {
        self.pending_content = content.into();
        self.recompute_dirty()
    }

    /// Serialize the tree and record it as the pending content
    pub fn edit_document(&mut self, document: &Document) -> EditOutcome {
        self.edit_content(serialize(document))
    }

    pub fn toggle_tag(&mut self, tag_id: TagId) -> EditOutcome {
        if !self.selected_tag_ids.remove(&tag_id) {
            self.selected_tag_ids.insert(tag_id);
        }
        self.recompute_dirty()
    }

    pub fn set_tags(&mut self, tag_ids: impl IntoIterator<Item = TagId>) -> EditOutcome {
        self.selected_tag_ids = tag_ids.into_iter().collect();
        self.recompute_dirty()
    }

    /// Claim the single-flight slot for a save of the pending state
    pub fn begin_save(&mut self, trigger: SaveTrigger) -> Result<SaveTicket, SaveSkip> {
        if self.phase != Phase::Idle {
            return Err(SaveSkip::InFlight);
        }
        if !self.target.exists() && self.pending_content.trim().is_empty() {
            return Err(SaveSkip::EmptyNewNote);
        }
        if self.pending_content == self.last_saved_content
            && self.selected_tag_ids == self.last_saved_tags
        {
            return Err(SaveSkip::Unchanged);
        }

        self.next_seq += 1;
        let ticket = SaveTicket {
            seq: self.next_seq,
            target: self.target,
            content: self.pending_content.clone(),
            tag_ids: self.selected_tag_ids.clone(),
        };
        self.phase = Phase::Saving(ticket.seq);
        self.status = SaveStatus::Saving;
        tracing::debug!(note = %self.target, seq = ticket.seq, ?trigger, "save started");
        Ok(ticket)
    }

    pub fn complete_save(
        &mut self,
        ticket: &SaveTicket,
        result: Result<&Note, &PersistenceError>,
    ) -> SaveSettled {
        if self.phase != Phase::Saving(ticket.seq) {
            return SaveSettled::Stale;
        }
        self.phase = Phase::Idle;

        match result {
            Ok(note) => {
                self.target = SaveTarget::Existing(note.date);
                self.last_saved_content = ticket.content.clone();
                self.last_saved_tags = ticket.tag_ids.clone();
                self.recompute_dirty();
                self.status = SaveStatus::Success;
                SaveSettled::Saved { dirty: self.dirty }
            }
            Err(_) => {
                self.recompute_dirty();
                self.status = SaveStatus::Error;
                SaveSettled::Failed
            }
        }
    }

    /// Claim the single-flight slot for deleting the note
    pub fn begin_delete(&mut self) -> Result<NaiveDate, EditorError> {
        if !self.target.exists() {
            return Err(EditorError::NoActiveNote);
        }
        if self.phase != Phase::Idle {
            return Err(EditorError::InFlight);
        }
        self.phase = Phase::Deleting;
        self.status = SaveStatus::Saving;
        Ok(self.target.date())
    }

    /// On success the session becomes a pristine new note for the same date
    pub fn complete_delete(&mut self, result: Result<(), &PersistenceError>) -> bool {
        if self.phase != Phase::Deleting {
            return false;
        }

        match result {
            Ok(()) => {
                *self = Self::open(self.target.date(), None);
                true
            }
            Err(_) => {
                self.phase = Phase::Idle;
                self.status = SaveStatus::Error;
                false
            }
        }
    }

    /// Drop a timed status back to idle. A running save keeps `Saving`.
    pub fn clear_status(&mut self) {
        if matches!(self.status, SaveStatus::Success | SaveStatus::Error) {
            self.status = SaveStatus::Idle;
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            target: Some(self.target),
            content: self.pending_content.clone(),
            tag_ids: self.selected_tag_ids.clone(),
            dirty: self.dirty,
            saving: matches!(self.phase, Phase::Saving(_)),
            deleting: self.phase == Phase::Deleting,
            status: self.status,
        }
    }

    fn recompute_dirty(&mut self) -> EditOutcome {
        self.dirty = self.pending_content != self.last_saved_content
            || self.selected_tag_ids != self.last_saved_tags;
        if self.dirty {
            EditOutcome::Dirty
        } else {
            EditOutcome::Clean
        }
    }
}
