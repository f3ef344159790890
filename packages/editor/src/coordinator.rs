//! # Autosave Coordinator
//!
//! A tokio actor that owns the active `EditorSession` and its timers.
//!
//! ```text
//!   handle ──Command──►┐
//!                      │   ┌──────────────────────────────┐
//!   debounce deadline ─┼──►│ select! loop                 │──► watch<SessionSnapshot>
//!   status deadline  ──┤   │  EditorSession state machine │
//!                      │   └──────────────┬───────────────┘
//!   Settlement ───────►┘                  │ spawn
//!        ▲                                ▼
//!        └──────────── NoteStore::save_note / delete_note
//! ```
//!
//! All transitions run inside the actor, so session state needs no locks.
//! Store calls run on spawned tasks and report back as settlements tagged
//! with the session id and ticket; a settlement for a session that has since
//! been torn down only reaches the caller that asked for it.

use crate::note::{Note, TagId};
use crate::session::{
    EditOutcome, EditorSession, SaveSettled, SaveSkip, SaveTicket, SaveTrigger, SessionSnapshot,
};
use crate::store::NoteStore;
use crate::{AutosaveConfig, EditorError, PersistenceError};
use chrono::NaiveDate;
use daybook_markdown::{serialize, Document};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Result of a manual save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Note),
    Skipped(SaveSkip),
}

type Reply<T> = oneshot::Sender<Result<T, EditorError>>;

enum Command {
    SelectDate {
        date: NaiveDate,
        reply: Reply<Option<Note>>,
    },
    Edit(String),
    ToggleTag(TagId),
    SetTags(BTreeSet<TagId>),
    SaveNow {
        reply: Reply<SaveOutcome>,
    },
    Delete {
        reply: Reply<()>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown,
}

enum Settlement {
    Save {
        session_id: u64,
        ticket: SaveTicket,
        result: Result<Note, PersistenceError>,
    },
    Delete {
        session_id: u64,
        result: Result<(), PersistenceError>,
    },
}

/// Handle to a running coordinator. Dropping it stops the actor.
pub struct AutosaveCoordinator<S: NoteStore + 'static> {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<()>,
    _store: PhantomData<fn() -> S>,
}

impl<S: NoteStore + 'static> AutosaveCoordinator<S> {
    /// Start the actor on the current tokio runtime
    pub fn spawn(store: Arc<S>, config: AutosaveConfig) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (settlements, settlement_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(SessionSnapshot::default());

        let actor = Actor {
            store,
            config,
            session: None,
            session_id: 0,
            debounce_at: None,
            status_revert_at: None,
            settlements,
            save_waiters: Vec::new(),
            delete_waiters: Vec::new(),
            snapshots: snapshot_tx,
        };
        let task = tokio::spawn(actor.run(command_rx, settlement_rx));

        Self {
            commands,
            snapshots,
            task,
            _store: PhantomData,
        }
    }

    /// Tear down the current session, then load `date` and open a fresh one.
    /// Unsaved edits of the old session are discarded.
    pub async fn select_date(&self, date: NaiveDate) -> Result<Option<Note>, EditorError> {
        self.request(|reply| Command::SelectDate { date, reply }).await
    }

    pub fn edit(&self, content: impl Into<String>) -> Result<(), EditorError> {
        self.send(Command::Edit(content.into()))
    }

    /// Serialize the tree and submit it as an edit
    pub fn edit_document(&self, document: &Document) -> Result<(), EditorError> {
        self.edit(serialize(document))
    }

    pub fn toggle_tag(&self, tag_id: TagId) -> Result<(), EditorError> {
        self.send(Command::ToggleTag(tag_id))
    }

    pub fn set_tags(&self, tag_ids: impl IntoIterator<Item = TagId>) -> Result<(), EditorError> {
        self.send(Command::SetTags(tag_ids.into_iter().collect()))
    }

    /// Save immediately. Skips come back as `Ok(SaveOutcome::Skipped(..))`;
    /// a failed save is an error after the status has moved to `Error`.
    pub async fn save_now(&self) -> Result<SaveOutcome, EditorError> {
        self.request(|reply| Command::SaveNow { reply }).await
    }

    /// Delete the open note, leaving a pristine new-note session for the
    /// same date
    pub async fn delete_note(&self) -> Result<(), EditorError> {
        self.request(|reply| Command::Delete { reply }).await
    }

    /// Snapshot after every command sent so far has been applied
    pub async fn snapshot(&self) -> Result<SessionSnapshot, EditorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        rx.await.map_err(|_| EditorError::CoordinatorClosed)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Stop the actor and wait for it to exit. Saves already in flight still
    /// reach the store.
    pub async fn shutdown(self) -> Result<(), EditorError> {
        self.send(Command::Shutdown)?;
        self.task.await.map_err(|_| EditorError::CoordinatorClosed)
    }

    fn send(&self, command: Command) -> Result<(), EditorError> {
        self.commands
            .send(command)
            .map_err(|_| EditorError::CoordinatorClosed)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, EditorError> {
        let (reply, rx) = oneshot::channel();
        self.send(command(reply))?;
        rx.await.map_err(|_| EditorError::CoordinatorClosed)?
    }
}

struct Actor<S: NoteStore + 'static> {
    store: Arc<S>,
    config: AutosaveConfig,
    session: Option<EditorSession>,
    /// Bumped on every teardown so late settlements can be told apart
    session_id: u64,
    debounce_at: Option<Instant>,
    status_revert_at: Option<Instant>,
    settlements: mpsc::UnboundedSender<Settlement>,
    /// Manual-save callers by (session id, ticket seq)
    save_waiters: Vec<(u64, u64, Reply<SaveOutcome>)>,
    delete_waiters: Vec<(u64, Reply<()>)>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl<S: NoteStore + 'static> Actor<S> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut settlements: mpsc::UnboundedReceiver<Settlement>,
    ) {
        loop {
            let debounce_at = self.debounce_at;
            let status_revert_at = self.status_revert_at;

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(settlement) = settlements.recv() => self.handle_settlement(settlement),
                _ = wait_until(debounce_at) => {
                    self.debounce_at = None;
                    self.start_save(SaveTrigger::Debounce, None);
                }
                _ = wait_until(status_revert_at) => {
                    self.status_revert_at = None;
                    if let Some(session) = self.session.as_mut() {
                        session.clear_status();
                    }
                    self.publish();
                }
            }
        }

        self.debounce_at = None;
        self.status_revert_at = None;
        debug!("autosave coordinator stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SelectDate { date, reply } => {
                let result = self.select_date(date).await;
                let _ = reply.send(result);
            }
            Command::Edit(content) => self.apply_edit(|session| session.edit_content(content)),
            Command::ToggleTag(tag_id) => self.apply_edit(|session| session.toggle_tag(tag_id)),
            Command::SetTags(tag_ids) => self.apply_edit(|session| session.set_tags(tag_ids)),
            Command::SaveNow { reply } => self.start_save(SaveTrigger::Manual, Some(reply)),
            Command::Delete { reply } => self.start_delete(reply),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.current_snapshot());
            }
            Command::Shutdown => {}
        }
    }

    async fn select_date(&mut self, date: NaiveDate) -> Result<Option<Note>, EditorError> {
        self.teardown("note switch");
        self.publish();

        match self.store.load_note(date).await {
            Ok(note) => {
                info!(%date, exists = note.is_some(), "note opened");
                self.session = Some(EditorSession::open(date, note.as_ref()));
                self.publish();
                Ok(note)
            }
            Err(error) => {
                warn!(%date, %error, "failed to load note");
                Err(error.into())
            }
        }
    }

    fn apply_edit(&mut self, edit: impl FnOnce(&mut EditorSession) -> EditOutcome) {
        let Some(session) = self.session.as_mut() else {
            debug!("edit ignored: no note is open");
            return;
        };

        match edit(session) {
            EditOutcome::Dirty => self.debounce_at = Some(Instant::now() + self.config.debounce()),
            EditOutcome::Clean => self.debounce_at = None,
        }
        self.publish();
    }

    fn start_save(&mut self, trigger: SaveTrigger, reply: Option<Reply<SaveOutcome>>) {
        let Some(session) = self.session.as_mut() else {
            if let Some(reply) = reply {
                let _ = reply.send(Err(EditorError::NoActiveNote));
            }
            return;
        };

        let ticket = match session.begin_save(trigger) {
            Ok(ticket) => ticket,
            Err(skip) => {
                debug!(reason = %skip, ?trigger, "save skipped");
                if skip != SaveSkip::InFlight {
                    self.debounce_at = None;
                }
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(SaveOutcome::Skipped(skip)));
                }
                return;
            }
        };

        // This save captures everything pending
        self.debounce_at = None;
        self.status_revert_at = None;
        info!(note = %ticket.target, bytes = ticket.content.len(), ?trigger, "saving note");

        let session_id = self.session_id;
        if let Some(reply) = reply {
            self.save_waiters.push((session_id, ticket.seq(), reply));
        }

        let store = Arc::clone(&self.store);
        let settlements = self.settlements.clone();
        tokio::spawn(async move {
            let result = store
                .save_note(ticket.target, &ticket.content, &ticket.tag_ids)
                .await;
            let _ = settlements.send(Settlement::Save {
                session_id,
                ticket,
                result,
            });
        });

        self.publish();
    }

    fn start_delete(&mut self, reply: Reply<()>) {
        let Some(session) = self.session.as_mut() else {
            let _ = reply.send(Err(EditorError::NoActiveNote));
            return;
        };

        let date = match session.begin_delete() {
            Ok(date) => date,
            Err(error) => {
                let _ = reply.send(Err(error));
                return;
            }
        };

        self.debounce_at = None;
        self.status_revert_at = None;
        info!(%date, "deleting note");

        let session_id = self.session_id;
        self.delete_waiters.push((session_id, reply));

        let store = Arc::clone(&self.store);
        let settlements = self.settlements.clone();
        tokio::spawn(async move {
            let result = store.delete_note(date).await;
            let _ = settlements.send(Settlement::Delete { session_id, result });
        });

        self.publish();
    }

    fn handle_settlement(&mut self, settlement: Settlement) {
        match settlement {
            Settlement::Save {
                session_id,
                ticket,
                result,
            } => {
                self.settle_save(session_id, &ticket, result.as_ref());

                let waiter = self
                    .save_waiters
                    .iter()
                    .position(|(id, seq, _)| *id == session_id && *seq == ticket.seq())
                    .map(|index| self.save_waiters.swap_remove(index).2);
                if let Some(reply) = waiter {
                    let _ = reply.send(result.map(SaveOutcome::Saved).map_err(EditorError::from));
                }
            }
            Settlement::Delete { session_id, result } => {
                self.settle_delete(session_id, result.as_ref().map(|_| ()));

                let waiter = self
                    .delete_waiters
                    .iter()
                    .position(|(id, _)| *id == session_id)
                    .map(|index| self.delete_waiters.swap_remove(index).1);
                if let Some(reply) = waiter {
                    let _ = reply.send(result.map_err(EditorError::from));
                }
            }
        }
    }

    fn settle_save(
        &mut self,
        session_id: u64,
        ticket: &SaveTicket,
        result: Result<&Note, &PersistenceError>,
    ) {
        let session = match self.session.as_mut() {
            Some(session) if session_id == self.session_id => session,
            _ => {
                debug!(note = %ticket.target, "save settled for a closed session");
                return;
            }
        };

        match session.complete_save(ticket, result) {
            SaveSettled::Saved { dirty } => {
                info!(note = %ticket.target, "note saved");
                // Edits that arrived mid-flight get their own cycle
                if dirty && self.debounce_at.is_none() {
                    self.debounce_at = Some(Instant::now() + self.config.debounce());
                }
            }
            SaveSettled::Failed => {
                if let Err(error) = result {
                    warn!(note = %ticket.target, %error, "save failed; edits kept for retry");
                }
            }
            SaveSettled::Stale => {
                debug!(note = %ticket.target, seq = ticket.seq(), "stale save ticket ignored");
                return;
            }
        }

        self.schedule_status_revert();
        self.publish();
    }

    fn settle_delete(&mut self, session_id: u64, result: Result<(), &PersistenceError>) {
        let session = match self.session.as_mut() {
            Some(session) if session_id == self.session_id => session,
            _ => {
                debug!("delete settled for a closed session");
                return;
            }
        };

        let date = session.target().date();
        if session.complete_delete(result) {
            info!(%date, "note deleted");
            // Fresh identity so nothing from before the delete can settle
            // against the new-note session
            self.session_id += 1;
        } else if let Err(error) = result {
            warn!(%date, %error, "delete failed");
            self.schedule_status_revert();
        }
        self.publish();
    }

    /// Close the active session. The debounce timer is cancelled whatever
    /// state it was in.
    fn teardown(&mut self, reason: &str) {
        self.debounce_at = None;
        self.status_revert_at = None;

        if let Some(session) = self.session.take() {
            if session.is_dirty() {
                warn!(
                    note = %session.target(),
                    discarded_bytes = session.pending_content().len(),
                    reason,
                    "discarding unsaved edits"
                );
            }
        }
        self.session_id += 1;
    }

    fn schedule_status_revert(&mut self) {
        let status = self.session.as_ref().map(|session| session.status());
        self.status_revert_at = status
            .and_then(|status| status.display_duration(&self.config))
            .map(|duration| Instant::now() + duration);
    }

    fn current_snapshot(&self) -> SessionSnapshot {
        self.session
            .as_ref()
            .map(EditorSession::snapshot)
            .unwrap_or_default()
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.current_snapshot());
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
