//! # Daybook Editor
//!
//! Autosave engine for the daily note being edited.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ markdown: Markdown ⇄ Document tree          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: autosave for the active note        │
//! │  - EditorSession: dirty / phase / status    │
//! │  - AutosaveCoordinator: debounce, timers    │
//! │  - NoteStore: load / save / delete          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ backend: one note per date                  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **One save at a time**: a trigger that finds a save in flight is dropped
//! 2. **Last edit wins**: the debounce restarts on every change
//! 3. **Switching notes discards**: unsaved edits of the old note are dropped
//! 4. **Failures keep edits**: the note stays dirty until a later save lands
//!
//! ## Usage
//!
//! ```rust,no_run
//! use daybook_editor::{AutosaveConfig, AutosaveCoordinator, MemoryNoteStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), daybook_editor::EditorError> {
//! let store = Arc::new(MemoryNoteStore::new());
//! let editor = AutosaveCoordinator::spawn(store, AutosaveConfig::default());
//!
//! let today = chrono::Utc::now().date_naive();
//! editor.select_date(today).await?;
//! editor.edit("# Today\n\nWrote the autosave engine.")?;
//! // saved two seconds after the last edit, or right away:
//! editor.save_now().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod coordinator;
mod errors;
pub mod export;
mod note;
mod search;
mod session;
mod status;
mod store;

pub use config::{AutosaveConfig, DEFAULT_CONFIG_NAME};
pub use coordinator::{AutosaveCoordinator, SaveOutcome};
pub use errors::{EditorError, PersistenceError};
pub use export::{render_export, ExportScope, MarkdownExport};
pub use note::{Note, SaveTarget, Tag, TagId};
pub use search::{preview, search_notes, SearchQuery, SearchResult};
pub use session::{
    EditOutcome, EditorSession, Phase, SaveSettled, SaveSkip, SaveTicket, SaveTrigger,
    SessionSnapshot,
};
pub use status::SaveStatus;
pub use store::{MemoryNoteStore, NoteStore, SaveCall};

// Re-export the document tree for convenience
pub use daybook_markdown::Document;
