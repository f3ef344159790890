pub mod export;
pub mod fmt;
pub mod search;
pub mod tree;

pub use export::{export, ExportArgs};
pub use fmt::{fmt, FmtArgs};
pub use search::{search, SearchArgs};
pub use tree::{tree, TreeArgs};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use daybook_editor::{MemoryNoteStore, TagId};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Optional sidecar in the notes directory: `{ "2024-04-01": ["work"] }`
const TAGS_FILE: &str = "tags.json";

/// `path` itself when it is a file, otherwise every `.md` file below it
pub(crate) fn find_md_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(anyhow!("Path does not exist: {}", path.display()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("md"))
        .collect();
    files.sort();

    Ok(files)
}

/// Load every `YYYY-MM-DD.md` below `dir` into an in-memory store.
///
/// One note per date: when two files share a date name the first in path
/// order wins and the other is skipped with a warning.
pub(crate) async fn load_notes_dir(dir: &Path) -> Result<MemoryNoteStore> {
    if !dir.is_dir() {
        return Err(anyhow!("Notes directory does not exist: {}", dir.display()));
    }

    let store = MemoryNoteStore::new();
    let tags_by_date = load_tags(dir)?;

    for (date, file) in dated_files(find_md_files(dir)?) {
        let content =
            fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;

        let mut tag_ids = BTreeSet::<TagId>::new();
        for name in tags_by_date.get(&date).into_iter().flatten() {
            tag_ids.insert(store.insert_tag(name).await.id);
        }
        store.insert_note(date, content.trim_end(), tag_ids).await;
    }

    Ok(store)
}

fn dated_files(files: Vec<PathBuf>) -> BTreeMap<NaiveDate, PathBuf> {
    let mut by_date: BTreeMap<NaiveDate, PathBuf> = BTreeMap::new();
    for file in files {
        let Some(date) = note_date(&file) else {
            debug!(file = %file.display(), "skipping file without a date name");
            continue;
        };
        if let Some(kept) = by_date.get(&date) {
            warn!(
                %date,
                kept = %kept.display(),
                skipped = %file.display(),
                "duplicate note date"
            );
            continue;
        }
        by_date.insert(date, file);
    }
    by_date
}

/// Date from a `YYYY-MM-DD.md` file name
fn note_date(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

fn load_tags(dir: &Path) -> Result<BTreeMap<NaiveDate, Vec<String>>> {
    let path = dir.join(TAGS_FILE);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_date_from_file_name() {
        assert_eq!(
            note_date(Path::new("notes/2024-04-01.md")),
            NaiveDate::from_ymd_opt(2024, 4, 1)
        );
        assert_eq!(note_date(Path::new("notes/README.md")), None);
        assert_eq!(note_date(Path::new("2024-13-01.md")), None);
    }

    #[test]
    fn test_tags_sidecar_format() {
        let tags: BTreeMap<NaiveDate, Vec<String>> =
            serde_json::from_str(r#"{ "2024-04-01": ["work", "health"] }"#).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        assert_eq!(tags[&date], vec!["work", "health"]);
    }

    #[test]
    fn test_duplicate_dates_keep_first_file() {
        let files = vec![
            PathBuf::from("notes/2024-04-01.md"),
            PathBuf::from("notes/README.md"),
            PathBuf::from("notes/old/2024-04-01.md"),
            PathBuf::from("notes/old/2024-04-02.md"),
        ];
        let by_date = dated_files(files);

        assert_eq!(by_date.len(), 2);
        let first = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        assert_eq!(by_date[&first], PathBuf::from("notes/2024-04-01.md"));
    }

    #[tokio::test]
    async fn test_load_notes_dir_skips_duplicate_dates() {
        let dir = std::env::temp_dir().join(format!("daybook-load-{}", std::process::id()));
        fs::create_dir_all(dir.join("old")).unwrap();
        fs::write(dir.join("2024-04-01.md"), "current\n").unwrap();
        fs::write(dir.join("old/2024-04-01.md"), "stale\n").unwrap();
        fs::write(dir.join(TAGS_FILE), r#"{ "2024-04-01": ["work"] }"#).unwrap();

        let store = load_notes_dir(&dir).await.unwrap();
        let notes = store.notes().await;
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "current");
        assert_eq!(store.tags().await[0].name, "work");
        assert_eq!(notes[0].tag_ids.len(), 1);
    }
}
