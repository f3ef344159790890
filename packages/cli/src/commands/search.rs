use super::load_notes_dir;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use daybook_editor::{preview, SearchQuery, SearchResult, Tag};
use std::path::PathBuf;
use tracing::debug;

const PREVIEW_CHARS: usize = 72;

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Text to look for, case-insensitive
    pub query: Option<String>,

    /// Directory holding one YYYY-MM-DD.md file per day
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Only notes carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn search(args: SearchArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args))
}

async fn run(args: SearchArgs) -> Result<()> {
    let store = load_notes_dir(&args.dir).await?;

    let result = match resolve_query(&args, &store.tags().await) {
        Some(query) => store.search(&query).await,
        None => {
            debug!(tag = ?args.tag, "unknown tag");
            SearchResult::default()
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.notes.is_empty() {
        println!("{}", "No matching notes".yellow());
        return Ok(());
    }
    for note in &result.notes {
        println!(
            "{}  {}",
            note.date.format("%Y-%m-%d").to_string().cyan(),
            preview(note, PREVIEW_CHARS)
        );
    }
    println!();
    println!("{} {} matching notes", "✓".green(), result.total);

    Ok(())
}

/// `None` when `--tag` names a tag no note carries
fn resolve_query(args: &SearchArgs, tags: &[Tag]) -> Option<SearchQuery> {
    let mut query = SearchQuery {
        text: args.query.clone(),
        tag_id: None,
    };
    if let Some(name) = &args.tag {
        let tag = tags.iter().find(|tag| tag.name.eq_ignore_ascii_case(name))?;
        query = query.with_tag(tag.id);
    }
    Some(query)
}
