use super::load_notes_dir;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;
use colored::Colorize;
use daybook_editor::export::export_data;
use daybook_editor::{render_export, ExportScope, Note};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Directory holding one YYYY-MM-DD.md file per day
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Only export these dates (repeatable)
    #[arg(short, long = "date", value_name = "YYYY-MM-DD")]
    pub dates: Vec<NaiveDate>,

    /// Directory to write the export into
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Write a JSON backup of notes and tags instead of Markdown
    #[arg(long)]
    pub json: bool,

    /// Print to stdout instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}

pub fn export(args: ExportArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args))
}

async fn run(args: ExportArgs) -> Result<()> {
    let store = load_notes_dir(&args.dir).await?;

    let notes = store.notes().await;
    let tags = store.tags().await;
    if notes.is_empty() {
        println!("{}", "No dated notes found".yellow());
        return Ok(());
    }

    let exported_at = Utc::now();
    let (filename, content, exported) = if args.json {
        let data = export_data(&notes, &tags, exported_at);
        (
            format!("daybook_backup_{}.json", exported_at.format("%Y%m%d_%H%M%S")),
            serde_json::to_string_pretty(&data)?,
            notes.len(),
        )
    } else {
        let scope = export_scope(&args.dates, &notes);
        let export = render_export(&notes, &tags, &scope, exported_at);
        (export.filename, export.content, selected_count(&notes, &scope))
    };

    if args.stdout {
        print!("{}", content);
        return Ok(());
    }

    fs::create_dir_all(&args.out_dir)?;
    let path = args.out_dir.join(&filename);
    fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    println!(
        "{} Exported {} notes → {}",
        "✓".green(),
        exported,
        path.display()
    );

    Ok(())
}

fn export_scope(dates: &[NaiveDate], notes: &[Note]) -> ExportScope {
    if dates.is_empty() {
        return ExportScope::All;
    }
    let known: BTreeSet<NaiveDate> = notes.iter().map(|note| note.date).collect();
    for date in dates.iter().filter(|date| !known.contains(date)) {
        warn!(%date, "no note for selected date");
    }
    ExportScope::Selected(dates.iter().copied().collect())
}

fn selected_count(notes: &[Note], scope: &ExportScope) -> usize {
    notes.iter().filter(|note| scope.includes(note.date)).count()
}
