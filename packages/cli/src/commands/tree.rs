use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use daybook_markdown::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Markdown file to parse
    pub input: PathBuf,

    /// Emit compact JSON on one line
    #[arg(long)]
    pub compact: bool,

    /// Print the plain text of the note instead of the tree
    #[arg(long)]
    pub plain: bool,
}

pub fn tree(args: TreeArgs) -> Result<()> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let mut parser = Parser::new(&source);
    let document = parser.parse_document();

    if args.plain {
        println!("{}", document.plain_text());
    } else if args.compact {
        println!("{}", serde_json::to_string(&document)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&document)?);
    }

    // Diagnostics go to stderr so stdout stays valid JSON
    for anomaly in parser.anomalies().iter() {
        eprintln!("{} {}", "warning:".yellow().bold(), anomaly);
    }

    Ok(())
}
