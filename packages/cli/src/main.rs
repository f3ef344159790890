mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{export, fmt, search, tree, ExportArgs, FmtArgs, SearchArgs, TreeArgs};
use tracing_subscriber::EnvFilter;

/// Daybook CLI - normalize, inspect, search and export daily Markdown notes
#[derive(Parser, Debug)]
#[command(name = "daybook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite Markdown notes in canonical form
    Fmt(FmtArgs),

    /// Print the document tree of a note as JSON
    Tree(TreeArgs),

    /// Export a directory of YYYY-MM-DD.md notes into one document
    Export(ExportArgs),

    /// Find notes by text and tag, newest first
    Search(SearchArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Fmt(args) => fmt(args),
        Command::Tree(args) => tree(args),
        Command::Export(args) => export(args),
        Command::Search(args) => search(args),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
