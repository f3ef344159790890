use super::find_md_files;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use daybook_markdown::{parse_with_diagnostics, serialize, ParseAnomalies};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Args)]
pub struct FmtArgs {
    /// File or directory to format
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Report files that would change without writing them
    #[arg(long)]
    pub check: bool,

    /// Print parse anomalies for every file
    #[arg(short, long)]
    pub verbose: bool,
}

/// Canonical form of a note, plus what the parser had to degrade
pub(crate) fn normalize(source: &str) -> (String, ParseAnomalies) {
    let output = parse_with_diagnostics(source);
    (serialize(&output.document), output.anomalies)
}

pub fn fmt(args: FmtArgs) -> Result<()> {
    let files = find_md_files(&args.path)?;
    if files.is_empty() {
        println!("{}", "No .md files found".yellow());
        return Ok(());
    }

    let mut changed = 0;
    for file in &files {
        if format_file(file, &args)? {
            changed += 1;
        }
    }

    println!();
    if args.check && changed > 0 {
        return Err(anyhow!("{} of {} files are not formatted", changed, files.len()));
    }
    println!(
        "{} {} files checked, {} {}",
        "✓".green(),
        files.len(),
        changed,
        if args.check { "would change" } else { "rewritten" }
    );

    Ok(())
}

fn format_file(path: &Path, args: &FmtArgs) -> Result<bool> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let (formatted, anomalies) = normalize(&source);

    if args.verbose {
        for anomaly in anomalies.iter() {
            println!("  {} {}: {}", "!".yellow(), path.display(), anomaly);
        }
    }

    // Trailing newline differences alone don't count
    if formatted.trim_end() == source.trim_end() {
        debug!(file = %path.display(), "already canonical");
        return Ok(false);
    }

    if args.check {
        println!("  {} {}", "✗".red(), path.display());
    } else {
        let mut output = formatted;
        if !output.is_empty() {
            output.push('\n');
        }
        fs::write(path, output).with_context(|| format!("writing {}", path.display()))?;
        println!("  {} {}", "✓".green(), path.display());
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rewrites_markers() {
        let (formatted, anomalies) = normalize("* one\n* two\n\n__bold__\n");
        assert_eq!(formatted, "- one\n- two\n\n**bold**");
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_normalize_reports_anomalies() {
        let (formatted, anomalies) = normalize("```\nunclosed");
        assert_eq!(formatted, "```\nunclosed\n```");
        assert_eq!(anomalies.len(), 1);
    }
}
