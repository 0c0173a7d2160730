//! Command-line interface
//!
//! Thin wrappers mapping each subcommand onto one core operation. Every
//! command prints a count; finding nothing to do is a success.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::WrapErr;

use crate::config::ProjectLayout;
use crate::constants::PROJECT_ROOT_ENV;
use crate::ingest::{ConsumptionPolicy, IngestReport, LogIngestor};
use crate::merge;
use crate::model::ChangeRecord;
use crate::store::{OffsetStore, RecordStore, SqliteStore};

#[derive(Debug, Parser)]
#[command(
    name = "verba",
    version,
    about = "Record prompt-driven code changes and merge change stores"
)]
pub struct Cli {
    /// Project root directory
    #[arg(long, global = true, env = PROJECT_ROOT_ENV, default_value = ".")]
    pub project_root: PathBuf,

    /// Store path [default: <project-root>/verba/changes.db]
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Prompt log path [default: <project-root>/verba/prompts.txt]
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Create the store and its schema
    Init,

    /// Process the whole prompt log, then clear it
    Process,

    /// Process only log content added since the last run
    Incremental,

    /// Make the next incremental run start from the top of the log
    ResetOffset,

    /// Union-merge change stores (git merge driver: %O %A %B)
    Merge {
        /// Common ancestor version (%O)
        ancestor: PathBuf,

        /// Current branch version (%A)
        ours: PathBuf,

        /// Other branch version (%B)
        theirs: PathBuf,

        /// Where to write the result [default: OURS]
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List stored changes, oldest first
    List {
        /// Only changes to this file
        #[arg(long)]
        filename: Option<String>,

        /// Only changes not yet committed
        #[arg(long)]
        uncommitted: bool,
    },
}

impl Cli {
    /// Paths for this invocation, with overrides applied
    pub fn layout(&self) -> ProjectLayout {
        let mut layout = ProjectLayout::new(&self.project_root);
        if let Some(db) = &self.db {
            layout = layout.with_db_path(db);
        }
        if let Some(log_file) = &self.log_file {
            layout = layout.with_log_path(log_file);
        }
        layout
    }
}

/// Execute a parsed command line
pub fn run(cli: Cli) -> color_eyre::Result<()> {
    let layout = cli.layout();

    match cli.command {
        Command::Init => {
            let store = SqliteStore::create(&layout.db_path)
                .wrap_err("Could not initialize the change store")?;
            println!("Database initialized: {}", store.path().display());
        }
        Command::Process => {
            let report = ingest(&layout, ConsumptionPolicy::FullRescan)?;
            println!("{}", summarize(&report));
            if report.cleared {
                println!("Prompt log cleared for next cycle");
            }
        }
        Command::Incremental => {
            let report = ingest(&layout, ConsumptionPolicy::Incremental)?;
            println!("Read {} new bytes of log", report.bytes_read);
            println!("{}", summarize(&report));
        }
        Command::ResetOffset => {
            let mut store = SqliteStore::open(&layout.db_path)?;
            store.save_offset(0)?;
            println!("Log offset reset to 0");
        }
        Command::Merge {
            ancestor,
            ours,
            theirs,
            output,
        } => {
            let output = output.unwrap_or_else(|| ours.clone());
            let report = merge::merge_three(&ancestor, &ours, &theirs, &output)
                .wrap_err_with(|| format!("Database merge into {} failed", output.display()))?;

            for (label, count) in &report.source_counts {
                println!("{label} records: {count}");
            }
            println!("Merged {} unique records into {}", report.inserted, output.display());
        }
        Command::List {
            filename,
            uncommitted,
        } => {
            let store = SqliteStore::open(&layout.db_path)?;
            let mut records = match &filename {
                Some(filename) => store.scan_by_filename(filename)?,
                None if uncommitted => store.scan_uncommitted()?,
                None => store.scan_all()?,
            };
            if uncommitted {
                records.retain(|record| !record.is_committed);
            }

            for record in &records {
                println!("{}", listing_line(record));
            }
            println!("{} changes", records.len());
        }
    }

    Ok(())
}

fn ingest(layout: &ProjectLayout, policy: ConsumptionPolicy) -> color_eyre::Result<IngestReport> {
    let mut store = SqliteStore::open(&layout.db_path)?;
    let report = LogIngestor::new(&layout.log_path).run(policy, &mut store)?;
    Ok(report)
}

/// One-line outcome of an ingestion run
fn summarize(report: &IngestReport) -> String {
    if report.changes() == 0 {
        "No changes to process".to_string()
    } else {
        format!(
            "Processed {} changes ({} new)",
            report.changes(),
            report.inserted
        )
    }
}

/// `<hash prefix> <timestamp> <filename> <prompt>`
fn listing_line(record: &ChangeRecord) -> String {
    let marker = if record.is_committed { '*' } else { ' ' };
    format!(
        "{}{} {} {}  {}",
        marker,
        record.short_hash(),
        record.timestamp_text(),
        record.filename,
        record.prompt
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_merge_driver_arguments() {
        let cli =
            Cli::try_parse_from(["verba", "merge", "base.db", "ours.db", "theirs.db"]).unwrap();

        assert_eq!(
            cli.command,
            Command::Merge {
                ancestor: PathBuf::from("base.db"),
                ours: PathBuf::from("ours.db"),
                theirs: PathBuf::from("theirs.db"),
                output: None,
            }
        );
    }

    #[test]
    fn test_merge_requires_three_paths() {
        assert!(Cli::try_parse_from(["verba", "merge", "a.db", "b.db"]).is_err());
    }

    #[test]
    fn test_parse_subcommands() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap().command;

        assert_eq!(parse(&["verba", "init"]), Command::Init);
        assert_eq!(parse(&["verba", "process"]), Command::Process);
        assert_eq!(parse(&["verba", "incremental"]), Command::Incremental);
        assert_eq!(parse(&["verba", "reset-offset"]), Command::ResetOffset);
        assert_eq!(
            parse(&["verba", "list", "--uncommitted"]),
            Command::List {
                filename: None,
                uncommitted: true
            }
        );
    }

    #[test]
    fn test_layout_overrides() {
        let cli = Cli::try_parse_from([
            "verba",
            "--project-root",
            "/repo",
            "--db",
            "/tmp/x.db",
            "process",
            "-v",
        ])
        .unwrap();

        let layout = cli.layout();
        assert_eq!(layout.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(layout.log_path, PathBuf::from("/repo/verba/prompts.txt"));
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize(&IngestReport::default()), "No changes to process");
    }

    #[test]
    fn test_listing_line() {
        let record =
            ChangeRecord::build("src/a.rs", "x", "2024-01-01T00:00:00Z", "fix bug").unwrap();
        let line = listing_line(&record);

        let prefix = format!(" {} 2024-01-01T00:00:00.000000+00:00", record.short_hash());
        assert!(line.starts_with(&prefix));
        assert!(line.ends_with("src/a.rs  fix bug"));
    }
}
