//! CLI commands

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Subcommand;
use clap::builder::RangedU64ValueParser;
use console::style;
use rdbarchive::archive::{Archive, DirectoryArchive, EntryId, entry_hash};
use rdbarchive::extract::{BatchOutcome, ExecutionPriority, JobDispatcher};

use super::progress::{CROSS, READING, STOP, WRITING, export_bar, print_exported, print_step};
use crate::config::AppConfig;
use crate::session::{ExportSession, SessionControl};

#[derive(Subcommand)]
pub enum Commands {
    /// List the entries of an archive
    List {
        /// Archive directory
        archive: PathBuf,

        /// Only show entries whose name contains this text (case-insensitive)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Extract entries to a folder
    Extract {
        /// Archive directory
        archive: PathBuf,

        /// Output directory
        #[arg(short, long)]
        destination: PathBuf,

        /// Entry hash to extract, in hex (repeatable). Extracts everything if
        /// no hash or name is given.
        #[arg(long = "hash", value_parser = parse_hash)]
        hashes: Vec<u32>,

        /// Entry name to extract (repeatable)
        #[arg(long = "entry")]
        entries: Vec<String>,

        /// Number of concurrent extractions (at least 1)
        #[arg(short, long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        jobs: Option<usize>,

        /// Worker priority: normal or background
        #[arg(short, long)]
        priority: Option<ExecutionPriority>,

        /// Config file (defaults to the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write into a folder named after the archive inside the output
        /// directory, unless the output directory already has that name
        #[arg(long)]
        subfolder: bool,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },
}

fn parse_hash(s: &str) -> Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hash '{s}': {e}"))
}

impl Commands {
    /// Execute the selected command.
    pub fn execute(&self) -> anyhow::Result<ExitCode> {
        match self {
            Commands::List { archive, filter } => {
                list(archive, filter.as_deref())?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Extract {
                archive,
                destination,
                hashes,
                entries,
                jobs,
                priority,
                config,
                subfolder,
                quiet,
            } => {
                let mut selection = hashes.clone();
                selection.extend(entries.iter().map(|name| entry_hash(name)));
                let outcome = extract(
                    archive,
                    destination,
                    &selection,
                    *jobs,
                    *priority,
                    config.as_deref(),
                    *subfolder,
                    *quiet,
                )?;
                Ok(exit_code(outcome))
            }
        }
    }
}

/// Process exit code for a batch outcome.
#[must_use]
pub fn exit_code(outcome: BatchOutcome) -> ExitCode {
    match outcome {
        BatchOutcome::Success => ExitCode::SUCCESS,
        BatchOutcome::Failed => ExitCode::from(1),
        BatchOutcome::Cancelled => ExitCode::from(2),
    }
}

fn list(archive: &Path, filter: Option<&str>) -> anyhow::Result<()> {
    let archive = DirectoryArchive::open(archive)?;
    let needle = filter.map(str::to_lowercase);

    let mut shown = 0usize;
    for index in 0..archive.entry_count() {
        let id = EntryId(index);
        let name = archive.entry_name(id)?;
        if needle
            .as_deref()
            .is_some_and(|n| !name.to_lowercase().contains(n))
        {
            continue;
        }
        println!("{:08x}  {name}", archive.entry_hash(id)?);
        shown += 1;
    }

    println!();
    println!("{shown} of {} entries", archive.entry_count());
    Ok(())
}

fn extract(
    source: &Path,
    destination: &Path,
    selection: &[u32],
    jobs: Option<usize>,
    priority: Option<ExecutionPriority>,
    config_path: Option<&Path>,
    subfolder: bool,
    quiet: bool,
) -> anyhow::Result<BatchOutcome> {
    let started = Instant::now();
    let config = AppConfig::load(config_path)?
        .extract
        .with_overrides(jobs, priority);

    print_step(1, 2, READING, &format!("Reading {}", source.display()));
    let archive: Arc<dyn Archive> = Arc::new(DirectoryArchive::open(source)?);
    let mut session = ExportSession::new(archive, config)?;
    if subfolder {
        session = session.with_subfolder(archive_name(source)?);
    }
    let dispatcher = session.dispatcher();

    let total = if selection.is_empty() {
        session.archive().entry_count()
    } else {
        selection.len()
    };
    print_step(
        2,
        2,
        WRITING,
        &format!(
            "Extracting {total} entries to {}",
            session.output_dir(destination).display()
        ),
    );
    if !quiet {
        println!("  Enter q to cancel, b or n for background or normal priority");
    }
    listen_for_commands(session.control());

    let done = AtomicBool::new(false);
    let outcome = std::thread::scope(|scope| {
        if !quiet {
            scope.spawn(|| poll_progress(&dispatcher, &done, total));
        }
        let outcome = if selection.is_empty() {
            session.export_all(destination)
        } else {
            session.export_selection(selection, destination)
        };
        done.store(true, Ordering::SeqCst);
        outcome
    })?;

    let (completed, total) = dispatcher.current_progress();
    match outcome {
        BatchOutcome::Success => print_exported(completed, started.elapsed()),
        BatchOutcome::Cancelled => println!(
            "{STOP}Cancelled after {completed}/{total} entries (code {})",
            outcome.code()
        ),
        BatchOutcome::Failed => println!(
            "{CROSS}{} after {completed}/{total} entries (code {}); output may be incomplete",
            style("Extraction failed").red().bold(),
            outcome.code()
        ),
    }
    Ok(outcome)
}

/// Name of the archive directory, used for `--subfolder`.
fn archive_name(source: &Path) -> anyhow::Result<String> {
    let resolved = std::fs::canonicalize(source)
        .with_context(|| format!("Failed to resolve {}", source.display()))?;
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no folder name", resolved.display()))
}

/// Mirror dispatcher progress onto a progress bar until `done` is set.
fn poll_progress(dispatcher: &JobDispatcher, done: &AtomicBool, total: usize) {
    let pb = export_bar(total as u64);
    while !done.load(Ordering::SeqCst) {
        let (completed, total) = dispatcher.current_progress();
        pb.set_length(total as u64);
        pb.set_position(completed as u64);
        std::thread::sleep(Duration::from_millis(50));
    }
    let (completed, _) = dispatcher.current_progress();
    pb.set_position(completed as u64);
    pb.finish_and_clear();
}

/// A line typed on stdin while an export runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TerminalCommand {
    Cancel,
    Priority(ExecutionPriority),
}

fn parse_command(line: &str) -> Option<TerminalCommand> {
    match line.trim().to_lowercase().as_str() {
        "q" => Some(TerminalCommand::Cancel),
        "b" => Some(TerminalCommand::Priority(ExecutionPriority::Background)),
        "n" => Some(TerminalCommand::Priority(ExecutionPriority::Normal)),
        _ => None,
    }
}

/// Read commands from stdin and apply them to the session.
///
/// Armed before the export is configured; the session keeps a cancel that
/// arrives early. The reader thread is detached and ends with the process.
fn listen_for_commands(control: SessionControl) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(TerminalCommand::Cancel) => {
                    tracing::debug!("Cancellation requested from terminal");
                    control.cancel();
                }
                Some(TerminalCommand::Priority(priority)) => {
                    tracing::debug!("Priority changed to {priority} from terminal");
                    control.set_priority(priority);
                }
                None => {}
            }
        }
    });
}
