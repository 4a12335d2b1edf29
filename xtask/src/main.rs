use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lexicon_rules::validate_entry;
use lexicon_store::{BatchTracker, DEFAULT_BATCH_SIZE, audit_jsonl, plan_batches, read_lemma_list};
use lexicon_types::{ConjunctionCategory, Entry};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Lexicon authoring utilities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a lemma list into batches and add them to the checklist.
    Plan {
        #[arg(long)]
        lemmas: PathBuf,
        #[arg(long)]
        checklist: PathBuf,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Print batch counts per status.
    Status {
        #[arg(long)]
        checklist: PathBuf,
    },
    /// Check every entry of a JSONL file against the authoring rules.
    Validate {
        #[arg(long)]
        input: PathBuf,
        /// Force a category instead of inferring it per lemma.
        #[arg(long, value_parser = parse_category)]
        category: Option<ConjunctionCategory>,
    },
    /// Count unpopulated entries in JSONL files.
    Audit {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            lemmas,
            checklist,
            batch_size,
        } => plan(&lemmas, &checklist, batch_size)?,
        Commands::Status { checklist } => status(&checklist)?,
        Commands::Validate { input, category } => {
            if !validate(&input, category)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Audit { files } => {
            if !audit(&files)? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn parse_category(name: &str) -> Result<ConjunctionCategory, String> {
    ConjunctionCategory::from_name(name)
        .ok_or_else(|| format!("expected simple, complex, or correlative, got {name:?}"))
}

fn plan(lemmas: &Path, checklist: &Path, batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        bail!("--batch-size must be at least 1.");
    }
    let mut tracker = BatchTracker::open(checklist)?;
    let fresh: Vec<String> = read_lemma_list(lemmas)?
        .into_iter()
        .filter(|lemma| tracker.batch_for_lemma(lemma).is_none())
        .collect();
    if fresh.is_empty() {
        println!("Every lemma in {} is already batched.", lemmas.display());
        return Ok(());
    }

    let batches = plan_batches(&fresh, batch_size, tracker.lemma_count());
    let added = tracker.register_all(batches)?;
    println!(
        "Registered {} batches covering {} lemmas in {}.",
        added,
        fresh.len(),
        checklist.display()
    );
    Ok(())
}

fn status(checklist: &Path) -> Result<()> {
    let tracker = BatchTracker::open(checklist)?;
    let summary = tracker.summary();
    println!(
        "{} batches: {} complete ({}%), {} in progress, {} pending.",
        summary.total,
        summary.complete,
        summary.percent_complete(),
        summary.in_progress,
        summary.pending
    );
    for batch in tracker.batches() {
        println!(
            "- {} [{}] {}/{} recorded",
            batch.id(),
            batch.status(),
            batch.recorded_count(),
            batch.lemmas().len()
        );
    }
    Ok(())
}

/// Returns `false` when any entry breaks a rule or fails to parse.
fn validate(input: &Path, category: Option<ConjunctionCategory>) -> Result<bool> {
    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let mut checked = 0;
    let mut failed = 0;

    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("{}:{}", input.display(), lineno + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: Entry = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!("{}:{}: not an entry: {}", input.display(), lineno + 1, err);
                failed += 1;
                continue;
            }
        };
        checked += 1;

        let category = category.unwrap_or_else(|| ConjunctionCategory::infer(&entry.lemma));
        let report = validate_entry(&entry, category, &[]);
        for violation in &report.violations {
            eprintln!("{}: error: {}", report.lemma, violation);
        }
        for advisory in &report.advisories {
            println!("{}: note: {}", report.lemma, advisory);
        }
        if !report.is_valid() {
            failed += 1;
        }
    }

    println!("Checked {checked} entries, {failed} rejected.");
    Ok(failed == 0)
}

/// Returns `false` when any file still holds empty or unreadable entries.
fn audit(files: &[PathBuf]) -> Result<bool> {
    let mut complete = true;
    for path in files {
        let report = audit_jsonl(path)?;
        println!(
            "{}: {}/{} empty{}",
            path.display(),
            report.empty,
            report.total,
            if report.invalid_lines.is_empty() {
                String::new()
            } else {
                format!(", unreadable lines {:?}", report.invalid_lines)
            }
        );
        complete &= report.is_complete();
    }
    Ok(complete)
}
