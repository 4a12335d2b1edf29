//! Durable state for the conjunction lexicon.
//!
//! Two files make up the state of an authoring run:
//! - the corpus, an append-only JSON Lines file of validated entries keyed by
//!   lemma ([`Corpus`]);
//! - the progress checklist, a markdown document recording every batch's
//!   status and which of its lemmas already have an entry ([`BatchTracker`]).
//!
//! Both are rewritten whole through a temp file and an atomic rename, so a
//! reader never observes a half-written line and a crash leaves either the
//! old or the new state.
//!
//! # Example
//! ```no_run
//! use lexicon_store::{BatchTracker, Corpus, DEFAULT_BATCH_SIZE, plan_batches};
//!
//! # fn main() -> anyhow::Result<()> {
//! let lemmas = vec!["and".to_string(), "or".to_string()];
//! let mut tracker = BatchTracker::open("progress_checklist.md")?;
//! tracker.register_all(plan_batches(&lemmas, DEFAULT_BATCH_SIZE, 0))?;
//! tracker.start("conjunctions_1_to_2")?;
//!
//! let corpus = Corpus::open("conjunctions.jsonl")?;
//! println!("{} entries so far", corpus.len());
//! # Ok(()) }
//! ```

mod atomic;
pub mod audit;
pub mod checklist;
pub mod corpus;
pub mod plan;
pub mod tracker;

pub use audit::{AuditReport, audit_jsonl};
pub use checklist::ChecklistError;
pub use corpus::{Corpus, CorpusError};
pub use plan::{DEFAULT_BATCH_SIZE, batch_id, plan_batches, read_lemma_list};
pub use tracker::{BatchTracker, ProgressSummary, TrackedBatch, TrackerError};
