use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bitvec::prelude::*;
use lexicon_types::{Batch, BatchStatus, lemma_key};
use thiserror::Error;
use tracing::{debug, info};

use crate::atomic::write_atomic;
use crate::checklist::{self, ChecklistError};

pub(crate) type RecordSet = BitVec<usize, Lsb0>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("unknown batch {0:?}")]
    UnknownBatch(String),
    #[error("lemma {lemma:?} is not part of batch {batch:?}")]
    UnknownLemma { batch: String, lemma: String },
    #[error("batch {0:?} has not been started")]
    BatchNotStarted(String),
    #[error("batch {batch:?} still lacks entries for: {}", .missing.join(", "))]
    IncompleteBatch { batch: String, missing: Vec<String> },
    #[error("batch {batch:?} cannot move from {from} to {to}")]
    InvalidTransition {
        batch: String,
        from: BatchStatus,
        to: BatchStatus,
    },
    #[error("batch {0:?} is already registered")]
    DuplicateBatch(String),
    #[error("batch {0:?} has no lemmas")]
    EmptyBatch(String),
    #[error("lemma {lemma:?} already belongs to batch {batch:?}")]
    LemmaAlreadyBatched { lemma: String, batch: String },
    #[error("batch id {0:?} cannot be written to the checklist")]
    InvalidBatchId(String),
    #[error("lemma {lemma:?} in batch {batch:?} cannot be written to the checklist")]
    InvalidLemma { batch: String, lemma: String },
    #[error("{}: {source}", .path.display())]
    Checklist {
        path: PathBuf,
        source: ChecklistError,
    },
    #[error("checklist I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// A batch together with which of its lemmas already have a persisted entry.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedBatch {
    batch: Batch,
    recorded: RecordSet,
}

impl TrackedBatch {
    pub(crate) fn new(batch: Batch) -> Self {
        let recorded = bitvec![usize, Lsb0; 0; batch.lemmas.len()];
        Self { batch, recorded }
    }

    pub(crate) fn from_parts(batch: Batch, recorded: RecordSet) -> Self {
        Self { batch, recorded }
    }

    pub fn id(&self) -> &str {
        &self.batch.id
    }

    pub fn status(&self) -> BatchStatus {
        self.batch.status
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn lemmas(&self) -> &[String] {
        &self.batch.lemmas
    }

    pub fn is_recorded(&self, lemma: &str) -> bool {
        self.batch
            .position(lemma)
            .is_some_and(|i| self.recorded[i])
    }

    pub fn recorded_count(&self) -> usize {
        self.recorded.count_ones()
    }

    /// Lemmas that still lack a recorded entry, in batch order.
    pub fn missing(&self) -> Vec<String> {
        self.recorded
            .iter_zeros()
            .filter_map(|i| self.batch.lemmas.get(i).cloned())
            .collect()
    }

    pub(crate) fn recorded_at(&self, index: usize) -> bool {
        self.recorded.get(index).is_some_and(|bit| *bit)
    }
}

/// Per-status batch counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub complete: usize,
}

impl ProgressSummary {
    pub(crate) fn tally(batches: &[TrackedBatch]) -> Self {
        let mut summary = ProgressSummary {
            total: batches.len(),
            ..ProgressSummary::default()
        };
        for batch in batches {
            match batch.status() {
                BatchStatus::Pending => summary.pending += 1,
                BatchStatus::InProgress => summary.in_progress += 1,
                BatchStatus::Complete => summary.complete += 1,
            }
        }
        summary
    }

    pub fn percent_complete(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            self.complete * 100 / self.total
        }
    }
}

/// Durable `Pending -> InProgress -> Complete` state machine over batches.
///
/// Every successful mutation rewrites the checklist before returning; the
/// in-memory state only changes once that write has landed. Rejected calls
/// leave both untouched.
#[derive(Debug)]
pub struct BatchTracker {
    path: PathBuf,
    batches: Vec<TrackedBatch>,
}

impl BatchTracker {
    /// Load the checklist at `path`; a missing file is an empty tracker.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref().to_path_buf();
        let batches = match fs::read_to_string(&path) {
            Ok(text) => checklist::parse(&text).map_err(|source| TrackerError::Checklist {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        info!("tracking {} batches from {}", batches.len(), path.display());
        Ok(Self { path, batches })
    }

    /// Add a new `Pending` batch.
    pub fn register(&mut self, batch: Batch) -> Result<(), TrackerError> {
        self.register_all(vec![batch]).map(|_| ())
    }

    /// Add several batches with a single checklist write. Nothing is added if
    /// any batch is rejected.
    pub fn register_all(&mut self, batches: Vec<Batch>) -> Result<usize, TrackerError> {
        let mut ids: HashSet<String> = self.batches.iter().map(|b| b.id().to_string()).collect();
        let mut owners: HashMap<String, String> = self
            .batches
            .iter()
            .flat_map(|b| b.lemmas().iter().map(|l| (lemma_key(l), b.id().to_string())))
            .collect();

        let mut next = self.batches.clone();
        for batch in batches {
            if batch.status != BatchStatus::Pending {
                return Err(TrackerError::InvalidTransition {
                    batch: batch.id,
                    from: batch.status,
                    to: BatchStatus::Pending,
                });
            }
            if !is_line_safe(&batch.id) || batch.id.contains('`') {
                return Err(TrackerError::InvalidBatchId(batch.id));
            }
            if batch.lemmas.is_empty() {
                return Err(TrackerError::EmptyBatch(batch.id));
            }
            if !ids.insert(batch.id.clone()) {
                return Err(TrackerError::DuplicateBatch(batch.id));
            }
            for lemma in &batch.lemmas {
                if !is_line_safe(lemma) {
                    return Err(TrackerError::InvalidLemma {
                        batch: batch.id.clone(),
                        lemma: lemma.clone(),
                    });
                }
                if let Some(owner) = owners.get(&lemma_key(lemma)) {
                    return Err(TrackerError::LemmaAlreadyBatched {
                        lemma: lemma.clone(),
                        batch: owner.clone(),
                    });
                }
                owners.insert(lemma_key(lemma), batch.id.clone());
            }
            next.push(TrackedBatch::new(batch));
        }

        let added = next.len() - self.batches.len();
        if added > 0 {
            self.commit(next)?;
            info!("registered {added} batches");
        }
        Ok(added)
    }

    /// Move a `Pending` batch to `InProgress`. Already in progress is a no-op.
    pub fn start(&mut self, id: &str) -> Result<(), TrackerError> {
        let idx = self.index_of(id)?;
        match self.batches[idx].status() {
            BatchStatus::InProgress => {
                debug!("batch {id} already in progress");
                Ok(())
            }
            BatchStatus::Complete => Err(TrackerError::InvalidTransition {
                batch: id.to_string(),
                from: BatchStatus::Complete,
                to: BatchStatus::InProgress,
            }),
            BatchStatus::Pending => {
                let mut next = self.batches.clone();
                next[idx].batch.status = BatchStatus::InProgress;
                self.commit(next)?;
                info!("batch {id} started");
                Ok(())
            }
        }
    }

    /// Check that `lemma` could be recorded against `id` right now.
    pub fn ensure_recordable(&self, id: &str, lemma: &str) -> Result<(), TrackerError> {
        let idx = self.index_of(id)?;
        self.position_in(idx, lemma).map(|_| ())
    }

    /// Mark `lemma` as having a persisted entry. Recording twice is a no-op.
    pub fn record_entry(&mut self, id: &str, lemma: &str) -> Result<(), TrackerError> {
        let idx = self.index_of(id)?;
        let pos = self.position_in(idx, lemma)?;
        if self.batches[idx].recorded[pos] {
            debug!("lemma {lemma:?} already recorded in batch {id}");
            return Ok(());
        }
        let mut next = self.batches.clone();
        next[idx].recorded.set(pos, true);
        self.commit(next)?;
        debug!("recorded {lemma:?} in batch {id}");
        Ok(())
    }

    /// Move an `InProgress` batch to `Complete` once every lemma is recorded.
    pub fn complete(&mut self, id: &str) -> Result<(), TrackerError> {
        let idx = self.index_of(id)?;
        let tracked = &self.batches[idx];
        match tracked.status() {
            BatchStatus::Complete => return Ok(()),
            BatchStatus::Pending => {
                return Err(TrackerError::InvalidTransition {
                    batch: id.to_string(),
                    from: BatchStatus::Pending,
                    to: BatchStatus::Complete,
                });
            }
            BatchStatus::InProgress => {}
        }

        let missing = tracked.missing();
        if !missing.is_empty() {
            return Err(TrackerError::IncompleteBatch {
                batch: id.to_string(),
                missing,
            });
        }

        let mut next = self.batches.clone();
        next[idx].batch.status = BatchStatus::Complete;
        self.commit(next)?;
        info!("batch {id} complete");
        Ok(())
    }

    pub fn batch(&self, id: &str) -> Option<&TrackedBatch> {
        self.batches.iter().find(|b| b.id() == id)
    }

    /// All batches in registration order.
    pub fn batches(&self) -> &[TrackedBatch] {
        &self.batches
    }

    /// The batch that owns `lemma`, if any.
    pub fn batch_for_lemma(&self, lemma: &str) -> Option<&TrackedBatch> {
        self.batches
            .iter()
            .find(|b| b.batch.position(lemma).is_some())
    }

    pub fn lemma_count(&self) -> usize {
        self.batches.iter().map(|b| b.lemmas().len()).sum()
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::tally(&self.batches)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn index_of(&self, id: &str) -> Result<usize, TrackerError> {
        self.batches
            .iter()
            .position(|b| b.id() == id)
            .ok_or_else(|| TrackerError::UnknownBatch(id.to_string()))
    }

    fn position_in(&self, idx: usize, lemma: &str) -> Result<usize, TrackerError> {
        let tracked = &self.batches[idx];
        let pos = tracked
            .batch
            .position(lemma)
            .ok_or_else(|| TrackerError::UnknownLemma {
                batch: tracked.id().to_string(),
                lemma: lemma.to_string(),
            })?;
        if tracked.status() == BatchStatus::Pending {
            return Err(TrackerError::BatchNotStarted(tracked.id().to_string()));
        }
        Ok(pos)
    }

    fn commit(&mut self, next: Vec<TrackedBatch>) -> Result<(), TrackerError> {
        let document = checklist::render(&next);
        write_atomic(&self.path, document.as_bytes())?;
        self.batches = next;
        Ok(())
    }
}

/// A name survives a checklist round trip only if it is one non-empty,
/// already-trimmed line.
fn is_line_safe(name: &str) -> bool {
    !name.is_empty() && name.trim() == name && !name.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lemmas(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn tracker_with(batches: Vec<Batch>) -> (tempfile::TempDir, BatchTracker) {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = BatchTracker::open(dir.path().join("progress.md")).unwrap();
        tracker.register_all(batches).unwrap();
        (dir, tracker)
    }

    #[test]
    fn walks_the_full_lifecycle() {
        let (_dir, mut tracker) = tracker_with(vec![Batch::new("b1", lemmas(&["and", "or"]))]);
        tracker.start("b1").unwrap();
        tracker.record_entry("b1", "and").unwrap();
        tracker.record_entry("b1", "or").unwrap();
        tracker.complete("b1").unwrap();
        assert_eq!(tracker.batch("b1").unwrap().status(), BatchStatus::Complete);
        tracker.complete("b1").unwrap();
        assert_eq!(tracker.summary().complete, 1);
    }

    #[test]
    fn completion_requires_every_lemma() {
        let (_dir, mut tracker) = tracker_with(vec![Batch::new("b1", lemmas(&["and", "or"]))]);
        tracker.start("b1").unwrap();
        tracker.record_entry("b1", "and").unwrap();
        let err = tracker.complete("b1").unwrap_err();
        assert!(
            matches!(err, TrackerError::IncompleteBatch { ref missing, .. } if missing == &lemmas(&["or"]))
        );
        assert_eq!(tracker.batch("b1").unwrap().status(), BatchStatus::InProgress);
    }

    #[test]
    fn rejects_out_of_order_transitions() {
        let (_dir, mut tracker) = tracker_with(vec![Batch::new("b1", lemmas(&["and"]))]);
        assert!(matches!(
            tracker.record_entry("b1", "and"),
            Err(TrackerError::BatchNotStarted(_))
        ));
        assert!(matches!(
            tracker.complete("b1"),
            Err(TrackerError::InvalidTransition {
                from: BatchStatus::Pending,
                ..
            })
        ));
        tracker.start("b1").unwrap();
        tracker.start("b1").unwrap();
        assert!(matches!(
            tracker.record_entry("b1", "but"),
            Err(TrackerError::UnknownLemma { .. })
        ));
        tracker.record_entry("b1", "and").unwrap();
        tracker.complete("b1").unwrap();
        assert!(matches!(
            tracker.start("b1"),
            Err(TrackerError::InvalidTransition {
                from: BatchStatus::Complete,
                ..
            })
        ));
        assert!(matches!(
            tracker.start("b9"),
            Err(TrackerError::UnknownBatch(_))
        ));
    }

    #[test]
    fn registration_keeps_lemmas_unique() {
        let (_dir, mut tracker) = tracker_with(vec![Batch::new("b1", lemmas(&["and", "or"]))]);
        assert!(matches!(
            tracker.register(Batch::new("b2", lemmas(&["but", "or"]))),
            Err(TrackerError::LemmaAlreadyBatched { ref batch, .. }) if batch == "b1"
        ));
        assert!(matches!(
            tracker.register(Batch::new("b2", lemmas(&["so", "so"]))),
            Err(TrackerError::LemmaAlreadyBatched { ref batch, .. }) if batch == "b2"
        ));
        assert!(matches!(
            tracker.register(Batch::new("b1", lemmas(&["yet"]))),
            Err(TrackerError::DuplicateBatch(_))
        ));
        assert!(matches!(
            tracker.register(Batch::new("b3", Vec::new())),
            Err(TrackerError::EmptyBatch(_))
        ));
        assert_eq!(tracker.batches().len(), 1);
    }

    #[test]
    fn lemmas_are_unique_regardless_of_case() {
        let (_dir, mut tracker) = tracker_with(vec![Batch::new("b1", lemmas(&["unless"]))]);
        assert!(matches!(
            tracker.register(Batch::new("b2", lemmas(&["Unless"]))),
            Err(TrackerError::LemmaAlreadyBatched { ref batch, .. }) if batch == "b1"
        ));
        assert!(tracker.batch_for_lemma("UNLESS").is_some_and(|b| b.id() == "b1"));
        assert_eq!(tracker.batches().len(), 1);
    }

    #[test]
    fn rejects_names_that_would_corrupt_the_checklist() {
        let (_dir, mut tracker) = tracker_with(Vec::new());
        for bad in [" and", "or ", "so\n- [x] `b9`", ""] {
            assert!(
                matches!(
                    tracker.register(Batch::new("b1", lemmas(&[bad]))),
                    Err(TrackerError::InvalidLemma { .. })
                ),
                "{bad:?}"
            );
        }
        for bad in ["b`1", "b1\n", " b1"] {
            assert!(
                matches!(
                    tracker.register(Batch::new(bad, lemmas(&["and"]))),
                    Err(TrackerError::InvalidBatchId(_))
                ),
                "{bad:?}"
            );
        }
        assert!(!tracker.path().exists());
    }

    #[test]
    fn failed_bulk_registration_adds_nothing() {
        let (_dir, mut tracker) = tracker_with(Vec::new());
        let err = tracker
            .register_all(vec![
                Batch::new("b1", lemmas(&["and"])),
                Batch::new("b2", Vec::new()),
            ])
            .unwrap_err();
        assert!(matches!(err, TrackerError::EmptyBatch(_)));
        assert!(tracker.batches().is_empty());
        assert!(!tracker.path().exists());
    }

    #[test]
    fn state_survives_reopen() {
        let (dir, mut tracker) =
            tracker_with(vec![Batch::new("b1", lemmas(&["although", "unless"]))]);
        tracker.start("b1").unwrap();
        tracker.record_entry("b1", "unless").unwrap();
        drop(tracker);

        let mut reopened = BatchTracker::open(dir.path().join("progress.md")).unwrap();
        let batch = reopened.batch("b1").unwrap();
        assert_eq!(batch.status(), BatchStatus::InProgress);
        assert!(batch.is_recorded("unless"));
        assert!(!batch.is_recorded("although"));
        reopened.start("b1").unwrap();
        assert_eq!(reopened.batch("b1").unwrap().status(), BatchStatus::InProgress);
    }
}
