use std::path::Path;

use lexicon_rules::{ValidationReport, validate_entry};
use lexicon_store::{BatchTracker, Corpus, CorpusError, TrackedBatch, TrackerError};
use lexicon_types::{BatchStatus, ConjunctionCategory, Entry, MeaningUse};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// A candidate entry as handed in by an author or generator.
#[derive(Clone, Debug, Deserialize)]
pub struct Submission {
    pub entry: Entry,
    /// Inferred from the lemma when absent.
    #[serde(default)]
    pub category: Option<ConjunctionCategory>,
    /// Per-meaning annotations for the classifier; inferred from labels when empty.
    #[serde(default)]
    pub uses: Vec<MeaningUse>,
}

impl Submission {
    pub fn new(entry: Entry) -> Self {
        Self {
            entry,
            category: None,
            uses: Vec::new(),
        }
    }

    pub fn category(&self) -> ConjunctionCategory {
        self.category
            .unwrap_or_else(|| ConjunctionCategory::infer(&self.entry.lemma))
    }
}

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("entry {:?} failed validation with {} violations", .0.lemma, .0.violations.len())]
    Invalid(Box<ValidationReport>),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// The corpus and the batch tracker of one authoring run.
///
/// Callers share a `Desk` behind a single lock; every operation is short and
/// either fully applied or rejected before anything is written.
#[derive(Debug)]
pub struct Desk {
    corpus: Corpus,
    tracker: BatchTracker,
}

impl Desk {
    pub fn new(corpus: Corpus, tracker: BatchTracker) -> Self {
        Self { corpus, tracker }
    }

    pub fn open(corpus_path: impl AsRef<Path>, checklist_path: impl AsRef<Path>) -> Result<Self, DeskError> {
        Ok(Self::new(
            Corpus::open(corpus_path)?,
            BatchTracker::open(checklist_path)?,
        ))
    }

    /// Validate without touching any state.
    pub fn validate(&self, submission: &Submission) -> ValidationReport {
        validate_entry(&submission.entry, submission.category(), &submission.uses)
    }

    /// Start (or resume) a batch.
    ///
    /// Lemmas of the batch that already sit in the corpus, left behind by a run
    /// that stopped between appending and recording, are recorded here. Returns
    /// the lemmas recorded this way.
    pub fn start(&mut self, batch_id: &str) -> Result<Vec<String>, DeskError> {
        self.tracker.start(batch_id)?;

        let pending: Vec<String> = self
            .tracker
            .batch(batch_id)
            .map(|b| {
                b.lemmas()
                    .iter()
                    .filter(|l| !b.is_recorded(l) && self.corpus.contains(l))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for lemma in &pending {
            self.tracker.record_entry(batch_id, lemma)?;
        }
        if !pending.is_empty() {
            warn!(
                "batch {batch_id}: recorded {} lemmas already present in the corpus",
                pending.len()
            );
        }
        Ok(pending)
    }

    /// Validate a candidate, append it to the corpus, and check it off its batch.
    pub fn submit(
        &mut self,
        batch_id: &str,
        submission: Submission,
    ) -> Result<ValidationReport, DeskError> {
        self.tracker
            .ensure_recordable(batch_id, &submission.entry.lemma)?;

        let report = self.validate(&submission);
        if !report.is_valid() {
            warn!(
                "rejected {:?} for batch {batch_id}: {} violations",
                report.lemma,
                report.violations.len()
            );
            return Err(DeskError::Invalid(Box::new(report)));
        }

        let lemma = submission.entry.lemma.clone();
        self.corpus.append(submission.entry)?;
        self.tracker.record_entry(batch_id, &lemma)?;
        info!("accepted {lemma:?} into batch {batch_id}");
        Ok(report)
    }

    /// Complete a batch once every lemma has an entry in the corpus.
    ///
    /// Checklist marks alone are not trusted: a hand-edited checklist or a
    /// replaced corpus can claim lemmas that were never stored.
    pub fn complete(&mut self, batch_id: &str) -> Result<(), DeskError> {
        let unstored: Vec<String> = self
            .tracker
            .batch(batch_id)
            .filter(|b| b.status() == BatchStatus::InProgress)
            .map(|b| {
                b.lemmas()
                    .iter()
                    .filter(|l| !self.corpus.contains(l))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if !unstored.is_empty() {
            warn!(
                "batch {batch_id}: {} lemmas have no entry in the corpus",
                unstored.len()
            );
            return Err(TrackerError::IncompleteBatch {
                batch: batch_id.to_string(),
                missing: unstored,
            }
            .into());
        }
        self.tracker.complete(batch_id)?;
        Ok(())
    }

    pub fn batches(&self) -> &[TrackedBatch] {
        self.tracker.batches()
    }

    pub fn batch(&self, batch_id: &str) -> Option<&TrackedBatch> {
        self.tracker.batch(batch_id)
    }

    pub fn entry(&self, lemma: &str) -> Option<&Entry> {
        self.corpus.get(lemma)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn tracker(&self) -> &BatchTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut BatchTracker {
        &mut self.tracker
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use lexicon_store::plan_batches;

    use super::*;

    fn entry(lemma: &str) -> Entry {
        Entry {
            lemma: lemma.into(),
            meanings: vec!["introducing a condition".into()],
            definitions: vec![
                "Used to say that something happens only if another thing does not.".into(),
            ],
            examples: vec![vec![
                "We will go out unless it rains tonight.".into(),
                "You cannot enter unless you have a ticket.".into(),
            ]],
            frequencies: vec![1.0],
        }
    }

    fn desk(dir: &tempfile::TempDir, lemmas: &[&str]) -> Desk {
        let mut desk = Desk::open(dir.path().join("c.jsonl"), dir.path().join("p.md")).unwrap();
        let lemmas: Vec<String> = lemmas.iter().map(|l| l.to_string()).collect();
        desk.tracker_mut()
            .register_all(plan_batches(&lemmas, 50, 0))
            .unwrap();
        desk
    }

    #[test]
    fn rejects_before_mutation_when_batch_not_started() {
        let dir = tempfile::tempdir().unwrap();
        let mut desk = desk(&dir, &["unless"]);
        let err = desk
            .submit("conjunctions_1_to_1", Submission::new(entry("unless")))
            .unwrap_err();
        assert!(matches!(
            err,
            DeskError::Tracker(TrackerError::BatchNotStarted(_))
        ));
        assert!(desk.corpus().is_empty());
    }

    #[test]
    fn invalid_entry_is_not_appended() {
        let dir = tempfile::tempdir().unwrap();
        let mut desk = desk(&dir, &["unless"]);
        desk.start("conjunctions_1_to_1").unwrap();
        let mut bad = entry("unless");
        bad.frequencies = vec![0.5];
        let err = desk
            .submit("conjunctions_1_to_1", Submission::new(bad))
            .unwrap_err();
        assert!(matches!(err, DeskError::Invalid(ref r) if r.violations.len() == 1));
        assert!(desk.corpus().is_empty());
    }

    #[test]
    fn start_reconciles_entries_appended_before_a_crash() {
        let dir = tempfile::tempdir().unwrap();
        let mut desk = desk(&dir, &["unless", "whereas"]);
        desk.start("conjunctions_1_to_2").unwrap();
        desk.corpus.append(entry("unless")).unwrap();

        let recorded = desk.start("conjunctions_1_to_2").unwrap();
        assert_eq!(recorded, vec!["unless".to_string()]);
        let batch = desk.batch("conjunctions_1_to_2").unwrap();
        assert!(batch.is_recorded("unless"));
        assert_eq!(batch.status(), BatchStatus::InProgress);
    }

    #[test]
    fn complete_requires_stored_entries_not_just_checked_lemmas() {
        let dir = tempfile::tempdir().unwrap();
        let checklist = dir.path().join("p.md");
        fs::write(&checklist, "- [~] `b1`\n  - [x] unless\n  - [ ] whereas\n").unwrap();
        let mut desk = Desk::open(dir.path().join("c.jsonl"), &checklist).unwrap();
        desk.tracker_mut().record_entry("b1", "whereas").unwrap();

        let err = desk.complete("b1").unwrap_err();
        assert!(matches!(
            err,
            DeskError::Tracker(TrackerError::IncompleteBatch { ref missing, .. })
                if missing == &["unless".to_string(), "whereas".to_string()]
        ));
        assert_eq!(desk.batch("b1").unwrap().status(), BatchStatus::InProgress);

        desk.corpus.append(entry("unless")).unwrap();
        desk.corpus.append(entry("whereas")).unwrap();
        desk.complete("b1").unwrap();
        assert_eq!(desk.batch("b1").unwrap().status(), BatchStatus::Complete);
    }

    #[test]
    fn case_variant_in_another_batch_cannot_borrow_an_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut desk = desk(&dir, &["unless"]);
        let err = desk
            .tracker_mut()
            .register(lexicon_types::Batch::new("b2", vec!["Unless".to_string()]))
            .unwrap_err();
        assert!(matches!(err, TrackerError::LemmaAlreadyBatched { .. }));

        desk.start("conjunctions_1_to_1").unwrap();
        let mut upper = entry("unless");
        upper.lemma = "Unless".into();
        desk.submit("conjunctions_1_to_1", Submission::new(upper))
            .unwrap();
        assert!(desk.batch("conjunctions_1_to_1").unwrap().is_recorded("unless"));
        desk.complete("conjunctions_1_to_1").unwrap();
    }
}
