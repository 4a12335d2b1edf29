//! Markdown progress checklist used as the tracker's durable state.
//!
//! Only the batch lines (`- [~] \`id\` ...`) and their indented lemma lines
//! (`  - [x] lemma`) carry state. Headings and statistics are regenerated on
//! every write and skipped when parsing, so the file stays pleasant to read
//! and to skim in review.

use std::collections::HashSet;
use std::fmt::Write as _;

use bitvec::prelude::*;
use lexicon_types::{Batch, BatchStatus, lemma_key};
use thiserror::Error;

use crate::tracker::{ProgressSummary, RecordSet, TrackedBatch};

const TITLE: &str = "# Progress Checklist - Conjunction Batches";
const BATCH_PREFIX: &str = "- [";
const LEMMA_PREFIX: &str = "  - [";

#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

fn malformed(line: usize, reason: impl Into<String>) -> ChecklistError {
    ChecklistError::Malformed {
        line,
        reason: reason.into(),
    }
}

/// Render the full checklist document.
pub(crate) fn render(batches: &[TrackedBatch]) -> String {
    let summary = ProgressSummary::tally(batches);

    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}\n");
    let _ = writeln!(out, "Total batches: {}\n", summary.total);
    let _ = writeln!(out, "## Batch Status\n");
    let _ = writeln!(
        out,
        "Batches move from [ ] to [~] to [x]. A lemma is checked once its entry is in the corpus.\n"
    );
    for batch in batches {
        let _ = writeln!(
            out,
            "- [{}] `{}` ({} lemmas)",
            batch.status().to_marker(),
            batch.id(),
            batch.lemmas().len()
        );
        for (i, lemma) in batch.lemmas().iter().enumerate() {
            let mark = if batch.recorded_at(i) { 'x' } else { ' ' };
            let _ = writeln!(out, "  - [{mark}] {lemma}");
        }
    }
    let _ = writeln!(out, "\n## Summary Statistics\n");
    let _ = writeln!(out, "- Total batches: {}", summary.total);
    let _ = writeln!(
        out,
        "- Batches completed: {}/{} ({}%)",
        summary.complete,
        summary.total,
        summary.percent_complete()
    );
    let _ = writeln!(out, "- Batches in progress: {}", summary.in_progress);
    let _ = writeln!(out, "- Batches not started: {}", summary.pending);
    out
}

/// Parse a checklist document back into tracked batches.
pub(crate) fn parse(text: &str) -> Result<Vec<TrackedBatch>, ChecklistError> {
    let mut parsed: Vec<(Batch, Vec<bool>, usize)> = Vec::new();
    let mut ids = HashSet::new();
    let mut lemmas = HashSet::new();

    for (lineno, raw) in text.lines().enumerate() {
        let line = lineno + 1;
        let raw = raw.trim_end();
        if let Some(rest) = raw.strip_prefix(LEMMA_PREFIX) {
            let (mark, lemma) = split_marker(rest, line)?;
            let Some((batch, recorded, _)) = parsed.last_mut() else {
                return Err(malformed(line, "lemma listed before any batch"));
            };
            let done = match mark {
                ' ' => false,
                'x' | 'X' => true,
                other => return Err(malformed(line, format!("invalid lemma marker {other:?}"))),
            };
            let lemma = lemma.trim();
            if lemma.is_empty() {
                return Err(malformed(line, "empty lemma"));
            }
            if !lemmas.insert(lemma_key(lemma)) {
                return Err(malformed(line, format!("lemma {lemma:?} listed twice")));
            }
            batch.lemmas.push(lemma.to_string());
            recorded.push(done);
        } else if let Some(rest) = raw.strip_prefix(BATCH_PREFIX) {
            let (mark, rest) = split_marker(rest, line)?;
            let status = BatchStatus::from_marker(mark)
                .ok_or_else(|| malformed(line, format!("invalid batch marker {mark:?}")))?;
            let id = rest
                .trim_start()
                .strip_prefix('`')
                .and_then(|s| s.split_once('`'))
                .map(|(id, _)| id.trim())
                .filter(|id| !id.is_empty())
                .ok_or_else(|| malformed(line, "batch id must be wrapped in backticks"))?;
            if !ids.insert(id.to_string()) {
                return Err(malformed(line, format!("batch {id:?} listed twice")));
            }
            parsed.push((
                Batch {
                    id: id.to_string(),
                    lemmas: Vec::new(),
                    status,
                },
                Vec::new(),
                line,
            ));
        }
    }

    parsed
        .into_iter()
        .map(|(batch, recorded, line)| {
            if batch.lemmas.is_empty() {
                return Err(malformed(line, format!("batch {:?} has no lemmas", batch.id)));
            }
            let all_recorded = recorded.iter().all(|done| *done);
            if batch.status == BatchStatus::Complete && !all_recorded {
                return Err(malformed(
                    line,
                    format!("batch {:?} is complete but has unchecked lemmas", batch.id),
                ));
            }
            if batch.status == BatchStatus::Pending && recorded.iter().any(|done| *done) {
                return Err(malformed(
                    line,
                    format!("batch {:?} is pending but has checked lemmas", batch.id),
                ));
            }
            let bits: RecordSet = recorded.iter().copied().collect::<BitVec<usize, Lsb0>>();
            Ok(TrackedBatch::from_parts(batch, bits))
        })
        .collect()
}

/// Split `"x] rest"` into the marker character and the remainder.
fn split_marker(rest: &str, line: usize) -> Result<(char, &str), ChecklistError> {
    let mut chars = rest.chars();
    let mark = chars
        .next()
        .ok_or_else(|| malformed(line, "missing checkbox marker"))?;
    let rest = chars
        .as_str()
        .strip_prefix(']')
        .ok_or_else(|| malformed(line, "unterminated checkbox"))?;
    Ok((mark, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TrackedBatch> {
        let mut first = Batch::new(
            "conjunctions_1_to_2",
            vec!["and".to_string(), "or".to_string()],
        );
        first.status = BatchStatus::InProgress;
        let second = Batch::new("conjunctions_3_to_3", vec!["either...or".to_string()]);
        vec![
            TrackedBatch::from_parts(first, bitvec![usize, Lsb0; 1, 0]),
            TrackedBatch::new(second),
        ]
    }

    #[test]
    fn renders_readable_document() {
        let text = render(&sample());
        assert!(text.starts_with(TITLE));
        assert!(text.contains("- [~] `conjunctions_1_to_2` (2 lemmas)\n  - [x] and\n  - [ ] or\n"));
        assert!(text.contains("- [ ] `conjunctions_3_to_3` (1 lemmas)\n  - [ ] either...or\n"));
        assert!(text.contains("- Batches completed: 0/2 (0%)"));
        assert!(text.contains("- Batches in progress: 1"));
        assert!(text.contains("- Batches not started: 1"));
    }

    #[test]
    fn parses_what_it_renders() {
        let batches = sample();
        assert_eq!(parse(&render(&batches)).unwrap(), batches);
    }

    #[test]
    fn accepts_hand_checked_uppercase_marks() {
        let text = "- [X] `b1`\n  - [X] and\n";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed[0].status(), BatchStatus::Complete);
        assert!(parsed[0].is_recorded("and"));
    }

    #[test]
    fn rejects_inconsistent_documents() {
        let cases = [
            ("  - [x] and\n", 1),
            ("- [?] `b1`\n  - [ ] and\n", 1),
            ("- [ ] b1\n", 1),
            ("- [ ] `b1`\n", 1),
            ("- [x] `b1`\n  - [ ] and\n", 1),
            ("- [ ] `b1`\n  - [x] and\n", 1),
            ("- [~] `b1`\n  - [ ] and\n- [ ] `b2`\n  - [ ] and\n", 4),
            ("- [~] `b1`\n  - [~] and\n", 2),
            ("- [~] `b1`\n  - [ ] and\n  - [ ] And\n", 3),
        ];
        for (text, expected_line) in cases {
            match parse(text) {
                Err(ChecklistError::Malformed { line, .. }) => {
                    assert_eq!(line, expected_line, "{text:?}")
                }
                Ok(_) => panic!("expected {text:?} to be rejected"),
            }
        }
    }
}
