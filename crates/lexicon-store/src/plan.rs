use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use lexicon_types::{Batch, lemma_key};
use tracing::warn;

/// Lemmas per batch unless the caller asks otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Name of the batch covering lemmas `start..=end` (1-based).
pub fn batch_id(start: usize, end: usize) -> String {
    format!("conjunctions_{start}_to_{end}")
}

/// Split `lemmas` into consecutive batches of at most `batch_size`.
///
/// `offset` is the number of lemmas already planned in earlier runs, so
/// numbering continues where it left off. Blank and repeated lemmas are
/// dropped, keeping the first occurrence. Repeats are judged by [`lemma_key`].
pub fn plan_batches(lemmas: &[String], batch_size: usize, offset: usize) -> Vec<Batch> {
    let batch_size = batch_size.max(1);
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(lemmas.len());
    for lemma in lemmas {
        let lemma = lemma.trim();
        if lemma.is_empty() {
            continue;
        }
        if seen.insert(lemma_key(lemma)) {
            unique.push(lemma.to_string());
        } else {
            warn!("dropping repeated lemma {lemma:?}");
        }
    }

    unique
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| {
            let start = offset + i * batch_size + 1;
            let end = start + chunk.len() - 1;
            Batch::new(batch_id(start, end), chunk.to_vec())
        })
        .collect()
}

/// Read a tab-separated lemma list with a header row.
///
/// The lemma sits in the second column (`rank<TAB>lemma<TAB>...`); files
/// with a single column use that column instead. Blank lines are skipped.
pub fn read_lemma_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut lemmas = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("{}:{}", path.display(), lineno + 1))?;
        if lineno == 0 || line.trim().is_empty() {
            continue;
        }
        let mut columns = line.split('\t');
        let first = columns.next().unwrap_or_default();
        let lemma = columns.next().unwrap_or(first).trim();
        if !lemma.is_empty() {
            lemmas.push(lemma.to_string());
        }
    }
    Ok(lemmas)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_into_numbered_batches() {
        let batches = plan_batches(&words(&["and", "or", "but", "so", "yet"]), 2, 0);
        let ids: Vec<_> = batches.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "conjunctions_1_to_2",
                "conjunctions_3_to_4",
                "conjunctions_5_to_5"
            ]
        );
        assert_eq!(batches[2].lemmas, words(&["yet"]));
    }

    #[test]
    fn continues_numbering_and_drops_repeats() {
        let batches = plan_batches(&words(&["unless", " ", "whereas", "Unless ", "though"]), 50, 7);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].id, "conjunctions_8_to_10");
        assert_eq!(batches[0].lemmas, words(&["unless", "whereas", "though"]));
        assert!(plan_batches(&[], 50, 0).is_empty());
    }

    #[test]
    fn reads_second_column_after_header() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "rank\tlemma\tfreq\n1\tand\t900\n\n2\tbut\t400\n").unwrap();
        assert_eq!(read_lemma_list(file.path()).unwrap(), words(&["and", "but"]));

        let mut single = NamedTempFile::new().unwrap();
        write!(single, "lemma\nalthough\neither...or\n").unwrap();
        assert_eq!(
            read_lemma_list(single.path()).unwrap(),
            words(&["although", "either...or"])
        );
    }
}
