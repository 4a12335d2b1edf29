use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lexicon_types::{Entry, lemma_key};
use thiserror::Error;
use tracing::{debug, info};

use crate::atomic::write_atomic;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("lemma {0:?} is already in the corpus")]
    DuplicateLemma(String),
    #[error("{}:{line}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    #[error("{}:{line}: lemma {lemma:?} appears more than once", .path.display())]
    DuplicateOnDisk {
        path: PathBuf,
        line: usize,
        lemma: String,
    },
    #[error("failed to encode entry {lemma:?}: {source}")]
    Encode {
        lemma: String,
        source: serde_json::Error,
    },
    #[error("corpus I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Append-only store of validated entries, one JSON object per line.
///
/// Entries are read back in append order and keyed by lemma (trimmed,
/// case-insensitive). The on-disk file is only ever replaced whole.
#[derive(Debug)]
pub struct Corpus {
    path: PathBuf,
    contents: String,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Corpus {
    /// Load the corpus at `path`. A missing file is an empty corpus; nothing
    /// is created until the first append.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref().to_path_buf();
        let contents = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for (lineno, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: Entry = serde_json::from_str(line).map_err(|source| CorpusError::Parse {
                path: path.clone(),
                line: lineno + 1,
                source,
            })?;
            let key = lemma_key(&entry.lemma);
            if index.insert(key, entries.len()).is_some() {
                return Err(CorpusError::DuplicateOnDisk {
                    path,
                    line: lineno + 1,
                    lemma: entry.lemma,
                });
            }
            entries.push(entry);
        }

        let mut contents = contents;
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }

        info!("loaded {} entries from {}", entries.len(), path.display());
        Ok(Self {
            path,
            contents,
            entries,
            index,
        })
    }

    /// Append `entry`, failing with [`CorpusError::DuplicateLemma`] if its lemma
    /// is already present. The corpus is unchanged on any error.
    pub fn append(&mut self, entry: Entry) -> Result<(), CorpusError> {
        let key = lemma_key(&entry.lemma);
        if self.index.contains_key(&key) {
            return Err(CorpusError::DuplicateLemma(entry.lemma));
        }

        let line = serde_json::to_string(&entry).map_err(|source| CorpusError::Encode {
            lemma: entry.lemma.clone(),
            source,
        })?;
        let mut next = String::with_capacity(self.contents.len() + line.len() + 1);
        next.push_str(&self.contents);
        next.push_str(&line);
        next.push('\n');
        write_atomic(&self.path, next.as_bytes())?;

        debug!("appended {:?} to {}", entry.lemma, self.path.display());
        self.contents = next;
        self.index.insert(key, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Entries in the order they were appended.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, lemma: &str) -> Option<&Entry> {
        self.index
            .get(&lemma_key(lemma))
            .and_then(|&i| self.entries.get(i))
    }

    pub fn contains(&self, lemma: &str) -> bool {
        self.index.contains_key(&lemma_key(lemma))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(lemma: &str) -> Entry {
        Entry {
            lemma: lemma.into(),
            meanings: vec!["adding one more thing".into()],
            definitions: vec!["Used to join words or clauses that belong together.".into()],
            examples: vec![vec![
                "We bought bread and milk today.".into(),
                "She sang and he played the piano.".into(),
            ]],
            frequencies: vec![1.0],
        }
    }

    #[test]
    fn appends_in_order_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        let mut corpus = Corpus::open(&path).unwrap();
        assert!(corpus.is_empty());
        assert!(!path.exists());

        corpus.append(entry("and")).unwrap();
        corpus.append(entry("or")).unwrap();

        let reloaded = Corpus::open(&path).unwrap();
        let lemmas: Vec<_> = reloaded.entries().iter().map(|e| e.lemma.as_str()).collect();
        assert_eq!(lemmas, vec!["and", "or"]);
        assert_eq!(reloaded.get("OR"), Some(&entry("or")));
    }

    #[test]
    fn rejects_duplicate_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        let mut corpus = Corpus::open(&path).unwrap();
        corpus.append(entry("and")).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let err = corpus.append(entry(" And ")).unwrap_err();
        assert!(matches!(err, CorpusError::DuplicateLemma(ref l) if l == " And "));
        assert_eq!(corpus.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn refuses_corpus_with_duplicate_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        let line = serde_json::to_string(&entry("so")).unwrap();
        fs::write(&path, format!("{line}\n{line}\n")).unwrap();
        let err = Corpus::open(&path).unwrap_err();
        assert!(matches!(err, CorpusError::DuplicateOnDisk { line: 2, .. }));
    }

    #[test]
    fn reports_malformed_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        let line = serde_json::to_string(&entry("yet")).unwrap();
        fs::write(&path, format!("{line}\n\n{{not json\n")).unwrap();
        let err = Corpus::open(&path).unwrap_err();
        assert!(matches!(err, CorpusError::Parse { line: 3, .. }));
    }

    #[test]
    fn keeps_existing_bytes_when_file_lacks_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        let line = serde_json::to_string(&entry("nor")).unwrap();
        fs::write(&path, &line).unwrap();

        let mut corpus = Corpus::open(&path).unwrap();
        corpus.append(entry("for")).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&format!("{line}\n")));
        assert_eq!(text.lines().count(), 2);
    }
}
