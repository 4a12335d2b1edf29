use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use lexicon_types::Entry;

/// Completeness counts for one JSONL file of entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub total: usize,
    /// Entries still missing meanings, definitions, or examples.
    pub empty: usize,
    /// 1-based line numbers that did not parse as an entry.
    pub invalid_lines: Vec<usize>,
}

impl AuditReport {
    pub fn is_complete(&self) -> bool {
        self.empty == 0 && self.invalid_lines.is_empty()
    }
}

/// Count populated and unpopulated entries in a JSONL file.
pub fn audit_jsonl(path: impl AsRef<Path>) -> Result<AuditReport> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut report = AuditReport::default();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("{}:{}", path.display(), lineno + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Entry>(&line) {
            Ok(entry) => {
                report.total += 1;
                if entry.is_empty() {
                    report.empty += 1;
                }
            }
            Err(_) => report.invalid_lines.push(lineno + 1),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn counts_scaffold_entries() {
        let mut file = NamedTempFile::new().unwrap();
        let filled = r#"{"lemma":"and","meanings":["adding"],"definitions":["d"],"examples":[["a","b"]],"frequency_meaning":[1.0]}"#;
        let scaffold = r#"{"lemma":"or","meanings":[],"definitions":[],"examples":[],"frequency_meaning":[],"key_collocates":[]}"#;
        writeln!(file, "{filled}\n{scaffold}\n\nnot json").unwrap();

        let report = audit_jsonl(file.path()).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.empty, 1);
        assert_eq!(report.invalid_lines, vec![4]);
        assert!(!report.is_complete());
    }
}
