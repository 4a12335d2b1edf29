//! Shared types for the conjunction lexicon.
//!
//! [`Entry`] mirrors one line of the persisted JSONL corpus field for field
//! (`frequencies` is stored as `frequency_meaning`). [`ConjunctionCategory`]
//! carries the per-category thresholds, [`MeaningUse`] is the author's
//! annotation of a single meaning, and [`Batch`]/[`BatchStatus`] describe a
//! unit of authoring work.
//!
//! ```rust
//! use lexicon_types::{BatchStatus, ConjunctionCategory};
//!
//! let category = ConjunctionCategory::infer("either...or");
//! assert_eq!(category, ConjunctionCategory::Correlative);
//! assert_eq!(category.min_definition_words(), 12);
//! assert_eq!(BatchStatus::from_marker('~'), Some(BatchStatus::InProgress));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Conjunctions that join elements of equal rank.
const COORDINATING: &[&str] = &["and", "but", "for", "nor", "or", "so", "yet"];

/// Token that joins the two halves of a correlative pair.
pub const CORRELATIVE_JOINER: &str = "...";

/// Grammatical class of a conjunction, which fixes its minimum definition length.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConjunctionCategory {
    /// `and`, `or`, `but`.
    Simple,
    /// `although`, `whereas`, `unless`.
    Complex,
    /// `either...or`, `not only...but also`.
    Correlative,
}

impl ConjunctionCategory {
    /// Minimum number of words a definition must carry.
    pub fn min_definition_words(self) -> usize {
        match self {
            ConjunctionCategory::Simple => 8,
            ConjunctionCategory::Complex => 10,
            ConjunctionCategory::Correlative => 12,
        }
    }

    /// Pick a category from the lemma's shape when the author did not name one.
    pub fn infer(lemma: &str) -> Self {
        let lemma = lemma.trim();
        if lemma.contains(CORRELATIVE_JOINER) {
            ConjunctionCategory::Correlative
        } else if COORDINATING
            .iter()
            .any(|word| word.eq_ignore_ascii_case(lemma))
        {
            ConjunctionCategory::Simple
        } else {
            ConjunctionCategory::Complex
        }
    }

    /// Parse the lowercase name used on the wire and in the CLI.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(ConjunctionCategory::Simple),
            "complex" => Some(ConjunctionCategory::Complex),
            "correlative" => Some(ConjunctionCategory::Correlative),
            _ => None,
        }
    }
}

impl fmt::Display for ConjunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConjunctionCategory::Simple => "simple",
            ConjunctionCategory::Complex => "complex",
            ConjunctionCategory::Correlative => "correlative",
        })
    }
}

/// One dictionary entry, exactly as persisted in the corpus.
///
/// The four per-meaning arrays are parallel: index `i` of each describes the
/// same meaning. Alignment is checked by the validator, not enforced here, so
/// malformed candidates can still be loaded and reported on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub lemma: String,
    #[serde(default)]
    pub meanings: Vec<String>,
    #[serde(default)]
    pub definitions: Vec<String>,
    #[serde(default)]
    pub examples: Vec<Vec<String>>,
    #[serde(default, rename = "frequency_meaning")]
    pub frequencies: Vec<f64>,
}

impl Entry {
    /// An entry with a lemma and no content, as produced by batch scaffolding.
    pub fn scaffold(lemma: impl Into<String>) -> Self {
        Self {
            lemma: lemma.into(),
            meanings: Vec::new(),
            definitions: Vec::new(),
            examples: Vec::new(),
            frequencies: Vec::new(),
        }
    }

    /// True while any of meanings, definitions, or examples is still unpopulated.
    pub fn is_empty(&self) -> bool {
        self.meanings.is_empty() || self.definitions.is_empty() || self.examples.is_empty()
    }

    /// Number of meanings the entry claims.
    pub fn meaning_count(&self) -> usize {
        self.meanings.len()
    }
}

/// The three independent tests that can justify splitting a lemma into meanings.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitTest {
    /// Uses set up logically distinct relationships.
    Relation,
    /// Uses join different grammatical elements (words vs. clauses).
    ConnectionType,
    /// One use is grammatical and another is lexicalized.
    Mode,
}

impl fmt::Display for SplitTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SplitTest::Relation => "relation",
            SplitTest::ConnectionType => "connection_type",
            SplitTest::Mode => "mode",
        })
    }
}

/// Logical relationship a use of a conjunction sets up.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Addition,
    Alternative,
    Contrast,
    Exception,
    Concession,
    Cause,
    Result,
    Condition,
    Time,
    Purpose,
    Comparison,
    #[default]
    Unspecified,
}

/// Grammatical level of the elements a use connects.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connection {
    Word,
    Clause,
    #[default]
    Unspecified,
}

/// Whether a use is productive grammar or a fixed, lexicalized expression.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Grammatical,
    Lexicalized,
}

/// Author-supplied description of one meaning, consumed by the meaning classifier.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MeaningUse {
    #[serde(default)]
    pub relation: Relation,
    #[serde(default)]
    pub connection: Connection,
    #[serde(default)]
    pub mode: Mode,
}

/// Lifecycle of a batch. Transitions only move forward.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProgress,
    Complete,
}

impl BatchStatus {
    /// Parse the character between the checklist brackets.
    pub fn from_marker(c: char) -> Option<Self> {
        match c {
            ' ' => Some(BatchStatus::Pending),
            '~' => Some(BatchStatus::InProgress),
            'x' | 'X' => Some(BatchStatus::Complete),
            _ => None,
        }
    }

    /// Emit the checklist marker for this status.
    pub fn to_marker(self) -> char {
        match self {
            BatchStatus::Pending => ' ',
            BatchStatus::InProgress => '~',
            BatchStatus::Complete => 'x',
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatchStatus::Pending => "pending",
            BatchStatus::InProgress => "in progress",
            BatchStatus::Complete => "complete",
        })
    }
}

/// Identity of a lemma across batches and the corpus: trimmed and lowercased,
/// so `Unless` and `unless` name the same headword.
pub fn lemma_key(lemma: &str) -> String {
    lemma.trim().to_lowercase()
}

/// A named, ordered set of lemmas processed as one unit of work.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub lemmas: Vec<String>,
    pub status: BatchStatus,
}

impl Batch {
    /// A fresh `Pending` batch.
    pub fn new(id: impl Into<String>, lemmas: Vec<String>) -> Self {
        Self {
            id: id.into(),
            lemmas,
            status: BatchStatus::Pending,
        }
    }

    /// Position of `lemma` within the batch, if it belongs to it. Compared by
    /// [`lemma_key`].
    pub fn position(&self, lemma: &str) -> Option<usize> {
        let key = lemma_key(lemma);
        self.lemmas.iter().position(|l| lemma_key(l) == key)
    }
}
