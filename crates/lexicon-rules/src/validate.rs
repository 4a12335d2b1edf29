use std::fmt;
use std::ops::RangeInclusive;

use lexicon_types::{ConjunctionCategory, Entry, MeaningUse};
use serde::Serialize;
use thiserror::Error;

use crate::classify::{Classification, classify, infer_use};
use crate::measure::{check_frequencies, count_words};

/// Minimum words in every example sentence, regardless of category.
pub const MIN_EXAMPLE_WORDS: usize = 6;
/// Each meaning is illustrated by exactly this many example sentences.
pub const EXAMPLES_PER_MEANING: usize = 2;
/// Expected size of a meaning label, in words.
pub const MEANING_LABEL_WORDS: RangeInclusive<usize> = 3..=5;

/// A hard rule an entry breaks. Any violation rejects the entry.
#[derive(Clone, Debug, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("lemma is empty")]
    EmptyLemma,
    #[error("entry has no meanings")]
    NoMeanings,
    #[error(
        "parallel arrays differ in length: {meanings} meanings, {definitions} definitions, \
         {examples} example pairs, {frequencies} frequencies"
    )]
    StructuralMismatch {
        meanings: usize,
        definitions: usize,
        examples: usize,
        frequencies: usize,
    },
    #[error("frequencies sum to {sum} over {count} meanings, expected 1.0")]
    FrequencyNormalizationFailure { sum: f64, count: usize },
    #[error("definition {index} has {words} words, {category} conjunctions need at least {minimum}")]
    DefinitionTooShort {
        index: usize,
        words: usize,
        minimum: usize,
        category: ConjunctionCategory,
    },
    #[error("example {sentence} of meaning {meaning} has {words} words, at least {minimum} needed")]
    ExampleTooShort {
        meaning: usize,
        sentence: usize,
        words: usize,
        minimum: usize,
    },
    #[error("meaning {index} has {found} example sentences, expected a pair")]
    MalformedExamplePair { index: usize, found: usize },
}

/// A soft finding reported alongside the verdict. Never rejects an entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// Several meanings were given but no split test fired.
    LikelySingleMeaning { meanings: usize },
    /// A meaning label falls outside the expected word range.
    MeaningLabelLength { index: usize, words: usize },
    /// Annotation count differs from meaning count; labels were used instead.
    AnnotationMismatch { annotations: usize, meanings: usize },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::LikelySingleMeaning { meanings } => write!(
                f,
                "{meanings} meanings given but no split test fired; this should likely be one meaning"
            ),
            Advisory::MeaningLabelLength { index, words } => write!(
                f,
                "meaning label {index} has {words} words, expected {}-{}",
                MEANING_LABEL_WORDS.start(),
                MEANING_LABEL_WORDS.end()
            ),
            Advisory::AnnotationMismatch {
                annotations,
                meanings,
            } => write!(
                f,
                "{annotations} annotations for {meanings} meanings; inferred uses from labels instead"
            ),
        }
    }
}

/// Pass/fail summary of a [`ValidationReport`].
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Valid,
    Invalid(Vec<Violation>),
}

/// Everything one validation pass found about an entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationReport {
    pub lemma: String,
    pub category: ConjunctionCategory,
    pub violations: Vec<Violation>,
    pub advisories: Vec<Advisory>,
    pub classification: Classification,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn verdict(&self) -> Verdict {
        if self.violations.is_empty() {
            Verdict::Valid
        } else {
            Verdict::Invalid(self.violations.clone())
        }
    }
}

/// Validate one entry against the rules for `category`.
///
/// `uses` are the author's per-meaning annotations. When empty, or when the
/// count does not match the meanings, uses are inferred from the labels.
pub fn validate_entry(
    entry: &Entry,
    category: ConjunctionCategory,
    uses: &[MeaningUse],
) -> ValidationReport {
    let mut violations = Vec::new();
    let mut advisories = Vec::new();

    check_structure(entry, &mut violations);

    let frequencies = check_frequencies(&entry.frequencies);
    if !frequencies.passed {
        violations.push(Violation::FrequencyNormalizationFailure {
            sum: frequencies.sum,
            count: entry.frequencies.len(),
        });
    }

    check_lengths(entry, category, &mut violations);

    for (index, label) in entry.meanings.iter().enumerate() {
        let words = count_words(label);
        if !MEANING_LABEL_WORDS.contains(&words) {
            advisories.push(Advisory::MeaningLabelLength { index, words });
        }
    }

    let classification = classify_meanings(entry, uses, &mut advisories);
    if entry.meanings.len() > 1 && !classification.multiplicity_justified {
        advisories.push(Advisory::LikelySingleMeaning {
            meanings: entry.meanings.len(),
        });
    }

    ValidationReport {
        lemma: entry.lemma.clone(),
        category,
        violations,
        advisories,
        classification,
    }
}

fn check_structure(entry: &Entry, violations: &mut Vec<Violation>) {
    if entry.lemma.trim().is_empty() {
        violations.push(Violation::EmptyLemma);
    }
    if entry.meanings.is_empty() {
        violations.push(Violation::NoMeanings);
    }

    let meanings = entry.meanings.len();
    let aligned = entry.definitions.len() == meanings
        && entry.examples.len() == meanings
        && entry.frequencies.len() == meanings;
    if !aligned {
        violations.push(Violation::StructuralMismatch {
            meanings,
            definitions: entry.definitions.len(),
            examples: entry.examples.len(),
            frequencies: entry.frequencies.len(),
        });
    }
}

fn check_lengths(entry: &Entry, category: ConjunctionCategory, violations: &mut Vec<Violation>) {
    let minimum = category.min_definition_words();
    for (index, definition) in entry.definitions.iter().enumerate() {
        let words = count_words(definition);
        if words < minimum {
            violations.push(Violation::DefinitionTooShort {
                index,
                words,
                minimum,
                category,
            });
        }
    }

    for (meaning, pair) in entry.examples.iter().enumerate() {
        if pair.len() != EXAMPLES_PER_MEANING {
            violations.push(Violation::MalformedExamplePair {
                index: meaning,
                found: pair.len(),
            });
        }
        for (sentence, text) in pair.iter().enumerate() {
            let words = count_words(text);
            if words < MIN_EXAMPLE_WORDS {
                violations.push(Violation::ExampleTooShort {
                    meaning,
                    sentence,
                    words,
                    minimum: MIN_EXAMPLE_WORDS,
                });
            }
        }
    }
}

fn classify_meanings(
    entry: &Entry,
    uses: &[MeaningUse],
    advisories: &mut Vec<Advisory>,
) -> Classification {
    if !uses.is_empty() && uses.len() == entry.meanings.len() {
        return classify(uses);
    }
    if !uses.is_empty() {
        advisories.push(Advisory::AnnotationMismatch {
            annotations: uses.len(),
            meanings: entry.meanings.len(),
        });
    }
    let inferred: Vec<MeaningUse> = entry.meanings.iter().map(|m| infer_use(m)).collect();
    classify(&inferred)
}
