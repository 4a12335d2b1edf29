//! Content rules for conjunction entries.
//!
//! Every check here is pure and total: it looks only at the text it is given
//! and never stops at the first problem, so an author sees every issue in one
//! pass. Linguistic judgment stays with the author; the rules only check that
//! the shape of an entry is consistent with it.
//!
//! # How it works
//! 1. Structure: the lemma is present and the parallel arrays line up.
//! 2. Frequencies: weights sum to 1.0 (a lone meaning must be exactly `1.0`).
//! 3. Length floors: definitions meet the category minimum, examples have
//!    at least [`MIN_EXAMPLE_WORDS`] words and come in pairs.
//! 4. Advisory: the meaning classifier checks whether a multi-meaning split is
//!    backed by at least one split test.
//!
//! # Example
//! ```rust
//! use lexicon_rules::{Verdict, validate_entry};
//! use lexicon_types::{ConjunctionCategory, Entry};
//!
//! let entry = Entry {
//!     lemma: "because".into(),
//!     meanings: vec!["giving the cause".into()],
//!     definitions: vec![
//!         "Used to introduce the reason why something happens or is true.".into(),
//!     ],
//!     examples: vec![vec![
//!         "We stayed inside because it was raining.".into(),
//!         "She smiled because the news was good.".into(),
//!     ]],
//!     frequencies: vec![1.0],
//! };
//! let report = validate_entry(&entry, ConjunctionCategory::Complex, &[]);
//! assert_eq!(report.verdict(), Verdict::Valid);
//! ```

pub mod classify;
pub mod measure;
pub mod validate;

pub use classify::{Classification, classify, infer_use};
pub use measure::{FREQUENCY_TOLERANCE, FrequencyCheck, check_frequencies, count_words};
pub use validate::{
    Advisory, EXAMPLES_PER_MEANING, MEANING_LABEL_WORDS, MIN_EXAMPLE_WORDS, ValidationReport,
    Verdict, Violation, validate_entry,
};
