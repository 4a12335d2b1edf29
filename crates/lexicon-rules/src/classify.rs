use std::collections::{BTreeSet, HashSet};

use lexicon_types::{Connection, MeaningUse, Mode, Relation, SplitTest};
use serde::Serialize;

/// Result of running the split tests over an entry's meanings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// At least one split test fired, so several meanings are permitted.
    pub multiplicity_justified: bool,
    pub fired_tests: BTreeSet<SplitTest>,
}

/// Run the relation, connection-type, and mode tests over `uses`.
///
/// Firing only permits a split; whether to split stays the author's call.
pub fn classify(uses: &[MeaningUse]) -> Classification {
    let mut fired_tests = BTreeSet::new();

    let relations: HashSet<Relation> = uses
        .iter()
        .map(|u| u.relation)
        .filter(|r| *r != Relation::Unspecified)
        .collect();
    if relations.len() >= 2 {
        fired_tests.insert(SplitTest::Relation);
    }

    let has_connection = |c: Connection| uses.iter().any(|u| u.connection == c);
    if has_connection(Connection::Word) && has_connection(Connection::Clause) {
        fired_tests.insert(SplitTest::ConnectionType);
    }

    let has_mode = |m: Mode| uses.iter().any(|u| u.mode == m);
    if has_mode(Mode::Grammatical) && has_mode(Mode::Lexicalized) {
        fired_tests.insert(SplitTest::Mode);
    }

    Classification {
        multiplicity_justified: !fired_tests.is_empty(),
        fired_tests,
    }
}

/// Derive a [`MeaningUse`] from a short meaning label such as
/// "contrast between clauses" when the author supplied no annotation.
///
/// The first cue word found decides each field; labels without a cue leave
/// the relation and connection unspecified and the mode grammatical.
pub fn infer_use(label: &str) -> MeaningUse {
    let words: Vec<String> = label
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    MeaningUse {
        relation: first_cue(&words, relation_cues()).unwrap_or_default(),
        connection: first_cue(&words, connection_cues()).unwrap_or_default(),
        mode: first_cue(&words, mode_cues()).unwrap_or_default(),
    }
}

fn first_cue<T: Copy>(words: &[String], table: &[(&str, T)]) -> Option<T> {
    words.iter().find_map(|w| {
        table
            .iter()
            .find(|(cue, _)| *cue == w.as_str())
            .map(|(_, value)| *value)
    })
}

fn relation_cues() -> &'static [(&'static str, Relation)] {
    &[
        ("addition", Relation::Addition),
        ("adding", Relation::Addition),
        ("joining", Relation::Addition),
        ("linking", Relation::Addition),
        ("combining", Relation::Addition),
        ("alternative", Relation::Alternative),
        ("alternatives", Relation::Alternative),
        ("choice", Relation::Alternative),
        ("option", Relation::Alternative),
        ("contrast", Relation::Contrast),
        ("contrasting", Relation::Contrast),
        ("opposition", Relation::Contrast),
        ("exception", Relation::Exception),
        ("except", Relation::Exception),
        ("excluding", Relation::Exception),
        ("concession", Relation::Concession),
        ("conceding", Relation::Concession),
        ("despite", Relation::Concession),
        ("cause", Relation::Cause),
        ("causal", Relation::Cause),
        ("reason", Relation::Cause),
        ("result", Relation::Result),
        ("consequence", Relation::Result),
        ("outcome", Relation::Result),
        ("condition", Relation::Condition),
        ("conditional", Relation::Condition),
        ("time", Relation::Time),
        ("temporal", Relation::Time),
        ("sequence", Relation::Time),
        ("purpose", Relation::Purpose),
        ("aim", Relation::Purpose),
        ("comparison", Relation::Comparison),
        ("comparing", Relation::Comparison),
    ]
}

fn connection_cues() -> &'static [(&'static str, Connection)] {
    &[
        ("word", Connection::Word),
        ("words", Connection::Word),
        ("phrase", Connection::Word),
        ("phrases", Connection::Word),
        ("clause", Connection::Clause),
        ("clauses", Connection::Clause),
        ("sentence", Connection::Clause),
        ("sentences", Connection::Clause),
    ]
}

fn mode_cues() -> &'static [(&'static str, Mode)] {
    &[
        ("idiom", Mode::Lexicalized),
        ("idiomatic", Mode::Lexicalized),
        ("fixed", Mode::Lexicalized),
        ("expression", Mode::Lexicalized),
        ("lexicalized", Mode::Lexicalized),
        ("formulaic", Mode::Lexicalized),
    ]
}
