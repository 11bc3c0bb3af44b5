//! First pass: count and bucket records, detect phonetic annotation.

use log::debug;

use crate::error::{Error, Result};
use crate::record::{EntryType, Record};

/// Raw lines of the first pass, split by entry type.
#[derive(Debug, Default)]
pub struct Classification {
    pub words: Vec<String>,
    pub phrases: Vec<String>,
    /// True if any record carries a `phonetic` field.
    pub has_phonetic: bool,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.words.len() + self.phrases.len()
    }

    fn push(&mut self, raw: String, record: &Record) {
        self.has_phonetic |= record.has_phonetic();
        match record.kind() {
            EntryType::Word => self.words.push(raw),
            EntryType::Phrase => self.phrases.push(raw),
        }
    }
}

/// Consumes one pass of `(line, record)` pairs. Fails on the first malformed record, or
/// with [`Error::EmptyInput`] if there were none.
pub fn classify<I>(records: I) -> Result<Classification>
where
    I: IntoIterator<Item = Result<(String, Record)>>,
{
    let mut classification = Classification::default();
    for pair in records {
        let (raw, record) = pair?;
        classification.push(raw, &record);
    }

    if classification.total() == 0 {
        return Err(Error::EmptyInput);
    }

    debug!(
        "classified {} records ({} words, {} phrases, phonetic: {})",
        classification.total(),
        classification.words.len(),
        classification.phrases.len(),
        classification.has_phonetic
    );
    Ok(classification)
}
