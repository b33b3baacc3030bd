//! Run-wide set of normalized keyword tokens

use rustc_hash::FxHashSet;

use crate::record::Record;

/// Distinct keyword tokens seen across a run. Reported, never branched on.
#[derive(Debug, Default)]
pub struct Vocabulary {
    words: FxHashSet<String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, record: &Record) {
        for word in record.keywords() {
            if !self.words.contains(word) {
                self.words.insert(word.to_string());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }
}
