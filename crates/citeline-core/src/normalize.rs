//! Field normalization: identifier slugs, keyword sets, display-safe text
//!
//! Every function here is pure and total. Malformed input (empty strings,
//! pure punctuation, non-ASCII text) degrades to an empty result instead of
//! failing, and no function depends on another having run first.

use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use rustc_hash::FxHashSet;

/// Title tokens at or below this length are dropped.
pub const MIN_TITLE_WORD_LENGTH: usize = 3;

/// Upper bound on re-stemming a token; Snowball English converges in 2-3 rounds.
const MAX_STEM_ROUNDS: usize = 8;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^A-Za-z0-9]+").expect("invalid identifier pattern"));

static NON_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z]+").expect("invalid keyword pattern"));

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

/// English function words (the NLTK list, apostrophe forms omitted since
/// tokens never contain apostrophes).
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

static STOP_WORD_SET: LazyLock<FxHashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Whether `word` (already lower-cased) is an English stop word.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORD_SET.contains(word)
}

/// Display-safe transform: drop double quotes, turn tabs into spaces, escape
/// backslashes, trim. Case and punctuation are preserved.
pub fn clean_field(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => {}
            '\t' => out.push(' '),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    let trimmed = out.trim();
    if trimmed.len() == out.len() {
        out
    } else {
        trimmed.to_string()
    }
}

/// Identifier-safe transform. Output always matches `^[A-Za-z0-9_]*$`.
pub fn identifier_safe(s: &str) -> String {
    let cleaned = clean_field(s);
    NON_ALPHANUMERIC.replace_all(&cleaned, "_").into_owned()
}

/// Snowball English stem, re-applied until it stops changing so that stemming
/// an already-stemmed token is a no-op.
pub fn stem(word: &str) -> String {
    let mut current = word.to_string();
    for _ in 0..MAX_STEM_ROUNDS {
        let next = STEMMER.stem(&current);
        if next == current.as_str() {
            break;
        }
        current = next.into_owned();
    }
    current
}

/// Shared keyword transform. `min_len` enables title filtering: stop words and
/// tokens at or below `min_len` characters are dropped, both before and after
/// stemming.
fn keyword_tokens(s: &str, min_len: Option<usize>) -> Vec<String> {
    let lowered = clean_field(s).to_lowercase();
    let letters = NON_LETTER.replace_all(&lowered, " ");
    letters
        .split_whitespace()
        .filter_map(|word| {
            if min_len.is_some() && is_stop_word(word) {
                return None;
            }
            let stemmed = stem(word);
            match min_len {
                Some(min) if stemmed.len() <= min || is_stop_word(&stemmed) => None,
                _ if stemmed.is_empty() => None,
                _ => Some(stemmed),
            }
        })
        .collect()
}

/// Keyword transform without title filtering.
pub fn keywords(s: &str) -> Vec<String> {
    keyword_tokens(s, None)
}

/// Surname of one author name: its last whitespace- or dot-delimited component.
fn surname(name: &str) -> &str {
    name.trim()
        .rsplit(|c: char| c == '.' || c.is_whitespace())
        .next()
        .unwrap_or("")
}

/// Stemmed surnames of a comma-separated author list.
pub fn author_keywords(s: &str) -> Vec<String> {
    let surnames: Vec<&str> = s.split(',').map(surname).collect();
    keyword_tokens(&surnames.join(" "), None)
}

/// Stemmed, stop-word-filtered title tokens longer than [`MIN_TITLE_WORD_LENGTH`].
pub fn title_keywords(s: &str) -> Vec<String> {
    keyword_tokens(s, Some(MIN_TITLE_WORD_LENGTH))
}

/// Normalized authors: space-joined stemmed surnames.
///
/// Not idempotent. The output is read back as a single author whose surname
/// is its last word, so `"smith jone"` normalizes to `"jone"`.
pub fn normalize_authors(s: &str) -> String {
    author_keywords(s).join(" ")
}

/// Normalized title: space-joined [`title_keywords`].
pub fn normalize_title(s: &str) -> String {
    title_keywords(s).join(" ")
}

/// Human-readable author list: display-safe with a space after every comma.
pub fn display_authors(s: &str) -> String {
    clean_field(s).replace(',', ", ")
}

/// Parse a comma-separated reference list into identifier-safe ids.
///
/// A field that splits to a single empty string means "no references".
/// Identifiers that clean to nothing are dropped and duplicates keep their
/// first position.
pub fn references(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    let mut seen = FxHashSet::default();
    s.split(',')
        .map(identifier_safe)
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}
