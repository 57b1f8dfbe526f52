use std::collections::BTreeSet;

use crate::types::{Candidate, Packet};

/// Words too common (or too path-generic) to signal relevance.
const STOPWORDS: &[&str] = &[
    "the", "and", "with", "from", "this", "that", "into", "over", "for", "are", "was", "were",
    "been", "being", "have", "has", "had", "having", "does", "did", "doing", "will", "would",
    "could", "should", "shall", "can", "may", "might", "must", "need", "use", "used", "using",
    "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "than", "too",
    "very", "just", "also", "now", "only", "src", "lib", "app", "apps", "index", "main", "test",
    "tests",
];

/// Shortest keyword kept, in characters.
const MIN_KEYWORD_LEN: usize = 3;

/// An ordered, de-duplicated keyword set.
pub type KeywordSet = BTreeSet<String>;

fn is_keyword(word: &str) -> bool {
    word.chars().count() >= MIN_KEYWORD_LEN && !STOPWORDS.contains(&word)
}

/// Splits a compound identifier into lower-cased sub-words.
///
/// Breaks on lowercase→uppercase boundaries and on `_`/`-`, drops short and
/// stop words, and also keeps the whole identifier when it passes the same
/// filter. `handleOAuthCallback` yields `handle`, `oauth`, `callback`, and
/// `handleoauthcallback`.
pub fn split_identifier(identifier: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in identifier.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if prev_lower && c.is_ascii_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_ascii_lowercase();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut parts: Vec<String> = Vec::new();
    for word in words {
        let lower = word.to_lowercase();
        if is_keyword(&lower) && !parts.contains(&lower) {
            parts.push(lower);
        }
    }

    let full = identifier.to_lowercase();
    if is_keyword(&full) && !parts.contains(&full) {
        parts.push(full);
    }

    parts
}

/// Extracts keywords from free text.
///
/// Characters other than ASCII alphanumerics, whitespace, `_`, and `-` are
/// treated as separators; each remaining token is decomposed with
/// [`split_identifier`].
pub fn extract_keywords(text: &str) -> KeywordSet {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .flat_map(split_identifier)
        .collect()
}

/// Keywords describing a packet's intent.
///
/// Draws from the title, goal, constraints, definition-of-done items, and
/// each anchor's symbol name and path segments.
pub fn packet_keywords(packet: &Packet) -> KeywordSet {
    let mut sources: Vec<&str> = vec![packet.title.as_str(), packet.goal.as_str()];
    sources.extend(packet.constraints.iter().map(String::as_str));
    sources.extend(packet.dod.iter().map(String::as_str));

    for anchor in &packet.repo_truth {
        sources.push(&anchor.symbol);
        sources.extend(anchor.path.split(['/', '\\']).filter(|p| !p.is_empty()));
    }

    sources.into_iter().flat_map(extract_keywords).collect()
}

/// Keywords describing a candidate.
///
/// Precomputed keywords win; otherwise they are extracted from the text,
/// title, paths, and symbols.
pub fn candidate_keywords(candidate: &Candidate) -> KeywordSet {
    if !candidate.keywords.is_empty() {
        return candidate.keywords.iter().cloned().collect();
    }

    let mut sources: Vec<&str> = vec![candidate.text.as_str()];
    if let Some(title) = &candidate.title {
        sources.push(title);
    }
    sources.extend(candidate.paths.iter().map(String::as_str));
    sources.extend(candidate.symbols.iter().map(String::as_str));

    sources.into_iter().flat_map(extract_keywords).collect()
}

/// Jaccard similarity `|A∩B| / |A∪B|`, or 0 when both sets are empty.
pub fn jaccard(a: &KeywordSet, b: &KeywordSet) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
