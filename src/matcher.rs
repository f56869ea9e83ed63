//! Fuzzy matching of parsed series names against known show names.

use strsim::{jaro_winkler, normalized_levenshtein};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub candidate: String,
    /// Similarity on a 0-100 scale.
    pub confidence: u8,
}

/// Picks the best candidate for a query along with a 0-100 confidence.
pub trait Matcher {
    fn best_match(&self, query: &str, candidates: &[&str]) -> Option<Match>;
}

/// Scores candidates with a blend of edit distance and Jaro-Winkler over
/// normalized strings. Only an exact normalized match scores 100; ties keep
/// the earliest candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimilarityMatcher;

impl SimilarityMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, query: &str, candidate: &str) -> u8 {
        let query = normalize_for_matching(query);
        let candidate = normalize_for_matching(candidate);

        if query.is_empty() || candidate.is_empty() {
            return 0;
        }
        if query == candidate {
            return 100;
        }

        let ratio = normalized_levenshtein(&query, &candidate);
        let sorted = normalized_levenshtein(&sort_tokens(&query), &sort_tokens(&candidate));
        let jaro = jaro_winkler(&query, &candidate) * 0.95;
        let best = ratio.max(sorted).max(jaro);

        ((best * 100.0).round() as u8).min(99)
    }
}

impl Matcher for SimilarityMatcher {
    fn best_match(&self, query: &str, candidates: &[&str]) -> Option<Match> {
        let mut best: Option<Match> = None;
        for candidate in candidates {
            let confidence = self.score(query, candidate);
            if best.as_ref().is_none_or(|b| confidence > b.confidence) {
                best = Some(Match {
                    candidate: candidate.to_string(),
                    confidence,
                });
            }
        }
        best
    }
}

/// Lowercase, treat separators and brackets as spaces, drop remaining
/// punctuation and collapse whitespace.
pub fn normalize_for_matching(s: &str) -> String {
    let s = s
        .to_lowercase()
        .replace(['.', '_', '-', '[', ']', '(', ')'], " ");

    let s: String = s
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}
