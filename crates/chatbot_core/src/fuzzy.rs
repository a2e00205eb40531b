//! Lexical similarity on a 0-100 scale, tolerant of word order.

use crate::error::Result;
use crate::model::{Corpus, ScoreVector};
use crate::scoring::Scorer;
use rapidfuzz::distance::indel;
use rayon::prelude::*;

/// Normalised Indel similarity of two strings, 0-100, compared by character.
pub fn ratio(a: &str, b: &str) -> f32 {
    (indel::normalized_similarity(a.chars(), b.chars()) * 100.0) as f32
}

/// `ratio` after sorting whitespace-separated tokens.
pub fn token_sort_ratio(a: &str, b: &str) -> f32 {
    ratio(&sort_tokens(a), &sort_tokens(b))
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Token-sort ratio between the lowercased query and each lowercased utterance.
pub struct FuzzyScorer {
    sorted_utterances: Vec<String>,
}

impl FuzzyScorer {
    pub fn precompute(corpus: &Corpus) -> Self {
        Self {
            sorted_utterances: corpus
                .utterances()
                .map(|u| sort_tokens(&u.to_lowercase()))
                .collect(),
        }
    }
}

impl Scorer for FuzzyScorer {
    fn score(&self, query: &str) -> Result<ScoreVector> {
        let query = sort_tokens(&query.to_lowercase());
        Ok(ScoreVector::new(
            self.sorted_utterances
                .par_iter()
                .map(|u| ratio(&query, u))
                .collect(),
        ))
    }
}
